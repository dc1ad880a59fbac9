//! The facet phase of a search request.
//!
//! Facets reach their documents along four paths:
//!
//! * local collector facets are registered on the main query during
//!   [`FacetPhase::pre_process`] and see each match as the scan runs;
//! * local post facets ask the main scan to retain its matched doc ids and
//!   consume them once the scan is over;
//! * global post facets consume the live documents of every segment, built
//!   at most once per execution;
//! * global collector facets are grouped by normalized filter and each group
//!   is driven by a single extra index scan.
//!
//! Whatever the path, [`FacetPhase::execute`] builds every facet exactly once
//! and stores them in request order.

use crate::config::FacetConfig;
use crate::facet::entry::SearchContextFacets;
use crate::facet::executor::{FacetExecutor, FilteredPost, PostExecutor};
use crate::facet::telemetry::{
    log_phase_failure, log_phase_success, FacetPhaseMetrics, PhaseTelemetry, STAGE_BUILD,
    STAGE_GLOBAL_COLLECTORS, STAGE_POST,
};
use crate::facet::Facets;
use crate::index::{live_doc_sets, Filter, LeafDocSet};
use crate::search::{
    Collector, ContextId, ContextSearcher, FacetPhaseState, FilteredCollector, MultiCollector,
    SearchContext,
};
use crate::{Error, Result};
use std::collections::HashMap;
use tantivy::query::{ConstScoreQuery, Query};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct FacetPhase {
    batch_global_collectors: bool,
}

impl Default for FacetPhase {
    fn default() -> Self {
        Self::new(&FacetConfig::default())
    }
}

impl FacetPhase {
    pub fn new(config: &FacetConfig) -> Self {
        Self {
            batch_global_collectors: config.batch_global_collectors,
        }
    }

    /// Wires local facets into the main query before it runs.
    pub fn pre_process(&self, context: &mut SearchContext) -> Result<()> {
        let facets = match context.facets() {
            Some(facets) => facets,
            None => return Ok(()),
        };
        if !facets.has_query()
            || context.query_result().facet_state() != FacetPhaseState::Unconfigured
        {
            return Ok(());
        }

        let mut collectors = 0;
        let mut retain_doc_sets = false;
        for entry in facets.entries().iter().filter(|entry| !entry.is_global()) {
            match entry.executor() {
                FacetExecutor::Collector(executor) => {
                    let mut collector = executor.collector();
                    if let Some(filter) = entry.filter() {
                        let weight = filter
                            .weight(context.searcher().searcher())
                            .map_err(|source| facet_failure(context.id(), entry.name(), source))?;
                        collector = Box::new(FilteredCollector::new(collector, weight));
                    }
                    context.searcher_mut().add_main_query_collector(collector);
                    collectors += 1;
                }
                FacetExecutor::Post(_) => {
                    context.searcher_mut().enable_main_doc_set_collector();
                    retain_doc_sets = true;
                }
            }
        }

        context.query_result_mut().mark_pre_processed();
        debug!(
            context = %context.id(),
            collectors,
            retain_doc_sets,
            "Facet phase pre-processed"
        );
        Ok(())
    }

    /// Computes every facet of the context once and stores them in request order.
    ///
    /// Expects the main query to have run. Calling it again once facets are
    /// stored does nothing.
    pub fn execute(&self, context: &mut SearchContext) -> Result<()> {
        let facets = match context.facets() {
            Some(facets) => facets,
            None => return Ok(()),
        };
        if context.query_result().has_facets() {
            trace!(context = %context.id(), "Facets already computed");
            return Ok(());
        }

        let context_id = context.id().clone();
        match self.compute(context, &facets, &context_id) {
            Ok((computed, metrics)) => {
                context.query_result_mut().set_facets(computed)?;
                log_phase_success(&context_id, &metrics);
                Ok(())
            }
            Err(error) => {
                log_phase_failure(&context_id, &error);
                Err(error)
            }
        }
    }

    fn compute(
        &self,
        context: &mut SearchContext,
        facets: &SearchContextFacets,
        context_id: &ContextId,
    ) -> Result<(Facets, FacetPhaseMetrics)> {
        let mut telemetry = PhaseTelemetry::new();

        self.run_post_entries(context, facets, context_id)?;
        telemetry.mark_stage(STAGE_POST);

        let groups = self.group_global_collectors(facets);
        let group_count = groups.len();
        let scans_before = context.searcher().stats().auxiliary_scans;
        for group in groups {
            self.run_global_group(context, group, context_id)?;
        }
        let global_scans = context.searcher().stats().auxiliary_scans - scans_before;
        telemetry.mark_stage(STAGE_GLOBAL_COLLECTORS);

        let mut computed = Vec::with_capacity(facets.len());
        for entry in facets.entries() {
            let facet = entry
                .executor()
                .build_facet(entry.name())
                .map_err(|source| facet_failure(context_id, entry.name(), source))?;
            computed.push(facet);
        }
        telemetry.mark_stage(STAGE_BUILD);

        Ok((
            Facets::new(computed),
            telemetry.finish(facets.len(), group_count, global_scans),
        ))
    }

    /// Feeds post facets: local ones from the main query's matches, global
    /// ones from every live document of the index.
    fn run_post_entries(
        &self,
        context: &SearchContext,
        facets: &SearchContextFacets,
        context_id: &ContextId,
    ) -> Result<()> {
        let searcher = context.searcher();
        let mut local_doc_sets: Option<Vec<LeafDocSet<'_>>> = None;
        let mut global_doc_sets: Option<Vec<LeafDocSet<'_>>> = None;

        for entry in facets.entries() {
            let executor = match entry.executor() {
                FacetExecutor::Post(executor) => executor,
                FacetExecutor::Collector(_) => continue,
            };

            let result = if entry.is_global() {
                // Global scope ignores the query: its population is the index.
                let doc_sets =
                    global_doc_sets.get_or_insert_with(|| live_doc_sets(searcher.searcher()));
                run_post(executor.as_ref(), entry.filter(), searcher, doc_sets)
            } else {
                if local_doc_sets.is_none() {
                    local_doc_sets = Some(
                        searcher
                            .main_doc_sets()
                            .map_err(|source| facet_failure(context_id, entry.name(), source))?,
                    );
                }
                let doc_sets = local_doc_sets.as_deref().unwrap_or(&[]);
                run_post(executor.as_ref(), entry.filter(), searcher, doc_sets)
            };
            result.map_err(|source| facet_failure(context_id, entry.name(), source))?;
        }
        Ok(())
    }

    fn group_global_collectors(&self, facets: &SearchContextFacets) -> Vec<CollectorGroup> {
        let mut groups: Vec<CollectorGroup> = Vec::new();
        let mut by_filter: HashMap<Filter, usize> = HashMap::new();

        for entry in facets.entries().iter().filter(|entry| entry.is_global()) {
            let executor = match entry.executor() {
                FacetExecutor::Collector(executor) => executor,
                FacetExecutor::Post(_) => continue,
            };

            let filter = entry
                .filter()
                .map(Filter::normalize)
                .unwrap_or(Filter::MatchAll);
            let index = if self.batch_global_collectors {
                *by_filter.entry(filter.clone()).or_insert_with(|| {
                    groups.push(CollectorGroup::new(filter));
                    groups.len() - 1
                })
            } else {
                groups.push(CollectorGroup::new(filter));
                groups.len() - 1
            };

            let group = &mut groups[index];
            group.collectors.push(executor.collector());
            group.facets.push(entry.name().to_string());
        }
        groups
    }

    /// One index scan shared by every collector of the group.
    fn run_global_group(
        &self,
        context: &mut SearchContext,
        group: CollectorGroup,
        context_id: &ContextId,
    ) -> Result<()> {
        let CollectorGroup {
            filter,
            collectors,
            facets,
        } = group;

        let scope = match context.search_filter() {
            Some(type_filter) => Filter::and(vec![filter.clone(), type_filter]).normalize(),
            None => filter.clone(),
        };
        let query: Box<dyn Query> = Box::new(ConstScoreQuery::new(
            scope
                .to_query(context.schema())
                .map_err(|source| global_failure(context_id, &filter, source))?,
            1.0,
        ));

        debug!(
            context = %context_id,
            filter = %scope,
            facets = ?facets,
            "Running global facet scan"
        );

        let mut collector = MultiCollector::new(collectors);
        context
            .searcher_mut()
            .search(query.as_ref(), &mut collector)
            .map_err(|source| global_failure(context_id, &filter, source))?;
        // Collectors driven outside the main query must be told the scan ended.
        collector
            .post_collection()
            .map_err(|source| global_failure(context_id, &filter, source))
    }
}

/// Global collectors sharing one normalized filter.
struct CollectorGroup {
    filter: Filter,
    collectors: Vec<Box<dyn Collector>>,
    facets: Vec<String>,
}

impl CollectorGroup {
    fn new(filter: Filter) -> Self {
        Self {
            filter,
            collectors: Vec::new(),
            facets: Vec::new(),
        }
    }
}

fn run_post(
    executor: &dyn PostExecutor,
    filter: Option<&Filter>,
    searcher: &ContextSearcher,
    doc_sets: &[LeafDocSet<'_>],
) -> Result<()> {
    let mut post = executor.post();
    if let Some(filter) = filter {
        post = Box::new(FilteredPost::new(post, filter.weight(searcher.searcher())?));
    }
    post.execute_post(doc_sets)
}

fn facet_failure(context: &ContextId, facet: &str, source: Error) -> Error {
    Error::FacetExecution {
        context: context.clone(),
        facet: facet.to_string(),
        source: Box::new(source),
    }
}

fn global_failure(context: &ContextId, filter: &Filter, source: Error) -> Error {
    Error::GlobalFacetExecution {
        context: context.clone(),
        filter: filter.to_string(),
        source: Box::new(source),
    }
}
