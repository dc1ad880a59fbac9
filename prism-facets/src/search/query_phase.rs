use crate::config::FacetConfig;
use crate::facet::FacetPhase;
use crate::search::context::SearchContext;
use crate::Result;
use tracing::debug;

/// Runs the main query of a context and the facets that depend on it.
#[derive(Debug, Clone, Default)]
pub struct QueryPhase {
    facet_phase: FacetPhase,
}

impl QueryPhase {
    pub fn new(config: &FacetConfig) -> Self {
        Self {
            facet_phase: FacetPhase::new(config),
        }
    }

    pub fn pre_process(&self, context: &mut SearchContext) -> Result<()> {
        self.facet_phase.pre_process(context)
    }

    /// Executes the main scan unless an earlier stage already did, then the facets.
    pub fn execute(&self, context: &mut SearchContext) -> Result<()> {
        if context.query_result().top_hits().is_none() {
            let query = context.main_query()?;
            let size = context.size();
            let top_hits = context
                .searcher_mut()
                .execute_main_query(query.as_ref(), size)?;
            debug!(
                context = %context.id(),
                total_hits = top_hits.total_hits,
                "Query phase completed main scan"
            );
            context.query_result_mut().set_top_hits(top_hits);
        }

        self.facet_phase.execute(context)
    }
}
