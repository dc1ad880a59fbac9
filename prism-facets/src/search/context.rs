use crate::config::SearchConfig;
use crate::facet::{Facets, SearchContextFacets};
use crate::index::{Filter, TypeMapper};
use crate::search::collector::TopHits;
use crate::search::searcher::ContextSearcher;
use crate::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tantivy::query::{AllQuery, BooleanQuery, ConstScoreQuery, Occur, Query, QueryClone};
use tantivy::schema::Schema;
use tantivy::Searcher;

/// Identity of a search context, used to attribute failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ContextId {
    pub index: String,
    pub shard: u32,
    pub id: u64,
}

impl ContextId {
    pub fn new(index: impl Into<String>, shard: u32, id: u64) -> Self {
        Self {
            index: index.into(),
            shard,
            id,
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}][{}] {}", self.index, self.shard, self.id)
    }
}

/// Progress of the facet phase on one context. There is no way back from `Executed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FacetPhaseState {
    #[default]
    Unconfigured,
    PreProcessed,
    Executed,
}

/// Per-context results slot.
#[derive(Debug, Default)]
pub struct QuerySearchResult {
    top_hits: Option<TopHits>,
    facets: Option<Facets>,
    facet_state: FacetPhaseState,
}

impl QuerySearchResult {
    pub fn top_hits(&self) -> Option<&TopHits> {
        self.top_hits.as_ref()
    }

    pub fn set_top_hits(&mut self, top_hits: TopHits) {
        self.top_hits = Some(top_hits);
    }

    pub fn facets(&self) -> Option<&Facets> {
        self.facets.as_ref()
    }

    /// Whether facets were already computed for this context.
    pub fn has_facets(&self) -> bool {
        self.facets.is_some()
    }

    /// Stores the computed facets. They can be set only once.
    pub fn set_facets(&mut self, facets: Facets) -> Result<()> {
        if self.facets.is_some() {
            return Err(Error::IllegalState(
                "facets were already computed for this context".to_string(),
            ));
        }
        self.facets = Some(facets);
        self.facet_state = FacetPhaseState::Executed;
        Ok(())
    }

    pub fn facet_state(&self) -> FacetPhaseState {
        self.facet_state
    }

    pub(crate) fn mark_pre_processed(&mut self) {
        if self.facet_state == FacetPhaseState::Unconfigured {
            self.facet_state = FacetPhaseState::PreProcessed;
        }
    }
}

/// Everything one shard-level search request needs across its phases.
pub struct SearchContext {
    id: ContextId,
    searcher: ContextSearcher,
    query: Box<dyn Query>,
    types: Vec<String>,
    mapper: TypeMapper,
    facets: Option<Arc<SearchContextFacets>>,
    size: usize,
    query_result: QuerySearchResult,
}

impl SearchContext {
    pub fn new(id: ContextId, searcher: Searcher, config: &SearchConfig) -> Self {
        Self {
            id,
            searcher: ContextSearcher::new(searcher),
            query: Box::new(AllQuery),
            types: Vec::new(),
            mapper: TypeMapper::new(config.type_field.clone()),
            facets: None,
            size: config.default_size,
            query_result: QuerySearchResult::default(),
        }
    }

    pub fn with_query(mut self, query: Box<dyn Query>) -> Self {
        self.query = query;
        self
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }

    pub fn with_facets(mut self, facets: SearchContextFacets) -> Self {
        self.facets = Some(Arc::new(facets));
        self
    }

    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn id(&self) -> &ContextId {
        &self.id
    }

    pub fn searcher(&self) -> &ContextSearcher {
        &self.searcher
    }

    pub fn searcher_mut(&mut self) -> &mut ContextSearcher {
        &mut self.searcher
    }

    pub fn schema(&self) -> &Schema {
        self.searcher.schema()
    }

    pub fn query(&self) -> &dyn Query {
        self.query.as_ref()
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Type-scoping filter for the requested types, if any.
    pub fn search_filter(&self) -> Option<Filter> {
        self.mapper.search_filter(&self.types)
    }

    pub fn facets(&self) -> Option<Arc<SearchContextFacets>> {
        self.facets.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn query_result(&self) -> &QuerySearchResult {
        &self.query_result
    }

    pub fn query_result_mut(&mut self) -> &mut QuerySearchResult {
        &mut self.query_result
    }

    /// The main query, restricted to the requested types.
    pub fn main_query(&self) -> Result<Box<dyn Query>> {
        let query = self.query.box_clone();
        match self.search_filter() {
            None => Ok(query),
            Some(filter) => {
                let scope: Box<dyn Query> =
                    Box::new(ConstScoreQuery::new(filter.to_query(self.schema())?, 0.0));
                Ok(Box::new(BooleanQuery::new(vec![
                    (Occur::Must, query),
                    (Occur::Must, scope),
                ])))
            }
        }
    }
}

impl fmt::Debug for SearchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchContext")
            .field("id", &self.id)
            .field("types", &self.types)
            .field("size", &self.size)
            .field("facets", &self.facets.as_ref().map(|facets| facets.len()))
            .field("facet_state", &self.query_result.facet_state)
            .finish()
    }
}
