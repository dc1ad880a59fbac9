use crate::facet::executor::FacetExecutor;
use crate::index::Filter;
use serde::Serialize;

/// Population of a facet: the query's matches, or every live document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetScope {
    Local,
    Global,
}

/// How a facet observes its documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetMode {
    /// Incrementally, while a scan runs.
    Collector,
    /// Afterwards, from the materialized matched doc ids.
    Post,
}

/// One requested facet. Immutable once built.
#[derive(Debug)]
pub struct FacetEntry {
    name: String,
    scope: FacetScope,
    filter: Option<Filter>,
    executor: FacetExecutor,
}

impl FacetEntry {
    pub fn new(
        name: impl Into<String>,
        scope: FacetScope,
        filter: Option<Filter>,
        executor: FacetExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            scope,
            filter,
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> FacetScope {
        self.scope
    }

    pub fn is_global(&self) -> bool {
        self.scope == FacetScope::Global
    }

    pub fn mode(&self) -> FacetMode {
        self.executor.mode()
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    pub fn executor(&self) -> &FacetExecutor {
        &self.executor
    }
}

/// The ordered facets attached to a search context.
#[derive(Debug)]
pub struct SearchContextFacets {
    entries: Vec<FacetEntry>,
    has_query: bool,
    has_global: bool,
}

impl SearchContextFacets {
    pub fn new(entries: Vec<FacetEntry>) -> Self {
        let has_query = entries.iter().any(|entry| !entry.is_global());
        let has_global = entries.iter().any(FacetEntry::is_global);
        Self {
            entries,
            has_query,
            has_global,
        }
    }

    pub fn entries(&self) -> &[FacetEntry] {
        &self.entries
    }

    /// Whether some facet depends on the main query's matches.
    pub fn has_query(&self) -> bool {
        self.has_query
    }

    pub fn has_global(&self) -> bool {
        self.has_global
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
