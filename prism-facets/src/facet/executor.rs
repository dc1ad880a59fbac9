use crate::facet::entry::FacetMode;
use crate::facet::Facet;
use crate::index::{FilterWeight, LeafDocSet};
use crate::search::Collector;
use crate::Result;
use std::fmt;

/// Consumes the matched documents of a finished scan, one batch per call.
pub trait FacetPost: Send {
    fn execute_post(&mut self, doc_sets: &[LeafDocSet<'_>]) -> Result<()>;
}

/// Facet fed document by document while a scan runs.
pub trait CollectorExecutor: Send + Sync {
    fn collector(&self) -> Box<dyn Collector>;

    /// Finalizes the accumulated state. Callable once.
    fn build_facet(&self, name: &str) -> Result<Facet>;
}

/// Facet computed afterwards from materialized doc id sets.
pub trait PostExecutor: Send + Sync {
    fn post(&self) -> Box<dyn FacetPost>;

    /// Finalizes the accumulated state. Callable once.
    fn build_facet(&self, name: &str) -> Result<Facet>;
}

/// Executor of one facet, fixed to a single collection mode when the request is parsed.
pub enum FacetExecutor {
    Collector(Box<dyn CollectorExecutor>),
    Post(Box<dyn PostExecutor>),
}

impl FacetExecutor {
    /// Wraps an executor that supports both modes, keeping only `mode`'s entry point.
    pub fn with_mode<E>(executor: E, mode: FacetMode) -> Self
    where
        E: CollectorExecutor + PostExecutor + 'static,
    {
        match mode {
            FacetMode::Collector => FacetExecutor::Collector(Box::new(executor)),
            FacetMode::Post => FacetExecutor::Post(Box::new(executor)),
        }
    }

    pub fn mode(&self) -> FacetMode {
        match self {
            FacetExecutor::Collector(_) => FacetMode::Collector,
            FacetExecutor::Post(_) => FacetMode::Post,
        }
    }

    pub fn build_facet(&self, name: &str) -> Result<Facet> {
        match self {
            FacetExecutor::Collector(executor) => executor.build_facet(name),
            FacetExecutor::Post(executor) => executor.build_facet(name),
        }
    }
}

impl fmt::Debug for FacetExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FacetExecutor").field(&self.mode()).finish()
    }
}

/// Restricts the doc sets handed to a post executor to those accepted by a filter.
pub struct FilteredPost {
    inner: Box<dyn FacetPost>,
    filter: FilterWeight,
}

impl FilteredPost {
    pub fn new(inner: Box<dyn FacetPost>, filter: FilterWeight) -> Self {
        Self { inner, filter }
    }
}

impl FacetPost for FilteredPost {
    fn execute_post(&mut self, doc_sets: &[LeafDocSet<'_>]) -> Result<()> {
        let filtered = doc_sets
            .iter()
            .map(|set| {
                let accepted = self.filter.leaf_docs(&set.leaf)?;
                Ok(LeafDocSet::new(set.leaf, &set.docs & &accepted))
            })
            .collect::<Result<Vec<_>>>()?;
        self.inner.execute_post(&filtered)
    }
}
