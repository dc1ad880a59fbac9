pub mod collector;
pub mod context;
pub mod query_phase;
pub mod searcher;

pub use collector::{
    Collector, DocSetCollector, FilteredCollector, MultiCollector, ScoredDoc, TopHits,
    TopHitsCollector,
};
pub use context::{ContextId, FacetPhaseState, QuerySearchResult, SearchContext};
pub use query_phase::QueryPhase;
pub use searcher::{ContextSearcher, ScanStats};
