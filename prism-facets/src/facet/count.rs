use crate::facet::executor::{CollectorExecutor, FacetPost, PostExecutor};
use crate::facet::{Facet, FacetValue};
use crate::index::{LeafContext, LeafDocSet};
use crate::search::Collector;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tantivy::{DocId, Score};

#[derive(Debug, Default)]
struct CountState {
    count: u64,
    built: bool,
}

/// Counts the documents contributing to a facet.
#[derive(Debug, Clone, Default)]
pub struct CountFacetExecutor {
    state: Arc<Mutex<CountState>>,
}

impl CountFacetExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn build(&self, name: &str) -> Result<Facet> {
        let mut state = self.state.lock();
        if state.built {
            return Err(Error::IllegalState(format!("facet [{}] was already built", name)));
        }
        state.built = true;
        Ok(Facet::new(name, FacetValue::Count { count: state.count }))
    }
}

struct CountCollector {
    state: Arc<Mutex<CountState>>,
}

impl Collector for CountCollector {
    fn set_leaf(&mut self, _leaf: &LeafContext<'_>) -> Result<()> {
        Ok(())
    }

    fn collect(&mut self, _doc: DocId, _score: Score) -> Result<()> {
        self.state.lock().count += 1;
        Ok(())
    }
}

struct CountPost {
    state: Arc<Mutex<CountState>>,
}

impl FacetPost for CountPost {
    fn execute_post(&mut self, doc_sets: &[LeafDocSet<'_>]) -> Result<()> {
        let matched: u64 = doc_sets.iter().map(LeafDocSet::len).sum();
        self.state.lock().count += matched;
        Ok(())
    }
}

impl CollectorExecutor for CountFacetExecutor {
    fn collector(&self) -> Box<dyn Collector> {
        Box::new(CountCollector {
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}

impl PostExecutor for CountFacetExecutor {
    fn post(&self) -> Box<dyn FacetPost> {
        Box::new(CountPost {
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}
