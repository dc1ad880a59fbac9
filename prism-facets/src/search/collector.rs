use crate::index::{FilterWeight, LeafContext, LeafDocSet};
use crate::Result;
use roaring::RoaringBitmap;
use serde::Serialize;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tantivy::{DocId, Score, Searcher, SegmentOrdinal};

/// Per-document consumer driven by an index scan.
///
/// A scan calls `set_leaf` once per segment, then `collect` for each matching
/// live document of that segment in ascending doc id order. Collectors run
/// outside the main query must be told explicitly that the scan ended via
/// `post_collection`.
pub trait Collector: Send {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()>;

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()>;

    fn post_collection(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Forwards only the documents accepted by a filter.
pub struct FilteredCollector {
    inner: Box<dyn Collector>,
    filter: FilterWeight,
    accepted: RoaringBitmap,
}

impl FilteredCollector {
    pub fn new(inner: Box<dyn Collector>, filter: FilterWeight) -> Self {
        Self {
            inner,
            filter,
            accepted: RoaringBitmap::new(),
        }
    }
}

impl Collector for FilteredCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.accepted = self.filter.leaf_docs(leaf)?;
        self.inner.set_leaf(leaf)
    }

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
        if self.accepted.contains(doc) {
            self.inner.collect(doc, score)?;
        }
        Ok(())
    }

    fn post_collection(&mut self) -> Result<()> {
        self.inner.post_collection()
    }
}

/// Fans each document out to several collectors in one pass.
#[derive(Default)]
pub struct MultiCollector {
    collectors: Vec<Box<dyn Collector>>,
}

impl MultiCollector {
    pub fn new(collectors: Vec<Box<dyn Collector>>) -> Self {
        Self { collectors }
    }

    pub fn push(&mut self, collector: Box<dyn Collector>) {
        self.collectors.push(collector);
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }
}

impl Collector for MultiCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        for collector in &mut self.collectors {
            collector.set_leaf(leaf)?;
        }
        Ok(())
    }

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
        for collector in &mut self.collectors {
            collector.collect(doc, score)?;
        }
        Ok(())
    }

    fn post_collection(&mut self) -> Result<()> {
        for collector in &mut self.collectors {
            collector.post_collection()?;
        }
        Ok(())
    }
}

/// Retains the ids of every document the main scan visits, per segment.
#[derive(Debug, Default)]
pub struct DocSetCollector {
    sets: Vec<(SegmentOrdinal, RoaringBitmap)>,
}

impl DocSetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matched documents of each visited segment, in segment order.
    pub fn doc_sets<'a>(&self, searcher: &'a Searcher) -> Vec<LeafDocSet<'a>> {
        self.sets
            .iter()
            .map(|(ord, docs)| {
                let leaf = LeafContext::new(*ord, searcher.segment_reader(*ord));
                LeafDocSet::new(leaf, docs.clone())
            })
            .collect()
    }
}

impl Collector for DocSetCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.sets.push((leaf.ord(), RoaringBitmap::new()));
        Ok(())
    }

    fn collect(&mut self, doc: DocId, _score: Score) -> Result<()> {
        if let Some((_, docs)) = self.sets.last_mut() {
            docs.insert(doc);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredDoc {
    pub score: Score,
    pub segment_ord: SegmentOrdinal,
    pub doc: DocId,
}

impl Eq for ScoredDoc {}

impl Ord for ScoredDoc {
    fn cmp(&self, other: &Self) -> Ordering {
        // Higher score first, then earlier document.
        self.score
            .total_cmp(&other.score)
            .then_with(|| (other.segment_ord, other.doc).cmp(&(self.segment_ord, self.doc)))
    }
}

impl PartialOrd for ScoredDoc {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopHits {
    pub total_hits: u64,
    pub hits: Vec<ScoredDoc>,
}

/// Upper bound on the heap preallocated for top hits; larger sizes grow on demand.
const INITIAL_HEAP_CAPACITY: usize = 1024;

/// Counts matches and keeps the `size` best scored documents.
#[derive(Debug)]
pub struct TopHitsCollector {
    size: usize,
    total_hits: u64,
    segment_ord: SegmentOrdinal,
    heap: BinaryHeap<Reverse<ScoredDoc>>,
}

impl TopHitsCollector {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            total_hits: 0,
            segment_ord: 0,
            heap: BinaryHeap::with_capacity(
                size.saturating_add(1).min(INITIAL_HEAP_CAPACITY),
            ),
        }
    }

    pub fn into_top_hits(self) -> TopHits {
        let mut hits: Vec<ScoredDoc> = self.heap.into_iter().map(|Reverse(hit)| hit).collect();
        hits.sort_by(|a, b| b.cmp(a));
        TopHits {
            total_hits: self.total_hits,
            hits,
        }
    }
}

impl Collector for TopHitsCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.segment_ord = leaf.ord();
        Ok(())
    }

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
        self.total_hits += 1;
        if self.size == 0 {
            return Ok(());
        }

        let hit = ScoredDoc {
            score,
            segment_ord: self.segment_ord,
            doc,
        };
        if self.heap.len() < self.size {
            self.heap.push(Reverse(hit));
        } else if let Some(Reverse(worst)) = self.heap.peek() {
            if hit > *worst {
                self.heap.pop();
                self.heap.push(Reverse(hit));
            }
        }
        Ok(())
    }
}
