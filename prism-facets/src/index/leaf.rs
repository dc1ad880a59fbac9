use roaring::RoaringBitmap;
use std::fmt;
use tantivy::{DocId, Searcher, SegmentOrdinal, SegmentReader};

/// Read-only view of one segment of the index.
#[derive(Clone, Copy)]
pub struct LeafContext<'a> {
    ord: SegmentOrdinal,
    reader: &'a SegmentReader,
}

impl<'a> LeafContext<'a> {
    pub fn new(ord: SegmentOrdinal, reader: &'a SegmentReader) -> Self {
        Self { ord, reader }
    }

    pub fn ord(&self) -> SegmentOrdinal {
        self.ord
    }

    pub fn reader(&self) -> &'a SegmentReader {
        self.reader
    }

    pub fn max_doc(&self) -> DocId {
        self.reader.max_doc()
    }

    pub fn is_alive(&self, doc: DocId) -> bool {
        self.reader
            .alive_bitset()
            .map_or(true, |bitset| bitset.is_alive(doc))
    }

    /// Every document of the segment that has not been deleted.
    pub fn alive_docs(&self) -> RoaringBitmap {
        let mut docs = RoaringBitmap::new();
        match self.reader.alive_bitset() {
            Some(bitset) => docs.extend(bitset.iter_alive()),
            None => {
                docs.insert_range(0..self.max_doc());
            }
        }
        docs
    }
}

impl fmt::Debug for LeafContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeafContext")
            .field("ord", &self.ord)
            .field("max_doc", &self.max_doc())
            .field("num_docs", &self.reader.num_docs())
            .finish()
    }
}

/// All segments of a searcher, in segment order.
pub fn leaves(searcher: &Searcher) -> Vec<LeafContext<'_>> {
    searcher
        .segment_readers()
        .iter()
        .enumerate()
        .map(|(ord, reader)| LeafContext::new(ord as SegmentOrdinal, reader))
        .collect()
}

/// A segment paired with a set of its document ids.
#[derive(Debug, Clone)]
pub struct LeafDocSet<'a> {
    pub leaf: LeafContext<'a>,
    pub docs: RoaringBitmap,
}

impl<'a> LeafDocSet<'a> {
    pub fn new(leaf: LeafContext<'a>, docs: RoaringBitmap) -> Self {
        Self { leaf, docs }
    }

    pub fn len(&self) -> u64 {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

/// Live documents of every segment, independent of any query.
pub fn live_doc_sets(searcher: &Searcher) -> Vec<LeafDocSet<'_>> {
    leaves(searcher)
        .into_iter()
        .map(|leaf| {
            let docs = leaf.alive_docs();
            LeafDocSet::new(leaf, docs)
        })
        .collect()
}
