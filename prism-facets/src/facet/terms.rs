use crate::facet::executor::{CollectorExecutor, FacetPost, PostExecutor};
use crate::facet::{Bucket, Facet, FacetValue, TermsResult};
use crate::index::{LeafContext, LeafDocSet};
use crate::search::Collector;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tantivy::columnar::StrColumn;
use tantivy::{DocId, Score, SegmentReader};

#[derive(Debug, Default)]
struct TermsState {
    counts: HashMap<String, u64>,
    missing: u64,
    total: u64,
    built: bool,
}

impl TermsState {
    fn result(&self, size: usize) -> TermsResult {
        let mut buckets: Vec<Bucket> = self
            .counts
            .iter()
            .map(|(key, count)| Bucket {
                key: key.clone(),
                count: *count,
            })
            .collect();

        buckets.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
        buckets.truncate(size);

        let returned: u64 = buckets.iter().map(|bucket| bucket.count).sum();
        TermsResult {
            missing: self.missing,
            other: self.total - returned,
            total: self.total,
            buckets,
        }
    }
}

/// Per-segment term ordinal counts, resolved to strings when the segment is done.
struct SegmentTerms {
    column: Option<StrColumn>,
    ord_counts: Vec<u64>,
    missing: u64,
}

impl SegmentTerms {
    fn open(reader: &SegmentReader, field: &str) -> Result<Self> {
        let column = reader.fast_fields().str(field)?;
        let num_terms = column
            .as_ref()
            .map_or(0, |column| column.dictionary().num_terms());
        Ok(Self {
            column,
            ord_counts: vec![0; num_terms],
            missing: 0,
        })
    }

    fn collect(&mut self, doc: DocId) {
        let ord = self
            .column
            .as_ref()
            .and_then(|column| column.ords().first(doc));
        match ord {
            Some(ord) => self.ord_counts[ord as usize] += 1,
            None => self.missing += 1,
        }
    }

    fn flush_into(self, state: &mut TermsState) -> Result<()> {
        state.missing += self.missing;
        let column = match self.column {
            Some(column) => column,
            None => return Ok(()),
        };

        let mut term = String::new();
        for (ord, count) in self.ord_counts.into_iter().enumerate() {
            if count == 0 {
                continue;
            }
            term.clear();
            if column.ord_to_str(ord as u64, &mut term)? {
                *state.counts.entry(term.clone()).or_insert(0) += count;
                state.total += count;
            }
        }
        Ok(())
    }
}

/// Most frequent values of a string fast field.
#[derive(Debug, Clone)]
pub struct TermsFacetExecutor {
    field: String,
    size: usize,
    state: Arc<Mutex<TermsState>>,
}

impl TermsFacetExecutor {
    pub fn new(field: impl Into<String>, size: usize) -> Self {
        Self {
            field: field.into(),
            size,
            state: Arc::new(Mutex::new(TermsState::default())),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn build(&self, name: &str) -> Result<Facet> {
        let mut state = self.state.lock();
        if state.built {
            return Err(Error::IllegalState(format!("facet [{}] was already built", name)));
        }
        state.built = true;
        Ok(Facet::new(name, FacetValue::Terms(state.result(self.size))))
    }
}

struct TermsCollector {
    field: String,
    segment: Option<SegmentTerms>,
    state: Arc<Mutex<TermsState>>,
}

impl TermsCollector {
    fn flush(&mut self) -> Result<()> {
        match self.segment.take() {
            Some(segment) => segment.flush_into(&mut self.state.lock()),
            None => Ok(()),
        }
    }
}

impl Collector for TermsCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.flush()?;
        self.segment = Some(SegmentTerms::open(leaf.reader(), &self.field)?);
        Ok(())
    }

    fn collect(&mut self, doc: DocId, _score: Score) -> Result<()> {
        match self.segment.as_mut() {
            Some(segment) => {
                segment.collect(doc);
                Ok(())
            }
            None => Err(Error::IllegalState(
                "collect called before set_leaf".to_string(),
            )),
        }
    }

    /// Buffered counts of the last segment only reach the facet here.
    fn post_collection(&mut self) -> Result<()> {
        self.flush()
    }
}

struct TermsPost {
    field: String,
    state: Arc<Mutex<TermsState>>,
}

impl FacetPost for TermsPost {
    fn execute_post(&mut self, doc_sets: &[LeafDocSet<'_>]) -> Result<()> {
        for set in doc_sets {
            if set.is_empty() {
                continue;
            }
            let mut segment = SegmentTerms::open(set.leaf.reader(), &self.field)?;
            for doc in set.docs.iter() {
                segment.collect(doc);
            }
            segment.flush_into(&mut self.state.lock())?;
        }
        Ok(())
    }
}

impl CollectorExecutor for TermsFacetExecutor {
    fn collector(&self) -> Box<dyn Collector> {
        Box::new(TermsCollector {
            field: self.field.clone(),
            segment: None,
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}

impl PostExecutor for TermsFacetExecutor {
    fn post(&self) -> Box<dyn FacetPost> {
        Box::new(TermsPost {
            field: self.field.clone(),
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}
