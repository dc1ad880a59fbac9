use crate::index::{leaves, LeafContext, LeafDocSet};
use crate::search::collector::{
    Collector, DocSetCollector, MultiCollector, TopHits, TopHitsCollector,
};
use crate::{Error, Result};
use std::time::Instant;
use tantivy::query::{EnableScoring, Query, Scorer};
use tantivy::schema::Schema;
use tantivy::{DocId, DocSet, Score, Searcher, TERMINATED};

/// Number of index scans issued through a [`ContextSearcher`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub main_scans: u64,
    pub auxiliary_scans: u64,
    pub docs_visited: u64,
}

impl ScanStats {
    pub fn total_scans(&self) -> u64 {
        self.main_scans + self.auxiliary_scans
    }
}

/// Searcher bound to one search context.
///
/// Besides plain scans it carries the extra work the main query must do for
/// other phases: collectors that observe every matching document, and an
/// optional per-segment record of the matched doc ids.
pub struct ContextSearcher {
    searcher: Searcher,
    main_collectors: Vec<Box<dyn Collector>>,
    doc_set_collector: Option<DocSetCollector>,
    stats: ScanStats,
}

impl ContextSearcher {
    pub fn new(searcher: Searcher) -> Self {
        Self {
            searcher,
            main_collectors: Vec::new(),
            doc_set_collector: None,
            stats: ScanStats::default(),
        }
    }

    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    pub fn schema(&self) -> &Schema {
        self.searcher.schema()
    }

    pub fn add_main_query_collector(&mut self, collector: Box<dyn Collector>) {
        self.main_collectors.push(collector);
    }

    pub fn main_query_collector_count(&self) -> usize {
        self.main_collectors.len()
    }

    /// Asks the main scan to retain matched doc ids. Calling it again is free.
    pub fn enable_main_doc_set_collector(&mut self) {
        if self.doc_set_collector.is_none() {
            self.doc_set_collector = Some(DocSetCollector::new());
        }
    }

    pub fn main_doc_set_collector(&self) -> Option<&DocSetCollector> {
        self.doc_set_collector.as_ref()
    }

    /// Per-segment matched doc ids retained by the main scan.
    pub fn main_doc_sets(&self) -> Result<Vec<LeafDocSet<'_>>> {
        self.doc_set_collector
            .as_ref()
            .map(|collector| collector.doc_sets(&self.searcher))
            .ok_or_else(|| {
                Error::IllegalState("main doc set collector was not enabled".to_string())
            })
    }

    /// Runs an auxiliary scan of the whole index.
    pub fn search(&mut self, query: &dyn Query, collector: &mut dyn Collector) -> Result<()> {
        self.stats.auxiliary_scans += 1;
        metrics::counter!("prism_facet_scans_total", "kind" => "auxiliary").increment(1);

        let visited = scan(&self.searcher, query, collector)?;
        self.stats.docs_visited += visited;
        Ok(())
    }

    /// Runs the main query, feeding every registered main query collector.
    pub fn execute_main_query(&mut self, query: &dyn Query, size: usize) -> Result<TopHits> {
        let start = Instant::now();
        self.stats.main_scans += 1;
        metrics::counter!("prism_facet_scans_total", "kind" => "main").increment(1);

        let mut main = MultiCollector::new(std::mem::take(&mut self.main_collectors));
        let mut doc_sets = self.doc_set_collector.take();
        let mut top_hits = TopHitsCollector::new(size);

        let result = {
            let mut fan_out = MainScan {
                top_hits: &mut top_hits,
                main: &mut main,
                doc_sets: doc_sets.as_mut(),
            };
            scan(&self.searcher, query, &mut fan_out)
        };
        self.doc_set_collector = doc_sets;
        let visited = result?;
        self.stats.docs_visited += visited;

        main.post_collection()?;

        let top_hits = top_hits.into_top_hits();
        tracing::debug!(
            total_hits = top_hits.total_hits,
            main_collectors = main.len(),
            retained_doc_sets = self.doc_set_collector.is_some(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Main query scan completed"
        );
        Ok(top_hits)
    }

    pub fn stats(&self) -> ScanStats {
        self.stats
    }
}

struct MainScan<'a> {
    top_hits: &'a mut TopHitsCollector,
    main: &'a mut MultiCollector,
    doc_sets: Option<&'a mut DocSetCollector>,
}

impl Collector for MainScan<'_> {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.top_hits.set_leaf(leaf)?;
        self.main.set_leaf(leaf)?;
        if let Some(doc_sets) = self.doc_sets.as_mut() {
            doc_sets.set_leaf(leaf)?;
        }
        Ok(())
    }

    fn collect(&mut self, doc: DocId, score: Score) -> Result<()> {
        self.top_hits.collect(doc, score)?;
        self.main.collect(doc, score)?;
        if let Some(doc_sets) = self.doc_sets.as_mut() {
            doc_sets.collect(doc, score)?;
        }
        Ok(())
    }
}

/// Visits every live document matching `query`, segment by segment.
fn scan(searcher: &Searcher, query: &dyn Query, collector: &mut dyn Collector) -> Result<u64> {
    let weight = query.weight(EnableScoring::enabled_from_searcher(searcher))?;
    let mut visited = 0;

    for leaf in leaves(searcher) {
        collector.set_leaf(&leaf)?;
        let mut scorer = weight.scorer(leaf.reader(), 1.0)?;
        let mut doc = scorer.doc();
        while doc != TERMINATED {
            if leaf.is_alive(doc) {
                collector.collect(doc, scorer.score())?;
                visited += 1;
            }
            doc = scorer.advance();
        }
    }
    Ok(visited)
}
