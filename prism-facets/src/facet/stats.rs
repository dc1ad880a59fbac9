use crate::facet::executor::{CollectorExecutor, FacetPost, PostExecutor};
use crate::facet::{Facet, FacetValue, StatsResult};
use crate::index::{LeafContext, LeafDocSet};
use crate::search::Collector;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tantivy::fastfield::Column;
use tantivy::schema::FieldType;
use tantivy::{DocId, Score, SegmentReader};

/// Fast field reader of one segment, widened to `f64`.
enum NumericColumn {
    U64(Column<u64>),
    I64(Column<i64>),
    F64(Column<f64>),
}

impl NumericColumn {
    fn open(reader: &SegmentReader, field: &str) -> Result<Self> {
        let schema = reader.schema();
        let field_entry = schema.get_field_entry(schema.get_field(field)?);
        let fast_fields = reader.fast_fields();
        let column = match field_entry.field_type() {
            FieldType::U64(_) => NumericColumn::U64(fast_fields.u64(field)?),
            FieldType::I64(_) => NumericColumn::I64(fast_fields.i64(field)?),
            FieldType::F64(_) => NumericColumn::F64(fast_fields.f64(field)?),
            _ => {
                return Err(Error::Facet(format!(
                    "field [{}] is not a numeric fast field",
                    field
                )))
            }
        };
        Ok(column)
    }

    fn first(&self, doc: DocId) -> Option<f64> {
        match self {
            NumericColumn::U64(column) => column.first(doc).map(|v| v as f64),
            NumericColumn::I64(column) => column.first(doc).map(|v| v as f64),
            NumericColumn::F64(column) => column.first(doc),
        }
    }
}

#[derive(Debug, Default)]
struct StatsState {
    count: u64,
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
    built: bool,
}

impl StatsState {
    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    fn result(&self) -> StatsResult {
        if self.count == 0 {
            return StatsResult {
                count: 0,
                min: None,
                max: None,
                sum: None,
                avg: None,
            };
        }
        StatsResult {
            count: self.count,
            min: self.min,
            max: self.max,
            sum: Some(self.sum),
            avg: Some(self.sum / self.count as f64),
        }
    }
}

/// count/min/max/sum/avg over a numeric fast field.
#[derive(Debug, Clone)]
pub struct StatsFacetExecutor {
    field: String,
    state: Arc<Mutex<StatsState>>,
}

impl StatsFacetExecutor {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            state: Arc::new(Mutex::new(StatsState::default())),
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
        Ok(Facet::new(name, FacetValue::Stats(state.result())))
    }
}

struct StatsCollector {
    field: String,
    column: Option<NumericColumn>,
    state: Arc<Mutex<StatsState>>,
}

impl Collector for StatsCollector {
    fn set_leaf(&mut self, leaf: &LeafContext<'_>) -> Result<()> {
        self.column = Some(NumericColumn::open(leaf.reader(), &self.field)?);
        Ok(())
    }

    fn collect(&mut self, doc: DocId, _score: Score) -> Result<()> {
        let column = self
            .column
            .as_ref()
            .ok_or_else(|| Error::IllegalState("collect called before set_leaf".to_string()))?;
        if let Some(value) = column.first(doc) {
            self.state.lock().observe(value);
        }
        Ok(())
    }
}

struct StatsPost {
    field: String,
    state: Arc<Mutex<StatsState>>,
}

impl FacetPost for StatsPost {
    fn execute_post(&mut self, doc_sets: &[LeafDocSet<'_>]) -> Result<()> {
        for set in doc_sets {
            if set.is_empty() {
                continue;
            }
            let column = NumericColumn::open(set.leaf.reader(), &self.field)?;
            let mut state = self.state.lock();
            for doc in set.docs.iter() {
                if let Some(value) = column.first(doc) {
                    state.observe(value);
                }
            }
        }
        Ok(())
    }
}

impl CollectorExecutor for StatsFacetExecutor {
    fn collector(&self) -> Box<dyn Collector> {
        Box::new(StatsCollector {
            field: self.field.clone(),
            column: None,
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}

impl PostExecutor for StatsFacetExecutor {
    fn post(&self) -> Box<dyn FacetPost> {
        Box::new(StatsPost {
            field: self.field.clone(),
            state: Arc::clone(&self.state),
        })
    }

    fn build_facet(&self, name: &str) -> Result<Facet> {
        self.build(name)
    }
}
