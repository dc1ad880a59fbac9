//! Facets: named summaries computed alongside a query.

pub mod count;
pub mod entry;
pub mod executor;
pub mod phase;
pub mod registry;
pub mod stats;
pub mod telemetry;
pub mod terms;

pub use count::CountFacetExecutor;
pub use entry::{FacetEntry, FacetMode, FacetScope, SearchContextFacets};
pub use executor::{CollectorExecutor, FacetExecutor, FacetPost, FilteredPost, PostExecutor};
pub use phase::FacetPhase;
pub use registry::{FacetKind, FacetRegistry, FacetRequest};
pub use stats::StatsFacetExecutor;
pub use terms::TermsFacetExecutor;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResult {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub key: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermsResult {
    /// Contributing documents without a value.
    pub missing: u64,
    /// Values counted outside the returned buckets.
    pub other: u64,
    pub total: u64,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "_type", rename_all = "snake_case")]
pub enum FacetValue {
    Count { count: u64 },
    Stats(StatsResult),
    Terms(TermsResult),
}

/// Final, immutable result of one facet.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    name: String,
    value: FacetValue,
}

impl Facet {
    pub fn new(name: impl Into<String>, value: FacetValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FacetValue {
        &self.value
    }
}

/// Facets of one context, in the order they were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facets {
    facets: Vec<Facet>,
}

impl Facets {
    pub fn new(facets: Vec<Facet>) -> Self {
        Self { facets }
    }

    pub fn get(&self, name: &str) -> Option<&Facet> {
        self.facets.iter().find(|facet| facet.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.facets.iter().map(|facet| facet.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

impl Serialize for Facets {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.facets.len()))?;
        for facet in &self.facets {
            map.serialize_entry(&facet.name, &facet.value)?;
        }
        map.end()
    }
}
