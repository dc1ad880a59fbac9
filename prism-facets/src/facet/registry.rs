//! Turns typed facet requests into the entries a search context executes.

use crate::facet::entry::{FacetEntry, FacetMode, FacetScope, SearchContextFacets};
use crate::facet::executor::FacetExecutor;
use crate::facet::{CountFacetExecutor, StatsFacetExecutor, TermsFacetExecutor};
use crate::index::Filter;
use crate::{Error, Result};
use std::collections::HashSet;
use tantivy::schema::{FieldType, Schema};

#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    Count,
    Stats { field: String },
    Terms { field: String, size: usize },
}

impl FacetKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FacetKind::Count => "count",
            FacetKind::Stats { .. } => "stats",
            FacetKind::Terms { .. } => "terms",
        }
    }

    /// Mode used when the request does not pick one.
    ///
    /// A global count only needs the size of each live doc set, so it avoids a
    /// full index scan by running in post mode.
    pub fn default_mode(&self, scope: FacetScope) -> FacetMode {
        match (self, scope) {
            (FacetKind::Count, FacetScope::Global) => FacetMode::Post,
            _ => FacetMode::Collector,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FacetRequest {
    pub name: String,
    pub kind: FacetKind,
    pub scope: FacetScope,
    pub mode: Option<FacetMode>,
    pub filter: Option<Filter>,
}

impl FacetRequest {
    pub fn new(name: impl Into<String>, kind: FacetKind) -> Self {
        Self {
            name: name.into(),
            kind,
            scope: FacetScope::Local,
            mode: None,
            filter: None,
        }
    }

    pub fn count(name: impl Into<String>) -> Self {
        Self::new(name, FacetKind::Count)
    }

    pub fn stats(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(
            name,
            FacetKind::Stats {
                field: field.into(),
            },
        )
    }

    pub fn terms(name: impl Into<String>, field: impl Into<String>, size: usize) -> Self {
        Self::new(
            name,
            FacetKind::Terms {
                field: field.into(),
                size,
            },
        )
    }

    pub fn global(mut self) -> Self {
        self.scope = FacetScope::Global;
        self
    }

    pub fn mode(mut self, mode: FacetMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Validates requests against an index schema and builds their executors.
#[derive(Debug, Clone)]
pub struct FacetRegistry {
    schema: Schema,
}

impl FacetRegistry {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn build(&self, requests: Vec<FacetRequest>) -> Result<SearchContextFacets> {
        let mut names = HashSet::with_capacity(requests.len());
        let mut entries = Vec::with_capacity(requests.len());

        for request in requests {
            if request.name.is_empty() {
                return Err(Error::InvalidRequest("facet name must not be empty".to_string()));
            }
            if !names.insert(request.name.clone()) {
                return Err(Error::InvalidRequest(format!(
                    "duplicate facet name [{}]",
                    request.name
                )));
            }
            if let Some(filter) = &request.filter {
                filter.to_query(&self.schema).map_err(|e| {
                    Error::InvalidRequest(format!("facet [{}]: {}", request.name, e))
                })?;
            }

            let mode = request
                .mode
                .unwrap_or_else(|| request.kind.default_mode(request.scope));
            let executor = self.executor(&request, mode)?;

            tracing::trace!(
                facet = %request.name,
                kind = request.kind.type_name(),
                scope = ?request.scope,
                mode = ?mode,
                filtered = request.filter.is_some(),
                "Registered facet"
            );
            entries.push(FacetEntry::new(
                request.name,
                request.scope,
                request.filter,
                executor,
            ));
        }

        Ok(SearchContextFacets::new(entries))
    }

    fn executor(&self, request: &FacetRequest, mode: FacetMode) -> Result<FacetExecutor> {
        let executor = match &request.kind {
            FacetKind::Count => FacetExecutor::with_mode(CountFacetExecutor::new(), mode),
            FacetKind::Stats { field } => {
                self.check_fast_field(&request.name, field, |field_type| {
                    matches!(
                        field_type,
                        FieldType::U64(_) | FieldType::I64(_) | FieldType::F64(_)
                    )
                })?;
                FacetExecutor::with_mode(StatsFacetExecutor::new(field.clone()), mode)
            }
            FacetKind::Terms { field, size } => {
                if *size == 0 {
                    return Err(Error::InvalidRequest(format!(
                        "facet [{}]: size must be positive",
                        request.name
                    )));
                }
                self.check_fast_field(&request.name, field, |field_type| {
                    matches!(field_type, FieldType::Str(_))
                })?;
                FacetExecutor::with_mode(TermsFacetExecutor::new(field.clone(), *size), mode)
            }
        };
        Ok(executor)
    }

    fn check_fast_field(
        &self,
        facet: &str,
        field: &str,
        accepts: impl Fn(&FieldType) -> bool,
    ) -> Result<()> {
        let entry = self
            .schema
            .get_field(field)
            .map(|f| self.schema.get_field_entry(f))
            .map_err(|_| {
                Error::InvalidRequest(format!("facet [{}]: unknown field [{}]", facet, field))
            })?;

        if !entry.is_fast() || !accepts(entry.field_type()) {
            return Err(Error::InvalidRequest(format!(
                "facet [{}]: field [{}] has an unsupported type or is not a fast field",
                facet, field
            )));
        }
        Ok(())
    }
}
