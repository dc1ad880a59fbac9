use crate::search::ContextId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{context} failed to execute facet [{facet}]: {source}")]
    FacetExecution {
        context: ContextId,
        facet: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{context} failed to execute global facets (filter: {filter}): {source}")]
    GlobalFacetExecution {
        context: ContextId,
        filter: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Facet error: {0}")]
    Facet(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),
}

impl Error {
    /// Stable name used in serialized failure payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::FacetExecution { .. } => "facet_execution",
            Error::GlobalFacetExecution { .. } => "global_facet_execution",
            Error::IllegalState(_) => "illegal_state",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidFilter(_) => "invalid_filter",
            Error::Facet(_) => "facet",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Tantivy(_) => "tantivy",
        }
    }

    /// Name of the facet a failure is attributed to, if any.
    pub fn facet_name(&self) -> Option<&str> {
        match self {
            Error::FacetExecution { facet, .. } => Some(facet),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&ContextId> {
        match self {
            Error::FacetExecution { context, .. } | Error::GlobalFacetExecution { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
