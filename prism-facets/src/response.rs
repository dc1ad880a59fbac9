//! JSON payloads reporting the outcome of a facet phase.

use crate::facet::Facets;
use crate::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet: Option<String>,
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind().to_string(),
            reason: error.to_string(),
            context: error.context().map(ToString::to_string),
            facet: error.facet_name().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FacetResponse {
    Success { ok: bool, facets: Facets },
    Failure { ok: bool, error: ErrorBody },
}

impl FacetResponse {
    pub fn success(facets: Facets) -> Self {
        FacetResponse::Success { ok: true, facets }
    }

    pub fn failure(error: &Error) -> Self {
        FacetResponse::Failure {
            ok: false,
            error: ErrorBody::from(error),
        }
    }

    /// Reports stored facets or the error that prevented them.
    ///
    /// A successful phase without a facet request reports an empty map.
    pub fn from_result(result: Result<Option<&Facets>>) -> Self {
        match result {
            Ok(facets) => Self::success(facets.cloned().unwrap_or_default()),
            Err(error) => Self::failure(&error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, FacetResponse::Success { .. })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
