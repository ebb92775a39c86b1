//! Library error types.
//!
//! Callers branch on these categories, so remote failures keep the split
//! between a structured API complaint (`BadQuery`) and everything else
//! (`Critical`).

use crate::domain::Company;

/// Errors returned by the Reading Buses client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BusApiError {
    /// The caller asked for something that can never succeed, detected before any I/O.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// The API answered with a structured error payload.
    #[error("bad query: {message}")]
    BadQuery { code: Option<i64>, message: String },

    /// The API failed or returned data we could not make sense of.
    #[error(
        "an unexplainable critical error has occurred, most likely in the Reading Buses API; \
         enable full error logs for details"
    )]
    Critical { detail: String },

    /// A lookup against the in-memory index found nothing.
    #[error("{kind} not found: {id:?}")]
    NotFound { kind: &'static str, id: String },

    /// More than one service matched an id/company pair.
    #[error("service {id:?} is not unique for {company}")]
    Ambiguous { id: String, company: Company },

    /// The registry has not been initialised with an API key yet.
    #[error("not initialised: call `initialise` with your API key first")]
    Uninitialised,

    /// Building the service and stop index failed.
    #[error("setup failed, check you have a valid Reading Buses API key: {0}")]
    Setup(#[source] Box<BusApiError>),

    /// Configuration was changed after the index was built.
    #[error("malformed configuration: {0}")]
    MalformedConfig(String),
}

impl BusApiError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        BusApiError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn critical(detail: impl Into<String>) -> Self {
        BusApiError::Critical {
            detail: detail.into(),
        }
    }

    /// Returns true for the `Critical` category.
    pub fn is_critical(&self) -> bool {
        matches!(self, BusApiError::Critical { .. })
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = BusApiError> = std::result::Result<T, E>;
