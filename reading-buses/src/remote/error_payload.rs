//! Classification of remote failures into `BadQuery` and `Critical`.
//!
//! When the API rejects a request it answers with
//! `{"status": false, "code": 401, "message": "..."}` instead of the resource.
//! Anything else that goes wrong is critical.

use serde::{Deserialize, Deserializer};

use crate::error::BusApiError;

use super::FetchError;

/// The API's structured error body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorPayload {
    pub status: bool,

    #[serde(default, deserialize_with = "lenient_code")]
    pub code: Option<i64>,

    #[serde(default)]
    pub message: Option<String>,
}

/// `code` arrives as a number or a numeric string.
fn lenient_code<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Str(String),
    }

    Ok(match Option::<Raw>::deserialize(d)? {
        Some(Raw::Num(n)) => Some(n),
        Some(Raw::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// The structured error carried by `body`, if there is one.
pub fn structured_error(body: &[u8]) -> Option<BusApiError> {
    let payload: ErrorPayload = serde_json::from_slice(body).ok()?;
    if payload.status {
        return None;
    }
    let message = payload.message.filter(|m| !m.trim().is_empty())?;
    Some(BusApiError::BadQuery {
        code: payload.code,
        message,
    })
}

/// Classify a payload the caller could not decode.
pub fn classify_payload(body: &[u8], cause: impl std::fmt::Display) -> BusApiError {
    structured_error(body).unwrap_or_else(|| {
        let preview: String = String::from_utf8_lossy(body).chars().take(500).collect();
        BusApiError::critical(format!("{cause} (body: {preview})"))
    })
}

/// Classify a failed fetch.
pub fn classify_fetch(err: FetchError) -> BusApiError {
    match &err {
        FetchError::Status { body, .. } => {
            structured_error(body.as_bytes()).unwrap_or_else(|| BusApiError::critical(err.to_string()))
        }
        _ => BusApiError::critical(err.to_string()),
    }
}
