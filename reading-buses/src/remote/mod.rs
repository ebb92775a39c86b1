//! Everything that talks to (or stands in for) the open-data API.

mod endpoints;
mod error_payload;
mod mock;
mod siri;
mod source;

pub use endpoints::Endpoints;
pub use error_payload::{ErrorPayload, classify_fetch, classify_payload, structured_error};
pub use mock::{MockResponse, MockSource};
pub use siri::parse_predictions;
pub use source::{FetchError, HttpSource, RemoteSource};
