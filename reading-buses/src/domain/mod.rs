//! Domain types for the Reading Buses open-data feed.
//!
//! Wire records map straight onto these types with serde; the adapters in
//! [`company`] and the timestamp helpers hold the few places where the feed's
//! spelling differs from ours.

pub mod company;
mod journey;
mod prediction;
mod service;
mod stop;
mod time;
mod vehicle;

pub use company::Company;
pub use journey::{HistoricJourney, HistoricVisit, Journey, PatternStop, Visit};
pub use prediction::LiveRecord;
pub use service::{BusService, Direction, ServiceKey, service_sort_key, sort_services};
pub use stop::{BusStop, Point, StopRecord, merge_stop_records};
pub use time::{InvalidTimestamp, format_timestamp, parse_timestamp, window_end};
pub use vehicle::{ArchivedPosition, LiveVehiclePosition};
