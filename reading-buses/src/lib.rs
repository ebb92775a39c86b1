//! Client for the Reading Buses open-data API.
//!
//! Typed access to bus services, stops, live vehicle positions, scheduled and
//! historic timetables, and stop arrival predictions. Service and stop lists
//! are loaded once into an in-memory index; responses are cached on disk and
//! re-fetched when they expire or can't be read back.
//!
//! ```no_run
//! # async fn run() -> reading_buses::Result<()> {
//! use reading_buses::{Company, Registry};
//!
//! let registry = Registry::new();
//! registry.set_cache_validity_days(3)?;
//! let buses = registry.initialise("my-api-key").await?;
//!
//! let service = buses.get_service("17", Company::ReadingBuses)?;
//! for stop in buses.service_stops(&service, None).await? {
//!     println!("{}", stop.common_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod index;
pub mod registry;
pub mod remote;

pub use client::{LIVE_POSITION_TTL, ReadingBuses};
pub use config::ClientConfig;
pub use domain::{BusService, BusStop, Company, Direction};
pub use error::{BusApiError, Result};
pub use registry::{LifecycleState, Registry};
