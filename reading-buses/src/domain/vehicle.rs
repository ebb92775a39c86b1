//! Live vehicle GPS positions.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::time::{lenient_f64, timestamp};
use super::{Company, Point, ServiceKey, company};

/// The last reported position of a bus in service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveVehiclePosition {
    #[serde(rename = "operator", with = "company::code")]
    pub company: Company,

    /// Fleet number, e.g. "414".
    pub vehicle: String,

    /// When the position was observed (UK local time).
    #[serde(with = "timestamp")]
    pub observed: NaiveDateTime,

    #[serde(with = "lenient_f64")]
    pub latitude: f64,

    #[serde(with = "lenient_f64")]
    pub longitude: f64,

    /// Service the bus is running, if any.
    #[serde(rename = "service", default)]
    pub service_id: Option<String>,
}

/// A past position of a bus, from the position history feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedPosition {
    #[serde(rename = "operator", with = "company::code")]
    pub company: Company,

    pub vehicle: String,

    #[serde(with = "timestamp")]
    pub observed: NaiveDateTime,

    #[serde(with = "lenient_f64")]
    pub latitude: f64,

    #[serde(with = "lenient_f64")]
    pub longitude: f64,
}

impl ArchivedPosition {
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl LiveVehiclePosition {
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// Reference to the service being run, if any.
    pub fn service_key(&self) -> Option<ServiceKey> {
        self.service_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(|id| ServiceKey::new(id, self.company))
    }

    /// Case-insensitive fleet number comparison.
    pub fn is_vehicle(&self, vehicle: &str) -> bool {
        self.vehicle.eq_ignore_ascii_case(vehicle)
    }
}
