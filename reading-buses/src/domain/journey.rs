//! Scheduled and historic journeys.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::time::{flag, optional_timestamp, timestamp};
use super::{Company, ServiceKey, company};

/// One trip of a service, as an ordered list of stop visits.
///
/// Scheduled timetables use [`Visit`]s; tracking history and live journey
/// details use [`HistoricVisit`]s (see [`HistoricJourney`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journey<V = Visit> {
    #[serde(rename = "Id", default)]
    pub id: i64,

    #[serde(rename = "Operator", with = "company::display_name")]
    pub company: Company,

    #[serde(rename = "LineRef")]
    pub service_id: String,

    #[serde(rename = "JourneyPattern", default)]
    pub journey_pattern: Option<String>,

    #[serde(rename = "RunningBoard", default)]
    pub running_board: Option<String>,

    #[serde(rename = "Duty", default)]
    pub duty: Option<String>,

    #[serde(rename = "JourneyCode", default)]
    pub journey_code: Option<String>,

    #[serde(rename = "ScheduledStart", with = "timestamp")]
    pub scheduled_start: NaiveDateTime,

    /// Only present on tracking-history journeys.
    #[serde(
        rename = "VehicleCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vehicle_code: Option<String>,

    #[serde(rename = "visits", default = "Vec::new")]
    pub visits: Vec<V>,
}

/// A journey as recorded by vehicle tracking.
pub type HistoricJourney = Journey<HistoricVisit>;

impl<V> Journey<V> {
    /// Reference to the service this journey belongs to.
    pub fn service_key(&self) -> ServiceKey {
        ServiceKey::new(&self.service_id, self.company)
    }
}

/// A scheduled call at a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    #[serde(rename = "Location")]
    pub acto_code: String,

    #[serde(rename = "Sequence", default)]
    pub sequence: u32,

    #[serde(rename = "LocationName", default)]
    pub location_name: String,

    #[serde(rename = "ScheduledArrivalTime", with = "timestamp")]
    pub scheduled_arrival: NaiveDateTime,

    #[serde(rename = "ScheduledDepartureTime", with = "timestamp")]
    pub scheduled_departure: NaiveDateTime,

    /// Whether the scheduled time here is authoritative rather than estimated.
    #[serde(rename = "TimingPoint", with = "flag", default)]
    pub timing_point: bool,
}

/// A recorded call at a stop, with what actually happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricVisit {
    #[serde(flatten)]
    pub visit: Visit,

    #[serde(rename = "ArrivalStatus", default)]
    pub arrival_status: Option<String>,

    #[serde(rename = "DepartureStatus", default)]
    pub departure_status: Option<String>,

    #[serde(rename = "ArrivalTime", with = "optional_timestamp", default)]
    pub actual_arrival: Option<NaiveDateTime>,

    #[serde(rename = "DepartureTime", with = "optional_timestamp", default)]
    pub actual_departure: Option<NaiveDateTime>,
}

impl HistoricVisit {
    /// How late the bus arrived; negative when early. `None` if no arrival was recorded.
    pub fn arrival_lateness(&self) -> Option<TimeDelta> {
        self.actual_arrival
            .map(|actual| actual - self.visit.scheduled_arrival)
    }

    /// How late the bus left; negative when early. `None` if no departure was recorded.
    pub fn departure_lateness(&self) -> Option<TimeDelta> {
        self.actual_departure
            .map(|actual| actual - self.visit.scheduled_departure)
    }
}

/// One row of a line pattern: a stop on a route in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStop {
    #[serde(rename = "location_code")]
    pub acto_code: String,

    #[serde(rename = "location_name", default)]
    pub common_name: String,

    #[serde(rename = "operator_code", with = "company::code")]
    pub company: Company,

    #[serde(rename = "display_order", default)]
    pub order: i64,

    /// 0 outbound, 1 inbound.
    #[serde(rename = "direction", default)]
    pub direction: i64,
}
