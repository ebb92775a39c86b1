//! Bus stop types and the stop-list merge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::time::lenient_f64;
use super::{Company, ServiceKey, company};

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub longitude: f64,
    pub latitude: f64,
}

impl Point {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// A physical bus stop and the services calling at it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusStop {
    /// Globally unique stop identifier.
    pub acto_code: String,

    /// Display name, e.g. "Reading Station".
    pub common_name: String,

    pub latitude: f64,

    pub longitude: f64,

    /// Compass bearing as the feed spells it, e.g. "SW".
    pub bearing: String,

    /// Services calling here, in feed order, without duplicates.
    pub services: Vec<ServiceKey>,
}

impl BusStop {
    /// The stop's position.
    pub fn point(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    /// Whether the given service calls here.
    pub fn is_served_by(&self, key: &ServiceKey) -> bool {
        self.services.contains(key)
    }

    /// Add a calling service unless already present.
    fn add_service(&mut self, key: ServiceKey) {
        if !self.services.contains(&key) {
            self.services.push(key);
        }
    }
}

/// One row of the stop-list feed: a stop paired with one service calling at it.
///
/// The feed repeats a stop once per service, so rows are merged into
/// [`BusStop`]s by [`merge_stop_records`].
#[derive(Debug, Clone, Deserialize)]
pub struct StopRecord {
    #[serde(rename = "location_code")]
    pub acto_code: String,

    #[serde(rename = "description", default)]
    pub common_name: String,

    #[serde(with = "lenient_f64")]
    pub latitude: f64,

    #[serde(with = "lenient_f64")]
    pub longitude: f64,

    #[serde(default)]
    pub bearing: String,

    #[serde(rename = "operator_code", with = "company::code", default = "other")]
    pub company: Company,

    #[serde(rename = "route_code", default)]
    pub route_code: Option<String>,
}

fn other() -> Company {
    Company::Other
}

impl StopRecord {
    fn service_key(&self) -> Option<ServiceKey> {
        self.route_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
            .map(|code| ServiceKey::new(code, self.company))
    }
}

/// Merge stop-list rows sharing an acto-code into single stops.
///
/// The first row for a code provides the name and position; every row
/// contributes its service. Output keeps the order in which codes first appear.
pub fn merge_stop_records(records: Vec<StopRecord>) -> Vec<BusStop> {
    let mut stops: Vec<BusStop> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = record.service_key();
        match positions.get(&record.acto_code) {
            Some(&idx) => {
                if let Some(key) = key {
                    stops[idx].add_service(key);
                }
            }
            None => {
                positions.insert(record.acto_code.clone(), stops.len());
                stops.push(BusStop {
                    acto_code: record.acto_code,
                    common_name: record.common_name,
                    latitude: record.latitude,
                    longitude: record.longitude,
                    bearing: record.bearing,
                    services: key.into_iter().collect(),
                });
            }
        }
    }

    stops
}
