//! Bus service types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Company;
use super::company;

/// A bus route run by one operator.
///
/// Service ids are only unique within an operator: "1" may be both a Reading
/// Buses and a Thames Valley route. Use [`ServiceKey`] when a unique reference
/// is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusService {
    /// Route number or letter code, e.g. "17" or "X4".
    #[serde(rename = "route_code")]
    pub id: String,

    /// Brand or group name, e.g. "purple" or "Lion".
    #[serde(rename = "group_name", default)]
    pub brand_name: String,

    /// The operator running the service.
    #[serde(rename = "operator_code", with = "company::code")]
    pub company: Company,
}

impl BusService {
    /// Create a service.
    pub fn new(id: impl Into<String>, brand_name: impl Into<String>, company: Company) -> Self {
        Self {
            id: id.into(),
            brand_name: brand_name.into(),
            company,
        }
    }

    /// The unique reference for this service.
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.id, self.company)
    }

    /// Case-insensitive id comparison, the way every lookup compares ids.
    pub fn matches_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id)
    }
}

impl fmt::Display for BusService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.brand_name, self.id, self.company)
    }
}

/// Reference to a service by id and operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    #[serde(rename = "ServiceID")]
    pub id: String,

    #[serde(rename = "ServiceOperator", with = "company::code")]
    pub company: Company,
}

impl ServiceKey {
    pub fn new(id: impl Into<String>, company: Company) -> Self {
        Self {
            id: id.into(),
            company,
        }
    }
}

/// Direction of travel along a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Decode the line-pattern `direction` field: 0 is outbound, anything else inbound.
    pub fn from_wire(direction: i64) -> Direction {
        if direction == 0 {
            Direction::Outbound
        } else {
            Direction::Inbound
        }
    }
}

/// Sort key for service ids: the number formed by the id's digits.
///
/// "4a" sorts as 4 and "X25" as 25. Ids without digits, or whose digits
/// overflow, sort after every numeric id.
pub fn service_sort_key(id: &str) -> u64 {
    let digits: String = id.chars().filter(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(u64::MAX)
}

/// Order services by [`service_sort_key`], keeping feed order for ties.
pub fn sort_services(services: &mut [BusService]) {
    services.sort_by_key(|s| service_sort_key(&s.id));
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Sorting twice gives the same order as sorting once
        #[test]
        fn sort_idempotent(ids in proptest::collection::vec("[0-9A-Za-z]{0,4}", 0..20)) {
            let mut once: Vec<BusService> = ids.iter().map(|id| BusService::new(id.clone(), "", Company::Other)).collect();
            sort_services(&mut once);
            let mut twice = once.clone();
            sort_services(&mut twice);
            prop_assert_eq!(once, twice);
        }

        /// Sorted output is non-decreasing in the sort key
        #[test]
        fn sort_ordered(ids in proptest::collection::vec("[0-9a-z]{0,4}", 0..20)) {
            let mut services: Vec<BusService> = ids.iter().map(|id| BusService::new(id.clone(), "", Company::Other)).collect();
            sort_services(&mut services);
            for pair in services.windows(2) {
                prop_assert!(service_sort_key(&pair[0].id) <= service_sort_key(&pair[1].id));
            }
        }

        /// Purely numeric ids sort by their value
        #[test]
        fn numeric_ids_sort_by_value(n in 0u32..100_000) {
            prop_assert_eq!(service_sort_key(&n.to_string()), u64::from(n));
        }
    }
}
