//! Reading Buses API URL generation.

use chrono::{NaiveDate, NaiveDateTime};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters escaped in query values: everything but unreserved ones.
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Builds the URL of every resource the client reads.
///
/// Absent optional parameters are sent empty, which the API treats as "any".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
    api_key: String,
}

impl Endpoints {
    /// `base_url` is used as a prefix; a trailing slash is added if missing.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            api_key: api_key.into(),
        }
    }

    /// The API key the URLs carry.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn url(&self, resource: &str, params: &[(&str, &str)]) -> String {
        let mut url = format!(
            "{}{}?api_token={}",
            self.base_url,
            resource,
            utf8_percent_encode(&self.api_key, QUERY_VALUE)
        );
        for (name, value) in params {
            url.push('&');
            url.push_str(name);
            url.push('=');
            url.extend(utf8_percent_encode(value, QUERY_VALUE));
        }
        url
    }

    /// Every stop, one row per stop and service.
    pub fn bus_stops(&self) -> String {
        self.url("busstops", &[])
    }

    /// Every service.
    pub fn services(&self) -> String {
        self.url("lines", &[])
    }

    /// Stops on a route, in order, for every operator running that id.
    pub fn line_patterns(&self, service_id: &str) -> String {
        self.url("line-patterns", &[("line", service_id)])
    }

    pub fn live_vehicle_positions(&self) -> String {
        self.url("vehicle-positions", &[])
    }

    pub fn live_journeys(&self, service_id: Option<&str>, vehicle: Option<&str>) -> String {
        self.url(
            "live-journeys",
            &[
                ("vehicle", vehicle.unwrap_or_default()),
                ("line", service_id.unwrap_or_default()),
            ],
        )
    }

    /// SIRI stop-monitoring predictions (XML).
    pub fn stop_predictions(&self, acto_code: &str) -> String {
        self.url("siri-sm", &[("location", acto_code)])
    }

    pub fn scheduled_journeys(
        &self,
        service_id: Option<&str>,
        acto_code: Option<&str>,
        date: NaiveDate,
    ) -> String {
        let date = date.format("%Y-%m-%d").to_string();
        self.url(
            "scheduled-journeys",
            &[
                ("line", service_id.unwrap_or_default()),
                ("date", &date),
                ("location", acto_code.unwrap_or_default()),
            ],
        )
    }

    pub fn tracking_history(
        &self,
        service_id: Option<&str>,
        acto_code: Option<&str>,
        date: NaiveDate,
        vehicle: Option<&str>,
    ) -> String {
        let date = date.format("%Y-%m-%d").to_string();
        self.url(
            "tracking-history",
            &[
                ("line", service_id.unwrap_or_default()),
                ("date", &date),
                ("vehicle", vehicle.unwrap_or_default()),
                ("location", acto_code.unwrap_or_default()),
            ],
        )
    }

    /// Positions reported by `vehicle` between `from` and `to` on `from`'s date.
    /// Only the time of day of `to` is sent.
    pub fn vehicle_position_history(
        &self,
        vehicle: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> String {
        let date = from.format("%Y-%m-%d").to_string();
        let start = from.format("%H:%M:%S").to_string();
        let end = to.format("%H:%M:%S").to_string();
        self.url(
            "vehicle-position-history",
            &[
                ("date", &date),
                ("vehicle", vehicle),
                ("from", &start),
                ("to", &end),
            ],
        )
    }
}
