//! Cache keys and the file names they map to.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Escaped in file name segments: characters some platforms reject, the `_`
/// that separates segments, and `%` itself, so distinct values never share a
/// file.
const FILE_SEGMENT: &AsciiSet = &CONTROLS
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'?')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'|')
    .add(b'_')
    .add(b'%');

/// Which cache root an entry lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    /// Services, stops and line patterns.
    Reference,
    /// Timetables, tracking and position history, keyed by date.
    Archive,
}

/// A part of the key that appears in the file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Service,
    Stop,
    Date,
    Vehicle,
    Time,
    Span,
}

/// The kind of resource a cache entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Services,
    Stops,
    LinePattern,
    ScheduledJourneys,
    TrackingHistory,
    VehiclePositionHistory,
}

impl ResourceKind {
    /// File name prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            ResourceKind::Services => "Services",
            ResourceKind::Stops => "Locations",
            ResourceKind::LinePattern => "LP",
            ResourceKind::ScheduledJourneys => "TJ",
            ResourceKind::TrackingHistory => "TH",
            ResourceKind::VehiclePositionHistory => "VPH",
        }
    }

    pub fn root(self) -> Root {
        match self {
            ResourceKind::Services | ResourceKind::Stops | ResourceKind::LinePattern => {
                Root::Reference
            }
            ResourceKind::ScheduledJourneys
            | ResourceKind::TrackingHistory
            | ResourceKind::VehiclePositionHistory => Root::Archive,
        }
    }

    fn segments(self) -> &'static [Segment] {
        use Segment::*;
        match self {
            ResourceKind::Services | ResourceKind::Stops => &[],
            ResourceKind::LinePattern => &[Service],
            ResourceKind::ScheduledJourneys => &[Service, Stop, Date],
            ResourceKind::TrackingHistory => &[Service, Stop, Date, Vehicle],
            ResourceKind::VehiclePositionHistory => &[Vehicle, Date, Time, Span],
        }
    }
}

/// Identifies one cached response.
///
/// Equal parameters give equal keys; absent parameters are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub service: Option<String>,
    pub stop: Option<String>,
    pub date: Option<NaiveDate>,
    pub vehicle: Option<String>,
    /// Start of a time window within `date`.
    pub time: Option<NaiveTime>,
    /// Length of that window in seconds.
    pub span_secs: Option<i64>,
}

impl CacheKey {
    fn bare(kind: ResourceKind) -> Self {
        Self {
            kind,
            service: None,
            stop: None,
            date: None,
            vehicle: None,
            time: None,
            span_secs: None,
        }
    }

    pub fn services() -> Self {
        Self::bare(ResourceKind::Services)
    }

    pub fn stops() -> Self {
        Self::bare(ResourceKind::Stops)
    }

    pub fn line_pattern(service_id: &str) -> Self {
        Self {
            service: Some(service_id.to_string()),
            ..Self::bare(ResourceKind::LinePattern)
        }
    }

    pub fn scheduled_journeys(service_id: Option<&str>, stop: Option<&str>, date: NaiveDate) -> Self {
        Self {
            service: service_id.map(str::to_string),
            stop: stop.map(str::to_string),
            date: Some(date),
            ..Self::bare(ResourceKind::ScheduledJourneys)
        }
    }

    pub fn tracking_history(
        service_id: Option<&str>,
        stop: Option<&str>,
        date: NaiveDate,
        vehicle: Option<&str>,
    ) -> Self {
        Self {
            service: service_id.map(str::to_string),
            stop: stop.map(str::to_string),
            date: Some(date),
            vehicle: vehicle.map(str::to_string),
            ..Self::bare(ResourceKind::TrackingHistory)
        }
    }

    /// Positions of `vehicle` for `span_secs` seconds from `start`.
    pub fn vehicle_position_history(vehicle: &str, start: NaiveDateTime, span_secs: i64) -> Self {
        Self {
            vehicle: Some(vehicle.to_string()),
            date: Some(start.date()),
            time: Some(start.time()),
            span_secs: Some(span_secs),
            ..Self::bare(ResourceKind::VehiclePositionHistory)
        }
    }

    /// `{prefix}_{segment}_..._{segment}.json`, carrying only the kind's
    /// segments. A carried segment that is absent renders empty.
    pub fn file_name(&self) -> String {
        let mut name = self.kind.prefix().to_string();
        for segment in self.kind.segments() {
            name.push('_');
            match segment {
                Segment::Service => push_sanitized(&mut name, self.service.as_deref()),
                Segment::Stop => push_sanitized(&mut name, self.stop.as_deref()),
                Segment::Vehicle => push_sanitized(&mut name, self.vehicle.as_deref()),
                Segment::Date => {
                    if let Some(date) = self.date {
                        name.push_str(&date.format("%Y-%m-%d").to_string());
                    }
                }
                Segment::Time => {
                    if let Some(time) = self.time {
                        name.push_str(&time.format("%H-%M-%S").to_string());
                    }
                }
                Segment::Span => {
                    if let Some(secs) = self.span_secs {
                        name.push_str(&secs.to_string());
                    }
                }
            }
        }
        name.push_str(".json");
        name
    }
}

fn push_sanitized(name: &mut String, value: Option<&str>) {
    if let Some(value) = value {
        name.extend(utf8_percent_encode(value, FILE_SEGMENT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
    }

    #[test]
    fn reference_names() {
        assert_eq!(CacheKey::services().file_name(), "Services.json");
        assert_eq!(CacheKey::stops().file_name(), "Locations.json");
        assert_eq!(CacheKey::line_pattern("17").file_name(), "LP_17.json");
    }

    #[test]
    fn archive_names() {
        assert_eq!(
            CacheKey::scheduled_journeys(Some("17"), None, date()).file_name(),
            "TJ_17__2024-03-05.json"
        );
        assert_eq!(
            CacheKey::tracking_history(Some("17"), Some("039025980002"), date(), Some("414"))
                .file_name(),
            "TH_17_039025980002_2024-03-05_414.json"
        );
        assert_eq!(
            CacheKey::tracking_history(None, None, date(), Some("414")).file_name(),
            "TH___2024-03-05_414.json"
        );
    }

    #[test]
    fn position_history_names() {
        let start = date().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(
            CacheKey::vehicle_position_history("414", start, 3600).file_name(),
            "VPH_414_2024-03-05_10-30-00_3600.json"
        );
        assert_eq!(ResourceKind::VehiclePositionHistory.root(), Root::Archive);
    }

    #[test]
    fn roots() {
        assert_eq!(ResourceKind::Services.root(), Root::Reference);
        assert_eq!(ResourceKind::LinePattern.root(), Root::Reference);
        assert_eq!(ResourceKind::ScheduledJourneys.root(), Root::Archive);
        assert_eq!(ResourceKind::TrackingHistory.root(), Root::Archive);
    }

    #[test]
    fn unsafe_characters_are_escaped() {
        assert_eq!(CacheKey::line_pattern("../x").file_name(), "LP_..%2Fx.json");
        assert_eq!(CacheKey::line_pattern("a:b").file_name(), "LP_a%3Ab.json");
    }

    #[test]
    fn similar_ids_do_not_share_a_file() {
        let names = ["a/b", "a-b", "a%2Fb", "a_b"].map(|id| CacheKey::line_pattern(id).file_name());
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(a, b);
            }
        }

        let d = date();
        assert_ne!(
            CacheKey::scheduled_journeys(Some("a_"), Some("b"), d).file_name(),
            CacheKey::scheduled_journeys(Some("a"), Some("_b"), d).file_name()
        );
    }

    proptest! {
        #[test]
        fn file_name_is_deterministic(
            service in proptest::option::of("[A-Za-z0-9/]{0,6}"),
            stop in proptest::option::of("[0-9]{0,12}"),
            day in 1u32..=28,
        ) {
            let date = NaiveDate::from_ymd_opt(2024, 2, day).unwrap();
            let a = CacheKey::scheduled_journeys(service.as_deref(), stop.as_deref(), date);
            let b = CacheKey::scheduled_journeys(service.as_deref(), stop.as_deref(), date);
            prop_assert_eq!(a.file_name(), b.file_name());
            prop_assert!(!a.file_name().contains('/'));
        }

        #[test]
        fn distinct_services_get_distinct_files(
            a in "[A-Za-z0-9/_%-]{0,6}",
            b in "[A-Za-z0-9/_%-]{0,6}",
        ) {
            prop_assume!(a != b);
            prop_assert_ne!(
                CacheKey::line_pattern(&a).file_name(),
                CacheKey::line_pattern(&b).file_name()
            );
        }
    }
}
