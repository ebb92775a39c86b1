//! Stop arrival predictions.

use chrono::{DateTime, FixedOffset, TimeDelta};

use super::{Company, ServiceKey};

/// A predicted arrival or departure of a bus at a stop.
///
/// Built from a SIRI stop-monitoring visit. Times keep the offset the feed
/// sent them with.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveRecord {
    pub service_id: String,
    pub destination_name: Option<String>,
    pub scheduled_departure: Option<DateTime<FixedOffset>>,
    pub expected_departure: Option<DateTime<FixedOffset>>,
    pub scheduled_arrival: Option<DateTime<FixedOffset>>,
    pub expected_arrival: Option<DateTime<FixedOffset>>,
    pub company: Company,
    pub vehicle_ref: Option<String>,
    /// Acto-code of the journey's origin.
    pub origin: Option<String>,
    /// Acto-code of the journey's destination.
    pub destination: Option<String>,
}

impl LiveRecord {
    /// Reference to the predicted service.
    pub fn service_key(&self) -> ServiceKey {
        ServiceKey::new(&self.service_id, self.company)
    }

    /// Best known time: expected departure, else scheduled departure, else the
    /// arrival equivalents.
    pub fn best_time(&self) -> Option<DateTime<FixedOffset>> {
        match self.scheduled_departure {
            Some(scheduled) => Some(self.expected_departure.unwrap_or(scheduled)),
            None => self
                .scheduled_arrival
                .map(|scheduled| self.expected_arrival.unwrap_or(scheduled)),
        }
    }

    /// Time from `now` until the bus is due.
    pub fn due_in<Tz: chrono::TimeZone>(&self, now: &DateTime<Tz>) -> Option<TimeDelta> {
        self.best_time()
            .map(|due| due.signed_duration_since(now.fixed_offset()))
    }

    /// Human form of [`Self::due_in`], e.g. "4 mins". Empty when nothing is known.
    pub fn display_time<Tz: chrono::TimeZone>(&self, now: &DateTime<Tz>) -> String {
        match self.due_in(now) {
            Some(delta) => {
                let mins = (delta.num_seconds() as f64 / 60.0).round() as i64;
                format!("{mins} mins")
            }
            None => String::new(),
        }
    }

    /// Vehicle fleet number with any operator prefix stripped, e.g. "RB-414" → "414".
    pub fn vehicle_number(&self) -> Option<String> {
        self.vehicle_ref
            .as_deref()
            .map(|v| v.chars().filter(char::is_ascii_digit).collect::<String>())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn record() -> LiveRecord {
        LiveRecord {
            service_id: "17".into(),
            destination_name: Some("Tilehurst".into()),
            scheduled_departure: None,
            expected_departure: None,
            scheduled_arrival: None,
            expected_arrival: None,
            company: Company::ReadingBuses,
            vehicle_ref: Some("RB-414".into()),
            origin: None,
            destination: None,
        }
    }

    #[test]
    fn departure_preferred_over_arrival() {
        let mut r = record();
        r.scheduled_departure = Some(t("2024-03-15T10:00:00+00:00"));
        r.expected_arrival = Some(t("2024-03-15T09:55:00+00:00"));
        r.scheduled_arrival = Some(t("2024-03-15T09:55:00+00:00"));
        assert_eq!(r.best_time(), Some(t("2024-03-15T10:00:00+00:00")));

        r.expected_departure = Some(t("2024-03-15T10:03:00+00:00"));
        assert_eq!(r.best_time(), Some(t("2024-03-15T10:03:00+00:00")));
    }

    #[test]
    fn falls_back_to_arrival() {
        let mut r = record();
        r.scheduled_arrival = Some(t("2024-03-15T10:00:00+00:00"));
        assert_eq!(r.best_time(), Some(t("2024-03-15T10:00:00+00:00")));
    }

    #[test]
    fn display_time_rounds_minutes() {
        let mut r = record();
        r.scheduled_departure = Some(t("2024-03-15T10:04:40+00:00"));
        let now = t("2024-03-15T10:00:00+00:00");
        assert_eq!(r.display_time(&now), "5 mins");
        assert_eq!(r.due_in(&now), Some(TimeDelta::seconds(280)));
    }

    #[test]
    fn display_time_respects_offsets() {
        let mut r = record();
        r.scheduled_departure = Some(t("2024-06-15T11:10:00+01:00"));
        let now = t("2024-06-15T10:00:00+00:00");
        assert_eq!(r.display_time(&now), "10 mins");
    }

    #[test]
    fn display_time_empty_without_times() {
        let now = t("2024-03-15T10:00:00+00:00");
        assert_eq!(record().display_time(&now), "");
    }

    #[test]
    fn vehicle_number_strips_prefix() {
        assert_eq!(record().vehicle_number().as_deref(), Some("414"));

        let mut r = record();
        r.vehicle_ref = Some("RB".into());
        assert_eq!(r.vehicle_number(), None);
    }
}
