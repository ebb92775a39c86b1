//! Timestamp parsing and the small serde adapters the feed needs.
//!
//! The feed writes local timestamps as `2024-03-15 10:23:00`, sometimes with a
//! `T` separator or a trailing UTC offset. We keep them as `NaiveDateTime`
//! (UK local time) and write them back in the space-separated form.

use chrono::{DateTime, NaiveDateTime, TimeDelta};

const WIRE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Error returned when a timestamp is in none of the accepted shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp: {0:?}")]
pub struct InvalidTimestamp(String);

/// Parse a feed timestamp into local naive time.
///
/// # Examples
///
/// ```
/// use reading_buses::domain::parse_timestamp;
///
/// let a = parse_timestamp("2024-03-15 10:23:00").unwrap();
/// let b = parse_timestamp("2024-03-15T10:23:00").unwrap();
/// let c = parse_timestamp("2024-03-15T10:23:00+00:00").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(b, c);
///
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, InvalidTimestamp> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, WIRE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_local()))
        .map_err(|_| InvalidTimestamp(s.to_string()))
}

/// Format a timestamp the way the feed writes it.
pub fn format_timestamp(t: &NaiveDateTime) -> String {
    t.format(WIRE_FORMAT).to_string()
}

/// End of a window of `span` starting at `start`, kept within the same day.
///
/// A negative span counts as its length. No span, or one that would run past
/// midnight, ends at 23:59:59 on the start's date.
pub fn window_end(start: NaiveDateTime, span: Option<TimeDelta>) -> NaiveDateTime {
    let last_second = start.date().and_hms_opt(23, 59, 59).unwrap_or(start);
    span.and_then(|span| start.checked_add_signed(span.abs()))
        .filter(|end| end.date() == start.date())
        .unwrap_or(last_second)
}

/// Serde adapter for required timestamps.
pub mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(t))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(D::Error::custom)
    }
}

/// Serde adapter for timestamps that may be null, missing or empty.
pub mod optional_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(t: &Option<NaiveDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => s.serialize_some(&super::format_timestamp(t)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            Some(raw) if !raw.trim().is_empty() => super::parse_timestamp(&raw)
                .map(Some)
                .map_err(D::Error::custom),
            _ => Ok(None),
        }
    }
}

/// Serde adapter for `0`/`1` flags. Also accepts JSON booleans.
pub mod flag {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(value: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Bool(b) => Ok(b),
            Raw::Int(i) => Ok(i == 1),
            Raw::Str(s) => match s.trim() {
                "1" | "true" => Ok(true),
                "0" | "false" | "" => Ok(false),
                other => Err(D::Error::custom(format!("invalid flag: {other:?}"))),
            },
        }
    }
}

/// Serde adapter for numbers the feed sometimes sends as strings.
pub mod lenient_f64 {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Num(n) => Ok(n),
            Raw::Str(s) => s
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid number: {s:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn window_stays_within_the_day() {
        assert_eq!(window_end(at(10, 0), Some(TimeDelta::hours(2))), at(12, 0));
        assert_eq!(window_end(at(10, 0), Some(TimeDelta::hours(-2))), at(12, 0));

        let last = at(23, 59).with_second(59).unwrap();
        assert_eq!(window_end(at(10, 0), None), last);
        assert_eq!(window_end(at(22, 0), Some(TimeDelta::hours(3))), last);
    }

    #[test]
    fn parse_accepted_shapes() {
        assert_eq!(parse_timestamp("2024-03-15 10:23:00").unwrap(), at(10, 23));
        assert_eq!(parse_timestamp("2024-03-15T10:23:00").unwrap(), at(10, 23));
        assert_eq!(
            parse_timestamp("2024-03-15T10:23:00.000").unwrap(),
            at(10, 23)
        );
        assert_eq!(
            parse_timestamp("2024-03-15T10:23:00+01:00").unwrap(),
            at(10, 23)
        );
        assert_eq!(parse_timestamp(" 2024-03-15 10:23:00 ").unwrap(), at(10, 23));
    }

    #[test]
    fn reject_garbage() {
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("10:23").is_err());
        assert!(parse_timestamp("2024-13-01 00:00:00").is_err());
    }

    #[test]
    fn format_matches_wire() {
        assert_eq!(format_timestamp(&at(6, 5)), "2024-03-15 06:05:00");
        assert_eq!(parse_timestamp(&format_timestamp(&at(6, 5))).unwrap().minute(), 5);
    }

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Row {
        #[serde(with = "optional_timestamp", default)]
        when: Option<NaiveDateTime>,
        #[serde(with = "flag")]
        timing: bool,
        #[serde(with = "lenient_f64")]
        lat: f64,
    }

    #[test]
    fn adapters_decode_feed_shapes() {
        let row: Row =
            serde_json::from_str(r#"{"when":"","timing":1,"lat":"51.45"}"#).unwrap();
        assert_eq!(
            row,
            Row {
                when: None,
                timing: true,
                lat: 51.45
            }
        );

        let row: Row = serde_json::from_str(
            r#"{"when":"2024-03-15 10:23:00","timing":"0","lat":51.5}"#,
        )
        .unwrap();
        assert_eq!(row.when, Some(at(10, 23)));
        assert!(!row.timing);

        let row: Row = serde_json::from_str(r#"{"timing":true,"lat":0}"#).unwrap();
        assert_eq!(row.when, None);
    }

    #[test]
    fn adapters_reject_bad_values() {
        assert!(serde_json::from_str::<Row>(r#"{"timing":"maybe","lat":1}"#).is_err());
        assert!(serde_json::from_str::<Row>(r#"{"timing":1,"lat":"north"}"#).is_err());
        assert!(
            serde_json::from_str::<Row>(r#"{"when":"soon","timing":1,"lat":1}"#).is_err()
        );
    }

    #[test]
    fn adapters_write_what_they_read() {
        let row = Row {
            when: Some(at(10, 23)),
            timing: true,
            lat: 51.45,
        };
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"{"when":"2024-03-15 10:23:00","timing":1,"lat":51.45}"#);
        assert_eq!(serde_json::from_str::<Row>(&json).unwrap(), row);
    }
}
