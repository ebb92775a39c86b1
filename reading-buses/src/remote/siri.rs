//! SIRI stop-monitoring (SIRI-SM) parsing for stop predictions.

use chrono::{DateTime, FixedOffset};
use minidom::Element;

use crate::diagnostics::Diagnostics;
use crate::domain::{Company, LiveRecord};
use crate::error::Result;

use super::error_payload::classify_payload;

/// Parse a SIRI-SM document into one record per `MonitoredStopVisit`.
///
/// Element names are matched without regard to namespace. The document must
/// be a complete `Siri` element carrying a `StopMonitoringDelivery`; anything
/// else is classified like any other undecodable payload. A visit without a
/// `LineRef` is skipped with a warning.
pub fn parse_predictions(body: &[u8], diagnostics: &Diagnostics) -> Result<Vec<LiveRecord>> {
    let text = std::str::from_utf8(body).map_err(|e| classify_payload(body, e))?;
    let root: Element = text.parse().map_err(|e| classify_payload(body, e))?;

    if root.name() != "Siri" {
        return Err(classify_payload(
            body,
            format!("expected a Siri document, found <{}>", root.name()),
        ));
    }
    // the parser accepts documents cut off part way through
    if !text.trim_end().ends_with("Siri>") {
        return Err(classify_payload(body, "truncated Siri document"));
    }
    if first(&root, "StopMonitoringDelivery").is_none() {
        return Err(classify_payload(
            body,
            "Siri document without a StopMonitoringDelivery",
        ));
    }

    let mut visits = Vec::new();
    collect(&root, "MonitoredStopVisit", &mut visits);
    Ok(visits
        .into_iter()
        .filter_map(|visit| {
            let record = record(visit);
            if record.is_none() {
                diagnostics.warn("Skipping a MonitoredStopVisit without a LineRef");
            }
            record
        })
        .collect())
}

fn record(visit: &Element) -> Option<LiveRecord> {
    let service_id = first_text(visit, "LineRef")?;

    Some(LiveRecord {
        service_id,
        destination_name: first_text(visit, "DestinationName"),
        scheduled_departure: first_time(visit, "AimedDepartureTime"),
        expected_departure: first_time(visit, "ExpectedDepartureTime"),
        scheduled_arrival: first_time(visit, "AimedArrivalTime"),
        expected_arrival: first_time(visit, "ExpectedArrivalTime"),
        company: first_text(visit, "OperatorRef")
            .map(|code| Company::from_code(&code))
            .unwrap_or(Company::Other),
        vehicle_ref: first_text(visit, "VehicleRef"),
        origin: first_text(visit, "OriginRef"),
        destination: first_text(visit, "DestinationRef"),
    })
}

/// Depth-first collection of every descendant named `name`.
fn collect<'a>(element: &'a Element, name: &str, out: &mut Vec<&'a Element>) {
    for child in element.children() {
        if child.name() == name {
            out.push(child);
        } else {
            collect(child, name, out);
        }
    }
}

fn first<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    element.children().find_map(|child| {
        if child.name() == name {
            Some(child)
        } else {
            first(child, name)
        }
    })
}

fn first_text(element: &Element, name: &str) -> Option<String> {
    first(element, name)
        .map(|e| e.text().trim().to_string())
        .filter(|t| !t.is_empty())
}

fn first_time(element: &Element, name: &str) -> Option<DateTime<FixedOffset>> {
    let text = first_text(element, name)?;
    match DateTime::parse_from_rfc3339(&text) {
        Ok(time) => Some(time),
        Err(e) => {
            tracing::debug!(element = name, value = %text, error = %e, "Ignoring unparseable SIRI time");
            None
        }
    }
}
