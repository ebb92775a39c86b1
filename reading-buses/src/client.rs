//! The built client: every query against the open-data API.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use moka::future::Cache as MokaCache;

use crate::cache::{CacheKey, CachePolicy, CacheStore, ReadThroughCache, json};
use crate::config::ClientConfig;
use crate::diagnostics::Diagnostics;
use crate::domain::{
    ArchivedPosition, BusService, BusStop, Company, Direction, HistoricJourney, Journey,
    LiveRecord, LiveVehiclePosition, PatternStop, window_end,
};
use crate::error::{BusApiError, Result};
use crate::index::DataIndex;
use crate::remote::{Endpoints, RemoteSource, parse_predictions};

/// How long live vehicle positions are reused before asking the API again.
pub const LIVE_POSITION_TTL: Duration = Duration::from_secs(15);

type Positions = Arc<Vec<LiveVehiclePosition>>;

/// A connected Reading Buses client.
///
/// Holds the service and stop index, built once by [`ReadingBuses::connect`]
/// (usually through [`crate::Registry`]). Configuration is fixed for the
/// client's lifetime. Queries take `&self` and may run concurrently.
pub struct ReadingBuses<S> {
    config: ClientConfig,
    endpoints: Endpoints,
    cache: ReadThroughCache<S>,
    index: DataIndex,
    live_positions: MokaCache<(), Positions>,
}

impl<S> std::fmt::Debug for ReadingBuses<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingBuses")
            .field("services", &self.index.services().len())
            .field("stops", &self.index.stops().len())
            .finish_non_exhaustive()
    }
}

impl<S: RemoteSource> ReadingBuses<S> {
    /// Build the index with `api_key` and return a ready client.
    pub async fn connect(config: ClientConfig, api_key: &str, source: S) -> Result<Self> {
        let endpoints = Endpoints::new(&config.base_url, api_key);
        let cache = ReadThroughCache::new(
            CacheStore::from_config(&config),
            source,
            Diagnostics::from_config(&config),
        );
        let index = DataIndex::build(&cache, &endpoints, config.reference_policy()).await?;

        let live_positions = MokaCache::builder()
            .time_to_live(LIVE_POSITION_TTL)
            .max_capacity(1)
            .build();

        Ok(Self {
            config,
            endpoints,
            cache,
            index,
            live_positions,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The key this client was built with.
    pub fn api_key(&self) -> &str {
        self.endpoints.api_key()
    }

    pub fn index(&self) -> &DataIndex {
        &self.index
    }

    // Stops and services

    pub fn is_stop(&self, acto_code: &str) -> bool {
        self.index.is_stop(acto_code)
    }

    pub fn get_stop(&self, acto_code: &str) -> Result<Arc<BusStop>> {
        self.index.get_stop(acto_code)
    }

    pub fn stops(&self) -> Vec<Arc<BusStop>> {
        self.index.stops()
    }

    pub fn is_service(&self, id: &str) -> bool {
        self.index.is_service(id)
    }

    pub fn is_service_for(&self, id: &str, company: Company) -> bool {
        self.index.is_service_for(id, company)
    }

    pub fn get_services(&self, id: &str) -> Result<Vec<Arc<BusService>>> {
        self.index.get_services(id)
    }

    pub fn get_service(&self, id: &str, company: Company) -> Result<Arc<BusService>> {
        self.index.get_service(id, company)
    }

    pub fn services(&self) -> &[Arc<BusService>] {
        self.index.services()
    }

    pub fn services_by_brand(&self, brand: &str) -> Vec<Arc<BusService>> {
        self.index.services_by_brand(brand)
    }

    pub fn stop_services(&self, stop: &BusStop) -> Vec<Arc<BusService>> {
        self.index.stop_services(stop)
    }

    // Line patterns

    /// The route of `service` in display order, restricted to `direction` if
    /// given, otherwise outbound then inbound. Cached like reference data.
    async fn pattern(
        &self,
        service: &BusService,
        direction: Option<Direction>,
    ) -> Result<Vec<PatternStop>> {
        let mut pattern: Vec<PatternStop> = self
            .cache
            .get_or_fetch(
                &CacheKey::line_pattern(&service.id),
                &self.endpoints.line_patterns(&service.id),
                self.config.reference_policy(),
                json,
            )
            .await?;

        pattern.retain(|p| {
            p.company == service.company
                && direction.is_none_or(|d| Direction::from_wire(p.direction) == d)
        });
        pattern.sort_by_key(|p| (Direction::from_wire(p.direction) == Direction::Inbound, p.order));
        Ok(pattern)
    }

    /// Acto-codes of the stops `service` calls at, in route order.
    pub async fn service_stop_codes(
        &self,
        service: &BusService,
        direction: Option<Direction>,
    ) -> Result<Vec<String>> {
        Ok(self
            .pattern(service, direction)
            .await?
            .into_iter()
            .map(|p| p.acto_code)
            .collect())
    }

    /// The stops `service` calls at, in route order. Codes missing from the
    /// stop list are skipped.
    pub async fn service_stops(
        &self,
        service: &BusService,
        direction: Option<Direction>,
    ) -> Result<Vec<Arc<BusStop>>> {
        Ok(self
            .pattern(service, direction)
            .await?
            .iter()
            .filter_map(|p| self.index.get_stop(&p.acto_code).ok())
            .collect())
    }

    // Live vehicle positions

    /// Every bus currently reporting its position.
    ///
    /// Reused for [`LIVE_POSITION_TTL`] so repeated lookups don't each hit the API.
    pub async fn live_vehicle_positions(&self) -> Result<Positions> {
        self.live_positions
            .try_get_with((), async {
                let positions: Vec<LiveVehiclePosition> = self
                    .cache
                    .fetch_decoded(&self.endpoints.live_vehicle_positions(), json)
                    .await?;
                Ok::<_, BusApiError>(Arc::new(positions))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// The position of one vehicle (fleet number, case-insensitive).
    pub async fn live_vehicle_position(&self, vehicle: &str) -> Result<LiveVehiclePosition> {
        self.live_vehicle_positions()
            .await?
            .iter()
            .find(|p| p.is_vehicle(vehicle))
            .cloned()
            .ok_or_else(|| BusApiError::not_found("vehicle", vehicle))
    }

    /// Whether the vehicle is currently reporting a position.
    pub async fn is_vehicle(&self, vehicle: &str) -> Result<bool> {
        Ok(self
            .live_vehicle_positions()
            .await?
            .iter()
            .any(|p| p.is_vehicle(vehicle)))
    }

    /// Positions of the buses running `service`.
    pub async fn service_live_positions(
        &self,
        service: &BusService,
    ) -> Result<Vec<LiveVehiclePosition>> {
        let key = service.key();
        Ok(self
            .live_vehicle_positions()
            .await?
            .iter()
            .filter(|p| p.service_key().is_some_and(|k| k == key))
            .cloned()
            .collect())
    }

    /// Where `vehicle` was from `start` for `span` (clamped to the same day;
    /// `None` means the rest of the day).
    ///
    /// Finished days are cached permanently like tracking history.
    pub async fn vehicle_position_history(
        &self,
        vehicle: &str,
        start: NaiveDateTime,
        span: Option<TimeDelta>,
    ) -> Result<Vec<ArchivedPosition>> {
        if vehicle.trim().is_empty() {
            return Err(BusApiError::MalformedQuery(
                "position history needs a vehicle".into(),
            ));
        }
        let policy = self.history_policy(start.date())?;
        let end = window_end(start, span);

        self.cache
            .get_or_fetch(
                &CacheKey::vehicle_position_history(vehicle, start, (end - start).num_seconds()),
                &self.endpoints.vehicle_position_history(vehicle, start, end),
                policy,
                json,
            )
            .await
    }

    /// How to cache history for `date`: finished days per the archive
    /// settings, today not at all. Future dates have no history.
    fn history_policy(&self, date: NaiveDate) -> Result<CachePolicy> {
        let today = chrono::Local::now().date_naive();
        if date > today {
            return Err(BusApiError::MalformedQuery(format!(
                "can't get history for {date}, which is in the future"
            )));
        }
        Ok(if date < today {
            self.config.archive_policy()
        } else {
            CachePolicy::bypass()
        })
    }

    // Timetables

    /// Scheduled journeys on `date` for a service, a stop, or both.
    pub async fn timetable(
        &self,
        service: Option<&BusService>,
        acto_code: Option<&str>,
        date: NaiveDate,
    ) -> Result<Vec<Journey>> {
        if service.is_none() && acto_code.is_none() {
            return Err(BusApiError::MalformedQuery(
                "a timetable needs a service, a stop, or both".into(),
            ));
        }
        let service_id = service.map(|s| s.id.as_str());

        let mut journeys: Vec<Journey> = self
            .cache
            .get_or_fetch(
                &CacheKey::scheduled_journeys(service_id, acto_code, date),
                &self.endpoints.scheduled_journeys(service_id, acto_code, date),
                self.config.timetable_policy(),
                json,
            )
            .await?;

        if let Some(service) = service {
            journeys.retain(|j| j.company == service.company);
        }
        Ok(journeys)
    }

    /// What actually ran on `date`, from vehicle tracking.
    ///
    /// Finished days are cached permanently (if the archive cache is on);
    /// today's history is still growing, so it is always fetched.
    pub async fn archived_timetable(
        &self,
        service: Option<&BusService>,
        acto_code: Option<&str>,
        date: NaiveDate,
        vehicle: Option<&str>,
    ) -> Result<Vec<HistoricJourney>> {
        let policy = self.history_policy(date)?;
        if service.is_none() && acto_code.is_none() && vehicle.is_none() {
            return Err(BusApiError::MalformedQuery(
                "tracking history needs a service, a stop or a vehicle".into(),
            ));
        }
        let service_id = service.map(|s| s.id.as_str());

        let mut journeys: Vec<HistoricJourney> = self
            .cache
            .get_or_fetch(
                &CacheKey::tracking_history(service_id, acto_code, date, vehicle),
                &self
                    .endpoints
                    .tracking_history(service_id, acto_code, date, vehicle),
                policy,
                json,
            )
            .await?;

        if let Some(service) = service {
            journeys.retain(|j| j.company == service.company);
        }
        Ok(journeys)
    }

    /// Journeys in progress for a service or vehicle, with the stops
    /// visited so far. Never cached.
    pub async fn live_journeys(
        &self,
        service: Option<&BusService>,
        vehicle: Option<&str>,
    ) -> Result<Vec<HistoricJourney>> {
        if service.is_none() && vehicle.is_none() {
            return Err(BusApiError::MalformedQuery(
                "live journeys need a service or a vehicle".into(),
            ));
        }
        let service_id = service.map(|s| s.id.as_str());

        let mut journeys: Vec<HistoricJourney> = self
            .cache
            .fetch_decoded(&self.endpoints.live_journeys(service_id, vehicle), json)
            .await?;

        if let Some(service) = service {
            journeys.retain(|j| j.company == service.company);
        }
        Ok(journeys)
    }

    // Predictions

    /// Upcoming arrivals at a stop. Never cached.
    pub async fn stop_predictions(&self, acto_code: &str) -> Result<Vec<LiveRecord>> {
        let body = self
            .cache
            .fetch_bytes(&self.endpoints.stop_predictions(acto_code))
            .await?;
        let diagnostics = self.cache.diagnostics();
        parse_predictions(&body, &diagnostics).map_err(|e| diagnostics.report(e))
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
