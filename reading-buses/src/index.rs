//! In-memory index of every service and stop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::cache::{CacheKey, CachePolicy, DecodeError, ReadThroughCache, json};
use crate::diagnostics::Diagnostics;
use crate::domain::{
    BusService, BusStop, Company, ServiceKey, StopRecord, merge_stop_records, sort_services,
};
use crate::error::{BusApiError, Result};
use crate::remote::{Endpoints, RemoteSource};

/// How many unknown service references to name in the warning.
const UNKNOWN_SAMPLE: usize = 5;

/// All services and stops, built once and then only read.
#[derive(Debug, Clone)]
pub struct DataIndex {
    /// Sorted by [`crate::domain::service_sort_key`].
    services: Vec<Arc<BusService>>,
    by_key: HashMap<ServiceKey, usize>,
    /// In the order the feed first listed them.
    stops: Vec<Arc<BusStop>>,
    by_acto_code: HashMap<String, usize>,
}

impl DataIndex {
    /// Fetch (or load from cache) the stop and service lists and index them.
    pub async fn build<S: RemoteSource>(
        cache: &ReadThroughCache<S>,
        endpoints: &Endpoints,
        policy: CachePolicy,
    ) -> Result<Self> {
        let stops_url = endpoints.bus_stops();
        let services_url = endpoints.services();
        let stops_key = CacheKey::stops();
        let services_key = CacheKey::services();

        let (stops, services) = futures::try_join!(
            cache.get_or_fetch(&stops_key, &stops_url, policy, decode_stops),
            cache.get_or_fetch(&services_key, &services_url, policy, json::<Vec<BusService>>),
        )?;

        let index = Self::from_parts(services, stops, cache.diagnostics());
        tracing::info!(
            services = index.services.len(),
            stops = index.stops.len(),
            "Built service and stop index"
        );
        Ok(index)
    }

    /// Index already-decoded lists.
    ///
    /// Services are sorted; stop references to services missing from the
    /// service list are dropped.
    pub fn from_parts(
        mut services: Vec<BusService>,
        stops: Vec<BusStop>,
        diagnostics: Diagnostics,
    ) -> Self {
        sort_services(&mut services);

        let mut by_key = HashMap::with_capacity(services.len());
        for (idx, service) in services.iter().enumerate() {
            by_key.entry(service.key()).or_insert(idx);
        }

        let mut unknown: HashSet<ServiceKey> = HashSet::new();
        let stops: Vec<Arc<BusStop>> = stops
            .into_iter()
            .map(|mut stop| {
                stop.services.retain(|key| {
                    let known = by_key.contains_key(key);
                    if !known {
                        unknown.insert(key.clone());
                    }
                    known
                });
                Arc::new(stop)
            })
            .collect();

        if !unknown.is_empty() {
            let mut sample: Vec<String> = unknown
                .iter()
                .map(|key| format!("{} ({})", key.id, key.company.code()))
                .collect();
            sample.sort();
            sample.truncate(UNKNOWN_SAMPLE);
            diagnostics.warn(format_args!(
                "Dropped {} stop references to services missing from the service list, e.g. {}",
                unknown.len(),
                sample.join(", ")
            ));
        }

        let by_acto_code = stops
            .iter()
            .enumerate()
            .map(|(idx, stop)| (stop.acto_code.clone(), idx))
            .collect();

        Self {
            services: services.into_iter().map(Arc::new).collect(),
            by_key,
            stops,
            by_acto_code,
        }
    }

    pub fn is_stop(&self, acto_code: &str) -> bool {
        self.by_acto_code.contains_key(acto_code)
    }

    pub fn get_stop(&self, acto_code: &str) -> Result<Arc<BusStop>> {
        self.by_acto_code
            .get(acto_code)
            .map(|&idx| self.stops[idx].clone())
            .ok_or_else(|| BusApiError::not_found("stop", acto_code))
    }

    pub fn stops(&self) -> Vec<Arc<BusStop>> {
        self.stops.clone()
    }

    /// Whether any operator runs a service with this id (case-insensitive).
    pub fn is_service(&self, id: &str) -> bool {
        self.services.iter().any(|s| s.matches_id(id))
    }

    pub fn is_service_for(&self, id: &str, company: Company) -> bool {
        self.services
            .iter()
            .any(|s| s.company == company && s.matches_id(id))
    }

    /// Every service with this id, across operators.
    pub fn get_services(&self, id: &str) -> Result<Vec<Arc<BusService>>> {
        let found: Vec<_> = self
            .services
            .iter()
            .filter(|s| s.matches_id(id))
            .cloned()
            .collect();
        if found.is_empty() {
            return Err(BusApiError::not_found("service", id));
        }
        Ok(found)
    }

    /// The one service with this id run by `company`.
    pub fn get_service(&self, id: &str, company: Company) -> Result<Arc<BusService>> {
        let mut found = self
            .services
            .iter()
            .filter(|s| s.company == company && s.matches_id(id));
        match (found.next(), found.next()) {
            (Some(service), None) => Ok(service.clone()),
            (None, _) => Err(BusApiError::not_found("service", id)),
            (Some(_), Some(_)) => Err(BusApiError::Ambiguous {
                id: id.to_string(),
                company,
            }),
        }
    }

    /// Resolve a stop's service reference.
    pub fn service_for_key(&self, key: &ServiceKey) -> Option<Arc<BusService>> {
        self.by_key.get(key).map(|&idx| self.services[idx].clone())
    }

    pub fn services(&self) -> &[Arc<BusService>] {
        &self.services
    }

    /// Services under a brand, e.g. "purple" (case-insensitive).
    pub fn services_by_brand(&self, brand: &str) -> Vec<Arc<BusService>> {
        self.services
            .iter()
            .filter(|s| s.brand_name.eq_ignore_ascii_case(brand))
            .cloned()
            .collect()
    }

    pub fn services_by_company(&self, company: Company) -> Vec<Arc<BusService>> {
        self.services
            .iter()
            .filter(|s| s.company == company)
            .cloned()
            .collect()
    }

    /// The services calling at `stop`, in the stop's order.
    pub fn stop_services(&self, stop: &BusStop) -> Vec<Arc<BusService>> {
        stop.services
            .iter()
            .filter_map(|key| self.service_for_key(key))
            .collect()
    }

    /// Stops the service calls at according to the stop list.
    pub fn service_stops_unordered(&self, service: &BusService) -> Vec<Arc<BusStop>> {
        let key = service.key();
        self.stops
            .iter()
            .filter(|stop| stop.is_served_by(&key))
            .cloned()
            .collect()
    }
}

fn decode_stops(bytes: &[u8]) -> Result<Vec<BusStop>, DecodeError> {
    let records: Vec<StopRecord> = json(bytes)?;
    Ok(merge_stop_records(records))
}
