//! Reverse geocoding: convert coordinates to human-readable place names.
//! The default backend is Nominatim (OpenStreetMap), which needs no API key.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::cache::PlaceCache;
use crate::types::{GeocodeError, PlaceComponents, PlaceDescription, Position};

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("Nearby/", env!("CARGO_PKG_VERSION"));

/// Reverse geocoding backend
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, position: &Position) -> Result<PlaceComponents, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    state_district: Option<String>,
    state: Option<String>,
    county: Option<String>,
    country: Option<String>,
}

impl From<NominatimAddress> for PlaceComponents {
    fn from(addr: NominatimAddress) -> Self {
        Self {
            // city > town > village > municipality
            locality: addr.city.or(addr.town).or(addr.village).or(addr.municipality),
            administrative_area: addr.state.or(addr.state_district).or(addr.county),
            country: addr.country,
        }
    }
}

/// Nominatim `/reverse` client
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    #[instrument(skip(self), level = "debug")]
    async fn reverse_geocode(&self, position: &Position) -> Result<PlaceComponents, GeocodeError> {
        let url = format!("{}/reverse", self.base_url);
        let lat = position.latitude.to_string();
        let lon = position.longitude.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("format", "json"),
                ("addressdetails", "1"),
                ("layer", "address"),
                ("zoom", "10"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!("Reverse geocode returned status {}", response.status());
            return Err(GeocodeError::Status(response.status().as_u16()));
        }

        let body: NominatimResponse = response.json().await?;
        let components: PlaceComponents = body.address.ok_or(GeocodeError::NotFound)?.into();

        if components.describe().is_none() {
            return Err(GeocodeError::NotFound);
        }

        Ok(components)
    }
}

/// Single-flight reverse geocoding in front of a backend.
///
/// While one lookup is in flight, further calls fail with
/// `GeocodeError::Busy` without reaching the backend.
pub struct Resolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    cache: PlaceCache,
    in_flight: AtomicBool,
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Resolver {
    pub fn new(geocoder: Arc<dyn ReverseGeocoder>, cache: PlaceCache) -> Self {
        Self {
            geocoder,
            cache,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn cache(&self) -> &PlaceCache {
        &self.cache
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Resolve a position and remember the result in the cache.
    ///
    /// # Errors
    /// `Busy` when another lookup is pending, otherwise the backend error.
    pub async fn resolve(&self, position: &Position) -> Result<PlaceDescription, GeocodeError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Reverse geocode already in flight, rejecting");
            return Err(GeocodeError::Busy);
        }
        let _guard = InFlight(&self.in_flight);

        let description = self
            .geocoder
            .reverse_geocode(position)
            .await?
            .describe()
            .ok_or(GeocodeError::NotFound)?;

        tracing::info!("Reverse geocoded to: {}", description);
        self.cache.store(description.clone());
        Ok(description)
    }
}
