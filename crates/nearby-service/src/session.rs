//! Fact session: location fixes in, facts out.
//! Fetches run as background tasks; a newer fix supersedes an older fetch.

use std::sync::Arc;
use std::time::Duration;

use nearby_core::{AppError, Config, ServiceError};
use nearby_facts::{FactPipeline, FactStore, FetchError, FetchState, GeminiClient, LogNotifier, RetryPolicy};
use nearby_location::{
    Fix, GeocodeError, LocationError, LocationEvent, LocationProvider, LocationSource,
    NominatimGeocoder, PlaceCache, PlaceDescription, Resolver,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error_mapping::{fetch_error, generation_error, geocode_error, location_error};

/// Build the Gemini-backed fact pipeline described by `config`.
///
/// # Errors
/// Fails if the HTTP client cannot be constructed.
pub fn pipeline_from_config(config: &Config) -> Result<FactPipeline, AppError> {
    let generative = &config.generative;
    let client = GeminiClient::with_base_url(
        &generative.base_url,
        &generative.api_key,
        &generative.model,
        Duration::from_secs(generative.request_timeout_secs),
    )
    .map_err(generation_error)?
    .json_response(generative.json_response);
    tracing::info!(model = %client.model(), "Fact pipeline configured");

    let facts = &config.facts;
    Ok(FactPipeline::new(Arc::new(client), FactStore::new())
        .with_policy(RetryPolicy::new(
            facts.max_attempts,
            facts.retry_initial_delay_ms,
            facts.retry_max_delay_ms,
        ))
        .with_min_facts(facts.min_facts)
        .with_notifier(Arc::new(LogNotifier)))
}

pub struct FactSession {
    provider: LocationProvider,
    resolver: Arc<Resolver>,
    pipeline: Arc<FactPipeline>,
}

impl FactSession {
    pub fn new(provider: LocationProvider, resolver: Arc<Resolver>, pipeline: Arc<FactPipeline>) -> Self {
        Self {
            provider,
            resolver,
            pipeline,
        }
    }

    /// Build a session backed by Nominatim and Gemini from a validated config.
    ///
    /// # Errors
    /// Fails if an HTTP client cannot be constructed.
    pub fn from_config(
        config: &Config,
        source: Arc<dyn LocationSource>,
        events: mpsc::UnboundedReceiver<LocationEvent>,
    ) -> Result<Self, AppError> {
        let provider = LocationProvider::new(
            source,
            events,
            Duration::from_secs(config.location.freshness_secs),
        );

        let geocoder = NominatimGeocoder::new(&config.location.geocoder_url).map_err(geocode_error)?;
        let resolver = Arc::new(Resolver::new(Arc::new(geocoder), PlaceCache::new()));

        let pipeline = pipeline_from_config(config)?;

        tracing::info!(geocoder = %config.location.geocoder_url, "Fact session configured");
        Ok(Self::new(provider, resolver, Arc::new(pipeline)))
    }

    pub fn store(&self) -> &FactStore {
        self.pipeline.store()
    }

    /// Run one fix → place → facts cycle and return the resulting store state.
    ///
    /// # Errors
    /// Location, geocoding and generation failures are returned as `AppError`;
    /// the store keeps its previous facts.
    pub async fn run_once(&mut self) -> Result<FetchState, AppError> {
        self.provider.request_authorization();
        let fix = self.provider.next_fix().await.map_err(location_error)?;

        let place = self
            .place_for(&fix)
            .await?
            .ok_or_else(|| AppError::Service(ServiceError::PlaceNotFound("lookup busy".into())))?;

        self.pipeline.fetch(place.as_str()).await.map_err(fetch_error)?;
        Ok(self.pipeline.store().snapshot())
    }

    /// Follow location updates until access is denied or the source goes away.
    ///
    /// Cycle failures are logged and swallowed; observers only see the store.
    ///
    /// # Errors
    /// Returns the terminal location error when access is denied.
    pub async fn run(&mut self) -> Result<(), AppError> {
        self.provider.request_authorization();
        let mut in_flight: Option<JoinHandle<()>> = None;

        loop {
            let fix = match self.provider.next_fix().await {
                Ok(fix) => fix,
                Err(LocationError::ServiceUnavailable) => {
                    tracing::info!("Location source closed, ending session");
                    break;
                }
                Err(e) if e.is_terminal() => {
                    let err = location_error(e);
                    tracing::error!("{} ({})", err.user_message(), err);
                    join_fetch(in_flight).await;
                    return Err(err);
                }
                Err(e) => {
                    tracing::warn!("Transient location error: {}", e);
                    continue;
                }
            };

            let place = match self.place_for(&fix).await {
                Ok(Some(place)) => place,
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!("{} ({})", err.user_message(), err);
                    continue;
                }
            };

            let pipeline = self.pipeline.clone();
            in_flight = Some(tokio::spawn(async move {
                match pipeline.fetch(place.as_str()).await {
                    Ok(_) | Err(FetchError::Superseded) => {}
                    Err(e) => {
                        let err = fetch_error(e);
                        tracing::warn!("{} ({})", err.user_message(), err);
                    }
                }
            }));
        }

        join_fetch(in_flight).await;
        Ok(())
    }

    /// Resolve a fix to a place, falling back to the last cached place.
    ///
    /// `Ok(None)` means another lookup is in flight and this fix is skipped.
    async fn place_for(&mut self, fix: &Fix) -> Result<Option<PlaceDescription>, AppError> {
        match self.resolver.resolve(&fix.position()).await {
            Ok(place) => {
                self.provider.mark_resolved();
                Ok(Some(place))
            }
            Err(GeocodeError::Busy) => {
                tracing::debug!("Skipping fix while a lookup is in flight");
                Ok(None)
            }
            Err(e) => match self.resolver.cache().latest() {
                Some(cached) if e.is_transient() => {
                    tracing::warn!("Reverse geocode failed ({}), reusing {}", e, cached);
                    Ok(Some(cached))
                }
                _ => Err(geocode_error(e)),
            },
        }
    }
}

/// Let the last spawned fetch settle so no task outlives the session.
async fn join_fetch(in_flight: Option<JoinHandle<()>>) {
    if let Some(handle) = in_flight {
        if let Err(e) = handle.await {
            tracing::error!("Fact fetch task failed: {}", e);
        }
    }
}
