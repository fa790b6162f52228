//! End-to-end session tests with in-process location, geocoding and model doubles.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use nearby_core::{AppError, ServiceError};
use nearby_facts::{
    ContentGenerator, FactPipeline, FactStore, FetchPhase, GenerationError, RetryPolicy,
};
use nearby_location::{
    event_channel, AuthorizationStatus, Fix, GeocodeError, LocationEvent, LocationFailure,
    LocationProvider, LocationSource, PlaceCache, PlaceComponents, PlaceDescription, Position,
    Resolver, ReverseGeocoder,
};
use nearby_service::FactSession;
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Default)]
struct RecordingSource {
    calls: Mutex<Vec<&'static str>>,
}

impl LocationSource for RecordingSource {
    fn request_authorization(&self) {
        self.calls.lock().push("request_authorization");
    }
    fn start_updates(&self) {
        self.calls.lock().push("start");
    }
    fn stop_updates(&self) {
        self.calls.lock().push("stop");
    }
}

/// Records every position it is asked about.
struct RecordingGeocoder {
    positions: Mutex<Vec<Position>>,
    reply: Mutex<VecDeque<Result<PlaceComponents, GeocodeError>>>,
}

impl RecordingGeocoder {
    fn new(replies: Vec<Result<PlaceComponents, GeocodeError>>) -> Arc<Self> {
        Arc::new(Self {
            positions: Mutex::new(Vec::new()),
            reply: Mutex::new(replies.into()),
        })
    }

    fn positions(&self) -> Vec<Position> {
        self.positions.lock().clone()
    }
}

#[async_trait]
impl ReverseGeocoder for RecordingGeocoder {
    async fn reverse_geocode(&self, position: &Position) -> Result<PlaceComponents, GeocodeError> {
        self.positions.lock().push(*position);
        self.reply.lock().pop_front().unwrap_or(Err(GeocodeError::NotFound))
    }
}

struct EchoGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ContentGenerator for EchoGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.prompts.lock().push(prompt.to_string());
        Ok(serde_json::json!({
            "location": "Lisbon, Portugal",
            "facts": [{
                "title": "Belém Tower",
                "description": "A 16th-century fortification on the Tagus.",
                "imageUrl": "https://example.com/belem.jpg"
            }]
        })
        .to_string())
    }
}

fn lisbon() -> PlaceComponents {
    PlaceComponents {
        locality: Some("Lisbon".into()),
        administrative_area: None,
        country: Some("Portugal".into()),
    }
}

struct Harness {
    session: FactSession,
    source: Arc<RecordingSource>,
    geocoder: Arc<RecordingGeocoder>,
    generator: Arc<EchoGenerator>,
    cache: PlaceCache,
    tx: UnboundedSender<LocationEvent>,
}

fn harness(replies: Vec<Result<PlaceComponents, GeocodeError>>) -> Harness {
    let source = Arc::new(RecordingSource::default());
    let (tx, rx) = event_channel();
    let provider = LocationProvider::new(source.clone(), rx, std::time::Duration::from_secs(5));

    let geocoder = RecordingGeocoder::new(replies);
    let cache = PlaceCache::new();
    let resolver = Arc::new(Resolver::new(geocoder.clone(), cache.clone()));

    let generator = Arc::new(EchoGenerator {
        prompts: Mutex::new(Vec::new()),
    });
    let pipeline = Arc::new(
        FactPipeline::new(generator.clone(), FactStore::new()).with_policy(RetryPolicy::immediate(5)),
    );

    Harness {
        session: FactSession::new(provider, resolver, pipeline),
        source,
        geocoder,
        generator,
        cache,
        tx,
    }
}

fn fix(latitude: f64, age: TimeDelta, accuracy: f64) -> Fix {
    Fix::new(latitude, -9.14, accuracy, Utc::now() - age)
}

#[tokio::test]
async fn test_stale_fix_never_reaches_geocoder() {
    let mut h = harness(vec![Ok(lisbon())]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(10.0, TimeDelta::seconds(30), 5.0))).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::seconds(1), 5.0))).unwrap();

    let state = h.session.run_once().await.unwrap();

    let positions = h.geocoder.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].latitude, 38.7);
    assert_eq!(state.phase, FetchPhase::Ready);
    assert_eq!(state.facts[0].title, "Belém Tower");
    assert_eq!(h.cache.latest(), Some(PlaceDescription::new("Lisbon, Portugal")));
    assert!(h.generator.prompts.lock()[0].contains("Lisbon, Portugal"));
}

#[tokio::test]
async fn test_negative_accuracy_restarts_instead_of_geocoding() {
    let mut h = harness(vec![Ok(lisbon())]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(1.0, TimeDelta::zero(), -1.0))).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::zero(), 20.0))).unwrap();

    h.session.run_once().await.unwrap();

    assert_eq!(
        *h.source.calls.lock(),
        vec!["request_authorization", "start", "stop", "start"]
    );
    let positions = h.geocoder.positions();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].latitude, 38.7);
}

#[tokio::test]
async fn test_denied_ends_session() {
    let mut h = harness(vec![]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Denied)).unwrap();

    let err = h.session.run().await.unwrap_err();
    assert!(matches!(err, AppError::Service(ServiceError::LocationDenied)));
    assert!(err.is_terminal());
    assert!(h.geocoder.positions().is_empty());
    assert_eq!(h.session.store().snapshot().phase, FetchPhase::Idle);
}

#[tokio::test]
async fn test_geocode_failure_reuses_cached_place() {
    let mut h = harness(vec![Ok(lisbon()), Err(GeocodeError::NotFound)]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::zero(), 5.0))).unwrap();
    h.session.run_once().await.unwrap();

    h.tx.send(LocationEvent::Fix(fix(38.8, TimeDelta::zero(), 5.0))).unwrap();
    h.session.run_once().await.unwrap();

    assert_eq!(h.geocoder.positions().len(), 2);
    let prompts = h.generator.prompts.lock();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Lisbon, Portugal"));
}

#[tokio::test]
async fn test_geocode_failure_without_cache_is_reported() {
    let mut h = harness(vec![Err(GeocodeError::NotFound)]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::zero(), 5.0))).unwrap();

    let err = h.session.run_once().await.unwrap_err();
    assert!(matches!(err, AppError::Service(ServiceError::PlaceNotFound(_))));
    assert!(h.generator.prompts.lock().is_empty());
}

#[tokio::test]
async fn test_run_survives_transient_errors_and_ends_when_source_closes() {
    let mut h = harness(vec![Ok(lisbon())]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Failed(LocationFailure::LocationUnknown)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::zero(), 5.0))).unwrap();
    drop(h.tx);

    h.session.run().await.unwrap();

    let state = h.session.store().snapshot();
    assert_eq!(state.phase, FetchPhase::Ready);
    assert_eq!(state.location.as_deref(), Some("Lisbon, Portugal"));
    assert_eq!(
        *h.source.calls.lock(),
        vec!["request_authorization", "start", "stop", "start"]
    );
}

#[tokio::test]
async fn test_denial_waits_for_in_flight_fetch() {
    let mut h = harness(vec![Ok(lisbon())]);
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Authorized)).unwrap();
    h.tx.send(LocationEvent::Fix(fix(38.7, TimeDelta::zero(), 5.0))).unwrap();
    h.tx.send(LocationEvent::Authorization(AuthorizationStatus::Denied)).unwrap();

    let err = h.session.run().await.unwrap_err();
    assert!(err.is_terminal());

    // The fetch started for the accepted fix has finished writing by now
    let state = h.session.store().snapshot();
    assert_eq!(state.phase, FetchPhase::Ready);
    assert_eq!(state.facts[0].title, "Belém Tower");
    assert_eq!(h.generator.prompts.lock().len(), 1);
}
