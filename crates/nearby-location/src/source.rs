//! Location sources deliver authorization changes and fixes as events.

use chrono::Utc;
use tokio::sync::mpsc;

use crate::types::{AuthorizationStatus, Fix, LocationEvent};

/// Platform location service seam.
///
/// Implementations report their results asynchronously on the event channel
/// handed out at construction, never through return values.
pub trait LocationSource: Send + Sync {
    /// Prompt for permission. The outcome arrives as `LocationEvent::Authorization`.
    fn request_authorization(&self);

    /// Begin delivering `LocationEvent::Fix` events.
    fn start_updates(&self);

    /// Stop delivering fixes.
    fn stop_updates(&self);
}

/// Create the event channel shared by a source and its provider.
pub fn event_channel() -> (
    mpsc::UnboundedSender<LocationEvent>,
    mpsc::UnboundedReceiver<LocationEvent>,
) {
    mpsc::unbounded_channel()
}

/// Source for hosts without a location service: reports a fixed position.
///
/// Authorization is granted as soon as it is requested, and every
/// `start_updates` emits one fresh, exact fix.
#[derive(Debug, Clone)]
pub struct StaticSource {
    latitude: f64,
    longitude: f64,
    tx: mpsc::UnboundedSender<LocationEvent>,
}

impl StaticSource {
    pub fn new(latitude: f64, longitude: f64) -> (Self, mpsc::UnboundedReceiver<LocationEvent>) {
        let (tx, rx) = event_channel();
        (
            Self {
                latitude,
                longitude,
                tx,
            },
            rx,
        )
    }

    fn emit(&self, event: LocationEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Location event dropped: provider is gone");
        }
    }
}

impl LocationSource for StaticSource {
    fn request_authorization(&self) {
        self.emit(LocationEvent::Authorization(AuthorizationStatus::Authorized));
    }

    fn start_updates(&self) {
        tracing::debug!("Static source reporting {}, {}", self.latitude, self.longitude);
        self.emit(LocationEvent::Fix(Fix::new(
            self.latitude,
            self.longitude,
            0.0,
            Utc::now(),
        )));
    }

    fn stop_updates(&self) {}
}
