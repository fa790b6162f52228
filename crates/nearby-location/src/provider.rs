//! Location provider: filters source events into fresh, valid fixes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;

use crate::source::LocationSource;
use crate::types::{AuthorizationStatus, Fix, LocationError, LocationEvent, LocationFailure};

/// Fixes older than this are discarded unless configured otherwise.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5);

/// Provider lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    NotDetermined,
    Authorized,
    Updating,
    /// A fix was accepted and handed out for geocoding
    Resolving,
    Resolved,
    /// Permission denied or restricted. Terminal.
    Denied,
    Error,
}

/// Outcome of checking a fix against the freshness and accuracy rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixDecision {
    Accepted,
    Stale,
    InvalidAccuracy,
}

/// Classify a fix at `now`.
///
/// Negative accuracy is invalid regardless of age. A fix is stale when it is
/// strictly older than `freshness`.
pub fn evaluate_fix(fix: &Fix, now: DateTime<Utc>, freshness: TimeDelta) -> FixDecision {
    if fix.horizontal_accuracy < 0.0 || fix.horizontal_accuracy.is_nan() {
        return FixDecision::InvalidAccuracy;
    }
    if now.signed_duration_since(fix.timestamp) > freshness {
        return FixDecision::Stale;
    }
    FixDecision::Accepted
}

/// Owns a location source and the receiving end of its event channel.
pub struct LocationProvider {
    source: Arc<dyn LocationSource>,
    events: mpsc::UnboundedReceiver<LocationEvent>,
    freshness: TimeDelta,
    status: AuthorizationStatus,
    state: ProviderState,
    latest: Option<Fix>,
}

impl LocationProvider {
    pub fn new(
        source: Arc<dyn LocationSource>,
        events: mpsc::UnboundedReceiver<LocationEvent>,
        freshness: Duration,
    ) -> Self {
        let freshness = TimeDelta::from_std(freshness).unwrap_or_else(|_| {
            tracing::warn!("Freshness window out of range, using default");
            TimeDelta::seconds(DEFAULT_FRESHNESS.as_secs() as i64)
        });

        Self {
            source,
            events,
            freshness,
            status: AuthorizationStatus::NotDetermined,
            state: ProviderState::NotDetermined,
            latest: None,
        }
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    pub fn authorization(&self) -> AuthorizationStatus {
        self.status
    }

    /// Ask the source for permission if it hasn't been decided yet.
    pub fn request_authorization(&self) {
        if self.status == AuthorizationStatus::NotDetermined {
            tracing::debug!("Requesting location authorization");
            self.source.request_authorization();
        }
    }

    /// The latest accepted fix, if it is still fresh at `now`.
    pub fn current_fix(&self, now: DateTime<Utc>) -> Option<Fix> {
        self.latest
            .filter(|fix| evaluate_fix(fix, now, self.freshness) == FixDecision::Accepted)
    }

    /// Mark the fix handed out by `handle`/`next_fix` as geocoded.
    pub fn mark_resolved(&mut self) {
        if self.state == ProviderState::Resolving {
            self.state = ProviderState::Resolved;
        }
    }

    /// Apply one source event at time `now`.
    ///
    /// Returns the fix when it should be geocoded, `None` when the event was
    /// absorbed, and an error for failures reported by the source.
    pub fn handle(
        &mut self,
        event: LocationEvent,
        now: DateTime<Utc>,
    ) -> Result<Option<Fix>, LocationError> {
        match event {
            LocationEvent::Authorization(status) => self.on_authorization(status).map(|()| None),
            LocationEvent::Fix(fix) => Ok(self.on_fix(fix, now)),
            LocationEvent::Failed(failure) => Err(self.on_failure(failure)),
        }
    }

    /// Wait for the next accepted fix using the wall clock.
    ///
    /// # Errors
    /// Returns terminal errors for denied access, transient ones for
    /// failures the source may recover from, and `ServiceUnavailable` once
    /// the source has gone away.
    pub async fn next_fix(&mut self) -> Result<Fix, LocationError> {
        loop {
            match self.state {
                ProviderState::Denied if self.status == AuthorizationStatus::Restricted => {
                    return Err(LocationError::Restricted)
                }
                ProviderState::Denied => return Err(LocationError::PermissionDenied),
                _ => {}
            }

            let event = self
                .events
                .recv()
                .await
                .ok_or(LocationError::ServiceUnavailable)?;

            if let Some(fix) = self.handle(event, Utc::now())? {
                return Ok(fix);
            }
        }
    }

    /// Whether location updates have been started under a granted authorization.
    fn is_updating(&self) -> bool {
        matches!(
            self.state,
            ProviderState::Updating
                | ProviderState::Resolving
                | ProviderState::Resolved
                | ProviderState::Error
        )
    }

    fn restart_updates(&self) {
        self.source.stop_updates();
        self.source.start_updates();
    }

    fn on_authorization(&mut self, status: AuthorizationStatus) -> Result<(), LocationError> {
        if self.state == ProviderState::Denied {
            tracing::debug!("Ignoring authorization change to {:?} after denial", status);
            return Ok(());
        }

        tracing::info!("Location authorization changed: {:?}", status);
        self.status = status;

        match status {
            AuthorizationStatus::NotDetermined => {
                self.state = ProviderState::NotDetermined;
                Ok(())
            }
            AuthorizationStatus::Authorized => {
                if !self.is_updating() {
                    self.state = ProviderState::Authorized;
                    self.source.start_updates();
                    self.state = ProviderState::Updating;
                }
                Ok(())
            }
            AuthorizationStatus::Denied => {
                self.deny();
                Err(LocationError::PermissionDenied)
            }
            AuthorizationStatus::Restricted => {
                self.deny();
                Err(LocationError::Restricted)
            }
        }
    }

    fn on_fix(&mut self, fix: Fix, now: DateTime<Utc>) -> Option<Fix> {
        if !self.is_updating() {
            tracing::debug!("Ignoring fix in state {:?}", self.state);
            return None;
        }

        match evaluate_fix(&fix, now, self.freshness) {
            FixDecision::InvalidAccuracy => {
                tracing::warn!(
                    "Invalid fix accuracy {}, restarting location updates",
                    fix.horizontal_accuracy
                );
                self.restart_updates();
                self.state = ProviderState::Updating;
                None
            }
            FixDecision::Stale => {
                tracing::debug!(
                    "Discarding stale fix from {} ({}s old)",
                    fix.timestamp,
                    now.signed_duration_since(fix.timestamp).num_seconds()
                );
                None
            }
            FixDecision::Accepted => {
                tracing::debug!("Accepted fix {}, {}", fix.latitude, fix.longitude);
                self.latest = Some(fix);
                self.state = ProviderState::Resolving;
                Some(fix)
            }
        }
    }

    fn on_failure(&mut self, failure: LocationFailure) -> LocationError {
        tracing::warn!("Location source failure: {:?}", failure);
        let err = match failure {
            LocationFailure::Denied => {
                if self.state != ProviderState::Denied {
                    self.status = AuthorizationStatus::Denied;
                    self.deny();
                }
                return LocationError::PermissionDenied;
            }
            LocationFailure::LocationUnknown => LocationError::LocationUnknown,
            LocationFailure::Network => {
                LocationError::Network("positioning network unavailable".to_string())
            }
            LocationFailure::Other(message) => LocationError::Other(message),
        };

        if self.is_updating() {
            self.state = ProviderState::Error;
            if err.is_transient() {
                tracing::info!("Restarting location updates after {}", err);
                self.restart_updates();
            }
        }
        err
    }

    fn deny(&mut self) {
        self.state = ProviderState::Denied;
        self.latest = None;
        self.source.stop_updates();
    }
}
