use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single reported device position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy radius in meters. Negative means invalid.
    pub horizontal_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64, horizontal_accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy,
            timestamp,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Location permission state as reported by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Authorized,
    Denied,
    Restricted,
}

/// Failure reported by the location source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationFailure {
    /// No position could be determined right now
    LocationUnknown,
    /// Network needed for positioning was unavailable
    Network,
    /// Permission was revoked while updating
    Denied,
    Other(String),
}

/// Events delivered by a `LocationSource`
#[derive(Debug, Clone, PartialEq)]
pub enum LocationEvent {
    Authorization(AuthorizationStatus),
    Fix(Fix),
    Failed(LocationFailure),
}

/// Human-readable place, most specific component first ("Paris, Île-de-France, France")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceDescription(String);

impl PlaceDescription {
    pub fn new(description: impl Into<String>) -> Self {
        Self(description.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaceDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Address components returned by a reverse geocoder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceComponents {
    pub locality: Option<String>,
    pub administrative_area: Option<String>,
    pub country: Option<String>,
}

impl PlaceComponents {
    /// Join the present components, most specific first.
    ///
    /// Empty components and repeats of the previous component are skipped.
    /// Returns `None` when nothing usable is left.
    pub fn describe(&self) -> Option<PlaceDescription> {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        for part in [&self.locality, &self.administrative_area, &self.country]
            .into_iter()
            .flatten()
        {
            let part = part.trim();
            if part.is_empty() || parts.last() == Some(&part) {
                continue;
            }
            parts.push(part);
        }

        if parts.is_empty() {
            None
        } else {
            Some(PlaceDescription(parts.join(", ")))
        }
    }
}

/// Location service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location access restricted")]
    Restricted,
    #[error("Location currently unknown")]
    LocationUnknown,
    #[error("Location network error: {0}")]
    Network(String),
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location error: {0}")]
    Other(String),
}

impl LocationError {
    /// Denied and restricted access never recover without user action.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Restricted)
    }

    /// The caller may wait for the next fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::LocationUnknown | Self::Network(_))
    }
}

/// Reverse geocoding errors
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("A reverse geocode is already in flight")]
    Busy,
    #[error("No place found for these coordinates")]
    NotFound,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Geocoder returned status {0}")]
    Status(u16),
}

impl GeocodeError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_) | Self::NotFound | Self::Status(_))
    }
}
