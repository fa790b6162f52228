//! Centralized error types for the Nearby application.
//!
//! Library crates keep their own precise error enums; the service layer maps
//! them into `AppError` so that every failure has a short, user-facing
//! message next to the full context used for logging.

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for display.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Service(e) => e.user_message(),
        }
    }

    /// Whether the failure ends the current session rather than a single cycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Service(ServiceError::LocationDenied)
        )
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingSetting(_) => "A required setting is missing. Check your settings.",
        }
    }
}

/// Location and fact service errors, flattened for display.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Location access denied")]
    LocationDenied,

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Place not found: {0}")]
    PlaceNotFound(String),

    #[error("Fact generation failed: {0}")]
    GenerationFailed(String),

    #[error("No valid facts after {attempts} attempts")]
    FactsExhausted { attempts: u32 },

    /// A newer request replaced this one. Not a failure.
    #[error("Replaced by a newer request")]
    Superseded,
}

impl ServiceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ServiceError::LocationDenied => {
                "Location access is turned off. Enable it in your settings."
            }
            ServiceError::LocationUnavailable(_) => "Your location is not available yet.",
            ServiceError::PlaceNotFound(_) => "Couldn't work out where you are.",
            ServiceError::GenerationFailed(_) => "Couldn't load facts. Please try again.",
            ServiceError::FactsExhausted { .. } => {
                "Couldn't load facts for this place. Please try again later."
            }
            ServiceError::Superseded => "Loading facts for your new location.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
