//! Maps crate-level errors to `nearby_core::AppError` for consistent messages.

use nearby_core::{AppError, ReqwestErrorExt, ServiceError};
use nearby_facts::{FetchError, GenerationError};
use nearby_location::{GeocodeError, LocationError};

pub fn location_error(e: LocationError) -> AppError {
    match e {
        LocationError::PermissionDenied | LocationError::Restricted => {
            AppError::Service(ServiceError::LocationDenied)
        }
        other => AppError::Service(ServiceError::LocationUnavailable(other.to_string())),
    }
}

pub fn geocode_error(e: GeocodeError) -> AppError {
    match e {
        GeocodeError::Network(err) => AppError::Network(err.into_network_error()),
        other => AppError::Service(ServiceError::PlaceNotFound(other.to_string())),
    }
}

pub fn generation_error(e: GenerationError) -> AppError {
    match e {
        GenerationError::Network(err) => AppError::Network(err.into_network_error()),
        other => AppError::Service(ServiceError::GenerationFailed(other.to_string())),
    }
}

pub fn fetch_error(e: FetchError) -> AppError {
    match e {
        FetchError::Generation(err) => generation_error(err),
        FetchError::Exhausted { attempts, .. } => {
            AppError::Service(ServiceError::FactsExhausted { attempts })
        }
        FetchError::Superseded => AppError::Service(ServiceError::Superseded),
    }
}
