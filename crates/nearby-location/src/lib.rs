//! Location services for Nearby
//!
//! Turns a stream of position events from an injectable source into
//! accepted fixes, and reverse geocodes them into place descriptions.

pub mod cache;
pub mod geocode;
pub mod provider;
pub mod source;
pub mod types;

pub use cache::PlaceCache;
pub use geocode::{NominatimGeocoder, Resolver, ReverseGeocoder};
pub use provider::{evaluate_fix, FixDecision, LocationProvider, ProviderState};
pub use source::{event_channel, LocationSource, StaticSource};
pub use types::*;
