//! Wires location, geocoding and fact generation into one session.

pub mod error_mapping;
pub mod session;

pub use session::{pipeline_from_config, FactSession};
