//! Fact generation for Nearby.
//!
//! Prompts a generative language model for facts about a place, validates
//! the reply in stages, retries malformed output a bounded number of times,
//! and publishes accepted facts to an observable store.

pub mod client;
pub mod error;
pub mod notify;
pub mod pipeline;
pub mod prompt;
pub mod retry;
pub mod store;
pub mod types;
pub mod validate;

pub use client::{ContentGenerator, GeminiClient};
pub use error::{FetchError, GenerationError, ValidationError};
pub use notify::{ChannelNotifier, LogNotifier, Notification, Notifier};
pub use pipeline::FactPipeline;
pub use prompt::build_prompt;
pub use retry::RetryPolicy;
pub use store::{FactStore, FetchPhase, FetchState};
pub use types::{Fact, FactBatch};
pub use validate::validate_response;
