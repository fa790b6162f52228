//! Fact request pipeline: prompt, generate, validate, retry, publish.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::client::ContentGenerator;
use crate::error::{FetchError, ValidationError};
use crate::notify::Notifier;
use crate::prompt::build_prompt;
use crate::retry::RetryPolicy;
use crate::store::FactStore;
use crate::types::{Fact, FactBatch};

pub const DEFAULT_MIN_FACTS: u32 = 10;

/// The run currently allowed to write the store.
#[derive(Default)]
struct ActiveRun {
    generation: u64,
    token: Option<CancellationToken>,
}

/// Turns a place description into a validated fact list.
///
/// At most one fetch owns the store at a time: starting a fetch cancels the
/// previous one, which then returns `FetchError::Superseded` without writing.
pub struct FactPipeline {
    generator: Arc<dyn ContentGenerator>,
    store: FactStore,
    policy: RetryPolicy,
    min_facts: u32,
    notifier: Option<Arc<dyn Notifier>>,
    active: Mutex<ActiveRun>,
}

impl FactPipeline {
    pub fn new(generator: Arc<dyn ContentGenerator>, store: FactStore) -> Self {
        Self {
            generator,
            store,
            policy: RetryPolicy::default(),
            min_facts: DEFAULT_MIN_FACTS,
            notifier: None,
            active: Mutex::new(ActiveRun::default()),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_min_facts(mut self, min_facts: u32) -> Self {
        self.min_facts = min_facts;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn store(&self) -> &FactStore {
        &self.store
    }

    /// Fetch facts for `place` and publish them to the store.
    ///
    /// # Errors
    /// `Generation` when the model call itself fails, `Exhausted` when every
    /// attempt returned malformed output, `Superseded` when a newer fetch
    /// started meanwhile. In all cases the store keeps its previous facts.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch(&self, place: &str) -> Result<Vec<Fact>, FetchError> {
        let (generation, token) = self.begin_run();

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::info!("Fetch for {} superseded", place);
                return Err(FetchError::Superseded);
            }
            outcome = self.attempt(place) => outcome,
        };

        match outcome {
            Ok(batch) => {
                let FactBatch { location, facts } = batch;
                let published = facts.clone();
                let count = facts.len();
                if !self.finish_run(generation, |store| store.replace(location.clone(), facts)) {
                    return Err(FetchError::Superseded);
                }
                tracing::info!("Loaded {} facts for {}", count, location);
                if let Some(notifier) = &self.notifier {
                    notifier.facts_available(&location, count);
                }
                Ok(published)
            }
            Err(err) => {
                if !self.finish_run(generation, FactStore::fail) {
                    return Err(FetchError::Superseded);
                }
                tracing::error!("Fact fetch for {} failed: {}", place, err);
                Err(err)
            }
        }
    }

    /// Run generation attempts until one validates or the policy is exhausted.
    async fn attempt(&self, place: &str) -> Result<FactBatch, FetchError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let prompt = build_prompt(place, self.min_facts);
            let text = self.generator.generate(&prompt).await?;

            let last: ValidationError = match crate::validate::validate_response(&text) {
                Ok(batch) => {
                    if attempt > 1 {
                        tracing::info!("Valid response after {} attempts", attempt);
                    }
                    return Ok(batch);
                }
                Err(e) => e,
            };

            tracing::warn!(
                stage = last.stage(),
                "Malformed model output on attempt {} of {}: {}",
                attempt,
                self.policy.max_attempts,
                last
            );

            if !self.policy.allows_retry_after(attempt) {
                return Err(FetchError::Exhausted {
                    attempts: attempt,
                    last,
                });
            }

            let delay = self.policy.delay_for_retry(attempt - 1);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn begin_run(&self) -> (u64, CancellationToken) {
        let mut active = self.active.lock();
        if let Some(previous) = active.token.take() {
            tracing::debug!("Cancelling in-flight fetch");
            previous.cancel();
        }
        active.generation += 1;
        let token = CancellationToken::new();
        active.token = Some(token.clone());
        self.store.begin_loading();
        (active.generation, token)
    }

    /// Apply `write` only if `generation` is still the newest run.
    fn finish_run(&self, generation: u64, write: impl FnOnce(&FactStore)) -> bool {
        let mut active = self.active.lock();
        if active.generation != generation {
            return false;
        }
        active.token = None;
        write(&self.store);
        true
    }
}
