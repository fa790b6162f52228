use std::sync::Arc;

use tokio::sync::watch;

use crate::types::Fact;

/// Coarse fetch lifecycle seen by observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last fetch produced nothing; previous facts are kept.
    Failed,
}

/// Snapshot of the fact store
#[derive(Debug, Clone, Default)]
pub struct FetchState {
    pub phase: FetchPhase,
    pub facts: Arc<Vec<Fact>>,
    /// Location label of the last accepted batch
    pub location: Option<String>,
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        self.phase == FetchPhase::Loading
    }
}

/// Observable holder of the latest accepted facts.
///
/// Clones share state. Observers never see error values, only phases.
#[derive(Debug, Clone)]
pub struct FactStore {
    tx: Arc<watch::Sender<FetchState>>,
}

impl Default for FactStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FactStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FetchState::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> FetchState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.tx.subscribe()
    }

    pub fn begin_loading(&self) {
        self.tx.send_modify(|state| state.phase = FetchPhase::Loading);
    }

    /// Replace all facts with a new batch.
    pub fn replace(&self, location: String, facts: Vec<Fact>) {
        self.tx.send_modify(|state| {
            state.phase = FetchPhase::Ready;
            state.facts = Arc::new(facts);
            state.location = Some(location);
        });
    }

    /// End a fetch that produced nothing, keeping the current facts.
    pub fn fail(&self) {
        self.tx.send_modify(|state| state.phase = FetchPhase::Failed);
    }
}
