use std::sync::Arc;

use parking_lot::RwLock;

use crate::types::PlaceDescription;

/// Single-slot cache of the most recently resolved place description.
///
/// Clones share the same slot. Every successful geocode overwrites it.
#[derive(Debug, Clone, Default)]
pub struct PlaceCache {
    slot: Arc<RwLock<Option<PlaceDescription>>>,
}

impl PlaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, description: PlaceDescription) {
        *self.slot.write() = Some(description);
    }

    pub fn latest(&self) -> Option<PlaceDescription> {
        self.slot.read().clone()
    }
}
