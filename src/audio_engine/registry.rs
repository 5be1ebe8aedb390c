//! Registry of decoded samples keyed by logical identifier.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::sample::SampleBuffer;

/// Maps pad identifiers to their decoded sample buffers.
///
/// Mutated by load/unload on worker threads and read by the trigger
/// path, so all access goes through one mutex. Entries hold cheap
/// `Arc`-backed buffers; replacing an entry ends the old buffer's life
/// once the last in-flight clone drops.
#[derive(Debug, Default)]
pub(crate) struct SampleRegistry {
    entries: Mutex<HashMap<String, SampleBuffer>>,
}

impl SampleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a buffer, replacing any prior entry for the identifier.
    pub fn insert(&self, id: String, buffer: SampleBuffer) {
        self.lock().insert(id, buffer);
    }

    /// Returns a clone of the buffer for the identifier, if loaded.
    pub fn get(&self, id: &str) -> Option<SampleBuffer> {
        self.lock().get(id).cloned()
    }

    /// Removes one entry. No-op for missing identifiers.
    pub fn remove(&self, id: &str) {
        self.lock().remove(id);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Whether the identifier has a loaded buffer.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of loaded samples.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    // Entries are swapped whole, so a poisoned lock cannot hold a torn
    // map; recover the guard instead of propagating the panic.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SampleBuffer>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(value: f32) -> SampleBuffer {
        SampleBuffer::new(vec![value], 44_100)
    }

    #[test]
    fn test_insert_and_get() {
        let registry = SampleRegistry::new();
        registry.insert("kick".into(), buffer(0.5));

        assert!(registry.contains("kick"));
        assert_eq!(registry.get("kick").unwrap().samples(), &[0.5]);
        assert!(registry.get("snare").is_none());
    }

    #[test]
    fn test_insert_replaces_last_writer_wins() {
        let registry = SampleRegistry::new();
        registry.insert("kick".into(), buffer(0.1));
        registry.insert("kick".into(), buffer(0.9));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("kick").unwrap().samples(), &[0.9]);
    }

    #[test]
    fn test_replaced_buffer_outlives_eviction() {
        let registry = SampleRegistry::new();
        registry.insert("kick".into(), buffer(0.1));

        let in_flight = registry.get("kick").unwrap();
        registry.insert("kick".into(), buffer(0.9));

        // The clone taken before replacement still reads the old data.
        assert_eq!(in_flight.samples(), &[0.1]);
        assert_eq!(registry.get("kick").unwrap().samples(), &[0.9]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let registry = SampleRegistry::new();
        registry.insert("kick".into(), buffer(0.5));

        registry.remove("kick");
        registry.remove("kick");
        registry.remove("never-loaded");

        assert!(!registry.contains("kick"));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_clear_removes_everything() {
        let registry = SampleRegistry::new();
        registry.insert("kick".into(), buffer(0.1));
        registry.insert("snare".into(), buffer(0.2));

        registry.clear();
        registry.clear();

        assert_eq!(registry.len(), 0);
        assert!(!registry.contains("kick"));
    }
}
