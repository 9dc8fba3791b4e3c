use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tracing::trace;

/// Process-lifetime key/value store. Entries never expire.
#[derive(Debug, Default)]
pub struct MemCache {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        trace!(key = %key, "cache set");
        self.lock().insert(key, value);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        // A panic while holding the guard leaves the map itself intact.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
