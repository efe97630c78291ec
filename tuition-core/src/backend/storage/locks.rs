//! Per-key write locks shared by every handle onto one store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Mutex as AsyncMutex;

/// Registry of one async mutex per key. Clones share the registry.
#[derive(Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding read-modify-write cycles on a key
    pub fn for_key(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_shares_one_mutex() {
        let locks = KeyLocks::new();
        let clone = locks.clone();

        assert!(Arc::ptr_eq(&locks.for_key("a"), &clone.for_key("a")));
        assert!(!Arc::ptr_eq(&locks.for_key("a"), &locks.for_key("b")));
    }
}
