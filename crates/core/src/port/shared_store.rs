// Shared State Store Port (Interface)

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// The two named collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    HelpQueue,
    Questions,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::HelpQueue, Collection::Questions];

    /// Storage key
    pub fn name(&self) -> &'static str {
        match self {
            Collection::HelpQueue => "help_queue",
            Collection::Questions => "questions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Write counter for a collection. 0 means never written.
pub type Version = u64;

/// A value together with the collection version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub value: T,
    pub version: Version,
}

/// Result of a conditional write
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Written; carries the new version
    Written(Version),
    /// Someone else wrote first; carries what is stored now
    Conflict(Versioned<Option<Value>>),
}

/// Store holding whole collections.
///
/// Every write replaces the entire collection; there is no partial or merge
/// write. Absence (`None`) is read by callers as an empty sequence.
#[async_trait]
pub trait SharedStore: Send + Sync {
    /// Read a collection
    async fn read(&self, collection: Collection) -> Result<Versioned<Option<Value>>>;

    /// Replace a collection unconditionally (last writer wins)
    async fn write(&self, collection: Collection, value: &Value) -> Result<Version>;

    /// Replace a collection only if it is still at `expected`
    async fn write_if_version(
        &self,
        collection: Collection,
        value: &Value,
        expected: Version,
    ) -> Result<WriteOutcome>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory store shared by every session holding the same `Arc`
    #[derive(Default)]
    pub struct InMemoryStore {
        collections: Mutex<HashMap<Collection, Versioned<Value>>>,
        unavailable: AtomicBool,
        writes: AtomicUsize,
    }

    impl InMemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make every call fail with `StoreUnavailable` until reset
        pub fn set_unavailable(&self, unavailable: bool) {
            self.unavailable.store(unavailable, Ordering::SeqCst);
        }

        /// Number of successful writes so far
        pub fn write_count(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        /// Raw stored value, bypassing availability
        pub fn peek(&self, collection: Collection) -> Option<Value> {
            self.collections
                .lock()
                .unwrap()
                .get(&collection)
                .map(|v| v.value.clone())
        }

        fn check_available(&self) -> Result<()> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(AppError::StoreUnavailable(
                    "in-memory store offline".to_string(),
                ));
            }
            Ok(())
        }

        fn put(
            map: &mut HashMap<Collection, Versioned<Value>>,
            collection: Collection,
            value: &Value,
        ) -> Version {
            let version = map.get(&collection).map(|v| v.version).unwrap_or(0) + 1;
            map.insert(
                collection,
                Versioned {
                    value: value.clone(),
                    version,
                },
            );
            version
        }
    }

    #[async_trait]
    impl SharedStore for InMemoryStore {
        async fn read(&self, collection: Collection) -> Result<Versioned<Option<Value>>> {
            self.check_available()?;
            let map = self.collections.lock().unwrap();
            Ok(match map.get(&collection) {
                Some(v) => Versioned {
                    value: Some(v.value.clone()),
                    version: v.version,
                },
                None => Versioned {
                    value: None,
                    version: 0,
                },
            })
        }

        async fn write(&self, collection: Collection, value: &Value) -> Result<Version> {
            self.check_available()?;
            let mut map = self.collections.lock().unwrap();
            let version = Self::put(&mut map, collection, value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(version)
        }

        async fn write_if_version(
            &self,
            collection: Collection,
            value: &Value,
            expected: Version,
        ) -> Result<WriteOutcome> {
            self.check_available()?;
            let mut map = self.collections.lock().unwrap();
            let current = map.get(&collection).map(|v| v.version).unwrap_or(0);
            if current != expected {
                return Ok(WriteOutcome::Conflict(Versioned {
                    value: map.get(&collection).map(|v| v.value.clone()),
                    version: current,
                }));
            }
            let version = Self::put(&mut map, collection, value);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(WriteOutcome::Written(version))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::InMemoryStore;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_collection_reads_as_none() {
        let store = InMemoryStore::new();
        let read = store.read(Collection::Questions).await.unwrap();
        assert_eq!(read.value, None);
        assert_eq!(read.version, 0);
    }

    #[tokio::test]
    async fn test_write_replaces_whole_collection() {
        let store = InMemoryStore::new();
        store.write(Collection::HelpQueue, &json!([1, 2])).await.unwrap();
        let v = store.write(Collection::HelpQueue, &json!([3])).await.unwrap();
        assert_eq!(v, 2);

        let read = store.read(Collection::HelpQueue).await.unwrap();
        assert_eq!(read.value, Some(json!([3])));
    }

    #[tokio::test]
    async fn test_conditional_write_detects_stale_version() {
        let store = InMemoryStore::new();
        store.write(Collection::HelpQueue, &json!(["a"])).await.unwrap();

        let outcome = store
            .write_if_version(Collection::HelpQueue, &json!(["b"]), 0)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Conflict(Versioned {
                value: Some(json!(["a"])),
                version: 1
            })
        );

        let outcome = store
            .write_if_version(Collection::HelpQueue, &json!(["b"]), 1)
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Written(2));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.read(Collection::HelpQueue).await,
            Err(crate::error::AppError::StoreUnavailable(_))
        ));
        assert!(store.write(Collection::HelpQueue, &json!([])).await.is_err());
        assert_eq!(store.write_count(), 0);
    }
}
