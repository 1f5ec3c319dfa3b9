//! Local key-value persistence.
//!
//! Widgets that keep client-owned state (bundle contents, wishlist) persist
//! it as serialized JSON text under a fixed key, the way a browser theme uses
//! `localStorage`. The store is injected behind [`KeyValueStore`] so widgets
//! can be exercised without a browser, and exposes compare-and-set so
//! read-modify-write cycles can detect a concurrent writer sharing the same
//! store value.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors raised by a key-value store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized.
    #[error("failed to serialize value for {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Compare-and-set kept losing against concurrent writers.
    #[error("concurrent modification of {key} after {attempts} attempts")]
    Conflict { key: String, attempts: u32 },

    /// The store lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A string key-value store with `localStorage` semantics plus compare-and-set.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Atomically replace the value under `key` with `new` (or delete it when
    /// `new` is `None`) only if the current value equals `expected`.
    ///
    /// Returns `false`, leaving the store untouched, when the current value
    /// differs from `expected`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read or written.
    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool, StoreError>;
}

/// Maximum compare-and-set rounds before giving up on a contended key.
const MAX_CAS_ATTEMPTS: u32 = 4;

/// Decode a JSON list stored under `key`.
///
/// Absent keys and malformed text both decode to an empty list: corrupt
/// client state is discarded, never partially recovered.
///
/// # Errors
///
/// Returns `StoreError` only when the backend itself fails.
pub fn read_list<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Vec<T>, StoreError> {
    Ok(decode_list(key, store.get(key)?.as_deref()))
}

/// Read-modify-write the list under `key` with optimistic concurrency.
///
/// `mutate` receives the current list and returns `Some(new_list)` to persist
/// or `None` to leave the store untouched. When another writer changes the
/// key between read and write the cycle is re-run against the fresh value.
///
/// Returns the list as persisted, or `None` when `mutate` declined to write.
///
/// # Errors
///
/// Returns `StoreError::Conflict` after repeated lost races, or any backend error.
pub fn update_list<T, F>(
    store: &dyn KeyValueStore,
    key: &str,
    mut mutate: F,
) -> Result<Option<Vec<T>>, StoreError>
where
    T: Serialize + DeserializeOwned,
    F: FnMut(Vec<T>) -> Option<Vec<T>>,
{
    for attempt in 1..=MAX_CAS_ATTEMPTS {
        let raw = store.get(key)?;
        let current = decode_list(key, raw.as_deref());

        let Some(next) = mutate(current) else {
            return Ok(None);
        };

        let text = encode_list(key, &next)?;
        if store.compare_and_set(key, raw.as_deref(), Some(&text))? {
            return Ok(Some(next));
        }

        tracing::debug!(key, attempt, "lost compare-and-set race, retrying");
    }

    Err(StoreError::Conflict {
        key: key.to_string(),
        attempts: MAX_CAS_ATTEMPTS,
    })
}

fn decode_list<T: DeserializeOwned>(key: &str, raw: Option<&str>) -> Vec<T> {
    let Some(text) = raw else {
        return Vec::new();
    };

    match serde_json::from_str::<Option<Vec<T>>>(text) {
        Ok(items) => items.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "discarding malformed stored list");
            Vec::new()
        }
    }
}

fn encode_list<T: Serialize>(key: &str, items: &[T]) -> Result<String, StoreError> {
    serde_json::to_string(items).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_read_list_absent_is_empty() {
        let store = MemoryStore::new();
        let items: Vec<u32> = read_list(&store, "missing").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_read_list_malformed_is_empty() {
        let store = MemoryStore::new();
        store.set("k", "[1, 2, oops").unwrap();
        let items: Vec<u32> = read_list(&store, "k").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_read_list_null_is_empty() {
        let store = MemoryStore::new();
        store.set("k", "null").unwrap();
        let items: Vec<u32> = read_list(&store, "k").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_write_then_read() {
        let store = MemoryStore::new();
        store.set("k", &encode_list("k", &[3_u32, 1, 2]).unwrap()).unwrap();
        let items: Vec<u32> = read_list(&store, "k").unwrap();
        assert_eq!(items, vec![3, 1, 2]);
    }

    #[test]
    fn test_update_list_declined_does_not_write() {
        let store = MemoryStore::new();
        let result = update_list::<u32, _>(&store, "k", |_| None).unwrap();
        assert!(result.is_none());
        assert!(store.get("k").unwrap().is_none());
    }

    /// A store whose value changes underneath the first compare-and-set.
    struct RacingStore {
        inner: MemoryStore,
        races: AtomicU32,
    }

    impl KeyValueStore for RacingStore {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }

        fn compare_and_set(
            &self,
            key: &str,
            expected: Option<&str>,
            new: Option<&str>,
        ) -> Result<bool, StoreError> {
            if self.races.load(Ordering::SeqCst) > 0 {
                self.races.fetch_sub(1, Ordering::SeqCst);
                // Another tab appends an item in between
                self.inner.set(key, "[99]")?;
            }
            self.inner.compare_and_set(key, expected, new)
        }
    }

    #[test]
    fn test_update_list_retries_on_conflict() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            races: AtomicU32::new(1),
        };

        let result = update_list::<u32, _>(&store, "k", |mut items| {
            items.push(1);
            Some(items)
        })
        .unwrap();

        // The concurrent write is preserved rather than clobbered
        assert_eq!(result, Some(vec![99, 1]));
        let items: Vec<u32> = read_list(&store, "k").unwrap();
        assert_eq!(items, vec![99, 1]);
    }

    #[test]
    fn test_update_list_gives_up_after_repeated_conflicts() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            races: AtomicU32::new(MAX_CAS_ATTEMPTS),
        };

        let result = update_list::<u32, _>(&store, "k", |mut items| {
            items.push(1);
            Some(items)
        });

        assert!(matches!(result, Err(StoreError::Conflict { attempts: 4, .. })));
    }
}
