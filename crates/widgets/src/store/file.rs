//! File-backed key-value store.
//!
//! Each key is stored as one file inside a data directory, the command-line
//! analogue of a browser profile's `localStorage`. Compare-and-set is atomic
//! only with respect to other users of the same `FileStore` value: the lock
//! is an in-process mutex, and separate handles or processes on one
//! directory are not serialized against each other. Writes go through a
//! temporary file and a rename so readers never see half a value.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KeyValueStore, StoreError};

/// A key-value store persisting each key as a file in a directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory backing this store.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }

    /// Raw file contents; text that is not UTF-8 reads as absent.
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match String::from_utf8(bytes) {
            Ok(text) => Ok(Some(text)),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding stored value that is not UTF-8");
                Ok(None)
            }
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.read(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.write(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.delete(key)
    }

    fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&str>,
        new: Option<&str>,
    ) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        if self.read(key)?.as_deref() != expected {
            return Ok(false);
        }
        match new {
            Some(value) => self.write(key, value)?,
            None => self.delete(key)?,
        }
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::{read_list, update_list};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "theme-widgets-store-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_roundtrip_and_remove() {
        let dir = temp_dir("roundtrip");
        let store = FileStore::open(&dir).unwrap();

        store.set("ks-bundle-1", "[]").unwrap();
        assert_eq!(store.get("ks-bundle-1").unwrap().as_deref(), Some("[]"));

        // A second handle on the same directory sees the value
        let other = FileStore::open(&dir).unwrap();
        assert_eq!(other.get("ks-bundle-1").unwrap().as_deref(), Some("[]"));

        store.remove("ks-bundle-1").unwrap();
        assert_eq!(other.get("ks-bundle-1").unwrap(), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_compare_and_set() {
        let dir = temp_dir("cas");
        let store = FileStore::open(&dir).unwrap();

        assert!(store.compare_and_set("k", None, Some("a")).unwrap());
        assert!(!store.compare_and_set("k", Some("b"), Some("c")).unwrap());
        assert!(store.compare_and_set("k", Some("a"), None).unwrap());
        assert_eq!(store.get("k").unwrap(), None);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_invalid_utf8_reads_absent() {
        let dir = temp_dir("utf8");
        let store = FileStore::open(&dir).unwrap();
        fs::write(dir.join("ks-bundle-p.json"), [0xff, 0xfe, b'[', b']']).unwrap();

        assert_eq!(store.get("ks-bundle-p").unwrap(), None);
        let items: Vec<u32> = read_list(&store, "ks-bundle-p").unwrap();
        assert!(items.is_empty());

        // The next write replaces the garbage
        let updated = update_list::<u32, _>(&store, "ks-bundle-p", |mut items| {
            items.push(7);
            Some(items)
        })
        .unwrap();
        assert_eq!(updated, Some(vec![7]));
        assert_eq!(store.get("ks-bundle-p").unwrap().as_deref(), Some("[7]"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_keys_are_escaped() {
        let dir = temp_dir("escape");
        let store = FileStore::open(&dir).unwrap();

        store.set("../escape", "x").unwrap();
        assert!(dir.join("..%2Fescape.json").exists());

        fs::remove_dir_all(&dir).unwrap();
    }
}
