//! Local favorites list, persisted through a pluggable key-value backend.

use crate::model::FavoriteManga;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Key the favorites list is stored under.
pub const FAVORITES_KEY: &str = "manga-favorites-v1";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot read store {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot write store {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Store {path} is not valid JSON: {source}")]
    CorruptFile {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Stored value for '{key}' is not a valid favorites list: {source}")]
    CorruptValue {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode favorites: {0}")]
    Encode(#[source] serde_json::Error),
}

/// String key-value persistence.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

/// Backend kept in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// Backend storing every key in a single JSON object file. A missing file is empty.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_DATA_HOME/mangafeed/favorites.json` (or the platform equivalent).
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("mangafeed").join("favorites.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| StoreError::CorruptFile {
            path: self.path.clone(),
            source: e,
        })
    }
}

impl KeyValueBackend for JsonFileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value);
        let write_err = |e: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source: e,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        let text = serde_json::to_string_pretty(&entries).map_err(StoreError::Encode)?;
        std::fs::write(&self.path, text).map_err(write_err)
    }
}

/// Favorites list, loaded once and written back on every change.
#[derive(Debug)]
pub struct FavoritesStore<B: KeyValueBackend> {
    backend: B,
    favorites: Vec<FavoriteManga>,
}

impl<B: KeyValueBackend> FavoritesStore<B> {
    /// Load from `backend`. A missing key is an empty list; an unreadable value is an error
    /// so the stored list is never silently replaced.
    pub fn open(backend: B) -> Result<Self, StoreError> {
        let favorites = match backend.get(FAVORITES_KEY)? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| StoreError::CorruptValue {
                key: FAVORITES_KEY.to_string(),
                source: e,
            })?,
            None => Vec::new(),
        };
        Ok(Self { backend, favorites })
    }

    pub fn list(&self) -> &[FavoriteManga] {
        &self.favorites
    }

    pub fn contains(&self, id: &str) -> bool {
        self.favorites.iter().any(|m| m.id == id)
    }

    /// Append `manga` unless its id is already present. Returns whether it was added.
    /// The in-memory list only changes once the backend write succeeds.
    pub fn add(&mut self, manga: FavoriteManga) -> Result<bool, StoreError> {
        if self.contains(&manga.id) {
            return Ok(false);
        }
        tracing::debug!(id = %manga.id, "adding favorite");
        let mut next = self.favorites.clone();
        next.push(manga);
        self.commit(next)?;
        Ok(true)
    }

    /// Remove by id. Returns whether anything was removed.
    pub fn remove(&mut self, id: &str) -> Result<bool, StoreError> {
        if !self.contains(id) {
            return Ok(false);
        }
        let next: Vec<FavoriteManga> = self
            .favorites
            .iter()
            .filter(|m| m.id != id)
            .cloned()
            .collect();
        self.commit(next)?;
        Ok(true)
    }

    fn commit(&mut self, next: Vec<FavoriteManga>) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&next).map_err(StoreError::Encode)?;
        self.backend.set(FAVORITES_KEY, raw)?;
        self.favorites = next;
        Ok(())
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn manga(id: &str) -> FavoriteManga {
        FavoriteManga {
            id: id.to_string(),
            title: format!("Title {}", id),
            cover_image: format!("https://uploads.mangadex.org/covers/{}/c.jpg.256.jpg", id),
            description: String::new(),
        }
    }

    #[test]
    fn add_ignores_duplicates_and_keeps_order() -> Result<(), StoreError> {
        let mut store = FavoritesStore::open(MemoryBackend::default())?;
        assert!(store.add(manga("a"))?);
        assert!(store.add(manga("b"))?);
        assert!(!store.add(manga("a"))?);
        let ids: Vec<_> = store.list().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        Ok(())
    }

    #[test]
    fn remove_and_contains() -> Result<(), StoreError> {
        let mut store = FavoritesStore::open(MemoryBackend::default())?;
        store.add(manga("a"))?;
        assert!(store.contains("a"));
        assert!(store.remove("a")?);
        assert!(!store.remove("a")?);
        assert!(!store.contains("a"));
        Ok(())
    }

    #[test]
    fn mutations_persist_to_backend() -> Result<(), StoreError> {
        let mut store = FavoritesStore::open(MemoryBackend::default())?;
        store.add(manga("a"))?;
        store.add(manga("b"))?;
        store.remove("a")?;
        let reopened = FavoritesStore::open(store.into_backend())?;
        assert_eq!(reopened.list(), &[manga("b")]);
        Ok(())
    }

    /// Reads succeed; every write fails.
    struct ReadOnlyBackend {
        inner: MemoryBackend,
    }

    impl KeyValueBackend for ReadOnlyBackend {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&mut self, _key: &str, _value: String) -> Result<(), StoreError> {
            Err(StoreError::Write {
                path: PathBuf::from("read-only"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[test]
    fn failed_write_leaves_list_unchanged() -> Result<(), StoreError> {
        let mut inner = MemoryBackend::default();
        inner.set(FAVORITES_KEY, serde_json::to_string(&[manga("a")]).map_err(StoreError::Encode)?)?;
        let mut store = FavoritesStore::open(ReadOnlyBackend { inner })?;

        assert!(matches!(store.add(manga("b")), Err(StoreError::Write { .. })));
        assert!(!store.contains("b"));

        assert!(matches!(store.remove("a"), Err(StoreError::Write { .. })));
        assert!(store.contains("a"));
        assert_eq!(store.list(), &[manga("a")]);
        Ok(())
    }

    #[test]
    fn corrupt_value_is_an_error() -> Result<(), StoreError> {
        let mut backend = MemoryBackend::default();
        backend.set(FAVORITES_KEY, "{not json".to_string())?;
        assert!(matches!(
            FavoritesStore::open(backend),
            Err(StoreError::CorruptValue { .. })
        ));
        Ok(())
    }

    #[test]
    fn stored_shape_uses_camel_case_cover() -> Result<(), Box<dyn Error>> {
        let mut store = FavoritesStore::open(MemoryBackend::default())?;
        store.add(manga("a"))?;
        let raw = store.into_backend().get(FAVORITES_KEY)?.ok_or("nothing stored")?;
        assert!(raw.contains("\"coverImage\""));
        Ok(())
    }

    #[test]
    fn file_backend_round_trips_and_creates_dirs() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("favorites.json");
        {
            let mut store = FavoritesStore::open(JsonFileBackend::new(&path))?;
            store.add(manga("x"))?;
        }
        assert!(path.exists());
        let store = FavoritesStore::open(JsonFileBackend::new(&path))?;
        assert!(store.contains("x"));
        Ok(())
    }

    #[test]
    fn file_backend_keeps_other_keys() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("store.json");
        let mut backend = JsonFileBackend::new(&path);
        backend.set("other", "kept".to_string())?;
        let mut store = FavoritesStore::open(backend)?;
        store.add(manga("y"))?;
        let backend = store.into_backend();
        assert_eq!(backend.get("other")?.as_deref(), Some("kept"));
        Ok(())
    }

    #[test]
    fn missing_or_empty_file_is_empty_store() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("absent.json");
        assert!(FavoritesStore::open(JsonFileBackend::new(&path))?.list().is_empty());
        std::fs::write(&path, "  \n")?;
        assert!(FavoritesStore::open(JsonFileBackend::new(&path))?.list().is_empty());
        Ok(())
    }

    #[test]
    fn corrupt_file_is_reported_not_overwritten() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("favorites.json");
        std::fs::write(&path, "[1, 2")?;
        let result = FavoritesStore::open(JsonFileBackend::new(&path));
        assert!(matches!(result, Err(StoreError::CorruptFile { .. })));
        assert_eq!(std::fs::read_to_string(&path)?, "[1, 2");
        Ok(())
    }
}
