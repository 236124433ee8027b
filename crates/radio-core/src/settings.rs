//! Persisted player settings: a tiny string key/value store that survives
//! restarts.  Only two keys are used: `radio-volume` and `radio-muted`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, warn};

pub const VOLUME_KEY: &str = "radio-volume";
pub const MUTED_KEY: &str = "radio-muted";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings encode: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// JSON-file backed store.  The whole map is rewritten on every `set`.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_entries(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> BTreeMap<String, String> {
        let Ok(content) = std::fs::read_to_string(path) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                warn!("Ignoring unreadable settings file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let json = {
            let mut entries = match self.entries.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            entries.insert(key.to_string(), value.to_string());
            serde_json::to_string_pretty(&*entries)?
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pairs: &[(&str, &str)]) -> Self {
        let store = Self::new();
        for (k, v) in pairs {
            let _ = store.set(k, v);
        }
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}

/// Settings read once at startup.  `None` means "absent or invalid; keep
/// the handle's current value".
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PersistedSettings {
    pub volume: Option<f32>,
    pub muted: Option<bool>,
}

impl PersistedSettings {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let volume = store.get(VOLUME_KEY).and_then(|v| parse_volume(&v));
        let muted = store.get(MUTED_KEY).and_then(|v| parse_muted(&v));
        debug!("settings: loaded volume={:?} muted={:?}", volume, muted);
        Self { volume, muted }
    }
}

/// A stored volume is valid only when it parses as a number within [0, 1].
pub fn parse_volume(raw: &str) -> Option<f32> {
    raw.trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && (0.0..=1.0).contains(v))
}

pub fn parse_muted(raw: &str) -> Option<bool> {
    match raw {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

pub fn save_volume(store: &dyn KeyValueStore, volume: f32) {
    if let Err(e) = store.set(VOLUME_KEY, &volume.to_string()) {
        warn!("Failed to persist volume: {}", e);
    }
}

pub fn save_muted(store: &dyn KeyValueStore, muted: bool) {
    if let Err(e) = store.set(MUTED_KEY, if muted { "true" } else { "false" }) {
        warn!("Failed to persist mute flag: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_valid_values() {
        let store = MemoryStore::with(&[(VOLUME_KEY, "0.42"), (MUTED_KEY, "true")]);
        let s = PersistedSettings::load(&store);
        assert_eq!(s.volume, Some(0.42));
        assert_eq!(s.muted, Some(true));
    }

    #[test]
    fn test_out_of_range_and_garbage_are_ignored() {
        let store = MemoryStore::with(&[(VOLUME_KEY, "5"), (MUTED_KEY, "yes")]);
        assert_eq!(PersistedSettings::load(&store), PersistedSettings::default());

        let store = MemoryStore::with(&[(VOLUME_KEY, "loud"), (MUTED_KEY, "TRUE")]);
        assert_eq!(PersistedSettings::load(&store), PersistedSettings::default());

        assert_eq!(parse_volume("-0.1"), None);
        assert_eq!(parse_volume("NaN"), None);
        assert_eq!(parse_volume("1"), Some(1.0));
        assert_eq!(parse_volume("0"), Some(0.0));
    }

    #[test]
    fn test_save_writes_string_forms() {
        let store = MemoryStore::new();
        save_volume(&store, 0.25);
        save_muted(&store, false);
        assert_eq!(store.get(VOLUME_KEY).as_deref(), Some("0.25"));
        assert_eq!(store.get(MUTED_KEY).as_deref(), Some("false"));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let store = FileStore::open(&path);
        save_volume(&store, 0.5);
        save_muted(&store, true);
        drop(store);

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get(VOLUME_KEY).as_deref(), Some("0.5"));
        assert_eq!(reopened.get(MUTED_KEY).as_deref(), Some("true"));
        assert_eq!(reopened.get("other"), None);
    }

    #[test]
    fn test_file_store_ignores_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get(VOLUME_KEY), None);
        save_volume(&store, 0.1);
        assert_eq!(FileStore::open(&path).get(VOLUME_KEY).as_deref(), Some("0.1"));
    }
}
