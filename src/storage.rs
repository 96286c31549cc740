//! Small key/value store for client state that survives restarts.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, warn};

pub const WALLET_CONNECTED_KEY: &str = "wallet_connected";
pub const THEME_KEY: &str = "theme";

/// String key/value persistence
pub trait ClientStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// In-memory store, lost on exit
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClientStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object on disk, rewritten on every change
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    /// Open `path`; a missing or unreadable file starts empty
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!("Ignoring corrupt state file {}: {}", path.display(), e);
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        debug!("Loaded {} persisted values from {}", values.len(), path.display());
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn flush(&self, values: &HashMap<String, String>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl ClientStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}

/// Whether the user explicitly connected a wallet last time
pub fn was_connected(store: &dyn ClientStore) -> bool {
    store.get(WALLET_CONNECTED_KEY).as_deref() == Some("true")
}

pub fn mark_connected(store: &dyn ClientStore) -> anyhow::Result<()> {
    store.set(WALLET_CONNECTED_KEY, "true")
}

pub fn clear_connected(store: &dyn ClientStore) -> anyhow::Result<()> {
    store.remove(WALLET_CONNECTED_KEY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for ThemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
            ThemePreference::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for ThemePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            "system" => Ok(ThemePreference::System),
            other => anyhow::bail!("unknown theme: {}", other),
        }
    }
}

/// Stored theme, `system` when unset or unrecognized
pub fn load_theme(store: &dyn ClientStore) -> ThemePreference {
    store
        .get(THEME_KEY)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default()
}

pub fn save_theme(store: &dyn ClientStore, theme: ThemePreference) -> anyhow::Result<()> {
    store.set(THEME_KEY, &theme.to_string())
}
