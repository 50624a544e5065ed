//! Wizard progress persistence.

use crate::error::PersistenceError;
use crate::project::ValueMap;
use crate::spec::keys::rekey_object;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_STATE_PATH: &str = "/var/lib/installer/wizard-state.json";

const STATE_KEYS: &[&str] = &["values", "pageFeatureEnabled", "currentPage", "lastUpdated"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    #[serde(default)]
    pub values: ValueMap,

    /// page id -> feature toggle
    #[serde(default)]
    pub page_feature_enabled: IndexMap<String, bool>,

    #[serde(default)]
    pub current_page: usize,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            values: ValueMap::new(),
            page_feature_enabled: IndexMap::new(),
            current_page: 0,
            last_updated: Utc::now(),
        }
    }
}

impl WizardState {
    /// Decode with case-insensitive top-level property names.
    pub fn from_json_value(mut value: serde_json::Value) -> serde_json::Result<Self> {
        if let serde_json::Value::Object(obj) = &mut value {
            rekey_object(obj, STATE_KEYS);
        }
        serde_json::from_value(value)
    }
}

pub trait StateStore: Send + Sync {
    fn load(&self) -> WizardState;
    fn save(&self, state: WizardState) -> Result<WizardState, PersistenceError>;
    fn clear(&self) -> Result<(), PersistenceError>;
}

/// JSON file store with an in-memory copy of the last loaded/saved state.
#[derive(Debug)]
pub struct FileStateStore {
    path: PathBuf,
    cached: Mutex<Option<WizardState>>,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    fn read_from_disk(&self) -> Option<WizardState> {
        if !self.path.is_file() {
            return None;
        }
        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|text| {
                serde_json::from_str::<serde_json::Value>(&text).map_err(|e| e.to_string())
            })
            .and_then(|v| WizardState::from_json_value(v).map_err(|e| e.to_string()));

        match parsed {
            Ok(state) => {
                info!("loaded wizard state from {}", self.path.display());
                Some(state)
            }
            Err(e) => {
                error!("failed to load wizard state from {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

impl StateStore for FileStateStore {
    /// Unreadable or corrupt files yield a fresh state.
    fn load(&self) -> WizardState {
        let mut cached = self.cached.lock();
        if let Some(state) = cached.as_ref() {
            return state.clone();
        }
        let state = self.read_from_disk().unwrap_or_default();
        *cached = Some(state.clone());
        state
    }

    fn save(&self, mut state: WizardState) -> Result<WizardState, PersistenceError> {
        state.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(&state).map_err(|source| {
            PersistenceError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        write_file(&self.path, &json)
            .inspect_err(|e| error!("failed to save wizard state: {}", e))?;

        *self.cached.lock() = Some(state.clone());
        info!("saved wizard state to {}", self.path.display());
        Ok(state)
    }

    fn clear(&self) -> Result<(), PersistenceError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|source| {
                let e = PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                };
                error!("failed to clear wizard state: {}", e);
                e
            })?;
        }
        *self.cached.lock() = None;
        info!("cleared wizard state");
        Ok(())
    }
}

/// Write `contents` to `path`, creating missing parent directories.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<(), PersistenceError> {
    let io_err = |source: std::io::Error| PersistenceError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            fs::create_dir_all(dir).map_err(io_err)?;
            info!("created missing directory {}", dir.display());
        }
    }
    fs::write(path, contents).map_err(io_err)
}
