use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    config::Settings,
    dao::storage::{StorageError, StorageResult},
};

/// Marker written next to the settings; anything else means the record is not ours.
pub const VALIDITY_MARKER: u16 = 0x0B0B;

/// Abstraction over where settings survive power cycles.
pub trait ConfigStore {
    /// Load the stored settings; `Ok(None)` when nothing valid is stored.
    fn load(&self) -> StorageResult<Option<Settings>>;
    /// Persist the settings together with the validity marker.
    fn save(&self, settings: &Settings) -> StorageResult<()>;

    /// Load the stored settings, writing and returning defaults when nothing valid is stored.
    fn load_or_init(&self) -> StorageResult<Settings> {
        if let Some(settings) = self.load()? {
            return Ok(settings);
        }
        let defaults = Settings::default();
        self.save(&defaults)?;
        info!("no valid stored settings; defaults written");
        Ok(defaults)
    }
}

/// On-disk layout of the settings record.
#[derive(Debug, Serialize, Deserialize)]
struct SettingsRecord {
    marker: u16,
    settings: Settings,
}

/// Settings persisted as a JSON document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`; the file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for JsonFileStore {
    fn load(&self) -> StorageResult<Option<Settings>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "settings file not found");
                return Ok(None);
            }
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let record = match serde_json::from_str::<SettingsRecord>(&contents) {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "unreadable settings record");
                return Ok(None);
            }
        };

        if record.marker != VALIDITY_MARKER {
            warn!(
                path = %self.path.display(),
                marker = record.marker,
                "settings record has an unknown marker"
            );
            return Ok(None);
        }

        if let Err(err) = record.settings.validate() {
            warn!(path = %self.path.display(), error = %err, "stored settings failed validation");
            return Ok(None);
        }

        Ok(Some(record.settings))
    }

    fn save(&self, settings: &Settings) -> StorageResult<()> {
        let record = SettingsRecord {
            marker: VALIDITY_MARKER,
            settings: settings.clone(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(StorageError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}

/// Volatile store for tests and for running without a writable disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Option<Settings>>,
}

impl MemoryStore {
    /// Empty store: the first load reports nothing stored.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `settings`.
    pub fn with(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(Some(settings)),
        }
    }

    /// Copy of what is currently stored.
    pub fn stored(&self) -> Option<Settings> {
        self.settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> StorageResult<Option<Settings>> {
        Ok(self.stored())
    }

    fn save(&self, settings: &Settings) -> StorageResult<()> {
        *self
            .settings
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(settings.clone());
        Ok(())
    }
}
