use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::configs::device::DeviceConfig;
use crate::errors::StoreError;

/// Durable home of the device record. Every save is a full overwrite.
pub trait ConfigStore: Send {
    fn load(&self) -> Result<DeviceConfig, StoreError>;

    fn save(&self, config: &DeviceConfig) -> Result<(), StoreError>;
}

/// Stores the record as one TOML file, replaced atomically on save.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    /// Prepares the parent directory so the first save cannot fail on it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        staging.into()
    }
}

impl ConfigStore for TomlFileStore {
    fn load(&self) -> Result<DeviceConfig, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("no device record at {}, using defaults", self.path.display());
                Ok(DeviceConfig::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), StoreError> {
        let text = toml::to_string_pretty(config)?;
        let staging = self.staging_path();

        fs::write(&staging, text)?;
        fs::rename(&staging, &self.path)?;

        tracing::debug!("device record saved to {}", self.path.display());

        Ok(())
    }
}

/// Volatile store used when nothing durable is available.
#[derive(Debug, Default)]
pub struct MemoryStore {
    record: Mutex<Option<DeviceConfig>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DeviceConfig) -> Self {
        Self {
            record: Mutex::new(Some(config)),
        }
    }
}

impl ConfigStore for MemoryStore {
    fn load(&self) -> Result<DeviceConfig, StoreError> {
        let record = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(record.clone().unwrap_or_default())
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), StoreError> {
        let mut record = self.record.lock().map_err(|_| StoreError::Poisoned)?;
        *record = Some(config.clone());
        Ok(())
    }
}

/// Opens the file store and loads the record. A store that cannot be opened
/// or read falls back to an in-memory store holding defaults.
pub fn mount(path: impl Into<PathBuf>) -> (Box<dyn ConfigStore>, DeviceConfig) {
    let path = path.into();

    let mounted = TomlFileStore::open(&path).and_then(|store| {
        let config = store.load()?;
        Ok((store, config))
    });

    match mounted {
        Ok((store, config)) => (Box::new(store), config),
        Err(e) => {
            tracing::error!("failed to mount config store at {}: {}", path.display(), e);
            (Box::new(MemoryStore::new()), DeviceConfig::default())
        }
    }
}
