use std::env;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

const DEFAULT_SETTINGS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/configs/default.toml"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
    /// Persistent log mirrored from the subscriber, readable by the admin surface
    pub file: Option<String>,
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Storage {
    pub config_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acquisition {
    pub period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Telemetry {
    pub heartbeat_secs: u64,
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bus {
    pub client_prefix: String,
    pub keep_alive_secs: u64,
    pub reconnect_secs: u64,
    pub capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ota {
    pub poll_secs: u64,
    pub target_path: String,
    /// Largest image the target can hold
    pub max_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct System {
    pub state_dir: String,
    pub restart_settle_ms: u64,
    /// Overrides the interface MAC, e.g. `"24:6F:28:A1:B2:C3"`
    pub hardware_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub storage: Storage,
    pub acquisition: Acquisition,
    pub telemetry: Telemetry,
    pub bus: Bus,
    pub ota: Ota,
    pub system: System,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(Environment::with_prefix("SENSORGATE").prefix_separator("_").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// The embedded defaults only, without files or environment.
    pub fn defaults() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    pub fn acquisition_period(&self) -> Duration {
        Duration::from_secs(self.acquisition.period_secs.max(1))
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.telemetry.heartbeat_secs.max(1))
    }

    pub fn ota_poll_period(&self) -> Duration {
        Duration::from_secs(self.ota.poll_secs.max(1))
    }

    pub fn restart_settle(&self) -> Duration {
        Duration::from_millis(self.system.restart_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let settings = Settings::defaults().unwrap();

        assert_eq!(settings.acquisition.period_secs, 60);
        assert_eq!(settings.telemetry.heartbeat_secs, 300);
        assert_eq!(settings.bus.reconnect_secs, 5);
        assert_eq!(settings.logger.max_bytes, 51200);
        assert_eq!(settings.restart_settle(), Duration::from_secs(1));
        assert!(settings.system.hardware_address.is_none());
    }
}
