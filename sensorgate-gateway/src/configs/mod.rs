mod device;
mod settings;
mod storage;

pub use device::{Admin, DeviceConfig, MAX_SLOTS, Mqtt, SensorSlot, Wifi};
pub use settings::{Acquisition, Bus, Logger, Ota, Settings, Storage, System, Telemetry};
pub use storage::{ConfigStore, MemoryStore, TomlFileStore, mount};
