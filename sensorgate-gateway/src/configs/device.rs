use sensorgate_drivers::{MuxChannel, SensorKind};
use serde::{Deserialize, Deserializer, Serialize};

pub const MAX_SLOTS: usize = 4;

/// One configured sensor position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSlot {
    pub kind: SensorKind,
    pub pin: u8,
    /// 0 selects the kind's default address
    pub i2c_address: u8,
    /// -1 for the direct bus, 0-7 for a TCA9548A channel
    pub i2c_multiplexer_channel: i8,
    pub temperature_offset: f32,
    pub humidity_offset: f32,
}

impl Default for SensorSlot {
    fn default() -> Self {
        Self {
            kind: SensorKind::None,
            pin: 0,
            i2c_address: 0,
            i2c_multiplexer_channel: -1,
            temperature_offset: 0.0,
            humidity_offset: 0.0,
        }
    }
}

impl SensorSlot {
    pub fn new(kind: SensorKind, pin: u8) -> Self {
        Self {
            kind,
            pin,
            ..Self::default()
        }
    }

    pub fn with_address(mut self, address: u8) -> Self {
        self.i2c_address = address;
        self
    }

    pub fn with_channel(mut self, channel: i8) -> Self {
        self.i2c_multiplexer_channel = channel;
        self
    }

    pub fn with_offsets(mut self, temperature: f32, humidity: f32) -> Self {
        self.temperature_offset = temperature;
        self.humidity_offset = humidity;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    /// The multiplexer channel this slot must select before any bus traffic.
    pub fn mux_channel(&self) -> Option<MuxChannel> {
        if !self.kind.is_i2c() {
            return None;
        }
        MuxChannel::from_config(self.i2c_multiplexer_channel)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Wifi {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Admin {
    pub user: String,
    pub password: String,
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            user: "admin".into(),
            password: "admin".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mqtt {
    pub enabled: bool,
    pub broker: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub topic_prefix: String,
}

impl Default for Mqtt {
    fn default() -> Self {
        Self {
            enabled: false,
            broker: String::new(),
            port: 1883,
            user: String::new(),
            password: String::new(),
            topic_prefix: String::new(),
        }
    }
}

/// The persisted device record. Every field has a default so partial or
/// older files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub wifi: Wifi,
    pub api_endpoint: String,
    /// Device identifier; empty means "use the adoption code"
    pub sensor_id: String,
    pub api_key: String,
    pub simulation: bool,
    /// Seconds east of UTC
    pub utc_offset: i32,
    pub ntp_server: String,
    pub firmware_url: String,
    pub admin: Admin,
    pub mqtt: Mqtt,
    #[serde(deserialize_with = "deserialize_slots")]
    pub sensors: [SensorSlot; MAX_SLOTS],
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            wifi: Wifi::default(),
            api_endpoint: String::new(),
            sensor_id: String::new(),
            api_key: String::new(),
            simulation: false,
            utc_offset: 0,
            ntp_server: "pool.ntp.org".into(),
            firmware_url: String::new(),
            admin: Admin::default(),
            mqtt: Mqtt::default(),
            sensors: Default::default(),
        }
    }
}

impl DeviceConfig {
    pub fn device_id(&self, adoption_code: &str) -> String {
        match self.sensor_id.trim() {
            "" => adoption_code.to_string(),
            id => id.to_string(),
        }
    }

    pub fn active_slots(&self) -> impl Iterator<Item = (usize, &SensorSlot)> {
        self.sensors.iter().enumerate().filter(|(_, slot)| !slot.is_empty())
    }
}

/// Accepts any number of `[[sensors]]` tables, padding with empty slots and
/// dropping entries beyond [`MAX_SLOTS`].
fn deserialize_slots<'de, D>(deserializer: D) -> Result<[SensorSlot; MAX_SLOTS], D::Error>
where
    D: Deserializer<'de>,
{
    let listed = Vec::<SensorSlot>::deserialize(deserializer)?;
    if listed.len() > MAX_SLOTS {
        tracing::warn!("{} sensor slots configured, keeping the first {}", listed.len(), MAX_SLOTS);
    }

    let mut slots: [SensorSlot; MAX_SLOTS] = Default::default();
    for (slot, configured) in slots.iter_mut().zip(listed) {
        *slot = configured;
    }

    Ok(slots)
}
