use sensorgate_drivers::SensorSnapshot;
use serde::Serialize;

/// Device vitals, sampled at publish time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemHealth {
    /// dBm; 0 when unknown
    pub signal_strength: i32,
    pub uptime_secs: u64,
    pub free_memory_bytes: u64,
    pub last_reset_reason: String,
}

/// Payload of the telemetry topic.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub device_id: &'a str,
    pub adoption_code: &'a str,
    pub health: SystemHealth,
    pub sensors: &'a [SensorSnapshot],
}

/// One reading in the shape the collector ingests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpRecord {
    pub time: String,
    pub sensor_id: String,
    pub pin: u8,
    pub sensor_type: &'static str,
    pub data_type: &'static str,
    /// Two decimals, as text
    pub value: String,
    pub unit: &'static str,
}
