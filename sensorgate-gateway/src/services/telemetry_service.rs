use sensorgate_drivers::SensorSnapshot;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::models::{Envelope, HttpRecord, SystemHealth};

pub const PRESENCE_ONLINE: &str = "online";
pub const PRESENCE_OFFLINE: &str = "offline";

/// Bus topics of one device identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub telemetry: String,
    pub status: String,
    pub commands: String,
    pub ack: String,
}

impl Topics {
    pub fn new(prefix: &str, device_id: &str) -> Self {
        let mut base = prefix.to_string();
        if !base.is_empty() && !base.ends_with('/') {
            base.push('/');
        }
        base.push_str("sensors/");
        base.push_str(device_id);

        Self {
            telemetry: format!("{base}/telemetry"),
            status: format!("{base}/status"),
            commands: format!("{base}/commands"),
            ack: format!("{base}/ack"),
        }
    }
}

pub fn envelope<'a>(
    device_id: &'a str,
    adoption_code: &'a str,
    health: SystemHealth,
    sensors: &'a [SensorSnapshot],
) -> Envelope<'a> {
    Envelope {
        device_id,
        adoption_code,
        health,
        sensors,
    }
}

/// Flattens every valid reading into the collector's record shape.
///
/// `utc_offset` (seconds) shifts the wall-clock text only; the collector
/// expects local time without a zone suffix.
pub fn http_records(
    snapshots: &[SensorSnapshot],
    device_id: &str,
    at: OffsetDateTime,
    utc_offset: i32,
) -> Vec<HttpRecord> {
    let time = local_timestamp(at, utc_offset);

    snapshots
        .iter()
        .filter(|snapshot| snapshot.valid)
        .flat_map(|snapshot| {
            snapshot.readings.iter().map(|reading| HttpRecord {
                time: time.clone(),
                sensor_id: device_id.to_string(),
                pin: snapshot.pin,
                sensor_type: snapshot.kind.label(),
                data_type: reading.kind.name(),
                value: format!("{:.2}", reading.value),
                unit: reading.unit,
            })
        })
        .collect()
}

fn local_timestamp(at: OffsetDateTime, utc_offset: i32) -> String {
    let local = at.saturating_add(Duration::seconds(utc_offset.into()));

    local
        .format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))
        .unwrap_or_else(|e| {
            tracing::warn!("failed to format timestamp: {}", e);
            String::new()
        })
}
