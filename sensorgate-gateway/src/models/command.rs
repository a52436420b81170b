use serde::Deserialize;

use crate::configs::DeviceConfig;

/// A classified inbound control message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Restart,
    ToggleSimulation,
    TriggerUpdate,
    PatchConfig(ConfigPatch),
}

impl Command {
    /// Returns `None` for anything that is neither a known literal nor an
    /// object carrying at least one patchable key.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            b"restart" => return Some(Command::Restart),
            b"toggle_sim" => return Some(Command::ToggleSimulation),
            b"update" => return Some(Command::TriggerUpdate),
            _ => {}
        }

        let value: serde_json::Value = serde_json::from_slice(payload).ok()?;
        if !value.is_object() {
            return None;
        }

        match serde_json::from_value::<ConfigPatch>(value) {
            Ok(patch) if !patch.is_empty() => Some(Command::PatchConfig(patch)),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("rejecting config patch: {}", e);
                None
            }
        }
    }
}

/// The remotely patchable subset of [`DeviceConfig`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, alias = "sensorId", alias = "sensor_id")]
    pub device_id: Option<String>,
    #[serde(default, alias = "utcOffset")]
    pub utc_offset: Option<i32>,
    #[serde(default, alias = "ntpServer")]
    pub ntp_server: Option<String>,
    #[serde(default, alias = "mqttTopicPrefix")]
    pub topic_prefix: Option<String>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.device_id.is_none()
            && self.utc_offset.is_none()
            && self.ntp_server.is_none()
            && self.topic_prefix.is_none()
    }

    pub fn apply(&self, config: &mut DeviceConfig) {
        if let Some(id) = &self.device_id {
            config.sensor_id.clone_from(id);
        }
        if let Some(offset) = self.utc_offset {
            config.utc_offset = offset;
        }
        if let Some(server) = &self.ntp_server {
            config.ntp_server.clone_from(server);
        }
        if let Some(prefix) = &self.topic_prefix {
            config.mqtt.topic_prefix.clone_from(prefix);
        }
    }
}

/// Acknowledgement published once per handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Restarting,
    SimOn,
    SimOff,
    Updating,
    UpdateFailedNoUrl,
    ConfigUpdated,
}

impl Ack {
    pub fn as_str(self) -> &'static str {
        match self {
            Ack::Restarting => "restarting",
            Ack::SimOn => "sim_on",
            Ack::SimOff => "sim_off",
            Ack::Updating => "updating",
            Ack::UpdateFailedNoUrl => "update_failed_no_url",
            Ack::ConfigUpdated => "config_updated",
        }
    }
}
