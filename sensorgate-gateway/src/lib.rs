use std::sync::Arc;
use std::time::Duration;

use crate::app::{ExitReason, Gateway, Services};
use crate::board::UnattachedBoard;
use crate::configs::Settings;
use crate::logging::RotatingFile;
use crate::services::{
    FileFirmwareSink, HostSystem, HttpCollector, HttpFirmwareSource, MessageBus, MqttBus,
    OtaCoordinator, System, Topics, adoption_code,
};

pub mod app;
pub mod board;
pub mod configs;
pub mod errors;
pub mod logging;
pub mod models;
pub mod services;

/// Boots the gateway from `settings` and drives it until it must exit.
pub async fn run(settings: &Settings, log: Option<Arc<RotatingFile>>) -> ExitReason {
    let (store, config) = configs::mount(&settings.storage.config_path);

    let system = HostSystem::new(&settings.system);
    let device_id = config.device_id(&adoption_code(&system.hardware_address()));

    let (bus, inbound) = if config.mqtt.enabled && !config.mqtt.broker.is_empty() {
        let topics = Topics::new(&config.mqtt.topic_prefix, &device_id);
        let client_id = format!("{}{}", settings.bus.client_prefix, device_id);
        let (bus, inbound) = MqttBus::start(&settings.bus, &config.mqtt, &client_id, &topics);

        (Some(Box::new(bus) as Box<dyn MessageBus>), Some(inbound))
    } else {
        tracing::info!("MQTT disabled");
        (None, None)
    };

    let timeout = Duration::from_secs(settings.telemetry.http_timeout_secs);
    let sink = FileFirmwareSink::new(&settings.ota.target_path).with_capacity(settings.ota.max_bytes);

    let services = Services {
        store,
        bus,
        inbound,
        collector: Box::new(HttpCollector::new(timeout)),
        ota: OtaCoordinator::new(Box::new(HttpFirmwareSource::new(timeout)), Box::new(sink)),
        system: Box::new(system),
        log,
    };

    let gateway = Gateway::new(UnattachedBoard::new(), config, services, settings.restart_settle());

    gateway.run(settings).await
}
