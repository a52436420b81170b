use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use sensorgate_drivers::{Board, BusArbiter, SensorSnapshot, scan};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior, interval, sleep};

use crate::configs::{ConfigStore, DeviceConfig, Settings};
use crate::errors::{BusError, GatewayError};
use crate::logging::RotatingFile;
use crate::models::{Command, SystemHealth};
use crate::services::{
    Acquisition, Collector, CollectorIdentity, Effect, InboundMessage, MessageBus, OtaCoordinator,
    OtaState, PRESENCE_ONLINE, System, Topics, adoption_code, envelope, http_records, interpret,
};

/// Everything the gateway talks to besides the sensor board.
pub struct Services {
    pub store: Box<dyn ConfigStore>,
    /// `None` when MQTT is disabled
    pub bus: Option<Box<dyn MessageBus>>,
    pub inbound: Option<mpsc::Receiver<InboundMessage>>,
    pub collector: Box<dyn Collector>,
    pub ota: OtaCoordinator,
    pub system: Box<dyn System>,
    pub log: Option<Arc<RotatingFile>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Remote `restart` command
    Restart,
    /// A new firmware image was finalized
    FirmwareApplied,
    Shutdown,
}

/// The single state object driven by the runtime loop.
pub struct Gateway<B: Board> {
    board: B,
    config: DeviceConfig,
    acquisition: Acquisition<B>,
    store: Box<dyn ConfigStore>,
    bus: Option<Box<dyn MessageBus>>,
    inbound: Option<mpsc::Receiver<InboundMessage>>,
    collector: Box<dyn Collector>,
    ota: OtaCoordinator,
    system: Box<dyn System>,
    log: Option<Arc<RotatingFile>>,
    adoption_code: String,
    restart_settle: Duration,
    rng: StdRng,
}

impl<B: Board> Gateway<B> {
    pub fn new(board: B, config: DeviceConfig, services: Services, restart_settle: Duration) -> Self {
        let adoption_code = adoption_code(&services.system.hardware_address());

        let mut gateway = Self {
            board,
            config,
            acquisition: Acquisition::new(BusArbiter::new()),
            store: services.store,
            bus: services.bus,
            inbound: services.inbound,
            collector: services.collector,
            ota: services.ota,
            system: services.system,
            log: services.log,
            adoption_code,
            restart_settle,
            rng: StdRng::from_os_rng(),
        };
        gateway.rebuild();

        tracing::info!("gateway {} ready (adoption code {})", gateway.device_id(), gateway.adoption_code);

        gateway
    }

    pub fn snapshots(&self) -> &[SensorSnapshot] {
        self.acquisition.snapshots()
    }

    pub fn health(&self) -> SystemHealth {
        self.system.health()
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn adoption_code(&self) -> &str {
        &self.adoption_code
    }

    pub fn device_id(&self) -> String {
        self.config.device_id(&self.adoption_code)
    }

    pub fn topics(&self) -> Topics {
        Topics::new(&self.config.mqtt.topic_prefix, &self.device_id())
    }

    pub fn ota_state(&self) -> &OtaState {
        self.ota.state()
    }

    pub fn active_sensors(&self) -> usize {
        self.acquisition.registry().len()
    }

    /// Persists `config` and rebuilds the sensor registry from it. A failed
    /// save leaves the running config untouched.
    pub fn update_config(&mut self, config: DeviceConfig) -> Result<(), GatewayError> {
        self.store.save(&config)?;
        self.config = config;
        self.rebuild();
        Ok(())
    }

    pub fn trigger_update(&mut self, url: &str) {
        self.ota.trigger(url);
    }

    /// Addresses answering on the direct bus.
    pub fn scan_i2c(&mut self) -> Vec<u8> {
        let found = scan(self.board.i2c());
        tracing::info!("I2C scan found {} devices: {:02X?}", found.len(), found);
        found
    }

    pub fn read_logs(&self) -> Result<String, GatewayError> {
        let log = self.log.as_ref().ok_or(GatewayError::LogUnavailable)?;
        Ok(log.read()?)
    }

    pub fn rebuild(&mut self) {
        self.acquisition.rebuild(&mut self.board, &self.config);
    }

    /// One acquisition sweep followed by the telemetry publish.
    pub async fn run_cycle(&mut self) {
        self.acquisition.run_cycle(&mut self.board, &self.config, &mut self.rng);
        self.publish_telemetry().await;
    }

    pub async fn publish_telemetry(&mut self) {
        let device_id = self.device_id();
        let topics = self.topics();

        if self.bus.is_some() {
            let envelope = envelope(&device_id, &self.adoption_code, self.system.health(), self.acquisition.snapshots());
            match serde_json::to_vec(&envelope) {
                Ok(payload) => self.publish(&topics.telemetry, payload, false),
                Err(e) => tracing::error!("failed to encode telemetry: {}", e),
            }
        }

        if self.config.api_endpoint.trim().is_empty() {
            return;
        }

        let records = http_records(self.acquisition.snapshots(), &device_id, OffsetDateTime::now_utc(), self.config.utc_offset);
        if records.is_empty() {
            tracing::debug!("no valid readings, skipping collector upload");
            return;
        }

        let identity = CollectorIdentity {
            endpoint: self.config.api_endpoint.clone(),
            sensor_id: device_id,
            api_key: self.config.api_key.clone(),
        };

        match self.collector.submit(&identity, &records).await {
            Ok(status) => tracing::info!("uploaded {} readings, status {}", records.len(), status),
            Err(e) => tracing::warn!("collector upload failed: {}", e),
        }
    }

    pub fn publish_presence(&self) {
        self.publish(&self.topics().status, PRESENCE_ONLINE, true);
    }

    /// Applies one inbound control message. Returns an exit reason when the
    /// command requires the process to restart.
    pub async fn handle_message(&mut self, message: InboundMessage) -> Option<ExitReason> {
        let Some(command) = Command::parse(&message.payload) else {
            tracing::debug!("ignoring unrecognized message on {}", message.topic);
            return None;
        };

        tracing::info!("command {:?} on {}", command, message.topic);

        // Acknowledge on the identity the command was addressed to, even if
        // the command itself changes that identity.
        let ack_topic = match message.topic.strip_suffix("/commands") {
            Some(base) => format!("{base}/ack"),
            None => self.topics().ack,
        };

        let outcome = interpret(&command, &mut self.config);

        if outcome.persist {
            if let Err(e) = self.store.save(&self.config) {
                tracing::error!("failed to persist config: {}", e);
            }
        }

        self.publish(&ack_topic, outcome.ack.as_str(), false);

        match outcome.effect {
            Effect::None => None,
            Effect::BeginUpdate(url) => {
                self.ota.trigger(url);
                None
            }
            Effect::Restart => {
                self.restart("Remote restart").await;
                Some(ExitReason::Restart)
            }
        }
    }

    /// Runs a pending update, if any.
    pub async fn poll_ota(&mut self) -> Option<ExitReason> {
        match self.ota.poll().await {
            Some(Ok(_)) => {
                self.restart("Firmware update").await;
                Some(ExitReason::FirmwareApplied)
            }
            _ => None,
        }
    }

    pub async fn run(mut self, settings: &Settings) -> ExitReason {
        let mut acquisition = ticker(settings.acquisition_period());
        let mut heartbeat = ticker(settings.heartbeat_period());
        let mut ota = ticker(settings.ota_poll_period());
        let mut inbound = self.inbound.take();

        loop {
            tokio::select! {
                _ = acquisition.tick() => self.run_cycle().await,
                _ = heartbeat.tick() => self.publish_presence(),
                _ = ota.tick() => {
                    if let Some(exit) = self.poll_ota().await {
                        return exit;
                    }
                }
                message = next_message(&mut inbound) => match message {
                    Some(message) => {
                        if let Some(exit) = self.handle_message(message).await {
                            return exit;
                        }
                    }
                    None => {
                        tracing::warn!("command channel closed");
                        inbound = None;
                    }
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    return ExitReason::Shutdown;
                }
            }
        }
    }

    fn publish(&self, topic: &str, payload: impl Into<Vec<u8>>, retain: bool) {
        let Some(bus) = &self.bus else {
            return;
        };

        match bus.publish(topic, payload.into(), retain) {
            Ok(()) => tracing::trace!("published to {}", topic),
            Err(BusError::Disconnected) => tracing::debug!("bus disconnected, dropped message for {}", topic),
            Err(e) => tracing::warn!("publish to {} failed: {}", topic, e),
        }
    }

    async fn restart(&self, reason: &str) {
        tracing::warn!("{}, restarting in {:?}", reason, self.restart_settle);
        sleep(self.restart_settle).await;
        self.system.prepare_restart(reason);
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_message(inbound: &mut Option<mpsc::Receiver<InboundMessage>>) -> Option<InboundMessage> {
    match inbound {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
