use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sensorgate_drivers::mock::{EventLog, MockBoard};
use sensorgate_gateway::app::{Gateway, Services};
use sensorgate_gateway::configs::{ConfigStore, DeviceConfig};
use sensorgate_gateway::errors::{BusError, CollectorError, OtaError, StoreError};
use sensorgate_gateway::models::{HttpRecord, SystemHealth};
use sensorgate_gateway::services::{
    Collector, CollectorIdentity, FileFirmwareSink, FirmwareSource, FirmwareStream, InboundMessage,
    MacAddress, MessageBus, OtaCoordinator, System,
};
use tempfile::TempDir;

pub const MAC: MacAddress = [0x24, 0x6F, 0x28, 0xA1, 0xB2, 0xC3];
pub const ADOPTION_CODE: &str = "A1B2C3";

#[derive(Debug, Clone, PartialEq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Clone)]
pub struct RecordingBus {
    connected: Arc<AtomicBool>,
    published: Arc<Mutex<Vec<Published>>>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(true)),
            published: Arc::default(),
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn take(&self) -> Vec<Published> {
        std::mem::take(&mut *self.published.lock().unwrap())
    }

    pub fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.topic == topic)
            .map(|p| p.payload.clone())
            .collect()
    }
}

impl MessageBus for RecordingBus {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool) -> Result<(), BusError> {
        if !self.is_connected() {
            return Err(BusError::Disconnected);
        }

        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8(payload).unwrap(),
            retain,
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingCollector {
    pub submissions: Arc<Mutex<Vec<(CollectorIdentity, Vec<HttpRecord>)>>>,
}

#[async_trait::async_trait]
impl Collector for RecordingCollector {
    async fn submit(&self, identity: &CollectorIdentity, records: &[HttpRecord]) -> Result<u16, CollectorError> {
        self.submissions
            .lock()
            .unwrap()
            .push((identity.clone(), records.to_vec()));
        Ok(200)
    }
}

#[derive(Clone, Default)]
pub struct RecordingStore {
    pub saves: Arc<Mutex<Vec<DeviceConfig>>>,
}

impl RecordingStore {
    pub fn last(&self) -> Option<DeviceConfig> {
        self.saves.lock().unwrap().last().cloned()
    }
}

impl ConfigStore for RecordingStore {
    fn load(&self) -> Result<DeviceConfig, StoreError> {
        Ok(self.last().unwrap_or_default())
    }

    fn save(&self, config: &DeviceConfig) -> Result<(), StoreError> {
        self.saves.lock().unwrap().push(config.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FixedSystem {
    pub restarts: Arc<Mutex<Vec<String>>>,
}

impl System for FixedSystem {
    fn health(&self) -> SystemHealth {
        SystemHealth {
            signal_strength: -58,
            uptime_secs: 42,
            free_memory_bytes: 180_000,
            last_reset_reason: "Power on".into(),
        }
    }

    fn hardware_address(&self) -> MacAddress {
        MAC
    }

    fn prepare_restart(&self, reason: &str) {
        self.restarts.lock().unwrap().push(reason.to_string());
    }
}

/// Serves the same image for every URL and remembers what was requested.
#[derive(Clone)]
pub struct RecordingSource {
    pub opened: Arc<Mutex<Vec<String>>>,
    pub image: Vec<u8>,
}

struct ChunkedImage {
    length: u64,
    chunks: VecDeque<Vec<u8>>,
}

#[async_trait::async_trait]
impl FirmwareSource for RecordingSource {
    async fn open(&self, url: &str) -> Result<Box<dyn FirmwareStream>, OtaError> {
        self.opened.lock().unwrap().push(url.to_string());

        Ok(Box::new(ChunkedImage {
            length: self.image.len() as u64,
            chunks: self.image.chunks(256).map(<[u8]>::to_vec).collect(),
        }))
    }
}

#[async_trait::async_trait]
impl FirmwareStream for ChunkedImage {
    fn content_length(&self) -> Option<u64> {
        Some(self.length)
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError> {
        Ok(self.chunks.pop_front())
    }
}

pub struct MockApp {
    pub gateway: Gateway<MockBoard>,
    pub events: EventLog,
    pub bus: RecordingBus,
    pub collector: RecordingCollector,
    pub store: RecordingStore,
    pub system: FixedSystem,
    pub firmware: RecordingSource,
    pub firmware_dir: TempDir,
}

impl MockApp {
    pub fn new(board: MockBoard, config: DeviceConfig) -> Self {
        let events = board.events();
        let bus = RecordingBus::new();
        let collector = RecordingCollector::default();
        let store = RecordingStore::default();
        let system = FixedSystem::default();
        let firmware = RecordingSource {
            opened: Arc::default(),
            image: (0..2000u32).map(|i| i as u8).collect(),
        };
        let firmware_dir = tempfile::tempdir().unwrap();

        let services = Services {
            store: Box::new(store.clone()),
            bus: Some(Box::new(bus.clone())),
            inbound: None,
            collector: Box::new(collector.clone()),
            ota: OtaCoordinator::new(
                Box::new(firmware.clone()),
                Box::new(FileFirmwareSink::new(firmware_dir.path().join("firmware.bin"))),
            ),
            system: Box::new(system.clone()),
            log: None,
        };

        let gateway = Gateway::new(board, config, services, Duration::ZERO);

        Self {
            gateway,
            events,
            bus,
            collector,
            store,
            system,
            firmware,
            firmware_dir,
        }
    }

    pub fn firmware_path(&self) -> PathBuf {
        self.firmware_dir.path().join("firmware.bin")
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.firmware.opened.lock().unwrap().clone()
    }
}

pub fn command(device_id: &str, payload: &str) -> InboundMessage {
    InboundMessage {
        topic: format!("sensors/{device_id}/commands"),
        payload: payload.as_bytes().to_vec(),
    }
}

/// Serves `router` on an ephemeral local port.
pub async fn serve(router: axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    address
}
