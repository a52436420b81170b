use std::time::Duration;

use reqwest::StatusCode;

use crate::errors::{CollectorError, OtaError};
use crate::models::HttpRecord;
use crate::services::{FirmwareSource, FirmwareStream};

pub const COLLECTOR_PATH: &str = "/sensor/data/write";

/// Credentials sent with every collector request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorIdentity {
    pub endpoint: String,
    pub sensor_id: String,
    pub api_key: String,
}

/// Batched upload of flattened readings.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// One POST per call. Returns the HTTP status on success.
    async fn submit(&self, identity: &CollectorIdentity, records: &[HttpRecord]) -> Result<u16, CollectorError>;
}

#[derive(Clone)]
pub struct HttpCollector {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpCollector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl Collector for HttpCollector {
    async fn submit(&self, identity: &CollectorIdentity, records: &[HttpRecord]) -> Result<u16, CollectorError> {
        let endpoint = identity.endpoint.trim().trim_end_matches('/');
        if endpoint.is_empty() {
            return Err(CollectorError::NoEndpoint);
        }

        let response = self
            .client
            .post(format!("{endpoint}{COLLECTOR_PATH}"))
            .header("X-Sensor-Id", &identity.sensor_id)
            .header("X-Sensor-Api-Key", &identity.api_key)
            .json(records)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Status(status.as_u16()));
        }

        Ok(status.as_u16())
    }
}

/// Plain GET download of firmware images.
#[derive(Clone)]
pub struct HttpFirmwareSource {
    client: reqwest::Client,
}

impl HttpFirmwareSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: http_client(timeout),
        }
    }
}

struct HttpFirmwareStream {
    response: reqwest::Response,
}

#[async_trait::async_trait]
impl FirmwareSource for HttpFirmwareSource {
    async fn open(&self, url: &str) -> Result<Box<dyn FirmwareStream>, OtaError> {
        let response = self.client.get(url).send().await?;

        if response.status() != StatusCode::OK {
            return Err(OtaError::Status(response.status().as_u16()));
        }

        Ok(Box::new(HttpFirmwareStream { response }))
    }
}

#[async_trait::async_trait]
impl FirmwareStream for HttpFirmwareStream {
    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError> {
        Ok(self.response.chunk().await?.map(|chunk| chunk.to_vec()))
    }
}

/// Connect timeout only; firmware bodies may stream for minutes.
fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(timeout)
        .build()
        .unwrap_or_default()
}
