use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::OtaError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtaState {
    Idle,
    Pending(String),
    InProgress(String),
    /// New image finalized; the device must restart
    Applied,
}

/// Where firmware images come from.
#[async_trait::async_trait]
pub trait FirmwareSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn FirmwareStream>, OtaError>;
}

#[async_trait::async_trait]
pub trait FirmwareStream: Send {
    /// Declared image size, if the server announced one
    fn content_length(&self) -> Option<u64>;

    /// Next body chunk, `None` at end of stream.
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError>;
}

/// The firmware write primitive. Nothing written becomes active before
/// `finalize` succeeds.
pub trait FirmwareSink: Send {
    fn begin(&mut self, size: u64) -> Result<(), OtaError>;

    fn write(&mut self, chunk: &[u8]) -> Result<usize, OtaError>;

    fn finalize(&mut self) -> Result<(), OtaError>;

    fn abort(&mut self);
}

/// Single-shot update coordinator.
///
/// A trigger only records the URL; the download runs on the next poll. A
/// second trigger before that poll replaces the URL.
pub struct OtaCoordinator {
    state: OtaState,
    source: Box<dyn FirmwareSource>,
    sink: Box<dyn FirmwareSink>,
}

impl OtaCoordinator {
    pub fn new(source: Box<dyn FirmwareSource>, sink: Box<dyn FirmwareSink>) -> Self {
        Self {
            state: OtaState::Idle,
            source,
            sink,
        }
    }

    pub fn state(&self) -> &OtaState {
        &self.state
    }

    pub fn trigger(&mut self, url: impl Into<String>) {
        let url = url.into();

        match &self.state {
            OtaState::Applied => tracing::warn!("OTA: ignoring {}, an update is already applied", url),
            OtaState::Pending(previous) => {
                tracing::info!("OTA: replacing pending {} with {}", previous, url);
                self.state = OtaState::Pending(url);
            }
            _ => {
                tracing::info!("OTA: update scheduled from {}", url);
                self.state = OtaState::Pending(url);
            }
        }
    }

    /// Runs a pending update to completion. Returns `None` when nothing was
    /// pending, otherwise the number of bytes applied or the failure.
    pub async fn poll(&mut self) -> Option<Result<u64, OtaError>> {
        let OtaState::Pending(url) = &self.state else {
            return None;
        };
        let url = url.clone();
        self.state = OtaState::InProgress(url.clone());

        tracing::info!("OTA: starting update from {}", url);

        let result = self.apply(&url).await;
        match &result {
            Ok(written) => {
                tracing::info!("OTA: wrote {} bytes, update finished", written);
                self.state = OtaState::Applied;
            }
            Err(e) => {
                tracing::error!("OTA: update from {} failed: {}", url, e);
                self.sink.abort();
                self.state = OtaState::Idle;
            }
        }

        Some(result)
    }

    async fn apply(&mut self, url: &str) -> Result<u64, OtaError> {
        let mut stream = self.source.open(url).await?;

        let expected = stream
            .content_length()
            .filter(|&size| size > 0)
            .ok_or(OtaError::UnknownLength)?;

        self.sink.begin(expected)?;

        let mut written = 0u64;
        while let Some(chunk) = stream.next_chunk().await? {
            written += self.sink.write(&chunk)? as u64;
            if written > expected {
                break;
            }
        }

        if written != expected {
            return Err(OtaError::SizeMismatch { expected, written });
        }

        self.sink.finalize()?;

        Ok(written)
    }
}

/// Stages the image next to `target` and renames it into place on finalize.
pub struct FileFirmwareSink {
    target: PathBuf,
    capacity: Option<u64>,
    staged: Option<(File, PathBuf)>,
}

impl FileFirmwareSink {
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            capacity: None,
            staged: None,
        }
    }

    /// Rejects images larger than `bytes` at `begin`.
    pub fn with_capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.target.clone().into_os_string();
        staging.push(".part");
        staging.into()
    }
}

impl FirmwareSink for FileFirmwareSink {
    fn begin(&mut self, size: u64) -> Result<(), OtaError> {
        if self.capacity.is_some_and(|capacity| size > capacity) {
            return Err(OtaError::NoSpace(size));
        }

        if let Some(parent) = self.target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let staging = self.staging_path();
        let file = File::create(&staging)?;
        self.staged = Some((file, staging));

        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<usize, OtaError> {
        let (file, _) = self.staged.as_mut().ok_or(OtaError::NotStarted)?;
        file.write_all(chunk)?;
        Ok(chunk.len())
    }

    fn finalize(&mut self) -> Result<(), OtaError> {
        let (file, staging) = self.staged.take().ok_or(OtaError::NotStarted)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&staging, &self.target)?;

        Ok(())
    }

    fn abort(&mut self) {
        if let Some((file, staging)) = self.staged.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&staging) {
                tracing::warn!("OTA: failed to discard {}: {}", staging.display(), e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    struct ScriptedSource {
        length: Option<u64>,
        chunks: Vec<Vec<u8>>,
        opened: Arc<Mutex<Vec<String>>>,
    }

    struct ScriptedStream {
        length: Option<u64>,
        chunks: VecDeque<Vec<u8>>,
    }

    #[async_trait::async_trait]
    impl FirmwareSource for ScriptedSource {
        async fn open(&self, url: &str) -> Result<Box<dyn FirmwareStream>, OtaError> {
            self.opened.lock().unwrap().push(url.to_string());
            Ok(Box::new(ScriptedStream {
                length: self.length,
                chunks: self.chunks.clone().into(),
            }))
        }
    }

    #[async_trait::async_trait]
    impl FirmwareStream for ScriptedStream {
        fn content_length(&self) -> Option<u64> {
            self.length
        }

        async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, OtaError> {
            Ok(self.chunks.pop_front())
        }
    }

    fn coordinator(length: Option<u64>, target: &Path) -> (OtaCoordinator, Arc<Mutex<Vec<String>>>) {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource {
            length,
            chunks: vec![b"abcd".to_vec(), b"efgh".to_vec()],
            opened: Arc::clone(&opened),
        };

        (OtaCoordinator::new(Box::new(source), Box::new(FileFirmwareSink::new(target))), opened)
    }

    #[tokio::test]
    async fn test_last_trigger_wins() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("firmware.bin");
        let (mut ota, opened) = coordinator(Some(8), &target);

        ota.trigger("http://a/fw.bin");
        ota.trigger("http://b/fw.bin");

        assert!(matches!(ota.poll().await, Some(Ok(8))));
        assert!(ota.poll().await.is_none());
        assert_eq!(*opened.lock().unwrap(), vec!["http://b/fw.bin".to_string()]);
        assert_eq!(ota.state(), &OtaState::Applied);
        assert_eq!(fs::read(&target).unwrap(), b"abcdefgh");
    }

    #[tokio::test]
    async fn test_unknown_length_fails_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("firmware.bin");
        let (mut ota, _) = coordinator(None, &target);

        ota.trigger("http://a/fw.bin");

        assert!(matches!(ota.poll().await, Some(Err(OtaError::UnknownLength))));
        assert_eq!(ota.state(), &OtaState::Idle);
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_short_body_keeps_previous_image() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("firmware.bin");
        fs::write(&target, b"old").unwrap();
        let (mut ota, _) = coordinator(Some(12), &target);

        ota.trigger("http://a/fw.bin");

        assert!(matches!(
            ota.poll().await,
            Some(Err(OtaError::SizeMismatch { expected: 12, written: 8 }))
        ));
        assert_eq!(fs::read(&target).unwrap(), b"old");
        assert!(!dir.path().join("firmware.bin.part").exists());
    }

    #[test]
    fn test_sink_rejects_oversized_image() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FileFirmwareSink::new(dir.path().join("firmware.bin")).with_capacity(4);

        assert!(matches!(sink.begin(5), Err(OtaError::NoSpace(5))));
        assert!(matches!(sink.write(b"x"), Err(OtaError::NotStarted)));
    }
}
