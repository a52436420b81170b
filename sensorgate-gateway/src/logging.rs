use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const STARTED: &str = "Started logging\n";
const ROTATED: &str = "--- Log Rotated ---\n";

/// Append-only log file that truncates itself once it grows past
/// `max_bytes`.
///
/// `&RotatingFile` implements [`Write`], so an `Arc<RotatingFile>` can be
/// handed to `tracing_subscriber::fmt::layer().with_writer(..)` while the
/// admin surface keeps another handle for reading.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    file: Mutex<File>,
}

impl RotatingFile {
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let fresh = !path.exists();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        if fresh {
            file.write_all(STARTED.as_bytes())?;
        }

        Ok(Self {
            path,
            max_bytes,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> io::Result<String> {
        let _guard = self.lock()?;
        fs::read_to_string(&self.path)
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, File>> {
        self.file.lock().map_err(|_| io::Error::other("log file lock poisoned"))
    }
}

impl Write for &RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.lock()?;

        if file.metadata()?.len() > self.max_bytes {
            file.set_len(0)?;
            file.write_all(ROTATED.as_bytes())?;
        }

        file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.lock()?.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_file_has_banner() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingFile::open(dir.path().join("logs/log.txt"), 1024).unwrap();

        (&log).write_all(b"hello\n").unwrap();

        assert_eq!(log.read().unwrap(), "Started logging\nhello\n");
    }

    #[test]
    fn test_rotates_past_limit() {
        let dir = tempfile::tempdir().unwrap();
        let log = RotatingFile::open(dir.path().join("log.txt"), 32).unwrap();

        (&log).write_all(&[b'x'; 40]).unwrap();
        (&log).write_all(b"after\n").unwrap();

        assert_eq!(log.read().unwrap(), "--- Log Rotated ---\nafter\n");
    }

    #[test]
    fn test_reopen_keeps_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        (&RotatingFile::open(&path, 1024).unwrap()).write_all(b"one\n").unwrap();
        (&RotatingFile::open(&path, 1024).unwrap()).write_all(b"two\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "Started logging\none\ntwo\n");
    }
}
