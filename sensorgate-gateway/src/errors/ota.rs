#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    #[error("Firmware download failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Firmware server answered with status {0}")]
    Status(u16),

    #[error("Firmware size unknown or zero")]
    UnknownLength,

    #[error("Firmware size mismatch: expected {expected} bytes, wrote {written}")]
    SizeMismatch { expected: u64, written: u64 },

    #[error("Not enough space for {0} bytes of firmware")]
    NoSpace(u64),

    #[error("Firmware write error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No firmware update in progress")]
    NotStarted,
}
