#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed device record: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to encode device record: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}
