#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Collector request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Collector answered with status {0}")]
    Status(u16),

    #[error("Collector endpoint is not configured")]
    NoEndpoint,
}
