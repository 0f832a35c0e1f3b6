use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinderError {
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("Item id space exhausted")]
    IdExhausted,
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}
