//! Error types for sylva-sync.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid store URL: {0}")]
    InvalidStoreUrl(#[from] url::ParseError),

    #[error("store URL has no host")]
    StoreUrlWithoutHost,

    #[error("document serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("filesystem error: {0}")]
    Fs(#[from] sylva_fs::FsError),
}
