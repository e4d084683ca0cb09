//! Error types for sylva-fetch.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a status the engine has no handling for.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// A non-transient transport fault.
    #[error("transport fault: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Transient faults kept occurring until the budget ran out.
    #[error("retries exhausted after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The caller's cancellation token fired.
    #[error("transfer cancelled")]
    Cancelled,

    #[error("filesystem error: {0}")]
    Fs(#[from] sylva_fs::FsError),

    /// Writing the staging file failed; never retried.
    #[error("staging write failed: {0}")]
    StagingWrite(#[source] std::io::Error),
}
