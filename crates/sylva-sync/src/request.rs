use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

/// One file to reconcile with the store.
///
/// Produced from an extraction manifest, consumed exactly once by the
/// scheduler.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Decoded storage key identifying the remote object.
    pub remote_key: String,
    /// Where the object belongs locally.
    pub local_path: PathBuf,
    /// Entity tag of the existing local copy, if any.
    pub etag: Option<String>,
}

/// Tuning for one synchronization pass.
///
/// # Examples
///
/// ```
/// use sylva_sync::SyncOptions;
///
/// let options = SyncOptions::default().max_connections(8).retries(3);
/// ```
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Concurrent connection ceiling for asset transfers.
    ///
    /// Values below 1 are a configuration error and clamp to 1.
    ///
    /// Default: 4
    pub max_connections: usize,

    /// Transport-fault retry budget per transfer.
    ///
    /// Default: 6
    pub retries: u32,

    /// Reconcile referenced assets before writing the document. When
    /// false, the document is written as-is, immediately.
    ///
    /// Default: true
    pub sync_assets: bool,

    /// Cooperative cancellation for the whole pass; each transfer receives
    /// a child token.
    ///
    /// Default: a fresh token that never fires
    pub cancel: CancellationToken,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_connections: 4,
            retries: sylva_fetch::TransferOptions::default().retries,
            sync_assets: true,
            cancel: CancellationToken::new(),
        }
    }
}

impl SyncOptions {
    /// Set the concurrent connection ceiling.
    #[must_use]
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Set the per-transfer retry budget.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Enable or disable asset reconciliation.
    #[must_use]
    pub fn sync_assets(mut self, sync_assets: bool) -> Self {
        self.sync_assets = sync_assets;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
