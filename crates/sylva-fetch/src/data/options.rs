use tokio_util::sync::CancellationToken;

/// Default transport-fault retry budget.
pub const DEFAULT_RETRIES: u32 = 6;

/// Configuration for a single transfer.
///
/// # Examples
///
/// ```
/// use sylva_fetch::TransferOptions;
///
/// let options = TransferOptions::default()
///     .retries(3)
///     .etag("9a0364b9e99bb480dd25e1f0284c8555");
/// ```
#[derive(Debug, Clone)]
pub struct TransferOptions {
    /// Transport-fault retries permitted after the initial attempt.
    ///
    /// Consumed only by transient transport faults (connection reset,
    /// timeout); validator rejections and malformed partial responses
    /// restart the transfer without touching this budget.
    ///
    /// Default: 6
    pub retries: u32,

    /// Entity tag of the local copy, if one exists.
    ///
    /// When set, the first request is conditional (`If-None-Match`) and a
    /// current local copy costs one round trip and zero bytes of body.
    ///
    /// Default: None
    pub etag: Option<String>,

    /// Attempt byte-range resume after an interrupted stream.
    ///
    /// When false, every retry restarts the body from byte zero.
    ///
    /// Default: true
    pub resume: bool,

    /// Cooperative cancellation handle, checked before each request and
    /// between body chunks.
    ///
    /// Default: a fresh token that never fires
    pub cancel: CancellationToken,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            etag: None,
            resume: true,
            cancel: CancellationToken::new(),
        }
    }
}

impl TransferOptions {
    /// Set the transport-fault retry budget.
    #[must_use]
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the known local entity tag.
    #[must_use]
    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    /// Enable or disable byte-range resume.
    #[must_use]
    pub fn resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    /// Set the cancellation token.
    #[must_use]
    pub fn cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
