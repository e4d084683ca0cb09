/// How a successful transfer concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    /// The server's current representation was streamed into place.
    Completed,
    /// The local copy already matched; nothing was written.
    NotModified,
}

/// Metadata describing a finished transfer.
#[derive(Debug, Clone)]
pub struct TransferSummary {
    pub outcome: TransferOutcome,
    /// Final HTTP status the transfer settled on.
    pub status: u16,
    /// Entity tag the server reported, if any. Callers that track local
    /// state can persist this as the validator for the next run.
    pub etag: Option<String>,
}
