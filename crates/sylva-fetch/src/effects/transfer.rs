//! The resumable transfer state machine.
//!
//! One [`Transfer`] reconciles one remote resource against one local path:
//! a conditional GET when a local validator is known, streaming into a
//! private staging file, byte-range resume across transient transport
//! faults, and relocation into place only once a complete body has been
//! received. The destination is never truncated speculatively — on any
//! terminal failure it is left exactly as it was.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use sylva_fs::StagingArea;

use crate::core::{ContentRange, EntityTag, format_entity_tag};
use crate::data::{TransferOptions, TransferOutcome, TransferSummary};
use crate::effects::http::{HttpClient, HttpResponse};
use crate::error::{FetchError, Result};

/// Bytes backed off when resuming, guarding against a torn final write.
const RESUME_REWIND: u64 = 2;

#[cfg(unix)]
const STAGING_MODE: u32 = 0o600;

/// Shape of the next request to issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestPlan {
    /// Plain GET, or `If-None-Match` while the caller's entity tag is live.
    Initial,
    /// GET with every validator dropped.
    Unconditional,
    /// `If-Match` + `Range` continuation; offset zero degrades to a plain
    /// GET.
    Resume { offset: u64 },
}

/// How the staging file is opened for the incoming body.
#[derive(Debug, Clone, Copy)]
enum WriteMode {
    Truncate,
    Seek { offset: u64 },
}

/// Mutable per-transfer state; created at the start of [`Transfer::run`]
/// and discarded with it.
struct TransferState {
    local_etag: Option<String>,
    remote_etag: Option<String>,
    /// One-way latch: flips off when the server reveals it cannot serve
    /// ranges for this resource, and stays off for the rest of the
    /// transfer.
    ranges_supported: bool,
    retries_left: u32,
}

enum StreamFault<E> {
    Transport(E),
    Write(std::io::Error),
    Cancelled,
}

/// A single reconciliation of one remote resource against one local path.
pub struct Transfer<'a, C: HttpClient> {
    client: &'a C,
    url: String,
    destination: PathBuf,
    staging: &'a StagingArea,
    options: TransferOptions,
}

impl<'a, C: HttpClient> Transfer<'a, C> {
    pub fn new(
        client: &'a C,
        url: impl Into<String>,
        destination: impl Into<PathBuf>,
        staging: &'a StagingArea,
        options: TransferOptions,
    ) -> Self {
        Self {
            client,
            url: url.into(),
            destination: destination.into(),
            staging,
            options,
        }
    }

    /// Drive the transfer to a terminal state.
    ///
    /// On success the destination holds exactly the server's current
    /// representation, or is untouched when the server reported
    /// `304 Not Modified`.
    pub async fn run(self) -> Result<TransferSummary> {
        let staging_path = self.staging.alloc()?;
        let mut state = TransferState {
            local_etag: self.options.etag.clone(),
            remote_etag: None,
            ranges_supported: self.options.resume,
            retries_left: self.options.retries,
        };
        let mut plan = RequestPlan::Initial;

        loop {
            if self.options.cancel.is_cancelled() {
                debug!(url = %self.url, "cancelled before request");
                return Err(FetchError::Cancelled);
            }

            let headers = self.headers_for(plan, &state);
            debug!(url = %self.url, ?plan, "issuing request");

            let response = match self.client.get(&self.url, &headers).await {
                Ok(response) => response,
                Err(fault) => {
                    plan = self.plan_after_fault(fault, &mut state, &staging_path).await?;
                    continue;
                }
            };

            if state.ranges_supported && response.header("accept-ranges") == Some("none") {
                debug!(url = %self.url, "server does not serve ranges for this resource");
                state.ranges_supported = false;
            }
            state.remote_etag = response
                .header("etag")
                .and_then(EntityTag::parse)
                .map(|parsed| parsed.tag);

            let status = response.status;
            debug!(url = %self.url, status, "response received");

            let mode = match status {
                200 => {
                    state.local_etag = None;
                    WriteMode::Truncate
                }
                206 => {
                    state.local_etag = None;
                    let declared = response
                        .header("content-range")
                        .and_then(ContentRange::parse)
                        .and_then(|range| range.usable_start());
                    match declared {
                        Some(offset) => {
                            debug!(url = %self.url, offset, "resuming into staging file");
                            WriteMode::Seek { offset }
                        }
                        None => {
                            // a 206 whose Content-Range gives no start offset
                            // cannot be applied to the staging file
                            warn!(
                                url = %self.url,
                                "206 without usable Content-Range; restarting with ranges disabled"
                            );
                            state.ranges_supported = false;
                            plan = RequestPlan::Unconditional;
                            continue;
                        }
                    }
                }
                304 => {
                    debug!(url = %self.url, "local copy is current");
                    return Ok(TransferSummary {
                        outcome: TransferOutcome::NotModified,
                        status,
                        etag: state.remote_etag.clone(),
                    });
                }
                412 | 416 => {
                    // the resource changed server-side; every validator we
                    // hold is stale
                    debug!(url = %self.url, status, "validators rejected; restarting fresh");
                    state.local_etag = None;
                    state.remote_etag = None;
                    plan = RequestPlan::Unconditional;
                    continue;
                }
                other => {
                    warn!(url = %self.url, status = other, "unexpected status");
                    return Err(FetchError::HttpStatus(other));
                }
            };

            match stream_body::<C>(response, mode, &staging_path, &self.options.cancel).await {
                Ok(()) => {
                    sylva_fs::relocate(&staging_path, &self.destination).await?;
                    debug!(url = %self.url, destination = %self.destination.display(), "transfer complete");
                    return Ok(TransferSummary {
                        outcome: TransferOutcome::Completed,
                        status,
                        etag: state.remote_etag.clone(),
                    });
                }
                Err(StreamFault::Transport(fault)) => {
                    plan = self.plan_after_fault(fault, &mut state, &staging_path).await?;
                }
                Err(StreamFault::Write(error)) => {
                    return Err(FetchError::StagingWrite(error));
                }
                Err(StreamFault::Cancelled) => {
                    debug!(url = %self.url, "cancelled mid-stream");
                    return Err(FetchError::Cancelled);
                }
            }
        }
    }

    fn headers_for(&self, plan: RequestPlan, state: &TransferState) -> Vec<(String, String)> {
        match plan {
            RequestPlan::Initial => match &state.local_etag {
                Some(etag) => vec![(
                    "If-None-Match".to_string(),
                    format_entity_tag(etag, false),
                )],
                None => Vec::new(),
            },
            RequestPlan::Unconditional => Vec::new(),
            RequestPlan::Resume { offset } => match &state.remote_etag {
                Some(etag) if offset > 0 => vec![
                    ("If-Match".to_string(), format_entity_tag(etag, false)),
                    ("Range".to_string(), format!("bytes={offset}-")),
                ],
                _ => Vec::new(),
            },
        }
    }

    /// Classify a fault and pick the follow-up request, consuming one unit
    /// of the retry budget.
    async fn plan_after_fault(
        &self,
        fault: C::Error,
        state: &mut TransferState,
        staging_path: &Path,
    ) -> Result<RequestPlan> {
        if !C::is_transient(&fault) {
            debug!(url = %self.url, error = %fault, "fault is not retriable");
            return Err(FetchError::Transport(Box::new(fault)));
        }
        if state.retries_left == 0 {
            warn!(url = %self.url, "retry budget exhausted, giving up");
            return Err(FetchError::RetriesExhausted {
                attempts: self.options.retries,
                source: Box::new(fault),
            });
        }
        state.retries_left -= 1;
        warn!(
            url = %self.url,
            attempt = self.options.retries - state.retries_left,
            budget = self.options.retries,
            error = %fault,
            "transport fault, retrying"
        );

        if state.remote_etag.is_some() && state.ranges_supported {
            let staged = match tokio::fs::metadata(staging_path).await {
                Ok(meta) if meta.is_file() => meta.len(),
                _ => 0,
            };
            return Ok(RequestPlan::Resume {
                offset: staged.saturating_sub(RESUME_REWIND),
            });
        }
        Ok(RequestPlan::Initial)
    }
}

async fn stream_body<C: HttpClient>(
    response: HttpResponse<C::Error>,
    mode: WriteMode,
    staging_path: &Path,
    cancel: &CancellationToken,
) -> std::result::Result<(), StreamFault<C::Error>> {
    let mut open = OpenOptions::new();
    open.write(true).create(true);
    if matches!(mode, WriteMode::Truncate) {
        open.truncate(true);
    }
    #[cfg(unix)]
    open.mode(STAGING_MODE);

    let mut file = open.open(staging_path).await.map_err(StreamFault::Write)?;
    if let WriteMode::Seek { offset } = mode {
        file.seek(SeekFrom::Start(offset))
            .await
            .map_err(StreamFault::Write)?;
    }

    let mut body = response.body;
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = file.flush().await;
                return Err(StreamFault::Cancelled);
            }
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(bytes)) => file.write_all(&bytes).await.map_err(StreamFault::Write)?,
            Some(Err(fault)) => {
                // keep what arrived; a resume will stat this file
                let _ = file.flush().await;
                return Err(StreamFault::Transport(fault));
            }
            None => break,
        }
    }
    file.flush().await.map_err(StreamFault::Write)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bytes::Bytes;
    use futures_util::stream;
    use tempfile::tempdir;

    use crate::effects::http::BoxStream;

    #[derive(Debug)]
    struct MockFault {
        transient: bool,
    }

    impl MockFault {
        fn reset() -> Self {
            Self { transient: true }
        }

        fn fatal() -> Self {
            Self { transient: false }
        }
    }

    impl std::fmt::Display for MockFault {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(
                f,
                "{}",
                if self.transient { "connection reset" } else { "tls failure" }
            )
        }
    }

    impl std::error::Error for MockFault {}

    enum Scripted {
        Respond {
            status: u16,
            headers: Vec<(&'static str, &'static str)>,
            body: BoxStream<'static, std::result::Result<Bytes, MockFault>>,
        },
        Fail(MockFault),
    }

    struct MockClient {
        script: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<Vec<(String, String)>>>,
    }

    impl MockClient {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Vec<(String, String)>> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl HttpClient for MockClient {
        type Error = MockFault;

        async fn get(
            &self,
            _url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<HttpResponse<MockFault>, MockFault> {
            self.requests.lock().unwrap().push(headers.to_vec());
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("script exhausted");
            match next {
                Scripted::Fail(fault) => Err(fault),
                Scripted::Respond {
                    status,
                    headers,
                    body,
                } => {
                    let headers = headers
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect();
                    Ok(HttpResponse {
                        status,
                        headers,
                        body,
                    })
                }
            }
        }

        fn is_transient(error: &MockFault) -> bool {
            error.transient
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn response(
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: Vec<std::result::Result<Bytes, MockFault>>,
    ) -> Scripted {
        Scripted::Respond {
            status,
            headers,
            body: Box::pin(stream::iter(body)),
        }
    }

    /// A 200 whose body yields one chunk and then never ends.
    fn stalled_response(first_chunk: &'static [u8]) -> Scripted {
        Scripted::Respond {
            status: 200,
            headers: vec![("etag", "\"v1\"")],
            body: Box::pin(
                stream::iter(vec![Ok(Bytes::from_static(first_chunk))])
                    .chain(stream::pending()),
            ),
        }
    }

    async fn run(
        client: &MockClient,
        destination: &Path,
        options: TransferOptions,
    ) -> Result<TransferSummary> {
        let staging = StagingArea::new();
        Transfer::new(
            client,
            "https://store.test/asset.bin",
            destination,
            &staging,
            options,
        )
        .run()
        .await
    }

    fn header<'a>(request: &'a [(String, String)], name: &str) -> Option<&'a str> {
        request
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn downloads_fresh_content() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![response(
            200,
            vec![("etag", "\"v1\"")],
            vec![Ok(Bytes::from_static(b"hello world"))],
        )]);

        let summary = run(&client, &destination, TransferOptions::default())
            .await
            .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        assert_eq!(summary.status, 200);
        assert_eq!(summary.etag.as_deref(), Some("v1"));
        assert_eq!(std::fs::read(&destination).unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn not_modified_is_one_request_and_no_write() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        std::fs::write(&destination, b"original").unwrap();
        let client = MockClient::new(vec![response(304, vec![], vec![])]);

        let summary = run(
            &client,
            &destination,
            TransferOptions::default().etag("abc"),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::NotModified);
        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(header(&requests[0], "If-None-Match"), Some("\"abc\""));
        assert_eq!(std::fs::read(&destination).unwrap(), b"original");
    }

    #[tokio::test]
    async fn resumes_from_rewound_offset_after_interrupt() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let full = payload(1500);
        let client = MockClient::new(vec![
            response(
                200,
                vec![("etag", "\"v1\""), ("accept-ranges", "bytes")],
                vec![
                    Ok(Bytes::copy_from_slice(&full[..1000])),
                    Err(MockFault::reset()),
                ],
            ),
            response(
                206,
                vec![("etag", "\"v1\""), ("content-range", "bytes 998-1499/1500")],
                vec![Ok(Bytes::copy_from_slice(&full[998..]))],
            ),
        ]);

        let summary = run(
            &client,
            &destination,
            TransferOptions::default().retries(3),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(header(&requests[1], "If-Match"), Some("\"v1\""));
        assert_eq!(header(&requests[1], "Range"), Some("bytes=998-"));
        assert_eq!(std::fs::read(&destination).unwrap(), full);
    }

    #[tokio::test]
    async fn zero_retries_fails_without_resume_attempt() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![response(
            200,
            vec![("etag", "\"v1\"")],
            vec![Ok(Bytes::from_static(b"part")), Err(MockFault::reset())],
        )]);

        let error = run(&client, &destination, TransferOptions::default().retries(0))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            FetchError::RetriesExhausted { attempts: 0, .. }
        ));
        assert_eq!(client.requests().len(), 1);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn precondition_failure_restarts_fresh_without_spending_budget() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![
            response(412, vec![], vec![]),
            response(200, vec![], vec![Ok(Bytes::from_static(b"fresh"))]),
        ]);

        // retries(0) proves the restart never touches the budget
        let summary = run(
            &client,
            &destination,
            TransferOptions::default().etag("stale").retries(0),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(header(&requests[0], "If-None-Match"), Some("\"stale\""));
        assert!(requests[1].is_empty());
        assert_eq!(std::fs::read(&destination).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn malformed_206_demotes_to_unconditional_get() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![
            response(206, vec![("content-range", "bytes */1500")], vec![]),
            response(200, vec![], vec![Ok(Bytes::from_static(b"whole"))]),
        ]);

        let summary = run(&client, &destination, TransferOptions::default().retries(0))
            .await
            .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].is_empty());
        assert_eq!(std::fs::read(&destination).unwrap(), b"whole");
    }

    #[tokio::test]
    async fn accept_ranges_none_latches_full_restarts() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![
            response(
                200,
                vec![("etag", "\"v1\""), ("accept-ranges", "none")],
                vec![Ok(Bytes::from_static(b"abc")), Err(MockFault::reset())],
            ),
            response(200, vec![], vec![Ok(Bytes::from_static(b"abcdef"))]),
        ]);

        let summary = run(&client, &destination, TransferOptions::default().retries(1))
            .await
            .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].is_empty(), "latched transfer must not send Range");
        assert_eq!(std::fs::read(&destination).unwrap(), b"abcdef");
    }

    #[tokio::test]
    async fn unexpected_status_is_terminal() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![response(500, vec![], vec![])]);

        let error = run(&client, &destination, TransferOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::HttpStatus(500)));
        assert_eq!(client.requests().len(), 1);
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn non_transient_fault_is_terminal() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![Scripted::Fail(MockFault::fatal())]);

        let error = run(&client, &destination, TransferOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(error, FetchError::Transport(_)));
        assert_eq!(client.requests().len(), 1);
    }

    #[tokio::test]
    async fn fault_before_any_response_retries_conditionally() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![
            Scripted::Fail(MockFault::reset()),
            response(304, vec![], vec![]),
        ]);

        let summary = run(
            &client,
            &destination,
            TransferOptions::default().etag("abc").retries(1),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::NotModified);
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(header(&requests[0], "If-None-Match"), Some("\"abc\""));
        assert_eq!(header(&requests[1], "If-None-Match"), Some("\"abc\""));
    }

    #[tokio::test]
    async fn pre_cancelled_transfer_makes_no_request() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![]);
        let token = CancellationToken::new();
        token.cancel();

        let error = run(
            &client,
            &destination,
            TransferOptions::default().cancel(token),
        )
        .await
        .unwrap_err();

        assert!(matches!(error, FetchError::Cancelled));
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn cancel_mid_stream_stops_the_transfer() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![stalled_response(b"first")]);
        let token = CancellationToken::new();

        let transfer = run(
            &client,
            &destination,
            TransferOptions::default().cancel(token.clone()),
        );
        let canceller = async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
            std::future::pending::<()>().await
        };

        tokio::select! {
            result = transfer => {
                assert!(matches!(result.unwrap_err(), FetchError::Cancelled));
            }
            _ = canceller => unreachable!(),
        }

        assert_eq!(client.requests().len(), 1);
        assert!(!destination.exists(), "cancelled transfer must not relocate");
    }

    #[tokio::test]
    async fn resume_disabled_by_option_never_sends_range() {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("asset.bin");
        let client = MockClient::new(vec![
            response(
                200,
                vec![("etag", "\"v1\"")],
                vec![Ok(Bytes::from_static(b"par")), Err(MockFault::reset())],
            ),
            response(200, vec![], vec![Ok(Bytes::from_static(b"partial"))]),
        ]);

        let summary = run(
            &client,
            &destination,
            TransferOptions::default().resume(false).retries(1),
        )
        .await
        .unwrap();

        assert_eq!(summary.outcome, TransferOutcome::Completed);
        assert!(client.requests()[1].is_empty());
        assert_eq!(std::fs::read(&destination).unwrap(), b"partial");
    }
}
