use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// One HTTP response, reduced to what the transfer engine consumes.
pub struct HttpResponse<E> {
    pub status: u16,
    /// Response headers with lower-cased names.
    pub headers: HashMap<String, String>,
    /// The body, as a stream of chunks; an `Err` item is a transport fault
    /// observed mid-body.
    pub body: BoxStream<'static, std::result::Result<Bytes, E>>,
}

impl<E> HttpResponse<E> {
    /// Look up a header by its lower-cased name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Asynchronous request capability consumed by the transfer engine.
///
/// One call issues one GET. Implementations own their redirect following,
/// timeouts and connection pooling; the engine only composes conditional
/// and range headers on top and classifies faults through
/// [`HttpClient::is_transient`].
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Error type for HTTP operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue one GET with the given header overrides.
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = std::result::Result<HttpResponse<Self::Error>, Self::Error>> + Send;

    /// Whether a fault is a transient transport condition worth retrying
    /// (connection reset, timeout). Everything else is terminal.
    fn is_transient(error: &Self::Error) -> bool;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;

    /// Production HTTP client backed by a shared `reqwest::Client`.
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Self {
            Self {
                client: reqwest::Client::new(),
            }
        }

        /// Wrap a preconfigured client (custom timeouts, proxies, TLS).
        pub fn with_client(client: reqwest::Client) -> Self {
            Self { client }
        }
    }

    impl Default for ReqwestClient {
        fn default() -> Self {
            Self::new()
        }
    }

    impl HttpClient for ReqwestClient {
        type Error = reqwest::Error;

        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> std::result::Result<HttpResponse<Self::Error>, Self::Error> {
            let mut request = self.client.get(url);
            for (name, value) in headers {
                request = request.header(name, value);
            }

            let response = request.send().await?;
            let status = response.status().as_u16();

            let mut header_map = HashMap::new();
            for (name, value) in response.headers() {
                if let Ok(value) = value.to_str() {
                    header_map.insert(name.as_str().to_ascii_lowercase(), value.to_string());
                }
            }

            Ok(HttpResponse {
                status,
                headers: header_map,
                body: Box::pin(response.bytes_stream()),
            })
        }

        fn is_transient(error: &reqwest::Error) -> bool {
            error.is_timeout() || error.is_connect() || error.is_body()
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
