//! I/O: the request capability abstraction and the transfer state machine.

mod http;
mod transfer;

pub use http::{BoxStream, HttpClient, HttpResponse};
pub use transfer::Transfer;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
