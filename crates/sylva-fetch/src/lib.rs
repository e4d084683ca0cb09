//! Resumable, conditional HTTP transfers with atomic placement.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration and result types
//! - `core` - Pure transformations (header grammars)
//! - `effects` - I/O with trait abstraction
//!
//! # Key Features
//!
//! - **Conditional**: a known local entity tag turns the first request into
//!   `If-None-Match`; a current copy costs one round trip and no body.
//! - **Resumable**: transient transport faults continue the body with
//!   `If-Match` + `Range` instead of re-transferring completed bytes.
//! - **Atomic Placement**: bytes stream into a private staging file that is
//!   relocated over the destination only once complete; the destination is
//!   never truncated speculatively.
//! - **Mechanism-Only**: the HTTP client is injected behind [`HttpClient`];
//!   timeouts, redirects and connection pooling belong to the caller.

mod core;
mod data;
mod effects;
mod error;

pub use core::{ContentRange, EntityTag, format_entity_tag};
pub use data::{TransferOptions, TransferOutcome, TransferSummary};
pub use effects::{BoxStream, HttpClient, HttpResponse, Transfer};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, Result};
