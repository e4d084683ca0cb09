//! Synchronization of remote content trees into a local mirror.
//!
//! A content document is JSON whose string leaves may reference media in
//! an object store. Synchronizing one document means rewriting those
//! references to local paths (`sylva-assets`), reconciling every
//! referenced object through the resumable transfer engine
//! (`sylva-fetch`) under a connection ceiling, and persisting the
//! rewritten JSON once the batch has drained.
//!
//! Documents are independent: per-asset failures are reported, not
//! escalated, and a failing document never blocks its siblings.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use sylva_fetch::ReqwestClient;
//! use sylva_sync::{StoreLayout, SyncOptions, Synchronizer};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let store = StoreLayout::new("https://media.example.com")?;
//! let sync = Synchronizer::new(ReqwestClient::new(), store, SyncOptions::default());
//!
//! let document = json!({ "hero": "https://media.example.com/img/hero.png" });
//! let report = sync
//!     .synchronize(
//!         document,
//!         "locales/en-US.json".as_ref(),
//!         "public".as_ref(),
//!         "assets",
//!     )
//!     .await?;
//! assert!(report.assets.is_clean());
//! # Ok(())
//! # }
//! ```

mod error;
mod orchestrator;
mod request;
mod scheduler;
mod store;

pub use error::SyncError;
pub use orchestrator::{SyncReport, Synchronizer};
pub use request::{SyncOptions, TransferRequest};
pub use scheduler::{BatchReport, run_transfers};
pub use store::StoreLayout;
