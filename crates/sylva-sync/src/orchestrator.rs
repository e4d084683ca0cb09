//! Per-document composition: extract, reconcile, persist.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use sylva_assets::AssetExtractor;
use sylva_fetch::{FetchError, HttpClient, Transfer, TransferOptions, TransferSummary};
use sylva_fs::StagingArea;
use sylva_verify::{Hasher, Md5Hasher};

use crate::scheduler::{BatchReport, run_transfers};
use crate::{StoreLayout, SyncError, SyncOptions, TransferRequest};

/// Report for one synchronized document.
#[derive(Debug)]
pub struct SyncReport {
    pub document_path: PathBuf,
    pub assets: BatchReport,
}

/// Mirrors content documents and the assets they reference.
///
/// One synchronizer holds the request capability, the store layout and a
/// shared staging area; documents are synchronized independently of one
/// another, so a failing document never blocks its siblings.
pub struct Synchronizer<C: HttpClient> {
    client: C,
    store: StoreLayout,
    staging: StagingArea,
    options: SyncOptions,
}

impl<C: HttpClient> Synchronizer<C> {
    pub fn new(client: C, store: StoreLayout, options: SyncOptions) -> Self {
        Self {
            client,
            store,
            staging: StagingArea::new(),
            options,
        }
    }

    /// Use a specific staging area instead of a fresh process-wide one.
    #[must_use]
    pub fn with_staging(mut self, staging: StagingArea) -> Self {
        self.staging = staging;
        self
    }

    /// Reconcile one document: rewrite its store references to local
    /// paths, fetch the referenced assets under the connection ceiling,
    /// then persist the rewritten JSON.
    ///
    /// The document is written only after the asset batch has drained
    /// (immediately when asset sync is disabled). Per-asset failures land
    /// in the report and do not fail the document; errors from this
    /// function are document-level (serialization, filesystem).
    pub async fn synchronize(
        &self,
        document: Value,
        document_path: &Path,
        asset_root: &Path,
        local_prefix: &str,
    ) -> Result<SyncReport, SyncError> {
        if !self.options.sync_assets {
            write_document(&document, document_path)?;
            return Ok(SyncReport {
                document_path: document_path.to_path_buf(),
                assets: BatchReport::default(),
            });
        }

        let extractor = AssetExtractor::new(self.store.host());
        let manifest = extractor.extract(document, local_prefix);
        debug!(
            document = %document_path.display(),
            assets = manifest.keys.len(),
            "extracted asset references"
        );

        let requests = build_requests(&manifest.keys, asset_root).await;
        let assets = run_transfers(requests, self.options.max_connections, |request| {
            self.transfer_one(request)
        })
        .await;

        write_document(&manifest.tree, document_path)?;
        info!(
            document = %document_path.display(),
            completed = assets.completed.len(),
            up_to_date = assets.not_modified.len(),
            failed = assets.failed.len(),
            "document synchronized"
        );

        Ok(SyncReport {
            document_path: document_path.to_path_buf(),
            assets,
        })
    }

    async fn transfer_one(
        &self,
        request: TransferRequest,
    ) -> Result<TransferSummary, FetchError> {
        let url = self.store.url_for(&request.remote_key);
        let mut options = TransferOptions::default()
            .retries(self.options.retries)
            .cancel(self.options.cancel.child_token());
        if let Some(etag) = request.etag {
            options = options.etag(etag);
        }
        Transfer::new(&self.client, url, request.local_path, &self.staging, options)
            .run()
            .await
    }
}

async fn build_requests(keys: &[String], asset_root: &Path) -> Vec<TransferRequest> {
    let mut requests = Vec::with_capacity(keys.len());
    for key in keys {
        let local_path = asset_root.join(key);
        let etag = local_entity_tag(&local_path).await;
        requests.push(TransferRequest {
            remote_key: key.clone(),
            local_path,
            etag,
        });
    }
    requests
}

/// MD5 of the local copy, hex-encoded — the entity tag an object store
/// reports for content uploaded in one piece. No readable file, no
/// validator.
async fn local_entity_tag(path: &Path) -> Option<String> {
    let bytes = tokio::fs::read(path).await.ok()?;
    let mut hasher = Md5Hasher::new();
    hasher.update(&bytes);
    Some(hasher.hex_finalize())
}

/// 4-space-indented JSON, written atomically.
fn write_document(tree: &Value, path: &Path) -> Result<(), SyncError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    tree.serialize(&mut serializer)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sylva_fs::from_io)?;
        }
    }
    sylva_fs::atomic_write(path, &buf, sylva_fs::AtomicWriteOptions::new())?;
    Ok(())
}
