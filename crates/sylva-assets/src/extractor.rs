use std::collections::{HashSet, VecDeque};

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

use crate::AssetManifest;

/// Finds object-store URLs inside JSON values and rewrites them to local
/// paths.
///
/// Content documents are arbitrary JSON; a store reference can sit in any
/// string leaf at any depth. The walk is breadth-first over an explicit
/// worklist, so document depth is bounded by memory rather than stack.
///
/// The extractor consumes its input tree and returns the rewritten tree in
/// the manifest; callers that still need the original should clone before
/// extracting.
#[derive(Debug, Clone)]
pub struct AssetExtractor {
    store_host: String,
}

impl AssetExtractor {
    /// `store_host` is the object store's hostname; subdomains of it also
    /// match.
    pub fn new(store_host: impl Into<String>) -> Self {
        Self {
            store_host: store_host.into().to_ascii_lowercase(),
        }
    }

    /// Rewrite every store reference in `tree` to a path under
    /// `local_prefix` and collect the referenced storage keys.
    pub fn extract(&self, mut tree: Value, local_prefix: &str) -> AssetManifest {
        let mut keys = Vec::new();
        let mut seen = HashSet::new();

        let mut work: VecDeque<&mut Value> = VecDeque::new();
        work.push_back(&mut tree);

        while let Some(value) = work.pop_front() {
            match value {
                Value::Object(map) => work.extend(map.values_mut()),
                Value::Array(items) => work.extend(items.iter_mut()),
                Value::String(text) => {
                    if let Some(key) = self.asset_key(text) {
                        *text = join_local(local_prefix, &key);
                        if seen.insert(key.clone()) {
                            keys.push(key);
                        }
                    }
                }
                _ => {}
            }
        }

        AssetManifest { tree, keys }
    }

    /// The decoded storage key, when `text` is an absolute URL into the
    /// store. Anything that fails to parse is simply not a reference.
    fn asset_key(&self, text: &str) -> Option<String> {
        let url = Url::parse(text).ok()?;
        match url.scheme() {
            "http" | "https" => {}
            _ => return None,
        }

        let host = url.host_str()?.to_ascii_lowercase();
        let is_store = host == self.store_host
            || (host.len() > self.store_host.len()
                && host.ends_with(&self.store_host)
                && host.as_bytes()[host.len() - self.store_host.len() - 1] == b'.');
        if !is_store {
            return None;
        }

        let decoded = percent_decode_str(url.path()).decode_utf8().ok()?;
        Some(decoded.strip_prefix('/').unwrap_or(&decoded).to_string())
    }
}

fn join_local(prefix: &str, key: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        key.to_string()
    } else {
        format!("{trimmed}/{key}")
    }
}
