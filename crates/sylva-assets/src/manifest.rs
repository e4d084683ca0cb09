use serde_json::Value;

/// The outcome of scanning one content document.
#[derive(Debug, Clone)]
pub struct AssetManifest {
    /// The document with every store reference rewritten to a local path.
    pub tree: Value,
    /// Storage keys the document references, deduplicated, in first-seen
    /// order. Keys are decoded: two URL spellings of the same object
    /// collapse to one entry.
    pub keys: Vec<String>,
}

impl AssetManifest {
    /// Whether the document references anything at all.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
