//! Discovery and rewriting of object-store references in content trees.
//!
//! A mirrored document arrives as arbitrary JSON in which any string leaf
//! may point at a media asset by absolute object-store URL. The
//! [`AssetExtractor`] walks the tree, rewrites every matching leaf to a
//! local relative path, and reports the deduplicated set of storage keys
//! for the download scheduler to reconcile.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use sylva_assets::AssetExtractor;
//!
//! let extractor = AssetExtractor::new("media.store.test");
//! let manifest = extractor.extract(
//!     json!({ "image": "https://media.store.test/img/hero.png" }),
//!     "assets",
//! );
//!
//! assert_eq!(manifest.tree, json!({ "image": "assets/img/hero.png" }));
//! assert_eq!(manifest.keys, vec!["img/hero.png"]);
//! ```

mod extractor;
mod manifest;

pub use extractor::AssetExtractor;
pub use manifest::AssetManifest;
