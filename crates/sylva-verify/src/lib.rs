//! Content hashing primitives for mirrored assets.
//!
//! A mirror decides whether a local file is current by comparing its
//! content digest against the entity tag the store reports. This crate
//! provides the incremental [`Hasher`] abstraction over byte slices and the
//! concrete algorithms behind feature flags; reading files and comparing
//! validators stays with the caller.
//!
//! # Example
//!
//! ```
//! use sylva_verify::{Hasher, Md5Hasher};
//!
//! let mut hasher = Md5Hasher::new();
//! hasher.update(b"hello ");
//! hasher.update(b"world");
//! assert_eq!(hasher.hex_finalize(), "5eb63bbbe01eeed093cb22bb8f5acdc3");
//! ```

pub use self::hasher::{DigestHasher, Hasher};

#[cfg(feature = "md5")]
pub use self::hasher::Md5Hasher;

#[cfg(feature = "sha256")]
pub use self::hasher::Sha256Hasher;

mod hasher;
