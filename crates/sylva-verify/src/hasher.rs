use digest::Digest;

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;

    /// The digest as a lowercase hex string.
    fn hex_finalize(self) -> String
    where
        Self: Sized,
    {
        hex::encode(self.finalize())
    }
}

/// Adapter turning any RustCrypto digest into a [`Hasher`].
pub struct DigestHasher<D: Digest + Send>(D);

impl<D: Digest + Send> DigestHasher<D> {
    pub fn new() -> Self { Self(D::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { D::digest(data).to_vec() }

    pub fn hex_digest(data: &[u8]) -> String { hex::encode(D::digest(data)) }
}

impl<D: Digest + Send> Default for DigestHasher<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Digest + Send> Hasher for DigestHasher<D> {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

/// MD5 — what an object store reports as the entity tag of content that was
/// uploaded in a single piece.
#[cfg(feature = "md5")]
pub type Md5Hasher = DigestHasher<md5::Md5>;

#[cfg(feature = "sha256")]
pub type Sha256Hasher = DigestHasher<sha2::Sha256>;
