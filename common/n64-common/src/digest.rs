use md5::{Digest, Md5};
use std::fmt::Write;

/// Incremental 128-bit content digest.
///
/// `Clone` is required so that a snapshot of a partially-fed digest can be finalized without
/// disturbing the running computation.
pub trait ContentDigest: Clone {
    fn update(&mut self, data: &[u8]);

    #[must_use]
    fn finalize(self) -> [u8; 16];
}

#[derive(Debug, Clone, Default)]
pub struct Md5Digest(Md5);

impl Md5Digest {
    #[must_use]
    pub fn new() -> Self {
        Self(Md5::new())
    }
}

impl ContentDigest for Md5Digest {
    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.0, data);
    }

    fn finalize(self) -> [u8; 16] {
        let digest = self.0.finalize();
        let mut out = [0; 16];
        out.copy_from_slice(&digest);
        out
    }
}

/// Lowercase hex rendering of a digest, the form used as a database key.
#[must_use]
pub fn to_hex(digest: &[u8; 16]) -> String {
    digest.iter().fold(String::with_capacity(32), |mut s, byte| {
        let _ = write!(s, "{byte:02x}");
        s
    })
}
