// src/hash.rs

//! Digest computation for index integrity checks
//!
//! Release manifests co-locate several hash families; this crate consumes
//! exactly one per run, selected by the hex width of the manifest digests:
//! - **MD5** (32 hex digits): the family the upstream build pipeline emits
//! - **SHA-256** (64 hex digits): preferred when the manifest carries it

use crate::error::Result;
use md5::Md5;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Buffer size for streaming file digests (64 KB)
const DIGEST_BUFFER_SIZE: usize = 65536;

/// Hash algorithm family, keyed by digest hex width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    /// MD5, 32 hex digits
    Md5,
    /// SHA-256, 64 hex digits
    Sha256,
}

impl HashAlgorithm {
    /// Digest length as a hex string
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha256 => 64,
        }
    }

    /// Algorithm name
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    /// Select the algorithm whose digest width matches `hex_len`
    pub fn from_hex_len(hex_len: usize) -> Option<Self> {
        [Self::Md5, Self::Sha256]
            .into_iter()
            .find(|algorithm| algorithm.hex_len() == hex_len)
    }

    /// Digest a byte slice, returning lowercase hex
    pub fn digest_bytes(&self, data: &[u8]) -> String {
        match self {
            Self::Md5 => format!("{:x}", Md5::digest(data)),
            Self::Sha256 => format!("{:x}", Sha256::digest(data)),
        }
    }

    /// Digest a file by streaming, returning lowercase hex
    pub fn digest_file(&self, path: &Path) -> Result<String> {
        let mut file = File::open(path)?;
        let mut buffer = [0u8; DIGEST_BUFFER_SIZE];

        match self {
            Self::Md5 => {
                let mut hasher = Md5::new();
                loop {
                    let n = file.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                loop {
                    let n = file.read(&mut buffer)?;
                    if n == 0 {
                        break;
                    }
                    hasher.update(&buffer[..n]);
                }
                Ok(format!("{:x}", hasher.finalize()))
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Check whether a string is a plausible digest for some supported family
pub fn looks_like_digest(s: &str) -> Option<HashAlgorithm> {
    if !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    HashAlgorithm::from_hex_len(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_md5_known_vector() {
        // md5("abc")
        assert_eq!(
            HashAlgorithm::Md5.digest_bytes(b"abc"),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_sha256_known_vector() {
        // sha256("abc")
        assert_eq!(
            HashAlgorithm::Sha256.digest_bytes(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_from_hex_len() {
        assert_eq!(HashAlgorithm::from_hex_len(32), Some(HashAlgorithm::Md5));
        assert_eq!(HashAlgorithm::from_hex_len(64), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_hex_len(40), None);
    }

    #[test]
    fn test_looks_like_digest() {
        assert_eq!(
            looks_like_digest("900150983cd24fb0d6963f7d28e17f72"),
            Some(HashAlgorithm::Md5)
        );
        assert_eq!(looks_like_digest("not-a-digest"), None);
        assert_eq!(looks_like_digest("abcd"), None);
    }

    #[test]
    fn test_digest_file_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data");
        std::fs::write(&path, b"hello world").unwrap();

        let from_file = HashAlgorithm::Sha256.digest_file(&path).unwrap();
        let from_bytes = HashAlgorithm::Sha256.digest_bytes(b"hello world");
        assert_eq!(from_file, from_bytes);
    }
}
