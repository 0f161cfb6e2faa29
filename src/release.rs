// src/release.rs

//! Release manifest parsing
//!
//! A release manifest lists the expected digest and size of every index file
//! the repository publishes, as whitespace-delimited `digest size relativePath`
//! lines. The manifest co-locates several hash families; one run consumes
//! exactly one, selected by digest hex width, and ignores every line that does
//! not belong to it. Clearsigned (`InRelease`-style) framing is tolerated:
//! armor headers and the trailing signature block are skipped, not verified.

use crate::error::{Error, Result};
use crate::hash::{looks_like_digest, HashAlgorithm};
use std::collections::HashMap;
use tracing::debug;

/// Expected digest and size of one index file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: String,
    pub size: u64,
}

/// Parsed release manifest restricted to one hash family
#[derive(Debug, Clone)]
pub struct ReleaseManifest {
    algorithm: HashAlgorithm,
    entries: HashMap<String, ManifestEntry>,
}

impl ReleaseManifest {
    /// Parse manifest text, keeping only entries of the given hash family
    ///
    /// Fails if the manifest is empty or no line carries a digest of the
    /// selected family's width.
    pub fn parse(text: &str, algorithm: HashAlgorithm) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::ManifestParse("manifest is empty".to_string()));
        }

        let mut entries: HashMap<String, ManifestEntry> = HashMap::new();
        let mut in_signature = false;

        for line in text.lines() {
            // Clearsigned framing: everything from the signature block on is
            // opaque, and armor/hash-header lines never look like entries.
            if line.starts_with("-----BEGIN PGP SIGNATURE-----") {
                in_signature = true;
            }
            if in_signature || line.starts_with("-----") {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(digest), Some(size), Some(path), None) =
                (parts.next(), parts.next(), parts.next(), parts.next())
            else {
                continue;
            };

            if looks_like_digest(digest) != Some(algorithm) {
                continue;
            }
            let Ok(size) = size.parse::<u64>() else {
                continue;
            };

            let digest = digest.to_ascii_lowercase();
            if let Some(existing) = entries.get(path) {
                // Re-listing the same entry is harmless; a conflicting digest
                // for the same path violates the at-most-one invariant.
                if existing.digest != digest {
                    return Err(Error::ManifestParse(format!(
                        "conflicting {} digests for '{}'",
                        algorithm, path
                    )));
                }
                continue;
            }
            entries.insert(path.to_string(), ManifestEntry { digest, size });
        }

        if entries.is_empty() {
            return Err(Error::ManifestParse(format!(
                "no {} entries found in manifest",
                algorithm
            )));
        }

        debug!(
            "parsed release manifest: {} {} entries",
            entries.len(),
            algorithm
        );

        Ok(Self { algorithm, entries })
    }

    /// Parse, selecting SHA-256 when the manifest carries it, else MD5
    pub fn parse_auto(text: &str) -> Result<Self> {
        match Self::parse(text, HashAlgorithm::Sha256) {
            Ok(manifest) => Ok(manifest),
            Err(_) => Self::parse(text, HashAlgorithm::Md5),
        }
    }

    /// The hash family this manifest was restricted to
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Expected digest and size for a relative index path, if listed
    pub fn expected(&self, relative_path: &str) -> Option<&ManifestEntry> {
        self.entries.get(relative_path)
    }

    /// Number of entries in the selected family
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
