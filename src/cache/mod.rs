// src/cache/mod.rs

//! Local index cache keyed by release manifest digests
//!
//! Index files live flat in the cache directory under names derived from
//! their manifest-relative paths. A cached file whose digest matches the
//! current manifest entry is reused without touching the network; anything
//! else is re-fetched, preferring the compressed variants, verified against
//! the manifest, and moved into place atomically.

use crate::compression::{decompress, CompressionFormat};
use crate::error::{Error, Result};
use crate::hash::HashAlgorithm;
use crate::release::ReleaseManifest;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use rayon::prelude::*;
use reqwest::blocking::Client;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for failed downloads
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// Buffer size for streaming downloads (8 KB)
const STREAM_BUFFER_SIZE: usize = 8192;

/// The index files a resolution run needs from one distribution component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    BinaryPackages,
    Sources,
    Translation,
}

impl IndexKind {
    /// Manifest-relative path of the uncompressed index
    pub fn relative_path(&self, component: &str, architecture: &str) -> String {
        match self {
            Self::BinaryPackages => {
                format!("{component}/binary-{architecture}/Packages")
            }
            Self::Sources => format!("{component}/source/Sources"),
            Self::Translation => format!("{component}/i18n/Translation-en"),
        }
    }

}

/// HTTP client wrapper with retry support
pub struct IndexClient {
    client: Client,
    max_retries: u32,
}

impl IndexClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Fetch {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Fetch a URL to bytes with retries, streaming through a fixed buffer
    pub fn fetch_bytes(&self, url: &str, progress: Option<&ProgressBar>) -> Result<Vec<u8>> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, progress) {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if attempt >= self.max_retries || !is_retryable(&e) {
                        return Err(e);
                    }
                    warn!("fetch attempt {} for {} failed: {}, retrying", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(
                        RETRY_DELAY_MS * attempt as u64,
                    ));
                }
            }
        }
    }

    fn fetch_once(&self, url: &str, progress: Option<&ProgressBar>) -> Result<Vec<u8>> {
        let mut response = self.client.get(url).send().map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Error::Fetch {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        if let Some(pb) = progress {
            if let Some(len) = response.content_length() {
                pb.set_length(len);
            }
        }

        let mut bytes = Vec::new();
        let mut buffer = [0u8; STREAM_BUFFER_SIZE];
        loop {
            let n = response.read(&mut buffer).map_err(|e| Error::Fetch {
                url: url.to_string(),
                reason: format!("read failed: {e}"),
            })?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&buffer[..n]);
            if let Some(pb) = progress {
                pb.set_position(bytes.len() as u64);
            }
        }

        Ok(bytes)
    }

    /// Fetch plain text with retries
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url, None)?;
        String::from_utf8(bytes).map_err(|e| Error::Fetch {
            url: url.to_string(),
            reason: format!("invalid UTF-8: {e}"),
        })
    }
}

/// HTTP errors worth retrying: transport failures and server-side status.
/// A 404 on a compressed variant is a signal to try the next variant, not
/// to hammer the mirror.
fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Fetch { reason, .. } => !reason.starts_with("HTTP 4"),
        _ => false,
    }
}

/// Compressed variants tried in order before the raw file
const VARIANTS: [CompressionFormat; 3] = [
    CompressionFormat::Gzip,
    CompressionFormat::Bzip2,
    CompressionFormat::None,
];

/// Manages the on-disk cache of decompressed index files
pub struct IndexCache {
    cache_dir: PathBuf,
    client: IndexClient,
}

/// Outcome of one `ensure_fresh` call, for the sync summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Cached file already matched the manifest digest
    Reused,
    /// File was fetched, verified and written
    Fetched,
}

impl IndexCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(Self {
            cache_dir,
            client: IndexClient::new()?,
        })
    }

    /// Cache path for a manifest-relative index path
    ///
    /// Path separators flatten to underscores so the cache stays a single
    /// directory: `main/binary-amd64/Packages` becomes
    /// `main_binary-amd64_Packages`.
    pub fn cached_path(&self, relative_path: &str) -> PathBuf {
        self.cache_dir.join(relative_path.replace('/', "_"))
    }

    /// Fetch the release manifest for a distribution
    ///
    /// Tries `InRelease` first, then the detached `Release` file.
    pub fn fetch_manifest(
        &self,
        mirror: &str,
        distribution: &str,
    ) -> Result<ReleaseManifest> {
        let base = format!("{}/dists/{}", mirror.trim_end_matches('/'), distribution);
        let inrelease_url = format!("{base}/InRelease");

        let text = match self.client.fetch_text(&inrelease_url) {
            Ok(text) => text,
            Err(e) => {
                debug!("InRelease unavailable ({}), falling back to Release", e);
                self.client.fetch_text(&format!("{base}/Release"))?
            }
        };

        ReleaseManifest::parse_auto(&text)
    }

    /// Ensure one index file is present, decompressed and digest-verified
    ///
    /// Returns the cache path of the verified file and whether the network
    /// was used.
    pub fn ensure_fresh(
        &self,
        manifest: &ReleaseManifest,
        mirror: &str,
        distribution: &str,
        relative_path: &str,
        progress: Option<&ProgressBar>,
    ) -> Result<(PathBuf, CacheOutcome)> {
        let entry = manifest.expected(relative_path).ok_or_else(|| {
            Error::ManifestParse(format!(
                "manifest has no entry for '{relative_path}'"
            ))
        })?;
        let dest = self.cached_path(relative_path);

        if let Some(actual) = digest_if_present(&dest, manifest.algorithm())? {
            if actual == entry.digest {
                debug!("cache hit for {}", relative_path);
                if let Some(pb) = progress {
                    pb.finish_with_message(format!("{relative_path} (cached)"));
                }
                return Ok((dest, CacheOutcome::Reused));
            }
            debug!(
                "cached {} is stale ({} != {}), refetching",
                relative_path, actual, entry.digest
            );
        }

        let base = format!(
            "{}/dists/{}/{}",
            mirror.trim_end_matches('/'),
            distribution,
            relative_path
        );

        let mut last_error = None;
        for format in VARIANTS {
            let url = format!("{base}{}", format.extension());
            match self.client.fetch_bytes(&url, progress) {
                Ok(raw) => {
                    // The URL extension is the format authority, same rule
                    // going out and coming back.
                    let format = CompressionFormat::from_extension(&url);
                    let data = decompress(&raw, format).map_err(|e| Error::Fetch {
                        url: url.clone(),
                        reason: format!("decompression failed: {e}"),
                    })?;
                    self.verify_and_store(&dest, relative_path, entry, &data, manifest)?;
                    if let Some(pb) = progress {
                        pb.finish_with_message(relative_path.to_string());
                    }
                    info!(
                        "fetched {} ({} bytes, {})",
                        relative_path,
                        data.len(),
                        format.name()
                    );
                    return Ok((dest, CacheOutcome::Fetched));
                }
                Err(e) => {
                    debug!("variant {} unavailable: {}", url, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Fetch {
            url: base,
            reason: "no compression variant available".to_string(),
        }))
    }

    /// Verify decompressed bytes against the manifest and persist them
    fn verify_and_store(
        &self,
        dest: &Path,
        relative_path: &str,
        entry: &crate::release::ManifestEntry,
        data: &[u8],
        manifest: &ReleaseManifest,
    ) -> Result<()> {
        if data.len() as u64 != entry.size {
            return Err(Error::Integrity {
                path: dest.to_path_buf(),
                expected: format!("{} bytes", entry.size),
                actual: format!("{} bytes", data.len()),
            });
        }

        let actual = manifest.algorithm().digest_bytes(data);
        if actual != entry.digest {
            return Err(Error::Integrity {
                path: dest.to_path_buf(),
                expected: entry.digest.clone(),
                actual,
            });
        }

        // Write to a sibling temp file and rename so a crash never leaves a
        // half-written index at the final path.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(data)?;
        tmp.persist(dest).map_err(|e| Error::OutputWrite {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!("stored {} ({} bytes)", relative_path, data.len());
        Ok(())
    }

    /// Ensure a set of index files concurrently
    ///
    /// Results come back in the order of `paths` regardless of which fetch
    /// finished first.
    pub fn ensure_all(
        &self,
        manifest: &ReleaseManifest,
        mirror: &str,
        distribution: &str,
        paths: &[String],
    ) -> Result<Vec<(PathBuf, CacheOutcome)>> {
        let multi = MultiProgress::new();
        let style = ProgressStyle::with_template(
            "{msg:40} [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());

        let bars: Vec<ProgressBar> = paths
            .iter()
            .map(|path| {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(style.clone());
                pb.set_message(path.clone());
                pb
            })
            .collect();

        paths
            .par_iter()
            .zip(bars.par_iter())
            .map(|(path, pb)| {
                self.ensure_fresh(manifest, mirror, distribution, path, Some(pb))
            })
            .collect()
    }
}

/// Digest a cached file if it exists; missing files are a cache miss, not
/// an error
fn digest_if_present(path: &Path, algorithm: HashAlgorithm) -> Result<Option<String>> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(algorithm.digest_file(path)?))
}
