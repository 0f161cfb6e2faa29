// src/error.rs

//! Crate-wide error taxonomy
//!
//! Every fatal failure mode has its own variant so callers can react to the
//! kind of failure, not a stringly-typed message. Unmapped-source conditions
//! are deliberately *not* here: they are warnings collected on a successful
//! resolution outcome (see `resolver::ResolutionPlan`).

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Release manifest could not be parsed, or no entries matched the
    /// selected hash family
    #[error("release manifest: {0}")]
    ManifestParse(String),

    /// Network fetch of an index file failed
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Freshly fetched content does not match the digest the manifest promises
    #[error("integrity check failed for {}: expected {expected}, got {actual}", .path.display())]
    Integrity {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Structurally malformed control stanza
    #[error("stanza parse error at line {line}: {message}")]
    StanzaParse { line: usize, message: String },

    /// Malformed dependency expression inside an otherwise valid stanza
    #[error("bad dependency expression in {field} of package '{package}': {expr}")]
    DependencyExpression {
        package: String,
        field: String,
        expr: String,
    },

    /// Two stanzas declared the same package name for the same architecture
    #[error("duplicate package '{name}' for architecture '{architecture}'")]
    DuplicatePackage { name: String, architecture: String },

    /// A required package name has no catalog entry at all
    #[error("package '{name}' not found (required via {})", chain(.requesters))]
    UnresolvedPackage {
        name: String,
        requesters: Vec<String>,
    },

    /// No alternative of a dependency group could be satisfied
    #[error(
        "no installable alternative for dependency of '{package}' (required via {}): tried {}",
        chain(.requesters),
        .alternatives.join(", ")
    )]
    UnsatisfiableDependency {
        package: String,
        alternatives: Vec<String>,
        requesters: Vec<String>,
    },

    /// Writing the resolved plan failed
    #[error("failed to write plan to {}: {}", .path.display(), .reason)]
    OutputWrite { path: PathBuf, reason: String },

    #[error("version parse error: {0}")]
    VersionParse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Render a requester chain as `a -> b -> c` for error messages
fn chain(requesters: &[String]) -> String {
    if requesters.is_empty() {
        "request list".to_string()
    } else {
        requesters.join(" -> ")
    }
}
