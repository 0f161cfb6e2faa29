// src/lib.rs

//! debforge
//!
//! Repository index cache and deterministic dependency planner for
//! Debian-format repositories.
//!
//! # Architecture
//!
//! - Manifest-driven: index files are trusted only through release
//!   manifest digests
//! - Immutable catalog: one pass over parsed stanzas, read-only afterwards
//! - Deterministic resolution: breadth-first closure with fixed tie-break
//!   rules, no backtracking
//! - Atomic outputs: cache files and the plan are written temp-then-rename

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod compression;
pub mod control;
mod error;
pub mod hash;
pub mod plan;
pub mod release;
pub mod resolver;
pub mod version;

pub use catalog::{Catalog, PackageRecord, SourceRecord};
pub use control::{DepAlternative, DepGroup, Stanza};
pub use error::{Error, Result};
pub use hash::HashAlgorithm;
pub use release::ReleaseManifest;
pub use resolver::{PlanConflict, PlanEntry, ResolutionPlan, Resolver, UnmappedSource};
pub use version::{Comparator, Constraint, Version};
