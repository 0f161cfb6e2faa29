// src/catalog/mod.rs

//! In-memory package and source catalogs
//!
//! One pass over the parsed index stanzas builds three lookup structures:
//! binary packages by exact name, providing packages by virtual name, and
//! source packages by source name. The catalog owns every record for the
//! run and is read-only once built; the resolver only ever holds name-keyed
//! references into it.

use crate::control::{parse_relations, parse_stanzas, DepGroup, Stanza};
use crate::error::{Error, Result};
use crate::version::{Comparator, Version};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A binary package record from the Packages index
#[derive(Debug, Clone)]
pub struct PackageRecord {
    pub name: String,
    pub version: Version,
    pub architecture: String,
    /// Effective dependency expression: `Depends` and `Pre-Depends` merged,
    /// AND-groups in declaration order
    pub depends: Vec<DepGroup>,
    /// `Recommends` groups, expanded only on request and never fatal
    pub recommends: Vec<DepGroup>,
    /// `Breaks` and `Conflicts` merged; checked against the selected set
    /// after resolution, never during it
    pub conflicts: Vec<DepGroup>,
    /// Virtual names this package provides, optionally versioned
    pub provides: Vec<(String, Option<Version>)>,
    /// Declared source package, optionally with a version override.
    /// Absent when source name and version match the binary's own.
    pub source: Option<(String, Option<Version>)>,
}

impl PackageRecord {
    /// The source package name this binary maps to
    pub fn source_name(&self) -> &str {
        match &self.source {
            Some((name, _)) => name,
            None => &self.name,
        }
    }

    fn from_stanza(stanza: &Stanza) -> Result<Self> {
        let name = stanza.require("Package")?.to_string();
        let version = Version::parse(stanza.require("Version")?)?;
        let architecture = stanza.require("Architecture")?.to_string();

        // Pre-Depends differ from Depends only in unpack ordering, which is
        // a build-orchestration concern; for closure computation they are
        // one expression.
        let mut depends = Vec::new();
        for field in ["Pre-Depends", "Depends"] {
            if let Some(value) = stanza.get(field) {
                depends.extend(parse_relations(&name, field, value)?);
            }
        }

        let recommends = match stanza.get("Recommends") {
            Some(value) => parse_relations(&name, "Recommends", value)?,
            None => Vec::new(),
        };

        // Breaks and Conflicts differ only in whether deconfiguration would
        // suffice; for a build plan both mean the pair cannot coexist.
        let mut conflicts = Vec::new();
        for field in ["Breaks", "Conflicts"] {
            if let Some(value) = stanza.get(field) {
                conflicts.extend(parse_relations(&name, field, value)?);
            }
        }

        let provides = match stanza.get("Provides") {
            Some(value) => parse_provides(&name, value)?,
            None => Vec::new(),
        };

        let source = match stanza.get("Source") {
            Some(value) => Some(parse_source_ref(&name, value)?),
            None => None,
        };

        Ok(Self {
            name,
            version,
            architecture,
            depends,
            recommends,
            conflicts,
            provides,
            source,
        })
    }
}

/// One upstream file belonging to a source package
#[derive(Debug, Clone)]
pub struct SourceFileEntry {
    pub name: String,
    pub size: u64,
    pub digest: String,
}

/// A source package record from the Sources index
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub name: String,
    pub version: Version,
    /// Binary package names this source produces
    pub binaries: Vec<String>,
    /// `Build-Depends`, `Build-Depends-Indep` and `Build-Depends-Arch`
    /// merged; surfaced for reporting, never expanded into the plan
    pub build_depends: Vec<DepGroup>,
    /// Pool directory the files live under
    pub directory: Option<String>,
    /// Upstream files (`digest size name` per `Files` line)
    pub files: Vec<SourceFileEntry>,
}

impl SourceRecord {
    /// Total bytes to download for this source package
    pub fn download_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    fn from_stanza(stanza: &Stanza) -> Result<Self> {
        let name = stanza.require("Package")?.to_string();
        let version = Version::parse(stanza.require("Version")?)?;

        let binaries = match stanza.get("Binary") {
            Some(value) => value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        };

        let mut build_depends = Vec::new();
        for field in ["Build-Depends", "Build-Depends-Indep", "Build-Depends-Arch"] {
            if let Some(value) = stanza.get(field) {
                build_depends.extend(parse_relations(&name, field, value)?);
            }
        }

        let directory = stanza.get("Directory").map(|s| s.to_string());

        let mut files = Vec::new();
        if let Some(value) = stanza.get("Files") {
            for line in value.lines() {
                let mut parts = line.split_whitespace();
                if let (Some(digest), Some(size), Some(file_name)) =
                    (parts.next(), parts.next(), parts.next())
                {
                    let Ok(size) = size.parse::<u64>() else {
                        return Err(Error::StanzaParse {
                            line: stanza.start_line(),
                            message: format!(
                                "bad size in Files entry of source '{}': '{}'",
                                name, line.trim()
                            ),
                        });
                    };
                    files.push(SourceFileEntry {
                        name: file_name.to_string(),
                        size,
                        digest: digest.to_ascii_lowercase(),
                    });
                }
            }
        }

        Ok(Self {
            name,
            version,
            binaries,
            build_depends,
            directory,
            files,
        })
    }
}

/// Parse a `Provides` value into `(virtual name, provided version)` pairs
///
/// Provides has no alternatives; a versioned provide must use `=`.
fn parse_provides(package: &str, value: &str) -> Result<Vec<(String, Option<Version>)>> {
    let groups = parse_relations(package, "Provides", value)?;
    let mut provides = Vec::new();
    for group in groups {
        for alternative in group {
            let version = match alternative.constraint {
                Some(ref c) if c.comparator == Comparator::Exactly => {
                    Some(c.version.clone())
                }
                Some(ref c) => {
                    return Err(Error::DependencyExpression {
                        package: package.to_string(),
                        field: "Provides".to_string(),
                        expr: format!("provided version must use '=', got '{}'", c),
                    });
                }
                None => None,
            };
            provides.push((alternative.name, version));
        }
    }
    Ok(provides)
}

/// Parse a `Source: name [(version)]` reference
fn parse_source_ref(package: &str, value: &str) -> Result<(String, Option<Version>)> {
    let value = value.trim();
    let mut parts = value.split_whitespace();
    let bad = || Error::DependencyExpression {
        package: package.to_string(),
        field: "Source".to_string(),
        expr: value.to_string(),
    };

    let name = parts.next().ok_or_else(bad)?.to_string();
    let version = match parts.next() {
        Some(v) => {
            let inner = v.strip_prefix('(').and_then(|s| s.strip_suffix(')'));
            let inner = inner.ok_or_else(bad)?;
            Some(Version::parse(inner)?)
        }
        None => None,
    };
    if parts.next().is_some() {
        return Err(bad());
    }

    Ok((name, version))
}

/// Indexed, immutable views over one run's parsed index files
#[derive(Debug)]
pub struct Catalog {
    packages: HashMap<String, PackageRecord>,
    /// Virtual name → provider package names, each list sorted for
    /// deterministic tie-breaking
    provides: HashMap<String, Vec<String>>,
    sources: HashMap<String, SourceRecord>,
}

impl Catalog {
    /// Build the catalog in one pass over the decompressed index texts
    ///
    /// Stanzas whose `Architecture` is neither `architecture` nor `all` are
    /// skipped; two stanzas declaring the same name for the same
    /// architecture abort the build.
    pub fn build(
        packages_text: &str,
        sources_text: Option<&str>,
        architecture: &str,
    ) -> Result<Self> {
        let mut packages: HashMap<String, PackageRecord> = HashMap::new();
        let mut provides: HashMap<String, Vec<String>> = HashMap::new();

        for stanza in parse_stanzas(packages_text) {
            let record = PackageRecord::from_stanza(&stanza?)?;

            if record.architecture != architecture && record.architecture != "all" {
                continue;
            }

            if let Some(existing) = packages.get(&record.name) {
                if existing.architecture == record.architecture {
                    return Err(Error::DuplicatePackage {
                        name: record.name,
                        architecture: record.architecture,
                    });
                }
                // Same name for `all` and the native arch: the native build
                // wins, mirroring how one index normally lists it.
                if existing.architecture == "all" && record.architecture == architecture {
                    warn!(
                        "package '{}' listed for both 'all' and '{}'; keeping '{}'",
                        record.name, architecture, architecture
                    );
                } else {
                    continue;
                }
            }

            for (virtual_name, _) in &record.provides {
                provides
                    .entry(virtual_name.clone())
                    .or_default()
                    .push(record.name.clone());
            }
            packages.insert(record.name.clone(), record);
        }

        for providers in provides.values_mut() {
            providers.sort();
            providers.dedup();
        }

        let mut sources: HashMap<String, SourceRecord> = HashMap::new();
        if let Some(text) = sources_text {
            for stanza in parse_stanzas(text) {
                let record = SourceRecord::from_stanza(&stanza?)?;
                match sources.get(&record.name) {
                    // Several versions of one source may be listed; keep the
                    // newest, the way the binary index references it.
                    Some(existing) if existing.version >= record.version => {}
                    _ => {
                        sources.insert(record.name.clone(), record);
                    }
                }
            }
        }

        debug!(
            "catalog built: {} packages, {} virtual names, {} sources",
            packages.len(),
            provides.len(),
            sources.len()
        );

        Ok(Self {
            packages,
            provides,
            sources,
        })
    }

    /// Look up a binary package by exact name
    pub fn package(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.get(name)
    }

    /// Names of packages providing a virtual name, sorted
    pub fn providers(&self, virtual_name: &str) -> &[String] {
        self.provides
            .get(virtual_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Look up a source package by name
    pub fn source(&self, name: &str) -> Option<&SourceRecord> {
        self.sources.get(name)
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGES: &str = "\
Package: coreutils
Version: 9.1-1
Architecture: amd64
Depends: libc6 (>= 2.34)
Source: coreutils-src

Package: libc6
Version: 2.36-9
Architecture: amd64
Provides: libc-dev-token (= 2.36)

Package: mawk
Version: 1.3.4-1
Architecture: amd64
Provides: awk

Package: gawk
Version: 5.2.1-2
Architecture: amd64
Provides: awk

Package: docs
Version: 1.0
Architecture: all
";

    const SOURCES: &str = "\
Package: coreutils-src
Version: 9.1-1
Binary: coreutils
Build-Depends: debhelper (>= 13), gettext
Directory: pool/main/c/coreutils
Files:
 0123456789abcdef0123456789abcdef 4500 coreutils_9.1.orig.tar.xz
 fedcba9876543210fedcba9876543210 120 coreutils_9.1-1.debian.tar.xz
";

    fn catalog() -> Catalog {
        Catalog::build(PACKAGES, Some(SOURCES), "amd64").unwrap()
    }

    #[test]
    fn test_build_counts() {
        let cat = catalog();
        assert_eq!(cat.package_count(), 5);
        assert_eq!(cat.source_count(), 1);
    }

    #[test]
    fn test_package_lookup() {
        let cat = catalog();
        let pkg = cat.package("coreutils").unwrap();
        assert_eq!(pkg.version.to_string(), "9.1-1");
        assert_eq!(pkg.source_name(), "coreutils-src");
        assert_eq!(pkg.depends.len(), 1);
    }

    #[test]
    fn test_providers_sorted() {
        let cat = catalog();
        assert_eq!(cat.providers("awk"), &["gawk", "mawk"]);
        assert!(cat.providers("nonexistent").is_empty());
    }

    #[test]
    fn test_versioned_provides() {
        let cat = catalog();
        let libc = cat.package("libc6").unwrap();
        assert_eq!(libc.provides.len(), 1);
        assert_eq!(libc.provides[0].0, "libc-dev-token");
        assert_eq!(
            libc.provides[0].1.as_ref().unwrap().to_string(),
            "2.36"
        );
    }

    #[test]
    fn test_recommends_and_conflicts_parsed() {
        let text = "\
Package: mailer
Version: 1.0
Architecture: amd64
Recommends: spell-checker | dictionary
Breaks: old-mailer (<< 0.9)
Conflicts: other-mailer
";
        let cat = Catalog::build(text, None, "amd64").unwrap();
        let pkg = cat.package("mailer").unwrap();
        assert_eq!(pkg.recommends.len(), 1);
        assert_eq!(pkg.recommends[0].len(), 2);
        assert_eq!(pkg.conflicts.len(), 2);
        assert_eq!(pkg.conflicts[0][0].name, "old-mailer");
        assert!(pkg.conflicts[0][0].constraint.is_some());
        assert_eq!(pkg.conflicts[1][0].name, "other-mailer");
    }

    #[test]
    fn test_arch_all_included_foreign_skipped() {
        let text = "\
Package: docs
Version: 1.0
Architecture: all

Package: other-arch
Version: 1.0
Architecture: arm64
";
        let cat = Catalog::build(text, None, "amd64").unwrap();
        assert!(cat.package("docs").is_some());
        assert!(cat.package("other-arch").is_none());
    }

    #[test]
    fn test_duplicate_package_rejected() {
        let text = "\
Package: dup
Version: 1.0
Architecture: amd64

Package: dup
Version: 2.0
Architecture: amd64
";
        assert!(matches!(
            Catalog::build(text, None, "amd64"),
            Err(Error::DuplicatePackage { .. })
        ));
    }

    #[test]
    fn test_source_record_fields() {
        let cat = catalog();
        let src = cat.source("coreutils-src").unwrap();
        assert_eq!(src.binaries, vec!["coreutils"]);
        assert_eq!(src.files.len(), 2);
        assert_eq!(src.download_size(), 4620);
        assert_eq!(src.build_depends.len(), 2);
        assert_eq!(src.directory.as_deref(), Some("pool/main/c/coreutils"));
    }

    #[test]
    fn test_newest_source_version_wins() {
        let text = "\
Package: dual
Version: 1.0
Binary: dual

Package: dual
Version: 2.0
Binary: dual
";
        let cat = Catalog::build("", Some(text), "amd64");
        // Empty Packages text is fine for this test
        let cat = cat.unwrap();
        assert_eq!(cat.source("dual").unwrap().version.to_string(), "2.0");
    }

    #[test]
    fn test_source_ref_with_version_override() {
        let text = "\
Package: binpkg
Version: 1.0+b1
Architecture: amd64
Source: srcpkg (1.0)
";
        let cat = Catalog::build(text, None, "amd64").unwrap();
        let pkg = cat.package("binpkg").unwrap();
        let (name, version) = pkg.source.as_ref().unwrap();
        assert_eq!(name, "srcpkg");
        assert_eq!(version.as_ref().unwrap().to_string(), "1.0");
    }

    #[test]
    fn test_malformed_source_ref_rejected() {
        let text = "\
Package: binpkg
Version: 1.0
Architecture: amd64
Source: srcpkg 1.0
";
        assert!(Catalog::build(text, None, "amd64").is_err());
    }
}
