// src/resolver/mod.rs

//! Breadth-first dependency resolution over the catalog
//!
//! Deterministic by construction: the frontier is a FIFO queue, requested
//! names enter in list order, OR-alternatives are tried in declaration
//! order, and virtual-name ties break by a fixed rule instead of search.
//! This is intentionally not a SAT solver; the first satisfiable
//! alternative wins and there is no backtracking.

use crate::catalog::{Catalog, PackageRecord};
use crate::control::DepAlternative;
use crate::error::{Error, Result};
use crate::version::Version;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, info, warn};

/// One selected binary package with its source mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub name: String,
    pub version: Version,
    pub source_name: String,
    /// Empty when the source mapping could not be established
    pub source_version: Option<Version>,
}

/// A binary whose declared source package is absent from the source catalog
///
/// Non-fatal; the binary still enters the plan with an empty source version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedSource {
    pub package: String,
    pub source_name: String,
}

/// Outcome of a successful resolution run
#[derive(Debug)]
pub struct ResolutionPlan {
    /// Selected packages sorted by name
    pub entries: Vec<PlanEntry>,
    pub warnings: Vec<UnmappedSource>,
    /// Total bytes of upstream source files for the mapped sources
    pub source_download_size: u64,
}

/// Two selected packages that declare they cannot coexist
///
/// `declaration` is the offending `Breaks`/`Conflicts` alternative as
/// written, constraint included.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlanConflict {
    pub package: String,
    pub conflicts_with: String,
    pub declaration: String,
}

/// Resolves transitive dependency closures against an immutable catalog
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    expand_recommends: bool,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            expand_recommends: false,
        }
    }

    /// Also pull in each selected package's satisfiable `Recommends`
    ///
    /// A recommendation with no installable alternative is skipped with a
    /// debug log, never an error.
    pub fn with_recommends(mut self, enabled: bool) -> Self {
        self.expand_recommends = enabled;
        self
    }

    /// Compute the closure of `requested`, never expanding or emitting
    /// anything in `excluded`
    ///
    /// Identical inputs against an unchanged catalog produce an identical
    /// plan. Excluded names count as already satisfied wherever they are
    /// depended upon.
    pub fn resolve(
        &self,
        requested: &[String],
        excluded: &HashSet<String>,
    ) -> Result<ResolutionPlan> {
        let mut visited: HashSet<String> = excluded.clone();
        let mut frontier: VecDeque<String> = VecDeque::new();
        // Requester edges for error chains, first writer wins
        let mut requested_by: HashMap<String, String> = HashMap::new();

        for name in requested {
            if visited.insert(name.clone()) {
                frontier.push_back(name.clone());
            }
        }

        let mut selected: Vec<String> = Vec::new();

        while let Some(name) = frontier.pop_front() {
            let record = self.catalog.package(&name).ok_or_else(|| {
                Error::UnresolvedPackage {
                    name: name.clone(),
                    requesters: self.chain_for(&name, &requested_by),
                }
            })?;
            selected.push(name.clone());

            for group in &record.depends {
                let choice = self.pick_alternative(group, excluded)?;
                let Some(provider) = choice else {
                    return Err(Error::UnsatisfiableDependency {
                        package: name.clone(),
                        alternatives: group.iter().map(|a| a.to_string()).collect(),
                        requesters: self.chain_for(&name, &requested_by),
                    });
                };
                if visited.insert(provider.clone()) {
                    requested_by.insert(provider.clone(), name.clone());
                    frontier.push_back(provider);
                }
            }

            if self.expand_recommends {
                for group in &record.recommends {
                    match self.pick_alternative(group, excluded)? {
                        Some(provider) => {
                            if visited.insert(provider.clone()) {
                                requested_by.insert(provider.clone(), name.clone());
                                frontier.push_back(provider);
                            }
                        }
                        None => {
                            debug!(
                                "no installable recommendation of '{}' among {:?}, skipping",
                                name,
                                group.iter().map(|a| a.to_string()).collect::<Vec<_>>()
                            );
                        }
                    }
                }
            }
        }

        selected.sort();
        info!("resolved {} packages from {} requests", selected.len(), requested.len());

        self.map_sources(selected)
    }

    /// First alternative in declaration order that a catalog entry
    /// satisfies, either by real name or through Provides
    ///
    /// `Ok(None)` means no alternative is satisfiable; the caller owns the
    /// error because it knows the requester.
    fn pick_alternative(
        &self,
        group: &[DepAlternative],
        excluded: &HashSet<String>,
    ) -> Result<Option<String>> {
        for alternative in group {
            // An excluded name counts as already satisfied, constraint and
            // catalog presence aside; it produces no new frontier entry.
            if excluded.contains(&alternative.name) {
                return Ok(Some(alternative.name.clone()));
            }
            if let Some(name) = self.satisfy(alternative) {
                return Ok(Some(name));
            }
            debug!("alternative '{}' not satisfiable, trying next", alternative);
        }
        Ok(None)
    }

    /// Resolve one alternative to a concrete package name, if possible
    fn satisfy(&self, alternative: &DepAlternative) -> Option<String> {
        if let Some(record) = self.catalog.package(&alternative.name) {
            let ok = match &alternative.constraint {
                Some(c) => c.satisfies(&record.version),
                None => true,
            };
            if ok {
                return Some(record.name.clone());
            }
        }

        // Virtual name. A provider named like the virtual wins outright;
        // otherwise the provider list is already sorted and the first
        // satisfying entry is the lexicographic choice.
        let providers = self.catalog.providers(&alternative.name);
        if providers.iter().any(|p| p == &alternative.name) {
            if let Some(provider) = self.catalog.package(&alternative.name) {
                if self.provides_satisfies(provider, alternative) {
                    return Some(alternative.name.clone());
                }
            }
        }
        for provider_name in providers {
            let Some(provider) = self.catalog.package(provider_name) else {
                continue;
            };
            if self.provides_satisfies(provider, alternative) {
                return Some(provider_name.clone());
            }
        }

        None
    }

    /// Whether `provider`'s Provides entry for the alternative's name
    /// satisfies its constraint
    ///
    /// An unversioned provide satisfies only unconstrained alternatives;
    /// a versioned provide is checked against the provided version.
    fn provides_satisfies(&self, provider: &PackageRecord, alternative: &DepAlternative) -> bool {
        provider.provides.iter().any(|(virtual_name, provided_version)| {
            if virtual_name != &alternative.name {
                return false;
            }
            match (&alternative.constraint, provided_version) {
                (None, _) => true,
                (Some(c), Some(v)) => c.satisfies(v),
                (Some(_), None) => false,
            }
        })
    }

    /// Walk requester edges back to a requested name
    fn chain_for(&self, name: &str, requested_by: &HashMap<String, String>) -> Vec<String> {
        let mut chain = vec![name.to_string()];
        let mut current = name;
        while let Some(parent) = requested_by.get(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Map each selected binary to its source package
    fn map_sources(&self, selected: Vec<String>) -> Result<ResolutionPlan> {
        let mut entries = Vec::with_capacity(selected.len());
        let mut warnings = Vec::new();
        let mut mapped_sources: HashSet<String> = HashSet::new();
        let mut source_download_size = 0u64;

        for name in selected {
            let record = self
                .catalog
                .package(&name)
                .ok_or_else(|| Error::UnresolvedPackage {
                    name: name.clone(),
                    requesters: Vec::new(),
                })?;

            let source_name = record.source_name().to_string();
            let declared_override = record.source.as_ref().and_then(|(_, v)| v.clone());

            let source_version = match self.catalog.source(&source_name) {
                Some(source) => {
                    if mapped_sources.insert(source_name.clone()) {
                        source_download_size += source.download_size();
                    }
                    Some(declared_override.unwrap_or_else(|| source.version.clone()))
                }
                None if record.source.is_none() => {
                    // No distinct source entry declared; the source shares
                    // the binary's name and version.
                    Some(declared_override.unwrap_or_else(|| record.version.clone()))
                }
                None => match declared_override {
                    Some(v) => Some(v),
                    None => {
                        warn!(
                            "source package '{}' for binary '{}' not in source index",
                            source_name, name
                        );
                        warnings.push(UnmappedSource {
                            package: name.clone(),
                            source_name: source_name.clone(),
                        });
                        None
                    }
                },
            };

            entries.push(PlanEntry {
                name,
                version: record.version.clone(),
                source_name,
                source_version,
            });
        }

        Ok(ResolutionPlan {
            entries,
            warnings,
            source_download_size,
        })
    }

    /// `Breaks`/`Conflicts` collisions inside the selected set
    ///
    /// Checked after resolution so the report covers the whole plan, not
    /// the traversal order. Collisions are warning-level: the plan drives
    /// source builds, and the caller decides whether coexistence matters.
    /// A package never conflicts with itself.
    pub fn plan_conflicts(&self, plan: &ResolutionPlan) -> Vec<PlanConflict> {
        let selected: HashMap<&str, &PlanEntry> = plan
            .entries
            .iter()
            .map(|e| (e.name.as_str(), e))
            .collect();

        let mut found = Vec::new();
        for entry in &plan.entries {
            let Some(record) = self.catalog.package(&entry.name) else {
                continue;
            };
            for group in &record.conflicts {
                for alternative in group {
                    if alternative.name == entry.name {
                        continue;
                    }
                    let Some(other) = selected.get(alternative.name.as_str()) else {
                        continue;
                    };
                    let collides = match &alternative.constraint {
                        Some(c) => c.satisfies(&other.version),
                        None => true,
                    };
                    if collides {
                        warn!(
                            "selected packages cannot coexist: '{}' declares {} against '{}'",
                            entry.name, alternative, other.name
                        );
                        found.push(PlanConflict {
                            package: entry.name.clone(),
                            conflicts_with: other.name.clone(),
                            declaration: alternative.to_string(),
                        });
                    }
                }
            }
        }

        found.sort();
        found.dedup();
        found
    }

    /// Build-dependency names of the plan's sources not covered by the
    /// resolved binary set
    ///
    /// A surface check for reporting only; build dependencies are never
    /// expanded into the plan. A name counts as covered when any resolved
    /// binary or one of its Provides matches it, constraints ignored.
    pub fn unmet_build_deps(&self, plan: &ResolutionPlan) -> Vec<(String, String)> {
        let mut covered: HashSet<&str> = HashSet::new();
        for entry in &plan.entries {
            covered.insert(entry.name.as_str());
            if let Some(record) = self.catalog.package(&entry.name) {
                for (virtual_name, _) in &record.provides {
                    covered.insert(virtual_name.as_str());
                }
            }
        }

        let mut unmet = Vec::new();
        let mut seen_sources: HashSet<&str> = HashSet::new();
        for entry in &plan.entries {
            if !seen_sources.insert(entry.source_name.as_str()) {
                continue;
            }
            let Some(source) = self.catalog.source(&entry.source_name) else {
                continue;
            };
            for group in &source.build_depends {
                let satisfied = group.iter().any(|alt| covered.contains(alt.name.as_str()));
                if !satisfied {
                    if let Some(first) = group.first() {
                        unmet.push((source.name.clone(), first.name.clone()));
                    }
                }
            }
        }

        unmet.sort();
        unmet.dedup();
        unmet
    }
}
