// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use debforge::cache::{CacheOutcome, IndexCache, IndexKind};
use debforge::catalog::Catalog;
use debforge::cli::{Cli, Commands};
use debforge::plan;
use debforge::resolver::Resolver;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            mirror,
            dist,
            component,
            arch,
            cache_dir,
        } => run_sync(&mirror, &dist, &component, &arch, &cache_dir),
        Commands::Resolve {
            packages,
            sources,
            required,
            skip,
            output,
            arch,
            with_recommends,
            check_build_deps,
        } => run_resolve(
            &packages,
            sources.as_deref(),
            &required,
            skip.as_deref(),
            &output,
            &arch,
            with_recommends,
            check_build_deps,
        ),
    }
}

fn run_sync(
    mirror: &str,
    dist: &str,
    component: &str,
    arch: &str,
    cache_dir: &Path,
) -> Result<()> {
    let cache = IndexCache::new(cache_dir)?;

    info!("fetching release manifest for {}/{}", mirror, dist);
    let manifest = cache
        .fetch_manifest(mirror, dist)
        .with_context(|| format!("failed to read release manifest for '{dist}'"))?;
    info!(
        "manifest lists {} files ({} digests)",
        manifest.len(),
        manifest.algorithm().name()
    );

    let paths: Vec<String> = [
        IndexKind::BinaryPackages,
        IndexKind::Sources,
        IndexKind::Translation,
    ]
    .iter()
    .map(|kind| kind.relative_path(component, arch))
    .collect();

    let results = cache.ensure_all(&manifest, mirror, dist, &paths)?;

    let fetched = results
        .iter()
        .filter(|(_, outcome)| *outcome == CacheOutcome::Fetched)
        .count();
    println!(
        "cache up to date: {} files ({} fetched, {} reused)",
        results.len(),
        fetched,
        results.len() - fetched
    );
    for (path, _) in &results {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_resolve(
    packages_path: &Path,
    sources_path: Option<&Path>,
    required_path: &Path,
    skip_path: Option<&Path>,
    output: &Path,
    arch: &str,
    with_recommends: bool,
    check_build_deps: bool,
) -> Result<()> {
    let packages_text = fs::read_to_string(packages_path)
        .with_context(|| format!("failed to read {}", packages_path.display()))?;
    let sources_text = match sources_path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    let catalog = Catalog::build(&packages_text, sources_text.as_deref(), arch)?;
    info!(
        "catalog ready: {} binary packages, {} sources",
        catalog.package_count(),
        catalog.source_count()
    );

    let requested = plan::load_name_list(required_path)?;
    let excluded: HashSet<String> = match skip_path {
        Some(path) => plan::load_name_list(path)?.into_iter().collect(),
        None => HashSet::new(),
    };

    let resolver = Resolver::new(&catalog).with_recommends(with_recommends);
    let resolution = resolver.resolve(&requested, &excluded)?;
    plan::write(&resolution, output)?;

    println!(
        "plan written: {} packages, {:.2} MB of source to download ({})",
        resolution.entries.len(),
        resolution.source_download_size as f64 / 1_048_576.0,
        output.display()
    );

    let conflicts = resolver.plan_conflicts(&resolution);
    if !conflicts.is_empty() {
        println!("{} coexistence conflicts in the selected set:", conflicts.len());
        for conflict in &conflicts {
            println!(
                "  {} declares '{}' against {}",
                conflict.package, conflict.declaration, conflict.conflicts_with
            );
        }
    }

    if !resolution.warnings.is_empty() {
        println!("{} unmapped sources:", resolution.warnings.len());
        for warning in &resolution.warnings {
            println!(
                "  {} -> {} (not in source index)",
                warning.package, warning.source_name
            );
        }
    }

    if check_build_deps {
        let unmet = resolver.unmet_build_deps(&resolution);
        if unmet.is_empty() {
            println!("all build dependencies covered by the resolved set");
        } else {
            println!("{} build dependencies outside the resolved set:", unmet.len());
            for (source, dep) in &unmet {
                println!("  {} needs {}", source, dep);
            }
        }
    }

    Ok(())
}
