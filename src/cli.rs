// src/cli.rs
//! CLI definitions for the debforge planner
//!
//! All command-line surface lives here; the command implementations are in
//! `main.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "debforge")]
#[command(version)]
#[command(about = "Repository index cache and deterministic dependency planner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the release manifest and bring the index cache up to date
    Sync {
        /// Mirror base URL, e.g. http://deb.debian.org/debian
        #[arg(long)]
        mirror: String,

        /// Distribution under dists/, e.g. trixie
        #[arg(long)]
        dist: String,

        /// Repository component
        #[arg(long, default_value = "main")]
        component: String,

        /// Binary architecture
        #[arg(long, default_value = "amd64")]
        arch: String,

        /// Cache directory for verified index files
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },

    /// Resolve a requested-package list into a build plan
    Resolve {
        /// Decompressed binary Packages index
        #[arg(long)]
        packages: PathBuf,

        /// Decompressed Sources index
        #[arg(long)]
        sources: Option<PathBuf>,

        /// Requested-package list, one name per line
        #[arg(long)]
        required: PathBuf,

        /// Exclusion list, same format
        #[arg(long)]
        skip: Option<PathBuf>,

        /// Output plan path
        #[arg(short, long)]
        output: PathBuf,

        /// Binary architecture
        #[arg(long, default_value = "amd64")]
        arch: String,

        /// Also pull in satisfiable Recommends of selected packages
        #[arg(long)]
        with_recommends: bool,

        /// Report build dependencies of selected sources not covered by
        /// the resolved binary set
        #[arg(long)]
        check_build_deps: bool,
    },
}
