// src/plan.rs

//! Plan serialization and request-list loading
//!
//! Pure formatting; resolution order and content are fixed before this
//! module runs. Output is tab-separated
//! `name<TAB>version<TAB>source<TAB>sourceVersion` sorted by name, UTF-8,
//! with exactly one trailing newline. The output file is replaced
//! atomically so a failed run never truncates a prior plan.

use crate::error::{Error, Result};
use crate::resolver::ResolutionPlan;
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Render the plan as the output file's exact bytes
pub fn render(plan: &ResolutionPlan) -> String {
    let mut out = String::new();
    for entry in &plan.entries {
        let source_version = entry
            .source_version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\n",
            entry.name, entry.version, entry.source_name, source_version
        ));
    }
    out
}

/// Write the plan to `path`, replacing any previous output atomically
pub fn write(plan: &ResolutionPlan, path: &Path) -> Result<()> {
    let rendered = render(plan);

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        fs::create_dir_all(dir)?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir.unwrap_or(Path::new(".")))
        .map_err(|e| Error::OutputWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    tmp.write_all(rendered.as_bytes())
        .map_err(|e| Error::OutputWrite {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    tmp.persist(path).map_err(|e| Error::OutputWrite {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    info!("wrote plan with {} entries to {}", plan.entries.len(), path.display());
    Ok(())
}

/// Load a newline-delimited name list
///
/// Blank lines and `#` comments are ignored; duplicates collapse while
/// first-seen order is kept.
pub fn load_name_list(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_name_list(&text))
}

pub fn parse_name_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if seen.insert(line.to_string()) {
            names.push(line.to_string());
        }
    }
    debug!("loaded {} names", names.len());
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PlanEntry;
    use crate::version::Version;
    use tempfile::TempDir;

    fn sample_plan() -> ResolutionPlan {
        ResolutionPlan {
            entries: vec![
                PlanEntry {
                    name: "alpha".to_string(),
                    version: Version::parse("1.0-1").unwrap(),
                    source_name: "alpha-src".to_string(),
                    source_version: Some(Version::parse("1.0").unwrap()),
                },
                PlanEntry {
                    name: "beta".to_string(),
                    version: Version::parse("2:0.5").unwrap(),
                    source_name: "beta".to_string(),
                    source_version: None,
                },
            ],
            warnings: Vec::new(),
            source_download_size: 0,
        }
    }

    #[test]
    fn test_render_format() {
        let rendered = render(&sample_plan());
        assert_eq!(
            rendered,
            "alpha\t1.0-1\talpha-src\t1.0\nbeta\t2:0.5\tbeta\t\n"
        );
        assert!(rendered.ends_with('\n'));
        assert!(!rendered.ends_with("\n\n"));
    }

    #[test]
    fn test_write_replaces_previous_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("plan.tsv");
        fs::write(&out, "stale content\n").unwrap();

        write(&sample_plan(), &out).unwrap();
        let bytes = fs::read_to_string(&out).unwrap();
        assert_eq!(bytes, render(&sample_plan()));
    }

    #[test]
    fn test_empty_plan_renders_empty() {
        let plan = ResolutionPlan {
            entries: Vec::new(),
            warnings: Vec::new(),
            source_download_size: 0,
        };
        assert_eq!(render(&plan), "");
    }

    #[test]
    fn test_name_list_parsing() {
        let text = "\
# build set
coreutils

bash
coreutils
  gawk
";
        assert_eq!(parse_name_list(text), vec!["coreutils", "bash", "gawk"]);
    }
}
