use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::time::Duration;
use walkdir::WalkDir;

use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::git;
use crate::util::run_command_with_timeout;

const TSC_TIMEOUT: Duration = Duration::from_secs(10);
const SCANNED_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "py"];
const OK: &str = "✅";
const FAILED: &str = "❌";
const WARN: &str = "⚠️";

fn marker_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"TODO|FIXME|XXX|HACK").expect("valid regex"))
}

fn ts_error_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"error TS\d+").expect("valid regex"))
}

#[derive(Debug, Serialize, Deserialize)]
struct HealthFacts {
    health_status: Map<String, Value>,
    issues: Vec<String>,
}

/// Cheap project checks: type errors, repository state, lockfile, markers.
pub struct HealthCheckPlugin {
    root: PathBuf,
}

impl HealthCheckPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// `Some((passed, error_count))`, or `None` when tsc could not be run.
    fn typescript_check(&self) -> Option<(bool, usize)> {
        let mut command = Command::new("npx");
        command.args(["tsc", "--noEmit"]).current_dir(&self.root);
        match run_command_with_timeout(&mut command, TSC_TIMEOUT) {
            Ok(result) if result.timed_out => None,
            Ok(result) if result.success() => Some((true, 0)),
            Ok(result) => {
                let output = format!("{}{}", result.stdout, result.stderr);
                Some((false, ts_error_pattern().find_iter(&output).count()))
            }
            Err(err) => {
                tracing::debug!("tsc check skipped: {:#}", err);
                None
            }
        }
    }

    fn count_markers(&self) -> usize {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir() && (name == "node_modules" || name == ".git"))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                e.path()
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| SCANNED_EXTENSIONS.contains(&ext))
            })
            .filter_map(|e| fs::read_to_string(e.path()).ok())
            .map(|content| marker_pattern().find_iter(&content).count())
            .sum()
    }
}

impl ContextPlugin for HealthCheckPlugin {
    fn name(&self) -> &'static str {
        "HealthCheckPlugin"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let mut status = Map::new();
        let mut issues = Vec::new();

        if self.root.join("tsconfig.json").exists() {
            if let Some((passed, errors)) = self.typescript_check() {
                status.insert("TypeScript".into(), (if passed { OK } else { FAILED }).into());
                if !passed {
                    issues.push(format!("TypeScript: {} errors", errors));
                }
            }
        }

        if self.root.join(".git").exists() {
            let healthy = git::open(&self.root)
                .and_then(|repo| git::changed_path_count(&repo))
                .is_ok();
            status.insert("Git".into(), (if healthy { OK } else { FAILED }).into());
        }

        if self.root.join("package.json").exists() {
            let locked = ["pnpm-lock.yaml", "yarn.lock", "package-lock.json"]
                .iter()
                .any(|lockfile| self.root.join(lockfile).exists());
            status.insert("Dependencies".into(), (if locked { OK } else { WARN }).into());
            if !locked {
                issues.push("No lockfile found".to_string());
            }
        }

        let markers = self.count_markers();
        if markers > 0 {
            issues.push(format!("{} TODO/FIXME comments", markers));
        }

        to_record(&HealthFacts {
            health_status: status,
            issues,
        })
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: HealthFacts = from_record(data)?;
        let mut lines = vec!["## 🏥 Project Health\n".to_string()];

        if !facts.health_status.is_empty() {
            lines.push("### Status Checks".to_string());
            for (check, status) in &facts.health_status {
                lines.push(format!("- **{}**: {}", check, status.as_str().unwrap_or("?")));
            }
            lines.push(String::new());
        }
        if !facts.issues.is_empty() {
            lines.push("### ⚠️ Issues".to_string());
            for issue in &facts.issues {
                lines.push(format!("- {}", issue));
            }
        }

        Ok(Some(SectionData::new(
            "health",
            "Project Health",
            lines.join("\n"),
            50,
        )))
    }
}
