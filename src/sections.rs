//! Named-section updater for CLAUDE.md
//!
//! Each `<!-- START_SECTION:name -->` / `<!-- END_SECTION:name -->` pair gets
//! its body regenerated. Sections the document does not declare are left
//! alone; a generator failure leaves an error comment in its section.

use anyhow::Context;
use chrono::{DateTime, Local};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::HooksConfig;
use crate::git;
use crate::util::truncate;

pub const AUTO_COMMENT: &str = "<!-- AUTO-GENERATED CONTENT - DO NOT EDIT BY HAND -->";
const COMMAND_COLUMN: usize = 42;

type Generator = fn(&SectionUpdater, DateTime<Local>) -> anyhow::Result<String>;

const GENERATORS: &[(&str, Generator)] = &[
    ("infrastructure", SectionUpdater::infrastructure),
    ("essential_commands", SectionUpdater::essential_commands),
    ("timeline", SectionUpdater::timeline),
];

/// Replace the body of section `name`. Returns `None` when the document has
/// no such section.
pub fn update_section(content: &str, name: &str, body: &str) -> Option<String> {
    let start_marker = format!("<!-- START_SECTION:{} -->", name);
    let end_marker = format!("<!-- END_SECTION:{} -->", name);

    let body_start = content.find(&start_marker)? + start_marker.len();
    let body_end = body_start + content[body_start..].find(&end_marker)?;

    Some(format!(
        "{}\n{}\n{}\n{}",
        &content[..body_start],
        AUTO_COMMENT,
        body.trim(),
        &content[body_end..]
    ))
}

/// `KEY=VALUE` pairs of an env file; comments and blank lines skipped, quotes
/// around values removed.
pub fn parse_env_file(path: &Path) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    let Ok(content) = fs::read_to_string(path) else {
        return vars;
    };
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }
    vars
}

pub struct SectionUpdater {
    project_root: PathBuf,
    document_path: PathBuf,
    backup_dir: PathBuf,
    config: HooksConfig,
}

impl SectionUpdater {
    pub fn new(project_root: &Path, config: HooksConfig) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            document_path: project_root.join("CLAUDE.md"),
            backup_dir: project_root.join(".claude").join("backups"),
            config,
        }
    }

    pub fn log_path(project_root: &Path) -> PathBuf {
        project_root.join(".claude").join("context_updater.log")
    }

    /// Regenerate every section. Returns whether the document was rewritten.
    pub fn run_update(&self, now: DateTime<Local>) -> anyhow::Result<bool> {
        let current = match fs::read_to_string(&self.document_path) {
            Ok(text) => text,
            Err(_) => {
                tracing::error!("CLAUDE.md not found: {}", self.document_path.display());
                return Ok(false);
            }
        };

        let mut updated = current.clone();
        for (name, generate) in GENERATORS {
            let body = match generate(self, now) {
                Ok(body) => body,
                Err(err) => {
                    tracing::error!("Section '{}' failed: {:#}", name, err);
                    format!(
                        "<!-- Generation error: {} -->\n<!-- Check the section generator -->",
                        err
                    )
                }
            };
            match update_section(&updated, name, &body) {
                Some(next) => {
                    tracing::info!("Section '{}' updated", name);
                    updated = next;
                }
                None => tracing::warn!("Section '{}' not found in CLAUDE.md", name),
            }
        }

        if updated == current {
            tracing::info!("CLAUDE.md already up to date");
            return Ok(false);
        }

        if let Some(backup) = self.create_backup(now) {
            tracing::info!("Backup available: {}", backup.display());
        }
        fs::write(&self.document_path, updated)
            .with_context(|| format!("Failed to write {}", self.document_path.display()))?;
        tracing::info!("CLAUDE.md updated");
        Ok(true)
    }

    fn create_backup(&self, now: DateTime<Local>) -> Option<PathBuf> {
        let backup = self
            .backup_dir
            .join(format!("CLAUDE.md.backup.{}", now.format("%Y%m%d_%H%M%S")));
        let result = fs::create_dir_all(&self.backup_dir)
            .and_then(|_| fs::copy(&self.document_path, &backup));
        match result {
            Ok(_) => Some(backup),
            Err(err) => {
                tracing::error!("Backup failed: {}", err);
                None
            }
        }
    }

    fn env_dirs(&self) -> Vec<PathBuf> {
        let mut dirs = vec![self.project_root.clone()];
        for route in &self.config.workspaces {
            let dir = self.project_root.join(&route.dir);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn infrastructure(&self, _now: DateTime<Local>) -> anyhow::Result<String> {
        let mut defined = BTreeMap::new();
        for dir in self.env_dirs() {
            for name in [".env", ".env.local"] {
                defined.extend(parse_env_file(&dir.join(name)));
            }
        }

        let present: Vec<String> = self
            .config
            .watched_env_vars
            .iter()
            .filter(|var| defined.get(*var).is_some_and(|value| !value.is_empty()))
            .map(|var| format!("✅ {}", var))
            .collect();

        let mut lines = Vec::new();
        if present.is_empty() {
            lines.push("- **Env Vars**: ❌ Not configured".to_string());
        } else {
            lines.push(format!("- **Env Vars**: {}", present.join(", ")));
        }

        match git::open(&self.project_root).and_then(|repo| git::changed_path_count(&repo)) {
            Ok(count) => lines.push(format!("- **Git**: ✅ {} modified file(s)", count)),
            Err(_) => lines.push("- **Git**: ❌ Not accessible".to_string()),
        }
        Ok(lines.join("\n"))
    }

    fn essential_commands(&self, _now: DateTime<Local>) -> anyhow::Result<String> {
        let path = self.project_root.join("package.json");
        let Ok(content) = fs::read_to_string(&path) else {
            return Ok("_No package.json scripts found_".to_string());
        };
        let pkg: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        let Some(scripts) = pkg.get("scripts").and_then(Value::as_object) else {
            return Ok("_No package.json scripts found_".to_string());
        };

        let mut lines = vec!["```bash".to_string()];
        for (name, cmd) in scripts {
            let invocation = format!("{} {}", self.config.package_runner, name);
            let cmd = cmd.as_str().unwrap_or_default();
            lines.push(format!(
                "{:<width$}# {}",
                invocation,
                truncate(cmd, 40),
                width = COMMAND_COLUMN
            ));
        }
        lines.push("```".to_string());
        Ok(lines.join("\n"))
    }

    fn timeline(&self, now: DateTime<Local>) -> anyhow::Result<String> {
        let mut lines = vec!["### 🎯 Timeline".to_string(), String::new()];
        let commits = git::open(&self.project_root)
            .and_then(|repo| git::recent_commits(&repo, 5))
            .unwrap_or_default();
        if commits.is_empty() {
            lines.push("_No git history_".to_string());
        } else {
            lines.push("**Recent commits**:".to_string());
            lines.extend(commits.iter().map(|commit| format!("- {}", commit)));
        }
        lines.push(String::new());
        lines.push(format!("**Last update**: {}", now.format("%Y-%m-%d %H:%M")));
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 9, 17, 10, 30, 0).unwrap()
    }

    #[test]
    fn replaces_only_the_named_section() {
        let doc = "intro\n<!-- START_SECTION:a -->\nold\n<!-- END_SECTION:a -->\n<!-- START_SECTION:b -->keep<!-- END_SECTION:b -->\n";
        let out = update_section(doc, "a", "  new  \n").unwrap();
        assert_eq!(
            out,
            format!("intro\n<!-- START_SECTION:a -->\n{AUTO_COMMENT}\nnew\n<!-- END_SECTION:a -->\n<!-- START_SECTION:b -->keep<!-- END_SECTION:b -->\n")
        );
        assert!(update_section(doc, "missing", "x").is_none());
    }

    #[test]
    fn parses_env_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "# comment\n\nA=1\nB = \"two\"\nC='3'\nnot a pair\n").unwrap();
        let vars = parse_env_file(&path);
        assert_eq!(vars.len(), 3);
        assert_eq!(vars["B"], "two");
        assert_eq!(vars["C"], "3");
    }

    #[test]
    fn missing_document_is_not_updated() {
        let dir = tempfile::tempdir().unwrap();
        let updater = SectionUpdater::new(dir.path(), HooksConfig::default());
        assert!(!updater.run_update(fixed_now()).unwrap());
    }

    #[test]
    fn updates_declared_sections_and_backs_up() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join(".env"), "DATABASE_URL=libsql://x\nTURSO_DATABASE_URL=\n").unwrap();
        fs::write(
            root.join("package.json"),
            r#"{"scripts": {"dev": "next dev", "lint": "eslint ."}}"#,
        )
        .unwrap();
        fs::write(
            root.join("CLAUDE.md"),
            "# Project\n<!-- START_SECTION:infrastructure -->\n<!-- END_SECTION:infrastructure -->\n<!-- START_SECTION:essential_commands -->\n<!-- END_SECTION:essential_commands -->\n",
        )
        .unwrap();

        let updater = SectionUpdater::new(root, HooksConfig::default());
        assert!(updater.run_update(fixed_now()).unwrap());

        let doc = fs::read_to_string(root.join("CLAUDE.md")).unwrap();
        assert!(doc.contains("- **Env Vars**: ✅ DATABASE_URL\n- **Git**: ❌ Not accessible"));
        assert!(doc.contains("pnpm dev"));
        assert!(doc.contains("# eslint ."));
        assert!(!doc.contains("Timeline"));
        assert!(root
            .join(".claude/backups/CLAUDE.md.backup.20250917_103000")
            .exists());

        assert!(!updater.run_update(fixed_now()).unwrap());
    }

    #[test]
    fn generator_failure_leaves_error_comment() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("package.json"), "{ broken").unwrap();
        fs::write(
            root.join("CLAUDE.md"),
            "<!-- START_SECTION:essential_commands -->\n<!-- END_SECTION:essential_commands -->",
        )
        .unwrap();

        let updater = SectionUpdater::new(root, HooksConfig::default());
        assert!(updater.run_update(fixed_now()).unwrap());
        let doc = fs::read_to_string(root.join("CLAUDE.md")).unwrap();
        assert!(doc.contains("<!-- Generation error: Failed to parse"));
    }
}
