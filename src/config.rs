//! Configuration for the edit hooks
//!
//! Stored in `<project>/.claude/hookwright.json`. Every field has a default,
//! so a missing file (or a partial one) is fine.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "hookwright.json";

/// Maps edits under a path fragment to the workspace the tools must run in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceRoute {
    /// Substring of the absolute edit path, e.g. `/apps/web/`
    pub fragment: String,
    /// Workspace directory relative to the project root
    pub dir: String,
    /// Short label used in reports
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Package runner used to invoke project-local tools
    pub package_runner: String,
    pub workspaces: Vec<WorkspaceRoute>,
    /// Path prefixes an edit may touch (monorepo guard)
    pub allowed_prefixes: Vec<String>,
    /// Drizzle-style schema file watched by the migration checker
    pub schema_file: String,
    pub migrations_dir: String,
    /// `pnpm --filter` target for database scripts
    pub db_package: String,
    /// Hostnames accepted for media assets
    pub media_hosts: Vec<String>,
    /// tsconfig files checked for `"strict": true`
    pub tsconfig_paths: Vec<String>,
    /// Environment variables reported by the infrastructure section
    pub watched_env_vars: Vec<String>,
    /// Append-only timing log written by the fast lint hook
    pub perf_log: Option<PathBuf>,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            package_runner: "pnpm".to_string(),
            workspaces: Vec::new(),
            allowed_prefixes: [
                "apps/",
                "packages/",
                "turbo.json",
                "package.json",
                "pnpm-workspace.yaml",
                ".gitignore",
                "README.md",
                "CONTRIBUTING.md",
                "CLAUDE.md",
                ".env.example",
                "tsconfig.json",
                ".eslintrc.js",
                ".prettierrc",
                ".claude/",
                ".husky/",
                ".github/",
                ".npmrc",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            schema_file: "packages/db/src/schema.ts".to_string(),
            migrations_dir: "packages/db/drizzle".to_string(),
            db_package: "@app/db".to_string(),
            media_hosts: vec![
                "cloudinary.com".to_string(),
                "res.cloudinary.com".to_string(),
            ],
            tsconfig_paths: vec!["tsconfig.json".to_string()],
            watched_env_vars: vec![
                "DATABASE_URL".to_string(),
                "TURSO_DATABASE_URL".to_string(),
                "CLOUDINARY_CLOUD_NAME".to_string(),
            ],
            perf_log: None,
        }
    }
}

impl HooksConfig {
    pub fn config_path(project_root: &Path) -> PathBuf {
        project_root.join(".claude").join(CONFIG_FILE)
    }

    /// Load config from disk, or return default
    pub fn load(project_root: &Path) -> Self {
        let path = Self::config_path(project_root);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str(&content) {
                Ok(config) => return config,
                Err(err) => {
                    preserve_corrupt_config(&path, &content);
                    tracing::warn!(
                        "config file {} was corrupted ({}); a backup was saved and defaults were loaded",
                        path.display(),
                        err
                    );
                }
            }
        }
        Self::default()
    }

    /// Pick the workspace an edit belongs to: `(work_dir, label)`.
    pub fn route(&self, project_root: &Path, file_path: &str) -> (PathBuf, String) {
        self.workspaces
            .iter()
            .find(|route| file_path.contains(&route.fragment))
            .map(|route| (project_root.join(&route.dir), route.label.clone()))
            .unwrap_or_else(|| (project_root.to_path_buf(), "root".to_string()))
    }

    pub fn perf_log_path(&self) -> PathBuf {
        self.perf_log
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("claude_hook_performance.log"))
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

/// Resolve the project root: explicit flag, then `CLAUDE_PROJECT_DIR`, then cwd.
pub fn resolve_project_root(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if let Ok(dir) = std::env::var("CLAUDE_PROJECT_DIR") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    Ok(std::env::current_dir()?)
}
