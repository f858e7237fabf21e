//! SessionStart dashboard: project layout, tool health, config files, recent
//! commits and hook registration.

use chrono::{DateTime, Local};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

use super::{run_tool, HookContext};
use crate::context::plugins::read_package_json;
use crate::git;
use crate::hook::HookOutcome;
use crate::util::BUILD_DIRS;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const BUILD_PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const ESLINT_CONFIGS: &[&str] = &[
    "eslint.config.js",
    "eslint.config.mjs",
    ".eslintrc.js",
    ".eslintrc.json",
];
const RULE: &str = "=======================================================";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overview {
    pub name: String,
    pub apps: Vec<String>,
    pub packages: Vec<String>,
    pub total_files: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Health {
    pub runner: bool,
    pub typescript: bool,
    pub git: bool,
    pub build: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigFiles {
    pub typescript: bool,
    pub prettier: bool,
    pub eslint: bool,
    pub env_example: bool,
    pub env_local: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub overview: Overview,
    pub health: Health,
    pub config: ConfigFiles,
    pub commits: Vec<String>,
    /// Hook commands registered in `.claude/settings.json`, if it exists.
    pub registered_hooks: Option<usize>,
}

fn subdirectories(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_dir()))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    names.sort();
    names
}

pub fn overview(root: &Path) -> Overview {
    let name = read_package_json(root)
        .and_then(|pkg| pkg.get("name").and_then(Value::as_str).map(str::to_string))
        .or_else(|| root.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "project".to_string());

    let total_files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            !(e.depth() > 0
                && e.file_type().is_dir()
                && e.file_name().to_str().is_some_and(|n| BUILD_DIRS.contains(&n)))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count();

    Overview {
        name,
        apps: subdirectories(&root.join("apps")),
        packages: subdirectories(&root.join("packages")),
        total_files,
    }
}

pub fn config_files(ctx: &HookContext) -> ConfigFiles {
    let root = &ctx.project_root;
    let mut eslint_dirs = vec![root.clone()];
    eslint_dirs.extend(ctx.config.workspaces.iter().map(|route| root.join(&route.dir)));

    ConfigFiles {
        typescript: root.join("tsconfig.json").exists(),
        prettier: root.join(".prettierrc").exists(),
        eslint: eslint_dirs
            .iter()
            .any(|dir| ESLINT_CONFIGS.iter().any(|name| dir.join(name).exists())),
        env_example: root.join(".env.example").exists(),
        env_local: root.join(".env.local").exists(),
    }
}

fn health(ctx: &HookContext) -> Health {
    let root = &ctx.project_root;
    let ok = |args: &[&str], timeout| {
        run_tool(ctx, root, args, timeout)
            .map(|result| result.success())
            .unwrap_or(false)
    };
    Health {
        runner: ok(&["--version"], PROBE_TIMEOUT),
        typescript: ok(&["tsc", "--version"], PROBE_TIMEOUT),
        git: git::open(root).is_ok(),
        build: root.join("package.json").exists() && ok(&["build", "--dry-run"], BUILD_PROBE_TIMEOUT),
    }
}

/// Count of hook commands under `hooks.<event>[].hooks[]` in settings.json.
pub fn registered_hooks(settings: &Value) -> usize {
    settings
        .get("hooks")
        .and_then(Value::as_object)
        .map(|events| {
            events
                .values()
                .filter_map(Value::as_array)
                .flatten()
                .filter_map(|matcher| matcher.get("hooks").and_then(Value::as_array))
                .map(Vec::len)
                .sum::<usize>()
        })
        .unwrap_or(0)
}

pub fn gather(ctx: &HookContext) -> Dashboard {
    let root = &ctx.project_root;
    let commits = git::open(root)
        .and_then(|repo| git::recent_commits(&repo, 5))
        .unwrap_or_default();
    let registered_hooks = fs::read_to_string(root.join(".claude").join("settings.json"))
        .ok()
        .and_then(|content| serde_json::from_str::<Value>(&content).ok())
        .map(|settings| registered_hooks(&settings));

    Dashboard {
        overview: overview(root),
        health: health(ctx),
        config: config_files(ctx),
        commits,
        registered_hooks,
    }
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "✅"
    } else {
        "❌"
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "None".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render(dashboard: &Dashboard, runner: &str, now: DateTime<Local>) -> String {
    let Dashboard {
        overview,
        health,
        config,
        commits,
        registered_hooks,
    } = dashboard;
    let kind = if overview.apps.is_empty() && overview.packages.is_empty() {
        "Single package"
    } else {
        "Monorepo"
    };

    let mut lines = vec![
        format!("🚀 {} - Development Session Started", overview.name),
        RULE.to_string(),
        format!("📅 Session started: {}", now.format("%Y-%m-%d %H:%M:%S")),
        "\n📁 Project Overview:".to_string(),
        format!("   • Type: {}", kind),
        format!("   • Apps: {}", list_or_none(&overview.apps)),
        format!("   • Packages: {}", list_or_none(&overview.packages)),
        format!("   • Total files: ~{}", overview.total_files),
        "\n🏥 Project Health:".to_string(),
        format!("   • Dependencies ({}): {}", runner, mark(health.runner)),
        format!("   • TypeScript: {}", mark(health.typescript)),
        format!("   • Git repository: {}", mark(health.git)),
        format!("   • Build system: {}", mark(health.build)),
        "\n⚙️ Configuration Status:".to_string(),
        format!("   • TypeScript config: {}", mark(config.typescript)),
        format!("   • Prettier config: {}", mark(config.prettier)),
        format!("   • ESLint config: {}", mark(config.eslint)),
        format!("   • .env.example: {}", mark(config.env_example)),
        format!("   • .env.local: {}", mark(config.env_local)),
    ];

    if !commits.is_empty() {
        lines.push("\n📊 Recent Activity:".to_string());
        lines.extend(commits.iter().take(3).map(|c| format!("   • {}", c)));
    }

    lines.push("\n💡 Development Tips:".to_string());
    lines.push(format!("   • Use '{} dev' to start development server", runner));
    lines.push(format!("   • Use '{} build' to build all apps", runner));
    lines.push(format!("   • Use '{} lint' to check code quality", runner));
    lines.push("   • Hooks are active for auto-formatting and validation".to_string());

    lines.push("\n🔧 Quick Commands:".to_string());
    lines.push(format!("   • Install dependencies: {} install", runner));
    lines.push(format!("   • Start development: {} dev", runner));
    lines.push(format!("   • Run tests: {} test", runner));
    lines.push(format!("   • Build project: {} build", runner));
    lines.push(format!("   • Format code: {} format", runner));

    let mut issues = Vec::new();
    if !health.runner {
        issues.push(format!("{} not available", runner));
    }
    if !health.typescript {
        issues.push("TypeScript not configured".to_string());
    }
    if !config.env_local {
        issues.push(".env.local missing".to_string());
    }
    if !issues.is_empty() {
        lines.push("\n⚠️  Issues to address:".to_string());
        lines.extend(issues.iter().map(|issue| format!("   • {}", issue)));
        lines.push("   🔗 Check setup documentation for resolution steps".to_string());
    }

    lines.push(format!("\n{}", RULE));
    lines.push("🎯 Ready for development! Happy coding! 🎉".to_string());

    match registered_hooks {
        Some(count) => {
            lines.push("\n🪝 Hooks Active:".to_string());
            lines.push(format!("   • {} hook commands registered", count));
        }
        None => lines.push("\n⚠️ Hooks not configured".to_string()),
    }
    lines.join("\n")
}

pub fn run(ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let dashboard = gather(ctx);
    Ok(HookOutcome::allow(render(
        &dashboard,
        &ctx.config.package_runner,
        Local::now(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;
    use chrono::TimeZone;

    #[test]
    fn overview_lists_workspaces_and_skips_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for sub in ["apps/web", "apps/admin", "packages/ui", "node_modules/x"] {
            fs::create_dir_all(root.join(sub)).unwrap();
        }
        fs::write(root.join("package.json"), r#"{"name": "acme"}"#).unwrap();
        fs::write(root.join("apps/web/a.ts"), "").unwrap();
        fs::write(root.join("node_modules/x/b.js"), "").unwrap();

        let o = overview(root);
        assert_eq!(o.name, "acme");
        assert_eq!(o.apps, vec!["admin".to_string(), "web".to_string()]);
        assert_eq!(o.packages, vec!["ui".to_string()]);
        assert_eq!(o.total_files, 2);
    }

    #[test]
    fn counts_registered_hook_commands() {
        let settings = serde_json::json!({
            "hooks": {
                "PreToolUse": [{"matcher": "Edit", "hooks": [{"type": "command", "command": "hookwright protect"}]}],
                "PostToolUse": [{"matcher": "Edit|Write", "hooks": [
                    {"type": "command", "command": "hookwright format"},
                    {"type": "command", "command": "hookwright lint"}
                ]}]
            }
        });
        assert_eq!(registered_hooks(&settings), 3);
        assert_eq!(registered_hooks(&serde_json::json!({})), 0);
    }

    #[test]
    fn detects_eslint_config_in_workspaces() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("apps/web")).unwrap();
        fs::write(root.join("apps/web/eslint.config.mjs"), "").unwrap();
        let mut config = HooksConfig::default();
        config.workspaces.push(crate::config::WorkspaceRoute {
            fragment: "/apps/web/".to_string(),
            dir: "apps/web".to_string(),
            label: "web".to_string(),
        });
        let files = config_files(&HookContext::new(root, config));
        assert!(files.eslint);
        assert!(!files.env_local);
    }

    #[test]
    fn renders_issues_and_hook_status() {
        let dashboard = Dashboard {
            overview: Overview {
                name: "acme".to_string(),
                apps: vec!["web".to_string()],
                packages: Vec::new(),
                total_files: 12,
            },
            commits: vec!["abc1234 first".to_string()],
            ..Dashboard::default()
        };
        let now = Local.with_ymd_and_hms(2025, 9, 17, 10, 30, 0).unwrap();
        let text = render(&dashboard, "pnpm", now);

        assert!(text.starts_with("🚀 acme - Development Session Started\n"));
        assert!(text.contains("📅 Session started: 2025-09-17 10:30:00"));
        assert!(text.contains("   • Type: Monorepo\n   • Apps: web\n   • Packages: None"));
        assert!(text.contains("   • abc1234 first"));
        assert!(text.contains("   • pnpm not available\n   • TypeScript not configured\n   • .env.local missing"));
        assert!(text.ends_with("⚠️ Hooks not configured"));
    }
}
