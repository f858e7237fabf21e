//! PostToolUse fast lint
//!
//! ESLint, Prettier and tsc run side by side on a three-worker pool. A file
//! whose content already passed is remembered by an empty marker file named
//! after its content hash, so re-saving unchanged content is free.

use anyhow::Context;
use chrono::Local;
use rayon::prelude::*;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use super::{absolute_path, has_extension, run_tool, HookContext};
use crate::hook::{HookInput, HookOutcome};
use crate::util::{hash_bytes, in_build_dir};

const RELEVANT: &[&str] = &["ts", "tsx", "js", "jsx", "vue"];
const CACHE_DIR: &str = ".claude-cache";
const MARKER_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const CHECK_TIMEOUT: Duration = Duration::from_secs(15);
const WORKERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LintTool {
    Eslint,
    Prettier,
    Typescript,
}

impl LintTool {
    pub const ALL: [LintTool; 3] = [LintTool::Eslint, LintTool::Prettier, LintTool::Typescript];

    fn label(self) -> &'static str {
        match self {
            LintTool::Eslint => "Eslint",
            LintTool::Prettier => "Prettier",
            LintTool::Typescript => "Typescript",
        }
    }

    /// ESLint failures are reported but never fail the run.
    fn blocks_marker(self) -> bool {
        !matches!(self, LintTool::Eslint)
    }
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub tool: LintTool,
    pub success: bool,
    pub output: String,
    pub duration: Duration,
}

pub fn is_relevant(path: &str) -> bool {
    has_extension(path, RELEVANT) && !in_build_dir(path)
}

/// Content-hash markers in `<work_dir>/.claude-cache`.
#[derive(Debug, Clone)]
pub struct MarkerCache {
    dir: PathBuf,
}

impl MarkerCache {
    pub fn new(work_dir: &Path) -> Self {
        Self {
            dir: work_dir.join(CACHE_DIR),
        }
    }

    fn marker(&self, file_name: &str, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}.cache", file_name, hash))
    }

    pub fn is_fresh(&self, file_name: &str, hash: &str) -> bool {
        self.marker(file_name, hash).exists()
    }

    /// Record a passing hash and drop markers for older content of the file.
    pub fn mark(&self, file_name: &str, hash: &str) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let marker = self.marker(file_name, hash);
        fs::write(&marker, b"")?;

        let prefix = format!("{}.", file_name);
        for entry in fs::read_dir(&self.dir)?.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path != marker && name.starts_with(&prefix) && name.ends_with(".cache") {
                let _ = fs::remove_file(&path);
            }
        }
        Ok(())
    }

    /// Delete markers last touched before `now - max_age`. Returns how many.
    pub fn clean_older_than(&self, max_age: Duration, now: SystemTime) -> usize {
        let Some(cutoff) = now.checked_sub(max_age) else {
            return 0;
        };
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "cache"))
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|meta| meta.modified())
                    .is_ok_and(|modified| modified < cutoff)
            })
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }
}

fn append_perf_log(ctx: &HookContext, operation: &str, duration: Duration, file_path: &str) {
    let line = format!(
        "{} | {:<15} | {:>6.3}s | {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        operation,
        duration.as_secs_f64(),
        file_path
    );
    let path = ctx.config.perf_log_path();
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .and_then(|mut file| file.write_all(line.as_bytes()));
    if let Err(err) = result {
        tracing::debug!("perf log {} not writable: {}", path.display(), err);
    }
}

fn run_check(ctx: &HookContext, tool: LintTool, file_path: &str, work_dir: &Path) -> CheckResult {
    let start = Instant::now();
    let (success, output) = match tool {
        LintTool::Eslint => {
            let args = ["exec", "eslint", "--fix", "--cache", file_path];
            match run_tool(ctx, work_dir, &args, CHECK_TIMEOUT) {
                Ok(result) if matches!(result.exit_code(), Some(0 | 1)) => {
                    (true, result.stdout.trim().to_string())
                }
                Ok(result) if !result.timed_out => (false, result.stdout.trim().to_string()),
                _ => (false, "Command failed".to_string()),
            }
        }
        LintTool::Prettier => {
            let args = ["exec", "prettier", "--write", "--cache", file_path];
            match run_tool(ctx, work_dir, &args, CHECK_TIMEOUT) {
                Ok(result) if result.success() => (true, "Formatted".to_string()),
                Ok(result) if !result.timed_out => (false, result.stderr.trim().to_string()),
                _ => (false, "Command failed".to_string()),
            }
        }
        LintTool::Typescript => {
            if !has_extension(file_path, &["ts", "tsx"]) {
                return CheckResult {
                    tool,
                    success: true,
                    output: "Skipped (not TypeScript)".to_string(),
                    duration: start.elapsed(),
                };
            }
            let args = ["exec", "tsc", "--noEmit", "--skipLibCheck", "--pretty"];
            match run_tool(ctx, work_dir, &args, CHECK_TIMEOUT) {
                Ok(result) if result.success() => (true, "No type errors".to_string()),
                Ok(result) if !result.timed_out => {
                    let relevant: Vec<&str> = result
                        .stdout
                        .lines()
                        .filter(|line| line.contains(file_path) || line.contains("error TS"))
                        .take(3)
                        .collect();
                    if relevant.is_empty() {
                        (false, "Type errors found".to_string())
                    } else {
                        (false, relevant.join("\n"))
                    }
                }
                _ => (false, "Command failed".to_string()),
            }
        }
    };

    let duration = start.elapsed();
    append_perf_log(ctx, &format!("{}_check", tool.label().to_lowercase()), duration, file_path);
    CheckResult {
        tool,
        success,
        output,
        duration,
    }
}

/// Run every check concurrently; results come back in [`LintTool::ALL`] order.
fn run_checks(ctx: &HookContext, file_path: &str, work_dir: &Path) -> anyhow::Result<Vec<CheckResult>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(WORKERS)
        .build()
        .context("Failed to build lint worker pool")?;
    Ok(pool.install(|| {
        LintTool::ALL
            .par_iter()
            .map(|tool| run_check(ctx, *tool, file_path, work_dir))
            .collect::<Vec<_>>()
    }))
}

/// Marker directories for the root and every configured workspace.
fn marker_caches(ctx: &HookContext) -> Vec<MarkerCache> {
    let mut dirs = vec![ctx.project_root.clone()];
    for route in &ctx.config.workspaces {
        let dir = ctx.project_root.join(&route.dir);
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs.iter().map(|dir| MarkerCache::new(dir)).collect()
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let overall = Instant::now();

    let now = SystemTime::now();
    for cache in marker_caches(ctx) {
        cache.clean_older_than(MARKER_MAX_AGE, now);
    }

    if !is_relevant(file_path) {
        return Ok(HookOutcome::silent());
    }
    let absolute = absolute_path(ctx, file_path);
    let Ok(bytes) = fs::read(&absolute) else {
        return Ok(HookOutcome::allow(format!("⚠️ File not found: {}", file_path)));
    };

    let (work_dir, label) = ctx.config.route(&ctx.project_root, file_path);
    let cache = MarkerCache::new(&work_dir);
    let hash = hash_bytes(&bytes);
    let file_name = absolute
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    if cache.is_fresh(&file_name, &hash) {
        return Ok(HookOutcome::allow(format!(
            "🚀 🚀 CACHED: {} (skipped)",
            file_path
        )));
    }

    let mut lines = vec![format!("ℹ️ 🔍 Fast Linting: {} ({})", file_path, label)];
    let probe = run_tool(ctx, &work_dir, &["--version"], PROBE_TIMEOUT);
    if !probe.map(|result| result.success()).unwrap_or(false) {
        lines.push(format!(
            "⚠️ {} not available - skipping linting",
            ctx.config.package_runner
        ));
        return Ok(HookOutcome::allow(lines.join("\n")));
    }

    let started = Instant::now();
    let results = run_checks(ctx, file_path, &work_dir)?;

    let mut passed = true;
    for result in &results {
        if result.success {
            lines.push(format!("✅ {}: ✅ {}", result.tool.label(), result.output));
        } else {
            lines.push(format!("⚠️ {}: ⚠️ {}", result.tool.label(), result.output));
            if result.tool.blocks_marker() {
                passed = false;
            }
        }
    }

    let lint_duration = started.elapsed();
    append_perf_log(ctx, "total_lint", lint_duration, file_path);
    if passed {
        if let Err(err) = cache.mark(&file_name, &hash) {
            tracing::debug!("lint marker not written: {:#}", err);
        }
    }
    lines.push(format!(
        "🚀 🎯 Completed in {:.2}s",
        lint_duration.as_secs_f64()
    ));

    let total = overall.elapsed();
    append_perf_log(ctx, "hook_total", total, file_path);
    if passed {
        lines.push(format!(
            "✅ 🚀 Super Fast Linting completed in {:.2}s",
            total.as_secs_f64()
        ));
    } else {
        lines.push(format!(
            "⚠️ Linting completed with issues in {:.2}s",
            total.as_secs_f64()
        ));
    }
    Ok(HookOutcome::allow(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;

    #[test]
    fn relevance_filter() {
        assert!(is_relevant("apps/web/components/Card.vue"));
        assert!(is_relevant("/repo/src/index.ts"));
        assert!(!is_relevant("/repo/coverage/lcov.js"));
        assert!(!is_relevant("/repo/node_modules/x/index.js"));
        assert!(!is_relevant("/repo/styles.css"));
    }

    #[test]
    fn marking_replaces_older_markers_for_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        cache.mark("page.tsx", "aaaa").unwrap();
        cache.mark("other.tsx", "bbbb").unwrap();
        cache.mark("page.tsx", "cccc").unwrap();

        assert!(cache.is_fresh("page.tsx", "cccc"));
        assert!(!cache.is_fresh("page.tsx", "aaaa"));
        assert!(cache.is_fresh("other.tsx", "bbbb"));
    }

    #[test]
    fn cleans_only_stale_markers() {
        let dir = tempfile::tempdir().unwrap();
        let cache = MarkerCache::new(dir.path());
        cache.mark("a.ts", "1111").unwrap();
        fs::write(dir.path().join(CACHE_DIR).join("notes.txt"), "keep").unwrap();

        assert_eq!(cache.clean_older_than(MARKER_MAX_AGE, SystemTime::now()), 0);
        let later = SystemTime::now() + MARKER_MAX_AGE + Duration::from_secs(60);
        assert_eq!(cache.clean_older_than(MARKER_MAX_AGE, later), 1);
        assert!(!cache.is_fresh("a.ts", "1111"));
        assert!(dir.path().join(CACHE_DIR).join("notes.txt").exists());
    }

    fn ctx_without_runner(root: &Path) -> HookContext {
        let config = HooksConfig {
            package_runner: "hookwright-no-such-runner".to_string(),
            perf_log: Some(root.join("perf.log")),
            ..HooksConfig::default()
        };
        HookContext::new(root, config)
    }

    #[test]
    fn cached_content_skips_the_checks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.ts"), "export const a = 1;\n").unwrap();
        let hash = hash_bytes(b"export const a = 1;\n");
        MarkerCache::new(root).mark("a.ts", &hash).unwrap();

        let ctx = ctx_without_runner(root);
        let input = HookInput::parse(r#"{"tool_input": {"file_path": "a.ts"}}"#).unwrap();
        let outcome = run(&input, &ctx).unwrap();
        assert_eq!(outcome.report, "🚀 🚀 CACHED: a.ts (skipped)");
    }

    #[test]
    fn missing_runner_skips_linting() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.ts"), "export const a = 1;\n").unwrap();

        let ctx = ctx_without_runner(root);
        let input = HookInput::parse(r#"{"tool_input": {"file_path": "a.ts"}}"#).unwrap();
        let outcome = run(&input, &ctx).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.report.contains("(root)"));
        assert!(outcome
            .report
            .ends_with("hookwright-no-such-runner not available - skipping linting"));
    }

    #[test]
    fn checks_run_in_fixed_order() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_without_runner(dir.path());
        let results = run_checks(&ctx, "a.js", dir.path()).unwrap();
        let tools: Vec<LintTool> = results.iter().map(|r| r.tool).collect();
        assert_eq!(tools, LintTool::ALL.to_vec());
        assert!(!results[0].success);
        assert_eq!(results[2].output, "Skipped (not TypeScript)");
        assert!(dir.path().join("perf.log").exists());
    }
}
