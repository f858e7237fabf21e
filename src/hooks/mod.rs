//! Tool-use hooks
//!
//! Every hook takes the parsed payload plus the project it runs in and
//! returns a [`HookOutcome`]. Subprocess failures and timeouts degrade to
//! "not checked"; only `protect` and `monorepo` ever block.

pub mod assets;
pub mod docs;
pub mod format;
pub mod lint;
pub mod migration;
pub mod monorepo;
pub mod protect;
pub mod session;
pub mod strict;

use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::config::HooksConfig;
use crate::util::{run_command_with_timeout, CommandRunResult};

/// Where a hook runs and how it is configured.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub project_root: PathBuf,
    pub config: HooksConfig,
}

impl HookContext {
    pub fn new(project_root: &Path, config: HooksConfig) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config,
        }
    }

    pub fn load(project_root: &Path) -> Self {
        Self::new(project_root, HooksConfig::load(project_root))
    }

    /// Repo-relative form of an edit path for reports and pattern checks.
    pub fn display_path(&self, file_path: &str) -> String {
        crate::util::display_path(&self.project_root, file_path)
    }
}

/// Run `<package_runner> args...` in `work_dir`. `Err` means the runner could
/// not be started at all; a timeout comes back as `Ok` with `timed_out` set.
pub(crate) fn run_tool(
    ctx: &HookContext,
    work_dir: &Path,
    args: &[&str],
    timeout: Duration,
) -> anyhow::Result<CommandRunResult> {
    let mut command = Command::new(&ctx.config.package_runner);
    command.args(args).current_dir(work_dir);
    run_command_with_timeout(&mut command, timeout)
}

/// Resolve an edit path against the project root when it is relative.
pub(crate) fn absolute_path(ctx: &HookContext, file_path: &str) -> PathBuf {
    let path = Path::new(file_path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        ctx.project_root.join(path)
    }
}

/// Compile a fixed `(pattern, label)` table case-insensitively.
pub(crate) fn compile_table(table: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    table
        .iter()
        .map(|(pattern, label)| {
            let re = Regex::new(&format!("(?i){}", pattern)).expect("valid regex");
            (re, *label)
        })
        .collect()
}

/// True when the path has one of `extensions` (given without the dot).
pub(crate) fn has_extension(path: &str, extensions: &[&str]) -> bool {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.contains(&ext))
}
