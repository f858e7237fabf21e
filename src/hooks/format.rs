//! PostToolUse auto-formatter: prettier, eslint --fix and a quick tsc pass.

use std::time::Duration;

use super::{absolute_path, has_extension, run_tool, HookContext};
use crate::hook::{HookInput, HookOutcome};
use crate::util::in_build_dir;

const FORMATTED: &[&str] = &["ts", "tsx", "js", "jsx"];
const TOOL_CHECK_TIMEOUT: Duration = Duration::from_secs(10);
const PRETTIER_TIMEOUT: Duration = Duration::from_secs(30);
const ESLINT_TIMEOUT: Duration = Duration::from_secs(30);
const TSC_TIMEOUT: Duration = Duration::from_secs(15);

/// Tool name as reported, package runner arguments, and install hint.
const TOOLS: &[(&str, &str, &str)] = &[
    ("prettier", "prettier", "prettier"),
    ("eslint", "eslint", "eslint"),
    ("typescript", "tsc", "typescript"),
];

pub fn should_format(path: &str) -> bool {
    has_extension(path, FORMATTED) && !in_build_dir(path)
}

fn missing_tools(ctx: &HookContext) -> Vec<(&'static str, &'static str)> {
    TOOLS
        .iter()
        .filter(|(_, bin, _)| {
            !run_tool(ctx, &ctx.project_root, &[*bin, "--version"], TOOL_CHECK_TIMEOUT)
                .map(|result| result.success())
                .unwrap_or(false)
        })
        .map(|(name, _, package)| (*name, *package))
        .collect()
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    if !should_format(file_path) || !absolute_path(ctx, file_path).exists() {
        return Ok(HookOutcome::silent());
    }

    let missing = missing_tools(ctx);
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|(name, _)| *name).collect();
        let mut lines = vec![
            format!("⚠️ Missing formatting tools: {}", names.join(", ")),
            "💡 Install missing tools:".to_string(),
        ];
        for (_, package) in &missing {
            lines.push(format!("   {} add -D {}", ctx.config.package_runner, package));
        }
        lines.push("🔧 Auto-formatting skipped - install missing tools first".to_string());
        return Ok(HookOutcome::allow(lines.join("\n")));
    }

    let (work_dir, _) = ctx.config.route(&ctx.project_root, file_path);
    let mut lines = vec![format!("🎨 Formatting {}...", file_path)];
    let mut clean = true;

    match run_tool(ctx, &work_dir, &["prettier", "--write", file_path], PRETTIER_TIMEOUT) {
        Ok(result) if result.timed_out => {
            lines.push(format!("⏰ Prettier timeout on {}", file_path));
            clean = false;
        }
        Ok(result) if result.success() => lines.push(format!("✅ Prettier: {}", file_path)),
        Ok(result) => lines.push(format!(
            "⚠️ Prettier warning on {}: {}",
            file_path,
            result.stderr.trim()
        )),
        Err(err) => {
            lines.push(format!("❌ Prettier error on {}: {:#}", file_path, err));
            clean = false;
        }
    }

    match run_tool(ctx, &work_dir, &["eslint", "--fix", file_path], ESLINT_TIMEOUT) {
        Ok(result) if result.timed_out => lines.push(format!("⏰ ESLint timeout on {}", file_path)),
        Ok(result) => match result.exit_code() {
            Some(0) => lines.push(format!("✅ ESLint: {}", file_path)),
            Some(1) => lines.push(format!("🔧 ESLint fixed issues in {}", file_path)),
            _ => {
                lines.push(format!("⚠️ ESLint issues in {}:", file_path));
                if !result.stdout.trim().is_empty() {
                    lines.push(format!("   {}", result.stdout.trim()));
                }
            }
        },
        Err(err) => lines.push(format!("❌ ESLint error on {}: {:#}", file_path, err)),
    }

    if has_extension(file_path, &["ts", "tsx"]) {
        let args = ["tsc", "--noEmit", "--skipLibCheck", file_path];
        match run_tool(ctx, &work_dir, &args, TSC_TIMEOUT) {
            Ok(result) if result.timed_out => {
                lines.push(format!("⏰ TypeScript check timeout on {}", file_path))
            }
            Ok(result) if result.success() => lines.push(format!("✅ TypeScript: {}", file_path)),
            Ok(result) => {
                lines.push(format!("⚠️ TypeScript issues in {}:", file_path));
                lines.extend(
                    result
                        .stderr
                        .split('\n')
                        .take(3)
                        .filter(|line| !line.trim().is_empty())
                        .map(|line| format!("   {}", line)),
                );
            }
            Err(err) => lines.push(format!("❌ TypeScript check error on {}: {:#}", file_path, err)),
        }
    }

    if !clean {
        lines.push(format!(
            "⚠️ Some formatting issues in {} - check output above",
            file_path
        ));
    }
    Ok(HookOutcome::allow(lines.join("\n")))
}
