//! TypeScript strictness checks: content heuristics, a strict tsc pass and
//! a look at the configured tsconfig files. Never blocks.

use regex::Regex;
use std::fs;
use std::sync::OnceLock;
use std::time::Duration;

use super::{absolute_path, has_extension, run_tool, HookContext};
use crate::hook::{HookInput, HookOutcome};

const TSC_TIMEOUT: Duration = Duration::from_secs(20);
const MAX_VIOLATIONS: usize = 5;
const MAX_ERRORS: usize = 3;

struct Heuristics {
    any: Regex,
    non_null: Regex,
    console_log: Regex,
    empty_catch: Regex,
    function_no_return: Regex,
    arrow_no_return: Regex,
    todo: Regex,
    async_function: Regex,
}

fn heuristics() -> &'static Heuristics {
    static RE: OnceLock<Heuristics> = OnceLock::new();
    RE.get_or_init(|| Heuristics {
        any: Regex::new(r"\b:\s*any\b").expect("valid regex"),
        non_null: Regex::new(r"!\s*\.").expect("valid regex"),
        console_log: Regex::new(r"console\.log\s*\(").expect("valid regex"),
        empty_catch: Regex::new(r"catch\s*\([^)]*\)\s*\{\s*\}").expect("valid regex"),
        function_no_return: Regex::new(r"function\s+\w+\s*\([^)]*\)\s*\{").expect("valid regex"),
        arrow_no_return: Regex::new(r"=\s*\([^)]*\)\s*=>\s*\{").expect("valid regex"),
        todo: Regex::new(r"(?i)//\s*(TODO|FIXME|HACK)").expect("valid regex"),
        async_function: Regex::new(r"async\s+function[^{]*\{").expect("valid regex"),
    })
}

/// Strictness violations found in `content`, most important first.
pub fn content_violations(path: &str, content: &str) -> Vec<String> {
    if !has_extension(path, &["ts", "tsx"]) || path.ends_with(".d.ts") || path.contains("node_modules") {
        return Vec::new();
    }

    let re = heuristics();
    let mut violations = Vec::new();

    let count = re.any.find_iter(content).count();
    if count > 0 {
        violations.push(format!("Found {} 'any' type usage(s)", count));
    }
    let count = re.non_null.find_iter(content).count();
    if count > 0 {
        violations.push(format!(
            "Found {} non-null assertion(s) - consider optional chaining",
            count
        ));
    }
    let count = re.console_log.find_iter(content).count();
    if count > 0 {
        violations.push(format!(
            "Found {} console.log statement(s) - use proper logging",
            count
        ));
    }
    let count = re.empty_catch.find_iter(content).count();
    if count > 0 {
        violations.push(format!("Found {} empty catch block(s)", count));
    }
    let count = re.function_no_return.find_iter(content).count()
        + re.arrow_no_return.find_iter(content).count();
    if count > 0 {
        violations.push(format!(
            "Found {} function(s) without explicit return types",
            count
        ));
    }
    let count = re.todo.find_iter(content).count();
    if count > 0 {
        violations.push(format!(
            "Found {} TODO/FIXME comment(s) - consider creating issues",
            count
        ));
    }
    let count = content.matches("eslint-disable").count();
    if count > 0 {
        violations.push(format!("Found {} ESLint disable comment(s)", count));
    }

    // An async function body with no `try` anywhere after it.
    let unguarded = re.async_function.find_iter(content).any(|m| {
        let rest = &content[m.end()..];
        rest.contains('}') && !rest.contains("try")
    });
    if unguarded {
        violations.push("Found async function(s) without try-catch blocks".to_string());
    }

    violations
}

fn report_violations(path: &str, violations: &[String], lines: &mut Vec<String>) {
    lines.push(format!("🔷 TypeScript strict violations in {}:", path));
    for violation in violations.iter().take(MAX_VIOLATIONS) {
        lines.push(format!("  • {}", violation));
    }
    if violations.len() > MAX_VIOLATIONS {
        lines.push(format!(
            "  • ... and {} more issues",
            violations.len() - MAX_VIOLATIONS
        ));
    }
    lines.push("\n💡 Strict TypeScript recommendations:".to_string());
    lines.push("  • Replace 'any' with specific types".to_string());
    lines.push("  • Use optional chaining (?.) instead of non-null assertions".to_string());
    lines.push("  • Add explicit return type annotations".to_string());
    lines.push("  • Handle errors properly in async functions".to_string());
    lines.push("  • Remove console.log statements before production".to_string());
}

/// Strict compile of the one file. Returns false on errors or timeout.
fn compiler_check(ctx: &HookContext, file_path: &str, lines: &mut Vec<String>) -> bool {
    let args = ["tsc", "--noEmit", "--strict", "--skipLibCheck", file_path];
    match run_tool(ctx, &ctx.project_root, &args, TSC_TIMEOUT) {
        Ok(result) if result.timed_out => {
            lines.push(format!("⏰ TypeScript check timeout on {}", file_path));
            false
        }
        Ok(result) if result.success() => {
            lines.push(format!("✅ TypeScript strict check: {}", file_path));
            true
        }
        Ok(result) => {
            lines.push(format!("🔷 TypeScript strict errors in {}:", file_path));
            let relevant: Vec<&str> = result
                .stderr
                .lines()
                .filter(|line| line.contains(file_path) || line.contains("error TS"))
                .collect();
            for error in relevant.iter().take(MAX_ERRORS) {
                if !error.trim().is_empty() {
                    lines.push(format!("   {}", error));
                }
            }
            if relevant.len() > MAX_ERRORS {
                lines.push(format!(
                    "   ... and {} more errors",
                    relevant.len() - MAX_ERRORS
                ));
            }
            lines.push("💡 Fix TypeScript strict errors before proceeding".to_string());
            false
        }
        Err(err) => {
            lines.push(format!("❌ TypeScript check error: {:#}", err));
            false
        }
    }
}

/// Configured tsconfig files that exist but do not turn on `strict`.
pub fn non_strict_tsconfigs(ctx: &HookContext) -> Vec<String> {
    ctx.config
        .tsconfig_paths
        .iter()
        .filter(|rel| {
            fs::read_to_string(ctx.project_root.join(rel)).is_ok_and(|content| {
                !content.contains("\"strict\": true") && !content.contains("\"strict\":true")
            })
        })
        .cloned()
        .collect()
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let path = ctx.display_path(file_path);
    let content = input.edited_text();
    let is_typescript = has_extension(file_path, &["ts", "tsx"]);
    let mut lines = Vec::new();

    let mut strict_ok = true;
    if !content.is_empty() {
        let violations = content_violations(&path, content);
        if !violations.is_empty() {
            report_violations(&path, &violations, &mut lines);
            strict_ok = false;
        }
    }

    if is_typescript && absolute_path(ctx, file_path).exists() {
        strict_ok &= compiler_check(ctx, file_path, &mut lines);
    }

    if is_typescript {
        for rel in non_strict_tsconfigs(ctx) {
            lines.push(format!("⚠️ Strict mode not enabled in {}", rel));
            lines.push("💡 Add '\"strict\": true' to compilerOptions".to_string());
        }
    }

    if !strict_ok {
        lines.push(format!(
            "\n🔷 TypeScript strict mode violations detected in {}",
            path
        ));
        lines.push("🔗 Learn more: https://www.typescriptlang.org/tsconfig#strict".to_string());
    }
    Ok(HookOutcome::allow(lines.join("\n")))
}
