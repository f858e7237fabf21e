//! PreToolUse file protection
//!
//! Critical paths block the edit outright. Important config files, sensitive
//! files and secret-looking content only produce warnings.

use regex::Regex;
use std::sync::OnceLock;

use super::{compile_table, HookContext};
use crate::hook::{HookInput, HookOutcome};

const CRITICAL: &[(&str, &str)] = &[
    (r"\.env\.production$", "production environment file"),
    (r"\.env\.prod$", "production environment file"),
    (r"\.git/", "git internals"),
    (r"package-lock\.json$", "npm lockfile"),
    (r"pnpm-lock\.yaml$", "pnpm lockfile"),
];

const WARNING: &[(&str, &str)] = &[
    (r"\.env($|\.local$|\.development$)", "development environment file"),
    (r"tsconfig\.json$", "TypeScript config"),
    (r"next\.config\.", "Next.js config"),
    (r"tailwind\.config\.", "Tailwind config"),
    (r"package\.json$", "package manifest"),
];

const SENSITIVE: &[(&str, &str)] = &[
    (r"\.env\.production$", "production environment file"),
    (r"\.env\.prod$", "production environment file"),
    (r"package-lock\.json$", "lockfile"),
    (r"pnpm-lock\.yaml$", "lockfile"),
    (r"yarn\.lock$", "lockfile"),
    (r"\.git/", "git internals"),
    (r"\.gitignore$", "git ignore rules"),
    (r"\.next/", "build artifact"),
    (r"dist/", "build artifact"),
    (r"build/", "build artifact"),
    (r"node_modules/", "installed dependency"),
    (r"\.turbo/", "build cache"),
    (r"\.github/workflows/", "CI workflow"),
    (r"\.vercel/", "deployment config"),
    (r"\.netlify/", "deployment config"),
    (r"Dockerfile\.prod$", "production container"),
    (r"docker-compose\.prod\.yml$", "production container"),
    (r"\.db$", "database file"),
    (r"\.sqlite3?$", "database file"),
    (r"\.(bak|backup|orig)$", "backup file"),
    (r"\.DS_Store$", "system file"),
    (r"Thumbs\.db$", "system file"),
    (r"\.d\.ts$", "generated type declarations"),
    (r"\.(pem|key|crt|cert)$", "certificate or key"),
];

const SECRET_CONTENT: &[(&str, &str)] = &[
    (r#"password\s*[=:]\s*["'][^"']+["']"#, "Password in plain text"),
    (r#"api[_-]?key\s*[=:]\s*["'][^"']+["']"#, "API key in plain text"),
    (r#"secret\s*[=:]\s*["'][^"']+["']"#, "Secret in plain text"),
    (r#"token\s*[=:]\s*["'][^"']+["']"#, "Token in plain text"),
    (r#"DATABASE_URL\s*=\s*["'][^"']*://[^"']+["']"#, "Database URL with credentials"),
    (r"mongodb://[^:]+:[^@]+@", "MongoDB connection with credentials"),
    (r"postgres://[^:]+:[^@]+@", "PostgreSQL connection with credentials"),
];

const SECRET_NAME_KEYWORDS: &[&str] = &["secret", "private", "credential", "token", "password", "key"];
const DATA_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml", ".txt"];
const PROD_CONFIG_EXTENSIONS: &[&str] = &[".json", ".yaml", ".yml", ".config.js"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyLevel {
    Critical,
    Warning,
    Safe,
}

struct Tables {
    critical: Vec<(Regex, &'static str)>,
    warning: Vec<(Regex, &'static str)>,
    sensitive: Vec<(Regex, &'static str)>,
    content: Vec<(Regex, &'static str)>,
    console_leak: Regex,
}

fn tables() -> &'static Tables {
    static TABLES: OnceLock<Tables> = OnceLock::new();
    TABLES.get_or_init(|| Tables {
        critical: compile_table(CRITICAL),
        warning: compile_table(WARNING),
        sensitive: compile_table(SENSITIVE),
        content: compile_table(SECRET_CONTENT),
        console_leak: Regex::new(r"(?i)console\.log\([^)]*(?:password|secret|token|key)[^)]*\)")
            .expect("valid regex"),
    })
}

fn first_match(table: &[(Regex, &'static str)], path: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(re, _)| re.is_match(path))
        .map(|(_, label)| *label)
}

pub fn safety_level(path: &str) -> (SafetyLevel, Option<&'static str>) {
    let t = tables();
    if let Some(label) = first_match(&t.critical, path) {
        return (SafetyLevel::Critical, Some(label));
    }
    if let Some(label) = first_match(&t.warning, path) {
        return (SafetyLevel::Warning, Some(label));
    }
    (SafetyLevel::Safe, None)
}

/// Why a path counts as sensitive, if it does.
pub fn sensitivity(path: &str) -> Option<String> {
    if let Some(label) = first_match(&tables().sensitive, path) {
        return Some(label.to_string());
    }

    let lower = path.to_lowercase();
    if DATA_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        if let Some(keyword) = SECRET_NAME_KEYWORDS.iter().find(|kw| lower.contains(*kw)) {
            return Some(format!("contains '{}'", keyword));
        }
    }
    if lower.contains("prod") && PROD_CONFIG_EXTENSIONS.iter().any(|ext| lower.contains(ext)) {
        return Some("production config file".to_string());
    }
    None
}

/// Descriptions of secret-looking content in the new text.
pub fn content_violations(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    let t = tables();
    let mut violations: Vec<String> = t
        .content
        .iter()
        .filter(|(re, _)| re.is_match(content))
        .map(|(_, label)| label.to_string())
        .collect();
    let leaks = t.console_leak.find_iter(content).count();
    if leaks > 0 {
        violations.push(format!(
            "Console.log with sensitive data ({} occurrences)",
            leaks
        ));
    }
    violations
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let path = ctx.display_path(file_path);
    let content = input.edited_text();
    let (level, reason) = safety_level(&path);

    if level == SafetyLevel::Critical {
        let report = [
            format!("🚫 BLOCKED: Cannot modify critical file {}", path),
            format!("📋 Reason: {}", reason.unwrap_or("Critical system file")),
            "💡 Critical files include:".to_string(),
            "  • Production environment files (.env.production)".to_string(),
            "  • Lock files (package-lock.json, pnpm-lock.yaml)".to_string(),
            "  • Git directory (.git/)".to_string(),
            "  • Use proper tools to modify these files".to_string(),
        ];
        tracing::warn!(path = %path, "blocked edit to critical file");
        return Ok(HookOutcome::block(report.join("\n")));
    }

    let mut lines = Vec::new();
    if level == SafetyLevel::Warning {
        lines.push(format!("⚠️ WARNING: Modifying important config file {}", path));
        lines.push("💡 Please ensure you know what you're doing".to_string());
        lines.push("🔍 Consider reviewing changes carefully".to_string());
    }

    if let Some(reason) = sensitivity(&path) {
        lines.push(format!("🔒 CAUTION: Modifying sensitive file {}", path));
        lines.push(format!("📋 Detected as: {}", reason));
        lines.push("💡 Make sure this modification is intentional".to_string());
    }

    let violations = content_violations(content);
    if !violations.is_empty() {
        lines.push(format!(
            "🔐 SECURITY WARNING: Sensitive content detected in {}:",
            path
        ));
        lines.extend(violations.iter().map(|v| format!("  • {}", v)));
        lines.push("\n💡 Security recommendations:".to_string());
        lines.push("  • Use environment variables for secrets".to_string());
        lines.push("  • Store credentials in .env files (not in code)".to_string());
        lines.push("  • Avoid logging sensitive information".to_string());
        lines.push("  • Use proper secret management tools".to_string());
    }

    if path.ends_with("package.json") && content.contains("\"scripts\"") {
        lines.push(format!("📦 Package.json scripts modified in {}", path));
        lines.push(format!(
            "💡 Run '{} install' if dependencies changed",
            ctx.config.package_runner
        ));
    }
    if path.contains("tsconfig.json") && !content.is_empty() {
        lines.push(format!("⚙️ TypeScript config modified in {}", path));
        lines.push(format!(
            "💡 Consider running '{} build' to verify config",
            ctx.config.package_runner
        ));
    }

    Ok(HookOutcome::allow(lines.join("\n")))
}
