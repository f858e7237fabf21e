//! PostToolUse documentation tracker
//!
//! Classifies an edit and prints which documentation is likely stale.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::{compile_table, has_extension, HookContext};
use crate::hook::{HookInput, HookOutcome};

const SKIP: &[(&str, &str)] = &[
    (r"node_modules/", "dependency"),
    (r"\.next/", "build"),
    (r"dist/", "build"),
    (r"build/", "build"),
    (r"\.turbo/", "build"),
    (r"\.git/", "vcs"),
    (r"\.cache/", "cache"),
    (r"\.temp/", "scratch"),
    (r"\.tmp/", "scratch"),
    (r"\.log$", "log"),
    (r"\.lock$", "lockfile"),
];

const TRACKED: &[&str] = &["ts", "tsx", "js", "jsx", "md", "mdx", "json"];
const SIGNIFICANT: &[&str] = &[
    "package.json",
    "tsconfig.json",
    "next.config.",
    "tailwind.config.",
    "README.md",
    "CHANGELOG.md",
];
const MAX_SUGGESTIONS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeType {
    Api,
    Component,
    Page,
    Database,
    Config,
    Export,
    Type,
    Env,
    Query,
    General,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Api => "api",
            ChangeType::Component => "component",
            ChangeType::Page => "page",
            ChangeType::Database => "database",
            ChangeType::Config => "config",
            ChangeType::Export => "export",
            ChangeType::Type => "type",
            ChangeType::Env => "env",
            ChangeType::Query => "query",
            ChangeType::General => "general",
        }
    }

    fn suggestions(self) -> &'static [&'static str] {
        match self {
            ChangeType::Api => &[
                "📚 Consider updating API documentation",
                "   • Document new endpoints or parameters",
                "   • Update OpenAPI/Swagger specs if used",
                "   • Add usage examples",
            ],
            ChangeType::Component => &[
                "📚 Consider updating component documentation",
                "   • Document new props or features",
                "   • Update Storybook stories if used",
                "   • Add usage examples",
            ],
            ChangeType::Database => &[
                "📚 Consider updating database documentation",
                "   • Document schema changes",
                "   • Update ERD diagrams",
                "   • Document migration steps",
            ],
            ChangeType::Config => &[
                "📚 Consider updating configuration documentation",
                "   • Document new environment variables",
                "   • Update setup instructions",
                "   • Document breaking changes",
            ],
            ChangeType::Page => &[
                "📚 Consider updating user documentation",
                "   • Document new features or pages",
                "   • Update user guides",
                "   • Document UI/UX changes",
            ],
            ChangeType::Type => &[
                "📚 Consider updating type documentation",
                "   • Document new interfaces",
                "   • Update TypeDoc comments",
                "   • Add usage examples",
            ],
            _ => &[],
        }
    }
}

struct ContentPatterns {
    export: Regex,
    type_decl: Regex,
    env: Regex,
    query: Regex,
}

fn content_patterns() -> &'static ContentPatterns {
    static PATTERNS: OnceLock<ContentPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ContentPatterns {
        export: Regex::new(r"export\s+(function|const|class)").expect("valid regex"),
        type_decl: Regex::new(r"(interface|type)\s+\w+").expect("valid regex"),
        env: Regex::new(r"process\.env\.\w+").expect("valid regex"),
        query: Regex::new(r"(?i)(SELECT|INSERT|UPDATE|DELETE)").expect("valid regex"),
    })
}

fn skip_table() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| compile_table(SKIP))
}

/// Directory checks look for `/dir/`; anchoring with a leading slash lets a
/// top-level directory of a relative path match too.
fn anchored(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub fn should_track(path: &str) -> bool {
    if skip_table().iter().any(|(re, _)| re.is_match(path)) {
        return false;
    }
    if !has_extension(path, TRACKED) {
        return false;
    }
    if SIGNIFICANT.iter().any(|name| path.contains(name)) {
        return true;
    }

    let anchored = anchored(path);
    anchored.contains("/api/")
        || path.contains("route.ts")
        || ["/components/", "/pages/", "/app/", "/lib/", "/utils/", "/hooks/"]
            .iter()
            .any(|dir| anchored.contains(dir))
        || path.ends_with(".config.js")
        || path.ends_with(".config.ts")
}

pub fn classify(path: &str, content: &str) -> Vec<ChangeType> {
    let anchored = anchored(path);
    let mut types = Vec::new();

    if anchored.contains("/api/") || path.contains("route.ts") {
        types.push(ChangeType::Api);
    }
    if anchored.contains("/components/") || anchored.contains("/ui/") {
        types.push(ChangeType::Component);
    }
    if anchored.contains("/app/") && (path.contains("page.") || path.contains("layout.")) {
        types.push(ChangeType::Page);
    }
    if path.contains("schema.ts") || anchored.contains("/db/") {
        types.push(ChangeType::Database);
    }
    if ["config", "package.json", "tsconfig"]
        .iter()
        .any(|needle| path.contains(needle))
    {
        types.push(ChangeType::Config);
    }

    if !content.is_empty() {
        let patterns = content_patterns();
        if patterns.export.is_match(content) {
            types.push(ChangeType::Export);
        }
        if patterns.type_decl.is_match(content) {
            types.push(ChangeType::Type);
        }
        if patterns.env.is_match(content) {
            types.push(ChangeType::Env);
        }
        if patterns.query.is_match(content) {
            types.push(ChangeType::Query);
        }
    }

    if types.is_empty() {
        types.push(ChangeType::General);
    }
    types
}

/// One-line summary keyed on the first change type.
pub fn summary(path: &str, types: &[ChangeType]) -> String {
    let name = Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string());
    match types.first().copied().unwrap_or(ChangeType::General) {
        ChangeType::Api => format!("API endpoint modified: {}", name),
        ChangeType::Component => format!("React component updated: {}", name),
        ChangeType::Page => format!("Page/route modified: {}", name),
        ChangeType::Database => format!("Database schema changes: {}", name),
        ChangeType::Config => format!("Configuration updated: {}", name),
        _ => format!("Code modified: {}", name),
    }
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let path = ctx.display_path(file_path);
    if !should_track(&path) {
        return Ok(HookOutcome::silent());
    }

    let types = classify(&path, input.edited_text());
    let names: Vec<&str> = types.iter().map(|t| t.as_str()).collect();
    let mut lines = vec![
        format!("📝 Documentation tracker: change in {}", path),
        format!("   Type: {}", names.join(", ")),
        format!("   Summary: {}", summary(&path, &types)),
    ];

    let suggestions: Vec<&str> = types
        .iter()
        .flat_map(|t| t.suggestions().iter().copied())
        .collect();
    if !suggestions.is_empty() {
        lines.push("\n💡 Documentation suggestions:".to_string());
        for suggestion in suggestions.iter().take(MAX_SUGGESTIONS) {
            lines.push(format!("   {}", suggestion));
        }
        if suggestions.len() > MAX_SUGGESTIONS {
            lines.push(format!(
                "   ... and {} more suggestions",
                suggestions.len() - MAX_SUGGESTIONS
            ));
        }
    }

    if types.contains(&ChangeType::Api) {
        lines.push("\n🔗 API Documentation Reminder:".to_string());
        lines.push("   • Update README.md with new API usage".to_string());
        lines.push("   • Consider adding integration tests".to_string());
    }
    if types.contains(&ChangeType::Database) {
        lines.push("\n🗄️ Database Documentation Reminder:".to_string());
        lines.push("   • Document migration steps".to_string());
        lines.push("   • Update schema documentation".to_string());
    }
    if types.contains(&ChangeType::Config) {
        lines.push("\n⚙️ Configuration Documentation Reminder:".to_string());
        lines.push("   • Update .env.example if needed".to_string());
        lines.push("   • Document new environment variables".to_string());
    }

    Ok(HookOutcome::allow(lines.join("\n")))
}
