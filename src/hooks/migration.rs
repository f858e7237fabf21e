//! Schema migration reminder for edits to the Drizzle schema file.

use std::fs;
use std::path::Path;

use super::HookContext;
use crate::hook::{HookInput, HookOutcome};

/// Kinds of schema constructs touched by the new text.
pub fn schema_changes(content: &str) -> Vec<&'static str> {
    let mut changes = Vec::new();
    if content.contains("sqliteTable(") || content.contains("pgTable(") {
        changes.push("Table definitions");
    }
    if ["text(", "integer(", "real(", "blob("]
        .iter()
        .any(|column| content.contains(column))
    {
        changes.push("Column definitions");
    }
    if content.contains("index(") || content.contains("Index") {
        changes.push("Index definitions");
    }
    if content.contains("references(") || content.contains("foreignKey(") {
        changes.push("Foreign key relationships");
    }
    changes
}

/// Changes that may break existing rows or seed data.
pub fn breaking_changes(content: &str) -> Vec<&'static str> {
    let mut changes = Vec::new();
    if content.contains(".notNull()") {
        changes.push("Added NOT NULL constraints");
    }
    if content.contains(".unique()") {
        changes.push("Added UNIQUE constraints");
    }
    if content.to_uppercase().contains("DROP ") || content.contains("drop(") {
        changes.push("Column/table removals");
    }
    changes
}

/// Number of `.sql` migrations and the latest by name.
pub fn existing_migrations(dir: &Path) -> Option<(usize, String)> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.ends_with(".sql"))
        .collect();
    names.sort();
    let latest = names.last()?.clone();
    Some((names.len(), latest))
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let content = input.edited_text();
    if content.is_empty() || !file_path.contains(&ctx.config.schema_file) {
        return Ok(HookOutcome::silent());
    }

    let runner = &ctx.config.package_runner;
    let package = &ctx.config.db_package;
    let mut lines = vec![format!("🗄️ Database schema modified: {}", file_path)];

    let changes = schema_changes(content);
    if !changes.is_empty() {
        lines.push(format!("📋 Schema changes detected: {}", changes.join(", ")));
    }

    lines.push("\n🔄 Migration commands to run:".to_string());
    lines.push("  1. Generate migration:".to_string());
    lines.push(format!("     {} --filter {} db:generate", runner, package));
    lines.push("  2. Apply migration:".to_string());
    lines.push(format!("     {} --filter {} db:migrate", runner, package));
    lines.push("  3. Verify with Drizzle Studio:".to_string());
    lines.push(format!("     {} --filter {} db:studio", runner, package));

    let migrations_dir = ctx.project_root.join(&ctx.config.migrations_dir);
    if let Some((count, latest)) = existing_migrations(&migrations_dir) {
        lines.push(format!("\n📁 Existing migrations found: {} files", count));
        lines.push(format!("   Latest: {}", latest));
    }

    lines.push("\n💾 Don't forget to:".to_string());
    lines.push("  • Test migrations on development database first".to_string());
    lines.push("  • Backup production data before applying migrations".to_string());
    lines.push("  • Update seed data if table structure changed".to_string());

    let breaking = breaking_changes(content);
    if !breaking.is_empty() {
        lines.push("\n⚠️ Potentially breaking changes detected:".to_string());
        lines.extend(breaking.iter().map(|change| format!("  • {}", change)));
        lines.push("  → Review seed data compatibility".to_string());
        lines.push("  → Consider data migration scripts".to_string());
    }

    Ok(HookOutcome::allow(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;

    const SCHEMA: &str = r#"
export const users = sqliteTable("users", {
  id: integer("id").primaryKey(),
  email: text("email").notNull().unique(),
  orgId: integer("org_id").references(() => orgs.id),
});
"#;

    #[test]
    fn detects_schema_and_breaking_changes() {
        assert_eq!(
            schema_changes(SCHEMA),
            vec!["Table definitions", "Column definitions", "Foreign key relationships"]
        );
        assert_eq!(
            breaking_changes(SCHEMA),
            vec!["Added NOT NULL constraints", "Added UNIQUE constraints"]
        );
        assert!(breaking_changes("const a = 1;").is_empty());
    }

    #[test]
    fn lists_latest_migration() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0001_init.sql", "0002_users.sql", "meta.json"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        assert_eq!(
            existing_migrations(dir.path()),
            Some((2, "0002_users.sql".to_string()))
        );
        assert_eq!(existing_migrations(&dir.path().join("missing")), None);
    }

    #[test]
    fn only_reacts_to_the_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), HooksConfig::default());

        let other = HookInput::parse(
            r#"{"tool_input": {"file_path": "/r/apps/web/a.ts", "content": "x"}}"#,
        )
        .unwrap();
        assert_eq!(run(&other, &ctx).unwrap(), HookOutcome::silent());

        let raw = serde_json::json!({
            "tool_input": {"file_path": "/r/packages/db/src/schema.ts", "new_string": SCHEMA}
        })
        .to_string();
        let outcome = run(&HookInput::parse(&raw).unwrap(), &ctx).unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.report.contains("     pnpm --filter @app/db db:generate"));
        assert!(outcome.report.contains("  • Added UNIQUE constraints"));
        assert!(!outcome.report.contains("Existing migrations"));
    }
}
