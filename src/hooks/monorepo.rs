//! Monorepo boundary guard
//!
//! Edits must land under an allowed workspace prefix, packages must not
//! import from apps, and an app must not import from a sibling app.

use regex::Regex;
use std::fs;
use std::sync::OnceLock;

use super::{absolute_path, HookContext};
use crate::hook::{HookInput, HookOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    OutsideWorkspace,
    PackageImportsApp,
    CrossAppImport(String),
}

/// App names reached through relative `../apps/<name>` imports.
fn app_import_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:from|import)\s*\(?\s*["'](?:\.\./)+apps/([^/"']+)"#).expect("valid regex")
    })
}

pub fn imported_apps(content: &str) -> Vec<String> {
    let mut apps: Vec<String> = app_import_re()
        .captures_iter(content)
        .map(|cap| cap[1].to_string())
        .collect();
    apps.dedup();
    apps
}

/// Check a repo-relative path and, when given, the file's current content.
pub fn validate(path: &str, content: Option<&str>, allowed_prefixes: &[String]) -> Result<(), Violation> {
    if !allowed_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
        return Err(Violation::OutsideWorkspace);
    }
    let Some(content) = content else {
        return Ok(());
    };

    if path.starts_with("packages/") {
        if !imported_apps(content).is_empty() {
            return Err(Violation::PackageImportsApp);
        }
    } else if let Some(rest) = path.strip_prefix("apps/") {
        let current = rest.split('/').next().unwrap_or_default();
        if let Some(other) = imported_apps(content).into_iter().find(|app| app != current) {
            return Err(Violation::CrossAppImport(other));
        }
    }
    Ok(())
}

pub fn run(input: &HookInput, ctx: &HookContext) -> anyhow::Result<HookOutcome> {
    let Some(file_path) = input.file_path() else {
        return Ok(HookOutcome::silent());
    };
    let path = ctx.display_path(file_path);
    let content = fs::read_to_string(absolute_path(ctx, file_path)).ok();

    let problem = match validate(&path, content.as_deref(), &ctx.config.allowed_prefixes) {
        Ok(()) => {
            return Ok(HookOutcome::allow(format!(
                "✅ Monorepo structure validated for {}",
                path
            )))
        }
        Err(Violation::OutsideWorkspace) => vec![
            format!("⚠️ Modification outside valid monorepo workspace: {}", path),
            format!(
                "Valid locations: {}",
                ctx.config.allowed_prefixes.join(", ")
            ),
        ],
        Err(Violation::PackageImportsApp) => vec![
            format!("❌ Package importing from apps detected in {}", path),
            "Packages should not import from apps - consider moving shared code to packages/"
                .to_string(),
        ],
        Err(Violation::CrossAppImport(app)) => vec![
            format!("❌ Import from another app ({}) detected in {}", app, path),
            "Apps should only share code through packages/".to_string(),
        ],
    };

    let mut lines = problem;
    lines.push(format!("Use proper monorepo workspace structure for {}", path));
    tracing::warn!(path = %path, "blocked edit across monorepo boundary");
    Ok(HookOutcome::block(lines.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HooksConfig;
    use crate::hook::EXIT_BLOCK;

    fn prefixes() -> Vec<String> {
        HooksConfig::default().allowed_prefixes
    }

    #[test]
    fn prefix_rules() {
        assert_eq!(validate("apps/web/page.tsx", None, &prefixes()), Ok(()));
        assert_eq!(validate("CLAUDE.md", None, &prefixes()), Ok(()));
        assert_eq!(
            validate("scripts/deploy.sh", None, &prefixes()),
            Err(Violation::OutsideWorkspace)
        );
    }

    #[test]
    fn import_rules() {
        let from_app = r#"import { x } from "../../../apps/web/lib/x";"#;
        assert_eq!(
            validate("packages/ui/src/a.ts", Some(from_app), &prefixes()),
            Err(Violation::PackageImportsApp)
        );
        assert_eq!(validate("apps/web/src/a.ts", Some(from_app), &prefixes()), Ok(()));
        assert_eq!(
            validate("apps/admin/src/a.ts", Some(from_app), &prefixes()),
            Err(Violation::CrossAppImport("web".to_string()))
        );
        assert_eq!(
            validate("packages/ui/src/a.ts", Some("import x from '@app/ui';"), &prefixes()),
            Ok(())
        );
    }

    #[test]
    fn blocks_with_exit_two() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = HookContext::new(dir.path(), HooksConfig::default());
        let raw = serde_json::json!({
            "tool_input": {"file_path": dir.path().join("tmp/x.ts").to_string_lossy()}
        })
        .to_string();
        let outcome = run(&HookInput::parse(&raw).unwrap(), &ctx).unwrap();
        assert_eq!(outcome.exit_code, EXIT_BLOCK);
        assert!(outcome
            .report
            .starts_with("⚠️ Modification outside valid monorepo workspace: tmp/x.ts"));
        assert!(outcome
            .report
            .ends_with("Use proper monorepo workspace structure for tmp/x.ts"));
    }

    #[test]
    fn reads_package_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("packages/ui/src/a.ts");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "export * from '../../../apps/web/x';").unwrap();

        let ctx = HookContext::new(dir.path(), HooksConfig::default());
        let raw = serde_json::json!({"tool_input": {"file_path": file.to_string_lossy()}}).to_string();
        let outcome = run(&HookInput::parse(&raw).unwrap(), &ctx).unwrap();
        assert!(outcome.is_blocking());
        assert!(outcome.report.contains("Package importing from apps"));
    }
}
