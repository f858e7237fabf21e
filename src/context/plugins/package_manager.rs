use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use super::read_package_json;
use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};

const LOCKFILES: &[(&str, &str)] = &[
    ("pnpm-lock.yaml", "pnpm"),
    ("yarn.lock", "yarn"),
    ("package-lock.json", "npm"),
    ("Pipfile.lock", "pipenv"),
    ("poetry.lock", "poetry"),
];

#[derive(Debug, Serialize, Deserialize)]
struct PackageFacts {
    package_manager: Option<String>,
    dependencies_count: usize,
    workspaces: Vec<Value>,
}

pub struct PackageManagerPlugin {
    root: PathBuf,
}

impl PackageManagerPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

/// Workspace globs from either `"workspaces": [...]` or `{"packages": [...]}`.
fn workspace_entries(declared: &Value) -> Vec<Value> {
    match declared {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("packages") {
            Some(Value::Array(items)) => items.clone(),
            _ => map.values().cloned().collect(),
        },
        _ => Vec::new(),
    }
}

impl ContextPlugin for PackageManagerPlugin {
    fn name(&self) -> &'static str {
        "PackageManagerPlugin"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let package_manager = LOCKFILES
            .iter()
            .find(|(lockfile, _)| self.root.join(lockfile).exists())
            .map(|(_, manager)| manager.to_string());

        let mut facts = PackageFacts {
            package_manager,
            dependencies_count: 0,
            workspaces: Vec::new(),
        };

        if let Some(pkg) = read_package_json(&self.root) {
            let count = |table: &str| pkg.get(table).and_then(Value::as_object).map_or(0, |t| t.len());
            facts.dependencies_count = count("dependencies") + count("devDependencies");
            if let Some(declared) = pkg.get("workspaces") {
                facts.workspaces = workspace_entries(declared);
            }
        }

        to_record(&facts)
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: PackageFacts = from_record(data)?;
        let Some(manager) = facts.package_manager else {
            return Ok(None);
        };

        let mut lines = vec!["## 📦 Package Management\n".to_string()];
        lines.push(format!("**Manager**: {}", manager));
        if facts.dependencies_count > 0 {
            lines.push(format!("**Dependencies**: {}", facts.dependencies_count));
        }
        if !facts.workspaces.is_empty() {
            lines.push(format!("**Workspaces**: {}", facts.workspaces.len()));
        }

        Ok(Some(SectionData::new(
            "package_management",
            "Package Management",
            lines.join("\n"),
            20,
        )))
    }

    fn cache_inputs(&self) -> Vec<PathBuf> {
        LOCKFILES
            .iter()
            .map(|(lockfile, _)| self.root.join(lockfile))
            .chain(std::iter::once(self.root.join("package.json")))
            .collect()
    }
}
