use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::read_package_json;
use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::util::title_case;

/// Marker file → (project type, language); first match wins.
const MARKERS: &[(&str, &str, &str)] = &[
    ("package.json", "node", "javascript"),
    ("requirements.txt", "python", "python"),
    ("go.mod", "go", "go"),
    ("Cargo.toml", "rust", "rust"),
    ("pom.xml", "java", "java"),
    ("composer.json", "php", "php"),
];

const NODE_FRAMEWORKS: &[(&str, &str)] = &[
    ("nuxt", "Nuxt"),
    ("next", "Next.js"),
    ("vue", "Vue"),
    ("react", "React"),
    ("angular", "Angular"),
    ("svelte", "Svelte"),
    ("express", "Express"),
    ("fastify", "Fastify"),
];

const PYTHON_FRAMEWORKS: &[(&str, &str)] = &[
    ("django", "Django"),
    ("flask", "Flask"),
    ("fastapi", "FastAPI"),
    ("pyramid", "Pyramid"),
    ("tornado", "Tornado"),
];

const PYTHON_MANIFESTS: &[&str] = &["requirements.txt", "pyproject.toml", "Pipfile"];

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFacts {
    project_type: String,
    language: String,
    framework: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    monorepo_type: Option<String>,
}

/// Project kind, language and frameworks from well-known manifests.
pub struct ProjectTypePlugin {
    root: PathBuf,
}

impl ProjectTypePlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn node_frameworks(&self) -> Vec<String> {
        let Some(pkg) = read_package_json(&self.root) else {
            return Vec::new();
        };
        let deps: Vec<&str> = ["dependencies", "devDependencies"]
            .iter()
            .filter_map(|table| pkg.get(*table).and_then(|v| v.as_object()))
            .flat_map(|table| table.keys().map(String::as_str))
            .collect();

        NODE_FRAMEWORKS
            .iter()
            .filter(|(key, _)| deps.iter().any(|dep| dep.contains(key)))
            .map(|(_, name)| name.to_string())
            .collect()
    }

    fn python_frameworks(&self) -> Vec<String> {
        let mut frameworks = Vec::new();
        for manifest in PYTHON_MANIFESTS {
            let Ok(content) = fs::read_to_string(self.root.join(manifest)) else {
                continue;
            };
            let content = content.to_lowercase();
            for (key, name) in PYTHON_FRAMEWORKS {
                if content.contains(key) && !frameworks.iter().any(|f| f == name) {
                    frameworks.push(name.to_string());
                }
            }
        }
        frameworks
    }

    fn is_cargo_workspace(&self) -> bool {
        let Ok(content) = fs::read_to_string(self.root.join("Cargo.toml")) else {
            return false;
        };
        match content.parse::<toml::Table>() {
            Ok(manifest) => manifest.contains_key("workspace"),
            Err(err) => {
                tracing::debug!("Failed to parse Cargo.toml: {}", err);
                false
            }
        }
    }
}

impl ContextPlugin for ProjectTypePlugin {
    fn name(&self) -> &'static str {
        "ProjectTypePlugin"
    }

    fn priority(&self) -> i32 {
        1
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let mut facts = ProjectFacts {
            project_type: "unknown".to_string(),
            language: "unknown".to_string(),
            framework: Vec::new(),
            monorepo_type: None,
        };

        if let Some((_, project_type, language)) = MARKERS
            .iter()
            .find(|(marker, _, _)| self.root.join(marker).exists())
        {
            facts.project_type = project_type.to_string();
            facts.language = language.to_string();
            match *project_type {
                "node" => facts.framework = self.node_frameworks(),
                "python" => facts.framework = self.python_frameworks(),
                "rust" if self.is_cargo_workspace() => {
                    facts.project_type = "monorepo".to_string();
                    facts.monorepo_type = Some("cargo".to_string());
                }
                _ => {}
            }
        }

        if self.root.join("pnpm-workspace.yaml").exists() {
            facts.project_type = "monorepo".to_string();
            facts.monorepo_type = Some("pnpm".to_string());
        } else if self.root.join("lerna.json").exists() {
            facts.project_type = "monorepo".to_string();
            facts.monorepo_type = Some("lerna".to_string());
        }

        to_record(&facts)
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: ProjectFacts = from_record(data)?;
        let mut lines = vec!["## 🏗️ Project Information\n".to_string()];
        lines.push(format!("**Type**: {}", title_case(&facts.project_type)));
        lines.push(format!("**Language**: {}", title_case(&facts.language)));
        if !facts.framework.is_empty() {
            lines.push(format!("**Frameworks**: {}", facts.framework.join(", ")));
        }
        if let Some(monorepo) = &facts.monorepo_type {
            lines.push(format!("**Monorepo**: {}", monorepo));
        }

        Ok(Some(SectionData::new(
            "project_info",
            "Project Information",
            lines.join("\n"),
            1,
        )))
    }

    fn cache_inputs(&self) -> Vec<PathBuf> {
        MARKERS
            .iter()
            .map(|(marker, _, _)| *marker)
            .chain(PYTHON_MANIFESTS.iter().copied())
            .chain(["pnpm-workspace.yaml", "lerna.json"])
            .map(|name| self.root.join(name))
            .collect()
    }
}
