use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use super::read_package_json;
use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::util::title_case;

/// Category → keywords; the first category with a keyword inside the
/// lowercased script name wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("dev", &["dev", "start", "serve"]),
    ("build", &["build", "compile"]),
    ("test", &["test", "spec"]),
    ("lint", &["lint", "format"]),
    ("deploy", &["deploy", "publish"]),
];

const MAX_COMMAND_CHARS: usize = 50;
const SHOWN_PER_CATEGORY: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
struct CommandFacts {
    /// category → entries, in first-seen order
    commands: Map<String, Value>,
    command_sources: Vec<String>,
}

fn categorize(script: &str) -> Option<&'static str> {
    let lowered = script.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|kw| lowered.contains(kw)))
        .map(|(category, _)| *category)
}

fn describe(script: &str, command: &str) -> String {
    if command.chars().count() > MAX_COMMAND_CHARS {
        let head: String = command.chars().take(MAX_COMMAND_CHARS).collect();
        format!("{}: {}...", script, head)
    } else {
        format!("{}: {}", script, command)
    }
}

/// Scripts a developer can run, grouped by purpose.
pub struct CommandsPlugin {
    root: PathBuf,
}

impl CommandsPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ContextPlugin for CommandsPlugin {
    fn name(&self) -> &'static str {
        "CommandsPlugin"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let mut commands = Map::new();
        let mut command_sources = Vec::new();

        if let Some(pkg) = read_package_json(&self.root) {
            if let Some(scripts) = pkg.get("scripts").and_then(Value::as_object) {
                for (name, cmd) in scripts {
                    let cmd = cmd.as_str().map(str::to_string).unwrap_or_else(|| cmd.to_string());
                    let (category, entry) = match categorize(name) {
                        Some(category) => (category, describe(name, &cmd)),
                        None => ("other", name.clone()),
                    };
                    if let Value::Array(entries) = commands
                        .entry(category)
                        .or_insert_with(|| Value::Array(Vec::new()))
                    {
                        entries.push(Value::String(entry));
                    }
                }
            }
            command_sources.push("package.json".to_string());
        }
        if self.root.join("Makefile").exists() {
            command_sources.push("Makefile".to_string());
        }
        if self.root.join("docker-compose.yml").exists() {
            command_sources.push("docker-compose".to_string());
        }

        to_record(&CommandFacts {
            commands,
            command_sources,
        })
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: CommandFacts = from_record(data)?;
        if facts.commands.is_empty() {
            return Ok(None);
        }

        let mut lines = vec!["## 🚀 Available Commands\n".to_string()];
        for (category, entries) in &facts.commands {
            let entries: Vec<&str> = entries
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            lines.push(format!("### {}", title_case(category)));
            for entry in entries.iter().take(SHOWN_PER_CATEGORY) {
                lines.push(format!("- `{}`", entry));
            }
            if entries.len() > SHOWN_PER_CATEGORY {
                lines.push(format!("- _{} more..._", entries.len() - SHOWN_PER_CATEGORY));
            }
            lines.push(String::new());
        }
        if !facts.command_sources.is_empty() {
            lines.push(format!("**Sources**: {}", facts.command_sources.join(", ")));
        }

        Ok(Some(SectionData::new(
            "commands",
            "Available Commands",
            lines.join("\n"),
            40,
        )))
    }

    fn cache_inputs(&self) -> Vec<PathBuf> {
        ["package.json", "Makefile", "docker-compose.yml"]
            .iter()
            .map(|name| self.root.join(name))
            .collect()
    }
}
