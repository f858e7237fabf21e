//! Project context discovery for CLAUDE.md
//!
//! A fixed set of plugins inspect the project, each producing a structured
//! record and (optionally) a markdown fragment. The records are folded into
//! one [`ProjectContext`]; the fragments are filtered, ordered and spliced
//! into the document between two sentinel comments.

pub mod cache;
pub mod document;
pub mod manager;
pub mod plugin;
pub mod plugins;
pub mod settings;
pub mod updater;

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};

pub use cache::ContextCache;
pub use manager::PluginManager;
pub use plugin::ContextPlugin;
pub use settings::{ConfigManager, UpdaterSettings};
pub use updater::{ContextUpdater, UpdateOutcome};

/// Raw plugin output: a JSON object keyed by fact name.
pub type Record = Map<String, Value>;

/// One markdown fragment destined for the dynamic region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionData {
    pub id: String,
    pub title: String,
    pub content: String,
    pub priority: i32,
    pub enabled: bool,
    pub source_plugin: String,
    pub last_updated: String,
}

impl SectionData {
    pub fn new(id: &str, title: &str, content: String, priority: i32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content,
            priority,
            enabled: true,
            source_plugin: String::new(),
            last_updated: String::new(),
        }
    }
}

/// How a named context field absorbs a plugin's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Concatenate in plugin run order
    List,
    /// Key-wise update, later plugins win
    Map,
    /// Overwrite with the last non-null value
    Scalar,
}

const MERGE_TABLE: &[(&str, MergeKind)] = &[
    ("project_type", MergeKind::Scalar),
    ("language", MergeKind::Scalar),
    ("framework", MergeKind::List),
    ("services", MergeKind::List),
    ("recent_activity", MergeKind::List),
    ("commands", MergeKind::Map),
    ("health_status", MergeKind::Map),
];

pub fn merge_kind(field: &str) -> Option<MergeKind> {
    MERGE_TABLE
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, kind)| *kind)
}

/// Everything the plugins learned about the project in one cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectContext {
    pub project_type: String,
    pub language: String,
    pub framework: Vec<Value>,
    pub services: Vec<Value>,
    pub commands: Map<String, Value>,
    pub health_status: Map<String, Value>,
    pub recent_activity: Vec<Value>,
    /// Keys no named field claims
    pub custom_data: Map<String, Value>,
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self {
            project_type: "unknown".to_string(),
            language: "unknown".to_string(),
            framework: Vec::new(),
            services: Vec::new(),
            commands: Map::new(),
            health_status: Map::new(),
            recent_activity: Vec::new(),
            custom_data: Map::new(),
        }
    }
}

impl ProjectContext {
    /// Fold one plugin's record into the aggregate.
    pub fn merge(&mut self, data: &Record) {
        for (key, value) in data {
            let Some(kind) = merge_kind(key) else {
                self.custom_data.insert(key.clone(), value.clone());
                continue;
            };
            if value.is_null() {
                continue;
            }

            let absorbed = match kind {
                MergeKind::List => match (self.list_field(key), value) {
                    (Some(list), Value::Array(items)) => {
                        list.extend(items.iter().cloned());
                        true
                    }
                    _ => false,
                },
                MergeKind::Map => match (self.map_field(key), value) {
                    (Some(map), Value::Object(entries)) => {
                        for (k, v) in entries {
                            map.insert(k.clone(), v.clone());
                        }
                        true
                    }
                    _ => false,
                },
                MergeKind::Scalar => match (self.scalar_field(key), value) {
                    (Some(slot), Value::String(s)) => {
                        *slot = s.clone();
                        true
                    }
                    _ => false,
                },
            };

            if !absorbed {
                tracing::debug!(
                    "context field {} expects {:?}, got {}; kept in custom_data",
                    key,
                    kind,
                    value
                );
                self.custom_data.insert(key.clone(), value.clone());
            }
        }
    }

    fn list_field(&mut self, key: &str) -> Option<&mut Vec<Value>> {
        match key {
            "framework" => Some(&mut self.framework),
            "services" => Some(&mut self.services),
            "recent_activity" => Some(&mut self.recent_activity),
            _ => None,
        }
    }

    fn map_field(&mut self, key: &str) -> Option<&mut Map<String, Value>> {
        match key {
            "commands" => Some(&mut self.commands),
            "health_status" => Some(&mut self.health_status),
            _ => None,
        }
    }

    fn scalar_field(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "project_type" => Some(&mut self.project_type),
            "language" => Some(&mut self.language),
            _ => None,
        }
    }
}

/// Local wall-clock timestamp in ISO-8601 with microseconds.
pub fn iso_now() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn every_named_field_has_a_merge_kind() {
        for field in [
            "project_type",
            "language",
            "framework",
            "services",
            "recent_activity",
            "commands",
            "health_status",
        ] {
            assert!(merge_kind(field).is_some(), "{field}");
        }
        assert_eq!(merge_kind("custom_data"), None);
    }

    #[test]
    fn lists_concatenate_and_maps_update() {
        let mut ctx = ProjectContext::default();
        ctx.merge(&record(json!({"framework": ["Next.js"], "commands": {"dev": ["dev: next"]}})));
        ctx.merge(&record(json!({"framework": ["React"], "commands": {"dev": ["start"], "build": []}})));

        assert_eq!(ctx.framework, vec![json!("Next.js"), json!("React")]);
        assert_eq!(ctx.commands["dev"], json!(["start"]));
        assert!(ctx.commands.contains_key("build"));
    }

    #[test]
    fn scalars_ignore_null_and_keep_last_value() {
        let mut ctx = ProjectContext::default();
        ctx.merge(&record(json!({"project_type": "node"})));
        ctx.merge(&record(json!({"project_type": null})));
        assert_eq!(ctx.project_type, "node");
        ctx.merge(&record(json!({"project_type": "monorepo"})));
        assert_eq!(ctx.project_type, "monorepo");
        assert_eq!(ctx.language, "unknown");
    }

    #[test]
    fn unknown_keys_and_mismatches_land_in_custom_data() {
        let mut ctx = ProjectContext::default();
        ctx.merge(&record(json!({"current_branch": "main", "framework": "React"})));
        ctx.merge(&record(json!({"current_branch": "dev"})));

        assert_eq!(ctx.custom_data["current_branch"], json!("dev"));
        assert_eq!(ctx.custom_data["framework"], json!("React"));
        assert!(ctx.framework.is_empty());
    }
}
