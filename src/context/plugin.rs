use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use super::{Record, SectionData};

/// A single source of project facts.
///
/// Plugins are read-only inspectors: `discover` gathers facts, and
/// `format_section` renders them. Missing optional facts are absent keys or
/// empty values, never errors.
pub trait ContextPlugin {
    fn name(&self) -> &'static str;

    /// Run order and default display order; lower first.
    fn priority(&self) -> i32 {
        100
    }

    fn is_applicable(&self) -> bool {
        true
    }

    fn discover(&self) -> anyhow::Result<Record>;

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>>;

    /// Files whose content decides the discovered facts. An empty list means
    /// the plugin's output is volatile and must never be cached.
    fn cache_inputs(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Serialize a plugin's typed facts into a record.
pub fn to_record<T: Serialize>(facts: &T) -> anyhow::Result<Record> {
    match serde_json::to_value(facts)? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("plugin facts must serialize to an object, got {}", other),
    }
}

/// Read a record back into a plugin's typed facts.
pub fn from_record<T: DeserializeOwned>(data: &Record) -> anyhow::Result<T> {
    Ok(serde_json::from_value(Value::Object(data.clone()))?)
}
