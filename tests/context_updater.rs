use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use hookwright::context::plugin::ContextPlugin;
use hookwright::context::{
    ContextCache, ContextUpdater, PluginManager, Record, SectionData, UpdateOutcome,
    UpdaterSettings,
};

/// Test plugin with a fixed record and fragment.
struct Stub {
    name: &'static str,
    priority: i32,
    applicable: bool,
    fails: bool,
    record: Value,
    fragment: Option<(&'static str, &'static str)>,
}

impl Stub {
    fn new(name: &'static str, priority: i32) -> Self {
        Self {
            name,
            priority,
            applicable: true,
            fails: false,
            record: json!({}),
            fragment: None,
        }
    }

    fn record(mut self, record: Value) -> Self {
        self.record = record;
        self
    }

    fn fragment(mut self, id: &'static str, content: &'static str) -> Self {
        self.fragment = Some((id, content));
        self
    }
}

impl ContextPlugin for Stub {
    fn name(&self) -> &'static str {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_applicable(&self) -> bool {
        self.applicable
    }

    fn discover(&self) -> anyhow::Result<Record> {
        if self.fails {
            anyhow::bail!("{} exploded", self.name);
        }
        Ok(self.record.as_object().cloned().unwrap_or_default())
    }

    fn format_section(&self, _data: &Record) -> anyhow::Result<Option<SectionData>> {
        Ok(self
            .fragment
            .map(|(id, content)| SectionData::new(id, id, content.to_string(), self.priority)))
    }
}

fn settings(root: &Path) -> UpdaterSettings {
    UpdaterSettings::with_home(root, None)
}

fn write_doc(root: &Path, text: &str) {
    fs::write(root.join("CLAUDE.md"), text).unwrap();
}

fn read_doc(root: &Path) -> String {
    fs::read_to_string(root.join("CLAUDE.md")).unwrap()
}

#[test]
fn splices_a_fragment_into_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_doc(
        root,
        "A\n<!-- DYNAMIC_CONTENT_START -->\nold\n<!-- DYNAMIC_CONTENT_END -->\nB\n",
    );

    let mut updater = ContextUpdater::with_plugins(
        settings(root),
        vec![Box::new(Stub::new("Only", 10).fragment("only", "X"))],
    );
    let outcome = updater.update_at("2025-09-17T10:30:00.000000").unwrap();

    assert_eq!(outcome, UpdateOutcome::Written);
    assert_eq!(
        read_doc(root),
        "A\n<!-- DYNAMIC_CONTENT_START -->\n<!-- Generated: 2025-09-17T10:30:00.000000 -->\n<!-- This content is automatically updated -->\n\nX\n\n<!-- DYNAMIC_CONTENT_END -->\nB\n"
    );
}

#[test]
fn second_run_with_same_fragments_does_not_write() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write_doc(root, "# Notes\n");

    let plugins = || -> Vec<Box<dyn ContextPlugin>> {
        vec![Box::new(Stub::new("Only", 10).fragment("only", "X"))]
    };
    let mut first = ContextUpdater::with_plugins(settings(root), plugins());
    assert_eq!(first.update_at("t1").unwrap(), UpdateOutcome::Written);
    let written = read_doc(root);

    let mut second = ContextUpdater::with_plugins(settings(root), plugins());
    assert_eq!(second.update_at("t2").unwrap(), UpdateOutcome::Unchanged);
    assert_eq!(read_doc(root), written);
}

#[test]
fn disabled_section_is_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let settings = settings(root);
    fs::create_dir_all(&settings.hooks_dir).unwrap();
    fs::write(
        &settings.config_path,
        r#"{"context_updater": {"sections": [{"id": "health", "enabled": false}]}}"#,
    )
    .unwrap();

    let mut updater = ContextUpdater::with_plugins(
        settings,
        vec![
            Box::new(Stub::new("Health", 50).fragment("health", "HEALTH")),
            Box::new(Stub::new("Git", 10).fragment("git", "GIT")),
        ],
    );
    updater.update_at("now").unwrap();

    let doc = read_doc(root);
    assert!(doc.contains("GIT"));
    assert!(!doc.contains("HEALTH"));
}

#[test]
fn failing_plugin_contributes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = Stub::new("Broken", 5)
        .record(json!({"services": ["redis"]}))
        .fragment("broken", "BROKEN");
    broken.fails = true;

    let mut manager = PluginManager::new(dir.path());
    manager.register(Box::new(broken));
    manager.register(Box::new(
        Stub::new("Fine", 10)
            .record(json!({"services": ["postgres"]}))
            .fragment("fine", "FINE"),
    ));

    let (context, sections) = manager.run_all_plugins();
    assert_eq!(context.services, vec![json!("postgres")]);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].content, "FINE");
    assert_eq!(sections[0].source_plugin, "Fine");
}

#[test]
fn inapplicable_plugin_is_never_registered() {
    let dir = tempfile::tempdir().unwrap();
    let mut skipped = Stub::new("Skipped", 1)
        .record(json!({"language": "cobol"}))
        .fragment("skipped", "SKIPPED");
    skipped.applicable = false;

    let mut manager = PluginManager::new(dir.path());
    assert!(!manager.register(Box::new(skipped)));

    let (context, sections) = manager.run_all_plugins();
    assert_eq!(context.language, "unknown");
    assert!(sections.is_empty());
}

#[test]
fn list_fields_concatenate_in_priority_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut manager = PluginManager::new(dir.path());
    manager.register(Box::new(
        Stub::new("Late", 30).record(json!({"framework": ["vite"], "language": "typescript"})),
    ));
    manager.register(Box::new(
        Stub::new("Early", 10).record(json!({"framework": ["nextjs", "react"], "language": "javascript"})),
    ));

    let (context, _) = manager.run_all_plugins();
    assert_eq!(
        context.framework,
        vec![json!("nextjs"), json!("react"), json!("vite")]
    );
    assert_eq!(context.language, "typescript");
}

#[test]
fn cache_entries_expire_after_an_hour() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("context_cache.json");
    let set_at = Utc::now();

    let mut cache = ContextCache::load(&path);
    cache
        .set_at("plugin:Git", json!({"branch": "main"}), None, set_at)
        .unwrap();

    let reloaded = ContextCache::load(&path);
    assert_eq!(
        reloaded.get_at("plugin:Git", set_at + Duration::seconds(3599)),
        Some(&json!({"branch": "main"}))
    );
    assert_eq!(
        reloaded.get_at("plugin:Git", set_at + Duration::seconds(3601)),
        None
    );
}

#[test]
fn text_outside_the_markers_survives_byte_for_byte() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let before = "Intro with <!-- DYNAMIC_CONTENT_STAR --> lookalike\r\n\ttabs  \n";
    let after = "\n<!-- DYNAMIC_CONTENT_END--> also not a marker\n";
    write_doc(
        root,
        &format!(
            "{before}<!-- DYNAMIC_CONTENT_START -->\nstale\n<!-- DYNAMIC_CONTENT_END -->{after}"
        ),
    );

    let mut updater = ContextUpdater::with_plugins(
        settings(root),
        vec![Box::new(Stub::new("Only", 10).fragment("only", "fresh"))],
    );
    updater.update_at("now").unwrap();

    let doc = read_doc(root);
    assert!(doc.starts_with(before));
    assert!(doc.ends_with(after));
    assert!(doc.contains("\nfresh\n"));
    assert!(!doc.contains("stale"));
}

#[test]
fn missing_document_gets_markers_appended() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    let mut updater = ContextUpdater::with_plugins(
        settings(root),
        vec![Box::new(Stub::new("Only", 10).fragment("only", "X"))],
    );
    assert_eq!(updater.update_at("now").unwrap(), UpdateOutcome::Written);

    let doc = read_doc(root);
    assert!(doc.starts_with("\n\n<!-- DYNAMIC_CONTENT_START -->\n<!-- Generated: now -->"));
    assert!(doc.ends_with("X\n\n<!-- DYNAMIC_CONTENT_END -->\n"));
}

#[test]
fn disabled_updater_leaves_document_alone() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let settings = settings(root);
    fs::create_dir_all(&settings.hooks_dir).unwrap();
    fs::write(
        &settings.config_path,
        r#"{"context_updater": {"enabled": false}}"#,
    )
    .unwrap();
    write_doc(root, "untouched\n");

    let mut updater = ContextUpdater::with_plugins(
        settings,
        vec![Box::new(Stub::new("Only", 10).fragment("only", "X"))],
    );
    assert_eq!(updater.update_at("now").unwrap(), UpdateOutcome::Disabled);
    assert_eq!(read_doc(root), "untouched\n");
}
