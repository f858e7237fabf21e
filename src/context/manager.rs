use serde_json::Value;
use std::path::{Path, PathBuf};

use super::cache::ContextCache;
use super::plugin::ContextPlugin;
use super::plugins;
use super::settings::UpdaterSettings;
use super::{iso_now, ProjectContext, Record, SectionData};
use crate::util::fingerprint_files;

/// Runs plugins in priority order and folds their output together.
pub struct PluginManager {
    project_root: PathBuf,
    plugins: Vec<Box<dyn ContextPlugin>>,
    cache: Option<ContextCache>,
}

impl PluginManager {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            plugins: Vec::new(),
            cache: None,
        }
    }

    /// Consult `cache` for plugins that declare their input files.
    pub fn with_cache(mut self, cache: ContextCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn plugins(&self) -> &[Box<dyn ContextPlugin>] {
        &self.plugins
    }

    pub fn cache(&self) -> Option<&ContextCache> {
        self.cache.as_ref()
    }

    /// Keep `plugin` if it applies to this project. Returns whether it was kept.
    pub fn register(&mut self, plugin: Box<dyn ContextPlugin>) -> bool {
        if !plugin.is_applicable() {
            tracing::debug!("Skipping plugin {} (not applicable)", plugin.name());
            return false;
        }
        tracing::info!("Loaded builtin plugin: {}", plugin.name());
        self.plugins.push(plugin);
        true
    }

    pub fn load_builtin_plugins(&mut self, settings: &UpdaterSettings) {
        for plugin in plugins::builtin(settings) {
            self.register(plugin);
        }
    }

    /// Run every plugin once. A plugin that fails in either phase is logged
    /// and contributes nothing to the cycle.
    pub fn run_all_plugins(&mut self) -> (ProjectContext, Vec<SectionData>) {
        self.plugins.sort_by_key(|plugin| plugin.priority());

        let mut context = ProjectContext::default();
        let mut sections = Vec::new();

        for plugin in &self.plugins {
            let outcome = discover_cached(plugin.as_ref(), self.cache.as_mut())
                .and_then(|data| Ok((plugin.format_section(&data)?, data)));

            match outcome {
                Ok((section, data)) => {
                    context.merge(&data);
                    if let Some(mut section) = section {
                        section.source_plugin = plugin.name().to_string();
                        section.last_updated = iso_now();
                        sections.push(section);
                    }
                }
                Err(err) => tracing::error!("Plugin {} failed: {:#}", plugin.name(), err),
            }
        }

        (context, sections)
    }
}

fn discover_cached(
    plugin: &dyn ContextPlugin,
    cache: Option<&mut ContextCache>,
) -> anyhow::Result<Record> {
    let inputs = plugin.cache_inputs();
    let cache = match cache {
        Some(cache) if !inputs.is_empty() => cache,
        _ => return plugin.discover(),
    };

    let key = format!("plugin:{}", plugin.name());
    let fingerprint = fingerprint_files(&inputs);
    if let Some(Value::Object(data)) = cache.get_with_fingerprint(&key, &fingerprint) {
        tracing::debug!("Using cached data for {}", plugin.name());
        return Ok(data.clone());
    }

    let data = plugin.discover()?;
    if let Err(err) = cache.set(&key, Value::Object(data.clone()), Some(fingerprint)) {
        tracing::warn!("Failed to save cache: {:#}", err);
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed {
        name: &'static str,
        priority: i32,
        applicable: bool,
        data: Value,
        fail_discover: bool,
        inputs: Vec<PathBuf>,
        calls: Rc<Cell<usize>>,
    }

    impl Fixed {
        fn new(name: &'static str, priority: i32, data: Value) -> Self {
            Self {
                name,
                priority,
                applicable: true,
                data,
                fail_discover: false,
                inputs: Vec::new(),
                calls: Rc::new(Cell::new(0)),
            }
        }
    }

    impl ContextPlugin for Fixed {
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
            self.calls.set(self.calls.get() + 1);
            if self.fail_discover {
                anyhow::bail!("discovery exploded");
            }
            match &self.data {
                Value::Object(map) => Ok(map.clone()),
                _ => anyhow::bail!("bad fixture"),
            }
        }

        fn format_section(&self, _data: &Record) -> anyhow::Result<Option<SectionData>> {
            Ok(Some(SectionData::new(
                self.name,
                self.name,
                format!("## {}", self.name),
                self.priority,
            )))
        }

        fn cache_inputs(&self) -> Vec<PathBuf> {
            self.inputs.clone()
        }
    }

    #[test]
    fn inapplicable_plugins_are_not_loaded() {
        let mut manager = PluginManager::new(Path::new("."));
        let mut skipped = Fixed::new("skipped", 1, json!({"framework": ["X"]}));
        skipped.applicable = false;
        assert!(!manager.register(Box::new(skipped)));
        assert!(manager.register(Box::new(Fixed::new("kept", 2, json!({})))));

        let (context, sections) = manager.run_all_plugins();
        assert!(context.framework.is_empty());
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].source_plugin, "kept");
    }

    #[test]
    fn runs_in_priority_order_and_concatenates_lists() {
        let mut manager = PluginManager::new(Path::new("."));
        manager.register(Box::new(Fixed::new("late", 20, json!({"services": ["B"]}))));
        manager.register(Box::new(Fixed::new("early", 5, json!({"services": ["A"]}))));

        let (context, sections) = manager.run_all_plugins();
        assert_eq!(context.services, vec![json!("A"), json!("B")]);
        let order: Vec<_> = sections.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(order, ["early", "late"]);
        assert!(sections.iter().all(|s| !s.last_updated.is_empty()));
    }

    #[test]
    fn failing_plugin_contributes_nothing() {
        let mut manager = PluginManager::new(Path::new("."));
        let mut broken = Fixed::new("broken", 1, json!({"framework": ["Nope"]}));
        broken.fail_discover = true;
        manager.register(Box::new(broken));
        manager.register(Box::new(Fixed::new("fine", 2, json!({"framework": ["Yes"]}))));

        let (context, sections) = manager.run_all_plugins();
        assert_eq!(context.framework, vec![json!("Yes")]);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].id, "fine");
    }

    #[test]
    fn cached_plugins_skip_rediscovery_until_inputs_change() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("package.json");
        std::fs::write(&input, "{}").unwrap();
        let cache_path = dir.path().join("cache.json");

        let calls = Rc::new(Cell::new(0));
        let run = |calls: &Rc<Cell<usize>>| {
            let mut plugin = Fixed::new("cached", 1, json!({"language": "javascript"}));
            plugin.inputs = vec![input.clone()];
            plugin.calls = Rc::clone(calls);
            let mut manager =
                PluginManager::new(dir.path()).with_cache(ContextCache::load(&cache_path));
            manager.register(Box::new(plugin));
            manager.run_all_plugins().0
        };

        assert_eq!(run(&calls).language, "javascript");
        assert_eq!(run(&calls).language, "javascript");
        assert_eq!(calls.get(), 1);

        std::fs::write(&input, "{\"name\":\"changed\"}").unwrap();
        run(&calls);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn volatile_plugins_are_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("cache.json");
        let calls = Rc::new(Cell::new(0));
        for _ in 0..2 {
            let mut plugin = Fixed::new("volatile", 1, json!({}));
            plugin.calls = Rc::clone(&calls);
            let mut manager =
                PluginManager::new(dir.path()).with_cache(ContextCache::load(&cache_path));
            manager.register(Box::new(plugin));
            manager.run_all_plugins();
        }
        assert_eq!(calls.get(), 2);
        assert!(!cache_path.exists());
    }
}
