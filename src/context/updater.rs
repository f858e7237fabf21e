use anyhow::Context;
use std::fs;

use super::cache::ContextCache;
use super::document;
use super::manager::PluginManager;
use super::plugin::ContextPlugin;
use super::settings::{ConfigManager, UpdaterSettings};
use super::{iso_now, SectionData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// `context_updater.enabled` is false
    Disabled,
    Unchanged,
    Written,
}

/// Runs one discovery cycle and rewrites the document's dynamic region.
pub struct ContextUpdater {
    settings: UpdaterSettings,
    config: ConfigManager,
    manager: PluginManager,
}

impl ContextUpdater {
    /// Updater with the builtin plugin set.
    pub fn new(settings: UpdaterSettings) -> Self {
        let mut updater = Self::with_plugins(settings, Vec::new());
        let settings = updater.settings.clone();
        updater.manager.load_builtin_plugins(&settings);
        updater
    }

    pub fn with_plugins(settings: UpdaterSettings, plugins: Vec<Box<dyn ContextPlugin>>) -> Self {
        let config = ConfigManager::load(&settings.config_path);
        let cache = ContextCache::load(&settings.cache_path);
        let mut manager = PluginManager::new(&settings.project_root).with_cache(cache);
        for plugin in plugins {
            manager.register(plugin);
        }
        Self {
            settings,
            config,
            manager,
        }
    }

    pub fn settings(&self) -> &UpdaterSettings {
        &self.settings
    }

    pub fn update(&mut self) -> anyhow::Result<UpdateOutcome> {
        self.update_at(&iso_now())
    }

    /// Run a cycle stamping the region with `generated_at`.
    pub fn update_at(&mut self, generated_at: &str) -> anyhow::Result<UpdateOutcome> {
        if !self.config.is_enabled() {
            tracing::info!("Context updater is disabled");
            return Ok(UpdateOutcome::Disabled);
        }

        tracing::info!("Starting CLAUDE.md update...");
        fs::create_dir_all(&self.settings.hooks_dir).with_context(|| {
            format!("Failed to create {}", self.settings.hooks_dir.display())
        })?;

        let (_context, sections) = self.manager.run_all_plugins();
        let sections = self.select_sections(sections);

        let path = &self.settings.document_path;
        let current = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()))
            }
        };

        let updated = document::splice(&current, &sections, generated_at);
        if document::same_content(&current, &updated) {
            tracing::info!("No changes needed");
            return Ok(UpdateOutcome::Unchanged);
        }

        fs::write(path, updated).with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("CLAUDE.md updated successfully");
        Ok(UpdateOutcome::Written)
    }

    /// Drop disabled fragments and order the rest by display priority.
    pub fn select_sections(&self, sections: Vec<SectionData>) -> Vec<SectionData> {
        let mut selected: Vec<SectionData> = sections
            .into_iter()
            .filter(|section| self.config.is_section_enabled(&section.id))
            .map(|mut section| {
                if let Some(priority) = self.config.configured_priority(&section.id) {
                    section.priority = priority;
                }
                section
            })
            .collect();
        selected.sort_by_key(|section| section.priority);
        selected
    }
}
