//! Updater paths and the sectioned `context.json` configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Priority reported for section ids the configuration does not list.
pub const DEFAULT_SECTION_PRIORITY: i32 = 100;

/// Every path the updater touches, derived from the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterSettings {
    pub project_root: PathBuf,
    pub document_path: PathBuf,
    pub hooks_dir: PathBuf,
    pub cache_path: PathBuf,
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    /// Files that may declare `mcpServers`, lowest precedence first
    pub mcp_config_files: Vec<PathBuf>,
}

impl UpdaterSettings {
    pub fn for_root(project_root: &Path) -> Self {
        Self::with_home(project_root, dirs::home_dir().as_deref())
    }

    pub fn with_home(project_root: &Path, home: Option<&Path>) -> Self {
        let hooks_dir = project_root.join(".claude").join("hooks");
        let mut mcp_config_files = Vec::new();
        if let Some(home) = home {
            mcp_config_files.push(home.join(".claude.json"));
        }
        mcp_config_files.push(project_root.join(".mcp.json"));
        mcp_config_files.push(project_root.join(".claude").join("settings.json"));

        Self {
            project_root: project_root.to_path_buf(),
            document_path: project_root.join("CLAUDE.md"),
            cache_path: hooks_dir.join("context_cache.json"),
            config_path: hooks_dir.join("context.json"),
            log_path: hooks_dir.join("context_updater.log"),
            hooks_dir,
            mcp_config_files,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    pub id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    DEFAULT_SECTION_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    pub enabled: bool,
    pub update_frequency: String,
    pub sections: Vec<SectionConfig>,
    pub preserve_custom: bool,
    pub auto_detect: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        let sections = [
            ("project_info", 1),
            ("git_status", 10),
            ("package_management", 20),
            ("environment", 30),
            ("commands", 40),
            ("health", 50),
            ("activity", 60),
        ]
        .into_iter()
        .map(|(id, priority)| SectionConfig {
            id: id.to_string(),
            enabled: true,
            priority,
        })
        .collect();

        Self {
            enabled: true,
            update_frequency: "on_commit".to_string(),
            sections,
            preserve_custom: true,
            auto_detect: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    context_updater: UpdaterConfig,
}

/// Which fragments appear and in what order.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    config: UpdaterConfig,
}

impl ConfigManager {
    /// Load `context.json`; absent or unparsable files give the defaults.
    pub fn load(path: &Path) -> Self {
        let config = match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<ConfigFile>(&content) {
                Ok(file) => file.context_updater,
                Err(err) => {
                    tracing::warn!("Failed to load config {}: {}", path.display(), err);
                    UpdaterConfig::default()
                }
            },
            Err(_) => UpdaterConfig::default(),
        };
        Self { config }
    }

    pub fn from_config(config: UpdaterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn section(&self, id: &str) -> Option<&SectionConfig> {
        self.config.sections.iter().find(|section| section.id == id)
    }

    pub fn is_section_enabled(&self, id: &str) -> bool {
        self.section(id).map(|section| section.enabled).unwrap_or(true)
    }

    pub fn get_section_priority(&self, id: &str) -> i32 {
        self.configured_priority(id)
            .unwrap_or(DEFAULT_SECTION_PRIORITY)
    }

    /// The priority set for `id`, if the configuration lists it.
    pub fn configured_priority(&self, id: &str) -> Option<i32> {
        self.section(id).map(|section| section.priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_derive_from_root() {
        let settings = UpdaterSettings::with_home(Path::new("/p"), Some(Path::new("/home/u")));
        assert_eq!(settings.document_path, PathBuf::from("/p/CLAUDE.md"));
        assert_eq!(
            settings.cache_path,
            PathBuf::from("/p/.claude/hooks/context_cache.json")
        );
        assert_eq!(
            settings.mcp_config_files,
            vec![
                PathBuf::from("/home/u/.claude.json"),
                PathBuf::from("/p/.mcp.json"),
                PathBuf::from("/p/.claude/settings.json"),
            ]
        );
    }

    #[test]
    fn defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load(&dir.path().join("context.json"));
        assert!(manager.is_enabled());
        assert_eq!(manager.get_section_priority("git_status"), 10);
        assert_eq!(manager.get_section_priority("mcp_servers"), 100);
        assert!(manager.is_section_enabled("anything"));
    }

    #[test]
    fn defaults_when_file_unparsable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        fs::write(&path, "{ broken").unwrap();
        let manager = ConfigManager::load(&path);
        assert_eq!(manager.config(), &UpdaterConfig::default());
    }

    #[test]
    fn listed_sections_control_enablement() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        fs::write(
            &path,
            r#"{"context_updater": {"sections": [{"id": "health", "enabled": false}, {"id": "commands", "priority": 5}]}}"#,
        )
        .unwrap();
        let manager = ConfigManager::load(&path);
        assert!(!manager.is_section_enabled("health"));
        assert_eq!(manager.get_section_priority("health"), 100);
        assert_eq!(manager.configured_priority("commands"), Some(5));
        assert_eq!(manager.configured_priority("git_status"), None);
        assert!(manager.is_enabled());
    }
}
