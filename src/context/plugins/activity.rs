use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::util::BUILD_DIRS;

const RECORDED_FILES: usize = 10;
const SHOWN_FILES: usize = 5;
const MAX_AREAS: usize = 5;

#[derive(Debug, Serialize, Deserialize)]
struct ActivityFacts {
    recent_activity: Vec<String>,
    active_areas: Vec<String>,
}

/// Files touched recently and the top-level areas they live in.
pub struct RecentActivityPlugin {
    root: PathBuf,
    window: Duration,
}

impl RecentActivityPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            window: Duration::from_secs(24 * 60 * 60),
        }
    }

    #[cfg(test)]
    fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Relative paths modified inside the window, newest first.
    fn recent_files(&self) -> Vec<PathBuf> {
        let cutoff = SystemTime::now()
            .checked_sub(self.window)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut files: Vec<(SystemTime, PathBuf)> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                !(e.depth() > 0
                    && e.file_type().is_dir()
                    && e.file_name().to_str().is_some_and(|n| BUILD_DIRS.contains(&n)))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let modified = e.metadata().ok()?.modified().ok()?;
                if modified < cutoff {
                    return None;
                }
                let rel = e.path().strip_prefix(&self.root).ok()?.to_path_buf();
                Some((modified, rel))
            })
            .collect();

        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        files.into_iter().map(|(_, path)| path).collect()
    }
}

fn first_component(path: &Path) -> Option<String> {
    let mut components = path.components();
    let first = components.next()?;
    components.next()?;
    match first {
        Component::Normal(name) => Some(name.to_string_lossy().to_string()),
        _ => None,
    }
}

impl ContextPlugin for RecentActivityPlugin {
    fn name(&self) -> &'static str {
        "RecentActivityPlugin"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let files = self.recent_files();

        let mut active_areas: Vec<String> = Vec::new();
        for area in files.iter().filter_map(|path| first_component(path)) {
            if active_areas.len() == MAX_AREAS {
                break;
            }
            if !active_areas.contains(&area) {
                active_areas.push(area);
            }
        }

        to_record(&ActivityFacts {
            recent_activity: files
                .iter()
                .take(RECORDED_FILES)
                .map(|path| path.to_string_lossy().to_string())
                .collect(),
            active_areas,
        })
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: ActivityFacts = from_record(data)?;
        if facts.recent_activity.is_empty() {
            return Ok(None);
        }

        let mut lines = vec!["## 📈 Recent Activity\n".to_string()];
        if !facts.active_areas.is_empty() {
            lines.push(format!("**Active Areas**: {}", facts.active_areas.join(", ")));
            lines.push(String::new());
        }
        lines.push("### Recently Modified".to_string());
        for file in facts.recent_activity.iter().take(SHOWN_FILES) {
            lines.push(format!("- {}", file));
        }

        Ok(Some(SectionData::new(
            "activity",
            "Recent Activity",
            lines.join("\n"),
            60,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn first_component_needs_a_directory() {
        assert_eq!(first_component(Path::new("src/a.ts")), Some("src".to_string()));
        assert_eq!(first_component(Path::new("README.md")), None);
    }

    #[test]
    fn skips_build_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("apps/web")).unwrap();
        fs::create_dir_all(root.join("node_modules/x")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("apps/web/page.tsx"), "x").unwrap();
        fs::write(root.join("README.md"), "x").unwrap();
        fs::write(root.join("node_modules/x/index.js"), "x").unwrap();
        fs::write(root.join(".git/HEAD"), "x").unwrap();

        let plugin = RecentActivityPlugin::new(root);
        let data = plugin.discover().unwrap();
        let mut files: Vec<String> = serde_json::from_value(data["recent_activity"].clone()).unwrap();
        files.sort();
        assert_eq!(files, vec!["README.md".to_string(), "apps/web/page.tsx".to_string()]);
        assert_eq!(data["active_areas"], serde_json::json!(["apps"]));

        let section = plugin.format_section(&data).unwrap().unwrap();
        assert!(section.content.starts_with("## 📈 Recent Activity\n\n**Active Areas**: apps\n\n### Recently Modified\n- "));
    }

    #[test]
    fn caps_recorded_and_shown_files() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..12 {
            let area = dir.path().join(format!("area{i}"));
            fs::create_dir_all(&area).unwrap();
            fs::write(area.join("f.txt"), "x").unwrap();
        }
        let plugin = RecentActivityPlugin::new(dir.path());
        let data = plugin.discover().unwrap();
        assert_eq!(data["recent_activity"].as_array().unwrap().len(), 10);
        assert_eq!(data["active_areas"].as_array().unwrap().len(), 5);

        let section = plugin.format_section(&data).unwrap().unwrap();
        assert_eq!(section.content.matches("\n- ").count(), 5);
    }

    #[test]
    fn nothing_recent_means_no_fragment() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("old.txt"), "x").unwrap();
        let plugin = RecentActivityPlugin::new(dir.path()).with_window(Duration::ZERO);
        std::thread::sleep(Duration::from_millis(20));
        let data = plugin.discover().unwrap();
        assert!(plugin.format_section(&data).unwrap().is_none());
    }
}
