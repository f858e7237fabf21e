//! Builtin context plugins

mod activity;
mod commands;
mod environment;
mod git;
mod health;
mod mcp_servers;
mod package_manager;
mod project_type;

pub use activity::RecentActivityPlugin;
pub use commands::CommandsPlugin;
pub use environment::EnvironmentPlugin;
pub use git::GitPlugin;
pub use health::HealthCheckPlugin;
pub use mcp_servers::McpServersPlugin;
pub use package_manager::PackageManagerPlugin;
pub use project_type::ProjectTypePlugin;

use std::fs;
use std::path::Path;

use super::plugin::ContextPlugin;
use super::settings::UpdaterSettings;

/// The fixed plugin set, before applicability filtering.
pub fn builtin(settings: &UpdaterSettings) -> Vec<Box<dyn ContextPlugin>> {
    let root = settings.project_root.as_path();
    vec![
        Box::new(GitPlugin::new(root)),
        Box::new(ProjectTypePlugin::new(root)),
        Box::new(PackageManagerPlugin::new(root)),
        Box::new(EnvironmentPlugin::new(root)),
        Box::new(CommandsPlugin::new(root)),
        Box::new(HealthCheckPlugin::new(root)),
        Box::new(McpServersPlugin::new(root, settings.mcp_config_files.clone())),
        Box::new(RecentActivityPlugin::new(root)),
    ]
}

/// Parse `package.json` under `root`; absent or malformed reads as `None`.
pub(crate) fn read_package_json(root: &Path) -> Option<serde_json::Value> {
    let content = fs::read_to_string(root.join("package.json")).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!("Failed to parse package.json: {}", err);
            None
        }
    }
}
