use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};

const ENV_FILES: &[&str] = &[".env", ".env.local", ".env.production", ".env.development"];

const SERVICE_PATTERNS: &[(&str, &str)] = &[
    (r"DATABASE_URL|DB_", "Database"),
    (r"REDIS_", "Redis"),
    (r"SMTP_|MAIL_", "Email"),
    (r"AWS_", "AWS"),
    (r"STRIPE_", "Stripe"),
    (r"TWILIO_", "Twilio"),
    (r"SENDGRID_", "SendGrid"),
    (r"CLOUDINARY_", "Cloudinary"),
    (r"FIREBASE_", "Firebase"),
    (r"SUPABASE_", "Supabase"),
    (r"OPENAI_", "OpenAI"),
    (r"GITHUB_", "GitHub"),
    (r"GOOGLE_", "Google"),
    (r"AIRTABLE_", "Airtable"),
    (r"TURSO_", "Turso"),
];

fn service_table() -> &'static [(Regex, &'static str)] {
    static TABLE: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    TABLE.get_or_init(|| {
        SERVICE_PATTERNS
            .iter()
            .map(|(pattern, service)| {
                let re = Regex::new(&format!("(?i){}", pattern)).expect("valid regex");
                (re, *service)
            })
            .collect()
    })
}

/// Services referenced by the variables in one env file's content.
pub(crate) fn detect_services(content: &str) -> Vec<&'static str> {
    service_table()
        .iter()
        .filter(|(re, _)| re.is_match(content))
        .map(|(_, service)| *service)
        .collect()
}

#[derive(Debug, Serialize, Deserialize)]
struct EnvironmentFacts {
    env_files: Vec<String>,
    services: Vec<String>,
}

/// Env files anywhere in the tree and the services they configure.
pub struct EnvironmentPlugin {
    root: PathBuf,
}

impl EnvironmentPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn env_files(&self) -> Vec<PathBuf> {
        let mut found: Vec<(usize, PathBuf)> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                let name = e.file_name().to_string_lossy();
                !(e.file_type().is_dir() && (name == "node_modules" || name == ".git"))
            })
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rank = ENV_FILES
                    .iter()
                    .position(|env| e.file_name().to_str() == Some(*env))?;
                Some((rank, e.into_path()))
            })
            .collect();
        found.sort();
        found.into_iter().map(|(_, path)| path).collect()
    }
}

impl ContextPlugin for EnvironmentPlugin {
    fn name(&self) -> &'static str {
        "EnvironmentPlugin"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let mut env_files = Vec::new();
        let mut services = BTreeSet::new();

        for path in self.env_files() {
            let rel = path.strip_prefix(&self.root).unwrap_or(&path);
            env_files.push(rel.to_string_lossy().to_string());
            match fs::read_to_string(&path) {
                Ok(content) => services.extend(detect_services(&content)),
                Err(err) => tracing::debug!("Skipping {}: {}", path.display(), err),
            }
        }

        to_record(&EnvironmentFacts {
            env_files,
            services: services.into_iter().map(str::to_string).collect(),
        })
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: EnvironmentFacts = from_record(data)?;
        if facts.env_files.is_empty() && facts.services.is_empty() {
            return Ok(None);
        }

        let mut lines = vec!["## 🔧 Environment & Services\n".to_string()];
        if !facts.env_files.is_empty() {
            lines.push(format!("**Config Files**: {}", facts.env_files.len()));
        }
        if !facts.services.is_empty() {
            lines.push(format!("**Services**: {}", facts.services.join(", ")));
        }

        Ok(Some(SectionData::new(
            "environment",
            "Environment & Services",
            lines.join("\n"),
            30,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn matches_service_patterns_case_insensitively() {
        assert_eq!(detect_services("database_url=x\nredis_host=y"), vec!["Database", "Redis"]);
        assert!(detect_services("PORT=3000").is_empty());
    }

    #[test]
    fn finds_env_files_outside_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("apps/web")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join(".env"), "TURSO_DATABASE_URL=x\nSTRIPE_KEY=y\n").unwrap();
        fs::write(root.join("apps/web/.env.local"), "CLOUDINARY_CLOUD_NAME=z\nSTRIPE_KEY=y\n").unwrap();
        fs::write(root.join("node_modules/pkg/.env"), "OPENAI_API_KEY=nope\n").unwrap();
        fs::write(root.join(".env.example"), "AWS_KEY=nope\n").unwrap();

        let plugin = EnvironmentPlugin::new(root);
        let data = plugin.discover().unwrap();
        assert_eq!(data["env_files"], json!([".env", "apps/web/.env.local"]));
        assert_eq!(
            data["services"],
            json!(["Cloudinary", "Database", "Stripe", "Turso"])
        );

        let section = plugin.format_section(&data).unwrap().unwrap();
        assert_eq!(
            section.content,
            "## 🔧 Environment & Services\n\n**Config Files**: 2\n**Services**: Cloudinary, Database, Stripe, Turso"
        );
    }

    #[test]
    fn nothing_found_means_no_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = EnvironmentPlugin::new(dir.path());
        let data = plugin.discover().unwrap();
        assert!(plugin.format_section(&data).unwrap().is_none());
    }
}
