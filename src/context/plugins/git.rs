use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::context::plugin::{from_record, to_record, ContextPlugin};
use crate::context::{Record, SectionData};
use crate::git;

#[derive(Debug, Serialize, Deserialize)]
struct GitFacts {
    current_branch: String,
    modified_files: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    recent_commits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repository_url: Option<String>,
}

/// Branch, dirty count, recent log and origin of the project repository.
pub struct GitPlugin {
    root: PathBuf,
}

impl GitPlugin {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ContextPlugin for GitPlugin {
    fn name(&self) -> &'static str {
        "GitPlugin"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn is_applicable(&self) -> bool {
        self.root.join(".git").exists()
    }

    fn discover(&self) -> anyhow::Result<Record> {
        let repo = git::open(&self.root)?;
        let modified_files = git::changed_path_count(&repo).unwrap_or_else(|err| {
            tracing::debug!("git status failed: {:#}", err);
            0
        });
        let recent_commits = git::recent_commits(&repo, 5).unwrap_or_else(|err| {
            tracing::debug!("git log failed: {:#}", err);
            Vec::new()
        });

        to_record(&GitFacts {
            current_branch: git::current_branch(&repo),
            modified_files,
            recent_commits,
            repository_url: git::origin_url(&repo),
        })
    }

    fn format_section(&self, data: &Record) -> anyhow::Result<Option<SectionData>> {
        let facts: GitFacts = from_record(data)?;
        let mut lines = vec!["## 📊 Git Repository Status\n".to_string()];
        lines.push(format!("**Branch**: `{}`", facts.current_branch));
        lines.push(format!("**Modified Files**: {}", facts.modified_files));
        if let Some(url) = &facts.repository_url {
            lines.push(format!("**Repository**: {}", url));
        }

        if !facts.recent_commits.is_empty() {
            lines.push("\n### Recent Commits".to_string());
            for commit in facts.recent_commits.iter().take(5) {
                lines.push(format!("- {}", commit));
            }
        }

        Ok(Some(SectionData::new(
            "git_status",
            "Git Repository Status",
            lines.join("\n"),
            10,
        )))
    }
}
