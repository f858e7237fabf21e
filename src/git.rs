//! Read-only repository queries shared by the context plugins and hooks

use git2::{Repository, Sort, StatusOptions};
use std::path::Path;

/// Open the repository rooted at `root`. Parent directories are not searched.
pub fn open(root: &Path) -> anyhow::Result<Repository> {
    Ok(Repository::open(root)?)
}

/// Current branch name, or "unknown" when detached or unborn.
pub fn current_branch(repo: &Repository) -> String {
    match repo.head() {
        Ok(head) if head.is_branch() => head.shorthand().unwrap_or("unknown").to_string(),
        _ => "unknown".to_string(),
    }
}

/// Number of paths with any change, untracked files included.
pub fn changed_path_count(repo: &Repository) -> anyhow::Result<usize> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true);
    opts.include_ignored(false);
    opts.include_unmodified(false);
    opts.recurse_untracked_dirs(true);
    opts.exclude_submodules(true);

    let statuses = repo.statuses(Some(&mut opts))?;
    Ok(statuses.iter().filter(|entry| entry.path().is_some()).count())
}

/// Up to `limit` commits from HEAD as `"<short-hash> <subject>"`.
pub fn recent_commits(repo: &Repository, limit: usize) -> anyhow::Result<Vec<String>> {
    if repo.head().is_err() {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    revwalk.push_head()?;

    let mut lines = Vec::new();
    for oid in revwalk.take(limit) {
        let commit = repo.find_commit(oid?)?;
        let short = commit.as_object().short_id()?;
        let short = short.as_str().unwrap_or_default().to_string();
        lines.push(format!("{} {}", short, commit.summary().unwrap_or_default()));
    }
    Ok(lines)
}

pub fn origin_url(repo: &Repository) -> Option<String> {
    let remote = repo.find_remote("origin").ok()?;
    remote.url().map(str::to_string)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_repository_has_no_commits() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        assert_eq!(current_branch(&repo), "unknown");
        assert!(recent_commits(&repo, 5).unwrap().is_empty());
        assert_eq!(origin_url(&repo), None);
    }

    #[test]
    fn reads_branch_status_and_log() {
        let dir = tempfile::tempdir().unwrap();
        let repo = fixtures::repo_with_commits(dir.path(), &["first", "second"]);
        std::fs::write(dir.path().join("untracked.txt"), "x").unwrap();

        assert_ne!(current_branch(&repo), "unknown");
        assert_eq!(changed_path_count(&repo).unwrap(), 1);

        let log = recent_commits(&repo, 5).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log[0].ends_with(" second"));
        assert!(log[0].split(' ').next().unwrap().len() >= 7);
    }

    #[test]
    fn reads_origin_url() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://example.com/acme/app.git").unwrap();
        assert_eq!(
            origin_url(&repo).as_deref(),
            Some("https://example.com/acme/app.git")
        );
    }
}
