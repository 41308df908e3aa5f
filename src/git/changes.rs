//! Working tree change classification

use anyhow::Result;
use colored::{Color, Colorize};
use git2::{Delta, DiffOptions};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

use super::repo::GitRepo;

/// Pending changes bucketed by kind, in discovery order
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
    pub untracked: Vec<String>,
}

impl ChangeSet {
    pub fn total(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len() + self.untracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Bucket a path by its delta code; the first bucket to claim a path keeps it
    fn record(&mut self, seen: &mut HashSet<String>, status: Delta, path: String) {
        if !seen.insert(path.clone()) {
            return;
        }

        match status {
            Delta::Added => self.added.push(path),
            Delta::Modified => self.modified.push(path),
            Delta::Deleted => self.deleted.push(path),
            Delta::Untracked => self.untracked.push(path),
            other => warn!("unknown change type {:?}: {}", other, path),
        }
    }

    /// Keep only the paths accepted by `keep`
    pub fn retain(&self, keep: impl Fn(&str) -> bool) -> ChangeSet {
        let pick = |bucket: &Vec<String>| -> Vec<String> {
            bucket.iter().filter(|p| keep(p.as_str())).cloned().collect()
        };

        ChangeSet {
            added: pick(&self.added),
            modified: pick(&self.modified),
            deleted: pick(&self.deleted),
            untracked: pick(&self.untracked),
        }
    }
}

/// Collect staged, unstaged and untracked changes
pub fn collect_changes(repo: &GitRepo) -> Result<ChangeSet> {
    let git = repo.inner();
    let mut changes = ChangeSet::default();
    let mut seen = HashSet::new();

    // Staged: HEAD tree against the index
    let head_tree = git.head().ok().and_then(|h| h.peel_to_tree().ok());
    let staged = git.diff_tree_to_index(head_tree.as_ref(), None, None)?;
    for delta in staged.deltas() {
        if let Some(path) = delta_path(&delta) {
            changes.record(&mut seen, delta.status(), path);
        }
    }

    // Unstaged: index against the working tree, untracked files included
    let mut opts = DiffOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);
    let unstaged = git.diff_index_to_workdir(None, Some(&mut opts))?;
    for delta in unstaged.deltas() {
        if let Some(path) = delta_path(&delta) {
            changes.record(&mut seen, delta.status(), path);
        }
    }

    Ok(changes)
}

fn delta_path(delta: &git2::DiffDelta<'_>) -> Option<String> {
    delta
        .old_file()
        .path()
        .or_else(|| delta.new_file().path())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Strip one pair of surrounding double quotes
pub fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Restrict changes to a target file (exact match) or directory (prefix match)
pub fn filter_by_path(repo_root: &Path, target: &str, changes: &ChangeSet) -> ChangeSet {
    let root = repo_root
        .canonicalize()
        .unwrap_or_else(|_| repo_root.to_path_buf());

    let input = Path::new(target);
    let resolved = if input.is_absolute() {
        input.canonicalize().unwrap_or_else(|_| normalize(input))
    } else {
        normalize(&root.join(input))
    };

    let rel = match resolved.strip_prefix(&root) {
        Ok(rel) => rel.to_string_lossy().replace('\\', "/"),
        // Outside the repository: match against the raw input
        Err(_) => target.replace('\\', "/"),
    };

    let is_dir = resolved.is_dir() || target.ends_with('/') || target.ends_with('\\');
    let rel = rel.trim_end_matches('/').to_string();
    let prefix = format!("{}/", rel);

    changes.retain(|p| {
        if !is_dir {
            return p == rel;
        }
        rel.is_empty() || p == rel || p.trim_end_matches('/') == rel || p.starts_with(&prefix)
    })
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Print a colored, numbered listing of the changes
pub fn print_changes(changes: &ChangeSet) {
    if changes.is_empty() {
        println!("{}", "No changes in working directory.".bright_black());
        return;
    }

    let sections: [(&str, &str, Color, &[String]); 4] = [
        ("Untracked Files:", "?", Color::Yellow, changes.untracked.as_slice()),
        ("Added Files:", "+", Color::Green, changes.added.as_slice()),
        ("Modified Files:", "o", Color::Cyan, changes.modified.as_slice()),
        ("Deleted Files:", "-", Color::Red, changes.deleted.as_slice()),
    ];

    let mut idx = 1;
    for (header, marker, color, files) in sections {
        if files.is_empty() {
            continue;
        }

        println!("{}", header.color(color).bold());
        for file in files {
            println!("{}", format!("{:>3}. {} {}", idx, marker, file).color(color));
            idx += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::repo::test_support::init_repo;
    use chrono::DateTime;
    use std::fs;

    fn sample() -> ChangeSet {
        ChangeSet {
            added: vec!["src/a.py".to_string()],
            modified: vec!["src/b.py".to_string(), "lib/c.py".to_string()],
            deleted: vec!["src_old/d.py".to_string()],
            untracked: vec!["src/nested/e.py".to_string()],
        }
    }

    #[test]
    fn test_record_keeps_first_bucket() {
        let mut changes = ChangeSet::default();
        let mut seen = HashSet::new();

        changes.record(&mut seen, Delta::Added, "a.txt".to_string());
        changes.record(&mut seen, Delta::Modified, "a.txt".to_string());
        changes.record(&mut seen, Delta::Untracked, "b.txt".to_string());
        changes.record(&mut seen, Delta::Renamed, "c.txt".to_string());
        changes.record(&mut seen, Delta::Deleted, "b.txt".to_string());

        assert_eq!(changes.added, vec!["a.txt"]);
        assert!(changes.modified.is_empty());
        assert_eq!(changes.untracked, vec!["b.txt"]);
        assert!(changes.deleted.is_empty());
        assert_eq!(changes.total(), 2);
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"my file.txt\""), "my file.txt");
        assert_eq!(strip_quotes("plain.txt"), "plain.txt");
        assert_eq!(strip_quotes("\"half.txt"), "\"half.txt");
        assert_eq!(strip_quotes("\""), "\"");
    }

    #[test]
    fn test_filter_directory_prefix() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let filtered = filter_by_path(dir.path(), "src/", &sample());
        assert_eq!(filtered.added, vec!["src/a.py"]);
        assert_eq!(filtered.modified, vec!["src/b.py"]);
        assert!(filtered.deleted.is_empty());
        assert_eq!(filtered.untracked, vec!["src/nested/e.py"]);
    }

    #[test]
    fn test_filter_existing_directory_without_slash() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("lib")).unwrap();

        let filtered = filter_by_path(dir.path(), "lib", &sample());
        assert_eq!(filtered.total(), 1);
        assert_eq!(filtered.modified, vec!["lib/c.py"]);
    }

    #[test]
    fn test_filter_exact_file() {
        let dir = tempfile::tempdir().unwrap();

        let filtered = filter_by_path(dir.path(), "./src/../src/b.py", &sample());
        assert_eq!(filtered.total(), 1);
        assert_eq!(filtered.modified, vec!["src/b.py"]);

        // A missing directory without a trailing slash is treated as a file
        assert!(filter_by_path(dir.path(), "src", &sample()).is_empty());
    }

    #[test]
    fn test_filter_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        let target = dir.path().join("src");

        let filtered = filter_by_path(dir.path(), target.to_str().unwrap(), &sample());
        assert_eq!(filtered.total(), 3);
    }

    #[test]
    fn test_filter_repo_root_keeps_everything() {
        let dir = tempfile::tempdir().unwrap();
        let filtered = filter_by_path(dir.path(), ".", &sample());
        assert_eq!(filtered, sample());
    }

    #[test]
    fn test_filter_outside_repo_uses_raw_string() {
        let dir = tempfile::tempdir().unwrap();
        let filtered = filter_by_path(dir.path(), "/definitely/not/here/", &sample());
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_collect_changes_buckets() {
        let when = DateTime::parse_from_rfc3339("2024-05-01T00:00:00+00:00").unwrap();
        let (dir, repo) = init_repo(when);
        let root = dir.path();

        fs::write(root.join("tracked.txt"), "v1\n").unwrap();
        fs::write(root.join("gone.txt"), "bye\n").unwrap();
        repo.add("tracked.txt").unwrap();
        repo.add("gone.txt").unwrap();
        repo.commit_at("setup", when).unwrap();

        fs::write(root.join("tracked.txt"), "v2\n").unwrap();
        fs::remove_file(root.join("gone.txt")).unwrap();
        fs::write(root.join("staged.txt"), "new\n").unwrap();
        repo.add("staged.txt").unwrap();
        fs::create_dir_all(root.join("docs")).unwrap();
        fs::write(root.join("docs/guide.md"), "guide\n").unwrap();

        let changes = collect_changes(&repo).unwrap();
        assert_eq!(changes.added, vec!["staged.txt"]);
        assert_eq!(changes.modified, vec!["tracked.txt"]);
        assert_eq!(changes.deleted, vec!["gone.txt"]);
        assert_eq!(changes.untracked, vec!["docs/guide.md"]);
    }

    #[test]
    fn test_staged_then_edited_is_listed_once() {
        let when = DateTime::parse_from_rfc3339("2024-05-01T00:00:00+00:00").unwrap();
        let (dir, repo) = init_repo(when);

        fs::write(dir.path().join("README.md"), "# staged\n").unwrap();
        repo.add("README.md").unwrap();
        fs::write(dir.path().join("README.md"), "# edited again\n").unwrap();

        let changes = collect_changes(&repo).unwrap();
        assert_eq!(changes.modified, vec!["README.md"]);
        assert_eq!(changes.total(), 1);
    }

    #[test]
    fn test_clean_tree_has_no_changes() {
        let when = DateTime::parse_from_rfc3339("2024-05-01T00:00:00+00:00").unwrap();
        let (_dir, repo) = init_repo(when);

        assert!(collect_changes(&repo).unwrap().is_empty());
    }
}
