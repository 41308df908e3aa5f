//! Repository operations used by the committer

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use git2::{DiffFormat, DiffOptions, Oid, Repository, Signature, Time};
use std::path::{Path, PathBuf};

/// Thin wrapper around a git2 repository
pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open a repository at the given path
    pub fn open(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .with_context(|| format!("Failed to find git repository at {}", path.display()))?;

        if repo.is_bare() {
            anyhow::bail!("Repository at {} has no working tree", path.display());
        }

        Ok(Self { repo })
    }

    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Root of the working tree
    pub fn workdir(&self) -> Result<PathBuf> {
        let workdir = self
            .repo
            .workdir()
            .context("Repository has no working tree")?;

        Ok(workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf()))
    }

    /// Committer time of HEAD, in the offset it was recorded with
    pub fn head_time(&self) -> Result<DateTime<FixedOffset>> {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .context("Repository has no commits yet")?;

        let when = head.committer().when();
        git_time_to_datetime(when)
    }

    /// Check whether a path inside the working tree is itself a git repository
    pub fn is_nested_repo(&self, path: &str) -> bool {
        self.repo
            .workdir()
            .map(|w| w.join(path).join(".git").is_dir())
            .unwrap_or(false)
    }

    /// Stage a path
    pub fn add(&self, path: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        index
            .add_path(Path::new(path))
            .with_context(|| format!("Failed to stage {}", path))?;
        index.write()?;
        Ok(())
    }

    /// Remove a path from the index
    pub fn remove(&self, path: &str) -> Result<()> {
        let mut index = self.repo.index()?;
        index
            .remove_path(Path::new(path))
            .with_context(|| format!("Failed to remove {} from the index", path))?;
        index.write()?;
        Ok(())
    }

    /// Commit the current index on top of HEAD, with both author and committer dated `when`
    pub fn commit_at(&self, message: &str, when: DateTime<FixedOffset>) -> Result<Oid> {
        let default_sig = self
            .repo
            .signature()
            .context("No git identity configured (set user.name and user.email)")?;
        let time = Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);

        let name = default_sig.name().unwrap_or("Unknown");
        let email = default_sig.email().unwrap_or("");
        let signature = Signature::new(name, email, &time)?;

        let mut index = self.repo.index()?;
        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;
        let parent = self.repo.head()?.peel_to_commit()?;

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])
            .context("Failed to create commit")?;

        Ok(oid)
    }

    /// Unstaged patch text for one path, or `None` if the index and working tree agree
    pub fn unstaged_patch(&self, path: &str) -> Result<Option<String>> {
        let mut opts = DiffOptions::new();
        opts.pathspec(path).disable_pathspec_match(true);

        let diff = self.repo.diff_index_to_workdir(None, Some(&mut opts))?;

        let mut patch = Vec::new();
        diff.print(DiffFormat::Patch, |_, _, line| {
            match line.origin() {
                '+' | '-' | ' ' => patch.push(line.origin() as u8),
                _ => {}
            }
            patch.extend_from_slice(line.content());
            true
        })?;

        if patch.is_empty() {
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&patch).into_owned()))
    }
}

/// Convert a git timestamp into a chrono datetime in the recorded offset
pub fn git_time_to_datetime(time: Time) -> Result<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)
        .with_context(|| format!("Invalid timezone offset: {} minutes", time.offset_minutes()))?;

    let utc = DateTime::from_timestamp(time.seconds(), 0)
        .with_context(|| format!("Invalid commit timestamp: {}", time.seconds()))?;

    Ok(utc.with_timezone(&offset))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Init a repository with an identity and one commit of `README.md` at `when`
    pub fn init_repo(when: DateTime<FixedOffset>) -> (TempDir, GitRepo) {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
        }

        fs::write(dir.path().join("README.md"), "# test\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("README.md")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let time = Time::new(when.timestamp(), when.offset().local_minus_utc() / 60);
        let sig = Signature::new("Test User", "test@example.com", &time).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).unwrap();
        drop(tree);

        (dir, GitRepo { repo })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::init_repo;
    use super::*;
    use std::fs;

    fn at(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn test_head_time_keeps_offset() {
        let when = at("2024-05-02T08:30:00+05:30");
        let (_dir, repo) = init_repo(when);

        let head = repo.head_time().unwrap();
        assert_eq!(head, when);
        assert_eq!(head.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
    }

    #[test]
    fn test_commit_at_sets_both_dates() {
        let (dir, repo) = init_repo(at("2024-05-01T00:00:00+00:00"));
        fs::write(dir.path().join("notes.txt"), "hello\n").unwrap();

        let when = at("2024-05-03T12:00:00-04:00");
        repo.add("notes.txt").unwrap();
        let oid = repo.commit_at("chore add notes.txt", when).unwrap();

        let commit = repo.inner().find_commit(oid).unwrap();
        assert_eq!(commit.message(), Some("chore add notes.txt"));
        assert_eq!(git_time_to_datetime(commit.author().when()).unwrap(), when);
        assert_eq!(git_time_to_datetime(commit.committer().when()).unwrap(), when);
        assert_eq!(repo.head_time().unwrap(), when);
        assert_eq!(commit.parent_count(), 1);
    }

    #[test]
    fn test_remove_stages_deletion() {
        let (dir, repo) = init_repo(at("2024-05-01T00:00:00+00:00"));
        fs::remove_file(dir.path().join("README.md")).unwrap();

        repo.remove("README.md").unwrap();
        let oid = repo.commit_at("chore rm README.md", at("2024-05-02T00:00:00+00:00")).unwrap();

        let tree = repo.inner().find_commit(oid).unwrap().tree().unwrap();
        assert!(tree.get_name("README.md").is_none());
    }

    #[test]
    fn test_unstaged_patch() {
        let (dir, repo) = init_repo(at("2024-05-01T00:00:00+00:00"));
        assert!(repo.unstaged_patch("README.md").unwrap().is_none());

        fs::write(dir.path().join("README.md"), "# test\nmore\n").unwrap();
        let patch = repo.unstaged_patch("README.md").unwrap().unwrap();
        assert!(patch.contains("+more"));
    }

    #[test]
    fn test_is_nested_repo() {
        let (dir, repo) = init_repo(at("2024-05-01T00:00:00+00:00"));
        Repository::init(dir.path().join("vendor/lib")).unwrap();
        fs::create_dir_all(dir.path().join("plain")).unwrap();

        assert!(repo.is_nested_repo("vendor/lib/"));
        assert!(!repo.is_nested_repo("plain"));
        assert!(!repo.is_nested_repo("README.md"));
    }
}
