//! Commit history reading

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use colored::Colorize;

use super::repo::{git_time_to_datetime, GitRepo};

/// Information about a commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub id: String,
    pub short_id: String,
    pub message: String,
    pub author: String,
    pub author_time: DateTime<FixedOffset>,
    pub commit_time: DateTime<FixedOffset>,
}

/// Get the most recent commits reachable from HEAD, newest first
pub fn get_recent_commits(repo: &GitRepo, limit: usize) -> Result<Vec<CommitInfo>> {
    let git = repo.inner();

    let mut commits = Vec::new();
    let mut revwalk = git.revwalk()?;
    revwalk.push_head()?;

    for oid in revwalk.take(limit) {
        let oid = oid?;
        let commit = git.find_commit(oid)?;
        let author = commit.author();
        let id = oid.to_string();

        commits.push(CommitInfo {
            short_id: id[..7].to_string(),
            id,
            message: commit.message().unwrap_or("").trim_end().to_string(),
            author: author.name().unwrap_or("Unknown").to_string(),
            author_time: git_time_to_datetime(author.when())?,
            commit_time: git_time_to_datetime(commit.committer().when())?,
        });
    }

    Ok(commits)
}

/// Print the commits created by a run, oldest first
pub fn print_commit_summary(commits: &[CommitInfo]) {
    if commits.is_empty() {
        return;
    }

    println!("\n{}", "Commits:".bold());
    for commit in commits.iter().rev() {
        println!(
            "  {} {} {} {}",
            commit.short_id.yellow(),
            commit.commit_time.format("%Y-%m-%d %H:%M:%S %z").to_string().dimmed(),
            commit.author.cyan(),
            commit.message
        );
    }
}
