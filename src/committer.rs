//! Per-file commit loop

use anyhow::Result;
use chrono::{DateTime, FixedOffset, Utc};
use colored::Colorize;
use git2::Oid;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use tracing::{debug, info, warn};

use crate::ai::{commit_message, truncate_chars, MessageGenerator, CONTEXT_LIMIT};
use crate::dates;
use crate::git::{ChangeSet, GitRepo};

/// Files at or above this size are never read for prompt context
const MAX_CONTEXT_FILE_SIZE: u64 = 10_000_000;

/// What a commit does to its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// Created, modified or untracked
    Add,
    /// Deleted
    Remove,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Remove => "rm",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One path waiting for its commit
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub path: String,
    pub action: ChangeAction,
    pub date: DateTime<FixedOffset>,
}

/// Outcome of a commit run
#[derive(Debug, Default)]
pub struct CommitReport {
    pub committed: Vec<Oid>,
    pub skipped: Vec<String>,
}

/// Commit dates for `count` changes, from the latest commit up to now
pub fn backfill_dates(repo: &GitRepo, count: usize) -> Result<Vec<DateTime<FixedOffset>>> {
    let latest = repo.head_time()?;
    let now = Utc::now().with_timezone(latest.offset());

    let dates = dates::generate(latest, now, count);

    info!("latest commit date: {}", latest);
    info!("today: {}", now);
    info!(
        "commit dates: {} ({} days, {} files)",
        dates.len(),
        dates::day_span(latest, now),
        count
    );

    Ok(dates)
}

/// Pair every change with a date: earliest dates go to added, then modified,
/// deleted and finally untracked paths
pub fn plan(changes: &ChangeSet, mut dates: Vec<DateTime<FixedOffset>>) -> Result<Vec<PendingChange>> {
    if dates.len() != changes.total() {
        anyhow::bail!(
            "Got {} commit dates for {} changes",
            dates.len(),
            changes.total()
        );
    }

    dates.sort();

    let ordered = changes
        .added
        .iter()
        .chain(&changes.modified)
        .map(|p| (p, ChangeAction::Add))
        .chain(changes.deleted.iter().map(|p| (p, ChangeAction::Remove)))
        .chain(changes.untracked.iter().map(|p| (p, ChangeAction::Add)));

    Ok(ordered
        .zip(dates)
        .map(|((path, action), date)| PendingChange {
            path: path.clone(),
            action,
            date,
        })
        .collect())
}

pub struct Committer<'a, G> {
    repo: &'a GitRepo,
    generator: Option<&'a G>,
}

impl<'a, G: MessageGenerator> Committer<'a, G> {
    pub fn new(repo: &'a GitRepo, generator: Option<&'a G>) -> Self {
        Self { repo, generator }
    }

    /// Commit every change individually, oldest date first
    pub async fn commit_all(
        &self,
        changes: &ChangeSet,
        dates: Vec<DateTime<FixedOffset>>,
    ) -> Result<CommitReport> {
        let pending = plan(changes, dates)?;
        let mut report = CommitReport::default();

        println!(
            "\n{} {} file(s) to commit\n",
            "→".blue(),
            pending.len()
        );

        for change in &pending {
            match self.commit_one(change).await? {
                Some(oid) => report.committed.push(oid),
                None => report.skipped.push(change.path.clone()),
            }
        }

        Ok(report)
    }

    /// Stage or remove one path and commit it at its date.
    ///
    /// Returns `None` when the path is a nested repository and was skipped.
    pub async fn commit_one(&self, change: &PendingChange) -> Result<Option<Oid>> {
        let path = change.path.as_str();
        info!("commit {}: {} at {}", change.action, path, change.date);

        if self.repo.is_nested_repo(path) {
            warn!("skip git directory: {}", path);
            return Ok(None);
        }

        let context = match change.action {
            ChangeAction::Add => {
                let context = self.capture_context(path)?;
                self.repo.add(path)?;
                context
            }
            ChangeAction::Remove => {
                self.repo.remove(path)?;
                None
            }
        };

        if let Some(ref context) = context {
            debug!("\n{}", context);
        }

        let message = commit_message(
            self.generator,
            change.action.as_str(),
            path,
            context.as_deref(),
        )
        .await;
        info!("commit message: {}", message);

        let oid = self.repo.commit_at(&message, change.date)?;

        println!(
            "  {} {} {}",
            "✓".green(),
            change.date.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
            message
        );

        Ok(Some(oid))
    }

    /// Unstaged diff for the path, or the file itself when it is small and textual
    fn capture_context(&self, path: &str) -> Result<Option<String>> {
        if self.generator.is_none() {
            return Ok(None);
        }

        let context = match self.repo.unstaged_patch(path)? {
            Some(patch) => Some(patch),
            None => read_text_file(&self.repo.workdir()?.join(path)),
        };

        Ok(context.map(|c| truncate_chars(&c, CONTEXT_LIMIT)))
    }
}

fn read_text_file(path: &std::path::Path) -> Option<String> {
    let meta = fs::metadata(path).ok()?;
    if !meta.is_file() || meta.len() >= MAX_CONTEXT_FILE_SIZE {
        return None;
    }

    let mut head = Vec::with_capacity(CONTEXT_LIMIT);
    File::open(path)
        .ok()?
        .take(CONTEXT_LIMIT as u64)
        .read_to_end(&mut head)
        .ok()?;

    if !is_textual(&head) {
        return None;
    }

    fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Heuristic text check on the first chunk of a file
fn is_textual(chunk: &[u8]) -> bool {
    if chunk.is_empty() {
        return true;
    }
    if chunk.contains(&0) {
        return false;
    }

    let non_text = chunk
        .iter()
        .filter(|&&b| {
            let text = matches!(b, 7 | 8 | 9 | 10 | 12 | 13 | 27) || (b >= 0x20 && b != 0x7f);
            !text
        })
        .count();

    non_text as f64 / chunk.len() as f64 <= 0.3
}
