//! git-backfill - per-file commits with backfilled dates
//!
//! A library for committing pending changes one file at a time:
//! - Change classification (added, modified, deleted, untracked)
//! - Commit dates spread across the days since the last commit
//! - Optional AI-generated commit messages with a template fallback

pub mod ai;
pub mod committer;
pub mod config;
pub mod dates;
pub mod git;

pub use committer::{backfill_dates, plan, ChangeAction, CommitReport, Committer, PendingChange};
pub use config::{AiOverrides, Config};
pub use git::{ChangeSet, GitRepo};
