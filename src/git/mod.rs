//! Git operations module
//!
//! Provides:
//! - Repository access (stage, remove, dated commits)
//! - Working tree change classification
//! - Commit history reading

pub mod changes;
pub mod commits;
pub mod repo;

pub use changes::{collect_changes, filter_by_path, print_changes, strip_quotes, ChangeSet};
pub use commits::{get_recent_commits, print_commit_summary, CommitInfo};
pub use repo::GitRepo;
