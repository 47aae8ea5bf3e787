//! Contracts for the external systems the pipeline drives.
//!
//! Transports live outside this crate; tests use in-memory doubles.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::feedback::{PrDetails, PullRequestRef, ReviewComment, Ticket};

/// Issue tracker access.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get_ticket(&self, key: &str) -> Result<Ticket>;

    /// Whether the ticket carries a non-default security classification.
    async fn has_security_level(&self, key: &str) -> Result<bool>;
}

/// Code host access (pull requests and their comments).
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn get_pr_details(&self, pr: &PullRequestRef) -> Result<PrDetails>;

    /// General (conversation) comments; marker comments live here.
    async fn list_pr_comments(&self, pr: &PullRequestRef) -> Result<Vec<ReviewComment>>;

    async fn add_pr_comment(&self, pr: &PullRequestRef, body: &str) -> Result<()>;

    async fn reply_to_pr_comment(&self, pr: &PullRequestRef, parent_id: i64, body: &str) -> Result<()>;
}

/// Commit co-author trailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoAuthor {
    pub name: String,
    pub email: String,
}

/// Local checkout of the PR's head branch.
#[async_trait]
pub trait WorkingCopy: Send + Sync {
    async fn clone_repository(&self, url: &str, dir: &Path) -> Result<()>;

    async fn switch_to_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    async fn pull_changes(&self, dir: &Path, branch: &str) -> Result<()>;

    async fn commit_changes(&self, dir: &Path, message: &str, co_author: Option<&CoAuthor>) -> Result<()>;

    async fn push_changes(&self, dir: &Path, branch: &str, fork_owner: &str, repo: &str) -> Result<()>;
}

/// AI code generation backend.
///
/// Called once per feedback group against the shared, evolving working tree.
/// Returns the generator's free-text output.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate_code(&self, prompt: &str, repo_dir: &Path) -> Result<String>;
}
