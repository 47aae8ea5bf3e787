//! Per-ticket feedback cycle.
//!
//! A cycle is strictly sequential and terminal on the first hard failure:
//!
//! 1. fetch ticket -> resolve PR -> fetch PR details
//! 2. resolve watermark, filter, gate
//! 3. clone / switch branch / pull
//! 4. per group (general first, then by path): prompt -> generate -> parse
//! 5. one commit, one push
//! 6. reply dispatch (best effort)
//! 7. watermark advance (best effort, only after 3-5 succeeded)
//!
//! A failed cycle leaves the watermark untouched, so the next poll re-derives
//! it and starts over.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::collaborators::{CoAuthor, CodeGenerator, CodeHost, TicketStore, WorkingCopy};
use super::dispatch::{ReplyTally, dispatch_replies};
use crate::errors::CycleError;
use crate::feedback::{
    GroupedFeedbackData, LoopGuard, PrDetails, PullRequestRef, ResponseMap, filter_new_comments,
    filter_new_reviews, group_feedback, parse_responses, render_marker_comment, render_prompt,
    resolve_watermark, should_trigger, zero_watermark,
};

/// Runtime settings of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Login the pipeline posts as.
    pub identity: String,
    /// Marker prefix of watermark comments.
    pub marker: String,
    pub known_bots: Vec<String>,
    pub max_thread_depth: usize,
    /// Parent directory of per-ticket working trees.
    pub workspace_root: PathBuf,
    /// Ticket custom field holding the PR URL.
    pub pr_url_field: String,
}

/// Why a cycle ended without error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The ticket has no PR URL (legacy ticket).
    NoPullRequest,
    /// The PR URL could not be parsed.
    InvalidPullRequestUrl { url: String },
    /// The PR's head fork no longer exists.
    ForkDeleted,
    /// Nothing new since the watermark warrants a cycle.
    NoNewFeedback,
    Processed(CycleReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub groups_processed: Vec<String>,
    /// Groups whose generator output was empty.
    pub groups_skipped: Vec<String>,
    pub responses: usize,
    pub replies: ReplyTally,
    pub watermark_advanced: bool,
}

/// Working-tree directory name for a ticket key.
///
/// Never resolves to the workspace root or its parent (`""`, `"."`, `".."`).
pub fn workdir_name(ticket_key: &str) -> String {
    let name: String = ticket_key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect();
    if name.chars().all(|c| c == '.') {
        return "-".repeat(name.len().max(1));
    }
    name
}

/// Commit message spanning every group's edits.
pub fn commit_message(ticket_key: &str, item_count: usize, skipped: &[String]) -> String {
    let mut message = format!("{}: address PR review feedback\n\n", ticket_key);
    message.push_str(&format!(
        "Addressed {} feedback item{}.",
        item_count,
        if item_count == 1 { "" } else { "s" }
    ));
    if !skipped.is_empty() {
        message.push_str(&format!(
            "\n\nSkipped groups (no generator output): {}",
            skipped.join(", ")
        ));
    }
    message
}

struct AppliedFeedback {
    responses: ResponseMap,
    processed: Vec<String>,
    skipped: Vec<String>,
}

/// Drives one feedback cycle per ticket against the collaborators.
pub struct FeedbackPipeline {
    tickets: Arc<dyn TicketStore>,
    host: Arc<dyn CodeHost>,
    repo: Arc<dyn WorkingCopy>,
    generator: Arc<dyn CodeGenerator>,
    settings: PipelineSettings,
}

impl FeedbackPipeline {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        host: Arc<dyn CodeHost>,
        repo: Arc<dyn WorkingCopy>,
        generator: Arc<dyn CodeGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            tickets,
            host,
            repo,
            generator,
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn workdir_for(&self, ticket_key: &str) -> PathBuf {
        self.settings.workspace_root.join(workdir_name(ticket_key))
    }

    /// Run one full cycle for `ticket_key`.
    #[instrument(skip(self, ticket_key), fields(ticket = %ticket_key))]
    pub async fn process_ticket(&self, ticket_key: &str) -> Result<CycleOutcome, CycleError> {
        let ticket = self
            .tickets
            .get_ticket(ticket_key)
            .await
            .map_err(|source| CycleError::TicketFetch {
                ticket: ticket_key.to_string(),
                source,
            })?;

        let Some(url) = ticket.pr_url(&self.settings.pr_url_field) else {
            debug!("Ticket has no pull request URL");
            return Ok(CycleOutcome::NoPullRequest);
        };
        let Some(pr) = PullRequestRef::parse(url) else {
            warn!(url, "Unrecognised pull request URL");
            return Ok(CycleOutcome::InvalidPullRequestUrl {
                url: url.to_string(),
            });
        };

        let details = self
            .host
            .get_pr_details(&pr)
            .await
            .map_err(|source| CycleError::PrFetch {
                ticket: ticket_key.to_string(),
                pr: pr.to_string(),
                source,
            })?;

        let identity = self.settings.identity.as_str();
        let watermark = self.current_watermark(&pr).await;

        let new_reviews = filter_new_reviews(&details.reviews, identity, watermark);
        let new_comments = filter_new_comments(&details.comments, identity, watermark);
        if !should_trigger(&new_reviews, &new_comments, identity) {
            debug!(%pr, "No actionable feedback since watermark");
            return Ok(CycleOutcome::NoNewFeedback);
        }

        let Some(clone_url) = details.head_clone_url.as_deref() else {
            warn!(%pr, "Head repository is gone (deleted fork?), nothing to do");
            return Ok(CycleOutcome::ForkDeleted);
        };

        let grouped = group_feedback(&details.reviews, &details.comments, identity, watermark);
        if grouped.is_empty() {
            debug!(%pr, "Feedback contained no actionable text");
            return Ok(CycleOutcome::NoNewFeedback);
        }
        info!(
            %pr,
            items = grouped.total_items(),
            groups = grouped.groups.len(),
            "Processing new review feedback"
        );

        let dir = self.workdir_for(ticket_key);
        let branch = details.head_ref.as_str();
        self.prepare_checkout(ticket_key, clone_url, &dir, branch).await?;

        let applied = self.apply_groups(ticket_key, &details, &grouped, &dir).await?;

        let co_author = ticket.assignee.as_ref().map(|a| CoAuthor {
            name: a.name.clone(),
            email: a.email.clone(),
        });
        let message = commit_message(ticket_key, grouped.total_items(), &applied.skipped);
        self.repo
            .commit_changes(&dir, &message, co_author.as_ref())
            .await
            .map_err(|source| CycleError::Commit {
                ticket: ticket_key.to_string(),
                source,
            })?;
        self.repo
            .push_changes(&dir, branch, &details.head_owner, &pr.repo)
            .await
            .map_err(|source| CycleError::Push {
                ticket: ticket_key.to_string(),
                branch: branch.to_string(),
                source,
            })?;
        info!(%pr, branch, "Pushed feedback changes");

        let guard = LoopGuard::new(
            identity,
            &self.settings.known_bots,
            self.settings.max_thread_depth,
            &details.comments,
        );
        let replies = dispatch_replies(
            self.host.as_ref(),
            &pr,
            &grouped,
            &applied.responses,
            &guard,
        )
        .await;

        let watermark_advanced = self.advance_watermark(ticket_key, &pr).await;

        Ok(CycleOutcome::Processed(CycleReport {
            groups_processed: applied.processed,
            groups_skipped: applied.skipped,
            responses: applied.responses.len(),
            replies,
            watermark_advanced,
        }))
    }

    /// Resolve the watermark; a lookup failure degrades to "process everything".
    async fn current_watermark(&self, pr: &PullRequestRef) -> DateTime<Utc> {
        match self.host.list_pr_comments(pr).await {
            Ok(comments) => resolve_watermark(&comments, &self.settings.identity, &self.settings.marker),
            Err(e) => {
                warn!(%pr, error = %format!("{:#}", e), "Failed to list PR comments, processing all feedback");
                zero_watermark()
            }
        }
    }

    async fn prepare_checkout(
        &self,
        ticket_key: &str,
        clone_url: &str,
        dir: &std::path::Path,
        branch: &str,
    ) -> Result<(), CycleError> {
        self.repo
            .clone_repository(clone_url, dir)
            .await
            .map_err(|source| CycleError::Clone {
                ticket: ticket_key.to_string(),
                url: clone_url.to_string(),
                source,
            })?;
        self.repo
            .switch_to_branch(dir, branch)
            .await
            .map_err(|source| CycleError::Branch {
                ticket: ticket_key.to_string(),
                branch: branch.to_string(),
                source,
            })?;
        self.repo
            .pull_changes(dir, branch)
            .await
            .map_err(|source| CycleError::Pull {
                ticket: ticket_key.to_string(),
                branch: branch.to_string(),
                source,
            })
    }

    async fn apply_groups(
        &self,
        ticket_key: &str,
        details: &PrDetails,
        grouped: &GroupedFeedbackData,
        dir: &std::path::Path,
    ) -> Result<AppliedFeedback, CycleError> {
        let mut applied = AppliedFeedback {
            responses: ResponseMap::new(),
            processed: Vec::new(),
            skipped: Vec::new(),
        };

        for group in grouped.groups.values() {
            let label = group.label().to_string();
            let prompt = render_prompt(details, group, &grouped.summary);

            debug!(group = %label, items = group.len(), "Invoking code generator");
            let output = self
                .generator
                .generate_code(&prompt, dir)
                .await
                .map_err(|source| CycleError::Generate {
                    ticket: ticket_key.to_string(),
                    group: label.clone(),
                    source,
                })?;

            if output.trim().is_empty() {
                warn!(group = %label, "Code generator returned no output, skipping group");
                applied.skipped.push(label);
                continue;
            }

            let parsed = parse_responses(&output, &group.ids());
            debug!(group = %label, responses = parsed.len(), "Parsed generator responses");
            applied.responses.extend(parsed);
            applied.processed.push(label);
        }

        Ok(applied)
    }

    /// Post a fresh marker comment. Returns whether it was posted.
    async fn advance_watermark(&self, ticket_key: &str, pr: &PullRequestRef) -> bool {
        let redact = match self.tickets.has_security_level(ticket_key).await {
            Ok(secured) => secured,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Security level lookup failed, redacting marker");
                true
            }
        };
        let body = render_marker_comment(&self.settings.marker, Utc::now(), redact);
        match self.host.add_pr_comment(pr, &body).await {
            Ok(()) => {
                debug!(%pr, redact, "Advanced watermark");
                true
            }
            Err(e) => {
                warn!(%pr, error = %format!("{:#}", e), "Failed to advance watermark");
                false
            }
        }
    }
}
