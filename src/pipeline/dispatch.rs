//! Per-item reply dispatch.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::collaborators::CodeHost;
use crate::feedback::{GroupedFeedbackData, LoopGuard, PullRequestRef, ResponseMap};

/// Outcome counts of one dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplyTally {
    pub posted: usize,
    pub failed: usize,
    /// Withheld by loop prevention.
    pub skipped: usize,
    /// Items the generator never answered.
    pub missing: usize,
}

/// Body of a general (non-threaded) reply.
pub fn mention_reply(author: &str, response: &str) -> String {
    format!("@{} {}", author, response)
}

/// Post one reply per answered feedback item.
///
/// File-anchored comments get a threaded reply; general comments and reviews
/// get a top-level comment mentioning their author. Individual failures are
/// counted, never propagated.
pub async fn dispatch_replies(
    host: &dyn CodeHost,
    pr: &PullRequestRef,
    grouped: &GroupedFeedbackData,
    responses: &ResponseMap,
    guard: &LoopGuard<'_>,
) -> ReplyTally {
    let mut tally = ReplyTally::default();

    for group in grouped.groups.values() {
        for (id, comment) in &group.comments {
            let Some(response) = responses.get(id) else {
                tally.missing += 1;
                continue;
            };

            if let Some(reason) = guard.should_skip(comment) {
                info!(%id, comment_id = comment.id, %reason, "Skipping reply (loop prevention)");
                tally.skipped += 1;
                continue;
            }

            let result = if comment.anchored_path().is_some() {
                host.reply_to_pr_comment(pr, comment.id, response).await
            } else {
                host.add_pr_comment(pr, &mention_reply(&comment.author, response))
                    .await
            };

            match result {
                Ok(()) => {
                    debug!(%id, comment_id = comment.id, "Posted reply");
                    tally.posted += 1;
                }
                Err(e) => {
                    warn!(%id, comment_id = comment.id, error = %format!("{:#}", e), "Failed to post reply");
                    tally.failed += 1;
                }
            }
        }

        for (id, review) in &group.reviews {
            let Some(response) = responses.get(id) else {
                tally.missing += 1;
                continue;
            };

            match host
                .add_pr_comment(pr, &mention_reply(&review.author, response))
                .await
            {
                Ok(()) => {
                    debug!(%id, review_id = review.id, "Posted review reply");
                    tally.posted += 1;
                }
                Err(e) => {
                    warn!(%id, review_id = review.id, error = %format!("{:#}", e), "Failed to post review reply");
                    tally.failed += 1;
                }
            }
        }
    }

    info!(
        pr = %pr,
        posted = tally.posted,
        failed = tally.failed,
        skipped = tally.skipped,
        missing = tally.missing,
        "Reply dispatch finished"
    );
    tally
}
