//! New-feedback filtering and the trigger gate.

use chrono::{DateTime, Utc};

use super::models::{Review, ReviewComment, ReviewState, same_login};

/// Reviews not authored by `identity` and submitted strictly after `watermark`.
pub fn filter_new_reviews<'a>(
    reviews: &'a [Review],
    identity: &str,
    watermark: DateTime<Utc>,
) -> Vec<&'a Review> {
    reviews
        .iter()
        .filter(|r| !same_login(&r.author, identity) && r.submitted_at > watermark)
        .collect()
}

/// Comments not authored by `identity` and created strictly after `watermark`.
pub fn filter_new_comments<'a>(
    comments: &'a [ReviewComment],
    identity: &str,
    watermark: DateTime<Utc>,
) -> Vec<&'a ReviewComment> {
    comments
        .iter()
        .filter(|c| !same_login(&c.author, identity) && c.created_at > watermark)
        .collect()
}

/// Whether the filtered feedback warrants a processing cycle.
///
/// Approvals and plain review summaries alone never trigger; a change request
/// or any new comment does.
pub fn should_trigger(new_reviews: &[&Review], new_comments: &[&ReviewComment], identity: &str) -> bool {
    let changes_requested = new_reviews
        .iter()
        .any(|r| r.state == ReviewState::ChangesRequested && !same_login(&r.author, identity));
    changes_requested || !new_comments.is_empty()
}
