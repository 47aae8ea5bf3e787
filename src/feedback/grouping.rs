//! Feedback collection, synthetic ID assignment and per-file grouping.
//!
//! Grouping is a pure function of its inputs: reviews and comments are copied
//! and sorted by their host-assigned id before IDs are handed out, so two runs
//! over the same data produce identical IDs, groups and rendered text.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::{filter_new_comments, filter_new_reviews};
use super::models::{CommentLocation, Review, ReviewComment, same_login};

pub const FEEDBACK_HEADER: &str = "## Feedback To Address";
pub const NO_FEEDBACK: &str = "No new feedback.";

/// Label used for the group with no file path.
pub const GENERAL_LABEL: &str = "general";

const SUMMARY_EXCERPT_CHARS: usize = 80;
const PARENT_EXCERPT_CHARS: usize = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeedbackKind {
    Review,
    Comment,
}

impl FeedbackKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Review => "REVIEW",
            Self::Comment => "COMMENT",
        }
    }
}

/// Cycle-scoped label (`COMMENT_<n>` / `REVIEW_<n>`) correlating a feedback
/// item with the generator's response block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntheticId {
    pub kind: FeedbackKind,
    pub seq: u32,
}

impl SyntheticId {
    pub fn review(seq: u32) -> Self {
        Self {
            kind: FeedbackKind::Review,
            seq,
        }
    }

    pub fn comment(seq: u32) -> Self {
        Self {
            kind: FeedbackKind::Comment,
            seq,
        }
    }
}

impl fmt::Display for SyntheticId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind.prefix(), self.seq)
    }
}

impl FromStr for SyntheticId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, digits) = s
            .split_once('_')
            .ok_or_else(|| format!("Invalid synthetic id: {}", s))?;
        let kind = match prefix {
            "REVIEW" => FeedbackKind::Review,
            "COMMENT" => FeedbackKind::Comment,
            _ => return Err(format!("Invalid synthetic id: {}", s)),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("Invalid synthetic id: {}", s));
        }
        let seq = digits
            .parse::<u32>()
            .map_err(|e| format!("Invalid synthetic id {}: {}", s, e))?;
        Ok(Self { kind, seq })
    }
}

impl Serialize for SyntheticId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Hands out sequential IDs for one cycle. Both counters start at 1.
#[derive(Debug, Default)]
pub struct IdAllocator {
    reviews: u32,
    comments: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, kind: FeedbackKind) -> SyntheticId {
        let counter = match kind {
            FeedbackKind::Review => &mut self.reviews,
            FeedbackKind::Comment => &mut self.comments,
        };
        *counter += 1;
        SyntheticId { kind, seq: *counter }
    }
}

/// Feedback items sharing a file path (empty path = general/reviews bucket).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackGroup {
    pub path: String,
    pub reviews: BTreeMap<SyntheticId, Review>,
    pub comments: BTreeMap<SyntheticId, ReviewComment>,
    /// Markdown block handed to the code generator.
    pub rendered: String,
}

impl FeedbackGroup {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn is_general(&self) -> bool {
        self.path.is_empty()
    }

    pub fn label(&self) -> &str {
        if self.is_general() { GENERAL_LABEL } else { &self.path }
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty() && self.comments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.reviews.len() + self.comments.len()
    }

    /// Every synthetic ID in this group, reviews first.
    pub fn ids(&self) -> Vec<SyntheticId> {
        self.reviews.keys().chain(self.comments.keys()).copied().collect()
    }
}

/// Result of one grouping pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedFeedbackData {
    /// Keyed by file path; `""` is the general group and sorts first.
    pub groups: BTreeMap<String, FeedbackGroup>,
    /// Already-handled items, shared across groups as context only.
    pub summary: String,
}

impl GroupedFeedbackData {
    pub fn total_items(&self) -> usize {
        self.groups.values().map(FeedbackGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }
}

/// Collapse whitespace runs containing newlines and cap the text at `max`
/// characters (ellipsis included).
pub fn excerpt(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let keep = max.saturating_sub(3);
    let mut out: String = flat.chars().take(keep).collect();
    out.push_str("...");
    out
}

fn has_text(body: &str) -> bool {
    !body.trim().is_empty()
}

fn is_handled(author: &str, body: &str, at: DateTime<Utc>, identity: &str, watermark: DateTime<Utc>) -> bool {
    !same_login(author, identity) && at <= watermark && has_text(body)
}

/// Group the full (unfiltered) review and comment sets against `watermark`.
pub fn group_feedback(
    reviews: &[Review],
    comments: &[ReviewComment],
    identity: &str,
    watermark: DateTime<Utc>,
) -> GroupedFeedbackData {
    // Same notion of "new" as the trigger gate; empty bodies get no ID.
    let mut new_reviews = filter_new_reviews(reviews, identity, watermark);
    new_reviews.retain(|r| has_text(&r.body));
    new_reviews.sort_by_key(|r| r.id);
    let mut new_comments = filter_new_comments(comments, identity, watermark);
    new_comments.retain(|c| has_text(&c.body));
    new_comments.sort_by_key(|c| c.id);

    let mut reviews: Vec<&Review> = reviews.iter().collect();
    reviews.sort_by_key(|r| r.id);
    let mut comments: Vec<&ReviewComment> = comments.iter().collect();
    comments.sort_by_key(|c| c.id);

    // Old parents stay resolvable for replies that are new.
    let lookup: HashMap<i64, &ReviewComment> = comments.iter().map(|c| (c.id, *c)).collect();

    let summary = render_summary(&reviews, &comments, identity, watermark);

    let mut ids = IdAllocator::new();
    let mut groups: BTreeMap<String, FeedbackGroup> = BTreeMap::new();

    for review in new_reviews {
        let id = ids.next(FeedbackKind::Review);
        groups
            .entry(String::new())
            .or_insert_with(|| FeedbackGroup::new(""))
            .reviews
            .insert(id, review.clone());
    }

    for comment in new_comments {
        let id = ids.next(FeedbackKind::Comment);
        let path = comment.anchored_path().unwrap_or_default().to_string();
        groups
            .entry(path.clone())
            .or_insert_with(|| FeedbackGroup::new(path))
            .comments
            .insert(id, comment.clone());
    }

    for group in groups.values_mut() {
        group.rendered = render_group(group, &lookup);
    }

    GroupedFeedbackData { groups, summary }
}

fn render_summary(
    reviews: &[&Review],
    comments: &[&ReviewComment],
    identity: &str,
    watermark: DateTime<Utc>,
) -> String {
    let mut lines = Vec::new();
    for r in reviews
        .iter()
        .filter(|r| is_handled(&r.author, &r.body, r.submitted_at, identity, watermark))
    {
        lines.push(format!(
            "- @{} (review): {}",
            r.author,
            excerpt(&r.body, SUMMARY_EXCERPT_CHARS)
        ));
    }
    for c in comments
        .iter()
        .filter(|c| is_handled(&c.author, &c.body, c.created_at, identity, watermark))
    {
        lines.push(format!(
            "- @{}: {}",
            c.author,
            excerpt(&c.body, SUMMARY_EXCERPT_CHARS)
        ));
    }
    lines.join("\n")
}

/// Render the markdown feedback block of one group.
pub fn render_group(group: &FeedbackGroup, lookup: &HashMap<i64, &ReviewComment>) -> String {
    let mut out = String::new();
    out.push_str(FEEDBACK_HEADER);
    out.push_str("\n\n");

    if group.is_empty() {
        out.push_str(NO_FEEDBACK);
        out.push('\n');
        return out;
    }

    for (id, review) in &group.reviews {
        out.push_str(&format!("### {}\n", id));
        out.push_str(&format!("**Reviewer:** @{} ({})\n\n", review.author, review.state));
        out.push_str(review.body.trim());
        out.push_str("\n\n");
    }

    for (id, comment) in &group.comments {
        out.push_str(&format!("### {}\n", id));
        match comment.location() {
            CommentLocation::General => {
                out.push_str(&format!("**Reviewer:** @{} (general comment)\n", comment.author));
            }
            location => {
                out.push_str(&format!("**Reviewer:** @{} on `{}`\n", comment.author, location));
            }
        }
        if let Some(parent) = comment.parent_id().and_then(|pid| lookup.get(&pid)) {
            out.push_str(&format!(
                "**Follow-up to** @{}: \"{}\"\n",
                parent.author,
                excerpt(&parent.body, PARENT_EXCERPT_CHARS)
            ));
        }
        out.push('\n');
        out.push_str(comment.body.trim());
        out.push_str("\n\n");
    }

    out
}
