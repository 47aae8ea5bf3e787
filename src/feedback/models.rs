use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A review comment or a plain conversation comment on a pull request.
///
/// File-anchored comments carry `path` and a non-zero `line`; everything else
/// is treated as a general comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewComment {
    pub id: i64,
    pub author: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub in_reply_to_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Where a comment is anchored in the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentLocation<'a> {
    General,
    Line { path: &'a str, line: u32 },
    Range { path: &'a str, start: u32, end: u32 },
}

impl fmt::Display for CommentLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommentLocation::General => write!(f, "general comment"),
            CommentLocation::Line { path, line } => write!(f, "{}:{}", path, line),
            CommentLocation::Range { path, start, end } => write!(f, "{}:{}-{}", path, start, end),
        }
    }
}

impl ReviewComment {
    /// The parent comment id, or `None` for a thread root (absent or 0).
    pub fn parent_id(&self) -> Option<i64> {
        self.in_reply_to_id.filter(|id| *id != 0)
    }

    /// The anchoring file path when the comment is attached to a diff line.
    pub fn anchored_path(&self) -> Option<&str> {
        match (self.path.as_deref(), self.line) {
            (Some(path), Some(line)) if !path.is_empty() && line > 0 => Some(path),
            _ => None,
        }
    }

    pub fn location(&self) -> CommentLocation<'_> {
        let Some(path) = self.anchored_path() else {
            return CommentLocation::General;
        };
        let line = self.line.unwrap_or_default();
        match self.start_line {
            Some(start) if start > 0 && start != line => CommentLocation::Range {
                path,
                start,
                end: line,
            },
            _ => CommentLocation::Line { path, line },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    #[serde(other)]
    Other,
}

impl ReviewState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::ChangesRequested => "changes_requested",
            Self::Commented => "commented",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A submitted pull request review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: i64,
    pub author: String,
    pub state: ReviewState,
    #[serde(default)]
    pub body: String,
    pub submitted_at: DateTime<Utc>,
}

/// One changed file of a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrFile {
    pub path: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
    #[serde(default)]
    pub patch: Option<String>,
}

/// Everything the pipeline needs to know about a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrDetails {
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub html_url: String,
    pub head_ref: String,
    /// Missing when the head fork has been deleted.
    #[serde(default)]
    pub head_clone_url: Option<String>,
    #[serde(default)]
    pub head_owner: String,
    #[serde(default)]
    pub files: Vec<PrFile>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub comments: Vec<ReviewComment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub name: String,
    pub email: String,
}

/// A tracked work item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub key: String,
    #[serde(default)]
    pub assignee: Option<Assignee>,
    #[serde(default)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

impl Ticket {
    /// Read the pull request URL stored in `field`.
    ///
    /// Accepts either a plain string or an object with a `url` member.
    pub fn pr_url(&self, field: &str) -> Option<&str> {
        let value = self.custom_fields.get(field)?;
        let url = match value {
            serde_json::Value::String(s) => s.as_str(),
            serde_json::Value::Object(obj) => obj.get("url")?.as_str()?,
            _ => return None,
        };
        let url = url.trim();
        if url.is_empty() { None } else { Some(url) }
    }
}

/// Coordinates of a pull request on the code host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestRef {
    /// Parse `https://github.com/<owner>/<repo>/pull/<number>`.
    ///
    /// Trailing path segments (`/files`), query strings and fragments are ignored.
    pub fn parse(url: &str) -> Option<Self> {
        let rest = url.trim().strip_prefix("https://")?;
        let rest = rest.strip_prefix("www.").unwrap_or(rest);
        let path = rest.strip_prefix("github.com/")?;
        let path = path.split(['?', '#']).next().unwrap_or(path);

        let mut parts = path.split('/');
        let owner = parts.next().filter(|s| !s.is_empty())?;
        let repo = parts.next().filter(|s| !s.is_empty())?;
        if parts.next()? != "pull" {
            return None;
        }
        let number = parts.next()?.parse::<u64>().ok().filter(|n| *n > 0)?;

        Some(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Case-insensitive login comparison; code-host logins are not case sensitive.
pub fn same_login(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
