//! Watermark resolution and marker comment rendering.
//!
//! The watermark is never stored separately: it is the timestamp embedded in
//! the newest marker comment the processing identity posted on the PR.
//!
//! ```text
//! <marker> Processing Timestamp: 2024-05-01T12:00:00Z
//!
//! <explanatory trailer>
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use tracing::warn;

use super::models::{ReviewComment, same_login};

const TIMESTAMP_LABEL: &str = "Processing Timestamp:";

const TRAILER: &str = "Review feedback posted before this timestamp has been addressed. \
New comments and reviews after it will be picked up automatically on the next run.";

const REDACTED_TRAILER: &str = "[details withheld]";

/// The "process everything" watermark.
pub fn zero_watermark() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}

fn marker_regex(marker: &str) -> Option<Regex> {
    let pattern = format!(
        r"(?m)^\s*{}\s+{}\s*(\S+)",
        regex::escape(marker),
        regex::escape(TIMESTAMP_LABEL)
    );
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(marker, error = %e, "Marker does not form a usable pattern");
            None
        }
    }
}

fn timestamp_in(re: &Regex, body: &str) -> Option<DateTime<Utc>> {
    let raw = re.captures(body)?.get(1)?.as_str();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Extract the timestamp from a marker comment body, if it is one.
pub fn parse_marker_timestamp(body: &str, marker: &str) -> Option<DateTime<Utc>> {
    timestamp_in(&marker_regex(marker)?, body)
}

/// Find the newest marker timestamp among comments authored by `identity`.
///
/// Returns [`zero_watermark`] when no marker exists.
pub fn resolve_watermark(comments: &[ReviewComment], identity: &str, marker: &str) -> DateTime<Utc> {
    let Some(re) = marker_regex(marker) else {
        return zero_watermark();
    };
    comments
        .iter()
        .filter(|c| same_login(&c.author, identity))
        .filter_map(|c| timestamp_in(&re, &c.body))
        .max()
        .unwrap_or_else(zero_watermark)
}

/// Render the marker comment that advances the watermark to `at`.
///
/// With `redact` the explanatory trailer is withheld; the timestamp line is
/// always present so the marker still round-trips.
pub fn render_marker_comment(marker: &str, at: DateTime<Utc>, redact: bool) -> String {
    format!(
        "{} {} {}\n\n{}",
        marker,
        TIMESTAMP_LABEL,
        at.to_rfc3339_opts(SecondsFormat::Secs, true),
        if redact { REDACTED_TRAILER } else { TRAILER }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MARKER: &str = "🤖 Review Responder";

    fn comment(id: i64, author: &str, body: &str) -> ReviewComment {
        ReviewComment {
            id,
            author: author.into(),
            body: body.into(),
            path: None,
            line: None,
            start_line: None,
            in_reply_to_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_no_markers_yields_zero() {
        let comments = vec![comment(1, "alice", "looks good")];
        assert_eq!(resolve_watermark(&comments, "bot", MARKER), zero_watermark());
        assert_eq!(resolve_watermark(&[], "bot", MARKER), zero_watermark());
    }

    #[test]
    fn test_render_then_parse_round_trips() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        for redact in [false, true] {
            let body = render_marker_comment(MARKER, at, redact);
            assert_eq!(parse_marker_timestamp(&body, MARKER), Some(at));
        }
    }

    #[test]
    fn test_redaction_keeps_timestamp_drops_trailer() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let body = render_marker_comment(MARKER, at, true);
        assert!(body.contains("2024-05-01T12:30:00Z"));
        assert!(!body.contains(TRAILER));
        assert!(render_marker_comment(MARKER, at, false).contains(TRAILER));
    }

    #[test]
    fn test_picks_latest_marker_from_identity_only() {
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        let forged = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let comments = vec![
            comment(1, "bot", &render_marker_comment(MARKER, late, false)),
            comment(2, "Bot", &render_marker_comment(MARKER, early, false)),
            comment(3, "mallory", &render_marker_comment(MARKER, forged, false)),
        ];
        assert_eq!(resolve_watermark(&comments, "bot", MARKER), late);
    }

    #[test]
    fn test_ignores_other_markers_and_bad_timestamps() {
        let comments = vec![
            comment(1, "bot", "Some Other Tool Processing Timestamp: 2024-01-01T00:00:00Z"),
            comment(2, "bot", &format!("{} Processing Timestamp: yesterday", MARKER)),
        ];
        assert_eq!(resolve_watermark(&comments, "bot", MARKER), zero_watermark());
    }

    #[test]
    fn test_marker_with_regex_metacharacters() {
        let marker = "[bot] (v2.*) +?";
        let at = Utc.with_ymd_and_hms(2024, 7, 4, 8, 0, 0).unwrap();
        let comments = vec![
            comment(1, "bot", &render_marker_comment(marker, at, false)),
            comment(2, "bot", "[bot] (v2) Processing Timestamp: 2030-01-01T00:00:00Z"),
        ];
        assert_eq!(resolve_watermark(&comments, "bot", marker), at);
        assert_eq!(parse_marker_timestamp(&comments[1].body, marker), None);
    }
}
