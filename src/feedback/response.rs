//! Response parsing from the code generator's output.
//!
//! The generator is asked to emit one block per feedback item:
//!
//! ```text
//! COMMENT_1_RESPONSE:
//! Renamed `foo` to `bar` as suggested.
//!
//! REVIEW_1_RESPONSE:
//! Added the missing unit tests.
//! ```
//!
//! Each block runs until the first blank line (or the next marker, or the end
//! of the text).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

use super::grouping::SyntheticId;

static RESPONSE_MARKER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"((?:COMMENT|REVIEW)_\d+)_RESPONSE:\s*").unwrap());

// A blank line, LF or CRLF, possibly holding stray spaces.
static BLANK_LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n[ \t]*\r?\n").unwrap());

/// Explanations keyed by synthetic ID, accumulated across groups.
pub type ResponseMap = BTreeMap<SyntheticId, String>;

struct Marker {
    id: String,
    start: usize,
    end: usize,
}

/// Extract per-ID explanations from `output`.
///
/// Missing responses for `expected` IDs are logged; they are not an error.
pub fn parse_responses(output: &str, expected: &[SyntheticId]) -> ResponseMap {
    let markers: Vec<Marker> = RESPONSE_MARKER_REGEX
        .captures_iter(output)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            Some(Marker {
                id: cap.get(1)?.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect();

    let mut responses = ResponseMap::new();

    for (i, marker) in markers.iter().enumerate() {
        let limit = markers.get(i + 1).map_or(output.len(), |next| next.start);
        let segment = &output[marker.end..limit];
        let text = match BLANK_LINE_REGEX.find(segment) {
            Some(blank) => &segment[..blank.start()],
            None => segment,
        }
        .trim();

        if text.is_empty() {
            warn!(id = %marker.id, "Empty response block in generator output");
            continue;
        }

        let id = match marker.id.parse::<SyntheticId>() {
            Ok(id) => id,
            Err(e) => {
                warn!(id = %marker.id, error = %e, "Unparseable response id");
                continue;
            }
        };

        if responses.contains_key(&id) {
            debug!(%id, "Duplicate response block ignored; first occurrence wins");
            continue;
        }
        responses.insert(id, text.to_string());
    }

    for id in expected {
        if !responses.contains_key(id) {
            warn!(%id, "No response found for feedback item");
        }
    }

    responses
}
