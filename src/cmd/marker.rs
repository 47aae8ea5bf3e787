//! Watermark marker preview — `review-responder marker`.

use chrono::Utc;
use review_responder::config::ResponderConfig;
use review_responder::feedback::render_marker_comment;

pub fn cmd_marker(config: &ResponderConfig, redact: bool) {
    println!("{}", render_marker_comment(config.marker(), Utc::now(), redact));
}
