//! Offline cycle preview — `review-responder group`.
//!
//! Runs the pure half of a cycle (watermark, filter, gate, grouping, loop
//! prevention, prompt rendering) over PR data captured as JSON. Nothing is
//! cloned, generated or posted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

use review_responder::config::ResponderConfig;
use review_responder::feedback::{
    LoopGuard, PrDetails, ReviewComment, filter_new_comments, filter_new_reviews, group_feedback,
    render_prompt, resolve_watermark, should_trigger, zero_watermark,
};

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn resolve(
    config: &ResponderConfig,
    details: &PrDetails,
    marker_comments: Option<&Path>,
    explicit: Option<&str>,
) -> Result<DateTime<Utc>> {
    if let Some(raw) = explicit {
        return DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .with_context(|| format!("Invalid --watermark '{}': expected RFC3339", raw));
    }
    let comments: Vec<ReviewComment> = match marker_comments {
        Some(path) => read_json(path)?,
        None => details.comments.clone(),
    };
    Ok(resolve_watermark(&comments, config.login(), config.marker()))
}

pub fn cmd_group(
    config: &ResponderConfig,
    pr_path: &Path,
    marker_comments: Option<&Path>,
    watermark: Option<&str>,
    show_prompts: bool,
) -> Result<()> {
    let details: PrDetails = read_json(pr_path)?;
    let settings = config.pipeline_settings();
    let identity = settings.identity.as_str();
    let watermark = resolve(config, &details, marker_comments, watermark)?;

    let new_reviews = filter_new_reviews(&details.reviews, identity, watermark);
    let new_comments = filter_new_comments(&details.comments, identity, watermark);
    let triggered = should_trigger(&new_reviews, &new_comments, identity);

    println!();
    println!("Pull request: {}", details.html_url);
    if watermark == zero_watermark() {
        println!("Watermark:    none (all feedback is new)");
    } else {
        println!("Watermark:    {}", watermark.to_rfc3339());
    }
    println!(
        "New feedback: {} review(s), {} comment(s)",
        new_reviews.len(),
        new_comments.len()
    );
    println!("Trigger:      {}", if triggered { "yes" } else { "no" });
    if details.head_clone_url.is_none() {
        println!("Head repo:    missing (deleted fork), cycle would stop here");
    }
    println!();

    if !triggered {
        return Ok(());
    }

    let grouped = group_feedback(&details.reviews, &details.comments, identity, watermark);
    let guard = LoopGuard::new(
        identity,
        &settings.known_bots,
        settings.max_thread_depth,
        &details.comments,
    );

    for group in grouped.groups.values() {
        let ids: Vec<String> = group.ids().iter().map(ToString::to_string).collect();
        println!("=== Group: {} ({}) ===", group.label(), ids.join(", "));
        println!();
        println!("{}", group.rendered.trim_end());
        println!();

        println!("Reply plan:");
        for (id, review) in &group.reviews {
            println!("  {} -> general comment mentioning @{}", id, review.author);
        }
        for (id, comment) in &group.comments {
            match guard.should_skip(comment) {
                Some(reason) => println!("  {} -> withheld ({})", id, reason),
                None if comment.anchored_path().is_some() => {
                    println!("  {} -> threaded reply to comment {}", id, comment.id)
                }
                None => println!("  {} -> general comment mentioning @{}", id, comment.author),
            }
        }
        println!();

        if show_prompts {
            println!("--- Prompt ---");
            println!("{}", render_prompt(&details, group, &grouped.summary).trim_end());
            println!("--- End prompt ---");
            println!();
        }
    }

    if !grouped.summary.trim().is_empty() {
        println!("=== Previously handled ===");
        println!("{}", grouped.summary.trim_end());
        println!();
    }

    Ok(())
}
