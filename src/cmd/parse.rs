//! Generator output parsing — `review-responder parse`.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

use review_responder::feedback::{SyntheticId, parse_responses};

pub fn cmd_parse(ids: &[String], file: Option<&Path>) -> Result<()> {
    let expected = ids
        .iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<SyntheticId>()
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("Invalid feedback ID '{}'", id))
        })
        .collect::<Result<Vec<_>>>()?;

    let output = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let responses = parse_responses(&output, &expected);
    println!(
        "{}",
        serde_json::to_string_pretty(&responses).context("Failed to serialize responses")?
    );
    Ok(())
}
