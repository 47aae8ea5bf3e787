//! Prompt rendering for the code generator.

use super::grouping::FeedbackGroup;
use super::models::{PrDetails, PrFile};

/// Maximum characters of a single file patch embedded in a prompt.
pub const MAX_PATCH_CHARS: usize = 6000;

pub const RESPONSE_SUFFIX: &str = "_RESPONSE:";

const PREAMBLE: &str = "You are a senior software engineer addressing code review feedback on a \
pull request you authored. The repository is checked out in your working directory on the PR \
branch. Make the requested changes directly in the files.";

const PREVIOUS_HEADER: &str = "## Previously Handled Feedback (context only, do not act on these)";

fn truncate_patch(patch: &str) -> String {
    if patch.len() <= MAX_PATCH_CHARS {
        return patch.to_string();
    }
    let mut cut = MAX_PATCH_CHARS;
    while !patch.is_char_boundary(cut) {
        cut -= 1;
    }
    format!(
        "{}\n... [patch truncated, {} more bytes]",
        &patch[..cut],
        patch.len() - cut
    )
}

fn render_file(out: &mut String, file: &PrFile) {
    out.push_str(&format!(
        "### {} ({}, +{}/-{})\n",
        file.path, file.status, file.additions, file.deletions
    ));
    match file.patch.as_deref() {
        Some(patch) if !patch.is_empty() => {
            out.push_str("```diff\n");
            out.push_str(&truncate_patch(patch));
            if !patch.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
        _ => out.push_str("(no textual diff available)\n\n"),
    }
}

/// Files whose hunks belong in a group's prompt.
///
/// A file group only needs its own hunk when the file is part of the diff;
/// the general group, or a file outside the diff, gets every file.
fn files_for_group<'a>(pr: &'a PrDetails, group: &FeedbackGroup) -> Vec<&'a PrFile> {
    if !group.is_general() {
        let own: Vec<&PrFile> = pr.files.iter().filter(|f| f.path == group.path).collect();
        if !own.is_empty() {
            return own;
        }
    }
    pr.files.iter().collect()
}

/// Build the instruction block for one feedback group.
pub fn render_prompt(pr: &PrDetails, group: &FeedbackGroup, summary: &str) -> String {
    let mut out = String::new();
    out.push_str(PREAMBLE);
    out.push_str("\n\n");

    out.push_str("## Pull Request\n");
    out.push_str(&format!("Title: {}\n", pr.title));
    out.push_str(&format!("URL: {}\n", pr.html_url));
    let description = pr.body.trim();
    out.push_str(&format!(
        "Description:\n{}\n\n",
        if description.is_empty() { "(none)" } else { description }
    ));

    let files = files_for_group(pr, group);
    if !files.is_empty() {
        out.push_str("## Changes In This Pull Request\n\n");
        for file in files {
            render_file(&mut out, file);
        }
    }

    if !summary.trim().is_empty() {
        out.push_str(PREVIOUS_HEADER);
        out.push('\n');
        out.push_str(summary);
        out.push_str("\n\n");
    }

    out.push_str(&group.rendered);
    if !group.rendered.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');

    let ids: Vec<String> = group.ids().iter().map(ToString::to_string).collect();
    out.push_str("## Instructions\n");
    out.push_str("1. Apply fixes for every feedback item above directly to the files in the repository.\n");
    out.push_str("2. For each feedback item, write a response block in exactly this format:\n\n");
    out.push_str(&format!("<ID>{}\n", RESPONSE_SUFFIX));
    out.push_str("<1-3 sentences explaining what you changed, or why no change was needed>\n\n");
    out.push_str("Replace <ID> with the item's ID and end each block with a blank line.\n");
    if !ids.is_empty() {
        out.push_str(&format!("Respond to these IDs: {}\n", ids.join(", ")));
    }

    out
}
