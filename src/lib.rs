//! Review feedback reconciliation for agent-opened pull requests.
//!
//! When reviewers comment on a pull request the agent opened, a cycle detects
//! what is new since the last processed point, groups it by file, asks a code
//! generator to fix each group, commits and pushes once, replies to every item
//! and advances a watermark stored as a marker comment on the PR itself.
//!
//! - [`feedback`]: pure decision logic (filtering, grouping, prompts, parsing).
//! - [`pipeline`]: the cycle itself, driven against collaborator traits.

pub mod config;
pub mod errors;
pub mod feedback;
pub mod logging;
pub mod pipeline;
