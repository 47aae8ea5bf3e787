//! Reply-loop prevention.
//!
//! Before replying to a comment we walk its reply chain to make sure we are
//! not about to ping-pong with another bot, and that the thread has not
//! already absorbed too many of our own replies.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::warn;

use super::models::{ReviewComment, same_login};

/// Why a reply was withheld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// A known bot replied directly to one of our comments.
    BotReplyToSelf { author: String },
    /// A known bot replied to a comment we cannot see; assume it was ours.
    BotReplyToUnknownParent { author: String, parent_id: i64 },
    /// The thread already carries `depth` of our replies.
    ThreadDepth { depth: usize, max: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::BotReplyToSelf { author } => {
                write!(f, "known bot @{} replied to our own comment", author)
            }
            SkipReason::BotReplyToUnknownParent { author, parent_id } => write!(
                f,
                "known bot @{} replied to unresolvable parent {}",
                author, parent_id
            ),
            SkipReason::ThreadDepth { depth, max } => {
                write!(f, "thread depth {} reached limit {}", depth, max)
            }
        }
    }
}

/// Loop-prevention rules evaluated against the full comment set of a PR.
pub struct LoopGuard<'a> {
    identity: &'a str,
    known_bots: &'a [String],
    max_thread_depth: usize,
    lookup: HashMap<i64, &'a ReviewComment>,
}

impl<'a> LoopGuard<'a> {
    pub fn new(
        identity: &'a str,
        known_bots: &'a [String],
        max_thread_depth: usize,
        comments: &'a [ReviewComment],
    ) -> Self {
        Self {
            identity,
            known_bots,
            max_thread_depth,
            lookup: comments.iter().map(|c| (c.id, c)).collect(),
        }
    }

    pub fn is_known_bot(&self, author: &str) -> bool {
        self.known_bots.iter().any(|bot| same_login(bot, author))
    }

    /// Count our own comments on the chain from `comment_id` up to the root.
    ///
    /// Iterative with a visited set: a cyclic `in_reply_to_id` graph stops the
    /// walk instead of hanging it.
    pub fn thread_depth(&self, comment_id: i64) -> usize {
        let mut depth = 0;
        let mut visited = HashSet::new();
        let mut current = Some(comment_id);

        while let Some(id) = current {
            if !visited.insert(id) {
                warn!(comment_id, cycle_at = id, "Reply chain contains a cycle, stopping walk");
                break;
            }
            let Some(node) = self.lookup.get(&id) else {
                break;
            };
            if same_login(&node.author, self.identity) {
                depth += 1;
            }
            current = node.parent_id();
        }

        depth
    }

    /// Decide whether replying to `comment` risks a reply loop.
    pub fn should_skip(&self, comment: &ReviewComment) -> Option<SkipReason> {
        if self.is_known_bot(&comment.author)
            && let Some(parent_id) = comment.parent_id()
        {
            match self.lookup.get(&parent_id) {
                Some(parent) if same_login(&parent.author, self.identity) => {
                    return Some(SkipReason::BotReplyToSelf {
                        author: comment.author.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    return Some(SkipReason::BotReplyToUnknownParent {
                        author: comment.author.clone(),
                        parent_id,
                    });
                }
            }
        }

        let depth = self.thread_depth(comment.id);
        if depth >= self.max_thread_depth {
            return Some(SkipReason::ThreadDepth {
                depth,
                max: self.max_thread_depth,
            });
        }

        None
    }
}
