//! Pure feedback reconciliation logic.
//!
//! Nothing in this module performs I/O. Given the reviews and comments of a
//! pull request plus the current watermark, it decides what is new, whether a
//! cycle should run, how feedback is grouped and labelled, what the code
//! generator is told, how its answer is read back, and which replies would
//! risk a bot-to-bot loop.
//!
//! | Module       | Responsibility                                          |
//! |--------------|---------------------------------------------------------|
//! | `models`     | Reviews, comments, PR details, tickets, PR references   |
//! | `watermark`  | Marker comment parsing/rendering, watermark resolution  |
//! | `filter`     | Self/old-item filtering and the trigger gate            |
//! | `grouping`   | Synthetic IDs, per-file groups, rendered feedback       |
//! | `loop_guard` | Known-bot detection, thread depth, skip decisions       |
//! | `prompt`     | Generator instruction block per group                   |
//! | `response`   | `<ID>_RESPONSE:` block extraction                       |

pub mod filter;
pub mod grouping;
pub mod loop_guard;
pub mod models;
pub mod prompt;
pub mod response;
pub mod watermark;

pub use filter::{filter_new_comments, filter_new_reviews, should_trigger};
pub use grouping::{FeedbackGroup, FeedbackKind, GroupedFeedbackData, SyntheticId, group_feedback};
pub use loop_guard::{LoopGuard, SkipReason};
pub use models::{
    Assignee, CommentLocation, PrDetails, PrFile, PullRequestRef, Review, ReviewComment,
    ReviewState, Ticket,
};
pub use prompt::render_prompt;
pub use response::{ResponseMap, parse_responses};
pub use watermark::{parse_marker_timestamp, render_marker_comment, resolve_watermark, zero_watermark};
