//! The side-effecting half: one feedback cycle per ticket against the
//! ticket store, code host, working copy and code generator.

pub mod collaborators;
pub mod cycle;
pub mod dispatch;
pub mod guard;

pub use collaborators::{CoAuthor, CodeGenerator, CodeHost, TicketStore, WorkingCopy};
pub use cycle::{CycleOutcome, CycleReport, FeedbackPipeline, PipelineSettings, commit_message, workdir_name};
pub use dispatch::{ReplyTally, dispatch_replies, mention_reply};
pub use guard::{FeedbackRunner, InFlightTickets, TicketClaim};
