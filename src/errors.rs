//! Typed errors for a feedback cycle.
//!
//! Each hard-failure stage of a cycle has its own variant so callers can tell
//! where a ticket's cycle stopped. Best-effort failures (replies, watermark
//! advance, security lookup) never surface here; they are logged and counted.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to fetch ticket {ticket}: {source}")]
    TicketFetch {
        ticket: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to fetch pull request {pr} for {ticket}: {source}")]
    PrFetch {
        ticket: String,
        pr: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to clone {url} for {ticket}: {source}")]
    Clone {
        ticket: String,
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to switch to branch {branch} for {ticket}: {source}")]
    Branch {
        ticket: String,
        branch: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to pull branch {branch} for {ticket}: {source}")]
    Pull {
        ticket: String,
        branch: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Code generation failed for group '{group}' of {ticket}: {source}")]
    Generate {
        ticket: String,
        group: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to commit changes for {ticket}: {source}")]
    Commit {
        ticket: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to push branch {branch} for {ticket}: {source}")]
    Push {
        ticket: String,
        branch: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("A feedback cycle is already running for {ticket}")]
    AlreadyRunning { ticket: String },

    #[error("Feedback cycle task for {ticket} did not complete: {message}")]
    TaskAborted { ticket: String, message: String },
}

impl CycleError {
    /// The ticket key this error belongs to.
    pub fn ticket(&self) -> &str {
        match self {
            CycleError::TicketFetch { ticket, .. }
            | CycleError::PrFetch { ticket, .. }
            | CycleError::Clone { ticket, .. }
            | CycleError::Branch { ticket, .. }
            | CycleError::Pull { ticket, .. }
            | CycleError::Generate { ticket, .. }
            | CycleError::Commit { ticket, .. }
            | CycleError::Push { ticket, .. }
            | CycleError::AlreadyRunning { ticket }
            | CycleError::TaskAborted { ticket, .. } => ticket,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_error_carries_group_and_source() {
        let err = CycleError::Generate {
            ticket: "ABC-1".into(),
            group: "src/lib.rs".into(),
            source: anyhow::anyhow!("timed out"),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/lib.rs"));
        assert!(msg.contains("ABC-1"));
        assert!(msg.contains("timed out"));
        assert_eq!(err.ticket(), "ABC-1");
    }

    #[test]
    fn test_already_running_is_matchable() {
        let err = CycleError::AlreadyRunning {
            ticket: "ABC-2".into(),
        };
        assert!(matches!(err, CycleError::AlreadyRunning { .. }));
        assert_eq!(err.ticket(), "ABC-2");
    }

    #[test]
    fn test_source_chain_is_preserved() {
        use std::error::Error as _;
        let err = CycleError::Push {
            ticket: "ABC-3".into(),
            branch: "abc-3".into(),
            source: anyhow::anyhow!("rejected"),
        };
        assert_eq!(err.source().map(|s| s.to_string()), Some("rejected".to_string()));
    }

    #[test]
    fn test_cycle_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error + Send + Sync + 'static>(_: &E) {}
        assert_std_error(&CycleError::AlreadyRunning { ticket: "x".into() });
    }
}
