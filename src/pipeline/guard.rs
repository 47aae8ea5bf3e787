//! At most one in-flight cycle per ticket.
//!
//! Cycles for different tickets run concurrently; a second trigger for a
//! ticket that is still running is rejected rather than queued. Claims are
//! taken synchronously before a task is spawned and released on drop, so a
//! panicking or failing cycle never leaves its ticket locked.

use std::sync::Arc;

use dashmap::DashSet;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::cycle::{CycleOutcome, FeedbackPipeline};
use crate::errors::CycleError;

/// Set of tickets with a running cycle.
#[derive(Debug, Clone, Default)]
pub struct InFlightTickets {
    keys: Arc<DashSet<String>>,
}

/// Held for the duration of one cycle; releases the ticket on drop.
#[derive(Debug)]
pub struct TicketClaim {
    key: String,
    keys: Arc<DashSet<String>>,
}

impl TicketClaim {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for TicketClaim {
    fn drop(&mut self) {
        self.keys.remove(&self.key);
    }
}

impl InFlightTickets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` if a cycle for it is already running.
    pub fn try_claim(&self, key: &str) -> Option<TicketClaim> {
        if self.keys.insert(key.to_string()) {
            Some(TicketClaim {
                key: key.to_string(),
                keys: Arc::clone(&self.keys),
            })
        } else {
            None
        }
    }

    pub fn is_running(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Launches feedback cycles under the per-ticket guard.
#[derive(Clone)]
pub struct FeedbackRunner {
    pipeline: Arc<FeedbackPipeline>,
    in_flight: InFlightTickets,
}

impl FeedbackRunner {
    pub fn new(pipeline: FeedbackPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            in_flight: InFlightTickets::new(),
        }
    }

    pub fn in_flight(&self) -> &InFlightTickets {
        &self.in_flight
    }

    fn claim(&self, key: &str) -> Result<TicketClaim, CycleError> {
        self.in_flight.try_claim(key).ok_or_else(|| {
            warn!(ticket = key, "Feedback cycle already running, ignoring trigger");
            CycleError::AlreadyRunning {
                ticket: key.to_string(),
            }
        })
    }

    /// Run a cycle to completion on the current task.
    pub async fn run(&self, key: &str) -> Result<CycleOutcome, CycleError> {
        let _claim = self.claim(key)?;
        self.pipeline.process_ticket(key).await
    }

    /// Fire-and-forget: start a cycle in the background.
    ///
    /// The ticket is claimed before this returns, so an immediate second
    /// `spawn` for the same key fails with `AlreadyRunning`.
    pub fn spawn(&self, key: &str) -> Result<JoinHandle<Result<CycleOutcome, CycleError>>, CycleError> {
        let claim = self.claim(key)?;
        let pipeline = Arc::clone(&self.pipeline);

        Ok(tokio::spawn(async move {
            let result = pipeline.process_ticket(claim.key()).await;
            match &result {
                Ok(outcome) => info!(ticket = claim.key(), ?outcome, "Feedback cycle finished"),
                Err(e) => error!(ticket = claim.key(), error = %e, "Feedback cycle failed"),
            }
            drop(claim);
            result
        }))
    }

    /// Run cycles for several tickets concurrently and collect every result
    /// in input order.
    pub async fn run_all(&self, keys: &[String]) -> Vec<(String, Result<CycleOutcome, CycleError>)> {
        let mut pending = Vec::with_capacity(keys.len());
        let mut results: Vec<Option<Result<CycleOutcome, CycleError>>> = Vec::with_capacity(keys.len());

        for key in keys {
            match self.spawn(key) {
                Ok(handle) => {
                    pending.push((results.len(), key.clone(), handle));
                    results.push(None);
                }
                Err(e) => results.push(Some(Err(e))),
            }
        }

        let (slots, handles): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .map(|(slot, key, handle)| ((slot, key), handle))
            .unzip();
        for ((slot, key), joined) in slots.into_iter().zip(join_all(handles).await) {
            results[slot] = Some(joined.unwrap_or_else(|e| {
                Err(CycleError::TaskAborted {
                    ticket: key,
                    message: e.to_string(),
                })
            }));
        }

        keys.iter()
            .cloned()
            .zip(results)
            .filter_map(|(key, result)| result.map(|r| (key, r)))
            .collect()
    }
}
