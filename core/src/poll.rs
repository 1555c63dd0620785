//! Stateless poll/retry decision.
//!
//! The attempt counter lives only in the redirect URL. Each poll looks at the
//! artifact once and either plays it, schedules the next attempt, or gives up.
//! The same `(state, attempt)` always yields the same decision.

use crate::artifact::ArtifactState;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pending polls allowed before giving up
    pub max_attempts: u32,
    /// Pause between polls, in seconds
    pub delay_secs: u32,
    /// Pause emitted right after dispatch, before attempt 0
    pub initial_pause_secs: u32,
    /// Honour failure markers so a failed job ends the call on the next poll
    pub fail_fast: bool,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            delay_secs: 1,
            initial_pause_secs: 3,
            fail_fast: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollDecision {
    Play,
    Retry { next_attempt: u32 },
    /// Bound exhausted without an artifact
    GiveUp,
    /// Worker left a failure marker
    Failed,
}

impl PollPolicy {
    pub fn decide(&self, state: ArtifactState, attempt: u32) -> PollDecision {
        match state {
            ArtifactState::Ready => PollDecision::Play,
            ArtifactState::Failed if self.fail_fast => PollDecision::Failed,
            _ if attempt < self.max_attempts => PollDecision::Retry {
                next_attempt: attempt + 1,
            },
            _ => PollDecision::GiveUp,
        }
    }

    pub fn worst_case_latency(&self) -> Duration {
        Duration::from_secs(
            u64::from(self.initial_pause_secs)
                + u64::from(self.max_attempts) * u64::from(self.delay_secs),
        )
    }
}
