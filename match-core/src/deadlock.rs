//! Deadlock detection and recovery.
//!
//! The two failure modes this module exists for:
//! - **Turn desync**: both clients privately believe it is the other's
//!   turn after a dropped update. Convergence is timer-free: whenever a
//!   processed snapshot carries both game-start acknowledgments, the
//!   document's `current_player` is trusted absolutely.
//! - **Play-again stall**: both participants chose "play again" but no
//!   reset command was ever issued. Recovery is a timed escalation ladder
//!   driven by the client; every step re-checks state before acting, so a
//!   timer firing after the stall resolved is harmless.

use std::time::Duration;

use match_types::{Mark, Role, StateDoc};

/// Timer-free turn convergence.
///
/// Returns the authoritative `current_player` when both one-shot
/// acknowledgment flags are present in the document, `None` otherwise.
pub fn converged_turn(doc: &StateDoc) -> Option<Mark> {
    if doc.both_ready() {
        Some(doc.current_player)
    } else {
        None
    }
}

/// Tracks when the shared move history last changed, for staleness
/// heuristics.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveActivity {
    last_count: usize,
    last_change_ms: u64,
}

impl MoveActivity {
    /// Start tracking at the given instant.
    pub fn new(now_ms: u64) -> Self {
        Self {
            last_count: 0,
            last_change_ms: now_ms,
        }
    }

    /// Record the total move count seen in a snapshot. Returns `true`
    /// when the count changed since the previous observation.
    pub fn observe(&mut self, count: usize, now_ms: u64) -> bool {
        if count != self.last_count {
            self.last_count = count;
            self.last_change_ms = now_ms;
            true
        } else {
            false
        }
    }

    /// Milliseconds since the move history last changed.
    pub fn idle_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_change_ms)
    }
}

/// Delays between the escalation steps.
#[derive(Debug, Clone, Copy)]
pub struct StallTimings {
    /// Delay after the local play-again choice before the first check.
    pub arm: Duration,
    /// Delay after the explicit re-fetch before commanding a reset.
    pub recheck: Duration,
    /// How long a guest waits for the host to answer a force request
    /// before giving up.
    pub host_grace: Duration,
}

impl Default for StallTimings {
    fn default() -> Self {
        Self {
            arm: Duration::from_secs(3),
            recheck: Duration::from_secs(2),
            host_grace: Duration::from_secs(3),
        }
    }
}

/// The action a ladder step asks the client to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallStep {
    /// Explicitly re-fetch the document; a dropped notification may be all
    /// that is wrong.
    Refetch,
    /// The host gives up waiting and issues a direct reset unilaterally.
    HostDirectReset,
    /// The guest asks the host to act by writing a force request.
    GuestForceReset,
    /// The host never answered. Unlock the local surface and report a
    /// synchronization failure rather than looping.
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    Armed,
    Rechecked,
    Commanded,
    Exhausted,
}

/// The play-again stall escalation ladder.
///
/// Armed when the local participant chooses "play again". The client
/// sleeps [`delay`](Self::delay), then calls [`step`](Self::step) with the
/// current view; a `false` `still_waiting` at any step disarms the ladder.
#[derive(Debug, Clone)]
pub struct StallLadder {
    role: Role,
    stage: Stage,
}

impl StallLadder {
    /// Create a ladder for the local role.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            stage: Stage::Idle,
        }
    }

    /// Arm the ladder (the local play-again choice was just written).
    pub fn arm(&mut self) {
        self.stage = Stage::Armed;
    }

    /// Disarm; the stall resolved on its own.
    pub fn cancel(&mut self) {
        self.stage = Stage::Idle;
    }

    /// Whether the ladder is waiting on a timer.
    pub fn is_armed(&self) -> bool {
        !matches!(self.stage, Stage::Idle | Stage::Exhausted)
    }

    /// The sleep before the next [`step`](Self::step), if any.
    pub fn delay(&self, timings: &StallTimings) -> Option<Duration> {
        match self.stage {
            Stage::Armed => Some(timings.arm),
            Stage::Rechecked => Some(timings.recheck),
            Stage::Commanded if self.role == Role::Guest => Some(timings.host_grace),
            _ => None,
        }
    }

    /// Advance the ladder. `still_waiting` is whether the end-of-match
    /// presentation is still up with the local action in its waiting
    /// state; anything else means the stall resolved and the ladder
    /// disarms.
    pub fn step(&mut self, still_waiting: bool) -> Option<StallStep> {
        if !still_waiting {
            self.cancel();
            return None;
        }
        match self.stage {
            Stage::Armed => {
                self.stage = Stage::Rechecked;
                Some(StallStep::Refetch)
            }
            Stage::Rechecked => {
                self.stage = Stage::Commanded;
                Some(match self.role {
                    Role::Host => StallStep::HostDirectReset,
                    Role::Guest => StallStep::GuestForceReset,
                })
            }
            Stage::Commanded => match self.role {
                // The host already reset unilaterally; nothing further.
                Role::Host => {
                    self.stage = Stage::Idle;
                    None
                }
                Role::Guest => {
                    self.stage = Stage::Exhausted;
                    Some(StallStep::GiveUp)
                }
            },
            Stage::Idle | Stage::Exhausted => None,
        }
    }
}
