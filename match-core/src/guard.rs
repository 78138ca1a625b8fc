//! Mutual exclusion around the reconciliation critical section.
//!
//! A single client processes one inbound snapshot at a time. Rather than a
//! bare boolean, the guard is an explicit state with a deadline, so the
//! fail-open timeout is testable: if the holder never releases (a downstream
//! await that never resolves), the hold expires on its own and the next
//! snapshot can steal it. Losing mutual exclusion briefly is preferred to a
//! permanent lock.
//!
//! A release re-arms a short deadline instead of going straight to idle.
//! That window absorbs the echo of the client's own just-published write,
//! which the change feed may deliver back immediately.

/// Guard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GuardState {
    /// Nothing is being reconciled.
    Idle,
    /// A snapshot is being processed, or an echo window is active.
    /// Past `deadline` the hold is considered abandoned.
    Reconciling {
        /// Unix ms after which the hold can be stolen.
        deadline: u64,
    },
}

/// Re-entrancy guard for the reconciliation critical section.
#[derive(Debug, Clone)]
pub struct ReconcileGuard {
    state: GuardState,
    max_hold_ms: u64,
    echo_linger_ms: u64,
}

impl ReconcileGuard {
    /// Create a guard.
    ///
    /// `max_hold_ms` bounds how long a single entry can keep the guard
    /// before it is considered abandoned; `echo_linger_ms` is the
    /// post-release window that absorbs the echo of an own write.
    pub fn new(max_hold_ms: u64, echo_linger_ms: u64) -> Self {
        Self {
            state: GuardState::Idle,
            max_hold_ms,
            echo_linger_ms,
        }
    }

    /// Try to enter the critical section.
    ///
    /// Succeeds when idle or when the previous hold's deadline has passed.
    /// On success the guard is held until [`release_now`](Self::release_now),
    /// [`release_after_echo`](Self::release_after_echo), or expiry.
    pub fn try_enter(&mut self, now_ms: u64) -> bool {
        match self.state {
            GuardState::Idle => {
                self.state = GuardState::Reconciling {
                    deadline: now_ms + self.max_hold_ms,
                };
                true
            }
            GuardState::Reconciling { deadline } => {
                if now_ms >= deadline {
                    // Fail-open: the previous holder never released.
                    self.state = GuardState::Reconciling {
                        deadline: now_ms + self.max_hold_ms,
                    };
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Release immediately. The next snapshot may enter right away.
    pub fn release_now(&mut self) {
        self.state = GuardState::Idle;
    }

    /// Release, keeping the guard held for the echo window.
    ///
    /// Used after processing that published a write of its own: the change
    /// feed will deliver that write back, and dropping it is cheaper than
    /// re-merging it.
    pub fn release_after_echo(&mut self, now_ms: u64) {
        self.state = GuardState::Reconciling {
            deadline: now_ms + self.echo_linger_ms,
        };
    }

    /// Whether the guard is held at the given instant.
    pub fn is_held(&self, now_ms: u64) -> bool {
        match self.state {
            GuardState::Idle => false,
            GuardState::Reconciling { deadline } => now_ms < deadline,
        }
    }
}
