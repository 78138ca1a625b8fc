//! The reset protocol state machine.
//!
//! Round and match resets are coordinated between the two clients through a
//! tagged command embedded in the shared document. Only a host may
//! originate a *direct* reset; a guest may only request one via a *force*
//! command, which the host converts. Every command carries a unique id, and
//! receivers treat an already-applied id as a no-op, so the at-least-once
//! push feed can deliver the same reset document twice without harm.

use std::collections::HashSet;

use match_types::{ResetCommand, ResetId, ResetKind, Role};

/// Where the protocol currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPhase {
    /// A round is in progress (or the session is idle).
    Active,
    /// The match ended; the end-of-match presentation is up and each
    /// role's play-again choice is being collected.
    AwaitingBothPlayAgain,
    /// A reset document has been written and is propagating.
    ResetCommanded {
        /// The in-flight command's id.
        id: ResetId,
    },
}

/// Per-client view of the reset negotiation.
#[derive(Debug, Clone)]
pub struct ResetProtocol {
    role: Role,
    phase: ResetPhase,
    applied: HashSet<ResetId>,
}

impl ResetProtocol {
    /// Create the protocol view for the local role.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            phase: ResetPhase::Active,
            applied: HashSet::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ResetPhase {
        self.phase
    }

    /// Ids this client has already applied, for snapshot classification.
    pub fn applied(&self) -> &HashSet<ResetId> {
        &self.applied
    }

    /// The match ended and the end-of-match presentation is showing.
    pub fn match_ended(&mut self) {
        if self.phase == ResetPhase::Active {
            self.phase = ResetPhase::AwaitingBothPlayAgain;
        }
    }

    /// Originate a direct reset. Hosts only; a guest gets `None` and must
    /// go through [`request_force`](Self::request_force) instead.
    ///
    /// The fresh id is recorded as applied immediately: the local state is
    /// reset by the caller in the same breath, so the echo of this command
    /// coming back through the feed must be a no-op.
    pub fn issue_direct(&mut self) -> Option<ResetCommand> {
        if self.role != Role::Host {
            return None;
        }
        let cmd = ResetCommand::new(ResetKind::Direct);
        self.applied.insert(cmd.id);
        self.phase = ResetPhase::ResetCommanded { id: cmd.id };
        Some(cmd)
    }

    /// Originate a round-reset marker after a won round below the score
    /// target. Hosts only, like every other reset origination.
    pub fn issue_full(&mut self) -> Option<ResetCommand> {
        if self.role != Role::Host {
            return None;
        }
        let cmd = ResetCommand::new(ResetKind::Full);
        self.applied.insert(cmd.id);
        Some(cmd)
    }

    /// Ask the host to reset. Guests only, and only while no reset is
    /// already in flight.
    pub fn request_force(&mut self) -> Option<ResetCommand> {
        if self.role != Role::Guest {
            return None;
        }
        if matches!(self.phase, ResetPhase::ResetCommanded { .. }) {
            return None;
        }
        let cmd = ResetCommand::new(ResetKind::Force);
        self.applied.insert(cmd.id);
        Some(cmd)
    }

    /// Record an inbound reset id. Returns `true` when the id is new and
    /// the reset should be applied; `false` for a duplicate delivery.
    ///
    /// A newly applied reset completes the negotiation: the protocol
    /// returns to [`ResetPhase::Active`].
    pub fn observe(&mut self, id: ResetId) -> bool {
        if self.applied.insert(id) {
            self.phase = ResetPhase::Active;
            true
        } else {
            false
        }
    }

    /// A host marks a force request as handled so duplicate deliveries of
    /// the same request do not spawn a second direct reset.
    pub fn note_force_handled(&mut self, id: ResetId) {
        self.applied.insert(id);
    }

    /// The commanded reset has been applied locally; negotiation is over.
    pub fn completed(&mut self) {
        self.phase = ResetPhase::Active;
    }
}
