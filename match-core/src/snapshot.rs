//! Priority-ordered classification of inbound snapshots.
//!
//! Every snapshot, whether it arrived on the push feed or from the
//! reconciliation poll, is decoded exactly once into a closed set of update
//! variants. The first matching variant wins and later checks are skipped,
//! which makes the dispatch exhaustive and the ordering explicit.

use std::collections::HashSet;

use match_types::{ResetId, ResetKind, Role, Session, SessionStatus};

/// What an inbound snapshot means for the local client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// A direct reset command with a not-yet-applied id. Hard local reset,
    /// bypassing every other field.
    DirectReset {
        /// The command's dedup id.
        id: ResetId,
    },
    /// The other participant left. Terminal; suppresses any win/loss
    /// interpretation and disables play-again.
    OpponentLeft,
    /// A guest asked for a reset. Only the host observes this variant and
    /// answers by issuing a direct reset.
    ForceReset {
        /// The request's dedup id.
        id: ResetId,
    },
    /// A guest took the empty seat while this host was still showing its
    /// waiting room. The host starts the match.
    GuestJoined,
    /// None of the above: field-by-field merge.
    StateMerge,
}

/// Local facts the classifier needs alongside the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext {
    /// The local participant's role.
    pub local_role: Role,
    /// Whether the local host is still showing its waiting room.
    pub in_waiting_room: bool,
}

/// Classify a snapshot. First match wins.
pub fn classify(
    session: &Session,
    ctx: &ClassifyContext,
    applied_resets: &HashSet<ResetId>,
) -> RemoteUpdate {
    let doc = &session.state;

    if let Some(cmd) = doc.reset {
        if cmd.kind == ResetKind::Direct && !applied_resets.contains(&cmd.id) {
            return RemoteUpdate::DirectReset { id: cmd.id };
        }
    }

    if let Some(left_by) = doc.departed {
        if left_by == ctx.local_role.other() {
            return RemoteUpdate::OpponentLeft;
        }
    }

    if let Some(cmd) = doc.reset {
        if cmd.kind == ResetKind::Force
            && ctx.local_role == Role::Host
            && !applied_resets.contains(&cmd.id)
        {
            return RemoteUpdate::ForceReset { id: cmd.id };
        }
    }

    if ctx.local_role == Role::Host
        && ctx.in_waiting_room
        && session.guest_id.is_some()
        && session.status == SessionStatus::Playing
    {
        return RemoteUpdate::GuestJoined;
    }

    RemoteUpdate::StateMerge
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_types::{
        MatchSettings, ParticipantId, ResetCommand, SessionCode, StateDoc,
    };

    fn session() -> Session {
        Session::new(
            SessionCode::parse("4821").unwrap(),
            ParticipantId::new(),
            MatchSettings::default(),
            0,
        )
    }

    fn host_ctx() -> ClassifyContext {
        ClassifyContext {
            local_role: Role::Host,
            in_waiting_room: false,
        }
    }

    fn guest_ctx() -> ClassifyContext {
        ClassifyContext {
            local_role: Role::Guest,
            in_waiting_room: false,
        }
    }

    #[test]
    fn plain_snapshot_is_a_merge() {
        let s = session();
        let update = classify(&s, &host_ctx(), &HashSet::new());
        assert_eq!(update, RemoteUpdate::StateMerge);
    }

    #[test]
    fn fresh_direct_reset_wins_over_everything() {
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Direct);
        s.state.reset = Some(cmd);
        // Even with a departure notice present, the reset is seen first
        s.state.departed = Some(Role::Guest);

        let update = classify(&s, &host_ctx(), &HashSet::new());
        assert_eq!(update, RemoteUpdate::DirectReset { id: cmd.id });
    }

    #[test]
    fn applied_direct_reset_falls_through() {
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Direct);
        s.state.reset = Some(cmd);

        let mut seen = HashSet::new();
        seen.insert(cmd.id);

        let update = classify(&s, &host_ctx(), &seen);
        assert_eq!(update, RemoteUpdate::StateMerge);
    }

    #[test]
    fn departure_of_the_other_role_is_terminal() {
        let mut s = session();
        s.state.departed = Some(Role::Guest);
        assert_eq!(
            classify(&s, &host_ctx(), &HashSet::new()),
            RemoteUpdate::OpponentLeft
        );

        // The guest seeing its own departure notice is not "opponent left"
        assert_eq!(
            classify(&s, &guest_ctx(), &HashSet::new()),
            RemoteUpdate::StateMerge
        );
    }

    #[test]
    fn force_reset_is_host_only() {
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Force);
        s.state.reset = Some(cmd);

        assert_eq!(
            classify(&s, &host_ctx(), &HashSet::new()),
            RemoteUpdate::ForceReset { id: cmd.id }
        );
        assert_eq!(
            classify(&s, &guest_ctx(), &HashSet::new()),
            RemoteUpdate::StateMerge
        );
    }

    #[test]
    fn already_handled_force_reset_is_ignored() {
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Force);
        s.state.reset = Some(cmd);

        let mut seen = HashSet::new();
        seen.insert(cmd.id);

        assert_eq!(
            classify(&s, &host_ctx(), &seen),
            RemoteUpdate::StateMerge
        );
    }

    #[test]
    fn guest_arrival_starts_the_match_for_a_waiting_host() {
        let mut s = session();
        s.seat_guest(ParticipantId::new(), 1);

        let ctx = ClassifyContext {
            local_role: Role::Host,
            in_waiting_room: true,
        };
        assert_eq!(classify(&s, &ctx, &HashSet::new()), RemoteUpdate::GuestJoined);

        // A host already past its waiting room just merges
        assert_eq!(
            classify(&s, &host_ctx(), &HashSet::new()),
            RemoteUpdate::StateMerge
        );
    }

    #[test]
    fn full_reset_marker_is_not_classified_here() {
        // Full resets are handled inside the field merge, not as a
        // top-level variant.
        let mut s = session();
        s.state.reset = Some(ResetCommand::new(ResetKind::Full));
        assert_eq!(
            classify(&s, &host_ctx(), &HashSet::new()),
            RemoteUpdate::StateMerge
        );
    }

    #[test]
    fn departure_beats_force_reset() {
        let mut s = session();
        s.state.departed = Some(Role::Guest);
        s.state.reset = Some(ResetCommand::new(ResetKind::Force));

        assert_eq!(
            classify(&s, &host_ctx(), &HashSet::new()),
            RemoteUpdate::OpponentLeft
        );
    }

    #[test]
    fn doc_is_initial_after_session_new() {
        let s = session();
        assert_eq!(s.state.moves, StateDoc::initial(0).moves);
    }
}
