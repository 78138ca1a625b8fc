//! The reconciliation engine: merging inbound snapshots into the local
//! mirror.
//!
//! [`apply_update`] is the single entry point for every classified
//! snapshot. It mutates the [`Mirror`] and returns a list of [`Effect`]s
//! for the client to execute: pure transitions in, instructions out, I/O
//! elsewhere.
//!
//! The merge copies `moves`, `current_player`, `scores`, and
//! `round_starter` verbatim from the document. The document is
//! authoritative; local values are overwritten, never merged. Redraws are
//! always full redraws from the mirror, which guarantees convergence even
//! after missed intermediate updates.

use match_types::{
    Mark, MatchSettings, MoveBoard, PlayAgain, ResetKind, Role, ScorePair, Session, StateDoc,
    WinningLine,
};

use crate::deadlock::{converged_turn, MoveActivity};
use crate::reset::ResetProtocol;
use crate::reveal::{ensure_score_floor, match_concluded};
use crate::snapshot::{ClassifyContext, RemoteUpdate};

/// A full redraw is forced when more than this many milliseconds have
/// passed since the last one, even if nothing looks changed.
pub const REDRAW_INTERVAL_MS: u64 = 5_000;

/// The client-local copy of the shared state, plus client-only bookkeeping.
#[derive(Debug, Clone)]
pub struct Mirror {
    /// The local participant's role.
    pub role: Role,
    /// Settings fixed at session creation.
    pub settings: MatchSettings,
    /// Mirrored move lists.
    pub moves: MoveBoard,
    /// Mirrored turn owner.
    pub current_player: Mark,
    /// Mirrored scores (authoritative value lives in the document).
    pub scores: ScorePair,
    /// Mirrored round starter.
    pub round_starter: Mark,
    /// The locally known winning line, if a round has been won.
    pub winning_line: Option<WinningLine>,
    /// Whether play is currently active.
    pub active: bool,
    /// Local copy of the play-again choices; overwritten by the document's
    /// copy whenever one is present.
    pub play_again: PlayAgain,
    /// Whether this host is still showing its waiting room.
    pub in_waiting_room: bool,
    /// Whether the end-of-match presentation is on screen.
    pub end_shown: bool,
    /// Whether the end presentation has been scheduled but not yet shown.
    pub end_pending: bool,
    /// Whether the local play-again action is in its waiting state.
    pub end_locked: bool,
    /// Terminal: the other participant left.
    pub opponent_left: bool,
    /// The opponent chose play-again before the local dialog opened.
    pub opponent_wants_rematch: bool,
    /// Move-history staleness tracking.
    pub activity: MoveActivity,
    rendered_signature: u64,
    last_redraw_ms: u64,
}

impl Mirror {
    /// Create a mirror for a fresh session.
    pub fn new(role: Role, settings: MatchSettings, now_ms: u64) -> Self {
        Self {
            role,
            settings,
            moves: MoveBoard::empty(),
            current_player: Mark::X,
            scores: ScorePair::default(),
            round_starter: Mark::X,
            winning_line: None,
            active: true,
            play_again: PlayAgain::default(),
            in_waiting_room: role == Role::Host,
            end_shown: false,
            end_pending: false,
            end_locked: false,
            opponent_left: false,
            opponent_wants_rematch: false,
            activity: MoveActivity::new(now_ms),
            rendered_signature: MoveBoard::empty().signature(),
            last_redraw_ms: now_ms,
        }
    }

    /// The mark the local participant plays.
    pub fn local_mark(&self) -> Mark {
        self.role.mark()
    }

    /// Whether the local participant moves next.
    pub fn is_local_turn(&self) -> bool {
        self.role.is_turn(self.current_player)
    }

    /// Context for snapshot classification.
    pub fn classify_ctx(&self) -> ClassifyContext {
        ClassifyContext {
            local_role: self.role,
            in_waiting_room: self.in_waiting_room,
        }
    }

    /// Adopt the authoritative fields of a reset document and clear every
    /// piece of round-local state.
    fn hard_reset_from(&mut self, doc: &StateDoc) {
        self.moves = doc.moves.clone();
        self.current_player = doc.current_player;
        self.scores = doc.scores;
        self.round_starter = doc.round_starter;
        self.winning_line = None;
        self.active = true;
        self.play_again = PlayAgain::default();
        self.end_shown = false;
        self.end_pending = false;
        self.end_locked = false;
        self.opponent_wants_rematch = false;
    }

    /// Reset local round state for a host-driven round restart, with the
    /// given mark opening the new round.
    pub fn begin_round(&mut self, starter: Mark) {
        self.moves = MoveBoard::empty();
        self.current_player = starter;
        self.round_starter = starter;
        self.winning_line = None;
        self.active = true;
    }

    fn note_redraw(&mut self, now_ms: u64, signature: u64) {
        self.last_redraw_ms = now_ms;
        self.rendered_signature = signature;
    }
}

/// An instruction for the client to execute after a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Fully redraw the board from the mirror. Never incremental.
    Redraw,
    /// Re-render the score display.
    RenderScores {
        /// Animate this mark's counter, if any.
        animate_for: Option<Mark>,
    },
    /// Re-render the turn/status line.
    RenderStatus,
    /// Remove any win highlight from the board.
    ClearWinHighlight,
    /// Highlight the winning line.
    HighlightWin(WinningLine),
    /// Completely reconstruct the rendering surface, not just redraw it.
    /// Used after direct and full resets so no stale visual state survives.
    RebuildSurface,
    /// The guest arrived; leave the waiting room and publish the initial
    /// both-acknowledged document.
    StartMatch,
    /// Terminal: present the departure notice and disable play-again.
    OpponentLeft,
    /// The host must convert a guest force request into a direct reset.
    RelayDirectReset,
    /// Schedule the end-of-match presentation.
    ScheduleReveal {
        /// The match winner.
        winner: Mark,
        /// Shared presentation timestamp, when the document carried one.
        at: Option<u64>,
    },
    /// The host should write the shared presentation timestamp.
    PublishRevealTimestamp,
    /// A remote round win below the score target; restart the round after
    /// the winning line has been on screen for a moment.
    ScheduleRoundRestart {
        /// The round winner.
        winner: Mark,
    },
    /// The document shows both participants want a rematch.
    BothWantRematch,
    /// The opponent wants a rematch and the local dialog is already open.
    OpponentWantsRematch,
}

/// Apply a classified snapshot to the mirror.
pub fn apply_update(
    mirror: &mut Mirror,
    resets: &mut ResetProtocol,
    session: &Session,
    update: RemoteUpdate,
    now_ms: u64,
) -> Vec<Effect> {
    match update {
        RemoteUpdate::DirectReset { id } => {
            if !resets.observe(id) {
                return Vec::new();
            }
            mirror.hard_reset_from(&session.state);
            let sig = mirror.moves.signature();
            mirror.note_redraw(now_ms, sig);
            vec![
                Effect::RebuildSurface,
                Effect::RenderScores { animate_for: None },
                Effect::RenderStatus,
            ]
        }
        RemoteUpdate::OpponentLeft => {
            mirror.opponent_left = true;
            mirror.active = false;
            // Never interpreted as a win or loss
            mirror.winning_line = None;
            vec![Effect::ClearWinHighlight, Effect::OpponentLeft]
        }
        RemoteUpdate::ForceReset { id } => {
            resets.note_force_handled(id);
            vec![Effect::RelayDirectReset]
        }
        RemoteUpdate::GuestJoined => {
            mirror.in_waiting_room = false;
            mirror.begin_round(Mark::X);
            let sig = mirror.moves.signature();
            mirror.note_redraw(now_ms, sig);
            vec![Effect::StartMatch, Effect::Redraw, Effect::RenderStatus]
        }
        RemoteUpdate::StateMerge => merge(mirror, resets, session, now_ms),
    }
}

/// Field-by-field merge of a snapshot that carried no higher-priority
/// command.
fn merge(
    mirror: &mut Mirror,
    resets: &mut ResetProtocol,
    session: &Session,
    now_ms: u64,
) -> Vec<Effect> {
    let doc = &session.state;
    let mut effects = Vec::new();

    let old_player = mirror.current_player;
    let had_line = mirror.winning_line.is_some();

    // Document is authoritative for these, regardless of whose turn it is.
    mirror.moves = doc.moves.clone();
    mirror.current_player = doc.current_player;
    mirror.scores = doc.scores;
    mirror.round_starter = doc.round_starter;

    // A full-reset marker short-circuits the rest of the merge.
    if let Some(cmd) = doc.reset {
        if cmd.kind == ResetKind::Full && resets.observe(cmd.id) {
            mirror.moves = MoveBoard::empty();
            mirror.current_player = doc.round_starter;
            mirror.winning_line = None;
            mirror.active = true;
            mirror.play_again = PlayAgain::default();
            mirror.end_shown = false;
            mirror.end_pending = false;
            mirror.end_locked = false;
            // Scores were already taken from the document above, so a
            // round reset preserves them unless the document said otherwise.
            let sig = mirror.moves.signature();
            mirror.note_redraw(now_ms, sig);
            effects.push(Effect::RebuildSurface);
            effects.push(Effect::RenderScores { animate_for: None });
            effects.push(Effect::RenderStatus);
            return effects;
        }
    }

    if let Some(active) = doc.active {
        mirror.active = active;
    }

    if let Some(choices) = doc.play_again {
        merge_play_again(mirror, choices, &mut effects);
    }

    // An explicit null is a clear signal, even for a win the mirror never
    // learned about.
    if doc.winning_line == Some(None) && mirror.winning_line.is_some() {
        mirror.winning_line = None;
        effects.push(Effect::ClearWinHighlight);
    }

    effects.push(Effect::RenderStatus);

    let signature = mirror.moves.signature();
    let changed = signature != mirror.rendered_signature || mirror.current_player != old_player;
    mirror.activity.observe(mirror.moves.total(), now_ms);

    if changed || now_ms.saturating_sub(mirror.last_redraw_ms) > REDRAW_INTERVAL_MS {
        mirror.note_redraw(now_ms, signature);
        effects.push(Effect::Redraw);
        effects.push(Effect::RenderScores { animate_for: None });

        // Steady-state turn convergence: with both acknowledgments present
        // the document's current player is trusted absolutely.
        if let Some(current) = converged_turn(doc) {
            mirror.current_player = current;
        }
    }

    // Win and match-end interpretation happen last.
    if let Some(winner) = doc.match_winner {
        mirror.active = false;
        resets.match_ended();
        if let Some(line) = doc.line() {
            if !had_line {
                mirror.winning_line = Some(line);
                effects.push(Effect::HighlightWin(line));
            }
        }
        schedule_reveal(mirror, winner, doc.reveal_at, &mut effects);
    } else if let Some(line) = doc.line() {
        if !had_line {
            mirror.winning_line = Some(line);
            // The publisher leaves `current_player` on the mark that made
            // the winning move, so the winner is readable from the document.
            let winner = doc.current_player;

            if match_concluded(&mirror.scores, &mirror.settings, winner) {
                mirror.active = false;
                resets.match_ended();
                effects.push(Effect::HighlightWin(line));
                schedule_reveal(mirror, winner, doc.reveal_at, &mut effects);
            } else if winner != mirror.local_mark() {
                // A remote round win below the target. The local win was
                // already handled when the move was published.
                mirror.active = false;
                ensure_score_floor(&mut mirror.scores, winner);
                effects.push(Effect::HighlightWin(line));
                effects.push(Effect::RenderScores {
                    animate_for: Some(winner),
                });
                effects.push(Effect::ScheduleRoundRestart { winner });
            }
        }
    }

    effects
}

fn merge_play_again(mirror: &mut Mirror, choices: PlayAgain, effects: &mut Vec<Effect>) {
    let local = mirror.role;
    let other = local.other();
    mirror.play_again = choices;

    if choices.both() {
        effects.push(Effect::BothWantRematch);
    } else if choices.for_role(other) && !choices.for_role(local) {
        if mirror.end_shown {
            effects.push(Effect::OpponentWantsRematch);
        } else {
            mirror.opponent_wants_rematch = true;
        }
    }
}

fn schedule_reveal(mirror: &mut Mirror, winner: Mark, at: Option<u64>, effects: &mut Vec<Effect>) {
    if mirror.end_pending || mirror.end_shown {
        return;
    }
    mirror.end_pending = true;
    if mirror.role == Role::Host && at.is_none() {
        effects.push(Effect::PublishRevealTimestamp);
    }
    effects.push(Effect::ScheduleReveal { winner, at });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::classify;
    use match_types::{MatchSettings, ParticipantId, ResetCommand, SessionCode};

    fn session() -> Session {
        let mut s = Session::new(
            SessionCode::parse("4821").unwrap(),
            ParticipantId::new(),
            MatchSettings::default(),
            0,
        );
        s.seat_guest(ParticipantId::new(), 0);
        s.state.guest_ready = Some(true);
        s
    }

    fn host_mirror() -> (Mirror, ResetProtocol) {
        let mut mirror = Mirror::new(Role::Host, MatchSettings::default(), 0);
        mirror.in_waiting_room = false;
        (mirror, ResetProtocol::new(Role::Host))
    }

    fn guest_mirror() -> (Mirror, ResetProtocol) {
        (
            Mirror::new(Role::Guest, MatchSettings::default(), 0),
            ResetProtocol::new(Role::Guest),
        )
    }

    fn run(
        mirror: &mut Mirror,
        resets: &mut ResetProtocol,
        session: &Session,
        now_ms: u64,
    ) -> Vec<Effect> {
        let update = classify(session, &mirror.classify_ctx(), resets.applied());
        apply_update(mirror, resets, session, update, now_ms)
    }

    #[test]
    fn authoritative_fields_are_copied_verbatim() {
        let (mut mirror, mut resets) = guest_mirror();
        let mut s = session();
        s.state.moves.for_mark_mut(Mark::X).push(4);
        s.state.current_player = Mark::O;
        s.state.scores.set(Mark::X, 2);
        s.state.round_starter = Mark::O;

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert_eq!(mirror.moves.for_mark(Mark::X), &[4]);
        assert_eq!(mirror.current_player, Mark::O);
        assert_eq!(mirror.scores.get(Mark::X), 2);
        assert_eq!(mirror.round_starter, Mark::O);
        assert!(effects.contains(&Effect::Redraw));
        assert!(effects.contains(&Effect::RenderStatus));
    }

    #[test]
    fn unchanged_state_within_redraw_interval_skips_the_redraw() {
        let (mut mirror, mut resets) = guest_mirror();
        let s = session();

        let effects = run(&mut mirror, &mut resets, &s, 1_000);
        assert!(!effects.contains(&Effect::Redraw));
        assert!(effects.contains(&Effect::RenderStatus));
    }

    #[test]
    fn stale_mirror_is_redrawn_even_without_changes() {
        let (mut mirror, mut resets) = guest_mirror();
        let s = session();

        let effects = run(&mut mirror, &mut resets, &s, REDRAW_INTERVAL_MS + 1);
        assert!(effects.contains(&Effect::Redraw));
    }

    #[test]
    fn null_winning_line_clears_a_highlight_the_mirror_never_saw_set() {
        let (mut mirror, mut resets) = guest_mirror();
        // The mirror holds a line from a win whose origin it never learned
        mirror.winning_line = Some(WinningLine::new([0, 1, 2]));

        let mut s = session();
        s.state.clear_line();

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(mirror.winning_line.is_none());
        assert!(effects.contains(&Effect::ClearWinHighlight));
    }

    #[test]
    fn absent_winning_line_leaves_the_highlight_alone() {
        let (mut mirror, mut resets) = guest_mirror();
        mirror.winning_line = Some(WinningLine::new([0, 1, 2]));

        let s = session();
        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(mirror.winning_line.is_some());
        assert!(!effects.contains(&Effect::ClearWinHighlight));
    }

    #[test]
    fn full_reset_preserves_scores_and_short_circuits() {
        let (mut mirror, mut resets) = guest_mirror();
        mirror.winning_line = Some(WinningLine::new([0, 1, 2]));
        mirror.end_shown = true;

        let mut s = session();
        s.state.scores.set(Mark::X, 3);
        s.state.round_starter = Mark::O;
        s.state.reset = Some(ResetCommand::new(ResetKind::Full));

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert_eq!(mirror.scores.get(Mark::X), 3, "scores preserved");
        assert_eq!(mirror.moves.total(), 0);
        assert_eq!(mirror.current_player, Mark::O, "starter opens the round");
        assert!(mirror.active);
        assert!(mirror.winning_line.is_none());
        assert!(!mirror.end_shown);
        assert!(effects.contains(&Effect::RebuildSurface));
        assert!(!effects.contains(&Effect::Redraw), "merge short-circuits");
    }

    #[test]
    fn duplicate_full_reset_merges_normally() {
        let (mut mirror, mut resets) = guest_mirror();
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Full);
        s.state.reset = Some(cmd);

        let first = run(&mut mirror, &mut resets, &s, 100);
        assert!(first.contains(&Effect::RebuildSurface));

        let second = run(&mut mirror, &mut resets, &s, 200);
        assert!(
            !second.contains(&Effect::RebuildSurface),
            "an applied id is a no-op"
        );
    }

    #[test]
    fn direct_reset_rebuilds_the_surface() {
        let (mut mirror, mut resets) = guest_mirror();
        mirror.end_shown = true;
        mirror.winning_line = Some(WinningLine::new([3, 4, 5]));

        let mut s = session();
        s.state.scores.set(Mark::O, 2);
        s.state.round_starter = Mark::O;
        s.state.current_player = Mark::O;
        s.state.reset = Some(ResetCommand::new(ResetKind::Direct));

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(effects.contains(&Effect::RebuildSurface));
        assert_eq!(mirror.scores.get(Mark::O), 2, "scores preserved");
        assert!(mirror.winning_line.is_none());
        assert!(!mirror.end_shown);
        assert!(mirror.active);
    }

    #[test]
    fn departure_suppresses_win_interpretation() {
        let (mut mirror, mut resets) = host_mirror();
        mirror.winning_line = Some(WinningLine::new([0, 4, 8]));

        let mut s = session();
        s.state.departed = Some(Role::Guest);
        // Even with a winner recorded, the departure is terminal
        s.state.match_winner = Some(Mark::O);

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(mirror.opponent_left);
        assert!(!mirror.active);
        assert!(mirror.winning_line.is_none());
        assert!(effects.contains(&Effect::OpponentLeft));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleReveal { .. })));
    }

    #[test]
    fn force_reset_asks_the_host_to_relay() {
        let (mut mirror, mut resets) = host_mirror();
        let mut s = session();
        let cmd = ResetCommand::new(ResetKind::Force);
        s.state.reset = Some(cmd);

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert_eq!(effects, vec![Effect::RelayDirectReset]);

        // The same request delivered again does not relay twice
        let again = run(&mut mirror, &mut resets, &s, 200);
        assert!(!again.contains(&Effect::RelayDirectReset));
    }

    #[test]
    fn guest_arrival_starts_the_match() {
        let (mut mirror, mut resets) = host_mirror();
        mirror.in_waiting_room = true;

        let s = session();
        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(effects.contains(&Effect::StartMatch));
        assert!(!mirror.in_waiting_room);
        assert_eq!(mirror.current_player, Mark::X, "host opens the first round");
    }

    #[test]
    fn match_winner_schedules_a_reveal_once() {
        let (mut mirror, mut resets) = guest_mirror();
        let mut s = session();
        s.state.match_winner = Some(Mark::X);
        s.state.reveal_at = Some(10_000);

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(effects.contains(&Effect::ScheduleReveal {
            winner: Mark::X,
            at: Some(10_000),
        }));
        assert!(!mirror.active);

        // The next poll re-delivers the same document
        let again = run(&mut mirror, &mut resets, &s, 400);
        assert!(
            !again.iter().any(|e| matches!(e, Effect::ScheduleReveal { .. })),
            "reveal is scheduled exactly once"
        );
    }

    #[test]
    fn host_supplies_the_missing_reveal_timestamp() {
        let (mut mirror, mut resets) = host_mirror();
        let mut s = session();
        s.state.match_winner = Some(Mark::O);

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(effects.contains(&Effect::PublishRevealTimestamp));
    }

    #[test]
    fn guest_never_supplies_the_reveal_timestamp() {
        let (mut mirror, mut resets) = guest_mirror();
        let mut s = session();
        s.state.match_winner = Some(Mark::O);

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(!effects.contains(&Effect::PublishRevealTimestamp));
    }

    #[test]
    fn remote_round_win_below_target_restarts_the_round() {
        let (mut mirror, mut resets) = guest_mirror();
        let mut s = session();
        // X (the host) just won a round; publisher left current_player on X
        s.state.moves.for_mark_mut(Mark::X).extend([0, 1, 2]);
        s.state.current_player = Mark::X;
        s.state.scores.set(Mark::X, 1);
        s.state.winning_line = Some(Some(WinningLine::new([0, 1, 2])));

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(effects.contains(&Effect::HighlightWin(WinningLine::new([0, 1, 2]))));
        assert!(effects.contains(&Effect::RenderScores {
            animate_for: Some(Mark::X),
        }));
        assert!(effects.contains(&Effect::ScheduleRoundRestart { winner: Mark::X }));
        assert!(!mirror.active);
    }

    #[test]
    fn own_round_win_is_not_reinterpreted() {
        // The winning side already presented its win when it published the
        // move; seeing the document again must not double-handle it.
        let (mut mirror, mut resets) = host_mirror();
        mirror.winning_line = Some(WinningLine::new([0, 1, 2]));

        let mut s = session();
        s.state.moves.for_mark_mut(Mark::X).extend([0, 1, 2]);
        s.state.current_player = Mark::X;
        s.state.scores.set(Mark::X, 1);
        s.state.winning_line = Some(Some(WinningLine::new([0, 1, 2])));

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleRoundRestart { .. })));
    }

    #[test]
    fn round_win_at_the_target_concludes_the_match() {
        let (mut mirror, mut resets) = guest_mirror();
        mirror.settings.score_target = 2;

        let mut s = session();
        s.state.moves.for_mark_mut(Mark::X).extend([0, 1, 2]);
        s.state.current_player = Mark::X;
        s.state.scores.set(Mark::X, 2);
        s.state.winning_line = Some(Some(WinningLine::new([0, 1, 2])));

        let effects = run(&mut mirror, &mut resets, &s, 100);

        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleReveal { winner: Mark::X, .. })));
        assert!(!effects
            .iter()
            .any(|e| matches!(e, Effect::ScheduleRoundRestart { .. })));
        assert_eq!(resets.phase(), crate::ResetPhase::AwaitingBothPlayAgain);
    }

    #[test]
    fn both_play_again_choices_surface_the_agreement() {
        let (mut mirror, mut resets) = host_mirror();
        let mut s = session();
        s.state.play_again = Some(PlayAgain {
            host: true,
            guest: true,
        });

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(effects.contains(&Effect::BothWantRematch));
        assert!(mirror.play_again.both(), "document copy is authoritative");
    }

    #[test]
    fn opponent_choice_before_dialog_is_remembered() {
        let (mut mirror, mut resets) = host_mirror();
        let mut s = session();
        s.state.play_again = Some(PlayAgain {
            host: false,
            guest: true,
        });

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(!effects.contains(&Effect::OpponentWantsRematch));
        assert!(mirror.opponent_wants_rematch, "flag held until the dialog opens");
    }

    #[test]
    fn opponent_choice_with_dialog_open_is_appended() {
        let (mut mirror, mut resets) = host_mirror();
        mirror.end_shown = true;

        let mut s = session();
        s.state.play_again = Some(PlayAgain {
            host: false,
            guest: true,
        });

        let effects = run(&mut mirror, &mut resets, &s, 100);
        assert!(effects.contains(&Effect::OpponentWantsRematch));
    }

    #[test]
    fn turn_converges_from_the_document_when_both_acknowledged() {
        let (mut mirror, mut resets) = guest_mirror();
        mirror.current_player = Mark::O; // desynced local belief

        let mut s = session();
        s.state.current_player = Mark::X;
        s.state.moves.for_mark_mut(Mark::O).push(3);

        run(&mut mirror, &mut resets, &s, 100);
        assert_eq!(mirror.current_player, Mark::X);
    }
}
