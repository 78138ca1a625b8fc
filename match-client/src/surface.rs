//! The rendering surface collaborator.
//!
//! The engine never draws anything itself; it calls out through
//! [`GameSurface`] and expects every method to return promptly. Redraws
//! are always full redraws from the mirror - the surface must not assume
//! it saw every intermediate state.

use std::sync::{Arc, Mutex};

use match_types::{Mark, MoveBoard, ScorePair, WinningLine};

/// What the end-of-match presentation should say.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndOfMatch {
    /// A mark won the match.
    Winner(Mark),
    /// The other participant left; terminal and non-scoring.
    OpponentLeft,
    /// Recovery was exhausted; ask the user to leave and rejoin.
    SyncFailed,
}

/// The rendering/input surface the engine drives.
///
/// Implementations must not block; the engine calls these from its
/// reconciliation path.
pub trait GameSurface: Send + Sync {
    /// Redraw the whole board from the given state.
    fn render_board(&self, moves: &MoveBoard, winning_line: Option<WinningLine>);

    /// Re-render the score display, optionally animating one counter.
    fn render_scores(&self, scores: &ScorePair, animate_for: Option<Mark>);

    /// Re-render the turn/status line.
    fn render_status(&self, current_player: Mark, is_local_turn: bool);

    /// Present the end-of-match dialog.
    fn render_end_of_match(&self, outcome: EndOfMatch);

    /// Enable or disable the play-again action.
    fn set_play_again_enabled(&self, enabled: bool);

    /// Append "opponent wants to play again" to an open end dialog.
    fn append_opponent_wants_rematch(&self);

    /// Tear down and reconstruct the surface completely. Used after
    /// direct and full resets so no stale visual state survives.
    fn rebuild(&self);
}

/// Everything a [`RecordingSurface`] saw, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    /// `render_board`
    Board {
        /// Total marks drawn.
        total_marks: usize,
        /// Highlighted line, if any.
        winning_line: Option<WinningLine>,
    },
    /// `render_scores`
    Scores {
        /// The scores as rendered.
        scores: ScorePair,
        /// Animated counter, if any.
        animate_for: Option<Mark>,
    },
    /// `render_status`
    Status {
        /// Whose move is next.
        current_player: Mark,
        /// Whether the local participant moves.
        is_local_turn: bool,
    },
    /// `render_end_of_match`
    EndOfMatch(EndOfMatch),
    /// `set_play_again_enabled`
    PlayAgainEnabled(bool),
    /// `append_opponent_wants_rematch`
    OpponentWantsRematch,
    /// `rebuild`
    Rebuild,
}

/// Recording surface for tests: captures every call for verification.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    calls: Arc<Mutex<Vec<SurfaceCall>>>,
    last_board: Arc<Mutex<Option<MoveBoard>>>,
}

impl RecordingSurface {
    /// Create a fresh recording surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded calls, in order.
    pub fn calls(&self) -> Vec<SurfaceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The most recently rendered board.
    pub fn last_board(&self) -> Option<MoveBoard> {
        self.last_board.lock().unwrap().clone()
    }

    /// Recorded end-of-match outcomes, in order.
    pub fn end_outcomes(&self) -> Vec<EndOfMatch> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                SurfaceCall::EndOfMatch(outcome) => Some(outcome),
                _ => None,
            })
            .collect()
    }

    /// How many full surface rebuilds happened.
    pub fn rebuild_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, SurfaceCall::Rebuild))
            .count()
    }

    /// Clear the recording.
    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
        self.last_board.lock().unwrap().take();
    }

    fn push(&self, call: SurfaceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Clone for RecordingSurface {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            last_board: Arc::clone(&self.last_board),
        }
    }
}

impl GameSurface for RecordingSurface {
    fn render_board(&self, moves: &MoveBoard, winning_line: Option<WinningLine>) {
        *self.last_board.lock().unwrap() = Some(moves.clone());
        self.push(SurfaceCall::Board {
            total_marks: moves.total(),
            winning_line,
        });
    }

    fn render_scores(&self, scores: &ScorePair, animate_for: Option<Mark>) {
        self.push(SurfaceCall::Scores {
            scores: *scores,
            animate_for,
        });
    }

    fn render_status(&self, current_player: Mark, is_local_turn: bool) {
        self.push(SurfaceCall::Status {
            current_player,
            is_local_turn,
        });
    }

    fn render_end_of_match(&self, outcome: EndOfMatch) {
        self.push(SurfaceCall::EndOfMatch(outcome));
    }

    fn set_play_again_enabled(&self, enabled: bool) {
        self.push(SurfaceCall::PlayAgainEnabled(enabled));
    }

    fn append_opponent_wants_rematch(&self) {
        self.push(SurfaceCall::OpponentWantsRematch);
    }

    fn rebuild(&self) {
        self.push(SurfaceCall::Rebuild);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_surface_captures_call_order() {
        let surface = RecordingSurface::new();
        let board = MoveBoard::empty();

        surface.render_board(&board, None);
        surface.render_status(Mark::X, true);
        surface.rebuild();

        let calls = surface.calls();
        assert_eq!(calls.len(), 3);
        assert!(matches!(calls[0], SurfaceCall::Board { .. }));
        assert!(matches!(calls[2], SurfaceCall::Rebuild));
        assert_eq!(surface.rebuild_count(), 1);
    }

    #[test]
    fn last_board_tracks_the_latest_render() {
        let surface = RecordingSurface::new();
        let mut board = MoveBoard::empty();
        surface.render_board(&board, None);

        board.for_mark_mut(Mark::X).push(4);
        surface.render_board(&board, None);

        assert_eq!(surface.last_board().unwrap().for_mark(Mark::X), &[4]);
    }

    #[test]
    fn end_outcomes_are_collected() {
        let surface = RecordingSurface::new();
        surface.render_end_of_match(EndOfMatch::Winner(Mark::O));
        surface.render_end_of_match(EndOfMatch::OpponentLeft);

        assert_eq!(
            surface.end_outcomes(),
            vec![EndOfMatch::Winner(Mark::O), EndOfMatch::OpponentLeft]
        );
    }

    #[test]
    fn clones_share_the_recording() {
        let surface = RecordingSurface::new();
        let copy = surface.clone();
        surface.render_status(Mark::X, false);

        assert_eq!(copy.calls().len(), 1);
    }
}
