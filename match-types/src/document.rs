//! The canonical state document.
//!
//! This is the single shared record both clients read and write. There is no
//! row-level partial update: every write replaces the whole structure, and
//! the receiving side merges it field by field. Optional control flags are
//! omitted from the serialized form when unset, because *presence* is part
//! of their meaning — most notably the winning line, where an explicit
//! `null` is a clear signal and absence says nothing at all.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Mark, ResetId, Role};

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// Maximum simultaneous marks per player. The external rule engine evicts
/// the oldest mark when a fourth is placed; this crate only records what
/// the document says.
pub const MARKS_PER_PLAYER: usize = 3;

/// Current Unix time in milliseconds.
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The three positions forming a won round's line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WinningLine([u8; 3]);

impl WinningLine {
    /// Create a winning line from three positions.
    pub fn new(positions: [u8; 3]) -> Self {
        Self(positions)
    }

    /// The positions on the line.
    pub fn positions(&self) -> [u8; 3] {
        self.0
    }

    /// Whether the line passes through the given position.
    pub fn contains(&self, position: u8) -> bool {
        self.0.contains(&position)
    }
}

/// Per-mark ordered move lists.
///
/// Each list holds the positions a player currently occupies, oldest first,
/// at most [`MARKS_PER_PLAYER`] long.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBoard {
    /// Positions occupied by X, oldest first.
    #[serde(rename = "X")]
    pub x: Vec<u8>,
    /// Positions occupied by O, oldest first.
    #[serde(rename = "O")]
    pub o: Vec<u8>,
}

impl MoveBoard {
    /// An empty board.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The move list for a mark.
    pub fn for_mark(&self, mark: Mark) -> &[u8] {
        match mark {
            Mark::X => &self.x,
            Mark::O => &self.o,
        }
    }

    /// Mutable move list for a mark.
    pub fn for_mark_mut(&mut self, mark: Mark) -> &mut Vec<u8> {
        match mark {
            Mark::X => &mut self.x,
            Mark::O => &mut self.o,
        }
    }

    /// Total number of marks on the board.
    pub fn total(&self) -> usize {
        self.x.len() + self.o.len()
    }

    /// Whether any mark occupies the given position.
    pub fn occupied(&self, position: u8) -> bool {
        self.x.contains(&position) || self.o.contains(&position)
    }

    /// A cheap fingerprint of the move history, used to decide whether a
    /// full redraw is needed after a merge.
    pub fn signature(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.x.hash(&mut hasher);
        self.o.hash(&mut hasher);
        hasher.finish()
    }
}

/// Per-mark round-win counters.
///
/// Monotonically non-decreasing within a match. The document's copy is
/// authoritative on every client; local values are always overwritten,
/// never recomputed from move history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorePair {
    /// Rounds won by X.
    #[serde(rename = "X")]
    pub x: u32,
    /// Rounds won by O.
    #[serde(rename = "O")]
    pub o: u32,
}

impl ScorePair {
    /// Score for a mark.
    pub fn get(&self, mark: Mark) -> u32 {
        match mark {
            Mark::X => self.x,
            Mark::O => self.o,
        }
    }

    /// Increment a mark's score by one.
    pub fn increment(&mut self, mark: Mark) {
        match mark {
            Mark::X => self.x += 1,
            Mark::O => self.o += 1,
        }
    }

    /// Set a mark's score.
    pub fn set(&mut self, mark: Mark, value: u32) {
        match mark {
            Mark::X => self.x = value,
            Mark::O => self.o = value,
        }
    }
}

/// The kind of a reset command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetKind {
    /// Host-originated hard reset: both clients rebuild state and surface.
    Direct,
    /// Guest-originated request asking the host to issue a direct reset.
    Force,
    /// Round-reset marker handled inside the field merge.
    Full,
}

/// A directed reset command embedded in the document.
///
/// Every command carries a unique id; receivers treat an already-applied id
/// as a no-op so duplicate push delivery is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCommand {
    /// Unique id for deduplication.
    pub id: ResetId,
    /// What kind of reset this is.
    pub kind: ResetKind,
}

impl ResetCommand {
    /// Create a command of the given kind with a fresh id.
    pub fn new(kind: ResetKind) -> Self {
        Self {
            id: ResetId::new(),
            kind,
        }
    }
}

/// The pair of "wants to play again" choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayAgain {
    /// Whether the host chose to play again.
    pub host: bool,
    /// Whether the guest chose to play again.
    pub guest: bool,
}

impl PlayAgain {
    /// The choice recorded for a role.
    pub fn for_role(&self, role: Role) -> bool {
        match role {
            Role::Host => self.host,
            Role::Guest => self.guest,
        }
    }

    /// Record a role's choice.
    pub fn set(&mut self, role: Role, wants: bool) {
        match role {
            Role::Host => self.host = wants,
            Role::Guest => self.guest = wants,
        }
    }

    /// Whether both participants want to continue.
    pub fn both(&self) -> bool {
        self.host && self.guest
    }
}

/// The canonical state document.
///
/// Embedded in the [`Session`](crate::Session) record as a single
/// read/write unit. `timestamp` records write time for staleness
/// comparisons only; the store does not guarantee monotonic delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDoc {
    /// Per-mark occupied positions.
    pub moves: MoveBoard,
    /// The mark whose move is next.
    pub current_player: Mark,
    /// Round-win counters, authoritative from the document.
    pub scores: ScorePair,
    /// The mark that must open the *next* round; alternates each round.
    pub round_starter: Mark,
    /// The current round's winning line.
    ///
    /// Three states: absent (outer `None`, no statement), explicit `null`
    /// (inner `None`, clear any local highlight), or a line.
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub winning_line: Option<Option<WinningLine>>,
    /// A directed reset command, if one is in flight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetCommand>,
    /// Host's one-shot game-start acknowledgment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ready: Option<bool>,
    /// Guest's one-shot game-start acknowledgment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_ready: Option<bool>,
    /// The authoritative play-again choice pair.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_again: Option<PlayAgain>,
    /// Departure notice naming the role that left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departed: Option<Role>,
    /// Shared end-of-match presentation time (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reveal_at: Option<u64>,
    /// Present when the match has concluded, naming the winner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_winner: Option<Mark>,
    /// Explicit activity flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    /// Write time in Unix milliseconds.
    pub timestamp: u64,
}

impl StateDoc {
    /// A fresh document for a newly created session.
    pub fn initial(now: u64) -> Self {
        Self {
            moves: MoveBoard::empty(),
            current_player: Mark::X,
            scores: ScorePair::default(),
            round_starter: Mark::X,
            winning_line: None,
            reset: None,
            host_ready: None,
            guest_ready: None,
            play_again: None,
            departed: None,
            reveal_at: None,
            match_winner: None,
            active: Some(true),
            timestamp: now,
        }
    }

    /// Record a role's game-start acknowledgment.
    pub fn mark_ready(&mut self, role: Role) {
        match role {
            Role::Host => self.host_ready = Some(true),
            Role::Guest => self.guest_ready = Some(true),
        }
    }

    /// Whether both one-shot acknowledgments are present.
    pub fn both_ready(&self) -> bool {
        self.host_ready.is_some() && self.guest_ready.is_some()
    }

    /// The winning line, flattened across the null-vs-absent distinction.
    pub fn line(&self) -> Option<WinningLine> {
        self.winning_line.flatten()
    }

    /// Write an explicit `null` winning line (a clear signal, not "unset").
    pub fn clear_line(&mut self) {
        self.winning_line = Some(None);
    }
}

/// Deserialize a field so that an explicit `null` becomes `Some(None)`
/// while an absent field stays `None` (via `#[serde(default)]`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
