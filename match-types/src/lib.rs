//! # rematch-types
//!
//! Shared types for the rematch synchronization engine.
//!
//! This crate provides the foundational types used across all rematch crates:
//! - [`SessionCode`], [`ParticipantId`], [`ResetId`] - Identity types
//! - [`Mark`], [`Role`] - Board symbols and the fixed host/guest assignment
//! - [`StateDoc`] - The canonical state document both clients synchronize against
//! - [`Session`] - The shared session record holding the document
//! - [`SyncError`] - Error taxonomy
//!
//! The document schema defined here **is** the protocol. Field names, flag
//! presence/absence, and the null-vs-absent distinction on the winning line
//! are all part of the compatibility surface.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod document;
mod error;
mod ids;
mod player;
mod session;

pub use document::{
    unix_millis, MoveBoard, PlayAgain, ResetCommand, ResetKind, ScorePair, StateDoc, WinningLine,
    BOARD_CELLS, MARKS_PER_PLAYER,
};
pub use error::SyncError;
pub use ids::{ParticipantId, ResetId, SessionCode};
pub use player::{Mark, Role};
pub use session::{MatchSettings, Session, SessionStatus};
