//! # rematch-core
//!
//! Pure logic for the rematch synchronization engine (no I/O, instant tests).
//!
//! This crate implements the state machines and merge rules for keeping two
//! clients' mirrors of a shared game document consistent, without any
//! network or timer I/O.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take the current mirror,
//! an incoming snapshot, and a clock reading, and produce a new mirror plus
//! a list of effects to execute. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about the priority-ordered snapshot interpretation
//!
//! The actual I/O (store calls, timers, rendering) is performed by
//! `rematch-client`, which interprets the effects produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deadlock;
pub mod guard;
pub mod reconcile;
pub mod reset;
pub mod reveal;
pub mod snapshot;

pub use deadlock::{converged_turn, MoveActivity, StallLadder, StallStep, StallTimings};
pub use guard::ReconcileGuard;
pub use reconcile::{apply_update, Effect, Mirror, REDRAW_INTERVAL_MS};
pub use reset::{ResetPhase, ResetProtocol};
pub use reveal::{match_concluded, reveal_delay, reveal_timestamp, DEFAULT_REVEAL_DELAY};
pub use snapshot::{classify, ClassifyContext, RemoteUpdate};
