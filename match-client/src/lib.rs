//! # rematch-client
//!
//! Client engine for synchronizing a two-player turn game through a
//! shared, eventually-consistent document store.
//!
//! The engine owns a local mirror of the shared state, exchanges updates
//! with the store via a push feed and a periodic reconciliation poll,
//! resolves conflicting or stale updates through the pure core in
//! `rematch-core`, detects and breaks turn and play-again deadlocks, and
//! drives an idempotent reset protocol for new rounds and matches.
//!
//! # Architecture
//!
//! ```text
//! Application → MatchEngine → DocumentStore → remote store
//!                    ↓
//!              rematch-core (pure state machines)
//!                    ↓
//!               GameSurface (rendering collaborator)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use rematch_client::{MatchEngine, InMemoryStore, EngineConfig, MemoryIdentity};
//!
//! let engine = MatchEngine::new(store, surface, rules, identity, EngineConfig::default());
//! let code = engine.create(MatchSettings::default()).await?;
//! // share `code`; the guest calls engine.join(code, false)
//! engine.make_move(4).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod engine;
mod identity;
mod rules;
pub mod store;
mod surface;

pub use config::{ConfigError, EngineConfig};
pub use engine::MatchEngine;
pub use identity::{load_or_create_identity, IdentityStore, MemoryIdentity};
pub use rules::{AppliedMove, Rules};
pub use store::{DocumentStore, InMemoryStore, StoreError, Subscription};
pub use surface::{EndOfMatch, GameSurface, RecordingSurface, SurfaceCall};
