//! Remote document store abstraction.
//!
//! The engine talks to the shared session record through this trait. The
//! store is assumed to provide read-one-by-key, whole-record update,
//! insert, delete, and a subscribe-to-changes-by-key feed with
//! at-least-once, possibly-reordered delivery that may include changes the
//! subscriber itself produced.
//!
//! # Example
//!
//! ```ignore
//! let store = InMemoryStore::new();
//! store.insert(session).await?;
//! let mut feed = store.subscribe(&code).await?;
//! while let Some(session) = feed.next().await {
//!     // reconcile
//! }
//! ```

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use match_types::{Session, SessionCode};

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with the given code.
    #[error("session not found")]
    NotFound,

    /// A record with the given code already exists.
    #[error("session already exists")]
    AlreadyExists,

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The change feed was closed by the store.
    #[error("subscription closed")]
    SubscriptionClosed,
}

/// A standing subscription to change notifications for one session code.
///
/// Delivery is at-least-once and unordered; the same change can arrive
/// twice, and the subscriber's own writes can echo back.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Session>,
}

impl Subscription {
    /// Wrap a receiver handed out by a store implementation.
    pub fn new(receiver: mpsc::UnboundedReceiver<Session>) -> Self {
        Self { receiver }
    }

    /// The next delivered change, or `None` once the feed closes.
    pub async fn next(&mut self) -> Option<Session> {
        self.receiver.recv().await
    }
}

/// The remote document store the engine synchronizes against.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the session with the given code.
    async fn get(&self, code: &SessionCode) -> Result<Session, StoreError>;

    /// Insert a new session record.
    async fn insert(&self, session: Session) -> Result<(), StoreError>;

    /// Replace the session record. There is no partial update; callers
    /// must have assembled the full intended record.
    async fn update(&self, code: &SessionCode, session: Session) -> Result<(), StoreError>;

    /// Delete the session record.
    async fn delete(&self, code: &SessionCode) -> Result<(), StoreError>;

    /// Subscribe to change notifications for the given code.
    async fn subscribe(&self, code: &SessionCode) -> Result<Subscription, StoreError>;

    /// Liveness touch, keeping an otherwise idle store instance awake.
    async fn ping(&self) -> Result<(), StoreError>;
}
