//! In-memory document store.
//!
//! Backs tests and local play: several engines sharing one
//! `InMemoryStore` behave like two clients against one remote store.
//! Failure injection mimics the unreliable parts of a real feed - silently
//! dropped notifications (to exercise the reconciliation poll) and
//! duplicated delivery (to exercise at-least-once handling).

use super::{DocumentStore, StoreError, Subscription};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use match_types::{Session, SessionCode};

/// Shared in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    sessions: DashMap<SessionCode, Session>,
    subscribers: DashMap<SessionCode, Vec<mpsc::UnboundedSender<Session>>>,
    drop_notifications: AtomicBool,
    duplicate_notifications: AtomicBool,
    fail_next_update: Mutex<Option<String>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Silently drop change notifications from now on. Reads and writes
    /// keep working; only the push feed goes dark.
    pub fn set_drop_notifications(&self, drop: bool) {
        self.inner.drop_notifications.store(drop, Ordering::SeqCst);
    }

    /// Deliver every change notification twice.
    pub fn set_duplicate_notifications(&self, duplicate: bool) {
        self.inner
            .duplicate_notifications
            .store(duplicate, Ordering::SeqCst);
    }

    /// Cause the next `update()` to fail with the given error.
    pub fn fail_next_update(&self, error: &str) {
        let mut slot = self.inner.fail_next_update.lock().unwrap();
        *slot = Some(error.to_string());
    }

    /// Number of live sessions, for test assertions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    fn notify(&self, code: &SessionCode, session: &Session) {
        if self.inner.drop_notifications.load(Ordering::SeqCst) {
            return;
        }
        let repeats = if self.inner.duplicate_notifications.load(Ordering::SeqCst) {
            2
        } else {
            1
        };
        if let Some(mut senders) = self.inner.subscribers.get_mut(code) {
            senders.retain(|tx| {
                let mut ok = true;
                for _ in 0..repeats {
                    ok &= tx.send(session.clone()).is_ok();
                }
                ok
            });
        }
    }
}

impl Clone for InMemoryStore {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, code: &SessionCode) -> Result<Session, StoreError> {
        self.inner
            .sessions
            .get(code)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let code = session.code.clone();
        if self.inner.sessions.contains_key(&code) {
            return Err(StoreError::AlreadyExists);
        }
        self.inner.sessions.insert(code.clone(), session.clone());
        self.notify(&code, &session);
        Ok(())
    }

    async fn update(&self, code: &SessionCode, session: Session) -> Result<(), StoreError> {
        if let Some(error) = self.inner.fail_next_update.lock().unwrap().take() {
            return Err(StoreError::Unavailable(error));
        }
        if !self.inner.sessions.contains_key(code) {
            return Err(StoreError::NotFound);
        }
        self.inner.sessions.insert(code.clone(), session.clone());
        self.notify(code, &session);
        Ok(())
    }

    async fn delete(&self, code: &SessionCode) -> Result<(), StoreError> {
        self.inner.sessions.remove(code);
        self.inner.subscribers.remove(code);
        Ok(())
    }

    async fn subscribe(&self, code: &SessionCode) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner
            .subscribers
            .entry(code.clone())
            .or_default()
            .push(tx);
        Ok(Subscription::new(rx))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
