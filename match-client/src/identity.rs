//! Local persistent identity storage.
//!
//! Participant identity is explicit configuration passed into the engine
//! at construction, never ambient state. The same store also remembers the
//! last liveness ping so an idle client does not hammer the remote store.

use std::sync::{Arc, Mutex};

use match_types::ParticipantId;

/// Local-machine persistent key-value storage the engine consumes.
pub trait IdentityStore: Send + Sync {
    /// The persisted participant id, if one exists.
    fn participant_id(&self) -> Option<ParticipantId>;

    /// Persist the participant id.
    fn set_participant_id(&self, id: ParticipantId);

    /// When the store was last pinged (Unix ms), if ever.
    fn last_ping_ms(&self) -> Option<u64>;

    /// Record a liveness ping.
    fn set_last_ping_ms(&self, at: u64);
}

/// Load the persisted participant id, creating and persisting one on
/// first use.
pub fn load_or_create_identity(store: &dyn IdentityStore) -> ParticipantId {
    match store.participant_id() {
        Some(id) => id,
        None => {
            let id = ParticipantId::new();
            store.set_participant_id(id);
            id
        }
    }
}

/// In-memory identity store, for tests and ephemeral clients.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    inner: Arc<Mutex<MemoryIdentityInner>>,
}

#[derive(Debug, Default)]
struct MemoryIdentityInner {
    participant_id: Option<ParticipantId>,
    last_ping_ms: Option<u64>,
}

impl MemoryIdentity {
    /// Create an empty identity store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clone for MemoryIdentity {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl IdentityStore for MemoryIdentity {
    fn participant_id(&self) -> Option<ParticipantId> {
        self.inner.lock().unwrap().participant_id
    }

    fn set_participant_id(&self, id: ParticipantId) {
        self.inner.lock().unwrap().participant_id = Some(id);
    }

    fn last_ping_ms(&self) -> Option<u64> {
        self.inner.lock().unwrap().last_ping_ms
    }

    fn set_last_ping_ms(&self, at: u64) {
        self.inner.lock().unwrap().last_ping_ms = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_created_once_and_reused() {
        let store = MemoryIdentity::new();
        assert!(store.participant_id().is_none());

        let first = load_or_create_identity(&store);
        let second = load_or_create_identity(&store);
        assert_eq!(first, second);
        assert_eq!(store.participant_id(), Some(first));
    }

    #[test]
    fn ping_timestamp_roundtrips() {
        let store = MemoryIdentity::new();
        assert!(store.last_ping_ms().is_none());

        store.set_last_ping_ms(1_700_000_000_000);
        assert_eq!(store.last_ping_ms(), Some(1_700_000_000_000));
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryIdentity::new();
        let copy = store.clone();

        let id = load_or_create_identity(&store);
        assert_eq!(copy.participant_id(), Some(id));
    }
}
