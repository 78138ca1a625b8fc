//! Identity types for rematch sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A short human-enterable code identifying one shared session.
///
/// Four ASCII digits in the range 1000..=9999, so the code can be read
/// aloud or typed on a phone keyboard.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Generate a new random session code.
    pub fn random() -> Self {
        let mut bytes = [0u8; 2];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        let n = 1000 + u16::from_le_bytes(bytes) % 9000;
        Self(n.to_string())
    }

    /// Parse a code entered by a user.
    ///
    /// Returns `None` unless the input is exactly four ASCII digits.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.len() == 4 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    /// Get the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionCode({})", self.0)
    }
}

/// A stable, locally-generated identifier for one participant.
///
/// Generated once per device and persisted, so a reconnecting participant
/// is recognized as the same seat rather than a stranger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantId(uuid::Uuid);

impl ParticipantId {
    /// Create a new random ParticipantId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Parse a previously persisted id.
    pub fn parse(input: &str) -> Option<Self> {
        uuid::Uuid::parse_str(input).ok().map(Self)
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParticipantId({})", self.0)
    }
}

/// A unique identifier carried by every reset command.
///
/// Receivers must deduplicate on this id: the push feed delivers
/// at-least-once, so the same reset document can arrive twice.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResetId(uuid::Uuid);

impl ResetId {
    /// Create a new random ResetId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for ResetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ResetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResetId({})", self.0)
    }
}
