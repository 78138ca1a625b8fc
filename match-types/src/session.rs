//! The shared session record.

use serde::{Deserialize, Serialize};

use crate::{ParticipantId, SessionCode, StateDoc};

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, waiting for a guest.
    Waiting,
    /// Both seats taken, match in progress.
    Playing,
    /// Match concluded.
    Completed,
}

/// Match settings, fixed at session creation and copied by the joiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSettings {
    /// Round wins needed to take the match; 0 means no target.
    pub score_target: u32,
    /// Per-turn time limit in seconds; 0 means no limit.
    pub turn_seconds: u32,
    /// Whether the surface highlights the mark about to be evicted.
    pub highlight_removal: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            score_target: 0,
            turn_seconds: 0,
            highlight_removal: true,
        }
    }
}

/// One shared match instance, identified by a short code.
///
/// Holds exactly one host, at most one guest, the settings, and the
/// embedded [`StateDoc`] both clients synchronize against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The human-enterable session code.
    pub code: SessionCode,
    /// The creating participant.
    pub host_id: ParticipantId,
    /// The joined participant, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<ParticipantId>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Settings fixed at creation.
    pub settings: MatchSettings,
    /// The canonical state document.
    pub state: StateDoc,
    /// Last write time in Unix milliseconds.
    pub last_activity: u64,
}

impl Session {
    /// Create a fresh session for a host.
    pub fn new(
        code: SessionCode,
        host_id: ParticipantId,
        settings: MatchSettings,
        now: u64,
    ) -> Self {
        let mut state = StateDoc::initial(now);
        state.host_ready = Some(true);
        Self {
            code,
            host_id,
            guest_id: None,
            status: SessionStatus::Waiting,
            settings,
            state,
            last_activity: now,
        }
    }

    /// Seat a guest and move to `Playing`.
    pub fn seat_guest(&mut self, guest_id: ParticipantId, now: u64) {
        self.guest_id = Some(guest_id);
        self.status = SessionStatus::Playing;
        self.touch(now);
    }

    /// Clear the guest seat and return to `Waiting`.
    pub fn clear_guest(&mut self, now: u64) {
        self.guest_id = None;
        self.status = SessionStatus::Waiting;
        self.touch(now);
    }

    /// Update the activity timestamp.
    pub fn touch(&mut self, now: u64) {
        self.last_activity = now;
        self.state.timestamp = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Session {
        Session::new(
            SessionCode::parse("4821").unwrap(),
            ParticipantId::new(),
            MatchSettings::default(),
            1_700_000_000_000,
        )
    }

    #[test]
    fn new_session_waits_with_host_ready() {
        let session = sample();
        assert_eq!(session.status, SessionStatus::Waiting);
        assert!(session.guest_id.is_none());
        assert_eq!(session.state.host_ready, Some(true));
        assert!(session.state.guest_ready.is_none());
    }

    #[test]
    fn seating_a_guest_starts_play() {
        let mut session = sample();
        let guest = ParticipantId::new();

        session.seat_guest(guest, 1_700_000_000_500);

        assert_eq!(session.status, SessionStatus::Playing);
        assert_eq!(session.guest_id, Some(guest));
        assert_eq!(session.last_activity, 1_700_000_000_500);
    }

    #[test]
    fn clearing_the_guest_returns_to_waiting() {
        let mut session = sample();
        session.seat_guest(ParticipantId::new(), 1);

        session.clear_guest(2);

        assert_eq!(session.status, SessionStatus::Waiting);
        assert!(session.guest_id.is_none());
    }

    #[test]
    fn session_roundtrips_through_json() {
        let mut session = sample();
        session.seat_guest(ParticipantId::new(), 5);

        let json = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, restored);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SessionStatus::Waiting).unwrap(),
            "\"waiting\""
        );
        assert_eq!(
            serde_json::to_string(&SessionStatus::Playing).unwrap(),
            "\"playing\""
        );
    }

    #[test]
    fn default_settings_are_open_ended() {
        let settings = MatchSettings::default();
        assert_eq!(settings.score_target, 0);
        assert_eq!(settings.turn_seconds, 0);
        assert!(settings.highlight_removal);
    }
}
