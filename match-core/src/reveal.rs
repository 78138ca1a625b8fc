//! End-of-match reveal timing and scoring rules.
//!
//! When a round is won, the score is incremented exactly once - by the
//! client publishing the winning update. The document's copy is
//! authoritative for both sides from then on; the non-publishing side must
//! never independently increment. Presentation of the end dialog is
//! synchronized through a shared timestamp the host writes into the
//! document; with no timestamp, each side falls back to a fixed delay.

use std::time::Duration;

use match_types::{Mark, MatchSettings, ScorePair};

/// Delay between a win landing and the end dialog opening, used both to
/// pick the shared timestamp and as the fallback when none was supplied.
pub const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(1500);

/// How long to wait before presenting the end dialog.
///
/// With a shared timestamp, both sides aim for the same instant; an
/// already-passed timestamp means "present now". Without one, the caller's
/// fallback delay applies.
pub fn reveal_delay(reveal_at: Option<u64>, now_ms: u64, fallback: Duration) -> Duration {
    match reveal_at {
        Some(at) => Duration::from_millis(at.saturating_sub(now_ms)),
        None => fallback,
    }
}

/// The shared presentation timestamp a host writes on first detecting a
/// qualifying win.
pub fn reveal_timestamp(now_ms: u64, delay: Duration) -> u64 {
    now_ms + delay.as_millis() as u64
}

/// Whether this win concludes the match under the session settings.
pub fn match_concluded(scores: &ScorePair, settings: &MatchSettings, winner: Mark) -> bool {
    settings.score_target > 0 && scores.get(winner) >= settings.score_target
}

/// Safety floor for a remote win: the synced score should already reflect
/// the publisher's increment, but if it somehow lags at zero, bump it so
/// the surface never animates a win onto an empty counter. Returns whether
/// a bump happened.
pub fn ensure_score_floor(scores: &mut ScorePair, winner: Mark) -> bool {
    if scores.get(winner) == 0 {
        scores.increment(winner);
        true
    } else {
        false
    }
}
