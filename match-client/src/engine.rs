//! The match engine: session lifecycle, synchronization channel, and the
//! driver for the pure reconciliation core.
//!
//! One engine is one client. It owns the local [`Mirror`], feeds every
//! inbound snapshot - push or poll - through the same guarded handler, and
//! interprets the effects the core produces. All remote calls are
//! fire-and-continue; a failed publish is logged and left for the next
//! poll to reconverge rather than retried inline.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use match_core::{
    apply_update, classify, match_concluded, reveal_delay, reveal_timestamp, Effect, Mirror,
    ReconcileGuard, ResetPhase, ResetProtocol, StallLadder, StallStep,
};
use match_types::{
    unix_millis, Mark, MatchSettings, PlayAgain, Role, Session, SessionCode, SessionStatus,
    StateDoc, SyncError,
};

use crate::config::EngineConfig;
use crate::identity::{load_or_create_identity, IdentityStore};
use crate::rules::Rules;
use crate::store::{DocumentStore, StoreError};
use crate::surface::{EndOfMatch, GameSurface};

/// The client-side synchronization engine.
///
/// Cheap to clone; clones share the same session state, so background
/// tasks hold clones and funnel everything through one mirror.
pub struct MatchEngine<S, U, R> {
    inner: Arc<EngineInner<S, U, R>>,
}

impl<S, U, R> Clone for MatchEngine<S, U, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct EngineInner<S, U, R> {
    store: S,
    surface: U,
    rules: R,
    identity: Arc<dyn IdentityStore>,
    config: EngineConfig,
    participant: match_types::ParticipantId,
    epoch: tokio::time::Instant,
    active: Mutex<Option<ActiveSession>>,
}

/// Per-session state, alive between create/join and leave.
struct ActiveSession {
    base: Session,
    role: Role,
    mirror: Mirror,
    resets: ResetProtocol,
    guard: ReconcileGuard,
    stall: StallLadder,
    tasks: Vec<JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn new(base: Session, role: Role, config: &EngineConfig, now_ms: u64) -> Self {
        let settings = base.settings;
        Self {
            role,
            mirror: Mirror::new(role, settings, now_ms),
            resets: ResetProtocol::new(role),
            guard: ReconcileGuard::new(config.guard_hold_ms, config.echo_linger_ms),
            stall: StallLadder::new(role),
            base,
            tasks: Vec::new(),
            countdown: None,
        }
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        if let Some(countdown) = self.countdown.take() {
            countdown.abort();
        }
    }
}

fn store_err(error: StoreError) -> SyncError {
    match error {
        StoreError::NotFound => SyncError::NotFound,
        other => SyncError::Store(other.to_string()),
    }
}

/// Assemble the outbound document from the mirror, carrying over the
/// untouched control fields of the last known record.
fn doc_from_mirror(active: &ActiveSession, now: u64) -> StateDoc {
    let mirror = &active.mirror;
    let mut doc = active.base.state.clone();
    doc.moves = mirror.moves.clone();
    doc.current_player = mirror.current_player;
    doc.scores = mirror.scores;
    doc.round_starter = mirror.round_starter;
    doc.winning_line = mirror.winning_line.map(Some);
    doc.active = Some(mirror.active);
    doc.play_again = Some(mirror.play_again);
    doc.reset = None;
    doc.departed = None;
    doc.timestamp = now;
    doc
}

impl<S, U, R> MatchEngine<S, U, R>
where
    S: DocumentStore + 'static,
    U: GameSurface + 'static,
    R: Rules + 'static,
{
    /// Create an engine. The participant identity is loaded from (or
    /// created in) the given identity store.
    pub fn new(
        store: S,
        surface: U,
        rules: R,
        identity: Arc<dyn IdentityStore>,
        config: EngineConfig,
    ) -> Self {
        let participant = load_or_create_identity(identity.as_ref());
        Self {
            inner: Arc::new(EngineInner {
                store,
                surface,
                rules,
                identity,
                config,
                participant,
                epoch: tokio::time::Instant::now(),
                active: Mutex::new(None),
            }),
        }
    }

    /// The stable local participant id.
    pub fn participant_id(&self) -> match_types::ParticipantId {
        self.inner.participant
    }

    /// A copy of the current mirror, if a session is active.
    pub async fn mirror(&self) -> Option<Mirror> {
        self.inner.active.lock().await.as_ref().map(|a| a.mirror.clone())
    }

    /// Whether a session is currently held.
    pub async fn in_session(&self) -> bool {
        self.inner.active.lock().await.is_some()
    }

    /// Monotonic engine-local milliseconds, used for the guard and
    /// staleness bookkeeping (never written into the document).
    fn mono_ms(&self) -> u64 {
        self.inner.epoch.elapsed().as_millis() as u64
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Create a new session and seat the caller as host.
    pub async fn create(&self, settings: MatchSettings) -> Result<SessionCode, SyncError> {
        let mut slot = self.inner.active.lock().await;
        if slot.is_some() {
            return Err(SyncError::AlreadyInSession);
        }

        let now = unix_millis();
        let code = SessionCode::random();
        let session = Session::new(code.clone(), self.inner.participant, settings, now);
        self.inner
            .store
            .insert(session.clone())
            .await
            .map_err(store_err)?;

        tracing::info!(code = %code, "session created, waiting for a guest");
        *slot = Some(ActiveSession::new(session, Role::Host, &self.inner.config, self.mono_ms()));
        drop(slot);

        self.start_channel(code.clone()).await?;
        self.liveness_ping().await;
        Ok(code)
    }

    /// Join an existing session as guest.
    ///
    /// Re-joining with the same participant id is a state-preserving
    /// rejoin; with `reconnect` set, the shared state is reset to round 1
    /// with zero scores instead.
    pub async fn join(&self, code: SessionCode, reconnect: bool) -> Result<(), SyncError> {
        let mut slot = self.inner.active.lock().await;
        if slot.is_some() {
            return Err(SyncError::AlreadyInSession);
        }

        let now = unix_millis();
        let mut session = self.inner.store.get(&code).await.map_err(store_err)?;

        if let Some(guest) = session.guest_id {
            if guest != self.inner.participant
                && session.status == SessionStatus::Playing
                && !reconnect
            {
                return Err(SyncError::SessionFull);
            }
        }

        session.seat_guest(self.inner.participant, now);
        if reconnect {
            session.state = StateDoc::initial(now);
            session.state.host_ready = Some(true);
            session.state.play_again = Some(PlayAgain::default());
        }
        session.state.mark_ready(Role::Guest);
        self.inner
            .store
            .update(&code, session.clone())
            .await
            .map_err(store_err)?;

        tracing::info!(code = %code, reconnect, "joined session as guest");

        let mut state = ActiveSession::new(session.clone(), Role::Guest, &self.inner.config, self.mono_ms());
        if !reconnect {
            state.mirror.moves = session.state.moves.clone();
            state.mirror.current_player = session.state.current_player;
            state.mirror.scores = session.state.scores;
            state.mirror.round_starter = session.state.round_starter;
        }
        *slot = Some(state);
        drop(slot);

        self.start_channel(code).await?;
        self.liveness_ping().await;
        Ok(())
    }

    /// Leave the current session.
    ///
    /// Writes a departure notice; a host then schedules the session's
    /// deletion after a grace delay so the notice can propagate, while a
    /// guest clears its seat and returns the session to waiting.
    pub async fn leave(&self) -> Result<(), SyncError> {
        let mut slot = self.inner.active.lock().await;
        let Some(mut active) = slot.take() else {
            return Ok(());
        };
        drop(slot);

        active.abort_tasks();

        let now = unix_millis();
        let code = active.base.code.clone();
        let role = active.role;

        let mut session = active.base.clone();
        let mut doc = doc_from_mirror(&active, now);
        doc.departed = Some(role);
        doc.active = Some(false);
        doc.clear_line();
        session.state = doc;
        session.last_activity = now;
        if let Err(e) = self.inner.store.update(&code, session.clone()).await {
            tracing::warn!(error = %e, "departure notice failed to publish");
        }

        match role {
            Role::Host => {
                let engine = self.clone();
                let grace = self.inner.config.leave_grace();
                let code = code.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(grace).await;
                    if let Err(e) = engine.inner.store.delete(&code).await {
                        tracing::warn!(error = %e, "session deletion failed");
                    }
                });
            }
            Role::Guest => {
                session.clear_guest(now);
                if let Err(e) = self.inner.store.update(&code, session).await {
                    tracing::warn!(error = %e, "guest seat clear failed");
                }
            }
        }

        tracing::info!(code = %code, %role, "left session");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Synchronization channel
    // ------------------------------------------------------------------

    /// Start the push feed and the reconciliation poll, then immediately
    /// fetch once to close the race between subscribing and a state change
    /// that happened before the subscription completed.
    async fn start_channel(&self, code: SessionCode) -> Result<(), SyncError> {
        let mut subscription = self.inner.store.subscribe(&code).await.map_err(store_err)?;

        let engine = self.clone();
        let watch = tokio::spawn(async move {
            while let Some(session) = subscription.next().await {
                engine.handle_snapshot(session).await;
            }
            tracing::debug!("change feed closed");
        });

        let engine = self.clone();
        let poll_code = code.clone();
        let interval = self.inner.config.poll_interval();
        let poll = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let due = {
                    let slot = engine.inner.active.lock().await;
                    match slot.as_ref() {
                        Some(a) => a.mirror.active && !a.guard.is_held(engine.mono_ms()),
                        None => break,
                    }
                };
                if due {
                    engine.refetch(&poll_code).await;
                }
            }
        });

        let engine = self.clone();
        let fetch_code = code;
        let fetch = tokio::spawn(async move {
            engine.refetch(&fetch_code).await;
        });

        let mut slot = self.inner.active.lock().await;
        if let Some(active) = slot.as_mut() {
            active.tasks.extend([watch, poll, fetch]);
        }
        Ok(())
    }

    /// Explicitly fetch the document and feed it through the inbound
    /// handler, exactly like a pushed change.
    async fn refetch(&self, code: &SessionCode) {
        match self.inner.store.get(code).await {
            Ok(session) => self.handle_snapshot(session).await,
            Err(e) => tracing::warn!(error = %e, "fetch failed; the next poll will retry"),
        }
    }

    /// Touch the store at most once per ping interval, recording the
    /// instant in local persistent storage.
    async fn liveness_ping(&self) {
        let now = unix_millis();
        let due = match self.inner.identity.last_ping_ms() {
            None => true,
            Some(last) => now.saturating_sub(last) >= self.inner.config.ping_interval_ms,
        };
        if !due {
            return;
        }
        match self.inner.store.ping().await {
            Ok(()) => {
                self.inner.identity.set_last_ping_ms(now);
                tracing::debug!("liveness ping recorded");
            }
            // Not recorded on failure, so the next opportunity retries
            Err(e) => tracing::warn!(error = %e, "liveness ping failed"),
        }
    }

    // ------------------------------------------------------------------
    // Inbound reconciliation
    // ------------------------------------------------------------------

    /// The single entry point for all inbound state, whether pushed or
    /// polled. Guarded: a snapshot arriving while one is being processed
    /// is dropped - the next poll or push redelivers it.
    async fn handle_snapshot(&self, session: Session) {
        let mut slot = self.inner.active.lock().await;
        let Some(active) = slot.as_mut() else {
            return;
        };
        if session.code != active.base.code {
            return;
        }

        let now = self.mono_ms();
        if !active.guard.try_enter(now) {
            tracing::trace!("snapshot dropped: reconciliation busy");
            return;
        }

        let update = classify(&session, &active.mirror.classify_ctx(), active.resets.applied());
        tracing::debug!(?update, "snapshot classified");

        let effects = apply_update(&mut active.mirror, &mut active.resets, &session, update, now);
        active.base = session;

        let published = self.run_effects(active, effects).await;
        if published {
            active.guard.release_after_echo(self.mono_ms());
        } else {
            active.guard.release_now();
        }
        self.arm_countdown(active);
    }

    /// Interpret the effects produced by the core. Returns whether any of
    /// them published a write (so the caller holds the guard through the
    /// echo window).
    async fn run_effects(&self, active: &mut ActiveSession, effects: Vec<Effect>) -> bool {
        let surface = &self.inner.surface;
        let mut published = false;
        let mut reveal_hint = None;

        for effect in effects {
            match effect {
                Effect::Redraw => {
                    surface.render_board(&active.mirror.moves, active.mirror.winning_line);
                }
                Effect::RenderScores { animate_for } => {
                    surface.render_scores(&active.mirror.scores, animate_for);
                }
                Effect::RenderStatus => {
                    surface.render_status(active.mirror.current_player, active.mirror.is_local_turn());
                }
                Effect::ClearWinHighlight => {
                    surface.render_board(&active.mirror.moves, None);
                }
                Effect::HighlightWin(line) => {
                    surface.render_board(&active.mirror.moves, Some(line));
                }
                Effect::RebuildSurface => {
                    surface.rebuild();
                    surface.render_board(&active.mirror.moves, active.mirror.winning_line);
                    surface.set_play_again_enabled(true);
                }
                Effect::StartMatch => {
                    let now = unix_millis();
                    let mut doc = doc_from_mirror(active, now);
                    doc.host_ready = Some(true);
                    doc.guest_ready = Some(true);
                    published |= self.publish(active, doc, Some(SessionStatus::Playing)).await;
                }
                Effect::OpponentLeft => {
                    active.stall.cancel();
                    surface.render_end_of_match(EndOfMatch::OpponentLeft);
                    surface.set_play_again_enabled(false);
                }
                Effect::RelayDirectReset => {
                    published |= self.issue_direct_reset(active).await;
                }
                Effect::PublishRevealTimestamp => {
                    let at = reveal_timestamp(unix_millis(), self.inner.config.reveal_delay());
                    reveal_hint = Some(at);
                    let mut doc = active.base.state.clone();
                    doc.reveal_at = Some(at);
                    doc.timestamp = unix_millis();
                    published |= self.publish(active, doc, None).await;
                }
                Effect::ScheduleReveal { winner, at } => {
                    self.spawn_reveal(active, winner, at.or(reveal_hint));
                }
                Effect::ScheduleRoundRestart { .. } => {
                    self.spawn_round_restart(active);
                }
                Effect::BothWantRematch => {
                    if active.role == Role::Host
                        && active.resets.phase() == ResetPhase::AwaitingBothPlayAgain
                    {
                        published |= self.issue_direct_reset(active).await;
                    }
                }
                Effect::OpponentWantsRematch => {
                    surface.append_opponent_wants_rematch();
                }
            }
        }
        published
    }

    /// Publish the assembled record as a whole-document update. Failures
    /// are logged, not retried: the periodic poll re-establishes
    /// convergence.
    async fn publish(
        &self,
        active: &mut ActiveSession,
        doc: StateDoc,
        status: Option<SessionStatus>,
    ) -> bool {
        let mut session = active.base.clone();
        session.last_activity = doc.timestamp;
        session.state = doc;
        if let Some(status) = status {
            session.status = status;
        }
        let code = session.code.clone();
        match self.inner.store.update(&code, session.clone()).await {
            Ok(()) => {
                active.base = session;
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "publish failed; the next poll will reconverge");
                false
            }
        }
    }

    // ------------------------------------------------------------------
    // Resets
    // ------------------------------------------------------------------

    /// Reset locally, rebuild the surface, and publish a direct reset
    /// document. Hosts only; a guest's protocol refuses to mint the
    /// command and this becomes a no-op.
    async fn issue_direct_reset(&self, active: &mut ActiveSession) -> bool {
        let Some(cmd) = active.resets.issue_direct() else {
            return false;
        };
        tracing::info!(id = %cmd.id, "issuing direct reset");

        let starter = active.mirror.round_starter.opponent();
        active.mirror.begin_round(starter);
        active.mirror.play_again = PlayAgain::default();
        active.mirror.end_shown = false;
        active.mirror.end_pending = false;
        active.mirror.end_locked = false;
        active.mirror.opponent_wants_rematch = false;
        active.stall.cancel();

        let surface = &self.inner.surface;
        surface.rebuild();
        surface.render_board(&active.mirror.moves, None);
        surface.render_scores(&active.mirror.scores, None);
        surface.render_status(active.mirror.current_player, active.mirror.is_local_turn());
        surface.set_play_again_enabled(true);

        let now = unix_millis();
        let mut doc = doc_from_mirror(active, now);
        doc.reset = Some(cmd);
        doc.clear_line();
        doc.host_ready = Some(true);
        doc.guest_ready = Some(true);
        doc.reveal_at = None;
        doc.match_winner = None;
        self.publish(active, doc, Some(SessionStatus::Playing)).await
    }

    /// Host-side round restart after a won round below the score target.
    /// Alternates the round starter and publishes a full-reset marker; a
    /// guest's timer only re-checks and yields to the host's document.
    async fn restart_round(&self) {
        let mut slot = self.inner.active.lock().await;
        let Some(active) = slot.as_mut() else {
            return;
        };
        // Cooperative re-check: the round may already have restarted, or
        // the session may have turned terminal while the timer ran.
        if active.mirror.active || active.mirror.opponent_left || active.mirror.end_pending {
            return;
        }
        if active.role != Role::Host {
            return;
        }
        let Some(cmd) = active.resets.issue_full() else {
            return;
        };

        let starter = active.mirror.round_starter.opponent();
        active.mirror.begin_round(starter);
        tracing::debug!(starter = %starter, "starting the next round");

        let surface = &self.inner.surface;
        surface.render_board(&active.mirror.moves, None);
        surface.render_status(active.mirror.current_player, active.mirror.is_local_turn());

        let now = unix_millis();
        let mut doc = doc_from_mirror(active, now);
        doc.reset = Some(cmd);
        doc.clear_line();
        if self.publish(active, doc, Some(SessionStatus::Playing)).await {
            active.guard.release_after_echo(self.mono_ms());
        }
        self.arm_countdown(active);
    }

    fn spawn_round_restart(&self, active: &mut ActiveSession) {
        let engine = self.clone();
        let delay = self.inner.config.round_restart();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.restart_round().await;
        });
        active.tasks.push(handle);
    }

    // ------------------------------------------------------------------
    // End-of-match presentation
    // ------------------------------------------------------------------

    fn spawn_reveal(&self, active: &mut ActiveSession, winner: Mark, at: Option<u64>) {
        let engine = self.clone();
        let fallback = self.inner.config.reveal_delay();
        let handle = tokio::spawn(async move {
            let delay = reveal_delay(at, unix_millis(), fallback);
            tokio::time::sleep(delay).await;
            engine.present_end(winner).await;
        });
        active.tasks.push(handle);
    }

    async fn present_end(&self, winner: Mark) {
        let mut slot = self.inner.active.lock().await;
        let Some(active) = slot.as_mut() else {
            return;
        };
        // Cooperative re-check: a departure or reset may have landed while
        // the timer ran.
        if active.mirror.opponent_left || active.mirror.end_shown || active.mirror.active {
            return;
        }
        active.mirror.end_shown = true;
        active.mirror.end_pending = false;

        let surface = &self.inner.surface;
        surface.render_end_of_match(EndOfMatch::Winner(winner));
        surface.set_play_again_enabled(true);
        if active.mirror.opponent_wants_rematch {
            surface.append_opponent_wants_rematch();
            active.mirror.opponent_wants_rematch = false;
        }
    }

    // ------------------------------------------------------------------
    // Local operations
    // ------------------------------------------------------------------

    /// Apply a local move intent.
    ///
    /// Ignored (returning `Ok`) when play is inactive, it is not the local
    /// turn, or the rules reject the position. A winning move increments
    /// the winner's score here, on the publishing side, exactly once.
    pub async fn make_move(&self, position: u8) -> Result<(), SyncError> {
        let mut slot = self.inner.active.lock().await;
        let Some(active) = slot.as_mut() else {
            return Err(SyncError::NotFound);
        };
        if active.mirror.opponent_left || !active.mirror.active || !active.mirror.is_local_turn() {
            return Ok(());
        }

        let mark = active.mirror.local_mark();
        let Some(applied) = self
            .inner
            .rules
            .apply_move(&mut active.mirror.moves, mark, position)
        else {
            tracing::debug!(position, "illegal move ignored");
            return Ok(());
        };

        if let Some(countdown) = active.countdown.take() {
            countdown.abort();
        }

        let now = unix_millis();
        let surface = &self.inner.surface;

        if let Some(line) = applied.winning_line {
            active.mirror.winning_line = Some(line);
            // Publisher-side increment; the document is authoritative for
            // everyone from the moment this write lands.
            active.mirror.scores.increment(mark);
            active.mirror.active = false;
            // current_player stays on the winner so the other side can
            // read who won the round from the document

            surface.render_board(&active.mirror.moves, Some(line));
            surface.render_scores(&active.mirror.scores, Some(mark));

            let concluded = match_concluded(&active.mirror.scores, &active.mirror.settings, mark);
            let mut doc = doc_from_mirror(active, now);
            if concluded {
                tracing::info!(winner = %mark, "match concluded");
                active.resets.match_ended();
                doc.match_winner = Some(mark);
                let mut at = None;
                if active.role == Role::Host {
                    let t = reveal_timestamp(now, self.inner.config.reveal_delay());
                    doc.reveal_at = Some(t);
                    at = Some(t);
                }
                active.mirror.end_pending = true;
                self.publish(active, doc, Some(SessionStatus::Completed)).await;
                self.spawn_reveal(active, mark, at);
            } else {
                tracing::debug!(winner = %mark, "round won");
                self.publish(active, doc, Some(SessionStatus::Completed)).await;
                self.spawn_round_restart(active);
            }
        } else {
            active.mirror.current_player = mark.opponent();
            let doc = doc_from_mirror(active, now);
            self.publish(active, doc, None).await;

            surface.render_board(&active.mirror.moves, None);
            surface.render_status(active.mirror.current_player, active.mirror.is_local_turn());
        }

        // Our own write will echo back through the feed; absorb it.
        active.guard.release_after_echo(self.mono_ms());
        self.arm_countdown(active);
        Ok(())
    }

    /// The local participant chose to play again.
    ///
    /// The choice is written immediately and the stall ladder armed; when
    /// the document shows both choices, the host - and only the host -
    /// writes the one direct-reset document.
    pub async fn play_again(&self) -> Result<(), SyncError> {
        let mut slot = self.inner.active.lock().await;
        let Some(active) = slot.as_mut() else {
            return Err(SyncError::NotFound);
        };
        if active.mirror.opponent_left {
            // Nobody is left to negotiate with
            return Err(SyncError::ResetDeadlock);
        }

        let role = active.role;
        active.resets.match_ended();
        active.mirror.play_again.set(role, true);
        active.mirror.end_locked = true;
        self.inner.surface.set_play_again_enabled(false);

        let now = unix_millis();
        let doc = doc_from_mirror(active, now);
        self.publish(active, doc, None).await;
        active.guard.release_after_echo(self.mono_ms());

        if active.mirror.play_again.both() && role == Role::Host {
            self.issue_direct_reset(active).await;
        } else {
            active.stall.arm();
            self.spawn_stall_ladder(active);
        }
        Ok(())
    }

    fn spawn_stall_ladder(&self, active: &mut ActiveSession) {
        let engine = self.clone();
        let timings = self.inner.config.stall_timings();
        let handle = tokio::spawn(async move {
            loop {
                let delay = {
                    let slot = engine.inner.active.lock().await;
                    let Some(a) = slot.as_ref() else { break };
                    match a.stall.delay(&timings) {
                        Some(d) => d,
                        None => break,
                    }
                };
                tokio::time::sleep(delay).await;

                let (step, code) = {
                    let mut slot = engine.inner.active.lock().await;
                    let Some(a) = slot.as_mut() else { break };
                    let still_waiting =
                        a.mirror.end_shown && a.mirror.end_locked && !a.mirror.opponent_left;
                    (a.stall.step(still_waiting), a.base.code.clone())
                };

                match step {
                    Some(StallStep::Refetch) => {
                        tracing::debug!("play-again stall: re-fetching the document");
                        engine.refetch(&code).await;
                    }
                    Some(StallStep::HostDirectReset) => {
                        tracing::warn!("play-again stall: host resetting unilaterally");
                        let mut slot = engine.inner.active.lock().await;
                        if let Some(a) = slot.as_mut() {
                            engine.issue_direct_reset(a).await;
                        }
                    }
                    Some(StallStep::GuestForceReset) => {
                        tracing::warn!("play-again stall: asking the host to reset");
                        let mut slot = engine.inner.active.lock().await;
                        if let Some(a) = slot.as_mut() {
                            if let Some(cmd) = a.resets.request_force() {
                                let now = unix_millis();
                                let mut doc = doc_from_mirror(a, now);
                                doc.reset = Some(cmd);
                                engine.publish(a, doc, None).await;
                                // No echo window here: the host's direct
                                // reset must get through the instant it
                                // answers, and the force echo merges as a
                                // harmless no-op.
                            }
                        }
                    }
                    Some(StallStep::GiveUp) => {
                        tracing::warn!("play-again stall: recovery exhausted, reporting failure");
                        let mut slot = engine.inner.active.lock().await;
                        if let Some(a) = slot.as_mut() {
                            a.mirror.end_locked = false;
                            engine.inner.surface.set_play_again_enabled(true);
                            engine.inner.surface.render_end_of_match(EndOfMatch::SyncFailed);
                        }
                    }
                    None => {}
                }
            }
        });
        active.tasks.push(handle);
    }

    // ------------------------------------------------------------------
    // Turn countdown
    // ------------------------------------------------------------------

    /// Arm (or re-arm) the per-turn countdown when the session has a turn
    /// limit and it is the local turn. Cancelled the instant a move lands;
    /// an expiry only re-renders status - what a timeout *means* belongs
    /// to the rules collaborator.
    fn arm_countdown(&self, active: &mut ActiveSession) {
        if let Some(countdown) = active.countdown.take() {
            countdown.abort();
        }
        let secs = active.mirror.settings.turn_seconds;
        if secs == 0 || !active.mirror.active || !active.mirror.is_local_turn() {
            return;
        }

        let engine = self.clone();
        let marks_at_arm = active.mirror.moves.total();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs as u64)).await;
            let slot = engine.inner.active.lock().await;
            if let Some(a) = slot.as_ref() {
                // Cooperative: a move may have landed since the timer was set
                if a.mirror.active
                    && a.mirror.is_local_turn()
                    && a.mirror.moves.total() == marks_at_arm
                {
                    engine
                        .inner
                        .surface
                        .render_status(a.mirror.current_player, true);
                }
            }
        });
        active.countdown = Some(handle);
    }
}
