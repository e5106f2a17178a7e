//! Match arena: owns every live match, the player registry and the queues,
//! and turns client actions and timer expiries into state changes plus
//! outbound snapshots.
//!
//! Lock order is lobby, then a single match, then registry/rng. No DashMap
//! guard is held while waiting on a match lock.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use game_core::{
    ConundrumCorpus, DictionaryProvider, FinishedMatch, LetterPool, Match, MatchHistorySink,
    ParticipantInfo, PhaseKey, PhaseTimings, Transition,
};
use game_types::{
    ActionError, ActionErrorPayload, IdentifyRequest, LetterKind, MatchFound, MatchId,
    MatchmakingState, MatchmakingStatus, PlayerId, QueueMode, ServerMessage, SessionInfo,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::auth::PlayerAuthorizer;
use crate::matchmaking::MatchmakingQueue;
use crate::registry::{Player, PlayerRegistry};
use crate::scheduler::{PhaseScheduler, TimerHandle};
use crate::websocket::connection::{ConnectionId, ConnectionManager};

/// Everything the orchestrator talks to but does not own.
pub struct Collaborators {
    pub dictionary: Arc<dyn DictionaryProvider>,
    pub corpus: Arc<ConundrumCorpus>,
    pub letter_pool: LetterPool,
    pub scheduler: Arc<dyn PhaseScheduler>,
    pub connections: Arc<ConnectionManager>,
    pub history: Arc<dyn MatchHistorySink>,
    pub authorizer: Arc<dyn PlayerAuthorizer>,
}

type SharedMatch = Arc<Mutex<Match>>;

pub struct MatchOrchestrator {
    this: Weak<Self>,
    timings: PhaseTimings,
    registry: PlayerRegistry,
    queue: MatchmakingQueue,
    matches: DashMap<MatchId, SharedMatch>,
    timers: DashMap<MatchId, TimerHandle>,
    lobby: Mutex<()>,
    rng: Mutex<StdRng>,
    dictionary: Arc<dyn DictionaryProvider>,
    corpus: Arc<ConundrumCorpus>,
    letter_pool: LetterPool,
    scheduler: Arc<dyn PhaseScheduler>,
    connections: Arc<ConnectionManager>,
    history: Arc<dyn MatchHistorySink>,
    authorizer: Arc<dyn PlayerAuthorizer>,
}

impl MatchOrchestrator {
    pub fn new(timings: PhaseTimings, collaborators: Collaborators, rng: StdRng) -> Arc<Self> {
        let Collaborators {
            dictionary,
            corpus,
            letter_pool,
            scheduler,
            connections,
            history,
            authorizer,
        } = collaborators;

        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            timings,
            registry: PlayerRegistry::new(),
            queue: MatchmakingQueue::new(),
            matches: DashMap::new(),
            timers: DashMap::new(),
            lobby: Mutex::new(()),
            rng: Mutex::new(rng),
            dictionary,
            corpus,
            letter_pool,
            scheduler,
            connections,
            history,
            authorizer,
        })
    }

    pub fn connections(&self) -> &Arc<ConnectionManager> {
        &self.connections
    }

    /// `session:identify`. Binds the connection to a player, new or resumed,
    /// and replays the player's match if it has one.
    pub fn identify(
        &self,
        connection_id: ConnectionId,
        request: IdentifyRequest,
    ) -> Result<SessionInfo, ActionError> {
        let (player, abandoned) = {
            let _lobby = self.lobby.lock();

            if let Some(requested) = request.player_id {
                let known = self.registry.get(requested).is_some();
                if known && !self.authorizer.may_claim(connection_id, requested) {
                    warn!(connection = %connection_id, player_id = %requested, "Refused player claim");
                    return Err(ActionError::Unauthorized);
                }
            }

            let previous = self.registry.player_for_connection(connection_id);
            let player = self.registry.connect(
                connection_id,
                request.player_id,
                request.display_name.as_deref(),
            );

            // the connection used to speak for someone else
            let abandoned = previous.filter(|p| *p != player.player_id);
            if let Some(old) = abandoned {
                self.queue.remove_player(old);
            }
            (player, abandoned.and_then(|old| self.registry.match_of(old)))
        };

        let session = SessionInfo {
            player_id: player.player_id,
            display_name: player.display_name.clone(),
            server_now_ms: self.scheduler.now_ms(),
            is_authenticated: self.authorizer.is_authenticated(connection_id),
        };
        self.send(connection_id, ServerMessage::SessionIdentified(session.clone()));

        if let Some(match_id) = abandoned {
            self.broadcast_match(match_id);
        }
        if let Some(match_id) = player.match_id {
            debug!(player_id = %player.player_id, match_id = %match_id, "Resuming match on identify");
            self.broadcast_match(match_id);
        }

        Ok(session)
    }

    /// `queue:join`. Pairs immediately when another eligible player waits.
    pub fn join_queue(&self, connection_id: ConnectionId, mode: QueueMode) -> Result<(), ActionError> {
        let player_id = self.require_player(connection_id)?;
        let _lobby = self.lobby.lock();

        let player = self.registry.get(player_id).ok_or(ActionError::UnknownPlayer)?;
        if player.match_id.is_some() {
            return Err(ActionError::AlreadyInMatch);
        }

        self.queue.add_player(player_id, mode);

        let mut matched = false;
        while let Some(pair) = self.queue.try_create_match(mode, |candidate| {
            self.registry.is_connected(candidate) && self.registry.match_of(candidate).is_none()
        }) {
            matched |= pair.contains(&player_id);
            self.create_match(pair, mode);
        }

        if !matched {
            self.send_status(player_id, mode, MatchmakingState::Queued);
        }
        Ok(())
    }

    /// `queue:leave`. Leaving when not queued is not an error.
    pub fn leave_queue(&self, connection_id: ConnectionId) -> Result<(), ActionError> {
        let player_id = self.require_player(connection_id)?;
        let _lobby = self.lobby.lock();

        let mode = self.queue.remove_player(player_id).unwrap_or(QueueMode::Casual);
        self.send_status(player_id, mode, MatchmakingState::Idle);
        Ok(())
    }

    /// `match:resume`. Re-sends the current snapshot to a participant.
    pub fn resume_match(&self, connection_id: ConnectionId, match_id: MatchId) -> Result<(), ActionError> {
        let player_id = self.require_player(connection_id)?;
        let shared = self.match_handle(match_id)?;
        let game = shared.lock();
        game.ensure_participant(player_id)?;

        let participants = self.participants(&game);
        let view = game.view_for(player_id, self.scheduler.now_ms(), &participants);
        self.send(connection_id, ServerMessage::MatchState(view));
        Ok(())
    }

    pub fn forfeit(&self, connection_id: ConnectionId) -> Result<(), ActionError> {
        let (player_id, match_id) = self.require_match(connection_id)?;
        self.run_action(match_id, |game, now_ms| game.forfeit(player_id, now_ms))
    }

    pub fn pick_letter(&self, connection_id: ConnectionId, kind: LetterKind) -> Result<(), ActionError> {
        let (player_id, match_id) = self.require_match(connection_id)?;
        self.run_action(match_id, |game, now_ms| {
            let mut rng = self.rng.lock();
            game.pick_letter(player_id, kind, now_ms, &self.letter_pool, &mut *rng)
        })
    }

    pub fn submit_word(&self, connection_id: ConnectionId, word: &str) -> Result<(), ActionError> {
        let (player_id, match_id) = self.require_match(connection_id)?;
        self.run_action(match_id, |game, now_ms| {
            game.submit_word(player_id, word, now_ms, self.dictionary.as_ref())
        })
    }

    pub fn submit_conundrum_guess(
        &self,
        connection_id: ConnectionId,
        guess: &str,
    ) -> Result<(), ActionError> {
        let (player_id, match_id) = self.require_match(connection_id)?;
        self.run_action(match_id, |game, now_ms| {
            let last_guess = self.registry.last_guess_at(player_id);
            let outcome = game.submit_conundrum_guess(player_id, guess, now_ms, last_guess)?;
            self.registry.set_last_guess(player_id, now_ms);
            if outcome.correct {
                info!(match_id = %match_id, player_id = %player_id, "Conundrum solved");
            }
            Ok(outcome.transition)
        })
    }

    /// Socket closed. The player goes offline and leaves any queue; a match in
    /// progress keeps running and the opponent is told.
    pub fn disconnect(&self, connection_id: ConnectionId) {
        let match_id = {
            let _lobby = self.lobby.lock();
            let Some(player) = self.registry.disconnect(connection_id) else {
                return;
            };
            self.queue.remove_player(player.player_id);
            player.match_id
        };

        if let Some(match_id) = match_id {
            self.broadcast_match(match_id);
        }
    }

    /// Drop finished matches older than `retention_ms`. Returns how many went.
    pub fn cleanup_finished_matches(&self, retention_ms: i64) -> usize {
        let now_ms = self.scheduler.now_ms();
        let handles: Vec<(MatchId, SharedMatch)> = self
            .matches
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();

        let expired: Vec<MatchId> = handles
            .into_iter()
            .filter(|(_, shared)| {
                let game = shared.lock();
                matches!(game.finished_at_ms(), Some(at) if now_ms - at >= retention_ms)
            })
            .map(|(match_id, _)| match_id)
            .collect();

        for match_id in &expired {
            self.matches.remove(match_id);
            if let Some((_, timer)) = self.timers.remove(match_id) {
                timer.cancel();
            }
        }
        if !expired.is_empty() {
            info!(removed = expired.len(), "Cleaned up finished matches");
        }
        expired.len()
    }

    /// Timer entry point. Stale keys are ignored by the match itself.
    pub fn on_phase_timer(&self, match_id: MatchId, expected: PhaseKey) {
        let Some(shared) = self.matches.get(&match_id).map(|m| m.value().clone()) else {
            return;
        };
        let mut game = shared.lock();

        // a timer can wake a hair before its deadline
        let now_ms = self.scheduler.now_ms();
        let now_ms = game.phase_ends_at_ms().map_or(now_ms, |deadline| now_ms.max(deadline));

        let transition = {
            let mut rng = self.rng.lock();
            game.on_phase_deadline(expected, now_ms, &self.corpus, &mut *rng)
        };
        if transition == Transition::Unchanged {
            debug!(match_id = %match_id, ?expected, "Ignored stale phase timer");
            return;
        }

        debug!(match_id = %match_id, ?transition, "Phase deadline reached");
        self.apply_transition(&game, transition);
        self.broadcast_state(&game);
    }

    pub fn player(&self, player_id: PlayerId) -> Option<Player> {
        self.registry.get(player_id)
    }

    pub fn player_for_connection(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.registry.player_for_connection(connection_id)
    }

    /// Copy of a match as it stands now.
    pub fn match_snapshot(&self, match_id: MatchId) -> Option<Match> {
        let shared = self.matches.get(&match_id).map(|m| m.value().clone())?;
        let game = shared.lock().clone();
        Some(game)
    }

    pub fn queue_len(&self, mode: QueueMode) -> usize {
        self.queue.queue_len(mode)
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn active_match_count(&self) -> usize {
        let handles: Vec<SharedMatch> = self.matches.iter().map(|m| m.value().clone()).collect();
        handles.iter().filter(|m| !m.lock().is_finished()).count()
    }

    pub fn send_error(&self, connection_id: ConnectionId, action: &str, error: ActionError) {
        debug!(connection = %connection_id, action, code = error.code(), "Action rejected");
        self.send(
            connection_id,
            ServerMessage::ActionError(ActionErrorPayload::new(action, error)),
        );
    }

    fn require_player(&self, connection_id: ConnectionId) -> Result<PlayerId, ActionError> {
        self.registry
            .player_for_connection(connection_id)
            .ok_or(ActionError::NotIdentified)
    }

    fn require_match(&self, connection_id: ConnectionId) -> Result<(PlayerId, MatchId), ActionError> {
        let player_id = self.require_player(connection_id)?;
        let match_id = self
            .registry
            .match_of(player_id)
            .ok_or(ActionError::NotInMatch)?;
        Ok((player_id, match_id))
    }

    fn match_handle(&self, match_id: MatchId) -> Result<SharedMatch, ActionError> {
        self.matches
            .get(&match_id)
            .map(|m| m.value().clone())
            .ok_or(ActionError::MatchNotFound)
    }

    /// Run one client action under the match lock, then re-arm timers and
    /// push fresh snapshots.
    fn run_action<F>(&self, match_id: MatchId, action: F) -> Result<(), ActionError>
    where
        F: FnOnce(&mut Match, i64) -> Result<Transition, ActionError>,
    {
        let shared = self.match_handle(match_id)?;
        let mut game = shared.lock();
        let now_ms = self.scheduler.now_ms();

        let transition = action(&mut *game, now_ms)?;
        self.apply_transition(&game, transition);
        self.broadcast_state(&game);
        Ok(())
    }

    fn apply_transition(&self, game: &Match, transition: Transition) {
        match transition {
            Transition::Unchanged => {}
            Transition::Entered(phase) => {
                debug!(match_id = %game.id(), ?phase, round = game.current_plan().round_number, "Entered phase");
                self.arm_phase_timer(game);
            }
            Transition::Finished => {
                self.cancel_timer(game.id());
                self.settle_finished(game);
            }
        }
    }

    fn arm_phase_timer(&self, game: &Match) {
        let match_id = game.id();
        self.cancel_timer(match_id);

        let Some(deadline) = game.phase_ends_at_ms() else {
            return;
        };
        let key = game.phase_key();
        let delay_ms = deadline - self.scheduler.now_ms();
        let this = self.this.clone();

        let handle = self.scheduler.schedule(
            delay_ms,
            Box::new(move || {
                if let Some(orchestrator) = this.upgrade() {
                    orchestrator.on_phase_timer(match_id, key);
                }
            }),
        );
        self.timers.insert(match_id, handle);
    }

    fn cancel_timer(&self, match_id: MatchId) {
        if let Some((_, timer)) = self.timers.remove(&match_id) {
            timer.cancel();
        }
    }

    fn settle_finished(&self, game: &Match) {
        let [a, b] = game.players();
        let mut entries = [
            self.registry.settlement_entry(a),
            self.registry.settlement_entry(b),
        ];
        let Some(record) = FinishedMatch::settle(game, &mut entries) else {
            warn!(match_id = %game.id(), "Settlement requested for unfinished match");
            return;
        };

        for entry in entries {
            self.registry.update_stats(entry.player_id, entry.stats);
            self.registry.release_match(entry.player_id, game.id());
        }

        info!(
            match_id = %game.id(),
            mode = ?game.mode(),
            winner = ?record.winner_player_id,
            reason = ?record.end_reason,
            "Match finished"
        );
        if let Err(e) = self.history.record(&record) {
            error!(match_id = %game.id(), "Failed to record finished match: {:#}", e);
        }
    }

    fn create_match(&self, players: [PlayerId; 2], mode: QueueMode) {
        let match_id = Uuid::new_v4();
        let now_ms = self.scheduler.now_ms();
        let game = Match::new(match_id, mode, players, now_ms, self.timings);

        for player_id in players {
            self.registry.assign_match(player_id, Some(match_id));
        }
        let shared = Arc::new(Mutex::new(game));
        self.matches.insert(match_id, shared.clone());
        info!(match_id = %match_id, ?mode, "Match created");

        let queue_size = self.queue.queue_len(mode) as u32;
        for player_id in players {
            let Some(connection_id) = self.registry.connection_of(player_id) else {
                continue;
            };
            self.send(
                connection_id,
                ServerMessage::MatchmakingStatus(MatchmakingStatus {
                    queue_size,
                    state: MatchmakingState::Matched,
                    mode,
                }),
            );
            self.send(
                connection_id,
                ServerMessage::MatchFound(MatchFound {
                    match_id,
                    server_now_ms: now_ms,
                }),
            );
        }

        let game = shared.lock();
        self.broadcast_state(&game);
    }

    fn broadcast_match(&self, match_id: MatchId) {
        if let Ok(shared) = self.match_handle(match_id) {
            let game = shared.lock();
            self.broadcast_state(&game);
        }
    }

    fn participants(&self, game: &Match) -> Vec<ParticipantInfo> {
        game.players()
            .iter()
            .map(|player_id| self.registry.participant_info(*player_id))
            .collect()
    }

    /// Personalised `match:state` to every connected participant.
    fn broadcast_state(&self, game: &Match) {
        let participants = self.participants(game);
        let now_ms = self.scheduler.now_ms();

        for player_id in game.players() {
            if let Some(connection_id) = self.registry.connection_of(player_id) {
                let view = game.view_for(player_id, now_ms, &participants);
                self.send(connection_id, ServerMessage::MatchState(view));
            }
        }
    }

    fn send_status(&self, player_id: PlayerId, mode: QueueMode, state: MatchmakingState) {
        if let Some(connection_id) = self.registry.connection_of(player_id) {
            let status = MatchmakingStatus {
                queue_size: self.queue.queue_len(mode) as u32,
                state,
                mode,
            };
            self.send(connection_id, ServerMessage::MatchmakingStatus(status));
        }
    }

    fn send(&self, connection_id: ConnectionId, message: ServerMessage) {
        if let Err(e) = self.connections.send_to_connection(connection_id, message) {
            debug!(connection = %connection_id, "Dropped outbound message: {}", e);
        }
    }
}
