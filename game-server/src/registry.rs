use dashmap::DashMap;
use game_core::{ParticipantInfo, SettlementEntry};
use game_types::{MatchId, PlayerId, PlayerStats};
use tracing::{debug, info};
use uuid::Uuid;

use crate::websocket::connection::ConnectionId;

const MAX_DISPLAY_NAME_CHARS: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub player_id: PlayerId,
    pub display_name: String,
    pub connection_id: Option<ConnectionId>,
    pub match_id: Option<MatchId>,
    pub stats: PlayerStats,
    pub last_conundrum_guess_at_ms: Option<i64>,
}

impl Player {
    fn new(player_id: PlayerId, display_name: String) -> Self {
        Self {
            player_id,
            display_name,
            connection_id: None,
            match_id: None,
            stats: PlayerStats::default(),
            last_conundrum_guess_at_ms: None,
        }
    }

    pub fn connected(&self) -> bool {
        self.connection_id.is_some()
    }
}

/// Every player seen since startup. Players are never removed.
#[derive(Default)]
pub struct PlayerRegistry {
    players: DashMap<PlayerId, Player>,
    connections: DashMap<ConnectionId, PlayerId>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection_id` to a player. A known `requested_player_id` is
    /// reused; anything else mints a new identity. Authorization is the
    /// caller's job.
    pub fn connect(
        &self,
        connection_id: ConnectionId,
        requested_player_id: Option<PlayerId>,
        requested_display_name: Option<&str>,
    ) -> Player {
        let display_name = requested_display_name.and_then(clean_display_name);

        // a connection speaks for at most one player
        if let Some((_, previous)) = self.connections.remove(&connection_id) {
            if let Some(mut player) = self.players.get_mut(&previous) {
                player.connection_id = None;
            }
        }

        let known = requested_player_id.filter(|id| self.players.contains_key(id));
        let player_id = known.unwrap_or_else(Uuid::new_v4);

        let mut entry = self.players.entry(player_id).or_insert_with(|| {
            let name = display_name.clone().unwrap_or_else(|| default_display_name(player_id));
            Player::new(player_id, name)
        });
        if let Some(stale) = entry.connection_id.replace(connection_id) {
            self.connections.remove(&stale);
            debug!(player_id = %player_id, connection = %stale, "Replaced older connection");
        }
        if let Some(name) = display_name {
            entry.display_name = name;
        }
        let player = entry.value().clone();
        drop(entry);

        self.connections.insert(connection_id, player_id);
        info!(
            player_id = %player_id,
            connection = %connection_id,
            resumed = known.is_some(),
            "Player connected"
        );
        player
    }

    /// Mark the owner of `connection_id` offline. Returns the player as it
    /// stands afterwards.
    pub fn disconnect(&self, connection_id: ConnectionId) -> Option<Player> {
        let (_, player_id) = self.connections.remove(&connection_id)?;
        let mut player = self.players.get_mut(&player_id)?;
        if player.connection_id == Some(connection_id) {
            player.connection_id = None;
        }
        info!(player_id = %player_id, connection = %connection_id, "Player disconnected");
        Some(player.value().clone())
    }

    pub fn get(&self, player_id: PlayerId) -> Option<Player> {
        self.players.get(&player_id).map(|p| p.value().clone())
    }

    pub fn player_for_connection(&self, connection_id: ConnectionId) -> Option<PlayerId> {
        self.connections.get(&connection_id).map(|p| *p)
    }

    pub fn is_connected(&self, player_id: PlayerId) -> bool {
        self.players.get(&player_id).is_some_and(|p| p.connected())
    }

    pub fn connection_of(&self, player_id: PlayerId) -> Option<ConnectionId> {
        self.players.get(&player_id).and_then(|p| p.connection_id)
    }

    pub fn match_of(&self, player_id: PlayerId) -> Option<MatchId> {
        self.players.get(&player_id).and_then(|p| p.match_id)
    }

    pub fn assign_match(&self, player_id: PlayerId, match_id: Option<MatchId>) {
        if let Some(mut player) = self.players.get_mut(&player_id) {
            player.match_id = match_id;
            if match_id.is_none() {
                player.last_conundrum_guess_at_ms = None;
            }
        }
    }

    /// Clear `match_id` only if the player still points at that match.
    pub fn release_match(&self, player_id: PlayerId, match_id: MatchId) {
        if let Some(mut player) = self.players.get_mut(&player_id) {
            if player.match_id == Some(match_id) {
                player.match_id = None;
                player.last_conundrum_guess_at_ms = None;
            }
        }
    }

    pub fn last_guess_at(&self, player_id: PlayerId) -> Option<i64> {
        self.players
            .get(&player_id)
            .and_then(|p| p.last_conundrum_guess_at_ms)
    }

    pub fn set_last_guess(&self, player_id: PlayerId, at_ms: i64) {
        if let Some(mut player) = self.players.get_mut(&player_id) {
            player.last_conundrum_guess_at_ms = Some(at_ms);
        }
    }

    pub fn update_stats(&self, player_id: PlayerId, stats: PlayerStats) {
        if let Some(mut player) = self.players.get_mut(&player_id) {
            player.stats = stats;
        }
    }

    pub fn participant_info(&self, player_id: PlayerId) -> ParticipantInfo {
        match self.players.get(&player_id) {
            Some(player) => ParticipantInfo {
                player_id,
                display_name: player.display_name.clone(),
                connected: player.connected(),
                rating: player.stats.rating,
            },
            None => ParticipantInfo {
                player_id,
                display_name: default_display_name(player_id),
                connected: false,
                rating: PlayerStats::default().rating,
            },
        }
    }

    pub fn settlement_entry(&self, player_id: PlayerId) -> SettlementEntry {
        let info = self.players.get(&player_id);
        SettlementEntry {
            player_id,
            display_name: info
                .as_ref()
                .map(|p| p.display_name.clone())
                .unwrap_or_else(|| default_display_name(player_id)),
            stats: info.map(|p| p.stats.clone()).unwrap_or_default(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }
}

fn clean_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(MAX_DISPLAY_NAME_CHARS).collect())
}

fn default_display_name(player_id: PlayerId) -> String {
    let simple = player_id.simple().to_string();
    format!("Player-{}", &simple[..6])
}
