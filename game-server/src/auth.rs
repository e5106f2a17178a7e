use game_types::PlayerId;

use crate::websocket::connection::ConnectionId;

/// Decides whether a connection may act as a given player.
pub trait PlayerAuthorizer: Send + Sync {
    /// Called when a client identifies with an existing player id.
    fn may_claim(&self, connection_id: ConnectionId, player_id: PlayerId) -> bool;

    /// Reported back to the client in `session:identify`.
    fn is_authenticated(&self, connection_id: ConnectionId) -> bool;
}

/// Development mode: any connection may claim any player id.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevAuthorizer;

impl PlayerAuthorizer for DevAuthorizer {
    fn may_claim(&self, _connection_id: ConnectionId, _player_id: PlayerId) -> bool {
        true
    }

    fn is_authenticated(&self, _connection_id: ConnectionId) -> bool {
        false
    }
}

/// Without an identity provider nothing can prove ownership of an id, so
/// claims on a known player id are refused with `UNAUTHORIZED`. Unknown or
/// missing ids still mint a fresh player.
#[derive(Debug, Default, Clone, Copy)]
pub struct FreshIdentityAuthorizer;

impl PlayerAuthorizer for FreshIdentityAuthorizer {
    fn may_claim(&self, _connection_id: ConnectionId, _player_id: PlayerId) -> bool {
        false
    }

    fn is_authenticated(&self, _connection_id: ConnectionId) -> bool {
        false
    }
}
