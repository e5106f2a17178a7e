use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use game_types::{ActionError, ClientMessage};
use tracing::{error, info, warn};
use warp::ws::{Message, WebSocket};

use crate::orchestrator::MatchOrchestrator;

pub mod connection;
pub mod handlers;
pub mod rate_limiter;


use connection::ConnectionId;
pub use connection::ConnectionManager;
use handlers::MessageHandler;
use rate_limiter::RateLimiter;

/// Action name reported for frames that never parsed.
const UNPARSED_ACTION: &str = "unknown";

pub async fn handle_connection(websocket: WebSocket, orchestrator: Arc<MatchOrchestrator>) {
    let connection_id = ConnectionId::new();
    info!("New WebSocket connection: {}", connection_id);

    let connections = orchestrator.connections().clone();
    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let message_receiver = connections.create_connection(connection_id);
    let message_handler = MessageHandler::new(connection_id, orchestrator.clone());

    let incoming_handler = {
        let message_handler = message_handler.clone();
        let mut rate_limiter = RateLimiter::new();

        async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(msg) if msg.is_close() => break,
                    Ok(msg) => handle_message(msg, &mut rate_limiter, &message_handler, connection_id),
                    Err(e) => {
                        warn!("WebSocket error for {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    let outgoing_handler = async move {
        let mut receiver = message_receiver;

        while let Some(message) = receiver.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize message: {:?}", e);
                    continue;
                }
            };

            if let Err(e) = ws_sender.send(Message::text(json)).await {
                warn!("Failed to send message to {}: {:?}", connection_id, e);
                break;
            }
        }
    };

    tokio::select! {
        _ = incoming_handler => {},
        _ = outgoing_handler => {},
    }

    info!("Connection {} disconnected", connection_id);
    message_handler.handle_disconnect();
    connections.remove_connection(connection_id);
}

fn handle_message(
    msg: Message,
    rate_limiter: &mut RateLimiter,
    message_handler: &MessageHandler,
    connection_id: ConnectionId,
) {
    // pings, pongs and binary frames are not part of the protocol
    let Ok(text) = msg.to_str() else {
        return;
    };

    let within_limit = rate_limiter.check_rate_limit();
    if !within_limit {
        warn!("Rate limit exceeded for connection {}", connection_id);
    }

    let client_message: ClientMessage = match serde_json::from_str(text) {
        Ok(message) => message,
        Err(_) if !within_limit => {
            message_handler.reject(UNPARSED_ACTION, ActionError::RateLimited);
            return;
        }
        Err(e) => {
            warn!("Invalid message from {}: {}", connection_id, e);
            message_handler.reject(UNPARSED_ACTION, ActionError::InvalidMessage);
            return;
        }
    };

    if !within_limit {
        message_handler.reject(client_message.action(), ActionError::RateLimited);
        return;
    }

    message_handler.handle_message(client_message);
}
