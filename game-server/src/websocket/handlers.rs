use std::sync::Arc;

use game_types::{ActionError, ClientMessage};
use tracing::{debug, info};

use crate::orchestrator::MatchOrchestrator;
use crate::websocket::connection::ConnectionId;

/// Dispatches one connection's parsed messages to the orchestrator and turns
/// rejections into `action:error`.
#[derive(Clone)]
pub struct MessageHandler {
    connection_id: ConnectionId,
    orchestrator: Arc<MatchOrchestrator>,
}

impl MessageHandler {
    pub fn new(connection_id: ConnectionId, orchestrator: Arc<MatchOrchestrator>) -> Self {
        Self {
            connection_id,
            orchestrator,
        }
    }

    pub fn handle_message(&self, message: ClientMessage) {
        let action = message.action();
        debug!(connection = %self.connection_id, action, "Handling message");

        if let Err(e) = self.dispatch(message) {
            self.reject(action, e);
        }
    }

    pub fn reject(&self, action: &str, error: ActionError) {
        self.orchestrator.send_error(self.connection_id, action, error);
    }

    pub fn handle_disconnect(&self) {
        info!("Handling disconnect for connection {}", self.connection_id);
        self.orchestrator.disconnect(self.connection_id);
    }

    fn dispatch(&self, message: ClientMessage) -> Result<(), ActionError> {
        let connection_id = self.connection_id;
        let orchestrator = &self.orchestrator;

        match message {
            ClientMessage::Identify(request) => {
                orchestrator.identify(connection_id, request).map(|_| ())
            }
            ClientMessage::JoinQueue(request) => orchestrator.join_queue(connection_id, request.mode),
            ClientMessage::LeaveQueue => orchestrator.leave_queue(connection_id),
            ClientMessage::ResumeMatch(request) => {
                orchestrator.resume_match(connection_id, request.match_id)
            }
            ClientMessage::Forfeit => orchestrator.forfeit(connection_id),
            ClientMessage::PickLetter(request) => orchestrator.pick_letter(connection_id, request.kind),
            ClientMessage::SubmitWord(request) => {
                orchestrator.submit_word(connection_id, &request.word)
            }
            ClientMessage::SubmitConundrumGuess(request) => {
                orchestrator.submit_conundrum_guess(connection_id, &request.guess)
            }
        }
    }
}
