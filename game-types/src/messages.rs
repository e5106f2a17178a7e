use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{ActionError, LetterKind, MatchId, MatchStateView, MatchmakingState, PlayerId, QueueMode};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct IdentifyRequest {
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JoinQueueRequest {
    pub mode: QueueMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ResumeMatchRequest {
    pub match_id: MatchId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PickLetterRequest {
    pub kind: LetterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitWordRequest {
    pub word: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SubmitGuessRequest {
    pub guess: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export)]
pub enum ClientMessage {
    #[serde(rename = "session:identify")]
    Identify(IdentifyRequest),
    #[serde(rename = "queue:join")]
    JoinQueue(JoinQueueRequest),
    #[serde(rename = "queue:leave")]
    LeaveQueue,
    #[serde(rename = "match:resume")]
    ResumeMatch(ResumeMatchRequest),
    #[serde(rename = "match:forfeit")]
    Forfeit,
    #[serde(rename = "round:pick_letter")]
    PickLetter(PickLetterRequest),
    #[serde(rename = "round:submit_word")]
    SubmitWord(SubmitWordRequest),
    #[serde(rename = "round:submit_conundrum_guess")]
    SubmitConundrumGuess(SubmitGuessRequest),
}

impl ClientMessage {
    /// Name of the action, echoed back in `action:error`.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Identify(_) => "session:identify",
            ClientMessage::JoinQueue(_) => "queue:join",
            ClientMessage::LeaveQueue => "queue:leave",
            ClientMessage::ResumeMatch(_) => "match:resume",
            ClientMessage::Forfeit => "match:forfeit",
            ClientMessage::PickLetter(_) => "round:pick_letter",
            ClientMessage::SubmitWord(_) => "round:submit_word",
            ClientMessage::SubmitConundrumGuess(_) => "round:submit_conundrum_guess",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SessionInfo {
    pub player_id: PlayerId,
    pub display_name: String,
    pub server_now_ms: i64,
    pub is_authenticated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchmakingStatus {
    pub queue_size: u32,
    pub state: MatchmakingState,
    pub mode: QueueMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchFound {
    pub match_id: MatchId,
    pub server_now_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActionErrorPayload {
    pub action: String,
    pub code: ActionError,
    pub message: String,
}

impl ActionErrorPayload {
    pub fn new(action: &str, error: ActionError) -> Self {
        Self {
            action: action.to_string(),
            code: error,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type")]
#[ts(export)]
pub enum ServerMessage {
    #[serde(rename = "session:identify")]
    SessionIdentified(SessionInfo),
    #[serde(rename = "matchmaking:status")]
    MatchmakingStatus(MatchmakingStatus),
    #[serde(rename = "match:found")]
    MatchFound(MatchFound),
    #[serde(rename = "match:state")]
    MatchState(MatchStateView),
    #[serde(rename = "action:error")]
    ActionError(ActionErrorPayload),
}
