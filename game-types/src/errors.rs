use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Domain rejection returned to a client as `action:error`.
///
/// These are expected outcomes of invalid input (wrong phase, not your turn,
/// late, duplicate...) and never tear down a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, Error)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ActionError {
    #[error("player is not known to the server")]
    UnknownPlayer,
    #[error("player already belongs to an active match")]
    AlreadyInMatch,
    #[error("player is not in an active match")]
    NotInMatch,
    #[error("match does not exist")]
    MatchNotFound,
    #[error("player is not a participant of this match")]
    NotMatchParticipant,
    #[error("action is not allowed in the current phase")]
    InvalidPhase,
    #[error("action does not apply to the current round type")]
    InvalidRound,
    #[error("only the designated picker may choose letters")]
    NotPicker,
    #[error("that letter kind can no longer be picked")]
    PickConstraintViolation,
    #[error("the phase deadline has passed")]
    LateSubmission,
    #[error("a word was already submitted this round")]
    DuplicateSubmission,
    #[error("too many attempts, slow down")]
    RateLimited,
    #[error("the conundrum has already been solved")]
    AlreadySolved,
    #[error("connection has not identified a player")]
    NotIdentified,
    #[error("connection may not act as this player")]
    Unauthorized,
    #[error("message could not be understood")]
    InvalidMessage,
}

impl ActionError {
    /// Wire code, identical to the serialized form.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::UnknownPlayer => "UNKNOWN_PLAYER",
            ActionError::AlreadyInMatch => "ALREADY_IN_MATCH",
            ActionError::NotInMatch => "NOT_IN_MATCH",
            ActionError::MatchNotFound => "MATCH_NOT_FOUND",
            ActionError::NotMatchParticipant => "NOT_MATCH_PARTICIPANT",
            ActionError::InvalidPhase => "INVALID_PHASE",
            ActionError::InvalidRound => "INVALID_ROUND",
            ActionError::NotPicker => "NOT_PICKER",
            ActionError::PickConstraintViolation => "PICK_CONSTRAINT_VIOLATION",
            ActionError::LateSubmission => "LATE_SUBMISSION",
            ActionError::DuplicateSubmission => "DUPLICATE_SUBMISSION",
            ActionError::RateLimited => "RATE_LIMITED",
            ActionError::AlreadySolved => "ALREADY_SOLVED",
            ActionError::NotIdentified => "NOT_IDENTIFIED",
            ActionError::Unauthorized => "UNAUTHORIZED",
            ActionError::InvalidMessage => "INVALID_MESSAGE",
        }
    }
}
