use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::{MatchId, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchPhase {
    AwaitingLettersPick,
    LettersSolving,
    ConundrumSolving,
    RoundResult,
    Finished,
}

impl MatchPhase {
    /// Phases that always carry a deadline.
    pub fn is_timed(&self) -> bool {
        matches!(
            self,
            MatchPhase::LettersSolving | MatchPhase::ConundrumSolving | MatchPhase::RoundResult
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RoundType {
    Letters,
    Conundrum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum LetterKind {
    Vowel,
    Consonant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum QueueMode {
    Casual,
    Ranked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchEndReason {
    Completed,
    Forfeit,
}

/// Why a word submission scored nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FailureCode {
    Empty,
    NonAlphabetical,
    NotInDictionary,
    NotConstructable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MatchmakingState {
    Idle,
    Queued,
    Matched,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct WordSubmissionView {
    pub raw_word: String,
    pub normalized_word: String,
    pub is_valid: bool,
    pub failure_code: Option<FailureCode>,
    pub score: u32,
    pub submitted_at_ms: i64,
}

/// A finalized round as clients see it.
///
/// Letters rounds fill `letters` and `submissions`; the conundrum round fills
/// `scrambled`, `answer` and the first-correct fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RoundResultView {
    pub round_number: u32,
    pub round_type: RoundType,
    pub awarded_scores: HashMap<PlayerId, u32>,
    pub letters: Option<Vec<char>>,
    pub submissions: Option<HashMap<PlayerId, WordSubmissionView>>,
    pub scrambled: Option<String>,
    pub answer: Option<String>,
    pub first_correct_player_id: Option<PlayerId>,
    pub first_correct_at_ms: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchPlayerView {
    pub player_id: PlayerId,
    pub display_name: String,
    pub connected: bool,
    pub score: u32,
    pub rating: i32,
    pub has_submitted: bool,
}

/// Payload of `match:state`, personalised for one viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct MatchStateView {
    pub match_id: MatchId,
    pub mode: QueueMode,
    pub phase: MatchPhase,
    pub phase_ends_at_ms: Option<i64>,
    pub server_now_ms: i64,
    pub round_number: u32,
    pub round_type: RoundType,
    pub players: Vec<MatchPlayerView>,
    pub picker_player_id: Option<PlayerId>,
    pub letters: Option<Vec<char>>,
    pub scrambled: Option<String>,
    pub your_submission: Option<WordSubmissionView>,
    pub round_results: Vec<RoundResultView>,
    pub winner_player_id: Option<PlayerId>,
    pub match_end_reason: Option<MatchEndReason>,
}

impl MatchStateView {
    pub fn player(&self, player_id: PlayerId) -> Option<&MatchPlayerView> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}
