use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::PlayerId;

/// Named rating band, derived purely from the current rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RatingTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

/// Ranked record of a player, as carried in finished-match records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerStats {
    pub rating: i32,
    pub peak_rating: i32,
    pub ranked_games: u32,
    pub ranked_wins: u32,
    pub ranked_losses: u32,
    pub ranked_draws: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            rating: 1000,
            peak_rating: 1000,
            ranked_games: 0,
            ranked_wins: 0,
            ranked_losses: 0,
            ranked_draws: 0,
        }
    }
}

/// Rating movement of one player over one finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PlayerOutcome {
    pub player_id: PlayerId,
    pub display_name: String,
    pub score: u32,
    pub rating_before: i32,
    pub rating_after: i32,
    pub rating_delta: i32,
    pub tier: RatingTier,
}
