use game_types::RatingTier;

pub const DEFAULT_RATING: i32 = 1000;

/// Ranked games after which a player's rating settles to the smaller K.
pub const PROVISIONAL_GAMES: u32 = 30;
const PROVISIONAL_K: f64 = 32.0;
const ESTABLISHED_K: f64 = 20.0;

/// Ascending thresholds; scanned from the top.
const TIER_THRESHOLDS: [(i32, RatingTier); 5] = [
    (1000, RatingTier::Silver),
    (1150, RatingTier::Gold),
    (1300, RatingTier::Platinum),
    (1500, RatingTier::Diamond),
    (1700, RatingTier::Master),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl MatchOutcome {
    pub fn actual_score(self) -> f64 {
        match self {
            MatchOutcome::Win => 1.0,
            MatchOutcome::Loss => 0.0,
            MatchOutcome::Draw => 0.5,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            MatchOutcome::Win => MatchOutcome::Loss,
            MatchOutcome::Loss => MatchOutcome::Win,
            MatchOutcome::Draw => MatchOutcome::Draw,
        }
    }
}

pub struct RatingEngine;

impl RatingEngine {
    /// Elo expected score of a player rated `rating` against `opponent_rating`.
    pub fn expected_score(rating: i32, opponent_rating: i32) -> f64 {
        let exponent = f64::from(opponent_rating - rating) / 400.0;
        1.0 / (1.0 + 10f64.powf(exponent))
    }

    pub fn k_factor(ranked_games: u32) -> f64 {
        if ranked_games < PROVISIONAL_GAMES {
            PROVISIONAL_K
        } else {
            ESTABLISHED_K
        }
    }

    /// Rating change for one player. Uses that player's own game count for K,
    /// so the two deltas of a match need not cancel exactly.
    pub fn rating_delta(
        rating: i32,
        opponent_rating: i32,
        ranked_games: u32,
        outcome: MatchOutcome,
    ) -> i32 {
        let k = Self::k_factor(ranked_games);
        let expected = Self::expected_score(rating, opponent_rating);
        (k * (outcome.actual_score() - expected)).round() as i32
    }

    pub fn tier_for(rating: i32) -> RatingTier {
        TIER_THRESHOLDS
            .iter()
            .rev()
            .find(|(threshold, _)| rating >= *threshold)
            .map(|(_, tier)| *tier)
            .unwrap_or(RatingTier::Bronze)
    }
}
