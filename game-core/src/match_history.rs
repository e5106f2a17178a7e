use anyhow::Result;
use game_types::{
    MatchEndReason, MatchId, PlayerId, PlayerOutcome, PlayerStats, QueueMode, RoundResultView,
};
use serde::Serialize;

use crate::match_state::{Match, RoundResult};
use crate::rating::{MatchOutcome, RatingEngine};

/// A participant's identity and ranked record going into settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementEntry {
    pub player_id: PlayerId,
    pub display_name: String,
    pub stats: PlayerStats,
}

/// Record handed to the history sink once a match is over.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinishedMatch {
    pub match_id: MatchId,
    pub mode: QueueMode,
    pub players: Vec<PlayerOutcome>,
    pub winner_player_id: Option<PlayerId>,
    pub end_reason: MatchEndReason,
    pub round_results: Vec<RoundResultView>,
    pub created_at_ms: i64,
    pub finished_at_ms: i64,
}

impl FinishedMatch {
    /// Apply the match result to both entries and build the record.
    ///
    /// Ranked matches move ratings and counters; casual matches leave `stats`
    /// untouched and report a zero delta. Returns `None` while the match is
    /// still running.
    pub fn settle(game: &Match, entries: &mut [SettlementEntry; 2]) -> Option<Self> {
        let end_reason = game.end_reason()?;
        let finished_at_ms = game.finished_at_ms()?;

        let before = [entries[0].stats.rating, entries[1].stats.rating];
        let mut players = Vec::with_capacity(2);

        for (index, entry) in entries.iter_mut().enumerate() {
            let outcome = game.outcome_for(entry.player_id)?;
            let opponent_rating = before[1 - index];

            if game.mode() == QueueMode::Ranked {
                apply_ranked_result(&mut entry.stats, opponent_rating, outcome);
            }

            players.push(PlayerOutcome {
                player_id: entry.player_id,
                display_name: entry.display_name.clone(),
                score: game.score(entry.player_id),
                rating_before: before[index],
                rating_after: entry.stats.rating,
                rating_delta: entry.stats.rating - before[index],
                tier: RatingEngine::tier_for(entry.stats.rating),
            });
        }

        Some(Self {
            match_id: game.id(),
            mode: game.mode(),
            players,
            winner_player_id: game.winner_player_id(),
            end_reason,
            round_results: game.round_results().iter().map(RoundResult::to_view).collect(),
            created_at_ms: game.created_at_ms(),
            finished_at_ms,
        })
    }

    pub fn outcome(&self, player_id: PlayerId) -> Option<&PlayerOutcome> {
        self.players.iter().find(|p| p.player_id == player_id)
    }
}

/// Uses the pre-match game count for K, then bumps the counters.
pub fn apply_ranked_result(stats: &mut PlayerStats, opponent_rating: i32, outcome: MatchOutcome) {
    let delta =
        RatingEngine::rating_delta(stats.rating, opponent_rating, stats.ranked_games, outcome);

    stats.rating += delta;
    stats.peak_rating = stats.peak_rating.max(stats.rating);
    stats.ranked_games += 1;
    match outcome {
        MatchOutcome::Win => stats.ranked_wins += 1,
        MatchOutcome::Loss => stats.ranked_losses += 1,
        MatchOutcome::Draw => stats.ranked_draws += 1,
    }
}

/// Destination for finished-match records.
///
/// Failures are reported to the caller, which logs them; they never affect the
/// in-memory match.
pub trait MatchHistorySink: Send + Sync {
    fn record(&self, finished: &FinishedMatch) -> Result<()>;
}
