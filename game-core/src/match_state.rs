use std::collections::HashMap;

use game_types::{
    ActionError, LetterKind, MatchEndReason, MatchId, MatchPhase, MatchPlayerView, MatchStateView,
    PlayerId, QueueMode, RoundResultView, RoundType, WordSubmissionView,
};
use rand::Rng;

use crate::conundrum::{CONUNDRUM_SCORE, ConundrumCorpus, is_correct};
use crate::letter_pool::LetterPool;
use crate::pick_constraints::{PickConstraintChecker, TARGET_SLOTS};
use crate::rating::MatchOutcome;
use crate::word_validation::{DictionaryProvider, WordSubmission, evaluate, is_alphabetical, normalize};

/// Letters rounds played before the closing conundrum.
pub const LETTERS_ROUNDS: u32 = 4;

/// Durations of the timed phases, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTimings {
    pub letters_solve_ms: i64,
    pub conundrum_solve_ms: i64,
    pub round_result_ms: i64,
    /// Minimum gap between two counted conundrum guesses of one player.
    pub conundrum_guess_interval_ms: i64,
}

impl Default for PhaseTimings {
    fn default() -> Self {
        Self {
            letters_solve_ms: 30_000,
            conundrum_solve_ms: 30_000,
            round_result_ms: 5_000,
            conundrum_guess_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundPlan {
    pub round_number: u32,
    pub round_type: RoundType,
    pub picker_player_id: Option<PlayerId>,
}

/// Four letters rounds with alternating pickers, then the conundrum.
pub fn build_round_plan(players: [PlayerId; 2]) -> Vec<RoundPlan> {
    let mut plan: Vec<RoundPlan> = (1..=LETTERS_ROUNDS)
        .map(|round_number| RoundPlan {
            round_number,
            round_type: RoundType::Letters,
            picker_player_id: Some(players[((round_number - 1) % 2) as usize]),
        })
        .collect();
    plan.push(RoundPlan {
        round_number: LETTERS_ROUNDS + 1,
        round_type: RoundType::Conundrum,
        picker_player_id: None,
    });
    plan
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LettersRound {
    pub picker_player_id: PlayerId,
    pub picks: Vec<LetterKind>,
    pub letters: Vec<char>,
    pub submissions: HashMap<PlayerId, WordSubmission>,
}

impl LettersRound {
    fn new(picker_player_id: PlayerId) -> Self {
        Self {
            picker_player_id,
            picks: Vec::with_capacity(TARGET_SLOTS),
            letters: Vec::with_capacity(TARGET_SLOTS),
            submissions: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConundrumRound {
    pub scrambled: String,
    pub answer: String,
    pub first_correct_player_id: Option<PlayerId>,
    pub first_correct_at_ms: Option<i64>,
    pub attempts: HashMap<PlayerId, u32>,
}

/// The one round currently being played.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveRound {
    Letters(LettersRound),
    Conundrum(ConundrumRound),
}

impl LiveRound {
    pub fn round_type(&self) -> RoundType {
        match self {
            LiveRound::Letters(_) => RoundType::Letters,
            LiveRound::Conundrum(_) => RoundType::Conundrum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundDetails {
    Letters {
        letters: Vec<char>,
        submissions: HashMap<PlayerId, WordSubmission>,
    },
    Conundrum {
        scrambled: String,
        answer: String,
        first_correct_player_id: Option<PlayerId>,
        first_correct_at_ms: Option<i64>,
    },
}

/// A finalized round. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundResult {
    pub round_number: u32,
    pub awarded_scores: HashMap<PlayerId, u32>,
    pub details: RoundDetails,
}

impl RoundResult {
    pub fn round_type(&self) -> RoundType {
        match self.details {
            RoundDetails::Letters { .. } => RoundType::Letters,
            RoundDetails::Conundrum { .. } => RoundType::Conundrum,
        }
    }

    pub fn to_view(&self) -> RoundResultView {
        let mut view = RoundResultView {
            round_number: self.round_number,
            round_type: self.round_type(),
            awarded_scores: self.awarded_scores.clone(),
            letters: None,
            submissions: None,
            scrambled: None,
            answer: None,
            first_correct_player_id: None,
            first_correct_at_ms: None,
        };

        match &self.details {
            RoundDetails::Letters {
                letters,
                submissions,
            } => {
                view.letters = Some(letters.clone());
                view.submissions = Some(
                    submissions
                        .iter()
                        .map(|(player_id, submission)| (*player_id, submission.to_view()))
                        .collect(),
                );
            }
            RoundDetails::Conundrum {
                scrambled,
                answer,
                first_correct_player_id,
                first_correct_at_ms,
            } => {
                view.scrambled = Some(scrambled.clone());
                view.answer = Some(answer.clone());
                view.first_correct_player_id = *first_correct_player_id;
                view.first_correct_at_ms = *first_correct_at_ms;
            }
        }

        view
    }
}

/// What an accepted action did to the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// State may have changed but the phase and its deadline did not.
    Unchanged,
    /// A new phase started; any timer armed for the previous one is stale.
    Entered(MatchPhase),
    Finished,
}

/// Identifies one phase instance. Timers carry the key they were armed for and
/// are ignored once the match has moved on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseKey {
    pub phase: MatchPhase,
    pub round_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuessOutcome {
    pub correct: bool,
    pub transition: Transition,
}

/// Display data the registry owns, handed in when building snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    pub player_id: PlayerId,
    pub display_name: String,
    pub connected: bool,
    pub rating: i32,
}

#[derive(Debug, Clone)]
pub struct Match {
    id: MatchId,
    mode: QueueMode,
    created_at_ms: i64,
    players: [PlayerId; 2],
    phase: MatchPhase,
    phase_ends_at_ms: Option<i64>,
    round_index: usize,
    plan: Vec<RoundPlan>,
    live_round: LiveRound,
    round_results: Vec<RoundResult>,
    scores: HashMap<PlayerId, u32>,
    winner_player_id: Option<PlayerId>,
    end_reason: Option<MatchEndReason>,
    finished_at_ms: Option<i64>,
    timings: PhaseTimings,
    constraints: PickConstraintChecker,
}

impl Match {
    pub fn new(
        id: MatchId,
        mode: QueueMode,
        players: [PlayerId; 2],
        now_ms: i64,
        timings: PhaseTimings,
    ) -> Self {
        let plan = build_round_plan(players);
        let first_picker = plan[0].picker_player_id.unwrap_or(players[0]);

        Self {
            id,
            mode,
            created_at_ms: now_ms,
            players,
            phase: MatchPhase::AwaitingLettersPick,
            phase_ends_at_ms: None,
            round_index: 0,
            plan,
            live_round: LiveRound::Letters(LettersRound::new(first_picker)),
            round_results: Vec::new(),
            scores: players.iter().map(|p| (*p, 0)).collect(),
            winner_player_id: None,
            end_reason: None,
            finished_at_ms: None,
            timings,
            constraints: PickConstraintChecker::default(),
        }
    }

    pub fn id(&self) -> MatchId {
        self.id
    }

    pub fn mode(&self) -> QueueMode {
        self.mode
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    pub fn players(&self) -> [PlayerId; 2] {
        self.players
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn phase_ends_at_ms(&self) -> Option<i64> {
        self.phase_ends_at_ms
    }

    pub fn phase_key(&self) -> PhaseKey {
        PhaseKey {
            phase: self.phase,
            round_index: self.round_index,
        }
    }

    pub fn round_index(&self) -> usize {
        self.round_index
    }

    pub fn current_plan(&self) -> &RoundPlan {
        &self.plan[self.round_index]
    }

    pub fn plan(&self) -> &[RoundPlan] {
        &self.plan
    }

    pub fn live_round(&self) -> &LiveRound {
        &self.live_round
    }

    pub fn round_results(&self) -> &[RoundResult] {
        &self.round_results
    }

    pub fn score(&self, player_id: PlayerId) -> u32 {
        self.scores.get(&player_id).copied().unwrap_or(0)
    }

    pub fn winner_player_id(&self) -> Option<PlayerId> {
        self.winner_player_id
    }

    pub fn end_reason(&self) -> Option<MatchEndReason> {
        self.end_reason
    }

    pub fn finished_at_ms(&self) -> Option<i64> {
        self.finished_at_ms
    }

    pub fn is_finished(&self) -> bool {
        self.phase == MatchPhase::Finished
    }

    pub fn is_participant(&self, player_id: PlayerId) -> bool {
        self.players.contains(&player_id)
    }

    pub fn opponent_of(&self, player_id: PlayerId) -> Option<PlayerId> {
        match self.players {
            [a, b] if a == player_id => Some(b),
            [a, b] if b == player_id => Some(a),
            _ => None,
        }
    }

    /// Result for `player_id` once finished; a null winner is a draw.
    pub fn outcome_for(&self, player_id: PlayerId) -> Option<MatchOutcome> {
        if !self.is_finished() {
            return None;
        }
        Some(match self.winner_player_id {
            None => MatchOutcome::Draw,
            Some(winner) if winner == player_id => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
        })
    }

    pub fn has_submitted(&self, player_id: PlayerId) -> bool {
        match &self.live_round {
            LiveRound::Letters(round) => round.submissions.contains_key(&player_id),
            LiveRound::Conundrum(_) => false,
        }
    }

    pub fn submission(&self, player_id: PlayerId) -> Option<&WordSubmission> {
        match &self.live_round {
            LiveRound::Letters(round) => round.submissions.get(&player_id),
            LiveRound::Conundrum(_) => None,
        }
    }

    /// Read-only check used when a client asks to re-subscribe.
    pub fn ensure_participant(&self, player_id: PlayerId) -> Result<(), ActionError> {
        if self.is_participant(player_id) {
            Ok(())
        } else {
            Err(ActionError::NotMatchParticipant)
        }
    }

    fn ensure_active(&self, player_id: PlayerId) -> Result<(), ActionError> {
        self.ensure_participant(player_id)?;
        if self.is_finished() {
            return Err(ActionError::InvalidPhase);
        }
        Ok(())
    }

    fn deadline_passed(&self, now_ms: i64) -> bool {
        matches!(self.phase_ends_at_ms, Some(deadline) if now_ms >= deadline)
    }

    /// Draw the next letter for the picker.
    pub fn pick_letter<R: Rng + ?Sized>(
        &mut self,
        player_id: PlayerId,
        kind: LetterKind,
        now_ms: i64,
        pool: &LetterPool,
        rng: &mut R,
    ) -> Result<Transition, ActionError> {
        self.ensure_active(player_id)?;

        let round = match &mut self.live_round {
            LiveRound::Letters(round) => round,
            LiveRound::Conundrum(_) => return Err(ActionError::InvalidRound),
        };
        if self.phase != MatchPhase::AwaitingLettersPick {
            return Err(ActionError::InvalidPhase);
        }
        if round.picker_player_id != player_id {
            return Err(ActionError::NotPicker);
        }
        if !self.constraints.is_allowed(&round.picks, kind) {
            return Err(ActionError::PickConstraintViolation);
        }

        let letter = pool.draw(kind, rng);
        round.picks.push(kind);
        round.letters.push(letter);

        if round.letters.len() < self.constraints.target_slots {
            return Ok(Transition::Unchanged);
        }

        self.enter_phase(
            MatchPhase::LettersSolving,
            Some(now_ms + self.timings.letters_solve_ms),
        );
        Ok(Transition::Entered(MatchPhase::LettersSolving))
    }

    /// Store one word per player. Invalid words are kept with score 0.
    pub fn submit_word(
        &mut self,
        player_id: PlayerId,
        raw_word: &str,
        now_ms: i64,
        dictionary: &dyn DictionaryProvider,
    ) -> Result<Transition, ActionError> {
        self.ensure_active(player_id)?;

        if matches!(self.live_round, LiveRound::Conundrum(_)) {
            return Err(ActionError::InvalidRound);
        }
        match self.phase {
            MatchPhase::LettersSolving => {}
            // the round closed before this arrived
            MatchPhase::RoundResult => return Err(ActionError::LateSubmission),
            _ => return Err(ActionError::InvalidPhase),
        }
        if self.deadline_passed(now_ms) {
            return Err(ActionError::LateSubmission);
        }

        let LiveRound::Letters(round) = &mut self.live_round else {
            return Err(ActionError::InvalidRound);
        };
        if round.submissions.contains_key(&player_id) {
            return Err(ActionError::DuplicateSubmission);
        }

        let submission = evaluate(raw_word, &round.letters, dictionary, now_ms);
        round.submissions.insert(player_id, submission);

        if round.submissions.len() < self.players.len() {
            return Ok(Transition::Unchanged);
        }

        self.finalize_round(now_ms);
        Ok(Transition::Entered(MatchPhase::RoundResult))
    }

    /// `last_guess_at_ms` is the time of the player's previous counted guess.
    pub fn submit_conundrum_guess(
        &mut self,
        player_id: PlayerId,
        guess: &str,
        now_ms: i64,
        last_guess_at_ms: Option<i64>,
    ) -> Result<GuessOutcome, ActionError> {
        self.ensure_active(player_id)?;

        match &self.live_round {
            LiveRound::Conundrum(round) if round.first_correct_player_id.is_some() => {
                return Err(ActionError::AlreadySolved);
            }
            LiveRound::Conundrum(_) => {}
            LiveRound::Letters(_) => return Err(ActionError::InvalidRound),
        }
        match self.phase {
            MatchPhase::ConundrumSolving => {}
            MatchPhase::RoundResult => return Err(ActionError::LateSubmission),
            _ => return Err(ActionError::InvalidPhase),
        }
        if self.deadline_passed(now_ms) {
            return Err(ActionError::LateSubmission);
        }
        if let Some(last) = last_guess_at_ms {
            if now_ms - last < self.timings.conundrum_guess_interval_ms {
                return Err(ActionError::RateLimited);
            }
        }

        let LiveRound::Conundrum(round) = &mut self.live_round else {
            return Err(ActionError::InvalidRound);
        };

        *round.attempts.entry(player_id).or_insert(0) += 1;

        let normalized = normalize(guess);
        if !is_alphabetical(&normalized) || !is_correct(&normalized, &round.answer) {
            return Ok(GuessOutcome {
                correct: false,
                transition: Transition::Unchanged,
            });
        }

        round.first_correct_player_id = Some(player_id);
        round.first_correct_at_ms = Some(now_ms);
        self.finalize_round(now_ms);

        Ok(GuessOutcome {
            correct: true,
            transition: Transition::Entered(MatchPhase::RoundResult),
        })
    }

    /// Timer callback. Does nothing unless `expected` is still the current
    /// phase and its deadline has been reached.
    pub fn on_phase_deadline<R: Rng + ?Sized>(
        &mut self,
        expected: PhaseKey,
        now_ms: i64,
        corpus: &ConundrumCorpus,
        rng: &mut R,
    ) -> Transition {
        if self.phase_key() != expected {
            return Transition::Unchanged;
        }
        if !self.deadline_passed(now_ms) {
            return Transition::Unchanged;
        }

        match self.phase {
            MatchPhase::LettersSolving | MatchPhase::ConundrumSolving => {
                self.finalize_round(now_ms);
                Transition::Entered(MatchPhase::RoundResult)
            }
            MatchPhase::RoundResult => self.advance_round(now_ms, corpus, rng),
            MatchPhase::AwaitingLettersPick | MatchPhase::Finished => Transition::Unchanged,
        }
    }

    /// Concede. The opponent wins regardless of score.
    pub fn forfeit(&mut self, player_id: PlayerId, now_ms: i64) -> Result<Transition, ActionError> {
        self.ensure_active(player_id)?;
        let opponent = self.opponent_of(player_id);
        self.finish(opponent, MatchEndReason::Forfeit, now_ms);
        Ok(Transition::Finished)
    }

    fn enter_phase(&mut self, phase: MatchPhase, ends_at_ms: Option<i64>) {
        debug_assert_eq!(phase.is_timed(), ends_at_ms.is_some());
        self.phase = phase;
        self.phase_ends_at_ms = ends_at_ms;
    }

    fn finalize_round(&mut self, now_ms: i64) {
        let round_number = self.current_plan().round_number;

        let (awarded_scores, details) = match &mut self.live_round {
            LiveRound::Letters(round) => {
                for player_id in self.players {
                    round
                        .submissions
                        .entry(player_id)
                        .or_insert_with(|| WordSubmission::missing(now_ms));
                }
                let awarded: HashMap<PlayerId, u32> = round
                    .submissions
                    .iter()
                    .map(|(player_id, submission)| (*player_id, submission.score))
                    .collect();
                let details = RoundDetails::Letters {
                    letters: round.letters.clone(),
                    submissions: round.submissions.clone(),
                };
                (awarded, details)
            }
            LiveRound::Conundrum(round) => {
                let awarded: HashMap<PlayerId, u32> = self
                    .players
                    .iter()
                    .map(|player_id| {
                        let score = if round.first_correct_player_id == Some(*player_id) {
                            CONUNDRUM_SCORE
                        } else {
                            0
                        };
                        (*player_id, score)
                    })
                    .collect();
                let details = RoundDetails::Conundrum {
                    scrambled: round.scrambled.clone(),
                    answer: round.answer.clone(),
                    first_correct_player_id: round.first_correct_player_id,
                    first_correct_at_ms: round.first_correct_at_ms,
                };
                (awarded, details)
            }
        };

        for (player_id, score) in &awarded_scores {
            *self.scores.entry(*player_id).or_insert(0) += score;
        }
        self.round_results.push(RoundResult {
            round_number,
            awarded_scores,
            details,
        });

        self.enter_phase(
            MatchPhase::RoundResult,
            Some(now_ms + self.timings.round_result_ms),
        );
    }

    fn advance_round<R: Rng + ?Sized>(
        &mut self,
        now_ms: i64,
        corpus: &ConundrumCorpus,
        rng: &mut R,
    ) -> Transition {
        if self.round_index + 1 >= self.plan.len() {
            let [a, b] = self.players;
            let winner = match self.score(a).cmp(&self.score(b)) {
                std::cmp::Ordering::Greater => Some(a),
                std::cmp::Ordering::Less => Some(b),
                std::cmp::Ordering::Equal => None,
            };
            self.finish(winner, MatchEndReason::Completed, now_ms);
            return Transition::Finished;
        }

        self.round_index += 1;
        let plan = self.plan[self.round_index];
        match plan.round_type {
            RoundType::Letters => {
                let picker = plan.picker_player_id.unwrap_or(self.players[0]);
                self.live_round = LiveRound::Letters(LettersRound::new(picker));
                self.enter_phase(MatchPhase::AwaitingLettersPick, None);
                Transition::Entered(MatchPhase::AwaitingLettersPick)
            }
            RoundType::Conundrum => {
                let entry = corpus.choose(rng);
                self.live_round = LiveRound::Conundrum(ConundrumRound {
                    scrambled: entry.scrambled.clone(),
                    answer: entry.answer.clone(),
                    first_correct_player_id: None,
                    first_correct_at_ms: None,
                    attempts: HashMap::new(),
                });
                self.enter_phase(
                    MatchPhase::ConundrumSolving,
                    Some(now_ms + self.timings.conundrum_solve_ms),
                );
                Transition::Entered(MatchPhase::ConundrumSolving)
            }
        }
    }

    fn finish(&mut self, winner: Option<PlayerId>, reason: MatchEndReason, now_ms: i64) {
        self.winner_player_id = winner;
        self.end_reason = Some(reason);
        self.finished_at_ms = Some(now_ms);
        self.enter_phase(MatchPhase::Finished, None);
    }

    /// Snapshot personalised for `viewer`. The opponent's word stays hidden
    /// until the round is finalized, and the conundrum answer only shows up in
    /// `round_results`.
    pub fn view_for(
        &self,
        viewer: PlayerId,
        server_now_ms: i64,
        participants: &[ParticipantInfo],
    ) -> MatchStateView {
        let players = self
            .players
            .iter()
            .map(|player_id| {
                let info = participants.iter().find(|p| p.player_id == *player_id);
                MatchPlayerView {
                    player_id: *player_id,
                    display_name: info.map(|i| i.display_name.clone()).unwrap_or_default(),
                    connected: info.is_some_and(|i| i.connected),
                    score: self.score(*player_id),
                    rating: info.map(|i| i.rating).unwrap_or_default(),
                    has_submitted: self.has_submitted(*player_id),
                }
            })
            .collect();

        let (picker_player_id, letters, scrambled) = match &self.live_round {
            LiveRound::Letters(round) => {
                (Some(round.picker_player_id), Some(round.letters.clone()), None)
            }
            LiveRound::Conundrum(round) => (None, None, Some(round.scrambled.clone())),
        };
        let your_submission: Option<WordSubmissionView> =
            self.submission(viewer).map(WordSubmission::to_view);
        let plan = self.current_plan();

        MatchStateView {
            match_id: self.id,
            mode: self.mode,
            phase: self.phase,
            phase_ends_at_ms: self.phase_ends_at_ms,
            server_now_ms,
            round_number: plan.round_number,
            round_type: plan.round_type,
            players,
            picker_player_id,
            letters,
            scrambled,
            your_submission,
            round_results: self.round_results.iter().map(RoundResult::to_view).collect(),
            winner_player_id: self.winner_player_id,
            match_end_reason: self.end_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_types::FailureCode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use uuid::Uuid;

    struct AnyWord;

    impl DictionaryProvider for AnyWord {
        fn contains(&self, _normalized_word: &str) -> bool {
            true
        }
    }

    struct Fixture {
        game: Match,
        a: PlayerId,
        b: PlayerId,
        pool: LetterPool,
        corpus: ConundrumCorpus,
        rng: StdRng,
        timings: PhaseTimings,
    }

    impl Fixture {
        fn new() -> Self {
            let a = Uuid::new_v4();
            let b = Uuid::new_v4();
            let timings = PhaseTimings::default();
            Self {
                game: Match::new(Uuid::new_v4(), QueueMode::Casual, [a, b], 0, timings),
                a,
                b,
                pool: LetterPool::new(),
                corpus: ConundrumCorpus::from_lines("LOGARITHM algorithm").unwrap(),
                rng: StdRng::seed_from_u64(11),
                timings,
            }
        }

        fn picker(&self) -> PlayerId {
            match self.game.live_round() {
                LiveRound::Letters(round) => round.picker_player_id,
                LiveRound::Conundrum(_) => panic!("not a letters round"),
            }
        }

        /// Alternate vowel/consonant until the pool is full.
        fn fill_letters(&mut self, now_ms: i64) {
            let picker = self.picker();
            for i in 0..TARGET_SLOTS {
                let kind = if i % 2 == 0 {
                    LetterKind::Vowel
                } else {
                    LetterKind::Consonant
                };
                self.game
                    .pick_letter(picker, kind, now_ms, &self.pool, &mut self.rng)
                    .unwrap();
            }
        }

        fn letters(&self) -> Vec<char> {
            match self.game.live_round() {
                LiveRound::Letters(round) => round.letters.clone(),
                LiveRound::Conundrum(_) => panic!("not a letters round"),
            }
        }

        fn fire_deadline(&mut self) -> Transition {
            let deadline = self.game.phase_ends_at_ms().expect("phase has no deadline");
            let key = self.game.phase_key();
            self.game
                .on_phase_deadline(key, deadline, &self.corpus, &mut self.rng)
        }

        /// Play letters rounds with empty submissions until the conundrum starts.
        fn skip_to_conundrum(&mut self) -> i64 {
            let mut now = 0;
            while self.game.phase() != MatchPhase::ConundrumSolving {
                match self.game.phase() {
                    MatchPhase::AwaitingLettersPick => {
                        self.fill_letters(now);
                        now += 1;
                    }
                    _ => {
                        now = self.game.phase_ends_at_ms().unwrap();
                        self.fire_deadline();
                    }
                }
            }
            now
        }
    }

    #[test]
    fn test_new_match_awaits_first_pick() {
        let f = Fixture::new();
        assert_eq!(f.game.phase(), MatchPhase::AwaitingLettersPick);
        assert_eq!(f.game.phase_ends_at_ms(), None);
        assert_eq!(f.game.current_plan().round_number, 1);
        assert_eq!(f.picker(), f.a);
        assert_eq!(f.game.score(f.a), 0);
        assert_eq!(f.game.score(f.b), 0);
    }

    #[test]
    fn test_round_plan_alternates_pickers() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let plan = build_round_plan([a, b]);

        assert_eq!(plan.len(), 5);
        let pickers: Vec<_> = plan.iter().map(|p| p.picker_player_id).collect();
        assert_eq!(pickers, vec![Some(a), Some(b), Some(a), Some(b), None]);
        assert!(plan[..4].iter().all(|p| p.round_type == RoundType::Letters));
        assert_eq!(plan[4].round_type, RoundType::Conundrum);
    }

    #[test]
    fn test_only_picker_may_pick() {
        let mut f = Fixture::new();
        let outsider = Uuid::new_v4();

        let result = f
            .game
            .pick_letter(f.b, LetterKind::Vowel, 0, &f.pool, &mut f.rng);
        assert_eq!(result, Err(ActionError::NotPicker));

        let result = f
            .game
            .pick_letter(outsider, LetterKind::Vowel, 0, &f.pool, &mut f.rng);
        assert_eq!(result, Err(ActionError::NotMatchParticipant));

        assert!(f.letters().is_empty());
    }

    #[test]
    fn test_ninth_pick_starts_solving() {
        let mut f = Fixture::new();
        f.fill_letters(1_000);

        assert_eq!(f.letters().len(), TARGET_SLOTS);
        assert_eq!(f.game.phase(), MatchPhase::LettersSolving);
        assert_eq!(
            f.game.phase_ends_at_ms(),
            Some(1_000 + f.timings.letters_solve_ms)
        );

        let result = f
            .game
            .pick_letter(f.a, LetterKind::Vowel, 1_001, &f.pool, &mut f.rng);
        assert_eq!(result, Err(ActionError::InvalidPhase));
    }

    #[test]
    fn test_eight_vowels_force_a_consonant() {
        let mut f = Fixture::new();
        for _ in 0..8 {
            f.game
                .pick_letter(f.a, LetterKind::Vowel, 0, &f.pool, &mut f.rng)
                .unwrap();
        }

        let result = f
            .game
            .pick_letter(f.a, LetterKind::Vowel, 0, &f.pool, &mut f.rng);
        assert_eq!(result, Err(ActionError::PickConstraintViolation));

        let result = f
            .game
            .pick_letter(f.a, LetterKind::Consonant, 0, &f.pool, &mut f.rng);
        assert_eq!(result, Ok(Transition::Entered(MatchPhase::LettersSolving)));
    }

    #[test]
    fn test_submit_before_letters_complete_is_invalid_phase() {
        let mut f = Fixture::new();
        let result = f.game.submit_word(f.a, "stone", 0, &AnyWord);
        assert_eq!(result, Err(ActionError::InvalidPhase));
    }

    #[test]
    fn test_duplicate_submission_keeps_first() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        let word: String = f.letters()[..3].iter().collect();

        f.game.submit_word(f.a, &word, 10, &AnyWord).unwrap();
        let first = f.game.submission(f.a).cloned().unwrap();
        assert!(first.is_valid);
        assert_eq!(first.score, 3);

        let result = f.game.submit_word(f.a, "", 20, &AnyWord);
        assert_eq!(result, Err(ActionError::DuplicateSubmission));
        assert_eq!(f.game.submission(f.a), Some(&first));
        assert_eq!(f.game.phase(), MatchPhase::LettersSolving);
    }

    #[test]
    fn test_submission_at_deadline_is_late() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        let deadline = f.game.phase_ends_at_ms().unwrap();

        let result = f.game.submit_word(f.a, "stone", deadline, &AnyWord);
        assert_eq!(result, Err(ActionError::LateSubmission));
        assert!(!f.game.has_submitted(f.a));

        assert!(f.game.submit_word(f.a, "", deadline - 1, &AnyWord).is_ok());
    }

    #[test]
    fn test_both_submitted_finalizes_immediately() {
        let mut f = Fixture::new();
        f.fill_letters(0);

        assert_eq!(f.game.submit_word(f.a, "", 100, &AnyWord), Ok(Transition::Unchanged));
        assert_eq!(
            f.game.submit_word(f.b, "   ", 200, &AnyWord),
            Ok(Transition::Entered(MatchPhase::RoundResult))
        );

        assert_eq!(f.game.phase(), MatchPhase::RoundResult);
        assert_eq!(f.game.phase_ends_at_ms(), Some(200 + f.timings.round_result_ms));
        let result = &f.game.round_results()[0];
        assert_eq!(result.awarded_scores[&f.a], 0);
        assert_eq!(result.awarded_scores[&f.b], 0);
        assert_eq!(f.game.score(f.a), 0);
    }

    #[test]
    fn test_deadline_synthesizes_missing_submissions() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        let word: String = f.letters()[..4].iter().collect();
        f.game.submit_word(f.a, &word, 10, &AnyWord).unwrap();

        let key = f.game.phase_key();
        assert_eq!(
            f.fire_deadline(),
            Transition::Entered(MatchPhase::RoundResult)
        );

        let result = &f.game.round_results()[0];
        let RoundDetails::Letters { submissions, .. } = &result.details else {
            panic!("expected letters details");
        };
        assert_eq!(submissions.len(), 2);
        assert_eq!(submissions[&f.b].failure_code, Some(FailureCode::Empty));
        assert_eq!(result.awarded_scores[&f.a], 4);
        assert_eq!(f.game.score(f.a), 4);

        // the same timer firing again is ignored
        let again = f
            .game
            .on_phase_deadline(key, i64::MAX, &f.corpus, &mut f.rng);
        assert_eq!(again, Transition::Unchanged);
        assert_eq!(f.game.round_results().len(), 1);

        // late submission after timer finalization
        let late = f.game.submit_word(f.b, "word", 40_000, &AnyWord);
        assert_eq!(late, Err(ActionError::LateSubmission));
    }

    #[test]
    fn test_deadline_before_time_does_nothing() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        let key = f.game.phase_key();
        let early = f.game.on_phase_deadline(key, 5, &f.corpus, &mut f.rng);
        assert_eq!(early, Transition::Unchanged);
        assert_eq!(f.game.phase(), MatchPhase::LettersSolving);
    }

    #[test]
    fn test_round_result_advances_to_next_picker() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        f.fire_deadline();

        assert_eq!(
            f.fire_deadline(),
            Transition::Entered(MatchPhase::AwaitingLettersPick)
        );
        assert_eq!(f.game.current_plan().round_number, 2);
        assert_eq!(f.picker(), f.b);
        assert!(f.letters().is_empty());
        assert_eq!(f.game.phase_ends_at_ms(), None);
    }

    #[test]
    fn test_wrong_round_type_errors() {
        let mut f = Fixture::new();
        let result = f.game.submit_conundrum_guess(f.a, "algorithm", 0, None);
        assert_eq!(result, Err(ActionError::InvalidRound));

        let now = f.skip_to_conundrum();
        let result = f
            .game
            .pick_letter(f.a, LetterKind::Vowel, now, &f.pool, &mut f.rng);
        assert_eq!(result, Err(ActionError::InvalidRound));
        let result = f.game.submit_word(f.a, "stone", now, &AnyWord);
        assert_eq!(result, Err(ActionError::InvalidRound));
    }

    #[test]
    fn test_conundrum_first_correct_wins() {
        let mut f = Fixture::new();
        let now = f.skip_to_conundrum();
        assert_eq!(f.game.current_plan().round_number, 5);

        let outcome = f
            .game
            .submit_conundrum_guess(f.a, " Algorithm ", now + 10, None)
            .unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.transition, Transition::Entered(MatchPhase::RoundResult));

        let late = f.game.submit_conundrum_guess(f.b, "algorithm", now + 20, None);
        assert_eq!(late, Err(ActionError::AlreadySolved));

        let result = f.game.round_results().last().unwrap();
        assert_eq!(result.awarded_scores[&f.a], CONUNDRUM_SCORE);
        assert_eq!(result.awarded_scores[&f.b], 0);
        let RoundDetails::Conundrum {
            first_correct_player_id,
            first_correct_at_ms,
            ..
        } = &result.details
        else {
            panic!("expected conundrum details");
        };
        assert_eq!(*first_correct_player_id, Some(f.a));
        assert_eq!(*first_correct_at_ms, Some(now + 10));
    }

    #[test]
    fn test_conundrum_wrong_and_junk_guesses_count() {
        let mut f = Fixture::new();
        let now = f.skip_to_conundrum();

        let wrong = f.game.submit_conundrum_guess(f.a, "logarithm", now, None).unwrap();
        assert!(!wrong.correct);
        let junk = f
            .game
            .submit_conundrum_guess(f.a, "alg0rithm!", now + 600, Some(now))
            .unwrap();
        assert!(!junk.correct);
        let blank = f
            .game
            .submit_conundrum_guess(f.a, "", now + 1_200, Some(now + 600))
            .unwrap();
        assert_eq!(blank.transition, Transition::Unchanged);

        let LiveRound::Conundrum(round) = f.game.live_round() else {
            panic!("expected conundrum");
        };
        assert_eq!(round.attempts[&f.a], 3);
        assert_eq!(f.game.phase(), MatchPhase::ConundrumSolving);
    }

    #[test]
    fn test_conundrum_rate_limit_is_not_counted() {
        let mut f = Fixture::new();
        let now = f.skip_to_conundrum();

        f.game.submit_conundrum_guess(f.a, "wrong", now, None).unwrap();
        let limited = f
            .game
            .submit_conundrum_guess(f.a, "algorithm", now + 100, Some(now));
        assert_eq!(limited, Err(ActionError::RateLimited));

        let LiveRound::Conundrum(round) = f.game.live_round() else {
            panic!("expected conundrum");
        };
        assert_eq!(round.attempts[&f.a], 1);
        assert_eq!(round.first_correct_player_id, None);
    }

    #[test]
    fn test_conundrum_guess_after_deadline_is_late() {
        let mut f = Fixture::new();
        f.skip_to_conundrum();
        let deadline = f.game.phase_ends_at_ms().unwrap();

        let result = f.game.submit_conundrum_guess(f.a, "algorithm", deadline, None);
        assert_eq!(result, Err(ActionError::LateSubmission));

        f.fire_deadline();
        let result = f
            .game
            .submit_conundrum_guess(f.a, "algorithm", deadline + 1, None);
        assert_eq!(result, Err(ActionError::LateSubmission));
        assert_eq!(f.game.round_results().last().unwrap().awarded_scores[&f.a], 0);
    }

    #[test]
    fn test_late_guess_wins_over_rate_limit() {
        let mut f = Fixture::new();
        f.skip_to_conundrum();
        let deadline = f.game.phase_ends_at_ms().unwrap();

        let result = f
            .game
            .submit_conundrum_guess(f.a, "algorithm", deadline, Some(deadline - 1));
        assert_eq!(result, Err(ActionError::LateSubmission));

        let solved = f
            .game
            .submit_conundrum_guess(f.b, "algorithm", deadline - 10, None)
            .unwrap();
        assert!(solved.correct);
        let result = f
            .game
            .submit_conundrum_guess(f.a, "algorithm", deadline + 5, Some(deadline + 4));
        assert_eq!(result, Err(ActionError::AlreadySolved));
    }

    #[test]
    fn test_match_finishes_with_higher_score_winning() {
        let mut f = Fixture::new();
        let now = f.skip_to_conundrum();
        f.game
            .submit_conundrum_guess(f.b, "algorithm", now + 1, None)
            .unwrap();

        assert_eq!(f.fire_deadline(), Transition::Finished);
        assert!(f.game.is_finished());
        assert_eq!(f.game.phase_ends_at_ms(), None);
        assert_eq!(f.game.winner_player_id(), Some(f.b));
        assert_eq!(f.game.end_reason(), Some(MatchEndReason::Completed));
        assert_eq!(f.game.outcome_for(f.b), Some(MatchOutcome::Win));
        assert_eq!(f.game.outcome_for(f.a), Some(MatchOutcome::Loss));
        assert_eq!(f.game.round_results().len(), 5);
    }

    #[test]
    fn test_equal_scores_are_a_tie() {
        let mut f = Fixture::new();
        f.skip_to_conundrum();
        f.fire_deadline();
        assert_eq!(f.fire_deadline(), Transition::Finished);

        assert_eq!(f.game.winner_player_id(), None);
        assert_eq!(f.game.outcome_for(f.a), Some(MatchOutcome::Draw));
    }

    #[test]
    fn test_awarded_scores_match_submissions() {
        let mut f = Fixture::new();
        let mut now = 0;
        for _ in 0..LETTERS_ROUNDS {
            f.fill_letters(now);
            let letters = f.letters();
            let short: String = letters[..2].iter().collect();
            let long: String = letters[..5].iter().collect();
            f.game.submit_word(f.a, &short, now + 1, &AnyWord).unwrap();
            f.game.submit_word(f.b, &long, now + 2, &AnyWord).unwrap();
            now = f.game.phase_ends_at_ms().unwrap();
            f.fire_deadline();
        }

        let mut expected_total = 0;
        for result in f.game.round_results() {
            let RoundDetails::Letters { submissions, .. } = &result.details else {
                panic!("expected letters details");
            };
            let valid: u32 = submissions
                .values()
                .filter(|s| s.is_valid)
                .map(|s| s.score)
                .sum();
            let awarded: u32 = result.awarded_scores.values().sum();
            assert_eq!(valid, awarded);
            expected_total += awarded;
        }
        assert_eq!(f.game.score(f.a) + f.game.score(f.b), expected_total);
        assert_eq!(f.game.score(f.b), 20);
    }

    #[test]
    fn test_forfeit_awards_opponent() {
        let mut f = Fixture::new();
        f.fill_letters(0);

        assert_eq!(f.game.forfeit(f.b, 50), Ok(Transition::Finished));
        assert_eq!(f.game.winner_player_id(), Some(f.a));
        assert_eq!(f.game.end_reason(), Some(MatchEndReason::Forfeit));
        assert_eq!(f.game.finished_at_ms(), Some(50));

        assert_eq!(f.game.forfeit(f.a, 60), Err(ActionError::InvalidPhase));
        assert_eq!(
            f.game.submit_word(f.a, "stone", 70, &AnyWord),
            Err(ActionError::InvalidPhase)
        );
    }

    #[test]
    fn test_view_hides_opponent_word() {
        let mut f = Fixture::new();
        f.fill_letters(0);
        let word: String = f.letters()[..3].iter().collect();
        f.game.submit_word(f.a, &word, 5, &AnyWord).unwrap();

        let roster = vec![
            ParticipantInfo {
                player_id: f.a,
                display_name: "Ada".to_string(),
                connected: true,
                rating: 1000,
            },
            ParticipantInfo {
                player_id: f.b,
                display_name: "Bo".to_string(),
                connected: false,
                rating: 1100,
            },
        ];

        let for_a = f.game.view_for(f.a, 6, &roster);
        assert_eq!(for_a.your_submission.as_ref().unwrap().normalized_word, word);
        assert_eq!(for_a.letters.as_ref().unwrap().len(), TARGET_SLOTS);

        let for_b = f.game.view_for(f.b, 6, &roster);
        assert!(for_b.your_submission.is_none());
        let a_view = for_b.player(f.a).unwrap();
        assert!(a_view.has_submitted);
        assert_eq!(a_view.display_name, "Ada");
        let b_view = for_b.player(f.b).unwrap();
        assert!(!b_view.connected);
        assert_eq!(b_view.rating, 1100);
        assert_eq!(for_b.picker_player_id, Some(f.a));
    }

    #[test]
    fn test_view_never_leaks_live_answer() {
        let mut f = Fixture::new();
        f.skip_to_conundrum();
        let view = f.game.view_for(f.a, 0, &[]);

        assert_eq!(view.scrambled.as_deref(), Some("logarithm"));
        assert_eq!(view.round_type, RoundType::Conundrum);
        assert!(view.round_results.iter().all(|r| r.answer.is_none()));

        f.fire_deadline();
        let view = f.game.view_for(f.a, 0, &[]);
        assert_eq!(
            view.round_results.last().unwrap().answer.as_deref(),
            Some("algorithm")
        );
    }
}
