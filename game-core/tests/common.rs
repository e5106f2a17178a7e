use game_core::{ConundrumCorpus, LetterPool, Match, PhaseTimings, Transition, WordList};
use game_types::{LetterKind, MatchPhase, PlayerId, QueueMode};
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Creates a test word list with a known set of words
pub fn create_test_dictionary() -> WordList {
    let word_list = "stone\nnotes\nonset\ntones\nnoon\nnon\nalgorithm\nhouse\nwater";
    WordList::from_word_list(word_list)
}

pub fn create_test_corpus() -> ConundrumCorpus {
    ConundrumCorpus::from_lines("LOGARITHM algorithm").expect("valid corpus")
}

/// Pool where every vowel is 'o' and every consonant is 'n', so the drawn
/// letters follow directly from the picked kinds.
pub fn create_predictable_pool() -> LetterPool {
    LetterPool::with_weights(&[('o', 1)], &[('n', 1)])
}

pub fn seeded_rng() -> StdRng {
    StdRng::seed_from_u64(2024)
}

pub struct TestMatch {
    pub game: Match,
    pub alice: PlayerId,
    pub bob: PlayerId,
    pub pool: LetterPool,
    pub corpus: ConundrumCorpus,
    pub rng: StdRng,
}

/// Creates a match between two fresh players at time zero
pub fn create_test_match(mode: QueueMode) -> TestMatch {
    let alice = uuid::Uuid::new_v4();
    let bob = uuid::Uuid::new_v4();
    TestMatch {
        game: Match::new(
            uuid::Uuid::new_v4(),
            mode,
            [alice, bob],
            0,
            PhaseTimings::default(),
        ),
        alice,
        bob,
        pool: create_predictable_pool(),
        corpus: create_test_corpus(),
        rng: seeded_rng(),
    }
}

impl TestMatch {
    pub fn current_picker(&self) -> PlayerId {
        self.game
            .current_plan()
            .picker_player_id
            .expect("letters round has a picker")
    }

    /// Picks the given kinds in order for the current picker
    pub fn pick_all(&mut self, kinds: &[LetterKind], now_ms: i64) -> Transition {
        let picker = self.current_picker();
        let mut last = Transition::Unchanged;
        for kind in kinds {
            last = self
                .game
                .pick_letter(picker, *kind, now_ms, &self.pool, &mut self.rng)
                .expect("pick should be accepted");
        }
        last
    }

    /// Fires the current phase deadline as a timer would
    pub fn expire_phase(&mut self) -> Transition {
        let deadline = self
            .game
            .phase_ends_at_ms()
            .expect("current phase has a deadline");
        let key = self.game.phase_key();
        self.game
            .on_phase_deadline(key, deadline, &self.corpus, &mut self.rng)
    }
}

/// Nine picks that respect the vowel/consonant minimums
pub fn standard_picks() -> Vec<LetterKind> {
    use LetterKind::{Consonant, Vowel};
    vec![
        Consonant, Vowel, Vowel, Consonant, Consonant, Vowel, Consonant, Vowel, Consonant,
    ]
}

/// Asserts phase and deadline presence together
pub fn assert_phase(game: &Match, expected: MatchPhase) {
    assert_eq!(
        game.phase(),
        expected,
        "Expected phase {:?}, got {:?}",
        expected,
        game.phase()
    );
    assert_eq!(
        game.phase_ends_at_ms().is_some(),
        expected.is_timed(),
        "deadline presence does not match phase {:?}",
        expected
    );
}
