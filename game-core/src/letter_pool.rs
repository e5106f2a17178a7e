//! Weighted letter draws for the letters rounds.

use game_types::LetterKind;
use rand::Rng;

/// Vowel frequencies, lexicographically ordered so draws replay under a seed.
const VOWEL_WEIGHTS: [(char, u32); 5] = [('a', 15), ('e', 21), ('i', 13), ('o', 13), ('u', 5)];

/// Consonant frequencies, lexicographically ordered.
const CONSONANT_WEIGHTS: [(char, u32); 21] = [
    ('b', 2),
    ('c', 3),
    ('d', 6),
    ('f', 2),
    ('g', 3),
    ('h', 2),
    ('j', 1),
    ('k', 1),
    ('l', 5),
    ('m', 4),
    ('n', 8),
    ('p', 4),
    ('q', 1),
    ('r', 9),
    ('s', 9),
    ('t', 9),
    ('v', 1),
    ('w', 1),
    ('x', 1),
    ('y', 1),
    ('z', 1),
];

#[derive(Debug, Clone)]
struct WeightedLetters {
    entries: Vec<(char, u32)>,
    total_weight: u32,
}

impl WeightedLetters {
    fn new(entries: &[(char, u32)]) -> Self {
        let mut entries = entries.to_vec();
        entries.sort_by_key(|(letter, _)| *letter);
        let total_weight = entries.iter().map(|(_, weight)| weight).sum();
        Self {
            entries,
            total_weight,
        }
    }

    fn pick(&self, roll: u32) -> char {
        let mut running = 0;
        for (letter, weight) in &self.entries {
            running += weight;
            if running > roll {
                return *letter;
            }
        }
        // roll < total_weight, so the walk always ends inside the list
        self.entries[self.entries.len() - 1].0
    }
}

/// Two independent weighted distributions, one per letter kind.
#[derive(Debug, Clone)]
pub struct LetterPool {
    vowels: WeightedLetters,
    consonants: WeightedLetters,
}

impl LetterPool {
    pub fn new() -> Self {
        Self::with_weights(&VOWEL_WEIGHTS, &CONSONANT_WEIGHTS)
    }

    /// Build a pool from custom weights. Entries are re-sorted by letter.
    pub fn with_weights(vowels: &[(char, u32)], consonants: &[(char, u32)]) -> Self {
        assert!(
            vowels.iter().any(|(_, w)| *w > 0) && consonants.iter().any(|(_, w)| *w > 0),
            "letter pool needs a positive weight for both kinds"
        );
        Self {
            vowels: WeightedLetters::new(vowels),
            consonants: WeightedLetters::new(consonants),
        }
    }

    pub fn draw<R: Rng + ?Sized>(&self, kind: LetterKind, rng: &mut R) -> char {
        let letters = self.letters_for(kind);
        let roll = rng.random_range(0..letters.total_weight);
        letters.pick(roll)
    }

    pub fn total_weight(&self, kind: LetterKind) -> u32 {
        self.letters_for(kind).total_weight
    }

    pub fn contains(&self, kind: LetterKind, letter: char) -> bool {
        self.letters_for(kind)
            .entries
            .iter()
            .any(|(l, w)| *l == letter && *w > 0)
    }

    fn letters_for(&self, kind: LetterKind) -> &WeightedLetters {
        match kind {
            LetterKind::Vowel => &self.vowels,
            LetterKind::Consonant => &self.consonants,
        }
    }
}

impl Default for LetterPool {
    fn default() -> Self {
        Self::new()
    }
}
