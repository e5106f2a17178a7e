use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use rand::Rng;

use crate::pick_constraints::TARGET_SLOTS;
use crate::word_validation::{is_alphabetical, normalize};

/// Points for the first correct conundrum guess.
pub const CONUNDRUM_SCORE: u32 = 12;

/// Exact match after trim and lowercase. No partial credit.
pub fn is_correct(guess: &str, answer: &str) -> bool {
    normalize(guess) == normalize(answer)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConundrumEntry {
    pub scrambled: String,
    pub answer: String,
}

impl ConundrumEntry {
    pub fn new(scrambled: &str, answer: &str) -> Result<Self> {
        let scrambled = normalize(scrambled);
        let answer = normalize(answer);

        for word in [&scrambled, &answer] {
            if !is_alphabetical(word) || word.chars().count() != TARGET_SLOTS {
                bail!("conundrum word '{word}' must be {TARGET_SLOTS} letters");
            }
        }
        if letter_counts(&scrambled) != letter_counts(&answer) {
            bail!("'{scrambled}' is not an anagram of '{answer}'");
        }

        Ok(Self { scrambled, answer })
    }
}

fn letter_counts(word: &str) -> HashMap<char, usize> {
    let mut counts = HashMap::new();
    for ch in word.chars() {
        *counts.entry(ch).or_insert(0) += 1;
    }
    counts
}

/// Read-only pool of conundrums; never empty.
#[derive(Debug, Clone)]
pub struct ConundrumCorpus {
    entries: Vec<ConundrumEntry>,
}

impl ConundrumCorpus {
    pub fn new(entries: Vec<ConundrumEntry>) -> Result<Self> {
        if entries.is_empty() {
            bail!("conundrum corpus is empty");
        }
        Ok(Self { entries })
    }

    /// Parse `SCRAMBLED answer` lines. Blank lines and `#` comments are skipped.
    pub fn from_lines(text: &str) -> Result<Self> {
        let mut entries = Vec::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut parts = line.split_whitespace();
            let (Some(scrambled), Some(answer), None) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("line {}: expected 'SCRAMBLED answer'", index + 1);
            };
            let entry = ConundrumEntry::new(scrambled, answer)
                .with_context(|| format!("line {}", index + 1))?;
            entries.push(entry);
        }
        Self::new(entries)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read conundrums {}", path.display()))?;
        let corpus = Self::from_lines(&contents)
            .with_context(|| format!("invalid conundrum file {}", path.display()))?;
        tracing::info!("Loaded {} conundrums from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &ConundrumEntry {
        &self.entries[rng.random_range(0..self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
