use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use game_types::{FailureCode, WordSubmissionView};

use crate::pick_constraints::TARGET_SLOTS;

/// Fixed bonus for using all nine letters.
pub const FULL_POOL_SCORE: u32 = 12;

/// Read-only dictionary lookup. Receives already-normalized words.
pub trait DictionaryProvider: Send + Sync {
    fn contains(&self, normalized_word: &str) -> bool;
}

/// In-memory word list backed by a hash set.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    valid_words: HashSet<String>,
}

impl WordList {
    /// Create a word list from newline separated text.
    /// Blank lines and `#` comments are skipped.
    pub fn from_word_list(word_list: &str) -> Self {
        let valid_words = word_list
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_lowercase)
            .filter(|word| is_alphabetical(word))
            .collect();

        Self { valid_words }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read word list {}", path.display()))?;
        let list = Self::from_word_list(&contents);
        tracing::info!("Loaded {} words from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.valid_words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid_words.is_empty()
    }
}

impl DictionaryProvider for WordList {
    fn contains(&self, normalized_word: &str) -> bool {
        self.valid_words.contains(normalized_word)
    }
}

/// Trim surrounding whitespace and lowercase.
pub fn normalize(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Non-empty and made only of letters.
pub fn is_alphabetical(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

/// Whether `word` can be spelled from `letters`, each used at most as often as drawn.
pub fn can_construct(word: &str, letters: &[char]) -> bool {
    let mut available: HashMap<char, usize> = HashMap::new();
    for letter in letters {
        for lower in letter.to_lowercase() {
            *available.entry(lower).or_insert(0) += 1;
        }
    }

    for ch in normalize(word).chars() {
        match available.get_mut(&ch) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }

    true
}

/// Score for a valid word of `length` letters.
pub fn score_for_length(length: usize) -> u32 {
    match length {
        0 => 0,
        TARGET_SLOTS => FULL_POOL_SCORE,
        n => n as u32,
    }
}

/// One player's word for a letters round. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSubmission {
    pub raw_word: String,
    pub normalized_word: String,
    pub is_valid: bool,
    pub failure_code: Option<FailureCode>,
    pub score: u32,
    pub submitted_at_ms: i64,
}

impl WordSubmission {
    fn failed(raw_word: &str, normalized_word: String, code: FailureCode, now_ms: i64) -> Self {
        Self {
            raw_word: raw_word.to_string(),
            normalized_word,
            is_valid: false,
            failure_code: Some(code),
            score: 0,
            submitted_at_ms: now_ms,
        }
    }

    /// Stand-in for a player who never submitted before the round closed.
    pub fn missing(now_ms: i64) -> Self {
        Self::failed("", String::new(), FailureCode::Empty, now_ms)
    }

    pub fn to_view(&self) -> WordSubmissionView {
        WordSubmissionView {
            raw_word: self.raw_word.clone(),
            normalized_word: self.normalized_word.clone(),
            is_valid: self.is_valid,
            failure_code: self.failure_code,
            score: self.score,
            submitted_at_ms: self.submitted_at_ms,
        }
    }
}

/// Run every word rule in priority order; the first failure is final.
pub fn evaluate(
    raw_word: &str,
    letters: &[char],
    dictionary: &dyn DictionaryProvider,
    now_ms: i64,
) -> WordSubmission {
    let normalized = normalize(raw_word);

    if normalized.is_empty() {
        return WordSubmission::failed(raw_word, normalized, FailureCode::Empty, now_ms);
    }
    if !is_alphabetical(&normalized) {
        return WordSubmission::failed(raw_word, normalized, FailureCode::NonAlphabetical, now_ms);
    }
    if !dictionary.contains(&normalized) {
        return WordSubmission::failed(raw_word, normalized, FailureCode::NotInDictionary, now_ms);
    }
    if !can_construct(&normalized, letters) {
        return WordSubmission::failed(raw_word, normalized, FailureCode::NotConstructable, now_ms);
    }

    let score = score_for_length(normalized.chars().count());
    WordSubmission {
        raw_word: raw_word.to_string(),
        normalized_word: normalized,
        is_valid: true,
        failure_code: None,
        score,
        submitted_at_ms: now_ms,
    }
}
