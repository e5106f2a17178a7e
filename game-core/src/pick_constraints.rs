use game_types::LetterKind;

/// Number of letters drawn in every letters round.
pub const TARGET_SLOTS: usize = 9;

/// Decides which letter kinds a picker may still choose so that the finished
/// pool always holds the minimum number of vowels and consonants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickConstraintChecker {
    pub target_slots: usize,
    pub min_vowels: usize,
    pub min_consonants: usize,
}

impl Default for PickConstraintChecker {
    fn default() -> Self {
        Self {
            target_slots: TARGET_SLOTS,
            min_vowels: 1,
            min_consonants: 1,
        }
    }
}

impl PickConstraintChecker {
    /// Kinds that may legally be picked next, vowels first.
    pub fn allowed_kinds(&self, picks: &[LetterKind]) -> Vec<LetterKind> {
        [LetterKind::Vowel, LetterKind::Consonant]
            .into_iter()
            .filter(|kind| self.is_allowed(picks, *kind))
            .collect()
    }

    pub fn is_allowed(&self, picks: &[LetterKind], kind: LetterKind) -> bool {
        if picks.len() >= self.target_slots {
            return false;
        }

        let (vowels, consonants) = count_kinds(picks);
        let (next_vowels, next_consonants) = match kind {
            LetterKind::Vowel => (vowels + 1, consonants),
            LetterKind::Consonant => (vowels, consonants + 1),
        };

        let needed_vowels = self.min_vowels.saturating_sub(next_vowels);
        let needed_consonants = self.min_consonants.saturating_sub(next_consonants);
        let remaining_slots = self.target_slots - picks.len();

        needed_vowels + needed_consonants <= remaining_slots - 1
    }
}

/// (vowels, consonants) among the picks so far.
pub fn count_kinds(picks: &[LetterKind]) -> (usize, usize) {
    let vowels = picks.iter().filter(|k| **k == LetterKind::Vowel).count();
    (vowels, picks.len() - vowels)
}
