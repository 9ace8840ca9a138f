//! Song-name similarity over padded n-gram sets.

use hashbrown::HashSet;
use itertools::Itertools;

/// Weight of the bigram similarity in [`combined_similarity`].
/// The trigram similarity has weight 1.
pub const BIGRAM_WEIGHT: f64 = 0.3;

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct NgramSet(HashSet<String>);

impl NgramSet {
    /// # Panics
    /// Panics if `n` is zero.
    pub fn new(s: &str, n: usize) -> Self {
        assert!(n > 0, "n-gram length must be positive");
        let padding = std::iter::repeat(' ').take(n - 1);
        let chars = padding
            .clone()
            .chain(s.chars())
            .chain(padding)
            .collect_vec();
        Self(chars.windows(n).map(|w| w.iter().collect()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, gram: &str) -> bool {
        self.0.contains(gram)
    }

    pub fn intersection_len(&self, other: &Self) -> usize {
        self.0.intersection(&other.0).count()
    }

    /// `2 |A ∩ B| / (|A| + |B|)`.
    pub fn dice(&self, other: &Self) -> f64 {
        let total = self.len() + other.len();
        if total == 0 {
            // Only reachable with n = 1 and two empty strings.
            return 1.;
        }
        (2 * self.intersection_len(other)) as f64 / total as f64
    }
}

pub fn ngram_similarity(s1: &str, s2: &str, n: usize) -> f64 {
    NgramSet::new(s1, n).dice(&NgramSet::new(s2, n))
}

/// The score used to rank fuzzy-match candidates.  Not bounded by 1.
pub fn combined_similarity(s1: &str, s2: &str) -> f64 {
    BIGRAM_WEIGHT * ngram_similarity(s1, s2, 2) + ngram_similarity(s1, s2, 3)
}
