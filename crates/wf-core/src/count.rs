//! Word-count tables and the additive merge used at every aggregation level.
//!
//! A [`WordCount`] is produced per file by the tokenizer, combined per batch
//! by the mapper workers, and folded into the service-wide tally by the
//! aggregator. All three levels use the same operation, [`WordCount::merge`],
//! which adds counts key by key. Because addition is commutative and
//! associative the final tally does not depend on which worker counted which
//! file or in what order partial results arrived.
//!
//! # Examples
//!
//! ```
//! use wf_core::WordCount;
//!
//! let mut total = WordCount::new();
//! let mut a = WordCount::new();
//! a.increment("fox");
//! a.increment("dog");
//! let mut b = WordCount::new();
//! b.increment("fox");
//!
//! total.merge(&a);
//! total.merge(&b);
//! assert_eq!(total.get("fox"), 2);
//! assert_eq!(total.get("dog"), 1);
//! assert_eq!(total.get("cat"), 0);
//! ```

use std::cmp::Reverse;
use std::collections::hash_map;

use serde::{Deserialize, Serialize};

use crate::hash::{FxHashMap, fx_hash_map_with_capacity};

/// Mapping from a case-sensitive word to its number of occurrences.
///
/// Serializes as a plain JSON object (`{"word": count, ...}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordCount {
    words: FxHashMap<String, u64>,
}

impl WordCount {
    /// Creates an empty table.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with room for `capacity` distinct words.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: fx_hash_map_with_capacity(capacity),
        }
    }

    /// Records one occurrence of `word`.
    ///
    /// Only allocates the first time a word is seen.
    pub fn increment(&mut self, word: &str) {
        if let Some(count) = self.words.get_mut(word) {
            *count += 1;
        } else {
            self.words.insert(word.to_owned(), 1);
        }
    }

    /// Adds `count` occurrences of `word`.
    pub fn add(&mut self, word: impl Into<String>, count: u64) {
        *self.words.entry(word.into()).or_insert(0) += count;
    }

    /// Returns the number of occurrences of `word`, or zero if absent.
    #[must_use]
    pub fn get(&self, word: &str) -> u64 {
        self.words.get(word).copied().unwrap_or(0)
    }

    /// Number of distinct words.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if no word has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Sum of all occurrence counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.words.values().sum()
    }

    /// Adds every count in `from` into `self`, creating missing words.
    ///
    /// `from` is left untouched; use [`absorb`](Self::absorb) when the source
    /// table is no longer needed to avoid cloning its keys.
    pub fn merge(&mut self, from: &Self) {
        self.words.reserve(from.words.len().saturating_sub(self.words.len()));
        for (word, &count) in &from.words {
            if let Some(existing) = self.words.get_mut(word.as_str()) {
                *existing += count;
            } else {
                self.words.insert(word.clone(), count);
            }
        }
    }

    /// Adds every count in `from` into `self`, consuming `from`.
    pub fn absorb(&mut self, from: Self) {
        if self.words.is_empty() {
            self.words = from.words;
            return;
        }
        for (word, count) in from.words {
            *self.words.entry(word).or_insert(0) += count;
        }
    }

    /// Combines two tables, reusing the larger one's allocation.
    ///
    /// Suitable as the combining step of a parallel reduction.
    #[must_use]
    pub fn merged(self, other: Self) -> Self {
        let (mut base, rest) = if self.len() >= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        base.absorb(rest);
        base
    }

    /// Iterates over `(word, count)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.words.iter().map(|(w, &c)| (w.as_str(), c))
    }

    /// Returns all entries ordered lexicographically by word.
    #[must_use]
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Returns the `n` most frequent words, ties broken by word order.
    #[must_use]
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by_key(|&(word, count)| (Reverse(count), word));
        entries.truncate(n);
        entries
    }
}

impl FromIterator<(String, u64)> for WordCount {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut counts = Self::new();
        for (word, count) in iter {
            counts.add(word, count);
        }
        counts
    }
}

impl IntoIterator for WordCount {
    type Item = (String, u64);
    type IntoIter = hash_map::IntoIter<String, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.words.into_iter()
    }
}
