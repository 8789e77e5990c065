//! A positional inverted index over the word pool. For each word length the
//! index keeps one bucket per position mapping a character to the words that
//! carry it there, which lets pattern queries run as sorted-set intersections
//! ordered smallest bucket first.

use std::collections::HashMap;

use crate::pool::{is_alphabet_char, Pool};
use crate::types::{GlobalWordId, WordId};

/// Whether pattern-query results come back alphabetized or in raw id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    #[default]
    Alphabetical,
    AsIs,
}

/// The index itself. Word ids are indices into the per-length buckets and stay
/// stable for the life of the index; the initial build is alphabetical, and
/// words injected later (by the hydrator) append at the end of their bucket.
#[derive(Debug, Default)]
pub struct PatternIndex {
    unknown: char,
    words: Vec<Vec<String>>,
    pos: Vec<Vec<HashMap<char, Vec<WordId>>>>,
    id_by_word: HashMap<String, GlobalWordId>,
}

impl PatternIndex {
    /// Build the index from a pool. `unknown` is the wildcard character
    /// recognized in patterns; when it collides with an alphabet character
    /// (the default `_` does), the wildcard reading wins.
    #[must_use]
    pub fn build(pool: &Pool, unknown: char) -> PatternIndex {
        let mut index = PatternIndex {
            unknown,
            words: vec![],
            pos: vec![],
            id_by_word: HashMap::new(),
        };
        for len in pool.lengths() {
            for word in pool.words_of_len(len) {
                index.add_word(word);
            }
        }
        index
    }

    #[must_use]
    pub fn unknown(&self) -> char {
        self.unknown
    }

    /// All indexed words of the given length, in id order.
    #[must_use]
    pub fn bucket(&self, len: usize) -> &[String] {
        self.words.get(len).map_or(&[], Vec::as_slice)
    }

    /// Borrow a word by its global id.
    #[must_use]
    pub fn word(&self, gid: GlobalWordId) -> &str {
        &self.words[gid.0][gid.1]
    }

    #[must_use]
    pub fn word_id(&self, word: &str) -> Option<GlobalWordId> {
        self.id_by_word.get(word).copied()
    }

    /// Record a word, returning its (possibly pre-existing) global id.
    pub fn add_word(&mut self, word: &str) -> GlobalWordId {
        if let Some(&gid) = self.id_by_word.get(word) {
            return gid;
        }

        let len = word.chars().count();
        while self.words.len() <= len {
            self.words.push(vec![]);
            self.pos.push(vec![]);
        }
        if self.pos[len].is_empty() {
            self.pos[len] = (0..len).map(|_| HashMap::new()).collect();
        }

        let id = self.words[len].len();
        for (i, ch) in word.chars().enumerate() {
            self.pos[len][i].entry(ch).or_default().push(id);
        }
        self.words[len].push(word.to_string());
        self.id_by_word.insert(word.to_string(), (len, id));
        (len, id)
    }

    fn pos_bucket(&self, len: usize, i: usize, ch: char) -> Option<&Vec<WordId>> {
        self.pos.get(len)?.get(i)?.get(&ch)
    }

    fn pos_bucket_len(&self, len: usize, i: usize, ch: char) -> usize {
        self.pos_bucket(len, i, ch).map_or(0, Vec::len)
    }

    /// Collect the fixed (position, char) constraints of a pattern. Returns
    /// `None` when the pattern is unusable: wrong length or a character that
    /// is neither the wildcard nor part of the alphabet.
    fn fixed_constraints(&self, len: usize, pattern: &str) -> Option<Vec<(usize, char)>> {
        if pattern.chars().count() != len {
            return None;
        }
        let mut fixed = vec![];
        for (i, ch) in pattern.chars().enumerate() {
            if ch == self.unknown {
                continue;
            }
            if !is_alphabet_char(ch) {
                return None;
            }
            fixed.push((i, ch));
        }
        Some(fixed)
    }

    /// Answer a pattern query: the ids of all length-`len` words matching
    /// `pattern` (fixed characters plus wildcards). Constraints are
    /// intersected in ascending order of bucket size, short-circuiting as soon
    /// as the intersection empties. An unusable pattern yields an empty result
    /// rather than an error.
    #[must_use]
    pub fn candidates_for_pattern(
        &self,
        len: usize,
        pattern: &str,
        order: QueryOrder,
        limit: Option<usize>,
    ) -> Vec<WordId> {
        if limit == Some(0) {
            return vec![];
        }
        let Some(bucket) = self.words.get(len) else {
            return vec![];
        };
        let Some(mut fixed) = self.fixed_constraints(len, pattern) else {
            return vec![];
        };

        let mut ids: Vec<WordId> = if fixed.is_empty() {
            (0..bucket.len()).collect()
        } else {
            fixed.sort_by_key(|&(i, ch)| self.pos_bucket_len(len, i, ch));

            let Some(first) = self.pos_bucket(len, fixed[0].0, fixed[0].1) else {
                return vec![];
            };
            let mut ids = first.clone();
            for &(i, ch) in &fixed[1..] {
                let Some(other) = self.pos_bucket(len, i, ch) else {
                    return vec![];
                };
                ids.retain(|id| other.binary_search(id).is_ok());
                if ids.is_empty() {
                    return vec![];
                }
            }
            ids
        };

        if order == QueryOrder::Alphabetical {
            ids.sort_by(|&a, &b| bucket[a].cmp(&bucket[b]));
        }
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        ids
    }

    /// Count the words matching `pattern`, stopping early at `cap`. This is
    /// the cheap path used by LCV scoring.
    #[must_use]
    pub fn count_for_pattern(&self, len: usize, pattern: &str, cap: usize) -> usize {
        if cap == 0 || self.words.get(len).is_none() {
            return 0;
        }
        let Some(mut fixed) = self.fixed_constraints(len, pattern) else {
            return 0;
        };
        if fixed.is_empty() {
            return self.words[len].len().min(cap);
        }

        fixed.sort_by_key(|&(i, ch)| self.pos_bucket_len(len, i, ch));
        let Some(smallest) = self.pos_bucket(len, fixed[0].0, fixed[0].1) else {
            return 0;
        };

        let mut count = 0;
        for &id in smallest {
            let in_all = fixed[1..].iter().all(|&(i, ch)| {
                self.pos_bucket(len, i, ch)
                    .map_or(false, |bucket| bucket.binary_search(&id).is_ok())
            });
            if in_all {
                count += 1;
                if count >= cap {
                    return cap;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_index() -> PatternIndex {
        let mut pool = Pool::new();
        pool.add_words(["CAT", "COT", "DOG", "ACT", "APPLE", "EAGLE"], 5);
        PatternIndex::build(&pool, '_')
    }

    fn words_for(index: &PatternIndex, len: usize, pattern: &str) -> Vec<String> {
        index
            .candidates_for_pattern(len, pattern, QueryOrder::Alphabetical, None)
            .into_iter()
            .map(|id| index.word((len, id)).to_string())
            .collect()
    }

    #[test]
    fn test_open_pattern_returns_whole_bucket() {
        let index = sample_index();
        assert_eq!(words_for(&index, 3, "___"), ["ACT", "CAT", "COT", "DOG"]);
        assert_eq!(words_for(&index, 5, "_____"), ["APPLE", "EAGLE"]);
    }

    #[test]
    fn test_fixed_positions_intersect() {
        let index = sample_index();
        assert_eq!(words_for(&index, 3, "C_T"), ["CAT", "COT"]);
        assert_eq!(words_for(&index, 3, "CAT"), ["CAT"]);
        assert_eq!(words_for(&index, 3, "__G"), ["DOG"]);
        assert!(words_for(&index, 3, "X__").is_empty());
    }

    #[test]
    fn test_constraint_order_is_irrelevant() {
        // The same result set must come back no matter which fixed position
        // the intersection starts from; exercise every single-wildcard
        // rotation of a fully fixed pattern.
        let index = sample_index();
        for pattern in ["_AT", "C_T", "CA_"] {
            assert_eq!(words_for(&index, 3, pattern), ["CAT"], "pattern {pattern}");
        }
    }

    #[test]
    fn test_pattern_edge_cases() {
        let index = sample_index();

        // Length mismatch and invalid characters yield empty, not errors.
        assert!(index
            .candidates_for_pattern(3, "____", QueryOrder::Alphabetical, None)
            .is_empty());
        assert!(index
            .candidates_for_pattern(3, "c__", QueryOrder::Alphabetical, None)
            .is_empty());
        assert!(index
            .candidates_for_pattern(9, "_________", QueryOrder::Alphabetical, None)
            .is_empty());

        // limit=0 is empty; an absent limit returns everything.
        assert!(index
            .candidates_for_pattern(3, "___", QueryOrder::Alphabetical, Some(0))
            .is_empty());
        assert_eq!(
            index
                .candidates_for_pattern(3, "___", QueryOrder::Alphabetical, Some(2))
                .len(),
            2
        );
        assert_eq!(
            index
                .candidates_for_pattern(3, "___", QueryOrder::Alphabetical, None)
                .len(),
            4
        );
    }

    #[test]
    fn test_positional_membership_matches_bucket() {
        // w is in the bucket iff every position bucket for its letters
        // contains it.
        let index = sample_index();
        for len in [3, 5] {
            for (id, word) in index.bucket(len).iter().enumerate() {
                for (i, ch) in word.chars().enumerate() {
                    let ids = index.pos_bucket(len, i, ch).expect("bucket exists");
                    assert!(ids.binary_search(&id).is_ok(), "{word} at {i}");
                }
            }
        }
    }

    #[test]
    fn test_count_for_pattern_caps() {
        let index = sample_index();
        assert_eq!(index.count_for_pattern(3, "___", 50), 4);
        assert_eq!(index.count_for_pattern(3, "___", 2), 2);
        assert_eq!(index.count_for_pattern(3, "C_T", 50), 2);
        assert_eq!(index.count_for_pattern(3, "X__", 50), 0);
        assert_eq!(index.count_for_pattern(3, "___", 0), 0);
    }

    #[test]
    fn test_add_word_keeps_ids_stable() {
        let mut index = sample_index();
        let cat = index.word_id("CAT").unwrap();
        let added = index.add_word("BAT");

        assert_eq!(index.word_id("CAT"), Some(cat));
        assert_eq!(index.word_id("BAT"), Some(added));
        assert_eq!(index.add_word("BAT"), added);

        // The new word shows up in queries, still alphabetized.
        let words = words_for(&index, 3, "_AT");
        assert_eq!(words, ["BAT", "CAT"]);
    }

    #[test]
    fn test_add_word_of_new_length() {
        let mut index = sample_index();
        index.add_word("SEVENTEEN");
        assert_eq!(words_for(&index, 9, "_________"), ["SEVENTEEN"]);
        assert_eq!(words_for(&index, 9, "S________"), ["SEVENTEEN"]);
    }
}
