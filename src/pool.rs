//! The word pool: normalization, the grid alphabet, length-bucketed storage,
//! and the JSON-backed store with atomic persistence.
//!
//! On disk the pool is a JSON object keyed by stringified length
//! (`{"3": ["CAT", ...], ...}`); the string keys are purely a serialization
//! detail and never leak past `PoolStore`.

use fancy_regex::Regex;
use lazy_static::lazy_static;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use unicode_normalization::UnicodeNormalization;

use crate::errors::PoolError;
use crate::MIN_ENTRY_LEN;

lazy_static! {
    /// Every stored word matches this; anything else is dropped at the door.
    static ref WORD_RE: Regex = Regex::new("^[A-Z0-9_]+$").unwrap();
}

/// Is this character part of the grid alphabet (A-Z, digits, underscore)?
#[must_use]
pub fn is_alphabet_char(ch: char) -> bool {
    ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_'
}

/// Given a raw word from any source, turn it into the normalized form used
/// everywhere in the fill engine: uppercase, NFC, whitespace stripped.
#[must_use]
pub fn normalize_word(raw: &str) -> String {
    raw.to_uppercase()
        .nfc()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// Does this (already normalized) word fit the grid alphabet?
#[must_use]
pub fn is_valid_word(word: &str) -> bool {
    !word.is_empty() && WORD_RE.is_match(word).unwrap_or(false)
}

/// The in-memory word pool: a sorted, deduplicated set of words per length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pool {
    buckets: BTreeMap<usize, Vec<String>>,
}

impl Pool {
    #[must_use]
    pub fn new() -> Pool {
        Pool::default()
    }

    /// All words of the given length, alphabetically ordered.
    #[must_use]
    pub fn words_of_len(&self, len: usize) -> &[String] {
        self.buckets.get(&len).map_or(&[], Vec::as_slice)
    }

    /// The lengths that currently have at least one word.
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.buckets
            .iter()
            .filter(|(_, words)| !words.is_empty())
            .map(|(&len, _)| len)
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.buckets
            .get(&word.chars().count())
            .map_or(false, |bucket| bucket.binary_search(&word.to_string()).is_ok())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(Vec::is_empty)
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Normalize, validate, and merge the given words into the pool, bucketing
    /// by length. Only lengths in `MIN_ENTRY_LEN..=max_len` are accepted.
    /// Modified buckets are re-sorted and deduplicated; returns the number of
    /// words actually added per length.
    pub fn add_words<I, S>(&mut self, words: I, max_len: usize) -> BTreeMap<usize, usize>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added: BTreeMap<usize, usize> = BTreeMap::new();

        for raw in words {
            let word = normalize_word(raw.as_ref());
            if !is_valid_word(&word) {
                continue;
            }
            let len = word.chars().count();
            if !(MIN_ENTRY_LEN..=max_len).contains(&len) {
                continue;
            }
            let bucket = self.buckets.entry(len).or_default();
            if !bucket.contains(&word) {
                bucket.push(word);
                *added.entry(len).or_insert(0) += 1;
            }
        }

        for &len in added.keys() {
            if let Some(bucket) = self.buckets.get_mut(&len) {
                bucket.sort();
                bucket.dedup();
            }
        }

        added
    }

    /// Build a pool from raw length buckets, applying the same normalization
    /// and validation as `add_words` but with no upper length limit.
    #[must_use]
    pub fn from_buckets(raw: BTreeMap<usize, Vec<String>>) -> Pool {
        let mut pool = Pool::new();
        let max_len = raw.keys().copied().max().unwrap_or(0);
        for (_, words) in raw {
            pool.add_words(words.iter().map(String::as_str), max_len);
        }
        pool
    }
}

/// On-disk pool store keyed by word length.
#[derive(Debug, Clone)]
pub struct PoolStore {
    path: PathBuf,
}

impl PoolStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> PoolStore {
        PoolStore { path: path.into() }
    }

    /// Read the pool file, defaulting to empty buckets when the file is
    /// absent, unreadable, or malformed.
    #[must_use]
    pub fn load(&self) -> Pool {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!("pool file {} not loaded: {err}", self.path.display());
                return Pool::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, Vec<String>>>(&contents) {
            Ok(raw) => {
                let buckets = raw
                    .into_iter()
                    .filter_map(|(key, words)| key.parse::<usize>().ok().map(|len| (len, words)))
                    .collect();
                Pool::from_buckets(buckets)
            }
            Err(err) => {
                warn!("pool file {} is malformed: {err}", self.path.display());
                Pool::new()
            }
        }
    }

    /// Persist the pool: write to a temp file, keep the previous file as a
    /// best-effort `.bak`, then rename the temp file into place.
    pub fn save_atomic(&self, pool: &Pool) -> Result<(), PoolError> {
        let raw: BTreeMap<String, Vec<String>> = pool
            .buckets
            .iter()
            .filter(|(_, words)| !words.is_empty())
            .map(|(len, words)| (len.to_string(), words.clone()))
            .collect();
        let json = serde_json::to_string_pretty(&raw)?;

        let tmp = self.path.with_extension("tmp");
        let bak = self.path.with_extension("bak");
        fs::write(&tmp, json)?;
        if self.path.exists() {
            let _ = fs::rename(&self.path, &bak);
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
