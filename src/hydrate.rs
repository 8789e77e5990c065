//! On-the-fly domain expansion. When a slot's live candidate list gets too
//! small, the hydrator asks an external pattern-lookup provider for words
//! matching the slot's current pattern, merges the survivors into the pool and
//! index, and extends the slot's domain. Provider failures are soft: they are
//! logged, cached as empty, and never abort the solve.

use log::{debug, warn};
use std::collections::{HashMap, HashSet};

use crate::domains::{pattern_for_slot, DomainSet, UsedWords};
use crate::errors::LookupError;
use crate::grid::Grid;
use crate::index::PatternIndex;
use crate::pool::{is_valid_word, normalize_word, Pool, PoolStore};
use crate::slot::Slot;
use crate::types::{SlotId, WordId};

/// The wildcard character understood by lookup providers.
pub const PROVIDER_WILDCARD: char = '?';

/// Interface to an external pattern-based word lookup service. `pattern` uses
/// `?` as the wildcard; implementations return at most `max` raw words and
/// report transport or status problems as `LookupError`.
pub trait WordLookup {
    fn fetch(&self, pattern: &str, max: usize) -> Result<Vec<String>, LookupError>;
}

/// A provider backed by a fixed in-memory word list. Useful for offline runs
/// and as the standard test double.
#[derive(Debug, Default)]
pub struct StaticLookup {
    entries: Vec<String>,
}

impl StaticLookup {
    #[must_use]
    pub fn new<I, S>(words: I) -> StaticLookup
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StaticLookup {
            entries: words.into_iter().map(|w| normalize_word(w.as_ref())).collect(),
        }
    }
}

impl WordLookup for StaticLookup {
    fn fetch(&self, pattern: &str, max: usize) -> Result<Vec<String>, LookupError> {
        let matches = self
            .entries
            .iter()
            .filter(|word| {
                word.chars().count() == pattern.chars().count()
                    && word
                        .chars()
                        .zip(pattern.chars())
                        .all(|(w, p)| p == PROVIDER_WILDCARD || w == p)
            })
            .take(max)
            .cloned()
            .collect();
        Ok(matches)
    }
}

/// A provider that always fails, for exercising the soft-failure path.
#[derive(Debug, Default)]
pub struct FailingLookup;

impl WordLookup for FailingLookup {
    fn fetch(&self, _pattern: &str, _max: usize) -> Result<Vec<String>, LookupError> {
        Err(LookupError::Status(503))
    }
}

fn matches_pattern(word: &str, pattern: &str, unknown: char) -> bool {
    word.chars()
        .zip(pattern.chars())
        .all(|(w, p)| p == unknown || w == p)
}

/// Bounded pattern-lookup front end: a per-run result cache keyed by
/// `(length, pattern)`, a nogood set for exhausted `(slot, pattern)` pairs,
/// and the plumbing that injects fetched words into the pool, the index, and
/// a slot's domain.
pub struct Hydrator {
    provider: Box<dyn WordLookup>,
    store: Option<PoolStore>,
    hydrate_if_below: usize,
    onelook_max: usize,
    cache: HashMap<(usize, String), Vec<String>>,
    nogoods: HashSet<(SlotId, String)>,
}

impl Hydrator {
    #[must_use]
    pub fn new(provider: Box<dyn WordLookup>, hydrate_if_below: usize, onelook_max: usize) -> Hydrator {
        Hydrator {
            provider,
            store: None,
            hydrate_if_below,
            onelook_max,
            cache: HashMap::new(),
            nogoods: HashSet::new(),
        }
    }

    /// Persist the pool through this store after every successful merge.
    #[must_use]
    pub fn with_store(mut self, store: PoolStore) -> Hydrator {
        self.store = Some(store);
        self
    }

    /// Is this domain small enough to be worth a lookup?
    #[must_use]
    pub fn should_hydrate(&self, domain_size: usize) -> bool {
        domain_size < self.hydrate_if_below
    }

    /// Record that this (slot, pattern) pair exhausted its candidates, so
    /// later hydration attempts for the same pattern are skipped.
    pub fn record_nogood(&mut self, slot_id: SlotId, pattern: String) {
        self.nogoods.insert((slot_id, pattern));
    }

    #[must_use]
    pub fn has_nogood(&self, slot_id: SlotId, pattern: &str) -> bool {
        self.nogoods.contains(&(slot_id, pattern.to_string()))
    }

    /// A slot's pattern in provider form, with the grid's unknown character
    /// translated to the provider wildcard.
    #[must_use]
    pub fn provider_pattern(grid: &Grid, slot: &Slot, unknown: char) -> String {
        pattern_for_slot(grid, slot, unknown)
            .chars()
            .map(|ch| if ch == unknown { PROVIDER_WILDCARD } else { ch })
            .collect()
    }

    /// Try to grow one slot's domain from the provider. Returns true iff new
    /// candidates were actually added to the domain.
    pub fn hydrate_slot(
        &mut self,
        domains: &mut DomainSet,
        grid: &Grid,
        slot: &Slot,
        pool: &mut Pool,
        index: &mut PatternIndex,
        used: &UsedWords,
    ) -> bool {
        let unknown = index.unknown();
        let pattern = pattern_for_slot(grid, slot, unknown);
        if self.has_nogood(slot.id, &pattern) {
            return false;
        }

        let key = (slot.length, pattern.clone());
        let words: Vec<String> = match self.cache.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let lookup_pattern: String = pattern
                    .chars()
                    .map(|ch| if ch == unknown { PROVIDER_WILDCARD } else { ch })
                    .collect();
                let mut fetched = match self.provider.fetch(&lookup_pattern, self.onelook_max) {
                    Ok(raw) => raw
                        .iter()
                        .map(|w| normalize_word(w))
                        .filter(|w| {
                            w.chars().count() == slot.length
                                && is_valid_word(w)
                                && matches_pattern(w, &pattern, unknown)
                        })
                        .collect::<Vec<String>>(),
                    Err(err) => {
                        warn!("word lookup failed for pattern {lookup_pattern}: {err}");
                        vec![]
                    }
                };
                fetched.sort();
                fetched.dedup();
                self.cache.insert(key, fetched.clone());
                fetched
            }
        };

        if words.is_empty() {
            return false;
        }

        // Merge anything genuinely new into the pool and persist it.
        let fresh: Vec<&String> = words.iter().filter(|w| !pool.contains(w)).collect();
        if !fresh.is_empty() {
            let added = pool.add_words(fresh.iter().map(|w| w.as_str()), grid.size());
            let added_total: usize = added.values().sum();
            debug!("hydrated {added_total} new pool words for slot {}", slot.key());
            if let Some(store) = &self.store {
                if let Err(err) = store.save_atomic(pool) {
                    warn!("failed to persist hydrated pool: {err}");
                }
            }
        }

        // Extend the slot's domain with every fetched word that's usable.
        let new_ids: Vec<WordId> = words
            .iter()
            .map(|w| index.add_word(w))
            .filter(|gid| gid.0 == slot.length && !used.contains(gid))
            .map(|gid| gid.1)
            .collect();

        let before = domains.domain(slot.id).len();
        domains.extend_domain(slot.id, new_ids);
        domains.domain(slot.id).len() > before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCharset;
    use crate::slot::build_slots;

    fn single_slot_grid() -> (Grid, Vec<Slot>) {
        // Only the middle row is open: one across slot of length 5.
        let rows: Vec<String> = [".....", ".....", "_____", ".....", "....."]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        let grid = Grid::from_rows(&rows, &GridCharset::default()).unwrap();
        let slots = build_slots(&grid, 3);
        (grid, slots)
    }

    #[test]
    fn test_static_lookup_filters_by_pattern() {
        let provider = StaticLookup::new(["HELLO", "HOSTS", "WORLD"]);
        assert_eq!(provider.fetch("H????", 10).unwrap(), ["HELLO", "HOSTS"]);
        assert_eq!(provider.fetch("?????", 1).unwrap(), ["HELLO"]);
        assert!(provider.fetch("????", 10).unwrap().is_empty());
    }

    #[test]
    fn test_hydrate_slot_extends_domain_and_pool() {
        let (grid, slots) = single_slot_grid();
        let slot = &slots[0];

        let mut pool = Pool::new();
        pool.add_words(["APPLE"], 5);
        let mut index = PatternIndex::build(&pool, '_');
        let used = UsedWords::new();
        let mut domains = DomainSet::init(&grid, &slots, &index, &used);
        assert_eq!(domains.domain(slot.id).len(), 1);

        let mut hydrator = Hydrator::new(
            Box::new(StaticLookup::new(["EAGLE", "HELLO", "apple"])),
            3,
            50,
        );
        assert!(hydrator.should_hydrate(1));

        let grew = hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used);
        assert!(grew);
        assert_eq!(domains.domain(slot.id).len(), 3);
        assert!(pool.contains("EAGLE"));
        assert!(pool.contains("HELLO"));
        // The duplicate of an existing pool word is not double-counted.
        assert_eq!(pool.words_of_len(5).len(), 3);

        // A second call hits the cache and adds nothing new.
        let grew_again =
            hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used);
        assert!(!grew_again);
    }

    #[test]
    fn test_hydrate_respects_used_words() {
        let (grid, slots) = single_slot_grid();
        let slot = &slots[0];

        let mut pool = Pool::new();
        let mut index = PatternIndex::build(&pool, '_');
        let mut used = UsedWords::new();
        used.insert(index.add_word("HELLO"));
        let mut domains = DomainSet::init(&grid, &slots, &index, &used);

        let mut hydrator = Hydrator::new(Box::new(StaticLookup::new(["HELLO"])), 3, 50);
        let grew = hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used);
        assert!(!grew);
        assert!(domains.domain(slot.id).is_empty());
    }

    #[test]
    fn test_provider_failure_is_soft_and_cached() {
        let (grid, slots) = single_slot_grid();
        let slot = &slots[0];

        let mut pool = Pool::new();
        let mut index = PatternIndex::build(&pool, '_');
        let used = UsedWords::new();
        let mut domains = DomainSet::init(&grid, &slots, &index, &used);

        let mut hydrator = Hydrator::new(Box::new(FailingLookup), 3, 50);
        assert!(!hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used));
        // The empty result was cached, so the retry never reaches the
        // provider and still reports no growth.
        assert!(!hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_nogood_short_circuits() {
        let (grid, slots) = single_slot_grid();
        let slot = &slots[0];

        let mut pool = Pool::new();
        let mut index = PatternIndex::build(&pool, '_');
        let used = UsedWords::new();
        let mut domains = DomainSet::init(&grid, &slots, &index, &used);

        let mut hydrator = Hydrator::new(Box::new(StaticLookup::new(["HELLO"])), 3, 50);
        let pattern = pattern_for_slot(&grid, slot, '_');
        hydrator.record_nogood(slot.id, pattern.clone());
        assert!(hydrator.has_nogood(slot.id, &pattern));

        assert!(!hydrator.hydrate_slot(&mut domains, &grid, slot, &mut pool, &mut index, &used));
        assert!(domains.domain(slot.id).is_empty());
    }

    #[test]
    fn test_provider_pattern_uses_wildcard() {
        let (mut grid, slots) = single_slot_grid();
        grid.place_letter(2, 0, 'H').unwrap();
        assert_eq!(Hydrator::provider_pattern(&grid, &slots[0], '_'), "H????");
    }
}
