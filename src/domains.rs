//! Per-slot candidate domains, kept live against the grid and the used-word
//! set. After initialization or any post-placement recompute, an unassigned
//! slot's domain is exactly the set of pool words that match its pattern and
//! haven't been used elsewhere.

use std::collections::HashSet;

use crate::grid::{Cell, Grid};
use crate::index::{PatternIndex, QueryOrder};
use crate::slot::Slot;
use crate::types::{GlobalWordId, SlotId, WordId};

/// Words already assigned somewhere in the current partial solution.
pub type UsedWords = HashSet<GlobalWordId>;

/// A full copy of every slot's domain, as taken before a placement.
pub type DomainSnapshot = Vec<Vec<WordId>>;

/// The pattern a slot currently presents: its fixed letters with every empty
/// cell replaced by `unknown`.
#[must_use]
pub fn pattern_for_slot(grid: &Grid, slot: &Slot, unknown: char) -> String {
    slot.cells
        .iter()
        .map(|&(r, c)| match grid.cell(r, c) {
            Cell::Letter(ch) => ch,
            _ => unknown,
        })
        .collect()
}

/// The current candidate words for every slot.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    by_slot: Vec<Vec<WordId>>,
}

impl DomainSet {
    /// Compute one slot's domain from scratch: pattern-index candidates in
    /// alphabetical order, minus used words.
    #[must_use]
    pub fn compute_domain(
        grid: &Grid,
        slot: &Slot,
        index: &PatternIndex,
        used: &UsedWords,
    ) -> Vec<WordId> {
        let pattern = pattern_for_slot(grid, slot, index.unknown());
        index
            .candidates_for_pattern(slot.length, &pattern, QueryOrder::Alphabetical, None)
            .into_iter()
            .filter(|&id| !used.contains(&(slot.length, id)))
            .collect()
    }

    /// Initialize every slot's domain against the current grid.
    #[must_use]
    pub fn init(grid: &Grid, slots: &[Slot], index: &PatternIndex, used: &UsedWords) -> DomainSet {
        DomainSet {
            by_slot: slots
                .iter()
                .map(|slot| Self::compute_domain(grid, slot, index, used))
                .collect(),
        }
    }

    #[must_use]
    pub fn domain(&self, slot_id: SlotId) -> &[WordId] {
        &self.by_slot[slot_id]
    }

    pub fn set_domain(&mut self, slot_id: SlotId, domain: Vec<WordId>) {
        self.by_slot[slot_id] = domain;
    }

    /// Append candidates to a slot's domain, skipping ids already present.
    /// This is the hydration path.
    pub fn extend_domain(&mut self, slot_id: SlotId, new_ids: impl IntoIterator<Item = WordId>) {
        let domain = &mut self.by_slot[slot_id];
        for id in new_ids {
            if !domain.contains(&id) {
                domain.push(id);
            }
        }
    }

    /// Forward-check after a placement: recompute the domain of every
    /// unassigned slot crossing `placed`. Returns `(emptied, affected)` where
    /// `emptied` lists the recomputed slots whose domain wiped out.
    pub fn recompute_after_placement(
        &mut self,
        grid: &Grid,
        slots: &[Slot],
        index: &PatternIndex,
        used: &UsedWords,
        placed: SlotId,
        assigned: &[bool],
    ) -> (Vec<SlotId>, Vec<SlotId>) {
        let mut emptied = vec![];
        let mut affected = vec![];

        let neighbors: Vec<SlotId> = slots[placed]
            .crossings
            .iter()
            .flatten()
            .map(|crossing| crossing.other_slot_id)
            .collect();

        for other in neighbors {
            if assigned[other] {
                continue;
            }
            let domain = Self::compute_domain(grid, &slots[other], index, used);
            if domain.is_empty() {
                emptied.push(other);
            }
            affected.push(other);
            self.by_slot[other] = domain;
        }

        (emptied, affected)
    }

    /// Full copy of the domains map.
    #[must_use]
    pub fn snapshot(&self) -> DomainSnapshot {
        self.by_slot.clone()
    }

    /// Restore a snapshot exactly.
    pub fn restore(&mut self, snapshot: DomainSnapshot) {
        self.by_slot = snapshot;
    }

    /// Enforce global uniqueness: delete the word from every domain of the
    /// matching length, returning the slots that actually shrank.
    pub fn remove_word_from_all_domains(
        &mut self,
        slots: &[Slot],
        word: GlobalWordId,
    ) -> Vec<SlotId> {
        let mut affected = vec![];
        for slot in slots {
            if slot.length != word.0 {
                continue;
            }
            let domain = &mut self.by_slot[slot.id];
            let before = domain.len();
            domain.retain(|&id| id != word.1);
            if domain.len() != before {
                affected.push(slot.id);
            }
        }
        affected
    }
}
