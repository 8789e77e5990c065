//! Slot selection and candidate ordering.
//!
//! MRV picks the unassigned slot with the fewest remaining candidates,
//! breaking ties through a configurable chain. LCV orders a slot's candidates
//! by how much room they leave in the crossing slots, measured through
//! projected pattern counts against the index.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domains::{pattern_for_slot, DomainSet};
use crate::grid::Grid;
use crate::index::PatternIndex;
use crate::slot::Slot;
use crate::types::{SlotId, WordId};

/// Cap on the per-neighbor option count used in LCV scoring, so one wide-open
/// crossing cannot drown out the constrained ones.
pub const LCV_NEIGHBOR_CAP: usize = 50;

/// Tie-breakers applied, in order, between slots with equal domain sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreak {
    /// More crossings first: each placement propagates into more neighbors.
    CrossingsDesc,
    /// Longer slots first: fewer long words exist.
    LenDesc,
    /// Slot key ascending, for determinism.
    AlphaAsc,
}

/// The default tie-break chain.
#[must_use]
pub fn default_tie_breaks() -> Vec<TieBreak> {
    vec![TieBreak::CrossingsDesc, TieBreak::LenDesc, TieBreak::AlphaAsc]
}

fn compare_slots(
    a: SlotId,
    b: SlotId,
    slots: &[Slot],
    domains: &DomainSet,
    tie_breaks: &[TieBreak],
) -> Ordering {
    let mut ord = domains.domain(a).len().cmp(&domains.domain(b).len());
    for tie_break in tie_breaks {
        if ord != Ordering::Equal {
            break;
        }
        ord = match tie_break {
            TieBreak::CrossingsDesc => slots[b].crossing_count().cmp(&slots[a].crossing_count()),
            TieBreak::LenDesc => slots[b].length.cmp(&slots[a].length),
            TieBreak::AlphaAsc => slots[a].key().cmp(&slots[b].key()),
        };
    }
    ord.then(a.cmp(&b))
}

/// MRV slot selection over the unassigned slots. With `frontier` enabled the
/// search is first restricted to unassigned slots that cross an assigned one,
/// falling back to all unassigned slots when that set is empty; this clusters
/// the fill and keeps propagation local.
#[must_use]
pub fn select_slot(
    slots: &[Slot],
    domains: &DomainSet,
    assigned: &[bool],
    tie_breaks: &[TieBreak],
    frontier: bool,
) -> Option<SlotId> {
    let unassigned: Vec<SlotId> = (0..slots.len()).filter(|&id| !assigned[id]).collect();
    if unassigned.is_empty() {
        return None;
    }

    let pick = |candidates: &[SlotId]| -> Option<SlotId> {
        candidates
            .iter()
            .copied()
            .min_by(|&a, &b| compare_slots(a, b, slots, domains, tie_breaks))
    };

    if frontier {
        let frontier_slots: Vec<SlotId> = unassigned
            .iter()
            .copied()
            .filter(|&id| {
                slots[id]
                    .crossings
                    .iter()
                    .flatten()
                    .any(|crossing| assigned[crossing.other_slot_id])
            })
            .collect();
        if !frontier_slots.is_empty() {
            return pick(&frontier_slots);
        }
    }

    pick(&unassigned)
}

fn lcv_score(
    slot: &Slot,
    word: &str,
    grid: &Grid,
    slots: &[Slot],
    index: &PatternIndex,
    assigned: &[bool],
) -> usize {
    let word_bytes = word.as_bytes();

    slot.crossings
        .iter()
        .enumerate()
        .filter_map(|(pos, crossing)| crossing.map(|c| (pos, c)))
        .filter(|&(_, crossing)| !assigned[crossing.other_slot_id])
        .map(|(pos, crossing)| {
            let other = &slots[crossing.other_slot_id];
            let mut pattern: Vec<char> =
                pattern_for_slot(grid, other, index.unknown()).chars().collect();
            pattern[crossing.other_cell] = word_bytes[pos] as char;
            let projected: String = pattern.into_iter().collect();
            index.count_for_pattern(other.length, &projected, LCV_NEIGHBOR_CAP)
        })
        .sum()
}

/// Order a slot's candidates for the search. Depth 0 is plain alphabetical;
/// depth 1 scores each candidate by the capped number of options every
/// unassigned crossing neighbor would retain and tries the least constraining
/// first, ties alphabetical. Deeper lookahead is not supported and behaves
/// like depth 1.
#[must_use]
pub fn order_candidates(
    slot: &Slot,
    domain: &[WordId],
    grid: &Grid,
    slots: &[Slot],
    index: &PatternIndex,
    assigned: &[bool],
    lcv_depth: u8,
) -> Vec<WordId> {
    let mut ids: Vec<WordId> = domain.to_vec();

    if lcv_depth == 0 {
        ids.sort_by(|&a, &b| index.word((slot.length, a)).cmp(index.word((slot.length, b))));
        return ids;
    }

    let scores: HashMap<WordId, usize> = ids
        .iter()
        .map(|&id| {
            let word = index.word((slot.length, id));
            (id, lcv_score(slot, word, grid, slots, index, assigned))
        })
        .collect();

    ids.sort_by(|&a, &b| {
        scores[&b]
            .cmp(&scores[&a])
            .then_with(|| index.word((slot.length, a)).cmp(index.word((slot.length, b))))
    });
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::UsedWords;
    use crate::grid::GridCharset;
    use crate::pool::Pool;
    use crate::slot::build_slots;

    fn grid_from(strs: &[&str]) -> Grid {
        let rows: Vec<String> = strs.iter().map(|s| (*s).to_string()).collect();
        Grid::from_rows(&rows, &GridCharset::default()).unwrap()
    }

    fn index_of(words: &[&str]) -> PatternIndex {
        let mut pool = Pool::new();
        pool.add_words(words.iter().copied(), 9);
        PatternIndex::build(&pool, '_')
    }

    #[test]
    fn test_mrv_prefers_smallest_domain() {
        let grid = grid_from(&["C__", "___", "___"]);
        let index = index_of(&["CAT", "COT", "DOG", "ACT", "TAC", "OAT", "GOT", "TOT"]);
        let slots = build_slots(&grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(&grid, &slots, &index, &used);
        let assigned = vec![false; slots.len()];

        let picked = select_slot(&slots, &domains, &assigned, &default_tie_breaks(), false)
            .expect("slots available");

        // The two slots constrained by the fixed C have the smallest domains.
        let smallest = domains.domain(picked).len();
        for slot in &slots {
            assert!(domains.domain(slot.id).len() >= smallest);
        }
        assert!(slots[picked].cells.contains(&(0, 0)));
    }

    #[test]
    fn test_mrv_tie_breaks_are_deterministic() {
        let grid = grid_from(&["___", "___", "___"]);
        let index = index_of(&["CAT", "COT", "DOG"]);
        let slots = build_slots(&grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(&grid, &slots, &index, &used);
        let assigned = vec![false; slots.len()];

        // All domains and crossing counts are equal, so the alpha tie-break
        // decides: "0,0,across,3" sorts first.
        let picked =
            select_slot(&slots, &domains, &assigned, &default_tie_breaks(), false).unwrap();
        assert_eq!(slots[picked].key(), "0,0,across,3");

        // Selection is stable across repeated calls.
        let again =
            select_slot(&slots, &domains, &assigned, &default_tie_breaks(), false).unwrap();
        assert_eq!(picked, again);
    }

    #[test]
    fn test_frontier_restricts_to_crossing_slots() {
        let grid = grid_from(&["___", "___", "___"]);
        let index = index_of(&["CAT", "COT", "DOG"]);
        let slots = build_slots(&grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(&grid, &slots, &index, &used);

        let across0 = slots.iter().find(|s| s.key() == "0,0,across,3").unwrap();
        let mut assigned = vec![false; slots.len()];
        assigned[across0.id] = true;

        let picked = select_slot(&slots, &domains, &assigned, &default_tie_breaks(), true)
            .expect("frontier nonempty");
        assert!(slots[picked]
            .crossings
            .iter()
            .flatten()
            .any(|c| c.other_slot_id == across0.id));

        // With nothing assigned, the frontier is empty and selection falls
        // back to all unassigned slots.
        let unassigned = vec![false; slots.len()];
        assert!(select_slot(&slots, &domains, &unassigned, &default_tie_breaks(), true).is_some());
    }

    #[test]
    fn test_lcv_depth_zero_is_alphabetical() {
        let grid = grid_from(&["___", "___", "___"]);
        let index = index_of(&["TAC", "CAT", "ACT"]);
        let slots = build_slots(&grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(&grid, &slots, &index, &used);
        let assigned = vec![false; slots.len()];

        let slot = &slots[0];
        let ordered = order_candidates(
            slot,
            domains.domain(slot.id),
            &grid,
            &slots,
            &index,
            &assigned,
            0,
        );
        let words: Vec<&str> = ordered.iter().map(|&id| index.word((3, id))).collect();
        assert_eq!(words, ["ACT", "CAT", "TAC"]);
    }

    #[test]
    fn test_lcv_prefers_less_constraining_candidate() {
        // Across candidates CAT and CUT share C and T, so only the middle
        // letter differentiates them: the A-column has two continuations, the
        // U-column none.
        let grid = grid_from(&["___", "___", "___"]);
        let index = index_of(&["CAT", "CUT", "ACT", "ATE", "TEA", "CAB", "TAB", "BAT"]);
        let slots = build_slots(&grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(&grid, &slots, &index, &used);
        let assigned = vec![false; slots.len()];

        let across0 = slots.iter().find(|s| s.key() == "0,0,across,3").unwrap();
        let ordered = order_candidates(
            across0,
            domains.domain(across0.id),
            &grid,
            &slots,
            &index,
            &assigned,
            1,
        );
        let words: Vec<&str> = ordered.iter().map(|&id| index.word((3, id))).collect();

        let cat_pos = words.iter().position(|&w| w == "CAT").unwrap();
        let cut_pos = words.iter().position(|&w| w == "CUT").unwrap();
        assert!(cat_pos < cut_pos, "ordering was {words:?}");
    }
}
