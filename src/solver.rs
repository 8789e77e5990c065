//! The backtracking fill engine: an explicit frame stack drives MRV slot
//! selection, LCV-ordered candidate attempts, and forward-checking placements
//! that can be undone exactly. Budgets (wall clock and backtrack count) are
//! checked at the top of every loop iteration, and both success and failure
//! come back in the same envelope shape with aggregate statistics attached.

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::DifficultyConfig;
use crate::domains::{pattern_for_slot, DomainSet, DomainSnapshot, UsedWords};
use crate::grid::{Cell, Grid};
use crate::heuristics::{order_candidates, select_slot};
use crate::hydrate::Hydrator;
use crate::index::PatternIndex;
use crate::pool::Pool;
use crate::slot::{build_slots, Slot};
use crate::types::{GlobalWordId, SlotId, WordId};
use crate::MIN_ENTRY_LEN;

/// Aggregate counters for one solve run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub steps: usize,
    pub backtracks: usize,
    pub max_depth: usize,
    pub duration_ms: u64,
}

/// Why a solve run stopped without a complete fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    BacktrackLimit,
    NoSlots,
    NoSelectableSlot,
    ExhaustedAllCandidates,
    DeadEndNoMoreChoices,
    UnsatisfiableInitialDomains,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureReason::Timeout => "timeout",
            FailureReason::BacktrackLimit => "backtrack_limit",
            FailureReason::NoSlots => "no_slots",
            FailureReason::NoSelectableSlot => "no_selectable_slot",
            FailureReason::ExhaustedAllCandidates => "exhausted_all_candidates",
            FailureReason::DeadEndNoMoreChoices => "dead_end_no_more_choices",
            FailureReason::UnsatisfiableInitialDomains => "unsatisfiable_initial_domains",
        };
        write!(f, "{s}")
    }
}

/// Context attached to a failure envelope.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetails {
    /// The slot the solver was working on when it stopped.
    pub last_slot: Option<String>,
    /// How many slots were assigned at stop.
    pub assigned: usize,
    /// For initial-domain starvation, the keys of the starved slots.
    pub empties: Vec<String>,
}

/// One slot's final answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub slot: String,
    pub word: String,
}

/// A completed fill.
#[derive(Debug, Clone)]
pub struct SolveSuccess {
    pub grid: Grid,
    pub assignments: Vec<Assignment>,
    pub stats: Statistics,
}

/// A structured failure; shaped like `SolveSuccess` minus the assignments.
#[derive(Debug, Clone)]
pub struct SolveFailure {
    pub reason: FailureReason,
    pub details: FailureDetails,
    pub stats: Statistics,
}

/// Knobs independent of difficulty.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub seed: u64,
    pub min_entry_len: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            seed: 0,
            min_entry_len: MIN_ENTRY_LEN,
        }
    }
}

/// One recorded grid-cell write: (row, col, previous, new).
type CellChange = (usize, usize, Cell, Cell);

/// Everything needed to revert one placement exactly.
struct PlacementRecord {
    cell_changes: Vec<CellChange>,
    domains_snapshot: DomainSnapshot,
    word: GlobalWordId,
}

/// One node on the search stack.
struct Frame {
    slot_id: SlotId,
    candidates: Vec<WordId>,
    next_idx: usize,
    record: Option<PlacementRecord>,
    exhausted: bool,
}

struct Filler<'a> {
    grid: Grid,
    slots: Vec<Slot>,
    domains: DomainSet,
    used: UsedWords,
    assigned: Vec<bool>,
    chosen: Vec<Option<WordId>>,
    assigned_count: usize,
    frames: Vec<Frame>,
    stats: Statistics,
    rng: SmallRng,
    pool: &'a mut Pool,
    index: &'a mut PatternIndex,
    difficulty: &'a DifficultyConfig,
    hydrator: Option<&'a mut Hydrator>,
    last_slot: Option<SlotId>,
}

/// Fill the given grid. On success the returned grid carries every placed
/// letter and `assignments` maps each slot key to its word; on failure the
/// envelope carries the reason, context, and the same statistics.
pub fn solve(
    grid: &Grid,
    pool: &mut Pool,
    index: &mut PatternIndex,
    difficulty: &DifficultyConfig,
    opts: &SolveOptions,
    hydrator: Option<&mut Hydrator>,
) -> Result<SolveSuccess, SolveFailure> {
    let start = Instant::now();
    let slots = build_slots(grid, opts.min_entry_len);

    if slots.is_empty() {
        return Err(SolveFailure {
            reason: FailureReason::NoSlots,
            details: FailureDetails::default(),
            stats: Statistics::default(),
        });
    }

    let used = UsedWords::new();
    let domains = DomainSet::init(grid, &slots, index, &used);
    let slot_count = slots.len();

    let mut filler = Filler {
        grid: grid.clone(),
        slots,
        domains,
        used,
        assigned: vec![false; slot_count],
        chosen: vec![None; slot_count],
        assigned_count: 0,
        frames: vec![],
        stats: Statistics::default(),
        rng: SmallRng::seed_from_u64(opts.seed),
        pool,
        index,
        difficulty,
        hydrator,
        last_slot: None,
    };

    // Initial-domain starvation gets one hydration pass before it's fatal.
    let empties: Vec<SlotId> = (0..slot_count)
        .filter(|&id| filler.domains.domain(id).is_empty())
        .collect();
    if !empties.is_empty() {
        for &slot_id in &empties {
            filler.hydrate(slot_id);
        }
        let still_empty: Vec<String> = empties
            .iter()
            .filter(|&&id| filler.domains.domain(id).is_empty())
            .map(|&id| filler.slots[id].key())
            .collect();
        if !still_empty.is_empty() {
            return Err(filler.failure(
                FailureReason::UnsatisfiableInitialDomains,
                still_empty,
                start,
            ));
        }
    }

    filler.run(start)
}

impl<'a> Filler<'a> {
    fn run(mut self, start: Instant) -> Result<SolveSuccess, SolveFailure> {
        let timeout = Duration::from_millis(self.difficulty.timeout_ms);

        loop {
            if self.assigned_count == self.slots.len() {
                return Ok(self.success(start));
            }

            self.stats.steps += 1;
            if start.elapsed() >= timeout {
                return Err(self.failure(FailureReason::Timeout, vec![], start));
            }
            if self.stats.backtracks > self.difficulty.max_backtracks {
                return Err(self.failure(FailureReason::BacktrackLimit, vec![], start));
            }

            // Dead-domain rescue: a starved unassigned slot gets one forced
            // hydration; if that doesn't revive it, give back one choice.
            let dead = (0..self.slots.len())
                .find(|&id| !self.assigned[id] && self.domains.domain(id).is_empty());
            if let Some(dead) = dead {
                self.hydrate(dead);
                if self.domains.domain(dead).is_empty() {
                    self.last_slot = Some(dead);
                    if !self.backtrack_step() {
                        return Err(self.failure(
                            FailureReason::DeadEndNoMoreChoices,
                            vec![],
                            start,
                        ));
                    }
                }
                continue;
            }

            // Frame acquisition: when the top frame committed (or there is no
            // frame), select the next slot and open a new frame for it.
            let need_frame = self
                .frames
                .last()
                .map_or(true, |frame| frame.record.is_some());
            if need_frame {
                let selected = select_slot(
                    &self.slots,
                    &self.domains,
                    &self.assigned,
                    &self.difficulty.tie_break,
                    self.difficulty.frontier_mrv,
                );
                let Some(slot_id) = selected else {
                    if !self.backtrack_step() {
                        return Err(self.failure(FailureReason::NoSelectableSlot, vec![], start));
                    }
                    continue;
                };
                self.last_slot = Some(slot_id);

                let wants_hydration = self
                    .hydrator
                    .as_ref()
                    .map_or(false, |h| h.should_hydrate(self.domains.domain(slot_id).len()));
                if wants_hydration {
                    self.hydrate(slot_id);
                }

                let mut candidates = order_candidates(
                    &self.slots[slot_id],
                    self.domains.domain(slot_id),
                    &self.grid,
                    &self.slots,
                    self.index,
                    &self.assigned,
                    self.difficulty.lcv_depth,
                );
                if self.difficulty.shuffle_candidates {
                    candidates.shuffle(&mut self.rng);
                }
                debug!(
                    "opening frame for {} with {} candidate(s)",
                    self.slots[slot_id].key(),
                    candidates.len()
                );
                self.frames.push(Frame {
                    slot_id,
                    candidates,
                    next_idx: 0,
                    record: None,
                    exhausted: false,
                });
            }

            // Candidate attempt on the seeking top frame.
            let frame_idx = self.frames.len() - 1;
            let slot_id = self.frames[frame_idx].slot_id;
            self.last_slot = Some(slot_id);

            if self.frames[frame_idx].next_idx >= self.frames[frame_idx].candidates.len() {
                let pattern =
                    pattern_for_slot(&self.grid, &self.slots[slot_id], self.index.unknown());
                if let Some(h) = self.hydrator.as_deref_mut() {
                    h.record_nogood(slot_id, pattern);
                }
                self.frames[frame_idx].exhausted = true;
                if !self.backtrack_step() {
                    return Err(self.failure(FailureReason::ExhaustedAllCandidates, vec![], start));
                }
                continue;
            }

            let next_idx = self.frames[frame_idx].next_idx;
            let word_id = self.frames[frame_idx].candidates[next_idx];
            self.frames[frame_idx].next_idx += 1;

            // Placement with forward checking; on success, commit.
            if let Some(record) = self.try_place(slot_id, word_id) {
                self.frames[frame_idx].record = Some(record);
                self.assigned[slot_id] = true;
                self.chosen[slot_id] = Some(word_id);
                self.assigned_count += 1;
                self.stats.max_depth = self.stats.max_depth.max(self.assigned_count);
            }
        }
    }

    /// Place a word into a slot and propagate: snapshot the domains, write
    /// the letters, claim the word, enforce global uniqueness, and forward
    /// check every crossing neighbor. Any violation undoes everything and
    /// returns None.
    fn try_place(&mut self, slot_id: SlotId, word_id: WordId) -> Option<PlacementRecord> {
        let snapshot = self.domains.snapshot();
        let length = self.slots[slot_id].length;
        let word = self.index.word((length, word_id)).to_string();
        let cells = self.slots[slot_id].cells.clone();

        let mut cell_changes: Vec<CellChange> = vec![];
        for (pos, &(r, c)) in cells.iter().enumerate() {
            let ch = word.as_bytes()[pos] as char;
            match self.grid.cell(r, c) {
                Cell::Letter(existing) if existing == ch => {}
                Cell::Empty => {
                    self.grid.set_cell_raw(r, c, Cell::Letter(ch));
                    cell_changes.push((r, c, Cell::Empty, Cell::Letter(ch)));
                }
                _ => {
                    for &(rr, cc, prev, _) in cell_changes.iter().rev() {
                        self.grid.set_cell_raw(rr, cc, prev);
                    }
                    return None;
                }
            }
        }

        let gid: GlobalWordId = (length, word_id);
        self.used.insert(gid);
        self.domains.remove_word_from_all_domains(&self.slots, gid);
        let (emptied, _affected) = self.domains.recompute_after_placement(
            &self.grid,
            &self.slots,
            self.index,
            &self.used,
            slot_id,
            &self.assigned,
        );

        if !emptied.is_empty() {
            debug!(
                "placing {word} in {} wipes {} neighbor(s), rejecting",
                self.slots[slot_id].key(),
                emptied.len()
            );
            for &(r, c, prev, _) in cell_changes.iter().rev() {
                self.grid.set_cell_raw(r, c, prev);
            }
            self.domains.restore(snapshot);
            self.used.remove(&gid);
            return None;
        }

        Some(PlacementRecord {
            cell_changes,
            domains_snapshot: snapshot,
            word: gid,
        })
    }

    /// Revert one placement exactly: grid cells, domains, used set, and the
    /// assignment bookkeeping.
    fn undo_record(&mut self, slot_id: SlotId, record: PlacementRecord) {
        for &(r, c, prev, _) in record.cell_changes.iter().rev() {
            self.grid.set_cell_raw(r, c, prev);
        }
        self.domains.restore(record.domains_snapshot);
        self.used.remove(&record.word);
        if self.assigned[slot_id] {
            self.assigned[slot_id] = false;
            self.chosen[slot_id] = None;
            self.assigned_count -= 1;
        }

        #[cfg(feature = "check_invariants")]
        assert!(
            self.domains.domain(slot_id).contains(&record.word.1),
            "restored domain must contain the undone word"
        );
    }

    /// Give back the most recent committed choice: frames above it that never
    /// held a placement are discarded, its placement is undone, and its frame
    /// stays on top so the next candidate gets tried. Returns false only when
    /// the stack unwound to empty.
    fn backtrack_step(&mut self) -> bool {
        loop {
            let Some(top) = self.frames.last_mut() else {
                return false;
            };
            let slot_id = top.slot_id;
            match top.record.take() {
                Some(record) => {
                    self.undo_record(slot_id, record);
                    self.stats.backtracks += 1;
                    return true;
                }
                None => {
                    self.frames.pop();
                }
            }
        }
    }

    fn hydrate(&mut self, slot_id: SlotId) -> bool {
        let Some(h) = self.hydrator.as_deref_mut() else {
            return false;
        };
        h.hydrate_slot(
            &mut self.domains,
            &self.grid,
            &self.slots[slot_id],
            &mut *self.pool,
            &mut *self.index,
            &self.used,
        )
    }

    fn failure(
        &mut self,
        reason: FailureReason,
        empties: Vec<String>,
        start: Instant,
    ) -> SolveFailure {
        self.stats.duration_ms = start.elapsed().as_millis() as u64;
        debug!("fill failed: {reason} with {} slot(s) assigned", self.assigned_count);
        SolveFailure {
            reason,
            details: FailureDetails {
                last_slot: self.last_slot.map(|id| self.slots[id].key()),
                assigned: self.assigned_count,
                empties,
            },
            stats: self.stats.clone(),
        }
    }

    fn success(&mut self, start: Instant) -> SolveSuccess {
        self.stats.duration_ms = start.elapsed().as_millis() as u64;
        let assignments: Vec<Assignment> = self
            .slots
            .iter()
            .filter_map(|slot| {
                self.chosen[slot.id].map(|word_id| Assignment {
                    slot: slot.key(),
                    word: self.index.word((slot.length, word_id)).to_string(),
                })
            })
            .collect();
        debug!(
            "fill complete: {} assignment(s) in {} step(s)",
            assignments.len(),
            self.stats.steps
        );
        SolveSuccess {
            grid: self.grid.clone(),
            assignments,
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridCharset;
    use crate::hydrate::StaticLookup;

    fn grid_from(strs: &[&str]) -> Grid {
        let rows: Vec<String> = strs.iter().map(|s| (*s).to_string()).collect();
        Grid::from_rows(&rows, &GridCharset::default()).unwrap()
    }

    fn pool_of(words: &[&str]) -> Pool {
        let mut pool = Pool::new();
        pool.add_words(words.iter().copied(), 9);
        pool
    }

    fn filler_for<'a>(
        grid: &Grid,
        pool: &'a mut Pool,
        index: &'a mut PatternIndex,
        difficulty: &'a DifficultyConfig,
    ) -> Filler<'a> {
        let slots = build_slots(grid, 3);
        let used = UsedWords::new();
        let domains = DomainSet::init(grid, &slots, index, &used);
        let slot_count = slots.len();
        Filler {
            grid: grid.clone(),
            slots,
            domains,
            used,
            assigned: vec![false; slot_count],
            chosen: vec![None; slot_count],
            assigned_count: 0,
            frames: vec![],
            stats: Statistics::default(),
            rng: SmallRng::seed_from_u64(0),
            pool,
            index,
            difficulty,
            hydrator: None,
            last_slot: None,
        }
    }

    #[test]
    fn test_place_then_undo_restores_state_exactly() {
        let grid = grid_from(&["___", "___", "___"]);
        let mut pool = pool_of(&["CAT", "COT", "ACT", "TAC", "OAT", "ATE", "TEA"]);
        let mut index = PatternIndex::build(&pool, '_');
        let difficulty = DifficultyConfig::default();
        let mut filler = filler_for(&grid, &mut pool, &mut index, &difficulty);

        let before_grid = filler.grid.clone();
        let before_domains = filler.domains.snapshot();
        let before_used = filler.used.clone();

        let slot_id = filler
            .slots
            .iter()
            .find(|s| s.key() == "0,0,across,3")
            .unwrap()
            .id;
        let word_id = filler.index.word_id("CAT").unwrap().1;
        let record = filler.try_place(slot_id, word_id).expect("CAT placeable");
        assert!(filler.used.contains(&(3, word_id)));

        filler.undo_record(slot_id, record);
        assert_eq!(filler.grid, before_grid);
        assert_eq!(filler.domains.snapshot(), before_domains);
        assert_eq!(filler.used, before_used);
    }

    #[test]
    fn test_rejected_placement_leaves_no_trace() {
        // Placing DOG in the top row leaves the middle down slot with the
        // pattern "O__", which nothing matches, so the placement must be
        // rejected with full restore.
        let grid = grid_from(&["___", "___", "___"]);
        let mut pool = pool_of(&["DOG", "DAB", "GOT", "CAT", "ACT", "TAC", "ATE"]);
        let mut index = PatternIndex::build(&pool, '_');
        let difficulty = DifficultyConfig::default();
        let mut filler = filler_for(&grid, &mut pool, &mut index, &difficulty);

        let before_grid = filler.grid.clone();
        let before_domains = filler.domains.snapshot();

        let slot_id = filler
            .slots
            .iter()
            .find(|s| s.key() == "0,0,across,3")
            .unwrap()
            .id;
        let word_id = filler.index.word_id("DOG").unwrap().1;
        assert!(filler.try_place(slot_id, word_id).is_none());

        assert_eq!(filler.grid, before_grid);
        assert_eq!(filler.domains.snapshot(), before_domains);
        assert!(filler.used.is_empty());
    }

    #[test]
    fn test_solve_fills_a_word_square() {
        let grid = grid_from(&["___", "___", "___"]);
        let mut pool = pool_of(&["CAT", "ORE", "WED", "COW", "ARE", "TED"]);
        let mut index = PatternIndex::build(&pool, '_');
        let difficulty = DifficultyConfig::default();

        let success = solve(
            &grid,
            &mut pool,
            &mut index,
            &difficulty,
            &SolveOptions::default(),
            None,
        )
        .expect("square is fillable");

        assert_eq!(success.assignments.len(), 6);

        // No word repeats, and every assignment matches its slot's length.
        let mut words: Vec<&str> = success.assignments.iter().map(|a| a.word.as_str()).collect();
        words.sort_unstable();
        words.dedup();
        assert_eq!(words.len(), 6);

        // The returned grid must agree with the assignments letter by letter.
        let slots = build_slots(&grid, 3);
        for assignment in &success.assignments {
            let slot = slots
                .iter()
                .find(|s| s.key() == assignment.slot)
                .expect("assignment references a real slot");
            assert_eq!(assignment.word.chars().count(), slot.length);
            for (pos, &(r, c)) in slot.cells.iter().enumerate() {
                assert_eq!(
                    success.grid.cell(r, c),
                    Cell::Letter(assignment.word.as_bytes()[pos] as char)
                );
            }
        }
    }

    #[test]
    fn test_solve_reports_no_slots() {
        let grid = grid_from(&["...", "...", "..."]);
        let mut pool = pool_of(&["CAT"]);
        let mut index = PatternIndex::build(&pool, '_');
        let failure = solve(
            &grid,
            &mut pool,
            &mut index,
            &DifficultyConfig::default(),
            &SolveOptions::default(),
            None,
        )
        .unwrap_err();
        assert_eq!(failure.reason, FailureReason::NoSlots);
    }

    #[test]
    fn test_solve_reports_initial_starvation_with_slot_keys() {
        // A 4-letter row with a pool that has no 4-letter words.
        let grid = grid_from(&["____.", ".....", ".....", ".....", "....."]);
        let mut pool = pool_of(&["CAT", "APPLE"]);
        let mut index = PatternIndex::build(&pool, '_');
        let failure = solve(
            &grid,
            &mut pool,
            &mut index,
            &DifficultyConfig::default(),
            &SolveOptions::default(),
            None,
        )
        .unwrap_err();

        assert_eq!(failure.reason, FailureReason::UnsatisfiableInitialDomains);
        assert_eq!(failure.details.empties, vec!["0,0,across,4".to_string()]);
    }

    #[test]
    fn test_initial_starvation_can_be_hydrated_away() {
        let grid = grid_from(&[".....", ".....", "_____", ".....", "....."]);
        let mut pool = Pool::new();
        let mut index = PatternIndex::build(&pool, '_');
        let mut hydrator = Hydrator::new(Box::new(StaticLookup::new(["HELLO"])), 3, 50);

        let success = solve(
            &grid,
            &mut pool,
            &mut index,
            &DifficultyConfig::default(),
            &SolveOptions::default(),
            Some(&mut hydrator),
        )
        .expect("hydration supplies the only word");

        assert_eq!(success.assignments.len(), 1);
        assert_eq!(success.assignments[0].word, "HELLO");
        assert!(pool.contains("HELLO"));
    }

    #[test]
    fn test_global_uniqueness_exhausts_single_word_pool() {
        // Two disjoint across slots but only one 5-letter word: after the
        // first placement claims it, the second slot starves and the search
        // unwinds to an empty stack.
        let grid = grid_from(&["_____", ".....", ".....", ".....", "_____"]);
        let mut pool = pool_of(&["HELLO"]);
        let mut index = PatternIndex::build(&pool, '_');
        let failure = solve(
            &grid,
            &mut pool,
            &mut index,
            &DifficultyConfig::default(),
            &SolveOptions::default(),
            None,
        )
        .unwrap_err();

        assert_eq!(failure.reason, FailureReason::ExhaustedAllCandidates);
        assert_eq!(failure.details.assigned, 0);
        assert!(failure.stats.backtracks > 0);
    }

    #[test]
    fn test_single_slot_single_word() {
        let grid = grid_from(&[".....", ".....", "_____", ".....", "....."]);
        let mut pool = pool_of(&["HELLO"]);
        let mut index = PatternIndex::build(&pool, '_');
        let success = solve(
            &grid,
            &mut pool,
            &mut index,
            &DifficultyConfig::default(),
            &SolveOptions::default(),
            None,
        )
        .expect("single word fits");

        assert_eq!(success.assignments.len(), 1);
        assert_eq!(success.assignments[0].slot, "2,0,across,5");
        assert_eq!(success.assignments[0].word, "HELLO");
        assert_eq!(success.stats.max_depth, 1);
    }
}
