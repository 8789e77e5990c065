//! Symmetric block-layout generation. The generator repeatedly splits the
//! longest open run near its center with a symmetric block pair until the
//! block count reaches a target inside the configured budget, then validates
//! the result.

use log::debug;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::errors::LayoutError;
use crate::grid::{Grid, Run};

/// Target range for the number of blocks in a generated layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBudget {
    pub min: usize,
    pub max: usize,
}

/// Runs long enough that a single block can split them into two legal entries.
fn splittable_runs(grid: &Grid, min_entry_len: usize) -> Vec<Run> {
    let mut runs = grid.horizontal_runs();
    runs.extend(grid.vertical_runs());
    runs.retain(|run| run.len >= 2 * min_entry_len + 1);
    runs
}

/// Candidate split offsets for a run, centers first and alternating outward.
/// The order between the two equidistant neighbors at each distance is
/// randomized.
fn split_order(len: usize, min_entry_len: usize, rng: &mut SmallRng) -> Vec<usize> {
    let lo = min_entry_len;
    let hi = len - min_entry_len - 1;
    let mid = (lo + hi) / 2;

    let mut order = vec![mid];
    for offset in 1.. {
        let left = mid.checked_sub(offset).filter(|&i| i >= lo);
        let right = Some(mid + offset).filter(|&i| i <= hi);
        match (left, right) {
            (Some(left), Some(right)) => {
                if rng.gen_bool(0.5) {
                    order.push(left);
                    order.push(right);
                } else {
                    order.push(right);
                    order.push(left);
                }
            }
            (Some(only), None) | (None, Some(only)) => order.push(only),
            (None, None) => break,
        }
    }
    order
}

/// One center-split iteration: pick the longest splittable run (ties
/// shuffled), walk its split offsets, and commit the first symmetric block
/// placement that keeps the grid legal. Returns false when no placement
/// anywhere is possible.
fn try_split_once(grid: &mut Grid, min_entry_len: usize, rng: &mut SmallRng) -> bool {
    let mut runs = splittable_runs(grid, min_entry_len);
    if runs.is_empty() {
        return false;
    }
    runs.shuffle(rng);
    runs.sort_by_key(|run| Reverse(run.len));

    for run in runs {
        for offset in split_order(run.len, min_entry_len, rng) {
            let (r, c) = run.cell_at(offset);
            if grid.place_block_symmetric(r, c, min_entry_len, false).is_ok() {
                return true;
            }
        }
    }
    false
}

/// Produce a grid satisfying all structural invariants with a block count in
/// the budget. The target count is the budget midpoint rounded up to an even
/// number, since blocks land in symmetric pairs.
pub fn generate_layout(
    n: usize,
    budget: BlockBudget,
    min_entry_len: usize,
    rng: &mut SmallRng,
) -> Result<Grid, LayoutError> {
    let mut grid = Grid::empty(n);

    let mut target = (budget.min + budget.max) / 2;
    target += target % 2;
    let target = target.min(budget.max);

    while grid.block_count() < target {
        if !try_split_once(&mut grid, min_entry_len, rng) {
            debug!(
                "layout stopped early at {} of {target} blocks",
                grid.block_count()
            );
            break;
        }
    }

    let placed = grid.block_count();
    if placed >= budget.min && placed <= budget.max && grid.validate(min_entry_len) {
        Ok(grid)
    } else {
        Err(LayoutError::Stalled {
            placed,
            min: budget.min,
            max: budget.max,
        })
    }
}

/// Add one more symmetric block pair to an existing grid, using the same
/// center-split move. Used to tighten a grid that keeps dead-ending during
/// fill. Returns false if no legal placement exists.
pub fn add_rescue_block_pair(grid: &mut Grid, min_entry_len: usize, rng: &mut SmallRng) -> bool {
    try_split_once(grid, min_entry_len, rng)
}
