//! Upper-layer orchestration: generate a layout, try to fill it, escalate
//! with rescue block pairs when the search keeps dead-ending, and fall back
//! to a fresh layout seed when that doesn't help either.

use log::{debug, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;

use crate::config::DifficultyConfig;
use crate::grid::GridCharset;
use crate::hydrate::Hydrator;
use crate::index::PatternIndex;
use crate::layout::{add_rescue_block_pair, generate_layout};
use crate::pool::Pool;
use crate::solver::{solve, FailureReason, SolveFailure, SolveOptions, SolveSuccess};
use crate::MIN_ENTRY_LEN;

/// How many fresh layouts to try before giving up.
pub const DEFAULT_LAYOUT_ATTEMPTS: usize = 16;

/// Knobs for a full generate-and-fill run.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub attempts: usize,
    pub min_entry_len: usize,
    pub charset: GridCharset,
}

impl Default for PlanOptions {
    fn default() -> Self {
        PlanOptions {
            attempts: DEFAULT_LAYOUT_ATTEMPTS,
            min_entry_len: MIN_ENTRY_LEN,
            charset: GridCharset::default(),
        }
    }
}

/// Why a full generate-and-fill run came up empty.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("no valid layout produced in {0} attempt(s)")]
    LayoutInfeasible(usize),

    #[error("no fill found in {} attempt(s) (last failure: {})", .attempts, .last.reason)]
    Unfilled { attempts: usize, last: SolveFailure },
}

/// Is this failure the kind that more blocks might fix? Budget exhaustion is
/// not: a rescue pair would just burn the remaining budget faster.
fn rescueable(reason: FailureReason) -> bool {
    matches!(
        reason,
        FailureReason::NoSelectableSlot
            | FailureReason::ExhaustedAllCandidates
            | FailureReason::DeadEndNoMoreChoices
            | FailureReason::UnsatisfiableInitialDomains
    )
}

/// Generate a symmetric layout and fill it. Each attempt derives its own RNG
/// stream from `seed`, so a full run is reproducible.
pub fn generate_puzzle(
    n: usize,
    pool: &mut Pool,
    difficulty: &DifficultyConfig,
    seed: u64,
    opts: &PlanOptions,
    mut hydrator: Option<&mut Hydrator>,
) -> Result<SolveSuccess, PlanError> {
    let mut last_failure: Option<SolveFailure> = None;

    for attempt in 0..opts.attempts {
        let attempt_seed = seed.wrapping_add(attempt as u64);
        let mut rng = SmallRng::seed_from_u64(attempt_seed);

        let mut grid =
            match generate_layout(n, difficulty.block_budget, opts.min_entry_len, &mut rng) {
                Ok(grid) => grid,
                Err(err) => {
                    debug!("layout attempt {attempt} failed: {err}");
                    continue;
                }
            };

        let mut rescues = 0;
        loop {
            let mut index = PatternIndex::build(pool, opts.charset.unknown);
            let solve_opts = SolveOptions {
                seed: attempt_seed,
                min_entry_len: opts.min_entry_len,
            };
            match solve(
                &grid,
                pool,
                &mut index,
                difficulty,
                &solve_opts,
                hydrator.as_deref_mut(),
            ) {
                Ok(success) => {
                    info!(
                        "filled {n}x{n} grid on attempt {attempt} after {} rescue pair(s)",
                        rescues
                    );
                    return Ok(success);
                }
                Err(failure) => {
                    let escalate = rescueable(failure.reason)
                        && difficulty.allow_rescue_blocks
                        && rescues < difficulty.max_rescue_pairs
                        && add_rescue_block_pair(&mut grid, opts.min_entry_len, &mut rng);
                    last_failure = Some(failure);
                    if escalate {
                        rescues += 1;
                        debug!("added rescue block pair {rescues}, retrying fill");
                        continue;
                    }
                    break;
                }
            }
        }
    }

    match last_failure {
        Some(last) => Err(PlanError::Unfilled {
            attempts: opts.attempts,
            last,
        }),
        None => Err(PlanError::LayoutInfeasible(opts.attempts)),
    }
}
