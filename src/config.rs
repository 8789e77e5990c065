//! Difficulty configuration: a base profile plus per-level overrides. Levels
//! run 1 (most open) through 7 (most constrained); resolving an unknown level
//! falls back to `DEFAULT_LEVEL` rather than scanning for a neighbor.

use serde::{Deserialize, Serialize};

use crate::heuristics::{default_tie_breaks, TieBreak};
use crate::layout::BlockBudget;

/// The level used when a requested level has no entry.
pub const DEFAULT_LEVEL: u8 = 4;

/// All the knobs a difficulty level can turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyConfig {
    /// Target range for the layout generator's block count.
    pub block_budget: BlockBudget,
    /// Solver wall-clock cap.
    pub timeout_ms: u64,
    /// Solver logical-step cap.
    pub max_backtracks: usize,
    /// Candidate-ordering lookahead (0 = alphabetical, 1 = one-step LCV;
    /// deeper values behave like 1).
    pub lcv_depth: u8,
    /// MRV tie-breakers, applied in order.
    pub tie_break: Vec<TieBreak>,
    /// Shuffle candidates after LCV ordering.
    pub shuffle_candidates: bool,
    /// Restrict MRV to slots crossing the assigned region when possible.
    pub frontier_mrv: bool,
    /// Hydrate a slot whose domain falls below this size.
    pub hydrate_if_below: usize,
    /// Maximum results per hydration call.
    pub onelook_max: usize,
    /// May the planner add block pairs after repeated dead ends?
    pub allow_rescue_blocks: bool,
    /// How many rescue pairs the planner may add per layout.
    pub max_rescue_pairs: usize,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        DifficultyConfig {
            block_budget: BlockBudget { min: 18, max: 24 },
            timeout_ms: 15_000,
            max_backtracks: 8_000,
            lcv_depth: 1,
            tie_break: default_tie_breaks(),
            shuffle_candidates: false,
            frontier_mrv: false,
            hydrate_if_below: 3,
            onelook_max: 50,
            allow_rescue_blocks: true,
            max_rescue_pairs: 2,
        }
    }
}

/// A sparse override merged over the base config, as levels (or external
/// config files) express their deltas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifficultyOverride {
    pub block_budget: Option<BlockBudget>,
    pub timeout_ms: Option<u64>,
    pub max_backtracks: Option<usize>,
    pub lcv_depth: Option<u8>,
    pub tie_break: Option<Vec<TieBreak>>,
    pub shuffle_candidates: Option<bool>,
    pub frontier_mrv: Option<bool>,
    pub hydrate_if_below: Option<usize>,
    pub onelook_max: Option<usize>,
    pub allow_rescue_blocks: Option<bool>,
    pub max_rescue_pairs: Option<usize>,
}

impl DifficultyOverride {
    /// Merge this override over a base config.
    #[must_use]
    pub fn apply(&self, base: &DifficultyConfig) -> DifficultyConfig {
        DifficultyConfig {
            block_budget: self.block_budget.unwrap_or(base.block_budget),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            max_backtracks: self.max_backtracks.unwrap_or(base.max_backtracks),
            lcv_depth: self.lcv_depth.unwrap_or(base.lcv_depth),
            tie_break: self.tie_break.clone().unwrap_or_else(|| base.tie_break.clone()),
            shuffle_candidates: self.shuffle_candidates.unwrap_or(base.shuffle_candidates),
            frontier_mrv: self.frontier_mrv.unwrap_or(base.frontier_mrv),
            hydrate_if_below: self.hydrate_if_below.unwrap_or(base.hydrate_if_below),
            onelook_max: self.onelook_max.unwrap_or(base.onelook_max),
            allow_rescue_blocks: self.allow_rescue_blocks.unwrap_or(base.allow_rescue_blocks),
            max_rescue_pairs: self.max_rescue_pairs.unwrap_or(base.max_rescue_pairs),
        }
    }
}

fn level_override(level: u8) -> Option<DifficultyOverride> {
    let over = match level {
        1 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 24, max: 30 }),
            timeout_ms: Some(8_000),
            max_backtracks: Some(3_000),
            lcv_depth: Some(0),
            shuffle_candidates: Some(true),
            hydrate_if_below: Some(2),
            ..DifficultyOverride::default()
        },
        2 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 22, max: 28 }),
            timeout_ms: Some(10_000),
            max_backtracks: Some(4_000),
            lcv_depth: Some(0),
            ..DifficultyOverride::default()
        },
        3 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 20, max: 26 }),
            timeout_ms: Some(12_000),
            max_backtracks: Some(6_000),
            ..DifficultyOverride::default()
        },
        4 => DifficultyOverride::default(),
        5 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 16, max: 20 }),
            timeout_ms: Some(20_000),
            max_backtracks: Some(12_000),
            frontier_mrv: Some(true),
            ..DifficultyOverride::default()
        },
        6 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 14, max: 18 }),
            timeout_ms: Some(25_000),
            max_backtracks: Some(16_000),
            frontier_mrv: Some(true),
            hydrate_if_below: Some(5),
            ..DifficultyOverride::default()
        },
        7 => DifficultyOverride {
            block_budget: Some(BlockBudget { min: 12, max: 16 }),
            timeout_ms: Some(30_000),
            max_backtracks: Some(24_000),
            frontier_mrv: Some(true),
            hydrate_if_below: Some(6),
            onelook_max: Some(80),
            ..DifficultyOverride::default()
        },
        _ => return None,
    };
    Some(over)
}

impl DifficultyConfig {
    /// Resolve a difficulty level: exact level when it exists, otherwise
    /// `DEFAULT_LEVEL`.
    #[must_use]
    pub fn for_level(level: u8) -> DifficultyConfig {
        let base = DifficultyConfig::default();
        let over = level_override(level)
            .or_else(|| level_override(DEFAULT_LEVEL))
            .unwrap_or_default();
        over.apply(&base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_round_trip() {
        assert_eq!(DifficultyConfig::for_level(4), DifficultyConfig::default());
    }

    #[test]
    fn test_unknown_level_falls_back_to_default() {
        assert_eq!(DifficultyConfig::for_level(0), DifficultyConfig::for_level(DEFAULT_LEVEL));
        assert_eq!(DifficultyConfig::for_level(99), DifficultyConfig::default());
    }

    #[test]
    fn test_levels_tighten_block_budget() {
        let easy = DifficultyConfig::for_level(1);
        let hard = DifficultyConfig::for_level(7);
        assert!(easy.block_budget.min > hard.block_budget.min);
        assert!(easy.timeout_ms < hard.timeout_ms);
        assert_eq!(easy.lcv_depth, 0);
        assert_eq!(hard.lcv_depth, 1);
    }

    #[test]
    fn test_override_merge_keeps_unset_fields() {
        let base = DifficultyConfig::default();
        let over = DifficultyOverride {
            timeout_ms: Some(1),
            ..DifficultyOverride::default()
        };
        let merged = over.apply(&base);
        assert_eq!(merged.timeout_ms, 1);
        assert_eq!(merged.block_budget, base.block_budget);
        assert_eq!(merged.tie_break, base.tie_break);
    }

    #[test]
    fn test_config_deserializes_from_json() {
        let json = r#"{
            "blockBudget": { "min": 10, "max": 14 },
            "timeoutMs": 500,
            "tieBreak": ["lenDesc", "alphaAsc"]
        }"#;
        let over: DifficultyOverride = serde_json::from_str(json).unwrap();
        let merged = over.apply(&DifficultyConfig::default());
        assert_eq!(merged.block_budget, BlockBudget { min: 10, max: 14 });
        assert_eq!(merged.timeout_ms, 500);
        assert_eq!(merged.tie_break, vec![TieBreak::LenDesc, TieBreak::AlphaAsc]);
    }
}
