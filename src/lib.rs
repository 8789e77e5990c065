//! Crossword layout generation and constraint-based grid filling.
//!
//! The pipeline runs in two stages: `layout` synthesizes a symmetric block
//! pattern within a block-count budget, and `solver` fills the resulting word
//! slots from a length-bucketed word pool, using MRV slot selection, LCV
//! candidate ordering, and forward-checking propagation with full undo. When a
//! slot's candidate list runs dry, `hydrate` can extend it through an external
//! pattern-lookup provider.

pub mod config;
pub mod domains;
pub mod errors;
pub mod grid;
pub mod heuristics;
pub mod hydrate;
pub mod index;
pub mod layout;
pub mod logging;
pub mod plan;
pub mod pool;
pub mod slot;
pub mod solver;
pub mod types;

pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// The default minimum length for a grid entry.
pub const MIN_ENTRY_LEN: usize = 3;
