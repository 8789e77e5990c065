//! Slot extraction: scan the grid for maximal runs of open cells in each
//! direction and derive the crossing structure that ties Across and Down
//! entries together.

use smallvec::SmallVec;
use std::collections::HashMap;

use crate::grid::{Direction, Grid};
use crate::types::{GridCoord, SlotId};
use crate::MAX_SLOT_LENGTH;

/// A crossing between one slot and another, referencing the other slot's id
/// and the location of the shared cell within the other slot. The location of
/// the shared cell within *this* slot is the index into the `crossings` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_cell: usize,
}

/// A maximal run of open cells in one direction, with its crossings.
#[derive(Debug, Clone)]
pub struct Slot {
    pub id: SlotId,
    pub direction: Direction,
    pub start: GridCoord,
    pub length: usize,
    pub cells: Vec<GridCoord>,
    pub crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>,
}

impl Slot {
    /// A stable string key like "2,0,across,5", derived from the start
    /// coordinate, direction, and length.
    #[must_use]
    pub fn key(&self) -> String {
        format!(
            "{},{},{},{}",
            self.start.0,
            self.start.1,
            self.direction.as_str(),
            self.length,
        )
    }

    /// Parse a key produced by `key` back into (start, direction, length).
    pub fn parse_key(key: &str) -> Result<(GridCoord, Direction, usize), String> {
        let parts: Vec<&str> = key.split(',').collect();
        if parts.len() != 4 {
            return Err(format!("invalid slot key: {key}"));
        }

        let r: Result<usize, _> = parts[0].parse();
        let c: Result<usize, _> = parts[1].parse();
        let direction = match parts[2] {
            "across" => Some(Direction::Across),
            "down" => Some(Direction::Down),
            _ => None,
        };
        let length: Result<usize, _> = parts[3].parse();

        if let (Ok(r), Ok(c), Some(direction), Ok(length)) = (r, c, direction, length) {
            Ok(((r, c), direction, length))
        } else {
            Err(format!("invalid slot key: {key:?}"))
        }
    }

    /// How many of this slot's cells are shared with another slot?
    #[must_use]
    pub fn crossing_count(&self) -> usize {
        self.crossings.iter().flatten().count()
    }
}

/// Scan the grid and build every Across and Down slot of at least
/// `min_entry_len` cells, with crossings resolved on both sides.
#[must_use]
pub fn build_slots(grid: &Grid, min_entry_len: usize) -> Vec<Slot> {
    let runs = grid
        .horizontal_runs()
        .into_iter()
        .chain(grid.vertical_runs())
        .filter(|run| run.len >= min_entry_len);

    let mut slots: Vec<Slot> = runs
        .enumerate()
        .map(|(id, run)| {
            let cells: Vec<GridCoord> = (0..run.len).map(|offset| run.cell_at(offset)).collect();
            Slot {
                id,
                direction: run.dir,
                start: run.start,
                length: run.len,
                cells,
                crossings: SmallVec::new(),
            }
        })
        .collect();

    // Build a map from cell location to the slots passing through it, which we
    // can then use to resolve crossings. Each cell is touched by at most one
    // slot per direction.
    let mut slots_by_cell: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();
    for slot in &slots {
        for (cell_idx, &loc) in slot.cells.iter().enumerate() {
            slots_by_cell.entry(loc).or_default().push((slot.id, cell_idx));
        }
    }

    for idx in 0..slots.len() {
        let id = slots[idx].id;
        let crossings: SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]> = slots[idx]
            .cells
            .iter()
            .map(|loc| {
                slots_by_cell[loc]
                    .iter()
                    .find(|&&(other_id, _)| other_id != id)
                    .map(|&(other_id, other_cell)| Crossing {
                        other_slot_id: other_id,
                        other_cell,
                    })
            })
            .collect();
        slots[idx].crossings = crossings;
    }

    slots
}

/// The `by_id` view: slot keys mapped back to slot ids.
#[must_use]
pub fn slot_key_map(slots: &[Slot]) -> HashMap<String, SlotId> {
    slots.iter().map(|slot| (slot.key(), slot.id)).collect()
}
