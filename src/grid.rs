//! The grid model: cells, symmetric block placement, and the structural
//! invariants every layout must satisfy (180-degree rotational symmetry of the
//! block pattern, a minimum length for every entry, and a single 4-connected
//! component of open cells).
//!
//! Mutating operations either succeed or leave the grid byte-identical to how
//! they found it; a symmetric block placement that would create a short run or
//! split the open cells is rolled back before the error is returned.

use std::collections::VecDeque;

use crate::errors::{ConfigError, GridError};
use crate::pool::is_alphabet_char;
use crate::types::GridCoord;

/// The direction that a slot or run is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Across => "across",
            Direction::Down => "down",
        }
    }
}

/// One square of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// An opaque square that no entry passes through.
    Block,
    /// An open square still waiting for a letter.
    Empty,
    /// An open square holding a fixed character from the grid alphabet.
    Letter(char),
}

impl Cell {
    #[must_use]
    pub fn is_block(self) -> bool {
        matches!(self, Cell::Block)
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        !self.is_block()
    }
}

/// Characters used when rendering a grid to strings or parsing one back.
///
/// Note that the default unknown char `_` is itself a member of the grid
/// alphabet; in patterns it always reads as the wildcard, shadowing the
/// literal underscore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCharset {
    pub block: char,
    pub unknown: char,
}

impl Default for GridCharset {
    fn default() -> Self {
        GridCharset {
            block: '.',
            unknown: '_',
        }
    }
}

impl GridCharset {
    /// Build a charset, rejecting block characters that collide with the
    /// alphabet or with the unknown character.
    pub fn new(block: char, unknown: char) -> Result<GridCharset, ConfigError> {
        if block == unknown || is_alphabet_char(block) {
            return Err(ConfigError::BadCharset { block, unknown });
        }
        Ok(GridCharset { block, unknown })
    }
}

/// A maximal run of open cells in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: GridCoord,
    pub len: usize,
    pub dir: Direction,
}

impl Run {
    /// The coordinate of the cell at `offset` within this run.
    #[must_use]
    pub fn cell_at(&self, offset: usize) -> GridCoord {
        match self.dir {
            Direction::Across => (self.start.0, self.start.1 + offset),
            Direction::Down => (self.start.0 + offset, self.start.1),
        }
    }
}

/// An N x N grid of cells, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    n: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Build an all-empty grid of the given size.
    #[must_use]
    pub fn empty(n: usize) -> Grid {
        Grid {
            n,
            cells: vec![Cell::Empty; n * n],
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.n
    }

    fn idx(&self, r: usize, c: usize) -> usize {
        r * self.n + c
    }

    fn in_bounds(&self, r: usize, c: usize) -> bool {
        r < self.n && c < self.n
    }

    /// The cell at (r, c). Callers are expected to stay in bounds.
    #[must_use]
    pub fn cell(&self, r: usize, c: usize) -> Cell {
        self.cells[self.idx(r, c)]
    }

    /// The 180-degree rotational mirror of (r, c).
    #[must_use]
    pub fn mirror(&self, r: usize, c: usize) -> GridCoord {
        (self.n - 1 - r, self.n - 1 - c)
    }

    pub(crate) fn set_cell_raw(&mut self, r: usize, c: usize, cell: Cell) {
        let idx = self.idx(r, c);
        self.cells[idx] = cell;
    }

    /// Write a letter into an open cell. Rejects characters outside the
    /// alphabet and attempts to write into a block.
    pub fn place_letter(&mut self, r: usize, c: usize, ch: char) -> Result<(), GridError> {
        if !self.in_bounds(r, c) {
            return Err(GridError::OutOfBounds(r, c));
        }
        if !is_alphabet_char(ch) {
            return Err(GridError::InvalidChar(ch));
        }
        if self.cell(r, c).is_block() {
            return Err(GridError::BlockedCell(r, c));
        }
        self.set_cell_raw(r, c, Cell::Letter(ch));
        Ok(())
    }

    /// Reset an open cell back to empty.
    pub fn clear_cell(&mut self, r: usize, c: usize) -> Result<(), GridError> {
        if !self.in_bounds(r, c) {
            return Err(GridError::OutOfBounds(r, c));
        }
        if self.cell(r, c).is_block() {
            return Err(GridError::BlockedCell(r, c));
        }
        self.set_cell_raw(r, c, Cell::Empty);
        Ok(())
    }

    /// Place a block at (r, c) and its 180-degree mirror. Fails without
    /// mutating if either target holds a fixed letter (unless `overwrite`), if
    /// the result would contain a run shorter than `min_entry_len`, or if it
    /// would disconnect the open cells.
    pub fn place_block_symmetric(
        &mut self,
        r: usize,
        c: usize,
        min_entry_len: usize,
        overwrite: bool,
    ) -> Result<(), GridError> {
        if !self.in_bounds(r, c) {
            return Err(GridError::OutOfBounds(r, c));
        }
        let (mr, mc) = self.mirror(r, c);
        if !overwrite {
            for &(tr, tc) in &[(r, c), (mr, mc)] {
                if matches!(self.cell(tr, tc), Cell::Letter(_)) {
                    return Err(GridError::FixedLetter(tr, tc));
                }
            }
        }

        let saved = self.cells.clone();
        self.set_cell_raw(r, c, Cell::Block);
        self.set_cell_raw(mr, mc, Cell::Block);

        if !self.min_run_ok(min_entry_len) {
            self.cells = saved;
            return Err(GridError::ShortRun(r, c, min_entry_len));
        }
        if !self.is_connected() {
            self.cells = saved;
            return Err(GridError::Disconnects(r, c));
        }
        Ok(())
    }

    /// The inverse of `place_block_symmetric`: set (r, c) and its mirror back
    /// to empty.
    pub fn remove_block_symmetric(&mut self, r: usize, c: usize) -> Result<(), GridError> {
        if !self.in_bounds(r, c) {
            return Err(GridError::OutOfBounds(r, c));
        }
        let (mr, mc) = self.mirror(r, c);
        self.set_cell_raw(r, c, Cell::Empty);
        self.set_cell_raw(mr, mc, Cell::Empty);
        Ok(())
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_block()).count()
    }

    /// Enumerate the maximal horizontal runs of open cells, in scan order.
    #[must_use]
    pub fn horizontal_runs(&self) -> Vec<Run> {
        self.line_runs(Direction::Across)
    }

    /// Enumerate the maximal vertical runs of open cells, in scan order.
    #[must_use]
    pub fn vertical_runs(&self) -> Vec<Run> {
        self.line_runs(Direction::Down)
    }

    fn line_runs(&self, dir: Direction) -> Vec<Run> {
        let mut runs = vec![];
        for line in 0..self.n {
            let mut start: Option<usize> = None;
            for offset in 0..=self.n {
                let open = offset < self.n && {
                    let (r, c) = match dir {
                        Direction::Across => (line, offset),
                        Direction::Down => (offset, line),
                    };
                    self.cell(r, c).is_open()
                };
                if open && start.is_none() {
                    start = Some(offset);
                }
                if !open {
                    if let Some(run_start) = start.take() {
                        let start_coord = match dir {
                            Direction::Across => (line, run_start),
                            Direction::Down => (run_start, line),
                        };
                        runs.push(Run {
                            start: start_coord,
                            len: offset - run_start,
                            dir,
                        });
                    }
                }
            }
        }
        runs
    }

    /// Is the block pattern invariant under 180-degree rotation?
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        (0..self.n).all(|r| {
            (0..self.n).all(|c| {
                let (mr, mc) = self.mirror(r, c);
                self.cell(r, c).is_block() == self.cell(mr, mc).is_block()
            })
        })
    }

    fn min_run_ok(&self, min_entry_len: usize) -> bool {
        self.horizontal_runs()
            .iter()
            .chain(self.vertical_runs().iter())
            .all(|run| run.len >= min_entry_len)
    }

    /// Do the open cells form a single 4-connected component? A grid with no
    /// open cells counts as connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let open_total = self.cells.iter().filter(|cell| cell.is_open()).count();
        if open_total == 0 {
            return true;
        }

        let start = (0..self.n * self.n)
            .find(|&idx| self.cells[idx].is_open())
            .map(|idx| (idx / self.n, idx % self.n));
        let Some(start) = start else {
            return true;
        };

        let mut seen = vec![false; self.n * self.n];
        let mut queue = VecDeque::new();
        seen[self.idx(start.0, start.1)] = true;
        queue.push_back(start);
        let mut reached = 0;

        while let Some((r, c)) = queue.pop_front() {
            reached += 1;
            let mut neighbors: Vec<GridCoord> = vec![];
            if r > 0 {
                neighbors.push((r - 1, c));
            }
            if c > 0 {
                neighbors.push((r, c - 1));
            }
            if r + 1 < self.n {
                neighbors.push((r + 1, c));
            }
            if c + 1 < self.n {
                neighbors.push((r, c + 1));
            }
            for (nr, nc) in neighbors {
                let idx = self.idx(nr, nc);
                if !seen[idx] && self.cells[idx].is_open() {
                    seen[idx] = true;
                    queue.push_back((nr, nc));
                }
            }
        }

        reached == open_total
    }

    /// True iff symmetry, minimum-run length, and connectivity all hold.
    #[must_use]
    pub fn validate(&self, min_entry_len: usize) -> bool {
        self.is_symmetric() && self.min_run_ok(min_entry_len) && self.is_connected()
    }

    /// Render the grid as N strings of length N.
    #[must_use]
    pub fn to_rows(&self, charset: &GridCharset) -> Vec<String> {
        (0..self.n)
            .map(|r| {
                (0..self.n)
                    .map(|c| match self.cell(r, c) {
                        Cell::Block => charset.block,
                        Cell::Empty => charset.unknown,
                        Cell::Letter(ch) => ch,
                    })
                    .collect()
            })
            .collect()
    }

    /// Parse a grid from N strings of length N. Alphabetic characters are
    /// uppercased; anything outside the charset and the alphabet is rejected.
    pub fn from_rows(rows: &[String], charset: &GridCharset) -> Result<Grid, GridError> {
        let n = rows.len();
        if n == 0 || rows.iter().any(|row| row.chars().count() != n) {
            return Err(GridError::NotSquare);
        }

        let mut grid = Grid::empty(n);
        for (r, row) in rows.iter().enumerate() {
            for (c, ch) in row.chars().enumerate() {
                let cell = if ch == charset.block {
                    Cell::Block
                } else if ch == charset.unknown {
                    Cell::Empty
                } else {
                    let upper = ch.to_ascii_uppercase();
                    if !is_alphabet_char(upper) {
                        return Err(GridError::InvalidChar(ch));
                    }
                    Cell::Letter(upper)
                };
                grid.set_cell_raw(r, c, cell);
            }
        }
        Ok(grid)
    }
}
