/// An identifier for a given slot, based on its index in the extracted slot list.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the `PatternIndex`'s bucket for the
/// relevant length.
pub type WordId = usize;

/// An identifier that fully specifies a word by including both its length and `WordId`.
pub type GlobalWordId = (usize, WordId);

/// Zero-indexed (row, col) coords for a cell in the grid, where row = 0 is the top row.
pub type GridCoord = (usize, usize);
