use std::io;
use thiserror::Error;

/// Rejections from grid mutations. Every mutating grid operation either
/// succeeds or returns one of these with the grid unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("coordinates ({0}, {1}) are outside the grid")]
    OutOfBounds(usize, usize),

    #[error("cell ({0}, {1}) holds a fixed letter")]
    FixedLetter(usize, usize),

    #[error("cell ({0}, {1}) is a block")]
    BlockedCell(usize, usize),

    #[error("character '{0}' is outside the grid alphabet")]
    InvalidChar(char),

    #[error("block at ({0}, {1}) would create an entry shorter than {2}")]
    ShortRun(usize, usize, usize),

    #[error("block at ({0}, {1}) would disconnect the open cells")]
    Disconnects(usize, usize),

    #[error("grid rows must form an N x N square")]
    NotSquare,
}

/// Fatal configuration problems detected at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("grid size {0} is not supported (must be in {1}..={2})")]
    BadGridSize(usize, usize, usize),

    #[error("block char '{block}' and unknown char '{unknown}' collide with each other or the alphabet")]
    BadCharset { block: char, unknown: char },
}

/// Problems reading or writing the word pool file.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("pool file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("pool file is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failures reported by a word-lookup provider. These are always treated as
/// soft by the callers in `hydrate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup endpoint returned status {0}")]
    Status(u16),

    #[error("lookup transport failed: {0}")]
    Transport(String),
}

/// Failures producing a block layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("layout stalled at {placed} blocks (budget {min}..={max})")]
    Stalled {
        placed: usize,
        min: usize,
        max: usize,
    },
}
