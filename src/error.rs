// Error taxonomy for the decision engine.
// Malformed snapshots are rejected by the board model; a desynchronised state
// hash is an internal invariant violation reported by the search.

use thiserror::Error;

use crate::types::Coord;

/// Reasons a game snapshot cannot be decoded into a board model
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("board {width}x{height} exceeds the supported {max_width}x{max_height}")]
    TooLarge {
        width: i32,
        height: i32,
        max_width: usize,
        max_height: usize,
    },

    #[error("position ({x}, {y}) lies outside the board")]
    OutOfBounds { x: i32, y: i32 },

    #[error("snake id '{0}' appears more than once")]
    DuplicateId(String),

    #[error("snake '{0}' has an empty body")]
    EmptyBody(String),

    #[error("snakes '{0}' and '{1}' share a head cell")]
    HeadCollision(String, String),

    #[error("cell ({x}, {y}) is claimed twice")]
    Overlap { x: i32, y: i32 },

    #[error("controlled snake '{0}' is not on the board")]
    MissingControlled(String),
}

impl BoardError {
    pub fn out_of_bounds(at: Coord) -> Self {
        BoardError::OutOfBounds { x: at.x, y: at.y }
    }

    pub fn overlap(at: Coord) -> Self {
        BoardError::Overlap { x: at.x, y: at.y }
    }
}

/// Failures of the adversarial search itself
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    #[error("state hash desynchronised: expected {expected:#018x}, recomputed {recomputed:#018x}")]
    HashDesync { expected: u64, recomputed: u64 },

    #[error("search at depth {depth} abandoned: time budget exhausted")]
    DeadlineExceeded { depth: u8 },
}
