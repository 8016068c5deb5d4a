// Decision engine library: board model, spatial analysis, path planning,
// Zobrist hashing and adversarial search, plus the per-turn bot that drives
// them. The server binary and the replay tool both build on it.

pub mod board;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod error;
pub mod planner;
pub mod replay;
pub mod search;
pub mod spatial;
pub mod transposition;
pub mod types;
pub mod zobrist;
