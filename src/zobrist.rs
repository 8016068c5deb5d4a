// Zobrist hashing of simulated board states
//
// Every (cell, occupant) pair owns an independent random 64-bit key and the
// hash of a state is the XOR of the keys of its occupied cells. XOR being its
// own inverse, a move only has to toggle the keys of the cells it changes.
//
// Key slots per cell:
// - `0`: empty (always zero, so empty cells never contribute)
// - `1`: body segment
// - `2`: food
// - `3..=63`: controlled head, slot `2 + length`
// - `64..=124`: rival head, slot `63 + length`
//
// The table is built once per process for the largest supported board and
// shared read-only between decision cycles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::board::{BoardModel, Cell, CellChange};
use crate::config::ZobristConfig;
use crate::types::Coord;

pub const KEYS_PER_CELL: usize = 125;

const BODY_SLOT: usize = 1;
const FOOD_SLOT: usize = 2;
const OWN_HEAD_BASE: usize = 2;
const RIVAL_HEAD_BASE: usize = 63;
/// Longer agents share the key of this length
const MAX_KEYED_LENGTH: usize = 61;

/// Immutable table of Zobrist keys
#[derive(Debug, Clone)]
pub struct ZobristTable {
    max_width: usize,
    max_height: usize,
    keys: Vec<u64>,
}

impl ZobristTable {
    /// Generates keys for boards up to `max_width` x `max_height`
    ///
    /// A fixed `seed` makes hashes reproducible (replays, tests); otherwise the
    /// keys come from the OS entropy source.
    pub fn new(max_width: usize, max_height: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut keys = vec![0u64; max_width * max_height * KEYS_PER_CELL];
        for cell_keys in keys.chunks_mut(KEYS_PER_CELL) {
            for key in cell_keys.iter_mut().skip(1) {
                *key = rng.random_range(1..=u64::MAX);
            }
        }

        ZobristTable {
            max_width,
            max_height,
            keys,
        }
    }

    pub fn from_config(config: &ZobristConfig) -> Self {
        Self::new(config.max_width, config.max_height, config.seed)
    }

    /// Whether boards of this size can be hashed
    pub fn supports(&self, width: usize, height: usize) -> bool {
        width <= self.max_width && height <= self.max_height
    }

    /// Key of `cell` placed at `at`
    pub fn key(&self, at: &Coord, cell: Cell) -> u64 {
        let slot = match cell {
            Cell::Empty => return 0,
            Cell::Body => BODY_SLOT,
            Cell::Food => FOOD_SLOT,
            Cell::OwnHead { length, .. } => OWN_HEAD_BASE + length.clamp(1, MAX_KEYED_LENGTH),
            Cell::RivalHead { length, .. } => RIVAL_HEAD_BASE + length.clamp(1, MAX_KEYED_LENGTH),
        };
        let base = (at.y as usize * self.max_width + at.x as usize) * KEYS_PER_CELL;
        self.keys[base + slot]
    }

    /// Hash computed from scratch over every occupied cell
    pub fn full_hash(&self, board: &BoardModel) -> u64 {
        let mut hash = 0u64;
        for y in 0..board.height() as i32 {
            for x in 0..board.width() as i32 {
                let at = Coord::new(x, y);
                hash ^= self.key(&at, board.cell(&at));
            }
        }
        hash
    }

    /// Hash after `agent` steps onto `to`, derived from the pre-move `board`
    ///
    /// Toggles out the old head key and the destination's occupant (food,
    /// trunk or another head), toggles in the new head keyed by its post-move
    /// length, re-keys the old head as trunk when it stays one, and toggles
    /// out the segment that becomes the new tail. Eliminations triggered by
    /// the move are applied separately with [`ZobristTable::apply_changes`].
    pub fn update_hash(&self, hash: u64, board: &BoardModel, agent: usize, to: &Coord) -> u64 {
        self.apply_changes(hash, &board.plan_step(agent, to))
    }

    /// Toggles every change's before and after keys
    pub fn apply_changes(&self, hash: u64, changes: &[CellChange]) -> u64 {
        changes.iter().fold(hash, |h, change| {
            h ^ self.key(&change.at, change.before) ^ self.key(&change.at, change.after)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{Battlesnake, Board};

    fn model() -> BoardModel {
        let board = Board {
            width: 7,
            height: 7,
            food: vec![Coord::new(3, 5)],
            snakes: vec![
                Battlesnake::from_body(
                    "me",
                    vec![Coord::new(3, 4), Coord::new(3, 3), Coord::new(3, 2), Coord::new(3, 1)],
                    90,
                ),
                Battlesnake::from_body(
                    "rival",
                    vec![Coord::new(4, 4), Coord::new(5, 4), Coord::new(6, 4)],
                    90,
                ),
            ],
            hazards: vec![],
        };
        BoardModel::from_snapshot(&board, "me", &Config::default_hardcoded()).unwrap()
    }

    #[test]
    fn test_seeded_tables_are_reproducible() {
        let a = ZobristTable::new(11, 11, Some(7));
        let b = ZobristTable::new(11, 11, Some(7));
        let m = model();
        assert_eq!(a.full_hash(&m), b.full_hash(&m));
    }

    #[test]
    fn test_empty_key_is_zero_and_others_are_not() {
        let table = ZobristTable::new(5, 5, Some(1));
        let at = Coord::new(2, 2);
        assert_eq!(table.key(&at, Cell::Empty), 0);
        assert_ne!(table.key(&at, Cell::Body), 0);
        assert_ne!(
            table.key(&at, Cell::OwnHead { agent: 0, length: 3 }),
            table.key(&at, Cell::RivalHead { agent: 1, length: 3 })
        );
    }

    #[test]
    fn test_toggling_twice_restores_hash() {
        let table = ZobristTable::new(7, 7, Some(3));
        let m = model();
        let hash = table.full_hash(&m);
        let key = table.key(&Coord::new(0, 0), Cell::Food);
        assert_eq!(hash ^ key ^ key, hash);
    }

    #[test]
    fn test_incremental_matches_full_for_food_step() {
        let table = ZobristTable::new(7, 7, Some(11));
        let mut m = model();
        let to = Coord::new(3, 5);
        let hash = table.update_hash(table.full_hash(&m), &m, 0, &to);
        m.apply_move(0, &to);
        assert_eq!(hash, table.full_hash(&m));
    }

    #[test]
    fn test_incremental_matches_full_for_capture() {
        let table = ZobristTable::new(7, 7, Some(13));
        let mut m = model();
        let to = Coord::new(4, 4);
        let before = table.full_hash(&m);
        let stepped = table.update_hash(before, &m, 0, &to);
        let undo = m.apply_move(0, &to);
        let hash = table.apply_changes(stepped, &undo.removed);
        assert_eq!(hash, table.full_hash(&m));

        m.revert(undo);
        assert_eq!(table.full_hash(&m), before);
    }
}
