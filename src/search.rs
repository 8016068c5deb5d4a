// Adversarial search: depth-bounded minimax with alpha-beta pruning over
// incrementally hashed board states.
//
// Agents move one at a time in a fixed cycle (me, then every living rival);
// each move is one ply. I maximise, every rival minimises my score. Moves are
// simulated in place on a single BoardModel and reverted when the scoped
// Simulation guard is dropped.

use log::debug;
use std::cmp::Ordering;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{BoardModel, MoveUndo, RemovalUndo};
use crate::config::{Config, PlannerConfig, ScoresConfig, SearchConfig};
use crate::error::SearchError;
use crate::planner;
use crate::spatial::SpatialAnalyzer;
use crate::transposition::TranspositionTable;
use crate::types::{Coord, Direction};
use crate::zobrist::ZobristTable;

/// Nodes visited between two deadline checks; the first node always checks
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Value of a searched node: my score, then how many rivals are gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchValue {
    pub score: i32,
    pub rival_kills: u32,
}

/// Result of one top-level decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Move {
        direction: Direction,
        score: i32,
        /// The move itself captures a rival's head
        eliminates_rival: bool,
        /// Every root move that reached the best score, in direction order
        candidates: Vec<Direction>,
        depth: u8,
    },
    /// Every move of mine loses immediately
    NoSafeMove,
}

impl MoveOutcome {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            MoveOutcome::Move { direction, .. } => Some(*direction),
            MoveOutcome::NoSafeMove => None,
        }
    }
}

/// Work counters of one search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub cutoffs: u64,
    pub tt_hits: u64,
    pub tt_stores: u64,
}

/// Fixed cyclic move order: me first, then rivals by board index
#[derive(Debug, Clone)]
pub struct TurnOrder {
    order: Vec<usize>,
}

impl TurnOrder {
    pub fn new(board: &BoardModel) -> Self {
        let me = board.me();
        let mut order = vec![me];
        order.extend((0..board.agents().len()).filter(|&i| i != me));
        TurnOrder { order }
    }

    /// The living agent that moves after `current`; me when nobody else is
    /// left. `current` itself may already be dead.
    pub fn next(&self, current: usize, alive: &[bool]) -> usize {
        let pos = self.order.iter().position(|&a| a == current).unwrap_or(0);
        (1..=self.order.len())
            .map(|offset| self.order[(pos + offset) % self.order.len()])
            .find(|&a| alive[a])
            .unwrap_or(self.order[0])
    }
}

enum Pending {
    Step(MoveUndo),
    Removal(RemovalUndo),
}

/// A simulated move applied to the board, taken back on drop
///
/// Derefs to the post-move board so the search can recurse into it.
pub struct Simulation<'a> {
    board: &'a mut BoardModel,
    hash: u64,
    pending: Option<Pending>,
}

impl<'a> Simulation<'a> {
    /// Moves `agent` onto `to` and updates `hash` to match
    pub fn step(
        board: &'a mut BoardModel,
        zobrist: &ZobristTable,
        hash: u64,
        agent: usize,
        to: &Coord,
    ) -> Self {
        let stepped = zobrist.update_hash(hash, board, agent, to);
        let undo = board.apply_move(agent, to);
        let hash = zobrist.apply_changes(stepped, &undo.removed);
        debug_assert_eq!(hash, zobrist.full_hash(board), "incremental hash diverged");
        Simulation {
            board,
            hash,
            pending: Some(Pending::Step(undo)),
        }
    }

    /// Takes a trapped agent off the board
    pub fn remove(board: &'a mut BoardModel, zobrist: &ZobristTable, hash: u64, agent: usize) -> Self {
        let undo = board.remove_agent(agent);
        let hash = zobrist.apply_changes(hash, &undo.removed);
        debug_assert_eq!(hash, zobrist.full_hash(board), "incremental hash diverged");
        Simulation {
            board,
            hash,
            pending: Some(Pending::Removal(undo)),
        }
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// True when the simulated move captured another agent
    pub fn eliminated_other(&self) -> bool {
        matches!(&self.pending, Some(Pending::Step(undo)) if undo.eliminated_other())
    }
}

impl Deref for Simulation<'_> {
    type Target = BoardModel;

    fn deref(&self) -> &BoardModel {
        &*self.board
    }
}

impl DerefMut for Simulation<'_> {
    fn deref_mut(&mut self) -> &mut BoardModel {
        &mut *self.board
    }
}

impl Drop for Simulation<'_> {
    fn drop(&mut self) {
        match self.pending.take() {
            Some(Pending::Step(undo)) => self.board.revert(undo),
            Some(Pending::Removal(undo)) => self.board.restore_agent(undo),
            None => {}
        }
    }
}

/// Secondary ordering of root moves that share the best score
#[derive(Debug, Clone, Copy)]
struct RootTiebreak {
    eliminates_rival: bool,
    space: usize,
    health_edge: bool,
    /// Weighted distance to the nearest reachable food, infinite if none
    food_distance: f64,
    center_distance: i32,
}

impl RootTiebreak {
    fn rank(&self, other: &RootTiebreak) -> Ordering {
        self.eliminates_rival
            .cmp(&other.eliminates_rival)
            .then(self.space.cmp(&other.space))
            .then(self.health_edge.cmp(&other.health_edge))
            .then(other.food_distance.total_cmp(&self.food_distance))
            .then(other.center_distance.cmp(&self.center_distance))
    }
}

/// My health is exactly one above the healthiest living rival
fn health_edge(board: &BoardModel) -> bool {
    let mine = board.my_agent().health;
    board
        .alive_rivals()
        .map(|(_, r)| r.health)
        .max()
        .is_some_and(|best| mine == best + 1)
}

/// Distance of my head from the board centre in doubled coordinates
fn center_distance(board: &BoardModel) -> i32 {
    let head = board.my_agent().head();
    (2 * head.x - (board.width() as i32 - 1)).abs() + (2 * head.y - (board.height() as i32 - 1)).abs()
}

/// Everything the recursive search needs besides the board itself
struct Engine {
    zobrist: Arc<ZobristTable>,
    search: SearchConfig,
    scores: ScoresConfig,
    planner: PlannerConfig,
    analyzer: SpatialAnalyzer,
    tt: TranspositionTable,
    order: TurnOrder,
    stats: SearchStats,
    deadline: Option<Instant>,
    aborted: bool,
}

impl Engine {
    fn terminal(&self, board: &BoardModel, score: i32) -> SearchValue {
        SearchValue {
            score,
            rival_kills: board.eliminated_rivals() as u32,
        }
    }

    fn loss(&self, board: &BoardModel, depth: u8) -> SearchValue {
        self.terminal(board, self.scores.score_loss - i32::from(depth))
    }

    fn out_of_time(&mut self) -> bool {
        if !self.aborted && self.stats.nodes % DEADLINE_CHECK_INTERVAL == 1 {
            if let Some(deadline) = self.deadline {
                self.aborted = Instant::now() >= deadline;
            }
        }
        self.aborted
    }

    /// Static evaluation of a non-terminal position from my point of view
    fn evaluate(&mut self, board: &BoardModel) -> i32 {
        let s = &self.scores;
        let head = board.my_agent().head();
        let space = self.analyzer.get_distance(board, &head) as i32;

        let mut score = space * s.weight_space;
        score += board.eliminated_rivals() as i32 * s.rival_elimination_bonus;
        if health_edge(board) {
            score += s.health_edge_bonus;
        }

        let nearest = board
            .food()
            .iter()
            .filter_map(|f| self.analyzer.distance(f))
            .min();
        if let Some(dist) = nearest {
            let coef = self.analyzer.food_coefficient(board);
            score -= (dist as f64 * s.food_distance_weight * coef).round() as i32;
        }

        score -= center_distance(board) * s.center_weight;

        if self.planner.leaf_horizon > 0 {
            let weights = self.analyzer.get_weights(board);
            if let Some(planned) = planner::plan(board, &weights, self.planner.leaf_horizon) {
                score -= (planned.total_weight * s.path_weight).round() as i32;
            }
        }
        score
    }

    fn root_tiebreak(&mut self, board: &BoardModel, eliminates_rival: bool) -> RootTiebreak {
        let head = board.my_agent().head();
        let space = self.analyzer.get_distance(board, &head);
        let coef = self.analyzer.food_coefficient(board);
        let food_distance = self
            .analyzer
            .closest_food(board, &Direction::all())
            .first()
            .and_then(|f| self.analyzer.distance(f))
            .map_or(f64::INFINITY, |d| d as f64 * coef);

        RootTiebreak {
            eliminates_rival,
            space,
            health_edge: health_edge(board),
            food_distance,
            center_distance: center_distance(board),
        }
    }

    /// Minimax value of the position with `mover` to play and `depth` plies left
    fn search(
        &mut self,
        board: &mut BoardModel,
        hash: u64,
        depth: u8,
        mover: usize,
        mut alpha: i32,
        mut beta: i32,
    ) -> SearchValue {
        self.stats.nodes += 1;
        let me = board.me();
        if !board.is_alive(me) {
            return self.loss(board, depth);
        }
        if depth == 0 {
            let score = self.evaluate(board);
            return self.terminal(board, score);
        }
        if self.out_of_time() {
            return self.terminal(board, 0);
        }
        if self.search.transposition {
            if let Some(value) = self.tt.probe(hash, mover, depth) {
                self.stats.tt_hits += 1;
                return value;
            }
        }

        let (orig_alpha, orig_beta) = (alpha, beta);
        let head = board.agent(mover).head();
        let moves = board.safe_moves(mover);

        let best = if mover == me {
            if moves.is_empty() {
                return self.loss(board, depth);
            }
            let mut best: Option<SearchValue> = None;
            for dir in moves {
                let to = dir.apply(&head);
                let value = {
                    let mut sim = Simulation::step(board, &self.zobrist, hash, mover, &to);
                    let next = self.order.next(mover, sim.alive_flags());
                    let child_hash = sim.hash();
                    self.search(&mut sim, child_hash, depth - 1, next, alpha, beta)
                };
                let better = best.map_or(true, |b| {
                    value.score > b.score || (value.score == b.score && value.rival_kills > b.rival_kills)
                });
                if better {
                    best = Some(value);
                }
                alpha = alpha.max(value.score);
                if self.search.alpha_beta && alpha >= beta {
                    self.stats.cutoffs += 1;
                    break;
                }
            }
            best
        } else if moves.is_empty() {
            let mut sim = Simulation::remove(board, &self.zobrist, hash, mover);
            let next = self.order.next(mover, sim.alive_flags());
            let child_hash = sim.hash();
            Some(self.search(&mut sim, child_hash, depth - 1, next, alpha, beta))
        } else {
            let mut best: Option<SearchValue> = None;
            for dir in moves {
                let to = dir.apply(&head);
                let value = {
                    let mut sim = Simulation::step(board, &self.zobrist, hash, mover, &to);
                    let next = self.order.next(mover, sim.alive_flags());
                    let child_hash = sim.hash();
                    self.search(&mut sim, child_hash, depth - 1, next, alpha, beta)
                };
                let better = best.map_or(true, |b| {
                    value.score < b.score || (value.score == b.score && value.rival_kills < b.rival_kills)
                });
                if better {
                    best = Some(value);
                }
                beta = beta.min(value.score);
                if self.search.alpha_beta && alpha >= beta {
                    self.stats.cutoffs += 1;
                    break;
                }
            }
            best
        };

        let best = best.unwrap_or_else(|| self.loss(board, depth));
        if self.search.transposition
            && !self.aborted
            && orig_alpha < best.score
            && best.score < orig_beta
        {
            self.tt.store(hash, mover, depth, best);
            self.stats.tt_stores += 1;
        }
        best
    }
}

/// Adversarial search over one decoded board
pub struct Minimax {
    board: BoardModel,
    engine: Engine,
}

impl Minimax {
    /// Prepares a search over `board`
    ///
    /// # Arguments
    /// * `board` - Decoded board, owned by this search for the whole decision
    /// * `zobrist` - Process-wide key table; must support the board's size
    /// * `config` - Search, planner, weight and score settings
    pub fn new(board: BoardModel, zobrist: Arc<ZobristTable>, config: &Config) -> Self {
        let order = TurnOrder::new(&board);
        Minimax {
            board,
            engine: Engine {
                zobrist,
                search: config.search.clone(),
                scores: config.scores.clone(),
                planner: config.planner.clone(),
                analyzer: SpatialAnalyzer::new(config.weights.clone()),
                tt: TranspositionTable::new(config.search.tt_bucket_bits),
                order,
                stats: SearchStats::default(),
                deadline: None,
                aborted: false,
            },
        }
    }

    /// Abandons any search still running at `deadline`
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.engine.deadline = Some(deadline);
        self
    }

    pub fn board(&self) -> &BoardModel {
        &self.board
    }

    /// Counters of the most recent search
    pub fn stats(&self) -> SearchStats {
        self.engine.stats
    }

    /// Searches to the configured maximum depth
    pub fn best_move(&mut self) -> Result<MoveOutcome, SearchError> {
        let depth = self.engine.search.max_depth;
        self.best_move_at_depth(depth)
    }

    /// Searches `depth` plies (at least one) and picks my move
    ///
    /// Root moves are searched one by one; after the first, each is searched
    /// with a window just below the best score so far so that every move
    /// tying the best is scored exactly. Ties are broken by the root
    /// tie-break ordering, then by direction order.
    ///
    /// # Returns
    /// * `Ok(MoveOutcome)` - Chosen move, or `NoSafeMove`
    /// * `Err(SearchError)` - Hash desynchronised or the deadline passed
    ///
    /// Each root move's incremental hash is checked against a full
    /// recomputation, and the board must hash back to the root value once
    /// every move has been reverted.
    pub fn best_move_at_depth(&mut self, depth: u8) -> Result<MoveOutcome, SearchError> {
        let depth = depth.max(1);
        let engine = &mut self.engine;
        engine.tt.clear();
        engine.stats = SearchStats::default();
        engine.aborted = false;

        let zobrist = Arc::clone(&engine.zobrist);
        let root_hash = zobrist.full_hash(&self.board);
        let me = self.board.me();
        let head = self.board.my_agent().head();
        let moves = self.board.safe_moves(me);

        let mut best_score: Option<i32> = None;
        let mut scored: Vec<(Direction, i32, RootTiebreak)> = Vec::with_capacity(moves.len());
        for dir in moves {
            let to = dir.apply(&head);
            let mut sim = Simulation::step(&mut self.board, &zobrist, root_hash, me, &to);
            let stepped = zobrist.full_hash(&sim);
            if stepped != sim.hash() {
                return Err(SearchError::HashDesync {
                    expected: sim.hash(),
                    recomputed: stepped,
                });
            }
            let tiebreak = engine.root_tiebreak(&sim, sim.eliminated_other());
            let next = engine.order.next(me, sim.alive_flags());
            let alpha = match best_score {
                Some(best) if engine.search.alpha_beta => best.saturating_sub(1),
                _ => i32::MIN,
            };
            let child_hash = sim.hash();
            let value = engine.search(&mut sim, child_hash, depth - 1, next, alpha, i32::MAX);
            drop(sim);

            if engine.aborted {
                break;
            }
            if best_score.map_or(true, |best| value.score > best) {
                best_score = Some(value.score);
            }
            scored.push((dir, value.score, tiebreak));
        }

        let recomputed = zobrist.full_hash(&self.board);
        if recomputed != root_hash {
            return Err(SearchError::HashDesync {
                expected: root_hash,
                recomputed,
            });
        }
        if engine.aborted {
            return Err(SearchError::DeadlineExceeded { depth });
        }

        let stats = engine.stats;
        debug!(
            "Depth {}: {} nodes, {} cutoffs, {} TT hits, {} TT stores",
            depth, stats.nodes, stats.cutoffs, stats.tt_hits, stats.tt_stores
        );

        let Some(best_score) = best_score else {
            return Ok(MoveOutcome::NoSafeMove);
        };

        let mut chosen: Option<(Direction, RootTiebreak)> = None;
        let mut candidates = Vec::new();
        for (dir, score, tiebreak) in scored {
            if score != best_score {
                continue;
            }
            candidates.push(dir);
            let wins = chosen.map_or(true, |(_, best)| tiebreak.rank(&best) == Ordering::Greater);
            if wins {
                chosen = Some((dir, tiebreak));
            }
        }

        Ok(match chosen {
            Some((direction, tiebreak)) => MoveOutcome::Move {
                direction,
                score: best_score,
                eliminates_rival: tiebreak.eliminates_rival,
                candidates,
                depth,
            },
            None => MoveOutcome::NoSafeMove,
        })
    }
}
