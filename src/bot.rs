// Per-turn orchestration of the decision engine.
//
// The adversarial search runs on a blocking thread with iterative deepening
// and publishes every completed depth through lock-free atomics. The async
// side polls until the search finishes or the response budget is spent, then
// answers with the deepest completed result, the weighted planner's move, or
// any in-bounds direction, in that order of preference.

use log::{error, info, warn};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::board::BoardModel;
use crate::config::Config;
use crate::debug_logger::DebugLogger;
use crate::error::SearchError;
use crate::planner;
use crate::search::{Minimax, MoveOutcome};
use crate::spatial::SpatialAnalyzer;
use crate::types::{Battlesnake, Board, Direction, Game};
use crate::zobrist::ZobristTable;

/// Move byte of the packed result while no search depth has completed
const NO_MOVE: u8 = u8::MAX;

/// Packs a result as score (high 32 bits), depth (bits 8..16) and move
/// index (low byte) so that one load always sees a consistent triple
fn pack_result(direction_index: u8, score: i32, depth: u8) -> u64 {
    (u64::from(score as u32) << 32) | (u64::from(depth) << 8) | u64::from(direction_index)
}

fn unpack_result(packed: u64) -> (u8, i32, u8) {
    let direction_index = (packed & 0xff) as u8;
    let depth = ((packed >> 8) & 0xff) as u8;
    let score = (packed >> 32) as u32 as i32;
    (direction_index, score, depth)
}

/// Lock-free shared state for communication between async poller and search
#[derive(Debug)]
pub struct SharedSearchState {
    /// Deepest completed search, packed by `pack_result`
    best: AtomicU64,
    no_safe_move: AtomicBool,
    search_complete: AtomicBool,
}

impl SharedSearchState {
    pub fn new() -> Self {
        SharedSearchState {
            best: AtomicU64::new(pack_result(NO_MOVE, i32::MIN, 0)),
            no_safe_move: AtomicBool::new(false),
            search_complete: AtomicBool::new(false),
        }
    }

    fn publish(&self, direction: Direction, score: i32, depth: u8) {
        self.best
            .store(pack_result(direction.index(), score, depth), Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.search_complete.load(Ordering::Acquire)
    }

    /// Deepest completed search result as (direction, score, depth)
    pub fn best(&self) -> Option<(Direction, i32, u8)> {
        match unpack_result(self.best.load(Ordering::Acquire)) {
            (NO_MOVE, _, _) => None,
            (idx, score, depth) => Some((Direction::from_index(idx), score, depth)),
        }
    }
}

impl Default for SharedSearchState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a turn's move came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSource {
    Search,
    Planner,
    /// First in-bounds direction; every move loses or the board was unusable
    Fallback,
}

impl MoveSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveSource::Search => "search",
            MoveSource::Planner => "planner",
            MoveSource::Fallback => "fallback",
        }
    }
}

/// The move chosen for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub direction: Direction,
    pub source: MoveSource,
    /// Search score, when the move came from the search
    pub score: Option<i32>,
    pub depth: u8,
}

/// Battlesnake Bot with OOP-style API
/// Takes static configuration dependencies and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    zobrist: Arc<ZobristTable>,
    debug_logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `zobrist` - Key table shared by every decision of this process
    pub fn new(config: Config, zobrist: Arc<ZobristTable>) -> Self {
        Bot {
            config,
            zobrist,
            debug_logger: DebugLogger::disabled(),
        }
    }

    /// Attaches a per-turn JSONL logger
    pub fn with_debug_logger(mut self, debug_logger: DebugLogger) -> Self {
        self.debug_logger = debug_logger;
        self
    }

    /// Returns bot metadata and appearance
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "author": "alphabeta-snake",
            "color": "#3A6EA5",
            "head": "default",
            "tail": "default",
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, game: &Game, _turn: &i32, board: &Board, _you: &Battlesnake) {
        info!(
            "GAME START {} ({}x{}, {} snakes)",
            game.id,
            board.width,
            board.height,
            board.snakes.len()
        );
    }

    /// Called when a game ends
    /// Corresponds to POST /end endpoint
    pub fn end(&self, game: &Game, turn: &i32, _board: &Board, _you: &Battlesnake) {
        info!("GAME OVER {} after {} turns", game.id, turn);
    }

    /// Computes and returns the next move within the response budget
    /// Corresponds to POST /move endpoint
    ///
    /// # Arguments
    /// * `_game` - Current game metadata
    /// * `turn` - Current turn number
    /// * `board` - Current board state
    /// * `you` - Your snake's current state
    ///
    /// # Returns
    /// * `Value` - JSON response containing the chosen move direction
    pub async fn get_move(
        &self,
        _game: &Game,
        turn: &i32,
        board: &Board,
        you: &Battlesnake,
    ) -> Value {
        let start_time = Instant::now();
        info!("Turn {}: Computing move", turn);

        let decision = match BoardModel::from_snapshot(board, &you.id, &self.config) {
            Ok(model) => self.search_with_budget(model, start_time).await,
            Err(e) => {
                warn!("Turn {}: Rejected board ({}), using fallback", turn, e);
                Decision {
                    direction: Self::first_in_bounds(board, you),
                    source: MoveSource::Fallback,
                    score: None,
                    depth: 0,
                }
            }
        };

        info!(
            "Turn {}: Chose {} via {} (score: {:?}, depth: {}, time: {}ms)",
            turn,
            decision.direction.as_str(),
            decision.source.as_str(),
            decision.score,
            decision.depth,
            start_time.elapsed().as_millis()
        );

        self.debug_logger
            .log_move(*turn, board.clone(), you.id.clone(), decision.direction);

        json!({ "move": decision.direction.as_str(), "shout": decision.source.as_str() })
    }

    /// Runs the search on a blocking thread and polls it until the budget ends
    async fn search_with_budget(&self, model: BoardModel, start_time: Instant) -> Decision {
        let shared = Arc::new(SharedSearchState::new());
        let shared_clone = shared.clone();
        let search_model = model.clone();
        let zobrist = self.zobrist.clone();
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || {
            Bot::compute_best_move_internal(search_model, zobrist, &shared_clone, start_time, &config)
        });

        // Polling loop: check for results or timeout
        let effective_budget = self.config.timing.effective_budget_ms();
        let polling_interval = Duration::from_millis(self.config.timing.polling_interval_ms);

        loop {
            tokio::time::sleep(polling_interval).await;

            let elapsed = start_time.elapsed().as_millis() as u64;
            if elapsed >= effective_budget || shared.is_complete() {
                break;
            }
        }

        Self::resolve(&shared, &model, &self.config)
    }

    /// Runs one decision to completion on the calling thread
    ///
    /// Same search and fallbacks as `get_move`, without the async poller;
    /// used by the replay tool.
    pub fn decide_blocking(&self, board: &Board, you_id: &str) -> Result<Decision, String> {
        let model = BoardModel::from_snapshot(board, you_id, &self.config).map_err(|e| e.to_string())?;
        let shared = SharedSearchState::new();
        Self::compute_best_move_internal(
            model.clone(),
            self.zobrist.clone(),
            &shared,
            Instant::now(),
            &self.config,
        );
        Ok(Self::resolve(&shared, &model, &self.config))
    }

    /// Turns the published search state into a decision
    fn resolve(shared: &SharedSearchState, model: &BoardModel, config: &Config) -> Decision {
        if let Some((direction, score, depth)) = shared.best() {
            return Decision {
                direction,
                source: MoveSource::Search,
                score: Some(score),
                depth,
            };
        }
        if shared.no_safe_move.load(Ordering::Acquire) {
            info!("No safe move available");
        } else {
            warn!("No search depth completed in time");
        }
        Self::fallback(model, config)
    }

    /// Planner move, or the first in-bounds direction when the planner has none
    pub fn fallback(model: &BoardModel, config: &Config) -> Decision {
        let analyzer = SpatialAnalyzer::new(config.weights.clone());
        let weights = analyzer.get_weights(model);
        match planner::plan(model, &weights, config.planner.horizon) {
            Some(planned) => Decision {
                direction: planned.direction,
                source: MoveSource::Planner,
                score: None,
                depth: 0,
            },
            None => {
                let head = model.my_agent().head();
                let direction = model
                    .neighbors(&head)
                    .map(|(dir, _)| dir)
                    .next()
                    .unwrap_or(Direction::Up);
                Decision {
                    direction,
                    source: MoveSource::Fallback,
                    score: None,
                    depth: 0,
                }
            }
        }
    }

    /// First direction from `you`'s head that stays on the board
    fn first_in_bounds(board: &Board, you: &Battlesnake) -> Direction {
        let head = you.body.first().copied().unwrap_or(you.head);
        Direction::all()
            .into_iter()
            .find(|dir| {
                let next = dir.apply(&head);
                next.x >= 0 && next.y >= 0 && next.x < board.width && next.y < board.height
            })
            .unwrap_or(Direction::Up)
    }

    /// Iterative deepening search, publishing each completed depth
    pub fn compute_best_move_internal(
        model: BoardModel,
        zobrist: Arc<ZobristTable>,
        shared: &SharedSearchState,
        start_time: Instant,
        config: &Config,
    ) {
        if !zobrist.supports(model.width(), model.height()) {
            warn!(
                "Board {}x{} exceeds the key table, skipping search",
                model.width(),
                model.height()
            );
            shared.search_complete.store(true, Ordering::Release);
            return;
        }

        let effective_budget = config.timing.effective_budget_ms();
        let deadline = start_time + Duration::from_millis(effective_budget);
        let mut minimax = Minimax::new(model, zobrist, config).with_deadline(deadline);

        let mut current_depth = config.timing.initial_depth.max(1);
        while current_depth <= config.search.max_depth {
            let elapsed = start_time.elapsed().as_millis() as u64;
            let remaining = effective_budget.saturating_sub(elapsed);

            // Check if we have enough time for another iteration
            if remaining < config.timing.min_time_remaining_ms {
                info!(
                    "Stopping search: insufficient time remaining ({}ms)",
                    remaining
                );
                break;
            }

            // Estimate time for next iteration
            let estimated_time = Self::estimate_iteration_time(current_depth, config);
            if estimated_time > remaining {
                info!(
                    "Stopping search: next iteration would exceed budget (estimated {}ms, remaining {}ms)",
                    estimated_time, remaining
                );
                break;
            }

            match minimax.best_move_at_depth(current_depth) {
                Ok(MoveOutcome::Move {
                    direction, score, ..
                }) => shared.publish(direction, score, current_depth),
                Ok(MoveOutcome::NoSafeMove) => {
                    shared.no_safe_move.store(true, Ordering::Release);
                    break;
                }
                Err(SearchError::DeadlineExceeded { depth }) => {
                    info!("Stopping search: depth {} ran out of time", depth);
                    break;
                }
                Err(e) => {
                    error!("Search failed: {}", e);
                    break;
                }
            }

            current_depth += 1;
        }

        shared.search_complete.store(true, Ordering::Release);
    }

    /// Estimates the time required for an iteration at a given depth
    /// Uses exponential branching model: time ≈ base * branching_factor^plies
    fn estimate_iteration_time(depth: u8, config: &Config) -> u64 {
        let estimate = config.time_estimation.base_iteration_time_ms
            * config.time_estimation.branching_factor.powf(depth as f64);
        estimate.ceil() as u64
    }
}
