// Configuration module for reading Snake.toml
// Every tunable constant of the engine lives here: time budget, search depth,
// heuristic weights, evaluation scores and Zobrist table sizing.

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub time_estimation: TimeEstimationConfig,
    pub search: SearchConfig,
    pub planner: PlannerConfig,
    pub weights: WeightsConfig,
    pub scores: ScoresConfig,
    pub game_rules: GameRulesConfig,
    pub zobrist: ZobristConfig,
    pub debug: DebugConfig,
}

/// Timing and performance constants
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    pub polling_interval_ms: u64,
    pub initial_depth: u8,
    pub min_time_remaining_ms: u64,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// Time estimation constants for iterative deepening
#[derive(Debug, Deserialize, Clone)]
pub struct TimeEstimationConfig {
    pub base_iteration_time_ms: f64,
    pub branching_factor: f64,
}

/// Adversarial search parameters
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Plies searched by `best_move` (one ply = one agent's move)
    pub max_depth: u8,
    pub alpha_beta: bool,
    pub transposition: bool,
    /// log2 of the transposition table bucket count
    pub tt_bucket_bits: u8,
}

/// Weighted path planner parameters
#[derive(Debug, Deserialize, Clone)]
pub struct PlannerConfig {
    /// DFS horizon for the standalone planner (fallback move)
    pub horizon: u8,
    /// DFS horizon used inside the leaf evaluation; 0 disables it
    pub leaf_horizon: u8,
}

/// Weight map heuristic constants
#[derive(Debug, Deserialize, Clone)]
pub struct WeightsConfig {
    // Corner avoidance gradient, outermost ring first
    pub corner_rings: [[f64; 4]; 3],

    // Snake avoidance
    pub rival_head_danger: f64,
    pub body_ring_levels: u8,

    // Food attraction
    pub food_unit_weight: f64,
    pub food_ring_step: f64,
    pub food_ring_offset: f64,
    pub food_rings: u8,
    pub food_contest_health: i32,
    pub food_health_thresholds: Vec<i32>,
    pub food_coefficients: Vec<f64>,
    pub contested_food_coefficient: f64,
}

/// Static evaluation constants
#[derive(Debug, Deserialize, Clone)]
pub struct ScoresConfig {
    pub score_loss: i32,
    pub weight_space: i32,
    pub rival_elimination_bonus: i32,
    pub health_edge_bonus: i32,
    pub food_distance_weight: f64,
    pub center_weight: i32,
    pub path_weight: f64,
}

/// Game rules constants
#[derive(Debug, Deserialize, Clone)]
pub struct GameRulesConfig {
    pub health_on_food: i32,
    pub health_loss_per_turn: i32,
}

/// Zobrist key table sizing
#[derive(Debug, Deserialize, Clone)]
pub struct ZobristConfig {
    pub max_width: usize,
    pub max_height: usize,
    /// Fixed seed for reproducible hashes; random when absent
    pub seed: Option<u64>,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Snake.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Snake.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Snake.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Snake.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 400,
                network_overhead_ms: 50,
                polling_interval_ms: 10,
                initial_depth: 1,
                min_time_remaining_ms: 20,
            },
            time_estimation: TimeEstimationConfig {
                base_iteration_time_ms: 0.01,
                branching_factor: 1.6,
            },
            search: SearchConfig {
                max_depth: 13,
                alpha_beta: true,
                transposition: true,
                tt_bucket_bits: 16,
            },
            planner: PlannerConfig {
                horizon: 5,
                leaf_horizon: 3,
            },
            weights: WeightsConfig {
                corner_rings: [
                    [7.0, 5.0, 4.0, 3.0],
                    [5.0, 4.0, 3.0, 2.0],
                    [4.0, 3.0, 2.0, 1.0],
                ],
                rival_head_danger: 4.0,
                body_ring_levels: 2,
                food_unit_weight: -6.4,
                food_ring_step: 1.6,
                food_ring_offset: 2.4,
                food_rings: 4,
                food_contest_health: 6,
                food_health_thresholds: vec![12, 36, 100],
                food_coefficients: vec![1.6, 1.2, 1.0],
                contested_food_coefficient: 1.6,
            },
            scores: ScoresConfig {
                score_loss: -1_000_000,
                weight_space: 10,
                rival_elimination_bonus: 5000,
                health_edge_bonus: 50,
                food_distance_weight: 10.0,
                center_weight: 1,
                path_weight: 1.0,
            },
            game_rules: GameRulesConfig {
                health_on_food: 100,
                health_loss_per_turn: 1,
            },
            zobrist: ZobristConfig {
                max_width: 25,
                max_height: 25,
                seed: None,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "battlesnake_debug.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            log::warn!("Could not load Snake.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_budget_calculation() {
        let config = Config::default_hardcoded();
        assert_eq!(config.timing.effective_budget_ms(), 350);
    }

    #[test]
    fn test_config_can_be_created() {
        let config = Config::default_hardcoded();
        assert_eq!(config.search.max_depth, 13);
        assert_eq!(config.planner.horizon, 5);
        assert_eq!(config.weights.food_contest_health, 6);
    }

    #[test]
    fn test_food_tables_line_up() {
        let config = Config::default_hardcoded();
        assert_eq!(
            config.weights.food_health_thresholds.len(),
            config.weights.food_coefficients.len()
        );
    }

    #[test]
    fn test_snake_toml_can_be_parsed() {
        let result = Config::from_file("Snake.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Snake.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_all_config_values_match_hardcoded_defaults() {
        let file_config = Config::from_file("Snake.toml").expect("Snake.toml should be parseable");
        let hardcoded = Config::default_hardcoded();

        // Timing
        assert_eq!(
            file_config.timing.response_time_budget_ms,
            hardcoded.timing.response_time_budget_ms
        );
        assert_eq!(
            file_config.timing.network_overhead_ms,
            hardcoded.timing.network_overhead_ms
        );
        assert_eq!(file_config.timing.initial_depth, hardcoded.timing.initial_depth);

        // Search
        assert_eq!(file_config.search.max_depth, hardcoded.search.max_depth);
        assert_eq!(file_config.search.alpha_beta, hardcoded.search.alpha_beta);
        assert_eq!(file_config.search.tt_bucket_bits, hardcoded.search.tt_bucket_bits);

        // Planner
        assert_eq!(file_config.planner.horizon, hardcoded.planner.horizon);
        assert_eq!(file_config.planner.leaf_horizon, hardcoded.planner.leaf_horizon);

        // Weights
        assert_eq!(file_config.weights.corner_rings, hardcoded.weights.corner_rings);
        assert_eq!(
            file_config.weights.rival_head_danger,
            hardcoded.weights.rival_head_danger
        );
        assert_eq!(
            file_config.weights.food_unit_weight,
            hardcoded.weights.food_unit_weight
        );
        assert_eq!(
            file_config.weights.food_health_thresholds,
            hardcoded.weights.food_health_thresholds
        );
        assert_eq!(
            file_config.weights.food_coefficients,
            hardcoded.weights.food_coefficients
        );

        // Scores
        assert_eq!(file_config.scores.score_loss, hardcoded.scores.score_loss);
        assert_eq!(file_config.scores.weight_space, hardcoded.scores.weight_space);
        assert_eq!(
            file_config.scores.rival_elimination_bonus,
            hardcoded.scores.rival_elimination_bonus
        );

        // Game rules
        assert_eq!(
            file_config.game_rules.health_on_food,
            hardcoded.game_rules.health_on_food
        );

        // Zobrist
        assert_eq!(file_config.zobrist.max_width, hardcoded.zobrist.max_width);
        assert_eq!(file_config.zobrist.seed, hardcoded.zobrist.seed);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = Config::from_file("nonexistent.toml");
        assert!(result.is_err());
    }
}
