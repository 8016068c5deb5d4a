// Spatial analysis: reachability by flood fill and the per-cell weight map.
//
// Weights are penalties (lower is better). Occupied cells carry BLOCKED and
// keep it through every pass; the corner, snake and food passes only ever
// add to or combine with what the previous pass left.

use std::collections::VecDeque;

use crate::board::{BoardModel, Cell};
use crate::config::WeightsConfig;
use crate::types::{Coord, Direction};

/// Distance of a cell the flood fill never touched
pub const UNREACHABLE: usize = usize::MAX;

/// Weight of an impassable cell
pub const BLOCKED: f64 = f64::INFINITY;

/// Direction pairs along which trunk segments radiate their penalty
const BODY_RING_PAIRS: [[Direction; 2]; 2] = [
    [Direction::Up, Direction::Left],
    [Direction::Down, Direction::Right],
];

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Per-cell penalties for one decision, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMap {
    width: usize,
    cells: Vec<f64>,
}

impl WeightMap {
    /// All-zero map
    pub fn new(width: usize, height: usize) -> Self {
        WeightMap {
            width,
            cells: vec![0.0; width * height],
        }
    }

    fn index(&self, c: &Coord) -> usize {
        c.y as usize * self.width + c.x as usize
    }

    pub fn get(&self, c: &Coord) -> f64 {
        self.cells[self.index(c)]
    }

    pub fn set(&mut self, c: &Coord, weight: f64) {
        let idx = self.index(c);
        self.cells[idx] = weight;
    }

    pub fn is_blocked(&self, c: &Coord) -> bool {
        self.get(c) == BLOCKED
    }

    /// Raises a cell to `weight` if it is currently lower
    fn raise(&mut self, c: &Coord, weight: f64) {
        let idx = self.index(c);
        if self.cells[idx] < weight {
            self.cells[idx] = weight;
        }
    }

    /// Adds `delta` to a cell unless it is BLOCKED, rounding the result
    fn add_rounded(&mut self, c: &Coord, delta: f64, decimals: i32) {
        let idx = self.index(c);
        if self.cells[idx] != BLOCKED {
            self.cells[idx] = round_to(self.cells[idx] + delta, decimals);
        }
    }
}

/// Flood fill and weight computation over a [`BoardModel`]
///
/// Holds the distance and first-direction scratch maps of the last flood
/// fill; both are fully reset on every call.
#[derive(Debug, Clone)]
pub struct SpatialAnalyzer {
    weights: WeightsConfig,
    width: usize,
    height: usize,
    distance: Vec<usize>,
    direction: Vec<Option<Direction>>,
    queue: VecDeque<Coord>,
}

impl SpatialAnalyzer {
    pub fn new(weights: WeightsConfig) -> Self {
        SpatialAnalyzer {
            weights,
            width: 0,
            height: 0,
            distance: Vec::new(),
            direction: Vec::new(),
            queue: VecDeque::new(),
        }
    }

    fn reset(&mut self, board: &BoardModel) {
        self.width = board.width();
        self.height = board.height();
        let size = self.width * self.height;
        self.distance.clear();
        self.distance.resize(size, UNREACHABLE);
        self.direction.clear();
        self.direction.resize(size, None);
        self.queue.clear();
    }

    fn slot(&self, c: &Coord) -> usize {
        c.y as usize * self.width + c.x as usize
    }

    /// Steps from the last fill's source, if the fill touched `c`
    pub fn distance(&self, c: &Coord) -> Option<usize> {
        match self.distance.get(self.slot(c)) {
            Some(&d) if d != UNREACHABLE => Some(d),
            _ => None,
        }
    }

    /// First move from the last fill's source that reached `c`
    pub fn direction(&self, c: &Coord) -> Option<Direction> {
        self.direction.get(self.slot(c)).copied().flatten()
    }

    /// Flood fill from `source` in the default direction order
    ///
    /// # Returns
    /// * `usize` - Number of traversable cells reached (open space)
    pub fn get_distance(&mut self, board: &BoardModel, source: &Coord) -> usize {
        self.get_distance_ordered(board, source, &Direction::all())
    }

    /// Flood fill from `source`, seeding and expanding neighbours in `order`
    ///
    /// Only Empty and Food cells are expanded. A blocked cell still records the
    /// step at which the fill first touched it.
    pub fn get_distance_ordered(
        &mut self,
        board: &BoardModel,
        source: &Coord,
        order: &[Direction],
    ) -> usize {
        self.reset(board);
        let start = self.slot(source);
        self.distance[start] = 0;

        for (dir, next) in board.neighbors_in(source, order) {
            let idx = self.slot(&next);
            self.distance[idx] = 1;
            self.direction[idx] = Some(dir);
            if board.cell(&next).is_traversable() {
                self.queue.push_back(next);
            }
        }

        let mut space = 0;
        while let Some(at) = self.queue.pop_front() {
            space += 1;
            let idx = self.slot(&at);
            let (dist, first) = (self.distance[idx], self.direction[idx]);
            for (_, next) in board.neighbors_in(&at, order) {
                let n = self.slot(&next);
                if self.distance[n] == UNREACHABLE {
                    self.distance[n] = dist + 1;
                    self.direction[n] = first;
                    if board.cell(&next).is_traversable() {
                        self.queue.push_back(next);
                    }
                }
            }
        }
        space
    }

    /// Food at the smallest flood-fill distance from my head whose first
    /// move is one of `allowed`
    ///
    /// Allowed directions are tried first so that they win ties on the first
    /// move label. Empty when no such food is reachable.
    pub fn closest_food(&mut self, board: &BoardModel, allowed: &[Direction]) -> Vec<Coord> {
        let mut order: Vec<Direction> = allowed.to_vec();
        order.extend(Direction::all().into_iter().filter(|d| !allowed.contains(d)));
        let head = board.my_agent().head();
        self.get_distance_ordered(board, &head, &order);

        let mut best = UNREACHABLE;
        let mut found = Vec::new();
        for food in board.food() {
            let (Some(dist), Some(dir)) = (self.distance(food), self.direction(food)) else {
                continue;
            };
            if !allowed.contains(&dir) || dist > best {
                continue;
            }
            if dist < best {
                best = dist;
                found.clear();
            }
            found.push(*food);
        }
        found
    }

    /// Corner and wall gradient, combined with the existing weight by max
    pub fn avoid_corners(&self, board: &BoardModel, map: &mut WeightMap) {
        let rings = &self.weights.corner_rings;
        let (w, h) = (board.width(), board.height());
        for y in 0..h {
            for x in 0..w {
                let dx = x.min(w - 1 - x);
                let dy = y.min(h - 1 - y);
                let at = Coord::new(x as i32, y as i32);
                if dy < rings.len() {
                    map.raise(&at, rings[dy][dx.min(3)]);
                }
                if dx < rings.len() {
                    map.raise(&at, rings[dx][dy.min(3)]);
                }
            }
        }
    }

    /// Penalties around rival heads and every trunk segment
    ///
    /// Cells next to the head of a rival at least as long as me get
    /// `rival_head_danger`. Each non-tail segment then radiates a decaying
    /// penalty (levels, levels - 1, ...) along the (up, left) and
    /// (down, right) direction pairs; the ring does not continue through
    /// blocked cells. The sum is rounded to two decimals.
    pub fn avoid_snakes(&self, board: &BoardModel, map: &mut WeightMap) {
        let mut penalty = WeightMap::new(board.width(), board.height());
        let my_length = board.my_agent().length();

        for (_, rival) in board.alive_rivals() {
            if rival.length() >= my_length {
                for (_, next) in board.neighbors(&rival.head()) {
                    let idx = penalty.index(&next);
                    penalty.cells[idx] += self.weights.rival_head_danger;
                }
            }
        }

        let levels = self.weights.body_ring_levels as usize;
        for (_, agent) in board.alive_agents() {
            for seg in agent.body.iter().take(agent.length().saturating_sub(1)) {
                for pair in &BODY_RING_PAIRS {
                    Self::radiate(board, map, &mut penalty, seg, pair, 0, levels);
                }
            }
        }

        for y in 0..board.height() as i32 {
            for x in 0..board.width() as i32 {
                let at = Coord::new(x, y);
                map.add_rounded(&at, round_to(penalty.get(&at), 2), 2);
            }
        }
    }

    fn radiate(
        board: &BoardModel,
        map: &WeightMap,
        penalty: &mut WeightMap,
        from: &Coord,
        pair: &[Direction],
        level: usize,
        levels: usize,
    ) {
        if level >= levels {
            return;
        }
        for (_, next) in board.neighbors_in(from, pair) {
            let idx = penalty.index(&next);
            penalty.cells[idx] += (levels - level) as f64;
            if !map.is_blocked(&next) {
                Self::radiate(board, map, penalty, &next, pair, level + 1, levels);
            }
        }
    }

    /// Food attraction gradient, scaled by `coef`
    ///
    /// Each food cell gets `food_unit_weight * coef`, and rings around it get
    /// `unit + level * food_ring_step + food_ring_offset` wherever that is
    /// lower than what the cell already holds. While my health is above
    /// `food_contest_health`, food one step from a rival head is skipped.
    /// The result is added to every non-BLOCKED cell, rounded to one decimal.
    pub fn detect_food(&self, board: &BoardModel, map: &mut WeightMap, coef: f64) {
        let cfg = &self.weights;
        let unit = cfg.food_unit_weight * coef;
        let my_health = board.my_agent().health;
        let mut attraction = WeightMap::new(board.width(), board.height());
        let mut queue: VecDeque<(u8, Coord)> = VecDeque::new();

        for food in board.food() {
            let contested = my_health > cfg.food_contest_health
                && board
                    .neighbors(food)
                    .any(|(_, n)| matches!(board.cell(&n), Cell::RivalHead { .. }));
            if contested {
                continue;
            }
            let idx = attraction.index(food);
            attraction.cells[idx] = attraction.cells[idx].min(unit);
            queue.push_back((0, *food));
        }

        while let Some((level, at)) = queue.pop_front() {
            if level >= cfg.food_rings {
                continue;
            }
            let value = unit + (f64::from(level) * cfg.food_ring_step + cfg.food_ring_offset);
            for (_, next) in board.neighbors(&at) {
                let idx = attraction.index(&next);
                if value < attraction.cells[idx] {
                    attraction.cells[idx] = value;
                    queue.push_back((level + 1, next));
                }
            }
        }

        for y in 0..board.height() as i32 {
            for x in 0..board.width() as i32 {
                let at = Coord::new(x, y);
                map.add_rounded(&at, attraction.get(&at), 1);
            }
        }
    }

    /// Reserved for rival attack and defence weighting; leaves the map as is
    pub fn attack_rivals(&self, _board: &BoardModel, _map: &mut WeightMap) {}

    /// Food urgency: higher when hungry, maximal when any rival is at least
    /// as healthy as me
    pub fn food_coefficient(&self, board: &BoardModel) -> f64 {
        let cfg = &self.weights;
        let health = board.my_agent().health;
        if board.alive_rivals().any(|(_, r)| r.health >= health) {
            return cfg.contested_food_coefficient;
        }
        cfg.food_health_thresholds
            .iter()
            .zip(&cfg.food_coefficients)
            .find(|(threshold, _)| health <= **threshold)
            .or_else(|| {
                cfg.food_health_thresholds
                    .last()
                    .zip(cfg.food_coefficients.last())
            })
            .map(|(_, coef)| *coef)
            .unwrap_or(1.0)
    }

    /// Full weight map for the current board
    ///
    /// Occupied cells are BLOCKED first, then the corner, snake and food
    /// passes run in that order.
    pub fn get_weights(&self, board: &BoardModel) -> WeightMap {
        let mut map = WeightMap::new(board.width(), board.height());
        for y in 0..board.height() as i32 {
            for x in 0..board.width() as i32 {
                let at = Coord::new(x, y);
                if board.cell(&at).is_snake() {
                    map.set(&at, BLOCKED);
                }
            }
        }

        self.avoid_corners(board, &mut map);
        self.avoid_snakes(board, &mut map);
        self.detect_food(board, &mut map, self.food_coefficient(board));
        self.attack_rivals(board, &mut map);
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::types::{Battlesnake, Board};

    fn snake(id: &str, body: &[(i32, i32)], health: i32) -> Battlesnake {
        Battlesnake::from_body(id, body.iter().map(|&(x, y)| Coord::new(x, y)).collect(), health)
    }

    fn model(width: i32, height: i32, food: &[(i32, i32)], snakes: Vec<Battlesnake>) -> BoardModel {
        let board = Board {
            width,
            height,
            food: food.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
            snakes,
            hazards: vec![],
        };
        BoardModel::from_snapshot(&board, "me", &Config::default_hardcoded()).unwrap()
    }

    fn analyzer() -> SpatialAnalyzer {
        SpatialAnalyzer::new(Config::default_hardcoded().weights)
    }

    #[test]
    fn test_flood_fill_counts_open_space_and_marks_blocked_edge() {
        // me in the middle of a 5x5, a wall of my own body to the south
        let m = model(5, 5, &[], vec![snake("me", &[(2, 2), (2, 1), (2, 0)], 90)]);
        let mut sa = analyzer();
        let space = sa.get_distance(&m, &Coord::new(2, 2));

        // 25 cells minus head and one trunk segment (the tail is free)
        assert_eq!(space, 23);
        assert_eq!(sa.distance(&Coord::new(2, 2)), Some(0));
        assert_eq!(sa.distance(&Coord::new(2, 1)), Some(1));
        assert_eq!(sa.direction(&Coord::new(2, 1)), Some(Direction::Down));
        assert_eq!(sa.direction(&Coord::new(2, 4)), Some(Direction::Up));
    }

    #[test]
    fn test_flood_fill_leaves_sealed_area_unreachable() {
        // corner pocket at (0,0) sealed by a rival trunk
        let m = model(
            5,
            5,
            &[],
            vec![
                snake("me", &[(4, 4), (4, 3)], 90),
                snake("rival", &[(0, 1), (1, 1), (1, 0), (2, 0)], 90),
            ],
        );
        let mut sa = analyzer();
        sa.get_distance(&m, &Coord::new(4, 4));
        assert_eq!(sa.distance(&Coord::new(0, 0)), None);
        assert!(sa.distance(&Coord::new(1, 1)).is_some());
    }

    #[test]
    fn test_closest_food_respects_allowed_directions() {
        let m = model(
            7,
            7,
            &[(3, 5), (3, 1)],
            vec![snake("me", &[(3, 3), (2, 3), (1, 3)], 90)],
        );
        let mut sa = analyzer();
        assert_eq!(sa.closest_food(&m, &[Direction::Up]), vec![Coord::new(3, 5)]);
        assert_eq!(sa.closest_food(&m, &[Direction::Down]), vec![Coord::new(3, 1)]);
        let both = sa.closest_food(&m, &[Direction::Up, Direction::Down]);
        assert_eq!(both.len(), 2);
        assert!(sa.closest_food(&m, &[]).is_empty());
    }

    #[test]
    fn test_corner_gradient() {
        let m = model(11, 11, &[], vec![snake("me", &[(5, 5)], 90)]);
        let sa = analyzer();
        let mut map = WeightMap::new(11, 11);
        sa.avoid_corners(&m, &mut map);

        assert_eq!(map.get(&Coord::new(0, 0)), 7.0);
        assert_eq!(map.get(&Coord::new(10, 10)), 7.0);
        assert_eq!(map.get(&Coord::new(1, 0)), 5.0);
        assert_eq!(map.get(&Coord::new(5, 0)), 3.0);
        assert_eq!(map.get(&Coord::new(5, 2)), 1.0);
        assert_eq!(map.get(&Coord::new(5, 5)), 0.0);
    }

    #[test]
    fn test_occupied_cells_stay_blocked_through_all_passes() {
        let m = model(
            7,
            7,
            &[(3, 4)],
            vec![
                snake("me", &[(3, 3), (3, 2), (3, 1)], 5),
                snake("rival", &[(3, 5), (4, 5), (5, 5), (6, 5)], 90),
            ],
        );
        let map = analyzer().get_weights(&m);
        for c in [(3, 3), (3, 2), (3, 5), (4, 5), (5, 5)] {
            assert!(map.is_blocked(&Coord::new(c.0, c.1)), "{:?} should be blocked", c);
        }
        assert!(!map.is_blocked(&Coord::new(3, 1)));
        assert!(!map.is_blocked(&Coord::new(6, 5)));
    }

    #[test]
    fn test_food_pulls_weight_down_and_rival_head_pushes_it_up() {
        let m = model(
            11,
            11,
            &[(5, 8)],
            vec![
                snake("me", &[(5, 5), (5, 4), (5, 3)], 50),
                snake("rival", &[(8, 5), (9, 5), (9, 4), (9, 3)], 40),
            ],
        );
        let map = analyzer().get_weights(&m);
        assert!(map.get(&Coord::new(5, 8)) < 0.0);
        assert!(map.get(&Coord::new(5, 8)) < map.get(&Coord::new(5, 7)));
        assert!(map.get(&Coord::new(7, 5)) >= 4.0);
    }

    #[test]
    fn test_body_rings_decay_and_stop_at_blocked_cells() {
        let m = model(7, 7, &[], vec![snake("me", &[(3, 3), (3, 2), (3, 1)], 90)]);
        let mut map = WeightMap::new(7, 7);
        for c in [Coord::new(3, 3), Coord::new(3, 2)] {
            map.set(&c, BLOCKED);
        }
        analyzer().avoid_snakes(&m, &mut map);

        // (3, 4) and (2, 3) would gain another point each if the ring of
        // (3, 2) carried on through the head above it
        let expected = [
            ((3, 4), 2.0),
            ((3, 5), 1.0),
            ((2, 4), 2.0),
            ((2, 3), 3.0),
            ((1, 3), 1.0),
            ((4, 3), 2.0),
            ((4, 2), 3.0),
            ((5, 3), 1.0),
            ((2, 2), 2.0),
            ((1, 2), 1.0),
            ((3, 1), 2.0),
            ((3, 0), 1.0),
            ((4, 1), 2.0),
            ((5, 2), 1.0),
        ];
        for y in 0..7 {
            for x in 0..7 {
                let at = Coord::new(x, y);
                let want = if (x, y) == (3, 3) || (x, y) == (3, 2) {
                    BLOCKED
                } else {
                    expected
                        .iter()
                        .find(|(c, _)| *c == (x, y))
                        .map_or(0.0, |(_, w)| *w)
                };
                assert_eq!(map.get(&at), want, "cell ({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_contested_food_is_ignored_unless_starving() {
        let snakes = |health| {
            vec![
                snake("me", &[(1, 1), (1, 0)], health),
                snake("rival", &[(5, 4), (6, 4), (7, 4)], 30),
            ]
        };
        let sa = analyzer();

        let fed = model(11, 11, &[(5, 5)], snakes(50));
        let mut map = WeightMap::new(11, 11);
        sa.detect_food(&fed, &mut map, 1.0);
        assert_eq!(map.get(&Coord::new(5, 5)), 0.0);

        let starving = model(11, 11, &[(5, 5)], snakes(5));
        let mut map = WeightMap::new(11, 11);
        sa.detect_food(&starving, &mut map, 1.0);
        assert_eq!(map.get(&Coord::new(5, 5)), -6.4);
        assert_eq!(map.get(&Coord::new(5, 6)), -4.0);
        assert_eq!(map.get(&Coord::new(5, 7)), -2.4);
    }

    #[test]
    fn test_food_coefficient_by_health_and_rivals() {
        let sa = analyzer();
        let alone = |health| model(7, 7, &[], vec![snake("me", &[(3, 3)], health)]);
        assert_eq!(sa.food_coefficient(&alone(10)), 1.6);
        assert_eq!(sa.food_coefficient(&alone(30)), 1.2);
        assert_eq!(sa.food_coefficient(&alone(90)), 1.0);

        let rivalled = model(
            7,
            7,
            &[],
            vec![snake("me", &[(3, 3)], 90), snake("rival", &[(0, 0)], 95)],
        );
        assert_eq!(sa.food_coefficient(&rivalled), 1.6);
    }
}
