// Weighted path planner: a depth-bounded DFS over the weight map.
//
// Among all simple paths of up to `horizon` steps from my head through
// non-BLOCKED cells, prefer the one that visits the most cells, then the one
// with the lowest summed weight, then the one whose first step is cheapest.

use crate::board::BoardModel;
use crate::spatial::WeightMap;
use crate::types::{Coord, Direction};

/// One node of a planned path
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathNode {
    /// Where the path begins (my head)
    Start(Coord),
    Step { weight: f64, at: Coord },
}

/// Best first move according to the planner, with the path backing it
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedMove {
    pub direction: Direction,
    /// Sum of the weights of every step after the start
    pub total_weight: f64,
    pub path: Vec<PathNode>,
}

/// Best continuation found below one node
struct Branch {
    total: f64,
    step: f64,
    cells: Vec<Coord>,
}

impl Branch {
    fn beats(&self, best: Option<&Branch>) -> bool {
        match best {
            None => true,
            Some(best) => {
                self.cells.len() > best.cells.len()
                    || (self.cells.len() == best.cells.len()
                        && (self.total < best.total
                            || (self.total == best.total && self.step < best.step)))
            }
        }
    }
}

/// Explores every simple path of `remaining` more steps below the last
/// visited cell; returns the summed weight below it and the full cell list
fn explore(
    board: &BoardModel,
    weights: &WeightMap,
    remaining: u8,
    visited: &mut Vec<Coord>,
) -> (f64, Vec<Coord>) {
    let Some(&at) = visited.last() else {
        return (0.0, Vec::new());
    };
    if remaining == 0 {
        return (0.0, visited.clone());
    }

    let mut best: Option<Branch> = None;
    for (_, next) in board.neighbors(&at) {
        if weights.is_blocked(&next) || visited.contains(&next) {
            continue;
        }
        let step = weights.get(&next);
        visited.push(next);
        let (below, cells) = explore(board, weights, remaining - 1, visited);
        visited.pop();

        let branch = Branch {
            total: below + step,
            step,
            cells,
        };
        if branch.beats(best.as_ref()) {
            best = Some(branch);
        }
    }

    match best {
        Some(branch) => (branch.total, branch.cells),
        None => (0.0, visited.clone()),
    }
}

/// Plans my next move over `weights`
///
/// # Arguments
/// * `board` - Current board (only my head and the grid bounds are used)
/// * `weights` - Weight map from [`crate::spatial::SpatialAnalyzer::get_weights`]
/// * `horizon` - Maximum number of steps looked ahead (at least one)
///
/// # Returns
/// * `Option<PlannedMove>` - `None` when every neighbour of my head is BLOCKED
pub fn plan(board: &BoardModel, weights: &WeightMap, horizon: u8) -> Option<PlannedMove> {
    let head = board.my_agent().head();
    let horizon = horizon.max(1);

    let mut best: Option<(Direction, Branch)> = None;
    for (dir, next) in board.neighbors(&head) {
        if weights.is_blocked(&next) {
            continue;
        }
        let step = weights.get(&next);
        let mut visited = vec![head, next];
        let (below, cells) = explore(board, weights, horizon - 1, &mut visited);
        let branch = Branch {
            total: below + step,
            step,
            cells,
        };

        if branch.beats(best.as_ref().map(|(_, b)| b)) {
            best = Some((dir, branch));
        }
    }

    best.map(|(direction, branch)| {
        let path = branch
            .cells
            .iter()
            .enumerate()
            .map(|(i, at)| {
                if i == 0 {
                    PathNode::Start(*at)
                } else {
                    PathNode::Step {
                        weight: weights.get(at),
                        at: *at,
                    }
                }
            })
            .collect();
        PlannedMove {
            direction,
            total_weight: branch.total,
            path,
        }
    })
}
