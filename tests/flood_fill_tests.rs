// Property tests for the flood fill against a brute-force relaxation.
//
// Boards are built from single-cell snakes (each one blocks its cell) plus
// food, on random sizes; the fill must agree with repeated relaxation on
// every cell's distance and on the amount of open space.

use std::collections::BTreeSet;

use proptest::prelude::*;

use alphabeta_snake::board::BoardModel;
use alphabeta_snake::config::Config;
use alphabeta_snake::spatial::SpatialAnalyzer;
use alphabeta_snake::types::{Battlesnake, Board, Coord};

fn layout() -> impl Strategy<Value = (i32, i32, Vec<(i32, i32)>, usize)> {
    (2i32..9, 2i32..9).prop_flat_map(|(w, h)| {
        let cells = (w * h) as usize;
        (
            Just(w),
            Just(h),
            prop::collection::btree_set((0..w, 0..h), 1..cells.min(24)),
        )
            .prop_flat_map(|(w, h, set)| {
                let occupied: Vec<(i32, i32)> = set.into_iter().collect();
                let n = occupied.len();
                (Just(w), Just(h), Just(occupied).prop_shuffle(), 0..=n.saturating_sub(1))
            })
    })
}

/// Distances by relaxation until nothing changes; blocked cells are reached
/// but never relaxed further
fn reference(board: &BoardModel, source: Coord) -> (Vec<Option<usize>>, usize) {
    let (w, h) = (board.width() as i32, board.height() as i32);
    let idx = |c: &Coord| (c.y * w + c.x) as usize;
    let mut dist: Vec<Option<usize>> = vec![None; (w * h) as usize];
    dist[idx(&source)] = Some(0);

    let mut changed = true;
    while changed {
        changed = false;
        for y in 0..h {
            for x in 0..w {
                let at = Coord::new(x, y);
                let Some(d) = dist[idx(&at)] else { continue };
                if at != source && !board.cell(&at).is_traversable() {
                    continue;
                }
                for (_, next) in board.neighbors(&at) {
                    let slot = idx(&next);
                    if dist[slot].map_or(true, |old| d + 1 < old) {
                        dist[slot] = Some(d + 1);
                        changed = true;
                    }
                }
            }
        }
    }

    let space = (0..h)
        .flat_map(|y| (0..w).map(move |x| Coord::new(x, y)))
        .filter(|c| *c != source && board.cell(c).is_traversable() && dist[idx(c)].is_some())
        .count();
    (dist, space)
}

proptest! {
    #[test]
    fn flood_fill_matches_relaxation((w, h, occupied, food_from) in layout()) {
        // first cell is me, cells before `food_from` are rivals, the rest food
        let food_from = food_from.max(1);
        let snakes: Vec<Battlesnake> = occupied[..food_from.min(occupied.len())]
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let id = if i == 0 { "me".to_string() } else { format!("r{}", i) };
                Battlesnake::from_body(&id, vec![Coord::new(x, y)], 90)
            })
            .collect();
        let food: Vec<Coord> = occupied[food_from.min(occupied.len())..]
            .iter()
            .map(|&(x, y)| Coord::new(x, y))
            .collect();
        let board = Board { width: w, height: h, food, snakes, hazards: vec![] };
        let model = BoardModel::from_snapshot(&board, "me", &Config::default_hardcoded()).unwrap();

        let source = model.my_agent().head();
        let mut analyzer = SpatialAnalyzer::new(Config::default_hardcoded().weights);
        let space = analyzer.get_distance(&model, &source);
        let (expected, expected_space) = reference(&model, source);

        prop_assert_eq!(space, expected_space);
        for y in 0..h {
            for x in 0..w {
                let at = Coord::new(x, y);
                prop_assert_eq!(analyzer.distance(&at), expected[(y * w + x) as usize], "cell {:?}", at);
            }
        }
    }

    #[test]
    fn every_reached_cell_has_a_first_move((w, h, occupied, _) in layout()) {
        let snakes = vec![Battlesnake::from_body("me", vec![Coord::new(occupied[0].0, occupied[0].1)], 90)];
        let board = Board { width: w, height: h, food: vec![], snakes, hazards: vec![] };
        let model = BoardModel::from_snapshot(&board, "me", &Config::default_hardcoded()).unwrap();
        let source = model.my_agent().head();

        let mut analyzer = SpatialAnalyzer::new(Config::default_hardcoded().weights);
        let space = analyzer.get_distance(&model, &source);
        prop_assert_eq!(space, (w * h) as usize - 1);

        let reached: BTreeSet<(i32, i32)> = (0..h)
            .flat_map(|y| (0..w).map(move |x| (x, y)))
            .filter(|&(x, y)| (x, y) != (source.x, source.y))
            .filter(|&(x, y)| analyzer.direction(&Coord::new(x, y)).is_some())
            .collect();
        prop_assert_eq!(reached.len(), (w * h) as usize - 1);
    }
}
