// Board model: the typed grid and agent list for one decision cycle.
//
// The model is decoded once from the API snapshot and then owned by a single
// search. Simulated moves mutate it in place and return an undo record that
// restores the exact previous state, including eliminated agents.

use std::collections::{HashMap, VecDeque};

use crate::config::Config;
use crate::error::BoardError;
use crate::types::{Board, Coord, Direction};

/// Occupant of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    /// A trunk segment of any agent, the controlled one included
    Body,
    RivalHead { agent: usize, length: usize },
    OwnHead { agent: usize, length: usize },
    Food,
}

impl Cell {
    /// Empty and Food cells can be walked through by the flood fill
    pub fn is_traversable(&self) -> bool {
        matches!(self, Cell::Empty | Cell::Food)
    }

    /// Body or head of any agent
    pub fn is_snake(&self) -> bool {
        matches!(
            self,
            Cell::Body | Cell::RivalHead { .. } | Cell::OwnHead { .. }
        )
    }

    /// Owning agent and length when the cell is a head
    pub fn head(&self) -> Option<(usize, usize)> {
        match *self {
            Cell::RivalHead { agent, length } | Cell::OwnHead { agent, length } => {
                Some((agent, length))
            }
            _ => None,
        }
    }
}

/// One agent's state: body from head (index 0) to tail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub body: VecDeque<Coord>,
    pub health: i32,
}

impl Agent {
    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn length(&self) -> usize {
        self.body.len()
    }

    /// Segments that occupy their cell this tick: everything but the tail.
    /// A single-segment agent still occupies its head.
    pub fn trunk(&self) -> impl Iterator<Item = &Coord> {
        self.body.iter().take(self.body.len().saturating_sub(1).max(1))
    }
}

/// A single cell transition caused by a simulated move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellChange {
    pub at: Coord,
    pub before: Cell,
    pub after: Cell,
}

/// Everything needed to take back one simulated move
#[derive(Debug, Clone)]
pub struct MoveUndo {
    pub agent: usize,
    /// Cell changes of the mover's own step
    pub step: Vec<CellChange>,
    /// Cells cleared by eliminations the step caused
    pub removed: Vec<CellChange>,
    pub eliminated: Vec<usize>,
    popped_tail: Option<Coord>,
    health: i32,
    eaten_food: Option<(usize, Coord)>,
}

impl MoveUndo {
    /// True when the move eliminated at least one agent other than the mover
    pub fn eliminated_other(&self) -> bool {
        self.eliminated.iter().any(|&a| a != self.agent)
    }
}

/// Undo record for an agent removed without moving (trapped rival)
#[derive(Debug, Clone)]
pub struct RemovalUndo {
    pub agent: usize,
    pub removed: Vec<CellChange>,
}

/// Health rules applied by simulated moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HealthRules {
    on_food: i32,
    loss_per_turn: i32,
}

/// Typed board plus agents for one decision cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardModel {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    agents: Vec<Agent>,
    alive: Vec<bool>,
    food: Vec<Coord>,
    me: usize,
    rules: HealthRules,
}

impl BoardModel {
    /// Decodes an API snapshot
    ///
    /// # Arguments
    /// * `board` - Board from the move request
    /// * `you_id` - Id of the controlled snake
    /// * `config` - Supplies health rules and the largest supported board
    ///
    /// # Returns
    /// * `Result<BoardModel, BoardError>` - Model, or why the snapshot is malformed
    pub fn from_snapshot(board: &Board, you_id: &str, config: &Config) -> Result<Self, BoardError> {
        let max_width = config.zobrist.max_width;
        let max_height = config.zobrist.max_height;
        if board.width <= 0
            || board.height <= 0
            || board.width as usize > max_width
            || board.height as usize > max_height
        {
            return Err(BoardError::TooLarge {
                width: board.width,
                height: board.height,
                max_width,
                max_height,
            });
        }

        let width = board.width as usize;
        let height = board.height as usize;
        let mut model = BoardModel {
            width,
            height,
            cells: vec![Cell::Empty; width * height],
            agents: Vec::with_capacity(board.snakes.len()),
            alive: vec![true; board.snakes.len()],
            food: Vec::with_capacity(board.food.len()),
            me: usize::MAX,
            rules: HealthRules {
                on_food: config.game_rules.health_on_food,
                loss_per_turn: config.game_rules.health_loss_per_turn,
            },
        };

        let mut seen_ids: HashMap<&str, usize> = HashMap::new();
        for (idx, snake) in board.snakes.iter().enumerate() {
            if seen_ids.insert(snake.id.as_str(), idx).is_some() {
                return Err(BoardError::DuplicateId(snake.id.clone()));
            }
            if snake.body.is_empty() {
                return Err(BoardError::EmptyBody(snake.id.clone()));
            }
            if let Some(bad) = snake.body.iter().find(|c| !model.in_bounds(c)) {
                return Err(BoardError::out_of_bounds(*bad));
            }
            if snake.id == you_id {
                model.me = idx;
            }
            model.agents.push(Agent {
                id: snake.id.clone(),
                body: snake.body.iter().copied().collect(),
                health: snake.health,
            });
        }

        if model.me == usize::MAX {
            return Err(BoardError::MissingControlled(you_id.to_string()));
        }

        // Trunks below the head first, so that a head landing on someone
        // else's trunk is an overlap and two heads on one cell a collision
        let mut owner: Vec<Option<usize>> = vec![None; width * height];
        for (idx, agent) in model.agents.iter().enumerate() {
            for seg in agent.trunk().skip(1) {
                let cell = model.index(seg);
                match owner[cell] {
                    Some(other) if other != idx => return Err(BoardError::overlap(*seg)),
                    _ => {
                        owner[cell] = Some(idx);
                        model.cells[cell] = Cell::Body;
                    }
                }
            }
        }

        for idx in 0..model.agents.len() {
            let head = model.agents[idx].head();
            let cell = model.index(&head);
            if let Some((other, _)) = model.cells[cell].head() {
                return Err(BoardError::HeadCollision(
                    model.agents[other].id.clone(),
                    model.agents[idx].id.clone(),
                ));
            }
            if matches!(owner[cell], Some(other) if other != idx) {
                return Err(BoardError::overlap(head));
            }
            model.cells[cell] = model.head_cell(idx, model.agents[idx].length());
        }

        for food in &board.food {
            if !model.in_bounds(food) {
                return Err(BoardError::out_of_bounds(*food));
            }
            let cell = model.index(food);
            match model.cells[cell] {
                Cell::Empty => {
                    model.cells[cell] = Cell::Food;
                    model.food.push(*food);
                }
                Cell::Food => {}
                _ => return Err(BoardError::overlap(*food)),
            }
        }

        Ok(model)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, c: &Coord) -> bool {
        c.x >= 0 && c.y >= 0 && (c.x as usize) < self.width && (c.y as usize) < self.height
    }

    /// Row-major index of an in-bounds coordinate
    pub fn index(&self, c: &Coord) -> usize {
        c.y as usize * self.width + c.x as usize
    }

    pub fn cell(&self, c: &Coord) -> Cell {
        self.cells[self.index(c)]
    }

    /// In-bound neighbours in `Direction::all()` order
    pub fn neighbors(&self, c: &Coord) -> impl Iterator<Item = (Direction, Coord)> + '_ {
        let origin = *c;
        Direction::all()
            .into_iter()
            .map(move |dir| (dir, dir.apply(&origin)))
            .filter(move |(_, next)| self.in_bounds(next))
    }

    /// Same as [`BoardModel::neighbors`] with a caller-chosen direction order
    pub fn neighbors_in<'a>(
        &'a self,
        c: &Coord,
        order: &'a [Direction],
    ) -> impl Iterator<Item = (Direction, Coord)> + 'a {
        let origin = *c;
        order
            .iter()
            .map(move |dir| (*dir, dir.apply(&origin)))
            .filter(move |(_, next)| self.in_bounds(next))
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, idx: usize) -> &Agent {
        &self.agents[idx]
    }

    /// Index of the controlled agent
    pub fn me(&self) -> usize {
        self.me
    }

    pub fn my_agent(&self) -> &Agent {
        &self.agents[self.me]
    }

    pub fn is_alive(&self, idx: usize) -> bool {
        self.alive[idx]
    }

    pub fn alive_flags(&self) -> &[bool] {
        &self.alive
    }

    /// Living agents with their indices
    pub fn alive_agents(&self) -> impl Iterator<Item = (usize, &Agent)> {
        self.agents
            .iter()
            .enumerate()
            .filter(move |(idx, _)| self.alive[*idx])
    }

    /// Living agents other than the controlled one
    pub fn alive_rivals(&self) -> impl Iterator<Item = (usize, &Agent)> {
        let me = self.me;
        self.alive_agents().filter(move |(idx, _)| *idx != me)
    }

    /// Number of rivals no longer alive in this (simulated) state
    pub fn eliminated_rivals(&self) -> usize {
        self.alive
            .iter()
            .enumerate()
            .filter(|(idx, alive)| *idx != self.me && !**alive)
            .count()
    }

    pub fn food(&self) -> &[Coord] {
        &self.food
    }

    /// Head cell value for an agent of the given length
    fn head_cell(&self, agent: usize, length: usize) -> Cell {
        if agent == self.me {
            Cell::OwnHead { agent, length }
        } else {
            Cell::RivalHead { agent, length }
        }
    }

    fn set(&mut self, c: &Coord, cell: Cell) {
        let idx = self.index(c);
        self.cells[idx] = cell;
    }

    /// Moving `agent` onto `to` loses immediately: a trunk segment, or the head
    /// of an agent at least as long
    pub fn is_dead_end(&self, agent: usize, to: &Coord) -> bool {
        match self.cell(to) {
            Cell::Body => true,
            cell => match cell.head() {
                Some((other, length)) => other != agent && length >= self.agents[agent].length(),
                None => false,
            },
        }
    }

    /// Directions that do not lose immediately, in `Direction::all()` order
    pub fn safe_moves(&self, agent: usize) -> Vec<Direction> {
        let head = self.agents[agent].head();
        self.neighbors(&head)
            .filter(|(_, next)| !self.is_dead_end(agent, next))
            .map(|(dir, _)| dir)
            .collect()
    }

    /// Cell changes caused by `agent` stepping onto `to`, computed on the
    /// current (pre-move) state. Eliminations are not included.
    pub fn plan_step(&self, agent: usize, to: &Coord) -> Vec<CellChange> {
        let mover = &self.agents[agent];
        let head = mover.head();
        let len = mover.length();
        let target = self.cell(to);
        let grows = target == Cell::Food;
        let new_len = if grows { len + 1 } else { len };

        let mut changes = Vec::with_capacity(3);
        changes.push(CellChange {
            at: *to,
            before: target,
            after: self.head_cell(agent, new_len),
        });

        // The old head stays part of the trunk unless it became the tail
        changes.push(CellChange {
            at: head,
            before: self.cell(&head),
            after: if new_len >= 3 { Cell::Body } else { Cell::Empty },
        });

        // The second-to-last segment turns into the tail and frees its cell,
        // unless another trunk segment is stacked on it
        if !grows && len >= 3 {
            let vacated = mover.body[len - 2];
            if vacated != head && vacated != *to {
                let still_trunk = mover.body.iter().take(len - 2).any(|c| *c == vacated);
                let after = if still_trunk { Cell::Body } else { Cell::Empty };
                let before = self.cell(&vacated);
                if before != after {
                    changes.push(CellChange {
                        at: vacated,
                        before,
                        after,
                    });
                }
            }
        }

        changes
    }

    /// Simulates `agent` stepping onto `to`
    ///
    /// Applies the step, feeds or starves the mover, and resolves eliminations:
    /// a shorter agent whose head is captured, and the mover itself when its
    /// health runs out. `to` must not be a dead end for the mover.
    pub fn apply_move(&mut self, agent: usize, to: &Coord) -> MoveUndo {
        debug_assert!(
            !self.is_dead_end(agent, to),
            "apply_move called with a losing destination"
        );

        let step = self.plan_step(agent, to);
        let target = self.cell(to);
        let grows = target == Cell::Food;
        let old_len = self.agents[agent].length();
        let health = self.agents[agent].health;

        for change in &step {
            self.set(&change.at, change.after);
        }

        let rules = self.rules;
        let mover = &mut self.agents[agent];
        mover.body.push_front(*to);
        let popped_tail = if grows { None } else { mover.body.pop_back() };
        mover.health = if grows {
            rules.on_food
        } else {
            health - rules.loss_per_turn
        };
        let starved = mover.health <= 0;

        let eaten_food = if grows {
            self.food
                .iter()
                .position(|f| f == to)
                .map(|idx| (idx, self.food.remove(idx)))
        } else {
            None
        };

        let mut undo = MoveUndo {
            agent,
            step,
            removed: Vec::new(),
            eliminated: Vec::new(),
            popped_tail,
            health,
            eaten_food,
        };

        if let Some((victim, length)) = target.head() {
            if victim != agent && length < old_len {
                self.clear_agent(victim, &mut undo.removed);
                undo.eliminated.push(victim);
            }
        }
        if starved {
            self.clear_agent(agent, &mut undo.removed);
            undo.eliminated.push(agent);
        }

        undo
    }

    /// Takes back a move returned by [`BoardModel::apply_move`]
    pub fn revert(&mut self, undo: MoveUndo) {
        for change in undo.removed.iter().rev() {
            self.set(&change.at, change.before);
        }
        for idx in &undo.eliminated {
            self.alive[*idx] = true;
        }
        for change in undo.step.iter().rev() {
            self.set(&change.at, change.before);
        }

        let mover = &mut self.agents[undo.agent];
        mover.body.pop_front();
        if let Some(tail) = undo.popped_tail {
            mover.body.push_back(tail);
        }
        mover.health = undo.health;

        if let Some((idx, food)) = undo.eaten_food {
            self.food.insert(idx, food);
        }
    }

    /// Removes an agent from play without moving it (it had no safe move)
    pub fn remove_agent(&mut self, agent: usize) -> RemovalUndo {
        let mut removed = Vec::new();
        self.clear_agent(agent, &mut removed);
        RemovalUndo { agent, removed }
    }

    /// Takes back [`BoardModel::remove_agent`]
    pub fn restore_agent(&mut self, undo: RemovalUndo) {
        for change in undo.removed.iter().rev() {
            self.set(&change.at, change.before);
        }
        self.alive[undo.agent] = true;
    }

    /// Marks an agent dead and empties every cell it still holds
    fn clear_agent(&mut self, agent: usize, removed: &mut Vec<CellChange>) {
        self.alive[agent] = false;
        let segments: Vec<Coord> = self.agents[agent].trunk().copied().collect();
        for seg in segments {
            let before = self.cell(&seg);
            let owned = match before {
                Cell::Body => true,
                cell => matches!(cell.head(), Some((owner, _)) if owner == agent),
            };
            if owned {
                self.set(&seg, Cell::Empty);
                removed.push(CellChange {
                    at: seg,
                    before,
                    after: Cell::Empty,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Battlesnake;

    fn snake(id: &str, body: &[(i32, i32)], health: i32) -> Battlesnake {
        Battlesnake::from_body(id, body.iter().map(|&(x, y)| Coord::new(x, y)).collect(), health)
    }

    fn board(width: i32, height: i32, food: &[(i32, i32)], snakes: Vec<Battlesnake>) -> Board {
        Board {
            width,
            height,
            food: food.iter().map(|&(x, y)| Coord::new(x, y)).collect(),
            snakes,
            hazards: vec![],
        }
    }

    fn model(b: &Board) -> BoardModel {
        BoardModel::from_snapshot(b, "me", &Config::default_hardcoded()).unwrap()
    }

    #[test]
    fn test_snapshot_marks_trunk_heads_food_and_frees_tail() {
        let b = board(
            7,
            7,
            &[(5, 5)],
            vec![
                snake("me", &[(2, 2), (2, 1), (2, 0)], 90),
                snake("rival", &[(4, 4), (4, 3)], 80),
            ],
        );
        let m = model(&b);

        assert_eq!(m.cell(&Coord::new(2, 2)), Cell::OwnHead { agent: 0, length: 3 });
        assert_eq!(m.cell(&Coord::new(2, 1)), Cell::Body);
        assert_eq!(m.cell(&Coord::new(2, 0)), Cell::Empty);
        assert_eq!(m.cell(&Coord::new(4, 4)), Cell::RivalHead { agent: 1, length: 2 });
        assert_eq!(m.cell(&Coord::new(4, 3)), Cell::Empty);
        assert_eq!(m.cell(&Coord::new(5, 5)), Cell::Food);
        assert_eq!(m.me(), 0);
    }

    #[test]
    fn test_snapshot_rejects_out_of_bounds_segment() {
        let b = board(5, 5, &[], vec![snake("me", &[(4, 4), (5, 4)], 90)]);
        let err = BoardModel::from_snapshot(&b, "me", &Config::default_hardcoded()).unwrap_err();
        assert_eq!(err, BoardError::OutOfBounds { x: 5, y: 4 });
    }

    #[test]
    fn test_snapshot_rejects_shared_head_cell() {
        let b = board(
            5,
            5,
            &[],
            vec![snake("me", &[(2, 2), (2, 1)], 90), snake("rival", &[(2, 2), (3, 2)], 90)],
        );
        let err = BoardModel::from_snapshot(&b, "me", &Config::default_hardcoded()).unwrap_err();
        assert_eq!(err, BoardError::HeadCollision("me".into(), "rival".into()));
    }

    #[test]
    fn test_snapshot_rejects_head_on_rival_trunk() {
        let b = board(
            5,
            5,
            &[],
            vec![
                snake("me", &[(2, 2), (2, 1), (2, 0)], 90),
                snake("rival", &[(2, 1), (3, 1), (4, 1)], 90),
            ],
        );
        let err = BoardModel::from_snapshot(&b, "me", &Config::default_hardcoded()).unwrap_err();
        assert_eq!(err, BoardError::Overlap { x: 2, y: 1 });
    }

    #[test]
    fn test_snapshot_rejects_duplicate_ids_and_missing_controlled() {
        let dup = board(
            5,
            5,
            &[],
            vec![snake("me", &[(0, 0)], 90), snake("me", &[(3, 3)], 90)],
        );
        assert_eq!(
            BoardModel::from_snapshot(&dup, "me", &Config::default_hardcoded()).unwrap_err(),
            BoardError::DuplicateId("me".into())
        );

        let missing = board(5, 5, &[], vec![snake("rival", &[(3, 3)], 90)]);
        assert_eq!(
            BoardModel::from_snapshot(&missing, "me", &Config::default_hardcoded()).unwrap_err(),
            BoardError::MissingControlled("me".into())
        );
    }

    #[test]
    fn test_snapshot_rejects_oversized_board() {
        let b = board(30, 30, &[], vec![snake("me", &[(0, 0)], 90)]);
        assert!(matches!(
            BoardModel::from_snapshot(&b, "me", &Config::default_hardcoded()),
            Err(BoardError::TooLarge { .. })
        ));
    }

    #[test]
    fn test_safe_moves_skip_bodies_and_longer_heads() {
        let b = board(
            7,
            7,
            &[],
            vec![
                snake("me", &[(3, 3), (3, 2), (3, 1)], 90),
                snake("rival", &[(4, 3), (5, 3), (5, 2), (5, 1)], 90),
            ],
        );
        let m = model(&b);
        // down is our own neck, right is a longer head
        assert_eq!(m.safe_moves(0), vec![Direction::Up, Direction::Left]);
        // the rival may capture our shorter head
        assert!(m.safe_moves(1).contains(&Direction::Left));
    }

    #[test]
    fn test_apply_and_revert_restore_state_exactly() {
        let b = board(
            7,
            7,
            &[(3, 4)],
            vec![snake("me", &[(3, 3), (3, 2), (3, 1)], 50), snake("rival", &[(0, 6), (0, 5)], 50)],
        );
        let mut m = model(&b);
        let before = m.clone();

        let undo = m.apply_move(0, &Coord::new(3, 4));
        assert_eq!(m.agent(0).length(), 4);
        assert_eq!(m.agent(0).health, 100);
        assert!(m.food().is_empty());
        assert_eq!(m.cell(&Coord::new(3, 3)), Cell::Body);
        assert_eq!(m.cell(&Coord::new(3, 2)), Cell::Body);

        m.revert(undo);
        assert_eq!(m, before);
    }

    #[test]
    fn test_plain_step_frees_new_tail_cell() {
        let b = board(7, 7, &[], vec![snake("me", &[(3, 3), (3, 2), (3, 1)], 50)]);
        let mut m = model(&b);

        m.apply_move(0, &Coord::new(4, 3));
        assert_eq!(m.cell(&Coord::new(4, 3)), Cell::OwnHead { agent: 0, length: 3 });
        assert_eq!(m.cell(&Coord::new(3, 3)), Cell::Body);
        assert_eq!(m.cell(&Coord::new(3, 2)), Cell::Empty);
        assert_eq!(m.agent(0).health, 49);
    }

    #[test]
    fn test_stacked_start_keeps_trunk_cell() {
        let b = board(7, 7, &[], vec![snake("me", &[(1, 1), (1, 1), (1, 1)], 100)]);
        let mut m = model(&b);

        m.apply_move(0, &Coord::new(1, 2));
        assert_eq!(m.cell(&Coord::new(1, 1)), Cell::Body);
        assert_eq!(m.cell(&Coord::new(1, 2)), Cell::OwnHead { agent: 0, length: 3 });
    }

    #[test]
    fn test_capture_removes_shorter_rival_and_revert_restores_it() {
        let b = board(
            7,
            7,
            &[],
            vec![
                snake("me", &[(2, 3), (1, 3), (0, 3), (0, 2)], 90),
                snake("rival", &[(3, 3), (4, 3), (5, 3)], 90),
            ],
        );
        let mut m = model(&b);
        let before = m.clone();

        let undo = m.apply_move(0, &Coord::new(3, 3));
        assert!(!m.is_alive(1));
        assert!(undo.eliminated_other());
        assert_eq!(m.cell(&Coord::new(4, 3)), Cell::Empty);
        assert_eq!(m.cell(&Coord::new(3, 3)), Cell::OwnHead { agent: 0, length: 4 });
        assert_eq!(m.eliminated_rivals(), 1);

        m.revert(undo);
        assert_eq!(m, before);
    }

    #[test]
    fn test_starvation_eliminates_mover() {
        let b = board(7, 7, &[], vec![snake("me", &[(3, 3), (3, 2), (3, 1)], 1)]);
        let mut m = model(&b);

        let undo = m.apply_move(0, &Coord::new(3, 4));
        assert!(!m.is_alive(0));
        assert_eq!(m.cell(&Coord::new(3, 4)), Cell::Empty);
        assert_eq!(m.cell(&Coord::new(3, 3)), Cell::Empty);
        assert_eq!(undo.eliminated, vec![0]);
    }

    #[test]
    fn test_remove_and_restore_agent() {
        let b = board(
            7,
            7,
            &[],
            vec![snake("me", &[(0, 0)], 90), snake("rival", &[(4, 4), (4, 5), (4, 6)], 90)],
        );
        let mut m = model(&b);
        let before = m.clone();

        let undo = m.remove_agent(1);
        assert_eq!(m.cell(&Coord::new(4, 4)), Cell::Empty);
        assert_eq!(m.cell(&Coord::new(4, 5)), Cell::Empty);
        assert_eq!(m.alive_rivals().count(), 0);

        m.restore_agent(undo);
        assert_eq!(m, before);
    }
}
