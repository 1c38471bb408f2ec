//! Cascade engine: the swap -> resolve -> collapse -> refill loop, goals,
//! moves, power-ups and reshuffling.

use crate::board::{AlteredTiles, Board};
use crate::bonus::{self, Activation, chain_activation, classify};
use crate::config::LevelConfig;
use crate::error::{BoardError, EngineError};
use crate::hint::{self, Hint};
use crate::matcher::{self, MIN_MATCH, MatchesInfo, matches_at, matches_for};
use crate::scoring::{ScoreRules, step_score};
use crate::tile::{Bonus, BonusSet, FoodType, Pos, Tile};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info, warn};

/// Random draws per cell before falling back to the set of allowed types.
const CELL_RETRIES: u32 = 10;
/// Whole-board fills tried before giving up.
const BOARD_ATTEMPTS: u32 = 50;
/// Shuffles tried before giving up.
const SHUFFLE_ATTEMPTS: u32 = 100;

/// Engine state. A cascade always runs to completion inside one call, so
/// callers only ever observe `Idle`, `Win` or `Lose` between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Swapping,
    Resolving,
    Collapsing,
    Win,
    Lose,
}

impl Phase {
    pub fn is_over(self) -> bool {
        matches!(self, Self::Win | Self::Lose)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Swapping => "swapping",
            Self::Resolving => "resolving",
            Self::Collapsing => "collapsing",
            Self::Win => "win",
            Self::Lose => "lose",
        };
        f.write_str(s)
    }
}

/// Collect `needed` tiles of `food`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelGoal {
    pub food: FoodType,
    pub needed: u32,
    pub collected: u32,
}

impl LevelGoal {
    pub fn is_complete(&self) -> bool {
        self.collected >= self.needed
    }

    pub fn remaining(&self) -> u32 {
        self.needed.saturating_sub(self.collected)
    }
}

/// Receives one call per cleared tile.
pub trait CollectionSink {
    fn on_tile_collected(&mut self, food: FoodType);
}

/// Boosters applied to a target tile. None of them costs a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Powerup {
    /// The target tile.
    Knife,
    /// The target's row.
    HorizontalKnife,
    /// The target's column.
    VerticalKnife,
    /// 3x3 around the target.
    Pan,
    /// Every tile of the target's type.
    Oven,
    /// The target plus one homing pick.
    Flies,
    /// Reshuffle the board.
    Blender,
}

/// One clear step of a cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// 1 for the clear caused by the move, 2+ for chain reactions.
    pub combo_index: u32,
    /// Tiles removed from the board, in row-major order.
    pub cleared: Vec<Tile>,
    pub score_delta: u32,
    /// Bonus effects that fired in this step.
    pub triggered: BonusSet,
    /// Bonus tile promoted at the pivot in this step.
    pub created_bonus: Option<(Pos, Bonus)>,
    /// Tiles that fell or spawned afterwards.
    pub altered: AlteredTiles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeTrace {
    pub steps: Vec<StepReport>,
}

impl CascadeTrace {
    /// Number of tiles cleared per step.
    pub fn cleared_sizes(&self) -> Vec<usize> {
        self.steps.iter().map(|s| s.cleared.len()).collect()
    }

    pub fn total_score(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.score_delta)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Outcome of one player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// False when a swap made no match and was reversed.
    pub accepted: bool,
    /// What the action itself matched or activated, before any chain.
    pub matches: MatchesInfo,
    pub trace: CascadeTrace,
    /// Phase after the action.
    pub phase: Phase,
    /// The board has no move left and should be shuffled.
    pub needs_shuffle: bool,
}

/// Drives a board through a level. Generic over the randomness source so
/// tests and replays can fix the seed.
pub struct CascadeEngine<R: Rng = StdRng> {
    board: Board,
    palette: u8,
    phase: Phase,
    moves_left: u32,
    score: u64,
    goals: Vec<LevelGoal>,
    rules: ScoreRules,
    rng: R,
    sink: Option<Box<dyn CollectionSink>>,
}

impl<R: Rng> fmt::Debug for CascadeEngine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeEngine")
            .field("phase", &self.phase)
            .field("moves_left", &self.moves_left)
            .field("score", &self.score)
            .field("goals", &self.goals)
            .finish_non_exhaustive()
    }
}

impl CascadeEngine<StdRng> {
    /// Engine for `config`, seeded from `config.seed` or from entropy.
    pub fn new(config: &LevelConfig) -> Result<Self, EngineError> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, rng)
    }
}

impl<R: Rng> CascadeEngine<R> {
    /// Engine for `config` with a freshly generated board.
    pub fn with_rng(config: &LevelConfig, rng: R) -> Result<Self, EngineError> {
        let board = Board::new(config.rows, config.columns);
        let mut engine = Self::from_board(board, config, rng)?;
        engine.initialize_board()?;
        Ok(engine)
    }

    /// Engine playing a prepared board. Its size overrides `config`'s.
    pub fn from_board(board: Board, config: &LevelConfig, rng: R) -> Result<Self, EngineError> {
        config.validate()?;
        let palette = config.palette_size();
        if let Some(t) = board.tiles().find(|t| t.food.0 >= palette) {
            return Err(BoardError::Layout(format!(
                "tile {} at {} is outside the {palette}-food palette",
                t.food.letter(),
                t.pos
            ))
            .into());
        }
        let goals = config
            .goals
            .iter()
            .map(|g| {
                let food = config
                    .food_type(&g.food)
                    .ok_or_else(|| crate::error::ConfigError::UnknownGoalFood(g.food.clone()))?;
                Ok(LevelGoal {
                    food,
                    needed: g.amount,
                    collected: 0,
                })
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok(Self {
            board,
            palette,
            phase: Phase::Idle,
            moves_left: config.moves,
            score: 0,
            goals,
            rules: config.scoring,
            rng,
            sink: None,
        })
    }

    pub fn set_sink(&mut self, sink: Box<dyn CollectionSink>) {
        self.sink = Some(sink);
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn goals(&self) -> &[LevelGoal] {
        &self.goals
    }

    /// Fill the board with random tiles so that no line or square match
    /// exists and at least one move does.
    pub fn initialize_board(&mut self) -> Result<(), EngineError> {
        let (rows, columns) = (self.board.rows(), self.board.columns());
        for attempt in 1..=BOARD_ATTEMPTS {
            let Some(board) = self.fill_board(rows, columns)? else {
                debug!(attempt, "fill ran out of allowed types");
                continue;
            };
            if hint::is_deadlocked(&board) {
                debug!(attempt, "filled board has no move");
                continue;
            }
            self.board = board;
            self.phase = Phase::Idle;
            info!(rows, columns, attempt, "board initialized");
            return Ok(());
        }
        Err(EngineError::UnsatisfiableBoard {
            attempts: BOARD_ATTEMPTS,
        })
    }

    fn fill_board(&mut self, rows: usize, columns: usize) -> Result<Option<Board>, BoardError> {
        let mut board = Board::new(rows, columns);
        let positions: Vec<Pos> = board.positions().collect();
        for pos in positions {
            let mut food = (0..CELL_RETRIES)
                .map(|_| FoodType(self.rng.gen_range(0..self.palette)))
                .find(|&f| !completes_match(&board, pos, f));
            if food.is_none() {
                let allowed: Vec<FoodType> = (0..self.palette)
                    .map(FoodType)
                    .filter(|&f| !completes_match(&board, pos, f))
                    .collect();
                food = allowed.choose(&mut self.rng).copied();
            }
            let Some(food) = food else {
                return Ok(None);
            };
            board.place(pos, food, None)?;
        }
        Ok(Some(board))
    }

    fn ensure_playing(&self) -> Result<(), EngineError> {
        if self.phase.is_over() {
            Err(EngineError::GameOver)
        } else {
            Ok(())
        }
    }

    /// Swap the tile at `a` (the one the player touched) with its neighbour
    /// at `b` and resolve the result. A swap that neither matches nor
    /// triggers a bonus is reversed and reported with `accepted == false`.
    pub fn attempt_swap(&mut self, a: Pos, b: Pos) -> Result<TurnReport, EngineError> {
        self.ensure_playing()?;
        self.phase = Phase::Swapping;
        if let Err(e) = self.board.swap(a, b) {
            self.phase = Phase::Idle;
            return Err(e.into());
        }

        // The touched tile now sits at `b`, its partner at `a`.
        let seeds: Vec<(Pos, Option<Pos>)> = [(b, a), (a, b)]
            .into_iter()
            .filter(|&(p, _)| self.board.get(p).is_some_and(Tile::is_bonus))
            .map(|(p, partner)| (p, Some(partner)))
            .collect();
        let activation = if seeds.is_empty() {
            Activation::default()
        } else {
            let goal_foods = self.open_goal_foods();
            chain_activation(&self.board, &seeds, &BTreeSet::new(), &goal_foods, &mut self.rng)
        };

        self.phase = Phase::Resolving;
        let at_first = matches_at(&self.board, b);
        let at_second = matches_at(&self.board, a);
        let first_empty = at_first.is_empty();
        let mut matches = at_first;
        matches.merge(at_second);

        if matches.len() < MIN_MATCH && activation.activated.is_empty() {
            self.board.undo_last_swap()?;
            self.phase = Phase::Idle;
            debug!(%a, %b, "swap rejected");
            return Ok(TurnReport {
                accepted: false,
                matches: MatchesInfo::new(),
                trace: CascadeTrace::default(),
                phase: self.phase,
                needs_shuffle: false,
            });
        }

        self.board.commit_swap();
        self.moves_left = self.moves_left.saturating_sub(1);
        let pivot = if first_empty { a } else { b };
        let created = if matches.len() >= self.rules.min_match_for_bonus
            && !matches.bonuses().blocks_new_bonus()
            && !activation.triggered.blocks_new_bonus()
        {
            classify(&self.board, pivot).map(|grade| (pivot, grade))
        } else {
            None
        };
        debug!(%a, %b, matched = matches.len(), ?created, "swap accepted");

        let mut first: BTreeSet<Pos> = matches.position_set().clone();
        first.extend(activation.area.iter().copied());
        let mut reported = matches;
        reported.add_bonuses(activation.triggered);
        reported.add_positions(activation.area.iter().copied());

        let fired: BTreeSet<Pos> = activation.activated.iter().copied().collect();
        let trace = self.run_cascade(first, activation.triggered, fired, created)?;
        Ok(self.finish_turn(reported, trace))
    }

    /// Tap the bonus tile at `pos`. Costs a move. A color-clear takes its
    /// type from `partner`, else from its first plain orthogonal neighbour
    /// (up, right, down, left), else its own type.
    pub fn activate_bonus(&mut self, pos: Pos, partner: Option<Pos>) -> Result<TurnReport, EngineError> {
        self.ensure_playing()?;
        let grade = self.board.tile(pos)?.bonus.ok_or(EngineError::NotABonus(pos))?;
        if let Some(p) = partner {
            self.board.tile(p)?;
        }
        let partner = match (partner, grade) {
            (Some(p), _) => Some(p),
            (None, Bonus::ColorClear) => self.default_partner(pos),
            (None, _) => None,
        };

        self.phase = Phase::Resolving;
        self.moves_left = self.moves_left.saturating_sub(1);
        let goal_foods = self.open_goal_foods();
        let activation = chain_activation(&self.board, &[(pos, partner)], &BTreeSet::new(), &goal_foods, &mut self.rng);
        debug!(%pos, %grade, area = activation.area.len(), "bonus tapped");
        self.resolve_activation(activation)
    }

    /// Apply a booster at `target`. Costs no move.
    pub fn apply_powerup(&mut self, powerup: Powerup, target: Pos) -> Result<TurnReport, EngineError> {
        self.ensure_playing()?;
        let tile = *self.board.tile(target)?;
        let area: Vec<Pos> = match powerup {
            Powerup::Knife => vec![target],
            Powerup::HorizontalKnife => bonus::row_area(&self.board, target.row),
            Powerup::VerticalKnife => bonus::column_area(&self.board, target.col),
            Powerup::Pan => bonus::block_area(&self.board, target),
            Powerup::Oven => bonus::color_area(&self.board, tile.food),
            Powerup::Flies => {
                let goal_foods = self.open_goal_foods();
                let exclude = BTreeSet::from([target]);
                let extra = bonus::homing_target(&self.board, target, &goal_foods, &exclude, &mut self.rng);
                std::iter::once(target).chain(extra).collect()
            }
            Powerup::Blender => {
                self.shuffle()?;
                return Ok(self.finish_turn(MatchesInfo::new(), CascadeTrace::default()));
            }
        };

        self.phase = Phase::Resolving;
        let seeds: Vec<(Pos, Option<Pos>)> = area.into_iter().map(|p| (p, None)).collect();
        let goal_foods = self.open_goal_foods();
        let activation = chain_activation(&self.board, &seeds, &BTreeSet::new(), &goal_foods, &mut self.rng);
        debug!(?powerup, %target, area = activation.area.len(), "power-up applied");
        self.resolve_activation(activation)
    }

    fn resolve_activation(&mut self, activation: Activation) -> Result<TurnReport, EngineError> {
        let mut reported = MatchesInfo::new();
        reported.add_positions(activation.area.iter().copied());
        reported.add_bonuses(activation.triggered);
        let fired = activation.activated.iter().copied().collect();
        let trace = self.run_cascade(activation.area, activation.triggered, fired, None)?;
        Ok(self.finish_turn(reported, trace))
    }

    fn default_partner(&self, pos: Pos) -> Option<Pos> {
        [(-1, 0), (0, 1), (1, 0), (0, -1)]
            .into_iter()
            .filter_map(|(dr, dc)| self.board.neighbor(pos, dr, dc))
            .find(|t| !t.is_bonus())
            .map(|t| t.pos)
    }

    /// Clear, collapse, refill and re-detect until the board settles or
    /// the level is won.
    fn run_cascade(
        &mut self,
        mut clear: BTreeSet<Pos>,
        mut triggered: BonusSet,
        mut fired: BTreeSet<Pos>,
        mut created: Option<(Pos, Bonus)>,
    ) -> Result<CascadeTrace, EngineError> {
        let mut trace = CascadeTrace::default();
        let mut combo_index = 1;

        loop {
            // Homing tiles swept up by a match still pick their extra target.
            let homing: Vec<(Pos, Option<Pos>)> = clear
                .iter()
                .filter(|&&p| !fired.contains(&p))
                .filter(|&&p| self.board.get(p).is_some_and(|t| t.bonus == Some(Bonus::Homing)))
                .map(|&p| (p, None))
                .collect();
            if !homing.is_empty() {
                let goal_foods = self.open_goal_foods();
                let extra = chain_activation(&self.board, &homing, &clear, &goal_foods, &mut self.rng);
                clear.extend(extra.area);
                fired.extend(extra.activated);
                triggered |= extra.triggered;
            }

            let score = step_score(clear.len(), combo_index, &self.rules);
            self.score += u64::from(score.total);

            let mut cleared = Vec::with_capacity(clear.len());
            for &pos in &clear {
                if let Some(tile) = self.board.remove(pos)? {
                    self.collect(tile.food);
                    cleared.push(tile);
                }
            }
            let won = self.goals_met();
            if won {
                created = None;
            }
            // The pivot is counted like any cleared tile, then comes back as the bonus.
            if let Some((pivot, grade)) = created {
                if let Some(tile) = cleared.iter().find(|t| t.pos == pivot) {
                    self.board.set(pivot, Some(Tile { bonus: Some(grade), ..*tile }))?;
                }
            }

            self.phase = Phase::Collapsing;
            let columns: BTreeSet<usize> = clear.iter().map(|p| p.col).collect();
            let altered = self.collapse_and_refill(&columns)?;
            debug!(
                combo_index,
                cleared = cleared.len(),
                score_delta = score.total,
                max_distance = altered.max_distance,
                "cascade step"
            );
            let next = if won {
                None
            } else {
                Some(matches_for(&self.board, altered.positions.iter().copied()))
            };
            trace.steps.push(StepReport {
                combo_index,
                cleared,
                score_delta: score.total,
                triggered,
                created_bonus: created,
                altered,
            });

            if won {
                self.phase = Phase::Win;
                info!(score = self.score, moves_left = self.moves_left, "level won");
                break;
            }
            match next {
                Some(next) if next.qualifies() => {
                    self.phase = Phase::Resolving;
                    triggered = next.bonuses();
                    clear = next.position_set().clone();
                    fired.clear();
                    created = None;
                    combo_index += 1;
                }
                _ => break,
            }
        }
        Ok(trace)
    }

    /// Compact `columns` and fill every empty slot in them with a random
    /// food. Spawned tiles count as falling from just above the top row.
    fn collapse_and_refill(&mut self, columns: &BTreeSet<usize>) -> Result<AlteredTiles, BoardError> {
        let mut altered = self.board.collapse_columns(columns.iter().copied())?;
        for &col in columns {
            for pos in self.board.empty_slots_in_column(col) {
                let food = FoodType(self.rng.gen_range(0..self.palette));
                self.board.place(pos, food, None)?;
                altered.record(pos, pos.row + 1);
            }
        }
        Ok(altered)
    }

    fn finish_turn(&mut self, matches: MatchesInfo, trace: CascadeTrace) -> TurnReport {
        if !self.phase.is_over() {
            if self.moves_left == 0 {
                self.phase = Phase::Lose;
                info!(score = self.score, "out of moves");
            } else {
                self.phase = Phase::Idle;
            }
        }
        let needs_shuffle = self.phase == Phase::Idle && hint::is_deadlocked(&self.board);
        if needs_shuffle {
            warn!("no moves left on the board");
        }
        TurnReport {
            accepted: true,
            matches,
            trace,
            phase: self.phase,
            needs_shuffle,
        }
    }

    fn collect(&mut self, food: FoodType) {
        for goal in self.goals.iter_mut().filter(|g| g.food == food) {
            goal.collected = goal.collected.saturating_add(1);
        }
        if let Some(sink) = self.sink.as_mut() {
            sink.on_tile_collected(food);
        }
    }

    fn goals_met(&self) -> bool {
        !self.goals.is_empty() && self.goals.iter().all(LevelGoal::is_complete)
    }

    fn open_goal_foods(&self) -> Vec<FoodType> {
        self.goals
            .iter()
            .filter(|g| !g.is_complete())
            .map(|g| g.food)
            .collect()
    }

    /// A random potential match, or None on a deadlocked board.
    pub fn get_hint(&mut self) -> Option<Hint> {
        hint::find_potential_matches(&self.board).choose(&mut self.rng).copied()
    }

    pub fn is_deadlocked(&self) -> bool {
        hint::is_deadlocked(&self.board)
    }

    /// Rearrange the tiles already on the board so that nothing matches and
    /// at least one move exists. On failure the board is left unchanged.
    pub fn shuffle(&mut self) -> Result<(), EngineError> {
        self.ensure_playing()?;
        let positions: Vec<Pos> = self.board.tiles().map(|t| t.pos).collect();
        let before: Vec<Tile> = self.board.tiles().copied().collect();
        let mut tiles = before.clone();

        for attempt in 1..=SHUFFLE_ATTEMPTS {
            tiles.shuffle(&mut self.rng);
            for (&pos, &tile) in positions.iter().zip(&tiles) {
                self.board.set(pos, Some(tile))?;
            }
            if !matcher::has_any_match(&self.board) && !hint::is_deadlocked(&self.board) {
                info!(attempt, "board shuffled");
                return Ok(());
            }
        }

        for tile in before {
            self.board.set(tile.pos, Some(tile))?;
        }
        warn!(attempts = SHUFFLE_ATTEMPTS, "no valid shuffle found");
        Err(EngineError::UnsatisfiableShuffle {
            attempts: SHUFFLE_ATTEMPTS,
        })
    }
}

/// Would placing `food` at `pos` complete a match with tiles above or to
/// the left? Cells below and to the right are not filled yet.
fn completes_match(board: &Board, pos: Pos, food: FoodType) -> bool {
    let is = |dr, dc| board.neighbor(pos, dr, dc).is_some_and(|t| t.food == food);
    (is(0, -1) && is(0, -2)) || (is(-1, 0) && is(-2, 0)) || (is(-1, 0) && is(0, -1) && is(-1, -1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GoalSpec;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Swapping (1,2) down into (2,2) lines up burgers at (2,1)..=(2,4).
    const FOUR_IN_ROW: [&str; 6] = ["cdecde", "deaecd", "eabaaf", "cdcdcd", "dcdcdc", "cdcdcd"];

    fn level(moves: u32, goals: &[(&str, u32)]) -> LevelConfig {
        LevelConfig {
            moves,
            goals: goals
                .iter()
                .map(|&(food, amount)| GoalSpec { food: food.into(), amount })
                .collect(),
            ..LevelConfig::default()
        }
    }

    fn engine(lines: &[&str], config: &LevelConfig, seed: u64) -> CascadeEngine {
        let board = Board::from_layout(lines).unwrap();
        CascadeEngine::from_board(board, config, StdRng::seed_from_u64(seed)).unwrap()
    }

    fn assert_compact(board: &Board) {
        assert!(board.is_full(), "\n{board}");
        for pos in board.positions() {
            assert_eq!(board.get(pos).unwrap().pos, pos);
        }
    }

    #[test]
    fn test_initialized_board_is_matchless_and_playable() {
        for seed in 0..20 {
            let config = LevelConfig { seed: Some(seed), ..LevelConfig::default() };
            let e = CascadeEngine::new(&config).unwrap();
            assert!(e.board().is_full());
            assert!(!matcher::has_any_match(e.board()), "\n{}", e.board());
            assert!(!e.is_deadlocked());
            assert_eq!(e.phase(), Phase::Idle);
        }
    }

    #[test]
    fn test_illegal_swap_is_reversed() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[("burger", 100)]), 1);
        let before = e.board().snapshot();
        let report = e.attempt_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap();
        assert!(!report.accepted);
        assert!(report.trace.is_empty());
        assert_eq!(e.board().snapshot(), before);
        assert_eq!(e.moves_left(), 5);
        assert_eq!(e.phase(), Phase::Idle);
        assert!(e.board().pending_swap().is_none());
    }

    #[test]
    fn test_non_adjacent_swap_is_an_error() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[]), 1);
        let err = e.attempt_swap(Pos::new(0, 0), Pos::new(2, 2)).unwrap_err();
        assert_eq!(err, EngineError::Board(BoardError::NotAdjacent(Pos::new(0, 0), Pos::new(2, 2))));
        let err = e.attempt_swap(Pos::new(0, 0), Pos::new(9, 0)).unwrap_err();
        assert!(matches!(err, EngineError::Board(BoardError::OutOfBounds { .. })));
        assert_eq!(e.phase(), Phase::Idle);
    }

    #[test]
    fn test_horizontal_four_creates_column_clear_at_pivot() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[("burger", 100)]), 7);
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        assert!(report.accepted);
        assert_eq!(report.matches.len(), 4);
        let first = &report.trace.steps[0];
        assert_eq!(first.combo_index, 1);
        assert_eq!(first.created_bonus, Some((Pos::new(2, 2), Bonus::ColumnClear)));
        // The pivot counts as cleared and is then promoted.
        assert_eq!(first.cleared.len(), 4);
        assert_eq!(first.score_delta, 2 * 60);
        assert_eq!(e.moves_left(), 4);
        let burgers = report
            .trace
            .steps
            .iter()
            .flat_map(|s| &s.cleared)
            .filter(|t| t.food == FoodType(0))
            .count();
        assert_eq!(e.goals()[0].collected as usize, burgers);
        assert_compact(e.board());
    }

    #[test]
    fn test_color_clear_with_cheese_partner_clears_seven() {
        let lines = ["abcdea", "bC@dcac", "dcaebd", "eabdca", "adebce", "edeabd"];
        let mut e = engine(&lines, &level(5, &[]), 3);
        let cheese = e.board().tiles().filter(|t| t.food == FoodType(2)).count();
        assert_eq!(cheese, 7);
        let report = e.activate_bonus(Pos::new(1, 1), Some(Pos::new(1, 3))).unwrap();
        let first = &report.trace.steps[0];
        assert_eq!(first.cleared.len(), 7);
        assert!(first.cleared.iter().all(|t| t.food == FoodType(2)));
        assert!(first.triggered.contains(BonusSet::COLOR));
        assert_eq!(e.moves_left(), 4);
        assert_compact(e.board());
    }

    #[test]
    fn test_tapping_plain_tile_is_an_error() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[]), 3);
        assert_eq!(
            e.activate_bonus(Pos::new(0, 0), None).unwrap_err(),
            EngineError::NotABonus(Pos::new(0, 0))
        );
        assert_eq!(e.moves_left(), 5);
    }

    #[test]
    fn test_color_clear_tap_without_partner_uses_neighbour() {
        // The tile above the bomb is a 'b', so every 'b' goes.
        let lines = ["abcd", "cC@ab", "dabc", "bcda"];
        let mut e = engine(&lines, &level(5, &[]), 9);
        let bs = e.board().tiles().filter(|t| t.food == FoodType(1)).count();
        let report = e.activate_bonus(Pos::new(1, 1), None).unwrap();
        // All b tiles plus the bomb itself.
        assert_eq!(report.trace.steps[0].cleared.len(), bs + 1);
    }

    #[test]
    fn test_win_when_goals_complete() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[("burger", 3)]), 7);
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        assert_eq!(report.phase, Phase::Win);
        assert_eq!(report.trace.steps.len(), 1);
        assert!(e.goals()[0].is_complete());
        assert_eq!(
            e.attempt_swap(Pos::new(0, 0), Pos::new(0, 1)).unwrap_err(),
            EngineError::GameOver
        );
        assert_compact(e.board());
    }

    #[test]
    fn test_matching_exactly_the_goal_wins_without_bonus() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[("burger", 4)]), 7);
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        assert_eq!(report.phase, Phase::Win);
        let first = &report.trace.steps[0];
        assert_eq!(first.cleared.len(), 4);
        assert_eq!(first.created_bonus, None);
        assert_eq!(e.goals()[0].collected, 4);
        assert!(e.board().get(Pos::new(2, 2)).is_some_and(|t| !t.is_bonus()));
    }

    #[test]
    fn test_promoted_pivot_keeps_its_tile() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[("burger", 100)]), 7);
        let touched = e.board().get(Pos::new(1, 2)).unwrap().id;
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        let first = &report.trace.steps[0];
        assert!(first.cleared.iter().any(|t| t.id == touched && t.pos == Pos::new(2, 2)));
        assert_eq!(first.created_bonus, Some((Pos::new(2, 2), Bonus::ColumnClear)));
    }

    #[test]
    fn test_bonus_swap_is_legal_without_a_run() {
        let lines = ["abcd", "bA-cd", "cdab", "dabc"];
        let mut e = engine(&lines, &level(5, &[]), 5);
        let report = e.attempt_swap(Pos::new(1, 1), Pos::new(2, 1)).unwrap();
        assert!(report.accepted);
        let first = &report.trace.steps[0];
        // The row clear fires on row 2, where it landed.
        assert_eq!(first.cleared.len(), 4);
        assert!(first.cleared.iter().all(|t| t.pos.row == 2));
        assert!(first.triggered.contains(BonusSet::WIDE));
        assert_eq!(e.moves_left(), 4);
    }

    #[test]
    fn test_two_swapped_bonuses_union_their_areas() {
        let lines = ["abcd", "bA-cd", "cB|ab", "dabc"];
        let mut e = engine(&lines, &level(5, &[]), 5);
        let report = e.attempt_swap(Pos::new(1, 1), Pos::new(2, 1)).unwrap();
        assert!(report.accepted);
        // Row 2 and column 1 share one cell.
        assert_eq!(report.trace.steps[0].cleared.len(), 7);
    }

    #[test]
    fn test_swap_that_fires_area_clear_creates_no_bonus() {
        // Moving the area bomb up lines five 'b' tiles along row 2.
        let lines = ["cdcdc", "dcbcd", "bbA*bb", "cdcdc", "dcdcd"];
        let mut e = engine(&lines, &level(5, &[]), 5);
        let report = e.attempt_swap(Pos::new(2, 2), Pos::new(1, 2)).unwrap();
        assert!(report.accepted);
        assert!(report.matches.bonuses().contains(BonusSet::AREA));
        let first = &report.trace.steps[0];
        assert_eq!(first.created_bonus, None);
        // Five b's plus the 3x3 block around (1,2), sharing three cells.
        assert_eq!(first.cleared.len(), 11);
    }

    #[test]
    fn test_board_outside_palette_is_rejected() {
        let board = Board::from_layout(&["abc", "dgf", "abc"]).unwrap();
        let err = CascadeEngine::from_board(board, &level(5, &[]), StdRng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, EngineError::Board(BoardError::Layout(_))));
    }

    #[test]
    fn test_lose_when_moves_run_out() {
        let mut e = engine(&FOUR_IN_ROW, &level(1, &[("burger", 500)]), 7);
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        assert_eq!(report.phase, Phase::Lose);
        assert_eq!(e.moves_left(), 0);
        assert!(!report.needs_shuffle);
        assert_eq!(e.shuffle().unwrap_err(), EngineError::GameOver);
    }

    #[test]
    fn test_same_seed_same_game() {
        let config = LevelConfig { seed: Some(99), moves: 50, ..LevelConfig::default() };
        let play = || {
            let mut e = CascadeEngine::new(&config).unwrap();
            let mut sizes = Vec::new();
            for _ in 0..10 {
                if e.phase().is_over() {
                    break;
                }
                let Some(hint) = e.get_hint() else { break };
                let report = e.attempt_swap(hint.swap.0, hint.swap.1).unwrap();
                assert!(report.accepted);
                sizes.push(report.trace.cleared_sizes());
            }
            (sizes, e.board().snapshot(), e.score())
        };
        assert_eq!(play(), play());
    }

    #[test]
    fn test_sink_sees_every_cleared_tile() {
        struct Counter(Rc<RefCell<Vec<FoodType>>>);
        impl CollectionSink for Counter {
            fn on_tile_collected(&mut self, food: FoodType) {
                self.0.borrow_mut().push(food);
            }
        }
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[]), 7);
        e.set_sink(Box::new(Counter(Rc::clone(&seen))));
        let report = e.attempt_swap(Pos::new(1, 2), Pos::new(2, 2)).unwrap();
        let total: usize = report.trace.cleared_sizes().iter().sum();
        assert_eq!(seen.borrow().len(), total);
    }

    #[test]
    fn test_knife_costs_no_move() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[]), 5);
        let report = e.apply_powerup(Powerup::Knife, Pos::new(5, 0)).unwrap();
        assert_eq!(report.trace.steps[0].cleared.len(), 1);
        assert_eq!(e.moves_left(), 5);
        assert_compact(e.board());
    }

    #[test]
    fn test_horizontal_knife_clears_row() {
        let mut e = engine(&FOUR_IN_ROW, &level(5, &[]), 5);
        let report = e.apply_powerup(Powerup::HorizontalKnife, Pos::new(4, 3)).unwrap();
        assert_eq!(report.trace.steps[0].cleared.len(), 6);
        assert!(report.trace.steps[0].cleared.iter().all(|t| t.pos.row == 4));
    }

    #[test]
    fn test_knife_on_bonus_chains() {
        let lines = ["abcd", "bA-cd", "cdab", "dabc"];
        let mut e = engine(&lines, &level(5, &[]), 5);
        let report = e.apply_powerup(Powerup::Knife, Pos::new(1, 1)).unwrap();
        assert_eq!(report.trace.steps[0].cleared.len(), 4);
        assert!(report.matches.bonuses().contains(BonusSet::WIDE));
    }

    #[test]
    fn test_shuffle_unlocks_deadlocked_board() {
        let lines = ["abcd", "bcda", "cdab", "dabc"];
        let mut e = engine(&lines, &level(5, &[]), 21);
        assert!(e.is_deadlocked());
        let mut before: Vec<FoodType> = e.board().tiles().map(|t| t.food).collect();
        e.shuffle().unwrap();
        let mut after: Vec<FoodType> = e.board().tiles().map(|t| t.food).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
        assert!(!matcher::has_any_match(e.board()));
        assert!(!e.is_deadlocked());
        assert!(e.get_hint().is_some());
    }

    #[test]
    fn test_blender_shuffles() {
        let lines = ["abcd", "bcda", "cdab", "dabc"];
        let mut e = engine(&lines, &level(5, &[]), 21);
        let report = e.apply_powerup(Powerup::Blender, Pos::new(0, 0)).unwrap();
        assert!(report.trace.is_empty());
        assert!(!report.needs_shuffle);
        assert_eq!(e.moves_left(), 5);
    }

    #[test]
    fn test_unsatisfiable_shuffle_leaves_board() {
        // Seven of one type on a 3x3 always leaves a full row.
        let lines = ["aab", "aba", "aaa"];
        let mut e = engine(&lines, &level(5, &[]), 4);
        let before = e.board().snapshot();
        let err = e.shuffle().unwrap_err();
        assert_eq!(err, EngineError::UnsatisfiableShuffle { attempts: SHUFFLE_ATTEMPTS });
        assert_eq!(e.board().snapshot(), before);
    }
}
