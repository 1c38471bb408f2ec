//! Bonus grades: classifying a match shape into a grade, and computing the
//! tiles an activated bonus clears.

use crate::board::Board;
use crate::matcher::{horizontal_run, square_run, vertical_run};
use crate::tile::{Bonus, BonusSet, FoodType, Pos, Tile};
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::{BTreeSet, VecDeque};

/// Grade earned by the match through `pivot`, by fixed precedence:
/// run of 5+ (color), crossing runs (area), horizontal 4 (column),
/// vertical 4 (row), 2x2 square (homing).
pub fn classify(board: &Board, pivot: Pos) -> Option<Bonus> {
    let h = horizontal_run(board, pivot).len();
    let v = vertical_run(board, pivot).len();
    let s = square_run(board, pivot).len();

    if h >= 5 || v >= 5 {
        Some(Bonus::ColorClear)
    } else if h >= 3 && v >= 3 {
        Some(Bonus::AreaClear)
    } else if h == 4 {
        // A horizontal four makes a vertical wipe.
        Some(Bonus::ColumnClear)
    } else if v == 4 {
        Some(Bonus::RowClear)
    } else if s >= 4 {
        Some(Bonus::Homing)
    } else {
        None
    }
}

/// Occupied tiles in `row`.
pub fn row_area(board: &Board, row: usize) -> Vec<Pos> {
    (0..board.columns())
        .map(|col| Pos::new(row, col))
        .filter(|&p| board.get(p).is_some())
        .collect()
}

/// Occupied tiles in `col`.
pub fn column_area(board: &Board, col: usize) -> Vec<Pos> {
    (0..board.rows())
        .map(|row| Pos::new(row, col))
        .filter(|&p| board.get(p).is_some())
        .collect()
}

/// Occupied tiles within Chebyshev distance 1 of `center`.
pub fn block_area(board: &Board, center: Pos) -> Vec<Pos> {
    let mut out = Vec::with_capacity(9);
    for dr in -1..=1 {
        for dc in -1..=1 {
            if let Some(t) = board.neighbor(center, dr, dc) {
                out.push(t.pos);
            }
        }
    }
    out
}

/// Every tile of the given food type.
pub fn color_area(board: &Board, food: FoodType) -> Vec<Pos> {
    board.tiles().filter(|t| t.food == food).map(|t| t.pos).collect()
}

/// Whole row or column for a wide-clear tile; empty for anything else.
pub fn line_area(board: &Board, tile: &Tile) -> Vec<Pos> {
    match tile.bonus {
        Some(Bonus::RowClear) => row_area(board, tile.pos.row),
        Some(Bonus::ColumnClear) => column_area(board, tile.pos.col),
        _ => Vec::new(),
    }
}

/// Area of effect of the bonus tile at `pos`.
///
/// A color-clear takes its target type from `partner` when given, else its
/// own type. A homing tile's area here is only itself; its extra target is
/// picked by [`homing_target`]. Non-bonus or empty slots yield nothing.
pub fn activation_area(board: &Board, pos: Pos, partner: Option<Pos>) -> BTreeSet<Pos> {
    let Some(tile) = board.get(pos) else {
        return BTreeSet::new();
    };
    match tile.bonus {
        None => BTreeSet::new(),
        Some(Bonus::RowClear | Bonus::ColumnClear) => line_area(board, tile).into_iter().collect(),
        Some(Bonus::AreaClear) => block_area(board, pos).into_iter().collect(),
        Some(Bonus::ColorClear) => {
            let food = partner.and_then(|p| board.get(p)).map_or(tile.food, |t| t.food);
            color_area(board, food).into_iter().collect()
        }
        Some(Bonus::Homing) => BTreeSet::from([pos]),
    }
}

/// One extra tile for a homing bonus at `origin`.
///
/// Prefers the nearest plain tile (Manhattan, then row-major) whose type an
/// unfinished goal still wants; otherwise a uniform pick among plain tiles.
/// Never returns `origin` or anything in `exclude`.
pub fn homing_target<R: Rng + ?Sized>(
    board: &Board,
    origin: Pos,
    goal_foods: &[FoodType],
    exclude: &BTreeSet<Pos>,
    rng: &mut R,
) -> Option<Pos> {
    let open = || {
        board
            .tiles()
            .filter(move |t| t.pos != origin && !exclude.contains(&t.pos))
    };

    let wanted = open()
        .filter(|t| !t.is_bonus() && goal_foods.contains(&t.food))
        .min_by_key(|t| (t.pos.manhattan(origin), t.pos));
    if let Some(t) = wanted {
        return Some(t.pos);
    }

    let plain: Vec<Pos> = open().filter(|t| !t.is_bonus()).map(|t| t.pos).collect();
    plain.choose(rng).copied()
}

/// Everything cleared by activating a set of bonus tiles, following chains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    /// Cleared positions, including each activated bonus tile.
    pub area: BTreeSet<Pos>,
    /// Grades that fired.
    pub triggered: BonusSet,
    /// Bonus tiles activated, in activation order.
    pub activated: Vec<Pos>,
}

/// Activate `seeds` (bonus position, optional partner) and every bonus tile
/// their areas reach, each at most once. Plain seeds are cleared alone.
/// Homing targets avoid `already` (tiles the current step clears anyway) and
/// anything already in the area.
pub fn chain_activation<R: Rng + ?Sized>(
    board: &Board,
    seeds: &[(Pos, Option<Pos>)],
    already: &BTreeSet<Pos>,
    goal_foods: &[FoodType],
    rng: &mut R,
) -> Activation {
    let mut out = Activation::default();
    let mut visited = BTreeSet::new();
    let mut queue: VecDeque<(Pos, Option<Pos>)> = seeds.iter().copied().collect();

    while let Some((pos, partner)) = queue.pop_front() {
        if !visited.insert(pos) {
            continue;
        }
        let Some(tile) = board.get(pos) else {
            continue;
        };
        out.area.insert(pos);
        let Some(bonus) = tile.bonus else {
            continue;
        };
        out.triggered.insert_bonus(bonus);
        out.activated.push(pos);

        let mut cells = activation_area(board, pos, partner);
        if bonus == Bonus::Homing {
            let exclude: BTreeSet<Pos> = already.union(&out.area).copied().collect();
            if let Some(target) = homing_target(board, pos, goal_foods, &exclude, rng) {
                cells.insert(target);
            }
        }

        for cell in cells {
            out.area.insert(cell);
            let chains = board.get(cell).is_some_and(Tile::is_bonus);
            if chains && !visited.contains(&cell) {
                queue.push_back((cell, None));
            }
        }
    }
    out
}
