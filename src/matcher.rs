//! Match detection: horizontal/vertical runs and 2x2 squares around a pivot,
//! escalated by bonus tiles swept into a qualifying run.

use crate::board::Board;
use crate::bonus;
use crate::tile::{Bonus, BonusSet, Pos, Tile};
use std::collections::BTreeSet;

/// Shortest run that counts as a match.
pub const MIN_MATCH: usize = 3;

/// The four 2x2 quadrants around a pivot, as (row step, column step).
const QUADRANTS: [(isize, isize); 4] = [(-1, 1), (-1, -1), (1, 1), (1, -1)];

/// Result of a detection pass: the distinct tiles to clear, and the bonus
/// effects implicated by bonus tiles swept into them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchesInfo {
    tiles: BTreeSet<Pos>,
    bonuses: BonusSet,
}

impl MatchesInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.tiles.contains(&pos)
    }

    /// Matched positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        self.tiles.iter().copied()
    }

    pub fn position_set(&self) -> &BTreeSet<Pos> {
        &self.tiles
    }

    pub fn bonuses(&self) -> BonusSet {
        self.bonuses
    }

    pub fn add_positions<I: IntoIterator<Item = Pos>>(&mut self, positions: I) {
        self.tiles.extend(positions);
    }

    pub fn add_bonuses(&mut self, bonuses: BonusSet) {
        self.bonuses |= bonuses;
    }

    pub fn merge(&mut self, other: Self) {
        self.tiles.extend(other.tiles);
        self.bonuses |= other.bonuses;
    }

    /// True when this is worth clearing on its own.
    pub fn qualifies(&self) -> bool {
        self.tiles.len() >= MIN_MATCH
    }
}

/// Walk from `pos` in direction (dr, dc) while tiles share `pivot`'s type.
fn extend(board: &Board, pivot: &Tile, dr: isize, dc: isize, out: &mut Vec<Pos>) {
    let mut cur = pivot.pos;
    while let Some(t) = board.neighbor(cur, dr, dc) {
        if !t.same_type(pivot) {
            break;
        }
        out.push(t.pos);
        cur = t.pos;
    }
}

fn line(board: &Board, pos: Pos, dr: isize, dc: isize) -> Vec<Pos> {
    let Some(pivot) = board.get(pos) else {
        return Vec::new();
    };
    let mut run = vec![pos];
    extend(board, pivot, -dr, -dc, &mut run);
    extend(board, pivot, dr, dc, &mut run);
    run
}

/// Full contiguous same-type length through `pos` along a row (0 if empty).
pub fn horizontal_length(board: &Board, pos: Pos) -> usize {
    line(board, pos, 0, 1).len()
}

/// Full contiguous same-type length through `pos` along a column (0 if empty).
pub fn vertical_length(board: &Board, pos: Pos) -> usize {
    line(board, pos, 1, 0).len()
}

/// Horizontal run through `pos`, or empty when shorter than `MIN_MATCH`.
pub fn horizontal_run(board: &Board, pos: Pos) -> Vec<Pos> {
    let run = line(board, pos, 0, 1);
    if run.len() < MIN_MATCH { Vec::new() } else { run }
}

/// Vertical run through `pos`, or empty when shorter than `MIN_MATCH`.
pub fn vertical_run(board: &Board, pos: Pos) -> Vec<Pos> {
    let run = line(board, pos, 1, 0);
    if run.len() < MIN_MATCH { Vec::new() } else { run }
}

/// Every same-type 2x2 block that includes `pos`, deduplicated.
pub fn square_run(board: &Board, pos: Pos) -> Vec<Pos> {
    let Some(pivot) = board.get(pos) else {
        return Vec::new();
    };
    let mut found = BTreeSet::new();
    for (dr, dc) in QUADRANTS {
        let others = [(dr, 0), (0, dc), (dr, dc)];
        let cells: Option<Vec<Pos>> = others
            .iter()
            .map(|&(r, c)| board.neighbor(pos, r, c).filter(|t| t.same_type(pivot)).map(|t| t.pos))
            .collect();
        if let Some(cells) = cells {
            found.insert(pos);
            found.extend(cells);
        }
    }
    found.into_iter().collect()
}

/// Fold one run category into `info`, escalating through bonus tiles.
///
/// A wide-clear tile in the run pulls in its whole row or column; the
/// escalated set is then scanned once for area- and color-clear tiles, whose
/// areas are added too. Tiles found by that scan do not escalate further.
fn absorb(board: &Board, run: &[Pos], info: &mut MatchesInfo) {
    if run.len() < MIN_MATCH {
        return;
    }
    let mut expanded: BTreeSet<Pos> = run.iter().copied().collect();
    for t in run.iter().filter_map(|&p| board.get(p)) {
        if t.bonus.is_some_and(Bonus::is_wide) {
            expanded.extend(bonus::line_area(board, t));
            info.bonuses.insert(BonusSet::WIDE);
        }
    }

    let mut extra = BTreeSet::new();
    for t in expanded.iter().filter_map(|&p| board.get(p)) {
        match t.bonus {
            Some(Bonus::AreaClear) => {
                extra.extend(bonus::block_area(board, t.pos));
                info.bonuses.insert(BonusSet::AREA);
            }
            Some(Bonus::ColorClear) => {
                extra.extend(bonus::color_area(board, t.food));
                info.bonuses.insert(BonusSet::COLOR);
            }
            Some(Bonus::Homing) => info.bonuses.insert(BonusSet::HOMING),
            _ => {}
        }
    }
    info.tiles.extend(expanded);
    info.tiles.extend(extra);
}

/// All matches touching the tile at `pos`. Empty slots yield nothing.
pub fn matches_at(board: &Board, pos: Pos) -> MatchesInfo {
    let mut info = MatchesInfo::new();
    if board.get(pos).is_none() {
        return info;
    }
    absorb(board, &horizontal_run(board, pos), &mut info);
    absorb(board, &vertical_run(board, pos), &mut info);
    absorb(board, &square_run(board, pos), &mut info);
    info
}

/// Union of `matches_at` over several pivots.
pub fn matches_for<I>(board: &Board, positions: I) -> MatchesInfo
where
    I: IntoIterator<Item = Pos>,
{
    let mut info = MatchesInfo::new();
    for pos in positions {
        info.merge(matches_at(board, pos));
    }
    info
}

/// True if any line or square match exists anywhere on the board.
pub fn has_any_match(board: &Board) -> bool {
    board.positions().any(|p| {
        !horizontal_run(board, p).is_empty()
            || !vertical_run(board, p).is_empty()
            || !square_run(board, p).is_empty()
    })
}
