//! Board: grid of tile slots, swap/undo, removal, column collapse.

use crate::error::BoardError;
use crate::tile::{Bonus, FoodType, Pos, Tile, TileId};
use std::collections::BTreeSet;
use std::fmt;

/// The one swap that may still be reversed. Taken by `undo_last_swap`
/// or discarded by `commit_swap`; a second swap replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingSwap {
    /// Position the first tile started from (it now sits at `second.1`).
    pub first: (TileId, Pos),
    /// Position the second tile started from (it now sits at `first.1`).
    pub second: (TileId, Pos),
}

/// Tiles that moved or spawned during a collapse/refill, by their new
/// position, plus the longest single fall. Callers time settle waits off
/// `max_distance`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlteredTiles {
    pub positions: BTreeSet<Pos>,
    pub max_distance: usize,
}

impl AlteredTiles {
    pub fn record(&mut self, pos: Pos, distance: usize) {
        self.positions.insert(pos);
        self.max_distance = self.max_distance.max(distance);
    }

    pub fn merge(&mut self, other: Self) {
        self.positions.extend(other.positions);
        self.max_distance = self.max_distance.max(other.max_distance);
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Grid of optional tiles. Row 0 is the top; slots[row * columns + col].
#[derive(Debug, Clone)]
pub struct Board {
    rows: usize,
    columns: usize,
    slots: Vec<Option<Tile>>,
    pending: Option<PendingSwap>,
    next_id: u32,
}

impl Board {
    /// Empty board of the given size.
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows,
            columns,
            slots: vec![None; rows * columns],
            pending: None,
            next_id: 0,
        }
    }

    /// Build a board from text rows, top row first. Each cell is a lowercase
    /// food letter, an uppercase letter followed by a bonus marker
    /// (`-` row, `|` column, `*` area, `@` color, `~` homing), or `.` for
    /// empty. Whitespace is ignored.
    pub fn from_layout(lines: &[&str]) -> Result<Self, BoardError> {
        let mut parsed: Vec<Vec<Option<(FoodType, Option<Bonus>)>>> = Vec::new();
        for line in lines {
            let mut cells = Vec::new();
            let mut chars = line.chars().filter(|c| !c.is_whitespace());
            while let Some(c) = chars.next() {
                let cell = match c {
                    '.' => None,
                    c if c.is_ascii_lowercase() => FoodType::from_letter(c).map(|f| (f, None)),
                    c if c.is_ascii_uppercase() => {
                        let food = FoodType::from_letter(c.to_ascii_lowercase());
                        let bonus = chars.next().and_then(Bonus::from_marker).ok_or_else(|| {
                            BoardError::Layout(format!("bonus tile {c} needs a marker"))
                        })?;
                        food.map(|f| (f, Some(bonus)))
                    }
                    other => {
                        return Err(BoardError::Layout(format!("unexpected character {other:?}")));
                    }
                };
                cells.push(cell);
            }
            parsed.push(cells);
        }

        let rows = parsed.len();
        let columns = parsed.first().map_or(0, Vec::len);
        if rows == 0 || columns == 0 {
            return Err(BoardError::Layout("empty layout".into()));
        }
        if let Some(bad) = parsed.iter().position(|r| r.len() != columns) {
            return Err(BoardError::Layout(format!(
                "row {bad} has {} cells, expected {columns}",
                parsed[bad].len()
            )));
        }

        let mut board = Self::new(rows, columns);
        for (row, cells) in parsed.into_iter().enumerate() {
            for (col, cell) in cells.into_iter().enumerate() {
                if let Some((food, bonus)) = cell {
                    board.place(Pos::new(row, col), food, bonus)?;
                }
            }
        }
        Ok(board)
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row < self.rows && pos.col < self.columns
    }

    fn index(&self, pos: Pos) -> Result<usize, BoardError> {
        if self.in_bounds(pos) {
            Ok(pos.row * self.columns + pos.col)
        } else {
            Err(BoardError::OutOfBounds {
                pos,
                rows: self.rows,
                columns: self.columns,
            })
        }
    }

    /// Tile at `pos`; None when empty or out of bounds.
    #[inline]
    pub fn get(&self, pos: Pos) -> Option<&Tile> {
        self.index(pos).ok().and_then(|i| self.slots[i].as_ref())
    }

    /// Like `get`, but distinguishes the failure.
    pub fn tile(&self, pos: Pos) -> Result<&Tile, BoardError> {
        let i = self.index(pos)?;
        self.slots[i].as_ref().ok_or(BoardError::EmptySlot(pos))
    }

    /// Neighbour of `pos` by (dr, dc), if on the board and occupied.
    pub fn neighbor(&self, pos: Pos, dr: isize, dc: isize) -> Option<&Tile> {
        pos.offset(dr, dc).and_then(|p| self.get(p))
    }

    /// Store `tile` (or clear the slot) at `pos`, rewriting the tile's
    /// position to match. Returns the previous occupant.
    pub fn set(&mut self, pos: Pos, tile: Option<Tile>) -> Result<Option<Tile>, BoardError> {
        let i = self.index(pos)?;
        let tile = tile.map(|mut t| {
            t.pos = pos;
            t
        });
        Ok(std::mem::replace(&mut self.slots[i], tile))
    }

    /// Create a fresh tile at `pos`, replacing whatever was there.
    pub fn place(&mut self, pos: Pos, food: FoodType, bonus: Option<Bonus>) -> Result<TileId, BoardError> {
        let id = TileId(self.next_id);
        self.set(pos, Some(Tile { id, food, bonus, pos }))?;
        self.next_id += 1;
        Ok(id)
    }

    /// Change the bonus grade of the tile at `pos`.
    pub fn set_bonus(&mut self, pos: Pos, bonus: Option<Bonus>) -> Result<(), BoardError> {
        let i = self.index(pos)?;
        let tile = self.slots[i].as_mut().ok_or(BoardError::EmptySlot(pos))?;
        tile.bonus = bonus;
        Ok(())
    }

    /// Clear the slot at `pos`, returning the tile that was there.
    pub fn remove(&mut self, pos: Pos) -> Result<Option<Tile>, BoardError> {
        self.set(pos, None)
    }

    /// Exchange two adjacent tiles and remember the pair for one undo.
    pub fn swap(&mut self, a: Pos, b: Pos) -> Result<(), BoardError> {
        let first = self.tile(a)?.id;
        let second = self.tile(b)?.id;
        if !a.is_adjacent(b) {
            return Err(BoardError::NotAdjacent(a, b));
        }
        self.exchange(a, b)?;
        self.pending = Some(PendingSwap {
            first: (first, a),
            second: (second, b),
        });
        Ok(())
    }

    /// Reverse the pending swap. Fails if there is none.
    pub fn undo_last_swap(&mut self) -> Result<(), BoardError> {
        let pending = self.pending.take().ok_or(BoardError::NoPendingSwap)?;
        let (first_id, a) = pending.first;
        let (second_id, b) = pending.second;
        // After the swap the first tile sits at b and the second at a.
        if self.get(b).map(|t| t.id) != Some(first_id) {
            return Err(BoardError::StalePendingSwap(b));
        }
        if self.get(a).map(|t| t.id) != Some(second_id) {
            return Err(BoardError::StalePendingSwap(a));
        }
        self.exchange(a, b)
    }

    /// Accept the pending swap; it can no longer be undone.
    pub fn commit_swap(&mut self) -> Option<PendingSwap> {
        self.pending.take()
    }

    pub fn pending_swap(&self) -> Option<PendingSwap> {
        self.pending
    }

    fn exchange(&mut self, a: Pos, b: Pos) -> Result<(), BoardError> {
        let ta = self.set(a, None)?;
        let tb = self.set(b, ta)?;
        self.set(a, tb)?;
        Ok(())
    }

    /// Compact each listed column downward so no empty slot sits below an
    /// occupied one. Returns moved tiles (by new position) and the longest fall.
    pub fn collapse_columns<I>(&mut self, columns: I) -> Result<AlteredTiles, BoardError>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut altered = AlteredTiles::default();
        for col in columns {
            if col >= self.columns {
                return Err(BoardError::OutOfBounds {
                    pos: Pos::new(0, col),
                    rows: self.rows,
                    columns: self.columns,
                });
            }
            // Bottom to top; row 0 has nothing above it to pull down.
            for row in (1..self.rows).rev() {
                let here = Pos::new(row, col);
                if self.get(here).is_some() {
                    continue;
                }
                let above = (0..row).rev().map(|r| Pos::new(r, col)).find(|&p| self.get(p).is_some());
                let Some(from) = above else {
                    break;
                };
                let tile = self.remove(from)?;
                self.set(here, tile)?;
                altered.record(here, row - from.row);
            }
        }
        Ok(altered)
    }

    /// Empty slots in a column, top first.
    pub fn empty_slots_in_column(&self, col: usize) -> Vec<Pos> {
        (0..self.rows)
            .map(|row| Pos::new(row, col))
            .filter(|&p| self.in_bounds(p) && self.get(p).is_none())
            .collect()
    }

    /// Occupied tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.slots.iter().flatten()
    }

    /// Every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Pos> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).map(move |col| Pos::new(row, col)))
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Occupancy as (id, food, bonus) per slot; for comparing board states.
    pub fn snapshot(&self) -> Vec<Option<(TileId, FoodType, Option<Bonus>)>> {
        self.slots
            .iter()
            .map(|s| s.map(|t| (t.id, t.food, t.bonus)))
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows {
            let mut line = String::with_capacity(self.columns * 2);
            for col in 0..self.columns {
                match self.get(Pos::new(row, col)) {
                    None => line.push_str(". "),
                    Some(t) => match t.bonus {
                        None => {
                            line.push(t.food.letter());
                            line.push(' ');
                        }
                        Some(b) => {
                            line.push(t.food.letter().to_ascii_uppercase());
                            line.push(b.marker());
                        }
                    },
                }
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
