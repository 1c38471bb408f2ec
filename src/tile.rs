//! Tiles: food types, bonus grades, grid positions.

use std::fmt;

/// Grid coordinate. Row 0 is the top row; gravity pulls toward higher rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Offset by (dr, dc); None when the result would be negative.
    /// Upper bounds are the board's concern.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row.checked_add_signed(dr)?;
        let col = self.col.checked_add_signed(dc)?;
        Some(Self { row, col })
    }

    /// True if the two positions share an edge.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }

    pub fn manhattan(self, other: Self) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Index into the level's food palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FoodType(pub u8);

impl FoodType {
    /// Letter used by text layouts: 0 -> 'a', 1 -> 'b', ...
    pub fn letter(self) -> char {
        char::from(b'a' + self.0 % 26)
    }

    pub fn from_letter(c: char) -> Option<Self> {
        c.is_ascii_lowercase().then(|| Self(c as u8 - b'a'))
    }
}

/// Special clear behaviour carried by a tile. A tile holds at most one grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bonus {
    /// Clears the tile's whole row.
    RowClear,
    /// Clears the tile's whole column.
    ColumnClear,
    /// Clears the 3x3 block centred on the tile.
    AreaClear,
    /// Clears every tile sharing the partner's type.
    ColorClear,
    /// Clears itself plus one homing target ("flies").
    Homing,
}

impl Bonus {
    pub const ALL: [Self; 5] = [
        Self::RowClear,
        Self::ColumnClear,
        Self::AreaClear,
        Self::ColorClear,
        Self::Homing,
    ];

    /// Row- or column-clear.
    pub fn is_wide(self) -> bool {
        matches!(self, Self::RowClear | Self::ColumnClear)
    }

    /// Marker used by text layouts, after the upper-cased food letter.
    pub fn marker(self) -> char {
        match self {
            Self::RowClear => '-',
            Self::ColumnClear => '|',
            Self::AreaClear => '*',
            Self::ColorClear => '@',
            Self::Homing => '~',
        }
    }

    pub fn from_marker(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.marker() == c)
    }

    fn flag(self) -> u8 {
        match self {
            Self::RowClear | Self::ColumnClear => BonusSet::WIDE.0,
            Self::AreaClear => BonusSet::AREA.0,
            Self::ColorClear => BonusSet::COLOR.0,
            Self::Homing => BonusSet::HOMING.0,
        }
    }
}

impl fmt::Display for Bonus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RowClear => "row-clear",
            Self::ColumnClear => "column-clear",
            Self::AreaClear => "area-clear",
            Self::ColorClear => "color-clear",
            Self::Homing => "homing",
        };
        f.write_str(name)
    }
}

/// Union of bonus effects implicated by a detection or activation.
/// Row- and column-clear share the WIDE flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BonusSet(u8);

impl BonusSet {
    pub const NONE: Self = Self(0);
    pub const WIDE: Self = Self(1 << 0);
    pub const AREA: Self = Self(1 << 1);
    pub const COLOR: Self = Self(1 << 2);
    pub const HOMING: Self = Self(1 << 3);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn insert_bonus(&mut self, bonus: Bonus) {
        self.0 |= bonus.flag();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Blocks bonus creation for the clearing event that carries it.
    pub fn blocks_new_bonus(self) -> bool {
        self.contains(Self::WIDE) || self.contains(Self::AREA)
    }
}

impl std::ops::BitOr for BonusSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for BonusSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Stable identity of a tile for its whole life on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileId(pub u32);

/// A board occupant. `pos` must always equal the slot the board stores it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub id: TileId,
    pub food: FoodType,
    pub bonus: Option<Bonus>,
    pub pos: Pos,
}

impl Tile {
    /// Same food type, regardless of bonus grade.
    #[inline]
    pub fn same_type(&self, other: &Self) -> bool {
        self.food == other.food
    }

    pub fn is_bonus(&self) -> bool {
        self.bonus.is_some()
    }
}
