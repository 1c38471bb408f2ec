//! Error taxonomy for the board, configuration and engine.

use crate::tile::Pos;
use thiserror::Error;

/// Board precondition violations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("position {pos} is outside the {rows}x{columns} board")]
    OutOfBounds { pos: Pos, rows: usize, columns: usize },
    #[error("no tile at {0}")]
    EmptySlot(Pos),
    #[error("tiles at {0} and {1} are not orthogonal neighbours")]
    NotAdjacent(Pos, Pos),
    #[error("no pending swap to undo")]
    NoPendingSwap,
    #[error("pending swap no longer matches the board at {0}")]
    StalePendingSwap(Pos),
    #[error("invalid layout: {0}")]
    Layout(String),
}

/// Rejected level configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board must be between 3x3 and 32x32, got {rows}x{columns}")]
    Dimensions { rows: usize, columns: usize },
    #[error("need between 3 and 26 food types, got {0}")]
    PaletteSize(usize),
    #[error("duplicate food type: {0}")]
    DuplicateFood(String),
    #[error("goal references unknown food type: {0}")]
    UnknownGoalFood(String),
    #[error("goal for {0} must ask for at least one tile")]
    EmptyGoal(String),
    #[error("move budget must be at least 1")]
    NoMoves,
    #[error("malformed goal {0:?}, expected FOOD:AMOUNT")]
    MalformedGoal(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("the level is over")]
    GameOver,
    #[error("tile at {0} carries no bonus")]
    NotABonus(Pos),
    #[error("could not fill the board without matches after {attempts} attempts")]
    UnsatisfiableBoard { attempts: u32 },
    #[error("no matchless arrangement with a legal move found in {attempts} shuffles")]
    UnsatisfiableShuffle { attempts: u32 },
}
