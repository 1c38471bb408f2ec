//! tilecascade: a match-three grid engine.
//!
//! The [`board::Board`] owns tile placement. [`matcher`] finds runs and
//! squares, [`bonus`] grades match shapes and computes activation areas,
//! [`cascade::CascadeEngine`] runs the swap, clear, collapse and refill loop,
//! and [`hint`] finds the next possible move.

pub mod app;
pub mod board;
pub mod bonus;
pub mod cascade;
pub mod config;
pub mod error;
pub mod hint;
pub mod matcher;
pub mod scoring;
pub mod tile;

pub use board::{AlteredTiles, Board, PendingSwap};
pub use cascade::{CascadeEngine, CascadeTrace, CollectionSink, LevelGoal, Phase, Powerup, StepReport, TurnReport};
pub use config::{GoalSpec, LevelConfig};
pub use error::{BoardError, ConfigError, EngineError};
pub use hint::Hint;
pub use matcher::MatchesInfo;
pub use scoring::ScoreRules;
pub use tile::{Bonus, BonusSet, FoodType, Pos, Tile, TileId};
