//! App: headless autoplay loop over a level.

use crate::cascade::{CascadeEngine, Phase, TurnReport};
use crate::config::LevelConfig;
use crate::tile::{FoodType, Pos};
use anyhow::{Context, Result};
use std::fmt;
use std::io::Write;
use tracing::{debug, info};

/// What the autoplayer did on one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Swap(Pos, Pos),
    Tap(Pos),
    Shuffle,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Swap(a, b) => write!(f, "swap {a} <-> {b}"),
            Self::Tap(p) => write!(f, "tap {p}"),
            Self::Shuffle => f.write_str("shuffle"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalProgress {
    pub food: String,
    pub collected: u32,
    pub needed: u32,
}

/// End-of-run summary printed by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub phase: Phase,
    pub turns: u32,
    pub score: u64,
    pub moves_left: u32,
    pub goals: Vec<GoalProgress>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = match self.phase {
            Phase::Win => "level cleared",
            Phase::Lose => "out of moves",
            _ => "stopped",
        };
        writeln!(f, "{outcome} after {} turns", self.turns)?;
        writeln!(f, "score: {}  moves left: {}", self.score, self.moves_left)?;
        for g in &self.goals {
            writeln!(f, "  {:<10} {:>3}/{}", g.food, g.collected.min(g.needed), g.needed)?;
        }
        Ok(())
    }
}

pub struct App {
    config: LevelConfig,
    engine: CascadeEngine,
    max_turns: u32,
    quiet: bool,
    turns: u32,
}

impl App {
    pub fn new(config: LevelConfig, max_turns: u32, quiet: bool) -> Result<Self> {
        let engine = CascadeEngine::new(&config).context("failed to set up the level")?;
        Ok(Self {
            config,
            engine,
            max_turns,
            quiet,
            turns: 0,
        })
    }

    pub fn engine(&self) -> &CascadeEngine {
        &self.engine
    }

    /// Play until the level ends or `max_turns` actions have been taken.
    pub fn run(&mut self, out: &mut impl Write) -> Result<Summary> {
        if !self.quiet {
            self.print_legend(out)?;
            writeln!(out, "{}", self.engine.board())?;
        }
        while !self.engine.phase().is_over() && self.turns < self.max_turns {
            self.turns += 1;
            let action = self.choose();
            let report = self.apply(action)?;
            debug!(turn = self.turns, %action, phase = %self.engine.phase(), "turn played");
            if !self.quiet {
                self.print_turn(out, action, report.as_ref())?;
            }
        }
        let summary = self.summary();
        info!(phase = %summary.phase, turns = summary.turns, score = summary.score, "autoplay finished");
        Ok(summary)
    }

    /// Tap the first bonus tile if any, else take a hint, else shuffle.
    fn choose(&mut self) -> Action {
        if let Some(t) = self.engine.board().tiles().find(|t| t.is_bonus()) {
            return Action::Tap(t.pos);
        }
        match self.engine.get_hint() {
            Some(hint) => Action::Swap(hint.swap.0, hint.swap.1),
            None => Action::Shuffle,
        }
    }

    fn apply(&mut self, action: Action) -> Result<Option<TurnReport>> {
        let report = match action {
            Action::Swap(a, b) => Some(self.engine.attempt_swap(a, b)?),
            Action::Tap(p) => Some(self.engine.activate_bonus(p, None)?),
            Action::Shuffle => {
                self.engine.shuffle().context("board is stuck")?;
                None
            }
        };
        Ok(report)
    }

    fn print_legend(&self, out: &mut impl Write) -> Result<()> {
        let legend: Vec<String> = self
            .config
            .food_types
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{}={name}", FoodType(i as u8).letter()))
            .collect();
        writeln!(out, "{}", legend.join(" "))?;
        Ok(())
    }

    fn print_turn(&self, out: &mut impl Write, action: Action, report: Option<&TurnReport>) -> Result<()> {
        write!(out, "turn {}: {action}", self.turns)?;
        if let Some(report) = report {
            let sizes = report.trace.cleared_sizes();
            write!(out, "  cleared {sizes:?}  +{}", report.trace.total_score())?;
        }
        writeln!(out, "  ({} moves left)", self.engine.moves_left())?;
        writeln!(out, "{}", self.engine.board())?;
        Ok(())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            phase: self.engine.phase(),
            turns: self.turns,
            score: self.engine.score(),
            moves_left: self.engine.moves_left(),
            goals: self
                .engine
                .goals()
                .iter()
                .map(|g| GoalProgress {
                    food: self.config.food_name(g.food).to_string(),
                    collected: g.collected,
                    needed: g.needed,
                })
                .collect(),
        }
    }
}
