//! tilecascade: play a match-three level headlessly from the terminal.

use anyhow::Result;
use clap::Parser;
use tilecascade::app::App;
use tilecascade::config::{DEFAULT_FOODS, GoalSpec, LevelConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = args.level_config();
    config.validate()?;
    tracing::info!(
        rows = config.rows,
        columns = config.columns,
        moves = config.moves,
        seed = ?config.seed,
        "starting level"
    );

    let mut app = App::new(config, args.max_turns, args.quiet)?;
    let mut stdout = std::io::stdout().lock();
    let summary = app.run(&mut stdout)?;
    print!("{summary}");
    Ok(())
}

/// `--log-level` wins over `RUST_LOG`; both fall back to `tilecascade=info`.
fn init_tracing(level: Option<&str>) {
    let filter = level
        .and_then(|l| EnvFilter::try_new(l).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("tilecascade=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Match-three cascade engine with a headless autoplayer.
#[derive(Debug, Parser)]
#[command(
    name = "tilecascade",
    version,
    about = "Match-three cascade engine. Plays a level by itself and prints each turn.",
    long_about = "tilecascade fills a board with food tiles and plays it headlessly.\n\n\
        Each turn the autoplayer taps a bonus tile if one exists, otherwise swaps a hinted pair; \
        a board with no moves is shuffled. Matches of four or more leave bonus tiles behind: \
        row/column clears, area blasts, color bombs and homing flies.\n\n\
        Board letters: a lower-case letter is a food (see the legend), an upper-case letter \
        followed by - | * @ ~ is a row, column, area, color or homing bonus."
)]
pub struct Args {
    /// Board height in rows.
    #[arg(long, default_value = "8", value_name = "ROWS")]
    pub rows: usize,

    /// Board width in columns.
    #[arg(long, default_value = "8", value_name = "COLS")]
    pub columns: usize,

    /// Move budget for the level.
    #[arg(short, long, default_value = "20", value_name = "N")]
    pub moves: u32,

    /// Food type in play (repeat for each). Defaults to the six classic foods.
    #[arg(short, long = "food", value_name = "NAME")]
    pub foods: Vec<String>,

    /// Level goal as FOOD:AMOUNT (repeat for each). Defaults to burger:15 tomato:15 cheese:10.
    #[arg(short, long = "goal", value_name = "FOOD:AMOUNT")]
    pub goals: Vec<GoalSpec>,

    /// RNG seed; the same seed replays the same game.
    #[arg(short, long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Stop after this many turns even if the level is not over.
    #[arg(long, default_value = "200", value_name = "N")]
    pub max_turns: u32,

    /// Tracing filter, e.g. "debug" or "tilecascade=trace". Overrides RUST_LOG.
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,

    /// Only print the final summary.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    fn level_config(&self) -> LevelConfig {
        let defaults = LevelConfig::default();
        let food_types = if self.foods.is_empty() {
            DEFAULT_FOODS.iter().map(ToString::to_string).collect()
        } else {
            self.foods.clone()
        };
        let goals = if self.goals.is_empty() && self.foods.is_empty() {
            defaults.goals
        } else {
            self.goals.clone()
        };
        LevelConfig {
            rows: self.rows,
            columns: self.columns,
            food_types,
            moves: self.moves,
            goals,
            scoring: defaults.scoring,
            seed: self.seed,
        }
    }
}
