//! Score rules for clear steps.
//!
//! Each clear step is worth `(tiles - 2) * base_match_score`; every step after
//! the first in one cascade adds `subsequent_match_bonus` on top.

/// Tunable scoring constants for a level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreRules {
    pub base_match_score: u32,
    pub subsequent_match_bonus: u32,
    /// Fewest tiles in the first clear step for a bonus tile to be created.
    pub min_match_for_bonus: usize,
}

impl Default for ScoreRules {
    fn default() -> Self {
        Self {
            base_match_score: 60,
            subsequent_match_bonus: 1000,
            min_match_for_bonus: 4,
        }
    }
}

/// Score for one clear step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepScore {
    pub match_score: u32,
    pub combo_bonus: u32,
    pub total: u32,
}

/// `combo_index` is 1 for the clear the move itself caused, 2+ for chains.
pub fn step_score(tile_count: usize, combo_index: u32, rules: &ScoreRules) -> StepScore {
    let counted = u32::try_from(tile_count.saturating_sub(2)).unwrap_or(u32::MAX);
    let match_score = counted.saturating_mul(rules.base_match_score);
    let combo_bonus = if combo_index >= 2 { rules.subsequent_match_bonus } else { 0 };
    StepScore {
        match_score,
        combo_bonus,
        total: match_score.saturating_add(combo_bonus),
    }
}
