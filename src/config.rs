//! Level configuration: board size, food palette, move budget, goals.

use crate::error::ConfigError;
use crate::scoring::ScoreRules;
use crate::tile::FoodType;
use std::str::FromStr;

/// Classic food palette, in display order.
pub const DEFAULT_FOODS: [&str; 6] = ["burger", "tomato", "cheese", "donut", "cupcake", "hotdog"];

/// Collect `amount` tiles of `food` (a palette name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalSpec {
    pub food: String,
    pub amount: u32,
}

impl FromStr for GoalSpec {
    type Err = ConfigError;

    /// `FOOD:AMOUNT`, e.g. `cheese:10`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (food, amount) = s
            .split_once(':')
            .ok_or_else(|| ConfigError::MalformedGoal(s.to_string()))?;
        let amount = amount
            .trim()
            .parse()
            .map_err(|_| ConfigError::MalformedGoal(s.to_string()))?;
        Ok(Self {
            food: food.trim().to_string(),
            amount,
        })
    }
}

/// Everything the engine needs to set up a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelConfig {
    pub rows: usize,
    pub columns: usize,
    /// Active food types; tile types index into this list.
    pub food_types: Vec<String>,
    pub moves: u32,
    pub goals: Vec<GoalSpec>,
    pub scoring: ScoreRules,
    /// RNG seed; None draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            columns: 8,
            food_types: DEFAULT_FOODS.iter().map(ToString::to_string).collect(),
            moves: 20,
            goals: vec![
                GoalSpec { food: "burger".into(), amount: 15 },
                GoalSpec { food: "tomato".into(), amount: 15 },
                GoalSpec { food: "cheese".into(), amount: 10 },
            ],
            scoring: ScoreRules::default(),
            seed: None,
        }
    }
}

impl LevelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(3..=32).contains(&self.rows) || !(3..=32).contains(&self.columns) {
            return Err(ConfigError::Dimensions {
                rows: self.rows,
                columns: self.columns,
            });
        }
        if !(3..=26).contains(&self.food_types.len()) {
            return Err(ConfigError::PaletteSize(self.food_types.len()));
        }
        for (i, name) in self.food_types.iter().enumerate() {
            if self.food_types[..i].contains(name) {
                return Err(ConfigError::DuplicateFood(name.clone()));
            }
        }
        if self.moves == 0 {
            return Err(ConfigError::NoMoves);
        }
        for goal in &self.goals {
            self.food_type(&goal.food)
                .ok_or_else(|| ConfigError::UnknownGoalFood(goal.food.clone()))?;
            if goal.amount == 0 {
                return Err(ConfigError::EmptyGoal(goal.food.clone()));
            }
        }
        Ok(())
    }

    /// Palette index of a food name.
    pub fn food_type(&self, name: &str) -> Option<FoodType> {
        self.food_types
            .iter()
            .position(|f| f == name)
            .map(|i| FoodType(i as u8))
    }

    pub fn food_name(&self, food: FoodType) -> &str {
        self.food_types
            .get(food.0 as usize)
            .map_or("?", String::as_str)
    }

    pub fn palette_size(&self) -> u8 {
        self.food_types.len() as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LevelConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.food_type("cheese"), Some(FoodType(2)));
        assert_eq!(config.food_name(FoodType(0)), "burger");
    }

    #[test]
    fn test_parse_goal() {
        let g: GoalSpec = "cheese:10".parse().unwrap();
        assert_eq!(g, GoalSpec { food: "cheese".into(), amount: 10 });
        assert!("cheese".parse::<GoalSpec>().is_err());
        assert!("cheese:x".parse::<GoalSpec>().is_err());
    }

    #[test]
    fn test_rejects_bad_levels() {
        let mut c = LevelConfig { rows: 2, ..LevelConfig::default() };
        assert!(matches!(c.validate(), Err(ConfigError::Dimensions { .. })));

        c = LevelConfig { food_types: vec!["a".into(), "b".into()], goals: vec![], ..LevelConfig::default() };
        assert_eq!(c.validate(), Err(ConfigError::PaletteSize(2)));

        c = LevelConfig { moves: 0, ..LevelConfig::default() };
        assert_eq!(c.validate(), Err(ConfigError::NoMoves));

        c = LevelConfig::default();
        c.goals.push(GoalSpec { food: "kale".into(), amount: 3 });
        assert_eq!(c.validate(), Err(ConfigError::UnknownGoalFood("kale".into())));

        c = LevelConfig::default();
        c.food_types[1] = "burger".into();
        c.goals.clear();
        assert_eq!(c.validate(), Err(ConfigError::DuplicateFood("burger".into())));
    }
}
