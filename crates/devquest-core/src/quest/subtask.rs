use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timer::WorkTimer;
use crate::error::ValidationError;

/// How demanding a subtask is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyTier {
    #[default]
    Routine,
    Complex,
    Legacy,
}

impl DifficultyTier {
    pub fn xp_reward(&self) -> u64 {
        match self {
            DifficultyTier::Routine => 10,
            DifficultyTier::Complex => 25,
            DifficultyTier::Legacy => 50,
        }
    }

    /// Display-only hint of how draining the work is. Actual burnout
    /// changes come from awards and focus sessions.
    pub fn burnout_impact(&self) -> f64 {
        match self {
            DifficultyTier::Routine => 0.03,
            DifficultyTier::Complex => 0.07,
            DifficultyTier::Legacy => 0.15,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyTier::Routine => "routine",
            DifficultyTier::Complex => "complex",
            DifficultyTier::Legacy => "legacy",
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DifficultyTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "routine" => Ok(DifficultyTier::Routine),
            "complex" => Ok(DifficultyTier::Complex),
            "legacy" => Ok(DifficultyTier::Legacy),
            other => Err(ValidationError::InvalidValue {
                field: "difficulty".into(),
                message: format!("'{other}' is not one of routine, complex, legacy"),
            }),
        }
    }
}

/// A SubQuest: a step of a [`Task`](super::Task) with its own timer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: Uuid,
    pub title: String,
    pub tier: DifficultyTier,
    pub completed: bool,
    #[serde(flatten)]
    pub timer: WorkTimer,
}

impl Subtask {
    pub fn new(title: impl Into<String>, tier: DifficultyTier) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            tier,
            completed: false,
            timer: WorkTimer::default(),
        }
    }

    pub fn xp_reward(&self) -> u64 {
        self.tier.xp_reward()
    }

    pub fn burnout_impact(&self) -> f64 {
        self.tier.burnout_impact()
    }

    /// Flip completion and return the new state.
    pub fn toggle_completed(&mut self) -> bool {
        self.completed = !self.completed;
        self.completed
    }

    pub fn start_timer(&mut self, now: DateTime<Utc>) -> bool {
        self.timer.start(now)
    }

    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Duration {
        self.timer.stop(now)
    }

    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.timer.total(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_rewards() {
        assert_eq!(DifficultyTier::Routine.xp_reward(), 10);
        assert_eq!(DifficultyTier::Complex.xp_reward(), 25);
        assert_eq!(DifficultyTier::Legacy.xp_reward(), 50);
        assert_eq!(DifficultyTier::Legacy.burnout_impact(), 0.15);
    }

    #[test]
    fn tier_parses_case_insensitively() {
        assert_eq!("Legacy".parse::<DifficultyTier>().unwrap(), DifficultyTier::Legacy);
        assert!("epic".parse::<DifficultyTier>().is_err());
    }

    #[test]
    fn routine_is_the_default_tier() {
        assert_eq!(DifficultyTier::default(), DifficultyTier::Routine);
    }

    #[test]
    fn toggle_flips_state() {
        let mut sub = Subtask::new("write migration", DifficultyTier::Complex);
        assert!(sub.toggle_completed());
        assert!(!sub.toggle_completed());
    }
}
