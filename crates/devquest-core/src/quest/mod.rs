//! Quests (tasks), sub-quests and their work timers.

mod board;
mod subtask;
mod task;
mod timer;

use chrono::Duration;
use serde::{Deserialize, Serialize};

pub use board::QuestBoard;
pub use subtask::{DifficultyTier, Subtask};
pub use task::Task;
pub use timer::{StoppedRun, WorkTimer};

/// Escalation and completion-bonus rules. `[quests]` in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestPolicy {
    /// Open tasks strictly older than this become bosses.
    pub escalation_days: u32,
    pub base_completion_bonus: u64,
    pub boss_completion_bonus: u64,
}

impl Default for QuestPolicy {
    fn default() -> Self {
        Self {
            escalation_days: 3,
            base_completion_bonus: 50,
            boss_completion_bonus: 100,
        }
    }
}

impl QuestPolicy {
    pub fn escalation_window(&self) -> Duration {
        Duration::days(self.escalation_days as i64)
    }
}
