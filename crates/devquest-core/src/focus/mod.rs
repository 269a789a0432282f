mod overtime;
mod session;

use serde::{Deserialize, Serialize};

pub use session::FocusSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusPhase {
    Idle,
    Focus,
    ShortBreak,
    LongBreak,
}

impl FocusPhase {
    pub fn is_break(&self) -> bool {
        matches!(self, FocusPhase::ShortBreak | FocusPhase::LongBreak)
    }
}

/// Focus timer configuration. `[focus]` in `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusPolicy {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
    /// Focus phases before a long break.
    pub sessions_per_cycle: u32,
    /// Count breaks (and the focus phase after them) down immediately.
    pub auto_start_breaks: bool,
    pub short_break_recovery: f64,
    pub long_break_recovery: f64,
    pub focus_xp: u64,
    pub flow_xp: u64,
    /// Bonus for finishing the linked task with an early completion.
    pub early_task_bonus_xp: u64,
    /// Burnout added the first time a linked task timer runs overtime.
    pub overtime_penalty: f64,
}

impl Default for FocusPolicy {
    fn default() -> Self {
        Self {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            sessions_per_cycle: 4,
            auto_start_breaks: true,
            short_break_recovery: 0.05,
            long_break_recovery: 0.15,
            focus_xp: 15,
            flow_xp: 30,
            early_task_bonus_xp: 50,
            overtime_penalty: 0.10,
        }
    }
}

impl FocusPolicy {
    /// Configured length of a phase in seconds. `Idle` has none.
    pub fn phase_secs(&self, phase: FocusPhase) -> u64 {
        let minutes = match phase {
            FocusPhase::Idle => 0,
            FocusPhase::Focus => self.focus_minutes,
            FocusPhase::ShortBreak => self.short_break_minutes,
            FocusPhase::LongBreak => self.long_break_minutes,
        };
        (minutes as u64).saturating_mul(60)
    }
}
