//! # DevQuest Core Library
//!
//! Core logic for DevQuest, a burnout-aware time and progression engine
//! for software developers. Every operation is available through the
//! standalone `devquest` CLI, which is a thin shell over this crate.
//!
//! ## Architecture
//!
//! - **Progression**: level, XP, currency and a burnout meter that scales
//!   rewards down when the developer is overloaded and decays with rest
//! - **Quests**: tasks with subtasks, per-item work timers and age-based
//!   escalation into boss quests
//! - **Focus**: a Pomodoro state machine driven by an external one-second
//!   `tick()`, with flow mode and overtime detection
//! - **Storage**: SQLite snapshots and work-session history, TOML config
//!
//! Time is never read implicitly: every transition takes its instant from
//! a [`Clock`], so the whole engine can be driven by a [`ManualClock`].
//!
//! ## Key Components
//!
//! - [`Engine`]: facade that owns the state and emits [`Event`]s
//! - [`ProgressionAccount`]: XP, level and burnout arithmetic
//! - [`FocusSession`]: focus/break cycle state machine
//! - [`Database`]: persistence of snapshots and work sessions
//! - [`Config`]: tunable rules

pub mod clock;
pub mod engine;
pub mod error;
pub mod events;
pub mod focus;
pub mod progression;
pub mod quest;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{AccountStatus, Engine, SubtaskView, TaskView};
pub use error::{ConfigError, CoreError, DatabaseError, Result, ValidationError};
pub use events::Event;
pub use focus::{FocusPhase, FocusPolicy, FocusSession};
pub use progression::{BurnoutStatus, ProgressionAccount, ProgressionPolicy, XpAward};
pub use quest::{DifficultyTier, QuestBoard, QuestPolicy, StoppedRun, Subtask, Task, WorkTimer};
pub use storage::{Config, Database, SessionKind, Stats, WorkSession};
