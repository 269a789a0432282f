use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::focus::FocusPhase;
use crate::progression::XpAward;
use crate::quest::StoppedRun;

/// Every state change in the engine produces an Event.
/// The UI renders them; the persistence collaborator mines them for
/// work-session records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        task_id: Uuid,
        subtask_id: Option<Uuid>,
        at: DateTime<Utc>,
    },
    TimerStopped {
        task_id: Uuid,
        subtask_id: Option<Uuid>,
        label: String,
        started_at: DateTime<Utc>,
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    QuestCompleted {
        task_id: Uuid,
        xp_reward: u64,
        escalated: bool,
        at: DateTime<Utc>,
    },
    QuestReopened {
        task_id: Uuid,
        xp_reverted: u64,
        at: DateTime<Utc>,
    },
    SubQuestToggled {
        task_id: Uuid,
        subtask_id: Uuid,
        completed: bool,
        at: DateTime<Utc>,
    },
    XpAwarded {
        requested: u64,
        final_xp: u64,
        currency_gained: u64,
        penalized: bool,
        burnout: f64,
        at: DateTime<Utc>,
    },
    XpReverted {
        amount: u64,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        xp_to_next_level: u64,
        at: DateTime<Utc>,
    },
    BurnoutRecovered {
        amount: f64,
        burnout: f64,
        at: DateTime<Utc>,
    },
    FocusStarted {
        flow_mode: bool,
        duration_secs: u64,
        running: bool,
        at: DateTime<Utc>,
    },
    FocusPaused {
        phase: FocusPhase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    FocusResumed {
        phase: FocusPhase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    FocusCompleted {
        minutes: u64,
        sessions_completed_in_cycle: u32,
        at: DateTime<Utc>,
    },
    BreakStarted {
        phase: FocusPhase,
        duration_secs: u64,
        running: bool,
        at: DateTime<Utc>,
    },
    BreakCompleted {
        phase: FocusPhase,
        recovered: f64,
        at: DateTime<Utc>,
    },
    BreakSkipped {
        phase: FocusPhase,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    CompletedEarly {
        seconds_spent: u64,
        flow_mode: bool,
        task_id: Option<Uuid>,
        at: DateTime<Utc>,
    },
    /// A linked task timer ran past the configured focus length.
    /// Raised once per timer run.
    OvertimeStarted {
        task_id: Uuid,
        subtask_id: Option<Uuid>,
        over_by_secs: u64,
        penalty: f64,
        at: DateTime<Utc>,
    },
    ArcadeReported {
        xp_earned: u64,
        burnout_delta: f64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: FocusPhase,
        running: bool,
        remaining_secs: u64,
        total_secs: u64,
        sessions_completed_in_cycle: u32,
        sessions_per_cycle: u32,
        flow_mode: bool,
        overtime: bool,
        linked_task: Option<Uuid>,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// `XpAwarded`, followed by `LevelUp` when the award crossed a threshold.
    pub fn from_award(award: &XpAward, at: DateTime<Utc>) -> Vec<Event> {
        let mut events = vec![Event::XpAwarded {
            requested: award.requested,
            final_xp: award.final_xp,
            currency_gained: award.currency_gained,
            penalized: award.penalized,
            burnout: award.burnout_after,
            at,
        }];
        if award.levels_gained > 0 {
            events.push(Event::LevelUp {
                level: award.level,
                xp_to_next_level: award.xp_to_next_level,
                at,
            });
        }
        events
    }

    pub fn from_stopped_run(run: &StoppedRun) -> Event {
        Event::TimerStopped {
            task_id: run.task_id,
            subtask_id: run.subtask_id,
            label: run.label.clone(),
            started_at: run.started_at,
            elapsed_secs: run.elapsed.num_seconds().max(0) as u64,
            at: run.ended_at,
        }
    }
}
