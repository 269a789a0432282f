//! The engine facade: the single surface UI and mini-game collaborators call.
//!
//! `Engine` owns the progression account, the quest board and the focus
//! session, and hands all of them the instant read from its injected
//! [`Clock`]. It never performs I/O; every call returns the events it
//! produced and the caller decides what to persist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{Result, ValidationError};
use crate::events::Event;
use crate::focus::{FocusPhase, FocusSession};
use crate::progression::{BurnoutStatus, ProgressionAccount};
use crate::quest::{DifficultyTier, QuestBoard, Task};
use crate::storage::Config;

/// Read-only projection of the account for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountStatus {
    pub level: u32,
    pub current_xp: u64,
    pub xp_to_next_level: u64,
    pub level_progress: f64,
    pub currency: u64,
    pub burnout: f64,
    pub burnout_status: BurnoutStatus,
    pub total_focus_minutes: u64,
}

/// Read-only projection of a task with its derived values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: Uuid,
    pub title: String,
    pub completed: bool,
    pub escalated: bool,
    pub progress: f64,
    pub xp_reward: u64,
    pub total_elapsed_secs: u64,
    pub timer_running: bool,
    pub subtasks: Vec<SubtaskView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtaskView {
    pub id: Uuid,
    pub title: String,
    pub tier: DifficultyTier,
    pub completed: bool,
    pub xp_reward: u64,
    pub burnout_impact: f64,
    pub elapsed_secs: u64,
    pub timer_running: bool,
}

pub struct Engine<C: Clock> {
    clock: C,
    config: Config,
    account: ProgressionAccount,
    board: QuestBoard,
    session: FocusSession,
}

impl<C: Clock> Engine<C> {
    /// A brand-new profile with an empty board.
    pub fn new(config: Config, clock: C) -> Self {
        let account = ProgressionAccount::new(&config.progression, clock.now());
        Self::with_state(config, clock, account, QuestBoard::new())
    }

    /// Resume from persisted state. The focus session always starts idle.
    pub fn with_state(
        config: Config,
        clock: C,
        account: ProgressionAccount,
        board: QuestBoard,
    ) -> Self {
        let session = FocusSession::new(config.focus.clone());
        Self {
            clock,
            config,
            account,
            board,
            session,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn account(&self) -> &ProgressionAccount {
        &self.account
    }

    pub fn board(&self) -> &QuestBoard {
        &self.board
    }

    pub fn session(&self) -> &FocusSession {
        &self.session
    }

    pub fn into_parts(self) -> (ProgressionAccount, QuestBoard) {
        (self.account, self.board)
    }

    pub fn status(&self) -> AccountStatus {
        let a = &self.account;
        AccountStatus {
            level: a.level,
            current_xp: a.current_xp,
            xp_to_next_level: a.xp_to_next_level,
            level_progress: a.level_progress_fraction(),
            currency: a.currency,
            burnout: a.burnout,
            burnout_status: a.burnout_status(),
            total_focus_minutes: a.total_focus_minutes,
        }
    }

    pub fn task_view(&self, id: Uuid) -> Option<TaskView> {
        let now = self.now();
        let policy = &self.config.quests;
        let task = self.board.get(id)?;
        Some(TaskView {
            id: task.id,
            title: task.title.clone(),
            completed: task.completed,
            escalated: task.is_escalated(now, policy),
            progress: task.progress(),
            xp_reward: task.total_xp_reward(now, policy),
            total_elapsed_secs: task.total_elapsed(now).num_seconds().max(0) as u64,
            timer_running: task.timer.is_active(),
            subtasks: task
                .subtasks
                .iter()
                .map(|s| SubtaskView {
                    id: s.id,
                    title: s.title.clone(),
                    tier: s.tier,
                    completed: s.completed,
                    xp_reward: s.xp_reward(),
                    burnout_impact: s.burnout_impact(),
                    elapsed_secs: s.total_elapsed(now).num_seconds().max(0) as u64,
                    timer_running: s.timer.is_active(),
                })
                .collect(),
        })
    }

    pub fn task_views(&self) -> Vec<TaskView> {
        self.board
            .tasks()
            .iter()
            .filter_map(|t| self.task_view(t.id))
            .collect()
    }

    pub fn snapshot(&self) -> Event {
        self.session.snapshot(self.now())
    }

    // ── Progression ──────────────────────────────────────────────────

    pub fn award_xp(&mut self, amount: u64, difficulty_multiplier: f64) -> Vec<Event> {
        let now = self.now();
        let award = self
            .account
            .award_xp(amount, difficulty_multiplier, &self.config.progression, now);
        Event::from_award(&award, now)
    }

    pub fn revert_xp(&mut self, amount: u64) -> Vec<Event> {
        self.account.revert_xp(amount);
        vec![Event::XpReverted {
            amount,
            at: self.now(),
        }]
    }

    pub fn recover_burnout(&mut self, amount: f64) -> Vec<Event> {
        let before = self.account.burnout;
        self.account.recover_burnout(amount);
        self.recovered_since(before)
    }

    /// Apply rest recovery up to now. Safe to call as often as needed.
    pub fn decay_burnout(&mut self) -> Vec<Event> {
        let before = self.account.burnout;
        let now = self.now();
        self.account.decay_burnout(&self.config.progression, now);
        self.recovered_since(before)
    }

    /// A mini-game result: XP through the regular award path, then any
    /// burnout reduction.
    pub fn report_arcade(&mut self, xp_earned: u64, burnout_delta: f64) -> Vec<Event> {
        let now = self.now();
        let mut events = vec![Event::ArcadeReported {
            xp_earned,
            burnout_delta,
            at: now,
        }];
        if xp_earned > 0 {
            events.extend(self.award_xp(xp_earned, 0.0));
        }
        if burnout_delta > 0.0 {
            events.extend(self.recover_burnout(burnout_delta));
        }
        events
    }

    // ── Quests ───────────────────────────────────────────────────────

    pub fn add_task(&mut self, title: &str, notes: &str) -> Result<Uuid> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        let task = Task::new(title, notes, self.now());
        tracing::debug!(task = %task.id, title, "task added");
        Ok(self.board.add(task))
    }

    /// `None` when the task does not exist.
    pub fn add_subtask(&mut self, task_id: Uuid, title: &str, tier: DifficultyTier) -> Result<Option<Uuid>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle.into());
        }
        Ok(self.board.get_mut(task_id).map(|t| t.add_subtask(title, tier)))
    }

    /// Delete a task and its subtasks. Running timers are discarded.
    pub fn remove_task(&mut self, task_id: Uuid) -> Option<Task> {
        if self.session.linked_task() == Some(task_id) {
            self.session.link_task(None);
        }
        self.board.remove(task_id)
    }

    pub fn start_task_timer(&mut self, task_id: Uuid) -> Vec<Event> {
        let now = self.now();
        let started = self
            .board
            .get_mut(task_id)
            .is_some_and(|task| task.start_timer(now));
        if !started {
            return Vec::new();
        }
        vec![Event::TimerStarted {
            task_id,
            subtask_id: None,
            at: now,
        }]
    }

    pub fn stop_task_timer(&mut self, task_id: Uuid) -> Vec<Event> {
        let now = self.now();
        self.board
            .get_mut(task_id)
            .and_then(|task| task.flush_own(now))
            .map(|run| vec![Event::from_stopped_run(&run)])
            .unwrap_or_default()
    }

    pub fn start_subtask_timer(&mut self, task_id: Uuid, subtask_id: Uuid) -> Vec<Event> {
        let now = self.now();
        let started = self
            .board
            .get_mut(task_id)
            .and_then(|t| t.subtask_mut(subtask_id))
            .is_some_and(|s| s.start_timer(now));
        if !started {
            return Vec::new();
        }
        vec![Event::TimerStarted {
            task_id,
            subtask_id: Some(subtask_id),
            at: now,
        }]
    }

    pub fn stop_subtask_timer(&mut self, task_id: Uuid, subtask_id: Uuid) -> Vec<Event> {
        let now = self.now();
        self.board
            .get_mut(task_id)
            .and_then(|task| task.flush_subtask_by_id(subtask_id, now))
            .map(|run| vec![Event::from_stopped_run(&run)])
            .unwrap_or_default()
    }

    /// Complete a task (cascading to its subtasks) and award its XP reward.
    pub fn complete_task(&mut self, task_id: Uuid) -> Vec<Event> {
        let now = self.now();
        let policy = &self.config.quests;
        let Some(task) = self.board.get_mut(task_id) else {
            return Vec::new();
        };
        if task.completed {
            return Vec::new();
        }
        let escalated = task.is_escalated(now, policy);
        let xp_reward = task.total_xp_reward(now, policy);
        let runs = task.complete(now);

        let mut events: Vec<Event> = runs.iter().map(Event::from_stopped_run).collect();
        events.push(Event::QuestCompleted {
            task_id,
            xp_reward,
            escalated,
            at: now,
        });
        let award = self
            .account
            .award_xp(xp_reward, 1.0, &self.config.progression, now);
        if let Some(task) = self.board.get_mut(task_id) {
            task.awarded_xp = award.final_xp;
        }
        events.extend(Event::from_award(&award, now));
        events
    }

    /// Un-check a completed task and take back the XP it earned.
    pub fn reopen_task(&mut self, task_id: Uuid) -> Vec<Event> {
        let now = self.now();
        let Some(task) = self.board.get_mut(task_id) else {
            return Vec::new();
        };
        if !task.reopen() {
            return Vec::new();
        }
        let amount = std::mem::take(&mut task.awarded_xp);
        self.account.revert_xp(amount);
        vec![
            Event::QuestReopened {
                task_id,
                xp_reverted: amount,
                at: now,
            },
            Event::XpReverted { amount, at: now },
        ]
    }

    /// Check or un-check a subtask, awarding or reverting its tier reward.
    pub fn toggle_subtask(&mut self, task_id: Uuid, subtask_id: Uuid) -> Vec<Event> {
        let now = self.now();
        let Some(task) = self.board.get_mut(task_id) else {
            return Vec::new();
        };
        let Some(subtask) = task.subtask(subtask_id) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if !subtask.completed {
            if let Some(run) = task.flush_subtask_by_id(subtask_id, now) {
                events.push(Event::from_stopped_run(&run));
            }
        }
        let Some(subtask) = task.subtask_mut(subtask_id) else {
            return events;
        };
        let completed = subtask.toggle_completed();
        let reward = subtask.xp_reward();
        events.push(Event::SubQuestToggled {
            task_id,
            subtask_id,
            completed,
            at: now,
        });

        if completed {
            let award = self
                .account
                .award_xp(reward, 1.0, &self.config.progression, now);
            events.extend(Event::from_award(&award, now));
        } else {
            self.account.revert_xp(reward);
            events.push(Event::XpReverted {
                amount: reward,
                at: now,
            });
        }
        events
    }

    // ── Focus session ────────────────────────────────────────────────

    /// Attach a task to the focus session for overtime tracking and early
    /// completion. Returns `false` if the task does not exist.
    pub fn link_focus(&mut self, task_id: Option<Uuid>) -> bool {
        if let Some(id) = task_id {
            if self.board.get(id).is_none() {
                return false;
            }
        }
        self.session.link_task(task_id);
        true
    }

    pub fn focus_start(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.start(now).into_iter().collect()
    }

    pub fn focus_start_flow(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.start_flow(now).into_iter().collect()
    }

    pub fn focus_pause(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.pause(now).into_iter().collect()
    }

    pub fn focus_resume(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.resume(now).into_iter().collect()
    }

    pub fn focus_skip_break(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.skip_break(now)
    }

    pub fn focus_reset(&mut self) -> Vec<Event> {
        let now = self.now();
        self.session.reset(now).into_iter().collect()
    }

    pub fn focus_complete_early(&mut self) -> Vec<Event> {
        let now = self.now();
        let task = self
            .session
            .linked_task()
            .and_then(|id| self.board.get_mut(id))
            .filter(|t| !t.completed);
        self.session
            .complete_early(&mut self.account, &self.config.progression, task, now)
    }

    /// Advance the focus session by one second and watch the linked task
    /// for overtime.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.now();
        let mut events = self
            .session
            .tick(&mut self.account, &self.config.progression, now);

        if let Some(task) = self
            .session
            .linked_task()
            .and_then(|id| self.board.get_mut(id))
        {
            events.extend(self.session.check_overtime(task, &mut self.account, now));
        }
        events
    }

    pub fn focus_phase(&self) -> FocusPhase {
        self.session.phase()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn recovered_since(&self, before: f64) -> Vec<Event> {
        let amount = before - self.account.burnout;
        if amount <= 0.0 {
            return Vec::new();
        }
        vec![Event::BurnoutRecovered {
            amount,
            burnout: self.account.burnout,
            at: self.now(),
        }]
    }
}
