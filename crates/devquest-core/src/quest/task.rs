//! Tasks (quests) with owned subtasks, elapsed-time tracking and age-based
//! escalation into "Boss" / technical-debt quests.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::subtask::{DifficultyTier, Subtask};
use super::timer::{StoppedRun, WorkTimer};
use super::QuestPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub completed: bool,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub timer: WorkTimer,
    /// Owned exclusively; dropping the task drops them.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// XP actually credited on completion, taken back on reopen.
    #[serde(default)]
    pub awarded_xp: u64,
}

impl Task {
    pub fn new(title: impl Into<String>, notes: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            notes: notes.into(),
            created_at: now,
            completed: false,
            completed_at: None,
            timer: WorkTimer::default(),
            subtasks: Vec::new(),
            awarded_xp: 0,
        }
    }

    // ── Derived state ────────────────────────────────────────────────

    /// Incomplete and strictly older than the escalation window.
    pub fn is_escalated(&self, now: DateTime<Utc>, policy: &QuestPolicy) -> bool {
        !self.completed && now - self.created_at > policy.escalation_window()
    }

    /// 0.0 .. 1.0 completion, by subtask count when there are any.
    pub fn progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return if self.completed { 1.0 } else { 0.0 };
        }
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        done as f64 / self.subtasks.len() as f64
    }

    /// Subtask rewards plus the flat completion bonus (doubled for bosses).
    pub fn total_xp_reward(&self, now: DateTime<Utc>, policy: &QuestPolicy) -> u64 {
        let subtasks: u64 = self.subtasks.iter().map(Subtask::xp_reward).sum();
        let bonus = if self.is_escalated(now, policy) {
            policy.boss_completion_bonus
        } else {
            policy.base_completion_bonus
        };
        subtasks + bonus
    }

    /// Own time plus every subtask's time, running segments included.
    pub fn total_elapsed(&self, now: DateTime<Utc>) -> Duration {
        self.subtasks
            .iter()
            .map(|s| s.total_elapsed(now))
            .fold(self.timer.total(now), |acc, d| acc + d)
    }

    // ── Timer ────────────────────────────────────────────────────────

    pub fn start_timer(&mut self, now: DateTime<Utc>) -> bool {
        let started = self.timer.start(now);
        if started {
            tracing::debug!(task = %self.id, "task timer started");
        }
        started
    }

    pub fn stop_timer(&mut self, now: DateTime<Utc>) -> Duration {
        let run = self.timer.stop(now);
        if run > Duration::zero() {
            tracing::debug!(task = %self.id, secs = run.num_seconds(), "task timer stopped");
        }
        run
    }

    // ── Completion ───────────────────────────────────────────────────

    /// Mark the task and every subtask complete.
    ///
    /// Running timers are stopped first; the flushed runs are returned so
    /// the caller can log them. Awarding XP is up to the caller.
    pub fn complete(&mut self, now: DateTime<Utc>) -> Vec<StoppedRun> {
        let mut runs = Vec::new();
        if let Some(run) = self.flush_own(now) {
            runs.push(run);
        }
        for index in 0..self.subtasks.len() {
            if let Some(run) = self.flush_subtask(index, now) {
                runs.push(run);
            }
            self.subtasks[index].completed = true;
        }
        if !self.completed {
            self.completed = true;
            self.completed_at = Some(now);
            tracing::info!(task = %self.id, title = %self.title, "task completed");
        }
        runs
    }

    /// Un-check a completed task. Returns `false` if it was not completed.
    ///
    /// Subtask completion is left as it was.
    pub fn reopen(&mut self) -> bool {
        if !self.completed {
            return false;
        }
        self.completed = false;
        self.completed_at = None;
        true
    }

    // ── Subtasks ─────────────────────────────────────────────────────

    pub fn add_subtask(&mut self, title: impl Into<String>, tier: DifficultyTier) -> Uuid {
        let subtask = Subtask::new(title, tier);
        let id = subtask.id;
        self.subtasks.push(subtask);
        id
    }

    pub fn subtask(&self, id: Uuid) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    pub fn subtask_mut(&mut self, id: Uuid) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == id)
    }

    /// First subtask with a running timer.
    pub fn active_subtask(&self) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.timer.is_active())
    }

    /// The timer currently doing work for this task: the task's own if it
    /// runs, otherwise the first running subtask's.
    pub fn active_timer_mut(&mut self) -> Option<&mut WorkTimer> {
        if self.timer.is_active() {
            return Some(&mut self.timer);
        }
        self.subtasks
            .iter_mut()
            .find(|s| s.timer.is_active())
            .map(|s| &mut s.timer)
    }

    /// Stop the task's own timer and describe the run.
    pub fn flush_own(&mut self, now: DateTime<Utc>) -> Option<StoppedRun> {
        let started_at = self.timer.active_since?;
        let elapsed = self.stop_timer(now);
        Some(StoppedRun {
            task_id: self.id,
            subtask_id: None,
            label: self.title.clone(),
            started_at,
            ended_at: now,
            elapsed,
        })
    }

    /// Stop one subtask's timer and describe the run.
    pub fn flush_subtask_by_id(&mut self, id: Uuid, now: DateTime<Utc>) -> Option<StoppedRun> {
        let index = self.subtasks.iter().position(|s| s.id == id)?;
        self.flush_subtask(index, now)
    }

    fn flush_subtask(&mut self, index: usize, now: DateTime<Utc>) -> Option<StoppedRun> {
        let subtask = self.subtasks.get_mut(index)?;
        let started_at = subtask.timer.active_since?;
        let elapsed = subtask.stop_timer(now);
        Some(StoppedRun {
            task_id: self.id,
            subtask_id: Some(subtask.id),
            label: format!("{} / {}", self.title, subtask.title),
            started_at,
            ended_at: now,
            elapsed,
        })
    }
}
