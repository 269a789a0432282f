//! Focus session state machine.
//!
//! A Pomodoro-style single timer. It has no internal thread or clock: the
//! caller feeds it one `tick()` per second along with the current instant,
//! and every transition returns the events it produced.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Focus -> (ShortBreak | LongBreak) -> Focus -> ...
//!   ^                                             |
//!   +---------------- reset / complete_early -----+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut session = FocusSession::new(FocusPolicy::default());
//! session.start(now);
//! // Once per second:
//! let events = session.tick(&mut account, &progression, now);
//! ```

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::overtime;
use super::{FocusPhase, FocusPolicy};
use crate::events::Event;
use crate::progression::{ProgressionAccount, ProgressionPolicy};
use crate::quest::Task;

/// Ephemeral focus timer. Never persisted; a restart begins at `Idle`.
#[derive(Debug, Clone)]
pub struct FocusSession {
    policy: FocusPolicy,
    phase: FocusPhase,
    /// Counting down (or up, in flow mode). False while paused or while a
    /// phase waits to be started.
    running: bool,
    remaining_secs: u64,
    total_secs: u64,
    sessions_completed_in_cycle: u32,
    flow_mode: bool,
    flow_elapsed_secs: u64,
    linked_task: Option<Uuid>,
    overtime: bool,
}

impl FocusSession {
    pub fn new(policy: FocusPolicy) -> Self {
        let focus_secs = policy.phase_secs(FocusPhase::Focus);
        Self {
            policy,
            phase: FocusPhase::Idle,
            running: false,
            remaining_secs: focus_secs,
            total_secs: focus_secs,
            sessions_completed_in_cycle: 0,
            flow_mode: false,
            flow_elapsed_secs: 0,
            linked_task: None,
            overtime: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> FocusPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn sessions_completed_in_cycle(&self) -> u32 {
        self.sessions_completed_in_cycle
    }

    pub fn sessions_per_cycle(&self) -> u32 {
        self.policy.sessions_per_cycle
    }

    pub fn is_flow_mode(&self) -> bool {
        self.flow_mode
    }

    pub fn flow_elapsed_secs(&self) -> u64 {
        self.flow_elapsed_secs
    }

    pub fn linked_task(&self) -> Option<Uuid> {
        self.linked_task
    }

    /// A linked task timer is currently past the focus length.
    pub fn is_overtime(&self) -> bool {
        self.overtime
    }

    pub fn policy(&self) -> &FocusPolicy {
        &self.policy
    }

    /// Seconds worked in the current focus phase.
    pub fn seconds_spent(&self) -> u64 {
        if self.flow_mode {
            self.flow_elapsed_secs
        } else {
            self.total_secs.saturating_sub(self.remaining_secs)
        }
    }

    pub fn snapshot(&self, at: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            running: self.running,
            remaining_secs: self.remaining_secs,
            total_secs: self.total_secs,
            sessions_completed_in_cycle: self.sessions_completed_in_cycle,
            sessions_per_cycle: self.policy.sessions_per_cycle,
            flow_mode: self.flow_mode,
            overtime: self.overtime,
            linked_task: self.linked_task,
            at,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Attach (or detach) the task whose timer is watched for overtime and
    /// which `complete_early` finishes.
    pub fn link_task(&mut self, task: Option<Uuid>) {
        self.linked_task = task;
        self.overtime = false;
    }

    /// `Idle -> Focus`. A phase that is waiting to be started (auto-start
    /// disabled) or paused begins counting instead.
    pub fn start(&mut self, now: DateTime<Utc>) -> Option<Event> {
        match self.phase {
            FocusPhase::Idle => Some(self.begin_focus(false, now)),
            _ if !self.running => self.resume(now),
            _ => None,
        }
    }

    /// `Idle -> Focus` without a countdown; time accrues until completed.
    pub fn start_flow(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase != FocusPhase::Idle {
            return None;
        }
        Some(self.begin_focus(true, now))
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase == FocusPhase::Idle || !self.running {
            return None;
        }
        self.running = false;
        Some(Event::FocusPaused {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<Event> {
        if self.phase == FocusPhase::Idle || self.running {
            return None;
        }
        self.running = true;
        Some(Event::FocusResumed {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            at: now,
        })
    }

    /// Advance one second.
    pub fn tick(
        &mut self,
        account: &mut ProgressionAccount,
        progression: &ProgressionPolicy,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        if !self.running {
            return Vec::new();
        }
        match self.phase {
            FocusPhase::Idle => Vec::new(),
            FocusPhase::Focus if self.flow_mode => {
                self.flow_elapsed_secs = self.flow_elapsed_secs.saturating_add(1);
                Vec::new()
            }
            FocusPhase::Focus => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.complete_focus(account, progression, now)
                } else {
                    Vec::new()
                }
            }
            FocusPhase::ShortBreak | FocusPhase::LongBreak => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.complete_break(account, now)
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Leave a break for a fresh focus phase. No recovery is credited.
    pub fn skip_break(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        if !self.phase.is_break() {
            return Vec::new();
        }
        let skipped = self.phase;
        tracing::debug!(phase = ?skipped, remaining = self.remaining_secs, "break skipped");
        let running = self.policy.auto_start_breaks;
        let started = self.enter_focus(running, now);
        vec![Event::BreakSkipped { phase: skipped, at: now }, started]
    }

    /// Back to `Idle` from anywhere, clearing the cycle and flow mode.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Option<Event> {
        self.clear();
        Some(Event::SessionReset { at: now })
    }

    /// Finish the focus phase before the countdown ends.
    ///
    /// Credits the time actually spent and the focus XP (flow XP in flow
    /// mode). When `task` is given it is completed and earns the early
    /// completion bonus. Ends at `Idle`.
    pub fn complete_early(
        &mut self,
        account: &mut ProgressionAccount,
        progression: &ProgressionPolicy,
        task: Option<&mut Task>,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        if self.phase != FocusPhase::Focus {
            return Vec::new();
        }
        let seconds_spent = self.seconds_spent();
        let flow_mode = self.flow_mode;
        account.credit_focus_minutes(seconds_spent / 60);

        let xp = if flow_mode {
            self.policy.flow_xp
        } else {
            self.policy.focus_xp
        };
        let mut events = vec![Event::CompletedEarly {
            seconds_spent,
            flow_mode,
            task_id: task.as_ref().map(|t| t.id),
            at: now,
        }];
        events.extend(Event::from_award(
            &account.award_xp(xp, 1.0, progression, now),
            now,
        ));

        if let Some(task) = task {
            let runs = task.complete(now);
            events.extend(runs.iter().map(Event::from_stopped_run));
            events.push(Event::QuestCompleted {
                task_id: task.id,
                xp_reward: self.policy.early_task_bonus_xp,
                escalated: false,
                at: now,
            });
            let bonus = account.award_xp(self.policy.early_task_bonus_xp, 1.0, progression, now);
            task.awarded_xp = bonus.final_xp;
            events.extend(Event::from_award(&bonus, now));
        }

        tracing::info!(seconds_spent, flow_mode, "focus completed early");
        self.clear();
        events
    }

    /// Watch the linked task's running timer for overtime.
    ///
    /// Only meaningful during `Focus`; the penalty and the alert fire on the
    /// first overrun of each timer run.
    pub fn check_overtime(
        &mut self,
        task: &mut Task,
        account: &mut ProgressionAccount,
        now: DateTime<Utc>,
    ) -> Option<Event> {
        if self.phase != FocusPhase::Focus || self.linked_task != Some(task.id) {
            self.overtime = false;
            return None;
        }
        let task_id = task.id;
        let subtask_id = if task.timer.is_active() {
            None
        } else {
            task.active_subtask().map(|s| s.id)
        };
        let limit = Duration::seconds(self.policy.phase_secs(FocusPhase::Focus) as i64);
        let Some(timer) = task.active_timer_mut() else {
            self.overtime = false;
            return None;
        };

        let check = overtime::detect(timer, limit, now);
        self.overtime = check.over;
        if !check.newly_over {
            return None;
        }
        account.apply_strain(self.policy.overtime_penalty);
        tracing::warn!(task = %task_id, over_by = check.over_by.num_seconds(), "focus overtime");
        Some(Event::OvertimeStarted {
            task_id,
            subtask_id,
            over_by_secs: check.over_by.num_seconds().max(0) as u64,
            penalty: self.policy.overtime_penalty,
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_focus(&mut self, flow_mode: bool, now: DateTime<Utc>) -> Event {
        self.flow_mode = flow_mode;
        self.enter_focus(true, now)
    }

    fn enter_focus(&mut self, running: bool, now: DateTime<Utc>) -> Event {
        let total = if self.flow_mode {
            0
        } else {
            self.policy.phase_secs(FocusPhase::Focus)
        };
        self.phase = FocusPhase::Focus;
        self.total_secs = total;
        self.remaining_secs = total;
        self.flow_elapsed_secs = 0;
        self.running = running;
        tracing::debug!(flow = self.flow_mode, total, running, "focus phase entered");
        Event::FocusStarted {
            flow_mode: self.flow_mode,
            duration_secs: total,
            running,
            at: now,
        }
    }

    fn enter_break(&mut self, phase: FocusPhase, now: DateTime<Utc>) -> Event {
        let total = self.policy.phase_secs(phase);
        let running = self.policy.auto_start_breaks;
        self.phase = phase;
        self.total_secs = total;
        self.remaining_secs = total;
        self.running = running;
        self.overtime = false;
        Event::BreakStarted {
            phase,
            duration_secs: total,
            running,
            at: now,
        }
    }

    fn complete_focus(
        &mut self,
        account: &mut ProgressionAccount,
        progression: &ProgressionPolicy,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let minutes = self.total_secs / 60;
        account.credit_focus_minutes(minutes);
        let award = account.award_xp(self.policy.focus_xp, 1.0, progression, now);

        self.sessions_completed_in_cycle += 1;
        let completed_in_cycle = self.sessions_completed_in_cycle;
        let next = if self.sessions_completed_in_cycle >= self.policy.sessions_per_cycle {
            self.sessions_completed_in_cycle = 0;
            FocusPhase::LongBreak
        } else {
            FocusPhase::ShortBreak
        };
        tracing::info!(minutes, completed_in_cycle, next = ?next, "focus phase completed");

        let mut events = vec![Event::FocusCompleted {
            minutes,
            sessions_completed_in_cycle: completed_in_cycle,
            at: now,
        }];
        events.extend(Event::from_award(&award, now));
        events.push(self.enter_break(next, now));
        events
    }

    fn complete_break(&mut self, account: &mut ProgressionAccount, now: DateTime<Utc>) -> Vec<Event> {
        let finished = self.phase;
        let amount = match finished {
            FocusPhase::LongBreak => self.policy.long_break_recovery,
            _ => self.policy.short_break_recovery,
        };
        account.recover_burnout(amount);
        tracing::debug!(phase = ?finished, amount, burnout = account.burnout, "break completed");

        let running = self.policy.auto_start_breaks;
        vec![
            Event::BreakCompleted {
                phase: finished,
                recovered: amount,
                at: now,
            },
            Event::BurnoutRecovered {
                amount,
                burnout: account.burnout,
                at: now,
            },
            self.enter_focus(running, now),
        ]
    }

    fn clear(&mut self) {
        let focus_secs = self.policy.phase_secs(FocusPhase::Focus);
        self.phase = FocusPhase::Idle;
        self.running = false;
        self.remaining_secs = focus_secs;
        self.total_secs = focus_secs;
        self.sessions_completed_in_cycle = 0;
        self.flow_mode = false;
        self.flow_elapsed_secs = 0;
        self.linked_task = None;
        self.overtime = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_policy() -> FocusPolicy {
        FocusPolicy {
            focus_minutes: 1,
            short_break_minutes: 1,
            long_break_minutes: 2,
            ..FocusPolicy::default()
        }
    }

    fn run_secs(
        session: &mut FocusSession,
        account: &mut ProgressionAccount,
        progression: &ProgressionPolicy,
        secs: u64,
        now: DateTime<Utc>,
    ) -> Vec<Event> {
        let mut events = Vec::new();
        for i in 0..secs {
            events.extend(session.tick(account, progression, now + Duration::seconds(i as i64 + 1)));
        }
        events
    }

    #[test]
    fn start_pause_resume() {
        let now = Utc::now();
        let mut session = FocusSession::new(FocusPolicy::default());
        assert_eq!(session.phase(), FocusPhase::Idle);

        assert!(session.start(now).is_some());
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert!(session.is_running());
        assert_eq!(session.remaining_secs(), 25 * 60);

        assert!(session.pause(now).is_some());
        assert!(!session.is_running());
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert!(session.pause(now).is_none());

        assert!(session.resume(now).is_some());
        assert!(session.is_running());
        assert!(session.start(now).is_none());
    }

    #[test]
    fn paused_session_does_not_count_down() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(FocusPolicy::default());
        session.start(now);
        run_secs(&mut session, &mut account, &progression, 10, now);
        session.pause(now);
        run_secs(&mut session, &mut account, &progression, 10, now);
        assert_eq!(session.remaining_secs(), 25 * 60 - 10);
    }

    #[test]
    fn focus_completion_awards_and_enters_short_break() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(short_policy());
        session.start(now);

        let events = run_secs(&mut session, &mut account, &progression, 60, now);
        assert!(events.iter().any(|e| matches!(e, Event::FocusCompleted { minutes: 1, .. })));
        assert_eq!(session.phase(), FocusPhase::ShortBreak);
        assert!(session.is_running());
        assert_eq!(account.current_xp, 15);
        assert_eq!(account.total_focus_minutes, 1);
        assert_eq!(session.sessions_completed_in_cycle(), 1);
    }

    #[test]
    fn break_completion_recovers_and_returns_to_focus() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(short_policy());
        session.start(now);
        run_secs(&mut session, &mut account, &progression, 60, now);
        account.burnout = 0.5;

        run_secs(&mut session, &mut account, &progression, 60, now);
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert!((account.burnout - 0.45).abs() < 1e-9);
    }

    #[test]
    fn fourth_session_earns_long_break() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(short_policy());
        session.start(now);

        for round in 1..=3 {
            run_secs(&mut session, &mut account, &progression, 60, now);
            assert_eq!(session.phase(), FocusPhase::ShortBreak, "round {round}");
            run_secs(&mut session, &mut account, &progression, 60, now);
        }
        run_secs(&mut session, &mut account, &progression, 60, now);
        assert_eq!(session.phase(), FocusPhase::LongBreak);
        assert_eq!(session.sessions_completed_in_cycle(), 0);

        run_secs(&mut session, &mut account, &progression, 120, now);
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert_eq!(session.sessions_completed_in_cycle(), 0);
    }

    #[test]
    fn break_waits_when_auto_start_disabled() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(FocusPolicy {
            auto_start_breaks: false,
            ..short_policy()
        });
        session.start(now);
        run_secs(&mut session, &mut account, &progression, 60, now);
        assert_eq!(session.phase(), FocusPhase::ShortBreak);
        assert!(!session.is_running());

        run_secs(&mut session, &mut account, &progression, 30, now);
        assert_eq!(session.remaining_secs(), 60);

        assert!(session.start(now).is_some());
        assert!(session.is_running());
    }

    #[test]
    fn skip_break_only_from_break() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(short_policy());
        assert!(session.skip_break(now).is_empty());

        session.start(now);
        assert!(session.skip_break(now).is_empty());

        run_secs(&mut session, &mut account, &progression, 60, now);
        account.burnout = 0.5;
        let events = session.skip_break(now);
        assert!(matches!(events[0], Event::BreakSkipped { .. }));
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert_eq!(session.remaining_secs(), 60);
        assert_eq!(account.burnout, 0.5);
    }

    #[test]
    fn reset_clears_cycle_and_flow() {
        let now = Utc::now();
        let mut session = FocusSession::new(FocusPolicy::default());
        session.start_flow(now);
        assert!(session.is_flow_mode());
        session.reset(now);
        assert_eq!(session.phase(), FocusPhase::Idle);
        assert!(!session.is_flow_mode());
        assert_eq!(session.sessions_completed_in_cycle(), 0);
        assert!(!session.is_running());
    }

    #[test]
    fn flow_mode_never_completes_on_its_own() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(short_policy());
        session.start_flow(now);
        run_secs(&mut session, &mut account, &progression, 600, now);
        assert_eq!(session.phase(), FocusPhase::Focus);
        assert_eq!(session.flow_elapsed_secs(), 600);
        assert_eq!(account.current_xp, 0);
    }

    #[test]
    fn complete_early_credits_spent_time() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(FocusPolicy::default());
        session.start(now);
        run_secs(&mut session, &mut account, &progression, 600, now);

        let events = session.complete_early(&mut account, &progression, None, now);
        assert!(matches!(events[0], Event::CompletedEarly { seconds_spent: 600, .. }));
        assert_eq!(account.total_focus_minutes, 10);
        assert_eq!(account.current_xp, 15);
        assert_eq!(session.phase(), FocusPhase::Idle);
    }

    #[test]
    fn complete_early_in_flow_with_task() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut task = Task::new("Write docs", "", now);
        let mut session = FocusSession::new(FocusPolicy::default());
        session.link_task(Some(task.id));
        session.start_flow(now);
        run_secs(&mut session, &mut account, &progression, 120, now);

        session.complete_early(&mut account, &progression, Some(&mut task), now);
        assert!(task.completed);
        assert_eq!(account.current_xp, 30 + 50);
        assert_eq!(account.total_focus_minutes, 2);
        assert!(session.linked_task().is_none());
    }

    #[test]
    fn complete_early_is_a_no_op_outside_focus() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut session = FocusSession::new(FocusPolicy::default());
        assert!(session
            .complete_early(&mut account, &progression, None, now)
            .is_empty());
        assert_eq!(account.current_xp, 0);
    }

    #[test]
    fn overtime_fires_once_per_run() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut task = Task::new("Migrate DB", "", now);
        let mut session = FocusSession::new(short_policy());
        session.link_task(Some(task.id));
        session.start_flow(now);
        task.start_timer(now);

        let mut alerts = 0;
        for secs in 1..=180 {
            if session
                .check_overtime(&mut task, &mut account, now + Duration::seconds(secs))
                .is_some()
            {
                alerts += 1;
            }
        }
        assert_eq!(alerts, 1);
        assert!(session.is_overtime());
        assert!((account.burnout - 0.10).abs() < 1e-9);

        task.stop_timer(now + Duration::seconds(181));
        task.start_timer(now + Duration::seconds(200));
        assert!(session
            .check_overtime(&mut task, &mut account, now + Duration::seconds(261))
            .is_some());
    }

    #[test]
    fn overtime_ignored_outside_focus() {
        let now = Utc::now();
        let progression = ProgressionPolicy::default();
        let mut account = ProgressionAccount::new(&progression, now);
        let mut task = Task::new("Migrate DB", "", now);
        let mut session = FocusSession::new(short_policy());
        session.link_task(Some(task.id));
        task.start_timer(now);
        assert!(session
            .check_overtime(&mut task, &mut account, now + Duration::hours(1))
            .is_none());
        assert!(!session.is_overtime());
    }
}
