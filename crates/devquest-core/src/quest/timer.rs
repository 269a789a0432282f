//! Start/stop elapsed-time accumulator shared by tasks and subtasks.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Accumulates worked time across any number of start/stop cycles.
///
/// The lock is per entity: nothing stops two timers from running at once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkTimer {
    /// Time banked by completed runs, in milliseconds.
    #[serde(default)]
    pub elapsed_ms: u64,
    /// Set while a run is in progress.
    #[serde(default)]
    pub active_since: Option<DateTime<Utc>>,
    /// Whether the current run already raised its overtime alert.
    #[serde(default)]
    pub overtime_notified: bool,
}

impl WorkTimer {
    pub fn is_active(&self) -> bool {
        self.active_since.is_some()
    }

    /// Begin a run. Returns `false` (and changes nothing) if already running.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_active() {
            return false;
        }
        self.active_since = Some(now);
        self.overtime_notified = false;
        true
    }

    /// End the current run and bank its time.
    ///
    /// Returns the length of the run, or zero if no run was in progress.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Duration {
        let Some(since) = self.active_since.take() else {
            return Duration::zero();
        };
        let run = (now - since).max(Duration::zero());
        self.elapsed_ms = self
            .elapsed_ms
            .saturating_add(run.num_milliseconds().max(0) as u64);
        self.overtime_notified = false;
        run
    }

    /// Length of the run in progress.
    pub fn current_run(&self, now: DateTime<Utc>) -> Duration {
        self.active_since
            .map(|since| (now - since).max(Duration::zero()))
            .unwrap_or_else(Duration::zero)
    }

    /// Banked time only.
    pub fn elapsed(&self) -> Duration {
        Duration::milliseconds(self.elapsed_ms.min(i64::MAX as u64) as i64)
    }

    /// Banked time plus the run in progress.
    pub fn total(&self, now: DateTime<Utc>) -> Duration {
        self.elapsed() + self.current_run(now)
    }
}

/// A run flushed by stopping a timer, kept so callers can log it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoppedRun {
    pub task_id: Uuid,
    pub subtask_id: Option<Uuid>,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_banks_elapsed_time() {
        let now = Utc::now();
        let mut timer = WorkTimer::default();
        assert!(timer.start(now));
        let run = timer.stop(now + Duration::seconds(90));
        assert_eq!(run, Duration::seconds(90));
        assert_eq!(timer.elapsed(), Duration::seconds(90));
        assert!(timer.active_since.is_none());

        let again = timer.stop(now + Duration::seconds(120));
        assert_eq!(again, Duration::zero());
        assert_eq!(timer.elapsed(), Duration::seconds(90));
    }

    #[test]
    fn double_start_is_a_no_op() {
        let now = Utc::now();
        let mut timer = WorkTimer::default();
        assert!(timer.start(now));
        assert!(!timer.start(now + Duration::seconds(10)));
        assert_eq!(timer.active_since, Some(now));
    }

    #[test]
    fn total_includes_running_segment() {
        let now = Utc::now();
        let mut timer = WorkTimer {
            elapsed_ms: 60_000,
            ..Default::default()
        };
        timer.start(now);
        assert_eq!(timer.total(now + Duration::seconds(30)), Duration::seconds(90));
    }

    #[test]
    fn restart_rearms_overtime_alert() {
        let now = Utc::now();
        let mut timer = WorkTimer::default();
        timer.start(now);
        timer.overtime_notified = true;
        timer.stop(now + Duration::seconds(5));
        assert!(!timer.overtime_notified);
    }
}
