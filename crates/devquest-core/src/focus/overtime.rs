//! Overtime detection for task timers running alongside a focus phase.

use chrono::{DateTime, Duration, Utc};

use crate::quest::WorkTimer;

/// Result of checking one timer against the focus limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertimeCheck {
    /// The current run is past the limit.
    pub over: bool,
    /// This check is the first to see the overrun in the current run.
    pub newly_over: bool,
    pub over_by: Duration,
}

/// Compare the timer's current run with `limit`, arming the timer's
/// one-shot flag on the first overrun.
///
/// The flag is cleared by the timer itself on stop/start, so a restarted
/// run can alert again.
pub fn detect(timer: &mut WorkTimer, limit: Duration, now: DateTime<Utc>) -> OvertimeCheck {
    let run = timer.current_run(now);
    if !timer.is_active() || run <= limit {
        return OvertimeCheck {
            over: false,
            newly_over: false,
            over_by: Duration::zero(),
        };
    }
    let newly_over = !timer.overtime_notified;
    timer.overtime_notified = true;
    OvertimeCheck {
        over: true,
        newly_over,
        over_by: run - limit,
    }
}
