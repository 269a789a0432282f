//! Per-user progression state: level, XP, currency and burnout.
//!
//! Every operation takes the policy and the current instant explicitly; the
//! account itself never reads the wall clock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::ProgressionPolicy;

/// Burnout above this is reported as [`BurnoutStatus::Critical`].
const CRITICAL_BURNOUT: f64 = 0.7;
/// Burnout below this is reported as [`BurnoutStatus::Optimal`].
const OPTIMAL_BURNOUT: f64 = 0.3;
/// XP multiplier applied while burnout is above the penalty threshold.
const WELLNESS_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnoutStatus {
    Optimal,
    Strained,
    Critical,
}

impl BurnoutStatus {
    pub fn from_level(burnout: f64) -> Self {
        if burnout > CRITICAL_BURNOUT {
            BurnoutStatus::Critical
        } else if burnout < OPTIMAL_BURNOUT {
            BurnoutStatus::Optimal
        } else {
            BurnoutStatus::Strained
        }
    }
}

/// What a single XP award did to the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpAward {
    pub requested: u64,
    pub final_xp: u64,
    pub currency_gained: u64,
    /// True when the wellness penalty halved the award.
    pub penalized: bool,
    pub burnout_before: f64,
    pub burnout_after: f64,
    pub levels_gained: u32,
    pub level: u32,
    pub xp_to_next_level: u64,
}

/// The progression record for one user.
///
/// Fields are public so the persistence layer can rebuild an account with
/// its values intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionAccount {
    pub level: u32,
    pub current_xp: u64,
    pub xp_to_next_level: u64,
    /// Nanobytes.
    pub currency: u64,
    /// 0.0 = fresh, 1.0 = critical.
    pub burnout: f64,
    /// Last XP-earning action.
    pub last_activity_at: DateTime<Utc>,
    /// Last time rest recovery was applied since `last_activity_at`.
    #[serde(default)]
    pub decay_checked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_focus_minutes: u64,
}

impl ProgressionAccount {
    pub fn new(policy: &ProgressionPolicy, now: DateTime<Utc>) -> Self {
        Self {
            level: 1,
            current_xp: 0,
            xp_to_next_level: policy.xp_threshold(1),
            currency: 0,
            burnout: 0.0,
            last_activity_at: now,
            decay_checked_at: None,
            total_focus_minutes: 0,
        }
    }

    // ── Projections ──────────────────────────────────────────────────

    pub fn burnout_status(&self) -> BurnoutStatus {
        BurnoutStatus::from_level(self.burnout)
    }

    /// 0.0 .. 1.0 progress towards the next level.
    pub fn level_progress_fraction(&self) -> f64 {
        if self.xp_to_next_level == 0 {
            return 0.0;
        }
        (self.current_xp as f64 / self.xp_to_next_level as f64).min(1.0)
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Award XP for work done.
    ///
    /// Rest recovery is applied first so the wellness check sees the rested
    /// burnout value.
    pub fn award_xp(
        &mut self,
        amount: u64,
        difficulty_multiplier: f64,
        policy: &ProgressionPolicy,
        now: DateTime<Utc>,
    ) -> XpAward {
        self.decay_burnout(policy, now);

        let burnout_before = self.burnout;
        let penalized = self.burnout > policy.burnout_penalty_threshold;
        let wellness = if penalized { WELLNESS_PENALTY } else { 1.0 };
        let final_xp = (amount as f64 * wellness).floor() as u64;
        let currency_gained = final_xp / 2;

        self.current_xp = self.current_xp.saturating_add(final_xp);
        self.currency = self.currency.saturating_add(currency_gained);
        self.add_burnout(policy.burnout_increase(difficulty_multiplier));
        self.last_activity_at = now;
        self.decay_checked_at = None;

        let mut award = XpAward {
            requested: amount,
            final_xp,
            currency_gained,
            penalized,
            burnout_before,
            burnout_after: self.burnout,
            levels_gained: 0,
            level: self.level,
            xp_to_next_level: self.xp_to_next_level,
        };

        while self.xp_to_next_level > 0 && self.current_xp >= self.xp_to_next_level {
            self.level_up(policy);
            award.levels_gained += 1;
            award.currency_gained += policy.level_up_currency;
            if !policy.multi_level_up {
                break;
            }
        }

        award.burnout_after = self.burnout;
        award.level = self.level;
        award.xp_to_next_level = self.xp_to_next_level;
        if self.burnout_status() == BurnoutStatus::Critical
            && BurnoutStatus::from_level(burnout_before) != BurnoutStatus::Critical
        {
            tracing::warn!(burnout = self.burnout, "burnout reached critical level");
        }
        award
    }

    /// Apply rest recovery accrued since the last work activity.
    ///
    /// Repeated calls at the same instant are no-ops; `last_activity_at` is
    /// left untouched.
    pub fn decay_burnout(&mut self, policy: &ProgressionPolicy, now: DateTime<Utc>) {
        let owed_now = policy.recovery_for_rest(now - self.last_activity_at);
        let already_applied = match self.decay_checked_at {
            Some(checked) if checked >= now => return,
            Some(checked) => policy.recovery_for_rest(checked - self.last_activity_at),
            None => 0.0,
        };
        let delta = owed_now - already_applied;
        if delta > 0.0 {
            let before = self.burnout;
            self.burnout = (self.burnout - delta).max(0.0);
            tracing::debug!(before, after = self.burnout, "burnout decayed during rest");
        }
        self.decay_checked_at = Some(now);
    }

    /// Break and mini-game recovery.
    pub fn recover_burnout(&mut self, amount: f64) {
        if !amount.is_finite() {
            return;
        }
        self.burnout = (self.burnout - amount).clamp(0.0, 1.0);
    }

    /// Penalty strain such as running past the planned focus length.
    pub fn apply_strain(&mut self, amount: f64) {
        if !amount.is_finite() {
            return;
        }
        self.add_burnout(amount);
    }

    /// Take back XP for a task or subtask that was un-checked.
    ///
    /// Currency and burnout are intentionally left alone.
    pub fn revert_xp(&mut self, amount: u64) {
        self.current_xp = self.current_xp.saturating_sub(amount);
    }

    pub fn credit_focus_minutes(&mut self, minutes: u64) {
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(minutes);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn add_burnout(&mut self, amount: f64) {
        self.burnout = (self.burnout + amount).clamp(0.0, 1.0);
    }

    fn level_up(&mut self, policy: &ProgressionPolicy) {
        self.current_xp -= self.xp_to_next_level;
        self.level += 1;
        self.xp_to_next_level = policy.xp_threshold(self.level);
        self.currency = self.currency.saturating_add(policy.level_up_currency);
        self.burnout = (self.burnout - policy.level_up_recovery).max(0.0);
        tracing::info!(level = self.level, "level up");
    }
}
