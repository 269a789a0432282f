use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Tunable constants for XP, leveling and burnout.
///
/// Lives in the `[progression]` section of `config.toml`. Missing keys fall
/// back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionPolicy {
    /// `xp_to_next_level = level * leveling_constant`.
    pub leveling_constant: u64,
    /// Burnout strictly above this halves awarded XP.
    pub burnout_penalty_threshold: f64,
    /// Flat burnout added by every award.
    pub burnout_base_increase: f64,
    /// Burnout added per unit of difficulty multiplier.
    pub burnout_per_difficulty: f64,
    /// Rest shorter than this recovers nothing.
    pub decay_grace_minutes: u32,
    /// Burnout recovered per hour of rest once past the grace period.
    pub decay_rate_per_hour: f64,
    /// Currency granted on each level-up.
    pub level_up_currency: u64,
    /// Burnout recovered on each level-up.
    pub level_up_recovery: f64,
    /// Process every crossed threshold in one award instead of just one.
    pub multi_level_up: bool,
}

impl Default for ProgressionPolicy {
    fn default() -> Self {
        Self {
            leveling_constant: 120,
            burnout_penalty_threshold: 0.75,
            burnout_base_increase: 0.02,
            burnout_per_difficulty: 0.02,
            decay_grace_minutes: 30,
            decay_rate_per_hour: 0.2,
            level_up_currency: 100,
            level_up_recovery: 0.20,
            multi_level_up: false,
        }
    }
}

impl ProgressionPolicy {
    pub fn xp_threshold(&self, level: u32) -> u64 {
        (level as u64).saturating_mul(self.leveling_constant)
    }

    pub fn decay_grace(&self) -> Duration {
        Duration::minutes(self.decay_grace_minutes as i64)
    }

    /// Burnout increase for an award at the given difficulty.
    pub fn burnout_increase(&self, difficulty_multiplier: f64) -> f64 {
        let difficulty = if difficulty_multiplier.is_finite() {
            difficulty_multiplier.max(0.0)
        } else {
            0.0
        };
        self.burnout_base_increase + self.burnout_per_difficulty * difficulty
    }

    /// Total recovery owed for a rest of `rest` since the last work activity.
    pub fn recovery_for_rest(&self, rest: Duration) -> f64 {
        if rest <= self.decay_grace() {
            return 0.0;
        }
        let hours = rest.num_milliseconds() as f64 / 3_600_000.0;
        hours * self.decay_rate_per_hour
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_burnout_increase() {
        let policy = ProgressionPolicy::default();
        assert!((policy.burnout_increase(1.0) - 0.04).abs() < 1e-9);
        assert!((policy.burnout_increase(0.0) - 0.02).abs() < 1e-9);
        assert!((policy.burnout_increase(f64::NAN) - 0.02).abs() < 1e-9);
    }

    #[test]
    fn recovery_respects_grace_period() {
        let policy = ProgressionPolicy::default();
        assert_eq!(policy.recovery_for_rest(Duration::minutes(30)), 0.0);
        assert!((policy.recovery_for_rest(Duration::hours(2)) - 0.4).abs() < 1e-9);
    }

    #[test]
    fn threshold_scales_with_level() {
        let policy = ProgressionPolicy::default();
        assert_eq!(policy.xp_threshold(1), 120);
        assert_eq!(policy.xp_threshold(2), 240);
    }
}
