//! Property tests for the progression arithmetic.

use chrono::{Duration, TimeZone, Utc};
use devquest_core::{ProgressionAccount, ProgressionPolicy};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Award(u64, f64),
    Revert(u64),
    Recover(f64),
    Strain(f64),
    Rest(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u64..500, 0.0f64..5.0).prop_map(|(xp, d)| Op::Award(xp, d)),
        (0u64..300).prop_map(Op::Revert),
        (-1.0f64..2.0).prop_map(Op::Recover),
        (0.0f64..0.5).prop_map(Op::Strain),
        (0i64..12 * 3600).prop_map(Op::Rest),
    ]
}

proptest! {
    #[test]
    fn burnout_stays_in_range_and_level_never_drops(ops in prop::collection::vec(op(), 1..60)) {
        let policy = ProgressionPolicy::default();
        let mut now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let mut account = ProgressionAccount::new(&policy, now);

        for op in ops {
            let level_before = account.level;
            match op {
                Op::Award(xp, d) => { account.award_xp(xp, d, &policy, now); }
                Op::Revert(xp) => account.revert_xp(xp),
                Op::Recover(amount) => account.recover_burnout(amount),
                Op::Strain(amount) => account.apply_strain(amount),
                Op::Rest(secs) => {
                    now += Duration::seconds(secs);
                    account.decay_burnout(&policy, now);
                }
            }
            prop_assert!((0.0..=1.0).contains(&account.burnout));
            prop_assert!(account.level >= level_before);
            prop_assert_eq!(account.xp_to_next_level, policy.xp_threshold(account.level));
        }
    }

    #[test]
    fn small_awards_keep_xp_below_threshold(awards in prop::collection::vec((0u64..120, 0.0f64..3.0), 1..80)) {
        let policy = ProgressionPolicy::default();
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let mut account = ProgressionAccount::new(&policy, now);

        for (xp, d) in awards {
            account.award_xp(xp, d, &policy, now);
            prop_assert!(account.current_xp < account.xp_to_next_level);
        }
    }

    #[test]
    fn decay_is_idempotent_and_path_independent(
        start in 0.0f64..1.0,
        split in 0i64..6 * 3600,
        rest in 0i64..6 * 3600,
    ) {
        let policy = ProgressionPolicy::default();
        let t0 = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap();
        let end = t0 + Duration::seconds(split + rest);

        let mut once = ProgressionAccount::new(&policy, t0);
        once.burnout = start;
        once.decay_burnout(&policy, end);
        let after_once = once.burnout;
        once.decay_burnout(&policy, end);
        prop_assert_eq!(once.burnout, after_once);

        let mut twice = ProgressionAccount::new(&policy, t0);
        twice.burnout = start;
        twice.decay_burnout(&policy, t0 + Duration::seconds(split));
        twice.decay_burnout(&policy, end);
        prop_assert!((twice.burnout - after_once).abs() < 1e-9);
    }
}
