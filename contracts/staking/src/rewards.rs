//! Reward period arithmetic.
//!
//! A funded period pays a constant `reward_rate` per second until
//! `period_finish`. Funding again before the finish rolls whatever was not
//! yet emitted into the new period.

// ── Period math ─────────────────────────────────────────────────────────────

/// Last instant that still earns rewards.
pub fn last_time_reward_applicable(now: u64, period_finish: u64) -> u64 {
    now.min(period_finish)
}

/// Emission of the running period that has not happened yet at `now`.
///
/// ```text
/// leftover = (period_finish − now) × reward_rate
/// ```
pub fn leftover(now: u64, period_finish: u64, reward_rate: i128) -> Option<i128> {
    if now >= period_finish {
        return Some(0);
    }
    i128::from(period_finish - now).checked_mul(reward_rate)
}

/// Rate of a new period funded with `reward` at `now`.
///
/// Before the running period ends its leftover is added to the new reward,
/// so nothing already promised is lost. `None` on a zero duration or
/// overflow.
pub fn next_reward_rate(
    reward: i128,
    now: u64,
    period_finish: u64,
    current_rate: i128,
    duration: u64,
) -> Option<i128> {
    if duration == 0 {
        return None;
    }
    let funded = reward.checked_add(leftover(now, period_finish, current_rate)?)?;
    Some(funded / i128::from(duration))
}

/// The highest rate `balance` can back for a whole period.
pub fn max_reward_rate(balance: i128, duration: u64) -> Option<i128> {
    if duration == 0 {
        return None;
    }
    Some(balance / i128::from(duration))
}

// ── Unit tests ──────────────────────────────────────────────────────────────
// Pure math, no Soroban environment.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applicable_time_is_clamped_to_finish() {
        assert_eq!(last_time_reward_applicable(50, 100), 50);
        assert_eq!(last_time_reward_applicable(150, 100), 100);
    }

    #[test]
    fn fresh_period_spreads_reward_over_duration() {
        assert_eq!(next_reward_rate(1_000, 500, 0, 0, 100), Some(10));
        // flooring
        assert_eq!(next_reward_rate(1_099, 500, 0, 0, 100), Some(10));
    }

    #[test]
    fn running_period_rolls_leftover_forward() {
        // 50 s left at 10/s
        assert_eq!(leftover(50, 100, 10), Some(500));
        assert_eq!(next_reward_rate(1_000, 50, 100, 10, 100), Some(15));
    }

    #[test]
    fn finished_period_has_no_leftover() {
        assert_eq!(leftover(100, 100, 10), Some(0));
        assert_eq!(leftover(250, 100, 10), Some(0));
    }

    #[test]
    fn zero_duration_is_rejected() {
        assert_eq!(next_reward_rate(1_000, 0, 0, 0, 0), None);
        assert_eq!(max_reward_rate(1_000, 0), None);
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(leftover(0, u64::MAX, i128::MAX), None);
        assert_eq!(next_reward_rate(i128::MAX, 0, 10, 1, 10), None);
    }
}
