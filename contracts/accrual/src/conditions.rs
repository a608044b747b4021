//! Per-staker reward walk for the NFT vault.
//!
//! Unlike the pooled accumulator, every staked token earns a fixed amount per
//! time unit regardless of how many others are staked. The reward parameters
//! change by appending a new condition, and a staker settles by walking every
//! condition since its last update.

use soroban_sdk::{contracttype, Vec};

use crate::AccrualError;

/// Reward parameters in force between `start` and `end` (`end == 0` while the
/// condition is the newest one).
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StakingCondition {
    pub time_unit: u64,
    pub rewards_per_unit_time: i128,
    pub start: u64,
    pub end: u64,
}

#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VaultStaker {
    pub amount_staked: u64,
    pub time_of_last_update: u64,
    pub unclaimed_rewards: i128,
    pub condition_of_last_update: u32,
}

/// Append-only list of conditions keyed by id `0..condition_count()`.
pub trait ConditionLog {
    fn condition_count(&self) -> u32;

    fn condition(&self, id: u32) -> Option<StakingCondition>;
}

impl ConditionLog for [StakingCondition] {
    fn condition_count(&self) -> u32 {
        self.len() as u32
    }

    fn condition(&self, id: u32) -> Option<StakingCondition> {
        self.get(id as usize).copied()
    }
}

impl ConditionLog for Vec<StakingCondition> {
    fn condition_count(&self) -> u32 {
        self.len()
    }

    fn condition(&self, id: u32) -> Option<StakingCondition> {
        self.get(id)
    }
}

/// Rewards earned by `staker` since its last update.
///
/// A term that would overflow is dropped rather than aborting the walk, so a
/// pathological condition cannot lock a staker out of withdrawing.
pub fn rewards_since_last_update<L: ConditionLog + ?Sized>(
    log: &L,
    staker: &VaultStaker,
    now: u64,
) -> i128 {
    let mut rewards: i128 = 0;
    for id in staker.condition_of_last_update..log.condition_count() {
        let Some(condition) = log.condition(id) else {
            break;
        };
        let start = if id == staker.condition_of_last_update {
            staker.time_of_last_update
        } else {
            condition.start
        };
        let end = if condition.end != 0 { condition.end } else { now };

        let term = i128::from(end.saturating_sub(start))
            .checked_mul(i128::from(staker.amount_staked))
            .and_then(|v| v.checked_mul(condition.rewards_per_unit_time))
            .and_then(|v| v.checked_div(i128::from(condition.time_unit)));
        if let Some(sum) = term.and_then(|t| rewards.checked_add(t)) {
            rewards = sum;
        }
    }
    rewards
}

impl VaultStaker {
    /// Fold rewards since the last update into `unclaimed_rewards` and move
    /// the staker's cursor to `now` and the newest condition.
    pub fn settle<L: ConditionLog + ?Sized>(
        &mut self,
        log: &L,
        now: u64,
    ) -> Result<i128, AccrualError> {
        let rewards = rewards_since_last_update(log, self, now);
        self.unclaimed_rewards = self
            .unclaimed_rewards
            .checked_add(rewards)
            .ok_or(AccrualError::Overflow)?;
        self.touch(log, now);
        Ok(rewards)
    }

    /// Reset the cursor without crediting anything (first stake).
    pub fn touch<L: ConditionLog + ?Sized>(&mut self, log: &L, now: u64) {
        self.time_of_last_update = now;
        self.condition_of_last_update = log.condition_count().saturating_sub(1);
    }
}
