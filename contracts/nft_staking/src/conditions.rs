use accrual::{ConditionLog, StakingCondition};
use soroban_sdk::{symbol_short, Env, Symbol};

const NEXT_CONDITION: Symbol = symbol_short!("NEXT_COND");
const CONDITION: Symbol = symbol_short!("COND");

const CONDITION_TTL_THRESHOLD: u32 = 518_400;
const CONDITION_TTL_EXTEND_TO: u32 = 1_036_800;

/// Condition history kept in contract storage, ids `0..next_condition_id`.
pub struct StoredConditions<'a> {
    env: &'a Env,
}

impl<'a> StoredConditions<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }

    /// The condition in force now, if any was ever set.
    pub fn latest(&self) -> Option<StakingCondition> {
        self.condition(self.condition_count().checked_sub(1)?)
    }

    /// Close the current condition at `now` and open a new one.
    pub fn append(&self, time_unit: u64, rewards_per_unit_time: i128, now: u64) -> u32 {
        let id = self.condition_count();
        if let Some(previous_id) = id.checked_sub(1) {
            if let Some(mut previous) = self.condition(previous_id) {
                previous.end = now;
                self.store(previous_id, &previous);
            }
        }
        self.store(
            id,
            &StakingCondition {
                time_unit,
                rewards_per_unit_time,
                start: now,
                end: 0,
            },
        );
        self.env
            .storage()
            .instance()
            .set(&NEXT_CONDITION, &id.saturating_add(1));
        id
    }

    fn store(&self, id: u32, condition: &StakingCondition) {
        let key = (CONDITION, id);
        self.env.storage().persistent().set(&key, condition);
        self.env
            .storage()
            .persistent()
            .extend_ttl(&key, CONDITION_TTL_THRESHOLD, CONDITION_TTL_EXTEND_TO);
    }
}

impl ConditionLog for StoredConditions<'_> {
    fn condition_count(&self) -> u32 {
        self.env
            .storage()
            .instance()
            .get(&NEXT_CONDITION)
            .unwrap_or(0)
    }

    fn condition(&self, id: u32) -> Option<StakingCondition> {
        self.env.storage().persistent().get(&(CONDITION, id))
    }
}
