use soroban_sdk::{contracttype, symbol_short, Address, Env, Vec};

#[contracttype]
#[derive(Clone, Debug)]
pub struct ConditionUpdatedEvent {
    pub condition_id: u32,
    pub time_unit: u64,
    pub rewards_per_unit_time: i128,
}

pub fn publish_initialized(env: &Env, admin: Address, nft: Address, reward_token: Address) {
    env.events()
        .publish((symbol_short!("INIT"),), (admin, nft, reward_token));
}

pub fn publish_tokens_staked(env: &Env, staker: Address, token_ids: Vec<u32>) {
    env.events()
        .publish((symbol_short!("STAKED"), staker), token_ids);
}

pub fn publish_tokens_withdrawn(env: &Env, staker: Address, token_ids: Vec<u32>) {
    env.events()
        .publish((symbol_short!("WITHDRAWN"), staker), token_ids);
}

pub fn publish_rewards_claimed(env: &Env, staker: Address, amount: i128) {
    env.events().publish((symbol_short!("CLAIMED"), staker), amount);
}

pub fn publish_condition_updated(
    env: &Env,
    condition_id: u32,
    time_unit: u64,
    rewards_per_unit_time: i128,
) {
    env.events().publish(
        (symbol_short!("COND_SET"),),
        ConditionUpdatedEvent {
            condition_id,
            time_unit,
            rewards_per_unit_time,
        },
    );
}

pub fn publish_reward_tokens_deposited(env: &Env, amount: i128, balance: i128) {
    env.events()
        .publish((symbol_short!("RWD_DEP"),), (amount, balance));
}

pub fn publish_reward_tokens_withdrawn(env: &Env, amount: i128, balance: i128) {
    env.events()
        .publish((symbol_short!("RWD_WD"),), (amount, balance));
}
