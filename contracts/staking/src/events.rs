use accrual::{EventSink, PhaseObserver};
use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug)]
pub struct InitializedEvent {
    pub admin: Address,
    pub rewards_distribution: Address,
    pub stake_token: Address,
    pub reward_token: Address,
    pub rewards_duration: u64,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RewardAddedEvent {
    pub reward: i128,
    pub reward_rate: i128,
    pub period_finish: u64,
}

pub fn publish_initialized(
    env: &Env,
    admin: Address,
    rewards_distribution: Address,
    stake_token: Address,
    reward_token: Address,
    rewards_duration: u64,
) {
    env.events().publish(
        (symbol_short!("INIT"),),
        InitializedEvent {
            admin,
            rewards_distribution,
            stake_token,
            reward_token,
            rewards_duration,
        },
    );
}

pub fn publish_staked(env: &Env, staker: Address, amount: i128, new_stake: i128) {
    env.events()
        .publish((symbol_short!("STAKED"), staker), (amount, new_stake));
}

pub fn publish_withdrawn(env: &Env, staker: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("WITHDRAWN"), staker), amount);
}

pub fn publish_reward_paid(env: &Env, staker: Address, amount: i128) {
    env.events().publish((symbol_short!("REWARD"), staker), amount);
}

pub fn publish_reward_added(env: &Env, reward: i128, reward_rate: i128, period_finish: u64) {
    env.events().publish(
        (symbol_short!("RWD_ADD"),),
        RewardAddedEvent {
            reward,
            reward_rate,
            period_finish,
        },
    );
}

pub fn publish_duration_updated(env: &Env, rewards_duration: u64) {
    env.events()
        .publish((symbol_short!("DURATION"),), rewards_duration);
}

pub fn publish_distribution_set(env: &Env, rewards_distribution: Address) {
    env.events()
        .publish((symbol_short!("DIST_SET"),), rewards_distribution);
}

pub fn publish_recovered(env: &Env, token: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("RECOVER"), token), amount);
}

pub fn publish_paused(env: &Env, paused: bool) {
    env.events().publish((symbol_short!("PAUSED"),), paused);
}

pub fn publish_admin_transfer_proposed(env: &Env, current_admin: Address, new_admin: Address) {
    env.events()
        .publish((symbol_short!("ADM_PROP"),), (current_admin, new_admin));
}

pub fn publish_admin_transfer_accepted(env: &Env, old_admin: Address, new_admin: Address) {
    env.events()
        .publish((symbol_short!("ADM_ACPT"),), (old_admin, new_admin));
}

/// Engine notifications as contract events. A reward period is a single
/// phase, so phase transitions are not reported.
pub struct ContractEvents<'a> {
    env: &'a Env,
}

impl<'a> ContractEvents<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }
}

impl PhaseObserver for ContractEvents<'_> {}

impl EventSink<Address> for ContractEvents<'_> {
    fn staked(&mut self, who: &Address, amount: i128, new_stake: i128) {
        publish_staked(self.env, who.clone(), amount, new_stake);
    }

    fn withdrawn(&mut self, who: &Address, amount: i128) {
        publish_withdrawn(self.env, who.clone(), amount);
    }

    fn reward_paid(&mut self, who: &Address, amount: i128) {
        publish_reward_paid(self.env, who.clone(), amount);
    }
}
