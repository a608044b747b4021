use accrual::{EventSink, PhaseObserver};
use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug)]
pub struct InitializedEvent {
    pub admin: Address,
    pub token: Address,
    pub start_block: u64,
    pub schedule_end: u64,
    pub budget: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct StakeChangedEvent {
    pub amount: i128,
    pub new_stake: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct PhaseAdvancedEvent {
    pub phase_index: u32,
    pub phase_end: u64,
}

pub fn publish_initialized(
    env: &Env,
    admin: Address,
    token: Address,
    start_block: u64,
    schedule_end: u64,
    budget: i128,
) {
    env.events().publish(
        (symbol_short!("INIT"),),
        InitializedEvent {
            admin,
            token,
            start_block,
            schedule_end,
            budget,
        },
    );
}

pub fn publish_staked(env: &Env, staker: Address, amount: i128, new_stake: i128) {
    env.events().publish(
        (symbol_short!("STAKED"), staker),
        StakeChangedEvent { amount, new_stake },
    );
}

pub fn publish_compounded(env: &Env, staker: Address, amount: i128, new_stake: i128) {
    env.events().publish(
        (symbol_short!("COMPOUND"), staker),
        StakeChangedEvent { amount, new_stake },
    );
}

pub fn publish_withdrawn(env: &Env, staker: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("WITHDRAWN"), staker), amount);
}

pub fn publish_reward_paid(env: &Env, staker: Address, amount: i128) {
    env.events().publish((symbol_short!("REWARD"), staker), amount);
}

pub fn publish_phase_advanced(env: &Env, phase_index: u32, phase_end: u64) {
    env.events().publish(
        (symbol_short!("PHASE"),),
        PhaseAdvancedEvent {
            phase_index,
            phase_end,
        },
    );
}

pub fn publish_others_claimed(env: &Env, recipient: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("OTHERS"), recipient), amount);
}

pub fn publish_others_recipient_set(env: &Env, recipient: Address) {
    env.events().publish((symbol_short!("OTH_SET"),), recipient);
}

pub fn publish_emergency_set(env: &Env, enabled: bool) {
    env.events().publish((symbol_short!("EMERG"),), enabled);
}

pub fn publish_emergency_withdrawn(env: &Env, staker: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("EMRG_WD"), staker), amount);
}

pub fn publish_admin_transfer_proposed(env: &Env, current_admin: Address, new_admin: Address) {
    env.events()
        .publish((symbol_short!("ADM_PROP"),), (current_admin, new_admin));
}

pub fn publish_admin_transfer_accepted(env: &Env, old_admin: Address, new_admin: Address) {
    env.events()
        .publish((symbol_short!("ADM_ACPT"),), (old_admin, new_admin));
}

/// Forwards engine notifications to the contract event stream.
pub struct ContractEvents<'a> {
    env: &'a Env,
}

impl<'a> ContractEvents<'a> {
    pub fn new(env: &'a Env) -> Self {
        Self { env }
    }
}

impl PhaseObserver for ContractEvents<'_> {
    fn phase_advanced(&mut self, phase_index: u32, phase_end: u64) {
        publish_phase_advanced(self.env, phase_index, phase_end);
    }
}

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

    fn compounded(&mut self, who: &Address, amount: i128, new_stake: i128) {
        publish_compounded(self.env, who.clone(), amount, new_stake);
    }
}
