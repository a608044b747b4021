use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug)]
pub struct InitializedEvent {
    pub owner: Address,
    pub beneficiary: Address,
    pub token: Address,
    pub start: u64,
    pub cliff: u64,
    pub duration: u64,
    pub revocable: bool,
}

pub fn publish_initialized(env: &Env, event: InitializedEvent) {
    env.events().publish((symbol_short!("INIT"),), event);
}

pub fn publish_released(env: &Env, beneficiary: Address, amount: i128) {
    env.events()
        .publish((symbol_short!("RELEASED"), beneficiary), amount);
}

pub fn publish_revoked(env: &Env, owner: Address, refund: i128) {
    env.events().publish((symbol_short!("REVOKED"), owner), refund);
}
