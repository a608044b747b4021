use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

const ADMIN: Symbol = symbol_short!("ADMIN");
const PENDING_ADMIN: Symbol = symbol_short!("PEND_ADM");
const PAUSED: Symbol = symbol_short!("PAUSED");
const GRANT: Symbol = symbol_short!("GRANT");
const GRANT_TTL_THRESHOLD: u32 = 518_400; // ~30 days
const GRANT_TTL_EXTEND_TO: u32 = 1_036_800; // ~60 days

/// Restricted operations a non-admin address can be granted.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Change reward parameters (phase schedule, condition epochs, durations).
    SetSchedule,
    /// Fund a new reward period.
    NotifyReward,
    /// Emergency switches.
    Emergency,
    /// Sweep tokens that do not belong to the pool.
    Recover,
    Pause,
}

fn grant_key(action: Action, address: &Address) -> (Symbol, Action, Address) {
    (GRANT, action, address.clone())
}

fn extend_grant_ttl(env: &Env, key: &(Symbol, Action, Address)) {
    env.storage()
        .persistent()
        .extend_ttl(key, GRANT_TTL_THRESHOLD, GRANT_TTL_EXTEND_TO);
}

pub fn set_admin(env: &Env, admin: &Address) {
    env.storage().instance().set(&ADMIN, admin);
}

pub fn get_admin(env: &Env) -> Option<Address> {
    env.storage().instance().get(&ADMIN)
}

pub fn is_admin(env: &Env, address: &Address) -> bool {
    get_admin(env).is_some_and(|admin| admin == *address)
}

/// First step of a two-step admin transfer.
pub fn propose_admin(env: &Env, new_admin: &Address) {
    env.storage().instance().set(&PENDING_ADMIN, new_admin);
}

pub fn get_pending_admin(env: &Env) -> Option<Address> {
    env.storage().instance().get(&PENDING_ADMIN)
}

/// Completes the transfer if `new_admin` is the proposed address. Returns the
/// previous admin on success.
pub fn accept_admin(env: &Env, new_admin: &Address) -> Option<Address> {
    let pending = get_pending_admin(env)?;
    if pending != *new_admin {
        return None;
    }
    let previous = get_admin(env)?;
    set_admin(env, new_admin);
    env.storage().instance().remove(&PENDING_ADMIN);
    Some(previous)
}

/// Allows `address` to perform `action` without being admin.
pub fn grant(env: &Env, action: Action, address: &Address) {
    let key = grant_key(action, address);
    env.storage().persistent().set(&key, &true);
    extend_grant_ttl(env, &key);
}

pub fn revoke(env: &Env, action: Action, address: &Address) {
    env.storage().persistent().remove(&grant_key(action, address));
}

pub fn is_granted(env: &Env, action: Action, address: &Address) -> bool {
    let key = grant_key(action, address);
    let granted = env.storage().persistent().get(&key).unwrap_or(false);
    if granted {
        extend_grant_ttl(env, &key);
    }
    granted
}

/// Whether `caller` may perform `action`: the admin may do everything,
/// anyone else needs an explicit grant.
pub fn is_authorized(env: &Env, caller: &Address, action: Action) -> bool {
    is_admin(env, caller) || is_granted(env, action, caller)
}

pub fn set_paused(env: &Env, paused: bool) {
    env.storage().instance().set(&PAUSED, &paused);
}

pub fn is_paused(env: &Env) -> bool {
    env.storage().instance().get(&PAUSED).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::Probe;
    use soroban_sdk::testutils::Address as _;

    #[test]
    fn admin_is_authorized_for_everything() {
        let env = Env::default();
        let id = env.register(Probe, ());
        let admin = Address::generate(&env);

        env.as_contract(&id, || {
            set_admin(&env, &admin);
            assert!(is_authorized(&env, &admin, Action::SetSchedule));
            assert!(is_authorized(&env, &admin, Action::Emergency));
        });
    }

    #[test]
    fn grants_are_per_action() {
        let env = Env::default();
        let id = env.register(Probe, ());
        let admin = Address::generate(&env);
        let operator = Address::generate(&env);

        env.as_contract(&id, || {
            set_admin(&env, &admin);
            assert!(!is_authorized(&env, &operator, Action::NotifyReward));

            grant(&env, Action::NotifyReward, &operator);
            assert!(is_authorized(&env, &operator, Action::NotifyReward));
            assert!(!is_authorized(&env, &operator, Action::Recover));

            revoke(&env, Action::NotifyReward, &operator);
            assert!(!is_authorized(&env, &operator, Action::NotifyReward));
        });
    }

    #[test]
    fn two_step_admin_transfer() {
        let env = Env::default();
        let id = env.register(Probe, ());
        let admin = Address::generate(&env);
        let next = Address::generate(&env);
        let stranger = Address::generate(&env);

        env.as_contract(&id, || {
            set_admin(&env, &admin);
            assert_eq!(accept_admin(&env, &next), None);

            propose_admin(&env, &next);
            assert_eq!(accept_admin(&env, &stranger), None);
            assert_eq!(accept_admin(&env, &next), Some(admin.clone()));
            assert!(is_admin(&env, &next));
            assert_eq!(get_pending_admin(&env), None);
        });
    }

    #[test]
    fn pause_flag_defaults_off() {
        let env = Env::default();
        let id = env.register(Probe, ());

        env.as_contract(&id, || {
            assert!(!is_paused(&env));
            set_paused(&env, true);
            assert!(is_paused(&env));
        });
    }
}
