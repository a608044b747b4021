#![no_std]

//! Two-tier block-reward distributor.
//!
//! Stakers deposit the reward token itself and their share of the
//! participant emission is compounded into their stake on every touch. A
//! second tier ("others": team, treasury) accrues alongside and is collected
//! by a single recipient. Emission is minted on settlement, phase by phase,
//! and the schedule integral is fixed to the budget at initialization.

pub mod events;

use accrual::token::TokenFunding;
use accrual::{
    Account, AccrualEngine, AccrualError, Disposition, FundingSource, LedgerState, Phase,
    PhaseSchedule,
};
use common::access::{self, Action};
use common::guard;
use events::ContractEvents;
use soroban_sdk::{contract, contractimpl, contracttype, log, symbol_short, Address, Env, Symbol, Vec};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const CONFIG: Symbol = symbol_short!("CONFIG");
const PHASES: Symbol = symbol_short!("PHASES");
const LEDGER: Symbol = symbol_short!("LEDGER");
const OTHERS_RECIPIENT: Symbol = symbol_short!("OTHERS");
const EMERGENCY: Symbol = symbol_short!("EMERG");

// Per-staker persistent storage uses tuple keys: (prefix, staker)
const ACCOUNT: Symbol = symbol_short!("ACCOUNT");

const ACCOUNT_TTL_THRESHOLD: u32 = 518_400;
const ACCOUNT_TTL_EXTEND_TO: u32 = 1_036_800;

// ── Contract errors ──────────────────────────────────────────────────────────

#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    Unauthorized = 3,
    InvalidInput = 4,
    Reentrant = 5,
    Paused = 6,
    InvalidAmount = 7,
    InsufficientBalance = 8,
    NothingToClaim = 9,
    NothingStaked = 10,
    ScheduleInvariantViolation = 11,
    FundingRealizationFailed = 12,
    Overflow = 13,
    NotInEmergency = 14,
}

impl From<AccrualError> for ContractError {
    fn from(err: AccrualError) -> Self {
        match err {
            AccrualError::InvalidAmount => ContractError::InvalidAmount,
            AccrualError::InsufficientBalance => ContractError::InsufficientBalance,
            AccrualError::NothingToClaim => ContractError::NothingToClaim,
            AccrualError::NothingStaked => ContractError::NothingStaked,
            AccrualError::ScheduleInvariantViolation => ContractError::ScheduleInvariantViolation,
            AccrualError::FundingRealizationFailed => ContractError::FundingRealizationFailed,
            AccrualError::Overflow => ContractError::Overflow,
        }
    }
}

// ── Public-facing types ──────────────────────────────────────────────────────

/// Immutable parameters fixed at initialization. Block numbers are ledger
/// sequence numbers.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DistributorConfig {
    pub token: Address,
    pub start_block: u64,
    /// First block after the last phase; settlement never runs past it.
    pub schedule_end: u64,
    pub budget: i128,
}

/// Emission rates in force at a given block.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Rates {
    pub phase_index: u32,
    pub rate_for_participants: i128,
    pub rate_for_others: i128,
}

type Engine<'a> = AccrualEngine<'a, Vec<Phase>, TokenFunding<'a>, ContractEvents<'a>>;

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct DistributorContract;

#[contractimpl]
impl DistributorContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the distributor.
    ///
    /// * `token` – SAC of the reward token. The contract must be made the
    ///   token admin before the first settlement, since emission is minted.
    /// * `phases` – non-empty, every length positive, every rate non-negative,
    ///   and the emission of both tiers over all phases must equal `budget`.
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        others_recipient: Address,
        start_block: u64,
        phases: Vec<Phase>,
        budget: i128,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        let total_length = validate_schedule(&env, &phases, budget)?;
        let schedule_end = start_block
            .checked_add(total_length)
            .ok_or(ContractError::Overflow)?;
        let ledger = LedgerState::new(&phases, start_block)?;

        let config = DistributorConfig {
            token: token.clone(),
            start_block,
            schedule_end,
            budget,
        };

        access::set_admin(&env, &admin);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&CONFIG, &config);
        env.storage().instance().set(&PHASES, &phases);
        env.storage().instance().set(&LEDGER, &ledger);
        env.storage().instance().set(&OTHERS_RECIPIENT, &others_recipient);
        common::bump_instance(&env);

        events::publish_initialized(&env, admin, token, start_block, schedule_end, budget);

        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Deposit `amount` tokens. Pending reward is compounded into the stake
    /// first; the compounded amount is returned.
    pub fn deposit(env: Env, staker: Address, amount: i128) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();
        if emergency_enabled(&env) {
            return Err(ContractError::Paused);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.join(ledger, account, &staker, amount, now)
            })
        })
    }

    /// Compound pending reward into the stake. Returns the compounded amount
    /// (zero is not an error).
    pub fn compound(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.compound(ledger, account, &staker, now)
            })
        })
    }

    /// Withdraw `amount` of stake. Pending reward is compounded on the way
    /// and stays staked.
    pub fn withdraw(env: Env, staker: Address, amount: i128) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.decrease(ledger, account, &staker, amount, now)
            })
        })
    }

    /// Close the position: stake and pending reward are paid out in one
    /// transfer. Returns the total paid.
    pub fn exit(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let exit = with_account(&env, &staker, |engine, ledger, account, now| {
                engine.exit_all(ledger, account, &staker, now)
            })?;
            exit.principal
                .checked_add(exit.reward)
                .ok_or(ContractError::Overflow)
        })
    }

    /// Harvest pending reward without touching the stake.
    pub fn claim(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.claim(ledger, account, &staker, now)
            })
        })
    }

    /// Settle the pool up to the current block. Callable by anyone; returns
    /// the participant emission minted by this call.
    pub fn poke(env: Env) -> Result<i128, ContractError> {
        require_initialized(&env)?;

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let phases = load_phases(&env)?;
            let mut ledger = load_ledger(&env)?;
            let now = clock(&env, &config);

            let accrual = engine(&env, &phases, &config).poke(&mut ledger, now)?;
            env.storage().instance().set(&LEDGER, &ledger);
            common::bump_instance(&env);
            Ok(accrual.participants)
        })
    }

    // ── Others tier ─────────────────────────────────────────────────────────

    /// Pay the accrued "others" emission to its recipient.
    pub fn claim_others(env: Env, caller: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        if others_recipient(&env)? != caller {
            return Err(ContractError::Unauthorized);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let phases = load_phases(&env)?;
            let mut ledger = load_ledger(&env)?;
            let now = clock(&env, &config);

            let mut engine = engine(&env, &phases, &config);
            engine.poke(&mut ledger, now)?;

            let amount = ledger.others_accrued;
            if amount == 0 {
                return Err(ContractError::NothingToClaim);
            }
            if !engine.funding_mut().push_reward(&caller, amount) {
                return Err(ContractError::FundingRealizationFailed);
            }
            ledger.others_accrued = 0;
            env.storage().instance().set(&LEDGER, &ledger);
            common::bump_instance(&env);

            events::publish_others_claimed(&env, caller.clone(), amount);
            Ok(amount)
        })
    }

    pub fn set_others_recipient(
        env: Env,
        caller: Address,
        recipient: Address,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;

        env.storage().instance().set(&OTHERS_RECIPIENT, &recipient);
        events::publish_others_recipient_set(&env, recipient);
        Ok(())
    }

    // ── Emergency ───────────────────────────────────────────────────────────

    /// Toggle emergency mode. While enabled deposits are rejected and
    /// `emergency_withdraw` is available.
    pub fn set_emergency(env: Env, caller: Address, enabled: bool) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        if !access::is_authorized(&env, &caller, Action::Emergency) {
            return Err(ContractError::Unauthorized);
        }

        env.storage().instance().set(&EMERGENCY, &enabled);
        log!(&env, "distributor emergency mode", enabled);
        events::publish_emergency_set(&env, enabled);
        Ok(())
    }

    /// Return the whole stake without settling. Pending reward is forfeited.
    pub fn emergency_withdraw(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();
        if !emergency_enabled(&env) {
            return Err(ContractError::NotInEmergency);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let phases = load_phases(&env)?;
            let mut ledger = load_ledger(&env)?;
            let mut account = load_account(&env, &staker);

            let principal =
                engine(&env, &phases, &config).discard(&mut ledger, &mut account, &staker)?;
            env.storage().instance().set(&LEDGER, &ledger);
            store_account(&env, &staker, &account);

            events::publish_emergency_withdrawn(&env, staker.clone(), principal);
            Ok(principal)
        })
    }

    // ── Access control ──────────────────────────────────────────────────────

    /// Let `grantee` perform `action` without being admin.
    pub fn grant_action(
        env: Env,
        caller: Address,
        action: Action,
        grantee: Address,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;
        access::grant(&env, action, &grantee);
        Ok(())
    }

    pub fn revoke_action(
        env: Env,
        caller: Address,
        action: Action,
        grantee: Address,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;
        access::revoke(&env, action, &grantee);
        Ok(())
    }

    /// Propose a new admin. The proposed address completes the transfer with
    /// `accept_admin`.
    pub fn propose_admin(
        env: Env,
        current_admin: Address,
        new_admin: Address,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        current_admin.require_auth();
        require_admin(&env, &current_admin)?;

        access::propose_admin(&env, &new_admin);
        events::publish_admin_transfer_proposed(&env, current_admin, new_admin);
        Ok(())
    }

    pub fn accept_admin(env: Env, new_admin: Address) -> Result<(), ContractError> {
        require_initialized(&env)?;
        new_admin.require_auth();

        let old_admin = access::accept_admin(&env, &new_admin).ok_or(ContractError::Unauthorized)?;
        events::publish_admin_transfer_accepted(&env, old_admin, new_admin);
        Ok(())
    }

    // ── View functions ───────────────────────────────────────────────────────

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn get_admin(env: Env) -> Result<Address, ContractError> {
        access::get_admin(&env).ok_or(ContractError::NotInitialized)
    }

    pub fn get_pending_admin(env: Env) -> Option<Address> {
        access::get_pending_admin(&env)
    }

    pub fn get_config(env: Env) -> Result<DistributorConfig, ContractError> {
        load_config(&env)
    }

    /// Ledger as of the last settlement.
    pub fn get_ledger(env: Env) -> Result<LedgerState, ContractError> {
        load_ledger(&env)
    }

    pub fn get_account(env: Env, staker: Address) -> Account {
        load_account(&env, &staker)
    }

    /// Reward `staker` would receive if they claimed now.
    pub fn pending_reward(env: Env, staker: Address) -> Result<i128, ContractError> {
        let config = load_config(&env)?;
        let phases = load_phases(&env)?;
        let ledger = load_ledger(&env)?.projected(&phases, clock(&env, &config))?;
        let account = load_account(&env, &staker);

        account
            .pending(&ledger)?
            .checked_add(account.unsettled)
            .ok_or(ContractError::Overflow)
    }

    /// Emission owed to the others tier if it claimed now.
    pub fn pending_others(env: Env) -> Result<i128, ContractError> {
        let config = load_config(&env)?;
        let phases = load_phases(&env)?;
        let ledger = load_ledger(&env)?.projected(&phases, clock(&env, &config))?;
        Ok(ledger.others_accrued)
    }

    pub fn current_rates(env: Env) -> Result<Option<Rates>, ContractError> {
        let block = u64::from(env.ledger().sequence());
        Self::rate_at(env, block)
    }

    /// Rates in force at `block`; `None` before the start and from the
    /// schedule end on.
    pub fn rate_at(env: Env, block: u64) -> Result<Option<Rates>, ContractError> {
        let config = load_config(&env)?;
        if block >= config.schedule_end {
            return Ok(None);
        }
        let phases = load_phases(&env)?;
        Ok(phases
            .locate(config.start_block, block)
            .map(|(phase_index, phase)| Rates {
                phase_index,
                rate_for_participants: phase.rate_for_participants,
                rate_for_others: phase.rate_for_others,
            }))
    }

    pub fn schedule_end(env: Env) -> Result<u64, ContractError> {
        Ok(load_config(&env)?.schedule_end)
    }

    pub fn get_budget(env: Env) -> Result<i128, ContractError> {
        Ok(load_config(&env)?.budget)
    }

    pub fn get_phases(env: Env) -> Result<Vec<Phase>, ContractError> {
        load_phases(&env)
    }

    pub fn get_others_recipient(env: Env) -> Result<Address, ContractError> {
        others_recipient(&env)
    }

    pub fn is_emergency(env: Env) -> bool {
        emergency_enabled(&env)
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn require_initialized(env: &Env) -> Result<(), ContractError> {
    if !env.storage().instance().has(&INITIALIZED) {
        return Err(ContractError::NotInitialized);
    }
    Ok(())
}

fn require_admin(env: &Env, caller: &Address) -> Result<(), ContractError> {
    if !access::is_admin(env, caller) {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

/// Schedule checks; returns the total length in blocks.
fn validate_schedule(env: &Env, phases: &Vec<Phase>, budget: i128) -> Result<u64, ContractError> {
    if phases.is_empty() {
        return Err(ContractError::ScheduleInvariantViolation);
    }
    for phase in phases.iter() {
        if phase.length == 0 || phase.rate_for_participants < 0 || phase.rate_for_others < 0 {
            return Err(ContractError::ScheduleInvariantViolation);
        }
    }
    let integral = phases.integral().ok_or(ContractError::Overflow)?;
    if integral != budget {
        log!(env, "schedule emission does not match budget", integral, budget);
        return Err(ContractError::ScheduleInvariantViolation);
    }
    phases.total_length().ok_or(ContractError::Overflow)
}

/// Current block clamped to the schedule end, so the minted total never
/// exceeds the budget.
fn clock(env: &Env, config: &DistributorConfig) -> u64 {
    u64::from(env.ledger().sequence()).min(config.schedule_end)
}

fn engine<'a>(env: &'a Env, phases: &'a Vec<Phase>, config: &DistributorConfig) -> Engine<'a> {
    AccrualEngine::new(
        phases,
        TokenFunding::new(env, config.token.clone()).minting(),
        ContractEvents::new(env),
        Disposition::Compound,
    )
}

/// Load the pool and `staker`'s account, run `action` against them and
/// persist both if it succeeded.
fn with_account<T>(
    env: &Env,
    staker: &Address,
    action: impl FnOnce(&mut Engine<'_>, &mut LedgerState, &mut Account, u64) -> Result<T, AccrualError>,
) -> Result<T, ContractError> {
    let config = load_config(env)?;
    let phases = load_phases(env)?;
    let mut ledger = load_ledger(env)?;
    let mut account = load_account(env, staker);
    let now = clock(env, &config);

    let mut engine = engine(env, &phases, &config);
    let result = action(&mut engine, &mut ledger, &mut account, now)?;

    env.storage().instance().set(&LEDGER, &ledger);
    store_account(env, staker, &account);
    common::bump_instance(env);
    Ok(result)
}

fn load_config(env: &Env) -> Result<DistributorConfig, ContractError> {
    env.storage()
        .instance()
        .get(&CONFIG)
        .ok_or(ContractError::NotInitialized)
}

fn load_phases(env: &Env) -> Result<Vec<Phase>, ContractError> {
    env.storage()
        .instance()
        .get(&PHASES)
        .ok_or(ContractError::NotInitialized)
}

fn load_ledger(env: &Env) -> Result<LedgerState, ContractError> {
    env.storage()
        .instance()
        .get(&LEDGER)
        .ok_or(ContractError::NotInitialized)
}

fn load_account(env: &Env, staker: &Address) -> Account {
    env.storage()
        .persistent()
        .get(&(ACCOUNT, staker.clone()))
        .unwrap_or_default()
}

fn store_account(env: &Env, staker: &Address, account: &Account) {
    let key = (ACCOUNT, staker.clone());
    if account.is_empty() {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, account);
    env.storage()
        .persistent()
        .extend_ttl(&key, ACCOUNT_TTL_THRESHOLD, ACCOUNT_TTL_EXTEND_TO);
}

fn others_recipient(env: &Env) -> Result<Address, ContractError> {
    env.storage()
        .instance()
        .get(&OTHERS_RECIPIENT)
        .ok_or(ContractError::NotInitialized)
}

fn emergency_enabled(env: &Env) -> bool {
    env.storage().instance().get(&EMERGENCY).unwrap_or(false)
}

#[cfg(test)]
mod test;
