#![no_std]

//! Revocable token vesting wallet.
//!
//! Tokens sent to the contract vest linearly from `start` to
//! `start + duration`, with nothing releasable before the cliff. Anyone may
//! trigger a release to the beneficiary. A revocable grant can be cut off by
//! the owner: the unvested part is refunded and the rest becomes releasable
//! at once.

pub mod events;

use accrual::vesting;
use common::guard;
use events::InitializedEvent;
use soroban_sdk::{contract, contractimpl, contracttype, log, symbol_short, token, Address, Env, Symbol};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const CONFIG: Symbol = symbol_short!("CONFIG");
const RELEASED: Symbol = symbol_short!("RELEASED");
const REVOKED: Symbol = symbol_short!("REVOKED");

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
    NothingToClaim = 6,
    NotRevocable = 7,
    AlreadyRevoked = 8,
    FundingRealizationFailed = 9,
    Overflow = 10,
}

// ── Public-facing types ──────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VestingConfig {
    pub owner: Address,
    pub beneficiary: Address,
    pub token: Address,
    pub start: u64,
    /// Absolute cliff instant (`start + cliff_duration`).
    pub cliff: u64,
    pub duration: u64,
    pub revocable: bool,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct VestingContract;

#[contractimpl]
impl VestingContract {
    /// Bootstrap the wallet. Fund it with a plain token transfer to the
    /// contract address; later top-ups vest on the same schedule.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        owner: Address,
        beneficiary: Address,
        token: Address,
        start: u64,
        cliff_duration: u64,
        duration: u64,
        revocable: bool,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        if duration == 0 || cliff_duration > duration {
            return Err(ContractError::InvalidInput);
        }
        let cliff = start
            .checked_add(cliff_duration)
            .ok_or(ContractError::Overflow)?;
        start.checked_add(duration).ok_or(ContractError::Overflow)?;

        let config = VestingConfig {
            owner,
            beneficiary,
            token,
            start,
            cliff,
            duration,
            revocable,
        };

        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&CONFIG, &config);
        env.storage().instance().set(&RELEASED, &0i128);
        env.storage().instance().set(&REVOKED, &false);
        common::bump_instance(&env);

        events::publish_initialized(
            &env,
            InitializedEvent {
                owner: config.owner,
                beneficiary: config.beneficiary,
                token: config.token,
                start,
                cliff,
                duration,
                revocable,
            },
        );

        Ok(())
    }

    /// Transfer everything currently releasable to the beneficiary.
    pub fn release(env: Env) -> Result<i128, ContractError> {
        require_initialized(&env)?;

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let amount = releasable_now(&env, &config)?;
            if amount <= 0 {
                return Err(ContractError::NothingToClaim);
            }

            let released = get_released(&env)
                .checked_add(amount)
                .ok_or(ContractError::Overflow)?;
            env.storage().instance().set(&RELEASED, &released);
            transfer_out(&env, &config.token, &config.beneficiary, amount)?;
            common::bump_instance(&env);

            events::publish_released(&env, config.beneficiary, amount);
            Ok(amount)
        })
    }

    /// Stop vesting. What has vested stays releasable for the beneficiary;
    /// the unvested remainder is refunded to the owner. Returns the refund.
    pub fn revoke(env: Env, owner: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        owner.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            if owner != config.owner {
                return Err(ContractError::Unauthorized);
            }
            if !config.revocable {
                return Err(ContractError::NotRevocable);
            }
            if load_revoked(&env) {
                return Err(ContractError::AlreadyRevoked);
            }

            let balance = balance(&env, &config.token);
            let unreleased = releasable_now(&env, &config)?;
            let refund = balance
                .checked_sub(unreleased)
                .ok_or(ContractError::Overflow)?;

            env.storage().instance().set(&REVOKED, &true);
            transfer_out(&env, &config.token, &owner, refund)?;
            log!(&env, "vesting revoked", refund, unreleased);

            events::publish_revoked(&env, owner.clone(), refund);
            Ok(refund)
        })
    }

    // ── View functions ───────────────────────────────────────────────────────

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn get_config(env: Env) -> Result<VestingConfig, ContractError> {
        load_config(&env)
    }

    pub fn releasable(env: Env) -> Result<i128, ContractError> {
        releasable_now(&env, &load_config(&env)?)
    }

    /// Cumulative amount vested so far, released or not.
    pub fn vested_amount(env: Env) -> Result<i128, ContractError> {
        let config = load_config(&env)?;
        vesting::vested_amount(
            total_received(&env, &config)?,
            env.ledger().timestamp(),
            config.cliff,
            config.start,
            config.duration,
            load_revoked(&env),
        )
        .map_err(|_| ContractError::Overflow)
    }

    pub fn released(env: Env) -> i128 {
        get_released(&env)
    }

    pub fn is_revoked(env: Env) -> bool {
        load_revoked(&env)
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn require_initialized(env: &Env) -> Result<(), ContractError> {
    if !env.storage().instance().has(&INITIALIZED) {
        return Err(ContractError::NotInitialized);
    }
    Ok(())
}

fn load_config(env: &Env) -> Result<VestingConfig, ContractError> {
    env.storage()
        .instance()
        .get(&CONFIG)
        .ok_or(ContractError::NotInitialized)
}

fn get_released(env: &Env) -> i128 {
    env.storage().instance().get(&RELEASED).unwrap_or(0)
}

fn load_revoked(env: &Env) -> bool {
    env.storage().instance().get(&REVOKED).unwrap_or(false)
}

fn balance(env: &Env, token: &Address) -> i128 {
    token::TokenClient::new(env, token).balance(&env.current_contract_address())
}

/// Everything the wallet ever held: current balance plus what was released.
fn total_received(env: &Env, config: &VestingConfig) -> Result<i128, ContractError> {
    balance(env, &config.token)
        .checked_add(get_released(env))
        .ok_or(ContractError::Overflow)
}

fn releasable_now(env: &Env, config: &VestingConfig) -> Result<i128, ContractError> {
    vesting::releasable(
        total_received(env, config)?,
        get_released(env),
        env.ledger().timestamp(),
        config.cliff,
        config.start,
        config.duration,
        load_revoked(env),
    )
    .map_err(|_| ContractError::Overflow)
}

fn transfer_out(env: &Env, token: &Address, to: &Address, amount: i128) -> Result<(), ContractError> {
    if amount == 0 {
        return Ok(());
    }
    let client = token::TokenClient::new(env, token);
    match client.try_transfer(&env.current_contract_address(), to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(ContractError::FundingRealizationFailed),
    }
}
