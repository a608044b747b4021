#![no_std]

//! NFT staking vault.
//!
//! Every staked token earns `rewards_per_unit_time` per `time_unit`,
//! independent of how many tokens are staked in total. Reward parameters
//! change by appending a new staking condition; a staker settles by walking
//! the conditions since its last update. Rewards are paid from a reward
//! token balance the admin deposits up front.

pub mod conditions;
pub mod events;
pub mod nft;

use accrual::{
    conditions::rewards_since_last_update, AccrualError, ConditionLog, StakingCondition,
    VaultStaker,
};
use common::access::{self, Action};
use common::guard;
use conditions::StoredConditions;
use nft::NftClient;
use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, Env, Symbol, Vec,
};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const CONFIG: Symbol = symbol_short!("CONFIG");
const REWARD_BALANCE: Symbol = symbol_short!("RWD_BAL");
const STAKERS: Symbol = symbol_short!("STAKERS");

// Persistent tuple keys: (prefix, staker) and (prefix, token_id)
const STAKER: Symbol = symbol_short!("STAKER");
const STAKED_IDS: Symbol = symbol_short!("STK_IDS");
const TOKEN: Symbol = symbol_short!("TOKEN");

const ENTRY_TTL_THRESHOLD: u32 = 518_400;
const ENTRY_TTL_EXTEND_TO: u32 = 1_036_800;

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
    InvalidAmount = 6,
    InsufficientBalance = 7,
    NothingToClaim = 8,
    NothingStaked = 9,
    ScheduleInvariantViolation = 10,
    FundingRealizationFailed = 11,
    Overflow = 12,
    NotTokenOwner = 13,
    AlreadyStaked = 14,
    NotStaked = 15,
    NftTransferFailed = 16,
    InsufficientRewardBalance = 17,
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

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultConfig {
    pub nft: Address,
    pub reward_token: Address,
}

/// Custody state of a single NFT.
///
/// `Transferring` is set while the token is moving into the vault, so a
/// callback from the collection cannot observe a half-staked token.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenStatus {
    NotStaked,
    Transferring,
    Staked,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakedToken {
    pub staker: Address,
    pub status: TokenStatus,
}

/// Returned by `get_stake_info`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakeInfo {
    pub token_ids: Vec<u32>,
    pub rewards: i128,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct NftStakingContract;

#[contractimpl]
impl NftStakingContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the vault with its first staking condition.
    pub fn initialize(
        env: Env,
        admin: Address,
        nft: Address,
        reward_token: Address,
        time_unit: u64,
        rewards_per_unit_time: i128,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        if time_unit == 0 || rewards_per_unit_time < 0 {
            return Err(ContractError::InvalidInput);
        }

        let config = VaultConfig {
            nft: nft.clone(),
            reward_token: reward_token.clone(),
        };

        access::set_admin(&env, &admin);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&CONFIG, &config);
        env.storage().instance().set(&REWARD_BALANCE, &0i128);
        env.storage().instance().set(&STAKERS, &Vec::<Address>::new(&env));
        let condition_id = StoredConditions::new(&env).append(
            time_unit,
            rewards_per_unit_time,
            env.ledger().timestamp(),
        );
        common::bump_instance(&env);

        events::publish_initialized(&env, admin, nft, reward_token);
        events::publish_condition_updated(&env, condition_id, time_unit, rewards_per_unit_time);

        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Move `token_ids` from `staker` into the vault.
    pub fn stake(env: Env, staker: Address, token_ids: Vec<u32>) -> Result<(), ContractError> {
        require_initialized(&env)?;
        staker.require_auth();
        if token_ids.is_empty() {
            return Err(ContractError::InvalidInput);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let log = StoredConditions::new(&env);
            let now = env.ledger().timestamp();
            let nft = NftClient::new(&env, &config.nft);
            let vault = env.current_contract_address();

            let mut info = load_staker(&env, &staker);
            if info.amount_staked > 0 {
                info.settle(&log, now)?;
            } else {
                info.touch(&log, now);
                add_staker(&env, &staker);
            }

            let mut staked_ids = load_staked_ids(&env, &staker);
            for token_id in token_ids.iter() {
                if status_of(&env, token_id) != TokenStatus::NotStaked {
                    return Err(ContractError::AlreadyStaked);
                }
                if !matches!(nft.try_owner_of(&token_id), Ok(Ok(owner)) if owner == staker) {
                    return Err(ContractError::NotTokenOwner);
                }

                store_token(&env, token_id, &staker, TokenStatus::Transferring);
                if !matches!(nft.try_transfer(&staker, &vault, &token_id), Ok(Ok(()))) {
                    return Err(ContractError::NftTransferFailed);
                }
                store_token(&env, token_id, &staker, TokenStatus::Staked);
                staked_ids.push_back(token_id);
            }

            info.amount_staked = info
                .amount_staked
                .checked_add(u64::from(token_ids.len()))
                .ok_or(ContractError::Overflow)?;
            store_staker(&env, &staker, &info);
            store_staked_ids(&env, &staker, &staked_ids);
            common::bump_instance(&env);

            events::publish_tokens_staked(&env, staker.clone(), token_ids.clone());
            Ok(())
        })
    }

    /// Return `token_ids` to `staker`. Rewards earned so far stay claimable.
    pub fn withdraw(env: Env, staker: Address, token_ids: Vec<u32>) -> Result<(), ContractError> {
        require_initialized(&env)?;
        staker.require_auth();
        if token_ids.is_empty() {
            return Err(ContractError::InvalidInput);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let log = StoredConditions::new(&env);
            let now = env.ledger().timestamp();
            let nft = NftClient::new(&env, &config.nft);
            let vault = env.current_contract_address();

            let mut info = load_staker(&env, &staker);
            let count = u64::from(token_ids.len());
            if info.amount_staked < count {
                return Err(ContractError::InsufficientBalance);
            }
            info.settle(&log, now)?;

            let mut staked_ids = load_staked_ids(&env, &staker);
            for token_id in token_ids.iter() {
                let owned = load_token(&env, token_id)
                    .is_some_and(|t| t.staker == staker && t.status == TokenStatus::Staked);
                if !owned {
                    return Err(ContractError::NotStaked);
                }
                remove_token(&env, token_id);
                if let Some(index) = staked_ids.first_index_of(token_id) {
                    staked_ids.remove(index);
                }
                if !matches!(nft.try_transfer(&vault, &staker, &token_id), Ok(Ok(()))) {
                    return Err(ContractError::NftTransferFailed);
                }
            }

            info.amount_staked -= count;
            if info.amount_staked == 0 {
                remove_staker(&env, &staker);
            }
            store_staker(&env, &staker, &info);
            store_staked_ids(&env, &staker, &staked_ids);
            common::bump_instance(&env);

            events::publish_tokens_withdrawn(&env, staker.clone(), token_ids.clone());
            Ok(())
        })
    }

    /// Pay out everything `staker` has earned.
    pub fn claim_rewards(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let config = load_config(&env)?;
            let log = StoredConditions::new(&env);
            let now = env.ledger().timestamp();

            let mut info = load_staker(&env, &staker);
            info.settle(&log, now)?;
            let rewards = info.unclaimed_rewards;
            if rewards == 0 {
                return Err(ContractError::NothingToClaim);
            }

            let balance = reward_balance(&env);
            if rewards > balance {
                log!(&env, "reward balance too low", rewards, balance);
                return Err(ContractError::InsufficientRewardBalance);
            }
            info.unclaimed_rewards = 0;
            store_staker(&env, &staker, &info);
            env.storage()
                .instance()
                .set(&REWARD_BALANCE, &(balance - rewards));

            let client = token::TokenClient::new(&env, &config.reward_token);
            if !matches!(
                client.try_transfer(&env.current_contract_address(), &staker, &rewards),
                Ok(Ok(()))
            ) {
                return Err(ContractError::FundingRealizationFailed);
            }

            events::publish_rewards_claimed(&env, staker.clone(), rewards);
            Ok(rewards)
        })
    }

    // ── Staking conditions ──────────────────────────────────────────────────

    pub fn set_time_unit(env: Env, caller: Address, time_unit: u64) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_authorized(&env, &caller, Action::SetSchedule)?;

        let current = latest_condition(&env)?;
        if time_unit == 0 || time_unit == current.time_unit {
            return Err(ContractError::InvalidInput);
        }
        guard::non_reentrant(&env, ContractError::Reentrant, || {
            set_condition(&env, time_unit, current.rewards_per_unit_time)
        })
    }

    pub fn set_rewards_per_unit_time(
        env: Env,
        caller: Address,
        rewards_per_unit_time: i128,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_authorized(&env, &caller, Action::SetSchedule)?;

        let current = latest_condition(&env)?;
        if rewards_per_unit_time < 0 || rewards_per_unit_time == current.rewards_per_unit_time {
            return Err(ContractError::InvalidInput);
        }
        guard::non_reentrant(&env, ContractError::Reentrant, || {
            set_condition(&env, current.time_unit, rewards_per_unit_time)
        })
    }

    // ── Reward token custody ────────────────────────────────────────────────

    pub fn deposit_reward_tokens(env: Env, caller: Address, amount: i128) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        let config = load_config(&env)?;
        let client = token::TokenClient::new(&env, &config.reward_token);
        if !matches!(
            client.try_transfer(&caller, &env.current_contract_address(), &amount),
            Ok(Ok(()))
        ) {
            return Err(ContractError::FundingRealizationFailed);
        }

        let balance = reward_balance(&env)
            .checked_add(amount)
            .ok_or(ContractError::Overflow)?;
        env.storage().instance().set(&REWARD_BALANCE, &balance);

        events::publish_reward_tokens_deposited(&env, amount, balance);
        Ok(())
    }

    pub fn withdraw_reward_tokens(env: Env, caller: Address, amount: i128) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        let balance = reward_balance(&env);
        if amount > balance {
            return Err(ContractError::InsufficientBalance);
        }
        env.storage()
            .instance()
            .set(&REWARD_BALANCE, &(balance - amount));

        let config = load_config(&env)?;
        let client = token::TokenClient::new(&env, &config.reward_token);
        if !matches!(
            client.try_transfer(&env.current_contract_address(), &caller, &amount),
            Ok(Ok(()))
        ) {
            return Err(ContractError::FundingRealizationFailed);
        }

        events::publish_reward_tokens_withdrawn(&env, amount, balance - amount);
        Ok(())
    }

    // ── Access control ──────────────────────────────────────────────────────

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

    // ── View functions ───────────────────────────────────────────────────────

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INITIALIZED)
    }

    pub fn get_admin(env: Env) -> Result<Address, ContractError> {
        access::get_admin(&env).ok_or(ContractError::NotInitialized)
    }

    /// Staked token ids and total claimable rewards of `staker`.
    pub fn get_stake_info(env: Env, staker: Address) -> Result<StakeInfo, ContractError> {
        let info = load_staker(&env, &staker);
        let log = StoredConditions::new(&env);
        let rewards = info
            .unclaimed_rewards
            .checked_add(rewards_since_last_update(&log, &info, env.ledger().timestamp()))
            .ok_or(ContractError::Overflow)?;
        Ok(StakeInfo {
            token_ids: load_staked_ids(&env, &staker),
            rewards,
        })
    }

    pub fn get_staker(env: Env, staker: Address) -> VaultStaker {
        load_staker(&env, &staker)
    }

    pub fn get_stakers(env: Env) -> Vec<Address> {
        load_stakers(&env)
    }

    pub fn get_condition(env: Env, condition_id: u32) -> Option<StakingCondition> {
        StoredConditions::new(&env).condition(condition_id)
    }

    pub fn get_time_unit(env: Env) -> Result<u64, ContractError> {
        Ok(latest_condition(&env)?.time_unit)
    }

    pub fn get_rewards_per_unit_time(env: Env) -> Result<i128, ContractError> {
        Ok(latest_condition(&env)?.rewards_per_unit_time)
    }

    /// Reward tokens set aside for payouts.
    pub fn reward_token_balance(env: Env) -> i128 {
        reward_balance(&env)
    }

    pub fn token_status(env: Env, token_id: u32) -> TokenStatus {
        status_of(&env, token_id)
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

fn require_authorized(env: &Env, caller: &Address, action: Action) -> Result<(), ContractError> {
    if !access::is_authorized(env, caller, action) {
        return Err(ContractError::Unauthorized);
    }
    Ok(())
}

fn latest_condition(env: &Env) -> Result<StakingCondition, ContractError> {
    StoredConditions::new(env)
        .latest()
        .ok_or(ContractError::NotInitialized)
}

/// Settle every staker under the old condition, then switch.
fn set_condition(env: &Env, time_unit: u64, rewards_per_unit_time: i128) -> Result<(), ContractError> {
    let log = StoredConditions::new(env);
    let now = env.ledger().timestamp();

    for staker in load_stakers(env).iter() {
        let mut info = load_staker(env, &staker);
        info.settle(&log, now)?;
        store_staker(env, &staker, &info);
    }

    let condition_id = log.append(time_unit, rewards_per_unit_time, now);
    common::bump_instance(env);

    events::publish_condition_updated(env, condition_id, time_unit, rewards_per_unit_time);
    Ok(())
}

fn load_config(env: &Env) -> Result<VaultConfig, ContractError> {
    env.storage()
        .instance()
        .get(&CONFIG)
        .ok_or(ContractError::NotInitialized)
}

fn reward_balance(env: &Env) -> i128 {
    env.storage().instance().get(&REWARD_BALANCE).unwrap_or(0)
}

fn load_stakers(env: &Env) -> Vec<Address> {
    env.storage()
        .instance()
        .get(&STAKERS)
        .unwrap_or_else(|| Vec::new(env))
}

fn add_staker(env: &Env, staker: &Address) {
    let mut stakers = load_stakers(env);
    if !stakers.contains(staker) {
        stakers.push_back(staker.clone());
        env.storage().instance().set(&STAKERS, &stakers);
    }
}

fn remove_staker(env: &Env, staker: &Address) {
    let mut stakers = load_stakers(env);
    if let Some(index) = stakers.first_index_of(staker) {
        stakers.remove(index);
        env.storage().instance().set(&STAKERS, &stakers);
    }
}

fn load_staker(env: &Env, staker: &Address) -> VaultStaker {
    env.storage()
        .persistent()
        .get(&(STAKER, staker.clone()))
        .unwrap_or_default()
}

fn store_staker(env: &Env, staker: &Address, info: &VaultStaker) {
    let key = (STAKER, staker.clone());
    env.storage().persistent().set(&key, info);
    env.storage()
        .persistent()
        .extend_ttl(&key, ENTRY_TTL_THRESHOLD, ENTRY_TTL_EXTEND_TO);
}

fn load_staked_ids(env: &Env, staker: &Address) -> Vec<u32> {
    env.storage()
        .persistent()
        .get(&(STAKED_IDS, staker.clone()))
        .unwrap_or_else(|| Vec::new(env))
}

fn store_staked_ids(env: &Env, staker: &Address, token_ids: &Vec<u32>) {
    let key = (STAKED_IDS, staker.clone());
    if token_ids.is_empty() {
        env.storage().persistent().remove(&key);
        return;
    }
    env.storage().persistent().set(&key, token_ids);
    env.storage()
        .persistent()
        .extend_ttl(&key, ENTRY_TTL_THRESHOLD, ENTRY_TTL_EXTEND_TO);
}

fn load_token(env: &Env, token_id: u32) -> Option<StakedToken> {
    env.storage().persistent().get(&(TOKEN, token_id))
}

fn store_token(env: &Env, token_id: u32, staker: &Address, status: TokenStatus) {
    let key = (TOKEN, token_id);
    env.storage().persistent().set(
        &key,
        &StakedToken {
            staker: staker.clone(),
            status,
        },
    );
    env.storage()
        .persistent()
        .extend_ttl(&key, ENTRY_TTL_THRESHOLD, ENTRY_TTL_EXTEND_TO);
}

fn remove_token(env: &Env, token_id: u32) {
    env.storage().persistent().remove(&(TOKEN, token_id));
}

fn status_of(env: &Env, token_id: u32) -> TokenStatus {
    load_token(env, token_id).map_or(TokenStatus::NotStaked, |t| t.status)
}
