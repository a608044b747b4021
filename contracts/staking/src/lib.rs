#![no_std]

//! Staking-rewards pool.
//!
//! Stakers deposit `stake_token` and earn `reward_token` at a rate fixed for
//! each funded period. The rewards distribution account funds a period with
//! `notify_reward_amount`; earned rewards are banked on every touch and paid
//! out by `get_reward` or `exit`.

pub mod events;
pub mod rewards;

use accrual::token::TokenFunding;
use accrual::{Account, AccrualEngine, AccrualError, Disposition, LedgerState, Phase};
use common::access::{self, Action};
use common::guard;
use events::ContractEvents;
use soroban_sdk::{
    contract, contractimpl, contracttype, log, symbol_short, token, Address, Env, Symbol,
};

// ── Storage key constants ────────────────────────────────────────────────────

const INITIALIZED: Symbol = symbol_short!("INIT");
const CONFIG: Symbol = symbol_short!("CONFIG");
const PERIOD: Symbol = symbol_short!("PERIOD");
const LEDGER: Symbol = symbol_short!("LEDGER");

// Per-user persistent storage uses tuple keys:  (prefix, user_address)
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
    TokensIdentical = 14,
    RewardTooHigh = 15,
    PeriodNotFinished = 16,
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

// ── Public-facing types (re-exported for test consumers) ─────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolConfig {
    pub stake_token: Address,
    pub reward_token: Address,
    /// Account allowed to fund reward periods.
    pub rewards_distribution: Address,
}

/// The running (or last) reward period.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RewardPeriod {
    pub reward_rate: i128,
    pub rewards_duration: u64,
    pub period_finish: u64,
}

impl RewardPeriod {
    /// A period is a one-phase schedule paying only the participants.
    fn schedule(&self) -> [Phase; 1] {
        [Phase {
            rate_for_participants: self.reward_rate,
            rate_for_others: 0,
            length: self.rewards_duration,
        }]
    }
}

/// Snapshot of a user's staking position returned by `get_staker_info`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StakerInfo {
    pub staked: i128,
    pub pending_rewards: i128,
}

type Engine<'a> = AccrualEngine<'a, [Phase], TokenFunding<'a>, ContractEvents<'a>>;

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct StakingContract;

#[contractimpl]
impl StakingContract {
    // ── Initialisation ──────────────────────────────────────────────────────

    /// Bootstrap the pool.
    ///
    /// * `rewards_distribution` – account allowed to fund reward periods.
    /// * `stake_token` / `reward_token` – SAC addresses; they must differ.
    /// * `rewards_duration` – length of a funded period in seconds.
    pub fn initialize(
        env: Env,
        admin: Address,
        rewards_distribution: Address,
        stake_token: Address,
        reward_token: Address,
        rewards_duration: u64,
    ) -> Result<(), ContractError> {
        if env.storage().instance().has(&INITIALIZED) {
            return Err(ContractError::AlreadyInitialized);
        }
        if stake_token == reward_token {
            return Err(ContractError::TokensIdentical);
        }
        if rewards_duration == 0 {
            return Err(ContractError::InvalidInput);
        }

        let period = RewardPeriod {
            rewards_duration,
            ..RewardPeriod::default()
        };
        let ledger = LedgerState::new(&period.schedule()[..], env.ledger().timestamp())?;
        let config = PoolConfig {
            stake_token: stake_token.clone(),
            reward_token: reward_token.clone(),
            rewards_distribution: rewards_distribution.clone(),
        };

        access::set_admin(&env, &admin);
        env.storage().instance().set(&INITIALIZED, &true);
        env.storage().instance().set(&CONFIG, &config);
        env.storage().instance().set(&PERIOD, &period);
        env.storage().instance().set(&LEDGER, &ledger);
        common::bump_instance(&env);

        events::publish_initialized(
            &env,
            admin,
            rewards_distribution,
            stake_token,
            reward_token,
            rewards_duration,
        );

        Ok(())
    }

    // ── Staking ─────────────────────────────────────────────────────────────

    /// Deposit `amount` stake tokens. Rewards earned so far are banked first.
    pub fn stake(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        require_initialized(&env)?;
        staker.require_auth();
        if access::is_paused(&env) {
            return Err(ContractError::Paused);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.join(ledger, account, &staker, amount, now)
            })?;
            Ok(())
        })
    }

    /// Withdraw `amount` stake tokens. Allowed while paused.
    pub fn withdraw(env: Env, staker: Address, amount: i128) -> Result<(), ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.decrease(ledger, account, &staker, amount, now)
            })?;
            Ok(())
        })
    }

    /// Pay out every reward earned so far.
    pub fn get_reward(env: Env, staker: Address) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            with_account(&env, &staker, |engine, ledger, account, now| {
                engine.claim(ledger, account, &staker, now)
            })
        })
    }

    /// Withdraw the whole stake and collect rewards. Returns
    /// `(principal, reward)`.
    pub fn exit(env: Env, staker: Address) -> Result<(i128, i128), ContractError> {
        require_initialized(&env)?;
        staker.require_auth();

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let exit = with_account(&env, &staker, |engine, ledger, account, now| {
                engine.exit_all(ledger, account, &staker, now)
            })?;
            Ok((exit.principal, exit.reward))
        })
    }

    // ── Reward funding ──────────────────────────────────────────────────────

    /// Fund a new reward period with `reward` tokens pulled from `caller`.
    ///
    /// Accrual is settled at the old rate first. If the running period has
    /// not finished, its leftover is rolled into the new one. The new rate
    /// must be backed by the pool's reward balance for the whole duration.
    pub fn notify_reward_amount(
        env: Env,
        caller: Address,
        reward: i128,
    ) -> Result<i128, ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        let config = load_config(&env)?;
        if caller != config.rewards_distribution
            && !access::is_authorized(&env, &caller, Action::NotifyReward)
        {
            return Err(ContractError::Unauthorized);
        }
        if reward <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        guard::non_reentrant(&env, ContractError::Reentrant, || {
            let mut period = load_period(&env)?;
            let mut ledger = load_ledger(&env)?;
            let now = env.ledger().timestamp();

            let schedule = period.schedule();
            engine(&env, &schedule, &config).poke(&mut ledger, clock(&env, &period))?;

            let pool = env.current_contract_address();
            let reward_token = token::TokenClient::new(&env, &config.reward_token);
            if !matches!(reward_token.try_transfer(&caller, &pool, &reward), Ok(Ok(()))) {
                return Err(ContractError::FundingRealizationFailed);
            }

            let rate = rewards::next_reward_rate(
                reward,
                now,
                period.period_finish,
                period.reward_rate,
                period.rewards_duration,
            )
            .ok_or(ContractError::Overflow)?;
            let max_rate = rewards::max_reward_rate(reward_token.balance(&pool), period.rewards_duration)
                .ok_or(ContractError::InvalidInput)?;
            if rate > max_rate {
                log!(&env, "reward rate exceeds balance", rate, max_rate);
                return Err(ContractError::RewardTooHigh);
            }

            period.reward_rate = rate;
            period.period_finish = now
                .checked_add(period.rewards_duration)
                .ok_or(ContractError::Overflow)?;
            ledger.restart(&period.schedule()[..], now)?;

            env.storage().instance().set(&PERIOD, &period);
            env.storage().instance().set(&LEDGER, &ledger);
            common::bump_instance(&env);

            events::publish_reward_added(&env, reward, rate, period.period_finish);
            Ok(rate)
        })
    }

    // ── Admin functions ──────────────────────────────────────────────────────

    /// Change the length of future periods. Only once the running period
    /// has finished.
    pub fn set_rewards_duration(
        env: Env,
        caller: Address,
        rewards_duration: u64,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_authorized(&env, &caller, Action::SetSchedule)?;
        if rewards_duration == 0 {
            return Err(ContractError::InvalidInput);
        }

        let mut period = load_period(&env)?;
        if env.ledger().timestamp() <= period.period_finish {
            return Err(ContractError::PeriodNotFinished);
        }
        period.rewards_duration = rewards_duration;
        env.storage().instance().set(&PERIOD, &period);

        events::publish_duration_updated(&env, rewards_duration);
        Ok(())
    }

    pub fn set_rewards_distribution(
        env: Env,
        caller: Address,
        rewards_distribution: Address,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_admin(&env, &caller)?;

        let mut config = load_config(&env)?;
        config.rewards_distribution = rewards_distribution.clone();
        env.storage().instance().set(&CONFIG, &config);

        events::publish_distribution_set(&env, rewards_distribution);
        Ok(())
    }

    /// Send `amount` of a token that is not the stake token to `caller`.
    pub fn recover_token(
        env: Env,
        caller: Address,
        token_address: Address,
        amount: i128,
    ) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_authorized(&env, &caller, Action::Recover)?;

        let config = load_config(&env)?;
        if token_address == config.stake_token {
            return Err(ContractError::InvalidInput);
        }
        if amount <= 0 {
            return Err(ContractError::InvalidAmount);
        }

        let client = token::TokenClient::new(&env, &token_address);
        if !matches!(
            client.try_transfer(&env.current_contract_address(), &caller, &amount),
            Ok(Ok(()))
        ) {
            return Err(ContractError::FundingRealizationFailed);
        }

        events::publish_recovered(&env, token_address, amount);
        Ok(())
    }

    /// Pausing blocks new stakes only; withdrawals and claims stay open.
    pub fn set_paused(env: Env, caller: Address, paused: bool) -> Result<(), ContractError> {
        require_initialized(&env)?;
        caller.require_auth();
        require_authorized(&env, &caller, Action::Pause)?;

        access::set_paused(&env, paused);
        events::publish_paused(&env, paused);
        Ok(())
    }

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

    // ── Admin transfer (two-step) ──────────────────────────────────────────

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

    pub fn is_paused(env: Env) -> bool {
        access::is_paused(&env)
    }

    pub fn get_admin(env: Env) -> Result<Address, ContractError> {
        access::get_admin(&env).ok_or(ContractError::NotInitialized)
    }

    pub fn get_config(env: Env) -> Result<PoolConfig, ContractError> {
        load_config(&env)
    }

    pub fn total_supply(env: Env) -> Result<i128, ContractError> {
        Ok(load_ledger(&env)?.total_stake)
    }

    pub fn balance_of(env: Env, staker: Address) -> i128 {
        load_account(&env, &staker).staked
    }

    pub fn last_time_reward_applicable(env: Env) -> Result<u64, ContractError> {
        Ok(clock(&env, &load_period(&env)?))
    }

    /// Accumulated reward per staked unit, scaled by `accrual::PRECISION`.
    pub fn reward_per_token(env: Env) -> Result<i128, ContractError> {
        Ok(projected_ledger(&env)?.acc_per_share)
    }

    /// Rewards `staker` could collect now.
    pub fn earned(env: Env, staker: Address) -> Result<i128, ContractError> {
        let ledger = projected_ledger(&env)?;
        earned_by(&load_account(&env, &staker), &ledger)
    }

    pub fn get_staker_info(env: Env, staker: Address) -> Result<StakerInfo, ContractError> {
        let ledger = projected_ledger(&env)?;
        let account = load_account(&env, &staker);
        Ok(StakerInfo {
            staked: account.staked,
            pending_rewards: earned_by(&account, &ledger)?,
        })
    }

    /// Total emission of a full period at the current rate.
    pub fn reward_for_duration(env: Env) -> Result<i128, ContractError> {
        let period = load_period(&env)?;
        period
            .reward_rate
            .checked_mul(i128::from(period.rewards_duration))
            .ok_or(ContractError::Overflow)
    }

    pub fn reward_rate(env: Env) -> Result<i128, ContractError> {
        Ok(load_period(&env)?.reward_rate)
    }

    pub fn rewards_duration(env: Env) -> Result<u64, ContractError> {
        Ok(load_period(&env)?.rewards_duration)
    }

    pub fn period_finish(env: Env) -> Result<u64, ContractError> {
        Ok(load_period(&env)?.period_finish)
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

/// Settlement time: rewards stop at the end of the funded period.
fn clock(env: &Env, period: &RewardPeriod) -> u64 {
    rewards::last_time_reward_applicable(env.ledger().timestamp(), period.period_finish)
}

fn engine<'a>(env: &'a Env, schedule: &'a [Phase], config: &PoolConfig) -> Engine<'a> {
    AccrualEngine::new(
        schedule,
        TokenFunding::new(env, config.stake_token.clone())
            .with_reward_token(config.reward_token.clone()),
        ContractEvents::new(env),
        Disposition::Defer,
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
    let period = load_period(env)?;
    let mut ledger = load_ledger(env)?;
    let mut account = load_account(env, staker);
    let schedule = period.schedule();

    let mut engine = engine(env, &schedule, &config);
    let result = action(&mut engine, &mut ledger, &mut account, clock(env, &period))?;

    env.storage().instance().set(&LEDGER, &ledger);
    store_account(env, staker, &account);
    common::bump_instance(env);
    Ok(result)
}

fn projected_ledger(env: &Env) -> Result<LedgerState, ContractError> {
    let period = load_period(env)?;
    Ok(load_ledger(env)?.projected(&period.schedule()[..], clock(env, &period))?)
}

fn earned_by(account: &Account, ledger: &LedgerState) -> Result<i128, ContractError> {
    account
        .pending(ledger)?
        .checked_add(account.unsettled)
        .ok_or(ContractError::Overflow)
}

fn load_config(env: &Env) -> Result<PoolConfig, ContractError> {
    env.storage()
        .instance()
        .get(&CONFIG)
        .ok_or(ContractError::NotInitialized)
}

fn load_period(env: &Env) -> Result<RewardPeriod, ContractError> {
    env.storage()
        .instance()
        .get(&PERIOD)
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
