#![cfg(test)]

use soroban_sdk::{
    symbol_short,
    testutils::{Address as _, Events, Ledger, MockAuth, MockAuthInvoke},
    token, vec, Address, Env, IntoVal, TryIntoVal, Val, Vec,
};

use crate::*;

const START: u64 = 10;
const BUDGET: i128 = 1_600;

struct Setup {
    env: Env,
    client: DistributorContractClient<'static>,
    token: Address,
    admin: Address,
    others: Address,
    alice: Address,
    bob: Address,
}

fn phases(env: &Env) -> Vec<Phase> {
    vec![
        env,
        Phase {
            rate_for_participants: 10,
            rate_for_others: 1,
            length: 100,
        },
        Phase {
            rate_for_participants: 5,
            rate_for_others: 0,
            length: 100,
        },
    ]
}

fn set_block(env: &Env, block: u64) {
    env.ledger().set_sequence_number(block as u32);
}

fn setup() -> Setup {
    setup_with(true)
}

/// `mint_rights` hands the SAC admin role to the distributor.
fn setup_with(mint_rights: bool) -> Setup {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(DistributorContract, ());
    let client = DistributorContractClient::new(&env, &contract_id);

    let issuer = Address::generate(&env);
    let token = env.register_stellar_asset_contract_v2(issuer).address();
    let admin = Address::generate(&env);
    let others = Address::generate(&env);
    let alice = Address::generate(&env);
    let bob = Address::generate(&env);

    let sac = token::StellarAssetClient::new(&env, &token);
    sac.mint(&alice, &1_000);
    sac.mint(&bob, &1_000);
    // emission is minted by the distributor
    if mint_rights {
        sac.set_admin(&contract_id);
    }

    set_block(&env, START);
    client.initialize(&admin, &token, &others, &START, &phases(&env), &BUDGET);

    Setup {
        env,
        client,
        token,
        admin,
        others,
        alice,
        bob,
    }
}

fn balance(s: &Setup, who: &Address) -> i128 {
    token::TokenClient::new(&s.env, &s.token).balance(who)
}

/// Payload of the most recent event published under `topics`.
fn last_event(env: &Env, topics: Vec<Val>) -> Option<Val> {
    env.events()
        .all()
        .iter()
        .filter(|event| event.1 == topics)
        .last()
        .map(|event| event.2)
}

#[test]
fn test_initialize() {
    let s = setup();

    assert!(s.client.is_initialized());
    assert_eq!(s.client.get_admin(), s.admin);
    assert_eq!(s.client.schedule_end(), 210);
    assert_eq!(s.client.get_budget(), BUDGET);
    assert_eq!(s.client.get_phases().len(), 2);
    assert_eq!(s.client.get_others_recipient(), s.others);

    let result = s
        .client
        .try_initialize(&s.admin, &s.token, &s.others, &START, &phases(&s.env), &BUDGET);
    assert_eq!(result, Err(Ok(ContractError::AlreadyInitialized)));
}

#[test]
fn test_initialize_rejects_budget_mismatch() {
    let env = Env::default();
    let client = DistributorContractClient::new(&env, &env.register(DistributorContract, ()));
    let admin = Address::generate(&env);
    let token = Address::generate(&env);

    let result = client.try_initialize(&admin, &token, &admin, &START, &phases(&env), &(BUDGET - 1));
    assert_eq!(result, Err(Ok(ContractError::ScheduleInvariantViolation)));
}

#[test]
fn test_initialize_rejects_bad_phases() {
    let env = Env::default();
    let client = DistributorContractClient::new(&env, &env.register(DistributorContract, ()));
    let admin = Address::generate(&env);
    let token = Address::generate(&env);

    let empty: Vec<Phase> = Vec::new(&env);
    assert_eq!(
        client.try_initialize(&admin, &token, &admin, &START, &empty, &0),
        Err(Ok(ContractError::ScheduleInvariantViolation))
    );

    let zero_length = vec![
        &env,
        Phase {
            rate_for_participants: 10,
            rate_for_others: 0,
            length: 0,
        },
    ];
    assert_eq!(
        client.try_initialize(&admin, &token, &admin, &START, &zero_length, &0),
        Err(Ok(ContractError::ScheduleInvariantViolation))
    );

    let negative_rate = vec![
        &env,
        Phase {
            rate_for_participants: -1,
            rate_for_others: 1,
            length: 10,
        },
    ];
    assert_eq!(
        client.try_initialize(&admin, &token, &admin, &START, &negative_rate, &0),
        Err(Ok(ContractError::ScheduleInvariantViolation))
    );
}

#[test]
fn test_reward_spans_two_phases() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, 160);
    // 100 blocks at 10, then 50 blocks at 5
    assert_eq!(s.client.pending_reward(&s.alice), 1_250);
}

#[test]
fn test_exit_pays_stake_and_reward() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, 160);
    assert_eq!(s.client.exit(&s.alice), 1_350);
    assert_eq!(balance(&s, &s.alice), 2_250);
    assert_eq!(s.client.get_account(&s.alice), Account::default());
    assert_eq!(s.client.get_ledger().total_stake, 0);
}

#[test]
fn test_withdraw_keeps_compounded_reward_staked() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 10);
    assert_eq!(s.client.withdraw(&s.alice, &50), 100);

    let account = s.client.get_account(&s.alice);
    assert_eq!(account.staked, 150);
    assert_eq!(balance(&s, &s.alice), 950);
    assert_eq!(s.client.pending_reward(&s.alice), 0);
}

#[test]
fn test_deposit_compounds_pending() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 5);
    assert_eq!(s.client.deposit(&s.alice, &100), 50);
    assert_eq!(s.client.get_account(&s.alice).staked, 250);
    assert_eq!(s.client.get_ledger().total_stake, 250);
}

#[test]
fn test_compound_and_claim() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    assert_eq!(s.client.compound(&s.alice), 0);
    assert_eq!(
        s.client.try_claim(&s.alice),
        Err(Ok(ContractError::NothingToClaim))
    );

    set_block(&s.env, START + 10);
    assert_eq!(s.client.compound(&s.alice), 100);
    assert_eq!(s.client.get_account(&s.alice).staked, 200);

    set_block(&s.env, START + 20);
    assert_eq!(s.client.claim(&s.alice), 100);
    assert_eq!(balance(&s, &s.alice), 1_000);
    assert_eq!(s.client.get_account(&s.alice).staked, 200);
}

#[test]
fn test_rewards_split_by_stake() {
    let s = setup();
    s.client.deposit(&s.alice, &300);
    s.client.deposit(&s.bob, &100);

    set_block(&s.env, START + 40);
    assert_eq!(s.client.pending_reward(&s.alice), 300);
    assert_eq!(s.client.pending_reward(&s.bob), 100);
}

#[test]
fn test_emission_capped_at_budget() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, 1_000);
    let paid = s.client.exit(&s.alice);
    let others = s.client.claim_others(&s.others);

    assert_eq!(paid, 100 + 1_500);
    assert_eq!(others, 100);
    assert_eq!(s.client.get_ledger().total_realized + others, BUDGET);
    assert_eq!(s.client.current_rates(), None);
}

#[test]
fn test_nothing_accrues_while_pool_is_empty() {
    let s = setup();

    set_block(&s.env, START + 50);
    assert_eq!(s.client.poke(), 0);
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 60);
    assert_eq!(s.client.pending_reward(&s.alice), 100);
    assert_eq!(s.client.pending_others(), 10);
}

#[test]
fn test_poke_is_idempotent() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 30);
    assert_eq!(s.client.poke(), 300);
    let once = s.client.get_ledger();
    assert_eq!(s.client.poke(), 0);
    assert_eq!(s.client.get_ledger(), once);
}

#[test]
fn test_claim_others_only_by_recipient() {
    let s = setup();
    s.client.deposit(&s.alice, &100);
    set_block(&s.env, START + 10);

    assert_eq!(
        s.client.try_claim_others(&s.alice),
        Err(Ok(ContractError::Unauthorized))
    );
    assert_eq!(s.client.claim_others(&s.others), 10);
    assert_eq!(balance(&s, &s.others), 10);
    assert_eq!(
        s.client.try_claim_others(&s.others),
        Err(Ok(ContractError::NothingToClaim))
    );

    let treasury = Address::generate(&s.env);
    s.client.set_others_recipient(&s.admin, &treasury);
    assert_eq!(s.client.get_others_recipient(), treasury);
}

#[test]
fn test_invalid_amounts() {
    let s = setup();

    assert_eq!(
        s.client.try_deposit(&s.alice, &0),
        Err(Ok(ContractError::InvalidAmount))
    );
    assert_eq!(
        s.client.try_withdraw(&s.alice, &1),
        Err(Ok(ContractError::InsufficientBalance))
    );
    assert_eq!(
        s.client.try_exit(&s.alice),
        Err(Ok(ContractError::NothingStaked))
    );
}

#[test]
fn test_emergency_withdraw_forfeits_reward() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    assert_eq!(
        s.client.try_emergency_withdraw(&s.alice),
        Err(Ok(ContractError::NotInEmergency))
    );

    s.client.set_emergency(&s.admin, &true);
    assert!(s.client.is_emergency());

    set_block(&s.env, START + 50);
    assert_eq!(s.client.emergency_withdraw(&s.alice), 100);
    assert_eq!(balance(&s, &s.alice), 1_000);
    assert_eq!(s.client.get_ledger().total_stake, 0);
    assert_eq!(
        s.client.try_deposit(&s.alice, &100),
        Err(Ok(ContractError::Paused))
    );
}

#[test]
fn test_emergency_switch_requires_grant() {
    let s = setup();
    let operator = Address::generate(&s.env);

    assert_eq!(
        s.client.try_set_emergency(&operator, &true),
        Err(Ok(ContractError::Unauthorized))
    );

    s.client
        .grant_action(&s.admin, &Action::Emergency, &operator);
    s.client.set_emergency(&operator, &true);
    assert!(s.client.is_emergency());

    s.client
        .revoke_action(&s.admin, &Action::Emergency, &operator);
    assert_eq!(
        s.client.try_set_emergency(&operator, &false),
        Err(Ok(ContractError::Unauthorized))
    );
}

#[test]
fn test_rate_lookup() {
    let s = setup();

    assert_eq!(s.client.rate_at(&(START - 1)), None);
    assert_eq!(
        s.client.rate_at(&START),
        Some(Rates {
            phase_index: 0,
            rate_for_participants: 10,
            rate_for_others: 1,
        })
    );
    assert_eq!(
        s.client.rate_at(&(START + 100)),
        Some(Rates {
            phase_index: 1,
            rate_for_participants: 5,
            rate_for_others: 0,
        })
    );
    assert_eq!(s.client.rate_at(&210), None);
    assert_eq!(s.client.current_rates().map(|r| r.phase_index), Some(0));
}

#[test]
fn test_phase_pointer_advances() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 150);
    s.client.poke();

    let ledger = s.client.get_ledger();
    assert_eq!(ledger.current_phase, 1);
    assert_eq!(ledger.phase_end, START + 200);
    assert_eq!(ledger.last_settled, START + 150);
}

#[test]
fn test_admin_transfer() {
    let s = setup();
    let next = Address::generate(&s.env);

    s.client.propose_admin(&s.admin, &next);
    assert_eq!(s.client.get_pending_admin(), Some(next.clone()));
    assert_eq!(
        s.client.try_accept_admin(&s.alice),
        Err(Ok(ContractError::Unauthorized))
    );

    s.client.accept_admin(&next);
    assert_eq!(s.client.get_admin(), next);
    assert_eq!(
        s.client.try_set_others_recipient(&s.admin, &s.alice),
        Err(Ok(ContractError::Unauthorized))
    );
}

#[test]
fn test_initialize_event() {
    let s = setup();

    let payload = last_event(&s.env, (symbol_short!("INIT"),).into_val(&s.env))
        .expect("init event");
    let payload: events::InitializedEvent = payload.try_into_val(&s.env).unwrap();
    assert_eq!(payload.admin, s.admin);
    assert_eq!(payload.token, s.token);
    assert_eq!(payload.start_block, START);
    assert_eq!(payload.schedule_end, 210);
    assert_eq!(payload.budget, BUDGET);
}

#[test]
fn test_stake_events_carry_new_stake() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    let staked = last_event(
        &s.env,
        (symbol_short!("STAKED"), s.alice.clone()).into_val(&s.env),
    )
    .expect("staked event");
    let staked: events::StakeChangedEvent = staked.try_into_val(&s.env).unwrap();
    assert_eq!(staked.amount, 100);
    assert_eq!(staked.new_stake, 100);

    set_block(&s.env, START + 10);
    s.client.compound(&s.alice);

    let compounded = last_event(
        &s.env,
        (symbol_short!("COMPOUND"), s.alice.clone()).into_val(&s.env),
    )
    .expect("compound event");
    let compounded: events::StakeChangedEvent = compounded.try_into_val(&s.env).unwrap();
    assert_eq!(compounded.amount, 100);
    assert_eq!(compounded.new_stake, 200);
}

#[test]
fn test_phase_advance_event() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 150);
    s.client.poke();

    let payload = last_event(&s.env, (symbol_short!("PHASE"),).into_val(&s.env))
        .expect("phase event");
    let payload: events::PhaseAdvancedEvent = payload.try_into_val(&s.env).unwrap();
    assert_eq!(payload.phase_index, 1);
    assert_eq!(payload.phase_end, START + 200);
}

#[test]
fn test_exit_events_split_principal_and_reward() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, 160);
    s.client.exit(&s.alice);

    let withdrawn = last_event(
        &s.env,
        (symbol_short!("WITHDRAWN"), s.alice.clone()).into_val(&s.env),
    )
    .expect("withdrawn event");
    let withdrawn: i128 = withdrawn.try_into_val(&s.env).unwrap();
    assert_eq!(withdrawn, 100);

    let reward = last_event(
        &s.env,
        (symbol_short!("REWARD"), s.alice.clone()).into_val(&s.env),
    )
    .expect("reward event");
    let reward: i128 = reward.try_into_val(&s.env).unwrap();
    assert_eq!(reward, 1_250);
}

#[test]
fn test_failed_pull_rolls_back_settlement() {
    let s = setup();
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 20);
    let ledger = s.client.get_ledger();
    let account = s.client.get_account(&s.alice);
    let pool = balance(&s, &s.client.address);

    // settlement mints before the pull is refused
    assert_eq!(
        s.client.try_deposit(&s.alice, &5_000),
        Err(Ok(ContractError::FundingRealizationFailed))
    );
    assert_eq!(s.client.get_ledger(), ledger);
    assert_eq!(s.client.get_account(&s.alice), account);
    assert_eq!(balance(&s, &s.client.address), pool);
    assert_eq!(balance(&s, &s.alice), 900);
    assert_eq!(s.client.pending_reward(&s.alice), 200);
}

#[test]
fn test_mint_refused_without_admin_rights() {
    let s = setup_with(false);
    s.client.deposit(&s.alice, &100);

    set_block(&s.env, START + 20);
    let ledger = s.client.get_ledger();
    let account = s.client.get_account(&s.alice);

    // only the staker signs; the issuer never authorizes the mint
    s.env.mock_auths(&[MockAuth {
        address: &s.alice,
        invoke: &MockAuthInvoke {
            contract: &s.client.address,
            fn_name: "deposit",
            args: (s.alice.clone(), 50_i128).into_val(&s.env),
            sub_invokes: &[],
        },
    }]);
    assert_eq!(
        s.client.try_deposit(&s.alice, &50),
        Err(Ok(ContractError::FundingRealizationFailed))
    );
    assert_eq!(s.client.get_ledger(), ledger);
    assert_eq!(s.client.get_account(&s.alice), account);

    s.env.mock_auths(&[]);
    assert_eq!(
        s.client.try_poke(),
        Err(Ok(ContractError::FundingRealizationFailed))
    );
    assert_eq!(s.client.get_ledger(), ledger);
    assert_eq!(balance(&s, &s.client.address), 100);
}
