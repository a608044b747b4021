#![no_main]

use accrual::{
    Account, AccrualEngine, AccrualError, Disposition, FundingSource, LedgerState, Phase,
};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

const ACCOUNTS: usize = 4;

#[derive(Arbitrary, Debug)]
struct FuzzPhase {
    rate_for_participants: u16,
    rate_for_others: u16,
    length: u8,
}

#[derive(Arbitrary, Debug)]
enum FuzzAction {
    Join { who: u8, amount: u32 },
    Decrease { who: u8, amount: u32 },
    Exit { who: u8 },
    Claim { who: u8 },
    Compound { who: u8 },
    Discard { who: u8 },
    Poke,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    compound: bool,
    phases: Vec<FuzzPhase>,
    steps: Vec<(u8, FuzzAction)>,
}

#[derive(Default)]
struct Vault {
    inflow: i128,
    paid_out: i128,
}

impl FundingSource for Vault {
    type Party = usize;

    fn pull(&mut self, _from: &usize, amount: i128) -> bool {
        self.inflow += amount;
        true
    }

    fn push(&mut self, to: &usize, amount: i128) -> bool {
        if amount > self.balance_of(to) {
            return false;
        }
        self.paid_out += amount;
        true
    }

    fn balance_of(&self, _holder: &usize) -> i128 {
        self.inflow - self.paid_out
    }

    fn realize(&mut self, participants: i128, _others: i128) -> bool {
        self.inflow += participants;
        true
    }
}

fuzz_target!(|input: FuzzInput| {
    let schedule: Vec<Phase> = input
        .phases
        .iter()
        .take(8)
        .map(|p| Phase {
            rate_for_participants: i128::from(p.rate_for_participants),
            rate_for_others: i128::from(p.rate_for_others),
            length: u64::from(p.length).max(1),
        })
        .collect();
    if schedule.is_empty() {
        return;
    }

    let disposition = if input.compound {
        Disposition::Compound
    } else {
        Disposition::Defer
    };
    let mut engine = AccrualEngine::new(&schedule[..], Vault::default(), (), disposition);
    let Ok(mut ledger) = LedgerState::new(&schedule[..], 0) else {
        return;
    };
    let mut accounts = [Account::default(); ACCOUNTS];
    let mut now = 0u64;

    for (dt, action) in input.steps.iter().take(256) {
        let before = ledger;
        now += u64::from(*dt);

        let result = match *action {
            FuzzAction::Join { who, amount } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .join(&mut ledger, &mut accounts[who], &who, i128::from(amount), now)
                    .map(|_| ())
            }
            FuzzAction::Decrease { who, amount } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .decrease(&mut ledger, &mut accounts[who], &who, i128::from(amount), now)
                    .map(|_| ())
            }
            FuzzAction::Exit { who } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .exit_all(&mut ledger, &mut accounts[who], &who, now)
                    .map(|_| ())
            }
            FuzzAction::Claim { who } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .claim(&mut ledger, &mut accounts[who], &who, now)
                    .map(|_| ())
            }
            FuzzAction::Compound { who } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .compound(&mut ledger, &mut accounts[who], &who, now)
                    .map(|_| ())
            }
            FuzzAction::Discard { who } => {
                let who = usize::from(who) % ACCOUNTS;
                engine
                    .discard(&mut ledger, &mut accounts[who], &who)
                    .map(|_| ())
            }
            FuzzAction::Poke => engine.poke(&mut ledger, now).map(|_| ()),
        };

        assert!(ledger.acc_per_share >= before.acc_per_share);
        assert!(ledger.last_settled >= before.last_settled);
        assert!(ledger.current_phase >= before.current_phase);
        assert!((ledger.current_phase as usize) < schedule.len());

        match result {
            Ok(()) => {}
            Err(
                AccrualError::InvalidAmount
                | AccrualError::InsufficientBalance
                | AccrualError::NothingStaked
                | AccrualError::NothingToClaim,
            ) => assert_eq!(ledger, before),
            Err(other) => panic!("unexpected {other:?}"),
        }

        if before.total_stake == 0 {
            assert_eq!(ledger.acc_per_share, before.acc_per_share);
        }

        let staked: i128 = accounts.iter().map(|a| a.staked).sum();
        assert_eq!(staked, ledger.total_stake);

        let mut owed = 0i128;
        for account in &accounts {
            assert!(account.staked >= 0);
            assert!(account.reward_debt <= account.staked * ledger.acc_per_share);
            let pending = account.pending(&ledger).expect("pending");
            owed += account.staked + account.unsettled + pending;
        }
        let vault = engine.funding();
        assert!(owed + vault.paid_out <= vault.inflow);
    }

    for (who, account) in accounts.iter_mut().enumerate() {
        if account.staked > 0 {
            engine
                .exit_all(&mut ledger, account, &who, now)
                .expect("exit refused");
        } else if account.unsettled > 0 {
            engine
                .claim(&mut ledger, account, &who, now)
                .expect("claim refused");
        }
        assert!(account.is_empty());
    }
    assert_eq!(ledger.total_stake, 0);
});
