//! Settle → mutate → checkpoint orchestration.
//!
//! Every operation runs the same fixed sequence on private copies of the
//! ledger and the account:
//!
//! ```text
//! settle ledger to `now` -> settle account (pending) -> apply mutation
//!     -> move funds -> checkpoint reward debt -> commit both copies
//! ```
//!
//! Nothing is written back unless every funding call succeeded, so a failed
//! action leaves the caller's state exactly as it was. Exclusive access is
//! expressed through `&mut`: an action holds the ledger and the account for
//! the whole sequence.

use crate::account::Account;
use crate::ledger::{Accrual, LedgerState};
use crate::schedule::PhaseSchedule;
use crate::AccrualError;

/// Moves value in and out of the pool on behalf of the engine.
///
/// Every method reports success; `false` aborts the action in flight.
pub trait FundingSource {
    type Party;

    /// Take `amount` of the staked asset from `from` into the pool.
    fn pull(&mut self, from: &Self::Party, amount: i128) -> bool;

    /// Return `amount` of the staked asset from the pool to `to`.
    fn push(&mut self, to: &Self::Party, amount: i128) -> bool;

    fn balance_of(&self, holder: &Self::Party) -> i128;

    /// Pay out rewards. Pools whose reward asset differs from the staked
    /// asset override this.
    fn push_reward(&mut self, to: &Self::Party, amount: i128) -> bool {
        self.push(to, amount)
    }

    /// Back freshly accrued emission (mint or transfer in). Pre-funded pools
    /// keep the default.
    fn realize(&mut self, participants: i128, others: i128) -> bool {
        let _ = (participants, others);
        true
    }
}

/// Receives phase transitions while the ledger walks the schedule.
pub trait PhaseObserver {
    fn phase_advanced(&mut self, _phase_index: u32, _phase_end: u64) {}
}

impl PhaseObserver for () {}

/// Fire-and-forget notifications about committed actions.
pub trait EventSink<P>: PhaseObserver {
    fn staked(&mut self, _who: &P, _amount: i128, _new_stake: i128) {}

    fn withdrawn(&mut self, _who: &P, _amount: i128) {}

    fn reward_paid(&mut self, _who: &P, _amount: i128) {}

    fn compounded(&mut self, _who: &P, _amount: i128, _new_stake: i128) {}
}

impl<P> EventSink<P> for () {}

/// What happens to pending reward when an account is touched.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// Pending reward becomes stake (reward and stake are the same asset).
    Compound,
    /// Pending reward is banked in `Account::unsettled` until claimed.
    Defer,
}

/// Amounts paid out by a full exit.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Exit {
    pub principal: i128,
    pub reward: i128,
}

pub struct AccrualEngine<'a, S: ?Sized, F, E> {
    schedule: &'a S,
    funding: F,
    events: E,
    disposition: Disposition,
}

impl<'a, S, F, E> AccrualEngine<'a, S, F, E>
where
    S: PhaseSchedule + ?Sized,
    F: FundingSource,
    E: EventSink<F::Party>,
{
    pub fn new(schedule: &'a S, funding: F, events: E, disposition: Disposition) -> Self {
        Self {
            schedule,
            funding,
            events,
            disposition,
        }
    }

    pub fn funding(&self) -> &F {
        &self.funding
    }

    pub fn funding_mut(&mut self) -> &mut F {
        &mut self.funding
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    pub fn into_parts(self) -> (F, E) {
        (self.funding, self.events)
    }

    /// Settle the ledger only. Anyone may call it to keep the schedule moving
    /// while no participant is active.
    pub fn poke(&mut self, ledger: &mut LedgerState, now: u64) -> Result<Accrual, AccrualError> {
        ledger.settle(self.schedule, now, &mut self.funding, &mut self.events)
    }

    /// Add `amount` to the caller's stake. Returns the pending reward that was
    /// compounded (or banked, under `Defer`).
    pub fn join(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
        amount: i128,
        now: u64,
    ) -> Result<i128, AccrualError> {
        if amount <= 0 {
            return Err(AccrualError::InvalidAmount);
        }
        let (mut next_ledger, mut next_account, pending) = self.open(ledger, account, now)?;

        let credited = match self.disposition {
            Disposition::Compound => amount.checked_add(pending).ok_or(AccrualError::Overflow)?,
            Disposition::Defer => {
                next_account.unsettled = add(next_account.unsettled, pending)?;
                amount
            }
        };
        next_account.staked = add(next_account.staked, credited)?;
        next_ledger.total_stake = add(next_ledger.total_stake, credited)?;

        if !self.funding.pull(who, amount) {
            return Err(AccrualError::FundingRealizationFailed);
        }
        self.commit(ledger, account, next_ledger, next_account)?;

        self.note_compounded(who, pending, account.staked);
        self.events.staked(who, amount, account.staked);
        Ok(pending)
    }

    /// Turn pending reward into stake without moving funds.
    ///
    /// Zero pending is a successful no-op so auto-compounding wrappers can
    /// call it blindly.
    pub fn compound(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
        now: u64,
    ) -> Result<i128, AccrualError> {
        let (mut next_ledger, mut next_account, pending) = self.open(ledger, account, now)?;

        if pending > 0 {
            next_account.staked = add(next_account.staked, pending)?;
            next_ledger.total_stake = add(next_ledger.total_stake, pending)?;
        }
        self.commit(ledger, account, next_ledger, next_account)?;

        if pending > 0 {
            self.events.compounded(who, pending, account.staked);
        }
        Ok(pending)
    }

    /// Withdraw `amount` of stake. Returns the pending reward settled on the way.
    pub fn decrease(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
        amount: i128,
        now: u64,
    ) -> Result<i128, AccrualError> {
        if amount <= 0 {
            return Err(AccrualError::InvalidAmount);
        }
        if amount > account.staked {
            return Err(AccrualError::InsufficientBalance);
        }
        let (mut next_ledger, mut next_account, pending) = self.open(ledger, account, now)?;

        let net = match self.disposition {
            Disposition::Compound => pending.checked_sub(amount).ok_or(AccrualError::Overflow)?,
            Disposition::Defer => {
                next_account.unsettled = add(next_account.unsettled, pending)?;
                amount.checked_neg().ok_or(AccrualError::Overflow)?
            }
        };
        next_account.staked = add(next_account.staked, net)?;
        next_ledger.total_stake = add(next_ledger.total_stake, net)?;

        if !self.funding.push(who, amount) {
            return Err(AccrualError::FundingRealizationFailed);
        }
        self.commit(ledger, account, next_ledger, next_account)?;

        self.note_compounded(who, pending, account.staked);
        self.events.withdrawn(who, amount);
        Ok(pending)
    }

    /// Close the position: return the whole stake and every owed reward and
    /// leave the account zeroed.
    pub fn exit_all(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
        now: u64,
    ) -> Result<Exit, AccrualError> {
        if account.staked <= 0 {
            return Err(AccrualError::NothingStaked);
        }
        let (mut next_ledger, next_account, pending) = self.open(ledger, account, now)?;

        let exit = Exit {
            principal: next_account.staked,
            reward: add(pending, next_account.unsettled)?,
        };
        next_ledger.total_stake = next_ledger
            .total_stake
            .checked_sub(exit.principal)
            .ok_or(AccrualError::Overflow)?;

        let paid = match self.disposition {
            Disposition::Compound => self.funding.push(who, add(exit.principal, exit.reward)?),
            Disposition::Defer => {
                self.funding.push(who, exit.principal)
                    && (exit.reward == 0 || self.funding.push_reward(who, exit.reward))
            }
        };
        if !paid {
            return Err(AccrualError::FundingRealizationFailed);
        }
        self.commit(ledger, account, next_ledger, Account::default())?;

        self.events.withdrawn(who, exit.principal);
        if exit.reward > 0 {
            self.events.reward_paid(who, exit.reward);
        }
        Ok(exit)
    }

    /// Pay out everything owed without touching the stake.
    pub fn claim(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
        now: u64,
    ) -> Result<i128, AccrualError> {
        let (next_ledger, mut next_account, pending) = self.open(ledger, account, now)?;

        let reward = add(pending, next_account.unsettled)?;
        if reward == 0 {
            return Err(AccrualError::NothingToClaim);
        }
        next_account.unsettled = 0;

        if !self.funding.push_reward(who, reward) {
            return Err(AccrualError::FundingRealizationFailed);
        }
        self.commit(ledger, account, next_ledger, next_account)?;

        self.events.reward_paid(who, reward);
        Ok(reward)
    }

    /// Emergency exit: return the stake without settling and forfeit every
    /// owed reward. The skipped interval is shared by the remaining stake at
    /// the next settlement.
    pub fn discard(
        &mut self,
        ledger: &mut LedgerState,
        account: &mut Account,
        who: &F::Party,
    ) -> Result<i128, AccrualError> {
        if account.staked <= 0 {
            return Err(AccrualError::NothingStaked);
        }
        let principal = account.staked;
        let mut next_ledger = *ledger;
        next_ledger.total_stake = next_ledger
            .total_stake
            .checked_sub(principal)
            .ok_or(AccrualError::Overflow)?;

        if !self.funding.push(who, principal) {
            return Err(AccrualError::FundingRealizationFailed);
        }
        *ledger = next_ledger;
        *account = Account::default();

        self.events.withdrawn(who, principal);
        Ok(principal)
    }

    fn open(
        &mut self,
        ledger: &LedgerState,
        account: &Account,
        now: u64,
    ) -> Result<(LedgerState, Account, i128), AccrualError> {
        let mut next_ledger = *ledger;
        next_ledger.settle(self.schedule, now, &mut self.funding, &mut self.events)?;
        let pending = account.pending(&next_ledger)?;
        Ok((next_ledger, *account, pending))
    }

    fn commit(
        &self,
        ledger: &mut LedgerState,
        account: &mut Account,
        next_ledger: LedgerState,
        mut next_account: Account,
    ) -> Result<(), AccrualError> {
        next_account.checkpoint(&next_ledger)?;
        *ledger = next_ledger;
        *account = next_account;
        Ok(())
    }

    fn note_compounded(&mut self, who: &F::Party, pending: i128, new_stake: i128) {
        if self.disposition == Disposition::Compound && pending > 0 {
            self.events.compounded(who, pending, new_stake);
        }
    }
}

fn add(a: i128, b: i128) -> Result<i128, AccrualError> {
    a.checked_add(b).ok_or(AccrualError::Overflow)
}
