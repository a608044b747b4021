use soroban_sdk::contracttype;

use crate::ledger::LedgerState;
use crate::{AccrualError, PRECISION};

/// Per-participant position.
///
/// `reward_debt` is `staked * acc_per_share` at the last touch, kept at full
/// precision; whatever the accumulator added since is the pending reward.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Account {
    pub staked: i128,
    /// Scaled by PRECISION.
    pub reward_debt: i128,
    /// Rewards settled into the account but not paid out yet.
    pub unsettled: i128,
}

impl Account {
    /// `staked * acc_per_share`, still scaled by PRECISION.
    pub fn scaled_share(&self, ledger: &LedgerState) -> Result<i128, AccrualError> {
        self.staked
            .checked_mul(ledger.acc_per_share)
            .ok_or(AccrualError::Overflow)
    }

    /// Reward earned since the last checkpoint.
    ///
    /// Only the difference is floored, so rounding never credits an account
    /// more than its share. The debt was taken against an accumulator no
    /// larger than the current one; a negative difference means corrupted
    /// state and is reported as `Overflow`.
    pub fn pending(&self, ledger: &LedgerState) -> Result<i128, AccrualError> {
        self.scaled_share(ledger)?
            .checked_sub(self.reward_debt)
            .filter(|delta| *delta >= 0)
            .map(|delta| delta / PRECISION)
            .ok_or(AccrualError::Overflow)
    }

    /// Re-anchor the debt to the current accumulator and stake.
    pub fn checkpoint(&mut self, ledger: &LedgerState) -> Result<(), AccrualError> {
        self.reward_debt = self.scaled_share(ledger)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.staked == 0 && self.unsettled == 0
    }
}
