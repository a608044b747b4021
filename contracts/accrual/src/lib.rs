#![no_std]

//! Reward accrual engine shared by the pool contracts.
//!
//! A global per-share accumulator advances lazily through a schedule of
//! reward phases. Accounts only ever settle the difference between the
//! accumulator at their last touch and the accumulator now, so every
//! interaction costs O(phase transitions since the last touch).

pub mod account;
pub mod conditions;
pub mod engine;
pub mod ledger;
pub mod schedule;
pub mod token;
pub mod vesting;

pub use account::Account;
pub use conditions::{ConditionLog, StakingCondition, VaultStaker};
pub use engine::{AccrualEngine, Disposition, EventSink, Exit, FundingSource, PhaseObserver};
pub use ledger::{Accrual, LedgerState};
pub use schedule::{rate_weighted_elapsed, Phase, PhaseSchedule};

/// Fixed-point scaling factor of the per-share accumulator.
///
/// 10^12 keeps sub-unit precision for token amounts up to 10^18 while the
/// products below stay far from `i128::MAX`.
pub const PRECISION: i128 = 1_000_000_000_000;

/// Failures of the accounting core. Every error aborts the action and leaves
/// the ledger and the touched account exactly as they were.
#[soroban_sdk::contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum AccrualError {
    InvalidAmount = 1,
    InsufficientBalance = 2,
    NothingToClaim = 3,
    NothingStaked = 4,
    ScheduleInvariantViolation = 5,
    FundingRealizationFailed = 6,
    Overflow = 7,
}
