use soroban_sdk::contracttype;

use crate::engine::{FundingSource, PhaseObserver};
use crate::schedule::{rate_weighted_elapsed, PhaseSchedule};
use crate::{AccrualError, PRECISION};

/// Pool-wide accrual state.
///
/// Only [`LedgerState::settle`] advances it; the accumulator, the settlement
/// clock and the phase pointer never move backwards.
#[contracttype]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct LedgerState {
    /// Reward earned by one unit of stake since inception, scaled by PRECISION.
    pub acc_per_share: i128,
    pub current_phase: u32,
    /// First instant that no longer belongs to `current_phase`.
    pub phase_end: u64,
    pub last_settled: u64,
    pub total_stake: i128,
    /// Participant rewards confirmed by the funding source so far.
    pub total_realized: i128,
    /// Emission owed to the "others" tier and not yet paid out.
    pub others_accrued: i128,
}

/// Newly accrued emission of one settlement, per tier.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Accrual {
    pub participants: i128,
    pub others: i128,
}

impl Accrual {
    pub fn is_empty(&self) -> bool {
        self.participants == 0 && self.others == 0
    }
}

impl LedgerState {
    /// Fresh ledger with phase 0 active from `start`.
    pub fn new<S: PhaseSchedule + ?Sized>(schedule: &S, start: u64) -> Result<Self, AccrualError> {
        let first = schedule
            .phase(0)
            .ok_or(AccrualError::ScheduleInvariantViolation)?;
        Ok(Self {
            phase_end: start.saturating_add(first.length),
            last_settled: start,
            ..Self::default()
        })
    }

    /// Point the ledger at phase 0 of a replacement schedule starting at
    /// `start`. Callers settle up to `start` first.
    pub fn restart<S: PhaseSchedule + ?Sized>(
        &mut self,
        schedule: &S,
        start: u64,
    ) -> Result<(), AccrualError> {
        let first = schedule
            .phase(0)
            .ok_or(AccrualError::ScheduleInvariantViolation)?;
        let start = start.max(self.last_settled);
        self.current_phase = 0;
        self.phase_end = start.saturating_add(first.length);
        self.last_settled = start;
        Ok(())
    }

    /// Advance the ledger to `now` and realize the accrued emission.
    ///
    /// The accumulator only moves once `funding` has confirmed the backing
    /// value. A refused realization leaves `self` untouched and returns
    /// `FundingRealizationFailed`; phase notifications already sent to
    /// `observer` are not retracted.
    pub fn settle<S, F, O>(
        &mut self,
        schedule: &S,
        now: u64,
        funding: &mut F,
        observer: &mut O,
    ) -> Result<Accrual, AccrualError>
    where
        S: PhaseSchedule + ?Sized,
        F: FundingSource + ?Sized,
        O: PhaseObserver + ?Sized,
    {
        let mut next = *self;
        let accrual = next.advance(schedule, now, observer)?;
        if !accrual.is_empty() && !funding.realize(accrual.participants, accrual.others) {
            return Err(AccrualError::FundingRealizationFailed);
        }
        *self = next;
        Ok(accrual)
    }

    /// The ledger as it would look after settling at `now`, without asking
    /// anyone to back the emission. Used by read-only queries.
    pub fn projected<S: PhaseSchedule + ?Sized>(
        &self,
        schedule: &S,
        now: u64,
    ) -> Result<Self, AccrualError> {
        let mut next = *self;
        next.advance(schedule, now, &mut ())?;
        Ok(next)
    }

    fn advance<S, O>(
        &mut self,
        schedule: &S,
        now: u64,
        observer: &mut O,
    ) -> Result<Accrual, AccrualError>
    where
        S: PhaseSchedule + ?Sized,
        O: PhaseObserver + ?Sized,
    {
        if now <= self.last_settled {
            return Ok(Accrual::default());
        }
        // Nobody staked: the emission of this interval is forfeited.
        if self.total_stake == 0 {
            self.last_settled = now;
            return Ok(Accrual::default());
        }

        let count = schedule.phase_count();
        let mut cursor = self.last_settled;
        let mut accrual = Accrual::default();
        loop {
            let phase = schedule
                .phase(self.current_phase)
                .ok_or(AccrualError::ScheduleInvariantViolation)?;
            let is_last = self.current_phase.saturating_add(1) >= count;
            let boundary = if is_last { u64::MAX } else { self.phase_end };
            let elapsed = i128::from(rate_weighted_elapsed(cursor, now, boundary));

            accrual.participants = elapsed
                .checked_mul(phase.rate_for_participants)
                .and_then(|v| v.checked_add(accrual.participants))
                .ok_or(AccrualError::Overflow)?;
            accrual.others = elapsed
                .checked_mul(phase.rate_for_others)
                .and_then(|v| v.checked_add(accrual.others))
                .ok_or(AccrualError::Overflow)?;

            if is_last || now < self.phase_end {
                break;
            }

            cursor = cursor.max(self.phase_end);
            self.current_phase += 1;
            let next = schedule
                .phase(self.current_phase)
                .ok_or(AccrualError::ScheduleInvariantViolation)?;
            self.phase_end = self.phase_end.saturating_add(next.length);
            observer.phase_advanced(self.current_phase, self.phase_end);
        }

        let delta = accrual
            .participants
            .checked_mul(PRECISION)
            .ok_or(AccrualError::Overflow)?
            / self.total_stake;
        self.acc_per_share = self
            .acc_per_share
            .checked_add(delta)
            .ok_or(AccrualError::Overflow)?;
        self.total_realized = self
            .total_realized
            .checked_add(accrual.participants)
            .ok_or(AccrualError::Overflow)?;
        self.others_accrued = self
            .others_accrued
            .checked_add(accrual.others)
            .ok_or(AccrualError::Overflow)?;
        self.last_settled = now;

        Ok(accrual)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;
    use crate::schedule::Phase;

    struct Mint {
        accept: bool,
        realized: i128,
    }

    impl FundingSource for Mint {
        type Party = u32;

        fn pull(&mut self, _from: &u32, _amount: i128) -> bool {
            true
        }

        fn push(&mut self, _to: &u32, _amount: i128) -> bool {
            true
        }

        fn balance_of(&self, _holder: &u32) -> i128 {
            0
        }

        fn realize(&mut self, participants: i128, others: i128) -> bool {
            if self.accept {
                self.realized += participants + others;
            }
            self.accept
        }
    }

    #[derive(Default)]
    struct Phases(Vec<(u32, u64)>);

    impl PhaseObserver for Phases {
        fn phase_advanced(&mut self, index: u32, phase_end: u64) {
            self.0.push((index, phase_end));
        }
    }

    fn halving() -> [Phase; 2] {
        [
            Phase {
                rate_for_participants: 10,
                rate_for_others: 2,
                length: 100,
            },
            Phase {
                rate_for_participants: 5,
                rate_for_others: 1,
                length: 100,
            },
        ]
    }

    fn staked_ledger(schedule: &[Phase], stake: i128) -> LedgerState {
        let mut ledger = LedgerState::new(schedule, 0).unwrap();
        ledger.total_stake = stake;
        ledger
    }

    #[test]
    fn settle_crosses_phase_boundary() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 100);
        let mut mint = Mint {
            accept: true,
            realized: 0,
        };
        let mut phases = Phases::default();

        let accrual = ledger
            .settle(&schedule[..], 150, &mut mint, &mut phases)
            .unwrap();

        assert_eq!(accrual.participants, 100 * 10 + 50 * 5);
        assert_eq!(accrual.others, 100 * 2 + 50);
        assert_eq!(ledger.acc_per_share, 1_250 * PRECISION / 100);
        assert_eq!(ledger.current_phase, 1);
        assert_eq!(ledger.phase_end, 200);
        assert_eq!(ledger.last_settled, 150);
        assert_eq!(mint.realized, 1_250 + 250);
        assert_eq!(phases.0, std::vec![(1, 200)]);
    }

    #[test]
    fn boundary_instant_belongs_to_next_phase() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 1);
        let mut mint = Mint {
            accept: true,
            realized: 0,
        };

        ledger.settle(&schedule[..], 100, &mut mint, &mut ()).unwrap();
        assert_eq!(ledger.current_phase, 1);
        assert_eq!(ledger.total_realized, 1_000);

        ledger.settle(&schedule[..], 101, &mut mint, &mut ()).unwrap();
        assert_eq!(ledger.total_realized, 1_005);
    }

    #[test]
    fn last_phase_applies_indefinitely() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 1);
        let mut mint = Mint {
            accept: true,
            realized: 0,
        };

        ledger.settle(&schedule[..], 500, &mut mint, &mut ()).unwrap();
        assert_eq!(ledger.current_phase, 1);
        assert_eq!(ledger.total_realized, 1_000 + 400 * 5);
    }

    #[test]
    fn empty_pool_forfeits_emission() {
        let schedule = halving();
        let mut ledger = LedgerState::new(&schedule[..], 0).unwrap();
        let mut mint = Mint {
            accept: true,
            realized: 0,
        };

        ledger.settle(&schedule[..], 120, &mut mint, &mut ()).unwrap();
        assert_eq!(ledger.acc_per_share, 0);
        assert_eq!(ledger.last_settled, 120);
        assert_eq!(ledger.current_phase, 0);
        assert_eq!(mint.realized, 0);

        // The pointer catches up on the next staked settlement without
        // crediting the forfeited interval.
        ledger.total_stake = 10;
        ledger.settle(&schedule[..], 130, &mut mint, &mut ()).unwrap();
        assert_eq!(ledger.current_phase, 1);
        assert_eq!(ledger.total_realized, 50);
    }

    #[test]
    fn refused_realization_leaves_ledger_untouched() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 100);
        let before = ledger;
        let mut mint = Mint {
            accept: false,
            realized: 0,
        };
        let mut phases = Phases::default();

        let result = ledger.settle(&schedule[..], 150, &mut mint, &mut phases);

        assert_eq!(result, Err(AccrualError::FundingRealizationFailed));
        assert_eq!(ledger, before);
        // the phase notification still went out
        assert_eq!(phases.0.len(), 1);
    }

    #[test]
    fn settle_in_the_past_is_noop() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 100);
        let mut mint = Mint {
            accept: true,
            realized: 0,
        };
        ledger.settle(&schedule[..], 50, &mut mint, &mut ()).unwrap();
        let settled = ledger;

        let accrual = ledger.settle(&schedule[..], 40, &mut mint, &mut ()).unwrap();
        assert!(accrual.is_empty());
        assert_eq!(ledger, settled);
    }

    #[test]
    fn projected_does_not_realize() {
        let schedule = halving();
        let ledger = staked_ledger(&schedule, 100);
        let projected = ledger.projected(&schedule[..], 50).unwrap();
        assert_eq!(projected.total_realized, 500);
        assert_eq!(ledger.total_realized, 0);
    }

    #[test]
    fn restart_keeps_clock_monotonic() {
        let schedule = halving();
        let mut ledger = staked_ledger(&schedule, 0);
        ledger.last_settled = 80;
        ledger.restart(&schedule[..], 60).unwrap();
        assert_eq!(ledger.last_settled, 80);
        assert_eq!(ledger.phase_end, 180);
    }
}
