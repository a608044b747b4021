use soroban_sdk::{contracttype, Vec};

/// One reward phase: both tiers emit at a fixed rate per unit of time for
/// `length` units.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Phase {
    /// Emission per unit shared by everyone with stake in the pool.
    pub rate_for_participants: i128,
    /// Emission per unit owed to the "others" tier (team, treasury, ...).
    pub rate_for_others: i128,
    pub length: u64,
}

/// Time spent inside the active phase between `from` and `to`.
///
/// The interval is clamped to `boundary`; the boundary instant itself belongs
/// to the next phase, so nothing at or after it is credited here.
pub fn rate_weighted_elapsed(from: u64, to: u64, boundary: u64) -> u64 {
    if from >= boundary {
        return 0;
    }
    if to > boundary {
        return boundary - from;
    }
    to.saturating_sub(from)
}

/// Ordered, immutable sequence of phases indexed `0..phase_count()`.
pub trait PhaseSchedule {
    fn phase_count(&self) -> u32;

    fn phase(&self, index: u32) -> Option<Phase>;

    /// Total emission of both tiers over the whole schedule, `None` on overflow.
    fn integral(&self) -> Option<i128> {
        let mut total: i128 = 0;
        for index in 0..self.phase_count() {
            let phase = self.phase(index)?;
            let rate = phase
                .rate_for_participants
                .checked_add(phase.rate_for_others)?;
            total = total.checked_add(rate.checked_mul(i128::from(phase.length))?)?;
        }
        Some(total)
    }

    /// Sum of all phase lengths, `None` on overflow.
    fn total_length(&self) -> Option<u64> {
        let mut total: u64 = 0;
        for index in 0..self.phase_count() {
            total = total.checked_add(self.phase(index)?.length)?;
        }
        Some(total)
    }

    /// Phase in force at `instant` for a schedule that began at `start`.
    ///
    /// The last phase extends indefinitely.
    fn locate(&self, start: u64, instant: u64) -> Option<(u32, Phase)> {
        let count = self.phase_count();
        if instant < start || count == 0 {
            return None;
        }
        let mut end = start;
        for index in 0..count {
            let phase = self.phase(index)?;
            end = end.saturating_add(phase.length);
            if instant < end || index + 1 == count {
                return Some((index, phase));
            }
        }
        None
    }
}

impl PhaseSchedule for [Phase] {
    fn phase_count(&self) -> u32 {
        self.len() as u32
    }

    fn phase(&self, index: u32) -> Option<Phase> {
        self.get(index as usize).copied()
    }
}

impl PhaseSchedule for Vec<Phase> {
    fn phase_count(&self) -> u32 {
        self.len()
    }

    fn phase(&self, index: u32) -> Option<Phase> {
        self.get(index)
    }
}
