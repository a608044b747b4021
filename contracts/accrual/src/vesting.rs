use crate::AccrualError;

/// Cumulative amount vested at `now` under a cliff + linear schedule.
///
/// `total_received` is everything the vesting wallet ever held (current
/// balance plus what was already released). `fully_vested` forces the whole
/// amount, e.g. after a revocation.
pub fn vested_amount(
    total_received: i128,
    now: u64,
    cliff: u64,
    start: u64,
    duration: u64,
    fully_vested: bool,
) -> Result<i128, AccrualError> {
    if now < cliff {
        return Ok(0);
    }
    if fully_vested || now >= start.saturating_add(duration) {
        return Ok(total_received);
    }
    let elapsed = i128::from(now.saturating_sub(start));
    total_received
        .checked_mul(elapsed)
        .and_then(|v| v.checked_div(i128::from(duration)))
        .ok_or(AccrualError::Overflow)
}

/// Amount that can be released at `now`: vested minus already released,
/// floored at zero.
pub fn releasable(
    total_received: i128,
    already_released: i128,
    now: u64,
    cliff: u64,
    start: u64,
    duration: u64,
    fully_vested: bool,
) -> Result<i128, AccrualError> {
    let vested = vested_amount(total_received, now, cliff, start, duration, fully_vested)?;
    Ok(vested.saturating_sub(already_released).max(0))
}
