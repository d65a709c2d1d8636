//! Vote power arithmetic in hundredths of a percent (10000 = 100.00 %).
//!
//! Integers all the way down so repeated polls never drift.

use crate::constants::VOTE_RECHARGE_PER_DAY;

pub const FULL_POWER: u16 = 10_000;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regenerated {
    /// Current power, clamped to `0..=FULL_POWER`.
    pub power: u16,
    /// Power that would have been above 100 %. Diagnostic only.
    pub wasted: u32,
}

/// Power regained after `elapsed_secs` at the chain's linear recharge rate.
#[inline(always)]
pub fn recharge(elapsed_secs: i64) -> i64 {
    let per_day = FULL_POWER as i64 * VOTE_RECHARGE_PER_DAY / 100;
    elapsed_secs.max(0) * per_day / SECONDS_PER_DAY
}

/// Rolls the last reported power forward by the time since the last vote.
pub fn regenerate(reported: u16, elapsed_secs: i64) -> Regenerated {
    let total = reported as i64 + recharge(elapsed_secs);
    let wasted = (total - FULL_POWER as i64).max(0);

    Regenerated {
        power: total.clamp(0, FULL_POWER as i64) as u16,
        wasted: wasted as u32,
    }
}

/// Hundredths to a display percentage.
#[inline(always)]
pub fn as_percent(hundredths: i64) -> f64 {
    hundredths as f64 / 100.0
}

/// Display percentage (`"100.0 %"`, `"12.5"`) to hundredths.
pub fn parse_percent(raw: &str) -> Option<i64> {
    let number = raw.trim().trim_end_matches('%').trim();
    number.parse::<f64>().ok().map(|p| (p * 100.0).round() as i64)
}
