//! crates/tutor_core/src/schedule.rs
//!
//! Cadence-based chapter scheduling.

use chrono::{Days, NaiveDate};

use crate::domain::Cadence;

/// Computes the scheduled date for each of `count` chapters.
///
/// Date *i* is `start + floor(interval * i)` days, where the interval is
/// the cadence spacing. The fractional `TwiceAWeek` interval (3.5 days)
/// floors per step, giving the 0/3/7/10/14... day pattern. Dates are
/// monotonically non-decreasing for every listed cadence.
pub fn compute_schedule(cadence: Cadence, start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let interval = cadence.interval_days();
    (0..count)
        .map(|i| {
            let offset = (interval * i as f64).floor() as u64;
            // Offsets here are bounded by cadence * chapter count; an
            // out-of-range date would mean a nonsensical curriculum.
            start
                .checked_add_days(Days::new(offset))
                .unwrap_or(NaiveDate::MAX)
        })
        .collect()
}
