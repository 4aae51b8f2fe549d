//! crates/tutor_core/src/streak.rs
//!
//! Daily engagement streak transitions.

use chrono::NaiveDate;

use crate::domain::EngagementRecord;

/// Applies one day's activity to an owner's streak record.
///
/// Returns the updated record to persist, or `None` when the record was
/// already touched today (the per-day idempotent no-op). A missing record
/// starts a streak of 1; activity on the day after `last_active_date`
/// extends the streak; any longer gap resets it to 1. `longest_streak`
/// never decreases.
pub fn advance(
    record: Option<&EngagementRecord>,
    owner: &str,
    today: NaiveDate,
) -> Option<EngagementRecord> {
    let Some(record) = record else {
        return Some(EngagementRecord {
            owner: owner.to_string(),
            current_streak: 1,
            longest_streak: 1,
            last_active_date: today,
        });
    };

    if record.last_active_date == today {
        return None;
    }

    let current_streak = if Some(record.last_active_date) == today.pred_opt() {
        record.current_streak + 1
    } else {
        1
    };

    Some(EngagementRecord {
        owner: record.owner.clone(),
        current_streak,
        longest_streak: record.longest_streak.max(current_streak),
        last_active_date: today,
    })
}
