//! services/api/src/engine/engagement.rs
//!
//! Daily engagement streak bookkeeping over the persistent store.

use chrono::NaiveDate;
use std::sync::Arc;
use tutor_core::domain::EngagementRecord;
use tutor_core::ports::{CurriculumStore, PortResult};
use tutor_core::streak;

pub struct EngagementService {
    store: Arc<dyn CurriculumStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn CurriculumStore>) -> Self {
        Self { store }
    }

    /// Applies today's activity to the owner's streak. Idempotent within a
    /// calendar day: at most one store mutation per owner per day.
    pub async fn record_activity(&self, owner: &str, today: NaiveDate) -> PortResult<()> {
        let current = self.store.fetch_engagement(owner).await?;
        if let Some(updated) = streak::advance(current.as_ref(), owner, today) {
            self.store.upsert_engagement(&updated).await?;
        }
        Ok(())
    }

    /// The owner's streak record, if any activity was ever recorded.
    pub async fn current(&self, owner: &str) -> PortResult<Option<EngagementRecord>> {
        self.store.fetch_engagement(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::MockStore;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn consecutive_days_build_a_streak_and_same_day_repeats_do_nothing() {
        let store = Arc::new(MockStore::new());
        let svc = EngagementService::new(store.clone());

        svc.record_activity("ada@example.com", date("2024-05-01"))
            .await
            .unwrap();
        svc.record_activity("ada@example.com", date("2024-05-01"))
            .await
            .unwrap();
        svc.record_activity("ada@example.com", date("2024-05-02"))
            .await
            .unwrap();

        let record = svc.current("ada@example.com").await.unwrap().unwrap();
        assert_eq!(record.current_streak, 2);
        assert_eq!(record.longest_streak, 2);
        // Two creates/updates: the same-day call never hit the store.
        assert_eq!(store.engagement_write_count(), 2);
    }

    #[tokio::test]
    async fn a_gap_resets_but_longest_survives() {
        let store = Arc::new(MockStore::new());
        let svc = EngagementService::new(store.clone());

        for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
            svc.record_activity("ada@example.com", date(day))
                .await
                .unwrap();
        }
        svc.record_activity("ada@example.com", date("2024-05-06"))
            .await
            .unwrap();

        let record = svc.current("ada@example.com").await.unwrap().unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(record.longest_streak, 3);
        assert_eq!(record.last_active_date, date("2024-05-06"));
    }
}
