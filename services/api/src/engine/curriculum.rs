//! services/api/src/engine/curriculum.rs
//!
//! Curriculum creation and enrollment queries.

use crate::engine::pool::TaskPool;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};
use tutor_core::domain::{Cadence, Chapter, ChapterOutline, Curriculum};
use tutor_core::ports::{CurriculumStore, PortError, PortResult};
use tutor_core::schedule;

/// Everything the study-intention intake collects before a curriculum is
/// created.
#[derive(Debug, Clone)]
pub struct StudyIntention {
    pub owner: String,
    pub subject: String,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub goal_description: String,
    pub learning_goal: String,
    pub outlines: Vec<ChapterOutline>,
}

pub struct CurriculumService {
    store: Arc<dyn CurriculumStore>,
    /// Pool for curriculum-scale work (chapter batch persistence).
    curriculum_pool: TaskPool,
    /// Pool for study-intention intake jobs.
    intake_pool: TaskPool,
}

impl CurriculumService {
    pub fn new(
        store: Arc<dyn CurriculumStore>,
        curriculum_pool: TaskPool,
        intake_pool: TaskPool,
    ) -> Self {
        Self {
            store,
            curriculum_pool,
            intake_pool,
        }
    }

    /// Creates a curriculum and all of its chapters.
    ///
    /// The chapter outlines are validated before anything is persisted; a
    /// malformed list aborts with a validation error and no partial state.
    /// The chapter batch insert runs on the curriculum pool but is joined
    /// before returning, so the caller observes full success or a reported
    /// failure, never a curriculum with half its chapters.
    pub async fn create_curriculum(&self, intention: &StudyIntention) -> PortResult<i64> {
        validate_outlines(&intention.outlines)?;
        persist_curriculum(Arc::clone(&self.store), &self.curriculum_pool, intention).await
    }

    /// Accepts a study intention and creates the curriculum in the
    /// background. The returned acknowledgment is immediate; persistence
    /// failures surface only in the logs, and a duplicate intention (same
    /// owner, subject, and start date) is skipped rather than re-created.
    pub async fn intake(&self, intention: StudyIntention) -> PortResult<String> {
        validate_outlines(&intention.outlines)?;

        let store = Arc::clone(&self.store);
        let curriculum_pool = self.curriculum_pool.clone();
        let handle = self
            .intake_pool
            .submit(async move {
                let existing = store.fetch_curricula(&intention.owner).await?;
                if existing.iter().any(|c| {
                    c.subject.eq_ignore_ascii_case(&intention.subject)
                        && c.start_date == intention.start_date
                }) {
                    info!(
                        "Curriculum for {} / '{}' already exists. Skipping creation.",
                        intention.owner, intention.subject
                    );
                    return Ok(());
                }

                match persist_curriculum(store, &curriculum_pool, &intention).await {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        error!(
                            "Background curriculum creation failed for {}: {}",
                            intention.owner, e
                        );
                        Err(e)
                    }
                }
            })
            .await?;
        // Fire-and-forget: the handle is dropped, the job runs on.
        drop(handle);

        Ok("Your course is being generated in the background. \
            You will be notified once it is ready."
            .to_string())
    }

    /// All of the owner's curricula, newest first.
    pub async fn enrollments(&self, owner: &str) -> PortResult<Vec<Curriculum>> {
        self.store.fetch_curricula(owner).await
    }

    /// Incomplete chapters scheduled for `date`, with their subjects.
    pub async fn scheduled_on(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> PortResult<Vec<(Chapter, String)>> {
        self.store.chapters_scheduled_on(owner, date).await
    }
}

/// Inserts the curriculum row, computes the schedule, and fork-joins the
/// chapter batch insert on the curriculum pool.
async fn persist_curriculum(
    store: Arc<dyn CurriculumStore>,
    pool: &TaskPool,
    intention: &StudyIntention,
) -> PortResult<i64> {
    let curriculum_id = store
        .insert_curriculum(
            &intention.owner,
            &intention.subject,
            intention.cadence,
            intention.start_date,
            &intention.goal_description,
            &intention.learning_goal,
        )
        .await?;

    let dates = schedule::compute_schedule(
        intention.cadence,
        intention.start_date,
        intention.outlines.len(),
    );
    let rows: Vec<(String, String, NaiveDate)> = intention
        .outlines
        .iter()
        .zip(dates)
        .map(|(outline, date)| {
            let mut title = outline.title.trim().to_string();
            title.truncate(255);
            (title, outline.description.trim().to_string(), date)
        })
        .collect();

    let batch_store = Arc::clone(&store);
    let handle = pool
        .submit(async move { batch_store.batch_insert_chapters(curriculum_id, &rows).await })
        .await?;
    TaskPool::join(handle).await?;

    info!(
        "Created curriculum {} for {} with {} chapters.",
        curriculum_id,
        intention.owner,
        intention.outlines.len()
    );
    Ok(curriculum_id)
}

fn validate_outlines(outlines: &[ChapterOutline]) -> PortResult<()> {
    if outlines.is_empty() {
        return Err(PortError::Validation(
            "A curriculum needs at least one chapter.".to_string(),
        ));
    }
    for (i, outline) in outlines.iter().enumerate() {
        if outline.title.trim().is_empty() {
            return Err(PortError::Validation(format!(
                "Chapter {} has an empty title.",
                i + 1
            )));
        }
    }
    Ok(())
}
