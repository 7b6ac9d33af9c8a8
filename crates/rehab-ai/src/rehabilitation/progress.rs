use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    OfficerId, ProgressLogEntry, ProgressLogId, ProgressStatus, RecommendationId,
    RecommendationStatus,
};
use super::events::{EventPublisher, RehabEvent};
use super::repository::RecommendationStore;
use super::service::RehabilitationError;

static PROGRESS_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_progress_id() -> ProgressLogId {
    let id = PROGRESS_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ProgressLogId(format!("plog-{id:06}"))
}

/// Request payload for progress logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub recommendation_id: RecommendationId,
    pub status: ProgressStatus,
    #[serde(default)]
    pub progress_percentage: Option<u8>,
    #[serde(default)]
    pub notes: String,
    pub recorded_by: OfficerId,
}

/// Appends progress entries and owns the completion transition.
///
/// The log is append-only, and this tracker is the only writer allowed to
/// flip a recommendation to `Completed`: an entry with a progress percentage
/// of 100 or more completes the owning recommendation immediately; no other
/// percentage value changes its status. Entries against an
/// already-completed recommendation are accepted as informational.
pub struct ProgressTracker<S, E> {
    store: Arc<S>,
    events: Arc<E>,
}

impl<S, E> ProgressTracker<S, E>
where
    S: RecommendationStore,
    E: EventPublisher,
{
    pub fn new(store: Arc<S>, events: Arc<E>) -> Self {
        Self { store, events }
    }

    pub fn log_progress(
        &self,
        request: ProgressRequest,
    ) -> Result<ProgressLogEntry, RehabilitationError> {
        let recommendation = self
            .store
            .recommendation(&request.recommendation_id)?
            .ok_or_else(|| {
                RehabilitationError::RecommendationNotFound(request.recommendation_id.clone())
            })?;

        let entry = ProgressLogEntry {
            id: next_progress_id(),
            inmate_id: recommendation.inmate_id.clone(),
            recommendation_id: recommendation.id.clone(),
            logged_at: Utc::now(),
            status: request.status,
            progress_percentage: request.progress_percentage,
            notes: request.notes,
            recorded_by: request.recorded_by,
        };

        let entry = self.store.append_progress(entry)?;

        if entry.progress_percentage.is_some_and(|value| value >= 100) {
            self.store
                .set_recommendation_status(&recommendation.id, RecommendationStatus::Completed)?;
            info!(
                recommendation = %recommendation.id,
                inmate = %recommendation.inmate_id,
                "recommendation completed"
            );
        }

        if let Err(err) = self.events.publish(RehabEvent::progress_updated(
            recommendation.inmate_id.clone(),
            recommendation.id.clone(),
        )) {
            warn!(error = %err, "failed to publish progress event");
        }

        Ok(entry)
    }
}
