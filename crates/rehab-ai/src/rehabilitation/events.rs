use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{InmateId, RecommendationId};

/// Topics emitted by the rehabilitation core.
pub mod topics {
    pub const RECOMMENDATION_CREATED: &str = "rehab.recommendation.created";
    pub const PROGRESS_UPDATED: &str = "rehab.progress.updated";
    pub const MEDICAL_REPORT_ADDED: &str = "rehab.medical.report.added";
    pub const COUNSELING_NOTE_ADDED: &str = "rehab.counseling.note.added";
}

/// Notification payload handed to the event transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RehabEvent {
    pub topic: String,
    pub inmate_id: InmateId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation_id: Option<RecommendationId>,
}

impl RehabEvent {
    pub fn recommendation_created(
        inmate_id: InmateId,
        recommendation_id: RecommendationId,
    ) -> Self {
        Self {
            topic: topics::RECOMMENDATION_CREATED.to_string(),
            inmate_id,
            recommendation_id: Some(recommendation_id),
        }
    }

    pub fn progress_updated(inmate_id: InmateId, recommendation_id: RecommendationId) -> Self {
        Self {
            topic: topics::PROGRESS_UPDATED.to_string(),
            inmate_id,
            recommendation_id: Some(recommendation_id),
        }
    }

    pub fn medical_report_added(inmate_id: InmateId) -> Self {
        Self {
            topic: topics::MEDICAL_REPORT_ADDED.to_string(),
            inmate_id,
            recommendation_id: None,
        }
    }

    pub fn counseling_note_added(inmate_id: InmateId) -> Self {
        Self {
            topic: topics::COUNSELING_NOTE_ADDED.to_string(),
            inmate_id,
            recommendation_id: None,
        }
    }
}

/// Event dispatch error. Delivery failure never fails the calling operation;
/// callers catch and log.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Trait describing the outbound notification hook (message broker, webhook
/// relay, or an in-memory sink in tests). Fire-and-forget, at-least-once.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: RehabEvent) -> Result<(), EventError>;
}

/// Default transport that records events on the service log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher for TracingEventPublisher {
    fn publish(&self, event: RehabEvent) -> Result<(), EventError> {
        info!(topic = %event.topic, inmate = %event.inmate_id, "event published");
        Ok(())
    }
}
