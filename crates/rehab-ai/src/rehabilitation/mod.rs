//! Rehabilitation recommendation and resource-assignment workflow.
//!
//! The pipeline runs profile acquisition, program prediction (with a pure
//! rule-based fallback when the external predictor is unreachable), catalog
//! resolution, weighted station/officer assignment with guarded capacity
//! reservation, and progress tracking through to automatic completion.

pub mod assignment;
pub mod domain;
pub mod events;
pub mod memory;
pub mod predictor;
pub mod progress;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use assignment::AssignmentEngine;
pub use domain::{
    CounselingNote, FeatureMap, FeatureValue, InmateId, MedicalReport, Officer, OfficerId,
    Program, ProgramCategory, ProgramId, ProgressLogEntry, ProgressLogId, ProgressStatus,
    Recommendation, RecommendationId, RecommendationRequest, RecommendationStatus, RehabProfile,
    Station, StationId, UnknownProgramCategory, GENERAL_SUITABILITY_GROUP, GENERAL_ZONE,
};
pub use events::{EventError, EventPublisher, RehabEvent, TracingEventPublisher};
pub use memory::InMemoryRehabStore;
pub use predictor::{
    fallback_prediction, HttpPredictor, Prediction, PredictionOutcome, PredictionRequest,
    PredictorError, ProgramForecast, ProgramPredictor, ANALYSIS_UNAVAILABLE,
    FALLBACK_EXPLANATION,
};
pub use progress::{ProgressRequest, ProgressTracker};
pub use repository::{
    CaseFileStore, ProfileStore, ProgramCatalog, RecommendationStore, RehabStore,
    RepositoryError, ResourcePool,
};
pub use router::{rehabilitation_router, RecommendationView};
pub use service::{RehabilitationError, RehabilitationService};
