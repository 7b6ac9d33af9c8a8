use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::assignment::AssignmentEngine;
use super::domain::{
    CounselingNote, FeatureMap, InmateId, MedicalReport, OfficerId, Program, ProgramCategory,
    ProgressLogEntry, Recommendation, RecommendationId, RecommendationRequest,
    RecommendationStatus, RehabProfile, StationId, GENERAL_ZONE,
};
use super::events::{EventPublisher, RehabEvent};
use super::predictor::{
    fallback_prediction, PredictionOutcome, PredictionRequest, ProgramPredictor,
    ANALYSIS_UNAVAILABLE,
};
use super::progress::{ProgressRequest, ProgressTracker};
use super::repository::{RehabStore, RepositoryError};

static RECOMMENDATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_recommendation_id() -> RecommendationId {
    let id = RECOMMENDATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RecommendationId(format!("rec-{id:06}"))
}

static CASE_FILE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_case_file_id(prefix: &str) -> String {
    let id = CASE_FILE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{id:06}")
}

/// Orchestrator for the rehabilitation workflow: profile acquisition,
/// prediction with degraded fallback, catalog resolution, station/officer
/// assignment with guarded reservation, and persistence plus notification.
pub struct RehabilitationService<P, S, E> {
    predictor: P,
    store: Arc<S>,
    events: Arc<E>,
    engine: AssignmentEngine,
    progress: ProgressTracker<S, E>,
}

impl<P, S, E> RehabilitationService<P, S, E>
where
    P: ProgramPredictor,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    pub fn new(predictor: P, store: Arc<S>, events: Arc<E>) -> Self {
        let progress = ProgressTracker::new(store.clone(), events.clone());
        Self {
            predictor,
            store,
            events,
            engine: AssignmentEngine,
            progress,
        }
    }

    /// Generate a recommendation for an inmate.
    ///
    /// With `force_regenerate` unset, the latest non-terminal recommendation
    /// for the inmate is reused when one exists. Otherwise the full pipeline
    /// runs: predictor failure switches to the rule-based fallback (a
    /// designed degraded mode, logged and recorded but never surfaced as an
    /// error), while a predicted program type with no active catalog entry
    /// aborts with [`RehabilitationError::NoSuitableProgram`] and persists
    /// nothing.
    pub async fn generate(
        &self,
        request: RecommendationRequest,
    ) -> Result<Recommendation, RehabilitationError> {
        if request.inmate_id.0.trim().is_empty() {
            return Err(RehabilitationError::EmptyInmateId);
        }
        let inmate_id = request.inmate_id.clone();
        info!(inmate = %inmate_id, "generating recommendation");

        if !request.force_regenerate {
            if let Some(open) = self.store.latest_open_for(&inmate_id)? {
                debug!(inmate = %inmate_id, recommendation = %open.id, "reusing open recommendation");
                return Ok(open);
            }
        }

        let profile = match self.store.profile(&inmate_id)? {
            Some(profile) => profile,
            None => self.store.save_profile(RehabProfile::initial(
                inmate_id.clone(),
                request.override_features.clone().unwrap_or_default(),
            ))?,
        };

        // Override features apply to this call only; the stored profile is
        // not rewritten.
        let mut features = profile.features.clone();
        if let Some(overrides) = &request.override_features {
            for (key, value) in overrides {
                features.insert(key.clone(), value.clone());
            }
        }

        let outcome = match self
            .predictor
            .predict(&PredictionRequest {
                inmate_id: inmate_id.clone(),
                profile_features: features.clone(),
                suitability_group: profile.suitability_group.clone(),
                risk_score: profile.risk_score,
            })
            .await
        {
            Ok(prediction) => PredictionOutcome::Predicted(prediction),
            Err(err) => {
                warn!(inmate = %inmate_id, error = %err, "prediction service unavailable, using rule-based fallback");
                PredictionOutcome::Degraded {
                    reason: err.to_string(),
                    prediction: fallback_prediction(&profile.suitability_group),
                }
            }
        };

        let prediction = outcome.prediction();
        let top = prediction.programs.first().ok_or_else(|| {
            RehabilitationError::NoSuitableProgram {
                category: "unspecified".to_string(),
            }
        })?;
        let category: ProgramCategory = top.program_type.parse().map_err(|_| {
            RehabilitationError::NoSuitableProgram {
                category: top.program_type.clone(),
            }
        })?;
        let program = self
            .store
            .find_active_by_category(category)?
            .into_iter()
            .next()
            .ok_or_else(|| RehabilitationError::NoSuitableProgram {
                category: category.label().to_string(),
            })?;

        let needs = vec![profile.suitability_group.clone()];
        let zone = features
            .get("zone")
            .and_then(|value| value.as_text())
            .filter(|zone| !zone.eq_ignore_ascii_case(GENERAL_ZONE))
            .map(str::to_string);

        let station = self.assign_station(&needs, zone.as_deref())?;
        let officer = self.assign_officer(&needs, station.as_ref())?;
        if station.is_none() || officer.is_none() {
            warn!(inmate = %inmate_id, "unable to assign station or officer");
        }

        let recommendation = Recommendation {
            id: next_recommendation_id(),
            inmate_id: inmate_id.clone(),
            program: program.id.clone(),
            program_category: program.category,
            station,
            officer,
            duration_weeks: top.duration_weeks,
            rationale: prediction.explanation.clone(),
            confidence: prediction.confidence,
            degraded: outcome.is_degraded(),
            status: RecommendationStatus::Pending,
            created_at: Utc::now(),
            start_date: None,
            expected_end_date: None,
        };

        let recommendation = self.store.insert_recommendation(recommendation)?;

        if let Err(err) = self.events.publish(RehabEvent::recommendation_created(
            inmate_id,
            recommendation.id.clone(),
        )) {
            warn!(error = %err, "failed to publish recommendation event");
        }

        Ok(recommendation)
    }

    /// Score, pick, and reserve a station. A lost reservation drops the
    /// candidate and re-selects from the remainder; a drained pool is an
    /// assignment gap, not an error.
    fn assign_station(
        &self,
        needs: &[String],
        zone: Option<&str>,
    ) -> Result<Option<StationId>, RehabilitationError> {
        let mut candidates = self.store.eligible_stations()?;
        loop {
            let Some(chosen) = self.engine.select_station(&candidates, needs, zone) else {
                return Ok(None);
            };
            let id = chosen.id.clone();
            if self.store.reserve_station(&id)? {
                return Ok(Some(id));
            }
            warn!(station = %id, "station reservation lost, re-selecting");
            candidates.retain(|station| station.id != id);
        }
    }

    fn assign_officer(
        &self,
        needs: &[String],
        station: Option<&StationId>,
    ) -> Result<Option<OfficerId>, RehabilitationError> {
        let mut candidates = self.store.eligible_officers()?;
        loop {
            let Some(chosen) = self.engine.select_officer(&candidates, needs, station) else {
                return Ok(None);
            };
            let id = chosen.id.clone();
            if self.store.reserve_officer(&id)? {
                return Ok(Some(id));
            }
            warn!(officer = %id, "officer reservation lost, re-selecting");
            candidates.retain(|officer| officer.id != id);
        }
    }

    /// Fetch the rehabilitation profile for an inmate.
    pub fn profile(&self, inmate_id: &InmateId) -> Result<RehabProfile, RehabilitationError> {
        self.store
            .profile(inmate_id)?
            .ok_or_else(|| RehabilitationError::ProfileNotFound(inmate_id.clone()))
    }

    /// All recommendations recorded for an inmate.
    pub fn recommendations(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Vec<Recommendation>, RehabilitationError> {
        Ok(self.store.recommendations_for(inmate_id)?)
    }

    /// Fetch one recommendation by id.
    pub fn recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Recommendation, RehabilitationError> {
        self.store
            .recommendation(id)?
            .ok_or_else(|| RehabilitationError::RecommendationNotFound(id.clone()))
    }

    /// Active catalog programs.
    pub fn active_programs(&self) -> Result<Vec<Program>, RehabilitationError> {
        Ok(self.store.active_programs()?)
    }

    pub fn log_progress(
        &self,
        request: ProgressRequest,
    ) -> Result<ProgressLogEntry, RehabilitationError> {
        self.progress.log_progress(request)
    }

    /// Record a medical report and refresh the profile timestamp.
    pub fn add_medical_report(
        &self,
        inmate_id: InmateId,
        officer_id: OfficerId,
        vitals: FeatureMap,
        diagnosis: String,
        notes: String,
    ) -> Result<MedicalReport, RehabilitationError> {
        let report = self.store.append_medical_report(MedicalReport {
            id: next_case_file_id("med"),
            inmate_id: inmate_id.clone(),
            officer_id,
            vitals,
            diagnosis,
            notes,
            recorded_at: Utc::now(),
        })?;

        self.touch_profile(&inmate_id)?;
        info!(inmate = %inmate_id, "profile update triggered from medical report");

        if let Err(err) = self
            .events
            .publish(RehabEvent::medical_report_added(inmate_id))
        {
            warn!(error = %err, "failed to publish medical report event");
        }

        Ok(report)
    }

    /// Record a counseling note, summarized by the predictor when it is
    /// reachable and with a fixed degraded summary otherwise.
    pub async fn add_counseling_note(
        &self,
        inmate_id: InmateId,
        counselor_id: OfficerId,
        text: String,
        session_score: Option<f64>,
    ) -> Result<CounselingNote, RehabilitationError> {
        let summary = match self.predictor.analyze_notes(&inmate_id, &text).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(inmate = %inmate_id, error = %err, "notes analysis unavailable");
                ANALYSIS_UNAVAILABLE.to_string()
            }
        };

        let note = self.store.append_counseling_note(CounselingNote {
            id: next_case_file_id("note"),
            inmate_id: inmate_id.clone(),
            counselor_id,
            text,
            session_score,
            summary,
            recorded_at: Utc::now(),
        })?;

        self.touch_profile(&inmate_id)?;
        info!(inmate = %inmate_id, "profile update triggered from counseling note");

        if let Err(err) = self
            .events
            .publish(RehabEvent::counseling_note_added(inmate_id))
        {
            warn!(error = %err, "failed to publish counseling note event");
        }

        Ok(note)
    }

    fn touch_profile(&self, inmate_id: &InmateId) -> Result<(), RehabilitationError> {
        if let Some(profile) = self.store.profile(inmate_id)? {
            self.store.save_profile(profile)?;
        }
        Ok(())
    }
}

/// Error raised by the rehabilitation service. Only `NoSuitableProgram` and
/// the not-found variants abort an operation; degraded prediction,
/// assignment gaps, and event-publish failures are absorbed with warnings.
#[derive(Debug, thiserror::Error)]
pub enum RehabilitationError {
    #[error("inmate id must not be empty")]
    EmptyInmateId,
    #[error("profile not found for inmate: {0}")]
    ProfileNotFound(InmateId),
    #[error("no active program of type '{category}' in the catalog")]
    NoSuitableProgram { category: String },
    #[error("recommendation not found: {0}")]
    RecommendationNotFound(RecommendationId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl RehabilitationError {
    /// HTTP status mapping used by the router and the top-level error type.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RehabilitationError::EmptyInmateId => StatusCode::BAD_REQUEST,
            RehabilitationError::ProfileNotFound(_)
            | RehabilitationError::RecommendationNotFound(_) => StatusCode::NOT_FOUND,
            RehabilitationError::NoSuitableProgram { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            RehabilitationError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
