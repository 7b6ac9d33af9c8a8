use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{
    FeatureMap, InmateId, OfficerId, Recommendation, RecommendationId, RecommendationRequest,
};
use super::events::EventPublisher;
use super::predictor::ProgramPredictor;
use super::progress::ProgressRequest;
use super::repository::RehabStore;
use super::service::{RehabilitationError, RehabilitationService};

/// Router builder exposing the rehabilitation workflow over HTTP.
pub fn rehabilitation_router<P, S, E>(
    service: Arc<RehabilitationService<P, S, E>>,
) -> Router
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    Router::new()
        .route(
            "/api/v1/rehabilitation/recommend",
            post(recommend_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/profile/:inmate_id",
            get(profile_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/recommendations/:inmate_id",
            get(recommendations_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/progress",
            post(progress_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/programs",
            get(programs_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/medical-report",
            post(medical_report_handler::<P, S, E>),
        )
        .route(
            "/api/v1/rehabilitation/counseling-note",
            post(counseling_note_handler::<P, S, E>),
        )
        .with_state(service)
}

/// Sanitized representation of a recommendation for API responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub recommendation_id: RecommendationId,
    pub inmate_id: InmateId,
    pub program_id: String,
    pub program_category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub officer_id: Option<String>,
    pub duration_weeks: u32,
    pub explanation: String,
    pub confidence: f64,
    pub degraded: bool,
    pub assignment_gap: bool,
    pub status: &'static str,
}

impl RecommendationView {
    pub fn from_recommendation(recommendation: &Recommendation) -> Self {
        Self {
            recommendation_id: recommendation.id.clone(),
            inmate_id: recommendation.inmate_id.clone(),
            program_id: recommendation.program.0.clone(),
            program_category: recommendation.program_category.label(),
            station_id: recommendation.station.as_ref().map(|id| id.0.clone()),
            officer_id: recommendation.officer.as_ref().map(|id| id.0.clone()),
            duration_weeks: recommendation.duration_weeks,
            explanation: recommendation.rationale.clone(),
            confidence: recommendation.confidence,
            degraded: recommendation.degraded,
            assignment_gap: recommendation.has_assignment_gap(),
            status: recommendation.status.label(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MedicalReportRequest {
    inmate_id: InmateId,
    officer_id: OfficerId,
    #[serde(default)]
    vitals: FeatureMap,
    #[serde(default)]
    diagnosis: String,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CounselingNoteRequest {
    inmate_id: InmateId,
    counselor_id: OfficerId,
    text: String,
    #[serde(default)]
    session_score: Option<f64>,
}

fn error_response(error: RehabilitationError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), axum::Json(payload)).into_response()
}

pub(crate) async fn recommend_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    axum::Json(request): axum::Json<RecommendationRequest>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.generate(request).await {
        Ok(recommendation) => {
            let view = RecommendationView::from_recommendation(&recommendation);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn profile_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    Path(inmate_id): Path<String>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.profile(&InmateId(inmate_id)) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn recommendations_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    Path(inmate_id): Path<String>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.recommendations(&InmateId(inmate_id)) {
        Ok(recommendations) => {
            let views: Vec<RecommendationView> = recommendations
                .iter()
                .map(RecommendationView::from_recommendation)
                .collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn progress_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    axum::Json(request): axum::Json<ProgressRequest>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.log_progress(request) {
        Ok(entry) => (StatusCode::OK, axum::Json(entry)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn programs_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.active_programs() {
        Ok(programs) => (StatusCode::OK, axum::Json(programs)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn medical_report_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    axum::Json(request): axum::Json<MedicalReportRequest>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service.add_medical_report(
        request.inmate_id,
        request.officer_id,
        request.vitals,
        request.diagnosis,
        request.notes,
    ) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn counseling_note_handler<P, S, E>(
    State(service): State<Arc<RehabilitationService<P, S, E>>>,
    axum::Json(request): axum::Json<CounselingNoteRequest>,
) -> Response
where
    P: ProgramPredictor + 'static,
    S: RehabStore + 'static,
    E: EventPublisher + 'static,
{
    match service
        .add_counseling_note(
            request.inmate_id,
            request.counselor_id,
            request.text,
            request.session_score,
        )
        .await
    {
        Ok(note) => (StatusCode::OK, axum::Json(note)).into_response(),
        Err(error) => error_response(error),
    }
}
