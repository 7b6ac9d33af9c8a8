use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PredictorConfig;

use super::domain::{FeatureMap, InmateId};

/// Explanation attached to every fallback prediction.
pub const FALLBACK_EXPLANATION: &str =
    "Rule-based recommendation (prediction service unavailable)";

/// Summary used when the notes-analysis call cannot be completed.
pub const ANALYSIS_UNAVAILABLE: &str = "analysis unavailable";

/// Request payload for the external prediction service.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub inmate_id: InmateId,
    pub profile_features: FeatureMap,
    pub suitability_group: String,
    pub risk_score: f64,
}

/// One ranked program candidate returned by the predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramForecast {
    pub program_type: String,
    pub program_name: String,
    pub duration_weeks: u32,
    pub score: f64,
    pub reason: String,
}

/// Ranked prediction with an overall explanation and confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub programs: Vec<ProgramForecast>,
    pub explanation: String,
    pub confidence: f64,
}

/// How a prediction was obtained. Degraded mode is a designed outcome of the
/// pipeline, not an error: the reason records why the external call was
/// abandoned, and the bundled prediction comes from the rule-based fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionOutcome {
    Predicted(Prediction),
    Degraded { reason: String, prediction: Prediction },
}

impl PredictionOutcome {
    pub fn prediction(&self) -> &Prediction {
        match self {
            PredictionOutcome::Predicted(prediction) => prediction,
            PredictionOutcome::Degraded { prediction, .. } => prediction,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PredictionOutcome::Degraded { .. })
    }
}

/// Failure modes of the external predictor. All of them are absorbed into
/// the fallback path by the caller; none reaches the API surface.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("prediction service transport failure: {0}")]
    Transport(String),
    #[error("prediction service timed out")]
    Timeout,
    #[error("prediction service returned status {0}")]
    Status(u16),
    #[error("prediction service returned a malformed payload: {0}")]
    Payload(String),
}

/// Outbound gateway to the program-prediction service.
#[async_trait]
pub trait ProgramPredictor: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictorError>;

    /// Summarize counseling notes. Callers degrade to a fixed summary when
    /// this fails; see [`ANALYSIS_UNAVAILABLE`].
    async fn analyze_notes(
        &self,
        inmate_id: &InmateId,
        text: &str,
    ) -> Result<String, PredictorError>;
}

/// HTTP client for the prediction service, bounded by the configured
/// per-request timeout so a slow predictor never stalls the request path.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeNotesResponse {
    summary: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeNotesRequest<'a> {
    inmate_id: &'a InmateId,
    text: &'a str,
}

impl HttpPredictor {
    pub fn new(config: &PredictorConfig) -> Result<Self, PredictorError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|err| PredictorError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn classify(err: reqwest::Error) -> PredictorError {
    if err.is_timeout() {
        PredictorError::Timeout
    } else if err.is_decode() {
        PredictorError::Payload(err.to_string())
    } else {
        PredictorError::Transport(err.to_string())
    }
}

#[async_trait]
impl ProgramPredictor for HttpPredictor {
    async fn predict(&self, request: &PredictionRequest) -> Result<Prediction, PredictorError> {
        let response = self
            .client
            .post(self.endpoint("/api/v1/recommend"))
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::Status(status.as_u16()));
        }

        response.json::<Prediction>().await.map_err(classify)
    }

    async fn analyze_notes(
        &self,
        inmate_id: &InmateId,
        text: &str,
    ) -> Result<String, PredictorError> {
        let response = self
            .client
            .post(self.endpoint("/api/v1/analyze-notes"))
            .json(&AnalyzeNotesRequest { inmate_id, text })
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictorError::Status(status.as_u16()));
        }

        response
            .json::<AnalyzeNotesResponse>()
            .await
            .map(|body| body.summary)
            .map_err(classify)
    }
}

/// Rule-based prediction keyed on the suitability group. Pure and total:
/// this is the correctness backstop for the whole pipeline, so it has no
/// failure mode of its own.
pub fn fallback_prediction(suitability_group: &str) -> Prediction {
    let group = suitability_group.to_ascii_lowercase();

    let program = if group.contains("substance") {
        ProgramForecast {
            program_type: "substance_abuse".to_string(),
            program_name: "Drug Rehabilitation Program".to_string(),
            duration_weeks: 12,
            score: 0.7,
            reason: "Recommended based on substance abuse history".to_string(),
        }
    } else if group.contains("mental") {
        ProgramForecast {
            program_type: "mental_health".to_string(),
            program_name: "Mental Health Support Program".to_string(),
            duration_weeks: 8,
            score: 0.7,
            reason: "Recommended based on mental health assessment".to_string(),
        }
    } else {
        ProgramForecast {
            program_type: "vocational".to_string(),
            program_name: "Vocational Training".to_string(),
            duration_weeks: 16,
            score: 0.6,
            reason: "Default vocational training recommendation".to_string(),
        }
    };

    Prediction {
        programs: vec![program],
        explanation: FALLBACK_EXPLANATION.to_string(),
        confidence: 0.6,
    }
}
