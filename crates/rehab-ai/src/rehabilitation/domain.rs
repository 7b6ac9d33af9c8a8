use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for inmates, assigned by the custody system.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InmateId(pub String);

impl fmt::Display for InmateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for catalog programs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgramId(pub String);

/// Identifier wrapper for rehabilitation stations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StationId(pub String);

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for medical officers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OfficerId(pub String);

impl fmt::Display for OfficerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for recommendations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

impl fmt::Display for RecommendationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for progress log entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgressLogId(pub String);

/// Closed set of program categories recognized by the catalog.
///
/// The predictor speaks in free-text program types; they are validated into
/// this enumeration at the catalog boundary, and anything outside it is
/// rejected as having no suitable program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgramCategory {
    SubstanceAbuse,
    MentalHealth,
    Vocational,
    Education,
}

impl ProgramCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ProgramCategory::SubstanceAbuse => "substance_abuse",
            ProgramCategory::MentalHealth => "mental_health",
            ProgramCategory::Vocational => "vocational",
            ProgramCategory::Education => "education",
        }
    }
}

/// Error raised when a free-text program type does not name a known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown program category '{0}'")]
pub struct UnknownProgramCategory(pub String);

impl FromStr for ProgramCategory {
    type Err = UnknownProgramCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "substance_abuse" => Ok(ProgramCategory::SubstanceAbuse),
            "mental_health" => Ok(ProgramCategory::MentalHealth),
            "vocational" => Ok(ProgramCategory::Vocational),
            "education" => Ok(ProgramCategory::Education),
            other => Err(UnknownProgramCategory(other.to_string())),
        }
    }
}

/// Scalar value stored in a profile feature map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    Boolean(bool),
    Text(String),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// Free-form feature map keyed by assessment field name.
pub type FeatureMap = BTreeMap<String, FeatureValue>;

/// Sentinel suitability zone that expresses no locality preference.
pub const GENERAL_ZONE: &str = "general";

/// Default suitability group for inmates without an assessment on file.
pub const GENERAL_SUITABILITY_GROUP: &str = "general";

/// Suitability profile for one inmate, created lazily on the first
/// recommendation request and mutated by later medical/counseling events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RehabProfile {
    pub inmate_id: InmateId,
    pub suitability_group: String,
    pub risk_score: f64,
    pub features: FeatureMap,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RehabProfile {
    /// Initial profile used when an inmate has no assessment on file yet.
    pub fn initial(inmate_id: InmateId, features: FeatureMap) -> Self {
        let now = Utc::now();
        Self {
            inmate_id,
            suitability_group: GENERAL_SUITABILITY_GROUP.to_string(),
            risk_score: 0.5,
            features,
            last_updated: now,
            created_at: now,
        }
    }
}

/// Rehabilitation program from the read-mostly catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub name: String,
    pub category: ProgramCategory,
    pub duration_weeks: u32,
    pub required_skills: BTreeSet<String>,
    pub capacity: u32,
    pub current_enrollment: u32,
    pub description: String,
    pub active: bool,
}

/// Capacity-bounded physical facility offering specialization-tagged services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub location: String,
    pub zone: Option<String>,
    pub capacity: u32,
    pub current_load: u32,
    pub specializations: BTreeSet<String>,
    pub success_rate: Option<f64>,
    pub active: bool,
}

/// Capacity-bounded staff member, optionally pinned to one station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Officer {
    pub id: OfficerId,
    pub name: String,
    pub specializations: BTreeSet<String>,
    pub assigned_station: Option<StationId>,
    pub current_load: u32,
    pub max_capacity: u32,
    pub success_rate: Option<f64>,
    pub active: bool,
}

/// Lifecycle of a recommendation record.
///
/// `Pending` is the initial state; the progress tracker is the only writer
/// allowed to flip a recommendation to `Completed`. `InProgress` and
/// `Cancelled` are set by case-management flows outside this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl RecommendationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationStatus::Pending => "pending",
            RecommendationStatus::InProgress => "in_progress",
            RecommendationStatus::Completed => "completed",
            RecommendationStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            RecommendationStatus::Completed | RecommendationStatus::Cancelled
        )
    }
}

/// One generated recommendation. Program/station/officer links are immutable
/// once created; re-assignment happens through a new recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: RecommendationId,
    pub inmate_id: InmateId,
    pub program: ProgramId,
    pub program_category: ProgramCategory,
    pub station: Option<StationId>,
    pub officer: Option<OfficerId>,
    pub duration_weeks: u32,
    pub rationale: String,
    pub confidence: f64,
    pub degraded: bool,
    pub status: RecommendationStatus,
    pub created_at: DateTime<Utc>,
    pub start_date: Option<DateTime<Utc>>,
    pub expected_end_date: Option<DateTime<Utc>>,
}

impl Recommendation {
    /// A recommendation created without a station and/or officer carries an
    /// assignment gap; the request still succeeded.
    pub fn has_assignment_gap(&self) -> bool {
        self.station.is_none() || self.officer.is_none()
    }
}

/// Program-progress semantics attached to a log entry.
///
/// Statuses annotate engagement only; none of them drives the recommendation
/// state machine. The single load-bearing transition is a progress percentage
/// of 100 or more, which completes the owning recommendation.
///
/// - `NotStarted`: enrolled, no sessions attended yet.
/// - `OnTrack`: attending and meeting program milestones.
/// - `Struggling`: attending but behind on milestones.
/// - `Paused`: engagement suspended (transfer, medical hold, discipline).
/// - `Completed`: program finished from the program's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    OnTrack,
    Struggling,
    Paused,
    Completed,
}

impl ProgressStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::OnTrack => "on_track",
            ProgressStatus::Struggling => "struggling",
            ProgressStatus::Paused => "paused",
            ProgressStatus::Completed => "completed",
        }
    }
}

/// Append-only progress entry recorded against a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressLogEntry {
    pub id: ProgressLogId,
    pub inmate_id: InmateId,
    pub recommendation_id: RecommendationId,
    pub logged_at: DateTime<Utc>,
    pub status: ProgressStatus,
    pub progress_percentage: Option<u8>,
    pub notes: String,
    pub recorded_by: OfficerId,
}

/// Medical report captured during an examination. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalReport {
    pub id: String,
    pub inmate_id: InmateId,
    pub officer_id: OfficerId,
    pub vitals: FeatureMap,
    pub diagnosis: String,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

/// Counseling session note with an optional predictor-generated summary.
/// Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounselingNote {
    pub id: String,
    pub inmate_id: InmateId,
    pub counselor_id: OfficerId,
    pub text: String,
    pub session_score: Option<f64>,
    pub summary: String,
    pub recorded_at: DateTime<Utc>,
}

/// Request payload for recommendation generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub inmate_id: InmateId,
    /// Merged over (never replacing) the stored profile features for this
    /// call only.
    #[serde(default)]
    pub override_features: Option<FeatureMap>,
    #[serde(default)]
    pub force_regenerate: bool,
}
