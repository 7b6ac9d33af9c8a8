use super::domain::{
    CounselingNote, InmateId, MedicalReport, Officer, OfficerId, Program, ProgramCategory,
    ProgressLogEntry, Recommendation, RecommendationId, RecommendationStatus, RehabProfile,
    Station, StationId,
};

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage of one rehabilitation profile per inmate.
pub trait ProfileStore: Send + Sync {
    fn profile(&self, inmate_id: &InmateId) -> Result<Option<RehabProfile>, RepositoryError>;
    fn save_profile(&self, profile: RehabProfile) -> Result<RehabProfile, RepositoryError>;
}

/// Read-mostly catalog of rehabilitation programs. The engine never writes
/// enrollment counters.
pub trait ProgramCatalog: Send + Sync {
    fn active_programs(&self) -> Result<Vec<Program>, RepositoryError>;
    fn find_active_by_category(
        &self,
        category: ProgramCategory,
    ) -> Result<Vec<Program>, RepositoryError>;
}

/// The station/officer pool. Load counters are the shared mutable state this
/// trait protects: scoring reads a snapshot through the `eligible_*` views,
/// and commitment goes through the `reserve_*` operations, which must be
/// atomic conditional increments ("increment only if current_load <
/// capacity") so the capacity invariant survives concurrent generate calls.
pub trait ResourcePool: Send + Sync {
    fn eligible_stations(&self) -> Result<Vec<Station>, RepositoryError>;
    fn eligible_officers(&self) -> Result<Vec<Officer>, RepositoryError>;

    /// Returns `false` when the station is already at capacity; the caller
    /// re-selects from the remaining candidates.
    fn reserve_station(&self, id: &StationId) -> Result<bool, RepositoryError>;
    fn reserve_officer(&self, id: &OfficerId) -> Result<bool, RepositoryError>;
}

/// Storage for recommendations and their append-only progress log.
pub trait RecommendationStore: Send + Sync {
    fn insert_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> Result<Recommendation, RepositoryError>;
    fn recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError>;
    fn recommendations_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Vec<Recommendation>, RepositoryError>;
    /// Latest non-terminal recommendation for the inmate, if any.
    fn latest_open_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Option<Recommendation>, RepositoryError>;
    fn set_recommendation_status(
        &self,
        id: &RecommendationId,
        status: RecommendationStatus,
    ) -> Result<(), RepositoryError>;
    fn append_progress(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, RepositoryError>;
    fn progress_for(
        &self,
        id: &RecommendationId,
    ) -> Result<Vec<ProgressLogEntry>, RepositoryError>;
}

/// Append-only storage for medical reports and counseling notes.
pub trait CaseFileStore: Send + Sync {
    fn append_medical_report(
        &self,
        report: MedicalReport,
    ) -> Result<MedicalReport, RepositoryError>;
    fn append_counseling_note(
        &self,
        note: CounselingNote,
    ) -> Result<CounselingNote, RepositoryError>;
}

/// Everything the rehabilitation service needs from storage.
pub trait RehabStore:
    ProfileStore + ProgramCatalog + ResourcePool + RecommendationStore + CaseFileStore
{
}

impl<T> RehabStore for T where
    T: ProfileStore + ProgramCatalog + ResourcePool + RecommendationStore + CaseFileStore
{
}
