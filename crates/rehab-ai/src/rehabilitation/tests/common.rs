use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::rehabilitation::domain::{
    CounselingNote, FeatureMap, InmateId, MedicalReport, Officer, OfficerId, Program,
    ProgramCategory, ProgramId, ProgressLogEntry, Recommendation, RecommendationId,
    RecommendationStatus, RehabProfile, Station, StationId,
};
use crate::rehabilitation::events::{EventError, EventPublisher, RehabEvent};
use crate::rehabilitation::memory::InMemoryRehabStore;
use crate::rehabilitation::predictor::{
    Prediction, PredictionRequest, PredictorError, ProgramForecast, ProgramPredictor,
};
use crate::rehabilitation::repository::{
    CaseFileStore, ProfileStore, ProgramCatalog, RecommendationStore, RepositoryError,
    ResourcePool,
};
use crate::rehabilitation::service::RehabilitationService;

pub(super) fn specs(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn station(
    id: &str,
    zone: Option<&str>,
    capacity: u32,
    current_load: u32,
    specializations: &[&str],
    success_rate: Option<f64>,
) -> Station {
    Station {
        id: StationId(id.to_string()),
        name: format!("Station {id}"),
        location: "Block C".to_string(),
        zone: zone.map(str::to_string),
        capacity,
        current_load,
        specializations: specs(specializations),
        success_rate,
        active: true,
    }
}

pub(super) fn officer(
    id: &str,
    assigned_station: Option<&str>,
    max_capacity: u32,
    current_load: u32,
    specializations: &[&str],
    success_rate: Option<f64>,
) -> Officer {
    Officer {
        id: OfficerId(id.to_string()),
        name: format!("Officer {id}"),
        specializations: specs(specializations),
        assigned_station: assigned_station.map(|value| StationId(value.to_string())),
        current_load,
        max_capacity,
        success_rate,
        active: true,
    }
}

pub(super) fn program(id: &str, category: ProgramCategory, name: &str, weeks: u32) -> Program {
    Program {
        id: ProgramId(id.to_string()),
        name: name.to_string(),
        category,
        duration_weeks: weeks,
        required_skills: BTreeSet::new(),
        capacity: 30,
        current_enrollment: 0,
        description: String::new(),
        active: true,
    }
}

pub(super) fn substance_profile(inmate: &str) -> RehabProfile {
    let mut profile = RehabProfile::initial(InmateId(inmate.to_string()), FeatureMap::new());
    profile.suitability_group = "substance_abuse".to_string();
    profile.risk_score = 0.65;
    profile
}

/// Store seeded with a catalog entry per fallback branch, two stations, and
/// two officers pinned to the first station.
pub(super) fn seeded_store() -> Arc<InMemoryRehabStore> {
    let store = Arc::new(InMemoryRehabStore::new());
    store.seed_program(program(
        "prog-sa",
        ProgramCategory::SubstanceAbuse,
        "Drug Rehabilitation Program",
        12,
    ));
    store.seed_program(program(
        "prog-mh",
        ProgramCategory::MentalHealth,
        "Mental Health Support Program",
        8,
    ));
    store.seed_program(program(
        "prog-voc",
        ProgramCategory::Vocational,
        "Vocational Training",
        16,
    ));
    store.seed_station(station(
        "st-a",
        Some("zoneA"),
        10,
        0,
        &["substance_abuse"],
        Some(0.8),
    ));
    store.seed_station(station(
        "st-b",
        Some("zoneB"),
        10,
        0,
        &["mental_health", "substance_abuse"],
        Some(0.6),
    ));
    store.seed_officer(officer(
        "off-1",
        Some("st-a"),
        5,
        0,
        &["substance_abuse"],
        Some(0.7),
    ));
    store.seed_officer(officer(
        "off-2",
        Some("st-a"),
        5,
        0,
        &["mental_health"],
        Some(0.9),
    ));
    store
}

#[derive(Default, Clone)]
pub(super) struct MemoryEvents {
    events: Arc<Mutex<Vec<RehabEvent>>>,
}

impl MemoryEvents {
    pub(super) fn events(&self) -> Vec<RehabEvent> {
        self.events.lock().expect("event mutex poisoned").clone()
    }
}

impl EventPublisher for MemoryEvents {
    fn publish(&self, event: RehabEvent) -> Result<(), EventError> {
        self.events
            .lock()
            .expect("event mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct FailingEvents;

impl EventPublisher for FailingEvents {
    fn publish(&self, _event: RehabEvent) -> Result<(), EventError> {
        Err(EventError::Transport("broker offline".to_string()))
    }
}

/// Predictor that always fails, driving the rule-based fallback.
pub(super) struct UnreachablePredictor;

#[async_trait]
impl ProgramPredictor for UnreachablePredictor {
    async fn predict(&self, _request: &PredictionRequest) -> Result<Prediction, PredictorError> {
        Err(PredictorError::Transport("connection refused".to_string()))
    }

    async fn analyze_notes(
        &self,
        _inmate_id: &InmateId,
        _text: &str,
    ) -> Result<String, PredictorError> {
        Err(PredictorError::Transport("connection refused".to_string()))
    }
}

/// Predictor that replays a fixed prediction.
pub(super) struct ScriptedPredictor {
    pub(super) prediction: Prediction,
}

impl ScriptedPredictor {
    pub(super) fn recommending(program_type: &str, weeks: u32) -> Self {
        Self {
            prediction: Prediction {
                programs: vec![ProgramForecast {
                    program_type: program_type.to_string(),
                    program_name: format!("{program_type} program"),
                    duration_weeks: weeks,
                    score: 0.9,
                    reason: "model ranked first".to_string(),
                }],
                explanation: "model consensus".to_string(),
                confidence: 0.85,
            },
        }
    }
}

#[async_trait]
impl ProgramPredictor for ScriptedPredictor {
    async fn predict(&self, _request: &PredictionRequest) -> Result<Prediction, PredictorError> {
        Ok(self.prediction.clone())
    }

    async fn analyze_notes(
        &self,
        _inmate_id: &InmateId,
        _text: &str,
    ) -> Result<String, PredictorError> {
        Ok("session trending positive".to_string())
    }
}

/// Store whose station/officer views replay the snapshot captured at
/// construction time, while reservations hit live state. Lets tests stage
/// the score-then-reserve race deterministically.
pub(super) struct StaleSnapshotStore {
    inner: Arc<InMemoryRehabStore>,
    stations: Vec<Station>,
    officers: Vec<Officer>,
}

impl StaleSnapshotStore {
    pub(super) fn capture(inner: Arc<InMemoryRehabStore>) -> Self {
        let stations = inner.eligible_stations().expect("snapshot readable");
        let officers = inner.eligible_officers().expect("snapshot readable");
        Self {
            inner,
            stations,
            officers,
        }
    }
}

impl ProfileStore for StaleSnapshotStore {
    fn profile(&self, inmate_id: &InmateId) -> Result<Option<RehabProfile>, RepositoryError> {
        self.inner.profile(inmate_id)
    }

    fn save_profile(&self, profile: RehabProfile) -> Result<RehabProfile, RepositoryError> {
        self.inner.save_profile(profile)
    }
}

impl ProgramCatalog for StaleSnapshotStore {
    fn active_programs(&self) -> Result<Vec<Program>, RepositoryError> {
        self.inner.active_programs()
    }

    fn find_active_by_category(
        &self,
        category: ProgramCategory,
    ) -> Result<Vec<Program>, RepositoryError> {
        self.inner.find_active_by_category(category)
    }
}

impl ResourcePool for StaleSnapshotStore {
    fn eligible_stations(&self) -> Result<Vec<Station>, RepositoryError> {
        Ok(self.stations.clone())
    }

    fn eligible_officers(&self) -> Result<Vec<Officer>, RepositoryError> {
        Ok(self.officers.clone())
    }

    fn reserve_station(&self, id: &StationId) -> Result<bool, RepositoryError> {
        self.inner.reserve_station(id)
    }

    fn reserve_officer(&self, id: &OfficerId) -> Result<bool, RepositoryError> {
        self.inner.reserve_officer(id)
    }
}

impl RecommendationStore for StaleSnapshotStore {
    fn insert_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> Result<Recommendation, RepositoryError> {
        self.inner.insert_recommendation(recommendation)
    }

    fn recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.recommendation(id)
    }

    fn recommendations_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        self.inner.recommendations_for(inmate_id)
    }

    fn latest_open_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.latest_open_for(inmate_id)
    }

    fn set_recommendation_status(
        &self,
        id: &RecommendationId,
        status: RecommendationStatus,
    ) -> Result<(), RepositoryError> {
        self.inner.set_recommendation_status(id, status)
    }

    fn append_progress(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, RepositoryError> {
        self.inner.append_progress(entry)
    }

    fn progress_for(
        &self,
        id: &RecommendationId,
    ) -> Result<Vec<ProgressLogEntry>, RepositoryError> {
        self.inner.progress_for(id)
    }
}

impl CaseFileStore for StaleSnapshotStore {
    fn append_medical_report(
        &self,
        report: MedicalReport,
    ) -> Result<MedicalReport, RepositoryError> {
        self.inner.append_medical_report(report)
    }

    fn append_counseling_note(
        &self,
        note: CounselingNote,
    ) -> Result<CounselingNote, RepositoryError> {
        self.inner.append_counseling_note(note)
    }
}

pub(super) type TestService<P> = RehabilitationService<P, InMemoryRehabStore, MemoryEvents>;

pub(super) fn build_service<P: ProgramPredictor>(
    predictor: P,
    store: Arc<InMemoryRehabStore>,
) -> (TestService<P>, Arc<InMemoryRehabStore>, Arc<MemoryEvents>) {
    let events = Arc::new(MemoryEvents::default());
    let service = RehabilitationService::new(predictor, store.clone(), events.clone());
    (service, store, events)
}

pub(super) fn store_with_profile(profile: RehabProfile) -> Arc<InMemoryRehabStore> {
    let store = seeded_store();
    store.save_profile(profile).expect("profile saves");
    store
}
