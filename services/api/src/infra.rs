use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;
use rehab_ai::rehabilitation::{
    InMemoryRehabStore, InmateId, Officer, OfficerId, Prediction, PredictionRequest,
    PredictorError, Program, ProgramCategory, ProgramId, ProgramPredictor, Station, StationId,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn specializations(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

/// In-memory store seeded with a small facility: one program per category,
/// three stations across two zones, and officers pinned to two of them.
pub(crate) fn seeded_store() -> Arc<InMemoryRehabStore> {
    let store = Arc::new(InMemoryRehabStore::new());

    store.seed_program(Program {
        id: ProgramId("prog-substance".to_string()),
        name: "Drug Rehabilitation Program".to_string(),
        category: ProgramCategory::SubstanceAbuse,
        duration_weeks: 12,
        required_skills: specializations(&["counseling", "medical_supervision"]),
        capacity: 30,
        current_enrollment: 12,
        description: "Structured 12-week substance abuse recovery program".to_string(),
        active: true,
    });
    store.seed_program(Program {
        id: ProgramId("prog-mental".to_string()),
        name: "Mental Health Support Program".to_string(),
        category: ProgramCategory::MentalHealth,
        duration_weeks: 8,
        required_skills: specializations(&["psychology"]),
        capacity: 20,
        current_enrollment: 7,
        description: "Clinician-led mental health support sessions".to_string(),
        active: true,
    });
    store.seed_program(Program {
        id: ProgramId("prog-vocational".to_string()),
        name: "Vocational Training".to_string(),
        category: ProgramCategory::Vocational,
        duration_weeks: 16,
        required_skills: BTreeSet::new(),
        capacity: 40,
        current_enrollment: 18,
        description: "Workshop-based trade skills program".to_string(),
        active: true,
    });
    store.seed_program(Program {
        id: ProgramId("prog-education".to_string()),
        name: "Adult Education Program".to_string(),
        category: ProgramCategory::Education,
        duration_weeks: 24,
        required_skills: specializations(&["teaching"]),
        capacity: 35,
        current_enrollment: 9,
        description: "Literacy and secondary education classes".to_string(),
        active: true,
    });

    store.seed_station(Station {
        id: StationId("st-north".to_string()),
        name: "North Wing Clinic".to_string(),
        location: "North Wing, Level 2".to_string(),
        zone: Some("zoneA".to_string()),
        capacity: 12,
        current_load: 4,
        specializations: specializations(&["substance_abuse", "mental_health"]),
        success_rate: Some(0.78),
        active: true,
    });
    store.seed_station(Station {
        id: StationId("st-south".to_string()),
        name: "South Wing Workshop".to_string(),
        location: "South Wing, Ground Floor".to_string(),
        zone: Some("zoneB".to_string()),
        capacity: 20,
        current_load: 6,
        specializations: specializations(&["vocational", "education"]),
        success_rate: Some(0.64),
        active: true,
    });
    store.seed_station(Station {
        id: StationId("st-annex".to_string()),
        name: "Annex Counseling Suite".to_string(),
        location: "Annex Building".to_string(),
        zone: Some("zoneA".to_string()),
        capacity: 8,
        current_load: 7,
        specializations: specializations(&["substance_abuse"]),
        success_rate: Some(0.85),
        active: true,
    });

    store.seed_officer(Officer {
        id: OfficerId("off-ramirez".to_string()),
        name: "E. Ramirez".to_string(),
        specializations: specializations(&["substance_abuse"]),
        assigned_station: Some(StationId("st-north".to_string())),
        current_load: 2,
        max_capacity: 8,
        success_rate: Some(0.74),
        active: true,
    });
    store.seed_officer(Officer {
        id: OfficerId("off-osei".to_string()),
        name: "K. Osei".to_string(),
        specializations: specializations(&["mental_health", "substance_abuse"]),
        assigned_station: Some(StationId("st-north".to_string())),
        current_load: 5,
        max_capacity: 6,
        success_rate: Some(0.81),
        active: true,
    });
    store.seed_officer(Officer {
        id: OfficerId("off-baker".to_string()),
        name: "T. Baker".to_string(),
        specializations: specializations(&["vocational"]),
        assigned_station: Some(StationId("st-south".to_string())),
        current_load: 3,
        max_capacity: 10,
        success_rate: Some(0.6),
        active: true,
    });

    store
}

/// Predictor used by the offline demo: it never reaches the network, so
/// every run exercises the rule-based degraded mode deterministically.
pub(crate) struct OfflinePredictor;

#[async_trait]
impl ProgramPredictor for OfflinePredictor {
    async fn predict(&self, _request: &PredictionRequest) -> Result<Prediction, PredictorError> {
        Err(PredictorError::Transport("offline demo".to_string()))
    }

    async fn analyze_notes(
        &self,
        _inmate_id: &InmateId,
        _text: &str,
    ) -> Result<String, PredictorError> {
        Err(PredictorError::Transport("offline demo".to_string()))
    }
}
