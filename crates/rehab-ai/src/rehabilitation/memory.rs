use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::domain::{
    CounselingNote, InmateId, MedicalReport, Officer, OfficerId, Program, ProgramCategory,
    ProgramId, ProgressLogEntry, Recommendation, RecommendationId, RecommendationStatus,
    RehabProfile, Station, StationId,
};
use super::repository::{
    CaseFileStore, ProfileStore, ProgramCatalog, RecommendationStore, RepositoryError,
    ResourcePool,
};

/// In-memory backing store for the rehabilitation workflow.
///
/// Arenas are keyed by id in `BTreeMap`s so the eligible views iterate in a
/// stable order, which is what makes the engine's first-seen tie-break
/// deterministic. Reservation takes the arena lock, re-checks
/// `current_load < capacity`, and increments in the same critical section,
/// so two racing generate calls can both score a nearly-full resource but
/// only one of them commits the last slot.
#[derive(Default, Clone)]
pub struct InMemoryRehabStore {
    profiles: Arc<Mutex<BTreeMap<InmateId, RehabProfile>>>,
    programs: Arc<Mutex<BTreeMap<ProgramId, Program>>>,
    stations: Arc<Mutex<BTreeMap<StationId, Station>>>,
    officers: Arc<Mutex<BTreeMap<OfficerId, Officer>>>,
    recommendations: Arc<Mutex<BTreeMap<RecommendationId, Recommendation>>>,
    progress: Arc<Mutex<Vec<ProgressLogEntry>>>,
    medical_reports: Arc<Mutex<Vec<MedicalReport>>>,
    counseling_notes: Arc<Mutex<Vec<CounselingNote>>>,
}

impl InMemoryRehabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_program(&self, program: Program) {
        let mut guard = self.programs.lock().expect("program arena poisoned");
        guard.insert(program.id.clone(), program);
    }

    pub fn seed_station(&self, station: Station) {
        let mut guard = self.stations.lock().expect("station arena poisoned");
        guard.insert(station.id.clone(), station);
    }

    pub fn seed_officer(&self, officer: Officer) {
        let mut guard = self.officers.lock().expect("officer arena poisoned");
        guard.insert(officer.id.clone(), officer);
    }

    /// Current load of a station, for tests and demo output.
    pub fn station_load(&self, id: &StationId) -> Option<u32> {
        let guard = self.stations.lock().expect("station arena poisoned");
        guard.get(id).map(|station| station.current_load)
    }

    /// Current load of an officer, for tests and demo output.
    pub fn officer_load(&self, id: &OfficerId) -> Option<u32> {
        let guard = self.officers.lock().expect("officer arena poisoned");
        guard.get(id).map(|officer| officer.current_load)
    }

    pub fn medical_reports_for(&self, inmate_id: &InmateId) -> Vec<MedicalReport> {
        let guard = self.medical_reports.lock().expect("medical arena poisoned");
        guard
            .iter()
            .filter(|report| &report.inmate_id == inmate_id)
            .cloned()
            .collect()
    }

    pub fn counseling_notes_for(&self, inmate_id: &InmateId) -> Vec<CounselingNote> {
        let guard = self
            .counseling_notes
            .lock()
            .expect("counseling arena poisoned");
        guard
            .iter()
            .filter(|note| &note.inmate_id == inmate_id)
            .cloned()
            .collect()
    }
}

impl ProfileStore for InMemoryRehabStore {
    fn profile(&self, inmate_id: &InmateId) -> Result<Option<RehabProfile>, RepositoryError> {
        let guard = self.profiles.lock().expect("profile arena poisoned");
        Ok(guard.get(inmate_id).cloned())
    }

    fn save_profile(&self, mut profile: RehabProfile) -> Result<RehabProfile, RepositoryError> {
        let mut guard = self.profiles.lock().expect("profile arena poisoned");
        profile.last_updated = Utc::now();
        guard.insert(profile.inmate_id.clone(), profile.clone());
        Ok(profile)
    }
}

impl ProgramCatalog for InMemoryRehabStore {
    fn active_programs(&self) -> Result<Vec<Program>, RepositoryError> {
        let guard = self.programs.lock().expect("program arena poisoned");
        Ok(guard
            .values()
            .filter(|program| program.active)
            .cloned()
            .collect())
    }

    fn find_active_by_category(
        &self,
        category: ProgramCategory,
    ) -> Result<Vec<Program>, RepositoryError> {
        let guard = self.programs.lock().expect("program arena poisoned");
        Ok(guard
            .values()
            .filter(|program| program.active && program.category == category)
            .cloned()
            .collect())
    }
}

impl ResourcePool for InMemoryRehabStore {
    fn eligible_stations(&self) -> Result<Vec<Station>, RepositoryError> {
        let guard = self.stations.lock().expect("station arena poisoned");
        Ok(guard
            .values()
            .filter(|station| station.active && station.current_load < station.capacity)
            .cloned()
            .collect())
    }

    fn eligible_officers(&self) -> Result<Vec<Officer>, RepositoryError> {
        let guard = self.officers.lock().expect("officer arena poisoned");
        Ok(guard
            .values()
            .filter(|officer| officer.active && officer.current_load < officer.max_capacity)
            .cloned()
            .collect())
    }

    fn reserve_station(&self, id: &StationId) -> Result<bool, RepositoryError> {
        let mut guard = self.stations.lock().expect("station arena poisoned");
        let station = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if station.current_load < station.capacity {
            station.current_load += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn reserve_officer(&self, id: &OfficerId) -> Result<bool, RepositoryError> {
        let mut guard = self.officers.lock().expect("officer arena poisoned");
        let officer = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if officer.current_load < officer.max_capacity {
            officer.current_load += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

impl RecommendationStore for InMemoryRehabStore {
    fn insert_recommendation(
        &self,
        recommendation: Recommendation,
    ) -> Result<Recommendation, RepositoryError> {
        let mut guard = self
            .recommendations
            .lock()
            .expect("recommendation arena poisoned");
        if guard.contains_key(&recommendation.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(recommendation.id.clone(), recommendation.clone());
        Ok(recommendation)
    }

    fn recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self
            .recommendations
            .lock()
            .expect("recommendation arena poisoned");
        Ok(guard.get(id).cloned())
    }

    fn recommendations_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Vec<Recommendation>, RepositoryError> {
        let guard = self
            .recommendations
            .lock()
            .expect("recommendation arena poisoned");
        Ok(guard
            .values()
            .filter(|recommendation| &recommendation.inmate_id == inmate_id)
            .cloned()
            .collect())
    }

    fn latest_open_for(
        &self,
        inmate_id: &InmateId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        let guard = self
            .recommendations
            .lock()
            .expect("recommendation arena poisoned");
        Ok(guard
            .values()
            .filter(|recommendation| {
                &recommendation.inmate_id == inmate_id && !recommendation.status.is_terminal()
            })
            .max_by_key(|recommendation| recommendation.created_at)
            .cloned())
    }

    fn set_recommendation_status(
        &self,
        id: &RecommendationId,
        status: RecommendationStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self
            .recommendations
            .lock()
            .expect("recommendation arena poisoned");
        let recommendation = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        recommendation.status = status;
        Ok(())
    }

    fn append_progress(
        &self,
        entry: ProgressLogEntry,
    ) -> Result<ProgressLogEntry, RepositoryError> {
        let mut guard = self.progress.lock().expect("progress arena poisoned");
        guard.push(entry.clone());
        Ok(entry)
    }

    fn progress_for(
        &self,
        id: &RecommendationId,
    ) -> Result<Vec<ProgressLogEntry>, RepositoryError> {
        let guard = self.progress.lock().expect("progress arena poisoned");
        Ok(guard
            .iter()
            .filter(|entry| &entry.recommendation_id == id)
            .cloned()
            .collect())
    }
}

impl CaseFileStore for InMemoryRehabStore {
    fn append_medical_report(
        &self,
        report: MedicalReport,
    ) -> Result<MedicalReport, RepositoryError> {
        let mut guard = self.medical_reports.lock().expect("medical arena poisoned");
        guard.push(report.clone());
        Ok(report)
    }

    fn append_counseling_note(
        &self,
        note: CounselingNote,
    ) -> Result<CounselingNote, RepositoryError> {
        let mut guard = self
            .counseling_notes
            .lock()
            .expect("counseling arena poisoned");
        guard.push(note.clone());
        Ok(note)
    }
}
