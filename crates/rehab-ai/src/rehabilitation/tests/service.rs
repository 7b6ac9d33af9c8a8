use std::sync::Arc;

use super::common::{
    build_service, officer, seeded_store, station, store_with_profile, substance_profile,
    FailingEvents, ScriptedPredictor, StaleSnapshotStore, UnreachablePredictor,
};
use crate::rehabilitation::domain::{
    FeatureMap, FeatureValue, InmateId, OfficerId, ProgramCategory, RecommendationRequest,
    RecommendationStatus, StationId, GENERAL_SUITABILITY_GROUP,
};
use crate::rehabilitation::events::topics;
use crate::rehabilitation::memory::InMemoryRehabStore;
use crate::rehabilitation::predictor::FALLBACK_EXPLANATION;
use crate::rehabilitation::repository::{ProfileStore, RecommendationStore, ResourcePool};
use crate::rehabilitation::service::{RehabilitationError, RehabilitationService};

fn request(inmate: &str) -> RecommendationRequest {
    RecommendationRequest {
        inmate_id: InmateId(inmate.to_string()),
        override_features: None,
        force_regenerate: false,
    }
}

fn force_request(inmate: &str) -> RecommendationRequest {
    RecommendationRequest {
        force_regenerate: true,
        ..request(inmate)
    }
}

#[tokio::test]
async fn unreachable_predictor_degrades_to_the_keyword_rule() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, _store, _events) = build_service(UnreachablePredictor, store);

    let recommendation = service
        .generate(request("INM001"))
        .await
        .expect("degraded mode still produces a recommendation");

    assert!(recommendation.degraded);
    assert_eq!(recommendation.program_category, ProgramCategory::SubstanceAbuse);
    assert_eq!(recommendation.duration_weeks, 12);
    assert_eq!(recommendation.confidence, 0.6);
    assert_eq!(recommendation.rationale, FALLBACK_EXPLANATION);
    assert_eq!(recommendation.status, RecommendationStatus::Pending);
}

#[tokio::test]
async fn generate_creates_a_default_profile_when_absent() {
    let (service, store, _events) =
        build_service(UnreachablePredictor, seeded_store());

    let recommendation = service
        .generate(request("INM777"))
        .await
        .expect("profile is created lazily");

    let profile = store
        .profile(&InmateId("INM777".to_string()))
        .expect("store readable")
        .expect("profile was persisted");
    assert_eq!(profile.suitability_group, GENERAL_SUITABILITY_GROUP);
    assert_eq!(profile.risk_score, 0.5);
    // The "general" group falls through to vocational training.
    assert_eq!(recommendation.program_category, ProgramCategory::Vocational);
    assert_eq!(recommendation.duration_weeks, 16);
}

#[tokio::test]
async fn generate_assigns_station_and_officer_and_reserves_capacity() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, store, events) = build_service(UnreachablePredictor, store);

    let recommendation = service
        .generate(request("INM001"))
        .await
        .expect("recommendation generates");

    let station_id = recommendation.station.clone().expect("station assigned");
    let officer_id = recommendation.officer.clone().expect("officer assigned");
    assert_eq!(store.station_load(&station_id), Some(1), "reservation committed");
    assert_eq!(store.officer_load(&officer_id), Some(1));

    let published = events.events();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, topics::RECOMMENDATION_CREATED);
    assert_eq!(published[0].inmate_id, InmateId("INM001".to_string()));
}

#[tokio::test]
async fn unknown_program_type_fails_without_persisting() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, store, events) =
        build_service(ScriptedPredictor::recommending("aromatherapy", 4), store);

    match service.generate(force_request("INM001")).await {
        Err(RehabilitationError::NoSuitableProgram { category }) => {
            assert_eq!(category, "aromatherapy");
        }
        other => panic!("expected NoSuitableProgram, got {other:?}"),
    }

    let rows = store
        .recommendations_for(&InmateId("INM001".to_string()))
        .expect("store readable");
    assert!(rows.is_empty(), "no partial recommendation is persisted");
    assert!(events.events().is_empty());
}

#[tokio::test]
async fn known_category_without_active_catalog_entry_is_rejected() {
    let store = Arc::new(InMemoryRehabStore::new());
    store
        .save_profile(substance_profile("INM001"))
        .expect("profile saves");
    let (service, _store, _events) =
        build_service(ScriptedPredictor::recommending("education", 10), store);

    match service.generate(force_request("INM001")).await {
        Err(RehabilitationError::NoSuitableProgram { category }) => {
            assert_eq!(category, "education");
        }
        other => panic!("expected NoSuitableProgram, got {other:?}"),
    }
}

#[tokio::test]
async fn force_regenerate_controls_reuse_of_open_recommendations() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, _store, _events) = build_service(UnreachablePredictor, store);

    let first = service.generate(request("INM001")).await.expect("first");
    let reused = service.generate(request("INM001")).await.expect("reused");
    assert_eq!(first.id, reused.id, "open recommendation is reused");

    let fresh = service
        .generate(force_request("INM001"))
        .await
        .expect("forced regeneration");
    assert_ne!(first.id, fresh.id, "forced run always re-enters the pipeline");
}

#[tokio::test]
async fn override_features_steer_zone_without_touching_the_profile() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, store, _events) = build_service(UnreachablePredictor, store);

    let mut overrides = FeatureMap::new();
    overrides.insert(
        "zone".to_string(),
        FeatureValue::Text("zoneB".to_string()),
    );
    let recommendation = service
        .generate(RecommendationRequest {
            inmate_id: InmateId("INM001".to_string()),
            override_features: Some(overrides),
            force_regenerate: true,
        })
        .await
        .expect("recommendation generates");

    assert_eq!(
        recommendation.station,
        Some(StationId("st-b".to_string())),
        "override zone prefers the zoneB station"
    );

    let profile = store
        .profile(&InmateId("INM001".to_string()))
        .expect("store readable")
        .expect("profile present");
    assert!(
        !profile.features.contains_key("zone"),
        "override features are per-call only"
    );
}

#[tokio::test]
async fn assignment_gap_is_recorded_but_does_not_block_creation() {
    let store = Arc::new(InMemoryRehabStore::new());
    store
        .save_profile(substance_profile("INM001"))
        .expect("profile saves");
    store.seed_program(super::common::program(
        "prog-sa",
        ProgramCategory::SubstanceAbuse,
        "Drug Rehabilitation Program",
        12,
    ));
    let (service, _store, events) = build_service(UnreachablePredictor, store);

    let recommendation = service
        .generate(request("INM001"))
        .await
        .expect("gap still succeeds");

    assert!(recommendation.station.is_none());
    assert!(recommendation.officer.is_none());
    assert!(recommendation.has_assignment_gap());
    assert_eq!(events.events().len(), 1, "creation event still fires");
}

#[tokio::test]
async fn officer_filter_miss_leaves_officer_unassigned() {
    let store = Arc::new(InMemoryRehabStore::new());
    store
        .save_profile(substance_profile("INM001"))
        .expect("profile saves");
    store.seed_program(super::common::program(
        "prog-sa",
        ProgramCategory::SubstanceAbuse,
        "Drug Rehabilitation Program",
        12,
    ));
    store.seed_station(station(
        "st-a",
        Some("zoneA"),
        10,
        0,
        &["substance_abuse"],
        Some(0.8),
    ));
    // Only officer on staff is pinned to a different station.
    store.seed_officer(officer(
        "off-9",
        Some("st-z"),
        5,
        0,
        &["substance_abuse"],
        Some(0.9),
    ));
    let (service, _store, _events) = build_service(UnreachablePredictor, store);

    let recommendation = service
        .generate(request("INM001"))
        .await
        .expect("recommendation generates");

    assert_eq!(recommendation.station, Some(StationId("st-a".to_string())));
    assert!(
        recommendation.officer.is_none(),
        "station filter yields a hard miss, not an unfiltered fallback"
    );
}

#[tokio::test]
async fn full_station_is_not_eligible_for_the_next_request() {
    let store = Arc::new(InMemoryRehabStore::new());
    store
        .save_profile(substance_profile("INM001"))
        .expect("profile saves");
    store.seed_program(super::common::program(
        "prog-sa",
        ProgramCategory::SubstanceAbuse,
        "Drug Rehabilitation Program",
        12,
    ));
    // Best-scoring station has a single slot; the second generate call never
    // sees it as a candidate.
    store.seed_station(station(
        "st-best",
        Some("zoneA"),
        1,
        0,
        &["substance_abuse"],
        Some(0.9),
    ));
    store.seed_station(station(
        "st-backup",
        Some("zoneA"),
        10,
        0,
        &["substance_abuse"],
        Some(0.4),
    ));
    let (service, store, _events) = build_service(UnreachablePredictor, store);

    let first = service
        .generate(force_request("INM001"))
        .await
        .expect("first recommendation");
    assert_eq!(first.station, Some(StationId("st-best".to_string())));

    let second = service
        .generate(force_request("INM001"))
        .await
        .expect("second recommendation");
    assert_eq!(
        second.station,
        Some(StationId("st-backup".to_string())),
        "full best station is no longer eligible"
    );
    assert_eq!(store.station_load(&StationId("st-best".to_string())), Some(1));
}

#[tokio::test]
async fn lost_reservation_drops_to_the_runner_up_in_one_pass() {
    // A stale snapshot makes the scorer see a slot that another worker has
    // already committed; the reservation step refuses it and the selection
    // loop settles for the runner-up.
    let inner = Arc::new(InMemoryRehabStore::new());
    inner
        .save_profile(substance_profile("INM001"))
        .expect("profile saves");
    inner.seed_program(super::common::program(
        "prog-sa",
        ProgramCategory::SubstanceAbuse,
        "Drug Rehabilitation Program",
        12,
    ));
    inner.seed_station(station(
        "st-best",
        Some("zoneA"),
        1,
        0,
        &["substance_abuse"],
        Some(0.9),
    ));
    inner.seed_station(station(
        "st-backup",
        Some("zoneA"),
        10,
        0,
        &["substance_abuse"],
        Some(0.4),
    ));
    let store = Arc::new(StaleSnapshotStore::capture(inner.clone()));

    // Competing worker takes the last slot after the snapshot was captured.
    assert!(inner
        .reserve_station(&StationId("st-best".to_string()))
        .expect("reservation applies"));

    let events = Arc::new(super::common::MemoryEvents::default());
    let service = RehabilitationService::new(UnreachablePredictor, store, events);

    let recommendation = service
        .generate(force_request("INM001"))
        .await
        .expect("recommendation generates");

    assert_eq!(
        recommendation.station,
        Some(StationId("st-backup".to_string())),
        "guarded reservation refuses the stale winner"
    );
    assert_eq!(
        inner.station_load(&StationId("st-best".to_string())),
        Some(1),
        "capacity invariant holds"
    );
}

#[tokio::test]
async fn empty_inmate_id_is_rejected() {
    let (service, _store, _events) =
        build_service(UnreachablePredictor, seeded_store());

    match service.generate(request("  ")).await {
        Err(RehabilitationError::EmptyInmateId) => {}
        other => panic!("expected EmptyInmateId, got {other:?}"),
    }
}

#[tokio::test]
async fn event_publish_failure_never_fails_the_operation() {
    let store = store_with_profile(substance_profile("INM001"));
    let events = Arc::new(FailingEvents);
    let service = RehabilitationService::new(UnreachablePredictor, store, events);

    service
        .generate(request("INM001"))
        .await
        .expect("publish failure is absorbed");
}

#[tokio::test]
async fn profile_lookup_surfaces_not_found() {
    let (service, _store, _events) =
        build_service(UnreachablePredictor, seeded_store());

    match service.profile(&InmateId("ghost".to_string())) {
        Err(RehabilitationError::ProfileNotFound(id)) => {
            assert_eq!(id, InmateId("ghost".to_string()));
        }
        other => panic!("expected ProfileNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn persisted_recommendation_round_trips_identically() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, _store, _events) = build_service(UnreachablePredictor, store);

    let created = service
        .generate(request("INM001"))
        .await
        .expect("recommendation generates");
    let reloaded = service
        .recommendation(&created.id)
        .expect("created row reloads");

    assert_eq!(created, reloaded);
}

#[tokio::test]
async fn scripted_predictor_result_is_recorded_verbatim() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, _store, _events) =
        build_service(ScriptedPredictor::recommending("mental_health", 6), store);

    let recommendation = service
        .generate(force_request("INM001"))
        .await
        .expect("recommendation generates");

    assert!(!recommendation.degraded);
    assert_eq!(recommendation.program_category, ProgramCategory::MentalHealth);
    assert_eq!(recommendation.duration_weeks, 6);
    assert_eq!(recommendation.confidence, 0.85);
    assert_eq!(recommendation.rationale, "model consensus");
}

#[tokio::test]
async fn medical_report_touches_profile_and_publishes() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, store, events) = build_service(UnreachablePredictor, store);
    let before = store
        .profile(&InmateId("INM001".to_string()))
        .expect("store readable")
        .expect("profile present")
        .last_updated;

    let mut vitals = FeatureMap::new();
    vitals.insert("heart_rate".to_string(), FeatureValue::Number(72.0));
    let report = service
        .add_medical_report(
            InmateId("INM001".to_string()),
            OfficerId("off-1".to_string()),
            vitals,
            "stable".to_string(),
            "routine check".to_string(),
        )
        .expect("report recorded");

    assert_eq!(report.inmate_id, InmateId("INM001".to_string()));
    let after = store
        .profile(&InmateId("INM001".to_string()))
        .expect("store readable")
        .expect("profile present")
        .last_updated;
    assert!(after >= before);
    assert_eq!(
        events.events().last().map(|event| event.topic.clone()),
        Some(topics::MEDICAL_REPORT_ADDED.to_string())
    );
    assert_eq!(
        store
            .medical_reports_for(&InmateId("INM001".to_string()))
            .len(),
        1
    );
}

#[tokio::test]
async fn counseling_note_summary_degrades_when_analysis_is_down() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, store, events) = build_service(UnreachablePredictor, store);

    let note = service
        .add_counseling_note(
            InmateId("INM001".to_string()),
            OfficerId("coun-7".to_string()),
            "productive session".to_string(),
            Some(0.8),
        )
        .await
        .expect("note recorded");

    assert_eq!(note.summary, crate::rehabilitation::ANALYSIS_UNAVAILABLE);
    assert_eq!(
        events.events().last().map(|event| event.topic.clone()),
        Some(topics::COUNSELING_NOTE_ADDED.to_string())
    );
    assert_eq!(
        store
            .counseling_notes_for(&InmateId("INM001".to_string()))
            .len(),
        1
    );
}

#[tokio::test]
async fn counseling_note_uses_predictor_summary_when_reachable() {
    let store = store_with_profile(substance_profile("INM001"));
    let (service, _store, _events) =
        build_service(ScriptedPredictor::recommending("vocational", 16), store);

    let note = service
        .add_counseling_note(
            InmateId("INM001".to_string()),
            OfficerId("coun-7".to_string()),
            "productive session".to_string(),
            None,
        )
        .await
        .expect("note recorded");

    assert_eq!(note.summary, "session trending positive");
}
