use std::sync::Arc;

use clap::Args;
use rehab_ai::error::AppError;
use rehab_ai::rehabilitation::{
    FeatureMap, FeatureValue, InmateId, OfficerId, ProfileStore, ProgressRequest,
    ProgressStatus, RecommendationRequest, RehabProfile, RehabilitationError,
    RehabilitationService, TracingEventPublisher,
};

use crate::infra::{seeded_store, OfflinePredictor};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Inmate identifier to generate a recommendation for
    #[arg(long, default_value = "INM001")]
    pub(crate) inmate: String,
    /// Suitability group recorded on the demo profile
    #[arg(long, default_value = "substance_abuse")]
    pub(crate) group: String,
    /// Risk score recorded on the demo profile (0.0 to 1.0)
    #[arg(long, default_value_t = 0.65)]
    pub(crate) risk: f64,
    /// Preferred zone used for station proximity scoring
    #[arg(long)]
    pub(crate) zone: Option<String>,
}

/// End-to-end offline demo: seeds the in-memory facility, generates a
/// recommendation through the rule-based degraded mode, and walks the
/// progress log through to automatic completion.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = seeded_store();

    let mut features = FeatureMap::new();
    if let Some(zone) = &args.zone {
        features.insert("zone".to_string(), FeatureValue::Text(zone.clone()));
    }
    let mut profile = RehabProfile::initial(InmateId(args.inmate.clone()), features);
    profile.suitability_group = args.group.clone();
    profile.risk_score = args.risk;
    store
        .save_profile(profile)
        .map_err(RehabilitationError::from)?;

    let events = Arc::new(TracingEventPublisher);
    let service = RehabilitationService::new(OfflinePredictor, store.clone(), events);

    println!("=== Rehabilitation Recommendation Demo ===");
    println!(
        "inmate {} / group {} / risk {:.2}",
        args.inmate, args.group, args.risk
    );

    let recommendation = service
        .generate(RecommendationRequest {
            inmate_id: InmateId(args.inmate.clone()),
            override_features: None,
            force_regenerate: true,
        })
        .await?;

    println!();
    println!("recommendation {}", recommendation.id);
    println!("  program:    {} ({})", recommendation.program.0, recommendation.program_category.label());
    println!("  duration:   {} weeks", recommendation.duration_weeks);
    println!("  confidence: {:.2}", recommendation.confidence);
    println!("  degraded:   {}", recommendation.degraded);
    match (&recommendation.station, &recommendation.officer) {
        (Some(station), Some(officer)) => {
            println!("  station:    {station}");
            println!("  officer:    {officer}");
            println!(
                "  loads:      station {:?}, officer {:?}",
                store.station_load(station),
                store.officer_load(officer)
            );
        }
        _ => println!("  assignment: gap (no station and/or officer available)"),
    }
    println!("  rationale:  {}", recommendation.rationale);

    println!();
    println!("logging progress...");
    for (status, percentage) in [
        (ProgressStatus::NotStarted, 0),
        (ProgressStatus::OnTrack, 50),
        (ProgressStatus::Completed, 100),
    ] {
        let entry = service.log_progress(ProgressRequest {
            recommendation_id: recommendation.id.clone(),
            status,
            progress_percentage: Some(percentage),
            notes: format!("demo checkpoint at {percentage}%"),
            recorded_by: OfficerId("off-ramirez".to_string()),
        })?;
        println!("  {} -> {}%", entry.status.label(), percentage);
    }

    let completed = service.recommendation(&recommendation.id)?;
    println!();
    println!("final status: {}", completed.status.label());

    Ok(())
}
