use super::domain::{Officer, Station, StationId};

// Weights for the station scoring model.
const W_SPECIALIZATION: f64 = 0.4;
const W_PROXIMITY: f64 = 0.2;
const W_LOAD: f64 = 0.2;
const W_SUCCESS_RATE: f64 = 0.2;

// Officer scoring drops the proximity term and renormalizes the remainder.
const W_OFFICER_SPECIALIZATION: f64 = 0.4;
const W_OFFICER_LOAD: f64 = 0.3;
const W_OFFICER_SUCCESS_RATE: f64 = 0.3;

/// Stateless selector ranking stations and officers by a weighted composite
/// of specialization match, proximity, remaining load headroom, and
/// historical success rate. Scoring only reads candidate state; reservation
/// of the winner is a separate, guarded step owned by the resource pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssignmentEngine;

impl AssignmentEngine {
    /// Pick the best eligible station for the need set, or `None` when the
    /// pool is empty. An empty result is an expected outcome, not an error.
    pub fn select_station<'a>(
        &self,
        candidates: &'a [Station],
        needs: &[String],
        zone: Option<&str>,
    ) -> Option<&'a Station> {
        let mut best: Option<(f64, &Station)> = None;
        for station in candidates {
            if !station.active || station.current_load >= station.capacity {
                continue;
            }
            let score = self.station_score(station, needs, zone);
            // Strict comparison keeps the first-seen candidate on ties.
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, station));
            }
        }
        best.map(|(_, station)| station)
    }

    /// Pick the best eligible officer for the need set. When a station has
    /// already been chosen, only officers pinned to it are considered; an
    /// empty filtered pool is a hard miss rather than a reason to widen the
    /// search.
    pub fn select_officer<'a>(
        &self,
        candidates: &'a [Officer],
        needs: &[String],
        station: Option<&StationId>,
    ) -> Option<&'a Officer> {
        let mut best: Option<(f64, &Officer)> = None;
        for officer in candidates {
            if !officer.active || officer.current_load >= officer.max_capacity {
                continue;
            }
            if let Some(station_id) = station {
                if officer.assigned_station.as_ref() != Some(station_id) {
                    continue;
                }
            }
            let score = self.officer_score(officer, needs);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, officer));
            }
        }
        best.map(|(_, officer)| officer)
    }

    /// Composite station score:
    /// `0.4*specialization + 0.2*proximity + 0.2*load + 0.2*success`.
    pub fn station_score(&self, station: &Station, needs: &[String], zone: Option<&str>) -> f64 {
        let specialization = specialization_match(&station.specializations, needs);
        let proximity = proximity_score(station.zone.as_deref(), zone);
        let load = load_score(station.current_load, station.capacity);
        let success = station.success_rate.unwrap_or(0.5);

        W_SPECIALIZATION * specialization
            + W_PROXIMITY * proximity
            + W_LOAD * load
            + W_SUCCESS_RATE * success
    }

    /// Composite officer score: `0.4*specialization + 0.3*load + 0.3*success`.
    pub fn officer_score(&self, officer: &Officer, needs: &[String]) -> f64 {
        let specialization = specialization_match(&officer.specializations, needs);
        let load = load_score(officer.current_load, officer.max_capacity);
        let success = officer.success_rate.unwrap_or(0.5);

        W_OFFICER_SPECIALIZATION * specialization
            + W_OFFICER_LOAD * load
            + W_OFFICER_SUCCESS_RATE * success
    }
}

/// Fraction of needs covered by the candidate's specializations,
/// case-insensitive. Empty needs are neutral (0.5); a candidate with no
/// specializations scores 0.0 regardless of needs.
pub fn specialization_match<'a, I>(specializations: I, needs: &[String]) -> f64
where
    I: IntoIterator<Item = &'a String>,
{
    let specializations: Vec<&String> = specializations.into_iter().collect();
    if needs.is_empty() {
        return 0.5;
    }
    if specializations.is_empty() {
        return 0.0;
    }

    let matched = needs
        .iter()
        .filter(|need| {
            specializations
                .iter()
                .any(|spec| spec.eq_ignore_ascii_case(need))
        })
        .count();

    matched as f64 / needs.len() as f64
}

/// 1.0 on a case-insensitive zone match, 0.3 on a mismatch, 0.5 when either
/// side has no zone on record.
pub fn proximity_score(station_zone: Option<&str>, requested_zone: Option<&str>) -> f64 {
    match (station_zone, requested_zone) {
        (Some(station), Some(requested)) => {
            if station.eq_ignore_ascii_case(requested) {
                1.0
            } else {
                0.3
            }
        }
        _ => 0.5,
    }
}

/// Remaining headroom as `1 - current_load/capacity`, clamped to [0, 1].
/// Zero capacity scores 0.0; such resources are also excluded from candidacy
/// entirely by the eligibility filter.
pub fn load_score(current_load: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    let utilization = f64::from(current_load) / f64::from(capacity);
    (1.0 - utilization).clamp(0.0, 1.0)
}
