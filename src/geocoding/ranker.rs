//! Ranking of public geocoder candidates.
//!
//! A best-effort heuristic: it prefers places over administrative boundaries
//! and names that contain the query, but it does not guarantee a correct pick.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::Coordinates;
use crate::models::lenient;

/// One search result from the public geocoder
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct GeocodeCandidate {
    #[serde(deserialize_with = "lenient::f64_required")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient::f64_required")]
    pub lon: f64,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "type", default)]
    pub place_type: String,
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub importance: Option<f64>,
    #[serde(default)]
    pub address: Option<HashMap<String, String>>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl GeocodeCandidate {
    /// Longitude-first coordinates of the candidate
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::from_lat_lon(self.lat, self.lon)
    }

    fn has_address_part(&self, keys: &[&str]) -> bool {
        self.address.as_ref().is_some_and(|address| {
            keys.iter()
                .any(|key| address.get(*key).is_some_and(|v| !v.trim().is_empty()))
        })
    }
}

const CITY_TYPES: [&str; 3] = ["city", "town", "administrative"];
const SIGHT_TYPES: [&str; 2] = ["tourism", "attraction"];
const BUILDING_TYPES: [&str; 2] = ["building", "place_of_worship"];

/// Score of the candidate at `index` for `query`
#[must_use]
pub fn score_candidate(candidate: &GeocodeCandidate, index: usize, query: &str) -> f64 {
    let mut score = 100.0 - index as f64;

    if let Some(importance) = candidate.importance {
        score += importance * 50.0;
    }

    let place_type = candidate.place_type.as_str();
    if CITY_TYPES.contains(&place_type) {
        score += 30.0;
    } else if SIGHT_TYPES.contains(&place_type) {
        score += 25.0;
    } else if BUILDING_TYPES.contains(&place_type) {
        score += 20.0;
    }

    if candidate
        .display_name
        .to_lowercase()
        .contains(&query.to_lowercase())
    {
        score += 40.0;
    }

    if candidate.address.is_some() {
        score += 10.0;
        if candidate.has_address_part(&["city", "town", "state"]) {
            score += 15.0;
        }
        if candidate.has_address_part(&["country"]) {
            score += 10.0;
        }
    }

    // boundaries rarely pinpoint a place
    if candidate.class.as_deref() == Some("boundary") {
        score -= 20.0;
    }

    score
}

/// Pick the highest scoring candidate. Ties go to the earlier candidate.
#[must_use]
pub fn select_best<'a>(
    candidates: &'a [GeocodeCandidate],
    query: &str,
) -> Option<&'a GeocodeCandidate> {
    if candidates.len() == 1 {
        return candidates.first();
    }

    let mut best: Option<(&GeocodeCandidate, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = score_candidate(candidate, index, query);
        tracing::debug!(
            "Candidate {}: {} (score: {:.1})",
            index + 1,
            candidate.display_name.chars().take(60).collect::<String>(),
            score
        );
        match best {
            Some((_, best_score)) if score <= best_score => {}
            _ => best = Some((candidate, score)),
        }
    }

    best.map(|(candidate, _)| candidate)
}
