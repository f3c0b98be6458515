//! Public geocoder stage (OpenStreetMap Nominatim).
//!
//! Last resort of the chain and the only stage that covers arbitrary
//! international places. Results come back latitude first.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

use super::GeocodeStage;
use super::ranker::{GeocodeCandidate, select_best};
use crate::config::GeocodingConfig;
use crate::models::Coordinates;
use crate::{Result, TravelMapError};

const STAGE: &str = "public-geocoder";

pub struct NominatimStage {
    client: reqwest::Client,
    base_url: String,
    accept_language: String,
    limit: u32,
}

impl NominatimStage {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        // the public instance requires an identifying user agent
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.nominatim_base_url.trim_end_matches('/').to_string(),
            accept_language: config.accept_language.clone(),
            limit: config.candidate_limit,
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?format=json&q={}&limit={}&addressdetails=1&dedupe=0&accept-language={}",
            self.base_url,
            urlencoding::encode(query),
            self.limit,
            urlencoding::encode(&self.accept_language)
        )
    }

    /// Raw candidates for `query`, in the geocoder's own order
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>> {
        let url = self.search_url(query);
        debug!("Public geocoder request URL: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(TravelMapError::api(format!(
                "public geocoder returned {}",
                response.status()
            )));
        }

        let candidates: Vec<GeocodeCandidate> = response.json().await?;
        debug!("Public geocoder returned {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// Coordinates of the best ranked candidate
pub fn best_coordinates(candidates: &[GeocodeCandidate], query: &str) -> Result<Coordinates> {
    select_best(candidates, query)
        .map(GeocodeCandidate::coordinates)
        .ok_or_else(|| TravelMapError::stage(STAGE, "no candidates found"))
}

#[async_trait]
impl GeocodeStage for NominatimStage {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let candidates = self
            .search(address)
            .await
            .map_err(|e| TravelMapError::stage(STAGE, e.to_string()))?;
        best_coordinates(&candidates, address)
    }
}
