//! Location Resolution Module
//!
//! Turns free-text place descriptions into coordinates by walking an ordered
//! list of geocoding stages until one succeeds:
//!
//! 1. the map provider's geocoder, bounded by a timeout
//! 2. the built-in city table (exact match only)
//! 3. the backend geocoding proxy
//! 4. the public geocoder, with candidate ranking
//!
//! A stage failure is never fatal on its own; only exhausting every stage is.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::backend::BackendClient;
use crate::config::TravelMapConfig;
use crate::models::Coordinates;
use crate::{Result, TravelMapError};

pub mod backend_proxy;
pub mod city_table;
pub mod nominatim;
pub mod ranker;
pub mod sdk;

pub use backend_proxy::BackendProxyStage;
pub use city_table::StaticCityTable;
pub use nominatim::NominatimStage;
pub use ranker::{GeocodeCandidate, score_candidate, select_best};
pub use sdk::{AmapGeocoder, MapSdkGeocoder, SdkStage};

/// A resolved address, with the naming the stage that found it could offer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Place {
    pub coordinates: Coordinates,
    /// Point-of-interest name, when the geocoder knows one
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    /// Stage that produced the match
    pub stage: &'static str,
}

impl Place {
    #[must_use]
    pub fn at(coordinates: Coordinates) -> Self {
        Self {
            coordinates,
            name: None,
            formatted_address: None,
            stage: "",
        }
    }
}

/// One strategy in the resolution chain
#[async_trait]
pub trait GeocodeStage: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Coordinates for `address`, or a stage-local error
    async fn geocode(&self, address: &str) -> Result<Coordinates>;

    /// Like [`GeocodeStage::geocode`], keeping any naming the stage has
    async fn locate(&self, address: &str) -> Result<Place> {
        Ok(Place::at(self.geocode(address).await?))
    }
}

/// Service for resolving free-text addresses
pub struct GeocodeResolver {
    stages: Vec<Box<dyn GeocodeStage>>,
}

impl GeocodeResolver {
    /// Resolver over an explicit, ordered list of stages
    pub fn new(stages: Vec<Box<dyn GeocodeStage>>) -> Self {
        Self { stages }
    }

    /// The standard four-stage chain
    pub fn from_config(config: &TravelMapConfig, backend: BackendClient) -> Result<Self> {
        let geocoding = &config.geocoding;

        let sdk_geocoder: Option<Box<dyn MapSdkGeocoder>> = match &geocoding.amap_key {
            Some(key) => Some(Box::new(AmapGeocoder::new(
                &geocoding.amap_base_url,
                key,
                &geocoding.user_agent,
            )?)),
            None => {
                debug!("No map provider key configured, provider geocoding disabled");
                None
            }
        };

        Ok(Self::new(vec![
            Box::new(SdkStage::new(sdk_geocoder, geocoding.sdk_timeout_ms)),
            Box::new(StaticCityTable),
            Box::new(BackendProxyStage::new(backend)),
            Box::new(NominatimStage::new(geocoding)?),
        ]))
    }

    /// Stage names in the order they are tried
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Resolve an address, trying each stage in turn
    pub async fn resolve(&self, address: &str) -> Result<Coordinates> {
        self.locate(address).await.map(|place| place.coordinates)
    }

    /// Like [`GeocodeResolver::resolve`], keeping the matched place's naming
    #[instrument(skip(self))]
    pub async fn locate(&self, address: &str) -> Result<Place> {
        if address.trim().is_empty() {
            return Err(TravelMapError::unresolvable(address));
        }

        for stage in &self.stages {
            debug!("Trying {} for {}", stage.name(), address);
            match stage.locate(address).await {
                Ok(place) if place.coordinates.is_valid() => {
                    info!(
                        "Resolved {} via {} at ({:.6}, {:.6})",
                        address,
                        stage.name(),
                        place.coordinates.lng,
                        place.coordinates.lat
                    );
                    return Ok(Place {
                        stage: stage.name(),
                        ..place
                    });
                }
                Ok(place) => {
                    warn!(
                        "{} returned invalid coordinates {} for {}",
                        stage.name(),
                        place.coordinates,
                        address
                    );
                }
                Err(e) => {
                    warn!("{} failed for {}: {}", stage.name(), address, e);
                }
            }
        }

        warn!("All geocoding stages failed for {}", address);
        Err(TravelMapError::unresolvable(address))
    }
}
