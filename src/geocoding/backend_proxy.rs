use async_trait::async_trait;

use super::{GeocodeStage, Place};
use crate::backend::BackendClient;
use crate::models::Coordinates;
use crate::{Result, TravelMapError};

const STAGE: &str = "backend-proxy";

/// Server-side geocoding through the backend's `/map/geocode` endpoint
pub struct BackendProxyStage {
    backend: BackendClient,
}

impl BackendProxyStage {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl GeocodeStage for BackendProxyStage {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        self.locate(address).await.map(|place| place.coordinates)
    }

    async fn locate(&self, address: &str) -> Result<Place> {
        let result = self
            .backend
            .geocode(address)
            .await
            .map_err(|e| TravelMapError::stage(STAGE, e.to_string()))?;

        tracing::debug!(
            "Backend proxy matched {:?} ({:?})",
            result.name,
            result.formatted_address
        );
        Ok(Place {
            coordinates: result.coordinates(),
            name: result.name,
            formatted_address: result.formatted_address,
            stage: STAGE,
        })
    }
}
