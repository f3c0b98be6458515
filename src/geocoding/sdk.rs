//! Map provider geocoding, raced against a timeout.
//!
//! The provider is slow to answer for some inputs; after the timeout the
//! chain moves on and whatever the provider returns later is ignored.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::GeocodeStage;
use crate::models::Coordinates;
use crate::routing::polyline::parse_pair;
use crate::{Result, TravelMapError};

const STAGE: &str = "map-sdk";

/// A map provider's geocoder
#[async_trait]
pub trait MapSdkGeocoder: Send + Sync {
    async fn get_location(&self, address: &str) -> Result<Coordinates>;
}

/// First resolver stage: the provider geocoder with a bounded wait
pub struct SdkStage {
    geocoder: Option<Box<dyn MapSdkGeocoder>>,
    timeout: Duration,
}

impl SdkStage {
    pub fn new(geocoder: Option<Box<dyn MapSdkGeocoder>>, timeout_ms: u64) -> Self {
        Self {
            geocoder,
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl GeocodeStage for SdkStage {
    fn name(&self) -> &'static str {
        STAGE
    }

    async fn geocode(&self, address: &str) -> Result<Coordinates> {
        let Some(geocoder) = &self.geocoder else {
            return Err(TravelMapError::stage(STAGE, "map provider not configured"));
        };

        match tokio::time::timeout(self.timeout, geocoder.get_location(address)).await {
            Ok(result) => result.map_err(|e| TravelMapError::stage(STAGE, e.to_string())),
            Err(_) => Err(TravelMapError::stage(
                STAGE,
                format!("no response within {} ms", self.timeout.as_millis()),
            )),
        }
    }
}

/// AMap web-service geocoder
pub struct AmapGeocoder {
    client: reqwest::Client,
    base_url: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct AmapResponse {
    status: String,
    #[serde(default)]
    info: Option<String>,
    #[serde(default)]
    geocodes: Vec<AmapGeocode>,
}

#[derive(Debug, Deserialize)]
struct AmapGeocode {
    location: String,
}

fn coordinates_from_response(response: &AmapResponse) -> Result<Coordinates> {
    if response.status != "1" {
        return Err(TravelMapError::api(format!(
            "geocoding failed: {}",
            response.info.as_deref().unwrap_or("unknown error")
        )));
    }

    let geocode = response
        .geocodes
        .first()
        .ok_or_else(|| TravelMapError::api("address not found"))?;

    parse_pair(&geocode.location).ok_or_else(|| {
        TravelMapError::api(format!("malformed location {:?}", geocode.location))
    })
}

impl AmapGeocoder {
    pub fn new(base_url: &str, key: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }

    fn geocode_url(&self, address: &str) -> String {
        format!(
            "{}/v3/geocode/geo?key={}&address={}",
            self.base_url,
            urlencoding::encode(&self.key),
            urlencoding::encode(address)
        )
    }
}

#[async_trait]
impl MapSdkGeocoder for AmapGeocoder {
    async fn get_location(&self, address: &str) -> Result<Coordinates> {
        debug!("Map provider geocoding: {}", address);
        let response = self.client.get(self.geocode_url(address)).send().await?;
        if !response.status().is_success() {
            return Err(TravelMapError::api(format!(
                "map provider returned {}",
                response.status()
            )));
        }
        let body: AmapResponse = response.json().await?;
        coordinates_from_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl MapSdkGeocoder for Slow {
        async fn get_location(&self, _address: &str) -> Result<Coordinates> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Coordinates::new(1.0, 1.0))
        }
    }

    struct Instant;

    #[async_trait]
    impl MapSdkGeocoder for Instant {
        async fn get_location(&self, _address: &str) -> Result<Coordinates> {
            Ok(Coordinates::new(116.397, 39.917))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_stage_failure() {
        let stage = SdkStage::new(Some(Box::new(Slow)), 20);
        let err = stage.geocode("故宫").await.unwrap_err();
        assert!(err.to_string().contains("no response within 20 ms"));
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails() {
        let stage = SdkStage::new(None, 3000);
        assert!(matches!(
            stage.geocode("故宫").await,
            Err(TravelMapError::StageFailed { stage: "map-sdk", .. })
        ));
    }

    #[tokio::test]
    async fn test_fast_provider_succeeds() {
        let stage = SdkStage::new(Some(Box::new(Instant)), 3000);
        assert_eq!(
            stage.geocode("故宫").await.unwrap(),
            Coordinates::new(116.397, 39.917)
        );
    }

    #[test]
    fn test_response_parsing() {
        let ok: AmapResponse = serde_json::from_str(
            r#"{"status": "1", "info": "OK", "count": "1", "geocodes": [{"location": "116.397128,39.916527"}]}"#,
        )
        .unwrap();
        assert_eq!(
            coordinates_from_response(&ok).unwrap(),
            Coordinates::new(116.397128, 39.916527)
        );

        let empty: AmapResponse =
            serde_json::from_str(r#"{"status": "1", "count": "0", "geocodes": []}"#).unwrap();
        assert!(coordinates_from_response(&empty).is_err());

        let denied: AmapResponse =
            serde_json::from_str(r#"{"status": "0", "info": "INVALID_USER_KEY"}"#).unwrap();
        let err = coordinates_from_response(&denied).unwrap_err();
        assert!(err.to_string().contains("INVALID_USER_KEY"));
    }

    #[test]
    fn test_geocode_url_is_encoded() {
        let geocoder = AmapGeocoder::new("https://restapi.amap.com/", "k3y", "test").unwrap();
        assert_eq!(
            geocoder.geocode_url("北京 故宫"),
            "https://restapi.amap.com/v3/geocode/geo?key=k3y&address=%E5%8C%97%E4%BA%AC%20%E6%95%85%E5%AE%AB"
        );
    }
}
