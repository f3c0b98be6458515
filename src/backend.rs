//! HTTP client for the travel planning backend.
//!
//! Covers the map endpoints (geocoding proxy, driving routes) and the plan
//! store. The streamed plan generation lives in [`crate::plan_stream`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::BackendConfig;
use crate::models::{Coordinates, PlanDocument, lenient};
use crate::routing::RouteProvider;
use crate::{Result, TravelMapError};

/// Backend API client
#[derive(Clone)]
pub struct BackendClient {
    /// JSON calls, retried on transient failures
    http: ClientWithMiddleware,
    /// Long-lived streaming calls, never retried
    pub(crate) stream_http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeocodeRequest<'a> {
    address: &'a str,
}

/// Response of `POST /map/geocode`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProxyGeocode {
    #[serde(deserialize_with = "lenient::f64_required")]
    pub lng: f64,
    #[serde(deserialize_with = "lenient::f64_required")]
    pub lat: f64,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub formatted_address: Option<String>,
}

impl ProxyGeocode {
    #[must_use]
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lng, self.lat)
    }
}

#[derive(Debug, Serialize, PartialEq)]
struct RouteRequest {
    origin_lng: f64,
    origin_lat: f64,
    destination_lng: f64,
    destination_lat: f64,
}

/// Response of `POST /map/driving-route`
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DrivingRoute {
    /// `;`-separated `lng,lat` pairs
    #[serde(default)]
    pub polyline: String,
    /// Meters
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub distance: f64,
    /// Seconds
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub duration: f64,
    /// Turn-by-turn steps exactly as the map provider sent them
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    pub steps: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PlanList {
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    plans: Vec<Value>,
}

impl PlanList {
    /// Decode each stored plan on its own, dropping the ones that do not decode
    fn into_plans(self) -> Vec<PlanDocument> {
        self.plans
            .into_iter()
            .filter_map(|raw| match PlanDocument::deserialize(&raw) {
                Ok(plan) => Some(plan),
                Err(e) => {
                    warn!(
                        "Skipping stored plan {} that does not decode: {}",
                        raw.get("id").map(ToString::to_string).unwrap_or_default(),
                        e
                    );
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<Value>,
}

/// Pull the human readable `detail` out of an error response body
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body).ok().and_then(|b| b.detail) {
        Some(Value::String(detail)) => detail,
        Some(other) => other.to_string(),
        None => body.trim().to_string(),
    }
}

impl BackendClient {
    /// Create a new backend client
    pub fn new(config: &BackendConfig, user_agent: &str) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds.into());

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let http = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let stream_http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            http,
            stream_http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-2xx response into an API error
    pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_detail(&response.text().await.unwrap_or_default());
        Err(match status.as_u16() {
            404 => TravelMapError::api(format!("Not found: {detail}")),
            504 => TravelMapError::api(format!("Backend timed out: {detail}")),
            _ => TravelMapError::api(format!("Backend error {status}: {detail}")),
        })
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.endpoint(path);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(body)?)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Server-side geocoding of free text
    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<ProxyGeocode> {
        self.post_json("map/geocode", &GeocodeRequest { address }).await
    }

    /// Driving route between two points
    #[instrument(skip(self))]
    pub async fn driving_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DrivingRoute> {
        let request = RouteRequest {
            origin_lng: origin.lng,
            origin_lat: origin.lat,
            destination_lng: destination.lng,
            destination_lat: destination.lat,
        };
        self.post_json("map/driving-route", &request).await
    }

    /// All stored plans of a user
    #[instrument(skip(self))]
    pub async fn list_plans(&self, user_id: &str) -> Result<Vec<PlanDocument>> {
        let path = format!("travel/plans?user_id={}", urlencoding::encode(user_id));
        let list: PlanList = self.get_json(&path).await?;
        Ok(list.into_plans())
    }

    /// One stored plan
    #[instrument(skip(self))]
    pub async fn get_plan(&self, plan_id: &str, user_id: &str) -> Result<PlanDocument> {
        let path = format!(
            "travel/plans/{}?user_id={}",
            urlencoding::encode(plan_id),
            urlencoding::encode(user_id)
        );
        self.get_json(&path).await
    }

    #[instrument(skip(self))]
    pub async fn delete_plan(&self, plan_id: &str, user_id: &str) -> Result<()> {
        let url = self.endpoint(&format!(
            "travel/plans/{}?user_id={}",
            urlencoding::encode(plan_id),
            urlencoding::encode(user_id)
        ));
        let response = self.http.delete(&url).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl RouteProvider for BackendClient {
    async fn driving_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DrivingRoute> {
        BackendClient::driving_route(self, origin, destination).await
    }
}
