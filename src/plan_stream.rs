//! Streamed plan generation.
//!
//! The backend answers `GET /travel/plan-stream` with server-sent events. Each
//! `data:` payload is a JSON object carrying progress, a message, the final
//! plan, or an error.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::backend::BackendClient;
use crate::models::{PlanDocument, lenient};
use crate::{Result, TravelMapError};

/// Parameters of a plan generation request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanRequest {
    pub destination: String,
    pub days: u32,
    pub budget: f64,
    pub travelers: u32,
    pub preferences: String,
    pub start_date: Option<String>,
}

impl PlanRequest {
    pub fn validate(&self) -> Result<()> {
        if self.destination.trim().is_empty() {
            return Err(TravelMapError::validation("destination must not be empty"));
        }
        if self.days == 0 {
            return Err(TravelMapError::validation("days must be at least 1"));
        }
        if self.travelers == 0 {
            return Err(TravelMapError::validation("travelers must be at least 1"));
        }
        if !self.budget.is_finite() || self.budget <= 0.0 {
            return Err(TravelMapError::validation("budget must be positive"));
        }
        Ok(())
    }

    fn query_string(&self, user_id: &str) -> String {
        let mut query = format!(
            "user_id={}&destination={}&days={}&budget={}&travelers={}&preferences={}",
            urlencoding::encode(user_id),
            urlencoding::encode(&self.destination),
            self.days,
            self.budget,
            self.travelers,
            urlencoding::encode(&self.preferences)
        );
        if let Some(start_date) = &self.start_date {
            query.push_str("&start_date=");
            query.push_str(&urlencoding::encode(start_date));
        }
        query
    }
}

/// One event of the generation stream
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct PlanStreamEvent {
    #[serde(default, deserialize_with = "lenient::option_u32")]
    pub progress: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub message: Option<String>,
    /// The finished plan, kept raw until [`PlanStreamEvent::plan`] decodes it
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub error: Option<String>,
}

impl PlanStreamEvent {
    pub fn parse(data: &str) -> Result<Self> {
        Ok(serde_json::from_str(data)?)
    }

    /// Message shown for a failure event
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        self.error
            .as_ref()
            .map(|error| self.message.clone().unwrap_or_else(|| error.clone()))
    }

    /// Progress clamped to 0..=100
    #[must_use]
    pub fn percent(&self) -> Option<u8> {
        self.progress.map(|p| p.min(100) as u8)
    }

    /// The plan carried by this event; a `result` that does not decode is an
    /// error.
    pub fn plan(&self) -> Result<Option<PlanDocument>> {
        match &self.result {
            None | Some(Value::Null) => Ok(None),
            Some(result) => Ok(Some(PlanDocument::deserialize(result)?)),
        }
    }
}

/// Incremental server-sent-events decoder.
///
/// Bytes may arrive split at any point, including in the middle of a UTF-8
/// sequence; only complete lines are decoded.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the data payloads of every completed event
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
            } else if let Some(value) = line.strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
            // comments, `event:`, `id:` and `retry:` lines carry nothing we use
        }

        events
    }

    /// Flush a trailing event not terminated by a blank line
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            let rest = String::from_utf8_lossy(&rest);
            if let Some(value) = rest.trim_end_matches('\r').strip_prefix("data:") {
                self.data.push(value.strip_prefix(' ').unwrap_or(value).to_string());
            }
        }
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data).join("\n"))
    }
}

/// Apply one decoded payload: report progress, surface errors, capture the
/// final plan.
fn handle_event<F>(data: &str, on_progress: &mut F) -> Result<Option<PlanDocument>>
where
    F: FnMut(u8, &str),
{
    let event = match PlanStreamEvent::parse(data) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring malformed plan stream event: {}", e);
            return Ok(None);
        }
    };

    if let Some(message) = event.failure_message() {
        return Err(TravelMapError::stream(message));
    }

    if let Some(progress) = event.percent() {
        let message = event
            .message
            .clone()
            .unwrap_or_else(|| format!("进度 {progress}%"));
        debug!("Plan generation {}%: {}", progress, message);
        on_progress(progress, &message);
    }

    event.plan()
}

impl BackendClient {
    /// Generate a plan through the streaming endpoint.
    ///
    /// `on_progress` receives every progress update. The stream ending without
    /// a plan is an error.
    #[instrument(skip(self, request, on_progress), fields(destination = %request.destination))]
    pub async fn generate_plan<F>(
        &self,
        user_id: &str,
        request: &PlanRequest,
        mut on_progress: F,
    ) -> Result<PlanDocument>
    where
        F: FnMut(u8, &str),
    {
        request.validate()?;
        let url = self.endpoint(&format!(
            "travel/plan-stream?{}",
            request.query_string(user_id)
        ));
        debug!("GET {}", url);

        let response = self
            .stream_http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| TravelMapError::stream(e.to_string()))?;
            for data in decoder.push(&chunk) {
                if let Some(plan) = handle_event(&data, &mut on_progress)? {
                    info!("Received generated plan for {}", plan.destination);
                    return Ok(plan);
                }
            }
        }

        if let Some(data) = decoder.finish() {
            if let Some(plan) = handle_event(&data, &mut on_progress)? {
                return Ok(plan);
            }
        }

        Err(TravelMapError::stream("stream ended before a plan was produced"))
    }
}
