//! Filling the plan form from a spoken request.
//!
//! The backend turns a transcript such as "我想去日本，5天，预算一万元，两人，喜欢美食"
//! into structured fields. Any field may be missing.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::backend::BackendClient;
use crate::models::lenient;
use crate::plan_stream::PlanRequest;
use crate::{Result, TravelMapError};

#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    text: &'a str,
}

/// Response of `POST /parse/voice-text`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ParsedTravelInfo {
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub destination: Option<String>,
    #[serde(default, deserialize_with = "lenient::option_u32")]
    pub days: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub budget: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_u32")]
    pub travelers: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub preferences: Option<String>,
    /// `YYYY-MM-DD`
    #[serde(default, deserialize_with = "lenient::option_string")]
    pub start_date: Option<String>,
}

impl ParsedTravelInfo {
    /// One line per recognised field, e.g. `天数: 5天`. Zero counts and
    /// amounts are treated as not recognised.
    #[must_use]
    pub fn fields_found(&self) -> Vec<String> {
        let mut found = Vec::new();
        if let Some(destination) = &self.destination {
            found.push(format!("目的地: {destination}"));
        }
        if let Some(days) = self.days.filter(|d| *d > 0) {
            found.push(format!("天数: {days}天"));
        }
        if let Some(budget) = self.budget.filter(|b| *b > 0.0) {
            found.push(format!("预算: {budget}元"));
        }
        if let Some(travelers) = self.travelers.filter(|t| *t > 0) {
            found.push(format!("人数: {travelers}人"));
        }
        if let Some(preferences) = &self.preferences {
            found.push(format!("偏好: {preferences}"));
        }
        if let Some(start_date) = &self.start_date {
            found.push(format!("出发日期: {start_date}"));
        }
        found
    }

    /// Copy every recognised field into `request`, leaving the rest alone
    pub fn fill(&self, request: &mut PlanRequest) {
        if let Some(destination) = &self.destination {
            request.destination = destination.clone();
        }
        if let Some(days) = self.days.filter(|d| *d > 0) {
            request.days = days;
        }
        if let Some(budget) = self.budget.filter(|b| *b > 0.0) {
            request.budget = budget;
        }
        if let Some(travelers) = self.travelers.filter(|t| *t > 0) {
            request.travelers = travelers;
        }
        if let Some(preferences) = &self.preferences {
            request.preferences = preferences.clone();
        }
        if let Some(start_date) = &self.start_date {
            request.start_date = Some(start_date.clone());
        }
    }
}

impl BackendClient {
    /// Extract plan form fields from a transcript
    #[instrument(skip(self))]
    pub async fn parse_voice_text(&self, text: &str) -> Result<ParsedTravelInfo> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TravelMapError::validation("nothing to parse"));
        }
        let parsed: ParsedTravelInfo = self.post_json("parse/voice-text", &ParseRequest { text }).await?;
        debug!("Recognised {} field(s)", parsed.fields_found().len());
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_response() {
        let parsed: ParsedTravelInfo = serde_json::from_str(
            r#"{"destination": "日本", "days": "5", "budget": 10000, "travelers": null, "preferences": "美食、动漫文化", "start_date": null}"#,
        )
        .unwrap();
        assert_eq!(parsed.days, Some(5));
        assert_eq!(parsed.travelers, None);
        assert_eq!(
            parsed.fields_found(),
            vec![
                "目的地: 日本",
                "天数: 5天",
                "预算: 10000元",
                "偏好: 美食、动漫文化"
            ]
        );
    }

    #[test]
    fn test_fill_keeps_unrecognised_fields() {
        let mut request = PlanRequest {
            destination: String::new(),
            days: 3,
            budget: 5000.0,
            travelers: 1,
            preferences: String::new(),
            start_date: None,
        };
        let parsed = ParsedTravelInfo {
            destination: Some("成都".to_string()),
            travelers: Some(0),
            budget: Some(8000.0),
            ..Default::default()
        };
        parsed.fill(&mut request);
        assert_eq!(request.destination, "成都");
        assert_eq!(request.days, 3);
        assert_eq!(request.budget, 8000.0);
        assert_eq!(request.travelers, 1);
        assert!(request.validate().is_ok());
    }
}
