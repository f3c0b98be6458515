//! Plan document as produced by the backend planner.
//!
//! The document is owned by the backend; fields we do not understand are kept
//! in `extra` maps so a plan survives a load/save round trip untouched.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::lenient;
use super::location::{Location, LocationKind};

/// A generated travel plan
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PlanDocument {
    #[serde(
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub destination: String,
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub days: u32,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub budget: f64,
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub travelers: u32,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub preferences: String,
    #[serde(
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::option_f64",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_cost: Option<f64>,
    #[serde(default, deserialize_with = "itinerary_or_default")]
    pub itinerary: Itinerary,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Itinerary {
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    pub days: Vec<PlanDay>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_breakdown: Option<CostBreakdown>,
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub tips: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PlanDay {
    #[serde(default, deserialize_with = "lenient::u32_or_zero")]
    pub day: u32,
    #[serde(
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    pub activities: Vec<Activity>,
    #[serde(default, deserialize_with = "lenient::list_or_empty")]
    pub meals: Vec<Meal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accommodation: Option<Accommodation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Activity {
    #[serde(
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub estimated_cost: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Meal {
    #[serde(
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub time: Option<String>,
    /// Breakfast, lunch, dinner...
    #[serde(rename = "type", default, deserialize_with = "lenient::string_or_empty")]
    pub meal_type: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub restaurant: String,
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub cuisine: String,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub estimated_cost: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Accommodation {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub name: String,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "lenient::option_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub accommodation_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub estimated_cost: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CostBreakdown {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub transportation: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub accommodation: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub food: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub activities: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub shopping: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total: f64,
}

/// `null` itinerary reads as an empty one
fn itinerary_or_default<'de, D>(deserializer: D) -> Result<Itinerary, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Itinerary>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlanDocument {
    /// Every named place in the plan, day by day: activities, then meals, then
    /// the accommodation. Duplicates are kept; see [`PlanDocument::unique_locations`].
    #[must_use]
    pub fn locations(&self) -> Vec<Location> {
        let destination = &self.destination;
        let mut locations = Vec::new();

        for day in &self.itinerary.days {
            for activity in day.activities.iter().filter(|a| !a.name.trim().is_empty()) {
                locations.push(Location {
                    name: activity.name.clone(),
                    description: activity.description.clone(),
                    estimated_cost: activity.estimated_cost,
                    address: format!("{destination} {}", activity.name),
                    kind: LocationKind::Activity,
                });
            }

            for meal in day.meals.iter().filter(|m| !m.restaurant.trim().is_empty()) {
                locations.push(Location {
                    name: meal.restaurant.clone(),
                    description: format!("{}: {}", meal.meal_type, meal.cuisine),
                    estimated_cost: meal.estimated_cost,
                    address: format!("{destination} {}", meal.restaurant),
                    kind: LocationKind::Restaurant,
                });
            }

            if let Some(accommodation) = day
                .accommodation
                .as_ref()
                .filter(|a| !a.name.trim().is_empty())
            {
                locations.push(Location {
                    name: accommodation.name.clone(),
                    description: accommodation
                        .accommodation_type
                        .clone()
                        .unwrap_or_else(|| "住宿".to_string()),
                    estimated_cost: accommodation.estimated_cost,
                    address: format!("{destination} {}", accommodation.name),
                    kind: LocationKind::Hotel,
                });
            }
        }

        locations
    }

    /// Flattened locations, deduplicated by name (first occurrence wins)
    #[must_use]
    pub fn unique_locations(&self) -> Vec<Location> {
        dedupe_by_name(self.locations())
    }

    /// Estimated cost, falling back to the itinerary's cost breakdown total.
    /// Zero counts as "not estimated".
    #[must_use]
    pub fn estimated_total(&self) -> Option<f64> {
        self.estimated_cost
            .filter(|cost| *cost > 0.0)
            .or_else(|| {
                self.itinerary
                    .cost_breakdown
                    .as_ref()
                    .map(|costs| costs.total)
                    .filter(|total| *total > 0.0)
            })
    }

    /// Up to five preference tags, split on ASCII and CJK separators
    #[must_use]
    pub fn feature_tags(&self) -> Vec<String> {
        self.preferences
            .split([',', '，', '、'])
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .take(5)
            .map(ToString::to_string)
            .collect()
    }

    /// Calendar date for a plan day: the day's own date if the planner gave
    /// one, otherwise derived from the start date.
    #[must_use]
    pub fn day_date(&self, day: &PlanDay) -> Option<String> {
        if let Some(date) = day.date.as_deref().filter(|d| !d.trim().is_empty()) {
            return Some(date.to_string());
        }
        let start = NaiveDate::parse_from_str(self.start_date.as_deref()?, "%Y-%m-%d").ok()?;
        let offset = u64::from(day.day.saturating_sub(1));
        start
            .checked_add_days(Days::new(offset))
            .map(|date| date.format("%Y-%m-%d").to_string())
    }
}

/// Keep the first location for every name, preserving order
#[must_use]
pub fn dedupe_by_name(locations: Vec<Location>) -> Vec<Location> {
    let mut seen = HashSet::new();
    locations
        .into_iter()
        .filter(|location| seen.insert(location.name.clone()))
        .collect()
}
