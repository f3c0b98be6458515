//! Data models for the travel map pipeline
//!
//! This module contains the core domain models organized by concern:
//! - Location: coordinates, plan locations and resolved locations
//! - Plan: the backend's plan document and its flattening into locations
//! - Route: routes between consecutive resolved locations

pub mod lenient;
pub mod location;
pub mod plan;
pub mod route;

// Re-export all public types for convenient access
pub use location::{Coordinates, Location, LocationKind, ResolvedLocation};
pub use plan::{Accommodation, Activity, CostBreakdown, Itinerary, Meal, PlanDay, PlanDocument};
pub use route::{Route, RouteClass, RouteKind};
