//! `travelmap` - puts generated travel plans on a map
//!
//! This library resolves the places of a travel plan to coordinates through a
//! chain of geocoders, connects them with driving routes and renders the
//! result as a map scene, shareable text or printable HTML. It also tracks
//! spending against a plan's budget.

pub mod backend;
pub mod budget;
pub mod config;
pub mod error;
pub mod geocoding;
pub mod logging;
pub mod models;
pub mod plan_stream;
pub mod render;
pub mod routing;
pub mod state;
pub mod voice_text;

// Re-export core types for public API
pub use backend::{BackendClient, DrivingRoute, ProxyGeocode};
pub use budget::{BudgetAnalysis, BudgetOverview, Expense, ExpenseCategory, NewExpense};
pub use config::TravelMapConfig;
pub use error::TravelMapError;
pub use geocoding::{
    GeocodeCandidate, GeocodeResolver, GeocodeStage, Place, StaticCityTable, select_best,
};
pub use models::{Coordinates, Location, LocationKind, PlanDocument, ResolvedLocation, Route};
pub use plan_stream::{PlanRequest, PlanStreamEvent};
pub use render::{MapCanvas, MapScene, MapSummary, PlanRenderer, Progress};
pub use routing::{RouteBuilder, RouteProvider, RouteReport};
pub use state::{AppState, User};
pub use voice_text::ParsedTravelInfo;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelMapError>;
