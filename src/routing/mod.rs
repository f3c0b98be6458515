//! Driving routes between consecutive resolved locations.
//!
//! Every pair further apart than the minimum distance gets a route. When the
//! backend cannot deliver one, a dashed straight line stands in for it.

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::backend::DrivingRoute;
use crate::models::{Coordinates, ResolvedLocation, Route, RouteClass, RouteKind};
use crate::{Result, TravelMapError};

pub mod polyline;

pub use polyline::{decode_polyline, encode_polyline};

/// Pairs closer than this are treated as the same place
pub const DEFAULT_MIN_ROUTE_DISTANCE_M: f64 = 10.0;

/// Source of driving routes
#[async_trait]
pub trait RouteProvider: Send + Sync {
    async fn driving_route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<DrivingRoute>;
}

/// Outcome of one route building pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteReport {
    pub routes: Vec<Route>,
    /// Pairs that fell back to a straight line
    pub degraded: usize,
    /// Pairs skipped for being too close together
    pub skipped: usize,
}

impl RouteReport {
    #[must_use]
    pub fn driving_count(&self) -> usize {
        self.routes.len() - self.degraded
    }

    /// Total distance of the driving routes, in kilometers
    #[must_use]
    pub fn total_distance_km(&self) -> f64 {
        self.driving_routes().map(|r| r.distance_meters).sum::<f64>() / 1000.0
    }

    /// Total duration of the driving routes, in whole minutes
    #[must_use]
    pub fn total_duration_minutes(&self) -> u64 {
        let seconds: f64 = self.driving_routes().map(|r| r.duration_seconds).sum();
        (seconds / 60.0).round() as u64
    }

    fn driving_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| r.kind == RouteKind::Driving)
    }
}

/// Builds routes along an ordered sequence of resolved locations
pub struct RouteBuilder {
    provider: Box<dyn RouteProvider>,
    min_distance_m: f64,
}

impl RouteBuilder {
    pub fn new(provider: Box<dyn RouteProvider>) -> Self {
        Self {
            provider,
            min_distance_m: DEFAULT_MIN_ROUTE_DISTANCE_M,
        }
    }

    #[must_use]
    pub fn with_min_distance(mut self, meters: f64) -> Self {
        self.min_distance_m = meters;
        self
    }

    /// Routes between consecutive locations, in order
    pub async fn build_routes(&self, path: &[ResolvedLocation]) -> Vec<Route> {
        self.build(path).await.routes
    }

    /// Routes plus counts of degraded and skipped pairs.
    /// Fewer than two locations give an empty report.
    #[instrument(skip_all, fields(locations = path.len()))]
    pub async fn build(&self, path: &[ResolvedLocation]) -> RouteReport {
        let mut report = RouteReport::default();
        if path.len() < 2 {
            debug!("Fewer than 2 locations, no routes to build");
            return report;
        }

        for (i, pair) in path.windows(2).enumerate() {
            let (from, to) = (&pair[0], &pair[1]);
            let index = i + 1;

            let distance = from.coordinates.distance_meters(&to.coordinates);
            if distance < self.min_distance_m {
                debug!(
                    "Skipping route {}: {} and {} are only {:.0} m apart",
                    index,
                    from.name(),
                    to.name(),
                    distance
                );
                report.skipped += 1;
                continue;
            }

            match self.driving_route(index, from, to).await {
                Ok(route) => {
                    info!(
                        "Route {}: {} → {} ({:.1} km, {:.0} min)",
                        index,
                        route.from_name,
                        route.to_name,
                        route.distance_meters / 1000.0,
                        route.duration_seconds / 60.0
                    );
                    report.routes.push(route);
                }
                Err(e) => {
                    warn!(
                        "Route {} {} → {} failed, using straight line: {}",
                        index,
                        from.name(),
                        to.name(),
                        e
                    );
                    report.degraded += 1;
                    report.routes.push(Route::straight_line(index, from, to));
                }
            }
        }

        info!(
            "Built {} routes ({} degraded, {} skipped)",
            report.routes.len(),
            report.degraded,
            report.skipped
        );
        report
    }

    async fn driving_route(
        &self,
        index: usize,
        from: &ResolvedLocation,
        to: &ResolvedLocation,
    ) -> Result<Route> {
        let response = self
            .provider
            .driving_route(from.coordinates, to.coordinates)
            .await?;

        let path = decode_polyline(&response.polyline);
        if path.len() < 2 {
            return Err(TravelMapError::RouteDecode { points: path.len() });
        }

        let class = RouteClass::for_endpoints(from.kind(), to.kind());
        Ok(Route {
            index,
            from_name: from.name().to_string(),
            to_name: to.name().to_string(),
            distance_meters: response.distance,
            duration_seconds: response.duration,
            kind: RouteKind::Driving,
            class,
            color: class.color().to_string(),
            path,
        })
    }
}
