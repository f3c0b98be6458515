//! Routes between consecutive resolved locations

use serde::{Deserialize, Serialize};

use super::location::{Coordinates, LocationKind, ResolvedLocation};

/// Where the route geometry came from
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    /// Real driving route from the backend
    Driving,
    /// Straight-line stand-in used when no driving route was available.
    /// Rendered dashed so it is never mistaken for a real route.
    Approximate,
}

/// Category used for colouring a route
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RouteClass {
    Activity,
    Restaurant,
    Hotel,
}

impl RouteClass {
    /// Hotel wins over restaurant, restaurant over activity
    #[must_use]
    pub fn for_endpoints(from: LocationKind, to: LocationKind) -> Self {
        if from == LocationKind::Hotel || to == LocationKind::Hotel {
            RouteClass::Hotel
        } else if from == LocationKind::Restaurant || to == LocationKind::Restaurant {
            RouteClass::Restaurant
        } else {
            RouteClass::Activity
        }
    }

    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            RouteClass::Activity => "#2563eb",
            RouteClass::Restaurant => "#f59e0b",
            RouteClass::Hotel => "#8b5cf6",
        }
    }
}

/// A route between two consecutive resolved locations
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Route {
    /// 1-based position of the pair in the location sequence
    pub index: usize,
    pub from_name: String,
    pub to_name: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub kind: RouteKind,
    pub class: RouteClass,
    pub color: String,
    /// At least two points, longitude first
    pub path: Vec<Coordinates>,
}

impl Route {
    /// Straight two-point stand-in between `from` and `to`
    #[must_use]
    pub fn straight_line(index: usize, from: &ResolvedLocation, to: &ResolvedLocation) -> Self {
        let class = RouteClass::for_endpoints(from.kind(), to.kind());
        Self {
            index,
            from_name: from.name().to_string(),
            to_name: to.name().to_string(),
            distance_meters: from.coordinates.distance_meters(&to.coordinates),
            duration_seconds: 0.0,
            kind: RouteKind::Approximate,
            class,
            color: class.color().to_string(),
            path: vec![from.coordinates, to.coordinates],
        }
    }

    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.kind == RouteKind::Approximate
    }

    /// Point where the route number label goes
    #[must_use]
    pub fn label_point(&self) -> Option<Coordinates> {
        self.path.get(self.path.len() / 2).copied()
    }

    #[must_use]
    pub fn stroke_style(&self) -> &'static str {
        match self.kind {
            RouteKind::Driving => "solid",
            RouteKind::Approximate => "dashed",
        }
    }
}
