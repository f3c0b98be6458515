//! Location model for geographic coordinates and plan places

use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Geographic coordinates, always longitude first.
///
/// Sources that hand out `(lat, lon)` are transposed at the boundary via
/// [`Coordinates::from_lat_lon`].
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Longitude in decimal degrees
    pub lng: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Build from a latitude-first source
    #[must_use]
    pub const fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self { lng: lon, lat }
    }

    /// Both components are finite and inside the WGS84 ranges
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }

    /// Great-circle distance in meters
    #[must_use]
    pub fn distance_meters(&self, other: &Coordinates) -> f64 {
        let from = HaversineLocation {
            latitude: self.lat,
            longitude: self.lng,
        };
        let to = HaversineLocation {
            latitude: other.lat,
            longitude: other.lng,
        };
        distance(from, to, Units::Kilometers) * 1000.0
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lng, self.lat)
    }
}

/// What a plan location is
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Activity,
    Restaurant,
    Hotel,
}

impl LocationKind {
    #[must_use]
    pub fn icon(&self) -> &'static str {
        match self {
            LocationKind::Activity => "🎯",
            LocationKind::Restaurant => "🍽️",
            LocationKind::Hotel => "🏨",
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            LocationKind::Activity => "景点",
            LocationKind::Restaurant => "餐厅",
            LocationKind::Hotel => "住宿",
        }
    }
}

/// A place mentioned in a plan, before geocoding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    pub name: String,
    pub description: String,
    pub estimated_cost: f64,
    /// Free text handed to the geocoders
    pub address: String,
    pub kind: LocationKind,
}

impl Location {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        kind: LocationKind,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            estimated_cost: 0.0,
            address: address.into(),
            kind,
        }
    }

    /// Attach coordinates once geocoding succeeded
    #[must_use]
    pub fn resolved(self, coordinates: Coordinates) -> ResolvedLocation {
        ResolvedLocation {
            location: self,
            coordinates,
        }
    }
}

/// A location with successfully resolved coordinates
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResolvedLocation {
    #[serde(flatten)]
    pub location: Location,
    pub coordinates: Coordinates,
}

impl ResolvedLocation {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.location.name
    }

    #[must_use]
    pub fn kind(&self) -> LocationKind {
        self.location.kind
    }
}
