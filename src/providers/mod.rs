//! External mobility data providers
//!
//! Each provider is a thin reqwest client with a bounded timeout. The
//! orchestrator talks to them through traits so tests can substitute canned
//! collaborators.

pub mod geocoding;
pub mod opendata;
pub mod routing;

pub use geocoding::NominatimClient;
pub use opendata::OpenDataClient;
pub use routing::OsrmClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Routing profile accepted by the routing provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelMode {
    Foot,
    Driving,
    Cycling,
}

impl TravelMode {
    /// Profile segment used in routing URLs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Foot => "foot",
            Self::Driving => "driving",
            Self::Cycling => "cycling",
        }
    }

    /// Map the extracted `medio_transporte` slot onto a routing profile
    ///
    /// Public transport and walking both route on foot; absence defaults to
    /// walking as well.
    #[must_use]
    pub fn from_transport_slot(slot: Option<&str>) -> Self {
        match slot {
            Some("car") => Self::Driving,
            Some("cycling") => Self::Cycling,
            _ => Self::Foot,
        }
    }
}

impl std::fmt::Display for TravelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open-data domain provider: stops, traffic and accessibility lookups
#[async_trait]
pub trait MobilityProvider: Send + Sync {
    /// Nearest public transport stops around a point
    async fn nearest_stop(&self, location: Coordinates, radius_m: u32) -> Result<Value>;

    /// Traffic state for a named zone
    async fn traffic_status(&self, zone: &str) -> Result<Value>;

    /// Accessibility information for a named place
    async fn accessibility_info(&self, place: &str) -> Result<Value>;
}

/// Route calculation provider
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Compute a route with step instructions between two points
    async fn route(
        &self,
        origin: Coordinates,
        destination: Coordinates,
        mode: TravelMode,
    ) -> Result<Value>;
}

/// Free-text address resolution
#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// Best-match coordinates for an address, `None` when not found
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>>;
}
