//! Road routing for travel-time enrichment.
//!
//! Routing is best-effort: a failed or slow lookup leaves the facility
//! without a route, it never fails the surrounding request.

mod enrich;
mod osrm;

use async_trait::async_trait;
use thiserror::Error;
use venomx_core::{Coordinate, RouteSummary};

pub use enrich::{enrich_routes, straight_line_estimate, ESTIMATE_SPEED_KMH};
pub use osrm::OsrmRouter;

/// Errors from a routing provider.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Router returned status {0}")]
    Status(u16),
    #[error("No route found: {0}")]
    NoRoute(String),
    #[error("Routing timed out")]
    Timeout,
    #[error("Routing is disabled")]
    Disabled,
}

/// A source of road distance and travel time between two points.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteSummary, RoutingError>;
}

/// Provider used when no routing service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledRouter;

#[async_trait]
impl RoutingProvider for DisabledRouter {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn route(&self, _from: Coordinate, _to: Coordinate) -> Result<RouteSummary, RoutingError> {
        Err(RoutingError::Disabled)
    }
}
