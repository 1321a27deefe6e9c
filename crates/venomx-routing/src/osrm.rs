//! OSRM HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use venomx_core::{Coordinate, RouteSummary};

use crate::{RoutingError, RoutingProvider};

const RETRY_DELAY: Duration = Duration::from_millis(200);
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(100);

/// Per-attempt timeout: two attempts plus the backoff fit inside `budget`.
fn attempt_timeout(budget: Duration) -> Duration {
    (budget.saturating_sub(RETRY_DELAY) / 2).max(MIN_ATTEMPT_TIMEOUT)
}

#[derive(Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
}

/// Driving routes from an OSRM server.
pub struct OsrmRouter {
    client: Client,
    base_url: String,
}

impl OsrmRouter {
    /// Creates a client for `base_url`. `budget` covers the whole lookup,
    /// including the single retry.
    pub fn new(base_url: impl Into<String>, budget: Duration) -> Result<Self, RoutingError> {
        let client = Client::builder().timeout(attempt_timeout(budget)).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    // OSRM takes lon,lat pairs.
    fn route_url(&self, from: Coordinate, to: Coordinate) -> String {
        format!(
            "{}/route/v1/driving/{},{};{},{}?overview=false&alternatives=false&steps=false",
            self.base_url, from.longitude, from.latitude, to.longitude, to.latitude
        )
    }

    async fn fetch(&self, url: &str) -> Result<RouteSummary, RoutingError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RoutingError::Status(status.as_u16()));
        }

        let body: OsrmResponse = response.json().await?;
        if body.code != "Ok" {
            return Err(RoutingError::NoRoute(body.message.unwrap_or(body.code)));
        }
        let route = body
            .routes
            .first()
            .ok_or_else(|| RoutingError::NoRoute("empty route list".into()))?;

        Ok(RouteSummary::from_meters_seconds(route.distance, route.duration))
    }
}

#[async_trait]
impl RoutingProvider for OsrmRouter {
    fn name(&self) -> &str {
        "osrm"
    }

    async fn route(&self, from: Coordinate, to: Coordinate) -> Result<RouteSummary, RoutingError> {
        let url = self.route_url(from, to);
        debug!("OSRM request: {}", url);

        match self.fetch(&url).await {
            Err(RoutingError::Http(e)) if e.is_connect() || e.is_timeout() => {
                warn!("OSRM request failed, retrying once: {}", e);
                tokio::time::sleep(RETRY_DELAY).await;
                self.fetch(&url).await
            }
            result => result,
        }
    }
}
