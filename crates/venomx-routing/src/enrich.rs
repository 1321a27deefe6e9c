//! Concurrent route enrichment for ranked results.

use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, warn};
use venomx_core::{format_duration, Coordinate, Routable, RouteSummary};

use crate::{RoutingError, RoutingProvider};

/// Average speed assumed when estimating travel time without a router.
pub const ESTIMATE_SPEED_KMH: f64 = 50.0;

/// Looks up road routes for the first `top_n` items concurrently.
///
/// Each lookup is bounded by `timeout`. Items whose lookup fails keep
/// `route = None`; order is never changed. Returns how many routes were attached.
pub async fn enrich_routes<T: Routable>(
    router: &dyn RoutingProvider,
    origin: Coordinate,
    items: &mut [T],
    top_n: usize,
    timeout: Duration,
) -> usize {
    let targets: Vec<(usize, Coordinate)> = items
        .iter()
        .take(top_n)
        .enumerate()
        .filter_map(|(i, item)| item.destination().map(|dest| (i, dest)))
        .collect();

    if targets.is_empty() {
        return 0;
    }

    let lookups = targets.iter().map(|&(i, dest)| async move {
        let result = match tokio::time::timeout(timeout, router.route(origin, dest)).await {
            Ok(result) => result,
            Err(_) => Err(RoutingError::Timeout),
        };
        (i, result)
    });

    let mut attached = 0;
    for (i, result) in join_all(lookups).await {
        match result {
            Ok(route) => {
                items[i].attach_route(route);
                attached += 1;
            }
            Err(RoutingError::Disabled) => {}
            Err(e) => warn!(router = router.name(), "Route lookup failed: {}", e),
        }
    }

    debug!(requested = targets.len(), attached, "Route enrichment complete");
    attached
}

/// Straight-line travel estimate at [`ESTIMATE_SPEED_KMH`].
pub fn straight_line_estimate(distance_km: f64) -> RouteSummary {
    let seconds = distance_km / ESTIMATE_SPEED_KMH * 3600.0;
    RouteSummary {
        road_distance_km: (distance_km * 100.0).round() / 100.0,
        travel_time_minutes: (seconds / 6.0).round() / 10.0,
        formatted_duration: format_duration(seconds),
        estimated: true,
    }
}
