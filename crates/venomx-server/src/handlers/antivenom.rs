//! Antivenom search handlers.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use tracing::{debug, error};
use venomx_core::{haversine_km, Coordinate};
use venomx_routing::straight_line_estimate;

use crate::dto::{
    FacilitiesRequest, FacilitiesResponse, FinderRequest, FinderResponse, RouteQuery, RouteResponse,
};
use crate::error::AppError;
use crate::services::finder;
use crate::state::AppState;

/// POST /antivenom/finder - nearest facilities stocking antivenom for a species.
pub async fn finder(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FinderRequest>, JsonRejection>,
) -> Result<Json<FinderResponse>, AppError> {
    let Json(req) = payload?;
    let response = finder::find_antivenom(&state, req).await.map_err(|e| {
        error!("Antivenom search failed: {:?}", e);
        e
    })?;
    Ok(Json(response))
}

/// POST /antivenom/facilities - facilities stocking a named antivenom product.
pub async fn facilities(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FacilitiesRequest>, JsonRejection>,
) -> Result<Json<FacilitiesResponse>, AppError> {
    let Json(req) = payload?;
    Ok(Json(finder::find_facilities(&state, req).await?))
}

/// GET /antivenom/route - road route between two points, or a straight-line estimate.
pub async fn route(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RouteQuery>, QueryRejection>,
) -> Result<Json<RouteResponse>, AppError> {
    let Query(q) = query?;
    let start = Coordinate::new(q.start_lat, q.start_lon)?;
    let end = Coordinate::new(q.end_lat, q.end_lon)?;
    let straight = haversine_km(start, end);

    let routed = tokio::time::timeout(state.settings.routing_timeout, state.router.route(start, end)).await;
    let (source, route) = match routed {
        Ok(Ok(route)) => (state.router.name().to_string(), route),
        Ok(Err(e)) => {
            debug!("Routing unavailable, using estimate: {}", e);
            ("estimate".to_string(), straight_line_estimate(straight))
        }
        Err(_) => {
            debug!("Routing timed out, using estimate");
            ("estimate".to_string(), straight_line_estimate(straight))
        }
    };

    Ok(Json(RouteResponse {
        success: true,
        source,
        straight_line_distance_km: (straight * 100.0).round() / 100.0,
        route,
    }))
}
