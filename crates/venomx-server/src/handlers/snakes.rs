//! Species reference data handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use crate::dto::{SpeciesListResponse, SpeciesResponse};
use crate::error::AppError;
use crate::state::AppState;

fn listing(snakes: Vec<venomx_core::SpeciesRecord>) -> Json<SpeciesListResponse> {
    Json(SpeciesListResponse {
        success: true,
        total: snakes.len(),
        snakes,
    })
}

/// GET /snakes - all species ordered by scientific name.
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<SpeciesListResponse>, AppError> {
    Ok(listing(state.with_store(|s| s.list_species()).await?))
}

/// GET /snakes/with-antivenom
pub async fn with_antivenom(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SpeciesListResponse>, AppError> {
    Ok(listing(state.with_store(|s| s.species_with_antivenom()).await?))
}

/// GET /snakes/medically-significant
pub async fn medically_significant(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SpeciesListResponse>, AppError> {
    Ok(listing(state.with_store(|s| s.medically_significant_species()).await?))
}

/// GET /snakes/{scientific_name}
pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(scientific_name): Path<String>,
) -> Result<Json<SpeciesResponse>, AppError> {
    let lookup = scientific_name.clone();
    let snake = state
        .with_store(move |s| s.species_by_scientific_name(&lookup))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Snake species '{scientific_name}' not found")))?;
    Ok(Json(SpeciesResponse { success: true, snake }))
}
