//! Antivenom finder: species selection, ranking and route enrichment.

use tracing::info;
use venomx_core::{group_by_facility, rank_matches, AntivenomType, Coordinate, SearchArea, ValidationError};
use venomx_routing::enrich_routes;
use venomx_store::StockFilter;

use crate::dto::{FacilitiesRequest, FacilitiesResponse, FinderRequest, FinderResponse, SearchCriteria};
use crate::error::AppError;
use crate::state::AppState;

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Resolves the request's selector to a stock filter, filling in search criteria.
async fn resolve_filter(
    state: &AppState,
    req: &FinderRequest,
    criteria: &mut SearchCriteria,
) -> Result<StockFilter, AppError> {
    let not_found = |what: String| AppError::NotFound(format!("Snake species '{what}' not found"));

    let species = if let Some(snake_id) = req.snake_id {
        Some(
            state
                .with_store(move |s| s.species_by_id(snake_id))
                .await?
                .ok_or_else(|| not_found(snake_id.to_string()))?,
        )
    } else if let Some(name) = non_empty(&req.snake_scientific_name) {
        let lookup = name.clone();
        Some(
            state
                .with_store(move |s| s.species_by_scientific_name(&lookup))
                .await?
                .ok_or_else(|| not_found(name))?,
        )
    } else if let Some(name) = non_empty(&req.snake_common_name) {
        let lookup = name.clone();
        Some(
            state
                .with_store(move |s| s.species_by_common_name(&lookup))
                .await?
                .ok_or_else(|| not_found(name))?,
        )
    } else {
        None
    };

    if let Some(species) = species {
        criteria.snake_id = Some(species.snake_id);
        criteria.species = Some(species.scientific_name);
        return Ok(StockFilter::Species(species.snake_id));
    }

    match non_empty(&req.antivenom_type) {
        Some(raw) => {
            let kind: AntivenomType = raw.parse()?;
            criteria.antivenom_type = Some(kind.to_string());
            Ok(StockFilter::AntivenomType(kind))
        }
        None => Err(ValidationError::MissingField(
            "one of snake_scientific_name, snake_common_name, snake_id or antivenom_type is required"
                .into(),
        )
        .into()),
    }
}

/// Ranks facilities holding antivenom for the requested species or type.
pub async fn find_antivenom(state: &AppState, req: FinderRequest) -> Result<FinderResponse, AppError> {
    let origin = Coordinate::new(req.user_latitude, req.user_longitude)?;
    let area = SearchArea::new(origin, req.max_distance_km)?;

    let mut criteria = SearchCriteria {
        snake_id: None,
        species: None,
        antivenom_type: None,
        antivenom_name: None,
        user_latitude: req.user_latitude,
        user_longitude: req.user_longitude,
        max_distance_km: req.max_distance_km,
    };
    let filter = resolve_filter(state, &req, &mut criteria).await?;

    let matches = state.with_store(move |s| s.stock_matches(&filter)).await?;
    let mut ranked = rank_matches(matches, &area);
    enrich_routes(
        state.router.as_ref(),
        origin,
        &mut ranked,
        state.settings.routing_top_n,
        state.settings.routing_timeout,
    )
    .await;

    let total = ranked.len();
    info!(
        species = criteria.species.as_deref().unwrap_or("-"),
        total, "Antivenom search complete"
    );

    let message = if total == 0 {
        format!(
            "No facilities with available antivenom found within {} km",
            req.max_distance_km
        )
    } else {
        format!("Found {total} facilities with available antivenom")
    };

    Ok(FinderResponse {
        success: true,
        message,
        total_facilities: total,
        facilities: ranked.into_iter().map(Into::into).collect(),
        search_criteria: criteria,
    })
}

/// Lists facilities stocking a named antivenom product, or antivenom for a
/// species id, one entry per facility. The product name wins when both are given.
pub async fn find_facilities(
    state: &AppState,
    req: FacilitiesRequest,
) -> Result<FacilitiesResponse, AppError> {
    let origin = Coordinate::new(req.user_latitude, req.user_longitude)?;
    let area = SearchArea::new(origin, req.max_distance_km)?;

    let mut criteria = SearchCriteria {
        snake_id: None,
        species: None,
        antivenom_type: None,
        antivenom_name: None,
        user_latitude: req.user_latitude,
        user_longitude: req.user_longitude,
        max_distance_km: req.max_distance_km,
    };
    let (filter, wanted) = match (non_empty(&req.antivenom_name), req.snake_id) {
        (Some(name), _) => {
            criteria.antivenom_name = Some(name.clone());
            (StockFilter::AntivenomName(name.clone()), format!("'{name}'"))
        }
        (None, Some(snake_id)) => {
            let species = state
                .with_store(move |s| s.species_by_id(snake_id))
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Snake species '{snake_id}' not found")))?;
            criteria.snake_id = Some(species.snake_id);
            let wanted = format!("antivenom for {}", species.scientific_name);
            criteria.species = Some(species.scientific_name);
            (StockFilter::Species(species.snake_id), wanted)
        }
        (None, None) => {
            return Err(ValidationError::MissingField(
                "one of antivenom_name or snake_id is required".into(),
            )
            .into())
        }
    };

    let matches = state.with_store(move |s| s.stock_matches(&filter)).await?;
    let mut groups = group_by_facility(rank_matches(matches, &area));
    enrich_routes(
        state.router.as_ref(),
        origin,
        &mut groups,
        state.settings.routing_top_n,
        state.settings.routing_timeout,
    )
    .await;

    let total = groups.len();
    let message = if total == 0 {
        format!("No facilities stocking {wanted} found within {} km", req.max_distance_km)
    } else {
        format!("Found {total} facilities stocking {wanted}")
    };

    Ok(FacilitiesResponse {
        success: true,
        message,
        total_facilities: total,
        facilities: groups.into_iter().map(Into::into).collect(),
        search_criteria: criteria,
    })
}
