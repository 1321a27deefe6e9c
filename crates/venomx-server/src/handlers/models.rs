use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use venomx_config::ALLOWED_EXTENSIONS;

use crate::dto::ModelsInfoResponse;
use crate::state::AppState;

/// GET /models/info - loaded model metadata and upload limits.
pub async fn info(State(state): State<Arc<AppState>>) -> Json<ModelsInfoResponse> {
    Json(ModelsInfoResponse {
        success: true,
        models: state.identifier.model_info(),
        default_confidence_threshold: state.settings.default_confidence_threshold,
        classification_min_confidence: state.settings.classification_min_confidence,
        max_upload_bytes: state.settings.max_upload_bytes,
        allowed_extensions: ALLOWED_EXTENSIONS,
    })
}
