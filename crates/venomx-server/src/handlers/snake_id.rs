//! Snake identification upload handler.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{error, info};
use venomx_core::ValidationError;

use crate::dto::SnakeIdResponse;
use crate::error::AppError;
use crate::services::identify::{self, Upload};
use crate::state::AppState;

/// POST /snake-id - multipart `image` plus optional `confidence_threshold`.
pub async fn identify(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SnakeIdResponse>, AppError> {
    let mut multipart = multipart?;
    let mut upload: Option<Upload> = None;
    let mut threshold = state.settings.default_confidence_threshold;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("image") => {
                let file_name = field.file_name().map(String::from);
                let bytes = field.bytes().await?;
                upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("confidence_threshold") => {
                let raw = field.text().await?;
                threshold = parse_threshold(&raw)?;
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| ValidationError::MissingField("image file is required".into()))?;
    info!(
        file = upload.file_name.as_deref().unwrap_or("-"),
        bytes = upload.bytes.len(),
        threshold,
        "Identification requested"
    );

    let response = identify::identify_upload(&state, upload, threshold)
        .await
        .map_err(|e| {
            error!("Identification failed: {:?}", e);
            e
        })?;
    Ok(Json(response))
}

fn parse_threshold(raw: &str) -> Result<f32, ValidationError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::MissingField("confidence_threshold must be a number".into()))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ValidationError::InvalidConfidence(value));
    }
    Ok(value as f32)
}
