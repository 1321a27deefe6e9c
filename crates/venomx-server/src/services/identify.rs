//! Snake identification: upload validation, bounded inference, species lookup.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;
use venomx_config::ALLOWED_EXTENSIONS;
use venomx_core::SpeciesRecord;
use venomx_vision::{file_extension, validate_upload, Classification, Detection, Identification, TempUpload};

use crate::dto::{PredictionBody, SnakeIdResponse};
use crate::error::AppError;
use crate::state::AppState;

/// A received image field.
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Validates, stores and identifies one upload.
///
/// The temporary file lives exactly as long as this call.
pub async fn identify_upload(
    state: &AppState,
    upload: Upload,
    threshold: f32,
) -> Result<SnakeIdResponse, AppError> {
    let started = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let settings = &state.settings;

    validate_upload(
        upload.file_name.as_deref(),
        &upload.bytes,
        settings.max_upload_bytes,
        ALLOWED_EXTENSIONS,
    )?;
    let extension = upload
        .file_name
        .as_deref()
        .and_then(file_extension)
        .unwrap_or_else(|| "jpg".into());

    let temp = TempUpload::write(&settings.temp_dir, &upload.bytes, &extension)?;
    let path = temp.path().to_path_buf();
    let identifier = Arc::clone(&state.identifier);
    let slots = Arc::clone(&state.inference_slots);

    let inference = async move {
        let permit = slots
            .acquire_owned()
            .await
            .map_err(|_| AppError::Unavailable("inference workers are shutting down".into()))?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            identifier.identify(&path, threshold)
        })
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::from)
    };

    let outcome = tokio::time::timeout(settings.inference_timeout, inference).await;
    drop(temp);

    let identification = match outcome {
        Ok(result) => result?,
        Err(_) => {
            warn!(%request_id, "Identification timed out after {:?}", settings.inference_timeout);
            return Err(AppError::Timeout(
                "Identification took too long, please try again".into(),
            ));
        }
    };

    let mut response = match identification {
        Identification::NoDetection { best_confidence } => no_detection(request_id, best_confidence),
        Identification::Detected {
            detection,
            classification,
        } => {
            let confident = classification.confidence >= settings.classification_min_confidence;
            let labels: Vec<String> = classification.predictions.iter().map(|p| p.label.clone()).collect();
            let best = confident.then(|| classification.label.clone());
            let (species, candidates) = state
                .with_store(move |s| {
                    let candidates = labels
                        .iter()
                        .map(|label| s.find_species(label))
                        .collect::<Result<Vec<_>, _>>()?;
                    let species = match best {
                        Some(label) => s.find_species(&label)?,
                        None => None,
                    };
                    Ok((species, candidates))
                })
                .await?;
            detected(request_id, detection, classification, species, candidates, confident)
        }
    };

    response.processing_time_seconds = (started.elapsed().as_secs_f64() * 1000.0).round() / 1000.0;
    info!(
        request_id = %response.request_id,
        success = response.success,
        species = response.scientific_name.as_deref().unwrap_or("-"),
        "Identification complete"
    );
    Ok(response)
}

fn no_detection(request_id: String, best_confidence: Option<f32>) -> SnakeIdResponse {
    SnakeIdResponse {
        message: "No snake detected with sufficient confidence".into(),
        detection_confidence: best_confidence,
        recommendation: Some(
            "Retake the photo in good light with the whole snake in frame. If someone was bitten, seek medical care immediately."
                .into(),
        ),
        ..SnakeIdResponse::empty(request_id)
    }
}

fn detected(
    request_id: String,
    detection: Detection,
    classification: Classification,
    species: Option<SpeciesRecord>,
    candidates: Vec<Option<SpeciesRecord>>,
    confident: bool,
) -> SnakeIdResponse {
    let predictions = classification
        .predictions
        .into_iter()
        .zip(candidates)
        .map(|(prediction, record)| PredictionBody::new(prediction, record.as_ref()))
        .collect();
    let mut response = SnakeIdResponse {
        success: true,
        detection_confidence: Some(detection.confidence),
        bounding_box: Some(detection.bounding_box),
        oriented_box: detection.oriented_box.map(Into::into),
        confidence: Some(classification.confidence),
        predictions,
        ..SnakeIdResponse::empty(request_id)
    };

    match species {
        Some(record) => {
            response.message = "Snake identified".into();
            response.recommendation = Some(recommendation(&record).into());
            response.snake_id = Some(record.snake_id);
            response.species = Some(record.common_name.unwrap_or_else(|| record.scientific_name.clone()));
            response.scientific_name = Some(record.scientific_name);
            response.danger_level = record.danger_level;
            response.fang_type = record.fang_type;
            response.description = record.description;
            response.image_url = record.image_url;
        }
        None => {
            response.message = if confident {
                format!("Snake detected but '{}' is not in the species database", classification.label)
            } else {
                "Snake detected but the species could not be identified with confidence".into()
            };
            response.species = Some("Unknown species".into());
            response.recommendation = Some(UNKNOWN_RECOMMENDATION.into());
        }
    }
    response
}

const UNKNOWN_RECOMMENDATION: &str =
    "Treat the bite as venomous. Keep the patient still and go to the nearest facility with antivenom.";

fn recommendation(species: &SpeciesRecord) -> &'static str {
    if species.is_medically_significant() {
        return "Medical emergency. Keep the patient calm and still, immobilise the limb and go to the nearest facility with antivenom now.";
    }
    let danger = species.danger_level.as_deref().unwrap_or_default().to_ascii_lowercase();
    if danger.contains("non-venomous") || danger.contains("harmless") {
        "Clean the wound with soap and water and watch for infection."
    } else if danger.contains("venomous") {
        "Seek medical evaluation and monitor for swelling, bleeding or weakness."
    } else {
        UNKNOWN_RECOMMENDATION
    }
}
