//! ONNX snake detection and species classification.
//!
//! Two models run in sequence: a YOLOv8 detector localises the snake, then a
//! YOLOv8-cls classifier labels the cropped region. Both are loaded once with
//! `tract-onnx` and are safe to share across threads.
//!
//! Inference is synchronous and CPU bound; callers run it on a blocking pool.

mod classifier;
mod detector;
mod geometry;
mod pipeline;
mod preprocess;
mod upload;

use std::path::Path;

use serde::Serialize;
use thiserror::Error;
use tract_onnx::prelude::*;

pub use classifier::{
    load_labels, normalize_scores, prettify_label, top_k, Classification, Classifier, Prediction,
    TOP_K,
};
pub use detector::{decode_best, Detection, Detector, RawDetection};
pub use geometry::{BoundingBox, OrientedBox};
pub use pipeline::OnnxIdentifier;
pub use preprocess::{
    crop_axis_aligned, crop_oriented, image_to_tensor, resize_to_fill, Letterbox, LETTERBOX_PAD,
};
pub use upload::{file_extension, validate_upload, TempUpload};

/// Errors from model loading, inference and upload handling.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Failed to load model {path}: {reason}")]
    ModelLoad { path: String, reason: String },
    #[error("Invalid labels file: {0}")]
    Labels(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Empty upload")]
    EmptyUpload,
    #[error("Upload of {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
}

/// Outcome of identifying one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    /// No detection reached the requested threshold.
    NoDetection { best_confidence: Option<f32> },
    Detected {
        detection: Detection,
        classification: Classification,
    },
}

/// Metadata about the loaded models, reported by `/models/info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub detection_model: String,
    pub detection_input_size: u32,
    pub oriented_boxes: bool,
    pub classification_model: String,
    pub classification_input_size: u32,
    pub num_classes: usize,
}

/// Detect-then-classify over an image on disk.
pub trait SpeciesIdentifier: Send + Sync {
    /// Identifies the snake in `image_path`. Detections below `threshold`
    /// yield [`Identification::NoDetection`].
    fn identify(&self, image_path: &Path, threshold: f32) -> Result<Identification, VisionError>;

    fn model_info(&self) -> ModelInfo;
}

pub(crate) type Plan = TypedRunnableModel<TypedModel>;

/// Loads an ONNX graph with a fixed `[1, 3, size, size]` input.
pub(crate) fn load_plan(path: &Path, input_size: u32) -> Result<Plan, VisionError> {
    let size = input_size as usize;
    let model_load = |reason: String| VisionError::ModelLoad {
        path: path.display().to_string(),
        reason,
    };

    tract_onnx::onnx()
        .model_for_path(path)
        .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, size, size]).into()))
        .and_then(|m| m.into_optimized())
        .and_then(|m| m.into_runnable())
        .map_err(|e| model_load(e.to_string()))
}
