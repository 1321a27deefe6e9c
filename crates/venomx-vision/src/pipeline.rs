//! Detector + classifier pipeline backed by ONNX models.

use std::borrow::Cow;
use std::path::Path;

use image::{ImageReader, RgbImage};
use tracing::{debug, info};

use crate::classifier::Classifier;
use crate::detector::{Detection, Detector};
use crate::preprocess::{crop_axis_aligned, crop_oriented};
use crate::{Identification, ModelInfo, SpeciesIdentifier, VisionError};

/// What to do with the detector's best guess.
#[derive(Debug)]
pub(crate) enum Gate<'a> {
    Rejected {
        best_confidence: Option<f32>,
    },
    /// Classify `region`: the box crop, or the full frame when the box is degenerate.
    Classify {
        detection: Detection,
        region: Cow<'a, RgbImage>,
    },
}

/// Applies the detection threshold and picks the region to classify.
/// A detection exactly at `threshold` passes.
pub(crate) fn gate(img: &RgbImage, detection: Option<Detection>, threshold: f32) -> Gate<'_> {
    let Some(detection) = detection else {
        return Gate::Rejected { best_confidence: None };
    };
    if detection.confidence < threshold {
        debug!(confidence = detection.confidence, threshold, "Detection below threshold");
        return Gate::Rejected {
            best_confidence: Some(detection.confidence),
        };
    }

    let crop = match &detection.oriented_box {
        Some(obb) => crop_oriented(img, obb),
        None => crop_axis_aligned(img, &detection.bounding_box),
    };
    let region = match crop {
        Some(crop) => Cow::Owned(crop),
        None => Cow::Borrowed(img),
    };
    Gate::Classify { detection, region }
}

/// Production [`SpeciesIdentifier`].
pub struct OnnxIdentifier {
    detector: Detector,
    classifier: Classifier,
}

impl OnnxIdentifier {
    pub fn new(detector: Detector, classifier: Classifier) -> Self {
        Self { detector, classifier }
    }

    /// Loads both models. Any failure here is fatal for the service.
    pub fn load(
        detection_model: &Path,
        detection_input_size: u32,
        oriented: bool,
        classification_model: &Path,
        labels: &Path,
        classification_input_size: u32,
    ) -> Result<Self, VisionError> {
        let detector = Detector::load(detection_model, detection_input_size, oriented)?;
        info!("Detection model loaded from {}", detection_model.display());
        let classifier = Classifier::load(classification_model, labels, classification_input_size)?;
        info!(
            "Classification model loaded from {} ({} classes)",
            classification_model.display(),
            classifier.num_classes()
        );
        Ok(Self::new(detector, classifier))
    }
}

impl SpeciesIdentifier for OnnxIdentifier {
    fn identify(&self, image_path: &Path, threshold: f32) -> Result<Identification, VisionError> {
        let img = ImageReader::open(image_path)?
            .with_guessed_format()?
            .decode()?
            .to_rgb8();

        match gate(&img, self.detector.detect(&img)?, threshold) {
            Gate::Rejected { best_confidence } => Ok(Identification::NoDetection { best_confidence }),
            Gate::Classify { detection, region } => {
                let classification = self.classifier.classify(&region)?;
                Ok(Identification::Detected {
                    detection,
                    classification,
                })
            }
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo {
            detection_model: self.detector.path().display().to_string(),
            detection_input_size: self.detector.input_size(),
            oriented_boxes: self.detector.oriented(),
            classification_model: self.classifier.path().display().to_string(),
            classification_input_size: self.classifier.input_size(),
            num_classes: self.classifier.num_classes(),
        }
    }
}
