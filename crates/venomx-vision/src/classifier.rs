//! YOLOv8-cls species classifier.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Serialize;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

use crate::preprocess::{image_to_tensor, resize_to_fill};
use crate::{load_plan, Plan, VisionError};

/// Number of predictions kept per classification.
pub const TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Classifier output: the best label plus the top-k ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub label: String,
    pub class_index: usize,
    pub confidence: f32,
    pub predictions: Vec<Prediction>,
}

/// Turns a raw class label into a lookup-friendly name:
/// `naja_philippinensis` becomes `Naja Philippinensis`.
pub fn prettify_label(raw: &str) -> String {
    raw.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Reads one label per line, skipping blanks and `#` comments.
pub fn load_labels(path: &Path) -> Result<Vec<String>, VisionError> {
    let content = fs::read_to_string(path)
        .map_err(|e| VisionError::Labels(format!("{}: {}", path.display(), e)))?;
    let labels: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(String::from)
        .collect();
    if labels.is_empty() {
        return Err(VisionError::Labels(format!("{} contains no labels", path.display())));
    }
    Ok(labels)
}

/// Returns `scores` as probabilities, applying softmax only when they are
/// not already a distribution.
pub fn normalize_scores(scores: &[f32]) -> Vec<f32> {
    let sum: f32 = scores.iter().sum();
    let is_distribution = (sum - 1.0).abs() < 1e-3 && scores.iter().all(|s| (0.0..=1.0).contains(s));
    if is_distribution {
        return scores.to_vec();
    }

    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Indices of the `k` highest probabilities, best first. Ties keep index order.
pub fn top_k(probs: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = probs.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(k);
    ranked
}

/// Classification model plus its label table.
pub struct Classifier {
    plan: Plan,
    path: PathBuf,
    labels: Vec<String>,
    input_size: u32,
}

impl Classifier {
    pub fn load(path: &Path, labels_path: &Path, input_size: u32) -> Result<Self, VisionError> {
        let labels = load_labels(labels_path)?;
        let plan = load_plan(path, input_size)?;
        Ok(Self {
            plan,
            path: path.to_path_buf(),
            labels,
            input_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn classify(&self, crop: &RgbImage) -> Result<Classification, VisionError> {
        let input = image_to_tensor(&resize_to_fill(crop, self.input_size));
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| VisionError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| VisionError::Inference("classification model produced no output".into()))?;
        let scores: Vec<f32> = output
            .to_array_view::<f32>()
            .map_err(|e| VisionError::Inference(e.to_string()))?
            .iter()
            .copied()
            .collect();

        if scores.len() != self.labels.len() {
            warn!(
                outputs = scores.len(),
                labels = self.labels.len(),
                "Classifier output size does not match label count"
            );
        }
        self.rank(&scores)
    }

    fn rank(&self, scores: &[f32]) -> Result<Classification, VisionError> {
        let probs = normalize_scores(scores);
        let predictions: Vec<Prediction> = top_k(&probs, TOP_K)
            .into_iter()
            .map(|(i, confidence)| Prediction {
                label: self.label(i),
                confidence,
            })
            .collect();

        let (class_index, confidence) = top_k(&probs, 1)
            .first()
            .copied()
            .ok_or_else(|| VisionError::Inference("classifier returned no scores".into()))?;
        debug!(class_index, confidence, "Classification complete");

        Ok(Classification {
            label: self.label(class_index),
            class_index,
            confidence,
            predictions,
        })
    }

    fn label(&self, index: usize) -> String {
        match self.labels.get(index) {
            Some(raw) => prettify_label(raw),
            None => format!("Class {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prettify_label() {
        assert_eq!(prettify_label("naja_philippinensis"), "Naja Philippinensis");
        assert_eq!(prettify_label("TRIMERESURUS-flavomaculatus"), "Trimeresurus Flavomaculatus");
        assert_eq!(prettify_label("  naja  naja "), "Naja Naja");
        assert_eq!(prettify_label(""), "");
    }

    #[test]
    fn test_load_labels_skips_blank_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.txt");
        fs::write(&path, "# species\nnaja_naja\n\nophiophagus_hannah\n").unwrap();

        let labels = load_labels(&path).unwrap();
        assert_eq!(labels, vec!["naja_naja", "ophiophagus_hannah"]);

        fs::write(&path, "\n# nothing\n").unwrap();
        assert!(matches!(load_labels(&path), Err(VisionError::Labels(_))));
    }

    #[test]
    fn test_normalize_keeps_distribution() {
        let probs = vec![0.7, 0.2, 0.1];
        assert_eq!(normalize_scores(&probs), probs);
    }

    #[test]
    fn test_normalize_applies_softmax_to_logits() {
        let probs = normalize_scores(&[2.0, 1.0, 0.1]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!(probs[0] > probs[1] && probs[1] > probs[2]);
        assert!((probs[0] - 0.659).abs() < 1e-3);
    }

    #[test]
    fn test_top_k_orders_and_truncates() {
        let ranked = top_k(&[0.1, 0.4, 0.05, 0.4, 0.05], 3);
        assert_eq!(ranked, vec![(1, 0.4), (3, 0.4), (0, 0.1)]);
        assert_eq!(top_k(&[0.5, 0.5], 5).len(), 2);
    }
}
