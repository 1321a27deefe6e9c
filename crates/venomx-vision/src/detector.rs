//! YOLOv8 snake detector (axis-aligned or oriented boxes).

use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Serialize;
use tract_onnx::prelude::*;
use tracing::debug;

use crate::geometry::{BoundingBox, OrientedBox};
use crate::preprocess::{image_to_tensor, Letterbox};
use crate::{load_plan, Plan, VisionError};

/// The best detection, in original-image pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub confidence: f32,
    pub class_id: usize,
    pub bounding_box: BoundingBox,
    pub oriented_box: Option<OrientedBox>,
}

/// Highest-scoring anchor decoded from raw model output, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub angle: Option<f32>,
    pub confidence: f32,
    pub class_id: usize,
}

impl RawDetection {
    /// Maps the detection from the letterboxed canvas back onto the image.
    pub fn to_image_space(&self, letterbox: &Letterbox, width: u32, height: u32) -> Detection {
        let (cx, cy) = letterbox.unmap_point(self.cx, self.cy);
        let w = letterbox.unmap_length(self.width);
        let h = letterbox.unmap_length(self.height);

        let oriented_box = self.angle.map(|angle| OrientedBox {
            cx,
            cy,
            width: w,
            height: h,
            angle,
        });
        let bounding_box = match &oriented_box {
            Some(obb) => obb.bounding_box(),
            None => BoundingBox::from_center(cx, cy, w, h),
        }
        .clamp(width, height);

        Detection {
            confidence: self.confidence,
            class_id: self.class_id,
            bounding_box,
            oriented_box,
        }
    }
}

/// Picks the highest-confidence anchor from a YOLOv8 output tensor.
///
/// Accepts `[1, C, N]` (the usual export) or the transposed `[1, N, C]`;
/// the smaller dimension is taken as the channel axis. With `oriented`,
/// the last channel is read as the box angle when there is room for it.
pub fn decode_best(data: &[f32], shape: &[usize], oriented: bool) -> Option<RawDetection> {
    let dims: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
    let (a, b) = match dims.as_slice() {
        [a, b] => (*a, *b),
        _ => return None,
    };
    let (channels, anchors, channels_first) = if a <= b { (a, b, true) } else { (b, a, false) };
    if channels < 5 || data.len() < channels * anchors {
        return None;
    }

    let has_angle = oriented && channels >= 6;
    let num_classes = channels - 4 - usize::from(has_angle);
    let at = |ch: usize, i: usize| {
        if channels_first {
            data[ch * anchors + i]
        } else {
            data[i * channels + ch]
        }
    };

    let mut best: Option<RawDetection> = None;
    for i in 0..anchors {
        let (class_id, confidence) = (0..num_classes)
            .map(|k| (k, at(4 + k, i)))
            .fold((0, f32::NEG_INFINITY), |acc, c| if c.1 > acc.1 { c } else { acc });

        if !confidence.is_finite() || best.is_some_and(|b| b.confidence >= confidence) {
            continue;
        }
        best = Some(RawDetection {
            cx: at(0, i),
            cy: at(1, i),
            width: at(2, i),
            height: at(3, i),
            angle: has_angle.then(|| at(channels - 1, i)),
            confidence,
            class_id,
        });
    }
    best
}

/// Detection model wrapper.
pub struct Detector {
    plan: Plan,
    path: PathBuf,
    input_size: u32,
    oriented: bool,
}

impl Detector {
    pub fn load(path: &Path, input_size: u32, oriented: bool) -> Result<Self, VisionError> {
        let plan = load_plan(path, input_size)?;
        Ok(Self {
            plan,
            path: path.to_path_buf(),
            input_size,
            oriented,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    pub fn oriented(&self) -> bool {
        self.oriented
    }

    /// Runs the model and returns the single best detection, if any anchor scored.
    pub fn detect(&self, img: &RgbImage) -> Result<Option<Detection>, VisionError> {
        let letterbox = Letterbox::new(img.width(), img.height(), self.input_size);
        let input = image_to_tensor(&letterbox.apply(img));

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| VisionError::Inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| VisionError::Inference("detection model produced no output".into()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| VisionError::Inference(e.to_string()))?;

        let shape = view.shape().to_vec();
        let data: Vec<f32> = view.iter().copied().collect();
        debug!(?shape, "Detection output");

        Ok(decode_best(&data, &shape, self.oriented)
            .map(|raw| raw.to_image_space(&letterbox, img.width(), img.height())))
    }
}
