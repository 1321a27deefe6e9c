//! Detection boxes in original-image pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned box, corners in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn from_center(cx: f32, cy: f32, width: f32, height: f32) -> Self {
        Self {
            x1: cx - width / 2.0,
            y1: cy - height / 2.0,
            x2: cx + width / 2.0,
            y2: cy + height / 2.0,
        }
    }

    /// Clips the box to an image of the given size.
    pub fn clamp(self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
        }
    }
}

/// Rotated box: centre, size and angle in radians (clockwise in image space).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientedBox {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl OrientedBox {
    /// Corner points in order: top-left, top-right, bottom-right, bottom-left
    /// of the unrotated box.
    pub fn corners(&self) -> [[f32; 2]; 4] {
        let (sin, cos) = self.angle.sin_cos();
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let offsets = [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)];
        offsets.map(|(dx, dy)| {
            [
                self.cx + dx * cos - dy * sin,
                self.cy + dx * sin + dy * cos,
            ]
        })
    }

    /// Smallest axis-aligned box containing every corner.
    pub fn bounding_box(&self) -> BoundingBox {
        let corners = self.corners();
        let xs = corners.map(|c| c[0]);
        let ys = corners.map(|c| c[1]);
        BoundingBox {
            x1: xs.iter().copied().fold(f32::INFINITY, f32::min),
            y1: ys.iter().copied().fold(f32::INFINITY, f32::min),
            x2: xs.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            y2: ys.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }
}
