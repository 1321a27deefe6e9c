//! Image preparation: letterboxing, cropping and tensor conversion.

use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use tract_onnx::prelude::*;

use crate::geometry::{BoundingBox, OrientedBox};

/// Grey used by YOLO exports for letterbox padding.
pub const LETTERBOX_PAD: u8 = 114;

/// Aspect-preserving resize onto a square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub size: u32,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    resized_width: u32,
    resized_height: u32,
}

impl Letterbox {
    pub fn new(width: u32, height: u32, size: u32) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let scale = (size as f32 / w).min(size as f32 / h);
        let resized_width = ((w * scale).round() as u32).clamp(1, size);
        let resized_height = ((h * scale).round() as u32).clamp(1, size);
        Self {
            size,
            scale,
            pad_x: ((size - resized_width) / 2) as f32,
            pad_y: ((size - resized_height) / 2) as f32,
            resized_width,
            resized_height,
        }
    }

    pub fn apply(&self, img: &RgbImage) -> RgbImage {
        let resized = imageops::resize(img, self.resized_width, self.resized_height, FilterType::Triangle);
        let mut canvas = RgbImage::from_pixel(self.size, self.size, Rgb([LETTERBOX_PAD; 3]));
        imageops::overlay(&mut canvas, &resized, self.pad_x as i64, self.pad_y as i64);
        canvas
    }

    /// Maps a point on the canvas back to the original image.
    pub fn unmap_point(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }

    pub fn unmap_length(&self, len: f32) -> f32 {
        len / self.scale
    }
}

/// Normalised `[1, 3, H, W]` tensor from an RGB image.
pub fn image_to_tensor(img: &RgbImage) -> Tensor {
    let (w, h) = (img.width() as usize, img.height() as usize);
    tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
        img.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
    .into()
}

/// Resizes to cover a `size`×`size` square, cropping the overflow.
pub fn resize_to_fill(img: &RgbImage, size: u32) -> RgbImage {
    DynamicImage::ImageRgb8(img.clone())
        .resize_to_fill(size, size, FilterType::Triangle)
        .to_rgb8()
}

/// Crops an axis-aligned region. `None` when the clipped box is empty.
pub fn crop_axis_aligned(img: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
    let b = bbox.clamp(img.width(), img.height());
    let x = b.x1.floor() as u32;
    let y = b.y1.floor() as u32;
    let w = (b.x2.ceil() as u32).saturating_sub(x);
    let h = (b.y2.ceil() as u32).saturating_sub(y);
    if w == 0 || h == 0 {
        return None;
    }
    Some(imageops::crop_imm(img, x, y, w, h).to_image())
}

/// Samples the rotated region into an upright `width`×`height` image.
pub fn crop_oriented(img: &RgbImage, obb: &OrientedBox) -> Option<RgbImage> {
    if img.width() == 0 || img.height() == 0 {
        return None;
    }
    let limit = 2 * img.width().max(img.height());
    let out_w = (obb.width.round() as u32).min(limit);
    let out_h = (obb.height.round() as u32).min(limit);
    if out_w == 0 || out_h == 0 {
        return None;
    }

    let (sin, cos) = obb.angle.sin_cos();
    let mut out = RgbImage::new(out_w, out_h);
    for (u, v, pixel) in out.enumerate_pixels_mut() {
        let dx = u as f32 + 0.5 - out_w as f32 / 2.0;
        let dy = v as f32 + 0.5 - out_h as f32 / 2.0;
        let sx = obb.cx + dx * cos - dy * sin;
        let sy = obb.cy + dx * sin + dy * cos;
        *pixel = sample_bilinear(img, sx - 0.5, sy - 0.5);
    }
    Some(out)
}

fn sample_bilinear(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let max_x = (img.width() - 1) as f32;
    let max_y = (img.height() - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let (x0, y0) = (x.floor(), y.floor());
    let (x1, y1) = ((x0 + 1.0).min(max_x), (y0 + 1.0).min(max_y));
    let (fx, fy) = (x - x0, y - y0);

    let p00 = img.get_pixel(x0 as u32, y0 as u32);
    let p10 = img.get_pixel(x1 as u32, y0 as u32);
    let p01 = img.get_pixel(x0 as u32, y1 as u32);
    let p11 = img.get_pixel(x1 as u32, y1 as u32);

    let mut rgb = [0u8; 3];
    for (c, out) in rgb.iter_mut().enumerate() {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        *out = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 50]))
    }

    #[test]
    fn test_letterbox_wide_image() {
        let lb = Letterbox::new(1280, 640, 640);
        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 160.0);

        let (x, y) = lb.unmap_point(320.0, 320.0);
        assert_eq!((x, y), (640.0, 320.0));
        assert_eq!(lb.unmap_length(100.0), 200.0);
    }

    #[test]
    fn test_letterbox_apply_pads_with_grey() {
        let img = RgbImage::from_pixel(200, 100, Rgb([255, 0, 0]));
        let lb = Letterbox::new(200, 100, 64);
        let canvas = lb.apply(&img);

        assert_eq!(canvas.dimensions(), (64, 64));
        assert_eq!(canvas.get_pixel(0, 0), &Rgb([LETTERBOX_PAD; 3]));
        assert_eq!(canvas.get_pixel(32, 32), &Rgb([255, 0, 0]));
    }

    #[test]
    fn test_image_to_tensor_shape_and_range() {
        let img = RgbImage::from_pixel(8, 4, Rgb([255, 0, 51]));
        let tensor = image_to_tensor(&img);
        assert_eq!(tensor.shape(), &[1, 3, 4, 8]);

        let view = tensor.to_array_view::<f32>().unwrap();
        assert_eq!(view[[0, 0, 0, 0]], 1.0);
        assert_eq!(view[[0, 1, 3, 7]], 0.0);
        assert!((view[[0, 2, 1, 1]] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_crop_axis_aligned_clips_to_image() {
        let img = gradient(20, 20);
        let crop = crop_axis_aligned(&img, &BoundingBox { x1: -5.0, y1: 5.0, x2: 10.0, y2: 30.0 }).unwrap();
        assert_eq!(crop.dimensions(), (10, 15));
        assert_eq!(crop.get_pixel(0, 0), img.get_pixel(0, 5));

        let outside = BoundingBox { x1: 25.0, y1: 25.0, x2: 30.0, y2: 30.0 };
        assert!(crop_axis_aligned(&img, &outside).is_none());
    }

    #[test]
    fn test_crop_oriented_without_rotation_matches_region() {
        let img = gradient(20, 20);
        let obb = OrientedBox { cx: 10.0, cy: 8.0, width: 6.0, height: 4.0, angle: 0.0 };
        let crop = crop_oriented(&img, &obb).unwrap();

        assert_eq!(crop.dimensions(), (6, 4));
        assert_eq!(crop.get_pixel(0, 0), img.get_pixel(7, 6));
        assert_eq!(crop.get_pixel(5, 3), img.get_pixel(12, 9));
    }

    #[test]
    fn test_resize_to_fill_is_square() {
        let img = gradient(30, 10);
        assert_eq!(resize_to_fill(&img, 16).dimensions(), (16, 16));
    }
}
