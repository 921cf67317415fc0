//! Crop, resize and pad stages.

use image::GrayImage;

use super::types::{
    BinaryMask, BoundingBox, NormalizedCanvas, BACKGROUND, CANVAS_SIZE, FOREGROUND,
};
use super::ClassifyError;

/// Minimal box containing every foreground pixel of the mask.
pub fn bounding_box(mask: &BinaryMask) -> Result<BoundingBox, ClassifyError> {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for (x, y, p) in mask.as_image().enumerate_pixels() {
        if p.0[0] == FOREGROUND {
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return Err(ClassifyError::EmptyForeground);
    }

    Ok(BoundingBox {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

pub fn crop(mask: &BinaryMask, bbox: BoundingBox) -> BinaryMask {
    let region =
        image::imageops::crop_imm(mask.as_image(), bbox.x, bbox.y, bbox.width, bbox.height)
            .to_image();
    BinaryMask::from_mask_region(region)
}

/// Area-averaging resize to exactly `width` x `height`.
///
/// Both axes are scaled independently, so non-square inputs are stretched.
/// Each output pixel is the overlap-weighted mean of the source pixels its
/// footprint covers, rounded to nearest.
pub fn resize_area(src: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = src.dimensions();
    if (src_w, src_h) == (width, height) {
        return src.clone();
    }

    let cols = area_weights(src_w, width);
    let rows = area_weights(src_h, height);

    // Horizontal pass: src_h x width
    let mut horizontal = vec![0.0f32; (src_h * width) as usize];
    for y in 0..src_h {
        for (x, taps) in cols.iter().enumerate() {
            horizontal[(y * width) as usize + x] = taps
                .iter()
                .map(|&(sx, w)| w * f32::from(src.get_pixel(sx, y).0[0]))
                .sum();
        }
    }

    // Vertical pass
    let mut out = GrayImage::new(width, height);
    for (y, taps) in rows.iter().enumerate() {
        for x in 0..width {
            let v: f32 = taps
                .iter()
                .map(|&(sy, w)| w * horizontal[(sy * width + x) as usize])
                .sum();
            out.put_pixel(x, y as u32, image::Luma([v.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

/// Source taps `(index, weight)` for each destination index along one axis.
/// Weights of every destination index sum to 1.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(u32, f32)>> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    (0..dst_len)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = start + scale;
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min(f64::from(s) + 1.0) - start.max(f64::from(s));
                    (overlap > 0.0).then(|| (s, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

/// Center a digit (at most 20x20) on the zero-filled 28x28 canvas.
pub fn pad_to_canvas(digit: &GrayImage) -> NormalizedCanvas {
    let mut canvas = GrayImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, image::Luma([BACKGROUND]));
    let offset_x = CANVAS_SIZE.saturating_sub(digit.width()) / 2;
    let offset_y = CANVAS_SIZE.saturating_sub(digit.height()) / 2;
    image::imageops::replace(&mut canvas, digit, i64::from(offset_x), i64::from(offset_y));
    NormalizedCanvas::new(canvas)
}
