use image::GrayImage;
use serde::Serialize;

/// Side of the normalized canvas fed to the classifier (MNIST convention).
pub const CANVAS_SIZE: u32 = 28;
/// Side of the box the cropped digit is resized into.
pub const DIGIT_BOX_SIZE: u32 = 20;
/// Zero border around the digit box: 20 + 4 + 4 = 28.
pub const CANVAS_BORDER: u32 = 4;
/// Length of the flattened canvas.
pub const FEATURE_LEN: usize = (CANVAS_SIZE * CANVAS_SIZE) as usize;

pub const BACKGROUND: u8 = 0;
pub const FOREGROUND: u8 = 255;

/// Grayscale grid restricted to exactly {0, 255}.
///
/// Only constructible by thresholding, so the two-level invariant holds for
/// every value of this type.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMask(GrayImage);

impl BinaryMask {
    /// Pixels strictly above `threshold` become foreground.
    pub fn from_threshold(gray: &GrayImage, threshold: u8) -> Self {
        let mut mask = gray.clone();
        for p in mask.pixels_mut() {
            p.0[0] = if p.0[0] > threshold { FOREGROUND } else { BACKGROUND };
        }
        Self(mask)
    }

    /// Wrap a sub-image of an existing mask. Values are already two-level.
    pub(crate) fn from_mask_region(region: GrayImage) -> Self {
        Self(region)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        self.0.get_pixel(x, y).0[0] == FOREGROUND
    }

    pub fn foreground_count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] == FOREGROUND).count()
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Minimal axis-aligned rectangle enclosing all foreground pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Last column inside the box.
    pub fn right(&self) -> u32 {
        self.x + self.width - 1
    }

    /// Last row inside the box.
    pub fn bottom(&self) -> u32 {
        self.y + self.height - 1
    }
}

/// Fixed 28x28 grid with the digit confined to the central 20x20 region.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCanvas(GrayImage);

impl NormalizedCanvas {
    pub(crate) fn new(image: GrayImage) -> Self {
        debug_assert_eq!(image.dimensions(), (CANVAS_SIZE, CANVAS_SIZE));
        Self(image)
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }

    /// Row-major flattening into the raw feature vector.
    pub fn flatten(&self) -> Vec<f32> {
        self.0.as_raw().iter().map(|&v| f32::from(v)).collect()
    }
}

/// Result of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    #[serde(rename = "digit")]
    pub label: u8,
    pub fact: String,
}
