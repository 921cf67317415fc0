//! Image normalization services: decode, polarity, threshold, geometry.
//!
//! Each policy step is an independent service behind a trait so alternate
//! strategies can be swapped in without touching the pipeline shape.
//! `NormalizationPipeline` composes them.
//!
//! Flow:
//! 1. `decoder.decode()`: bytes → grayscale grid
//! 2. `orientation.correct()`: apply the EXIF rotation of camera photos
//! 3. `polarity.normalize()`: bright strokes on dark background
//! 4. `binarizer.select_threshold()`: global threshold → `BinaryMask`
//! 5. crop to the foreground bounding box
//! 6. area-averaging resize to 20x20
//! 7. pad to the 28x28 canvas

use std::io::Cursor;

use image::imageops;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, RgbImage};
use tracing::debug;

use super::geometry::{bounding_box, crop, pad_to_canvas, resize_area};
use super::types::{BinaryMask, NormalizedCanvas, DIGIT_BOX_SIZE};
use super::ClassifyError;

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Default upper bound on encoded input size.
/// Prevents OOM on corrupt/adversarial uploads.
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Mean intensity above which the background is assumed light.
const POLARITY_MIDPOINT: f64 = 127.0;

// ═══════════════════════════════════════════════════════════
// Service traits
// ═══════════════════════════════════════════════════════════

/// Turns encoded image bytes into a single-channel grid.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<GrayImage, ClassifyError>;
}

/// Fixes image orientation from EXIF metadata.
///
/// Phone photos store pixels in sensor order and record the rotation in
/// EXIF tag 0x0112; without correction a portrait shot reaches the
/// binarizer sideways.
pub trait OrientationCorrector: Send + Sync {
    /// `raw_bytes` are the encoded upload (the EXIF source), `image` the
    /// decoded grid. No-op when there is no EXIF or orientation is 1.
    fn correct(&self, raw_bytes: &[u8], image: GrayImage) -> GrayImage;
}

/// Makes the digit bright on a dark background.
pub trait PolarityNormalizer: Send + Sync {
    fn normalize(&self, image: GrayImage) -> GrayImage;
}

/// Chooses the global threshold separating stroke from background.
///
/// Pixels strictly above the returned value become foreground.
pub trait Binarizer: Send + Sync {
    fn select_threshold(&self, image: &GrayImage) -> Result<u8, ClassifyError>;
}

// ═══════════════════════════════════════════════════════════
// NormalizationPipeline: composes services
// ═══════════════════════════════════════════════════════════

/// Converts an arbitrary bitmap into the 28x28 canvas the classifier was
/// trained on. Stateless; safe to share across threads.
pub struct NormalizationPipeline {
    decoder: Box<dyn ImageDecoder>,
    orientation: Box<dyn OrientationCorrector>,
    polarity: Box<dyn PolarityNormalizer>,
    binarizer: Box<dyn Binarizer>,
}

impl NormalizationPipeline {
    pub fn new(
        decoder: Box<dyn ImageDecoder>,
        orientation: Box<dyn OrientationCorrector>,
        polarity: Box<dyn PolarityNormalizer>,
        binarizer: Box<dyn Binarizer>,
    ) -> Self {
        Self {
            decoder,
            orientation,
            polarity,
            binarizer,
        }
    }

    /// MNIST-style preprocessing: BT.601 luma, EXIF orientation,
    /// mean-based inversion, Otsu.
    pub fn mnist() -> Self {
        Self::mnist_with_limit(MAX_IMAGE_BYTES)
    }

    /// Same as `mnist()` with a custom input size limit.
    pub fn mnist_with_limit(max_bytes: usize) -> Self {
        Self::new(
            Box::new(LumaDecoder::with_limit(max_bytes)),
            Box::new(ExifOrientationCorrector),
            Box::new(MeanPolarityNormalizer),
            Box::new(OtsuBinarizer),
        )
    }

    /// Replace the binarization policy.
    pub fn with_binarizer(mut self, binarizer: Box<dyn Binarizer>) -> Self {
        self.binarizer = binarizer;
        self
    }

    /// Replace the orientation policy.
    pub fn with_orientation(mut self, orientation: Box<dyn OrientationCorrector>) -> Self {
        self.orientation = orientation;
        self
    }

    /// Replace the polarity policy.
    pub fn with_polarity(mut self, polarity: Box<dyn PolarityNormalizer>) -> Self {
        self.polarity = polarity;
        self
    }

    pub fn normalize_bytes(&self, bytes: &[u8]) -> Result<NormalizedCanvas, ClassifyError> {
        let gray = self.decoder.decode(bytes)?;
        let gray = self.orientation.correct(bytes, gray);
        self.normalize_grid(gray)
    }

    /// Run every stage after decoding and orientation.
    pub fn normalize_grid(&self, gray: GrayImage) -> Result<NormalizedCanvas, ClassifyError> {
        let (w, h) = gray.dimensions();

        let gray = self.polarity.normalize(gray);
        let threshold = self.binarizer.select_threshold(&gray)?;
        let mask = BinaryMask::from_threshold(&gray, threshold);

        let bbox = bounding_box(&mask)?;
        let cropped = crop(&mask, bbox);
        let digit = resize_area(cropped.as_image(), DIGIT_BOX_SIZE, DIGIT_BOX_SIZE);
        let canvas = pad_to_canvas(&digit);

        debug!(
            input = %format!("{w}x{h}"),
            threshold,
            bbox = %format!("{}x{}+{}+{}", bbox.width, bbox.height, bbox.x, bbox.y),
            "Digit normalized to canvas"
        );

        Ok(canvas)
    }
}

impl Default for NormalizationPipeline {
    fn default() -> Self {
        Self::mnist()
    }
}

// ═══════════════════════════════════════════════════════════
// Production implementations
// ═══════════════════════════════════════════════════════════

// ── LumaDecoder ───────────────────────────────────────────

/// Decodes any supported format and reduces it to BT.601 luma.
///
/// Grayscale inputs pass through untouched; alpha is discarded.
pub struct LumaDecoder {
    max_bytes: usize,
}

impl LumaDecoder {
    pub fn with_limit(max_bytes: usize) -> Self {
        Self { max_bytes }
    }
}

impl Default for LumaDecoder {
    fn default() -> Self {
        Self::with_limit(MAX_IMAGE_BYTES)
    }
}

impl ImageDecoder for LumaDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<GrayImage, ClassifyError> {
        validate_image_bytes(bytes, self.max_bytes)?;

        let img = image::load_from_memory(bytes)
            .map_err(|e| ClassifyError::Decode(e.to_string()))?;
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(ClassifyError::Decode(format!(
                "image decodes to zero dimensions ({w}x{h})"
            )));
        }

        Ok(into_luma(img))
    }
}

// ── ExifOrientationCorrector ──────────────────────────────

/// EXIF-based orientation correction for phone photos.
///
/// Reads EXIF tag 0x0112 (Orientation) from raw bytes via `kamadak-exif`.
///
/// EXIF orientation values:
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub struct ExifOrientationCorrector;

impl OrientationCorrector for ExifOrientationCorrector {
    fn correct(&self, raw_bytes: &[u8], image: GrayImage) -> GrayImage {
        let orientation = read_exif_orientation(raw_bytes);
        if orientation != 1 {
            debug!(orientation, "Applying EXIF orientation");
        }
        apply_orientation(image, orientation)
    }
}

/// Keeps the grid in stored pixel order.
pub struct NoOpOrientationCorrector;

impl OrientationCorrector for NoOpOrientationCorrector {
    fn correct(&self, _raw_bytes: &[u8], image: GrayImage) -> GrayImage {
        image
    }
}

// ── MeanPolarityNormalizer ────────────────────────────────

/// Inverts the grid when its mean intensity is above the midpoint (127),
/// i.e. when it looks like dark ink on light paper. A mean of exactly 127
/// is left unchanged.
pub struct MeanPolarityNormalizer;

impl PolarityNormalizer for MeanPolarityNormalizer {
    fn normalize(&self, mut image: GrayImage) -> GrayImage {
        let mean = mean_intensity(&image);
        if mean > POLARITY_MIDPOINT {
            debug!(mean, "Light background detected, inverting");
            imageops::invert(&mut image);
        }
        image
    }
}

/// Leaves the grid as captured.
pub struct NoOpPolarityNormalizer;

impl PolarityNormalizer for NoOpPolarityNormalizer {
    fn normalize(&self, image: GrayImage) -> GrayImage {
        image
    }
}

// ── OtsuBinarizer ─────────────────────────────────────────

/// Otsu's method over the 256-bin histogram.
///
/// Uniform images have no separating threshold and are rejected.
pub struct OtsuBinarizer;

impl Binarizer for OtsuBinarizer {
    fn select_threshold(&self, image: &GrayImage) -> Result<u8, ClassifyError> {
        let hist = histogram(image);
        otsu_threshold(&hist).ok_or_else(|| ClassifyError::DegenerateImage {
            value: hist.iter().position(|&c| c > 0).unwrap_or(0) as u8,
        })
    }
}

/// Always returns the same threshold. Useful to pin behavior in tests or
/// for inputs known to be pre-binarized.
pub struct FixedThresholdBinarizer(pub u8);

impl Binarizer for FixedThresholdBinarizer {
    fn select_threshold(&self, _image: &GrayImage) -> Result<u8, ClassifyError> {
        Ok(self.0)
    }
}

// ═══════════════════════════════════════════════════════════
// Pure helper functions (reusable)
// ═══════════════════════════════════════════════════════════

/// Validate image bytes before decoding.
pub fn validate_image_bytes(bytes: &[u8], max_bytes: usize) -> Result<(), ClassifyError> {
    if bytes.is_empty() {
        return Err(ClassifyError::Decode("image data is empty".into()));
    }
    if bytes.len() > max_bytes {
        return Err(ClassifyError::Decode(format!(
            "image data is {} bytes, limit is {max_bytes}",
            bytes.len()
        )));
    }
    Ok(())
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation to a grid. Unknown values leave it unchanged.
pub fn apply_orientation(img: GrayImage, orientation: u32) -> GrayImage {
    match orientation {
        2 => imageops::flip_horizontal(&img),
        3 => imageops::rotate180(&img),
        4 => imageops::flip_vertical(&img),
        5 => imageops::flip_horizontal(&imageops::rotate90(&img)),
        6 => imageops::rotate90(&img),
        7 => imageops::flip_horizontal(&imageops::rotate270(&img)),
        8 => imageops::rotate270(&img),
        _ => img,
    }
}

/// Reduce a decoded image to one channel. 8-bit grayscale is kept as is,
/// everything else goes through RGB and BT.601 weights.
pub fn into_luma(img: DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray,
        other => rgb_to_gray(&other.to_rgb8()),
    }
}

/// Convert RGB to grayscale using ITU-R BT.601 luminance, rounded.
pub fn rgb_to_gray(rgb: &RgbImage) -> GrayImage {
    let (w, h) = rgb.dimensions();
    let mut gray = GrayImage::new(w, h);
    for (x, y, p) in rgb.enumerate_pixels() {
        let luma = 0.299 * f32::from(p.0[0]) + 0.587 * f32::from(p.0[1]) + 0.114 * f32::from(p.0[2]);
        gray.put_pixel(x, y, Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }
    gray
}

pub fn mean_intensity(image: &GrayImage) -> f64 {
    let count = image.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = image.as_raw().iter().map(|&v| u64::from(v)).sum();
    sum as f64 / count as f64
}

pub fn histogram(image: &GrayImage) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for &v in image.as_raw() {
        hist[v as usize] += 1;
    }
    hist
}

/// Otsu threshold: the `t` maximizing between-class variance of the
/// populations `<= t` and `> t`. The first maximum wins.
///
/// Returns `None` when fewer than two intensity levels are present.
pub fn otsu_threshold(hist: &[u64; 256]) -> Option<u8> {
    if hist.iter().filter(|&&c| c > 0).count() < 2 {
        return None;
    }

    let total: u64 = hist.iter().sum();
    let total_f = total as f64;
    let sum_total: f64 = hist
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0f64;
    let mut best_sigma = 0.0f64;
    let mut best = 0u8;

    for (t, &count) in hist.iter().enumerate() {
        weight_bg += count;
        sum_bg += t as f64 * count as f64;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        let q_bg = weight_bg as f64 / total_f;
        let q_fg = weight_fg as f64 / total_f;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_total - sum_bg) / weight_fg as f64;
        let diff = mean_bg - mean_fg;
        let sigma = q_bg * q_fg * diff * diff;

        if sigma > best_sigma {
            best_sigma = sigma;
            best = t as u8;
        }
    }

    Some(best)
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
