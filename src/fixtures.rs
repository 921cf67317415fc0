//! Synthetic digits and fixture model artifacts shared by tests.
//!
//! The fixture model is a template matcher: the reducer projects onto the
//! unit-normalized canvases of the synthetic 0, 1 and 7, and the classifier
//! picks the largest projection. Any input normalizing to one of those
//! canvases classifies to its digit.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma};

use crate::config;
use crate::core_state::CoreState;
use crate::facts::FactTable;
use crate::model::{LinearClassifier, Pca, StandardScaler};
use crate::pipeline::{FeaturePipeline, NormalizationPipeline, FEATURE_LEN};

pub const SEVEN_FACT: &str = "7 is the most common favourite number.";

/// Render a shape defined on a 28x28 design grid at `size` x `size`,
/// white strokes on black.
fn render(size: u32, shape: fn(f32, f32) -> bool) -> GrayImage {
    let unit = 28.0 / size as f32;
    GrayImage::from_fn(size, size, |x, y| {
        let u = (x as f32 + 0.5) * unit;
        let v = (y as f32 + 0.5) * unit;
        Luma([if shape(u, v) { 255 } else { 0 }])
    })
}

fn seven_shape(u: f32, v: f32) -> bool {
    let bar = (5.0..9.0).contains(&v) && (7.0..21.0).contains(&u);
    let stem = (9.0..23.0).contains(&v) && {
        let center = 20.0 - (v - 9.0) * 8.0 / 14.0;
        (u - center).abs() < 2.2
    };
    bar || stem
}

fn zero_shape(u: f32, v: f32) -> bool {
    let r = (((u - 14.0) / 6.5).powi(2) + ((v - 14.0) / 9.0).powi(2)).sqrt();
    (0.6..=1.0).contains(&r)
}

fn one_shape(u: f32, v: f32) -> bool {
    let center = 15.0 - (v - 5.0) * 0.25;
    (5.0..23.0).contains(&v) && (u - center).abs() < 1.6
}

/// Thick "7" centered on a black square.
pub fn seven(size: u32) -> GrayImage {
    render(size, seven_shape)
}

pub fn zero(size: u32) -> GrayImage {
    render(size, zero_shape)
}

pub fn one(size: u32) -> GrayImage {
    render(size, one_shape)
}

pub fn encode_png(img: &GrayImage) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut cursor, ImageOutputFormat::Png)
        .unwrap();
    cursor.into_inner()
}

/// Baseline JPEG carrying an EXIF APP1 segment whose only IFD0 entry is
/// the Orientation tag (0x0112).
pub fn encode_jpeg_with_orientation(img: &GrayImage, orientation: u16) -> Vec<u8> {
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img.clone())
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(95))
        .unwrap();
    let jpeg = cursor.into_inner();

    // Little-endian TIFF header, IFD0 at offset 8 with one SHORT entry
    let mut tiff = vec![b'I', b'I', 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00, 0x01, 0x00];
    tiff.extend_from_slice(&[0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00]);
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = jpeg[..2].to_vec(); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

fn unit_template(img: GrayImage) -> Vec<f32> {
    let canvas = NormalizationPipeline::mnist().normalize_grid(img).unwrap();
    let flat: Vec<f32> = canvas.flatten().iter().map(|v| v / 255.0).collect();
    let norm = flat.iter().map(|v| v * v).sum::<f32>().sqrt();
    flat.iter().map(|v| v / norm).collect()
}

pub fn scaler() -> StandardScaler {
    StandardScaler::new(vec![0.0; FEATURE_LEN], vec![255.0; FEATURE_LEN]).unwrap()
}

pub fn reducer() -> Pca {
    Pca::new(
        vec![0.0; FEATURE_LEN],
        vec![
            unit_template(zero(28)),
            unit_template(one(28)),
            unit_template(seven(28)),
        ],
    )
    .unwrap()
}

pub fn classifier() -> LinearClassifier {
    LinearClassifier::new(
        vec![0, 1, 7],
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ],
        vec![0.0; 3],
    )
    .unwrap()
}

pub fn feature_pipeline() -> FeaturePipeline {
    FeaturePipeline::new(Box::new(scaler()), Box::new(reducer()), Box::new(classifier())).unwrap()
}

pub fn facts_json() -> String {
    serde_json::json!({
        "0": "0 is the only number that cannot be written in Roman numerals.",
        "1": "1 is neither prime nor composite.",
        "2": "2 is the only even prime.",
        "3": "3 is the first odd prime.",
        "4": "4 is the smallest composite number.",
        "5": "5 is the number of Platonic solids.",
        "6": "6 is the smallest perfect number.",
        "7": SEVEN_FACT,
        "8": "8 is the largest cube in the Fibonacci sequence.",
        "9": "9 is the highest single-digit number.",
    })
    .to_string()
}

pub fn facts() -> FactTable {
    FactTable::from_json_str(&facts_json()).unwrap()
}

pub fn core_state() -> CoreState {
    CoreState::new(NormalizationPipeline::mnist(), feature_pipeline(), facts()).unwrap()
}

/// Write every artifact `CoreState::load` expects into `dir`.
/// Returns the facts file path.
pub fn write_artifacts(dir: &Path) -> std::path::PathBuf {
    let models = dir.join("models");
    std::fs::create_dir_all(&models).unwrap();
    std::fs::write(
        models.join(config::SCALER_FILE),
        serde_json::to_vec(&scaler()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        models.join(config::REDUCER_FILE),
        serde_json::to_vec(&reducer()).unwrap(),
    )
    .unwrap();
    std::fs::write(
        models.join(config::CLASSIFIER_FILE),
        serde_json::to_vec(&classifier()).unwrap(),
    )
    .unwrap();

    let facts_path = dir.join("facts.json");
    std::fs::write(&facts_path, facts_json()).unwrap();
    facts_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_digits_are_mostly_background() {
        for img in [seven(28), zero(28), one(28)] {
            let lit = img.pixels().filter(|p| p.0[0] == 255).count();
            assert!(lit > 20 && lit < 28 * 28 / 2, "{lit} lit pixels");
        }
    }

    #[test]
    fn templates_are_distinct() {
        let a = unit_template(seven(28));
        let b = unit_template(zero(28));
        let c = unit_template(one(28));
        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) < 0.95);
        assert!(dot(&a, &c) < 0.95);
        assert!(dot(&b, &c) < 0.95);
    }
}
