//! Test doubles shared by the inference and evaluation tests

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::inference::classifier::ImageClassifier;
use crate::inference::preprocess::{ImageTensor, Preprocessor};
use crate::model::LabelVocabulary;
use crate::utils::error::PredictionError;

pub const COLOR_CLASSES: [&str; 4] = [
    "AppleScab",
    "CornCommonRust",
    "TomatoYellowCurlVirus",
    "PotatoHealthy",
];

/// Solid-color PNG, small enough to keep tests fast
pub fn png_bytes(color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb(color)));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Classifies by dominant color: red -> AppleScab, green -> CornCommonRust,
/// blue -> TomatoYellowCurlVirus, yellow -> PotatoHealthy
pub struct ColorClassifier {
    vocabulary: LabelVocabulary,
    calls: AtomicUsize,
}

impl ColorClassifier {
    pub fn new() -> Self {
        Self {
            vocabulary: LabelVocabulary::new(
                COLOR_CLASSES.iter().map(|s| s.to_string()).collect(),
            )
            .unwrap(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageClassifier for ColorClassifier {
    fn vocabulary(&self) -> &LabelVocabulary {
        &self.vocabulary
    }

    fn input_shape(&self) -> [usize; 3] {
        Preprocessor::new().output_shape()
    }

    fn infer(&self, tensor: &ImageTensor) -> Result<Vec<f32>, PredictionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let plane = tensor.shape()[1] * tensor.shape()[2];
        let means: Vec<f32> = tensor
            .data()
            .chunks(plane)
            .map(|c| c.iter().sum::<f32>() / plane as f32)
            .collect();

        let winner = if means[0] > 0.0 && means[1] > 0.0 {
            3
        } else {
            (0..3)
                .max_by(|&a, &b| means[a].total_cmp(&means[b]))
                .unwrap_or(0)
        };

        Ok((0..4).map(|i| if i == winner { 0.7 } else { 0.1 }).collect())
    }
}
