//! Inference boundary
//!
//! Validates an upload, runs preprocess -> infer -> rank and packages the
//! result the way the adapters report it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::inference::classifier::ImageClassifier;
use crate::inference::preprocess::{is_supported_image, ImageTensor};
use crate::inference::ranking::{top_k, RankedClass};
use crate::model::LabelVocabulary;
use crate::utils::error::PredictionError;
use crate::utils::to_percentage;

/// Result of a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted class index
    pub class_index: usize,

    /// Predicted class name
    pub class_name: String,

    /// Probability of the predicted class, in [0, 1]
    pub confidence: f32,

    /// `confidence` as a percentage rounded to two decimals
    pub confidence_percentage: f64,

    /// Ranked predictions, highest first
    pub top_k: Vec<RankedClass>,
}

impl PredictionResult {
    /// Build a result from a full distribution
    pub fn from_probabilities(
        probabilities: &[f32],
        vocabulary: &LabelVocabulary,
        k: usize,
    ) -> Result<Self, PredictionError> {
        let best = top_k(probabilities, vocabulary, 1)
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::Inference("empty probability distribution".to_string()))?;

        Ok(Self {
            class_index: best.index,
            class_name: best.name,
            confidence: best.confidence,
            confidence_percentage: to_percentage(best.confidence),
            top_k: top_k(probabilities, vocabulary, k),
        })
    }

    /// Pretty print the prediction result
    pub fn display(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Prediction: {} (class {})\n",
            self.class_name, self.class_index
        ));
        output.push_str(&format!("Confidence: {:.2}%\n", self.confidence_percentage));

        if !self.top_k.is_empty() {
            output.push_str(&format!("\nTop-{} predictions:\n", self.top_k.len()));
            for (i, ranked) in self.top_k.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} (class {}) - {:.2}%\n",
                    i + 1,
                    ranked.name,
                    ranked.index,
                    to_percentage(ranked.confidence)
                ));
            }
        }

        output
    }
}

/// Classify an already preprocessed tensor
pub fn predict_tensor(
    classifier: &dyn ImageClassifier,
    tensor: &ImageTensor,
    k: usize,
) -> Result<PredictionResult, PredictionError> {
    let probabilities = classifier.infer(tensor)?;
    PredictionResult::from_probabilities(&probabilities, classifier.vocabulary(), k)
}

/// Classify encoded image bytes
pub fn predict_bytes(
    classifier: &dyn ImageClassifier,
    bytes: &[u8],
    k: usize,
) -> Result<PredictionResult, PredictionError> {
    let tensor = classifier.preprocessor().preprocess_bytes(bytes)?;
    predict_tensor(classifier, &tensor, k)
}

/// Classify an uploaded file.
///
/// The extension of `file_name` is checked before any decoding happens.
pub fn predict_upload(
    classifier: &dyn ImageClassifier,
    file_name: &str,
    bytes: &[u8],
    k: usize,
) -> Result<PredictionResult, PredictionError> {
    if !is_supported_image(file_name) {
        return Err(PredictionError::UnsupportedFileType(file_name.to_string()));
    }

    let result = predict_bytes(classifier, bytes, k)?;
    debug!(
        "{} -> {} ({:.2}%)",
        file_name, result.class_name, result.confidence_percentage
    );
    Ok(result)
}

/// Classify an image on disk, applying the same extension rule as uploads
pub fn predict_file(
    classifier: &dyn ImageClassifier,
    path: &Path,
    k: usize,
) -> Result<PredictionResult, PredictionError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if !is_supported_image(&file_name) {
        return Err(PredictionError::UnsupportedFileType(file_name));
    }

    let bytes = std::fs::read(path).map_err(|e| {
        PredictionError::InvalidImage(format!("cannot read {}: {}", path.display(), e))
    })?;

    predict_upload(classifier, &file_name, &bytes, k)
}
