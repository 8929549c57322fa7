//! Inference module
//!
//! This module provides:
//! - The image -> tensor preprocessing contract
//! - The classifier service seam and its burn implementation
//! - Top-K ranking and the upload-facing prediction boundary

pub mod classifier;
pub mod predictor;
pub mod preprocess;
pub mod ranking;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use classifier::{ImageClassifier, LeafClassifier};
pub use predictor::{predict_bytes, predict_file, predict_tensor, predict_upload, PredictionResult};
pub use preprocess::{is_supported_image, ImageTensor, Preprocessor, IMAGE_SIZE};
pub use ranking::{top_k, RankedClass};

/// Number of ranked predictions returned by default
pub const DEFAULT_TOP_K: usize = 3;
