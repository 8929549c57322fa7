//! # CropGuard
//!
//! Plant-leaf disease classification with the Burn framework: load a trained
//! classifier from a checkpoint, classify single images, and score a
//! classifier against a directory of labeled test images.
//!
//! ## Modules
//!
//! - `model`: LeafNet CNN, label vocabulary and checkpoint persistence
//! - `inference`: preprocessing, the classifier service, top-K ranking and the upload boundary
//! - `evaluation`: file-name labels, the evaluation engine and its report
//! - `advice`: display names and crops handed to the external treatment advisor
//! - `config`: TOML configuration shared by the CLI and the server
//! - `utils`: errors, logging and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cropguard::backend::{default_device, InferenceBackend};
//! use cropguard::inference::{predict_upload, LeafClassifier};
//!
//! let classifier = LeafClassifier::<InferenceBackend>::load("leafnet_plantvillage.mpk".as_ref(), &default_device())?;
//! let classifier = Arc::new(classifier);
//! let result = predict_upload(classifier.as_ref(), "leaf.jpg", &bytes, 3)?;
//! println!("{}", result.display());
//! ```

pub mod advice;
pub mod backend;
pub mod config;
pub mod evaluation;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use advice::{crop_for, display_name, AdviceRequest};
pub use config::AppConfig;
pub use evaluation::{EvaluationReport, Evaluator, EvaluatorOptions, FilenameLabelRule, LabelSource};
pub use inference::{
    predict_upload, ImageClassifier, ImageTensor, LeafClassifier, PredictionResult, Preprocessor,
    RankedClass,
};
pub use model::{load_checkpoint, save_checkpoint, LabelVocabulary, LeafNet, LeafNetConfig};
pub use utils::error::{CheckpointError, Error, PredictionError, Result};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
