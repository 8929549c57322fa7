//! Evaluation module
//!
//! - `labels`: ground truth from file names (or a manifest)
//! - `engine`: directory scan and per-file classification
//! - `report`: confusion matrix, per-class metrics and rendering

pub mod engine;
pub mod labels;
pub mod report;

// Re-export main types for convenience
pub use engine::{discover_images, Evaluator, EvaluatorOptions, FileOutcome, SkipReason};
pub use labels::{FilenameLabelRule, LabelSource, ManifestLabels};
pub use report::{AverageMetrics, ClassMetrics, ConfusionMatrix, EvaluationRecord, EvaluationReport};

/// Default evaluation directory
pub const DEFAULT_TEST_DIR: &str = "test/test_renamed";
