//! Evaluation engine
//!
//! Drives a classifier over a flat directory of labeled images and folds the
//! outcomes into an [`EvaluationReport`]. A bad file never aborts the run: it
//! is logged and counted.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::evaluation::labels::{FilenameLabelRule, LabelSource};
use crate::evaluation::report::{EvaluationRecord, EvaluationReport};
use crate::inference::classifier::ImageClassifier;
use crate::inference::preprocess::is_supported_image;
use crate::inference::ranking::top_k;
use crate::utils::error::{Error, Result};
use crate::utils::format_duration;

/// Why a file was left out of the metrics without being an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Derived label is missing or not in the vocabulary
    UnknownLabel(Option<String>),
}

/// What happened to a single file
#[derive(Debug, Clone, PartialEq)]
pub enum FileOutcome {
    Evaluated(EvaluationRecord),
    Skipped { file_name: String, reason: SkipReason },
    Failed { file_name: String, error: String },
}

/// Evaluation options
#[derive(Debug, Clone, Default)]
pub struct EvaluatorOptions {
    /// Classify files on the rayon pool
    pub parallel: bool,

    /// Show a progress bar on stderr
    pub show_progress: bool,
}

/// Batch evaluator over a directory of images
pub struct Evaluator {
    classifier: Arc<dyn ImageClassifier>,
    labels: Box<dyn LabelSource>,
    options: EvaluatorOptions,
}

impl Evaluator {
    /// Evaluator using the file-name label rule
    pub fn new(classifier: Arc<dyn ImageClassifier>) -> Self {
        Self {
            classifier,
            labels: Box::new(FilenameLabelRule),
            options: EvaluatorOptions::default(),
        }
    }

    /// Replace the ground-truth source
    pub fn with_labels(mut self, labels: impl LabelSource + 'static) -> Self {
        self.labels = Box::new(labels);
        self
    }

    pub fn with_options(mut self, options: EvaluatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Evaluate every supported image directly inside `dir`
    pub fn evaluate(&self, dir: &Path) -> Result<EvaluationReport> {
        let files = discover_images(dir)?;
        info!("Found {} images in {:?}", files.len(), dir);
        self.evaluate_files(&files)
    }

    /// Evaluate an explicit list of files
    pub fn evaluate_files(&self, files: &[PathBuf]) -> Result<EvaluationReport> {
        let start = Instant::now();
        let progress = self.progress_bar(files.len());

        let run = |path: &PathBuf| {
            let outcome = self.evaluate_file(path);
            progress.inc(1);
            outcome
        };

        // Indexed collect keeps discovery order regardless of completion order
        let outcomes: Vec<FileOutcome> = if self.options.parallel {
            files.par_iter().map(run).collect()
        } else {
            files.iter().map(run).collect()
        };
        progress.finish_and_clear();

        let mut records = Vec::with_capacity(outcomes.len());
        let mut skipped = 0;
        let mut failed = 0;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Evaluated(record) => records.push(record),
                FileOutcome::Skipped { file_name, reason } => {
                    debug!("Skipping {}: {:?}", file_name, reason);
                    skipped += 1;
                }
                FileOutcome::Failed { file_name, error } => {
                    warn!("Failed to evaluate {}: {}", file_name, error);
                    failed += 1;
                }
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} images whose label is not in the vocabulary",
                skipped
            );
        }

        let report = EvaluationReport::from_records(&records, self.classifier.vocabulary())
            .with_counts(skipped, failed);

        info!(
            "Evaluated {} images in {}: accuracy {:.2}% ({} skipped, {} failed)",
            report.total,
            format_duration(start.elapsed().as_secs_f64()),
            report.accuracy * 100.0,
            skipped,
            failed
        );

        Ok(report)
    }

    /// Label, read, preprocess, infer and take the top-1 class of one file
    pub fn evaluate_file(&self, path: &Path) -> FileOutcome {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let vocabulary = self.classifier.vocabulary();
        let label = self.labels.label_for(&file_name);
        let true_index = match label.as_deref().and_then(|l| vocabulary.index_of(l)) {
            Some(idx) => idx,
            None => {
                return FileOutcome::Skipped {
                    file_name,
                    reason: SkipReason::UnknownLabel(label),
                }
            }
        };

        let failed = |error: String| FileOutcome::Failed {
            file_name: file_name.clone(),
            error,
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => return failed(format!("cannot read file: {}", e)),
        };

        let probabilities = match self
            .classifier
            .preprocessor()
            .preprocess_bytes(&bytes)
            .and_then(|tensor| self.classifier.infer(&tensor))
        {
            Ok(p) => p,
            Err(e) => return failed(e.to_string()),
        };

        match top_k(&probabilities, vocabulary, 1).first() {
            Some(best) => FileOutcome::Evaluated(EvaluationRecord::new(
                file_name.clone(),
                true_index,
                best.index,
            )),
            None => failed("empty probability distribution".to_string()),
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new(len as u64);
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} images ({eta})")
            .map(|s| s.progress_chars("=>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress.set_style(style);
        progress
    }
}

/// Regular files directly inside `dir` with a supported image extension,
/// sorted by file name
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::DatasetNotFound(dir.to_path_buf()));
    }

    let files = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Cannot read directory entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| is_supported_image(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect();

    Ok(files)
}
