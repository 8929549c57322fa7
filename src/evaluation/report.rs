//! Evaluation metrics
//!
//! Everything here is a pure function of the `(true, predicted)` records, so
//! a report never depends on the order in which files were processed.

use std::fmt;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::model::LabelVocabulary;
use crate::utils::error::Result;

/// Decimal digits in the text report
const REPORT_DIGITS: usize = 4;

/// One evaluated image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub file_name: String,
    pub true_index: usize,
    pub predicted_index: usize,
}

impl EvaluationRecord {
    pub fn new(file_name: impl Into<String>, true_index: usize, predicted_index: usize) -> Self {
        Self {
            file_name: file_name.into(),
            true_index,
            predicted_index,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.true_index == self.predicted_index
    }
}

/// Per-class metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index
    pub class_idx: usize,

    pub class_name: String,

    /// True positives
    pub true_positives: usize,

    /// False positives
    pub false_positives: usize,

    /// False negatives
    pub false_negatives: usize,

    /// Precision = TP / (TP + FP)
    pub precision: f64,

    /// Recall = TP / (TP + FN)
    pub recall: f64,

    /// F1 = 2 * (precision * recall) / (precision + recall)
    pub f1: f64,

    /// Support = number of actual samples of this class
    pub support: usize,
}

impl ClassMetrics {
    /// Calculate metrics for a class from confusion matrix
    pub fn from_confusion_matrix(cm: &ConfusionMatrix, class_idx: usize, class_name: &str) -> Self {
        let true_positives = cm.get(class_idx, class_idx);

        // Predicted as this class but actually another
        let false_positives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(i, class_idx))
            .sum();

        // Actually this class but predicted as another
        let false_negatives: usize = (0..cm.num_classes)
            .filter(|&i| i != class_idx)
            .map(|i| cm.get(class_idx, i))
            .sum();

        let support = true_positives + false_negatives;

        let precision = ratio(true_positives, true_positives + false_positives);
        let recall = ratio(true_positives, support);

        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            class_idx,
            class_name: class_name.to_string(),
            true_positives,
            false_positives,
            false_negatives,
            precision,
            recall,
            f1,
            support,
        }
    }
}

/// Averaged precision/recall/F1 over the reported classes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl AverageMetrics {
    /// Unweighted mean over classes
    fn macro_average(classes: &[ClassMetrics]) -> Self {
        let support = classes.iter().map(|m| m.support).sum();
        if classes.is_empty() {
            return Self::default();
        }

        let n = classes.len() as f64;
        Self {
            precision: classes.iter().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.iter().map(|m| m.recall).sum::<f64>() / n,
            f1: classes.iter().map(|m| m.f1).sum::<f64>() / n,
            support,
        }
    }

    /// Mean weighted by class support
    fn weighted_average(classes: &[ClassMetrics]) -> Self {
        let support: usize = classes.iter().map(|m| m.support).sum();
        if support == 0 {
            return Self::default();
        }

        let total = support as f64;
        let weighted = |f: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|m| f(m) * m.support as f64).sum::<f64>() / total
        };

        Self {
            precision: weighted(|m| m.precision),
            recall: weighted(|m| m.recall),
            f1: weighted(|m| m.f1),
            support,
        }
    }
}

/// Confusion Matrix for multi-class classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Number of classes
    pub num_classes: usize,

    /// Row = actual, column = predicted, flat row-major
    pub matrix: Vec<usize>,
}

impl ConfusionMatrix {
    /// Create a new empty confusion matrix
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            matrix: vec![0; num_classes * num_classes],
        }
    }

    /// Add a single prediction to the matrix. Out-of-range indices are ignored.
    pub fn add(&mut self, actual: usize, predicted: usize) {
        if actual < self.num_classes && predicted < self.num_classes {
            let idx = actual * self.num_classes + predicted;
            self.matrix[idx] += 1;
        }
    }

    /// Get the count at (actual, predicted)
    pub fn get(&self, actual: usize, predicted: usize) -> usize {
        if actual < self.num_classes && predicted < self.num_classes {
            self.matrix[actual * self.num_classes + predicted]
        } else {
            0
        }
    }

    pub fn total(&self) -> usize {
        self.matrix.iter().sum()
    }

    /// Diagonal sum
    pub fn correct(&self) -> usize {
        (0..self.num_classes).map(|i| self.get(i, i)).sum()
    }

    pub fn row(&self, actual: usize) -> &[usize] {
        &self.matrix[actual * self.num_classes..(actual + 1) * self.num_classes]
    }

    /// Render with numeric headers and a legend of class names
    pub fn display(&self, class_names: &[String]) -> String {
        let mut output = String::new();

        output.push_str("Confusion Matrix (rows=actual, cols=predicted):\n\n");

        let cell = self
            .matrix
            .iter()
            .max()
            .map(|m| m.to_string().len())
            .unwrap_or(1)
            .max(self.num_classes.saturating_sub(1).to_string().len())
            + 1;

        output.push_str(&format!("{:>5}", ""));
        for col in 0..self.num_classes {
            output.push_str(&format!("{:>width$}", col, width = cell));
        }
        output.push('\n');

        for row in 0..self.num_classes {
            output.push_str(&format!("{:>4} ", row));
            for &count in self.row(row) {
                output.push_str(&format!("{:>width$}", count, width = cell));
            }
            output.push('\n');
        }

        output.push('\n');
        for (idx, name) in class_names.iter().enumerate().take(self.num_classes) {
            output.push_str(&format!("{:>4}: {}\n", idx, name));
        }

        output
    }

    /// Save confusion matrix to CSV with class names as headers
    pub fn save_csv(&self, path: &Path, class_names: &[String]) -> std::io::Result<()> {
        let mut content = String::from("actual\\predicted");
        for col in 0..self.num_classes {
            let name = class_names.get(col).map(String::as_str).unwrap_or("?");
            content.push_str(&format!(",{}", name));
        }
        content.push('\n');

        for row in 0..self.num_classes {
            let name = class_names.get(row).map(String::as_str).unwrap_or("?");
            content.push_str(name);
            for &count in self.row(row) {
                content.push_str(&format!(",{}", count));
            }
            content.push('\n');
        }

        std::fs::write(path, content)
    }
}

/// Aggregate result of an evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Full vocabulary, in model output order
    pub class_names: Vec<String>,

    /// Only classes with non-zero ground-truth support, vocabulary order
    pub per_class: Vec<ClassMetrics>,

    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,

    /// `len(vocabulary)` square
    pub confusion_matrix: ConfusionMatrix,

    /// correct / total, 0 when nothing was evaluated
    pub accuracy: f64,

    pub total: usize,
    pub correct: usize,

    /// Files whose label is not in the vocabulary
    pub skipped: usize,

    /// Files that could not be read, decoded or classified
    pub failed: usize,
}

impl EvaluationReport {
    /// Compute the report from evaluation records
    pub fn from_records(records: &[EvaluationRecord], vocabulary: &LabelVocabulary) -> Self {
        let num_classes = vocabulary.len();
        let mut confusion_matrix = ConfusionMatrix::new(num_classes);
        for record in records {
            confusion_matrix.add(record.true_index, record.predicted_index);
        }

        let total = confusion_matrix.total();
        let correct = confusion_matrix.correct();

        let per_class: Vec<ClassMetrics> = vocabulary
            .iter()
            .map(|(idx, name)| ClassMetrics::from_confusion_matrix(&confusion_matrix, idx, name))
            .filter(|m| m.support > 0)
            .collect();

        Self {
            class_names: vocabulary.names().to_vec(),
            macro_avg: AverageMetrics::macro_average(&per_class),
            weighted_avg: AverageMetrics::weighted_average(&per_class),
            per_class,
            confusion_matrix,
            accuracy: ratio(correct, total),
            total,
            correct,
            skipped: 0,
            failed: 0,
        }
    }

    /// Attach skip and failure counts
    pub fn with_counts(mut self, skipped: usize, failed: usize) -> Self {
        self.skipped = skipped;
        self.failed = failed;
        self
    }

    /// Metrics for a class, if it had ground-truth support
    pub fn class(&self, name: &str) -> Option<&ClassMetrics> {
        self.per_class.iter().find(|m| m.class_name == name)
    }

    /// Classification report in the familiar precision/recall/F1/support layout
    pub fn classification_report(&self) -> String {
        let digits = REPORT_DIGITS;
        let width = self
            .per_class
            .iter()
            .map(|m| m.class_name.chars().count())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0)
            .max(digits);

        let mut output = format!(
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}\n\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        );

        for m in &self.per_class {
            output.push_str(&format!(
                "{:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}\n",
                m.class_name,
                m.precision,
                m.recall,
                m.f1,
                m.support,
                width = width,
                digits = digits
            ));
        }
        output.push('\n');

        output.push_str(&format!(
            "{:>width$}  {:>9} {:>9} {:>9.digits$} {:>9}\n",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.total,
            width = width,
            digits = digits
        ));

        for (label, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            output.push_str(&format!(
                "{:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}\n",
                label,
                avg.precision,
                avg.recall,
                avg.f1,
                avg.support,
                width = width,
                digits = digits
            ));
        }

        output
    }

    /// Write the report as JSON with a generation timestamp
    pub fn save_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let document = serde_json::json!({
            "generated_at": Utc::now().to_rfc3339(),
            "report": self,
        });
        std::fs::write(path, serde_json::to_string_pretty(&document)?)?;
        Ok(())
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Classification Report:")?;
        writeln!(f, "{}", self.classification_report())?;
        writeln!(f, "{}", self.confusion_matrix.display(&self.class_names))?;
        write!(f, "Overall Accuracy: {:.2}%", self.accuracy * 100.0)?;
        if self.skipped > 0 || self.failed > 0 {
            write!(f, " ({} skipped, {} failed)", self.skipped, self.failed)?;
        }
        Ok(())
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator > 0 {
        numerator as f64 / denominator as f64
    } else {
        0.0
    }
}
