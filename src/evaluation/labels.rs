//! Ground-truth label sources
//!
//! The default rule reads the label out of the file name itself:
//! `CornCommonRust3.JPG` -> `CornCommonRust`. A JSON manifest can replace it
//! when file names carry no label.

use std::collections::HashMap;
use std::path::Path;

use crate::utils::error::{Error, Result};

/// Maps an image file name to its ground-truth class name
pub trait LabelSource: Send + Sync {
    /// `None` when no label can be derived for `file_name`
    fn label_for(&self, file_name: &str) -> Option<String>;
}

/// Strip the extension, then the trailing run of ASCII digits
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameLabelRule;

impl LabelSource for FilenameLabelRule {
    fn label_for(&self, file_name: &str) -> Option<String> {
        let stem = Path::new(file_name).file_stem()?.to_str()?;
        let label = stem.trim_end_matches(|c: char| c.is_ascii_digit());

        if label.is_empty() {
            None
        } else {
            Some(label.to_string())
        }
    }
}

/// Explicit `{ "file name": "class name" }` mapping
#[derive(Debug, Clone, Default)]
pub struct ManifestLabels {
    labels: HashMap<String, String>,
}

impl ManifestLabels {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Load a manifest from a JSON object file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "label manifest not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let labels: HashMap<String, String> = serde_json::from_str(&content)?;
        Ok(Self::new(labels))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl LabelSource for ManifestLabels {
    fn label_for(&self, file_name: &str) -> Option<String> {
        self.labels.get(file_name).cloned()
    }
}
