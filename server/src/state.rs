//! Application state for the CropGuard server
//!
//! Built once at startup, before the listener binds, and shared read-only by
//! every request.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use cropguard::inference::ImageClassifier;

/// Shared application state
pub struct AppState {
    /// Loaded classifier, never mutated after startup
    pub classifier: Arc<dyn ImageClassifier>,
    /// Checkpoint the classifier was loaded from
    pub checkpoint_path: PathBuf,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(classifier: Arc<dyn ImageClassifier>, checkpoint_path: PathBuf) -> Self {
        Self {
            classifier,
            checkpoint_path,
            started_at: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
