//! Utilities module for logging, error types and formatting helpers

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{CheckpointError, Error, PredictionError, Result};
pub use logging::{init_logging, LogConfig, LogLevel};

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u32, minutes as u32)
    }
}

/// Round a probability to a percentage with two decimals (`0.987654` -> `98.77`)
pub fn to_percentage(probability: f32) -> f64 {
    (probability as f64 * 100.0 * 100.0).round() / 100.0
}
