//! Treatment-advice hand-off
//!
//! The advisor itself is an external language model. This module only
//! prepares what it is given: a human-readable disease name, the crop it
//! belongs to and the prediction confidence.

use serde::{Deserialize, Serialize};

use crate::inference::PredictionResult;

/// Crop reported when a class name mentions none of the known crops
pub const UNKNOWN_CROP: &str = "Unknown Crop";

/// Crops the classifier is trained on
pub const SUPPORTED_CROPS: [&str; 4] = ["Apple", "Corn", "Potato", "Tomato"];

/// `Corn_(maize)___Common_rust_` -> `Corn (Maize) Common Rust `
///
/// `___` then `_` become spaces; every letter that follows a non-letter is
/// upper-cased and every other letter lower-cased.
pub fn display_name(class_name: &str) -> String {
    let spaced = class_name.replace("___", " ").replace('_', " ");

    let mut output = String::with_capacity(spaced.len());
    let mut previous_is_letter = false;
    for c in spaced.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                output.extend(c.to_lowercase());
            } else {
                output.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            output.push(c);
            previous_is_letter = false;
        }
    }
    output
}

/// Crop named in a class name, by case-insensitive substring
pub fn crop_for(class_name: &str) -> &'static str {
    let lower = class_name.to_lowercase();

    if lower.contains("apple") {
        "Apple"
    } else if lower.contains("corn") || lower.contains("maize") {
        "Corn"
    } else if lower.contains("potato") {
        "Potato"
    } else if lower.contains("tomato") {
        "Tomato"
    } else {
        UNKNOWN_CROP
    }
}

/// Everything the external advisor receives for one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceRequest {
    /// Raw class name as predicted
    pub class_name: String,
    pub display_name: String,
    pub crop: String,
    /// Confidence in percent, two decimals
    pub confidence_percentage: f64,
}

impl AdviceRequest {
    pub fn new(class_name: &str, confidence_percentage: f64) -> Self {
        Self {
            class_name: class_name.to_string(),
            display_name: display_name(class_name),
            crop: crop_for(class_name).to_string(),
            confidence_percentage,
        }
    }

    pub fn from_prediction(prediction: &PredictionResult) -> Self {
        Self::new(&prediction.class_name, prediction.confidence_percentage)
    }

    /// Prompt text handed to the advisor
    pub fn prompt(&self) -> String {
        format!(
            "You are an agricultural advisor. A crop disease has been detected.\n\n\
             Disease: {}\n\
             Crop: {}\n\
             Confidence: {:.1}%\n\n\
             Give actionable treatment recommendations covering immediate actions, \
             a treatment protocol, prevention measures and cautions.",
            self.display_name, self.crop, self.confidence_percentage
        )
    }
}
