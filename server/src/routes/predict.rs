//! Prediction endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use cropguard::advice::{crop_for, display_name, SUPPORTED_CROPS};
use cropguard::inference::{predict_upload, PredictionResult};
use cropguard::PredictionError;

use crate::routes::ApiError;
use crate::state::SharedState;

/// Multipart field carrying the image
const FILE_FIELD: &str = "file";

/// Length of `top3_predictions`, independent of the configured top-K
pub const TOP_PREDICTIONS: usize = 3;

#[derive(Debug, Serialize)]
pub struct RankedPrediction {
    pub class: String,
    pub confidence: f32,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub filename: String,
    pub prediction: String,
    pub class_index: usize,
    pub confidence: f32,
    pub confidence_percentage: f64,
    pub top3_predictions: Vec<RankedPrediction>,
    pub display_name: String,
    pub crop: String,
    pub supported_crops: Vec<String>,
}

impl PredictResponse {
    fn new(filename: String, result: PredictionResult) -> Self {
        Self {
            display_name: display_name(&result.class_name),
            crop: crop_for(&result.class_name).to_string(),
            top3_predictions: result
                .top_k
                .into_iter()
                .map(|r| RankedPrediction {
                    class: r.name,
                    confidence: r.confidence,
                })
                .collect(),
            filename,
            prediction: result.class_name,
            class_index: result.class_index,
            confidence: result.confidence,
            confidence_percentage: result.confidence_percentage,
            supported_crops: SUPPORTED_CROPS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl From<PredictionError> for ApiError {
    fn from(err: PredictionError) -> Self {
        match err {
            PredictionError::UnsupportedFileType(_) => ApiError::bad_request(
                "Invalid file type. Please upload a JPG, JPEG, or PNG image.",
            ),
            PredictionError::InvalidImage(reason) => {
                ApiError::bad_request(format!("Invalid image: {}", reason))
            }
            PredictionError::Inference(reason) => {
                error!("Inference failed: {}", reason);
                ApiError::internal(format!("Prediction failed: {}", reason))
            }
        }
    }
}

/// POST /predict - Classify an uploaded image
pub async fn predict(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::bad_request(format!("Missing multipart field '{}'", FILE_FIELD)))?;

    // Preprocessing and the forward pass are CPU-bound
    let classifier = state.classifier.clone();
    let name = filename.clone();
    let result = tokio::task::spawn_blocking(move || {
        predict_upload(classifier.as_ref(), &name, &bytes, TOP_PREDICTIONS)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Prediction task failed: {}", e)))??;

    info!(
        "{} -> {} ({:.2}%)",
        filename, result.class_name, result.confidence_percentage
    );

    Ok(Json(PredictResponse::new(filename, result)))
}
