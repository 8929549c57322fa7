//! HTTP routes

pub mod classes;
pub mod health;
pub mod predict;

use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::SharedState;

/// Largest accepted upload
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Error response: a status code and a `{"detail": ...}` body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

/// Build the router with middleware
pub fn router(state: SharedState) -> Router {
    Router::new()
        // Health check
        .route("/", get(health::root))
        .route("/health", get(health::health_check))

        // Classification
        .route("/classes", get(classes::list_classes))
        .route("/predict", post(predict::predict))

        // Add state
        .with_state(state)

        // Add middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use cropguard::inference::{ImageClassifier, ImageTensor, Preprocessor};
    use cropguard::{LabelVocabulary, PredictionError};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use tower::ServiceExt;

    use crate::state::AppState;

    const BOUNDARY: &str = "cropguard-test-boundary";

    /// Always favors the second class
    struct FixedClassifier {
        vocabulary: LabelVocabulary,
    }

    const CLASSES: [&str; 5] = [
        "Apple___Apple_scab",
        "Corn_(maize)___Common_rust_",
        "Potato___healthy",
        "Tomato___Late_blight",
        "Tomato___healthy",
    ];

    impl ImageClassifier for FixedClassifier {
        fn vocabulary(&self) -> &LabelVocabulary {
            &self.vocabulary
        }

        fn input_shape(&self) -> [usize; 3] {
            Preprocessor::new().output_shape()
        }

        fn infer(&self, _tensor: &ImageTensor) -> Result<Vec<f32>, PredictionError> {
            Ok(vec![0.05, 0.7, 0.1, 0.05, 0.1])
        }
    }

    fn app() -> Router {
        let vocabulary =
            LabelVocabulary::new(CLASSES.iter().map(|s| s.to_string()).collect()).unwrap();

        let state = AppState::new(
            Arc::new(FixedClassifier { vocabulary }),
            PathBuf::from("leafnet_plantvillage.mpk"),
        );
        router(Arc::new(state))
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([40, 160, 40])));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn upload(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_classes() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["classes_loaded"], 5);

        let response = app()
            .oneshot(Request::get("/classes").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = json(response).await;
        assert_eq!(body["count"], 5);
        assert_eq!(body["classes"][1], "Corn_(maize)___Common_rust_");
    }

    #[tokio::test]
    async fn test_predict_success() {
        let response = app().oneshot(upload("file", "leaf.JPG", &png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["filename"], "leaf.JPG");
        assert_eq!(body["prediction"], "Corn_(maize)___Common_rust_");
        assert_eq!(body["confidence_percentage"], 70.0);
        assert_eq!(body["display_name"], "Corn (Maize) Common Rust ");
        assert_eq!(body["crop"], "Corn");
        // Five classes, exactly three ranked; the 0.1 tie goes to the lower index
        assert_eq!(body["top3_predictions"].as_array().unwrap().len(), 3);
        assert_eq!(body["top3_predictions"][0]["class"], "Corn_(maize)___Common_rust_");
        assert_eq!(body["top3_predictions"][1]["class"], "Potato___healthy");
        assert_eq!(body["top3_predictions"][2]["class"], "Tomato___healthy");
    }

    #[tokio::test]
    async fn test_predict_rejects_bad_uploads() {
        let response = app().oneshot(upload("file", "leaf.gif", &png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json(response).await["detail"]
            .as_str()
            .unwrap()
            .contains("Invalid file type"));

        let response = app()
            .oneshot(upload("file", "leaf.png", b"not really a png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app().oneshot(upload("image", "leaf.png", &png())).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_inference_errors_are_internal() {
        let err: ApiError = PredictionError::Inference("shape mismatch".to_string()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err: ApiError = PredictionError::InvalidImage("truncated".to_string()).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
