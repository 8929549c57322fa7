//! Class listing endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct ClassesResponse {
    pub classes: Vec<String>,
    pub count: usize,
}

/// GET /classes - Class names in model output order
pub async fn list_classes(State(state): State<SharedState>) -> Json<ClassesResponse> {
    let classes = state.classifier.vocabulary().names().to_vec();
    Json(ClassesResponse {
        count: classes.len(),
        classes,
    })
}
