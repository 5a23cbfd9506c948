use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::models::OptionsError;
use crate::services::LifecycleState;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTML content is required")]
    MissingHtml,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] OptionsError),

    #[error("{0}")]
    Render(#[from] RenderError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer is not available (state: {0})")]
    Unavailable(LifecycleState),

    #[error("Failed to launch renderer: {0}")]
    Launch(String),

    #[error("Failed to open rendering surface: {0}")]
    Surface(String),

    #[error("Content load timed out after {} ms", .0.as_millis())]
    LoadTimeout(Duration),

    #[error("Failed to load content: {0}")]
    Load(String),

    #[error("PDF export failed: {0}")]
    Export(String),

    #[error("Render task failed: {0}")]
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingHtml | ApiError::InvalidRequest(_) | ApiError::InvalidOptions(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
