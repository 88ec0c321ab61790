use axum::{Json, http::StatusCode, response::IntoResponse};
use iot_admin_schema::ApiResponse;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum AdminError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("SQL file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Sample data error: {0}")]
    SampleData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    Actor(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AdminError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdminError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AdminError::Validation(_) | AdminError::InvalidName(_) | AdminError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AdminError::NotFound(_) | AdminError::FileNotFound(_) => StatusCode::NOT_FOUND,
            AdminError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AdminError::Config(_)
            | AdminError::Io { .. }
            | AdminError::Schema(_)
            | AdminError::SampleData(_)
            | AdminError::Json(_)
            | AdminError::Actor(_)
            | AdminError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            // Validation keeps the full violation list so forms can show every field.
            AdminError::Validation(violations) => ApiResponse {
                success: false,
                message: self.to_string(),
                data: Some(Value::from(violations.clone())),
            },
            _ => ApiResponse::<Value>::failure(self.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
