pub mod config;
pub mod definitions;
pub mod setup;
pub mod status;

use crate::error::AdminError;
use axum::Json;
use axum::extract::rejection::JsonRejection;

/// Unwraps a JSON body, turning axum's rejection into the uniform error body.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AdminError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AdminError::BadRequest(rejection.body_text()))
}
