use crate::config::{ConnectionConfig, ConnectionPatch};
use crate::error::AdminError;
use crate::server::router::AdminState;
use crate::server::routes::json_body;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use iot_admin_schema::{ApiResponse, ConnectionTestResult};

/// GET /api/config
pub async fn get_config(
    State(state): State<AdminState>,
) -> Result<Json<ApiResponse<ConnectionConfig>>, AdminError> {
    let config = state.admin.config().await?;
    Ok(Json(ApiResponse::ok("Current connection settings", config)))
}

/// PUT /api/config
///
/// Partial update; every violation is reported at once and nothing is written on failure.
pub async fn update_config(
    State(state): State<AdminState>,
    payload: Result<Json<ConnectionPatch>, JsonRejection>,
) -> Result<Json<ApiResponse<ConnectionConfig>>, AdminError> {
    let patch = json_body(payload)?;
    let config = state.admin.update_config(patch).await?;
    Ok(Json(ApiResponse::ok("Connection settings saved", config)))
}

/// POST /api/config/test
///
/// A refused handshake is a normal outcome and still answers 200.
pub async fn test_connection(
    State(state): State<AdminState>,
    payload: Result<Option<Json<ConnectionPatch>>, JsonRejection>,
) -> Result<Json<ApiResponse<ConnectionTestResult>>, AdminError> {
    let patch = json_body(payload.map(|body| body.unwrap_or_default()))?;
    let result = state.admin.test_connection(patch).await?;
    Ok(Json(ApiResponse {
        success: result.success,
        message: result.message.clone(),
        data: Some(result),
    }))
}
