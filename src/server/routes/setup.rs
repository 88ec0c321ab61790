use crate::error::AdminError;
use crate::server::router::AdminState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use iot_admin_schema::{ApiResponse, OperationReport, SetupReport};

/// A failed step is still a well-formed report; only the status code changes.
fn report_response(report: OperationReport) -> Response {
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let body = ApiResponse {
        success: report.success,
        message: report.message.clone(),
        data: Some(report),
    };
    (status, Json(body)).into_response()
}

/// POST /api/setup/database
pub async fn create_database(State(state): State<AdminState>) -> Result<Response, AdminError> {
    Ok(report_response(state.admin.create_database().await?))
}

/// POST /api/setup/tables
pub async fn create_tables(State(state): State<AdminState>) -> Result<Response, AdminError> {
    Ok(report_response(state.admin.create_tables().await?))
}

/// POST /api/setup/sample-data
pub async fn insert_sample_data(State(state): State<AdminState>) -> Result<Response, AdminError> {
    Ok(report_response(state.admin.insert_sample_data().await?))
}

/// POST /api/setup/reset
pub async fn reset_database(State(state): State<AdminState>) -> Result<Response, AdminError> {
    Ok(report_response(state.admin.reset_database().await?))
}

/// POST /api/setup/all
pub async fn setup_all(State(state): State<AdminState>) -> Result<Response, AdminError> {
    let report: SetupReport = state.admin.setup_all().await?;
    let (status, message) = if report.success {
        (StatusCode::OK, "Setup completed")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "Setup failed")
    };
    let body = ApiResponse {
        success: report.success,
        message: message.to_string(),
        data: Some(report),
    };
    Ok((status, Json(body)).into_response())
}
