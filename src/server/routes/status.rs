use crate::db::is_plain_identifier;
use crate::error::AdminError;
use crate::server::router::AdminState;
use axum::{
    Json,
    extract::{Path, State},
};
use iot_admin_schema::{ApiResponse, SchemaStatus, TableStructure};

/// GET /api/status
///
/// Always 200; an unreachable server shows up as `connected: false`.
pub async fn get_status(
    State(state): State<AdminState>,
) -> Result<Json<ApiResponse<SchemaStatus>>, AdminError> {
    let status = state.admin.status().await?;
    let message = match (status.connected, status.database_exists) {
        (false, _) => "MySQL server is not reachable",
        (true, false) => "Connected; database does not exist yet",
        (true, true) => "Connected",
    };
    Ok(Json(ApiResponse::ok(message, status)))
}

/// GET /api/tables/{name}
pub async fn get_table_structure(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<TableStructure>>, AdminError> {
    if !is_plain_identifier(&name) {
        return Err(AdminError::InvalidName(name));
    }
    let structure = state.admin.table_structure(name.clone()).await?;
    Ok(Json(ApiResponse::ok(
        format!("Structure of table `{name}`"),
        structure,
    )))
}
