use crate::db::DefinitionCategory;
use crate::error::AdminError;
use crate::server::router::AdminState;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use iot_admin_schema::ApiResponse;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub bulk: bool,
}

#[derive(Debug, Serialize)]
pub struct DefinitionList {
    pub category: DefinitionCategory,
    pub names: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct DefinitionText {
    pub category: DefinitionCategory,
    /// `None` for a bulk export.
    pub name: Option<String>,
    pub sql: String,
}

fn parse_category(segment: &str) -> Result<DefinitionCategory, AdminError> {
    DefinitionCategory::from_segment(segment)
        .ok_or_else(|| AdminError::NotFound(format!("definition category `{segment}`")))
}

/// GET /api/definitions/{category}
///
/// Names of the category's definition files; `?bulk=true` returns the concatenated text instead.
pub async fn list_definitions(
    State(state): State<AdminState>,
    Path(category): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Response, AdminError> {
    let category = parse_category(&category)?;

    if query.bulk {
        let sql = state.admin.bulk_definitions(category).await?;
        let body = DefinitionText {
            category,
            name: None,
            sql,
        };
        let message = format!("All {} definitions", category.label());
        return Ok(Json(ApiResponse::ok(message, body)).into_response());
    }

    let body = DefinitionList {
        category,
        names: category.files().to_vec(),
    };
    let message = format!("{} {} definitions", body.names.len(), category.label());
    Ok(Json(ApiResponse::ok(message, body)).into_response())
}

/// GET /api/definitions/{category}/{name}
pub async fn get_definition(
    State(state): State<AdminState>,
    Path((category, name)): Path<(String, String)>,
) -> Result<Json<ApiResponse<DefinitionText>>, AdminError> {
    let category = parse_category(&category)?;
    let sql = state.admin.definition(category, name.clone()).await?;
    Ok(Json(ApiResponse::ok(
        format!("{} definition `{name}`", category.label()),
        DefinitionText {
            category,
            name: Some(name),
            sql,
        },
    )))
}
