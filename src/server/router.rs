use crate::db::AdminHandle;
use crate::server::routes::{config, definitions, setup, status};
use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Version, header::USER_AGENT},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine as _;
use iot_admin_schema::ApiResponse;
use rand::RngCore;
use serde_json::Value;
use std::time::Instant;
use tracing::{error, info, warn};

const MAX_REQUEST_ID_LEN: usize = 128;
const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

fn generate_request_id() -> String {
    // 96 bits => 16 chars base64url (no padding).
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

fn format_http_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2",
        Version::HTTP_3 => "HTTP/3",
        _ => "HTTP/?",
    }
}

#[derive(Clone)]
pub struct AdminState {
    pub admin: AdminHandle,
}

impl AdminState {
    pub fn new(admin: AdminHandle) -> Self {
        Self { admin }
    }
}

async fn not_found_handler(req: Request) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::<Value>::failure(format!(
            "No route for {} {}",
            req.method(),
            req.uri().path()
        ))),
    )
        .into_response()
}

async fn access_log(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let version = req.version();

    let request_id = req
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(generate_request_id);

    let user_agent = req
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let start = Instant::now();
    let mut resp = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        resp.headers_mut().insert(X_REQUEST_ID, value);
    }

    let status = resp.status();
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    let path = uri.path();
    let protocol = format_http_version(version);

    // Bootstrap requests can take seconds; latency covers the whole actor round trip.
    if status.is_server_error() {
        error!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else if status.is_client_error() {
        warn!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    } else {
        info!(
            "| {:>3} | {} | {:^7} | {:<8} | {} | {}ms | {}",
            status.as_u16(),
            request_id,
            method.as_str(),
            protocol,
            path,
            latency_ms,
            user_agent
        );
    }

    resp
}

pub fn admin_router(state: AdminState) -> Router {
    let setup = Router::new()
        .route("/api/setup/database", post(setup::create_database))
        .route("/api/setup/tables", post(setup::create_tables))
        .route("/api/setup/sample-data", post(setup::insert_sample_data))
        .route("/api/setup/all", post(setup::setup_all))
        .route("/api/setup/reset", post(setup::reset_database));

    let catalog = Router::new()
        .route("/api/status", get(status::get_status))
        .route("/api/tables/{name}", get(status::get_table_structure))
        .route("/api/definitions/{category}", get(definitions::list_definitions))
        .route(
            "/api/definitions/{category}/{name}",
            get(definitions::get_definition),
        );

    let config = Router::new()
        .route(
            "/api/config",
            get(config::get_config).put(config::update_config),
        )
        .route("/api/config/test", post(config::test_connection));

    Router::new()
        .merge(catalog)
        .merge(setup)
        .merge(config)
        .fallback(not_found_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log))
}
