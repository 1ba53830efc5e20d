//! # API REST
//!
//! REST surface of the intake handler.
//!
//! Handles:
//! - `POST /store-data` with axum, adapting HTTP requests onto [`IntakeProcessor`]
//! - `GET /health`
//! - OpenAPI/Swagger documentation
//!
//! Uses `api-shared` for the health response and `intake-core` for everything else.

#![warn(rust_2018_idioms)]

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use intake_api_shared::{HealthRes, HealthService};
use intake_core::{IntakeProcessor, IntakeRequest, IntakeResponse};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state for the REST API server
#[derive(Clone)]
pub struct AppState {
    processor: Arc<IntakeProcessor>,
}

#[derive(OpenApi)]
#[openapi(paths(health, store_data), components(schemas(HealthRes)))]
pub struct ApiDoc;

/// Build the router serving the intake endpoints.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the remote address
/// is recorded in stored envelopes.
pub fn build_router(processor: Arc<IntakeProcessor>) -> Router {
    let state = AppState { processor };

    Router::new()
        .route("/health", get(health))
        // every method is routed so that non-POST requests get the handler's own 400
        .route("/store-data", any(store_data))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/store-data",
    request_body(
        content = String,
        content_type = "application/x-www-form-urlencoded",
        description = "Form fields, including `hashed-string` and `hash-value`"
    ),
    responses(
        (status = 200, description = "Submission stored, confirmation page", content_type = "text/html"),
        (status = 400, description = "Wrong method, missing fields or integrity mismatch", content_type = "text/plain"),
        (status = 500, description = "Diagnostic report of an unexpected fault", content_type = "text/plain")
    )
)]
/// Store one form submission.
///
/// Processing is synchronous (filesystem and git) and runs on the blocking pool. A panic
/// there is reported like any other fault.
#[axum::debug_handler]
async fn store_data(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = IntakeRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        remote_addr: connect_info
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_default(),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: body.to_vec(),
    };

    let processor = state.processor.clone();
    let job = request.clone();
    let response = match tokio::task::spawn_blocking(move || processor.handle(&job)).await {
        Ok(response) => response,
        Err(e) => {
            let description = if e.is_panic() {
                format!("processing panicked: {}", panic_message(e.into_panic()))
            } else {
                "processing was cancelled".to_string()
            };
            tracing::error!("Store data error: {}", description);
            state.processor.fault_response(&request, &description)
        }
    };

    into_http(response)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(message) => (*message).to_string(),
            Err(_) => "unknown panic payload".to_string(),
        },
    }
}

fn into_http(response: IntakeResponse) -> Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
        .into_response()
}
