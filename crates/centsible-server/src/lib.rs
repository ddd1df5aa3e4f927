//! centsible HTTP/SSE facade (C8)
//!
//! Stateless translation layer over the analytics core: parses and
//! bound-checks query parameters, serialises engine outputs into the JSON
//! shapes of the REST surface, and emits `text/event-stream` frames for the
//! streaming weekly-alternatives endpoint.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use centsible_core::{Config, Database, Error, SearchClient, WeeklyConfig};

mod handlers;

/// Shared application state.
pub struct AppState {
    pub db: Database,
    pub search: SearchClient,
    pub weekly_config: WeeklyConfig,
    pub config: Config,
}

/// Build the application router (§4.8, §6.2).
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route(
            "/user/:user_id/transactions",
            get(handlers::transactions::list_transactions),
        )
        .route("/predict", get(handlers::predict::predict))
        .route("/smart-tips", get(handlers::tips::smart_tips))
        .route("/better-deals", get(handlers::deals::better_deals))
        .route(
            "/user/:user_id/weekly_alternatives",
            get(handlers::weekly::get_weekly_alternatives),
        )
        .route(
            "/user/:user_id/weekly_alternatives/history",
            get(handlers::weekly::get_weekly_alternatives_history),
        )
        .route(
            "/user/:user_id/weekly_alternatives/stream",
            get(handlers::weekly::stream_weekly_alternatives),
        );

    let cors = if state.config.cors_allow_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .cors_allow_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `GET /health` (§6.2): `{ok: true, store: "connected"|"degraded"}`.
async fn health(axum::extract::State(state): axum::extract::State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store = match state.db.conn() {
        Ok(_) => "connected",
        Err(_) => "degraded",
    };
    Json(serde_json::json!({"ok": true, "store": store}))
}

/// Bounds a `limit` query parameter to `[min, max]`, defaulting when absent.
pub(crate) fn bounded_limit(limit: Option<i64>, min: i64, max: i64, default: i64) -> Result<i64, AppError> {
    match limit {
        None => Ok(default),
        Some(n) if n >= min && n <= max => Ok(n),
        Some(_) => Err(AppError::bad_request(&format!(
            "limit must be between {min} and {max}"
        ))),
    }
}

/// Parses a `week` query parameter (`YYYY-MM-DD`).
pub(crate) fn parse_week(week: Option<&str>) -> Result<Option<chrono::NaiveDate>, AppError> {
    match week {
        None => Ok(None),
        Some(s) => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::bad_request("week must be formatted as YYYY-MM-DD")),
    }
}

/// The facade's error type (§7): maps engine error kinds to the HTTP
/// statuses of §6.2. `internal` is reserved for programmer errors and
/// returns an opaque message.
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
        }
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::CapabilityQuota(_) => StatusCode::TOO_MANY_REQUESTS,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::StoreUnavailable(_)
            | Error::Database(_)
            | Error::Pool(_)
            | Error::CapabilityUnavailable(_)
            | Error::Http(_)
            | Error::ParseError(_)
            | Error::Json(_)
            | Error::PersistConflict(_)
            | Error::Cancelled
            | Error::ConsumerSlow
            | Error::Config(_)
            | Error::Io(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %err, kind = err.kind(), "internal error serving request");
            "an internal error occurred".to_string()
        } else {
            err.to_string()
        };

        Self { status, message }
    }
}

#[cfg(test)]
mod tests;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
