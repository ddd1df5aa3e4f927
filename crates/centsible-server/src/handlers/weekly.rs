//! `GET /api/user/{user_id}/weekly_alternatives[...]` (§6.2, §6.3): the
//! Weekly Suggester's HTTP and SSE surface.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::HeaderValue;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};

use centsible_core::db::ReportFilter;
use centsible_core::models::WeeklyReport;
use centsible_core::weekly::stream::spawn_stream;
use centsible_core::{most_recent_completed_week, SearchClient};

use crate::{bounded_limit, parse_week, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct WeekQuery {
    pub week: Option<String>,
}

/// `GET /api/user/{user_id}/weekly_alternatives`
pub async fn get_weekly_alternatives(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeeklyReport>, AppError> {
    let week_start = parse_week(query.week.as_deref())?;

    let report = state.db.get_report(&user_id, week_start)?;

    report
        .map(Json)
        .ok_or_else(|| AppError::not_found("no weekly alternatives report for this user/week"))
}

#[derive(Debug, Serialize)]
pub struct WeeklyReportSummary {
    pub report_id: String,
    pub week_start: chrono::NaiveDate,
    pub week_end: chrono::NaiveDate,
    pub items_analyzed: i64,
    pub items_with_alternatives: i64,
    pub total_savings: f64,
    pub notes: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<WeeklyReport> for WeeklyReportSummary {
    fn from(r: WeeklyReport) -> Self {
        Self {
            report_id: r.report_id,
            week_start: r.week_start,
            week_end: r.week_end,
            items_analyzed: r.items_analyzed,
            items_with_alternatives: r.items_with_alternatives,
            total_savings: r.total_savings,
            notes: r.notes,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

/// `GET /api/user/{user_id}/weekly_alternatives/history`
pub async fn get_weekly_alternatives_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<WeeklyReportSummary>>, AppError> {
    let limit = bounded_limit(query.limit, 1, 20, 4)?;

    let reports = state
        .db
        .list_report_history(&user_id, &ReportFilter { limit })?;

    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

/// `GET /api/user/{user_id}/weekly_alternatives/stream` (§4.6.4, §6.3).
///
/// Runs the pipeline live for `(user_id, week_start)` and relays its event
/// channel as `text/event-stream` frames. Dropping the response (client
/// disconnect) drops the receiver, which aborts the pipeline on its next
/// emit (§5).
pub async fn stream_weekly_alternatives(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<WeekQuery>,
) -> Result<Response, AppError> {
    let week_start = parse_week(query.week.as_deref())?
        .unwrap_or_else(|| most_recent_completed_week(chrono::Utc::now().date_naive()));

    let search: SearchClient = state.search.clone();
    let rx = spawn_stream(
        state.db.clone(),
        search,
        state.weekly_config.clone(),
        user_id,
        week_start,
    );

    let stream = ReceiverStream::new(rx).map(|event| {
        let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
        Ok::<_, Infallible>(SseEvent::default().data(data))
    });

    let sse = Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)));
    let mut response = sse.into_response();
    let headers = response.headers_mut();
    headers.insert("cache-control", HeaderValue::from_static("no-cache"));
    headers.insert("connection", HeaderValue::from_static("keep-alive"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}
