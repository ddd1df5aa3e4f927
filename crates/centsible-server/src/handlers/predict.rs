//! `GET /api/predict` (§6.2): recurring-purchase forecasts from C3.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use centsible_core::models::Prediction;
use centsible_core::predict::PredictionEngine;

use crate::{bounded_limit, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct PredictQuery {
    pub user_id: String,
    pub limit: Option<i64>,
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictQuery>,
) -> Result<Json<Vec<Prediction>>, AppError> {
    let limit = bounded_limit(query.limit, 1, 20, 20)?;

    let engine = PredictionEngine::new(&state.db);
    let predictions = engine.predict(&query.user_id, limit as usize)?;

    Ok(Json(predictions))
}
