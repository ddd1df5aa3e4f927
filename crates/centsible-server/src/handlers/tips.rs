//! `GET /api/smart-tips` (§6.2): savings-opportunity tips from C4.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use centsible_core::models::Tip;
use centsible_core::TipEngine;

use crate::{bounded_limit, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct TipsQuery {
    pub user_id: String,
    pub limit: Option<i64>,
}

pub async fn smart_tips(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TipsQuery>,
) -> Result<Json<Vec<Tip>>, AppError> {
    let limit = bounded_limit(query.limit, 1, 20, 20)?;

    let engine = TipEngine::new(&state.db);
    let tips = engine.suggest(&query.user_id, limit as usize)?;

    Ok(Json(tips))
}
