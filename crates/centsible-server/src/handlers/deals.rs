//! `GET /api/better-deals` (§6.2): merchant-alternative suggestions from C5.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use centsible_core::models::DealSuggestion;
use centsible_core::DealCatalog;

use crate::{bounded_limit, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct DealsQuery {
    pub user_id: String,
    pub limit: Option<i64>,
}

pub async fn better_deals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DealsQuery>,
) -> Result<Json<Vec<DealSuggestion>>, AppError> {
    let limit = bounded_limit(query.limit, 1, 20, 20)?;

    let catalog = DealCatalog::with_category_allow_list(
        &state.db,
        state.config.deals_allowed_categories.clone(),
    );
    let deals = catalog.suggest_deals(&query.user_id, limit as usize)?;

    Ok(Json(deals))
}
