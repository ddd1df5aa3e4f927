//! `GET /api/user/{user_id}/transactions` (§6.2): derived from C2's
//! `TransactionRollup`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::{bounded_limit, AppError, AppState};

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub id: String,
    pub item: String,
    pub amount: f64,
    pub date: chrono::DateTime<chrono::Utc>,
    pub category: String,
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<TransactionView>>, AppError> {
    let limit = bounded_limit(query.limit, 1, 100, 20)?;

    let rollups = state.db.transaction_rollups(&user_id)?;

    let transactions = rollups
        .into_iter()
        .take(limit as usize)
        .map(|r| TransactionView {
            id: r.id,
            item: r.item_text,
            amount: r.amount,
            date: r.occurred_at,
            category: r.category,
        })
        .collect();

    Ok(Json(transactions))
}
