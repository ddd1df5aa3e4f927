//! HTTP/SSE facade tests
//!
//! Grounded on this codebase's `tower::ServiceExt::oneshot` pattern for
//! exercising the router without binding a real listener.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::TimeZone;
use http_body_util::BodyExt;
use tower::ServiceExt;

use centsible_core::db::Database;
use centsible_core::models::{Location, NeedWant, PurchaseItem, PurchaseStatus};
use centsible_core::{Config, SearchClient};

use super::*;

fn item(user_id: &str, item_name: &str, merchant: &str, price: f64, ts: chrono::DateTime<chrono::Utc>) -> PurchaseItem {
    PurchaseItem {
        item_id: format!("item-{item_name}-{merchant}"),
        purchase_id: format!("purchase-{item_name}"),
        user_id: user_id.to_string(),
        merchant: merchant.to_string(),
        item_name: item_name.to_string(),
        category: "Electronics".to_string(),
        subcategory: String::new(),
        item_text: centsible_core::models::item_text(merchant, "Electronics", "", item_name),
        price,
        qty: 1.0,
        ts,
        detected_needwant: NeedWant::Want,
        user_needwant: NeedWant::Unset,
        confidence: 0.9,
        buyer_location: Location {
            city: "Austin".to_string(),
            state: "TX".to_string(),
            country: "US".to_string(),
            postal_code: Some("78701".to_string()),
        },
        item_embed: None,
        status: PurchaseStatus::Active,
        created_at: ts,
    }
}

fn test_state(search: SearchClient) -> Arc<AppState> {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let config = Config::default();
    Arc::new(AppState {
        weekly_config: config.weekly_config(),
        db,
        search,
        config,
    })
}

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_a_connected_store() {
    let app = create_router(test_state(SearchClient::new(None, "default")));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["store"], "connected");
}

#[tokio::test]
async fn transactions_lists_rollups_for_a_user() {
    let state = test_state(SearchClient::new(None, "default"));
    let ts = chrono::Utc::now();
    state.db.insert_item(&item("alice", "Headphones", "BigBox", 99.0, ts)).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user/alice/transactions")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn predict_rejects_an_out_of_range_limit() {
    let app = create_router(test_state(SearchClient::new(None, "default")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/predict?user_id=alice&limit=1000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn weekly_alternatives_404s_when_no_report_exists() {
    let app = create_router(test_state(SearchClient::new(None, "default")));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user/alice/weekly_alternatives?week=2025-11-03")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// S5 — streaming happy path: the mock backend's fixed finding clears the
/// default `min_savings_usd` floor, so the stream carries a `found` and a
/// `complete` event with `items_with_alternatives: 1`, and no wire-level
/// `event:` field or SSE headers are missing (§4.8, §6.3).
#[tokio::test]
async fn weekly_alternatives_stream_reports_a_found_item() {
    let state = test_state(SearchClient::new(None, "default"));
    let week_start = centsible_core::most_recent_completed_week(chrono::Utc::now().date_naive());
    let ts = chrono::Utc
        .from_utc_datetime(&week_start.and_hms_opt(12, 0, 0).unwrap());
    state.db.insert_item(&item("alice", "Headphones", "BigBox", 149.99, ts)).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/user/alice/weekly_alternatives/stream?week={week_start}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-cache"
    );
    assert_eq!(
        response.headers().get("connection").unwrap(),
        "keep-alive"
    );
    assert_eq!(
        response.headers().get("x-accel-buffering").unwrap(),
        "no"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(!body.contains("event:"), "SSE frames must not carry a wire-level event: field");
    assert!(body.contains("\"event\":\"start\""));
    assert!(body.contains("\"event\":\"found\""));
    assert!(body.contains("\"event\":\"complete\""));
    assert!(body.contains("\"items_with_alternatives\":1"));
}

/// S6 — streaming parse failure: a malformed capability response still
/// drives the stream to a terminal `error{kind:parse_error}` event.
#[tokio::test]
async fn weekly_alternatives_stream_surfaces_a_parse_error() {
    use centsible_core::MockSearchBackend;

    let state = test_state(SearchClient::Mock(MockSearchBackend::malformed("default")));
    let week_start = centsible_core::most_recent_completed_week(chrono::Utc::now().date_naive());
    let ts = chrono::Utc
        .from_utc_datetime(&week_start.and_hms_opt(12, 0, 0).unwrap());
    state.db.insert_item(&item("alice", "Headphones", "BigBox", 149.99, ts)).unwrap();
    let app = create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/api/user/alice/weekly_alternatives/stream?week={week_start}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains("\"event\":\"error\""));
    assert!(body.contains("\"kind\":\"parse_error\""));
}
