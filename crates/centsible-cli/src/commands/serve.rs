//! `weekly-suggestions serve [--host] [--port]` (§6.2, §6.5).

use std::sync::Arc;

use anyhow::{Context, Result};
use centsible_core::Config;
use centsible_server::AppState;

use super::open;

pub async fn cmd_serve(config: Config, host: &str, port: u16) -> Result<()> {
    let (db, search) = open(&config)?;
    let weekly_config = config.weekly_config();

    let state = Arc::new(AppState {
        db,
        search,
        weekly_config,
        config,
    });

    let router = centsible_server::create_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %addr, "centsible facade listening");
    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
