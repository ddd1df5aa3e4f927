//! Streaming mode (§4.6.4) — wires the shared pipeline to a bounded event
//! channel suitable for an SSE handler. One pipeline run serves exactly one
//! subscriber; there is no fan-out broadcast here, unlike this codebase's
//! other realtime-notification shape, because each run is tied to a single
//! request's `(user, week)` and must cancel independently if that one
//! consumer disappears.

use chrono::{NaiveDate, Utc};
use tokio::sync::mpsc;
use tracing::warn;

use crate::db::Database;
use crate::error::Result;
use crate::search::SearchClient;

use super::{run_pipeline, EventSink, WeeklyConfig, WeeklyEvent, EVENT_BUFFER};

/// Starts the pipeline in the background and returns the receiving end of
/// its event channel. Dropping the receiver (the HTTP client disconnected)
/// causes the next `try_send` inside the pipeline to fail, which aborts the
/// run with `Error::ConsumerSlow` (§5: streaming requests are cancelled
/// when the consumer goes away).
pub fn spawn_stream(
    db: Database,
    search: SearchClient,
    config: WeeklyConfig,
    user_id: String,
    week_start: NaiveDate,
) -> mpsc::Receiver<WeeklyEvent> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let sink: EventSink = tx;

    tokio::spawn(async move {
        let result = run_pipeline(&db, &search, &config, &user_id, week_start, false, Some(&sink)).await;
        if let Err(e) = result {
            if !matches!(e, crate::error::Error::ConsumerSlow) {
                let _ = sink.try_send(WeeklyEvent::Error {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    at: Utc::now(),
                });
            } else {
                warn!(user_id = %user_id, week = %week_start, "streaming consumer fell behind, pipeline aborted");
            }
        }
    });

    rx
}

/// Runs the pipeline to completion against an explicit sink, for callers
/// that want to drive the channel themselves (used by tests and by batch
/// callers that also want progress events).
pub async fn run_streamed(
    db: &Database,
    search: &SearchClient,
    config: &WeeklyConfig,
    user_id: &str,
    week_start: NaiveDate,
    sink: &EventSink,
) -> Result<crate::models::WeeklyReport> {
    run_pipeline(db, search, config, user_id, week_start, false, Some(sink)).await
}
