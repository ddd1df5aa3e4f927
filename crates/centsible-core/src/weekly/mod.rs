//! Weekly Suggester (C6) — the core pipeline shared by batch mode
//! (`batch.rs`) and streaming mode (`stream.rs`), per §4.6.1.

pub mod batch;
pub mod stream;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Finding, Location, WeeklyReport};
use crate::search::{parsing, SearchBackend, SearchClient};

/// Tunables named in §6.6.
#[derive(Debug, Clone)]
pub struct WeeklyConfig {
    pub top_n: usize,
    pub min_savings_usd: f64,
    pub max_findings: usize,
}

impl Default for WeeklyConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            min_savings_usd: 10.0,
            max_findings: 20,
        }
    }
}

/// A minimal item view used in the `items_loaded` event (§4.6.4).
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub name: String,
    pub price: f64,
    pub merchant: String,
}

/// Ordered event kinds emitted by streaming mode (§4.6.4). The `event` tag
/// is the wire-level discriminant required by §6.3 ("the event kind is the
/// `event` JSON property of the payload").
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WeeklyEvent {
    Start {
        user_id: String,
        week_start: NaiveDate,
        at: DateTime<Utc>,
    },
    ItemsLoaded {
        count: usize,
        items: Vec<ItemSummary>,
    },
    Analyzing {
        message: String,
    },
    Progress {
        chunk: String,
    },
    Found(Finding),
    Complete {
        items_analyzed: i64,
        items_with_alternatives: i64,
        total_savings: f64,
        processing_time_ms: i64,
    },
    Error {
        kind: String,
        message: String,
        at: DateTime<Utc>,
    },
}

/// Bounded event buffer (§4.6.4: "reference: 16"). A consumer that cannot
/// keep up causes `try_send` to fail, which the pipeline treats as fatal.
pub const EVENT_BUFFER: usize = 16;

pub type EventSink = mpsc::Sender<WeeklyEvent>;

fn emit(sink: Option<&EventSink>, event: WeeklyEvent) -> Result<()> {
    match sink {
        None => Ok(()),
        Some(tx) => tx
            .try_send(event)
            .map_err(|_| Error::ConsumerSlow),
    }
}

/// Retries a store call per §4.6.5: up to 3 retries, exponential backoff
/// from 200ms capped at 2s, only for `store_unavailable`-class errors.
async fn with_store_retry<T>(mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut delay = Duration::from_millis(200);
    for attempt in 0.. {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable_in_weekly_suggester() && attempt < 3 => {
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(Duration::from_secs(2));
            }
            Err(e) => return Err(e),
        }
    }
    unreachable!()
}

/// Runs the shared core pipeline for one `(user, week)`. `sink` is `None`
/// for batch mode and `Some` for streaming mode; the pipeline's logic is
/// otherwise identical between the two (§4.6.1/§4.6.4).
pub async fn run_pipeline(
    db: &Database,
    search: &SearchClient,
    config: &WeeklyConfig,
    user_id: &str,
    week_start: NaiveDate,
    dry_run: bool,
    sink: Option<&EventSink>,
) -> Result<WeeklyReport> {
    let started = Instant::now();

    emit(
        sink,
        WeeklyEvent::Start {
            user_id: user_id.to_string(),
            week_start,
            at: Utc::now(),
        },
    )?;

    // Step 1: select top items of the week.
    let db_ref = db.clone();
    let user = user_id.to_string();
    let top_n = config.top_n as i64;
    let items = with_store_retry(|| db_ref.top_items_by_price(&user, week_start, top_n)).await?;

    if items.is_empty() {
        let report = empty_report(user_id, week_start);
        emit(
            sink,
            WeeklyEvent::Complete {
                items_analyzed: 0,
                items_with_alternatives: 0,
                total_savings: 0.0,
                processing_time_ms: elapsed_ms(started),
            },
        )?;
        if !dry_run {
            with_store_retry(|| db.upsert_report(&report)).await?;
        }
        return Ok(report);
    }

    emit(
        sink,
        WeeklyEvent::ItemsLoaded {
            count: items.len(),
            items: items
                .iter()
                .map(|i| ItemSummary {
                    name: i.item_name.clone(),
                    price: i.price,
                    merchant: i.merchant.clone(),
                })
                .collect(),
        },
    )?;

    // Step 2: mode location, ties broken by most recent.
    let location = mode_location(&items);

    // Step 3: build the search prompt.
    let prompt = build_prompt(&items, &location, config.min_savings_usd);

    emit(
        sink,
        WeeklyEvent::Analyzing {
            message: format!("searching for cheaper alternatives to {} items", items.len()),
        },
    )?;

    // Step 4: call the web-search capability, forwarding chunks as progress
    // events, with the capability_unavailable retry of §4.6.5 (one retry).
    let (chunk_tx, mut chunk_rx) = mpsc::unbounded_channel();
    let forward_sink = sink.cloned();
    let forwarder = tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            let _ = emit(forward_sink.as_ref(), WeeklyEvent::Progress { chunk });
        }
    });

    let mut mcp_calls_made = 0i64;
    let mut final_text = None;
    let mut last_err = None;
    for attempt in 0..2 {
        mcp_calls_made += 1;
        match search.search(&prompt, search.model(), chunk_tx.clone()).await {
            Ok(text) => {
                final_text = Some(text);
                break;
            }
            Err(e @ Error::CapabilityQuota(_)) => {
                last_err = Some(e);
                break;
            }
            Err(e) => {
                last_err = Some(e);
                if attempt == 0 {
                    continue;
                }
            }
        }
    }
    drop(chunk_tx);
    let _ = forwarder.await;

    let final_text = match final_text {
        Some(text) => text,
        None => return Err(last_err.unwrap_or(Error::Internal("search capability failed".into()))),
    };

    // Step 5: parse findings. `parse_error` is terminal for this user but
    // not for the job: the report is still persisted with zero
    // alternatives and the error kind noted (§4.6.5).
    let mut notes = None;
    let mut parse_failed = false;
    let findings: Vec<Finding> = match parsing::parse_findings(&final_text, config.min_savings_usd) {
        Ok(f) => f,
        Err(e) => {
            notes = Some(format!("{}: {e}", e.kind()));
            parse_failed = true;
            emit(
                sink,
                WeeklyEvent::Error {
                    kind: e.kind().to_string(),
                    message: e.to_string(),
                    at: Utc::now(),
                },
            )?;
            Vec::new()
        }
    };
    let mut findings = findings;
    findings.truncate(config.max_findings);

    for finding in &findings {
        emit(sink, WeeklyEvent::Found(finding.clone()))?;
    }

    // Step 6: assemble the report.
    let total_savings = findings.iter().map(|f| f.total_savings).sum();
    let report = WeeklyReport {
        report_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        week_start,
        week_end: week_start + chrono::Duration::days(6),
        location,
        items_analyzed: items.len() as i64,
        items_with_alternatives: findings.len() as i64,
        total_savings,
        findings,
        notes,
        mcp_calls_made,
        processing_time_ms: elapsed_ms(started),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    // Step 7: persist, unless dry-run. `upsert_report` is an atomic
    // `INSERT ... ON CONFLICT DO UPDATE`, so `Error::PersistConflict` can't
    // actually surface here; the kind stays in the failure model (§7) for
    // stores where upsert isn't atomic.
    if !dry_run {
        db.upsert_report(&report)?;
    }

    // A parse failure already emitted the stream's terminal `error` event
    // (§4.6.4: `error` and `complete` are mutually exclusive terminals), but
    // the report itself still counts as persisted for batch bookkeeping.
    if !parse_failed {
        emit(
            sink,
            WeeklyEvent::Complete {
                items_analyzed: report.items_analyzed,
                items_with_alternatives: report.items_with_alternatives,
                total_savings: report.total_savings,
                processing_time_ms: report.processing_time_ms,
            },
        )?;
    }

    Ok(report)
}

/// The most recent completed ISO week (Monday) in UTC, relative to `today`.
/// Shared by batch mode's default `week_start` and the streaming/report
/// endpoints' default when the caller omits `week` (§4.6.3).
pub fn most_recent_completed_week(today: NaiveDate) -> NaiveDate {
    use chrono::Datelike;
    let this_monday = today - chrono::Duration::days(today.weekday().num_days_from_monday() as i64);
    this_monday - chrono::Duration::days(7)
}

fn elapsed_ms(started: Instant) -> i64 {
    started.elapsed().as_millis() as i64
}

fn empty_report(user_id: &str, week_start: NaiveDate) -> WeeklyReport {
    WeeklyReport {
        report_id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        week_start,
        week_end: week_start + chrono::Duration::days(6),
        location: Location {
            city: String::new(),
            state: String::new(),
            country: String::new(),
            postal_code: None,
        },
        items_analyzed: 0,
        items_with_alternatives: 0,
        total_savings: 0.0,
        findings: Vec::new(),
        notes: None,
        mcp_calls_made: 0,
        processing_time_ms: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Mode of `buyer_location.{city,state,country}` across the week's items,
/// ties broken by most recent (§4.6.1 step 2).
fn mode_location(items: &[crate::models::PurchaseItem]) -> Location {
    let mut by_location: HashMap<(String, String, String), (usize, DateTime<Utc>)> =
        HashMap::new();

    for item in items {
        let key = (
            item.buyer_location.city.clone(),
            item.buyer_location.state.clone(),
            item.buyer_location.country.clone(),
        );
        let entry = by_location.entry(key).or_insert((0, item.ts));
        entry.0 += 1;
        if item.ts > entry.1 {
            entry.1 = item.ts;
        }
    }

    let ((city, state, country), _) = by_location
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| a.1 .1.cmp(&b.1 .1)))
        .unwrap();

    let postal_code = items
        .iter()
        .find(|i| i.buyer_location.city == city && i.buyer_location.state == state)
        .and_then(|i| i.buyer_location.postal_code.clone());

    Location {
        city,
        state,
        country,
        postal_code,
    }
}

/// Builds the language-neutral prompt of §4.6.1 step 3.
fn build_prompt(items: &[crate::models::PurchaseItem], location: &Location, min_savings: f64) -> String {
    let mut prompt = String::new();
    prompt.push_str("Find cheaper purchasable alternatives for these items:\n");
    for item in items {
        prompt.push_str(&format!(
            "- {} (${:.2} at {}, near {}, {})\n",
            item.item_name, item.price, item.merchant, location.city, location.state
        ));
    }
    prompt.push_str(&format!(
        "\nConstraints: minimum savings of ${:.2} USD per item; respond with a JSON array of objects \
         with fields item_name, original_price, original_merchant, alternative_merchant, alternative_price, \
         shipping_cost, tax_estimate, total_landed_cost, total_savings, url, notes, channel, confidence; \
         include shipping and tax in total_landed_cost; each alternative must be a purchasable URL.",
        min_savings
    ));
    prompt
}
