//! Batch mode (§4.6.3) — the scheduled weekly job. Invoked over all users
//! active in a week, or a single named user, with bounded concurrency.

use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::search::SearchClient;

use super::{most_recent_completed_week, run_pipeline, WeeklyConfig};

/// Per-user failure recorded in the job log (§4.6.3).
#[derive(Debug, Clone, Serialize)]
pub struct FailedUser {
    pub user_id: String,
    pub error_kind: String,
}

/// The JSON job log emitted by a batch run (§4.6.3).
#[derive(Debug, Clone, Serialize)]
pub struct JobLog {
    pub job_at: chrono::DateTime<Utc>,
    pub week_start: NaiveDate,
    pub total_users: usize,
    pub successful: usize,
    pub failed: usize,
    pub failed_users: Vec<FailedUser>,
    pub items_analyzed: i64,
    pub alternatives_found: i64,
    pub total_savings: f64,
    pub mcp_calls_made: i64,
    pub processing_time_ms: i64,
}

/// Parameters accepted by a batch invocation (§4.6.3).
#[derive(Debug, Clone, Default)]
pub struct BatchParams {
    pub week_start: Option<NaiveDate>,
    pub user_id: Option<String>,
    pub dry_run: bool,
    pub concurrency: usize,
}

/// A best-effort process-level lease so the same `(job, week)` is not run
/// twice concurrently (§4.6.3). A lock file under the OS temp directory is
/// sufficient for the single-process reference deployment.
struct JobLease {
    path: PathBuf,
}

impl JobLease {
    fn acquire(week_start: NaiveDate) -> Option<Self> {
        let path = std::env::temp_dir().join(format!(
            "centsible-weekly-suggestions-{}.lock",
            week_start.format("%Y-%m-%d")
        ));

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Some(Self { path }),
            Err(_) => None,
        }
    }
}

impl Drop for JobLease {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Run the batch job (§4.6.3). Returns the job log; the caller (CLI)
/// decides the process exit code from `log.failed`.
pub async fn run_batch(
    db: &Database,
    search: &SearchClient,
    config: &WeeklyConfig,
    params: BatchParams,
) -> Result<JobLog> {
    let job_at = Utc::now();
    let week_start = params
        .week_start
        .unwrap_or_else(|| most_recent_completed_week(Utc::now().date_naive()));

    let _lease = JobLease::acquire(week_start);
    if _lease.is_none() {
        warn!(week = %week_start, "weekly suggestions job already running for this week, proceeding anyway");
    }

    let users = match &params.user_id {
        Some(user_id) => vec![user_id.clone()],
        None => db.active_users_for_week(week_start)?,
    };

    let concurrency = if params.concurrency == 0 {
        10
    } else {
        params.concurrency
    };

    info!(
        week = %week_start, users = users.len(), concurrency,
        "starting weekly suggestions batch run"
    );

    let results = run_bounded(db, search, config, &users, week_start, params.dry_run, concurrency).await;

    let mut successful = 0usize;
    let mut failed_users = Vec::new();
    let mut items_analyzed = 0i64;
    let mut alternatives_found = 0i64;
    let mut total_savings = 0.0f64;
    let mut mcp_calls_made = 0i64;

    for (user_id, result) in results {
        match result {
            Ok(report) => {
                successful += 1;
                items_analyzed += report.items_analyzed;
                alternatives_found += report.items_with_alternatives;
                total_savings += report.total_savings;
                mcp_calls_made += report.mcp_calls_made;
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "weekly suggestions failed for user");
                failed_users.push(FailedUser {
                    user_id,
                    error_kind: e.kind().to_string(),
                });
            }
        }
    }

    let log = JobLog {
        job_at,
        week_start,
        total_users: users.len(),
        successful,
        failed: failed_users.len(),
        failed_users,
        items_analyzed,
        alternatives_found,
        total_savings,
        mcp_calls_made,
        processing_time_ms: (Utc::now() - job_at).num_milliseconds(),
    };

    info!(
        successful = log.successful, failed = log.failed,
        "weekly suggestions batch run complete"
    );

    Ok(log)
}

/// Runs the pipeline for every user in `users` with at most `concurrency`
/// in flight at once. One user's failure never prevents the others from
/// completing (§4.6.3).
async fn run_bounded(
    db: &Database,
    search: &SearchClient,
    config: &WeeklyConfig,
    users: &[String],
    week_start: NaiveDate,
    dry_run: bool,
    concurrency: usize,
) -> Vec<(String, Result<crate::models::WeeklyReport>)> {
    let semaphore = std::sync::Arc::new(tokio::sync::Semaphore::new(concurrency));
    let mut tasks = Vec::with_capacity(users.len());

    for user_id in users {
        let permit = semaphore.clone().acquire_owned().await.expect("semaphore not closed");
        let db = db.clone();
        let search = search.clone();
        let config = config.clone();
        let user_id = user_id.clone();

        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            let result = run_pipeline(&db, &search, &config, &user_id, week_start, dry_run, None).await;
            (user_id, result)
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        match task.await {
            Ok(pair) => results.push(pair),
            Err(join_err) => results.push((
                "unknown".to_string(),
                Err(Error::Internal(format!("weekly suggestions task panicked: {join_err}"))),
            )),
        }
    }
    results
}
