//! `weekly-suggestions [--week] [--user] [--dry-run] [--concurrency]` (§6.5).

use anyhow::Result;
use centsible_core::weekly::batch::{run_batch, BatchParams};
use centsible_core::Config;
use chrono::NaiveDate;

use super::open;

/// Runs the batch job and prints the resulting job log as JSON to stdout.
/// Returns the process exit code per §6.5: `0` all succeeded, `1` at least
/// one user failed.
pub async fn cmd_batch(
    config: &Config,
    week: Option<&str>,
    user: Option<String>,
    dry_run: bool,
    concurrency: usize,
) -> Result<i32> {
    let week_start = week
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?;

    let (db, search) = open(config)?;
    let weekly_config = config.weekly_config();

    let params = BatchParams {
        week_start,
        user_id: user,
        dry_run,
        concurrency,
    };

    let log = run_batch(&db, &search, &weekly_config, params).await?;
    println!("{}", serde_json::to_string_pretty(&log)?);

    Ok(if log.failed > 0 { 1 } else { 0 })
}
