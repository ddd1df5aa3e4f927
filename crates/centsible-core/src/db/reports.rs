//! Report Store operations (§4.7)

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Finding, Location, WeeklyReport};

/// Optional bound on `list_history`.
#[derive(Debug, Clone)]
pub struct ReportFilter {
    pub limit: i64,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self { limit: 4 }
    }
}

fn row_to_report(row: &rusqlite::Row) -> rusqlite::Result<WeeklyReport> {
    let week_start: String = row.get("week_start")?;
    let week_end: String = row.get("week_end")?;
    let findings_json: String = row.get("findings")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    let findings: Vec<Finding> = serde_json::from_str(&findings_json).unwrap_or_default();

    Ok(WeeklyReport {
        report_id: row.get("report_id")?,
        user_id: row.get("user_id")?,
        week_start: parse_date(&week_start),
        week_end: parse_date(&week_end),
        location: Location {
            city: row.get("buyer_city")?,
            state: row.get("buyer_state")?,
            country: row.get("buyer_country")?,
            postal_code: row.get("buyer_postal_code")?,
        },
        items_analyzed: row.get("items_analyzed")?,
        items_with_alternatives: row.get("items_with_alternatives")?,
        total_savings: row.get("total_savings")?,
        findings,
        notes: row.get("notes")?,
        mcp_calls_made: row.get("mcp_calls_made")?,
        processing_time_ms: row.get("processing_time_ms")?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

impl Database {
    /// `upsert(report)` (§4.7): merges on `(user_id, week_start)`, preserving
    /// `created_at` and setting `updated_at = now`.
    pub fn upsert_report(&self, report: &WeeklyReport) -> Result<()> {
        let conn = self.conn()?;
        let findings_json = serde_json::to_string(&report.findings)?;

        conn.execute(
            r#"
            INSERT INTO weekly_reports (
                report_id, user_id, week_start, week_end, buyer_city, buyer_state,
                buyer_country, buyer_postal_code, items_analyzed, items_with_alternatives,
                total_savings, findings, notes, mcp_calls_made, processing_time_ms,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
            ON CONFLICT(user_id, week_start) DO UPDATE SET
                report_id = excluded.report_id,
                week_end = excluded.week_end,
                buyer_city = excluded.buyer_city,
                buyer_state = excluded.buyer_state,
                buyer_country = excluded.buyer_country,
                buyer_postal_code = excluded.buyer_postal_code,
                items_analyzed = excluded.items_analyzed,
                items_with_alternatives = excluded.items_with_alternatives,
                total_savings = excluded.total_savings,
                findings = excluded.findings,
                notes = excluded.notes,
                mcp_calls_made = excluded.mcp_calls_made,
                processing_time_ms = excluded.processing_time_ms,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                report.report_id,
                report.user_id,
                report.week_start.format("%Y-%m-%d").to_string(),
                report.week_end.format("%Y-%m-%d").to_string(),
                report.location.city,
                report.location.state,
                report.location.country,
                report.location.postal_code,
                report.items_analyzed,
                report.items_with_alternatives,
                report.total_savings,
                findings_json,
                report.notes,
                report.mcp_calls_made,
                report.processing_time_ms,
            ],
        )?;
        Ok(())
    }

    /// `get(user_id, week_start?)` (§4.7): the exact week, or the most
    /// recent report if `week_start` is omitted. Absent if none exists.
    pub fn get_report(
        &self,
        user_id: &str,
        week_start: Option<NaiveDate>,
    ) -> Result<Option<WeeklyReport>> {
        let conn = self.conn()?;

        match week_start {
            Some(week) => conn
                .query_row(
                    "SELECT * FROM weekly_reports WHERE user_id = ? AND week_start = ?",
                    params![user_id, week.format("%Y-%m-%d").to_string()],
                    row_to_report,
                )
                .optional()
                .map_err(Into::into),
            None => conn
                .query_row(
                    "SELECT * FROM weekly_reports WHERE user_id = ? ORDER BY week_start DESC LIMIT 1",
                    params![user_id],
                    row_to_report,
                )
                .optional()
                .map_err(Into::into),
        }
    }

    /// `list_history(user_id, limit = 4)` (§4.7): reports ordered by
    /// `week_start` desc.
    pub fn list_report_history(
        &self,
        user_id: &str,
        filter: &ReportFilter,
    ) -> Result<Vec<WeeklyReport>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM weekly_reports WHERE user_id = ? ORDER BY week_start DESC LIMIT ?",
        )?;
        let rows = stmt.query_map(params![user_id, filter.limit], row_to_report)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
