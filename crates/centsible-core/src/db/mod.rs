//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `purchases` - item-level purchase records (C1)
//! - `rollups` - purchase and category/week rollups (C2)
//! - `reports` - weekly alternative-suggestions reports (C7)

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod purchases;
mod reports;
mod rollups;

pub use purchases::ItemFilter;
pub use reports::ReportFilter;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Database wrapper with connection pooling.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open (or create) the database at `path`, applying migrations.
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// The filesystem path backing this database.
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// An isolated on-disk database for tests, one per call.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/centsible_test_{}.db", id);
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA cache_size = 2000;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Item-level purchase records (§3.1, invariant 1: only `active`
            -- status rows participate in analytics — rows are never deleted).
            CREATE TABLE IF NOT EXISTS purchase_items (
                item_id TEXT PRIMARY KEY,
                purchase_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                merchant TEXT NOT NULL,
                item_name TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT NOT NULL DEFAULT '',
                item_text TEXT NOT NULL,
                price REAL NOT NULL,
                qty REAL NOT NULL DEFAULT 1,
                ts DATETIME NOT NULL,
                detected_needwant TEXT NOT NULL DEFAULT 'unset',
                user_needwant TEXT NOT NULL DEFAULT 'unset',
                confidence REAL NOT NULL DEFAULT 0,
                buyer_city TEXT NOT NULL DEFAULT '',
                buyer_state TEXT NOT NULL DEFAULT '',
                buyer_country TEXT NOT NULL DEFAULT '',
                buyer_postal_code TEXT,
                item_embed TEXT,
                status TEXT NOT NULL DEFAULT 'active',
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_purchase_items_user ON purchase_items(user_id);
            CREATE INDEX IF NOT EXISTS idx_purchase_items_user_ts ON purchase_items(user_id, ts);
            CREATE INDEX IF NOT EXISTS idx_purchase_items_purchase ON purchase_items(purchase_id);
            CREATE INDEX IF NOT EXISTS idx_purchase_items_status ON purchase_items(status);
            CREATE INDEX IF NOT EXISTS idx_purchase_items_category ON purchase_items(category, subcategory);

            -- Weekly alternative-suggestions reports (§3.1, §4.6), unique per
            -- (user_id, week_start).
            CREATE TABLE IF NOT EXISTS weekly_reports (
                report_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                week_start DATE NOT NULL,
                week_end DATE NOT NULL,
                buyer_city TEXT NOT NULL DEFAULT '',
                buyer_state TEXT NOT NULL DEFAULT '',
                buyer_country TEXT NOT NULL DEFAULT '',
                buyer_postal_code TEXT,
                items_analyzed INTEGER NOT NULL DEFAULT 0,
                items_with_alternatives INTEGER NOT NULL DEFAULT 0,
                total_savings REAL NOT NULL DEFAULT 0,
                findings TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                mcp_calls_made INTEGER NOT NULL DEFAULT 0,
                processing_time_ms INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(user_id, week_start)
            );

            CREATE INDEX IF NOT EXISTS idx_weekly_reports_user ON weekly_reports(user_id, week_start DESC);
            "#,
        )?;

        info!(path = %self.db_path, "database migrations applied");
        Ok(())
    }
}

pub(crate) fn parse_date(s: &str) -> chrono::NaiveDate {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|dt| dt.date())
            .unwrap_or_else(|_| chrono::Utc::now().date_naive())
    })
}

pub(crate) fn parse_datetime(s: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| chrono::Utc::now())
}
