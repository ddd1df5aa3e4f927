//! Purchase Store operations (§4.1)

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::{params, ToSql};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{Location, NeedWant, PurchaseItem, PurchaseStatus};

/// Optional filters accepted by `list_items`.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<PurchaseItem> {
    let detected: String = row.get("detected_needwant")?;
    let user_nw: String = row.get("user_needwant")?;
    let status: String = row.get("status")?;
    let ts: String = row.get("ts")?;
    let created_at: String = row.get("created_at")?;

    Ok(PurchaseItem {
        item_id: row.get("item_id")?,
        purchase_id: row.get("purchase_id")?,
        user_id: row.get("user_id")?,
        merchant: row.get("merchant")?,
        item_name: row.get("item_name")?,
        category: row.get("category")?,
        subcategory: row.get("subcategory")?,
        item_text: row.get("item_text")?,
        price: row.get("price")?,
        qty: row.get("qty")?,
        ts: parse_datetime(&ts),
        detected_needwant: detected.parse().unwrap_or(NeedWant::Unset),
        user_needwant: user_nw.parse().unwrap_or(NeedWant::Unset),
        confidence: row.get("confidence")?,
        buyer_location: Location {
            city: row.get("buyer_city")?,
            state: row.get("buyer_state")?,
            country: row.get("buyer_country")?,
            postal_code: row.get("buyer_postal_code")?,
        },
        item_embed: row
            .get::<_, Option<String>>("item_embed")?
            .and_then(|s| serde_json::from_str(&s).ok()),
        status: status.parse().unwrap_or(PurchaseStatus::Active),
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    /// Insert a new purchase item. Items are immutable after insert except
    /// for `status` and `user_needwant` (§3.4).
    pub fn insert_item(&self, item: &PurchaseItem) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO purchase_items (
                item_id, purchase_id, user_id, merchant, item_name, category, subcategory,
                item_text, price, qty, ts, detected_needwant, user_needwant, confidence,
                buyer_city, buyer_state, buyer_country, buyer_postal_code, item_embed,
                status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                item.item_id,
                item.purchase_id,
                item.user_id,
                item.merchant,
                item.item_name,
                item.category,
                item.subcategory,
                item.item_text,
                item.price,
                item.qty,
                item.ts.format("%Y-%m-%d %H:%M:%S").to_string(),
                item.detected_needwant.as_str(),
                item.user_needwant.as_str(),
                item.confidence,
                item.buyer_location.city,
                item.buyer_location.state,
                item.buyer_location.country,
                item.buyer_location.postal_code,
                item.item_embed
                    .as_ref()
                    .map(|e| serde_json::to_string(e))
                    .transpose()?,
                item.status.as_str(),
                item.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ],
        )?;
        Ok(())
    }

    /// `list_items(user_id, since?, until?, limit?, order=ts_desc)` (§4.1).
    pub fn list_items(&self, user_id: &str, filter: &ItemFilter) -> Result<Vec<PurchaseItem>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT * FROM purchase_items WHERE user_id = ? AND status = 'active'",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(since) = filter.since {
            sql.push_str(" AND ts >= ?");
            params.push(Box::new(since.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        if let Some(until) = filter.until {
            sql.push_str(" AND ts < ?");
            params.push(Box::new(until.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        sql.push_str(" ORDER BY ts DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            params.push(Box::new(limit));
        }

        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_item)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// `list_items_by_category(user_id, category, since?, until?)` (§4.1).
    pub fn list_items_by_category(
        &self,
        user_id: &str,
        category: &str,
        since: Option<DateTime<Utc>>,
        until: Option<DateTime<Utc>>,
    ) -> Result<Vec<PurchaseItem>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            "SELECT * FROM purchase_items WHERE user_id = ? AND status = 'active' AND category = ?",
        );
        let mut params: Vec<Box<dyn ToSql>> = vec![
            Box::new(user_id.to_string()),
            Box::new(category.to_string()),
        ];

        if let Some(since) = since {
            sql.push_str(" AND ts >= ?");
            params.push(Box::new(since.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        if let Some(until) = until {
            sql.push_str(" AND ts < ?");
            params.push(Box::new(until.format("%Y-%m-%d %H:%M:%S").to_string()));
        }
        sql.push_str(" ORDER BY ts DESC");

        let refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(refs.as_slice(), row_to_item)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// `top_items_by_price(user_id, week_start, n)` (§4.1): items in
    /// `[week_start, week_start+7d)` ordered by `price * qty` desc, ties
    /// broken by `ts` desc then `item_id` asc.
    pub fn top_items_by_price(
        &self,
        user_id: &str,
        week_start: NaiveDate,
        n: i64,
    ) -> Result<Vec<PurchaseItem>> {
        let conn = self.conn()?;
        let week_end = week_start + Duration::days(7);

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM purchase_items
            WHERE user_id = ? AND status = 'active' AND ts >= ? AND ts < ?
            ORDER BY (price * qty) DESC, ts DESC, item_id ASC
            LIMIT ?
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                user_id,
                week_start.format("%Y-%m-%d").to_string(),
                week_end.format("%Y-%m-%d").to_string(),
                n,
            ],
            row_to_item,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// `active_users_for_week(week_start)` (§4.1): distinct users with at
    /// least one active item in the week.
    pub fn active_users_for_week(&self, week_start: NaiveDate) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let week_end = week_start + Duration::days(7);

        let mut stmt = conn.prepare(
            r#"
            SELECT DISTINCT user_id FROM purchase_items
            WHERE status = 'active' AND ts >= ? AND ts < ?
            ORDER BY user_id
            "#,
        )?;

        let rows = stmt.query_map(
            params![
                week_start.format("%Y-%m-%d").to_string(),
                week_end.format("%Y-%m-%d").to_string(),
            ],
            |row| row.get::<_, String>(0),
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
