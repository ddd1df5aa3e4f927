//! Aggregation Views (§4.2) — pure logical projections over the Purchase
//! Store, computed on demand from `purchase_items`.

use std::collections::HashMap;

use chrono::Datelike;

use super::Database;
use crate::error::Result;
use crate::models::{CategoryWeekSummary, TransactionRollup};
use crate::models::{NeedWant, PurchaseItem};

/// ISO-week Monday in UTC for a timestamp (§6.1: week bucketing is UTC
/// unless the user has a stored zone; the reference deployment has none).
fn week_start(ts: &chrono::DateTime<chrono::Utc>) -> chrono::NaiveDate {
    let date = ts.date_naive();
    let weekday = date.weekday().num_days_from_monday();
    date - chrono::Duration::days(weekday as i64)
}

fn mode<'a, I: IntoIterator<Item = &'a str>>(values: I) -> String {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(v, _)| v.to_string())
        .unwrap_or_default()
}

impl Database {
    /// `TransactionRollup` (§4.2): groups active items by `purchase_id`.
    pub fn transaction_rollups(&self, user_id: &str) -> Result<Vec<TransactionRollup>> {
        let items = self.list_items(user_id, &super::ItemFilter::default())?;

        let mut groups: HashMap<String, Vec<PurchaseItem>> = HashMap::new();
        for item in items {
            groups.entry(item.purchase_id.clone()).or_default().push(item);
        }

        let mut rollups: Vec<TransactionRollup> = groups
            .into_iter()
            .map(|(purchase_id, mut group)| {
                group.sort_by(|a, b| a.item_id.cmp(&b.item_id));

                let amount: f64 = group.iter().map(|i| i.line_total()).sum();
                let category = mode(group.iter().map(|i| i.category.as_str()));
                let need_or_want_str = mode(
                    group
                        .iter()
                        .map(|i| i.effective_needwant().as_str()),
                );
                let confidence =
                    group.iter().map(|i| i.confidence).sum::<f64>() / group.len() as f64;
                let item_text = group
                    .iter()
                    .map(|i| i.item_name.as_str())
                    .collect::<Vec<_>>()
                    .join(" · ");
                let embed = group.iter().any(|i| i.item_embed.is_some());

                TransactionRollup {
                    id: purchase_id,
                    user_id: user_id.to_string(),
                    merchant: group[0].merchant.clone(),
                    amount,
                    category,
                    need_or_want: need_or_want_str.parse().unwrap_or(NeedWant::Unset),
                    confidence,
                    occurred_at: group[0].ts,
                    item_text,
                    embed,
                }
            })
            .collect();

        rollups.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(rollups)
    }

    /// `CategoryWeekSummary` (§4.2): groups active items by
    /// `(user_id, category, subcategory, week(ts))`.
    pub fn category_week_summaries(&self, user_id: &str) -> Result<Vec<CategoryWeekSummary>> {
        let items = self.list_items(user_id, &super::ItemFilter::default())?;

        let mut groups: HashMap<(String, String, chrono::NaiveDate), Vec<PurchaseItem>> =
            HashMap::new();
        for item in items {
            let key = (
                item.category.clone(),
                item.subcategory.clone(),
                week_start(&item.ts),
            );
            groups.entry(key).or_default().push(item);
        }

        let mut purchase_counts: HashMap<(String, String, chrono::NaiveDate), usize> =
            HashMap::new();
        for ((category, subcategory, week), group) in &groups {
            let distinct: std::collections::HashSet<&str> =
                group.iter().map(|i| i.purchase_id.as_str()).collect();
            purchase_counts.insert(
                (category.clone(), subcategory.clone(), *week),
                distinct.len(),
            );
        }

        let mut summaries: Vec<CategoryWeekSummary> = groups
            .into_iter()
            .map(|((category, subcategory, week_start), group)| {
                let item_count = group.len() as i64;
                let total_spend: f64 = group.iter().map(|i| i.line_total()).sum();
                let need_spend: f64 = group
                    .iter()
                    .filter(|i| i.effective_needwant() == NeedWant::Need)
                    .map(|i| i.line_total())
                    .sum();
                let want_spend: f64 = group
                    .iter()
                    .filter(|i| i.effective_needwant() == NeedWant::Want)
                    .map(|i| i.line_total())
                    .sum();
                let mean_confidence =
                    group.iter().map(|i| i.confidence).sum::<f64>() / group.len() as f64;
                let user_labelled_count = group
                    .iter()
                    .filter(|i| i.user_needwant != NeedWant::Unset)
                    .count() as i64;
                let purchase_count = *purchase_counts
                    .get(&(category.clone(), subcategory.clone(), week_start))
                    .unwrap_or(&0) as i64;

                CategoryWeekSummary {
                    user_id: user_id.to_string(),
                    category,
                    subcategory,
                    week_start,
                    purchase_count,
                    item_count,
                    total_spend,
                    need_spend,
                    want_spend,
                    mean_confidence,
                    user_labelled_count,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.week_start
                .cmp(&a.week_start)
                .then_with(|| a.category.cmp(&b.category))
        });
        Ok(summaries)
    }
}
