//! Tip Engine (§4.4) — four independent detectors over a 60-day active
//! window, merged by a thin dedup/sort pass. Each detector only ever adds
//! findings; the merge step is the sole place their outputs interact
//! (§10.5, following the registered-analyzer-plus-orchestrator shape).

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::db::Database;
use crate::deals::DealCatalog;
use crate::error::Result;
use crate::models::{PurchaseItem, Tip};

const WINDOW_DAYS: i64 = 60;
const SUBSCRIPTION_MIN_INTERVAL_DAYS: f64 = 28.0;
const SUBSCRIPTION_MAX_INTERVAL_DAYS: f64 = 32.0;

/// Categories eligible for the D1 high-frequency-item detector.
const D1_CATEGORIES: &[&str] = &["Coffee", "Food"];

pub struct TipEngine<'a> {
    db: &'a Database,
}

impl<'a> TipEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Run all four detectors and merge into at most `n` tips (§4.4).
    pub fn suggest(&self, user_id: &str, n: usize) -> Result<Vec<Tip>> {
        let since = Utc::now() - Duration::days(WINDOW_DAYS);
        let items = self.db.list_items(
            user_id,
            &crate::db::ItemFilter {
                since: Some(since),
                until: None,
                limit: None,
            },
        )?;

        let mut tips = Vec::new();
        tips.extend(detect_high_frequency_item(&items));
        tips.extend(detect_category_overspend(&items));
        tips.extend(detect_under_used_subscription(&items));
        tips.extend(detect_bundle_opportunity(self.db, &items)?);

        Ok(merge(tips, n))
    }
}

fn monthly_spend(total_over_window: f64, window_days: i64) -> f64 {
    total_over_window / window_days as f64 * 30.0
}

/// D1 – high-frequency item.
fn detect_high_frequency_item(items: &[PurchaseItem]) -> Vec<Tip> {
    let mut by_name: HashMap<String, Vec<&PurchaseItem>> = HashMap::new();
    for item in items {
        if D1_CATEGORIES.iter().any(|c| *c == item.category) {
            by_name.entry(item.item_name.clone()).or_default().push(item);
        }
    }

    by_name
        .into_iter()
        .filter(|(_, group)| group.len() >= 4)
        .map(|(name, group)| {
            let total: f64 = group.iter().map(|i| i.line_total()).sum();
            let savings = 0.60 * monthly_spend(total, WINDOW_DAYS);
            Tip {
                icon: "repeat".to_string(),
                title: format!("Cut back on {name}"),
                subtitle: format!("{} purchases in the last 60 days", group.len()),
                description: format!(
                    "You've bought {name} {} times recently — trimming this habit could save real money each month.",
                    group.len()
                ),
                monthly_savings: savings,
                action_tag: "reduce_frequency".to_string(),
                category: group[0].category.clone(),
            }
        })
        .collect()
}

/// D2 – category overspend.
fn detect_category_overspend(items: &[PurchaseItem]) -> Vec<Tip> {
    let mut by_category: HashMap<String, f64> = HashMap::new();
    for item in items {
        *by_category.entry(item.category.clone()).or_insert(0.0) += item.line_total();
    }

    let mut totals: Vec<f64> = by_category.values().copied().collect();
    if totals.is_empty() {
        return Vec::new();
    }
    totals.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median = totals[totals.len() / 2];

    let mut ranked: Vec<(String, f64)> = by_category.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    ranked
        .into_iter()
        .take(3)
        .filter(|(_, total)| median > 0.0 && *total >= median * 1.5)
        .map(|(category, total)| {
            let savings = 0.30 * monthly_spend(total, WINDOW_DAYS);
            Tip {
                icon: "trending-down".to_string(),
                title: format!("{category} spending is running high"),
                subtitle: "Top category over the last 60 days".to_string(),
                description: format!(
                    "Your {category} spending is well above your typical category spend."
                ),
                monthly_savings: savings,
                action_tag: "review_category".to_string(),
                category,
            }
        })
        .collect()
}

/// D3 – under-used subscription.
fn detect_under_used_subscription(items: &[PurchaseItem]) -> Vec<Tip> {
    let mut by_merchant_price: HashMap<(String, String), Vec<&PurchaseItem>> = HashMap::new();
    for item in items {
        let price_key = format!("{:.2}", item.price);
        by_merchant_price
            .entry((item.merchant.clone(), price_key))
            .or_default()
            .push(item);
    }

    let mut by_merchant_activity: HashMap<&str, usize> = HashMap::new();
    let since_30 = Utc::now() - Duration::days(30);
    for item in items {
        if item.ts >= since_30 {
            *by_merchant_activity.entry(item.merchant.as_str()).or_insert(0) += 1;
        }
    }

    by_merchant_price
        .into_iter()
        .filter_map(|((merchant, _price), mut group)| {
            if group.len() < 2 {
                return None;
            }
            group.sort_by_key(|i| i.ts);
            let intervals_ok = group.windows(2).all(|w| {
                let days = (w[1].ts - w[0].ts).num_seconds() as f64 / 86_400.0;
                (SUBSCRIPTION_MIN_INTERVAL_DAYS..=SUBSCRIPTION_MAX_INTERVAL_DAYS).contains(&days)
            });
            if !intervals_ok {
                return None;
            }

            let activity = *by_merchant_activity.get(merchant.as_str()).unwrap_or(&0);
            if activity > 4 {
                return None;
            }

            let price = group.last().unwrap().price;
            Some(Tip {
                icon: "pause".to_string(),
                title: format!("{merchant} subscription looks under-used"),
                subtitle: "Low recent activity for this recurring charge".to_string(),
                description: format!(
                    "You're paying {merchant} roughly every month but have used it only {activity} times in the last 30 days."
                ),
                monthly_savings: price,
                action_tag: "cancel_subscription".to_string(),
                category: group[0].category.clone(),
            })
        })
        .collect()
}

/// D4 – bundle opportunity.
fn detect_bundle_opportunity(db: &Database, items: &[PurchaseItem]) -> Result<Vec<Tip>> {
    let catalog = DealCatalog::new(db);
    let bundles = catalog.bundles();

    let mut entertainment_merchants: HashMap<String, f64> = HashMap::new();
    for item in items {
        if item.category == "Entertainment" {
            *entertainment_merchants
                .entry(item.merchant.clone())
                .or_insert(0.0) += monthly_spend(item.line_total(), WINDOW_DAYS);
        }
    }

    if entertainment_merchants.len() < 2 {
        return Ok(Vec::new());
    }

    let mut tips = Vec::new();
    for bundle in &bundles {
        let matching: Vec<(&String, &f64)> = entertainment_merchants
            .iter()
            .filter(|(merchant, _)| bundle.components.iter().any(|c| c == *merchant))
            .collect();

        if matching.len() < 2 {
            continue;
        }

        let combined: f64 = matching.iter().map(|(_, spend)| **spend).sum();
        if combined <= bundle.bundle_price {
            continue;
        }

        tips.push(Tip {
            icon: "package".to_string(),
            title: format!("Switch to the {}", bundle.name),
            subtitle: format!("Covers {} of your subscriptions", matching.len()),
            description: format!(
                "Bundling {} subscriptions into the {} would cost ${:.2}/mo instead of ${:.2}/mo.",
                matching.len(),
                bundle.name,
                bundle.bundle_price,
                combined
            ),
            monthly_savings: combined - bundle.bundle_price,
            action_tag: "switch_to_bundle".to_string(),
            category: "Entertainment".to_string(),
        });
    }

    Ok(tips)
}

/// Merge rule (§4.4): dedup by `title`, keep the higher `monthly_savings`,
/// order desc, truncate to `n`.
fn merge(tips: Vec<Tip>, n: usize) -> Vec<Tip> {
    let mut best: HashMap<String, Tip> = HashMap::new();
    for tip in tips {
        best.entry(tip.title.clone())
            .and_modify(|existing| {
                if tip.monthly_savings > existing.monthly_savings {
                    *existing = tip.clone();
                }
            })
            .or_insert(tip);
    }

    let mut merged: Vec<Tip> = best.into_values().collect();
    merged.sort_by(|a, b| b.monthly_savings.partial_cmp(&a.monthly_savings).unwrap());
    merged.truncate(n);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NeedWant, PurchaseStatus};

    fn item(merchant: &str, category: &str, name: &str, price: f64, days_ago: i64) -> PurchaseItem {
        let ts = Utc::now() - Duration::days(days_ago);
        PurchaseItem {
            item_id: format!("item-{merchant}-{days_ago}"),
            purchase_id: format!("purchase-{merchant}-{days_ago}"),
            user_id: "alice".to_string(),
            merchant: merchant.to_string(),
            item_name: name.to_string(),
            category: category.to_string(),
            subcategory: String::new(),
            item_text: String::new(),
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
                postal_code: None,
            },
            item_embed: None,
            status: PurchaseStatus::Active,
            created_at: ts,
        }
    }

    /// S3 — 22 Starbucks purchases of $7.25 in 60 days: monthly spend
    /// ≈ $79.75, expected tip savings ≈ $47.85.
    #[test]
    fn frequent_coffee_produces_the_expected_savings() {
        let items: Vec<PurchaseItem> = (0..22)
            .map(|i| item("Starbucks", "Coffee", "Starbucks · Coffee", 7.25, i * 2))
            .collect();

        let tips = detect_high_frequency_item(&items);
        assert_eq!(tips.len(), 1);
        assert_eq!(tips[0].action_tag, "reduce_frequency");
        assert!((tips[0].monthly_savings - 47.85).abs() < 0.01);
    }

    #[test]
    fn fewer_than_four_purchases_produce_no_high_frequency_tip() {
        let items: Vec<PurchaseItem> = (0..3)
            .map(|i| item("Starbucks", "Coffee", "Starbucks · Coffee", 7.25, i))
            .collect();
        assert!(detect_high_frequency_item(&items).is_empty());
    }

    #[test]
    fn merge_keeps_the_higher_savings_tip_per_title_and_orders_desc() {
        let low = Tip {
            icon: "repeat".to_string(),
            title: "Cut back on Coffee".to_string(),
            subtitle: String::new(),
            description: String::new(),
            monthly_savings: 10.0,
            action_tag: "reduce_frequency".to_string(),
            category: "Coffee".to_string(),
        };
        let high = Tip {
            monthly_savings: 50.0,
            ..low.clone()
        };
        let other = Tip {
            icon: "trending-down".to_string(),
            title: "Groceries spending is running high".to_string(),
            subtitle: String::new(),
            description: String::new(),
            monthly_savings: 20.0,
            action_tag: "review_category".to_string(),
            category: "Groceries".to_string(),
        };

        let merged = merge(vec![low, high.clone(), other.clone()], 10);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].title, high.title);
        assert_eq!(merged[0].monthly_savings, 50.0);
        assert_eq!(merged[1].title, other.title);
    }
}
