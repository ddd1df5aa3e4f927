//! Prediction Engine (§4.3) — recurrence forecasting over active purchase
//! history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::Result;
use crate::models::{Prediction, PurchaseItem};

/// Minimum confidence a group must reach to be emitted (§4.3 step 4).
const MIN_CONFIDENCE: f64 = 0.5;

/// Forecasts recurring purchases for a user, grounded on `detect.rs`'s
/// config-holding-detector shape (§10.5).
pub struct PredictionEngine<'a> {
    db: &'a Database,
}

impl<'a> PredictionEngine<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Predict up to `n` upcoming recurring purchases for `user_id` (§4.3).
    pub fn predict(&self, user_id: &str, n: usize) -> Result<Vec<Prediction>> {
        let mut items = self.db.list_items(user_id, &crate::db::ItemFilter::default())?;
        items.sort_by_key(|i| i.ts);

        let groups = group_by_item(&items);

        let mut predictions: Vec<Prediction> = groups
            .into_iter()
            .filter_map(|(_, group)| predict_group(&group))
            .filter(|p| p.confidence >= MIN_CONFIDENCE)
            .collect();

        predictions.sort_by(|a, b| {
            a.next_time
                .cmp(&b.next_time)
                .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap())
                .then_with(|| a.item.cmp(&b.item))
        });
        predictions.truncate(n);

        Ok(predictions)
    }
}

fn group_by_item(items: &[PurchaseItem]) -> HashMap<(String, String), Vec<&PurchaseItem>> {
    let mut groups: HashMap<(String, String), Vec<&PurchaseItem>> = HashMap::new();
    for item in items {
        let key = (item.item_name.trim().to_lowercase(), item.category.clone());
        groups.entry(key).or_default().push(item);
    }
    groups
}

fn predict_group(group: &[&PurchaseItem]) -> Option<Prediction> {
    if group.len() < 2 {
        return None;
    }

    let timestamps: Vec<DateTime<Utc>> = group.iter().map(|i| i.ts).collect();
    let intervals: Vec<f64> = timestamps
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as f64 / 86_400.0)
        .collect();

    let avg = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let variance =
        intervals.iter().map(|d| (d - avg).powi(2)).sum::<f64>() / intervals.len() as f64;
    let sd = variance.sqrt();

    let sample_factor = (group.len().min(10) as f64) / 10.0;
    let regularity_factor = if avg > 0.0 {
        (1.0 - sd / avg).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let confidence = 0.2 + 0.4 * sample_factor + 0.4 * regularity_factor;

    let last_time = *timestamps.last().unwrap();
    let next_time = last_time + chrono::Duration::seconds((avg * 86_400.0) as i64);

    Some(Prediction {
        item: group[0].item_name.clone(),
        category: group[0].category.clone(),
        next_time,
        last_time,
        avg_interval_days: avg,
        samples: group.len(),
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NeedWant, PurchaseStatus};
    use chrono::TimeZone;

    fn coffee(ts: DateTime<Utc>) -> PurchaseItem {
        PurchaseItem {
            item_id: format!("item-{ts}"),
            purchase_id: format!("purchase-{ts}"),
            user_id: "alice".to_string(),
            merchant: "Starbucks".to_string(),
            item_name: "Starbucks · Coffee".to_string(),
            category: "Coffee".to_string(),
            subcategory: String::new(),
            item_text: String::new(),
            price: 7.25,
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

    /// S1 — ten consecutive daily coffee purchases.
    #[test]
    fn daily_coffee_yields_a_high_confidence_prediction() {
        let latest = Utc.with_ymd_and_hms(2025, 11, 10, 8, 30, 0).unwrap();
        let items: Vec<PurchaseItem> = (0..10)
            .map(|i| coffee(latest - chrono::Duration::days(9 - i)))
            .collect();

        let groups = group_by_item(&items);
        assert_eq!(groups.len(), 1);
        let group = groups.values().next().unwrap();
        let prediction = predict_group(group).expect("ten regular samples must predict");

        assert_eq!(prediction.samples, 10);
        assert!((prediction.avg_interval_days - 1.0).abs() < 1e-9);
        assert_eq!(prediction.next_time, latest + chrono::Duration::days(1));
        assert!((prediction.confidence - 1.0).abs() < 1e-9);
    }

    /// S2 — two Netflix charges 30 days apart: regular but too few samples
    /// to earn high confidence.
    #[test]
    fn two_widely_spaced_charges_yield_a_low_confidence_prediction() {
        let first = Utc.with_ymd_and_hms(2025, 10, 11, 9, 0, 0).unwrap();
        let second = first + chrono::Duration::days(30);
        let mut netflix = coffee(first);
        netflix.merchant = "Netflix".to_string();
        netflix.item_name = "Netflix".to_string();
        netflix.category = "Entertainment".to_string();
        netflix.price = 15.49;
        let mut second_charge = netflix.clone();
        second_charge.ts = second;
        second_charge.created_at = second;

        let prediction = predict_group(&[&netflix, &second_charge])
            .expect("two regular samples must still predict");

        assert_eq!(prediction.samples, 2);
        assert!((prediction.confidence - 0.68).abs() < 1e-9);
    }

    #[test]
    fn a_single_purchase_never_predicts() {
        let only = coffee(Utc.with_ymd_and_hms(2025, 11, 10, 8, 30, 0).unwrap());
        assert!(predict_group(&[&only]).is_none());
    }
}
