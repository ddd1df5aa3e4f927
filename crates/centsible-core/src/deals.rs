//! Deal Catalog (§4.5) — a static, versioned reference table of cheaper
//! merchant alternatives and subscription bundles. Edits require
//! redeployment; there is no runtime mutation path.

use std::collections::HashMap;

use chrono::{Duration, Utc};

use crate::db::Database;
use crate::error::Result;
use crate::models::{CatalogAlternative, CatalogBundle, DealSuggestion};

/// Categories eligible for deal suggestions (§4.5 step 3 default allow-list).
const DEFAULT_CATEGORY_ALLOW_LIST: &[&str] = &["Groceries"];

const LOOKBACK_DAYS: i64 = 30;

/// The static merchant-alternative mapping and bundle list (§4.5).
pub struct DealCatalog<'a> {
    db: &'a Database,
    category_allow_list: Vec<String>,
}

impl<'a> DealCatalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            category_allow_list: DEFAULT_CATEGORY_ALLOW_LIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_category_allow_list(db: &'a Database, allow_list: Vec<String>) -> Self {
        Self {
            db,
            category_allow_list: allow_list,
        }
    }

    /// The static `merchant -> [alternative]` reference table.
    pub fn alternatives(&self) -> HashMap<&'static str, Vec<CatalogAlternative>> {
        catalog_alternatives()
    }

    /// The static list of streaming/subscription bundles.
    pub fn bundles(&self) -> Vec<CatalogBundle> {
        catalog_bundles()
    }

    /// `suggest_deals(user_id, limit)` (§4.5).
    pub fn suggest_deals(&self, user_id: &str, limit: usize) -> Result<Vec<DealSuggestion>> {
        let since = Utc::now() - Duration::days(LOOKBACK_DAYS);
        let items = self.db.list_items(
            user_id,
            &crate::db::ItemFilter {
                since: Some(since),
                until: None,
                limit: None,
            },
        )?;

        let mut by_merchant: HashMap<String, (f64, i64, String)> = HashMap::new();
        for item in &items {
            let entry = by_merchant
                .entry(item.merchant.clone())
                .or_insert((0.0, 0, item.category.clone()));
            entry.0 += item.line_total();
            entry.1 += 1;
        }

        let catalog = catalog_alternatives();

        let mut suggestions: Vec<DealSuggestion> = by_merchant
            .into_iter()
            .filter(|(_, (_, count, _))| *count >= 2)
            .filter_map(|(merchant, (monthly_spend, count, category))| {
                if !self.category_allow_list.iter().any(|c| c == &category) {
                    return None;
                }
                let alternatives = catalog.get(merchant.as_str())?;
                let best = alternatives
                    .iter()
                    .max_by(|a, b| a.savings_percent.partial_cmp(&b.savings_percent).unwrap())?;

                Some(DealSuggestion {
                    current_store: merchant,
                    current_spending_month: monthly_spend,
                    alternative_store: best.alternative.clone(),
                    savings_percent: best.savings_percent,
                    monthly_savings: monthly_spend * best.savings_percent,
                    purchase_count: count,
                    category,
                    all_alternatives: alternatives.clone(),
                })
            })
            .collect();

        suggestions.sort_by(|a, b| b.monthly_savings.partial_cmp(&a.monthly_savings).unwrap());
        suggestions.truncate(limit);
        Ok(suggestions)
    }
}

fn catalog_alternatives() -> HashMap<&'static str, Vec<CatalogAlternative>> {
    let mut map = HashMap::new();
    map.insert(
        "Whole Foods",
        vec![CatalogAlternative {
            alternative: "Aldi".to_string(),
            savings_percent: 0.25,
            icon: "cart".to_string(),
        }],
    );
    map.insert(
        "Starbucks",
        vec![CatalogAlternative {
            alternative: "Dunkin'".to_string(),
            savings_percent: 0.20,
            icon: "coffee".to_string(),
        }],
    );
    map.insert(
        "Target",
        vec![CatalogAlternative {
            alternative: "Walmart".to_string(),
            savings_percent: 0.12,
            icon: "store".to_string(),
        }],
    );
    map
}

fn catalog_bundles() -> Vec<CatalogBundle> {
    vec![CatalogBundle {
        name: "Disney Bundle".to_string(),
        components: vec!["Disney+".to_string(), "Hulu".to_string(), "ESPN+".to_string()],
        bundle_price: 19.99,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, NeedWant, PurchaseItem, PurchaseStatus};

    fn item(merchant: &str, category: &str, price: f64, days_ago: i64) -> PurchaseItem {
        let ts = Utc::now() - Duration::days(days_ago);
        PurchaseItem {
            item_id: format!("item-{merchant}-{days_ago}"),
            purchase_id: format!("purchase-{merchant}-{days_ago}"),
            user_id: "alice".to_string(),
            merchant: merchant.to_string(),
            item_name: merchant.to_string(),
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

    #[test]
    fn suggests_an_alternative_for_a_cataloged_merchant_with_repeat_purchases() {
        let db = Database::in_memory().expect("failed to create in-memory database");
        db.insert_item(&item("Whole Foods", "Groceries", 60.0, 3)).unwrap();
        db.insert_item(&item("Whole Foods", "Groceries", 45.0, 10)).unwrap();

        let catalog = DealCatalog::new(&db);
        let deals = catalog.suggest_deals("alice", 5).unwrap();

        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].current_store, "Whole Foods");
        assert_eq!(deals[0].alternative_store, "Aldi");
        assert_eq!(deals[0].purchase_count, 2);
        assert!((deals[0].monthly_savings - (105.0 * 0.25)).abs() < 1e-9);
    }

    #[test]
    fn a_category_outside_the_allow_list_is_never_suggested() {
        let db = Database::in_memory().expect("failed to create in-memory database");
        db.insert_item(&item("Starbucks", "Coffee", 7.25, 3)).unwrap();
        db.insert_item(&item("Starbucks", "Coffee", 7.25, 10)).unwrap();

        let catalog = DealCatalog::new(&db);
        assert!(catalog.suggest_deals("alice", 5).unwrap().is_empty());
    }

    #[test]
    fn a_single_purchase_never_qualifies() {
        let db = Database::in_memory().expect("failed to create in-memory database");
        db.insert_item(&item("Whole Foods", "Groceries", 60.0, 3)).unwrap();

        let catalog = DealCatalog::new(&db);
        assert!(catalog.suggest_deals("alice", 5).unwrap().is_empty());
    }
}
