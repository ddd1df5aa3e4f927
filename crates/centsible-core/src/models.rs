//! Core data types (§3 of the specification)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// `need | want | unset` — either the classifier's guess or the user's own correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedWant {
    Need,
    Want,
    Unset,
}

impl NeedWant {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeedWant::Need => "need",
            NeedWant::Want => "want",
            NeedWant::Unset => "unset",
        }
    }
}

impl fmt::Display for NeedWant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NeedWant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "need" => Ok(NeedWant::Need),
            "want" => Ok(NeedWant::Want),
            "unset" => Ok(NeedWant::Unset),
            _ => Err(format!("Unknown need/want label: {}", s)),
        }
    }
}

/// `active | refunded | reversed` — only `active` participates in analytics (invariant 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Active,
    Refunded,
    Reversed,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Active => "active",
            PurchaseStatus::Refunded => "refunded",
            PurchaseStatus::Reversed => "reversed",
        }
    }
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PurchaseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PurchaseStatus::Active),
            "refunded" => Ok(PurchaseStatus::Refunded),
            "reversed" => Ok(PurchaseStatus::Reversed),
            _ => Err(format!("Unknown purchase status: {}", s)),
        }
    }
}

/// Where a Finding's alternative can be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Local,
    Online,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Local => "local",
            Channel::Online => "online",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Channel::Local),
            "online" => Ok(Channel::Online),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

/// `{city, state, country, postal_code?}` — deliberately never carries lat/long (invariant 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

/// An item-level purchase record (§3.1). Owned by C1; immutable after insert
/// except for `status` and `user_needwant`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub item_id: String,
    pub purchase_id: String,
    pub user_id: String,
    pub merchant: String,
    pub item_name: String,
    pub category: String,
    pub subcategory: String,
    pub item_text: String,
    pub price: f64,
    pub qty: f64,
    pub ts: DateTime<Utc>,
    pub detected_needwant: NeedWant,
    pub user_needwant: NeedWant,
    pub confidence: f64,
    pub buyer_location: Location,
    pub item_embed: Option<Vec<f32>>,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl PurchaseItem {
    /// `user_needwant` if set, else `detected_needwant` (glossary: effective need/want label).
    pub fn effective_needwant(&self) -> NeedWant {
        if self.user_needwant != NeedWant::Unset {
            self.user_needwant
        } else {
            self.detected_needwant
        }
    }

    pub fn line_total(&self) -> f64 {
        self.price * self.qty
    }
}

/// Canonical normalised form used for embedding/matching: `"merchant · category · subcategory · item_name"`.
pub fn item_text(merchant: &str, category: &str, subcategory: &str, item_name: &str) -> String {
    format!("{merchant} · {category} · {subcategory} · {item_name}")
}

/// A validated cheaper-substitute record for a single purchased item (§3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub item_name: String,
    pub original_price: f64,
    pub original_merchant: String,
    pub alternative_merchant: String,
    pub alternative_price: f64,
    pub shipping_cost: f64,
    pub tax_estimate: f64,
    pub total_landed_cost: f64,
    pub total_savings: f64,
    pub url: String,
    pub notes: Option<String>,
    pub channel: Channel,
    pub confidence: f64,
}

/// A recurrence forecast for one `(item_name, category)` group (§4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub item: String,
    pub category: String,
    pub next_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
    pub avg_interval_days: f64,
    pub samples: usize,
    pub confidence: f64,
}

/// A single actionable recommendation produced by the Tip Engine (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub icon: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub monthly_savings: f64,
    pub action_tag: String,
    pub category: String,
}

/// A cheaper-merchant alternative derived from the Deal Catalog (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealSuggestion {
    pub current_store: String,
    pub current_spending_month: f64,
    pub alternative_store: String,
    pub savings_percent: f64,
    pub monthly_savings: f64,
    pub purchase_count: i64,
    pub category: String,
    pub all_alternatives: Vec<CatalogAlternative>,
}

/// One entry of the Deal Catalog's `merchant -> [alternative]` mapping (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogAlternative {
    pub alternative: String,
    pub savings_percent: f64,
    pub icon: String,
}

/// A bundle entry of the Deal Catalog used by Tip detector D4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogBundle {
    pub name: String,
    pub components: Vec<String>,
    pub bundle_price: f64,
}

/// A weekly alternative-suggestions report, unique per `(user_id, week_start)` (§3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub report_id: String,
    pub user_id: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub location: Location,
    pub items_analyzed: i64,
    pub items_with_alternatives: i64,
    pub total_savings: f64,
    pub findings: Vec<Finding>,
    pub notes: Option<String>,
    pub mcp_calls_made: i64,
    pub processing_time_ms: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Purchase-level rollup grouped by `purchase_id` (§4.2 TransactionRollup).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRollup {
    pub id: String,
    pub user_id: String,
    pub merchant: String,
    pub amount: f64,
    pub category: String,
    pub need_or_want: NeedWant,
    pub confidence: f64,
    pub occurred_at: DateTime<Utc>,
    pub item_text: String,
    /// `any(item_embed)` across the rollup's items (§4.2): whether at least
    /// one constituent item carries an embedding.
    pub embed: bool,
}

/// `(user_id, category, subcategory, week)` rollup (§4.2 CategoryWeekSummary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryWeekSummary {
    pub user_id: String,
    pub category: String,
    pub subcategory: String,
    pub week_start: NaiveDate,
    pub purchase_count: i64,
    pub item_count: i64,
    pub total_spend: f64,
    pub need_spend: f64,
    pub want_spend: f64,
    pub mean_confidence: f64,
    pub user_labelled_count: i64,
}
