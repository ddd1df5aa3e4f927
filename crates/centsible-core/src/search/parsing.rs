//! Parses the web-search capability's final textual output into validated
//! `Finding` values (§4.6.1 step 5).
//!
//! Adapted from this codebase's brace-matching AI-response parser: that
//! idiom locates a single top-level JSON *object* by depth-counting braces.
//! Step 5 instead needs the first top-level JSON *array*, so this module
//! depth-counts `[`/`]` — a naive `find('[')`/`rfind(']')` pair would include
//! any array nested inside a sibling object that appears later in the text.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{Channel, Finding};

#[derive(Deserialize)]
struct RawFinding {
    item_name: String,
    original_price: f64,
    original_merchant: String,
    alternative_merchant: String,
    alternative_price: f64,
    #[serde(default)]
    shipping_cost: f64,
    #[serde(default)]
    tax_estimate: f64,
    total_landed_cost: f64,
    total_savings: f64,
    url: String,
    #[serde(default)]
    notes: Option<String>,
    channel: Channel,
    confidence: f64,
}

/// Strip code-fence markers, locate the first top-level JSON array, decode
/// each entry, and apply the validation rules of §4.6.1 step 5. `min_savings_usd`
/// is the configured floor (§6.6 `CENTSIBLE_WEEKLY_MIN_SAVINGS_USD`) below
/// which a finding is dropped.
pub fn parse_findings(text: &str, min_savings_usd: f64) -> Result<Vec<Finding>> {
    let stripped = strip_code_fences(text);
    let array_text = find_first_json_array(&stripped)
        .ok_or_else(|| Error::ParseError("no JSON array found in search output".to_string()))?;

    let raw: Vec<RawFinding> = serde_json::from_str(array_text)
        .map_err(|e| Error::ParseError(format!("invalid findings JSON: {e}")))?;

    Ok(raw
        .into_iter()
        .map(to_finding)
        .filter(|f| f.total_savings >= min_savings_usd)
        .collect())
}

fn to_finding(raw: RawFinding) -> Finding {
    let round2 = |v: f64| (v.max(0.0) * 100.0).round() / 100.0;

    Finding {
        item_name: raw.item_name,
        original_price: round2(raw.original_price),
        original_merchant: raw.original_merchant,
        alternative_merchant: raw.alternative_merchant,
        alternative_price: round2(raw.alternative_price),
        shipping_cost: round2(raw.shipping_cost),
        tax_estimate: round2(raw.tax_estimate),
        total_landed_cost: round2(raw.total_landed_cost),
        total_savings: round2(raw.total_savings),
        url: raw.url,
        notes: raw.notes,
        channel: raw.channel,
        confidence: raw.confidence.clamp(0.0, 1.0),
    }
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches('\n');
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
        return rest.trim().to_string();
    }
    trimmed.to_string()
}

fn find_first_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0;

    for (i, c) in text[start..].char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_array_with_surrounding_prose() {
        let text = r#"Here are the results:
```json
[
  {
    "item_name": "Widget",
    "original_price": 20.00,
    "original_merchant": "Acme",
    "alternative_merchant": "Acme Outlet",
    "alternative_price": 5.00,
    "shipping_cost": 0.0,
    "tax_estimate": 0.40,
    "total_landed_cost": 5.40,
    "total_savings": 14.60,
    "url": "https://example.com/widget",
    "notes": null,
    "channel": "online",
    "confidence": 1.4
  }
]
```
Hope that helps!"#;

        let findings = parse_findings(text, 10.0).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].confidence, 1.0);
    }

    #[test]
    fn drops_entries_below_minimum_savings() {
        let text = r#"[
          {"item_name": "A", "original_price": 10.0, "original_merchant": "X",
           "alternative_merchant": "Y", "alternative_price": 9.0, "shipping_cost": 0.0,
           "tax_estimate": 0.0, "total_landed_cost": 9.0, "total_savings": 1.0,
           "url": "https://example.com/a", "channel": "online", "confidence": 0.5}
        ]"#;

        let findings = parse_findings(text, 10.0).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn honors_a_configured_minimum_below_the_default() {
        let text = r#"[
          {"item_name": "A", "original_price": 10.0, "original_merchant": "X",
           "alternative_merchant": "Y", "alternative_price": 9.0, "shipping_cost": 0.0,
           "tax_estimate": 0.0, "total_landed_cost": 9.0, "total_savings": 1.0,
           "url": "https://example.com/a", "channel": "online", "confidence": 0.5}
        ]"#;

        let findings = parse_findings(text, 0.5).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn rejects_text_with_no_array() {
        assert!(parse_findings("no json here", 10.0).is_err());
    }

    #[test]
    fn stops_at_the_matching_bracket_of_the_first_array_even_with_nested_objects() {
        let text = r#"[
          {"item_name": "A", "original_price": 50.0, "original_merchant": "X",
           "alternative_merchant": "Y", "alternative_price": 30.0, "shipping_cost": 0.0,
           "tax_estimate": 0.0, "total_landed_cost": 30.0, "total_savings": 20.0,
           "url": "https://example.com/a", "channel": "local", "confidence": 0.9, "notes": "see [1]"}
        ] trailing prose with a stray ] bracket"#;

        // A naive find('[')/rfind(']') pair would instead extend through the
        // trailing stray ']', producing invalid JSON - depth counting must
        // close at the bracket that balances the opening one.
        let findings = parse_findings(text, 10.0).unwrap();
        assert_eq!(findings.len(), 1);
    }
}
