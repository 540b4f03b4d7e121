// src/api/model.rs
//! Records as the remote service returns them and as they are persisted.
//!
//! Pages and fiscal records stay raw JSON maps end to end, so the logs hold
//! exactly what the service sent. The typed structs below are read-side
//! projections over that JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One page of the receipt listing exactly as the service sent it.
/// Persisted unchanged as a single log line.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptsPage(pub Map<String, Value>);

impl ReceiptsPage {
    /// `hasMore` from the page; anything but `true` ends the listing.
    pub fn has_more(&self) -> bool {
        self.0.get("hasMore").and_then(Value::as_bool).unwrap_or(false)
    }

    /// The raw receipt objects on this page.
    pub fn receipts(&self) -> &[Value] {
        self.0.get("receipts").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Typed reading of the page. The page itself is not touched.
    pub fn view(&self) -> Result<PageView, serde_json::Error> {
        PageView::deserialize(Value::Object(self.0.clone()))
    }
}

/// Typed projection of a listing page, for reading only.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageView {
    #[serde(default)]
    pub receipts: Vec<ReceiptRecord>,
    #[serde(default)]
    pub brands: Vec<BrandRecord>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub key: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub brand_id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub created_date: String,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ItemRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct BrandRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fiscal detail for one receipt: whatever the provider sends, plus `key`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalRecord(pub Map<String, Value>);

impl FiscalRecord {
    /// Attach the receipt key, replacing any key the provider sent.
    pub fn with_key(mut self, key: &str) -> Self {
        self.0.insert("key".to_string(), Value::String(key.to_string()));
        self
    }

    pub fn key(&self) -> Option<&str> {
        self.0.get("key").and_then(Value::as_str)
    }
}

/// Body of a receipts listing request.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptsQuery<'a> {
    pub limit: u32,
    pub offset: u64,
    pub date_from: Option<&'a str>,
    pub date_to: Option<&'a str>,
    pub order_by: &'a str,
    pub inn: Option<&'a str>,
    pub kkt_owner: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct KeyQuery<'a> {
    pub key: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchQuery<'a> {
    pub query: &'a str,
    pub limit: u32,
    pub offset: u64,
}

/// Bearer token and cookie jar read off the live browser.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionCredential {
    pub bearer_token: Option<String>,
    pub cookies: BTreeMap<String, String>,
}

impl SessionCredential {
    /// `Cookie` header value, or `None` for an empty jar.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self.cookies.iter().map(|(k, v)| format!("{k}={v}")).collect();
        Some(pairs.join("; "))
    }
}

/// Key-only projections, used when scanning logs for the anti-join.
#[derive(Debug, Deserialize)]
pub struct KeyRef {
    // a receipt without a key reads as "" and is skipped by the anti-join
    #[serde(default, deserialize_with = "string_or_number")]
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct PageKeys {
    #[serde(default)]
    pub receipts: Vec<KeyRef>,
}

/// Identifiers arrive as strings or numbers depending on the endpoint.
pub fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_page() -> Value {
        json!({
            "receipts": [{"key": "k1", "brandId": 42, "createdDate": "2024-03-01", "items": [
                {"name": "Milk", "price": 8990, "quantity": 1, "nds": 10}
            ], "totalSum": 8990}, {"brandId": 7}],
            "brands": [{"id": 42, "name": "Shop", "description": null}],
            "hasMore": true,
            "cursor": "x"
        })
    }

    #[test]
    fn page_serializes_back_unchanged() {
        let raw = raw_page();
        let page: ReceiptsPage = serde_json::from_value(raw.clone()).unwrap();
        assert!(page.has_more());
        assert_eq!(page.receipts().len(), 2);
        assert_eq!(serde_json::to_string(&page).unwrap(), serde_json::to_string(&raw).unwrap());
    }

    #[test]
    fn page_without_paging_flag_is_the_last() {
        let page: ReceiptsPage = serde_json::from_value(json!({"receipts": "oops"})).unwrap();
        assert!(!page.has_more());
        assert!(page.receipts().is_empty());
    }

    #[test]
    fn view_reads_typed_fields() {
        let page: ReceiptsPage = serde_json::from_value(raw_page()).unwrap();
        let before = page.clone();
        let view = page.view().unwrap();
        assert!(view.has_more);
        assert_eq!(view.receipts[0].brand_id, "42");
        assert_eq!(view.receipts[0].extra["totalSum"], json!(8990));
        assert_eq!(view.receipts[0].items[0].extra["nds"], json!(10));
        assert_eq!(view.brands[0].description, "");
        assert_eq!(view.extra["cursor"], json!("x"));
        assert_eq!(page, before);
    }

    #[test]
    fn keyless_receipt_does_not_break_key_scan() {
        let keys: PageKeys = serde_json::from_value(raw_page()).unwrap();
        let keys: Vec<String> = keys.receipts.into_iter().map(|k| k.key).collect();
        assert_eq!(keys, vec!["k1".to_string(), String::new()]);
    }

    #[test]
    fn key_overrides_provider_key() {
        let rec: FiscalRecord = serde_json::from_value(json!({"amount": 10, "key": "other"})).unwrap();
        let rec = rec.with_key("k1");
        assert_eq!(serde_json::to_value(&rec).unwrap(), json!({"amount": 10, "key": "k1"}));
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let mut cred = SessionCredential::default();
        assert_eq!(cred.cookie_header(), None);
        cred.cookies.insert("a".into(), "1".into());
        cred.cookies.insert("b".into(), "2".into());
        assert_eq!(cred.cookie_header().as_deref(), Some("a=1; b=2"));
    }
}
