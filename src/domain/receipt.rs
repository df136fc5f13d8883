//! Receipt data model and request validation

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Borrow;
use thiserror::Error;
use uuid::Uuid;

/// Accepted purchase date layout
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted purchase time layouts, tried in order
const TIME_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Opaque receipt identifier (UUIDv4 text form)
///
/// Borrows as `str` so lookups can use the raw path segment without
/// allocating or validating it first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ReceiptId(String);

impl ReceiptId {
    /// Generate a new random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ReceiptId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single purchased item
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default)]
    pub short_description: String,
    /// Unit price as a decimal string (e.g. "6.49")
    #[serde(default)]
    pub price: String,
}

impl Item {
    pub fn new(short_description: &str, price: &str) -> Self {
        Self { short_description: short_description.to_string(), price: price.to_string() }
    }
}

/// A validated purchase receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub retailer: String,
    pub purchase_date: NaiveDate,
    pub purchase_time: NaiveTime,
    pub items: Vec<Item>,
    /// Receipt total as a decimal string (e.g. "35.35")
    pub total: String,
    pub retailer_id: String,
}

impl Receipt {
    /// Decode and validate a JSON request body
    pub fn from_json(body: &[u8]) -> Result<Self, ReceiptError> {
        let payload: ReceiptPayload =
            serde_json::from_slice(body).map_err(ReceiptError::Malformed)?;
        Ok(payload.validate()?)
    }
}

/// Receipt as it arrives on the wire, before validation
///
/// Missing fields decode to empty values so that validation can report
/// which requirement failed instead of a generic decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptPayload {
    #[serde(default)]
    pub retailer: String,
    #[serde(default, deserialize_with = "deserialize_date")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_time")]
    pub purchase_time: Option<NaiveTime>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub total: String,
    #[serde(default)]
    pub retailer_id: String,
}

impl ReceiptPayload {
    /// Check the structural requirements and produce a `Receipt`
    ///
    /// A missing purchase time is treated as midnight.
    pub fn validate(self) -> Result<Receipt, ValidationError> {
        if self.retailer_id.is_empty() {
            return Err(ValidationError::MissingRetailerId);
        }
        let Some(purchase_date) = self.purchase_date else {
            return Err(ValidationError::MissingPurchaseDate);
        };
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }

        Ok(Receipt {
            retailer: self.retailer,
            purchase_date,
            purchase_time: self.purchase_time.unwrap_or_default(),
            items: self.items,
            total: self.total,
            retailer_id: self.retailer_id,
        })
    }
}

/// Structural problems with an otherwise well-formed receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("retailer ID is required")]
    MissingRetailerId,
    #[error("purchase date is required")]
    MissingPurchaseDate,
    #[error("receipt must contain at least one item")]
    NoItems,
}

/// Reasons a request body cannot become a `Receipt`
#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error("Invalid receipt data")]
    Malformed(#[source] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Date as `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(&raw).map(|ts| ts.date_naive()))
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("invalid purchase date: {raw}")))
}

/// Time as `HH:MM` or `HH:MM:SS`, or the time part of an RFC 3339 timestamp
fn deserialize_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Ok(None);
    }

    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&raw, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(&raw).ok().map(|ts| ts.time()))
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid purchase time: {raw}")))
}

/// Builder for test receipts; starts from a valid receipt that scores zero
#[cfg(test)]
pub(crate) struct ReceiptBuilder {
    receipt: Receipt,
}

#[cfg(test)]
impl ReceiptBuilder {
    pub(crate) fn new() -> Self {
        Self {
            receipt: Receipt {
                retailer: String::new(),
                purchase_date: NaiveDate::from_ymd_opt(2022, 1, 2).unwrap(),
                purchase_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                items: Vec::new(),
                total: "0.10".to_string(),
                retailer_id: "r-1".to_string(),
            },
        }
    }

    pub(crate) fn retailer(mut self, retailer: &str) -> Self {
        self.receipt.retailer = retailer.to_string();
        self
    }

    pub(crate) fn total(mut self, total: &str) -> Self {
        self.receipt.total = total.to_string();
        self
    }

    pub(crate) fn date(mut self, year: i32, month: u32, day: u32) -> Self {
        self.receipt.purchase_date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
        self
    }

    pub(crate) fn time(mut self, hour: u32, minute: u32) -> Self {
        self.receipt.purchase_time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap();
        self
    }

    pub(crate) fn item(mut self, description: &str, price: &str) -> Self {
        self.receipt.items.push(Item::new(description, price));
        self
    }

    pub(crate) fn build(self) -> Receipt {
        self.receipt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RECEIPT: &str = r#"{
        "retailer": "Target",
        "purchaseDate": "2022-01-01",
        "purchaseTime": "13:01",
        "items": [
            {"shortDescription": "Mountain Dew 12PK", "price": "6.49"},
            {"shortDescription": "Emils Cheese Pizza", "price": "12.25"}
        ],
        "total": "18.74",
        "retailerId": "target-001"
    }"#;

    #[test]
    fn test_receipt_id_generate_unique() {
        let a = ReceiptId::generate();
        let b = ReceiptId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
        assert_eq!(Uuid::parse_str(a.as_str()).unwrap().get_version_num(), 4);
    }

    #[test]
    fn test_from_json_valid() {
        let receipt = Receipt::from_json(SAMPLE_RECEIPT.as_bytes()).unwrap();
        assert_eq!(receipt.retailer, "Target");
        assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(receipt.purchase_time, NaiveTime::from_hms_opt(13, 1, 0).unwrap());
        assert_eq!(receipt.items.len(), 2);
        assert_eq!(receipt.items[1], Item::new("Emils Cheese Pizza", "12.25"));
        assert_eq!(receipt.total, "18.74");
        assert_eq!(receipt.retailer_id, "target-001");
    }

    #[test]
    fn test_time_with_seconds_and_rfc3339() {
        let json = r#"{"retailerId":"x","purchaseDate":"2022-01-01T09:30:00Z",
            "purchaseTime":"14:33:15","items":[{"shortDescription":"a","price":"1"}]}"#;
        let receipt = Receipt::from_json(json.as_bytes()).unwrap();
        assert_eq!(receipt.purchase_date, NaiveDate::from_ymd_opt(2022, 1, 1).unwrap());
        assert_eq!(receipt.purchase_time, NaiveTime::from_hms_opt(14, 33, 15).unwrap());
    }

    #[test]
    fn test_missing_time_defaults_to_midnight() {
        let json = r#"{"retailerId":"x","purchaseDate":"2022-01-01",
            "items":[{"shortDescription":"a","price":"1"}]}"#;
        let receipt = Receipt::from_json(json.as_bytes()).unwrap();
        assert_eq!(receipt.purchase_time, NaiveTime::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = Receipt::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, ReceiptError::Malformed(_)));
        assert_eq!(err.to_string(), "Invalid receipt data");
    }

    #[test]
    fn test_unparseable_date_is_malformed() {
        let json = r#"{"retailerId":"x","purchaseDate":"01/02/2022","items":[]}"#;
        let err = Receipt::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ReceiptError::Malformed(_)));
    }

    #[test]
    fn test_validation_missing_retailer_id() {
        let json =
            r#"{"purchaseDate":"2022-01-01","items":[{"shortDescription":"a","price":"1"}]}"#;
        let err = Receipt::from_json(json.as_bytes()).unwrap_err();
        assert!(matches!(err, ReceiptError::Invalid(ValidationError::MissingRetailerId)));
        assert_eq!(err.to_string(), "retailer ID is required");
    }

    #[test]
    fn test_validation_missing_date() {
        let payload = ReceiptPayload {
            retailer_id: "x".to_string(),
            items: vec![Item::new("a", "1")],
            ..Default::default()
        };
        assert_eq!(payload.validate(), Err(ValidationError::MissingPurchaseDate));
    }

    #[test]
    fn test_validation_no_items() {
        let payload = ReceiptPayload {
            retailer_id: "x".to_string(),
            purchase_date: NaiveDate::from_ymd_opt(2022, 1, 1),
            ..Default::default()
        };
        let err = payload.validate().unwrap_err();
        assert_eq!(err, ValidationError::NoItems);
        assert_eq!(err.to_string(), "receipt must contain at least one item");
    }
}
