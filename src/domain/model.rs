use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp layout used by the payment provider, both in webhooks and CSV exports.
pub const PROVIDER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Status value that makes a transaction eligible for import.
pub const CONFIRMED_STATUS: &str = "confirmed";

/// Placeholder plate used when fewer plates than purchased badges were entered.
pub const MISSING_PLATE: &str = "N/D";

/// Webhook body as delivered by the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub transaction: Transaction,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Transaction {
    #[serde(default, deserialize_with = "nullable_string")]
    pub uuid: String,
    #[serde(default, deserialize_with = "provider_time")]
    pub time: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "nullable_string")]
    pub status: String,
    #[serde(default)]
    pub invoice: Invoice,
    #[serde(default)]
    pub contact: Contact,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Invoice {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default, rename = "referenceId", deserialize_with = "nullable_string")]
    pub reference_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomField {
    #[serde(default, rename = "type", deserialize_with = "nullable_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientType {
    #[default]
    Unset,
    Individual,
    Company,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Contact {
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, rename = "firstname", deserialize_with = "nullable_string")]
    pub first_name: String,
    #[serde(default, rename = "lastname", deserialize_with = "nullable_string")]
    pub last_name: String,
    #[serde(default, rename = "street", deserialize_with = "nullable_string")]
    pub street_and_no: String,
    #[serde(default, rename = "zip", deserialize_with = "nullable_string")]
    pub zip_code: String,
    #[serde(default, rename = "place", deserialize_with = "nullable_string")]
    pub city: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub country: String,
    #[serde(default, rename = "phone", deserialize_with = "nullable_string")]
    pub telephone: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub company: String,
    #[serde(skip)]
    pub client_type: ClientType,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Non-fatal findings produced while sanitizing a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizeIssue {
    UnknownClientType { value: String },
    MissingClientType,
    MissingPlateField,
    EmptyPlate { slot: usize },
    PlatesPadded { expected: usize, found: usize },
    PlatesMerged { extra: usize },
    PlateTruncated { original_len: usize },
}

#[derive(Debug, Clone)]
pub struct SanitizedTransaction {
    pub transaction: Transaction,
    /// One entry per purchased badge, in the order the customer typed them.
    pub plates: Vec<String>,
    pub issues: Vec<SanitizeIssue>,
}

impl SanitizedTransaction {
    pub fn is_confirmed(&self) -> bool {
        self.transaction.status == CONFIRMED_STATUS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tiers {
    #[serde(rename = "TiersType")]
    pub tiers_type: String,
    #[serde(rename = "TiersCode")]
    pub code: String,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "IsActive")]
    pub active: bool,
    #[serde(rename = "Address1")]
    pub address: String,
    #[serde(rename = "Address2")]
    pub zip_code: String,
    #[serde(rename = "Address3")]
    pub city: String,
    #[serde(rename = "Address4")]
    pub telephone: String,
    #[serde(rename = "Address5")]
    pub email: String,
    #[serde(rename = "Address6")]
    pub contact_person: String,
    #[serde(rename = "ProductCodes")]
    pub product_codes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TiersImport {
    pub version: String,
    #[serde(rename = "Items")]
    pub items: Vec<Tiers>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    #[serde(rename = "ParkCode")]
    pub park_code: String,
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "FlowType")]
    pub flow_type: String,
    #[serde(rename = "Plate")]
    pub plate: String,
    #[serde(rename = "CompanyCode")]
    pub company_code: String,
    #[serde(rename = "TiersCode")]
    pub tiers_code: String,
    #[serde(rename = "ProductCode")]
    pub product_code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassImport {
    pub version: String,
    pub culture: String,
    #[serde(rename = "Items")]
    pub items: Vec<Pass>,
}

/// Documents derived from one transaction, ready to publish.
#[derive(Debug, Clone)]
pub struct ImportDocuments {
    pub tiers: TiersImport,
    pub passes: PassImport,
}

impl ImportDocuments {
    pub fn client_code(&self) -> &str {
        self.tiers
            .items
            .first()
            .map(|t| t.code.as_str())
            .unwrap_or_default()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn provider_time<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => NaiveDateTime::parse_from_str(raw.trim(), PROVIDER_TIME_FORMAT)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
