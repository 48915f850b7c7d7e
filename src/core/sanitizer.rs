//! Normalizes a raw provider transaction into the shape the import documents need.
//!
//! Custom fields carry no stable key, only the label shown on the payment form, so
//! they are recognised through [`FIELD_RULES`]. The plate field is free text and is
//! turned into exactly one plate per purchased badge by [`parse_plates`].

use crate::domain::model::{
    ClientType, Contact, SanitizeIssue, SanitizedTransaction, Transaction, MISSING_PLATE,
};
use crate::utils::error::{ImportError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// Longest plate string the downstream system accepts.
pub const MAX_PLATE_LEN: usize = 30;
const TRUNCATED_PLATE_LEN: usize = 27;
const ELLIPSIS: &str = "...";
const MERGED_PLATE_SEPARATOR: &str = ".";
/// Upper bound on badges bought in one transaction.
pub const MAX_QUANTITY: usize = 100;

// ASCII word characters and the comma separator survive
static NON_PLATE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_,]").expect("plate filter pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Plates,
    CompanyName,
    ClientType,
}

#[derive(Debug, Clone, Copy)]
pub enum LabelMatch {
    Exact(&'static str),
    Contains(&'static str),
}

impl LabelMatch {
    fn matches(&self, normalized_label: &str) -> bool {
        match self {
            LabelMatch::Exact(expected) => normalized_label == *expected,
            LabelMatch::Contains(marker) => normalized_label.contains(marker),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub matcher: LabelMatch,
    pub role: FieldRole,
}

/// Checked in order against the trimmed, lower-cased label; first match wins.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        matcher: LabelMatch::Exact("type de client:"),
        role: FieldRole::ClientType,
    },
    FieldRule {
        matcher: LabelMatch::Contains("numéros de plaques"),
        role: FieldRole::Plates,
    },
    FieldRule {
        matcher: LabelMatch::Contains("entreprise"),
        role: FieldRole::CompanyName,
    },
];

pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

pub fn classify_field(label: &str) -> Option<FieldRole> {
    let key = normalize_label(label);
    FIELD_RULES
        .iter()
        .find(|rule| rule.matcher.matches(&key))
        .map(|rule| rule.role)
}

pub fn parse_client_type(value: &str) -> Option<ClientType> {
    match value.trim().to_lowercase().as_str() {
        "entreprise" => Some(ClientType::Company),
        "particulier" => Some(ClientType::Individual),
        _ => None,
    }
}

/// Splits the free-text plate field into exactly `quantity` plates.
///
/// Missing slots are filled with `N/D`. Surplus entries are folded into the last
/// slot joined by `.`, and that slot is cut to [`MAX_PLATE_LEN`] characters.
pub fn parse_plates(raw: &str, quantity: usize) -> (Vec<String>, Vec<SanitizeIssue>) {
    let mut issues = Vec::new();

    let upper = simple_uppercase(raw.trim());
    let cleaned = NON_PLATE_CHARS.replace_all(&upper, "");
    let candidates: Vec<&str> = cleaned.split(',').collect();

    let mut plates: Vec<String> = (0..quantity)
        .map(|slot| {
            candidates
                .get(slot)
                .map(|plate| plate.to_string())
                .unwrap_or_else(|| MISSING_PLATE.to_string())
        })
        .collect();

    if candidates.len() < quantity {
        issues.push(SanitizeIssue::PlatesPadded {
            expected: quantity,
            found: candidates.len(),
        });
    }

    if quantity > 0 && candidates.len() > quantity {
        let extras: Vec<&str> = candidates[quantity..]
            .iter()
            .copied()
            .filter(|plate| !plate.is_empty())
            .collect();
        if !extras.is_empty() {
            issues.push(SanitizeIssue::PlatesMerged {
                extra: extras.len(),
            });
        }

        let last = &mut plates[quantity - 1];
        let mut merged = std::iter::once(last.as_str())
            .chain(extras)
            .collect::<Vec<_>>()
            .join(MERGED_PLATE_SEPARATOR);

        let merged_len = merged.chars().count();
        if merged_len > MAX_PLATE_LEN {
            merged = merged.chars().take(TRUNCATED_PLATE_LEN).collect::<String>() + ELLIPSIS;
            issues.push(SanitizeIssue::PlateTruncated {
                original_len: merged_len,
            });
        }
        *last = merged;
    }

    for (slot, plate) in plates.iter().enumerate() {
        if plate.is_empty() {
            issues.push(SanitizeIssue::EmptyPlate { slot });
        }
    }

    (plates, issues)
}

// One char in, one char out: `ß` stays `ß` and is then dropped by the filter.
fn simple_uppercase(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(mapped), None) => mapped,
                _ => c,
            }
        })
        .collect()
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn trim_contact(contact: &mut Contact) {
    for field in [
        &mut contact.title,
        &mut contact.first_name,
        &mut contact.last_name,
        &mut contact.street_and_no,
        &mut contact.zip_code,
        &mut contact.city,
        &mut contact.country,
        &mut contact.telephone,
        &mut contact.email,
        &mut contact.company,
    ] {
        trim_in_place(field);
    }
}

#[derive(Debug, Clone)]
pub struct FieldSanitizer {
    product_label: String,
}

impl FieldSanitizer {
    pub fn new(product_label: impl Into<String>) -> Self {
        Self {
            product_label: product_label.into(),
        }
    }

    /// Pure transformation; hard failures are returned as `ValidationError`,
    /// everything recoverable ends up in `SanitizedTransaction::issues`.
    pub fn sanitize(&self, mut transaction: Transaction) -> Result<SanitizedTransaction> {
        trim_contact(&mut transaction.contact);

        if transaction.uuid.trim().is_empty() {
            return Err(ImportError::validation("transaction uuid is missing"));
        }

        let quantity = match transaction.invoice.products.as_slice() {
            [product] if product.name == self.product_label => product.quantity as usize,
            _ => {
                return Err(ImportError::validation(format!(
                    "invalid product name or number of products: expected exactly one \"{}\"",
                    self.product_label
                )))
            }
        };
        if quantity == 0 {
            return Err(ImportError::validation("product quantity must be at least 1"));
        }
        if quantity > MAX_QUANTITY {
            return Err(ImportError::validation(format!(
                "product quantity {} exceeds the limit of {}",
                quantity, MAX_QUANTITY
            )));
        }

        let mut issues = Vec::new();
        let mut raw_plates: Option<&str> = None;
        let mut company_override: Option<&str> = None;
        let mut client_type = ClientType::Unset;
        let mut client_type_seen = false;

        for field in &transaction.invoice.custom_fields {
            match classify_field(&field.name) {
                Some(FieldRole::Plates) => raw_plates = Some(field.value.as_str()),
                Some(FieldRole::CompanyName) => {
                    let company = field.value.trim();
                    if !company.is_empty() {
                        company_override = Some(company);
                    }
                }
                Some(FieldRole::ClientType) => {
                    client_type_seen = true;
                    match parse_client_type(&field.value) {
                        Some(parsed) => client_type = parsed,
                        None => issues.push(SanitizeIssue::UnknownClientType {
                            value: field.value.clone(),
                        }),
                    }
                }
                None => {}
            }
        }

        if !client_type_seen {
            issues.push(SanitizeIssue::MissingClientType);
        }
        if raw_plates.is_none() {
            issues.push(SanitizeIssue::MissingPlateField);
        }
        let (plates, plate_issues) = parse_plates(raw_plates.unwrap_or_default(), quantity);
        issues.extend(plate_issues);

        if let Some(company) = company_override {
            transaction.contact.company = company.to_string();
        }
        transaction.contact.client_type = client_type;

        Ok(SanitizedTransaction {
            transaction,
            plates,
            issues,
        })
    }
}
