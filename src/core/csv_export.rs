use crate::domain::model::{
    Contact, CustomField, Invoice, Product, Transaction, PROVIDER_TIME_FORMAT,
};
use crate::utils::error::{ImportError, Result};
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::io::Read;

const UTF8_BOM: char = '\u{feff}';

/// One row of the payment provider's transaction export (`;`-separated).
#[derive(Debug, Clone, Deserialize)]
pub struct CsvTransaction {
    #[serde(rename = "#")]
    pub id: String,
    #[serde(rename = "First name", default)]
    pub first_name: String,
    #[serde(rename = "Last Name", default)]
    pub last_name: String,
    #[serde(rename = "Date and time", default)]
    pub date: String,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Number", default)]
    pub number: u32,
    #[serde(rename = "Street & No.", default)]
    pub street_and_no: String,
    #[serde(rename = "Zip code", default)]
    pub zip_code: String,
    #[serde(rename = "City", default)]
    pub city: String,
    #[serde(rename = "Country", default)]
    pub country: String,
    #[serde(rename = "Telephone", default)]
    pub telephone: String,
    #[serde(rename = "Email address", default)]
    pub email: String,
    #[serde(rename = "entreprise", default)]
    pub company: String,
    #[serde(rename = "numeros_de_plaques", default)]
    pub plate_numbers: String,
    #[serde(rename = "numero_client_optionnel", default)]
    pub client_number: String,
}

impl CsvTransaction {
    /// Rebuilds the webhook-shaped transaction so the row can go through the same pipeline.
    ///
    /// The export has no client type column: a non-empty company marks a company client.
    pub fn into_transaction(self, product_label: &str) -> Result<Transaction> {
        let time = match self.date.trim() {
            "" => None,
            raw => Some(
                NaiveDateTime::parse_from_str(raw, PROVIDER_TIME_FORMAT).map_err(|e| {
                    ImportError::validation(format!(
                        "row {}: invalid date '{}': {}",
                        self.id, raw, e
                    ))
                })?,
            ),
        };

        let client_type = if self.company.trim().is_empty() {
            "particulier"
        } else {
            "entreprise"
        };

        let custom_fields = vec![
            text_field("Numéros de plaques", self.plate_numbers),
            text_field("Entreprise", self.company.clone()),
            text_field("Type de client:", client_type.to_string()),
            text_field("Numéro client (optionnel)", self.client_number),
        ];

        Ok(Transaction {
            uuid: self.id,
            time,
            status: self.status.trim().to_lowercase(),
            invoice: Invoice {
                products: vec![Product {
                    name: product_label.to_string(),
                    price: None,
                    quantity: self.number,
                }],
                custom_fields,
                reference_id: String::new(),
            },
            contact: Contact {
                first_name: self.first_name,
                last_name: self.last_name,
                street_and_no: self.street_and_no,
                zip_code: self.zip_code,
                city: self.city,
                country: self.country,
                telephone: self.telephone,
                email: self.email,
                company: self.company,
                ..Default::default()
            },
        })
    }
}

fn text_field(name: &str, value: String) -> CustomField {
    CustomField {
        kind: "text".to_string(),
        name: name.to_string(),
        value,
    }
}

/// A data record of the export, numbered from 1, and what it decoded to.
#[derive(Debug)]
pub struct ExportRecord {
    pub record: usize,
    pub row: Result<CsvTransaction>,
}

impl ExportRecord {
    /// `#<id>` when the row decoded, the record number otherwise.
    pub fn label(&self) -> String {
        match &self.row {
            Ok(row) => format!("#{}", row.id),
            Err(_) => format!("record {}", self.record),
        }
    }
}

/// Reads the whole export. Only I/O failures abort; a record that does not decode
/// is returned as an `Err` row so the remaining ones can still be imported.
pub fn parse_export<R: Read>(mut reader: R) -> Result<Vec<ExportRecord>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    let content = content.trim_start_matches(UTF8_BOM);

    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let records = csv_reader
        .deserialize::<CsvTransaction>()
        .enumerate()
        .map(|(index, row)| ExportRecord {
            record: index + 1,
            row: row.map_err(ImportError::from),
        })
        .collect();
    Ok(records)
}
