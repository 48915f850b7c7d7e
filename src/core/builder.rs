use crate::config::settings::ImportSettings;
use crate::core::allocator::Allocation;
use crate::domain::model::{
    ClientType, ImportDocuments, Pass, PassImport, SanitizedTransaction, Tiers, TiersImport,
};

pub fn client_code(client_number: i64) -> String {
    format!("{:05}", client_number)
}

pub fn park_code(prefix: &str, pass_number: i64) -> String {
    format!("{}{:05}", prefix, pass_number)
}

/// Maps a sanitized transaction and its allocated numbers to the two import documents.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    settings: ImportSettings,
}

impl DocumentBuilder {
    pub fn new(settings: ImportSettings) -> Self {
        Self { settings }
    }

    pub fn build(&self, sanitized: &SanitizedTransaction, allocation: &Allocation) -> ImportDocuments {
        let contact = &sanitized.transaction.contact;
        let code = client_code(allocation.client_number);

        let (label, contact_person) = match contact.client_type {
            ClientType::Company => (contact.company.clone(), contact.full_name()),
            ClientType::Individual | ClientType::Unset => (contact.full_name(), String::new()),
        };

        let tiers = Tiers {
            tiers_type: self.settings.tiers_type.clone(),
            code: code.clone(),
            label,
            active: true,
            address: contact.street_and_no.clone(),
            zip_code: contact.zip_code.clone(),
            city: contact.city.clone(),
            telephone: contact.telephone.clone(),
            email: contact.email.clone(),
            contact_person,
            product_codes: self.settings.product_code.clone(),
        };

        // unresolved client types are imported as individuals
        let company_code = match contact.client_type {
            ClientType::Company => &self.settings.company_code_company,
            ClientType::Individual | ClientType::Unset => &self.settings.company_code_individual,
        };

        let items = sanitized
            .plates
            .iter()
            .zip(&allocation.pass_numbers)
            .map(|(plate, number)| {
                let park_code = park_code(&self.settings.park_code_prefix, *number);
                Pass {
                    label: park_code.clone(),
                    park_code,
                    flow_type: self.settings.flow_type.clone(),
                    plate: plate.clone(),
                    company_code: company_code.clone(),
                    tiers_code: code.clone(),
                    product_code: self.settings.product_code.clone(),
                }
            })
            .collect();

        ImportDocuments {
            tiers: TiersImport {
                version: self.settings.document_version.clone(),
                items: vec![tiers],
            },
            passes: PassImport {
                version: self.settings.document_version.clone(),
                culture: self.settings.culture.clone(),
                items,
            },
        }
    }
}
