use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Constants stamped into the published documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Name the single invoice product must carry to be importable.
    pub product_label: String,
    /// Object key prefix for published documents.
    pub key_prefix: String,
    pub document_version: String,
    pub culture: String,
    pub tiers_type: String,
    pub product_code: String,
    pub flow_type: String,
    pub park_code_prefix: String,
    pub company_code_company: String,
    pub company_code_individual: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            product_label: "Badge Ajoverts".to_string(),
            key_prefix: "importer".to_string(),
            document_version: "1.50".to_string(),
            culture: "fr".to_string(),
            tiers_type: "Fournisseur".to_string(),
            product_code: "Dechets verts".to_string(),
            flow_type: "Réception".to_string(),
            park_code_prefix: "NEW".to_string(),
            company_code_company: "entreprises".to_string(),
            company_code_individual: "particuliers".to_string(),
        }
    }
}

impl ImportSettings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ImportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ImportError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PRODUCT_LABEL})
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn tiers_key(&self, client_code: &str) -> String {
        format!("{}/tiers_import_{}.json", self.key_prefix, client_code)
    }

    pub fn pass_key(&self, client_code: &str) -> String {
        format!("{}/pass_import_{}.json", self.key_prefix, client_code)
    }

    pub fn probe_key(&self) -> String {
        format!("{}/test", self.key_prefix)
    }
}

impl Validate for ImportSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("product_label", &self.product_label)?;
        validate_non_empty_string("key_prefix", &self.key_prefix)?;
        validate_non_empty_string("document_version", &self.document_version)?;
        validate_non_empty_string("park_code_prefix", &self.park_code_prefix)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = ImportSettings::from_toml_str(
            r#"
product_label = "Badge Test"
key_prefix = "staging"
"#,
        )
        .unwrap();

        assert_eq!(settings.product_label, "Badge Test");
        assert_eq!(settings.tiers_key("00042"), "staging/tiers_import_00042.json");
        assert_eq!(settings.pass_key("00042"), "staging/pass_import_00042.json");
        assert_eq!(settings.document_version, "1.50");
        assert_eq!(settings.flow_type, "Réception");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_IMPORT_PRODUCT_LABEL", "Badge Env");

        let settings =
            ImportSettings::from_toml_str(r#"product_label = "${TEST_IMPORT_PRODUCT_LABEL}""#)
                .unwrap();
        assert_eq!(settings.product_label, "Badge Env");

        std::env::remove_var("TEST_IMPORT_PRODUCT_LABEL");
    }

    #[test]
    fn test_settings_validation() {
        let settings = ImportSettings::from_toml_str(r#"key_prefix = "  ""#).unwrap();
        assert!(settings.validate().is_err());
        assert!(ImportSettings::default().validate().is_ok());
    }

    #[test]
    fn test_settings_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"culture = \"de\"\ndocument_version = \"1.60\"\n")
            .unwrap();

        let settings = ImportSettings::from_file(temp_file.path()).unwrap();
        assert_eq!(settings.culture, "de");
        assert_eq!(settings.document_version, "1.60");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ImportSettings::from_toml_str("product_label = [").unwrap_err();
        assert!(matches!(err, ImportError::ConfigError { .. }));
    }
}
