//! Application settings
//!
//! ## Resolution
//!
//! 1. Embedded defaults (`config/settings.toml`, compiled into the binary)
//! 2. Override file in the data dir (~/.local/share/khata/settings.toml)
//! 3. Environment: `KHATA_CURRENCY`, `KHATA_GATEWAY_KEY_ID`,
//!    `KHATA_GATEWAY_KEY_SECRET`
//!
//! Later layers only replace the keys they set.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default settings (compiled into binary)
const DEFAULT_SETTINGS: &str = include_str!("../../../config/settings.toml");

pub const CURRENCY_ENV: &str = "KHATA_CURRENCY";
pub const GATEWAY_KEY_ID_ENV: &str = "KHATA_GATEWAY_KEY_ID";
pub const GATEWAY_KEY_SECRET_ENV: &str = "KHATA_GATEWAY_KEY_SECRET";

/// Currency code to display symbol. Codes not listed fall back to INR.
const CURRENCY_SYMBOLS: &[(&str, &str)] = &[
    ("INR", "₹"),
    ("USD", "$"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("JPY", "¥"),
    ("AUD", "A$"),
    ("CAD", "C$"),
    ("SGD", "S$"),
    ("AED", "AED "),
];

/// Document template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Classic,
    Modern,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Modern => "modern",
        }
    }
}

/// Payment gateway credentials. Only their presence matters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct GatewaySettings {
    pub key_id: String,
    pub key_secret: String,
}

impl GatewaySettings {
    pub fn is_configured(&self) -> bool {
        !self.key_id.trim().is_empty() && !self.key_secret.trim().is_empty()
    }
}

/// A user-labelled extra field printed on documents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    pub currency: String,
    pub gateway: GatewaySettings,
    pub template: Template,
    pub accent_color: String,
    pub custom_fields: Vec<CustomField>,
}

impl Settings {
    /// Load settings from the default override location and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(default_settings_path().as_deref())
    }

    /// Load settings with an explicit override file (skipped when absent)
    pub fn load_from(override_path: Option<&Path>) -> Result<Self> {
        let mut settings = Self::defaults()?;

        if let Some(path) = override_path.filter(|p| p.exists()) {
            debug!("Loading settings override from {}", path.display());
            let content = fs::read_to_string(path)?;
            settings.merge_toml(&content)?;
        }

        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// The embedded defaults alone
    pub fn defaults() -> Result<Self> {
        let mut settings = Self {
            currency: String::new(),
            gateway: GatewaySettings::default(),
            template: Template::default(),
            accent_color: String::new(),
            custom_fields: Vec::new(),
        };
        settings.merge_toml(DEFAULT_SETTINGS)?;
        Ok(settings)
    }

    /// Overlay the keys present in a TOML document
    pub fn merge_toml(&mut self, content: &str) -> Result<()> {
        let raw: RawSettings = toml::from_str(content)?;

        if let Some(general) = raw.general {
            if let Some(currency) = general.currency {
                self.currency = currency.trim().to_uppercase();
            }
        }
        if let Some(gateway) = raw.gateway {
            if let Some(key_id) = gateway.key_id {
                self.gateway.key_id = key_id;
            }
            if let Some(key_secret) = gateway.key_secret {
                self.gateway.key_secret = key_secret;
            }
        }
        if let Some(document) = raw.document {
            if let Some(template) = document.template {
                self.template = template;
            }
            if let Some(color) = document.accent_color {
                if !is_hex_color(&color) {
                    return Err(Error::InvalidData(format!(
                        "Invalid accent color: {}",
                        color
                    )));
                }
                self.accent_color = color;
            }
        }
        if let Some(fields) = raw.custom_fields {
            self.custom_fields = fields;
        }

        Ok(())
    }

    /// Apply environment overrides through a lookup function
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(currency) = lookup(CURRENCY_ENV).filter(|v| !v.trim().is_empty()) {
            self.currency = currency.trim().to_uppercase();
        }
        if let Some(key_id) = lookup(GATEWAY_KEY_ID_ENV) {
            self.gateway.key_id = key_id;
        }
        if let Some(key_secret) = lookup(GATEWAY_KEY_SECRET_ENV) {
            self.gateway.key_secret = key_secret;
        }
    }

    /// Display symbol for the configured currency
    pub fn currency_symbol(&self) -> &'static str {
        currency_symbol(&self.currency)
    }

    /// Format an amount for display with two decimals
    pub fn format_money(&self, amount: f64) -> String {
        format!("{}{:.2}", self.currency_symbol(), amount)
    }

    /// Custom fields switched on for documents
    pub fn enabled_custom_fields(&self) -> impl Iterator<Item = &CustomField> {
        self.custom_fields.iter().filter(|f| f.enabled)
    }
}

pub fn currency_symbol(code: &str) -> &'static str {
    CURRENCY_SYMBOLS
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .or_else(|| CURRENCY_SYMBOLS.first())
        .map(|(_, symbol)| *symbol)
        .unwrap_or("₹")
}

/// Default settings override path
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("khata").join("settings.toml"))
}

fn is_hex_color(s: &str) -> bool {
    let Some(hex) = s.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    general: Option<RawGeneral>,
    gateway: Option<RawGateway>,
    document: Option<RawDocument>,
    custom_fields: Option<Vec<CustomField>>,
}

#[derive(Debug, Deserialize)]
struct RawGeneral {
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGateway {
    key_id: Option<String>,
    key_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    template: Option<Template>,
    accent_color: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_defaults() {
        let settings = Settings::defaults().unwrap();
        assert_eq!(settings.currency, "INR");
        assert_eq!(settings.currency_symbol(), "₹");
        assert_eq!(settings.template, Template::Classic);
        assert_eq!(settings.accent_color, "#4F46E5");
        assert!(!settings.gateway.is_configured());
        assert_eq!(settings.custom_fields.len(), 2);
        assert_eq!(settings.custom_fields[0].label, "PO Number");
        assert_eq!(settings.enabled_custom_fields().count(), 0);
    }

    #[test]
    fn test_override_only_replaces_given_keys() {
        let mut settings = Settings::defaults().unwrap();
        settings
            .merge_toml(
                r##"
                [document]
                template = "modern"

                [gateway]
                key_id = "rzp_test_123"
                "##,
            )
            .unwrap();

        assert_eq!(settings.template, Template::Modern);
        assert_eq!(settings.accent_color, "#4F46E5");
        assert_eq!(settings.currency, "INR");
        assert!(!settings.gateway.is_configured());
    }

    #[test]
    fn test_override_file_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[general]\ncurrency = \"usd\"\n").unwrap();

        let mut settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.currency, "USD");

        let env: HashMap<&str, &str> = [
            (CURRENCY_ENV, "eur"),
            (GATEWAY_KEY_ID_ENV, "id"),
            (GATEWAY_KEY_SECRET_ENV, "secret"),
        ]
        .into_iter()
        .collect();
        settings.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(settings.currency, "EUR");
        assert_eq!(settings.format_money(12.5), "€12.50");
        assert!(settings.gateway.is_configured());
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let mut settings = Settings::defaults().unwrap();
        assert!(settings
            .merge_toml("[document]\naccent_color = \"blue\"\n")
            .is_err());
        assert!(matches!(
            settings.merge_toml("[document]\ntemplate = \"fancy\"\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unknown_currency_falls_back_to_inr() {
        assert_eq!(currency_symbol("XYZ"), "₹");
        assert_eq!(currency_symbol("gbp"), "£");
    }
}
