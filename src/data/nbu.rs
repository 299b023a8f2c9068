//! NBU integration: depository bond catalog and official exchange rates.

use reqwest::blocking::Client;
use tracing::{debug, info};

use crate::domain::{RawBond, RawRate};
use crate::error::AppError;

const DEFAULT_BONDS_URL: &str = "https://bank.gov.ua/depo_securities?json";
const DEFAULT_RATES_URL: &str = "https://bank.gov.ua/NBUStatService/v1/statdirectory/exchange?json";
const DEFAULT_AUCTION_URL: &str =
    "https://mof.gov.ua/storage/files/121-123%20%D0%BE%D0%B3%D0%BE%D0%BB%D0%BE%D1%88%D0%B5%D0%BD%D0%BD%D1%8F.docx";

/// Endpoints of the three sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub bonds_url: String,
    pub rates_url: String,
    pub auction_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            bonds_url: DEFAULT_BONDS_URL.to_string(),
            rates_url: DEFAULT_RATES_URL.to_string(),
            auction_url: DEFAULT_AUCTION_URL.to_string(),
        }
    }
}

impl SourceConfig {
    /// Read overrides from the environment (`.env` is loaded first).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let pick = |key: &str, fallback: String| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
        };
        Self {
            bonds_url: pick("BONDSTOOL_BONDS_URL", defaults.bonds_url),
            rates_url: pick("BONDSTOOL_RATES_URL", defaults.rates_url),
            auction_url: pick("BONDSTOOL_AUCTION_URL", defaults.auction_url),
        }
    }
}

pub struct NbuClient {
    client: Client,
    config: SourceConfig,
}

impl NbuClient {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn from_env() -> Self {
        Self::new(SourceConfig::from_env())
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Download the full bond catalog (all instruments, nested payments).
    pub fn fetch_bonds(&self) -> Result<Vec<RawBond>, AppError> {
        let body = self.get_text(&self.config.bonds_url, "bond catalog")?;
        let bonds = parse_bonds(&body)?;
        info!(count = bonds.len(), "fetched bond catalog");
        Ok(bonds)
    }

    /// Download today's official exchange rates.
    pub fn fetch_rates(&self) -> Result<Vec<RawRate>, AppError> {
        let body = self.get_text(&self.config.rates_url, "exchange rates")?;
        let rates = parse_rates(&body)?;
        info!(count = rates.len(), "fetched exchange rates");
        Ok(rates)
    }

    fn get_text(&self, url: &str, what: &str) -> Result<String, AppError> {
        debug!(%url, "requesting {what}");
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::new(4, format!("NBU {what} request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("NBU {what} request failed with status {}.", resp.status()),
            ));
        }

        resp.text()
            .map_err(|e| AppError::new(4, format!("Failed to read NBU {what} response: {e}")))
    }
}

/// Parse the catalog JSON (an array of bond records).
pub fn parse_bonds(body: &str) -> Result<Vec<RawBond>, AppError> {
    serde_json::from_str(body).map_err(|e| AppError::new(4, format!("Failed to parse NBU bond catalog: {e}")))
}

/// Parse the exchange-rate JSON (an array of rate records).
pub fn parse_rates(body: &str) -> Result<Vec<RawRate>, AppError> {
    serde_json::from_str(body).map_err(|e| AppError::new(4, format!("Failed to parse NBU exchange rates: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_replace_defaults() {
        let config = SourceConfig::from_lookup(|key| match key {
            "BONDSTOOL_RATES_URL" => Some(" http://localhost:8080/rates ".to_string()),
            "BONDSTOOL_AUCTION_URL" => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.bonds_url, DEFAULT_BONDS_URL);
        assert_eq!(config.rates_url, "http://localhost:8080/rates");
        assert_eq!(config.auction_url, DEFAULT_AUCTION_URL);
    }

    #[test]
    fn parses_rate_records() {
        let body = r#"[
            {"r030":840,"txt":"Долар США","rate":41.2547,"cc":"USD","exchangedate":"17.10.2026"},
            {"r030":978,"txt":"Євро","rate":44.9,"cc":"EUR","exchangedate":"17.10.2026"}
        ]"#;
        let rates = parse_rates(body).unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].cc, "USD");
        assert_eq!(rates[1].r030, 978);
    }

    #[test]
    fn malformed_catalog_is_a_source_error() {
        let err = parse_bonds("<html>maintenance</html>").unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }
}
