use crate::domain::{Address, Decimal};
use crate::engine::{
    AnalysisSettings, ArbiterThresholds, ClassifierContext, FeeMatchConfig, FeeRate,
    InternalAddresses, VaultRegistry,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub explorer_api_url: String,
    pub explorer_api_key: Option<String>,
    pub position_api_url: String,
    pub token_contract: Address,
    pub token_decimals: u32,
    pub treasury_address: Address,
    /// `(address, display name)` pairs.
    pub vaults: Vec<(Address, String)>,
    pub internal_addresses: Vec<Address>,
    pub internal_address_prefixes: Vec<String>,
    pub secondary_address: Option<Address>,
    pub fee_rate: FeeRate,
    pub fee_match_window_secs: i64,
    pub summary_cache_ttl: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;
        let database_path = required(&env_map, "DATABASE_PATH")?;
        let explorer_api_url = required(&env_map, "EXPLORER_API_URL")?;
        let explorer_api_key = optional(&env_map, "EXPLORER_API_KEY");
        let position_api_url = required(&env_map, "POSITION_API_URL")?;
        let token_contract = parse_address("TOKEN_CONTRACT", &required(&env_map, "TOKEN_CONTRACT")?)?;
        let token_decimals = parse_or(&env_map, "TOKEN_DECIMALS", 6u32, "must be a valid u32")?;
        if token_decimals > 28 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_DECIMALS".to_string(),
                "must be at most 28".to_string(),
            ));
        }
        let treasury_address =
            parse_address("TREASURY_ADDRESS", &required(&env_map, "TREASURY_ADDRESS")?)?;

        let vaults = match optional(&env_map, "VAULTS") {
            Some(raw) => parse_vaults(&raw)?,
            None => Vec::new(),
        };

        let internal_addresses = list(&env_map, "INTERNAL_ADDRESSES")
            .iter()
            .map(|a| parse_address("INTERNAL_ADDRESSES", a))
            .collect::<Result<Vec<_>, _>>()?;
        let internal_address_prefixes = list(&env_map, "INTERNAL_ADDRESS_PREFIXES")
            .into_iter()
            .map(|p| p.to_ascii_lowercase())
            .collect();

        let secondary_address = optional(&env_map, "SECONDARY_ADDRESS")
            .map(|a| parse_address("SECONDARY_ADDRESS", &a))
            .transpose()?;

        let fee_rate = match optional(&env_map, "FEE_RATE") {
            Some(raw) => Decimal::from_str(raw.trim())
                .ok()
                .and_then(FeeRate::new)
                .ok_or_else(|| {
                    ConfigError::InvalidValue(
                        "FEE_RATE".to_string(),
                        format!("must be a decimal in [0.0001, 1), got {}", raw),
                    )
                })?,
            None => FeeRate::default(),
        };

        let fee_match_window_secs = parse_or(
            &env_map,
            "FEE_MATCH_WINDOW_SECS",
            crate::engine::fee_matcher::DEFAULT_FEE_MATCH_WINDOW_SECS,
            "must be a valid i64",
        )?;
        if fee_match_window_secs < 0 {
            return Err(ConfigError::InvalidValue(
                "FEE_MATCH_WINDOW_SECS".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let summary_cache_ttl = Duration::from_secs(parse_or(
            &env_map,
            "SUMMARY_CACHE_TTL_SECS",
            60u64,
            "must be a valid u64",
        )?);

        Ok(Config {
            port,
            database_path,
            explorer_api_url,
            explorer_api_key,
            position_api_url,
            token_contract,
            token_decimals,
            treasury_address,
            vaults,
            internal_addresses,
            internal_address_prefixes,
            secondary_address,
            fee_rate,
            fee_match_window_secs,
            summary_cache_ttl,
        })
    }

    /// Address context for the classifier. `wallet` is a placeholder filled in per request.
    pub fn classifier_context(&self) -> ClassifierContext {
        ClassifierContext {
            wallet: Address::new(""),
            treasury: self.treasury_address.clone(),
            vaults: self.vaults.iter().cloned().collect::<VaultRegistry>(),
            internal: InternalAddresses::new(
                self.internal_addresses.iter().cloned(),
                self.internal_address_prefixes.clone(),
            ),
            secondary: self.secondary_address.clone(),
            token_decimals: self.token_decimals,
        }
    }

    pub fn analysis_settings(&self) -> AnalysisSettings {
        AnalysisSettings {
            fee_rate: self.fee_rate,
            fee_match: FeeMatchConfig {
                window_secs: self.fee_match_window_secs,
            },
            thresholds: ArbiterThresholds::default(),
        }
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    optional(env_map, key).ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

/// Present and non-blank.
fn optional(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expectation: &str,
) -> Result<T, ConfigError> {
    match optional(env_map, key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expectation.to_string())),
        None => Ok(default),
    }
}

fn list(env_map: &HashMap<String, String>, key: &str) -> Vec<String> {
    optional(env_map, key)
        .map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn parse_address(key: &str, raw: &str) -> Result<Address, ConfigError> {
    Address::from_str(raw)
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}: {}", raw, e)))
}

/// `name=0xaddr,name=0xaddr`
fn parse_vaults(raw: &str) -> Result<Vec<(Address, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, address) = entry.split_once('=').ok_or_else(|| {
                ConfigError::InvalidValue(
                    "VAULTS".to_string(),
                    format!("expected name=address, got {}", entry),
                )
            })?;
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "VAULTS".to_string(),
                    format!("missing vault name in {}", entry),
                ));
            }
            Ok((parse_address("VAULTS", address.trim())?, name.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREASURY: &str = "0x2222222222222222222222222222222222222222";
    const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "EXPLORER_API_URL".to_string(),
            "https://api.etherscan.io/api".to_string(),
        );
        map.insert(
            "POSITION_API_URL".to_string(),
            "https://positions.example".to_string(),
        );
        map.insert("TOKEN_CONTRACT".to_string(), TOKEN.to_string());
        map.insert("TREASURY_ADDRESS".to_string(), TREASURY.to_string());
        map
    }

    fn expect_missing(key: &str) {
        let mut env_map = setup_required_env();
        env_map.remove(key);
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, key),
            other => panic!("Expected MissingEnv({}), got {:?}", key, other),
        }
    }

    fn expect_invalid(key: &str, value: &str) {
        let mut env_map = setup_required_env();
        env_map.insert(key.to_string(), value.to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, key),
            other => panic!("Expected InvalidValue({}), got {:?}", key, other),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.token_decimals, 6);
        assert_eq!(config.fee_rate, FeeRate::default());
        assert_eq!(config.fee_match_window_secs, 300);
        assert_eq!(config.summary_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.token_contract.as_str(), TOKEN.to_lowercase());
        assert!(config.vaults.is_empty());
        assert!(config.explorer_api_key.is_none());
        assert!(config.secondary_address.is_none());
    }

    #[test]
    fn test_missing_required() {
        for key in [
            "DATABASE_PATH",
            "EXPLORER_API_URL",
            "POSITION_API_URL",
            "TOKEN_CONTRACT",
            "TREASURY_ADDRESS",
        ] {
            expect_missing(key);
        }
    }

    #[test]
    fn test_invalid_values() {
        expect_invalid("PORT", "not_a_number");
        expect_invalid("TOKEN_DECIMALS", "-1");
        expect_invalid("TOKEN_DECIMALS", "40");
        expect_invalid("TREASURY_ADDRESS", "treasury");
        expect_invalid("FEE_RATE", "1");
        expect_invalid("FEE_RATE", "0");
        expect_invalid("FEE_RATE", "0.00001");
        expect_invalid("FEE_RATE", "fifteen");
        expect_invalid("FEE_MATCH_WINDOW_SECS", "-5");
        expect_invalid("SUMMARY_CACHE_TTL_SECS", "soon");
        expect_invalid("VAULTS", "0x3333333333333333333333333333333333333333");
        expect_invalid("VAULTS", "=0x3333333333333333333333333333333333333333");
        expect_invalid("INTERNAL_ADDRESSES", "0x12");
    }

    #[test]
    fn test_address_lists() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "VAULTS".to_string(),
            "USDC Core=0x3333333333333333333333333333333333333333, Boosted=0x4444444444444444444444444444444444444444".to_string(),
        );
        env_map.insert(
            "INTERNAL_ADDRESSES".to_string(),
            "0x6666666666666666666666666666666666666666,".to_string(),
        );
        env_map.insert("INTERNAL_ADDRESS_PREFIXES".to_string(), "0xDEAD, 0xbeef".to_string());
        env_map.insert(
            "SECONDARY_ADDRESS".to_string(),
            "0x7777777777777777777777777777777777777777".to_string(),
        );
        env_map.insert("FEE_RATE".to_string(), "0.2".to_string());
        env_map.insert("SUMMARY_CACHE_TTL_SECS".to_string(), "0".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.vaults.len(), 2);
        assert_eq!(config.vaults[1].1, "Boosted");
        assert_eq!(config.internal_addresses.len(), 1);
        assert_eq!(config.internal_address_prefixes, vec!["0xdead", "0xbeef"]);
        assert_eq!(config.summary_cache_ttl, Duration::ZERO);

        let ctx = config.classifier_context();
        assert_eq!(ctx.vaults.name_of(&Address::new("0x3333333333333333333333333333333333333333")), Some("USDC Core"));
        assert!(ctx.internal.contains(&Address::new("0xdead000000000000000000000000000000000001")));
        assert_eq!(
            config.analysis_settings().fee_rate.value(),
            Decimal::from_scaled(2, 1)
        );
    }
}
