//! Engine configuration
//!
//! Every section has defaults, so an absent or partial TOML file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::staking::StakingAlgorithm;

/// Environment variable that overrides `api.api_key`
pub const API_KEY_ENV: &str = "API_FOOTBALL_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub availability: AvailabilityConfig,
    pub groups: GroupConfig,
    pub odds: OddsConfig,
    pub predictors: PredictorConfig,
    pub strategies: Vec<StrategyConfig>,
    pub api: ApiConfig,
}

impl EngineConfig {
    /// Load from a TOML file, then apply environment overrides
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        let mut config: EngineConfig = toml::from_str(&raw)?;
        config.apply_env();
        Ok(config)
    }

    /// Load when the file exists, otherwise defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let mut config = Self::default();
            config.apply_env();
            Ok(config)
        }
    }

    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api.api_key = Some(key);
            }
        }
    }

    /// Configured strategies, falling back to one of each algorithm
    pub fn strategies(&self) -> Vec<StrategyConfig> {
        if self.strategies.is_empty() {
            StrategyConfig::defaults()
        } else {
            self.strategies.clone()
        }
    }
}

/// Thresholds for the data availability pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvailabilityConfig {
    /// Recent completed matches required per team
    pub min_recent: usize,
    /// Head-to-head matches required per pairing
    pub min_h2h: usize,
    /// Extra matches requested on backfill to absorb pruned records
    pub overfetch: usize,
    /// Stop scanning a team after this many fixtures in a row lack statistics
    pub max_consecutive_failures: usize,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            min_recent: 10,
            min_h2h: 5,
            overfetch: 10,
            max_consecutive_failures: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    pub min_fixtures: usize,
    pub max_fixtures: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            min_fixtures: 3,
            max_fixtures: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OddsConfig {
    /// Prices at or below this are treated as "no bet placed"
    pub min_valid_odds: f64,
    /// Market name that carries 1X2 prices
    pub market_name: String,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            min_valid_odds: 1.01,
            market_name: "Match Winner".to_string(),
        }
    }
}

/// Which built-in predictors to register and their data requirements
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub poisson: bool,
    pub monte_carlo: bool,
    pub elo: bool,
    /// Completed matches a team needs before a predictor will answer
    pub min_matches: usize,
    /// Matches of history each predictor reads per team
    pub history_window: usize,
    pub monte_carlo_iterations: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            poisson: true,
            monte_carlo: true,
            elo: true,
            min_matches: 5,
            history_window: 20,
            monte_carlo_iterations: 10_000,
        }
    }
}

/// One stake-sizing strategy replayed by profit aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub name: String,
    pub algorithm: StakingAlgorithm,
    /// Flat stake, or base stake for progressive systems
    pub stake: f64,
    #[serde(default)]
    pub bankroll_start: Option<f64>,
}

impl StrategyConfig {
    pub fn new(
        name: &str,
        algorithm: StakingAlgorithm,
        stake: f64,
        bankroll_start: Option<f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            algorithm,
            stake,
            bankroll_start,
        }
    }

    pub fn defaults() -> Vec<Self> {
        let bankroll = Some(1000.0);
        vec![
            Self::new("flat", StakingAlgorithm::Flat, 10.0, bankroll),
            Self::new("martingale", StakingAlgorithm::Martingale, 10.0, bankroll),
            Self::new("fibonacci", StakingAlgorithm::Fibonacci, 10.0, bankroll),
            Self::new("value", StakingAlgorithm::ValueBetting, 10.0, bankroll),
            Self::new(
                "kelly",
                StakingAlgorithm::Kelly {
                    multiplier: 1.0,
                    min_stake: 0.0,
                },
                0.0,
                bankroll,
            ),
        ]
    }
}

/// Fixture feed connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Max attempts per request
    pub max_retries: u32,
    /// Minimum delay between requests in milliseconds
    pub delay_ms: u64,
    /// Restrict recent-form lookups to one season when set
    pub season: Option<u16>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v3.football.api-sports.io".to_string(),
            api_key: None,
            timeout_secs: 30,
            max_retries: 3,
            delay_ms: 1000,
            season: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.availability.min_recent, 10);
        assert_eq!(config.availability.min_h2h, 5);
        assert_eq!(config.availability.overfetch, 10);
        assert_eq!(config.availability.max_consecutive_failures, 30);
        assert_eq!(config.groups.min_fixtures, 3);
        assert_eq!(config.groups.max_fixtures, 25);
        assert!((config.odds.min_valid_odds - 1.01).abs() < 1e-9);
        assert_eq!(config.strategies().len(), 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            [availability]
            min_h2h = 3

            [api]
            delay_ms = 250
        "#;
        let config: EngineConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.availability.min_h2h, 3);
        assert_eq!(config.availability.min_recent, 10);
        assert_eq!(config.api.delay_ms, 250);
        assert_eq!(config.api.max_retries, 3);
    }

    #[test]
    fn test_strategies_from_toml() {
        let raw = r#"
            [[strategies]]
            name = "flat-25"
            algorithm = "flat"
            stake = 25.0

            [[strategies]]
            name = "half-kelly"
            stake = 0.0
            bankroll_start = 500.0
            algorithm = { kelly = { multiplier = 0.5, min_stake = 5.0 } }
        "#;
        let config: EngineConfig = toml::from_str(raw).unwrap();
        let strategies = config.strategies();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].algorithm, StakingAlgorithm::Flat);
        assert_eq!(strategies[0].bankroll_start, None);
        assert_eq!(
            strategies[1].algorithm,
            StakingAlgorithm::Kelly {
                multiplier: 0.5,
                min_stake: 5.0
            }
        );
    }
}
