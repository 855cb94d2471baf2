//! Fixture Sim - football fixture simulation and strategy backtesting
//!
//! This library provides:
//! - A data availability pipeline that backfills match history, statistics and
//!   odds before a fixture is simulated
//! - Prediction aggregation over pluggable 1X2 predictors
//! - Outcome resolution and per-strategy profit aggregation
//! - Stake-sizing simulation (flat, martingale, fibonacci, value, Kelly)
//!
//! # Example
//!
//! ```no_run
//! use fixture_sim::core::staking::{simulate, StakingAlgorithm};
//! use fixture_sim::models::Bet;
//!
//! let bets = vec![Bet::new(true, 2.0, 0.55), Bet::new(false, 2.4, 0.45)];
//! let result = simulate(&bets, StakingAlgorithm::Martingale, 10.0, Some(1000.0));
//! println!("Final bankroll: {:.2}", result.final_bankroll());
//! ```

pub mod backtesting;
pub mod config;
pub mod core;
pub mod data;
pub mod engine;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod predictor;
pub mod source;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::EngineConfig;
pub use core::staking::{simulate, SimulationResult, StakingAlgorithm};
pub use data::{MemoryStore, SqliteStore, Store};
pub use engine::Engine;
pub use error::{EngineError, SourceError, StoreError};
pub use models::{Bet, Fixture, Outcome, OutcomeProbabilities, Prediction, StrategyProfit};
pub use pipeline::Candidate;
pub use predictor::{Predictor, PredictorRegistry};
pub use source::{ExternalDataSource, OfflineSource};
