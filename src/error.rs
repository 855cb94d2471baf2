use thiserror::Error;

use crate::models::{Bet, FixtureId, GroupId};

/// Persistence failures. These abort the current fixture, never the batch.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Simulation group {0} not found")]
    GroupNotFound(GroupId),

    #[error("Fixture {0} is not stored")]
    FixtureNotFound(FixtureId),
}

/// External data source failures. The pipeline treats these as "zero results",
/// except `Offline`, which leaves stored data untouched.
#[derive(Debug, Error)]
pub enum SourceError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("API reported errors: {0}")]
    Api(String),

    #[error("Failed to parse payload: {0}")]
    Parse(String),

    #[error("Gave up on {url} after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },

    /// No feed configured. Stored data is used as-is and never pruned.
    #[error("Fixture feed is offline")]
    Offline,
}

impl From<serde_json::Error> for SourceError {
    fn from(e: serde_json::Error) -> Self {
        SourceError::Parse(e.to_string())
    }
}

/// Errors surfaced by the engine facade
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Only {found} fixtures passed validation, at least {min} required")]
    GroupTooSmall { found: usize, min: usize },
}

/// Validation functions
pub fn validate_group_size(count: usize, min: usize, max: usize) -> Result<(), EngineError> {
    if count < min || count > max {
        return Err(EngineError::Validation(format!(
            "Simulation group needs between {} and {} fixtures, got {}",
            min, max, count
        )));
    }
    Ok(())
}

pub fn validate_group_name(name: &str) -> Result<(), EngineError> {
    if name.trim().is_empty() {
        return Err(EngineError::Validation(
            "Simulation group name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Non-positive odds are allowed and resolve to no stake
pub fn validate_odds(odds: f64) -> Result<(), EngineError> {
    if !odds.is_finite() {
        return Err(EngineError::Validation(format!(
            "Odds must be a finite number, got {}",
            odds
        )));
    }
    Ok(())
}

pub fn validate_probability(prob: f64) -> Result<(), EngineError> {
    if !(0.0..=1.0).contains(&prob) {
        return Err(EngineError::Validation(format!(
            "Probability must be between 0 and 1, got {}",
            prob
        )));
    }
    Ok(())
}

pub fn validate_stake(stake: f64) -> Result<(), EngineError> {
    if !stake.is_finite() || stake < 0.0 {
        return Err(EngineError::Validation(format!(
            "Stake must be a non-negative amount, got {}",
            stake
        )));
    }
    Ok(())
}

/// Bets replayed through a staking algorithm
pub fn validate_bets(bets: &[Bet]) -> Result<(), EngineError> {
    for (i, bet) in bets.iter().enumerate() {
        let checked =
            validate_odds(bet.odds).and_then(|()| validate_probability(bet.model_probability));
        if let Err(EngineError::Validation(msg)) = checked {
            return Err(EngineError::Validation(format!("bet {}: {}", i + 1, msg)));
        }
    }
    Ok(())
}
