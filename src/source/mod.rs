//! External fixture feed
//!
//! The availability pipeline backfills history and odds through
//! [`ExternalDataSource`]. Transport lives in [`client`] (feature `http`);
//! payload decoding lives in [`parser`] so it can be tested offline.
//!
//! # Example
//!
//! ```no_run
//! use fixture_sim::config::ApiConfig;
//! use fixture_sim::source::{ApiFootballClient, ExternalDataSource};
//!
//! fn main() -> anyhow::Result<()> {
//!     let client = ApiFootballClient::new(ApiConfig::default())?;
//!     let recent = client.fetch_recent(33, 10)?;
//!     println!("Fetched {} fixtures", recent.len());
//!     Ok(())
//! }
//! ```

#[cfg(feature = "http")]
mod client;
pub mod parser;

#[cfg(feature = "http")]
pub use client::ApiFootballClient;

use crate::error::SourceError;
use crate::models::{BookmakerQuote, Fixture, FixtureId, MatchStatistics, TeamId};

/// Remote provider of fixtures, statistics and bookmaker markets
pub trait ExternalDataSource {
    /// Last `limit` fixtures played by `team`
    fn fetch_recent(&self, team: TeamId, limit: usize) -> Result<Vec<Fixture>, SourceError>;

    /// Per-team statistics for one fixture
    fn fetch_statistics(&self, fixture_id: FixtureId) -> Result<Vec<MatchStatistics>, SourceError>;

    /// Last `limit` meetings between the two teams
    fn fetch_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        limit: usize,
    ) -> Result<Vec<Fixture>, SourceError>;

    /// Raw bookmaker markets for a fixture
    fn fetch_market(&self, fixture_id: FixtureId) -> Result<Vec<BookmakerQuote>, SourceError>;

    fn fetch_fixture(&self, fixture_id: FixtureId) -> Result<Option<Fixture>, SourceError>;
}

/// Source with no feed behind it. Every call reports `SourceError::Offline`
/// so the engine runs against stored data only.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSource;

impl ExternalDataSource for OfflineSource {
    fn fetch_recent(&self, _team: TeamId, _limit: usize) -> Result<Vec<Fixture>, SourceError> {
        Err(SourceError::Offline)
    }

    fn fetch_statistics(
        &self,
        _fixture_id: FixtureId,
    ) -> Result<Vec<MatchStatistics>, SourceError> {
        Err(SourceError::Offline)
    }

    fn fetch_head_to_head(
        &self,
        _team_a: TeamId,
        _team_b: TeamId,
        _limit: usize,
    ) -> Result<Vec<Fixture>, SourceError> {
        Err(SourceError::Offline)
    }

    fn fetch_market(&self, _fixture_id: FixtureId) -> Result<Vec<BookmakerQuote>, SourceError> {
        Err(SourceError::Offline)
    }

    fn fetch_fixture(&self, _fixture_id: FixtureId) -> Result<Option<Fixture>, SourceError> {
        Err(SourceError::Offline)
    }
}
