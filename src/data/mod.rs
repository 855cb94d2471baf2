//! Persistence interfaces and their implementations
//!
//! The engine only talks to storage through these traits. Fixture history,
//! statistics and odds belong to the persistence layer; predictions,
//! simulation groups and strategy results belong to the engine.

pub mod memory;
pub mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::models::{
    BestOdds, Fixture, FixtureId, FixtureStatus, GroupId, MatchStatistics, NewPrediction,
    OddsQuote, Outcome, Prediction, Score, SimulationGroup, StrategyProfit, TeamId,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Fixture history and per-team match statistics
pub trait HistoryStore {
    fn fixture(&self, id: FixtureId) -> StoreResult<Option<Fixture>>;

    /// Completed matches of `team`, most recent first. Meetings with
    /// `exclude_opponent` are left out when it is given.
    fn recent_matches(
        &self,
        team: TeamId,
        exclude_opponent: Option<TeamId>,
        limit: usize,
    ) -> StoreResult<Vec<Fixture>>;

    /// Completed meetings between the two teams, most recent first
    fn head_to_head(&self, team_a: TeamId, team_b: TeamId) -> StoreResult<Vec<Fixture>>;

    fn statistics(&self, fixture_id: FixtureId) -> StoreResult<Vec<MatchStatistics>>;

    fn upsert_fixtures(&self, fixtures: &[Fixture]) -> StoreResult<()>;

    /// One row per (fixture, team); an existing row is overwritten. The
    /// fixture must already be stored, otherwise `StoreError::FixtureNotFound`.
    fn upsert_statistics(&self, stats: &MatchStatistics) -> StoreResult<()>;

    /// Fixture plus its statistics as a single atomic write
    fn persist_match(&self, fixture: &Fixture, stats: &[MatchStatistics]) -> StoreResult<()>;

    /// Remove a fixture and its statistics
    fn delete_fixture(&self, id: FixtureId) -> StoreResult<()>;

    /// Update status and score. Returns false when the fixture is unknown.
    fn record_result(
        &self,
        id: FixtureId,
        status: FixtureStatus,
        score: Option<Score>,
    ) -> StoreResult<bool>;
}

/// Persisted bookmaker quotes
pub trait OddsStore {
    fn odds_for_fixture(&self, fixture_id: FixtureId) -> StoreResult<Vec<OddsQuote>>;

    /// Upsert by (fixture, bookmaker)
    fn upsert_odds(&self, quotes: &[OddsQuote]) -> StoreResult<()>;
}

/// Best price lookup used when replaying predictions as bets
pub trait OddsSource {
    fn best_odds(&self, fixture_id: FixtureId, outcome: Outcome) -> StoreResult<Option<BestOdds>>;
}

impl<T: OddsStore + ?Sized> OddsSource for T {
    fn best_odds(&self, fixture_id: FixtureId, outcome: Outcome) -> StoreResult<Option<BestOdds>> {
        Ok(best_price(&self.odds_for_fixture(fixture_id)?, outcome))
    }
}

/// Highest finite price for `outcome`. Ties keep the first quote seen.
pub fn best_price(quotes: &[OddsQuote], outcome: Outcome) -> Option<BestOdds> {
    let mut best: Option<BestOdds> = None;
    for quote in quotes {
        let odds = quote.price(outcome);
        if !odds.is_finite() {
            continue;
        }
        if best.map_or(true, |b| odds > b.odds) {
            best = Some(BestOdds {
                bookmaker_id: quote.bookmaker_id,
                odds,
            });
        }
    }
    best
}

/// Simulation groups, predictions and strategy results
pub trait PredictionStore {
    fn create_group(&self, name: &str, fixture_ids: &[FixtureId]) -> StoreResult<SimulationGroup>;

    fn group(&self, id: GroupId) -> StoreResult<Option<SimulationGroup>>;

    fn groups(&self) -> StoreResult<Vec<SimulationGroup>>;

    /// Insert a prediction. If one already exists for the same
    /// (fixture, model, group) the stored row is returned unchanged.
    fn insert_prediction(&self, prediction: &NewPrediction) -> StoreResult<Prediction>;

    /// Predictions for the fixture whose correctness flag is still unset
    fn unresolved_predictions(&self, fixture_id: FixtureId) -> StoreResult<Vec<Prediction>>;

    /// Set the correctness flag only if it is still unset.
    /// Returns true when this call performed the write.
    fn mark_prediction(&self, prediction_id: i64, correct: bool) -> StoreResult<bool>;

    fn group_predictions(&self, group_id: GroupId) -> StoreResult<Vec<Prediction>>;

    /// Upsert by (group, strategy, model)
    fn save_strategy_profit(&self, profit: &StrategyProfit) -> StoreResult<()>;

    fn strategy_profits(&self, group_id: GroupId) -> StoreResult<Vec<StrategyProfit>>;
}

/// Everything the engine needs from storage
pub trait Store: HistoryStore + OddsStore + PredictionStore {}

impl<T: HistoryStore + OddsStore + PredictionStore + ?Sized> Store for T {}
