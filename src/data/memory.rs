//! In-memory store
//!
//! Keeps fixtures, statistics and odds in hash indexes behind a single
//! `RwLock`. Used by tests and for dry runs that should not touch disk.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{HistoryStore, OddsStore, PredictionStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    BookmakerId, Fixture, FixtureId, FixtureStatus, GroupId, MatchStatistics, NewPrediction,
    OddsQuote, Prediction, Score, SimulationGroup, StrategyProfit, TeamId,
};

#[derive(Default)]
struct Tables {
    fixtures: HashMap<FixtureId, Fixture>,
    statistics: HashMap<(FixtureId, TeamId), MatchStatistics>,
    odds: HashMap<(FixtureId, BookmakerId), OddsQuote>,
    groups: BTreeMap<GroupId, SimulationGroup>,
    predictions: BTreeMap<i64, Prediction>,
    profits: BTreeMap<(GroupId, String, String), StrategyProfit>,
    next_group_id: GroupId,
    next_prediction_id: i64,
}

impl Tables {
    /// Completed fixtures matching `keep`, newest first
    fn completed_where<F>(&self, keep: F) -> Vec<Fixture>
    where
        F: Fn(&Fixture) -> bool,
    {
        let mut found: Vec<Fixture> = self
            .fixtures
            .values()
            .filter(|f| f.is_completed() && keep(f))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.kickoff.cmp(&a.kickoff).then(b.id.cmp(&a.id)));
        found
    }
}

/// Store backed by process memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls that changed stored state
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn fixture_count(&self) -> usize {
        self.tables.read().fixtures.len()
    }

    fn bump(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

impl HistoryStore for MemoryStore {
    fn fixture(&self, id: FixtureId) -> StoreResult<Option<Fixture>> {
        Ok(self.tables.read().fixtures.get(&id).cloned())
    }

    fn recent_matches(
        &self,
        team: TeamId,
        exclude_opponent: Option<TeamId>,
        limit: usize,
    ) -> StoreResult<Vec<Fixture>> {
        let tables = self.tables.read();
        let mut found = tables.completed_where(|f| {
            f.involves(team) && exclude_opponent.map_or(true, |o| !f.is_meeting(team, o))
        });
        found.truncate(limit);
        Ok(found)
    }

    fn head_to_head(&self, team_a: TeamId, team_b: TeamId) -> StoreResult<Vec<Fixture>> {
        Ok(self
            .tables
            .read()
            .completed_where(|f| f.is_meeting(team_a, team_b)))
    }

    fn statistics(&self, fixture_id: FixtureId) -> StoreResult<Vec<MatchStatistics>> {
        let tables = self.tables.read();
        let mut rows: Vec<MatchStatistics> = tables
            .statistics
            .values()
            .filter(|s| s.fixture_id == fixture_id)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.team_id);
        Ok(rows)
    }

    fn upsert_fixtures(&self, fixtures: &[Fixture]) -> StoreResult<()> {
        if fixtures.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write();
        for fixture in fixtures {
            tables.fixtures.insert(fixture.id, fixture.clone());
        }
        self.bump();
        Ok(())
    }

    fn upsert_statistics(&self, stats: &MatchStatistics) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.fixtures.contains_key(&stats.fixture_id) {
            return Err(StoreError::FixtureNotFound(stats.fixture_id));
        }
        tables
            .statistics
            .insert((stats.fixture_id, stats.team_id), stats.clone());
        self.bump();
        Ok(())
    }

    fn persist_match(&self, fixture: &Fixture, stats: &[MatchStatistics]) -> StoreResult<()> {
        let mut tables = self.tables.write();
        tables.fixtures.insert(fixture.id, fixture.clone());
        for row in stats {
            tables
                .statistics
                .insert((row.fixture_id, row.team_id), row.clone());
        }
        self.bump();
        Ok(())
    }

    fn delete_fixture(&self, id: FixtureId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if tables.fixtures.remove(&id).is_some() {
            tables.statistics.retain(|(fixture_id, _), _| *fixture_id != id);
            self.bump();
        }
        Ok(())
    }

    fn record_result(
        &self,
        id: FixtureId,
        status: FixtureStatus,
        score: Option<Score>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.fixtures.get_mut(&id) {
            Some(fixture) => {
                fixture.status = status;
                fixture.score = score;
                self.bump();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl OddsStore for MemoryStore {
    fn odds_for_fixture(&self, fixture_id: FixtureId) -> StoreResult<Vec<OddsQuote>> {
        let tables = self.tables.read();
        let mut quotes: Vec<OddsQuote> = tables
            .odds
            .values()
            .filter(|q| q.fixture_id == fixture_id)
            .cloned()
            .collect();
        quotes.sort_by_key(|q| q.bookmaker_id);
        Ok(quotes)
    }

    fn upsert_odds(&self, quotes: &[OddsQuote]) -> StoreResult<()> {
        if quotes.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write();
        for quote in quotes {
            tables
                .odds
                .insert((quote.fixture_id, quote.bookmaker_id), quote.clone());
        }
        self.bump();
        Ok(())
    }
}

impl PredictionStore for MemoryStore {
    fn create_group(&self, name: &str, fixture_ids: &[FixtureId]) -> StoreResult<SimulationGroup> {
        let mut tables = self.tables.write();
        tables.next_group_id += 1;
        let group = SimulationGroup {
            id: tables.next_group_id,
            name: name.to_string(),
            created_at: Utc::now(),
            fixture_ids: fixture_ids.to_vec(),
        };
        tables.groups.insert(group.id, group.clone());
        self.bump();
        Ok(group)
    }

    fn group(&self, id: GroupId) -> StoreResult<Option<SimulationGroup>> {
        Ok(self.tables.read().groups.get(&id).cloned())
    }

    fn groups(&self) -> StoreResult<Vec<SimulationGroup>> {
        Ok(self.tables.read().groups.values().cloned().collect())
    }

    fn insert_prediction(&self, prediction: &NewPrediction) -> StoreResult<Prediction> {
        let mut tables = self.tables.write();
        let existing = tables.predictions.values().find(|p| {
            p.fixture_id == prediction.fixture_id
                && p.model_id == prediction.model_id
                && p.group_id == prediction.group_id
        });
        if let Some(existing) = existing {
            return Ok(existing.clone());
        }

        tables.next_prediction_id += 1;
        let stored = Prediction {
            id: tables.next_prediction_id,
            fixture_id: prediction.fixture_id,
            model_id: prediction.model_id.clone(),
            group_id: prediction.group_id,
            outcome: prediction.outcome,
            probability: prediction.probability,
            correct: None,
        };
        tables.predictions.insert(stored.id, stored.clone());
        self.bump();
        Ok(stored)
    }

    fn unresolved_predictions(&self, fixture_id: FixtureId) -> StoreResult<Vec<Prediction>> {
        Ok(self
            .tables
            .read()
            .predictions
            .values()
            .filter(|p| p.fixture_id == fixture_id && p.correct.is_none())
            .cloned()
            .collect())
    }

    fn mark_prediction(&self, prediction_id: i64, correct: bool) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        match tables.predictions.get_mut(&prediction_id) {
            Some(p) if p.correct.is_none() => {
                p.correct = Some(correct);
                self.bump();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn group_predictions(&self, group_id: GroupId) -> StoreResult<Vec<Prediction>> {
        Ok(self
            .tables
            .read()
            .predictions
            .values()
            .filter(|p| p.group_id == group_id)
            .cloned()
            .collect())
    }

    fn save_strategy_profit(&self, profit: &StrategyProfit) -> StoreResult<()> {
        let key = (
            profit.group_id,
            profit.strategy.clone(),
            profit.model_id.clone(),
        );
        self.tables.write().profits.insert(key, profit.clone());
        self.bump();
        Ok(())
    }

    fn strategy_profits(&self, group_id: GroupId) -> StoreResult<Vec<StrategyProfit>> {
        Ok(self
            .tables
            .read()
            .profits
            .values()
            .filter(|p| p.group_id == group_id)
            .cloned()
            .collect())
    }
}
