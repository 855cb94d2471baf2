//! Engine facade
//!
//! Owns the store, the external source, the predictor registry and the
//! configuration. Callers keep their own session state (selected fixtures,
//! current group) and pass it in explicitly.
//!
//! # Example
//!
//! ```no_run
//! use fixture_sim::config::EngineConfig;
//! use fixture_sim::data::SqliteStore;
//! use fixture_sim::engine::Engine;
//! use fixture_sim::source::OfflineSource;
//!
//! fn main() -> anyhow::Result<()> {
//!     let store = SqliteStore::open("fixtures.db")?;
//!     let engine = Engine::new(store, OfflineSource, EngineConfig::default());
//!     for profit in engine.aggregate_profit(1)? {
//!         println!("{} / {}: {:+.2}", profit.strategy, profit.model_id, profit.profit);
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::backtesting::OutcomeEvaluator;
use crate::config::EngineConfig;
use crate::core::staking::{self, SimulationResult, StakingAlgorithm};
use crate::data::Store;
use crate::error::{
    validate_bets, validate_group_name, validate_group_size, validate_stake, EngineError,
    StoreError,
};
use crate::models::{
    Bet, Fixture, FixtureId, GroupId, ModelAccuracy, Prediction, SimulationGroup, StrategyProfit,
    TeamId,
};
use crate::pipeline::{AvailabilityPipeline, Candidate, PredictionAggregator};
use crate::predictor::PredictorRegistry;
use crate::source::ExternalDataSource;

pub struct Engine<S, E> {
    store: S,
    source: E,
    registry: PredictorRegistry,
    config: EngineConfig,
}

impl<S, E> Engine<S, E>
where
    S: Store,
    E: ExternalDataSource,
{
    /// Engine with the predictors enabled in `config`
    pub fn new(store: S, source: E, config: EngineConfig) -> Self {
        let registry = PredictorRegistry::from_config(&config.predictors);
        Self::with_registry(store, source, registry, config)
    }

    pub fn with_registry(
        store: S,
        source: E,
        registry: PredictorRegistry,
        config: EngineConfig,
    ) -> Self {
        info!(
            "Engine ready with {} predictors: {}",
            registry.len(),
            registry.model_ids().join(", ")
        );
        Self {
            store,
            source,
            registry,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn source(&self) -> &E {
        &self.source
    }

    pub fn registry(&self) -> &PredictorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ids of candidates with enough data to simulate, in input order
    pub fn ensure_available(&self, candidates: &[Candidate]) -> Vec<FixtureId> {
        AvailabilityPipeline::new(
            &self.store,
            &self.source,
            &self.config.availability,
            &self.config.odds,
        )
        .ensure_available(candidates)
    }

    /// Resolve fixture ids to full fixtures, from storage first and the
    /// external source otherwise. Unknown ids are skipped.
    pub fn lookup_fixtures(&self, ids: &[FixtureId]) -> Result<Vec<Fixture>, EngineError> {
        let mut found = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(fixture) = self.store.fixture(id)? {
                found.push(fixture);
                continue;
            }
            match self.source.fetch_fixture(id) {
                Ok(Some(fixture)) => {
                    self.store.upsert_fixtures(std::slice::from_ref(&fixture))?;
                    found.push(fixture);
                }
                Ok(None) => warn!("Fixture {} not found", id),
                Err(e) => warn!("Fixture {}: lookup failed: {}", id, e),
            }
        }
        Ok(found)
    }

    /// Validate the fixtures, persist a group of the ones with enough data and
    /// aggregate predictions for every member.
    pub fn create_simulation(
        &self,
        name: &str,
        fixtures: &[Fixture],
    ) -> Result<SimulationGroup, EngineError> {
        validate_group_name(name)?;

        let mut seen = HashSet::new();
        let fixtures: Vec<&Fixture> = fixtures.iter().filter(|f| seen.insert(f.id)).collect();

        let mut changed = Vec::new();
        for &fixture in &fixtures {
            if self.store.fixture(fixture.id)?.as_ref() != Some(fixture) {
                changed.push(fixture.clone());
            }
        }
        if !changed.is_empty() {
            self.store.upsert_fixtures(&changed)?;
        }

        let candidates: Vec<Candidate> = fixtures.iter().map(|&f| Candidate::from(f)).collect();
        let mut valid = self.ensure_available(&candidates);

        let limits = &self.config.groups;
        if valid.len() < limits.min_fixtures {
            return Err(EngineError::GroupTooSmall {
                found: valid.len(),
                min: limits.min_fixtures,
            });
        }
        if valid.len() > limits.max_fixtures {
            warn!(
                "{} fixtures passed, keeping the first {}",
                valid.len(),
                limits.max_fixtures
            );
            valid.truncate(limits.max_fixtures);
        }
        validate_group_size(valid.len(), limits.min_fixtures, limits.max_fixtures)?;

        let group = self.store.create_group(name.trim(), &valid)?;
        info!(
            "Created simulation group {} '{}' with {} fixtures",
            group.id,
            group.name,
            valid.len()
        );

        let by_id: HashMap<FixtureId, &Fixture> = fixtures.iter().map(|&f| (f.id, f)).collect();
        for id in &valid {
            let Some(fixture) = by_id.get(id) else { continue };
            let aggregated = self.aggregate_predictions(
                fixture.id,
                fixture.home_team,
                fixture.away_team,
                group.id,
            );
            if let Err(e) = aggregated {
                warn!("Fixture {}: prediction aggregation failed: {}", fixture.id, e);
            }
        }

        Ok(group)
    }

    pub fn aggregate_predictions(
        &self,
        fixture_id: FixtureId,
        home: TeamId,
        away: TeamId,
        group_id: GroupId,
    ) -> Result<Vec<Prediction>, EngineError> {
        Ok(PredictionAggregator::new(&self.registry).aggregate(
            &self.store,
            fixture_id,
            home,
            away,
            group_id,
        )?)
    }

    /// Mark unresolved predictions for the fixture. Returns rows marked.
    pub fn resolve_outcome(
        &self,
        fixture_id: FixtureId,
        home_score: u16,
        away_score: u16,
    ) -> Result<usize, EngineError> {
        Ok(OutcomeEvaluator::new(&self.store).resolve(fixture_id, home_score, away_score)?)
    }

    /// Pick up final scores for group members that still have unresolved
    /// predictions. Returns the number of fixtures resolved.
    pub fn refresh_results(&self, group_id: GroupId) -> Result<usize, EngineError> {
        let group = self
            .store
            .group(group_id)?
            .ok_or(StoreError::GroupNotFound(group_id))?;

        let mut resolved = 0;
        for &fixture_id in &group.fixture_ids {
            if self.store.unresolved_predictions(fixture_id)?.is_empty() {
                continue;
            }

            let finished = match self.store.fixture(fixture_id)? {
                Some(stored) if stored.is_completed() => Some(stored),
                _ => match self.source.fetch_fixture(fixture_id) {
                    Ok(Some(fetched)) if fetched.is_completed() => {
                        if !self
                            .store
                            .record_result(fixture_id, fetched.status, fetched.score)?
                        {
                            self.store.upsert_fixtures(std::slice::from_ref(&fetched))?;
                        }
                        Some(fetched)
                    }
                    Ok(_) => None,
                    Err(e) => {
                        warn!("Fixture {}: result refresh failed: {}", fixture_id, e);
                        None
                    }
                },
            };

            let Some(score) = finished.and_then(|f| f.score) else {
                debug!("Fixture {} not finished yet", fixture_id);
                continue;
            };
            if self.resolve_outcome(fixture_id, score.home, score.away)? > 0 {
                resolved += 1;
            }
        }

        info!("Group {}: {} fixtures resolved", group_id, resolved);
        Ok(resolved)
    }

    /// Replay bets through one stake-sizing algorithm
    pub fn simulate(
        &self,
        bets: &[Bet],
        algorithm: StakingAlgorithm,
        stake: f64,
        bankroll_start: Option<f64>,
    ) -> Result<SimulationResult, EngineError> {
        validate_stake(stake)?;
        if let Some(bankroll) = bankroll_start {
            validate_stake(bankroll)?;
        }
        validate_bets(bets)?;
        Ok(staking::simulate(bets, algorithm, stake, bankroll_start))
    }

    /// Replay every configured strategy against every model in the group
    pub fn aggregate_profit(&self, group_id: GroupId) -> Result<Vec<StrategyProfit>, EngineError> {
        Ok(OutcomeEvaluator::new(&self.store).aggregate_profit(
            group_id,
            &self.config.strategies(),
            &self.config.odds,
        )?)
    }

    pub fn model_accuracy(&self, group_id: GroupId) -> Result<Vec<ModelAccuracy>, EngineError> {
        Ok(OutcomeEvaluator::new(&self.store).model_accuracy(group_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AvailabilityConfig, StrategyConfig};
    use crate::data::{HistoryStore, MemoryStore, OddsStore, PredictionStore};
    use crate::models::{Outcome, OutcomeProbabilities, Score};
    use crate::predictor::Predictor;
    use crate::test_support::{day, played, quote, seed_form, stats, FakeSource};

    struct Fixed(OutcomeProbabilities);

    impl Predictor for Fixed {
        fn model_id(&self) -> &str {
            "fixed"
        }

        fn predict(
            &self,
            _history: &dyn HistoryStore,
            _home: TeamId,
            _away: TeamId,
        ) -> Result<Option<OutcomeProbabilities>, StoreError> {
            Ok(Some(self.0))
        }
    }

    const PAIRINGS: [(FixtureId, TeamId, TeamId); 3] = [(1, 10, 20), (2, 30, 40), (3, 50, 60)];

    fn config() -> EngineConfig {
        EngineConfig {
            availability: AvailabilityConfig {
                min_recent: 2,
                min_h2h: 1,
                overfetch: 0,
                max_consecutive_failures: 30,
            },
            strategies: vec![StrategyConfig::new("flat", StakingAlgorithm::Flat, 10.0, None)],
            ..EngineConfig::default()
        }
    }

    /// Store with enough history for every pairing and odds of 2.0, 1.8 and
    /// 1.0 on the home side
    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        for (i, &(_, home, away)) in PAIRINGS.iter().enumerate() {
            let base = 100 * (i as u64 + 1);
            seed_form(&store, home, base, 2, (2, 1));
            seed_form(&store, away, base + 10, 2, (1, 1));
            let meeting = played(base + 20, 30, home, away, 1, 0);
            store
                .persist_match(&meeting, &[stats(meeting.id, home), stats(meeting.id, away)])
                .unwrap();
        }
        store
            .upsert_odds(&[
                quote(1, 8, 2.0, 3.2, 3.9),
                quote(2, 8, 1.8, 3.4, 4.2),
                quote(3, 8, 1.0, 3.0, 4.0),
            ])
            .unwrap();
        store
    }

    fn upcoming() -> Vec<Fixture> {
        PAIRINGS
            .iter()
            .map(|&(id, home, away)| Fixture::scheduled(id, day(60 + id as i64), home, away))
            .collect()
    }

    fn engine(
        store: MemoryStore,
        source: FakeSource,
        config: EngineConfig,
    ) -> Engine<MemoryStore, FakeSource> {
        let mut registry = PredictorRegistry::new();
        registry.register(Fixed(OutcomeProbabilities::new(70.0, 20.0, 10.0)));
        Engine::with_registry(store, source, registry, config)
    }

    fn flags(engine: &Engine<MemoryStore, FakeSource>, group_id: GroupId) -> Vec<Option<bool>> {
        let mut predictions = engine.store().group_predictions(group_id).unwrap();
        predictions.sort_by_key(|p| p.fixture_id);
        predictions.iter().map(|p| p.correct).collect()
    }

    #[test]
    fn test_end_to_end_flat_profit() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        let group = engine.create_simulation("Matchday 1", &upcoming()).unwrap();
        assert_eq!(group.fixture_ids, vec![1, 2, 3]);

        let predictions = engine.store().group_predictions(group.id).unwrap();
        assert_eq!(predictions.len(), 3);
        assert!(predictions.iter().all(|p| p.outcome == Outcome::Home));

        engine.resolve_outcome(1, 2, 0).unwrap();
        engine.resolve_outcome(2, 0, 1).unwrap();
        engine.resolve_outcome(3, 1, 1).unwrap();
        assert_eq!(flags(&engine, group.id), vec![Some(true), Some(false), Some(false)]);

        let profits = engine.aggregate_profit(group.id).unwrap();
        assert_eq!(profits.len(), 1);
        assert!(profits[0].profit.abs() < 1e-9);
        assert_eq!(profits[0].bets_placed, 2);

        let accuracy = engine.model_accuracy(group.id).unwrap();
        assert_eq!(accuracy[0].correct, 1);
        assert_eq!(accuracy[0].resolved, 3);
    }

    #[test]
    fn test_resolve_twice_keeps_flags() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        let group = engine.create_simulation("Matchday 1", &upcoming()).unwrap();

        engine.resolve_outcome(1, 0, 0).unwrap();
        let first = flags(&engine, group.id);
        assert_eq!(engine.resolve_outcome(1, 0, 0).unwrap(), 0);
        assert_eq!(flags(&engine, group.id), first);
    }

    #[test]
    fn test_ensure_available_rerun_is_read_only() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        let candidates: Vec<Candidate> = upcoming().iter().map(Candidate::from).collect();

        let first = engine.ensure_available(&candidates);
        let writes = engine.store().write_count();
        let second = engine.ensure_available(&candidates);

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, first);
        assert_eq!(engine.store().write_count(), writes);
    }

    #[test]
    fn test_group_too_small() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        let mut fixtures = upcoming();
        // No history at all for this pairing
        fixtures[2] = Fixture::scheduled(3, day(63), 70, 80);

        let err = engine.create_simulation("Matchday 1", &fixtures).unwrap_err();
        assert!(matches!(err, EngineError::GroupTooSmall { found: 2, min: 3 }));
        assert!(engine.store().groups().unwrap().is_empty());
    }

    #[test]
    fn test_group_truncated_to_maximum() {
        let mut cfg = config();
        cfg.groups.min_fixtures = 1;
        cfg.groups.max_fixtures = 2;
        let engine = engine(seeded_store(), FakeSource::new(), cfg);

        let group = engine.create_simulation("Matchday 1", &upcoming()).unwrap();
        assert_eq!(group.fixture_ids, vec![1, 2]);
        assert_eq!(engine.store().group_predictions(group.id).unwrap().len(), 2);
    }

    #[test]
    fn test_inverted_group_limits_rejected() {
        let mut cfg = config();
        cfg.groups.min_fixtures = 3;
        cfg.groups.max_fixtures = 2;
        let engine = engine(seeded_store(), FakeSource::new(), cfg);

        let err = engine.create_simulation("Matchday 1", &upcoming()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(engine.store().groups().unwrap().is_empty());
    }

    #[test]
    fn test_blank_group_name_rejected() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        let err = engine.create_simulation("  ", &upcoming()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_refresh_results_from_source() {
        let mut source = FakeSource::new();
        for (id, score) in [(1, Score::new(2, 0)), (2, Score::new(0, 1))] {
            let (_, home, away) = PAIRINGS[id as usize - 1];
            source
                .fixtures
                .insert(id, Fixture::finished(id, day(60 + id as i64), home, away, score));
        }
        let engine = engine(seeded_store(), source, config());
        let group = engine.create_simulation("Matchday 1", &upcoming()).unwrap();

        assert_eq!(engine.refresh_results(group.id).unwrap(), 2);
        assert_eq!(flags(&engine, group.id), vec![Some(true), Some(false), None]);
        let stored = engine.store().fixture(1).unwrap().unwrap();
        assert_eq!(stored.score, Some(Score::new(2, 0)));

        // Only the unfinished fixture is asked for again
        let calls = engine.source().total_calls();
        assert_eq!(engine.refresh_results(group.id).unwrap(), 0);
        assert_eq!(engine.source().total_calls(), calls + 1);
    }

    #[test]
    fn test_refresh_unknown_group() {
        let engine = engine(seeded_store(), FakeSource::new(), config());
        assert!(matches!(
            engine.refresh_results(42),
            Err(EngineError::Store(StoreError::GroupNotFound(42)))
        ));
    }

    #[test]
    fn test_lookup_fixtures_falls_back_to_source() {
        let mut source = FakeSource::new();
        source
            .fixtures
            .insert(77, Fixture::scheduled(77, day(90), 10, 20));
        let engine = engine(MemoryStore::new(), source, config());

        let found = engine.lookup_fixtures(&[77, 78]).unwrap();
        assert_eq!(found.len(), 1);
        assert!(engine.store().fixture(77).unwrap().is_some());
    }

    #[test]
    fn test_simulate_validates_stake() {
        let engine = engine(MemoryStore::new(), FakeSource::new(), config());
        let bets = [Bet::new(true, 2.0, 0.6)];

        let result = engine
            .simulate(&bets, StakingAlgorithm::Flat, 50.0, Some(1000.0))
            .unwrap();
        assert_eq!(result.bankroll, vec![1000.0, 1050.0]);
        assert_eq!(result.stakes, vec![50.0]);

        assert!(engine.simulate(&bets, StakingAlgorithm::Flat, -1.0, None).is_err());
        assert!(engine
            .simulate(&bets, StakingAlgorithm::Flat, 10.0, Some(f64::NAN))
            .is_err());
    }

    #[test]
    fn test_simulate_validates_bets() {
        let engine = engine(MemoryStore::new(), FakeSource::new(), config());

        let skipped = [Bet::new(true, -1.5, 0.6), Bet::new(true, 2.0, 0.6)];
        let result = engine
            .simulate(&skipped, StakingAlgorithm::Flat, 10.0, None)
            .unwrap();
        assert_eq!(result.stakes, vec![0.0, 10.0]);

        let percent = [Bet::new(true, 2.0, 60.0)];
        assert!(matches!(
            engine.simulate(&percent, StakingAlgorithm::Flat, 10.0, None),
            Err(EngineError::Validation(_))
        ));
        let unpriced = [Bet::new(false, f64::INFINITY, 0.5)];
        assert!(engine
            .simulate(&unpriced, StakingAlgorithm::Flat, 10.0, None)
            .is_err());
    }
}
