//! Outcome evaluation and strategy profit aggregation
//!
//! `resolve` is the only code path that sets a prediction's correctness flag.
//! It selects rows whose flag is still null, so resolving a fixture twice is a
//! no-op the second time.
//!
//! `aggregate_profit` replays every (strategy, model) pair over the group's
//! resolved fixtures in kickoff order. A fixture without a price above the
//! configured minimum still occupies its position in the sequence.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::{OddsConfig, StrategyConfig};
use crate::core::staking::{is_tracking, simulate};
use crate::data::{HistoryStore, OddsSource, OddsStore, PredictionStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Bet, FixtureId, GroupId, ModelAccuracy, Outcome, Prediction, StrategyProfit,
};

pub struct OutcomeEvaluator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: ?Sized> OutcomeEvaluator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

impl<'a, S> OutcomeEvaluator<'a, S>
where
    S: PredictionStore + ?Sized,
{
    /// Mark every unresolved prediction for the fixture. Returns rows marked.
    pub fn resolve(
        &self,
        fixture_id: FixtureId,
        home_score: u16,
        away_score: u16,
    ) -> StoreResult<usize> {
        let actual = Outcome::from_score(home_score, away_score);
        let mut marked = 0;

        for prediction in self.store.unresolved_predictions(fixture_id)? {
            let correct = prediction.outcome == actual;
            if self.store.mark_prediction(prediction.id, correct)? {
                marked += 1;
            }
        }

        if marked > 0 {
            info!(
                "Fixture {} resolved as {} ({}-{}), {} predictions marked",
                fixture_id, actual, home_score, away_score, marked
            );
        }
        Ok(marked)
    }

    /// Per-model hit rate over the group's predictions, ordered by model id
    pub fn model_accuracy(&self, group_id: GroupId) -> StoreResult<Vec<ModelAccuracy>> {
        self.require_group(group_id)?;

        let mut by_model: BTreeMap<String, ModelAccuracy> = BTreeMap::new();
        for prediction in self.store.group_predictions(group_id)? {
            let entry = by_model
                .entry(prediction.model_id.clone())
                .or_insert_with(|| ModelAccuracy {
                    model_id: prediction.model_id.clone(),
                    predictions: 0,
                    resolved: 0,
                    correct: 0,
                    accuracy: 0.0,
                });
            entry.predictions += 1;
            if let Some(correct) = prediction.correct {
                entry.resolved += 1;
                if correct {
                    entry.correct += 1;
                }
            }
        }

        Ok(by_model
            .into_values()
            .map(|mut acc| {
                acc.accuracy = if acc.resolved > 0 {
                    acc.correct as f64 / acc.resolved as f64
                } else {
                    0.0
                };
                acc
            })
            .collect())
    }

    fn require_group(&self, group_id: GroupId) -> StoreResult<()> {
        match self.store.group(group_id)? {
            Some(_) => Ok(()),
            None => Err(StoreError::GroupNotFound(group_id)),
        }
    }
}

impl<'a, S> OutcomeEvaluator<'a, S>
where
    S: HistoryStore + OddsStore + PredictionStore + ?Sized,
{
    /// Replay each (strategy, model) pair over the group and persist the
    /// terminal result. Returns the saved rows, strategies outer, models inner.
    pub fn aggregate_profit(
        &self,
        group_id: GroupId,
        strategies: &[StrategyConfig],
        odds: &OddsConfig,
    ) -> StoreResult<Vec<StrategyProfit>> {
        self.require_group(group_id)?;

        let mut by_model: BTreeMap<String, Vec<Prediction>> = BTreeMap::new();
        for prediction in self.store.group_predictions(group_id)? {
            if prediction.correct.is_some() {
                by_model
                    .entry(prediction.model_id.clone())
                    .or_default()
                    .push(prediction);
            }
        }

        let mut kickoffs: HashMap<FixtureId, Option<DateTime<Utc>>> = HashMap::new();
        let mut sequences: Vec<(String, Vec<Bet>)> = Vec::with_capacity(by_model.len());
        for (model_id, mut predictions) in by_model {
            for prediction in &predictions {
                if !kickoffs.contains_key(&prediction.fixture_id) {
                    let kickoff = self.store.fixture(prediction.fixture_id)?.map(|f| f.kickoff);
                    kickoffs.insert(prediction.fixture_id, kickoff);
                }
            }
            // Unknown kickoffs go last
            predictions.sort_by_key(|p| {
                let kickoff = kickoffs.get(&p.fixture_id).copied().flatten();
                (kickoff.is_none(), kickoff, p.fixture_id)
            });

            let bets = predictions
                .iter()
                .map(|p| self.bet_for(p, odds))
                .collect::<StoreResult<Vec<Bet>>>()?;
            sequences.push((model_id, bets));
        }

        let mut saved = Vec::with_capacity(strategies.len() * sequences.len());
        for strategy in strategies {
            for (model_id, bets) in &sequences {
                let result = simulate(
                    bets,
                    strategy.algorithm,
                    strategy.stake,
                    strategy.bankroll_start,
                );
                let bets_won = result
                    .stakes
                    .iter()
                    .zip(bets.iter())
                    .filter(|&(&stake, bet)| stake > 0.0 && bet.won)
                    .count();

                let profit = StrategyProfit {
                    group_id,
                    strategy: strategy.name.clone(),
                    model_id: model_id.clone(),
                    profit: result.total_profit(),
                    bets_placed: result.bets_placed(),
                    bets_won,
                    total_staked: result.total_staked(),
                    final_bankroll: is_tracking(strategy.bankroll_start)
                        .then(|| result.final_bankroll()),
                };
                debug!(
                    "Group {} {}/{}: {:+.2} over {} bets",
                    group_id, profit.strategy, profit.model_id, profit.profit, profit.bets_placed
                );
                self.store.save_strategy_profit(&profit)?;
                saved.push(profit);
            }
        }

        info!(
            "Group {}: aggregated {} strategy/model results",
            group_id,
            saved.len()
        );
        Ok(saved)
    }

    fn bet_for(&self, prediction: &Prediction, odds: &OddsConfig) -> StoreResult<Bet> {
        let won = prediction.correct.unwrap_or(false);
        let probability = prediction.probability / 100.0;
        let price = self.store.best_odds(prediction.fixture_id, prediction.outcome)?;

        Ok(match price {
            Some(best) if best.odds.is_finite() && best.odds > odds.min_valid_odds => {
                Bet::new(won, best.odds, probability)
            }
            _ => {
                debug!(
                    "No valid odds for {} on fixture {}, position skipped",
                    prediction.outcome, prediction.fixture_id
                );
                Bet::no_market(won, probability)
            }
        })
    }
}
