//! Prediction aggregation
//!
//! Runs every registered predictor once against a fixture and persists the
//! most likely outcome per model. A predictor that abstains leaves no row.

use tracing::debug;

use crate::data::{HistoryStore, PredictionStore, StoreResult};
use crate::models::{FixtureId, GroupId, NewPrediction, Prediction, TeamId};
use crate::predictor::PredictorRegistry;

pub struct PredictionAggregator<'a> {
    registry: &'a PredictorRegistry,
}

impl<'a> PredictionAggregator<'a> {
    pub fn new(registry: &'a PredictorRegistry) -> Self {
        Self { registry }
    }

    /// Persist one prediction per answering model. Returns the stored rows.
    pub fn aggregate<S>(
        &self,
        store: &S,
        fixture_id: FixtureId,
        home: TeamId,
        away: TeamId,
        group_id: GroupId,
    ) -> StoreResult<Vec<Prediction>>
    where
        S: HistoryStore + PredictionStore,
    {
        let mut stored = Vec::with_capacity(self.registry.len());

        for predictor in self.registry.iter() {
            let Some(probs) = predictor.predict(store, home, away)? else {
                debug!(
                    "{} has no prediction for fixture {}",
                    predictor.model_id(),
                    fixture_id
                );
                continue;
            };

            let (outcome, probability) = probs.best();
            let prediction = store.insert_prediction(&NewPrediction {
                fixture_id,
                model_id: predictor.model_id().to_string(),
                group_id,
                outcome,
                probability,
            })?;
            debug!(
                "{} predicts {} ({:.1}%) for fixture {}",
                prediction.model_id, prediction.outcome, prediction.probability, fixture_id
            );
            stored.push(prediction);
        }

        Ok(stored)
    }
}
