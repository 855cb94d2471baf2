//! Outcome-probability estimators
//!
//! Every predictor maps a (home, away) pairing to 1/X/2 percentages, or
//! `None` when it does not have enough history to answer. Predictors are
//! interchangeable; the registry decides which ones run.

mod elo;
mod monte_carlo;
mod poisson;

pub use elo::EloPredictor;
pub use monte_carlo::MonteCarloPredictor;
pub use poisson::PoissonPredictor;

use crate::config::PredictorConfig;
use crate::data::HistoryStore;
use crate::error::StoreError;
use crate::models::{Fixture, OutcomeProbabilities, TeamId};

/// Goals beyond this are folded into the last bucket of a scoreline grid
pub const MAX_GOALS: usize = 10;

/// Pluggable estimator
pub trait Predictor {
    /// Stable identifier persisted with each prediction
    fn model_id(&self) -> &str;

    /// Probabilities in percent, or `None` when there is not enough data
    fn predict(
        &self,
        history: &dyn HistoryStore,
        home: TeamId,
        away: TeamId,
    ) -> Result<Option<OutcomeProbabilities>, StoreError>;
}

/// Shared knobs for the history-based predictors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryWindow {
    /// Matches read per team
    pub size: usize,
    /// Fewer completed matches than this and the predictor abstains
    pub min_matches: usize,
}

impl HistoryWindow {
    pub fn new(size: usize, min_matches: usize) -> Self {
        Self { size, min_matches }
    }

    /// Form for both teams, or None if either falls short of `min_matches`
    pub fn forms(
        &self,
        history: &dyn HistoryStore,
        home: TeamId,
        away: TeamId,
    ) -> Result<Option<(TeamForm, TeamForm)>, StoreError> {
        let home_matches = history.recent_matches(home, None, self.size)?;
        let away_matches = history.recent_matches(away, None, self.size)?;
        let home_form = TeamForm::from_matches(home, &home_matches);
        let away_form = TeamForm::from_matches(away, &away_matches);

        let required = self.min_matches.max(1);
        if home_form.matches < required || away_form.matches < required {
            return Ok(None);
        }
        Ok(Some((home_form, away_form)))
    }
}

impl From<&PredictorConfig> for HistoryWindow {
    fn from(config: &PredictorConfig) -> Self {
        Self::new(config.history_window, config.min_matches)
    }
}

/// Average goals for and against over a team's recent completed matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamForm {
    pub matches: usize,
    pub scored: f64,
    pub conceded: f64,
}

impl TeamForm {
    pub fn from_matches(team: TeamId, fixtures: &[Fixture]) -> Self {
        let mut matches = 0usize;
        let mut scored = 0.0;
        let mut conceded = 0.0;

        for (gf, ga) in fixtures
            .iter()
            .filter(|f| f.is_completed())
            .filter_map(|f| f.goals_for(team))
        {
            matches += 1;
            scored += gf as f64;
            conceded += ga as f64;
        }

        if matches == 0 {
            return Self {
                matches: 0,
                scored: 0.0,
                conceded: 0.0,
            };
        }

        Self {
            matches,
            scored: scored / matches as f64,
            conceded: conceded / matches as f64,
        }
    }
}

/// Expected goals for each side from both teams' form
pub fn expected_goals(home: &TeamForm, away: &TeamForm, home_advantage: f64) -> (f64, f64) {
    let home_rate = (home.scored + away.conceded) / 2.0 * home_advantage;
    let away_rate = (away.scored + home.conceded) / 2.0;
    (home_rate.clamp(0.1, 6.0), away_rate.clamp(0.1, 6.0))
}

/// Poisson pmf for 0..=max_k goals. Tail mass goes to the last bucket.
pub fn poisson_pmf(lambda: f64, max_k: usize) -> Vec<f64> {
    let lambda = lambda.max(0.0);
    let mut out = vec![0.0; max_k + 1];

    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }

    let sum: f64 = out.iter().sum();
    if sum < 1.0 {
        out[max_k] += 1.0 - sum;
    }
    out
}

/// Predictors in registration order
#[derive(Default)]
pub struct PredictorRegistry {
    predictors: Vec<Box<dyn Predictor>>,
}

impl PredictorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in predictors enabled by the configuration
    pub fn from_config(config: &PredictorConfig) -> Self {
        let window = HistoryWindow::from(config);
        let mut registry = Self::new();

        if config.poisson {
            registry.register(PoissonPredictor::new(window));
        }
        if config.monte_carlo {
            registry.register(MonteCarloPredictor::new(window, config.monte_carlo_iterations));
        }
        if config.elo {
            registry.register(EloPredictor::new(window));
        }

        registry
    }

    pub fn register<P: Predictor + 'static>(&mut self, predictor: P) {
        self.predictors.push(Box::new(predictor));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Predictor> {
        self.predictors.iter().map(|p| p.as_ref())
    }

    pub fn model_ids(&self) -> Vec<String> {
        self.iter().map(|p| p.model_id().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.predictors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictors.is_empty()
    }
}
