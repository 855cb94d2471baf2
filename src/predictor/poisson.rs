//! Independent-Poisson scoreline model

use super::{expected_goals, poisson_pmf, HistoryWindow, Predictor, MAX_GOALS};
use crate::data::HistoryStore;
use crate::error::StoreError;
use crate::models::{OutcomeProbabilities, TeamId};

const HOME_ADVANTAGE: f64 = 1.10;

pub struct PoissonPredictor {
    window: HistoryWindow,
}

impl PoissonPredictor {
    pub fn new(window: HistoryWindow) -> Self {
        Self { window }
    }

    /// 1/X/2 fractions from two goal rates
    pub fn outcome_fractions(home_rate: f64, away_rate: f64) -> (f64, f64, f64) {
        let home_pmf = poisson_pmf(home_rate, MAX_GOALS);
        let away_pmf = poisson_pmf(away_rate, MAX_GOALS);

        let (mut home, mut draw, mut away) = (0.0, 0.0, 0.0);
        for (i, ph) in home_pmf.iter().enumerate() {
            for (j, pa) in away_pmf.iter().enumerate() {
                let p = ph * pa;
                if i > j {
                    home += p;
                } else if i < j {
                    away += p;
                } else {
                    draw += p;
                }
            }
        }
        (home, draw, away)
    }
}

impl Predictor for PoissonPredictor {
    fn model_id(&self) -> &str {
        "poisson"
    }

    fn predict(
        &self,
        history: &dyn HistoryStore,
        home: TeamId,
        away: TeamId,
    ) -> Result<Option<OutcomeProbabilities>, StoreError> {
        let Some((home_form, away_form)) = self.window.forms(history, home, away)? else {
            return Ok(None);
        };

        let (home_rate, away_rate) = expected_goals(&home_form, &away_form, HOME_ADVANTAGE);
        let (h, d, a) = Self::outcome_fractions(home_rate, away_rate);
        Ok(Some(OutcomeProbabilities::from_fractions(h, d, a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::models::Outcome;
    use crate::test_support::seed_form;

    #[test]
    fn test_equal_rates_are_symmetric() {
        let (h, d, a) = PoissonPredictor::outcome_fractions(1.3, 1.3);
        assert!((h - a).abs() < 1e-9);
        assert!((h + d + a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_stronger_home_side_favoured() {
        let store = MemoryStore::new();
        seed_form(&store, 10, 100, 6, (3, 0));
        seed_form(&store, 20, 200, 6, (0, 2));

        let predictor = PoissonPredictor::new(HistoryWindow::new(20, 5));
        let probs = predictor.predict(&store, 10, 20).unwrap().unwrap();
        assert_eq!(probs.best().0, Outcome::Home);
        assert!((probs.total() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_abstains_without_history() {
        let store = MemoryStore::new();
        seed_form(&store, 10, 100, 6, (1, 1));
        seed_form(&store, 20, 200, 4, (1, 1));

        let predictor = PoissonPredictor::new(HistoryWindow::new(20, 5));
        assert!(predictor.predict(&store, 10, 20).unwrap().is_none());
    }
}
