//! Monte-Carlo scoreline sampler
//!
//! Samples goals from the same rates as the Poisson model. The RNG is seeded
//! from the pairing, so repeated runs on the same data agree.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{expected_goals, HistoryWindow, Predictor};
use crate::data::HistoryStore;
use crate::error::StoreError;
use crate::models::{OutcomeProbabilities, TeamId};

const HOME_ADVANTAGE: f64 = 1.10;
const SEED: u64 = 0x5eed_f00d;

pub struct MonteCarloPredictor {
    window: HistoryWindow,
    iterations: usize,
}

impl MonteCarloPredictor {
    pub fn new(window: HistoryWindow, iterations: usize) -> Self {
        Self {
            window,
            iterations: iterations.max(1),
        }
    }

    fn rng_for(home: TeamId, away: TeamId) -> StdRng {
        StdRng::seed_from_u64(SEED ^ ((home as u64) << 32) ^ away as u64)
    }

    /// Knuth's multiplication method; fine for football-sized rates
    fn sample_goals<R: Rng>(rng: &mut R, lambda: f64) -> u32 {
        let limit = (-lambda).exp();
        let mut k = 0;
        let mut p = 1.0;
        loop {
            p *= rng.gen::<f64>();
            if p <= limit {
                return k;
            }
            k += 1;
        }
    }

    pub fn simulate(
        &self,
        home: TeamId,
        away: TeamId,
        home_rate: f64,
        away_rate: f64,
    ) -> (f64, f64, f64) {
        let mut rng = Self::rng_for(home, away);
        let (mut wins, mut draws, mut losses) = (0usize, 0usize, 0usize);

        for _ in 0..self.iterations {
            let h = Self::sample_goals(&mut rng, home_rate);
            let a = Self::sample_goals(&mut rng, away_rate);
            match h.cmp(&a) {
                std::cmp::Ordering::Greater => wins += 1,
                std::cmp::Ordering::Equal => draws += 1,
                std::cmp::Ordering::Less => losses += 1,
            }
        }

        let n = self.iterations as f64;
        (wins as f64 / n, draws as f64 / n, losses as f64 / n)
    }
}

impl Predictor for MonteCarloPredictor {
    fn model_id(&self) -> &str {
        "monte_carlo"
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
        let (h, d, a) = self.simulate(home, away, home_rate, away_rate);
        Ok(Some(OutcomeProbabilities::from_fractions(h, d, a)))
    }
}
