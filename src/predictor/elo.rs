//! Elo ratings replayed from stored history

use std::collections::{BTreeMap, HashMap};

use super::{HistoryWindow, Predictor};
use crate::data::HistoryStore;
use crate::error::StoreError;
use crate::models::{Fixture, OutcomeProbabilities, TeamId};

const INITIAL_RATING: f64 = 1500.0;
const K_FACTOR: f64 = 20.0;
const HOME_ADVANTAGE: f64 = 100.0;
const DRAW_SHARE: f64 = 0.25;

pub struct EloPredictor {
    window: HistoryWindow,
}

impl EloPredictor {
    pub fn new(window: HistoryWindow) -> Self {
        Self { window }
    }

    /// Expected score of the home side, home advantage included
    fn expected_home(home_elo: f64, away_elo: f64) -> f64 {
        let adjusted = home_elo + HOME_ADVANTAGE;
        1.0 / (1.0 + 10f64.powf((away_elo - adjusted) / 400.0))
    }

    /// Replay fixtures oldest first and return the resulting ratings
    pub fn ratings(fixtures: &[Fixture]) -> HashMap<TeamId, f64> {
        let mut ratings: HashMap<TeamId, f64> = HashMap::new();
        let mut ordered: Vec<&Fixture> = fixtures.iter().filter(|f| f.is_completed()).collect();
        ordered.sort_by(|a, b| a.kickoff.cmp(&b.kickoff).then(a.id.cmp(&b.id)));

        for fixture in ordered {
            let Some(score) = fixture.score else { continue };
            let home = *ratings.get(&fixture.home_team).unwrap_or(&INITIAL_RATING);
            let away = *ratings.get(&fixture.away_team).unwrap_or(&INITIAL_RATING);

            let expected = Self::expected_home(home, away);
            let actual = match score.home.cmp(&score.away) {
                std::cmp::Ordering::Greater => 1.0,
                std::cmp::Ordering::Equal => 0.5,
                std::cmp::Ordering::Less => 0.0,
            };
            let delta = K_FACTOR * (actual - expected);

            ratings.insert(fixture.home_team, home + delta);
            ratings.insert(fixture.away_team, away - delta);
        }
        ratings
    }

    /// 1/X/2 fractions with a fixed draw share
    pub fn outcome_fractions(home_elo: f64, away_elo: f64) -> (f64, f64, f64) {
        let expected = Self::expected_home(home_elo, away_elo);
        let home = expected * (1.0 - DRAW_SHARE);
        let away = (1.0 - expected) * (1.0 - DRAW_SHARE);
        let total = home + away + DRAW_SHARE;
        (home / total, DRAW_SHARE / total, away / total)
    }
}

impl Predictor for EloPredictor {
    fn model_id(&self) -> &str {
        "elo"
    }

    fn predict(
        &self,
        history: &dyn HistoryStore,
        home: TeamId,
        away: TeamId,
    ) -> Result<Option<OutcomeProbabilities>, StoreError> {
        if self.window.forms(history, home, away)?.is_none() {
            return Ok(None);
        }

        // Union of both histories, de-duplicated by fixture id
        let mut seen: BTreeMap<u64, Fixture> = BTreeMap::new();
        for team in [home, away] {
            for fixture in history.recent_matches(team, None, self.window.size)? {
                seen.insert(fixture.id, fixture);
            }
        }
        let fixtures: Vec<Fixture> = seen.into_values().collect();
        let ratings = Self::ratings(&fixtures);

        let home_elo = *ratings.get(&home).unwrap_or(&INITIAL_RATING);
        let away_elo = *ratings.get(&away).unwrap_or(&INITIAL_RATING);
        let (h, d, a) = Self::outcome_fractions(home_elo, away_elo);
        Ok(Some(OutcomeProbabilities::from_fractions(h, d, a)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::models::Outcome;
    use crate::test_support::{played, seed_form};

    #[test]
    fn test_equal_ratings_favour_home() {
        let (h, d, a) = EloPredictor::outcome_fractions(1500.0, 1500.0);
        assert!(h > a);
        assert!((d - 0.25).abs() < 1e-9);
        assert!((h + d + a - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_ratings_move_with_results() {
        let fixtures = vec![played(1, 1, 10, 20, 2, 0), played(2, 2, 20, 10, 0, 1)];
        let ratings = EloPredictor::ratings(&fixtures);
        assert!(ratings[&10] > INITIAL_RATING);
        assert!(ratings[&20] < INITIAL_RATING);
        assert!((ratings[&10] + ratings[&20] - 2.0 * INITIAL_RATING).abs() < 1e-9);
    }

    #[test]
    fn test_predict_prefers_winning_side() {
        let store = MemoryStore::new();
        seed_form(&store, 10, 100, 8, (0, 3));
        seed_form(&store, 20, 200, 8, (3, 0));

        let predictor = EloPredictor::new(HistoryWindow::new(20, 5));
        let probs = predictor.predict(&store, 10, 20).unwrap().unwrap();
        assert_eq!(probs.best().0, Outcome::Away);
    }
}
