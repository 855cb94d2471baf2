//! Fixture builders and a scripted external source for unit tests

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::data::HistoryStore;
use crate::error::SourceError;
use crate::models::{
    BookmakerQuote, Fixture, FixtureId, MarketValue, MatchStatistics, OddsQuote, Score, TeamId,
};
use crate::source::ExternalDataSource;

pub(crate) fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap() + Duration::days(n)
}

pub(crate) fn played(
    id: FixtureId,
    n: i64,
    home: TeamId,
    away: TeamId,
    home_goals: u16,
    away_goals: u16,
) -> Fixture {
    Fixture::finished(id, day(n), home, away, Score::new(home_goals, away_goals))
}

/// Statistics row with a few non-zero values
pub(crate) fn stats(fixture_id: FixtureId, team_id: TeamId) -> MatchStatistics {
    MatchStatistics {
        total_shots: Some(11.0),
        ball_possession: Some(52.0),
        corner_kicks: Some(4.0),
        ..MatchStatistics::empty(fixture_id, team_id)
    }
}

/// Statistics row the pipeline must treat as unusable
pub(crate) fn blank_stats(fixture_id: FixtureId, team_id: TeamId) -> MatchStatistics {
    MatchStatistics {
        fouls: Some(0.0),
        ..MatchStatistics::empty(fixture_id, team_id)
    }
}

pub(crate) fn quote(
    fixture_id: FixtureId,
    bookmaker_id: u32,
    home: f64,
    draw: f64,
    away: f64,
) -> OddsQuote {
    OddsQuote {
        fixture_id,
        bookmaker_id,
        home,
        draw,
        away,
        updated_at: day(0),
    }
}

pub(crate) fn match_winner(bookmaker_id: u32, home: f64, draw: f64, away: f64) -> BookmakerQuote {
    let value = |label: &str, odds: f64| MarketValue {
        label: label.to_string(),
        odds,
    };
    BookmakerQuote {
        bookmaker_id,
        bookmaker_name: format!("book-{}", bookmaker_id),
        market: "Match Winner".to_string(),
        values: vec![value("Home", home), value("Draw", draw), value("Away", away)],
    }
}

/// `count` completed home matches for `team`, fixture ids from `first_id`,
/// each against a distinct opponent, with usable statistics stored.
pub(crate) fn seed_form<S: HistoryStore>(
    store: &S,
    team: TeamId,
    first_id: FixtureId,
    count: usize,
    (scored, conceded): (u16, u16),
) -> Vec<Fixture> {
    (0..count as u64)
        .map(|i| {
            let id = first_id + i;
            let fixture = played(id, i as i64 + 1, team, 5_000 + id as TeamId, scored, conceded);
            store.persist_match(&fixture, &[stats(id, team)]).unwrap();
            fixture
        })
        .collect()
}

/// Scripted source. Every call is counted; missing entries return empty.
#[derive(Default)]
pub(crate) struct FakeSource {
    pub recent: HashMap<TeamId, Vec<Fixture>>,
    pub statistics: HashMap<FixtureId, Vec<MatchStatistics>>,
    pub head_to_head: HashMap<(TeamId, TeamId), Vec<Fixture>>,
    pub markets: HashMap<FixtureId, Vec<BookmakerQuote>>,
    pub fixtures: HashMap<FixtureId, Fixture>,
    /// Every call fails with a transport error
    pub unreachable: bool,
    pub recent_calls: AtomicUsize,
    pub statistics_calls: AtomicUsize,
    pub head_to_head_calls: AtomicUsize,
    pub market_calls: AtomicUsize,
    pub fixture_calls: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    pub fn total_calls(&self) -> usize {
        [
            &self.recent_calls,
            &self.statistics_calls,
            &self.head_to_head_calls,
            &self.market_calls,
            &self.fixture_calls,
        ]
        .iter()
        .map(|c| c.load(Ordering::Relaxed))
        .sum()
    }

    fn hit(&self, counter: &AtomicUsize) -> Result<(), SourceError> {
        counter.fetch_add(1, Ordering::Relaxed);
        if self.unreachable {
            return Err(SourceError::RetriesExhausted {
                url: "fake://unreachable".to_string(),
                attempts: 3,
            });
        }
        Ok(())
    }
}

impl ExternalDataSource for FakeSource {
    fn fetch_recent(&self, team: TeamId, limit: usize) -> Result<Vec<Fixture>, SourceError> {
        self.hit(&self.recent_calls)?;
        let mut fixtures = self.recent.get(&team).cloned().unwrap_or_default();
        fixtures.truncate(limit);
        Ok(fixtures)
    }

    fn fetch_statistics(&self, fixture_id: FixtureId) -> Result<Vec<MatchStatistics>, SourceError> {
        self.hit(&self.statistics_calls)?;
        Ok(self.statistics.get(&fixture_id).cloned().unwrap_or_default())
    }

    fn fetch_head_to_head(
        &self,
        team_a: TeamId,
        team_b: TeamId,
        limit: usize,
    ) -> Result<Vec<Fixture>, SourceError> {
        self.hit(&self.head_to_head_calls)?;
        let mut fixtures = self
            .head_to_head
            .get(&(team_a, team_b))
            .or_else(|| self.head_to_head.get(&(team_b, team_a)))
            .cloned()
            .unwrap_or_default();
        fixtures.truncate(limit);
        Ok(fixtures)
    }

    fn fetch_market(&self, fixture_id: FixtureId) -> Result<Vec<BookmakerQuote>, SourceError> {
        self.hit(&self.market_calls)?;
        Ok(self.markets.get(&fixture_id).cloned().unwrap_or_default())
    }

    fn fetch_fixture(&self, fixture_id: FixtureId) -> Result<Option<Fixture>, SourceError> {
        self.hit(&self.fixture_calls)?;
        Ok(self.fixtures.get(&fixture_id).cloned())
    }
}
