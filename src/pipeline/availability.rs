//! Data availability pipeline
//!
//! A candidate fixture is only simulated once both teams have enough recent
//! matches with statistics, the pairing has enough head-to-head history and
//! a 1X2 market is stored. Missing data is backfilled from the external
//! source. External failures count as "no results"; store failures abort
//! only the candidate being checked. An offline source never prunes stored
//! fixtures.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{AvailabilityConfig, OddsConfig};
use crate::data::{HistoryStore, OddsStore, StoreResult};
use crate::error::SourceError;
use crate::models::{statistics_usable, Fixture, FixtureId, OddsQuote, TeamId};
use crate::source::ExternalDataSource;

/// Upcoming fixture offered for simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub fixture_id: FixtureId,
    pub home: TeamId,
    pub away: TeamId,
}

impl Candidate {
    pub fn new(fixture_id: FixtureId, home: TeamId, away: TeamId) -> Self {
        Self {
            fixture_id,
            home,
            away,
        }
    }
}

impl From<&Fixture> for Candidate {
    fn from(fixture: &Fixture) -> Self {
        Self::new(fixture.id, fixture.home_team, fixture.away_team)
    }
}

/// Why a candidate was left out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    RecentForm {
        team: TeamId,
        found: usize,
        required: usize,
    },
    HeadToHead {
        found: usize,
        required: usize,
    },
    NoOdds,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::RecentForm {
                team,
                found,
                required,
            } => write!(
                f,
                "team {} has {} recent matches with statistics, {} required",
                team, found, required
            ),
            Rejection::HeadToHead { found, required } => write!(
                f,
                "{} head-to-head matches with statistics, {} required",
                found, required
            ),
            Rejection::NoOdds => write!(f, "no match winner odds available"),
        }
    }
}

/// Result of checking one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Available,
    Rejected(Rejection),
}

pub struct AvailabilityPipeline<'a, S: ?Sized, E: ?Sized> {
    store: &'a S,
    source: &'a E,
    config: &'a AvailabilityConfig,
    odds: &'a OddsConfig,
}

impl<'a, S, E> AvailabilityPipeline<'a, S, E>
where
    S: HistoryStore + OddsStore + ?Sized,
    E: ExternalDataSource + ?Sized,
{
    pub fn new(
        store: &'a S,
        source: &'a E,
        config: &'a AvailabilityConfig,
        odds: &'a OddsConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
            odds,
        }
    }

    /// Ids of candidates that pass every stage, in input order
    pub fn ensure_available(&self, candidates: &[Candidate]) -> Vec<FixtureId> {
        let mut valid = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            match self.check(candidate) {
                Ok(Verdict::Available) => valid.push(candidate.fixture_id),
                Ok(Verdict::Rejected(reason)) => {
                    info!("Fixture {} rejected: {}", candidate.fixture_id, reason)
                }
                Err(e) => warn!(
                    "Fixture {} skipped after storage error: {}",
                    candidate.fixture_id, e
                ),
            }
        }

        info!(
            "{} of {} candidate fixtures have enough data",
            valid.len(),
            candidates.len()
        );
        valid
    }

    /// Run all stages for one candidate. Head-to-head only runs once both
    /// teams pass; odds only once head-to-head passes.
    pub fn check(&self, candidate: &Candidate) -> StoreResult<Verdict> {
        for (team, opponent) in [
            (candidate.home, candidate.away),
            (candidate.away, candidate.home),
        ] {
            let found = self.ensure_recent_form(team, opponent)?;
            if found < self.config.min_recent {
                return Ok(Verdict::Rejected(Rejection::RecentForm {
                    team,
                    found,
                    required: self.config.min_recent,
                }));
            }
        }

        let found = self.ensure_head_to_head(candidate.home, candidate.away)?;
        if found < self.config.min_h2h {
            return Ok(Verdict::Rejected(Rejection::HeadToHead {
                found,
                required: self.config.min_h2h,
            }));
        }

        if !self.ensure_odds(candidate.fixture_id)? {
            return Ok(Verdict::Rejected(Rejection::NoOdds));
        }

        Ok(Verdict::Available)
    }

    fn has_usable_statistics(&self, fixture_id: FixtureId) -> StoreResult<bool> {
        Ok(statistics_usable(&self.store.statistics(fixture_id)?))
    }

    /// Store only fixtures that are new or changed
    fn upsert_changed(&self, fixtures: Vec<Fixture>) -> StoreResult<usize> {
        let mut changed = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            if self.store.fixture(fixture.id)?.as_ref() != Some(&fixture) {
                changed.push(fixture);
            }
        }
        if !changed.is_empty() {
            self.store.upsert_fixtures(&changed)?;
        }
        Ok(changed.len())
    }

    /// Recent-form stage for one team. Returns the number of recent matches
    /// (meetings with `opponent` excluded) that carry usable statistics.
    fn ensure_recent_form(&self, team: TeamId, opponent: TeamId) -> StoreResult<usize> {
        let required = self.config.min_recent;
        let window = required + self.config.overfetch;

        let stored = self.store.recent_matches(team, Some(opponent), required)?;
        if stored.len() < required {
            match self.source.fetch_recent(team, window) {
                Ok(fetched) => {
                    let completed: Vec<Fixture> =
                        fetched.into_iter().filter(Fixture::is_completed).collect();
                    let added = self.upsert_changed(completed)?;
                    debug!("Team {}: backfilled {} recent fixtures", team, added);
                }
                Err(SourceError::Offline) => {
                    debug!("Team {}: offline, using stored data", team)
                }
                Err(e) => warn!(
                    "Team {}: recent fixtures fetch failed, using stored data: {}",
                    team, e
                ),
            }
        }

        let mut valid = 0;
        let mut consecutive_failures = 0;

        for fixture in self.store.recent_matches(team, Some(opponent), window)? {
            if valid >= required {
                break;
            }

            if self.has_usable_statistics(fixture.id)? {
                valid += 1;
                consecutive_failures = 0;
                continue;
            }

            match self.source.fetch_statistics(fixture.id) {
                Ok(rows) if statistics_usable(&rows) => {
                    self.store.persist_match(&fixture, &rows)?;
                    valid += 1;
                    consecutive_failures = 0;
                    continue;
                }
                Ok(_) => {}
                Err(SourceError::Offline) => {
                    debug!("Fixture {}: no statistics stored, kept while offline", fixture.id);
                    continue;
                }
                Err(e) => warn!("Fixture {}: statistics fetch failed: {}", fixture.id, e),
            }

            self.store.delete_fixture(fixture.id)?;
            consecutive_failures += 1;
            info!(
                "Team {}: pruned fixture {} without statistics",
                team, fixture.id
            );

            if consecutive_failures >= self.config.max_consecutive_failures {
                warn!(
                    "Team {}: {} fixtures in a row without statistics, giving up",
                    team, consecutive_failures
                );
                break;
            }
        }

        Ok(valid)
    }

    fn count_head_to_head(
        &self,
        home: TeamId,
        away: TeamId,
    ) -> StoreResult<(usize, HashSet<FixtureId>)> {
        let mut with_stats = HashSet::new();
        for fixture in self.store.head_to_head(home, away)? {
            if self.has_usable_statistics(fixture.id)? {
                with_stats.insert(fixture.id);
            }
        }
        Ok((with_stats.len(), with_stats))
    }

    /// Head-to-head stage. Returns the count re-read from storage.
    fn ensure_head_to_head(&self, home: TeamId, away: TeamId) -> StoreResult<usize> {
        let required = self.config.min_h2h;
        let (stored, known) = self.count_head_to_head(home, away)?;

        if stored < required {
            let fetched = match self.source.fetch_head_to_head(
                home,
                away,
                required + self.config.overfetch,
            ) {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(
                        "Head-to-head fetch failed for {} v {}, using stored data: {}",
                        home, away, e
                    );
                    Vec::new()
                }
            };

            for fixture in fetched {
                if known.contains(&fixture.id)
                    || fixture.status.is_pre_match()
                    || !fixture.is_meeting(home, away)
                {
                    continue;
                }

                match self.source.fetch_statistics(fixture.id) {
                    Ok(rows) if statistics_usable(&rows) => {
                        self.store.persist_match(&fixture, &rows)?;
                        debug!("Stored head-to-head fixture {}", fixture.id);
                    }
                    Ok(_) => debug!(
                        "Discarded head-to-head fixture {}: no usable statistics",
                        fixture.id
                    ),
                    Err(e) => warn!("Fixture {}: statistics fetch failed: {}", fixture.id, e),
                }
            }
        }

        let (count, _) = self.count_head_to_head(home, away)?;
        Ok(count)
    }

    /// Odds stage. True when at least one 1X2 quote is stored.
    fn ensure_odds(&self, fixture_id: FixtureId) -> StoreResult<bool> {
        if !self.store.odds_for_fixture(fixture_id)?.is_empty() {
            return Ok(true);
        }

        let markets = match self.source.fetch_market(fixture_id) {
            Ok(markets) => markets,
            Err(e) => {
                warn!("Fixture {}: odds fetch failed: {}", fixture_id, e);
                Vec::new()
            }
        };

        let now = Utc::now();
        let quotes: Vec<OddsQuote> = markets
            .iter()
            .filter_map(|m| m.to_match_winner(fixture_id, &self.odds.market_name, now))
            .collect();

        if quotes.is_empty() {
            return Ok(false);
        }

        self.store.upsert_odds(&quotes)?;
        debug!("Fixture {}: stored {} odds quotes", fixture_id, quotes.len());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MemoryStore;
    use crate::error::StoreError;
    use crate::models::{FixtureStatus, MatchStatistics, Score};
    use crate::source::OfflineSource;
    use crate::test_support::{
        blank_stats, match_winner, played, quote, seed_form, stats, FakeSource,
    };

    const HOME: TeamId = 10;
    const AWAY: TeamId = 20;
    const FIXTURE: FixtureId = 9_000;

    fn config() -> AvailabilityConfig {
        AvailabilityConfig::default()
    }

    /// Store with everything the default thresholds need
    fn ready_store() -> MemoryStore {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 10, (2, 1));
        seed_form(&store, AWAY, 200, 10, (1, 1));
        for i in 0..5u64 {
            let id = 300 + i;
            let fixture = played(id, 50 + i as i64, HOME, AWAY, 1, 0);
            store
                .persist_match(&fixture, &[stats(id, HOME), stats(id, AWAY)])
                .unwrap();
        }
        store.upsert_odds(&[quote(FIXTURE, 1, 2.1, 3.3, 3.6)]).unwrap();
        store
    }

    #[test]
    fn test_ready_candidate_passes_without_fetching() {
        let store = ready_store();
        let source = FakeSource::new();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let valid = pipeline.ensure_available(&[Candidate::new(FIXTURE, HOME, AWAY)]);
        assert_eq!(valid, vec![FIXTURE]);
        assert_eq!(source.total_calls(), 0);
    }

    #[test]
    fn test_rerun_performs_zero_writes() {
        let store = MemoryStore::new();
        let mut source = FakeSource::new();
        // Everything comes from the source on the first run
        for (team, base) in [(HOME, 100u64), (AWAY, 200u64)] {
            let fixtures: Vec<Fixture> = (0..12u64)
                .map(|i| played(base + i, 40 - i as i64, team, 7_000 + (base + i) as TeamId, 1, 0))
                .collect();
            for f in &fixtures {
                source.statistics.insert(f.id, vec![stats(f.id, team)]);
            }
            source.recent.insert(team, fixtures);
        }
        let h2h: Vec<Fixture> = (0..6u64)
            .map(|i| played(300 + i, 60 - i as i64, HOME, AWAY, 0, 0))
            .collect();
        for f in &h2h {
            source
                .statistics
                .insert(f.id, vec![stats(f.id, HOME), stats(f.id, AWAY)]);
        }
        source.head_to_head.insert((HOME, AWAY), h2h);
        source.markets.insert(FIXTURE, vec![match_winner(8, 1.9, 3.4, 4.2)]);

        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);
        let candidates = [Candidate::new(FIXTURE, HOME, AWAY)];

        let first = pipeline.ensure_available(&candidates);
        assert_eq!(first, vec![FIXTURE]);

        let writes = store.write_count();
        let calls = source.total_calls();
        let second = pipeline.ensure_available(&candidates);
        assert_eq!(second, first);
        assert_eq!(store.write_count(), writes);
        assert_eq!(source.total_calls(), calls);
    }

    #[test]
    fn test_fixture_without_statistics_is_pruned() {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 10, (1, 0));
        // Newest match for the home side has no statistics anywhere
        let orphan = played(150, 30, HOME, 6_000, 2, 2);
        store.upsert_fixtures(&[orphan.clone()]).unwrap();

        let source = FakeSource::new();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let found = pipeline.ensure_recent_form(HOME, AWAY).unwrap();
        assert_eq!(found, 10);
        assert!(store.fixture(150).unwrap().is_none());
        assert_eq!(source.statistics_calls.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[test]
    fn test_recent_form_excludes_meetings_with_opponent() {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 9, (1, 0));
        let meeting = played(180, 20, HOME, AWAY, 1, 1);
        store
            .persist_match(&meeting, &[stats(180, HOME), stats(180, AWAY)])
            .unwrap();

        let source = FakeSource::new();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        assert_eq!(pipeline.ensure_recent_form(HOME, AWAY).unwrap(), 9);
        assert_eq!(pipeline.ensure_recent_form(HOME, 999).unwrap(), 10);
    }

    #[test]
    fn test_scan_aborts_after_consecutive_failures() {
        let store = MemoryStore::new();
        let fixtures: Vec<Fixture> = (0..8u64)
            .map(|i| played(100 + i, 20 - i as i64, HOME, 6_000 + i as TeamId, 1, 0))
            .collect();
        store.upsert_fixtures(&fixtures).unwrap();

        let source = FakeSource::new();
        let cfg = AvailabilityConfig {
            min_recent: 5,
            overfetch: 3,
            max_consecutive_failures: 3,
            ..config()
        };
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        assert_eq!(pipeline.ensure_recent_form(HOME, AWAY).unwrap(), 0);
        // Three pruned, the rest untouched
        assert_eq!(store.fixture_count(), 5);
        assert_eq!(source.statistics_calls.load(std::sync::atomic::Ordering::Relaxed), 3);
    }

    #[test]
    fn test_short_team_rejects_before_head_to_head() {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 10, (1, 0));
        seed_form(&store, AWAY, 200, 4, (1, 0));

        let source = FakeSource::new();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let verdict = pipeline.check(&Candidate::new(FIXTURE, HOME, AWAY)).unwrap();
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection::RecentForm {
                team: AWAY,
                found: 4,
                required: 10
            })
        );
        assert_eq!(source.head_to_head_calls.load(std::sync::atomic::Ordering::Relaxed), 0);
        assert_eq!(source.market_calls.load(std::sync::atomic::Ordering::Relaxed), 0);
    }

    #[test]
    fn test_head_to_head_without_statistics_never_persisted() {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 10, (1, 0));
        seed_form(&store, AWAY, 200, 10, (1, 0));

        let mut source = FakeSource::new();
        let mut h2h = Vec::new();
        for i in 0..5u64 {
            let f = played(300 + i, 60 + i as i64, HOME, AWAY, 1, 1);
            source
                .statistics
                .insert(f.id, vec![stats(f.id, HOME), stats(f.id, AWAY)]);
            h2h.push(f);
        }
        let empty = played(310, 70, AWAY, HOME, 0, 0);
        source
            .statistics
            .insert(310, vec![blank_stats(310, HOME), blank_stats(310, AWAY)]);
        h2h.push(empty);
        let mut upcoming = played(311, 90, HOME, AWAY, 0, 0);
        upcoming.status = crate::models::FixtureStatus::NotStarted;
        upcoming.score = None;
        h2h.push(upcoming);
        source.head_to_head.insert((HOME, AWAY), h2h);
        source.markets.insert(FIXTURE, vec![match_winner(8, 1.9, 3.4, 4.2)]);

        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let valid = pipeline.ensure_available(&[Candidate::new(FIXTURE, HOME, AWAY)]);
        assert_eq!(valid, vec![FIXTURE]);
        assert!(store.fixture(310).unwrap().is_none());
        assert!(store.fixture(311).unwrap().is_none());
        assert_eq!(store.head_to_head(HOME, AWAY).unwrap().len(), 5);
    }

    #[test]
    fn test_missing_head_to_head_rejects() {
        let store = MemoryStore::new();
        seed_form(&store, HOME, 100, 10, (1, 0));
        seed_form(&store, AWAY, 200, 10, (1, 0));

        let source = FakeSource::failing();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let verdict = pipeline.check(&Candidate::new(FIXTURE, HOME, AWAY)).unwrap();
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection::HeadToHead {
                found: 0,
                required: 5
            })
        );
    }

    #[test]
    fn test_odds_stage_requires_match_winner() {
        let store = ready_store();
        let mut source = FakeSource::new();
        let mut over_under = match_winner(9, 1.8, 2.0, 0.0);
        over_under.market = "Goals Over/Under".to_string();
        source.markets.insert(42, vec![over_under]);
        source.markets.insert(43, vec![match_winner(8, 2.4, 3.1, 3.0)]);

        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let valid = pipeline.ensure_available(&[
            Candidate::new(42, HOME, AWAY),
            Candidate::new(43, HOME, AWAY),
            Candidate::new(FIXTURE, HOME, AWAY),
        ]);
        assert_eq!(valid, vec![43, FIXTURE]);
        assert!(store.odds_for_fixture(42).unwrap().is_empty());
        assert_eq!(store.odds_for_fixture(43).unwrap().len(), 1);
    }

    #[test]
    fn test_unreachable_source_keeps_stored_data() {
        let store = ready_store();
        let source = FakeSource::failing();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        let valid = pipeline.ensure_available(&[
            Candidate::new(FIXTURE, HOME, AWAY),
            Candidate::new(FIXTURE + 1, HOME, AWAY),
        ]);
        assert_eq!(valid, vec![FIXTURE]);
    }

    #[test]
    fn test_offline_run_never_prunes() {
        let store = ready_store();
        // Home form played but never enriched with statistics
        let bare: Vec<Fixture> = (0..12u64)
            .map(|i| played(400 + i, 30 + i as i64, HOME, 6_000 + i as TeamId, 2, 2))
            .collect();
        store.upsert_fixtures(&bare).unwrap();
        for i in 0..10u64 {
            store.delete_fixture(100 + i).unwrap();
        }
        let before = store.fixture_count();

        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &OfflineSource, &cfg, &odds);

        let verdict = pipeline.check(&Candidate::new(FIXTURE, HOME, AWAY)).unwrap();
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection::RecentForm {
                team: HOME,
                found: 0,
                required: cfg.min_recent,
            })
        );
        assert_eq!(store.fixture_count(), before);
        for fixture in &bare {
            assert!(store.fixture(fixture.id).unwrap().is_some());
        }
    }

    #[test]
    fn test_offline_run_accepts_complete_data() {
        let store = ready_store();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &OfflineSource, &cfg, &odds);

        let writes = store.write_count();
        let valid = pipeline.ensure_available(&[Candidate::new(FIXTURE, HOME, AWAY)]);
        assert_eq!(valid, vec![FIXTURE]);
        assert_eq!(store.write_count(), writes);
    }

    /// Memory store whose reads fail for one team
    struct BrokenTeamStore {
        inner: MemoryStore,
        broken: TeamId,
    }

    impl HistoryStore for BrokenTeamStore {
        fn fixture(&self, id: FixtureId) -> StoreResult<Option<Fixture>> {
            self.inner.fixture(id)
        }

        fn recent_matches(
            &self,
            team: TeamId,
            exclude_opponent: Option<TeamId>,
            limit: usize,
        ) -> StoreResult<Vec<Fixture>> {
            if team == self.broken {
                return Err(StoreError::Corrupt(format!("team {} rows unreadable", team)));
            }
            self.inner.recent_matches(team, exclude_opponent, limit)
        }

        fn head_to_head(&self, team_a: TeamId, team_b: TeamId) -> StoreResult<Vec<Fixture>> {
            self.inner.head_to_head(team_a, team_b)
        }

        fn statistics(&self, fixture_id: FixtureId) -> StoreResult<Vec<MatchStatistics>> {
            self.inner.statistics(fixture_id)
        }

        fn upsert_fixtures(&self, fixtures: &[Fixture]) -> StoreResult<()> {
            self.inner.upsert_fixtures(fixtures)
        }

        fn upsert_statistics(&self, stats: &MatchStatistics) -> StoreResult<()> {
            self.inner.upsert_statistics(stats)
        }

        fn persist_match(&self, fixture: &Fixture, stats: &[MatchStatistics]) -> StoreResult<()> {
            self.inner.persist_match(fixture, stats)
        }

        fn delete_fixture(&self, id: FixtureId) -> StoreResult<()> {
            self.inner.delete_fixture(id)
        }

        fn record_result(
            &self,
            id: FixtureId,
            status: FixtureStatus,
            score: Option<Score>,
        ) -> StoreResult<bool> {
            self.inner.record_result(id, status, score)
        }
    }

    impl OddsStore for BrokenTeamStore {
        fn odds_for_fixture(&self, fixture_id: FixtureId) -> StoreResult<Vec<OddsQuote>> {
            self.inner.odds_for_fixture(fixture_id)
        }

        fn upsert_odds(&self, quotes: &[OddsQuote]) -> StoreResult<()> {
            self.inner.upsert_odds(quotes)
        }
    }

    #[test]
    fn test_store_error_skips_only_that_candidate() {
        const BROKEN: TeamId = 30;
        let store = BrokenTeamStore {
            inner: ready_store(),
            broken: BROKEN,
        };
        let source = FakeSource::new();
        let cfg = config();
        let odds = OddsConfig::default();
        let pipeline = AvailabilityPipeline::new(&store, &source, &cfg, &odds);

        assert!(matches!(
            pipeline.check(&Candidate::new(FIXTURE + 7, BROKEN, AWAY)),
            Err(StoreError::Corrupt(_))
        ));

        let valid = pipeline.ensure_available(&[
            Candidate::new(FIXTURE + 7, BROKEN, AWAY),
            Candidate::new(FIXTURE, HOME, AWAY),
            Candidate::new(FIXTURE + 8, HOME, BROKEN),
        ]);
        assert_eq!(valid, vec![FIXTURE]);
    }
}
