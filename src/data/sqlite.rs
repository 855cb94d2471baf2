//! SQLite-backed store
//!
//! One connection behind a mutex. Multi-row writes run inside a transaction
//! so a failure leaves no partial state behind.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Params, Row};
use std::path::Path;
use tracing::{debug, info};

use super::schema::create_tables;
use super::{HistoryStore, OddsStore, PredictionStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Fixture, FixtureId, FixtureStatus, GroupId, MatchStatistics, NewPrediction, OddsQuote,
    Outcome, Prediction, Score, SimulationGroup, StrategyProfit, TeamId,
};

const FIXTURE_COLUMNS: &str = "id, kickoff, home_team, away_team, status, home_goals, away_goals";

/// Status codes that count as a completed match
const FINISHED_STATUSES: &str = "('FT', 'AET', 'PEN')";

const STATISTICS_COLUMNS: &str = "fixture_id, team_id, shots_on_goal, shots_off_goal, total_shots, \
    blocked_shots, shots_inside_box, shots_outside_box, fouls, corner_kicks, offsides, \
    ball_possession, yellow_cards, red_cards, goalkeeper_saves, total_passes, passes_accurate, \
    passes_percentage, expected_goals";

const PREDICTION_COLUMNS: &str =
    "id, fixture_id, model_id, group_id, outcome, probability, correct";

/// Raw fixture columns before validation
struct FixtureRow {
    id: i64,
    kickoff: i64,
    home_team: u32,
    away_team: u32,
    status: String,
    home_goals: Option<i64>,
    away_goals: Option<i64>,
}

impl FixtureRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kickoff: row.get(1)?,
            home_team: row.get(2)?,
            away_team: row.get(3)?,
            status: row.get(4)?,
            home_goals: row.get(5)?,
            away_goals: row.get(6)?,
        })
    }

    fn into_fixture(self) -> StoreResult<Fixture> {
        let id = to_fixture_id(self.id)?;
        let status = FixtureStatus::from_short(&self.status).ok_or_else(|| {
            StoreError::Corrupt(format!("fixture {}: unknown status '{}'", id, self.status))
        })?;
        let goals = |value: Option<i64>| {
            value
                .map(|g| {
                    u16::try_from(g).map_err(|_| {
                        StoreError::Corrupt(format!("fixture {}: invalid goal count {}", id, g))
                    })
                })
                .transpose()
        };
        let score = Score::from_parts(goals(self.home_goals)?, goals(self.away_goals)?)
            .map_err(|e| StoreError::Corrupt(format!("fixture {}: {}", id, e)))?;

        Ok(Fixture {
            id,
            kickoff: timestamp(self.kickoff)?,
            home_team: self.home_team,
            away_team: self.away_team,
            status,
            score,
        })
    }
}

fn to_fixture_id(raw: i64) -> StoreResult<FixtureId> {
    FixtureId::try_from(raw)
        .map_err(|_| StoreError::Corrupt(format!("negative fixture id {}", raw)))
}

fn timestamp(secs: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| StoreError::Corrupt(format!("timestamp out of range: {}", secs)))
}

fn read_statistics(row: &Row<'_>) -> rusqlite::Result<(i64, MatchStatistics)> {
    let raw_id: i64 = row.get(0)?;
    let stats = MatchStatistics {
        fixture_id: 0,
        team_id: row.get(1)?,
        shots_on_goal: row.get(2)?,
        shots_off_goal: row.get(3)?,
        total_shots: row.get(4)?,
        blocked_shots: row.get(5)?,
        shots_inside_box: row.get(6)?,
        shots_outside_box: row.get(7)?,
        fouls: row.get(8)?,
        corner_kicks: row.get(9)?,
        offsides: row.get(10)?,
        ball_possession: row.get(11)?,
        yellow_cards: row.get(12)?,
        red_cards: row.get(13)?,
        goalkeeper_saves: row.get(14)?,
        total_passes: row.get(15)?,
        passes_accurate: row.get(16)?,
        passes_percentage: row.get(17)?,
        expected_goals: row.get(18)?,
    };
    Ok((raw_id, stats))
}

struct PredictionRow {
    id: i64,
    fixture_id: i64,
    model_id: String,
    group_id: GroupId,
    outcome: String,
    probability: f64,
    correct: Option<bool>,
}

impl PredictionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            fixture_id: row.get(1)?,
            model_id: row.get(2)?,
            group_id: row.get(3)?,
            outcome: row.get(4)?,
            probability: row.get(5)?,
            correct: row.get(6)?,
        })
    }

    fn into_prediction(self) -> StoreResult<Prediction> {
        let outcome = Outcome::from_label(&self.outcome).ok_or_else(|| {
            StoreError::Corrupt(format!(
                "prediction {}: unknown outcome '{}'",
                self.id, self.outcome
            ))
        })?;
        Ok(Prediction {
            id: self.id,
            fixture_id: to_fixture_id(self.fixture_id)?,
            model_id: self.model_id,
            group_id: self.group_id,
            outcome,
            probability: self.probability,
            correct: self.correct,
        })
    }
}

fn query_fixtures<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<Fixture>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, FixtureRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(FixtureRow::into_fixture).collect()
}

fn query_predictions<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Prediction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, PredictionRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(PredictionRow::into_prediction).collect()
}

fn upsert_fixture(conn: &Connection, fixture: &Fixture) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO fixtures (id, kickoff, home_team, away_team, status, home_goals, away_goals)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
            kickoff = excluded.kickoff,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            status = excluded.status,
            home_goals = excluded.home_goals,
            away_goals = excluded.away_goals",
        params![
            fixture.id as i64,
            fixture.kickoff.timestamp(),
            fixture.home_team,
            fixture.away_team,
            fixture.status.short(),
            fixture.score.map(|s| s.home),
            fixture.score.map(|s| s.away),
        ],
    )?;
    Ok(())
}

fn upsert_statistics_row(conn: &Connection, s: &MatchStatistics) -> rusqlite::Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO match_statistics ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
              ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            STATISTICS_COLUMNS
        ),
        params![
            s.fixture_id as i64,
            s.team_id,
            s.shots_on_goal,
            s.shots_off_goal,
            s.total_shots,
            s.blocked_shots,
            s.shots_inside_box,
            s.shots_outside_box,
            s.fouls,
            s.corner_kicks,
            s.offsides,
            s.ball_possession,
            s.yellow_cards,
            s.red_cards,
            s.goalkeeper_saves,
            s.total_passes,
            s.passes_accurate,
            s.passes_percentage,
            s.expected_goals,
        ],
    )?;
    Ok(())
}

/// Store backed by a SQLite database file
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file and ensure the schema exists
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        create_tables(&conn)?;
        info!("Database initialized at {}", path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn load_group(conn: &Connection, id: GroupId) -> StoreResult<Option<SimulationGroup>> {
        let header: Option<(String, i64)> = conn
            .query_row(
                "SELECT name, created_at FROM simulation_groups WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((name, created_at)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT fixture_id FROM group_fixtures WHERE group_id = ?1 ORDER BY position",
        )?;
        let raw_ids = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let fixture_ids = raw_ids
            .into_iter()
            .map(to_fixture_id)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Some(SimulationGroup {
            id,
            name,
            created_at: timestamp(created_at)?,
            fixture_ids,
        }))
    }
}

impl HistoryStore for SqliteStore {
    fn fixture(&self, id: FixtureId) -> StoreResult<Option<Fixture>> {
        let conn = self.conn.lock();
        let sql = format!("SELECT {} FROM fixtures WHERE id = ?1", FIXTURE_COLUMNS);
        let row = conn
            .query_row(&sql, params![id as i64], FixtureRow::read)
            .optional()?;
        row.map(FixtureRow::into_fixture).transpose()
    }

    fn recent_matches(
        &self,
        team: TeamId,
        exclude_opponent: Option<TeamId>,
        limit: usize,
    ) -> StoreResult<Vec<Fixture>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM fixtures
             WHERE (home_team = ?1 OR away_team = ?1)
               AND status IN {}
               AND home_goals IS NOT NULL AND away_goals IS NOT NULL
               AND (?2 IS NULL OR (home_team != ?2 AND away_team != ?2))
             ORDER BY kickoff DESC, id DESC
             LIMIT ?3",
            FIXTURE_COLUMNS, FINISHED_STATUSES
        );
        query_fixtures(&conn, &sql, params![team, exclude_opponent, limit as i64])
    }

    fn head_to_head(&self, team_a: TeamId, team_b: TeamId) -> StoreResult<Vec<Fixture>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM fixtures
             WHERE ((home_team = ?1 AND away_team = ?2) OR (home_team = ?2 AND away_team = ?1))
               AND status IN {}
               AND home_goals IS NOT NULL AND away_goals IS NOT NULL
             ORDER BY kickoff DESC, id DESC",
            FIXTURE_COLUMNS, FINISHED_STATUSES
        );
        query_fixtures(&conn, &sql, params![team_a, team_b])
    }

    fn statistics(&self, fixture_id: FixtureId) -> StoreResult<Vec<MatchStatistics>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM match_statistics WHERE fixture_id = ?1 ORDER BY team_id",
            STATISTICS_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![fixture_id as i64], read_statistics)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter()
            .map(|(raw_id, mut stats)| {
                stats.fixture_id = to_fixture_id(raw_id)?;
                Ok(stats)
            })
            .collect()
    }

    fn upsert_fixtures(&self, fixtures: &[Fixture]) -> StoreResult<()> {
        if fixtures.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for fixture in fixtures {
            upsert_fixture(&tx, fixture)?;
        }
        tx.commit()?;
        debug!("Upserted {} fixtures", fixtures.len());
        Ok(())
    }

    fn upsert_statistics(&self, stats: &MatchStatistics) -> StoreResult<()> {
        let conn = self.conn.lock();
        let known: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM fixtures WHERE id = ?1)",
            params![stats.fixture_id as i64],
            |row| row.get(0),
        )?;
        if !known {
            return Err(StoreError::FixtureNotFound(stats.fixture_id));
        }
        upsert_statistics_row(&conn, stats)?;
        Ok(())
    }

    fn persist_match(&self, fixture: &Fixture, stats: &[MatchStatistics]) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        upsert_fixture(&tx, fixture)?;
        for row in stats {
            upsert_statistics_row(&tx, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_fixture(&self, id: FixtureId) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM match_statistics WHERE fixture_id = ?1",
            params![id as i64],
        )?;
        tx.execute("DELETE FROM fixtures WHERE id = ?1", params![id as i64])?;
        tx.commit()?;
        Ok(())
    }

    fn record_result(
        &self,
        id: FixtureId,
        status: FixtureStatus,
        score: Option<Score>,
    ) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE fixtures SET status = ?1, home_goals = ?2, away_goals = ?3 WHERE id = ?4",
            params![
                status.short(),
                score.map(|s| s.home),
                score.map(|s| s.away),
                id as i64
            ],
        )?;
        Ok(changed > 0)
    }
}

impl OddsStore for SqliteStore {
    fn odds_for_fixture(&self, fixture_id: FixtureId) -> StoreResult<Vec<OddsQuote>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT bookmaker_id, home, draw, away, updated_at FROM odds
             WHERE fixture_id = ?1 ORDER BY bookmaker_id",
        )?;
        let rows = stmt
            .query_map(params![fixture_id as i64], |row| {
                Ok((
                    row.get::<_, u32>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(bookmaker_id, home, draw, away, updated_at)| {
                Ok(OddsQuote {
                    fixture_id,
                    bookmaker_id,
                    home,
                    draw,
                    away,
                    updated_at: timestamp(updated_at)?,
                })
            })
            .collect()
    }

    fn upsert_odds(&self, quotes: &[OddsQuote]) -> StoreResult<()> {
        if quotes.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for q in quotes {
            tx.execute(
                "INSERT INTO odds (fixture_id, bookmaker_id, home, draw, away, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(fixture_id, bookmaker_id) DO UPDATE SET
                    home = excluded.home,
                    draw = excluded.draw,
                    away = excluded.away,
                    updated_at = excluded.updated_at",
                params![
                    q.fixture_id as i64,
                    q.bookmaker_id,
                    q.home,
                    q.draw,
                    q.away,
                    q.updated_at.timestamp()
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl PredictionStore for SqliteStore {
    fn create_group(&self, name: &str, fixture_ids: &[FixtureId]) -> StoreResult<SimulationGroup> {
        let created_at = Utc::now();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO simulation_groups (name, created_at) VALUES (?1, ?2)",
            params![name, created_at.timestamp()],
        )?;
        let id = tx.last_insert_rowid();
        for (position, fid) in fixture_ids.iter().enumerate() {
            tx.execute(
                "INSERT OR IGNORE INTO group_fixtures (group_id, fixture_id, position)
                 VALUES (?1, ?2, ?3)",
                params![id, *fid as i64, position as i64],
            )?;
        }
        tx.commit()?;

        Ok(SimulationGroup {
            id,
            name: name.to_string(),
            created_at: timestamp(created_at.timestamp())?,
            fixture_ids: fixture_ids.to_vec(),
        })
    }

    fn group(&self, id: GroupId) -> StoreResult<Option<SimulationGroup>> {
        let conn = self.conn.lock();
        Self::load_group(&conn, id)
    }

    fn groups(&self) -> StoreResult<Vec<SimulationGroup>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT id FROM simulation_groups ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, GroupId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        drop(stmt);

        let mut groups = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(group) = Self::load_group(&conn, id)? {
                groups.push(group);
            }
        }
        Ok(groups)
    }

    fn insert_prediction(&self, p: &NewPrediction) -> StoreResult<Prediction> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO predictions (fixture_id, model_id, group_id, outcome, probability)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(fixture_id, model_id, group_id) DO NOTHING",
            params![
                p.fixture_id as i64,
                p.model_id,
                p.group_id,
                p.outcome.code(),
                p.probability
            ],
        )?;

        let sql = format!(
            "SELECT {} FROM predictions WHERE fixture_id = ?1 AND model_id = ?2 AND group_id = ?3",
            PREDICTION_COLUMNS
        );
        let row = conn.query_row(
            &sql,
            params![p.fixture_id as i64, p.model_id, p.group_id],
            PredictionRow::read,
        )?;
        row.into_prediction()
    }

    fn unresolved_predictions(&self, fixture_id: FixtureId) -> StoreResult<Vec<Prediction>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM predictions WHERE fixture_id = ?1 AND correct IS NULL ORDER BY id",
            PREDICTION_COLUMNS
        );
        query_predictions(&conn, &sql, params![fixture_id as i64])
    }

    fn mark_prediction(&self, prediction_id: i64, correct: bool) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE predictions SET correct = ?1 WHERE id = ?2 AND correct IS NULL",
            params![correct, prediction_id],
        )?;
        Ok(changed == 1)
    }

    fn group_predictions(&self, group_id: GroupId) -> StoreResult<Vec<Prediction>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT {} FROM predictions WHERE group_id = ?1 ORDER BY id",
            PREDICTION_COLUMNS
        );
        query_predictions(&conn, &sql, params![group_id])
    }

    fn save_strategy_profit(&self, p: &StrategyProfit) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO strategy_profits
                (group_id, strategy, model_id, profit, bets_placed, bets_won,
                 total_staked, final_bankroll)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(group_id, strategy, model_id) DO UPDATE SET
                profit = excluded.profit,
                bets_placed = excluded.bets_placed,
                bets_won = excluded.bets_won,
                total_staked = excluded.total_staked,
                final_bankroll = excluded.final_bankroll",
            params![
                p.group_id,
                p.strategy,
                p.model_id,
                p.profit,
                p.bets_placed as i64,
                p.bets_won as i64,
                p.total_staked,
                p.final_bankroll
            ],
        )?;
        Ok(())
    }

    fn strategy_profits(&self, group_id: GroupId) -> StoreResult<Vec<StrategyProfit>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT strategy, model_id, profit, bets_placed, bets_won, total_staked, final_bankroll
             FROM strategy_profits WHERE group_id = ?1 ORDER BY strategy, model_id",
        )?;
        let rows = stmt
            .query_map(params![group_id], |row| {
                Ok(StrategyProfit {
                    group_id,
                    strategy: row.get(0)?,
                    model_id: row.get(1)?,
                    profit: row.get(2)?,
                    bets_placed: row.get::<_, i64>(3)?.max(0) as usize,
                    bets_won: row.get::<_, i64>(4)?.max(0) as usize,
                    total_staked: row.get(5)?,
                    final_bankroll: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
