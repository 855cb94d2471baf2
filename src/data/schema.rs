//! SQLite schema

use rusqlite::{Connection, Result};

/// Tables and indexes. Timestamps are unix seconds.
const SCHEMA_SQL: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS fixtures (
    id INTEGER PRIMARY KEY,
    kickoff INTEGER NOT NULL,
    home_team INTEGER NOT NULL,
    away_team INTEGER NOT NULL,
    status TEXT NOT NULL,
    home_goals INTEGER,
    away_goals INTEGER
);

CREATE INDEX IF NOT EXISTS idx_fixtures_home ON fixtures(home_team, kickoff DESC);
CREATE INDEX IF NOT EXISTS idx_fixtures_away ON fixtures(away_team, kickoff DESC);

CREATE TABLE IF NOT EXISTS match_statistics (
    fixture_id INTEGER NOT NULL,
    team_id INTEGER NOT NULL,
    shots_on_goal REAL,
    shots_off_goal REAL,
    total_shots REAL,
    blocked_shots REAL,
    shots_inside_box REAL,
    shots_outside_box REAL,
    fouls REAL,
    corner_kicks REAL,
    offsides REAL,
    ball_possession REAL,
    yellow_cards REAL,
    red_cards REAL,
    goalkeeper_saves REAL,
    total_passes REAL,
    passes_accurate REAL,
    passes_percentage REAL,
    expected_goals REAL,
    PRIMARY KEY (fixture_id, team_id),
    FOREIGN KEY (fixture_id) REFERENCES fixtures(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS odds (
    fixture_id INTEGER NOT NULL,
    bookmaker_id INTEGER NOT NULL,
    home REAL NOT NULL,
    draw REAL NOT NULL,
    away REAL NOT NULL,
    updated_at INTEGER NOT NULL,
    PRIMARY KEY (fixture_id, bookmaker_id)
);

CREATE TABLE IF NOT EXISTS simulation_groups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS group_fixtures (
    group_id INTEGER NOT NULL,
    fixture_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (group_id, fixture_id),
    FOREIGN KEY (group_id) REFERENCES simulation_groups(id)
);

CREATE TABLE IF NOT EXISTS predictions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fixture_id INTEGER NOT NULL,
    model_id TEXT NOT NULL,
    group_id INTEGER NOT NULL,
    outcome TEXT NOT NULL,
    probability REAL NOT NULL,
    correct INTEGER,
    UNIQUE (fixture_id, model_id, group_id)
);

CREATE INDEX IF NOT EXISTS idx_predictions_fixture ON predictions(fixture_id);
CREATE INDEX IF NOT EXISTS idx_predictions_group ON predictions(group_id);

CREATE TABLE IF NOT EXISTS strategy_profits (
    group_id INTEGER NOT NULL,
    strategy TEXT NOT NULL,
    model_id TEXT NOT NULL,
    profit REAL NOT NULL,
    bets_placed INTEGER NOT NULL,
    bets_won INTEGER NOT NULL,
    total_staked REAL NOT NULL,
    final_bankroll REAL,
    PRIMARY KEY (group_id, strategy, model_id)
);
"#;

/// Create all tables and indexes. Safe to run on an existing database.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
