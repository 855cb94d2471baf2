//! API-Football v3 payload decoding
//!
//! Every endpoint wraps its data in the same envelope:
//! `{ "errors": [] | {..}, "results": n, "response": [..] }`.
//! Items that cannot be decoded are skipped with a debug log rather than
//! failing the whole payload.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::SourceError;
use crate::models::{
    BookmakerQuote, Fixture, FixtureId, FixtureStatus, MarketValue, MatchStatistics, Score,
    TeamId,
};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    errors: Value,
    #[serde(default)]
    response: Vec<Value>,
}

/// Decode the envelope and surface API-level errors
fn unwrap_envelope(body: &str) -> Result<Vec<Value>, SourceError> {
    let envelope: Envelope = serde_json::from_str(body)?;
    let messages: Vec<String> = match &envelope.errors {
        Value::Array(items) => items.iter().map(Value::to_string).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v.as_str().unwrap_or(&v.to_string())))
            .collect(),
        _ => Vec::new(),
    };
    if !messages.is_empty() {
        return Err(SourceError::Api(messages.join("; ")));
    }
    Ok(envelope.response)
}

/// Response items that decode as `T`; the rest are logged and dropped
fn decode_items<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, SourceError> {
    let items = unwrap_envelope(body)?;
    let mut decoded = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value(item) {
            Ok(value) => decoded.push(value),
            Err(e) => debug!("Skipping undecodable item: {}", e),
        }
    }
    Ok(decoded)
}

#[derive(Debug, Deserialize)]
struct FixtureItem {
    fixture: FixtureInfo,
    teams: Teams,
    #[serde(default)]
    goals: Goals,
}

#[derive(Debug, Deserialize)]
struct FixtureInfo {
    id: FixtureId,
    date: String,
    status: StatusInfo,
}

#[derive(Debug, Deserialize)]
struct StatusInfo {
    short: String,
}

#[derive(Debug, Deserialize)]
struct Teams {
    home: TeamRef,
    away: TeamRef,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    id: TeamId,
}

#[derive(Debug, Default, Deserialize)]
struct Goals {
    home: Option<u16>,
    away: Option<u16>,
}

impl FixtureItem {
    fn into_fixture(self) -> Result<Fixture, String> {
        let id = self.fixture.id;
        let kickoff = DateTime::parse_from_rfc3339(&self.fixture.date)
            .map_err(|e| format!("fixture {}: bad date '{}': {}", id, self.fixture.date, e))?
            .with_timezone(&Utc);
        let status = FixtureStatus::from_short(&self.fixture.status.short).ok_or_else(|| {
            format!("fixture {}: unknown status '{}'", id, self.fixture.status.short)
        })?;
        let score = Score::from_parts(self.goals.home, self.goals.away)
            .map_err(|e| format!("fixture {}: {}", id, e))?;

        Ok(Fixture {
            id,
            kickoff,
            home_team: self.teams.home.id,
            away_team: self.teams.away.id,
            status,
            score,
        })
    }
}

/// Parse a `/fixtures` or `/fixtures/headtohead` payload
pub fn parse_fixtures(body: &str) -> Result<Vec<Fixture>, SourceError> {
    let items: Vec<FixtureItem> = decode_items(body)?;
    let mut fixtures = Vec::with_capacity(items.len());
    for item in items {
        match item.into_fixture() {
            Ok(fixture) => fixtures.push(fixture),
            Err(e) => debug!("Skipping fixture: {}", e),
        }
    }
    Ok(fixtures)
}

#[derive(Debug, Deserialize)]
struct TeamStatistics {
    team: TeamRef,
    #[serde(default)]
    statistics: Vec<StatEntry>,
}

#[derive(Debug, Deserialize)]
struct StatEntry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Value,
}

/// Numeric value of a statistic. Handles `12`, `"55%"`, `"1.24"` and null.
fn stat_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

fn stat_slot<'a>(stats: &'a mut MatchStatistics, kind: &str) -> Option<&'a mut Option<f64>> {
    let key: String = kind
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '%')
        .collect::<String>()
        .to_ascii_lowercase();
    let slot = match key.as_str() {
        "shotsongoal" => &mut stats.shots_on_goal,
        "shotsoffgoal" => &mut stats.shots_off_goal,
        "totalshots" => &mut stats.total_shots,
        "blockedshots" => &mut stats.blocked_shots,
        "shotsinsidebox" => &mut stats.shots_inside_box,
        "shotsoutsidebox" => &mut stats.shots_outside_box,
        "fouls" => &mut stats.fouls,
        "cornerkicks" => &mut stats.corner_kicks,
        "offsides" => &mut stats.offsides,
        "ballpossession" => &mut stats.ball_possession,
        "yellowcards" => &mut stats.yellow_cards,
        "redcards" => &mut stats.red_cards,
        "goalkeepersaves" => &mut stats.goalkeeper_saves,
        "totalpasses" => &mut stats.total_passes,
        "passesaccurate" => &mut stats.passes_accurate,
        "passes%" => &mut stats.passes_percentage,
        "expectedgoals" => &mut stats.expected_goals,
        _ => return None,
    };
    Some(slot)
}

/// Parse a `/fixtures/statistics` payload into one row per team
pub fn parse_statistics(
    fixture_id: FixtureId,
    body: &str,
) -> Result<Vec<MatchStatistics>, SourceError> {
    let teams: Vec<TeamStatistics> = decode_items(body)?;
    Ok(teams
        .into_iter()
        .map(|team| {
            let mut stats = MatchStatistics::empty(fixture_id, team.team.id);
            for entry in &team.statistics {
                match stat_slot(&mut stats, &entry.kind) {
                    Some(slot) => *slot = stat_value(&entry.value),
                    None => debug!("Ignoring statistic '{}'", entry.kind),
                }
            }
            stats
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct OddsItem {
    #[serde(default)]
    bookmakers: Vec<BookmakerItem>,
}

#[derive(Debug, Deserialize)]
struct BookmakerItem {
    id: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    bets: Vec<BetItem>,
}

#[derive(Debug, Deserialize)]
struct BetItem {
    name: String,
    #[serde(default)]
    values: Vec<BetValue>,
}

#[derive(Debug, Deserialize)]
struct BetValue {
    value: Value,
    odd: Value,
}

/// Parse an `/odds` payload into one quote per (bookmaker, market)
pub fn parse_odds(body: &str) -> Result<Vec<BookmakerQuote>, SourceError> {
    let items: Vec<OddsItem> = decode_items(body)?;
    let mut quotes = Vec::new();
    for bookmaker in items.into_iter().flat_map(|item| item.bookmakers) {
        for bet in bookmaker.bets {
            let values = bet
                .values
                .iter()
                .filter_map(|v| {
                    let odds = stat_value(&v.odd)?;
                    let label = match &v.value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    Some(MarketValue { label, odds })
                })
                .collect();
            quotes.push(BookmakerQuote {
                bookmaker_id: bookmaker.id,
                bookmaker_name: bookmaker.name.clone(),
                market: bet.name,
                values,
            });
        }
    }
    Ok(quotes)
}
