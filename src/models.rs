use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External match id
pub type FixtureId = u64;
/// External team id
pub type TeamId = u32;
/// Bookmaker id as reported by the odds feed
pub type BookmakerId = u32;
/// Simulation group row id
pub type GroupId = i64;

/// Match status, keyed by the short codes the fixture feed uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixtureStatus {
    NotStarted,
    ToBeDefined,
    Postponed,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
    Suspended,
    Interrupted,
    Live,
    Finished,
    FinishedAfterExtraTime,
    FinishedAfterPenalties,
    Cancelled,
    Abandoned,
    Awarded,
    WalkOver,
}

impl FixtureStatus {
    /// Parse a feed short code (e.g. "NS", "FT"). Unknown codes yield None.
    pub fn from_short(code: &str) -> Option<Self> {
        let status = match code.trim().to_ascii_uppercase().as_str() {
            "NS" => Self::NotStarted,
            "TBD" => Self::ToBeDefined,
            "PST" => Self::Postponed,
            "1H" => Self::FirstHalf,
            "HT" => Self::HalfTime,
            "2H" => Self::SecondHalf,
            "ET" | "BT" => Self::ExtraTime,
            "P" => Self::Penalties,
            "SUSP" => Self::Suspended,
            "INT" => Self::Interrupted,
            "LIVE" => Self::Live,
            "FT" => Self::Finished,
            "AET" => Self::FinishedAfterExtraTime,
            "PEN" => Self::FinishedAfterPenalties,
            "CANC" => Self::Cancelled,
            "ABD" => Self::Abandoned,
            "AWD" => Self::Awarded,
            "WO" => Self::WalkOver,
            _ => return None,
        };
        Some(status)
    }

    pub fn short(&self) -> &'static str {
        match self {
            Self::NotStarted => "NS",
            Self::ToBeDefined => "TBD",
            Self::Postponed => "PST",
            Self::FirstHalf => "1H",
            Self::HalfTime => "HT",
            Self::SecondHalf => "2H",
            Self::ExtraTime => "ET",
            Self::Penalties => "P",
            Self::Suspended => "SUSP",
            Self::Interrupted => "INT",
            Self::Live => "LIVE",
            Self::Finished => "FT",
            Self::FinishedAfterExtraTime => "AET",
            Self::FinishedAfterPenalties => "PEN",
            Self::Cancelled => "CANC",
            Self::Abandoned => "ABD",
            Self::Awarded => "AWD",
            Self::WalkOver => "WO",
        }
    }

    /// Statuses that mean the match has not been played yet
    pub fn is_pre_match(&self) -> bool {
        matches!(self, Self::NotStarted | Self::ToBeDefined | Self::Postponed)
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::FirstHalf
                | Self::HalfTime
                | Self::SecondHalf
                | Self::ExtraTime
                | Self::Penalties
                | Self::Suspended
                | Self::Interrupted
                | Self::Live
        )
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::FinishedAfterExtraTime | Self::FinishedAfterPenalties
        )
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Final (or current) score. Both sides are always present together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u16,
    pub away: u16,
}

impl Score {
    pub fn new(home: u16, away: u16) -> Self {
        Self { home, away }
    }

    /// Build from two nullable columns. Returns Err when exactly one side is set.
    pub fn from_parts(home: Option<u16>, away: Option<u16>) -> Result<Option<Self>, String> {
        match (home, away) {
            (Some(h), Some(a)) => Ok(Some(Self::new(h, a))),
            (None, None) => Ok(None),
            (h, a) => Err(format!(
                "score sides must be both null or both set, got home={:?} away={:?}",
                h, a
            )),
        }
    }

    pub fn outcome(&self) -> Outcome {
        Outcome::from_score(self.home, self.away)
    }
}

/// A single scheduled or played match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: FixtureId,
    pub kickoff: DateTime<Utc>,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub status: FixtureStatus,
    pub score: Option<Score>,
}

impl Fixture {
    /// Upcoming fixture without a score
    pub fn scheduled(
        id: FixtureId,
        kickoff: DateTime<Utc>,
        home_team: TeamId,
        away_team: TeamId,
    ) -> Self {
        Self {
            id,
            kickoff,
            home_team,
            away_team,
            status: FixtureStatus::NotStarted,
            score: None,
        }
    }

    /// Completed fixture with its final score
    pub fn finished(
        id: FixtureId,
        kickoff: DateTime<Utc>,
        home_team: TeamId,
        away_team: TeamId,
        score: Score,
    ) -> Self {
        Self {
            id,
            kickoff,
            home_team,
            away_team,
            status: FixtureStatus::Finished,
            score: Some(score),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_finished() && self.score.is_some()
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team == team || self.away_team == team
    }

    /// True when this fixture is a meeting between the two teams, in either order
    pub fn is_meeting(&self, team_a: TeamId, team_b: TeamId) -> bool {
        (self.home_team == team_a && self.away_team == team_b)
            || (self.home_team == team_b && self.away_team == team_a)
    }

    /// Goals (scored, conceded) from the given team's point of view
    pub fn goals_for(&self, team: TeamId) -> Option<(u16, u16)> {
        let score = self.score?;
        if self.home_team == team {
            Some((score.home, score.away))
        } else if self.away_team == team {
            Some((score.away, score.home))
        } else {
            None
        }
    }
}

/// Per (fixture, team) match statistics. Every field is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub fixture_id: FixtureId,
    pub team_id: TeamId,
    pub shots_on_goal: Option<f64>,
    pub shots_off_goal: Option<f64>,
    pub total_shots: Option<f64>,
    pub blocked_shots: Option<f64>,
    pub shots_inside_box: Option<f64>,
    pub shots_outside_box: Option<f64>,
    pub fouls: Option<f64>,
    pub corner_kicks: Option<f64>,
    pub offsides: Option<f64>,
    pub ball_possession: Option<f64>,
    pub yellow_cards: Option<f64>,
    pub red_cards: Option<f64>,
    pub goalkeeper_saves: Option<f64>,
    pub total_passes: Option<f64>,
    pub passes_accurate: Option<f64>,
    pub passes_percentage: Option<f64>,
    pub expected_goals: Option<f64>,
}

impl MatchStatistics {
    pub fn empty(fixture_id: FixtureId, team_id: TeamId) -> Self {
        Self {
            fixture_id,
            team_id,
            ..Default::default()
        }
    }

    pub fn values(&self) -> [Option<f64>; 17] {
        [
            self.shots_on_goal,
            self.shots_off_goal,
            self.total_shots,
            self.blocked_shots,
            self.shots_inside_box,
            self.shots_outside_box,
            self.fouls,
            self.corner_kicks,
            self.offsides,
            self.ball_possession,
            self.yellow_cards,
            self.red_cards,
            self.goalkeeper_saves,
            self.total_passes,
            self.passes_accurate,
            self.passes_percentage,
            self.expected_goals,
        ]
    }

    /// At least one value is present and non-zero
    pub fn has_meaningful_values(&self) -> bool {
        self.values()
            .iter()
            .any(|v| matches!(v, Some(x) if *x != 0.0 && x.is_finite()))
    }
}

/// True when any row in the set carries a non-trivial value
pub fn statistics_usable(rows: &[MatchStatistics]) -> bool {
    rows.iter().any(MatchStatistics::has_meaningful_values)
}

/// One bookmaker's 1X2 prices for a fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsQuote {
    pub fixture_id: FixtureId,
    pub bookmaker_id: BookmakerId,
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub updated_at: DateTime<Utc>,
}

impl OddsQuote {
    pub fn price(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }
}

/// A labelled price inside a bookmaker market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketValue {
    pub label: String,
    pub odds: f64,
}

/// Raw market as returned by the odds feed, before it is narrowed to 1X2
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmakerQuote {
    pub bookmaker_id: BookmakerId,
    pub bookmaker_name: String,
    pub market: String,
    pub values: Vec<MarketValue>,
}

impl BookmakerQuote {
    /// Narrow a "match winner" market with exactly three prices into an OddsQuote.
    ///
    /// Labels "Home"/"Draw"/"Away" (or "1"/"X"/"2") are honoured; otherwise the
    /// feed order home, draw, away is assumed.
    pub fn to_match_winner(
        &self,
        fixture_id: FixtureId,
        market_name: &str,
        updated_at: DateTime<Utc>,
    ) -> Option<OddsQuote> {
        if !self.market.eq_ignore_ascii_case(market_name) || self.values.len() != 3 {
            return None;
        }

        let by_label = |wanted: Outcome| {
            self.values
                .iter()
                .find(|v| Outcome::from_label(&v.label) == Some(wanted))
                .map(|v| v.odds)
        };

        let (home, draw, away) = match (
            by_label(Outcome::Home),
            by_label(Outcome::Draw),
            by_label(Outcome::Away),
        ) {
            (Some(h), Some(d), Some(a)) => (h, d, a),
            _ => (self.values[0].odds, self.values[1].odds, self.values[2].odds),
        };

        Some(OddsQuote {
            fixture_id,
            bookmaker_id: self.bookmaker_id,
            home,
            draw,
            away,
            updated_at,
        })
    }
}

/// Best available price for one outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestOdds {
    pub bookmaker_id: BookmakerId,
    pub odds: f64,
}

/// Match result in 1X2 notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "1")]
    Home,
    #[serde(rename = "X")]
    Draw,
    #[serde(rename = "2")]
    Away,
}

impl Outcome {
    /// Fixed priority order, also used as the tie-break when picking a best outcome
    pub const ALL: [Outcome; 3] = [Outcome::Home, Outcome::Draw, Outcome::Away];

    pub fn from_score(home: u16, away: u16) -> Self {
        if home > away {
            Outcome::Home
        } else if home < away {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Outcome::Home => "1",
            Outcome::Draw => "X",
            Outcome::Away => "2",
        }
    }

    /// Accepts 1X2 codes and the feed's "Home"/"Draw"/"Away" labels
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "1" | "home" => Some(Outcome::Home),
            "x" | "draw" => Some(Outcome::Draw),
            "2" | "away" => Some(Outcome::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::from_label(s).ok_or_else(|| format!("unknown outcome '{}'", s))
    }
}

/// Predictor output: percentages for 1, X and 2
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeProbabilities {
    #[serde(rename = "1")]
    pub home: f64,
    #[serde(rename = "X")]
    pub draw: f64,
    #[serde(rename = "2")]
    pub away: f64,
}

impl OutcomeProbabilities {
    pub fn new(home: f64, draw: f64, away: f64) -> Self {
        Self { home, draw, away }
    }

    /// Build from 0-1 fractions
    pub fn from_fractions(home: f64, draw: f64, away: f64) -> Self {
        Self::new(home * 100.0, draw * 100.0, away * 100.0)
    }

    pub fn get(&self, outcome: Outcome) -> f64 {
        match outcome {
            Outcome::Home => self.home,
            Outcome::Draw => self.draw,
            Outcome::Away => self.away,
        }
    }

    pub fn total(&self) -> f64 {
        self.home + self.draw + self.away
    }

    /// Outcome with the highest probability. Ties keep the earlier outcome in
    /// `Outcome::ALL` order (1, then X, then 2). NaN never wins.
    pub fn best(&self) -> (Outcome, f64) {
        let mut best = (Outcome::Home, self.home);
        for outcome in [Outcome::Draw, Outcome::Away] {
            let p = self.get(outcome);
            if p > best.1 || best.1.is_nan() {
                best = (outcome, p);
            }
        }
        best
    }
}

/// Persisted prediction. Identity is (fixture, model, group).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: i64,
    pub fixture_id: FixtureId,
    pub model_id: String,
    pub group_id: GroupId,
    pub outcome: Outcome,
    /// Percentage, 0-100
    pub probability: f64,
    /// None until the fixture is resolved
    pub correct: Option<bool>,
}

/// Prediction before it has a row id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPrediction {
    pub fixture_id: FixtureId,
    pub model_id: String,
    pub group_id: GroupId,
    pub outcome: Outcome,
    pub probability: f64,
}

/// Named set of fixtures simulated together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationGroup {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub fixture_ids: Vec<FixtureId>,
}

/// A resolved bet fed to the stake simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub won: bool,
    /// Decimal odds. Values <= 1.0 mean no bet can be placed at this position.
    pub odds: f64,
    /// Model probability as a 0-1 fraction
    pub model_probability: f64,
}

impl Bet {
    pub fn new(won: bool, odds: f64, model_probability: f64) -> Self {
        Self {
            won,
            odds,
            model_probability,
        }
    }

    /// Placeholder for a position with no usable market
    pub fn no_market(won: bool, model_probability: f64) -> Self {
        Self::new(won, 0.0, model_probability)
    }

    pub fn has_market(&self) -> bool {
        self.odds.is_finite() && self.odds > 1.0
    }
}

/// Terminal result of replaying a group through one (strategy, model) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfit {
    pub group_id: GroupId,
    pub strategy: String,
    pub model_id: String,
    pub profit: f64,
    pub bets_placed: usize,
    pub bets_won: usize,
    pub total_staked: f64,
    pub final_bankroll: Option<f64>,
}

/// Per-model hit rate over a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAccuracy {
    pub model_id: String,
    pub predictions: usize,
    pub resolved: usize,
    pub correct: usize,
    pub accuracy: f64,
}
