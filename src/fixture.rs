use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FeedError;

/// Short status codes reported by the fixtures API.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StatusCode {
    NotStarted,
    FirstHalf,
    HalfTime,
    SecondHalf,
    ExtraTime,
    Penalties,
    Live,
    FullTime,
    AfterExtraTime,
    AfterPenalties,
    Other(String),
}

impl StatusCode {
    pub fn parse(short: &str) -> Self {
        match short.trim() {
            "NS" => Self::NotStarted,
            "1H" => Self::FirstHalf,
            "HT" => Self::HalfTime,
            "2H" => Self::SecondHalf,
            "ET" => Self::ExtraTime,
            "P" => Self::Penalties,
            "LIVE" => Self::Live,
            "FT" => Self::FullTime,
            "AET" => Self::AfterExtraTime,
            "PEN" => Self::AfterPenalties,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::NotStarted => "NS",
            Self::FirstHalf => "1H",
            Self::HalfTime => "HT",
            Self::SecondHalf => "2H",
            Self::ExtraTime => "ET",
            Self::Penalties => "P",
            Self::Live => "LIVE",
            Self::FullTime => "FT",
            Self::AfterExtraTime => "AET",
            Self::AfterPenalties => "PEN",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_in_play(&self) -> bool {
        matches!(
            self,
            Self::FirstHalf
                | Self::HalfTime
                | Self::SecondHalf
                | Self::ExtraTime
                | Self::Penalties
                | Self::Live
        )
    }

    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::FullTime | Self::AfterExtraTime | Self::AfterPenalties
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<u64>,
    pub name: String,
    pub logo_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineupPlayer {
    pub id: Option<u64>,
    pub name: String,
    pub number: Option<u32>,
    pub pos: Option<String>,
    // "row:col" on the provider's formation grid.
    pub grid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lineup {
    pub team: Team,
    pub formation: Option<String>,
    pub start_xi: Vec<LineupPlayer>,
    pub substitutes: Vec<LineupPlayer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    pub id: u64,
    pub league_name: String,
    pub league_logo_url: String,
    pub kickoff: Option<DateTime<FixedOffset>>,
    pub status: StatusCode,
    pub status_long: String,
    pub elapsed_minutes: Option<u32>,
    pub home: Team,
    pub away: Team,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub lineups: Vec<Lineup>,
}

/// Parsed `/fixtures` envelope. Both halves may be populated at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureEnvelope {
    pub fixtures: Vec<Fixture>,
    pub errors: Vec<(String, String)>,
}

impl FixtureEnvelope {
    pub fn error_message(&self) -> String {
        self.errors
            .iter()
            .map(|(_, msg)| msg.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Fixtures win over errors; errors win over an empty list.
    pub fn into_feed(self) -> std::result::Result<Vec<Fixture>, FeedError> {
        if !self.fixtures.is_empty() {
            return Ok(self.fixtures);
        }
        if !self.errors.is_empty() {
            return Err(FeedError::Upstream(self.error_message()));
        }
        Err(FeedError::Empty)
    }
}

pub fn parse_fixtures_json(raw: &str) -> Result<FixtureEnvelope> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(FixtureEnvelope::default());
    }
    let envelope: WireEnvelope = serde_json::from_str(trimmed).context("invalid fixtures json")?;
    Ok(FixtureEnvelope {
        fixtures: envelope
            .response
            .unwrap_or_default()
            .into_iter()
            .map(WireFixture::into_fixture)
            .collect(),
        errors: flatten_errors(&envelope.errors),
    })
}

// The API sends `"errors": []` when clean and an object keyed by field otherwise.
fn flatten_errors(value: &Value) -> Vec<(String, String)> {
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, val)| (key.clone(), value_to_message(val)))
            .filter(|(_, msg)| !msg.is_empty())
            .collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(idx, val)| (idx.to_string(), value_to_message(val)))
            .filter(|(_, msg)| !msg.is_empty())
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![(String::new(), s.trim().to_string())],
        _ => Vec::new(),
    }
}

fn value_to_message(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    response: Option<Vec<WireFixture>>,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Deserialize)]
struct WireFixture {
    fixture: WireFixtureInfo,
    league: WireLeague,
    teams: WireTeams,
    goals: Option<WireGoals>,
    #[serde(default)]
    lineups: Option<Vec<WireLineup>>,
}

#[derive(Debug, Deserialize)]
struct WireFixtureInfo {
    id: u64,
    date: Option<String>,
    status: WireStatus,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    long: Option<String>,
    short: Option<String>,
    elapsed: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireLeague {
    name: Option<String>,
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTeams {
    home: WireTeam,
    away: WireTeam,
}

#[derive(Debug, Deserialize)]
struct WireTeam {
    id: Option<u64>,
    name: Option<String>,
    logo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireGoals {
    home: Option<u32>,
    away: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireLineup {
    team: WireTeam,
    formation: Option<String>,
    #[serde(default, rename = "startXI")]
    start_xi: Option<Vec<WireLineupEntry>>,
    #[serde(default)]
    substitutes: Option<Vec<WireLineupEntry>>,
}

#[derive(Debug, Deserialize)]
struct WireLineupEntry {
    player: WireLineupPlayer,
}

#[derive(Debug, Deserialize)]
struct WireLineupPlayer {
    id: Option<u64>,
    name: Option<String>,
    number: Option<u32>,
    pos: Option<String>,
    grid: Option<String>,
}

impl WireFixture {
    fn into_fixture(self) -> Fixture {
        let kickoff = self
            .fixture
            .date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok());
        let status = StatusCode::parse(self.fixture.status.short.as_deref().unwrap_or_default());
        let (home_goals, away_goals) = self
            .goals
            .map(|g| (g.home, g.away))
            .unwrap_or((None, None));

        Fixture {
            id: self.fixture.id,
            league_name: self.league.name.unwrap_or_default(),
            league_logo_url: self.league.logo.unwrap_or_default(),
            kickoff,
            status,
            status_long: self.fixture.status.long.unwrap_or_default(),
            elapsed_minutes: self.fixture.status.elapsed,
            home: self.teams.home.into_team(),
            away: self.teams.away.into_team(),
            home_goals,
            away_goals,
            lineups: self
                .lineups
                .unwrap_or_default()
                .into_iter()
                .map(WireLineup::into_lineup)
                .collect(),
        }
    }
}

impl WireTeam {
    fn into_team(self) -> Team {
        Team {
            id: self.id,
            name: self.name.unwrap_or_default(),
            logo_url: self.logo.unwrap_or_default(),
        }
    }
}

impl WireLineup {
    fn into_lineup(self) -> Lineup {
        Lineup {
            team: self.team.into_team(),
            formation: self.formation.filter(|f| !f.trim().is_empty()),
            start_xi: into_players(self.start_xi),
            substitutes: into_players(self.substitutes),
        }
    }
}

fn into_players(entries: Option<Vec<WireLineupEntry>>) -> Vec<LineupPlayer> {
    entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| LineupPlayer {
            id: entry.player.id,
            name: entry.player.name.unwrap_or_default(),
            number: entry.player.number,
            pos: entry.player.pos,
            grid: entry.player.grid,
        })
        .collect()
}
