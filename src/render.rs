use std::collections::HashSet;

use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::classify::{self, ClassifyContext, DisplayStatus, StatusLabel, Winner};
use crate::error::FeedError;
use crate::fixture::{Fixture, StatusCode, Team};
use crate::group::group_by_league;
use crate::i18n::{self, Labels};
use crate::lineup::{self, LineupView};
use crate::news::NewsCard;
use crate::ticker::TimerRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderInstruction {
    Message {
        i18n_key: Option<String>,
        text: String,
    },
    LeagueHeader {
        name: String,
        logo_url: String,
    },
    FixtureCard(FixtureCard),
    NewsCard(NewsCard),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamCell {
    pub name: String,
    pub logo_url: String,
    pub winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupSection {
    pub target_id: String,
    pub toggle_label: String,
    pub view: LineupView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureCard {
    pub fixture_id: u64,
    pub date_label: String,
    pub home: TeamCell,
    pub away: TeamCell,
    pub score_or_time: String,
    pub status: DisplayStatus,
    pub status_class: &'static str,
    pub status_label: StatusLabel,
    pub followed: bool,
    pub detail_href: String,
    pub clickable_teams: bool,
    pub lineup: Option<LineupSection>,
}

/// What to show when there is nothing live to render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// Fixed demo fixtures, so the container is never blank.
    #[default]
    Placeholder,
    /// A localized "no matches" / "loading error" line.
    Message,
}

impl FallbackPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "placeholder" | "demo" => Some(Self::Placeholder),
            "message" | "text" => Some(Self::Message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedOptions {
    pub show_lineups: bool,
    pub no_matches_key: String,
    pub fallback: FallbackPolicy,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            show_lineups: false,
            no_matches_key: "no_matches".to_string(),
            fallback: FallbackPolicy::Placeholder,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub labels: &'a Labels,
    pub viewer_offset: FixedOffset,
    pub now: DateTime<Utc>,
    pub followed: &'a HashSet<u64>,
    pub options: &'a FeedOptions,
}

impl RenderContext<'_> {
    fn classify_ctx(&self) -> ClassifyContext<'_> {
        ClassifyContext {
            labels: self.labels,
            viewer_offset: self.viewer_offset,
            now: self.now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Rendered { leagues: usize, fixtures: usize },
    UpstreamError(String),
    Fallback(FeedError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedRender {
    pub instructions: Vec<RenderInstruction>,
    pub timers: TimerRegistry,
    pub outcome: FeedOutcome,
}

pub fn loading_message(labels: &Labels) -> RenderInstruction {
    message(labels, "loading_matches")
}

fn message(labels: &Labels, key: &str) -> RenderInstruction {
    RenderInstruction::Message {
        i18n_key: Some(key.to_string()),
        text: labels.get(key).to_string(),
    }
}

/// Renders one fetch result for one container.
pub fn build_feed(result: Result<Vec<Fixture>, FeedError>, ctx: &RenderContext<'_>) -> FeedRender {
    match result {
        Ok(fixtures) if !fixtures.is_empty() => {
            let (instructions, timers, leagues) = render_fixtures(&fixtures, ctx);
            FeedRender {
                instructions,
                timers,
                outcome: FeedOutcome::Rendered {
                    leagues,
                    fixtures: fixtures.len(),
                },
            }
        }
        Ok(_) => fallback(FeedError::Empty, ctx),
        Err(FeedError::Upstream(msg)) => {
            warn!(error = %msg, "fixtures api returned errors");
            FeedRender {
                instructions: vec![RenderInstruction::Message {
                    i18n_key: None,
                    text: format!("{}{msg}", ctx.labels.get("api_error_message")),
                }],
                timers: TimerRegistry::new(),
                outcome: FeedOutcome::UpstreamError(msg),
            }
        }
        Err(err) => fallback(err, ctx),
    }
}

fn fallback(err: FeedError, ctx: &RenderContext<'_>) -> FeedRender {
    warn!(error = %err, policy = ?ctx.options.fallback, "fixtures unavailable");
    match ctx.options.fallback {
        FallbackPolicy::Placeholder => {
            let fixtures = placeholder_fixtures(ctx.now);
            let (instructions, timers, _) = render_fixtures(&fixtures, ctx);
            FeedRender {
                instructions,
                timers,
                outcome: FeedOutcome::Fallback(err),
            }
        }
        FallbackPolicy::Message => {
            let key = match err {
                FeedError::Empty => ctx.options.no_matches_key.as_str(),
                _ => "matches_loading_error",
            };
            FeedRender {
                instructions: vec![message(ctx.labels, key)],
                timers: TimerRegistry::new(),
                outcome: FeedOutcome::Fallback(err),
            }
        }
    }
}

fn render_fixtures(
    fixtures: &[Fixture],
    ctx: &RenderContext<'_>,
) -> (Vec<RenderInstruction>, TimerRegistry, usize) {
    let groups = group_by_league(fixtures);
    let mut instructions = Vec::with_capacity(groups.len() + fixtures.len());
    let mut timers = TimerRegistry::new();

    for group in &groups {
        instructions.push(RenderInstruction::LeagueHeader {
            name: group.league_name.to_string(),
            logo_url: group.league_logo_url.to_string(),
        });
        for fixture in &group.fixtures {
            let (card, timer) = fixture_card(fixture, ctx);
            if let Some(timer) = timer {
                timers.push(timer);
            }
            instructions.push(RenderInstruction::FixtureCard(card));
        }
    }

    debug!(
        leagues = groups.len(),
        fixtures = fixtures.len(),
        timers = timers.len(),
        "feed rendered"
    );
    (instructions, timers, groups.len())
}

fn fixture_card(
    fixture: &Fixture,
    ctx: &RenderContext<'_>,
) -> (FixtureCard, Option<crate::ticker::LiveTimer>) {
    let c = classify::classify(fixture, &ctx.classify_ctx());
    let lang = ctx.labels.lang();
    let date_label = fixture
        .kickoff
        .as_ref()
        .map(|ko| i18n::format_match_date(ko, ctx.viewer_offset, lang))
        .unwrap_or_default();

    let lineup = if ctx.options.show_lineups {
        lineup::build_lineup_view(&fixture.lineups, ctx.labels).map(|view| LineupSection {
            target_id: format!("lineup-{}", fixture.id),
            toggle_label: ctx.labels.get("show_lineup").to_string(),
            view,
        })
    } else {
        None
    };

    let card = FixtureCard {
        fixture_id: fixture.id,
        date_label,
        home: team_cell(&fixture.home, c.winner == Winner::Home),
        away: team_cell(&fixture.away, c.winner == Winner::Away),
        score_or_time: c.score_or_time,
        status: c.status,
        status_class: c.status.css_class(),
        status_label: c.label,
        followed: ctx.followed.contains(&fixture.id),
        detail_href: format!("match-details.html?id={}", fixture.id),
        clickable_teams: ctx.options.show_lineups,
        lineup,
    };
    (card, c.timer)
}

fn team_cell(team: &Team, winner: bool) -> TeamCell {
    TeamCell {
        name: team.name.clone(),
        logo_url: team.logo_url.clone(),
        winner,
    }
}

pub const PLACEHOLDER_LEAGUE: &str = "Demo League";

/// Fixed demo set shown when the feed is empty or unreachable. No fixture in
/// it ticks, so a fallback never starts clocks.
pub fn placeholder_fixtures(now: DateTime<Utc>) -> Vec<Fixture> {
    let at = |delta_minutes: i64| Some((now + ChronoDuration::minutes(delta_minutes)).fixed_offset());
    vec![
        placeholder_fixture(
            900_001,
            at(-110),
            StatusCode::FullTime,
            "Match Finished",
            Some(90),
            ("ALPHA", "OMEGA"),
            (Some(2), Some(1)),
        ),
        placeholder_fixture(
            900_002,
            at(-50),
            StatusCode::HalfTime,
            "Halftime",
            Some(45),
            ("NORTH", "SOUTH"),
            (Some(0), Some(0)),
        ),
        placeholder_fixture(
            900_003,
            at(180),
            StatusCode::NotStarted,
            "Not Started",
            None,
            ("EAST", "WEST"),
            (None, None),
        ),
    ]
}

fn placeholder_fixture(
    id: u64,
    kickoff: Option<DateTime<FixedOffset>>,
    status: StatusCode,
    status_long: &str,
    elapsed: Option<u32>,
    teams: (&str, &str),
    goals: (Option<u32>, Option<u32>),
) -> Fixture {
    Fixture {
        id,
        league_name: PLACEHOLDER_LEAGUE.to_string(),
        league_logo_url: String::new(),
        kickoff,
        status,
        status_long: status_long.to_string(),
        elapsed_minutes: elapsed,
        home: placeholder_team(teams.0),
        away: placeholder_team(teams.1),
        home_goals: goals.0,
        away_goals: goals.1,
        lineups: Vec::new(),
    }
}

fn placeholder_team(name: &str) -> Team {
    Team {
        id: None,
        name: name.to_string(),
        logo_url: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Lang;

    #[test]
    fn placeholder_set_is_stable_and_never_ticks() {
        let now = Utc::now();
        let fixtures = placeholder_fixtures(now);
        assert_eq!(fixtures.len(), 3);
        let labels = Labels::builtin(Lang::En);
        let followed = HashSet::new();
        let options = FeedOptions::default();
        let ctx = RenderContext {
            labels: &labels,
            viewer_offset: FixedOffset::east_opt(0).unwrap(),
            now,
            followed: &followed,
            options: &options,
        };
        let render = build_feed(Err(FeedError::Empty), &ctx);
        assert!(render.timers.is_empty());
        assert_eq!(render.outcome, FeedOutcome::Fallback(FeedError::Empty));
        assert_eq!(render.instructions.len(), 4);
    }

    #[test]
    fn fallback_policy_parses() {
        assert_eq!(FallbackPolicy::parse("Message"), Some(FallbackPolicy::Message));
        assert_eq!(FallbackPolicy::parse("placeholder"), Some(FallbackPolicy::Placeholder));
        assert_eq!(FallbackPolicy::parse("nope"), None);
    }
}
