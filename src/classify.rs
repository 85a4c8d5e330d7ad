use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;

use crate::fixture::{Fixture, StatusCode};
use crate::i18n::{self, Labels};
use crate::ticker::{LiveTimer, format_clock, timer_target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayStatus {
    Upcoming,
    Live,
    Finished,
    Unknown,
}

impl DisplayStatus {
    /// Styling class; unknown states are drawn like finished ones.
    pub fn css_class(self) -> &'static str {
        match self {
            Self::Upcoming => "upcoming",
            Self::Live => "live",
            Self::Finished | Self::Unknown => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    #[default]
    None,
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusLabel {
    Text { text: String },
    /// Ticking clock; `target` is the element the ticker rewrites.
    Clock { target: String, text: String },
}

impl StatusLabel {
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text } | Self::Clock { text, .. } => text,
        }
    }

    pub fn clock_target(&self) -> Option<&str> {
        match self {
            Self::Clock { target, .. } => Some(target),
            Self::Text { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: DisplayStatus,
    pub score_or_time: String,
    pub label: StatusLabel,
    pub winner: Winner,
    pub timer: Option<LiveTimer>,
}

/// Inputs the classifier would otherwise read from ambient state.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyContext<'a> {
    pub labels: &'a Labels,
    pub viewer_offset: FixedOffset,
    pub now: DateTime<Utc>,
}

pub fn classify(fixture: &Fixture, ctx: &ClassifyContext<'_>) -> Classification {
    let elapsed = fixture.elapsed_minutes.filter(|m| *m > 0);

    if let (true, Some(elapsed)) = (fixture.status.is_in_play(), elapsed) {
        let score = format!(
            "{} - {}",
            fixture.home_goals.unwrap_or(0),
            fixture.away_goals.unwrap_or(0)
        );
        if fixture.status == StatusCode::HalfTime {
            return Classification {
                status: DisplayStatus::Live,
                score_or_time: score,
                label: StatusLabel::Text {
                    text: ctx.labels.get("status_halftime").to_string(),
                },
                winner: Winner::None,
                timer: None,
            };
        }
        return Classification {
            status: DisplayStatus::Live,
            score_or_time: score,
            label: StatusLabel::Clock {
                target: timer_target(fixture.id),
                text: format_clock(u64::from(elapsed) * 60),
            },
            winner: Winner::None,
            timer: Some(LiveTimer {
                fixture_id: fixture.id,
                initial_elapsed_minutes: elapsed,
                captured_at: ctx.now,
                status: fixture.status.clone(),
            }),
        };
    }

    if fixture.status.is_final() {
        let score = match (fixture.home_goals, fixture.away_goals) {
            (Some(home), Some(away)) => format!("{home} - {away}"),
            _ => "-".to_string(),
        };
        return Classification {
            status: DisplayStatus::Finished,
            score_or_time: score,
            label: StatusLabel::Text {
                text: ctx.labels.get("status_finished").to_string(),
            },
            winner: winner(fixture.home_goals, fixture.away_goals),
            timer: None,
        };
    }

    if fixture.status == StatusCode::NotStarted {
        let time = fixture
            .kickoff
            .as_ref()
            .map(|ko| i18n::format_kickoff_time(ko, ctx.viewer_offset, ctx.labels.lang()))
            .unwrap_or_else(|| "--:--".to_string());
        return Classification {
            status: DisplayStatus::Upcoming,
            score_or_time: time,
            label: StatusLabel::Text {
                text: ctx.labels.get("status_not_started").to_string(),
            },
            winner: Winner::None,
            timer: None,
        };
    }

    Classification {
        status: DisplayStatus::Unknown,
        score_or_time: "-".to_string(),
        label: StatusLabel::Text {
            text: fixture.status_long.clone(),
        },
        winner: Winner::None,
        timer: None,
    }
}

pub fn winner(home: Option<u32>, away: Option<u32>) -> Winner {
    match (home, away) {
        (Some(h), Some(a)) if h > a => Winner::Home,
        (Some(h), Some(a)) if a > h => Winner::Away,
        _ => Winner::None,
    }
}
