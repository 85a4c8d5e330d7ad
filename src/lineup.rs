use std::collections::BTreeMap;

use serde::Serialize;

use crate::fixture::{Lineup, LineupPlayer};
use crate::i18n::Labels;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PitchSide {
    Home,
    Away,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMarker {
    pub number: String,
    pub name: String,
    pub top_pct: f32,
    pub left_pct: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstituteEntry {
    pub number: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstitutesList {
    pub heading: String,
    pub players: Vec<SubstituteEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupView {
    pub title: String,
    pub home_markers: Vec<PlayerMarker>,
    pub away_markers: Vec<PlayerMarker>,
    pub home_subs: SubstitutesList,
    pub away_subs: SubstitutesList,
}

/// Both sides present and the home starting XI is known.
pub fn lineups_available(lineups: &[Lineup]) -> bool {
    lineups.len() == 2 && !lineups[0].start_xi.is_empty()
}

pub fn build_lineup_view(lineups: &[Lineup], labels: &Labels) -> Option<LineupView> {
    if !lineups_available(lineups) {
        return None;
    }
    let home = &lineups[0];
    let away = &lineups[1];

    Some(LineupView {
        title: format!(
            "{} vs {}",
            home.formation.as_deref().unwrap_or_default(),
            away.formation.as_deref().unwrap_or_default()
        ),
        home_markers: player_markers(&home.start_xi, PitchSide::Home),
        away_markers: player_markers(&away.start_xi, PitchSide::Away),
        home_subs: substitutes_list(home, labels),
        away_subs: substitutes_list(away, labels),
    })
}

/// Places starters on one half of the pitch.
///
/// The grid row picks the vertical band (home rows count down from the top,
/// away rows up from the bottom); a player's index among the players sharing
/// that row picks the horizontal slot, spread evenly across the width.
pub fn player_markers(players: &[LineupPlayer], side: PitchSide) -> Vec<PlayerMarker> {
    let mut rows: BTreeMap<u32, Vec<&LineupPlayer>> = BTreeMap::new();
    for player in players {
        rows.entry(grid_row(player.grid.as_deref()))
            .or_default()
            .push(player);
    }

    let mut markers = Vec::with_capacity(players.len());
    for (row, in_row) in rows {
        let count = in_row.len() as f32;
        let band = row as f32 * 8.0;
        let top_pct = match side {
            PitchSide::Home => band + 5.0,
            PitchSide::Away => 95.0 - band,
        };
        for (idx, player) in in_row.into_iter().enumerate() {
            markers.push(PlayerMarker {
                number: shirt(player.number),
                name: player.name.clone(),
                top_pct,
                left_pct: (100.0 / (count + 1.0)) * (idx as f32 + 1.0),
            });
        }
    }
    markers
}

fn substitutes_list(lineup: &Lineup, labels: &Labels) -> SubstitutesList {
    SubstitutesList {
        heading: format!("{} ({})", labels.get("substitutes"), lineup.team.name),
        players: lineup
            .substitutes
            .iter()
            .map(|p| SubstituteEntry {
                number: shirt(p.number),
                name: p.name.clone(),
            })
            .collect(),
    }
}

fn shirt(number: Option<u32>) -> String {
    number
        .map(|n| n.to_string())
        .unwrap_or_else(|| "?".to_string())
}

// Rows that are missing or unreadable land on row 0.
fn grid_row(grid: Option<&str>) -> u32 {
    grid.and_then(|g| g.split(':').next())
        .and_then(|row| row.trim().parse::<u32>().ok())
        .unwrap_or(0)
}
