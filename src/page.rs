use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::classify::StatusLabel;
use crate::i18n::Labels;
use crate::lineup::{LineupView, PlayerMarker, SubstitutesList};
use crate::render::{FixtureCard, RenderInstruction};
use crate::ticker::TimerSink;

pub trait RenderSink {
    fn replace_contents(&mut self, container_id: &str, instructions: Vec<RenderInstruction>);
    fn append(&mut self, container_id: &str, instruction: RenderInstruction);
    /// Rewrites an element's text. `false` when no such element is rendered.
    fn set_text(&mut self, element_id: &str, text: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
struct Container {
    id: String,
    items: Vec<RenderInstruction>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    containers: Vec<Container>,
    expanded: HashSet<String>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self, container_id: &str) -> &[RenderInstruction] {
        self.containers
            .iter()
            .find(|c| c.id == container_id)
            .map(|c| c.items.as_slice())
            .unwrap_or(&[])
    }

    pub fn fixture_cards(&self, container_id: &str) -> impl Iterator<Item = &FixtureCard> {
        self.contents(container_id).iter().filter_map(|item| match item {
            RenderInstruction::FixtureCard(card) => Some(card),
            _ => None,
        })
    }

    pub fn find_card(&self, fixture_id: u64) -> Option<&FixtureCard> {
        self.containers
            .iter()
            .flat_map(|c| c.items.iter())
            .find_map(|item| match item {
                RenderInstruction::FixtureCard(card) if card.fixture_id == fixture_id => Some(card),
                _ => None,
            })
    }

    pub fn remove_container(&mut self, container_id: &str) -> bool {
        let before = self.containers.len();
        self.containers.retain(|c| c.id != container_id);
        self.containers.len() != before
    }

    pub fn is_expanded(&self, target_id: &str) -> bool {
        self.expanded.contains(target_id)
    }

    /// Flips a lineup section open or closed; `None` when no card has it.
    pub fn toggle_lineup(&mut self, target_id: &str, labels: &Labels) -> Option<bool> {
        let open = !self.expanded.contains(target_id);
        let label = labels.get(if open { "hide_lineup" } else { "show_lineup" });
        let mut found = false;
        for card in self.cards_mut() {
            if let Some(section) = card.lineup.as_mut()
                && section.target_id == target_id
            {
                section.toggle_label = label.to_string();
                found = true;
            }
        }
        if !found {
            return None;
        }
        if open {
            self.expanded.insert(target_id.to_string());
        } else {
            self.expanded.remove(target_id);
        }
        Some(open)
    }

    pub fn set_followed(&mut self, fixture_id: u64, followed: bool) -> bool {
        let mut hit = false;
        for card in self.cards_mut().filter(|c| c.fixture_id == fixture_id) {
            card.followed = followed;
            hit = true;
        }
        hit
    }

    pub fn set_saved(&mut self, link: &str, saved: bool, labels: &Labels) -> bool {
        let mut hit = false;
        for container in &mut self.containers {
            for item in &mut container.items {
                if let RenderInstruction::NewsCard(card) = item
                    && card.link == link
                {
                    card.saved = saved;
                    card.save_label = labels
                        .get(if saved { "unsave_article" } else { "save_article" })
                        .to_string();
                    hit = true;
                }
            }
        }
        hit
    }

    /// Plain text of one container, the way the terminal front ends print it.
    pub fn text_lines(&self, container_id: &str) -> Vec<String> {
        self.contents(container_id)
            .iter()
            .flat_map(|item| instruction_lines(item, &self.expanded))
            .collect()
    }

    fn cards_mut(&mut self) -> impl Iterator<Item = &mut FixtureCard> {
        self.containers
            .iter_mut()
            .flat_map(|c| c.items.iter_mut())
            .filter_map(|item| match item {
                RenderInstruction::FixtureCard(card) => Some(card),
                _ => None,
            })
    }

    fn container_mut(&mut self, container_id: &str) -> &mut Container {
        let idx = match self.containers.iter().position(|c| c.id == container_id) {
            Some(idx) => idx,
            None => {
                self.containers.push(Container {
                    id: container_id.to_string(),
                    items: Vec::new(),
                });
                self.containers.len() - 1
            }
        };
        &mut self.containers[idx]
    }
}

impl RenderSink for Page {
    fn replace_contents(&mut self, container_id: &str, instructions: Vec<RenderInstruction>) {
        self.container_mut(container_id).items = instructions;
    }

    fn append(&mut self, container_id: &str, instruction: RenderInstruction) {
        self.container_mut(container_id).items.push(instruction);
    }

    fn set_text(&mut self, element_id: &str, text: &str) -> bool {
        let mut hit = false;
        for card in self.cards_mut() {
            if let StatusLabel::Clock { target, text: shown } = &mut card.status_label
                && target == element_id
            {
                *shown = text.to_string();
                hit = true;
            }
        }
        hit
    }
}

impl TimerSink for Page {
    fn set_timer_text(&mut self, target_id: &str, text: &str) -> bool {
        self.set_text(target_id, text)
    }
}

/// A page the tick thread and the printer can both reach.
#[derive(Debug, Clone, Default)]
pub struct SharedPage(pub Arc<Mutex<Page>>);

impl SharedPage {
    pub fn new(page: Page) -> Self {
        Self(Arc::new(Mutex::new(page)))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Page) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl TimerSink for SharedPage {
    fn set_timer_text(&mut self, target_id: &str, text: &str) -> bool {
        self.with(|page| page.set_text(target_id, text))
    }
}

pub fn instruction_lines(item: &RenderInstruction, expanded: &HashSet<String>) -> Vec<String> {
    match item {
        RenderInstruction::Message { text, .. } => vec![text.clone()],
        RenderInstruction::LeagueHeader { name, .. } => vec![format!("== {name} ==")],
        RenderInstruction::FixtureCard(card) => {
            let mut lines = vec![fixture_line(card)];
            if let Some(section) = &card.lineup {
                if expanded.contains(&section.target_id) {
                    lines.extend(lineup_lines(&section.view));
                } else {
                    lines.push(format!("    [{}]", section.toggle_label));
                }
            }
            lines
        }
        RenderInstruction::NewsCard(card) => {
            let mut lines = vec![format!("{} {}", if card.saved { "*" } else { "-" }, card.title)];
            if !card.description.is_empty() {
                lines.push(format!("    {}", card.description));
            }
            let meta: Vec<&str> = [card.source.as_str(), card.date_label.as_str()]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect();
            if !meta.is_empty() {
                lines.push(format!("    {}", meta.join(" · ")));
            }
            lines.push(format!("    {}", card.link));
            lines
        }
    }
}

pub fn fixture_line(card: &FixtureCard) -> String {
    let mark = |name: &str, winner: bool| {
        if winner {
            format!("{name}*")
        } else {
            name.to_string()
        }
    };
    format!(
        "{} {:>24} {:^9} {:<24} {}",
        if card.followed { "♥" } else { " " },
        mark(&card.home.name, card.home.winner),
        card.score_or_time,
        mark(&card.away.name, card.away.winner),
        card.status_label.text()
    )
}

fn lineup_lines(view: &LineupView) -> Vec<String> {
    let mut lines = vec![format!("    {}", view.title)];
    lines.extend(marker_rows(&view.home_markers));
    lines.push("    ----".to_string());
    lines.extend(marker_rows(&view.away_markers));
    lines.extend(subs_lines(&view.home_subs));
    lines.extend(subs_lines(&view.away_subs));
    lines
}

// One line per vertical band, players left to right.
fn marker_rows(markers: &[PlayerMarker]) -> Vec<String> {
    let mut rows: Vec<(f32, Vec<&PlayerMarker>)> = Vec::new();
    for m in markers {
        match rows.iter_mut().find(|(top, _)| (*top - m.top_pct).abs() < f32::EPSILON) {
            Some((_, row)) => row.push(m),
            None => rows.push((m.top_pct, vec![m])),
        }
    }
    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    rows.into_iter()
        .map(|(_, mut row)| {
            row.sort_by(|a, b| a.left_pct.total_cmp(&b.left_pct));
            let names: Vec<String> = row.iter().map(|m| format!("{} {}", m.number, m.name)).collect();
            format!("      {}", names.join("  "))
        })
        .collect()
}

fn subs_lines(subs: &SubstitutesList) -> Vec<String> {
    let mut lines = vec![format!("    {}", subs.heading)];
    lines.extend(subs.players.iter().map(|p| format!("      {} {}", p.number, p.name)));
    lines
}
