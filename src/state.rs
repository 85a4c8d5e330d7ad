use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::api::FeedKind;
use crate::error::FeedError;
use crate::fixture::Fixture;
use crate::i18n::{Lang, Labels};
use crate::news::{self, Article};
use crate::page::{Page, RenderSink};
use crate::render::{self, FallbackPolicy, FeedOutcome, RenderContext};
use crate::ticker::{LiveTimer, TimerRegistry};

pub const NEWS_CONTAINER: &str = "news-container";
pub const SAVED_CONTAINER: &str = "saved-articles";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Feed(FeedKind),
    News,
    Saved,
}

impl Screen {
    pub fn container_id(self) -> String {
        match self {
            Self::Feed(kind) => kind.container_id(),
            Self::News => NEWS_CONTAINER.to_string(),
            Self::Saved => SAVED_CONTAINER.to_string(),
        }
    }
}

/// One fixtures container: the last accepted result and the clocks it
/// registered. `generation` is bumped per request; only the newest answer is
/// accepted.
#[derive(Debug, Clone, Default)]
pub struct FeedSlot {
    pub generation: u64,
    pub loading: bool,
    pub result: Option<Result<Vec<Fixture>, FeedError>>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub outcome: Option<FeedOutcome>,
    pub timers: TimerRegistry,
}

#[derive(Debug, Clone, Default)]
pub struct NewsSlot {
    pub generation: u64,
    pub loading: bool,
    pub result: Option<Result<Vec<Article>, FeedError>>,
}

pub struct AppState {
    pub screen: Screen,
    pub back: Screen,
    pub labels: Labels,
    pub locales_dir: Option<PathBuf>,
    pub viewer_offset: FixedOffset,
    pub show_lineups: bool,
    pub fallback: FallbackPolicy,
    pub news_page_size: Option<usize>,
    pub page: Page,
    pub feeds: HashMap<FeedKind, FeedSlot>,
    pub news: NewsSlot,
    pub followed: HashSet<u64>,
    pub saved_links: HashSet<String>,
    pub saved_articles: Vec<Article>,
    pub selected: usize,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
    /// Bumped whenever the set of live clocks changes.
    pub timers_version: u64,
}

impl AppState {
    pub fn new(labels: Labels, viewer_offset: FixedOffset) -> Self {
        Self {
            screen: Screen::Feed(FeedKind::Live),
            back: Screen::Feed(FeedKind::Live),
            labels,
            locales_dir: None,
            viewer_offset,
            show_lineups: false,
            fallback: FallbackPolicy::Placeholder,
            news_page_size: None,
            page: Page::new(),
            feeds: HashMap::new(),
            news: NewsSlot::default(),
            followed: HashSet::new(),
            saved_links: HashSet::new(),
            saved_articles: Vec::new(),
            selected: 0,
            logs: VecDeque::new(),
            help_overlay: false,
            timers_version: 0,
        }
    }

    pub fn lang(&self) -> Lang {
        self.labels.lang()
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Starts a request for `kind`: shows the loading line, drops the clocks
    /// of the previous result and returns the generation to tag the request.
    pub fn begin_fetch(&mut self, kind: FeedKind) -> u64 {
        let slot = self.feeds.entry(kind).or_default();
        slot.generation += 1;
        slot.loading = true;
        let generation = slot.generation;
        if !slot.timers.is_empty() {
            slot.timers = TimerRegistry::new();
            self.timers_version += 1;
        }
        self.page
            .replace_contents(&kind.container_id(), vec![render::loading_message(&self.labels)]);
        generation
    }

    pub fn begin_news_fetch(&mut self) -> u64 {
        self.news.generation += 1;
        self.news.loading = true;
        let loading = self.labels.get("loading_matches").to_string();
        self.page.replace_contents(
            NEWS_CONTAINER,
            vec![render::RenderInstruction::Message {
                i18n_key: Some("loading_matches".to_string()),
                text: loading,
            }],
        );
        self.news.generation
    }

    /// Rebuilds the container for `kind` from its last accepted result.
    pub fn render_feed(&mut self, kind: FeedKind) {
        let Some(slot) = self.feeds.get(&kind) else {
            return;
        };
        let (Some(result), Some(fetched_at)) = (slot.result.clone(), slot.fetched_at) else {
            return;
        };
        let options = kind.options(self.show_lineups, self.fallback);
        let ctx = RenderContext {
            labels: &self.labels,
            viewer_offset: self.viewer_offset,
            now: fetched_at,
            followed: &self.followed,
            options: &options,
        };
        let rendered = render::build_feed(result, &ctx);

        let log = match &rendered.outcome {
            FeedOutcome::Rendered { leagues, fixtures } => format!(
                "[INFO] {}: {fixtures} fixtures in {leagues} leagues, {} live clocks",
                kind.container_id(),
                rendered.timers.len()
            ),
            FeedOutcome::UpstreamError(msg) => {
                format!("[WARN] {}: upstream error: {msg}", kind.container_id())
            }
            FeedOutcome::Fallback(err) => {
                format!("[WARN] {}: {err}, showing fallback", kind.container_id())
            }
        };

        self.page
            .replace_contents(&kind.container_id(), rendered.instructions);
        if let Some(slot) = self.feeds.get_mut(&kind) {
            slot.outcome = Some(rendered.outcome);
            slot.timers = rendered.timers;
        }
        self.timers_version += 1;
        self.push_log(log);
        self.clamp_selection();
    }

    pub fn render_news(&mut self) {
        if let Some(result) = &self.news.result {
            let items = news::build_news_result(
                result,
                self.news_page_size,
                &self.saved_links,
                &self.labels,
            );
            self.page.replace_contents(NEWS_CONTAINER, items);
        }
        let saved = news::build_news(&self.saved_articles, None, &self.saved_links, &self.labels);
        self.page.replace_contents(SAVED_CONTAINER, saved);
    }

    pub fn set_language(&mut self, lang: Lang) {
        self.labels = Labels::load(self.locales_dir.as_deref(), lang);
        let kinds: Vec<FeedKind> = self.feeds.keys().copied().collect();
        for kind in kinds {
            self.render_feed(kind);
        }
        self.render_news();
        self.push_log(format!("[INFO] Language set to {}", lang.code()));
    }

    /// Every clock from every container, for the tick task. A fixture shown
    /// in several containers is ticked once, from its freshest seed.
    pub fn active_timers(&self) -> TimerRegistry {
        let mut by_fixture: HashMap<u64, LiveTimer> = HashMap::new();
        for timer in self.feeds.values().flat_map(|slot| slot.timers.iter()) {
            match by_fixture.get(&timer.fixture_id) {
                Some(kept) if kept.captured_at >= timer.captured_at => {}
                _ => {
                    by_fixture.insert(timer.fixture_id, timer.clone());
                }
            }
        }
        let mut timers: Vec<LiveTimer> = by_fixture.into_values().collect();
        timers.sort_by_key(|t| t.fixture_id);
        timers.into_iter().collect()
    }

    /// Containers the periodic poll refetches: the list feeds plus the match
    /// detail currently on screen.
    pub fn refresh_kinds(&self) -> Vec<FeedKind> {
        let mut kinds: Vec<FeedKind> = self
            .feeds
            .keys()
            .copied()
            .filter(|kind| match kind {
                FeedKind::Match(_) => self.screen == Screen::Feed(*kind),
                FeedKind::Live | FeedKind::Today => true,
            })
            .collect();
        kinds.sort_by_key(|kind| match kind {
            FeedKind::Live => (0, 0),
            FeedKind::Today => (1, 0),
            FeedKind::Match(id) => (2, *id),
        });
        kinds
    }

    // Match details live only while on screen; a late answer for a dropped
    // slot fails the generation check.
    fn drop_hidden_match_slots(&mut self) {
        let hidden: Vec<FeedKind> = self
            .feeds
            .keys()
            .copied()
            .filter(|kind| matches!(kind, FeedKind::Match(_)) && self.screen != Screen::Feed(*kind))
            .collect();
        for kind in hidden {
            if let Some(slot) = self.feeds.remove(&kind)
                && !slot.timers.is_empty()
            {
                self.timers_version += 1;
            }
            self.page.remove_container(&kind.container_id());
            debug!(kind = ?kind, "dropped match detail");
        }
    }

    pub fn current_container(&self) -> String {
        self.screen.container_id()
    }

    fn selectable_count(&self) -> usize {
        let container = self.current_container();
        match self.screen {
            Screen::Feed(_) => self.page.fixture_cards(&container).count(),
            Screen::News | Screen::Saved => self
                .page
                .contents(&container)
                .iter()
                .filter(|i| matches!(i, render::RenderInstruction::NewsCard(_)))
                .count(),
        }
    }

    pub fn selected_fixture_id(&self) -> Option<u64> {
        let Screen::Feed(_) = self.screen else {
            return None;
        };
        self.page
            .fixture_cards(&self.current_container())
            .nth(self.selected)
            .map(|card| card.fixture_id)
    }

    pub fn selected_article(&self) -> Option<Article> {
        let link = self
            .page
            .contents(&self.current_container())
            .iter()
            .filter_map(|i| match i {
                render::RenderInstruction::NewsCard(card) => Some(card.link.as_str()),
                _ => None,
            })
            .nth(self.selected)?;
        let from_feed = self
            .news
            .result
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .and_then(|articles| articles.iter().find(|a| a.link == link));
        from_feed
            .or_else(|| self.saved_articles.iter().find(|a| a.link == link))
            .cloned()
    }

    pub fn select_next(&mut self) {
        let total = self.selectable_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected + 1) % total;
    }

    pub fn select_prev(&mut self) {
        let total = self.selectable_count();
        if total == 0 {
            self.selected = 0;
            return;
        }
        if self.selected == 0 {
            self.selected = total - 1;
        } else {
            self.selected -= 1;
        }
    }

    pub fn clamp_selection(&mut self) {
        let total = self.selectable_count();
        if total == 0 {
            self.selected = 0;
        } else if self.selected >= total {
            self.selected = total - 1;
        }
    }

    pub fn switch_screen(&mut self, screen: Screen) {
        if self.screen != screen {
            if !matches!(self.screen, Screen::Feed(FeedKind::Match(_))) {
                self.back = self.screen;
            }
            self.screen = screen;
            self.selected = 0;
            self.drop_hidden_match_slots();
        }
    }

    pub fn go_back(&mut self) {
        self.screen = self.back;
        self.drop_hidden_match_slots();
        self.clamp_selection();
    }
}

#[derive(Debug, Clone)]
pub enum ProviderCommand {
    FetchFeed { kind: FeedKind, generation: u64 },
    RefreshAll(Vec<(FeedKind, u64)>),
    FetchNews { generation: u64, lang: Lang },
    ToggleFollow(u64),
    ToggleSaved(Article),
    SetLanguage(Lang),
}

#[derive(Debug, Clone)]
pub enum Delta {
    FeedLoaded {
        kind: FeedKind,
        generation: u64,
        fetched_at: DateTime<Utc>,
        result: Result<Vec<Fixture>, FeedError>,
    },
    NewsLoaded {
        generation: u64,
        result: Result<Vec<Article>, FeedError>,
    },
    TimerText {
        target: String,
        text: String,
    },
    Followed(HashSet<u64>),
    SavedArticles(Vec<Article>),
    Log(String),
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::FeedLoaded {
            kind,
            generation,
            fetched_at,
            result,
        } => {
            let current = state.feeds.get(&kind).map_or(0, |slot| slot.generation);
            if generation != current {
                debug!(kind = ?kind, generation, current, "dropping stale feed result");
                state.push_log(format!(
                    "[WARN] Dropped stale {} result (request {generation}, current {current})",
                    kind.container_id()
                ));
                return;
            }
            if let Some(slot) = state.feeds.get_mut(&kind) {
                slot.loading = false;
                slot.result = Some(result);
                slot.fetched_at = Some(fetched_at);
            }
            state.render_feed(kind);
        }
        Delta::NewsLoaded { generation, result } => {
            if generation != state.news.generation {
                state.push_log(format!(
                    "[WARN] Dropped stale news result (request {generation}, current {})",
                    state.news.generation
                ));
                return;
            }
            state.news.loading = false;
            if let Err(err) = &result {
                state.push_log(format!("[WARN] News fetch error: {err}"));
            }
            state.news.result = Some(result);
            state.render_news();
            state.clamp_selection();
        }
        Delta::TimerText { target, text } => {
            state.page.set_text(&target, &text);
        }
        Delta::Followed(ids) => {
            let changed: Vec<u64> = ids
                .symmetric_difference(&state.followed)
                .copied()
                .collect();
            for id in changed {
                state.page.set_followed(id, ids.contains(&id));
            }
            state.followed = ids;
        }
        Delta::SavedArticles(articles) => {
            state.saved_links = articles.iter().map(|a| a.link.clone()).collect();
            state.saved_articles = articles;
            state.render_news();
            state.clamp_selection();
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}
