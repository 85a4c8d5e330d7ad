use std::collections::HashSet;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use matchday_feed::api::FeedKind;
use matchday_feed::config::Config;
use matchday_feed::i18n::{self, Labels, Lang, TextDirection};
use matchday_feed::page::{fixture_line, instruction_lines};
use matchday_feed::provider::{ChannelTimerSink, spawn_provider};
use matchday_feed::render::RenderInstruction;
use matchday_feed::state::{AppState, Delta, ProviderCommand, Screen, apply_delta};
use matchday_feed::store::FeedStore;
use matchday_feed::ticker::{SystemClock, TICK_PERIOD, Ticker};

struct App {
    state: AppState,
    should_quit: bool,
    cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
    delta_tx: mpsc::Sender<Delta>,
    poll: Duration,
    last_poll: Instant,
    ticker: Ticker,
    ticker_version: u64,
}

impl App {
    fn new(
        state: AppState,
        poll: Duration,
        cmd_tx: Option<mpsc::Sender<ProviderCommand>>,
        delta_tx: mpsc::Sender<Delta>,
    ) -> Self {
        Self {
            state,
            should_quit: false,
            cmd_tx,
            delta_tx,
            poll,
            last_poll: Instant::now(),
            ticker: Ticker::new(),
            ticker_version: 0,
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.show_feed(FeedKind::Live),
            KeyCode::Char('2') => self.show_feed(FeedKind::Today),
            KeyCode::Char('3') => {
                self.state.switch_screen(Screen::News);
                if self.state.news.result.is_none() && !self.state.news.loading {
                    self.request_news(true);
                }
            }
            KeyCode::Char('4') => self.state.switch_screen(Screen::Saved),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Enter | KeyCode::Char('d') => {
                if let Some(id) = self.state.selected_fixture_id() {
                    let kind = FeedKind::Match(id);
                    self.state.switch_screen(Screen::Feed(kind));
                    self.request_feed(kind, true);
                }
            }
            KeyCode::Char('b') | KeyCode::Esc => self.state.go_back(),
            KeyCode::Char('l') => self.toggle_lineup(),
            KeyCode::Char('f') => self.toggle_follow(),
            KeyCode::Char('s') => self.toggle_saved(),
            KeyCode::Char('r') => self.refresh_current(),
            KeyCode::Char('g') => self.cycle_language(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    fn show_feed(&mut self, kind: FeedKind) {
        self.state.switch_screen(Screen::Feed(kind));
        if !self.state.feeds.contains_key(&kind) {
            self.request_feed(kind, false);
        }
    }

    fn send(&mut self, cmd: ProviderCommand, what: &str, announce: bool) {
        let Some(tx) = &self.cmd_tx else {
            if announce {
                self.state.push_log(format!("[INFO] {what} unavailable"));
            }
            return;
        };
        if tx.send(cmd).is_err() {
            self.state.push_log(format!("[WARN] {what} request failed"));
        } else if announce {
            self.state.push_log(format!("[INFO] {what} request sent"));
        }
    }

    fn request_feed(&mut self, kind: FeedKind, announce: bool) {
        let generation = self.state.begin_fetch(kind);
        self.send(
            ProviderCommand::FetchFeed { kind, generation },
            &kind.container_id(),
            announce,
        );
    }

    fn request_news(&mut self, announce: bool) {
        let generation = self.state.begin_news_fetch();
        let lang = self.state.lang();
        self.send(ProviderCommand::FetchNews { generation, lang }, "News", announce);
    }

    fn refresh_feeds(&mut self) {
        let kinds = self.state.refresh_kinds();
        if kinds.is_empty() {
            return;
        }
        let requests: Vec<(FeedKind, u64)> = kinds
            .into_iter()
            .map(|kind| (kind, self.state.begin_fetch(kind)))
            .collect();
        self.send(ProviderCommand::RefreshAll(requests), "Refresh", false);
        self.last_poll = Instant::now();
    }

    fn refresh_current(&mut self) {
        match self.state.screen {
            Screen::Feed(kind) => self.request_feed(kind, true),
            Screen::News => self.request_news(true),
            Screen::Saved => {}
        }
    }

    fn maybe_poll(&mut self) {
        if self.last_poll.elapsed() >= self.poll {
            self.refresh_feeds();
        }
    }

    fn toggle_lineup(&mut self) {
        let Some(id) = self.state.selected_fixture_id() else {
            return;
        };
        let target = format!("lineup-{id}");
        if self.state.page.toggle_lineup(&target, &self.state.labels).is_none() {
            self.state.push_log(format!("[INFO] No lineup for match {id}"));
        }
    }

    fn toggle_follow(&mut self) {
        if let Some(id) = self.state.selected_fixture_id() {
            self.send(ProviderCommand::ToggleFollow(id), "Follow", false);
        }
    }

    fn toggle_saved(&mut self) {
        if let Some(article) = self.state.selected_article() {
            self.send(ProviderCommand::ToggleSaved(article), "Save", false);
        }
    }

    fn cycle_language(&mut self) {
        let current = self.state.lang();
        let idx = Lang::ALL.iter().position(|l| *l == current).unwrap_or(0);
        let next = Lang::ALL[(idx + 1) % Lang::ALL.len()];
        self.state.set_language(next);
        self.send(ProviderCommand::SetLanguage(next), "Language", false);
        if self.state.news.result.is_some() {
            self.request_news(false);
        }
    }

    /// Restarts the tick task whenever a render replaced the live clocks.
    fn sync_ticker(&mut self) {
        if self.state.timers_version == self.ticker_version {
            return;
        }
        self.ticker_version = self.state.timers_version;
        let timers = self.state.active_timers();
        if timers.is_empty() {
            self.ticker.stop();
            return;
        }
        self.ticker.restart(
            timers,
            self.state.labels.get("status_halftime").to_string(),
            TICK_PERIOD,
            SystemClock,
            ChannelTimerSink::new(self.delta_tx.clone()),
        );
    }
}

fn main() -> io::Result<()> {
    let cfg = Config::load();

    let stored_lang = cfg
        .db_path
        .as_deref()
        .and_then(|path| FeedStore::open(path).ok())
        .and_then(|store| store.language().ok().flatten());
    let lang = i18n::resolve_lang(cfg.lang.as_deref(), stored_lang);
    let mut state = AppState::new(Labels::load(cfg.locales_dir.as_deref(), lang), cfg.viewer_offset);
    state.locales_dir = cfg.locales_dir.clone();
    state.show_lineups = cfg.show_lineups;
    state.fallback = cfg.fallback;
    state.news_page_size = cfg.news_page_size;
    let poll = cfg.poll_interval;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let (tx, rx) = mpsc::channel();
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let _provider = spawn_provider(cfg, tx.clone(), cmd_rx);

    let mut app = App::new(state, poll, Some(cmd_tx), tx);
    app.request_feed(FeedKind::Live, false);
    app.request_feed(FeedKind::Today, false);
    let res = run_app(&mut terminal, &mut app, rx);
    app.ticker.stop();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: mpsc::Receiver<Delta>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        while let Ok(delta) = rx.try_recv() {
            apply_delta(&mut app.state, delta);
        }

        app.sync_ticker();
        app.maybe_poll();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    render_container(frame, chunks[1], &app.state);

    let console = Paragraph::new(console_text(&app.state))
        .block(Block::default().title("Console").borders(Borders::ALL))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(console, chunks[2]);

    let footer = Paragraph::new(footer_text(&app.state));
    frame.render_widget(footer, chunks[3]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let view = match state.screen {
        Screen::Feed(FeedKind::Live) => "LIVE".to_string(),
        Screen::Feed(FeedKind::Today) => "TODAY".to_string(),
        Screen::Feed(FeedKind::Match(id)) => format!("MATCH {id}"),
        Screen::News => "NEWS".to_string(),
        Screen::Saved => "SAVED".to_string(),
    };
    let loading = match state.screen {
        Screen::Feed(kind) => state.feeds.get(&kind).is_some_and(|s| s.loading),
        Screen::News => state.news.loading,
        Screen::Saved => false,
    };
    format!(
        " MATCHDAY | {view} | {} | following {}{}",
        state.lang().code(),
        state.followed.len(),
        if loading { " | ..." } else { "" }
    )
}

fn footer_text(state: &AppState) -> String {
    match state.screen {
        Screen::Feed(FeedKind::Match(_)) => {
            "b/Esc Back | l Lineup | f Follow | r Refresh | g Lang | ? Help | q Quit".to_string()
        }
        Screen::Feed(_) => {
            "1 Live | 2 Today | 3 News | 4 Saved | Enter Match | j/k Move | l Lineup | f Follow | r Refresh | g Lang | q Quit"
                .to_string()
        }
        Screen::News | Screen::Saved => {
            "1 Live | 2 Today | 3 News | 4 Saved | j/k Move | s Save | r Refresh | g Lang | q Quit"
                .to_string()
        }
    }
}

fn status_style(class: &str) -> Style {
    match class {
        "live" => Style::default().fg(Color::Green),
        "upcoming" => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    }
}

fn render_container(frame: &mut Frame, area: Rect, state: &AppState) {
    let container = state.current_container();
    let items = state.page.contents(&container);

    let mut lines: Vec<Line> = Vec::new();
    let mut selectable = 0usize;
    let mut selected_line = 0usize;
    for item in items {
        let is_selectable = matches!(
            item,
            RenderInstruction::FixtureCard(_) | RenderInstruction::NewsCard(_)
        );
        let selected = is_selectable && selectable == state.selected;
        if selected {
            selected_line = lines.len();
        }
        let highlight = if selected {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };

        match item {
            RenderInstruction::LeagueHeader { name, .. } => {
                lines.push(Line::from(Span::styled(
                    format!(" {name}"),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
            }
            RenderInstruction::FixtureCard(card) => {
                let mut spans = vec![Span::styled(fixture_line(card), highlight)];
                spans.push(Span::styled(
                    format!("  {}", card.date_label),
                    status_style(card.status_class).patch(highlight),
                ));
                lines.push(Line::from(spans));
                let rest = instruction_lines(item, &expanded_for(state, card.fixture_id));
                lines.extend(rest.into_iter().skip(1).map(Line::from));
            }
            _ => {
                let rendered = instruction_lines(item, &Default::default());
                for (idx, text) in rendered.into_iter().enumerate() {
                    let style = if idx == 0 { highlight } else { Style::default() };
                    lines.push(Line::from(Span::styled(text, style)));
                }
            }
        }
        if is_selectable {
            selectable += 1;
        }
    }

    let height = area.height.saturating_sub(2) as usize;
    let scroll = selected_line.saturating_sub(height / 2) as u16;
    let alignment = match state.lang().direction() {
        TextDirection::Rtl => Alignment::Right,
        TextDirection::Ltr => Alignment::Left,
    };
    let body = Paragraph::new(lines)
        .alignment(alignment)
        .scroll((scroll, 0))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(body, area);
}

fn expanded_for(state: &AppState, fixture_id: u64) -> HashSet<String> {
    let target = format!("lineup-{fixture_id}");
    if state.page.is_expanded(&target) {
        std::iter::once(target).collect()
    } else {
        Default::default()
    }
}

fn console_text(state: &AppState) -> String {
    if state.logs.is_empty() {
        return "No alerts yet".to_string();
    }
    state
        .logs
        .iter()
        .rev()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Matchday Feed - Help",
        "",
        "Views:",
        "  1 / 2        Live / Today",
        "  3 / 4        News / Saved articles",
        "  Enter / d    Match view",
        "  b / Esc      Back",
        "",
        "Actions:",
        "  j/k or ↑/↓   Move",
        "  l            Show/hide lineup",
        "  f            Follow match",
        "  s            Save article",
        "  r            Refresh",
        "  g            Next language",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
