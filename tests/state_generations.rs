use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use matchday_feed::api::{self, FeedKind};
use matchday_feed::classify::StatusLabel;
use matchday_feed::error::FeedError;
use matchday_feed::i18n::{Lang, Labels};
use matchday_feed::news::Article;
use matchday_feed::page::fixture_line;
use matchday_feed::render::{FallbackPolicy, RenderInstruction};
use matchday_feed::state::{AppState, Delta, NEWS_CONTAINER, SAVED_CONTAINER, Screen, apply_delta};

fn load(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

fn state() -> AppState {
    AppState::new(Labels::builtin(Lang::En), FixedOffset::east_opt(0).unwrap())
}

fn loaded(kind: FeedKind, generation: u64) -> Delta {
    loaded_at(kind, generation, Utc.with_ymd_and_hms(2024, 11, 9, 18, 0, 0).unwrap())
}

fn loaded_at(kind: FeedKind, generation: u64, fetched_at: DateTime<Utc>) -> Delta {
    Delta::FeedLoaded {
        kind,
        generation,
        fetched_at,
        result: api::fixtures_from_json(&load("fixtures_live.json")),
    }
}

fn article(link: &str) -> Article {
    Article {
        title: Some(format!("Story {link}")),
        description: None,
        link: link.to_string(),
        image_url: None,
        source_id: None,
        pub_date: None,
    }
}

#[test]
fn begin_fetch_shows_loading_message() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    assert_eq!(generation, 1);
    assert_eq!(
        state.page.contents("live-matches"),
        &[RenderInstruction::Message {
            i18n_key: Some("loading_matches".to_string()),
            text: "Loading matches...".to_string(),
        }]
    );
}

#[test]
fn current_generation_renders_and_registers_clocks() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    let before = state.timers_version;
    apply_delta(&mut state, loaded(FeedKind::Live, generation));

    assert_eq!(state.page.fixture_cards("live-matches").count(), 5);
    assert_eq!(state.active_timers().len(), 1);
    assert!(state.timers_version > before);
    assert!(state.logs.back().unwrap().starts_with("[INFO] live-matches: 5 fixtures"));
}

#[test]
fn stale_generation_is_dropped() {
    let mut state = state();
    let first = state.begin_fetch(FeedKind::Live);
    let second = state.begin_fetch(FeedKind::Live);
    assert_eq!(second, first + 1);

    apply_delta(&mut state, loaded(FeedKind::Live, first));
    assert_eq!(state.page.fixture_cards("live-matches").count(), 0);
    assert!(state.active_timers().is_empty());
    assert!(state.logs.back().unwrap().starts_with("[WARN] Dropped stale live-matches"));

    apply_delta(&mut state, loaded(FeedKind::Live, second));
    assert_eq!(state.page.fixture_cards("live-matches").count(), 5);
}

#[test]
fn containers_are_independent() {
    let mut state = state();
    let live = state.begin_fetch(FeedKind::Live);
    let today = state.begin_fetch(FeedKind::Today);
    apply_delta(&mut state, loaded(FeedKind::Today, today));
    apply_delta(&mut state, loaded(FeedKind::Live, live));
    assert_eq!(state.page.fixture_cards("today-matches").count(), 5);
    assert_eq!(state.page.fixture_cards("live-matches").count(), 5);
    // Same fixture in both containers: one clock.
    assert_eq!(state.active_timers().len(), 1);
}

#[test]
fn shared_fixture_ticks_from_freshest_seed() {
    let mut state = state();
    let live = state.begin_fetch(FeedKind::Live);
    let today = state.begin_fetch(FeedKind::Today);
    let early = Utc.with_ymd_and_hms(2024, 11, 9, 18, 0, 0).unwrap();
    let late = Utc.with_ymd_and_hms(2024, 11, 9, 18, 0, 40).unwrap();
    apply_delta(&mut state, loaded_at(FeedKind::Live, live, late));
    apply_delta(&mut state, loaded_at(FeedKind::Today, today, early));

    let timers = state.active_timers();
    assert_eq!(timers.len(), 1);
    assert_eq!(timers.get(1001).unwrap().captured_at, late);

    let tick_at = Utc.with_ymd_and_hms(2024, 11, 9, 18, 1, 0).unwrap();
    assert_eq!(timers.tick(tick_at, "Half-time", &mut state.page), 1);
    for container in ["live-matches", "today-matches"] {
        let card = state
            .page
            .fixture_cards(container)
            .find(|card| card.fixture_id == 1001)
            .unwrap();
        assert_eq!(card.status_label.text(), "30':20");
    }
}

#[test]
fn leaving_a_match_detail_stops_refreshing_it() {
    let mut state = state();
    let live = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, live));
    state.begin_fetch(FeedKind::Today);

    for id in [1001, 1003] {
        let kind = FeedKind::Match(id);
        state.switch_screen(Screen::Feed(kind));
        let generation = state.begin_fetch(kind);
        assert_eq!(
            state.refresh_kinds(),
            vec![FeedKind::Live, FeedKind::Today, kind]
        );
        apply_delta(&mut state, loaded(kind, generation));
        assert_eq!(state.page.fixture_cards(&kind.container_id()).count(), 5);
        state.go_back();
    }

    assert_eq!(state.screen, Screen::Feed(FeedKind::Live));
    assert_eq!(state.refresh_kinds(), vec![FeedKind::Live, FeedKind::Today]);
    assert_eq!(state.feeds.len(), 2);
    assert!(state.page.contents("match-1001").is_empty());
    assert!(state.page.contents("match-1003").is_empty());

    // A late answer for a closed detail is not rendered.
    apply_delta(&mut state, loaded(FeedKind::Match(1003), 1));
    assert!(state.page.contents("match-1003").is_empty());
    assert!(state.logs.back().unwrap().starts_with("[WARN] Dropped stale match-1003"));
}

#[test]
fn refetch_clears_previous_clocks() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));
    assert_eq!(state.active_timers().len(), 1);

    state.begin_fetch(FeedKind::Live);
    assert!(state.active_timers().is_empty());
}

#[test]
fn timer_text_updates_clock_label() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));
    apply_delta(
        &mut state,
        Delta::TimerText {
            target: "timer-1001".to_string(),
            text: "31':05".to_string(),
        },
    );
    let card = state.page.find_card(1001).unwrap();
    assert_eq!(
        card.status_label,
        StatusLabel::Clock {
            target: "timer-1001".to_string(),
            text: "31':05".to_string()
        }
    );
    assert!(fixture_line(card).contains("31':05"));

    // Unknown targets are ignored.
    apply_delta(
        &mut state,
        Delta::TimerText {
            target: "timer-404".to_string(),
            text: "1':00".to_string(),
        },
    );
}

#[test]
fn upstream_error_leaves_no_clocks() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(
        &mut state,
        Delta::FeedLoaded {
            kind: FeedKind::Live,
            generation,
            fetched_at: Utc::now(),
            result: Err(FeedError::Upstream("quota exceeded".to_string())),
        },
    );
    assert!(state.active_timers().is_empty());
    let lines = state.page.text_lines("live-matches");
    assert_eq!(lines, vec!["Error from source: quota exceeded".to_string()]);
}

#[test]
fn message_fallback_uses_container_key() {
    let mut state = state();
    state.fallback = FallbackPolicy::Message;
    let generation = state.begin_fetch(FeedKind::Today);
    apply_delta(
        &mut state,
        Delta::FeedLoaded {
            kind: FeedKind::Today,
            generation,
            fetched_at: Utc::now(),
            result: Err(FeedError::Empty),
        },
    );
    assert_eq!(state.page.text_lines("today-matches"), vec!["No matches today.".to_string()]);
}

#[test]
fn followed_delta_marks_rendered_cards() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));
    let ids: HashSet<u64> = [1003].into_iter().collect();
    apply_delta(&mut state, Delta::Followed(ids));
    assert!(state.page.find_card(1003).unwrap().followed);
    assert!(!state.page.find_card(1001).unwrap().followed);

    apply_delta(&mut state, Delta::Followed(HashSet::new()));
    assert!(!state.page.find_card(1003).unwrap().followed);
}

#[test]
fn language_switch_rerenders_from_stored_result() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));
    state.set_language(Lang::Ar);

    assert_eq!(state.lang(), Lang::Ar);
    assert_eq!(state.page.find_card(1003).unwrap().status_label.text(), "انتهت");
    // Clock is re-seeded from the fetch instant, not reset.
    assert_eq!(state.page.find_card(1001).unwrap().status_label.text(), "30':00");
    assert_eq!(state.active_timers().len(), 1);
}

#[test]
fn lineup_toggle_flips_label() {
    let mut state = state();
    state.show_lineups = true;
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));

    let labels = state.labels.clone();
    assert_eq!(state.page.toggle_lineup("lineup-1001", &labels), Some(true));
    assert!(state.page.is_expanded("lineup-1001"));
    let card = state.page.find_card(1001).unwrap();
    assert_eq!(card.lineup.as_ref().unwrap().toggle_label, "Hide lineup");

    assert_eq!(state.page.toggle_lineup("lineup-1001", &labels), Some(false));
    assert_eq!(state.page.toggle_lineup("lineup-1002", &labels), None);
}

#[test]
fn news_generations_and_saved_articles() {
    let mut state = state();
    let stale = state.begin_news_fetch();
    let current = state.begin_news_fetch();
    apply_delta(
        &mut state,
        Delta::NewsLoaded {
            generation: stale,
            result: Ok(vec![article("https://x.example/old")]),
        },
    );
    assert!(state.logs.back().unwrap().starts_with("[WARN] Dropped stale news"));

    apply_delta(
        &mut state,
        Delta::NewsLoaded {
            generation: current,
            result: Ok(vec![article("https://x.example/a"), article("https://x.example/b")]),
        },
    );
    assert_eq!(state.page.contents(NEWS_CONTAINER).len(), 2);

    apply_delta(
        &mut state,
        Delta::SavedArticles(vec![article("https://x.example/b")]),
    );
    assert!(state.saved_links.contains("https://x.example/b"));
    match &state.page.contents(NEWS_CONTAINER)[1] {
        RenderInstruction::NewsCard(card) => assert!(card.saved),
        other => panic!("expected news card, got {other:?}"),
    }
    assert_eq!(state.page.contents(SAVED_CONTAINER).len(), 1);
}

#[test]
fn selection_follows_screen() {
    let mut state = state();
    let generation = state.begin_fetch(FeedKind::Live);
    apply_delta(&mut state, loaded(FeedKind::Live, generation));

    assert_eq!(state.selected_fixture_id(), Some(1001));
    state.select_next();
    assert_eq!(state.selected_fixture_id(), Some(1003));
    state.select_prev();
    state.select_prev();
    assert_eq!(state.selected_fixture_id(), Some(1004));

    state.switch_screen(Screen::Feed(FeedKind::Match(1004)));
    assert_eq!(state.selected, 0);
    state.go_back();
    assert_eq!(state.screen, Screen::Feed(FeedKind::Live));

    state.switch_screen(Screen::News);
    assert_eq!(state.selected_fixture_id(), None);
}
