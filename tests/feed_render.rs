use std::collections::HashSet;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use matchday_feed::api;
use matchday_feed::classify::{DisplayStatus, StatusLabel};
use matchday_feed::error::FeedError;
use matchday_feed::fixture::Fixture;
use matchday_feed::i18n::{Lang, Labels};
use matchday_feed::render::{
    FallbackPolicy, FeedOptions, FeedOutcome, FixtureCard, RenderContext, RenderInstruction,
    build_feed,
};

fn load(name: &str) -> String {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read_to_string(&path).unwrap_or_else(|err| panic!("read {path}: {err}"))
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 11, 9, 18, 0, 0).unwrap()
}

fn render(
    result: Result<Vec<Fixture>, FeedError>,
    labels: &Labels,
    followed: &HashSet<u64>,
    options: &FeedOptions,
) -> matchday_feed::render::FeedRender {
    let ctx = RenderContext {
        labels,
        viewer_offset: FixedOffset::east_opt(0).unwrap(),
        now: now(),
        followed,
        options,
    };
    build_feed(result, &ctx)
}

fn cards(items: &[RenderInstruction]) -> Vec<&FixtureCard> {
    items
        .iter()
        .filter_map(|i| match i {
            RenderInstruction::FixtureCard(card) => Some(card),
            _ => None,
        })
        .collect()
}

fn headers(items: &[RenderInstruction]) -> Vec<&str> {
    items
        .iter()
        .filter_map(|i| match i {
            RenderInstruction::LeagueHeader { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn live_feed_groups_by_first_seen_league() {
    let result = api::fixtures_from_json(&load("fixtures_live.json"));
    let labels = Labels::builtin(Lang::En);
    let out = render(result, &labels, &HashSet::new(), &FeedOptions::default());

    assert_eq!(
        headers(&out.instructions),
        vec!["Premier League", "La Liga", "Serie A"]
    );
    let ids: Vec<u64> = cards(&out.instructions).iter().map(|c| c.fixture_id).collect();
    assert_eq!(ids, vec![1001, 1003, 1005, 1002, 1004]);
    assert_eq!(
        out.outcome,
        FeedOutcome::Rendered {
            leagues: 3,
            fixtures: 5
        }
    );

    // Header logo comes from the first fixture of the league.
    match &out.instructions[0] {
        RenderInstruction::LeagueHeader { logo_url, .. } => {
            assert_eq!(logo_url, "https://media.example/leagues/39.png")
        }
        other => panic!("expected header, got {other:?}"),
    }
}

#[test]
fn live_card_seeds_clock_and_registers_only_running_matches() {
    let result = api::fixtures_from_json(&load("fixtures_live.json"));
    let labels = Labels::builtin(Lang::En);
    let out = render(result, &labels, &HashSet::new(), &FeedOptions::default());

    let all = cards(&out.instructions);
    let live = all.iter().find(|c| c.fixture_id == 1001).unwrap();
    assert_eq!(live.status, DisplayStatus::Live);
    assert_eq!(live.status_class, "live");
    assert_eq!(live.score_or_time, "1 - 0");
    assert_eq!(
        live.status_label,
        StatusLabel::Clock {
            target: "timer-1001".to_string(),
            text: "30':00".to_string()
        }
    );

    let halftime = all.iter().find(|c| c.fixture_id == 1002).unwrap();
    assert_eq!(halftime.status_label.text(), "Half-time");
    assert_eq!(halftime.status_label.clock_target(), None);

    assert_eq!(out.timers.len(), 1);
    let timer = out.timers.get(1001).unwrap();
    assert_eq!(timer.initial_elapsed_minutes, 30);
    assert_eq!(timer.captured_at, now());
}

#[test]
fn finished_card_marks_home_winner() {
    let result = api::fixtures_from_json(&load("fixtures_live.json"));
    let labels = Labels::builtin(Lang::En);
    let out = render(result, &labels, &HashSet::new(), &FeedOptions::default());

    let card = cards(&out.instructions)
        .into_iter()
        .find(|c| c.fixture_id == 1003)
        .unwrap();
    assert_eq!(card.status, DisplayStatus::Finished);
    assert_eq!(card.score_or_time, "2 - 1");
    assert!(card.home.winner);
    assert!(!card.away.winner);
    assert_eq!(card.detail_href, "match-details.html?id=1003");
}

#[test]
fn upcoming_and_unknown_cards() {
    let result = api::fixtures_from_json(&load("fixtures_live.json"));
    let labels = Labels::builtin(Lang::En);
    let out = render(result, &labels, &HashSet::new(), &FeedOptions::default());
    let all = cards(&out.instructions);

    let upcoming = all.iter().find(|c| c.fixture_id == 1004).unwrap();
    assert_eq!(upcoming.status, DisplayStatus::Upcoming);
    assert_eq!(upcoming.score_or_time, "08:00 PM");
    assert_eq!(upcoming.date_label, "Saturday, November 9");

    let postponed = all.iter().find(|c| c.fixture_id == 1005).unwrap();
    assert_eq!(postponed.status, DisplayStatus::Unknown);
    assert_eq!(postponed.status_class, "finished");
    assert_eq!(postponed.status_label.text(), "Match Postponed");
}

#[test]
fn followed_ids_mark_cards() {
    let result = api::fixtures_from_json(&load("fixtures_live.json"));
    let labels = Labels::builtin(Lang::En);
    let followed: HashSet<u64> = [1002].into_iter().collect();
    let out = render(result, &labels, &followed, &FeedOptions::default());
    let marked: Vec<u64> = cards(&out.instructions)
        .iter()
        .filter(|c| c.followed)
        .map(|c| c.fixture_id)
        .collect();
    assert_eq!(marked, vec![1002]);
}

#[test]
fn upstream_errors_show_message_without_clocks() {
    let result = api::fixtures_from_json(&load("fixtures_errors.json"));
    assert_eq!(
        result,
        Err(FeedError::Upstream("quota exceeded, rate limited".to_string()))
    );
    let labels = Labels::builtin(Lang::En);
    let out = render(result, &labels, &HashSet::new(), &FeedOptions::default());

    assert_eq!(out.instructions.len(), 1);
    match &out.instructions[0] {
        RenderInstruction::Message { i18n_key, text } => {
            assert!(i18n_key.is_none());
            assert!(text.starts_with("Error from source: "));
            assert!(text.contains("quota exceeded"));
        }
        other => panic!("expected message, got {other:?}"),
    }
    assert!(out.timers.is_empty());
}

#[test]
fn empty_feed_uses_message_policy() {
    let result = api::fixtures_from_json(&load("fixtures_empty.json"));
    assert_eq!(result, Err(FeedError::Empty));
    let labels = Labels::builtin(Lang::En);
    let options = FeedOptions {
        show_lineups: false,
        no_matches_key: "no_matches_today".to_string(),
        fallback: FallbackPolicy::Message,
    };
    let out = render(result, &labels, &HashSet::new(), &options);
    assert_eq!(
        out.instructions,
        vec![RenderInstruction::Message {
            i18n_key: Some("no_matches_today".to_string()),
            text: "No matches today.".to_string(),
        }]
    );
    assert_eq!(out.outcome, FeedOutcome::Fallback(FeedError::Empty));
}

#[test]
fn network_failure_falls_back_to_placeholder() {
    let labels = Labels::builtin(Lang::En);
    let out = render(
        Err(FeedError::Network("connection refused".to_string())),
        &labels,
        &HashSet::new(),
        &FeedOptions::default(),
    );
    assert_eq!(headers(&out.instructions), vec!["Demo League"]);
    assert_eq!(cards(&out.instructions).len(), 3);
    assert!(out.timers.is_empty());

    let options = FeedOptions {
        fallback: FallbackPolicy::Message,
        ..FeedOptions::default()
    };
    let out = render(
        Err(FeedError::Network("connection refused".to_string())),
        &labels,
        &HashSet::new(),
        &options,
    );
    match &out.instructions[..] {
        [RenderInstruction::Message { i18n_key, .. }] => {
            assert_eq!(i18n_key.as_deref(), Some("matches_loading_error"))
        }
        other => panic!("expected one message, got {other:?}"),
    }
}

#[test]
fn lineups_only_when_enabled_and_complete() {
    let labels = Labels::builtin(Lang::En);
    let options = FeedOptions {
        show_lineups: true,
        ..FeedOptions::default()
    };
    let out = render(
        api::fixtures_from_json(&load("fixtures_live.json")),
        &labels,
        &HashSet::new(),
        &options,
    );
    let all = cards(&out.instructions);
    let with_lineup = all.iter().find(|c| c.fixture_id == 1001).unwrap();
    assert!(with_lineup.clickable_teams);
    let section = with_lineup.lineup.as_ref().expect("both sides present");
    assert_eq!(section.target_id, "lineup-1001");
    assert_eq!(section.toggle_label, "Show lineup");
    assert_eq!(section.view.title, "4-3-3 vs 4-2-3-1");
    assert_eq!(section.view.home_markers.len(), 3);
    assert_eq!(section.view.home_subs.players[0].number, "?");
    assert!(all.iter().find(|c| c.fixture_id == 1002).unwrap().lineup.is_none());

    let out = render(
        api::fixtures_from_json(&load("fixtures_live.json")),
        &labels,
        &HashSet::new(),
        &FeedOptions::default(),
    );
    assert!(cards(&out.instructions).iter().all(|c| c.lineup.is_none()));
}

#[test]
fn arabic_labels_flow_into_cards() {
    let labels = Labels::builtin(Lang::Ar);
    let out = render(
        api::fixtures_from_json(&load("fixtures_live.json")),
        &labels,
        &HashSet::new(),
        &FeedOptions::default(),
    );
    let card = cards(&out.instructions)
        .into_iter()
        .find(|c| c.fixture_id == 1003)
        .unwrap();
    assert_eq!(card.status_label.text(), "انتهت");
}

#[test]
fn instructions_serialize_with_kind_tag() {
    let labels = Labels::builtin(Lang::En);
    let out = render(
        api::fixtures_from_json(&load("fixtures_live.json")),
        &labels,
        &HashSet::new(),
        &FeedOptions::default(),
    );
    let json = serde_json::to_value(&out.instructions).unwrap();
    assert_eq!(json[0]["kind"], "league_header");
    assert_eq!(json[1]["kind"], "fixture_card");
    assert_eq!(json[1]["status_label"]["type"], "clock");
    assert_eq!(json[1]["status"], "live");
}
