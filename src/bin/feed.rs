use std::collections::HashSet;
use std::path::PathBuf;
use std::thread;

use anyhow::{Context, Result, anyhow};
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchday_feed::api::{self, FeedKind};
use matchday_feed::config::Config;
use matchday_feed::i18n::{self, Labels};
use matchday_feed::news;
use matchday_feed::page::{Page, RenderSink, SharedPage, fixture_line};
use matchday_feed::render::{self, RenderContext, RenderInstruction};
use matchday_feed::store::FeedStore;
use matchday_feed::ticker::{SystemClock, TICK_PERIOD, start_ticking};

enum View {
    Fixtures(FeedKind),
    News,
    Saved,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("matchday_feed=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut cfg = Config::load();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let view = parse_view(&args)?;
    let as_json = args.iter().any(|a| a == "--json");
    if args.iter().any(|a| a == "--lineups") {
        cfg.show_lineups = true;
    }
    let file = flag_value(&args, "--file").map(PathBuf::from);
    let watch_secs = flag_value(&args, "--watch")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);

    let store = match cfg.db_path.as_deref() {
        Some(path) => FeedStore::open(path)?,
        None => FeedStore::open_in_memory()?,
    };
    let stored_lang = store.language().unwrap_or(None);
    let lang = i18n::resolve_lang(flag_value(&args, "--lang").or(cfg.lang.as_deref()), stored_lang);
    let labels = Labels::load(cfg.locales_dir.as_deref(), lang);
    info!(lang = lang.code(), "labels loaded");

    match view {
        View::Fixtures(kind) => {
            let raw = match &file {
                Some(path) => Some(
                    std::fs::read_to_string(path)
                        .with_context(|| format!("read {}", path.display()))?,
                ),
                None => None,
            };
            let (result, now) = api::stamp_arrival(|requested_at| match &raw {
                Some(raw) => api::fixtures_from_json(raw),
                None => api::fetch_fixtures(&cfg, kind, requested_at),
            });
            let followed = store.followed_ids()?;
            let options = kind.options(cfg.show_lineups, cfg.fallback);
            let ctx = RenderContext {
                labels: &labels,
                viewer_offset: cfg.viewer_offset,
                now,
                followed: &followed,
                options: &options,
            };
            let rendered = render::build_feed(result, &ctx);
            info!(outcome = ?rendered.outcome, timers = rendered.timers.len(), "feed built");

            if as_json {
                print_json(&rendered.instructions)?;
                return Ok(());
            }

            let container = kind.container_id();
            let mut page = Page::new();
            page.replace_contents(&container, rendered.instructions);
            for line in page.text_lines(&container) {
                println!("{line}");
            }

            if watch_secs > 0 && !rendered.timers.is_empty() {
                let ids: Vec<u64> = rendered.timers.iter().map(|t| t.fixture_id).collect();
                let shared = SharedPage::new(page);
                let handle = start_ticking(
                    rendered.timers,
                    labels.get("status_halftime").to_string(),
                    TICK_PERIOD,
                    SystemClock,
                    shared.clone(),
                );
                for _ in 0..watch_secs {
                    thread::sleep(TICK_PERIOD);
                    shared.with(|page| {
                        for id in &ids {
                            if let Some(card) = page.find_card(*id) {
                                println!("{}", fixture_line(card));
                            }
                        }
                    });
                }
                handle.cancel();
            }
        }
        View::News => {
            let result = match &file {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)
                        .with_context(|| format!("read {}", path.display()))?;
                    news::parse_news_json(&raw)
                }
                None => api::fetch_news(&cfg, lang),
            };
            let saved = store.saved_links()?;
            let items = news::build_news_result(&result, cfg.news_page_size, &saved, &labels);
            print_items(items, as_json)?;
        }
        View::Saved => {
            let articles = store.saved_articles()?;
            let links: HashSet<String> = articles.iter().map(|a| a.link.clone()).collect();
            let items = news::build_news(&articles, None, &links, &labels);
            print_items(items, as_json)?;
        }
    }
    Ok(())
}

fn print_items(items: Vec<RenderInstruction>, as_json: bool) -> Result<()> {
    if as_json {
        return print_json(&items);
    }
    let mut page = Page::new();
    page.replace_contents("out", items);
    for line in page.text_lines("out") {
        println!("{line}");
    }
    Ok(())
}

fn print_json(items: &[RenderInstruction]) -> Result<()> {
    let json = serde_json::to_string_pretty(items).context("encode instructions")?;
    println!("{json}");
    Ok(())
}

fn parse_view(args: &[String]) -> Result<View> {
    let mut positional = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if matches!(arg.as_str(), "--file" | "--lang" | "--watch") {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        positional.push(arg.as_str());
    }

    match positional.as_slice() {
        [] | ["live"] => Ok(View::Fixtures(FeedKind::Live)),
        ["today"] => Ok(View::Fixtures(FeedKind::Today)),
        ["match", id] => id
            .parse::<u64>()
            .map(|id| View::Fixtures(FeedKind::Match(id)))
            .map_err(|_| anyhow!("invalid match id: {id}")),
        ["news"] => Ok(View::News),
        ["saved"] => Ok(View::Saved),
        other => Err(anyhow!(
            "usage: feed [live|today|match <id>|news|saved] [--json] [--file PATH] [--lang CODE] [--watch SECS] [--lineups] (got {other:?})"
        )),
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(rest) = arg.strip_prefix(name)
            && let Some(value) = rest.strip_prefix('=')
        {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed);
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.as_str());
        }
    }
    None
}
