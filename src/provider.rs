use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use rayon::prelude::*;
use tracing::warn;

use crate::api::{self, FeedKind};
use crate::config::Config;
use crate::state::{Delta, ProviderCommand};
use crate::store::FeedStore;
use crate::ticker::TimerSink;

/// Runs until every command sender is dropped. Network work happens on a
/// small rayon pool, so requests for different containers overlap; the store
/// stays on this thread.
pub fn spawn_provider(
    cfg: Config,
    tx: Sender<Delta>,
    cmd_rx: Receiver<ProviderCommand>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let cfg = Arc::new(cfg);
        let pool = build_fetch_pool(cfg.fetch_parallelism);
        let Some(store) = open_store(&cfg, &tx) else {
            return;
        };
        send_user_data(&store, &tx);

        for cmd in cmd_rx {
            match cmd {
                ProviderCommand::FetchFeed { kind, generation } => {
                    let cfg = cfg.clone();
                    let tx = tx.clone();
                    run(&pool, move || fetch_feed(&cfg, kind, generation, &tx));
                }
                ProviderCommand::RefreshAll(requests) => {
                    let cfg = cfg.clone();
                    let tx = tx.clone();
                    run(&pool, move || {
                        requests.par_iter().for_each_with(tx, |tx, (kind, generation)| {
                            fetch_feed(&cfg, *kind, *generation, tx);
                        });
                    });
                }
                ProviderCommand::FetchNews { generation, lang } => {
                    let cfg = cfg.clone();
                    let tx = tx.clone();
                    run(&pool, move || {
                        let result = api::fetch_news(&cfg, lang);
                        let _ = tx.send(Delta::NewsLoaded { generation, result });
                    });
                }
                ProviderCommand::ToggleFollow(fixture_id) => match store.toggle_follow(fixture_id) {
                    Ok(now_followed) => {
                        let verb = if now_followed { "Following" } else { "Unfollowed" };
                        let _ = tx.send(Delta::Log(format!("[INFO] {verb} match {fixture_id}")));
                        send_followed(&store, &tx);
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] Follow failed: {err:#}")));
                    }
                },
                ProviderCommand::ToggleSaved(article) => match store.toggle_saved_article(&article) {
                    Ok(now_saved) => {
                        let verb = if now_saved { "Saved" } else { "Removed" };
                        let _ = tx.send(Delta::Log(format!("[INFO] {verb} article {}", article.link)));
                        send_saved(&store, &tx);
                    }
                    Err(err) => {
                        let _ = tx.send(Delta::Log(format!("[WARN] Save failed: {err:#}")));
                    }
                },
                ProviderCommand::SetLanguage(lang) => {
                    if let Err(err) = store.set_language(lang) {
                        let _ = tx.send(Delta::Log(format!("[WARN] Language not stored: {err:#}")));
                    }
                }
            }
        }
    })
}

fn fetch_feed(cfg: &Config, kind: FeedKind, generation: u64, tx: &Sender<Delta>) {
    let (result, fetched_at) = api::stamp_arrival(|now| api::fetch_fixtures(cfg, kind, now));
    let _ = tx.send(Delta::FeedLoaded {
        kind,
        generation,
        fetched_at,
        result,
    });
}

/// Falls back to a throwaway in-memory store so follow/save still work for
/// the session.
pub fn open_store(cfg: &Config, tx: &Sender<Delta>) -> Option<FeedStore> {
    let opened = match cfg.db_path.as_deref() {
        Some(path) => FeedStore::open(path),
        None => FeedStore::open_in_memory(),
    };
    let err = match opened {
        Ok(store) => return Some(store),
        Err(err) => err,
    };
    warn!(error = %format!("{err:#}"), "store unavailable, using memory");
    let _ = tx.send(Delta::Log(format!(
        "[WARN] Store unavailable ({err:#}); follows and saves last this session only"
    )));
    match FeedStore::open_in_memory() {
        Ok(store) => Some(store),
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Provider stopped: {err:#}")));
            None
        }
    }
}

fn send_user_data(store: &FeedStore, tx: &Sender<Delta>) {
    send_followed(store, tx);
    send_saved(store, tx);
}

fn send_followed(store: &FeedStore, tx: &Sender<Delta>) {
    match store.followed_ids() {
        Ok(ids) => {
            let _ = tx.send(Delta::Followed(ids));
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Followed matches: {err:#}")));
        }
    }
}

fn send_saved(store: &FeedStore, tx: &Sender<Delta>) {
    match store.saved_articles() {
        Ok(articles) => {
            let _ = tx.send(Delta::SavedArticles(articles));
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Saved articles: {err:#}")));
        }
    }
}

fn build_fetch_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|idx| format!("feed-fetch-{idx}"))
        .build()
        .ok()
}

fn run(pool: &Option<rayon::ThreadPool>, job: impl FnOnce() + Send + 'static) {
    if let Some(pool) = pool.as_ref() {
        pool.spawn(job);
    } else {
        thread::spawn(job);
    }
}

/// Forwards clock text to the UI loop, which owns the page.
#[derive(Debug, Clone)]
pub struct ChannelTimerSink {
    tx: Sender<Delta>,
}

impl ChannelTimerSink {
    pub fn new(tx: Sender<Delta>) -> Self {
        Self { tx }
    }
}

impl TimerSink for ChannelTimerSink {
    fn set_timer_text(&mut self, target_id: &str, text: &str) -> bool {
        self.tx
            .send(Delta::TimerText {
                target: target_id.to_string(),
                text: text.to_string(),
            })
            .is_ok()
    }
}
