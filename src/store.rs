use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};

use crate::i18n::Lang;
use crate::news::Article;

const DATA_DIR: &str = "matchday_feed";
const DB_FILE: &str = "feed.sqlite";

pub fn default_db_path() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_DATA_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(DATA_DIR).join(DB_FILE));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR)
            .join(DB_FILE),
    )
}

pub struct FeedStore {
    conn: Connection,
}

impl FeedStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn followed_ids(&self) -> Result<HashSet<u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT fixture_id FROM followed_matches")
            .context("prepare followed query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, i64>(0))
            .context("query followed matches")?;
        let mut out = HashSet::new();
        for row in rows {
            out.insert(row.context("decode followed row")? as u64);
        }
        Ok(out)
    }

    pub fn is_followed(&self, fixture_id: u64) -> Result<bool> {
        let hit = self
            .conn
            .query_row(
                "SELECT 1 FROM followed_matches WHERE fixture_id = ?1",
                params![fixture_id as i64],
                |_| Ok(()),
            )
            .optional()
            .context("query followed match")?;
        Ok(hit.is_some())
    }

    /// Returns whether the fixture is followed afterwards.
    pub fn toggle_follow(&self, fixture_id: u64) -> Result<bool> {
        if self.is_followed(fixture_id)? {
            self.conn
                .execute(
                    "DELETE FROM followed_matches WHERE fixture_id = ?1",
                    params![fixture_id as i64],
                )
                .context("unfollow match")?;
            Ok(false)
        } else {
            self.conn
                .execute(
                    "INSERT INTO followed_matches (fixture_id, followed_at) VALUES (?1, ?2)",
                    params![fixture_id as i64, Utc::now().to_rfc3339()],
                )
                .context("follow match")?;
            Ok(true)
        }
    }

    /// Most recently saved first.
    pub fn saved_articles(&self) -> Result<Vec<Article>> {
        let mut stmt = self
            .conn
            .prepare("SELECT article_json FROM saved_articles ORDER BY saved_at DESC, rowid DESC")
            .context("prepare saved articles query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query saved articles")?;
        let mut out = Vec::new();
        for row in rows {
            let raw = row.context("decode saved article row")?;
            let article = serde_json::from_str::<Article>(&raw).context("invalid saved article json")?;
            out.push(article);
        }
        Ok(out)
    }

    pub fn saved_links(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT url FROM saved_articles")
            .context("prepare saved links query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query saved links")?;
        let mut out = HashSet::new();
        for row in rows {
            out.insert(row.context("decode saved link row")?);
        }
        Ok(out)
    }

    /// Saves or forgets an article by its link. Returns whether it is saved
    /// afterwards.
    pub fn toggle_saved_article(&self, article: &Article) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM saved_articles WHERE url = ?1", params![article.link])
            .context("unsave article")?;
        if removed > 0 {
            return Ok(false);
        }
        let json = serde_json::to_string(article).context("encode article")?;
        self.conn
            .execute(
                "INSERT INTO saved_articles (url, article_json, saved_at) VALUES (?1, ?2, ?3)",
                params![article.link, json, Utc::now().to_rfc3339()],
            )
            .context("save article")?;
        Ok(true)
    }

    pub fn language(&self) -> Result<Option<Lang>> {
        let raw = self
            .conn
            .query_row(
                "SELECT value FROM prefs WHERE key = 'language'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("query language pref")?;
        Ok(raw.as_deref().and_then(Lang::parse))
    }

    pub fn set_language(&self, lang: Lang) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO prefs (key, value) VALUES ('language', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![lang.code()],
            )
            .context("store language pref")?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS followed_matches (
            fixture_id INTEGER PRIMARY KEY,
            followed_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS saved_articles (
            url TEXT PRIMARY KEY,
            article_json TEXT NOT NULL,
            saved_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS prefs (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_toggles_back_and_forth() {
        let store = FeedStore::open_in_memory().unwrap();
        assert!(store.toggle_follow(42).unwrap());
        assert!(store.followed_ids().unwrap().contains(&42));
        assert!(!store.toggle_follow(42).unwrap());
        assert!(store.followed_ids().unwrap().is_empty());
    }

    #[test]
    fn language_round_trips_and_defaults_to_none() {
        let store = FeedStore::open_in_memory().unwrap();
        assert_eq!(store.language().unwrap(), None);
        store.set_language(Lang::Fr).unwrap();
        store.set_language(Lang::De).unwrap();
        assert_eq!(store.language().unwrap(), Some(Lang::De));
    }
}
