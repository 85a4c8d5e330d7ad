use std::path::PathBuf;

use matchday_feed::i18n::{Lang, Labels};

const KEYS: [&str; 17] = [
    "status_halftime",
    "status_finished",
    "status_not_started",
    "loading_matches",
    "api_error_message",
    "matches_loading_error",
    "no_matches",
    "no_live_matches",
    "no_matches_today",
    "show_lineup",
    "hide_lineup",
    "substitutes",
    "read_more",
    "save_article",
    "unsave_article",
    "news_loading_error",
    "no_saved_articles",
];

fn locales_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("locales")
}

#[test]
fn shipped_files_cover_every_key() {
    let dir = locales_dir();
    for lang in Lang::ALL {
        let raw = std::fs::read_to_string(dir.join(format!("{}.json", lang.code()))).unwrap();
        let map: std::collections::HashMap<String, String> = serde_json::from_str(&raw).unwrap();
        for key in KEYS {
            assert!(map.contains_key(key), "{} missing {key}", lang.code());
        }
    }
}

#[test]
fn load_reads_language_file() {
    let labels = Labels::load(Some(locales_dir().as_path()), Lang::Fr);
    assert_eq!(labels.lang(), Lang::Fr);
    assert_eq!(labels.get("status_halftime"), "Mi-temps");
}

#[test]
fn missing_file_falls_back_to_arabic_file_then_builtin() {
    let dir = std::env::temp_dir().join(format!("matchday_feed-locales-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("ar.json"), r#"{"status_finished": "FIN"}"#).unwrap();

    let labels = Labels::load(Some(dir.as_path()), Lang::Es);
    assert_eq!(labels.get("status_finished"), "FIN");
    assert_eq!(labels.get("status_halftime"), "Half-time");

    let _ = std::fs::remove_dir_all(&dir);
}
