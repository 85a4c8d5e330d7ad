use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    Ar,
    En,
    Fr,
    Es,
    De,
    It,
    Pt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
}

pub const DEFAULT_LANG: Lang = Lang::Ar;

impl Lang {
    pub const ALL: [Lang; 7] = [
        Lang::Ar,
        Lang::En,
        Lang::Fr,
        Lang::Es,
        Lang::De,
        Lang::It,
        Lang::Pt,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ar" => Some(Self::Ar),
            "en" => Some(Self::En),
            "fr" => Some(Self::Fr),
            "es" => Some(Self::Es),
            "de" => Some(Self::De),
            "it" => Some(Self::It),
            "pt" => Some(Self::Pt),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
            Self::Fr => "fr",
            Self::Es => "es",
            Self::De => "de",
            Self::It => "it",
            Self::Pt => "pt",
        }
    }

    pub fn direction(self) -> TextDirection {
        match self {
            Self::Ar => TextDirection::Rtl,
            _ => TextDirection::Ltr,
        }
    }
}

/// Explicit choice first, then the stored preference, then Arabic.
pub fn resolve_lang(explicit: Option<&str>, stored: Option<Lang>) -> Lang {
    explicit
        .and_then(Lang::parse)
        .or(stored)
        .unwrap_or(DEFAULT_LANG)
}

const EN_LABELS: &[(&str, &str)] = &[
    ("status_halftime", "Half-time"),
    ("status_finished", "Finished"),
    ("status_not_started", "Not started"),
    ("loading_matches", "Loading matches..."),
    ("api_error_message", "Error from source: "),
    ("matches_loading_error", "An error occurred while loading matches."),
    ("no_matches", "No matches."),
    ("no_live_matches", "No live matches right now."),
    ("no_matches_today", "No matches today."),
    ("show_lineup", "Show lineup"),
    ("hide_lineup", "Hide lineup"),
    ("substitutes", "Substitutes"),
    ("read_more", "Read more"),
    ("save_article", "Save"),
    ("unsave_article", "Unsave"),
    ("news_loading_error", "An error occurred while loading news."),
    ("no_saved_articles", "You have no saved articles yet."),
];

const AR_LABELS: &[(&str, &str)] = &[
    ("status_halftime", "استراحة"),
    ("status_finished", "انتهت"),
    ("status_not_started", "لم تبدأ"),
    ("loading_matches", "جاري تحميل المباريات..."),
    ("api_error_message", "خطأ من المصدر: "),
    ("matches_loading_error", "حدث خطأ أثناء تحميل المباريات."),
    ("no_matches", "لا توجد مباريات."),
    ("no_live_matches", "لا توجد مباريات مباشرة حاليا."),
    ("no_matches_today", "لا توجد مباريات اليوم."),
    ("show_lineup", "عرض التشكيل"),
    ("hide_lineup", "إخفاء التشكيل"),
    ("substitutes", "البدلاء"),
    ("read_more", "اقرأ المزيد"),
    ("save_article", "حفظ"),
    ("unsave_article", "إلغاء الحفظ"),
    ("news_loading_error", "حدث خطأ أثناء تحميل الأخبار."),
    ("no_saved_articles", "ليس لديك مقالات محفوظة بعد."),
];

/// Translation strings for one language.
///
/// Lookups go through the loaded translation file first, then the built-in
/// table for the language, then the English table, and finally echo the key.
#[derive(Debug, Clone)]
pub struct Labels {
    lang: Lang,
    translations: HashMap<String, String>,
}

impl Labels {
    pub fn builtin(lang: Lang) -> Self {
        Self {
            lang,
            translations: HashMap::new(),
        }
    }

    /// Reads `{dir}/{lang}.json`, falling back to `ar.json` when that file is
    /// missing or broken.
    pub fn load(dir: Option<&Path>, lang: Lang) -> Self {
        let Some(dir) = dir else {
            return Self::builtin(lang);
        };
        match read_translations(dir, lang) {
            Some(translations) => Self { lang, translations },
            None => {
                warn!(lang = lang.code(), "translation file unavailable, using ar.json");
                let translations = read_translations(dir, Lang::Ar).unwrap_or_default();
                Self { lang, translations }
            }
        }
    }

    pub fn from_map(lang: Lang, translations: HashMap<String, String>) -> Self {
        Self { lang, translations }
    }

    pub fn lang(&self) -> Lang {
        self.lang
    }

    pub fn get<'a>(&'a self, key: &'a str) -> &'a str {
        if let Some(value) = self.translations.get(key) {
            return value;
        }
        let table = match self.lang {
            Lang::Ar => AR_LABELS,
            _ => EN_LABELS,
        };
        lookup(table, key)
            .or_else(|| lookup(EN_LABELS, key))
            .unwrap_or(key)
    }
}

fn lookup(table: &'static [(&'static str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn read_translations(dir: &Path, lang: Lang) -> Option<HashMap<String, String>> {
    let path = dir.join(format!("{}.json", lang.code()));
    let raw = fs::read_to_string(path).ok()?;
    serde_json::from_str::<HashMap<String, String>>(&raw).ok()
}

fn locale(lang: Lang) -> Locale {
    match lang {
        Lang::Ar => Locale::ar_EG,
        Lang::En => Locale::en_US,
        Lang::Fr => Locale::fr_FR,
        Lang::Es => Locale::es_ES,
        Lang::De => Locale::de_DE,
        Lang::It => Locale::it_IT,
        Lang::Pt => Locale::pt_BR,
    }
}

/// Kickoff clock in the viewer's offset: 12-hour for `en` and `ar`, 24-hour
/// elsewhere.
pub fn format_kickoff_time(kickoff: &DateTime<FixedOffset>, viewer: FixedOffset, lang: Lang) -> String {
    let pattern = match lang {
        Lang::En | Lang::Ar => "%I:%M %p",
        _ => "%H:%M",
    };
    viewer
        .from_utc_datetime(&kickoff.naive_utc())
        .format_localized(pattern, locale(lang))
        .to_string()
}

/// Card header date, e.g. `Saturday, November 9` or `samedi 9 novembre`.
pub fn format_match_date(kickoff: &DateTime<FixedOffset>, viewer: FixedOffset, lang: Lang) -> String {
    let pattern = match lang {
        Lang::En => "%A, %B %-d",
        Lang::Ar => "%A، %-d %B",
        _ => "%A %-d %B",
    };
    viewer
        .from_utc_datetime(&kickoff.naive_utc())
        .format_localized(pattern, locale(lang))
        .to_string()
}

/// Long date without weekday, used on news cards.
pub fn format_long_date(date: NaiveDate, lang: Lang) -> String {
    let pattern = match lang {
        Lang::En => "%B %-d, %Y",
        Lang::De => "%-d. %B %Y",
        Lang::Es | Lang::Pt => "%-d de %B de %Y",
        _ => "%-d %B %Y",
    };
    date.format_localized(pattern, locale(lang)).to_string()
}
