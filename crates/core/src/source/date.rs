//! Publish date parsing for scraped and API dates.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex_lite::Regex;

static NUMERIC_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").expect("valid regex"));

static TEXT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})\s+([^\s\d.,]+)\s+(\d{4})").expect("valid regex"));

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid regex"));

/// Parse the first date found in `text`.
///
/// Accepts `22.02.2026`, `22 февраля 2026` (genitive month names) and
/// `2026-02-22`. Returns `None` when nothing recognisable is present.
pub fn parse_publish_date(text: &str) -> Option<NaiveDate> {
    if let Some(caps) = NUMERIC_DATE.captures(text) {
        return ymd(&caps[3], &caps[2], &caps[1]);
    }

    if let Some(caps) = TEXT_DATE.captures(text) {
        let month = russian_month(&caps[2])?;
        let year = caps[3].parse().ok()?;
        let day = caps[1].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = ISO_DATE.captures(text) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    None
}

/// True when `text` parses to a date strictly before `min_date`.
///
/// Missing or unparseable dates are never "before": such lots are kept.
pub fn is_before(text: Option<&str>, min_date: NaiveDate) -> bool {
    text.and_then(parse_publish_date)
        .is_some_and(|date| date < min_date)
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn russian_month(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "января" => 1,
        "февраля" => 2,
        "марта" => 3,
        "апреля" => 4,
        "мая" => 5,
        "июня" => 6,
        "июля" => 7,
        "августа" => 8,
        "сентября" => 9,
        "октября" => 10,
        "ноября" => 11,
        "декабря" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_numeric_date() {
        assert_eq!(parse_publish_date("22.02.2026"), Some(date(2026, 2, 22)));
        assert_eq!(
            parse_publish_date("Опубликовано: 03.11.2025 14:05"),
            Some(date(2025, 11, 3))
        );
    }

    #[test]
    fn test_russian_month_date() {
        assert_eq!(
            parse_publish_date("22 февраля 2026"),
            Some(date(2026, 2, 22))
        );
        assert_eq!(
            parse_publish_date("дата публикации 1 Декабря 2025 г."),
            Some(date(2025, 12, 1))
        );
    }

    #[test]
    fn test_iso_date() {
        assert_eq!(
            parse_publish_date("2026-03-01T10:00:00"),
            Some(date(2026, 3, 1))
        );
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_publish_date(""), None);
        assert_eq!(parse_publish_date("вчера"), None);
        assert_eq!(parse_publish_date("22 smarch 2026"), None);
        assert_eq!(parse_publish_date("31.02.2026"), None);
    }

    #[test]
    fn test_is_before() {
        let min = date(2026, 2, 22);
        assert!(is_before(Some("21.02.2026"), min));
        assert!(!is_before(Some("22.02.2026"), min));
        assert!(!is_before(Some("не указана"), min));
        assert!(!is_before(None, min));
    }
}
