//! Free-text date and time interpretation.
//!
//! Listing sites print dates however they like ("Mon, Jan 15, 2024",
//! "15/01/2024", "Tomorrow", "Sat, Nov 2 • 7:00 PM"). [`parse_date`] tries, in
//! order: explicit layouts, relative-day words, month+day with the current year
//! appended, and finally a free-form scan. `None` means the record is dropped.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

use super::clean_text;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("sunday", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
];

const DEFAULT_TIME: &str = "00:00";

#[derive(Clone, Copy, Debug)]
enum Layout {
    WeekdayMonthDayYear,
    MonthDayYear,
    DayMonthYear,
    NumericDayMonthYear,
    NumericYearMonthDay,
}

static PATTERNS: Lazy<Vec<(Layout, Regex)>> = Lazy::new(|| {
    [
        (
            Layout::WeekdayMonthDayYear,
            r"([A-Za-z]+),?\s+([A-Za-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})",
        ),
        (
            Layout::MonthDayYear,
            r"([A-Za-z]+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})",
        ),
        (
            Layout::DayMonthYear,
            r"(\d{1,2})(?:st|nd|rd|th)?\s+([A-Za-z]+)\.?,?\s+(\d{4})",
        ),
        (Layout::NumericDayMonthYear, r"(\d{1,2})/(\d{1,2})/(\d{4})"),
        (Layout::NumericYearMonthDay, r"(\d{4})-(\d{1,2})-(\d{1,2})"),
    ]
    .into_iter()
    .map(|(layout, pattern)| (layout, Regex::new(pattern).expect("valid date pattern")))
    .collect()
});

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*(AM|PM)").expect("valid time regex"));
static ANY_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d{1,2}(?::\d{2})?\s*(?:am|pm)\b|\b\d{1,2}:\d{2}\b").expect("time strip")
});
static ORDINAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)(?:st|nd|rd|th)\b").expect("ordinal regex"));

/// Interprets `input` relative to `today` (the serving region's current date).
pub fn parse_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = clean_text(input);
    if cleaned.is_empty() {
        return None;
    }

    explicit_layout(&cleaned)
        .or_else(|| relative_day(&cleaned, today))
        .or_else(|| with_current_year(&cleaned, today))
        .or_else(|| free_form(&cleaned))
}

/// First `H:MM AM/PM` token in `input`, verbatim, or `"00:00"`.
pub fn extract_time(input: &str) -> String {
    TIME_RE
        .find(input)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_TIME.to_string())
}

/// Month number for a name, judged on its first three letters.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.trim().to_lowercase();
    if lower.len() < 3 || !lower.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let prefix = &lower[..3];
    MONTHS
        .iter()
        .position(|month| month.starts_with(prefix))
        .map(|idx| idx as u32 + 1)
}

fn explicit_layout(text: &str) -> Option<NaiveDate> {
    for (layout, pattern) in PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let field = |idx: usize| caps.get(idx).map(|m| m.as_str()).unwrap_or_default();
            let resolved = match layout {
                Layout::WeekdayMonthDayYear => {
                    ymd(field(4), month_from_name(field(2)), field(3))
                }
                Layout::MonthDayYear => ymd(field(3), month_from_name(field(1)), field(2)),
                Layout::DayMonthYear => ymd(field(3), month_from_name(field(2)), field(1)),
                Layout::NumericDayMonthYear => ymd(field(3), field(2).parse().ok(), field(1)),
                Layout::NumericYearMonthDay => ymd(field(1), field(2).parse().ok(), field(3)),
            };
            if resolved.is_some() {
                return resolved;
            }
        }
    }
    None
}

fn ymd(year: &str, month: Option<u32>, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month?, day.parse().ok()?)
}

fn relative_day(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let lower = text.to_lowercase();
    let words = tokens(&lower);

    if words.iter().any(|w| w == "today" || w == "tonight") {
        return Some(today);
    }
    if words.iter().any(|w| w == "tomorrow") {
        return today.checked_add_signed(Duration::days(1));
    }
    // "Saturday, Nov 2" names its date; the weekday is decoration there.
    if words.iter().any(|w| is_month_word(w)) {
        return None;
    }

    WEEKDAYS
        .iter()
        .find(|(name, _)| lower.contains(name))
        .and_then(|(_, weekday)| next_on_or_after(today, *weekday))
}

fn next_on_or_after(today: NaiveDate, target: Weekday) -> Option<NaiveDate> {
    let ahead = (7 + target.num_days_from_monday() as i64
        - today.weekday().num_days_from_monday() as i64)
        % 7;
    today.checked_add_signed(Duration::days(ahead))
}

fn with_current_year(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let words = date_words(text);
    if year_token(&words).is_some() {
        return None;
    }
    let (month, day) = month_day(&words)?;
    let candidate = rolling_ymd(today.year(), month, day)?;
    if candidate < today {
        rolling_ymd(today.year() + 1, candidate.month(), candidate.day())
    } else {
        Some(candidate)
    }
}

/// Like `from_ymd_opt`, but a day past the end of the month carries into the
/// next one ("Feb 29" in a common year is March 1).
fn rolling_ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_signed(Duration::days(i64::from(day) - 1))
}

fn free_form(text: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text.trim()) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text.trim()) {
        return Some(dt.date_naive());
    }
    let words = date_words(text);
    let year = year_token(&words)?;
    let (month, day) = month_day(&words)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Lower-cased words with times, ordinals and punctuation removed.
fn date_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let without_times = ANY_TIME_RE.replace_all(&lower, " ");
    let without_ordinals = ORDINAL_RE.replace_all(&without_times, "$1");
    tokens(&without_ordinals)
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_month_word(word: &str) -> bool {
    word.len() >= 3
        && MONTHS
            .iter()
            .any(|month| month.starts_with(word) || (word == "sept" && *month == "september"))
}

fn month_day(words: &[String]) -> Option<(u32, u32)> {
    let as_day = |w: &String| -> Option<u32> {
        if w.len() <= 2 {
            w.parse().ok().filter(|d| (1..=31).contains(d))
        } else {
            None
        }
    };

    for (idx, word) in words.iter().enumerate() {
        if !is_month_word(word) {
            continue;
        }
        let month = month_from_name(word)?;
        if let Some(day) = words.get(idx + 1).and_then(as_day) {
            return Some((month, day));
        }
        if let Some(day) = idx.checked_sub(1).and_then(|i| words.get(i)).and_then(as_day) {
            return Some((month, day));
        }
    }
    None
}

fn year_token(words: &[String]) -> Option<i32> {
    words
        .iter()
        .filter(|w| w.len() == 4)
        .filter_map(|w| w.parse::<i32>().ok())
        .find(|year| (1900..=2100).contains(year))
}
