use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

/// Turns date text into a calendar date, or reports failure with `None`.
pub trait DateParser {
    fn parse(&self, text: &str) -> Option<NaiveDateTime>;
}

impl<F> DateParser for F
where
    F: Fn(&str) -> Option<NaiveDateTime>,
{
    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        self(text)
    }
}

/// Format-table parser covering the date styles list pages commonly use.
///
/// The whole (trimmed) input has to be a date; surrounding labels such as
/// `Posted:` make it fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormatDateParser;

const WORDY_FORMATS: &[&str] = &[
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
];

struct Patterns {
    year_first: Regex,
    year_last: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        year_first: Regex::new(
            r"^(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?(?:(?:\s+|T)(\d{1,2}):(\d{2})(?::(\d{2}))?)?$",
        )
        .expect("year-first pattern is valid"),
        year_last: Regex::new(
            r"^(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*[-/.日]\s*(\d{4})(?:\s+(\d{1,2}):(\d{2})(?::(\d{2}))?)?$",
        )
        .expect("year-last pattern is valid"),
    })
}

impl DateParser for FormatDateParser {
    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_local());
        }
        if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
            return Some(dt.naive_local());
        }

        let patterns = patterns();
        if let Some(caps) = patterns.year_first.captures(text) {
            return from_captures(&caps, 1, 2, 3);
        }
        if let Some(caps) = patterns.year_last.captures(text) {
            return from_captures(&caps, 3, 1, 2);
        }

        WORDY_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

fn from_captures(caps: &Captures<'_>, year: usize, month: usize, day: usize) -> Option<NaiveDateTime> {
    let number = |index: usize| -> Option<u32> { caps.get(index)?.as_str().parse().ok() };

    let date = NaiveDate::from_ymd_opt(number(year)? as i32, number(month)?, number(day)?)?;
    let time = match (number(4), number(5)) {
        (Some(hour), Some(minute)) => NaiveTime::from_hms_opt(hour, minute, number(6).unwrap_or(0))?,
        _ => NaiveTime::from_hms_opt(0, 0, 0)?,
    };
    Some(date.and_time(time))
}
