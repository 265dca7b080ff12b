//! Recognizes date-shaped text without parsing it.
//!
//! Two families are accepted: year first (`2024-03-01`, `2024/3/1`,
//! `2024年3月1日`) and year last (`3-1-2024`, `03/01/2024`, `3月1日2024`).

use std::sync::OnceLock;

use regex::Regex;

const DATE_PATTERN: &str =
    r"(\d{4}[-/年]\d{1,2}[-/月]\d{1,2})|(\d{1,2}[-/月]\d{1,2}[-/日]\d{4})";

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DATE_PATTERN).expect("date shape pattern is valid"))
}

pub fn matches(text: &str) -> bool {
    pattern().is_match(text)
}

/// The first date-shaped substring of `text`.
pub fn find_first_match(text: &str) -> Option<&str> {
    pattern().find(text).map(|m| m.as_str())
}

/// True when `text` contains any ASCII digit.
pub fn has_digit(text: &str) -> bool {
    text.bytes().any(|b| b.is_ascii_digit())
}
