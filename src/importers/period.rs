//! Period label normalization
//!
//! Period labels are free text typed by people ("Janeiro/2024", "2024-01",
//! "01/2024", "1T/2024"). They are stored verbatim; this module only derives
//! a chronological key for ordering.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})\s*[-/.]\s*(\d{1,2})$").expect("valid regex"));

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})\s*[-/.]\s*(\d{4})$").expect("valid regex"));

static QUARTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([1-4])\s*[o°]?\s*t(?:ri|rim|rimestre)?|t([1-4]))\.?\s*(?:[-/]|\s+de\s+|\s)\s*(\d{4})$")
        .expect("valid regex")
});

static NAMED_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z]+)\.?\s*(?:[-/]|\s+de\s+|\s)\s*(\d{4})$").expect("valid regex")
});

const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "marco",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Sort key used for labels that cannot be parsed, so they come first
pub fn epoch_sentinel() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Parse a period label into the first day of its month.
///
/// Quarter labels map to the first month of the quarter. Returns `None`
/// when no 4-digit year and month 1-12 can be found.
pub fn parse_period(label: &str) -> Option<NaiveDate> {
    let text = fold(label);
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = YEAR_MONTH.captures(&text) {
        return first_of_month(caps[1].parse().ok()?, caps[2].parse().ok()?);
    }

    if let Some(caps) = MONTH_YEAR.captures(&text) {
        return first_of_month(caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    if let Some(caps) = QUARTER.captures(&text) {
        let quarter: u32 = caps
            .get(1)
            .or_else(|| caps.get(2))
            .and_then(|m| m.as_str().parse().ok())?;
        return first_of_month(caps[3].parse().ok()?, (quarter - 1) * 3 + 1);
    }

    if let Some(caps) = NAMED_MONTH.captures(&text) {
        let month = month_from_name(&caps[1])?;
        return first_of_month(caps[2].parse().ok()?, month);
    }

    None
}

/// Chronological key for ordering; unparsable labels get the epoch sentinel
pub fn period_sort_key(label: &str) -> NaiveDate {
    parse_period(label).unwrap_or_else(epoch_sentinel)
}

/// Order two labels chronologically, falling back to the label text on ties
pub fn compare_periods(a: &str, b: &str) -> Ordering {
    period_sort_key(a)
        .cmp(&period_sort_key(b))
        .then_with(|| a.cmp(b))
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Full Portuguese month name or its three-letter abbreviation
fn month_from_name(name: &str) -> Option<u32> {
    MONTH_NAMES
        .iter()
        .position(|full| *full == name || (name.len() == 3 && full.starts_with(name)))
        .map(|idx| idx as u32 + 1)
}

/// Lowercase, strip accents, collapse whitespace
fn fold(label: &str) -> String {
    let stripped: String = label
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(year: i32, month: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    #[test]
    fn test_three_shapes_rank_equal() {
        let a = parse_period("Janeiro/2024");
        let b = parse_period("2024-01");
        let c = parse_period("01/2024");
        assert_eq!(a, ym(2024, 1));
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_month_names_with_accents_and_abbreviations() {
        assert_eq!(parse_period("Março/2023"), ym(2023, 3));
        assert_eq!(parse_period("marco/2023"), ym(2023, 3));
        assert_eq!(parse_period("DEZ/2022"), ym(2022, 12));
        assert_eq!(parse_period("fev. 2021"), ym(2021, 2));
        assert_eq!(parse_period("Setembro de 2020"), ym(2020, 9));
        assert_eq!(parse_period("  julho - 2019 "), ym(2019, 7));
    }

    #[test]
    fn test_numeric_variants() {
        assert_eq!(parse_period("2024/11"), ym(2024, 11));
        assert_eq!(parse_period("3-2024"), ym(2024, 3));
        assert_eq!(parse_period("13/2024"), None);
        assert_eq!(parse_period("2024-00"), None);
    }

    #[test]
    fn test_quarters_map_to_first_month() {
        assert_eq!(parse_period("1T/2024"), ym(2024, 1));
        assert_eq!(parse_period("2º Trimestre/2024"), ym(2024, 4));
        assert_eq!(parse_period("T3/2024"), ym(2024, 7));
        assert_eq!(parse_period("4 tri 2024"), ym(2024, 10));
        assert_eq!(parse_period("5T/2024"), None);
    }

    #[test]
    fn test_garbage_is_none() {
        assert_eq!(parse_period("garbage"), None);
        assert_eq!(parse_period(""), None);
        assert_eq!(parse_period("Janeiro"), None);
        assert_eq!(parse_period("Janeiro/24"), None);
        assert_eq!(parse_period("Foo/2024"), None);
    }

    #[test]
    fn test_unparsable_sorts_first() {
        let mut labels = vec!["2024-02", "garbage", "Janeiro/2024", "12/2023"];
        labels.sort_by(|a, b| compare_periods(a, b));
        assert_eq!(labels, vec!["garbage", "12/2023", "Janeiro/2024", "2024-02"]);
        assert_eq!(period_sort_key("garbage"), epoch_sentinel());
    }
}
