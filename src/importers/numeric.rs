//! Lenient numeric cell parsing for human-maintained spreadsheets.
//!
//! Never fails: anything that does not read as a number becomes `None`,
//! which is stored as absence of data, not zero.

use calamine::Data;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Longest leading number of a normalized text ("1.2" out of "1.2,3")
static NUMERIC_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)").expect("valid regex"));

/// Parse a spreadsheet cell into a decimal
///
/// Text cells keep only digits, `,`, `.` and `-`. Brazilian formatting is
/// assumed: with a comma present, dots are thousands separators and the
/// first comma is the decimal point; without a comma, several dots are
/// also thousands separators. Trailing garbage after a leading number is
/// ignored.
pub fn parse_numeric_cell(cell: &Data) -> Option<Decimal> {
    match cell {
        Data::Int(i) => Some(Decimal::from(*i)),
        Data::Float(f) => float_to_decimal(*f),
        Data::String(s) => parse_numeric_text(s),
        Data::Bool(_)
        | Data::Empty
        | Data::Error(_)
        | Data::DateTime(_)
        | Data::DateTimeIso(_)
        | Data::DurationIso(_) => None,
    }
}

/// Text variant of [`parse_numeric_cell`], applied to string cells
pub fn parse_numeric_text(text: &str) -> Option<Decimal> {
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();

    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = if let Some(comma) = kept.find(',') {
        let (integer, fraction) = kept.split_at(comma);
        let mut integer = integer.replace('.', "");
        if integer.is_empty() || integer == "-" {
            integer.push('0');
        }
        // Only the first comma becomes the decimal point
        format!("{}.{}", integer, &fraction[1..])
    } else if kept.matches('.').count() > 1 {
        kept.replace('.', "")
    } else {
        kept
    };

    let prefix = NUMERIC_PREFIX.find(&normalized)?.as_str().trim_end_matches('.');
    let prefix = match prefix.strip_prefix('-') {
        Some(rest) if rest.starts_with('.') => format!("-0{}", rest),
        _ if prefix.starts_with('.') => format!("0{}", prefix),
        _ => prefix.to_string(),
    };
    Decimal::from_str(&prefix).ok()
}

fn float_to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    // Excel floats carry binary noise (0.1 + 0.2); keep spreadsheet precision
    Decimal::from_f64_retain(value).map(|d| d.round_dp(10).normalize())
}
