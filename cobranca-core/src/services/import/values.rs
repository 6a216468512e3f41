//! Cell value normalization: Brazilian amounts, dates, day counts

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Parse an amount written in Brazilian convention.
///
/// A comma means comma decimals with dot thousands (`15.750,50`); without a
/// comma the text is read as a plain number (`8200`, `8200.5`). Anything
/// unparseable is zero.
pub fn parse_brl(input: &str) -> Decimal {
    let s = input.trim();
    if s.is_empty() {
        return Decimal::ZERO;
    }

    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = if cleaned.contains(',') {
        cleaned.replace('.', "").replacen(',', ".", 1)
    } else {
        cleaned
    };

    parse_number(&cleaned).unwrap_or(Decimal::ZERO)
}

/// Parse an explicit overdue-days cell. Fractions truncate toward zero;
/// negative or unparseable values count as zero.
pub fn parse_overdue_days(input: &str) -> u32 {
    let s = input.trim().replacen(',', ".", 1);
    if s.is_empty() {
        return 0;
    }
    parse_number(&s)
        .map(|d| d.trunc())
        .filter(|d| d.is_sign_positive())
        .and_then(|d| d.to_u32().or(Some(u32::MAX)))
        .unwrap_or(0)
}

fn parse_number(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn dmy_full() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})$").expect("valid regex"))
}

fn iso() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("valid regex"))
}

fn dmy_short() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{2})$").expect("valid regex"))
}

/// Parse a due date in one of the accepted spreadsheet formats:
/// `dd/mm/yyyy`, `dd-mm-yyyy`, `yyyy-mm-dd` and `dd/mm/yy`.
///
/// Two-digit years above 50 land in the 1900s, the rest in the 2000s.
/// Text that does not name a real calendar day yields `None`.
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(caps) = dmy_full().captures(s) {
        return ymd(&caps[3], &caps[2], &caps[1]);
    }

    if let Some(caps) = iso().captures(s) {
        return ymd(&caps[1], &caps[2], &caps[3]);
    }

    if let Some(caps) = dmy_short().captures(s) {
        let yy: i32 = caps[3].parse().ok()?;
        let year = if yy > 50 { 1900 + yy } else { 2000 + yy };
        return ymd(&year.to_string(), &caps[2], &caps[1]);
    }

    None
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Split a note-number cell into its sub-identifiers (`;`, `,` or `|`)
pub fn split_note_numbers(s: &str) -> Vec<String> {
    s.split([';', ',', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_brl() {
        assert_eq!(parse_brl("15.750,50"), Decimal::new(1575050, 2));
        assert_eq!(parse_brl("8200"), Decimal::new(8200, 0));
        assert_eq!(parse_brl(""), Decimal::ZERO);
        assert_eq!(parse_brl("  1 234,5 "), Decimal::new(12345, 1));
        assert_eq!(parse_brl("750.25"), Decimal::new(75025, 2));
    }

    #[test]
    fn test_parse_brl_garbage_is_zero() {
        assert_eq!(parse_brl("R$ 100"), Decimal::ZERO);
        assert_eq!(parse_brl("n/d"), Decimal::ZERO);
        assert_eq!(parse_brl("1,2,3"), Decimal::ZERO);
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_date("12/01/2026"), Some(date(2026, 1, 12)));
        assert_eq!(parse_date("12-01-2026"), Some(date(2026, 1, 12)));
        assert_eq!(parse_date("2026-01-12"), Some(date(2026, 1, 12)));
        assert_eq!(parse_date("2026-1-5"), Some(date(2026, 1, 5)));
        assert_eq!(parse_date("12/01/26"), Some(date(2026, 1, 12)));
    }

    #[test]
    fn test_two_digit_year_cutoff() {
        assert_eq!(parse_date("01/02/50"), Some(date(2050, 2, 1)));
        assert_eq!(parse_date("01/02/51"), Some(date(1951, 2, 1)));
    }

    #[test]
    fn test_invalid_dates() {
        assert_eq!(parse_date("99/99/9999"), None);
        assert_eq!(parse_date("31/02/2026"), None);
        assert_eq!(parse_date("2026/01/12"), None);
        assert_eq!(parse_date("amanhã"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_overdue_days() {
        assert_eq!(parse_overdue_days("12"), 12);
        assert_eq!(parse_overdue_days("3,9"), 3);
        assert_eq!(parse_overdue_days("-4"), 0);
        assert_eq!(parse_overdue_days(""), 0);
        assert_eq!(parse_overdue_days("doze"), 0);
    }

    #[test]
    fn test_split_note_numbers() {
        assert_eq!(split_note_numbers("DUP-001;DUP-002"), vec!["DUP-001", "DUP-002"]);
        assert_eq!(split_note_numbers("A | B,C"), vec!["A", "B", "C"]);
        assert!(split_note_numbers(" ; ").is_empty());
    }
}
