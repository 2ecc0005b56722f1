//! French date phrases ("le 1er janvier 1873", "vers 1850", "entre 1870 et
//! 1875") to GEDCOM 5.5 date values.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{3,4})").unwrap());

const MONTHS: [(&str, u32); 15] = [
    ("janvier", 1),
    ("février", 2),
    ("fevrier", 2),
    ("mars", 3),
    ("avril", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("août", 8),
    ("aout", 8),
    ("septembre", 9),
    ("octobre", 10),
    ("novembre", 11),
    ("décembre", 12),
    ("decembre", 12),
];

/// Single-token qualifiers. "à propos" spans two tokens and is handled apart.
const PREFIXES: [(&str, &str); 5] = [
    ("ca", "ABT"),
    ("vers", "ABT"),
    ("estimé", "EST"),
    ("après", "AFT"),
    ("avant", "BEF"),
];

/// Parse a whitespace-separated phrase. See [`parse`].
pub fn parse_phrase(phrase: &str) -> Option<String> {
    let tokens: Vec<&str> = phrase.split_whitespace().collect();
    parse(&tokens)
}

/// Parse date tokens into a GEDCOM date, or `None` when they make no sense.
/// An unparsable, non-empty phrase is logged once.
pub fn parse(tokens: &[&str]) -> Option<String> {
    let cleaned: Vec<String> = tokens
        .iter()
        .map(|t| clean_token(t))
        .filter(|t| !t.is_empty())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let refs: Vec<&str> = cleaned.iter().map(String::as_str).collect();
    let parsed = parse_tokens(&refs);
    if parsed.is_none() {
        warn!("Unable to parse date \"{}\"", tokens.join(" "));
    }
    parsed
}

fn clean_token(token: &str) -> String {
    token
        .trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '(' | ')'))
        .to_lowercase()
}

fn parse_tokens(tokens: &[&str]) -> Option<String> {
    match tokens {
        [] => None,
        [only] if only.chars().all(|c| c.is_ascii_digit()) => {
            Some(only.chars().take(4).collect())
        }
        ["en", year, ..] if YEAR_RE.is_match(year) => year_only(year),
        ["en", rest @ ..] => parse_tokens(rest),
        ["entre", rest @ ..] => {
            let split = rest.iter().position(|t| *t == "et")?;
            let from = parse_tokens(&rest[..split])?;
            let to = parse_tokens(&rest[split + 1..])?;
            Some(format!("BET {} AND {}", from, to))
        }
        ["à", "propos", rest @ ..] => qualified("ABT", rest),
        [first, rest @ ..] if prefix(first).is_some() => qualified(prefix(first)?, rest),
        ["le", rest @ ..] => parse_tokens(rest),
        _ => parse_calendar(tokens),
    }
}

fn prefix(token: &str) -> Option<&'static str> {
    PREFIXES
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, modifier)| *modifier)
}

fn qualified(modifier: &str, rest: &[&str]) -> Option<String> {
    parse_tokens(rest).map(|date| format!("{} {}", modifier, date))
}

fn year_only(token: &str) -> Option<String> {
    YEAR_RE.captures(token).map(|c| c[1].to_string())
}

fn month_number(token: &str) -> Option<u32> {
    MONTHS.iter().find(|(name, _)| *name == token).map(|(_, n)| *n)
}

fn day_number(token: &str) -> Option<u32> {
    let token = if token == "1er" { "1" } else { token };
    token.parse().ok()
}

fn parse_calendar(tokens: &[&str]) -> Option<String> {
    match tokens {
        [day, month, year] => {
            let day = day_number(day)?;
            let month = month_number(month).or_else(|| month.parse().ok())?;
            render(day, month, year)
        }
        [month, year] => {
            let month = month_number(month)?;
            let year = year_only(year)?;
            let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)?;
            Some(format!("{} {}", date.format("%b").to_string().to_uppercase(), year))
        }
        [numeric] => {
            let parts: Vec<&str> = numeric.split('/').collect();
            match parts.as_slice() {
                [day, month, year] => render(day.parse().ok()?, month.parse().ok()?, year),
                _ => None,
            }
        }
        _ => None,
    }
}

/// The year keeps its own digits: chrono's `%Y` would pad `873` to `0873`.
fn render(day: u32, month: u32, year: &str) -> Option<String> {
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year = year_only(year)?;
    let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month, day)?;
    Some(format!("{} {}", date.format("%d %b").to_string().to_uppercase(), year))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_date() {
        assert_eq!(parse(&["15", "janvier", "1873"]).as_deref(), Some("15 JAN 1873"));
        assert_eq!(parse(&["le", "3", "Août", "1901"]).as_deref(), Some("03 AUG 1901"));
        assert_eq!(parse(&["le", "1er", "décembre", "1850"]).as_deref(), Some("01 DEC 1850"));
    }

    #[test]
    fn year_only_forms() {
        assert_eq!(parse(&["1873"]).as_deref(), Some("1873"));
        assert_eq!(parse(&["18730"]).as_deref(), Some("1873"));
        assert_eq!(parse(&["en", "1873"]).as_deref(), Some("1873"));
    }

    #[test]
    fn qualifiers() {
        assert_eq!(parse(&["ca", "1873"]).as_deref(), Some("ABT 1873"));
        assert_eq!(parse(&["vers", "1873"]).as_deref(), Some("ABT 1873"));
        assert_eq!(parse(&["à", "propos", "1873"]).as_deref(), Some("ABT 1873"));
        assert_eq!(parse(&["estimé", "1873"]).as_deref(), Some("EST 1873"));
        assert_eq!(parse(&["après", "1873"]).as_deref(), Some("AFT 1873"));
        assert_eq!(parse(&["avant", "le", "2", "mars", "1873"]).as_deref(), Some("BEF 02 MAR 1873"));
    }

    /// GEDCOM 5.5 only has `BET x AND y` for ranges. `ABT x AND y` is not a
    /// valid date, so ranges never take the `ABT` form.
    #[test]
    fn between() {
        assert_eq!(
            parse(&["entre", "1870", "et", "1875"]).as_deref(),
            Some("BET 1870 AND 1875")
        );
        assert_eq!(
            parse(&["entre", "le", "1er", "mai", "1870", "et", "1875"]).as_deref(),
            Some("BET 01 MAY 1870 AND 1875")
        );
        assert_eq!(parse(&["entre", "1870"]), None);
    }

    #[test]
    fn numeric_month_fallback() {
        assert_eq!(parse(&["15", "01", "1873"]).as_deref(), Some("15 JAN 1873"));
        assert_eq!(parse(&["15/01/1873"]).as_deref(), Some("15 JAN 1873"));
    }

    #[test]
    fn three_digit_years_are_not_padded() {
        assert_eq!(parse(&["873"]).as_deref(), Some("873"));
        assert_eq!(parse(&["15", "janvier", "873"]).as_deref(), Some("15 JAN 873"));
        assert_eq!(parse(&["15/01/873"]).as_deref(), Some("15 JAN 873"));
        assert_eq!(parse(&["mars", "873"]).as_deref(), Some("MAR 873"));
        assert_eq!(parse(&["vers", "873"]).as_deref(), Some("ABT 873"));
    }

    #[test]
    fn month_and_year() {
        assert_eq!(parse(&["mars", "1873"]).as_deref(), Some("MAR 1873"));
        assert_eq!(parse(&["en", "mars", "1873"]).as_deref(), Some("MAR 1873"));
    }

    #[test]
    fn failures() {
        assert_eq!(parse(&[]), None);
        assert_eq!(parse(&["à", "une", "date", "inconnue"]), None);
        assert_eq!(parse(&["31", "février", "1873"]), None);
        assert_eq!(parse(&["le", "15", "brumaire", "an", "II"]), None);
    }

    #[test]
    fn trailing_punctuation() {
        assert_eq!(parse_phrase("le 15 janvier 1873,").as_deref(), Some("15 JAN 1873"));
        assert_eq!(parse_phrase("   "), None);
    }
}
