use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("not an unsigned integer: {0:?}")]
    NotAnInteger(String),
    #[error("not a boolean: {0:?}")]
    NotABoolean(String),
    #[error("index must be at least 1")]
    ZeroIndex,
}

/// Remove one layer of wrapping double quotes. Never recurses.
pub fn strip_quotes(s: &str) -> &str {
    let s = s.trim();
    if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Plain decimal digits only: no sign, no separators.
pub fn parse_uint(s: &str) -> Result<u32, FieldError> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::NotAnInteger(s.to_string()));
    }
    s.parse().map_err(|_| FieldError::NotAnInteger(s.to_string()))
}

/// Surah / ayah / page numbers, which start at 1.
pub fn parse_index(s: &str) -> Result<u32, FieldError> {
    match parse_uint(s)? {
        0 => Err(FieldError::ZeroIndex),
        n => Ok(n),
    }
}

pub fn parse_bool(s: &str) -> Result<bool, FieldError> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if s.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(FieldError::NotABoolean(s.to_string()))
    }
}

/// Empty means absent for optional text fields.
pub fn optional(s: &str) -> Option<String> {
    let s = strip_quotes(s);
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Value part of a `key: value` line, unquoted.
pub fn value_after_colon(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, v)| strip_quotes(v))
}

pub fn is_slug(s: &str) -> bool {
    SLUG_RE.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_one_layer() {
        assert_eq!(strip_quotes("\"In the name of Allah\""), "In the name of Allah");
        assert_eq!(strip_quotes("\"\"nested\"\""), "\"nested\"");
        assert_eq!(strip_quotes("  \"padded\"  "), "padded");
        assert_eq!(strip_quotes("bare"), "bare");
        assert_eq!(strip_quotes("\""), "\"");
        assert_eq!(strip_quotes("\"\""), "");
    }

    #[test]
    fn unsigned_integers() {
        assert_eq!(parse_uint("114"), Ok(114));
        assert_eq!(parse_uint(" 7 "), Ok(7));
        assert!(parse_uint("+1").is_err());
        assert!(parse_uint("-1").is_err());
        assert!(parse_uint("1,000").is_err());
        assert!(parse_uint("").is_err());
        assert!(parse_uint("99999999999").is_err());
    }

    #[test]
    fn indexes_reject_zero() {
        assert_eq!(parse_index("0"), Err(FieldError::ZeroIndex));
        assert_eq!(parse_index("1"), Ok(1));
    }

    #[test]
    fn booleans() {
        assert_eq!(parse_bool("true"), Ok(true));
        assert_eq!(parse_bool("FALSE"), Ok(false));
        assert_eq!(parse_bool("True "), Ok(true));
        assert!(parse_bool("yes").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn empty_is_absent() {
        assert_eq!(optional(""), None);
        assert_eq!(optional("\"\""), None);
        assert_eq!(optional("murattal"), Some("murattal".to_string()));
    }

    #[test]
    fn colon_values() {
        assert_eq!(value_after_colon("name: Al-Fatihah"), Some("Al-Fatihah"));
        assert_eq!(value_after_colon("note: \"a: b\""), Some("a: b"));
        assert_eq!(value_after_colon("no colon"), None);
    }

    #[test]
    fn slugs() {
        assert!(is_slug("eng-sahihinternational"));
        assert!(is_slug("ara_jalalayn.v2"));
        assert!(!is_slug("version: 1"));
        assert!(!is_slug("../escape"));
        assert!(!is_slug(""));
    }
}
