//! Quoting rules shared by the parser and canonical rendering.

use crate::spec::lexer::cached_regex;
use regex::Regex;
use std::sync::OnceLock;

/// Values matching this can be rendered without quotes.
const NO_QUOTES_NEEDED: &str = r"^[a-zA-Z0-9,/_.\-]+$";

/// Splits `name=value` on the first `=` after a valid variant name.
const SPLIT_KVP: &str = r"(?s)^([a-zA-Z_0-9][a-zA-Z_0-9\-.]*)=(.*)$";

/// Split a `name=value` string into its parts.
pub fn split_kvp(text: &str) -> Result<Option<(String, String)>, regex::Error> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = cached_regex(&RE, SPLIT_KVP)?;
    Ok(re.captures(text).and_then(|caps| {
        let name = caps.get(1)?.as_str().to_string();
        let value = caps.get(2)?.as_str().to_string();
        Some((name, value))
    }))
}

/// Quote the value of a `name=value` argument if it needs it.
///
/// The shell strips quotes from CLI arguments, so an argument that starts
/// with `name=` is assumed to carry the whole rest of the argument as its
/// value and is re-quoted before the joined text is tokenized.
pub fn quote_kvp(text: &str) -> Result<String, regex::Error> {
    match split_kvp(text)? {
        Some((key, value)) => Ok(format!("{}={}", key, quote_if_needed(&value)?)),
        None => Ok(text.to_string()),
    }
}

/// Remove surrounding single or double quotes and unescape inner quotes.
///
/// Double-quoted values are decoded as JSON strings, mirroring
/// [`quote_if_needed`]; text that is not valid JSON only has `\"` undone.
pub fn strip_quotes_and_unescape(text: &str) -> String {
    let mut chars = text.chars();
    let (Some(first), Some(last)) = (chars.next(), chars.next_back()) else {
        return text.to_string();
    };
    if (first != '\'' && first != '"') || first != last {
        return text.to_string();
    }

    if first == '"' {
        if let Ok(decoded) = serde_json::from_str::<String>(text) {
            return decoded;
        }
    }

    let inner = &text[1..text.len() - 1];
    inner.replace(&format!("\\{first}"), &first.to_string())
}

/// Add quotes around `value` unless it is made only of safe characters.
///
/// Single quotes are used by default; values containing a single quote are
/// rendered as a JSON string instead.
pub fn quote_if_needed(value: &str) -> Result<String, regex::Error> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if cached_regex(&RE, NO_QUOTES_NEEDED)?.is_match(value) {
        return Ok(value.to_string());
    }
    if value.contains('\'') {
        // Serializing a &str cannot fail.
        return Ok(serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\"")));
    }
    Ok(format!("'{value}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn safe_values_stay_bare() {
        assert_eq!(quote_if_needed("-Wl,a,b,c").unwrap(), "-Wl,a,b,c");
        assert_eq!(quote_if_needed("11-8-0").unwrap(), "11-8-0");
    }

    #[test]
    fn unsafe_values_are_quoted() {
        assert_eq!(quote_if_needed("a=b=c").unwrap(), "'a=b=c'");
        assert_eq!(quote_if_needed("").unwrap(), "''");
        assert_eq!(
            quote_if_needed("'-O3 -g' +bar baz").unwrap(),
            r#""'-O3 -g' +bar baz""#
        );
    }

    #[test]
    fn strip_quotes() {
        assert_eq!(strip_quotes_and_unescape("'-O3 -g'"), "-O3 -g");
        assert_eq!(strip_quotes_and_unescape(r#""a \"b\"""#), r#"a "b""#);
        assert_eq!(strip_quotes_and_unescape("'mismatched\""), "'mismatched\"");
        assert_eq!(strip_quotes_and_unescape("'"), "'");
        assert_eq!(strip_quotes_and_unescape("plain"), "plain");
    }

    #[test]
    fn double_quoted_values_decode_as_json() {
        assert_eq!(strip_quotes_and_unescape(r#""it's a\\b""#), r"it's a\b");
        assert_eq!(strip_quotes_and_unescape(r#""tab\there""#), "tab\there");
        assert_eq!(strip_quotes_and_unescape(r#""bad \q""#), r"bad \q");

        for value in [r"it's a\b", "it's \"quoted\"", "it's\ttabbed"] {
            let quoted = quote_if_needed(value).unwrap();
            assert_eq!(strip_quotes_and_unescape(&quoted), value, "{quoted}");
        }
    }

    #[test]
    fn kvp_requoting() {
        assert_eq!(quote_kvp("cflags=-O3 -g").unwrap(), "cflags='-O3 -g'");
        assert_eq!(quote_kvp("cflags==-O3 -g").unwrap(), "cflags='=-O3 -g'");
        assert_eq!(quote_kvp("+bar").unwrap(), "+bar");
        assert_eq!(quote_kvp(" cflags=-O3").unwrap(), " cflags=-O3");
    }
}
