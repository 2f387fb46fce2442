//! Tokenizer for the spec grammar.
//!
//! All token kinds are joined into a single alternation regex in declaration
//! order. At each offset the scanner takes the match that starts exactly
//! there; the regex engine's leftmost-first semantics make earlier kinds win
//! ties, so `+debug-qt_4` is one boolean variant and `os=fe` is a key-value
//! pair rather than a name.
//!
//! Grammar:
//! `[namespace.]name [{+name | ~name | -name | name=value[,value...]}]*`

use crate::error::{SpecError, TokenizationError};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use tracing::trace;

/// Identifier for spec names and variant names.
pub const IDENTIFIER: &str = r"(?:[a-zA-Z_0-9][a-zA-Z_0-9\-]*)";
/// Namespace-qualified identifier, e.g. `builtin.saxpy`.
pub const DOTTED_IDENTIFIER: &str = r"(?:[a-zA-Z_0-9][a-zA-Z_0-9\-]*(?:\.[a-zA-Z_0-9][a-zA-Z_0-9\-]*)+)";
/// Variant name as it may appear on the left of `=` or after a sign.
pub const NAME: &str = r"[a-zA-Z_0-9][a-zA-Z_0-9\-.]*";
/// Values that can be written bare. Cannot start with `=`.
pub const VALUE: &str = r"(?:[a-zA-Z_0-9\-+\*.,:\~/\\][a-zA-Z_0-9\-+\*.,:=\~/\\]*)";
/// Single- or double-quoted value with backslash-escaped quotes inside.
pub const QUOTED_VALUE: &str = r#"(?:'(?:[^'\\]|\\(?s:.))*'|"(?:[^"\\]|\\(?s:.))*")"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    BoolVariant,
    KeyValuePair,
    FullyQualifiedName,
    UnqualifiedName,
    Whitespace,
    /// Only produced while analysing a text that failed to tokenize.
    Unexpected,
}

impl TokenKind {
    /// Valid kinds in precedence order.
    pub const VALID: [TokenKind; 5] = [
        TokenKind::BoolVariant,
        TokenKind::KeyValuePair,
        TokenKind::FullyQualifiedName,
        TokenKind::UnqualifiedName,
        TokenKind::Whitespace,
    ];

    fn group(self) -> &'static str {
        match self {
            TokenKind::BoolVariant => "BOOL_VARIANT",
            TokenKind::KeyValuePair => "KEY_VALUE_PAIR",
            TokenKind::FullyQualifiedName => "FULLY_QUALIFIED_SPEC_NAME",
            TokenKind::UnqualifiedName => "UNQUALIFIED_SPEC_NAME",
            TokenKind::Whitespace => "WS",
            TokenKind::Unexpected => "UNEXPECTED",
        }
    }

    pub fn regex(self) -> String {
        match self {
            TokenKind::BoolVariant => format!(r"(?:[~+-]\s*{NAME})"),
            TokenKind::KeyValuePair => format!(r"(?:{NAME}=(?:{VALUE}|{QUOTED_VALUE}))"),
            TokenKind::FullyQualifiedName => DOTTED_IDENTIFIER.to_string(),
            TokenKind::UnqualifiedName => IDENTIFIER.to_string(),
            TokenKind::Whitespace => r"(?:\s+)".to_string(),
            TokenKind::Unexpected => r"(?:.\s*)".to_string(),
        }
    }

    pub fn is_variant(self) -> bool {
        matches!(self, TokenKind::BoolVariant | TokenKind::KeyValuePair)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.group())
    }
}

/// Position of a token in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// A lexed token. Equality ignores offsets.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        let value = value.into();
        let end = value.len();
        Self {
            kind,
            value,
            start: 0,
            end,
        }
    }

    pub fn span(&self) -> TokenSpan {
        TokenSpan {
            kind: self.kind,
            start: self.start,
            end: self.end,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.value == other.value
    }
}

impl Eq for Token {}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.kind, self.value)
    }
}

/// Compiled scanning regexes.
#[derive(Debug, Clone)]
pub struct Lexer {
    all_tokens: Regex,
    analysis: Regex,
}

impl Lexer {
    pub fn new() -> Result<Self, regex::Error> {
        let valid: Vec<String> = TokenKind::VALID.iter().map(|k| named(*k)).collect();
        let all_tokens = Regex::new(&valid.join("|"))?;

        let mut with_errors = valid;
        with_errors.push(named(TokenKind::Unexpected));
        let analysis = Regex::new(&with_errors.join("|"))?;

        Ok(Self {
            all_tokens,
            analysis,
        })
    }

    /// Process-wide lexer, compiled on first use.
    pub fn shared() -> Result<&'static Lexer, regex::Error> {
        static SHARED: OnceLock<Lexer> = OnceLock::new();
        if let Some(lexer) = SHARED.get() {
            return Ok(lexer);
        }
        let lexer = Self::new()?;
        Ok(SHARED.get_or_init(|| lexer))
    }

    /// Tokenize `text`, whitespace included.
    ///
    /// Either the returned tokens cover the whole text or a
    /// `TokenizationError` is returned; there is no partial result.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>, TokenizationError> {
        let tokens = scan(&self.all_tokens, text, &TokenKind::VALID);
        let covered = tokens.last().map(|t| t.end).unwrap_or(0);

        if covered != text.len() {
            let spans = scan(&self.analysis, text, &ANALYSIS_KINDS)
                .iter()
                .map(Token::span)
                .collect();
            return Err(TokenizationError::new(text, spans));
        }

        trace!(text, tokens = tokens.len(), "tokenized spec string");
        Ok(tokens)
    }
}

const ANALYSIS_KINDS: [TokenKind; 6] = [
    TokenKind::BoolVariant,
    TokenKind::KeyValuePair,
    TokenKind::FullyQualifiedName,
    TokenKind::UnqualifiedName,
    TokenKind::Whitespace,
    TokenKind::Unexpected,
];

fn named(kind: TokenKind) -> String {
    format!("(?P<{}>{})", kind.group(), kind.regex())
}

/// Consume matches anchored at the current offset until none starts there.
fn scan(re: &Regex, text: &str, kinds: &[TokenKind]) -> Vec<Token> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        if whole.start() != pos || whole.end() == pos {
            break;
        }
        let Some(kind) = kinds.iter().copied().find(|k| caps.name(k.group()).is_some()) else {
            break;
        };

        out.push(Token {
            kind,
            value: whole.as_str().to_string(),
            start: whole.start(),
            end: whole.end(),
        });
        pos = whole.end();
    }

    out
}

/// Compile `pattern` into `cell` unless an earlier call already did.
pub(crate) fn cached_regex(
    cell: &'static OnceLock<Regex>,
    pattern: &str,
) -> Result<&'static Regex, regex::Error> {
    if let Some(re) = cell.get() {
        return Ok(re);
    }
    let re = Regex::new(pattern)?;
    Ok(cell.get_or_init(|| re))
}

pub fn tokenize(text: &str) -> Result<Vec<Token>, SpecError> {
    Ok(Lexer::shared()?.tokenize(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shared_lexer_is_compiled_once() {
        let a = Lexer::shared().unwrap();
        let b = Lexer::shared().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    fn kinds(text: &str) -> Vec<(TokenKind, String)> {
        tokenize(text)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(tokenize("").unwrap().is_empty());
    }

    #[test]
    fn names_and_variants() {
        assert_eq!(
            kinds("builtin.saxpy +debug ~mpi -qt programming_model=cuda"),
            vec![
                (TokenKind::FullyQualifiedName, "builtin.saxpy".to_string()),
                (TokenKind::BoolVariant, "+debug".to_string()),
                (TokenKind::BoolVariant, "~mpi".to_string()),
                (TokenKind::BoolVariant, "-qt".to_string()),
                (TokenKind::KeyValuePair, "programming_model=cuda".to_string()),
            ]
        );
    }

    #[test]
    fn sign_binds_greedily_to_dashed_names() {
        assert_eq!(
            kinds("_openmpi +debug-qt_4"),
            vec![
                (TokenKind::UnqualifiedName, "_openmpi".to_string()),
                (TokenKind::BoolVariant, "+debug-qt_4".to_string()),
            ]
        );
    }

    #[test]
    fn quoted_values_keep_spaces() {
        assert_eq!(
            kinds(r#"mvapich cppflags='-O3 -fPIC' x="a \"b\"""#),
            vec![
                (TokenKind::UnqualifiedName, "mvapich".to_string()),
                (TokenKind::KeyValuePair, "cppflags='-O3 -fPIC'".to_string()),
                (TokenKind::KeyValuePair, r#"x="a \"b\"""#.to_string()),
            ]
        );
    }

    #[test]
    fn tokens_cover_the_whole_text() {
        let text = "  y~f+e   os=fe ";
        let tokens = tokenize(text).unwrap();
        let joined: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(joined, text);
        assert_eq!(tokens.first().map(|t| t.start), Some(0));
        assert_eq!(tokens.last().map(|t| t.end), Some(text.len()));
    }

    #[test]
    fn residue_is_underlined() {
        let err = Lexer::new()
            .unwrap()
            .tokenize("cflags=''-Wl,a,b,c''")
            .unwrap_err();
        assert_eq!(err.underline(), "            ^ ^ ^ ^^");
        assert!(
            err.to_string()
                .contains("cflags=''-Wl,a,b,c''\n            ^ ^ ^ ^^")
        );
        assert_eq!(err.unexpected(), vec![",", ",", ",", "'", "'"]);
    }

    #[test]
    fn key_without_value_is_rejected() {
        assert!(tokenize(" ldflags= +pic").is_err());
        assert!(tokenize(r#"zlib "-g -O2""#).is_err());
    }
}
