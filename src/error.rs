//! Error kinds raised by the spec core.
//!
//! The core never recovers from these; they propagate to the caller, and the
//! CLI layer wraps them in `anyhow` context before printing.

use crate::spec::lexer::{TokenKind, TokenSpan};
use std::fmt;

/// Errors raised while parsing, comparing or concretizing specs.
#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error(transparent)]
    Tokenization(#[from] TokenizationError),

    #[error("cannot specify variant '{name}' twice")]
    DuplicateVariant { name: String },

    #[error("{values:?} are not valid values for variant '{variant}' of {owner}")]
    InvalidValues {
        owner: String,
        variant: String,
        values: Vec<String>,
    },

    #[error("variant '{variant}' of {owner} takes a single value, got {count}")]
    MultipleValues {
        owner: String,
        variant: String,
        count: usize,
    },

    #[error("invalid combination of values for variant '{variant}' of {owner}: {message}")]
    GroupValidation {
        owner: String,
        variant: String,
        message: String,
    },

    #[error("{variant} is not a valid variant of {spec}")]
    UnknownVariant { variant: String, spec: String },

    #[error("variant '{variant}' of {spec} requires '{condition}', which cannot be met")]
    UnmetCondition {
        variant: String,
        spec: String,
        condition: String,
    },

    #[error("cannot concretize anonymous spec '{spec}'")]
    AnonymousSpec { spec: String },

    #[error("concrete spec {spec} is immutable: cannot set {field}")]
    Immutable { spec: String, field: &'static str },

    #[error("cannot constrain {field} of '{spec}' with '{other}'")]
    ConflictingConstraint {
        spec: String,
        other: String,
        field: &'static str,
    },

    #[error("no repository provides '{name}'")]
    UnknownSpecType { name: String },

    #[error("'{name}' is ambiguous: provided by namespaces {namespaces:?}")]
    AmbiguousSpecType { name: String, namespaces: Vec<String> },

    #[error("namespace '{namespace}' does not provide '{name}'")]
    UnknownNamespace { namespace: String, name: String },

    #[error("'{text}' does not parse to exactly one spec (got {count})")]
    NotASingleSpec { text: String, count: usize },

    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error("spec grammar failed to compile: {0}")]
    Grammar(#[from] regex::Error),
}

/// Malformed declarations, reported against the owning spec type.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    #[error("invalid variant name in {owner}: '{name}'")]
    InvalidName { owner: String, name: String },

    #[error("{reason} [{owner}, variant '{name}']")]
    MissingDefault {
        owner: String,
        name: String,
        reason: &'static str,
    },

    #[error(
        "remove specification of {argument} argument: it is handled by an attribute of the \
         'values' argument [{owner}, variant '{name}']"
    )]
    ConflictingArgument {
        owner: String,
        name: String,
        argument: &'static str,
    },

    #[error("invalid 'when' condition [{owner}, variant '{name}']: {source}")]
    InvalidCondition {
        owner: String,
        name: String,
        #[source]
        source: Box<SpecError>,
    },

    #[error("directive '{directive}' must name at least one dictionary")]
    NoDictionaries { directive: String },

    #[error("directive '{directive}' targets unknown dictionary '{dict}'")]
    UnknownDictionary { directive: String, dict: String },

    #[error("no default arguments to pop in {owner}")]
    EmptyDefaultStack { owner: String },

    #[error("directive '{directive}' failed on {owner}: {message}")]
    Failed {
        owner: String,
        directive: String,
        message: String,
    },
}

/// Syntax error in a spec string: some prefix could not be covered by tokens.
#[derive(Debug, Clone)]
pub struct TokenizationError {
    pub text: String,
    /// Analysis of the whole text: valid tokens plus `Unexpected` runs.
    pub spans: Vec<TokenSpan>,
}

impl TokenizationError {
    pub fn new(text: impl Into<String>, spans: Vec<TokenSpan>) -> Self {
        Self {
            text: text.into(),
            spans,
        }
    }

    /// The offending substrings, in order of appearance.
    pub fn unexpected(&self) -> Vec<&str> {
        self.spans
            .iter()
            .filter(|s| s.kind == TokenKind::Unexpected)
            .filter_map(|s| self.text.get(s.start..s.end))
            .collect()
    }

    /// Line of `^` under each unexpected span, blanks under everything else.
    pub fn underline(&self) -> String {
        let mut line = String::new();
        for span in &self.spans {
            let width = self
                .text
                .get(span.start..span.end)
                .map(|s| s.chars().count())
                .unwrap_or(0);
            let mark = if span.kind == TokenKind::Unexpected {
                '^'
            } else {
                ' '
            };
            line.extend(std::iter::repeat_n(mark, width));
        }
        line
    }
}

impl fmt::Display for TokenizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unexpected tokens in the spec string\n{}\n{}",
            self.text,
            self.underline()
        )
    }
}

impl std::error::Error for TokenizationError {}
