//! Recursive-descent parser over the token stream.
//!
//! A spec is an optional name token followed by any number of variant
//! tokens. A name token after at least one consumed token starts the next
//! spec, so `"a +x b ~y"` parses as two specs.

use crate::error::SpecError;
use crate::spec::lexer::{Lexer, Token, TokenKind};
use crate::spec::model::{Spec, SpecLike};
use crate::spec::quote::{quote_kvp, split_kvp, strip_quotes_and_unescape};
use tracing::debug;

pub struct SpecParser {
    literal: String,
    tokens: Vec<Token>,
    pos: usize,
}

impl SpecParser {
    /// Tokenize `text` up front; a lexing failure is reported here.
    pub fn new(text: &str) -> Result<Self, SpecError> {
        let tokens = Lexer::shared()?
            .tokenize(text)?
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .collect();

        Ok(Self {
            literal: text.to_string(),
            tokens,
            pos: 0,
        })
    }

    /// Parse a command line split by the shell.
    ///
    /// Arguments of the form `name=value` lost their quotes on the way in,
    /// so the value is re-quoted before the arguments are joined.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, SpecError> {
        let quoted = args
            .iter()
            .map(|arg| quote_kvp(arg.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(&quoted.join(" "))
    }

    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Non-whitespace tokens in source order.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Parse the next spec, or `None` once the input is exhausted.
    pub fn next_spec(&mut self) -> Result<Option<Spec>, SpecError> {
        let Some(first) = self.peek() else {
            return Ok(None);
        };

        let mut spec = Spec::new();
        match first.kind {
            TokenKind::FullyQualifiedName => {
                let (namespace, name) = first
                    .value
                    .rsplit_once('.')
                    .unwrap_or(("", first.value.as_str()));
                spec.set_namespace(namespace)?;
                spec.set_name(name)?;
                self.pos += 1;
            }
            TokenKind::UnqualifiedName => {
                spec.set_name(&first.value)?;
                self.pos += 1;
            }
            _ => {}
        }

        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::BoolVariant => {
                    let name = token.value[1..].trim();
                    let value = if token.value.starts_with('+') {
                        "true"
                    } else {
                        "false"
                    };
                    spec.variants_mut().insert_one(name, value)?;
                }
                TokenKind::KeyValuePair => {
                    let Some((name, raw)) = split_kvp(&token.value)? else {
                        break;
                    };
                    let value = strip_quotes_and_unescape(&raw);
                    spec.variants_mut().insert(name, value.split(','))?;
                }
                _ => break,
            }
            self.pos += 1;
        }

        debug!(spec = %spec, "parsed spec");
        Ok(Some(spec))
    }

    /// Parse every spec remaining in the input.
    pub fn all_specs(&mut self) -> Result<Vec<Spec>, SpecError> {
        let mut specs = Vec::new();
        while let Some(spec) = self.next_spec()? {
            specs.push(spec);
        }
        Ok(specs)
    }
}

/// First spec in `text`, if any.
pub fn parse_one(text: &str) -> Result<Option<Spec>, SpecError> {
    SpecParser::new(text)?.next_spec()
}

/// Every spec in `text`.
pub fn parse_all(text: &str) -> Result<Vec<Spec>, SpecError> {
    SpecParser::new(text)?.all_specs()
}
