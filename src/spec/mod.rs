//! Spec strings: lexing, parsing and the abstract/concrete object model.

pub mod lexer;
pub mod model;
pub mod parser;
pub mod quote;

pub use lexer::{Token, TokenKind};
pub use model::{ConcreteSpec, Spec, SpecLike};
pub use parser::{SpecParser, parse_all, parse_one};
