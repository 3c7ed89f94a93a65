//! An interactive calculator over arbitrary-precision literals.
//!
//! Text is scanned by [`lex::Lexer`], assembled into a precedence-correct
//! [`parse::Expr`] by [`parse::Parser`], and reduced to a [`value::Literal`]
//! by [`eval::Evaluator`]. [`session::Session`] ties the pieces into a
//! line-oriented REPL.

pub mod duration;
pub mod error;
pub mod eval;
pub mod lex;
pub mod parse;
pub mod session;
pub mod value;

pub use error::{Error, EvalError};
pub use eval::{Evaluator, evaluate, evaluate_to_text};
pub use lex::{Lexer, TokenBuffer, TokenSource};
pub use parse::{Expr, Parsed, Parser};
pub use session::{Session, SessionConfig};
pub use value::Literal;
