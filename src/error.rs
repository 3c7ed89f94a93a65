use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::{lex::Position, value::Kind};

fn source(filename: Option<&str>, whole: &str) -> NamedSource<String> {
    NamedSource::new(filename.unwrap_or("<input>"), whole.to_string())
}

#[derive(Error, Debug, Diagnostic)]
#[error("{message} at {pos}")]
#[diagnostic(code(calc::parse))]
pub struct ParseError {
    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: SourceSpan,

    message: String,
    pub found: String,
    pub expected: Vec<String>,
    pub pos: Position,
}

impl ParseError {
    pub fn unexpected(
        filename: Option<&str>,
        whole: &str,
        found: &str,
        expected: &[&str],
        pos: Position,
        span: std::ops::Range<usize>,
    ) -> Self {
        let message = if expected.is_empty() {
            format!("unexpected `{found}`")
        } else {
            format!("found `{found}`, expected {}", expected.join(", "))
        };
        ParseError {
            src: source(filename, whole),
            span: span.into(),
            message,
            found: found.to_string(),
            expected: expected.iter().map(|e| e.to_string()).collect(),
            pos,
        }
    }

    pub fn line(&self) -> usize {
        self.pos.line + 1
    }

    pub fn column(&self) -> usize {
        self.pos.column + 1
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("malformed {kind} literal `{text}`: {reason} at {pos}")]
#[diagnostic(
    code(calc::malformed_literal),
    help("check the literal against the {kind} grammar")
)]
pub struct MalformedLiteral {
    #[source_code]
    src: NamedSource<String>,

    #[label("this {kind} literal")]
    span: SourceSpan,

    pub kind: Kind,
    pub text: String,
    pub reason: String,
    pub pos: Position,
}

impl MalformedLiteral {
    pub fn new(
        filename: Option<&str>,
        whole: &str,
        kind: Kind,
        text: &str,
        reason: impl ToString,
        pos: Position,
        span: std::ops::Range<usize>,
    ) -> Self {
        MalformedLiteral {
            src: source(filename, whole),
            span: span.into(),
            kind,
            text: text.to_string(),
            reason: reason.to_string(),
            pos,
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("{feature} are not implemented (found `{found}`) at {pos}")]
#[diagnostic(
    code(calc::not_implemented),
    help("only literals combined with operators can be evaluated")
)]
pub struct NotImplemented {
    #[source_code]
    src: NamedSource<String>,

    #[label("not supported yet")]
    span: SourceSpan,

    pub feature: &'static str,
    pub found: String,
    pub pos: Position,
}

impl NotImplemented {
    pub fn new(
        filename: Option<&str>,
        whole: &str,
        feature: &'static str,
        found: &str,
        pos: Position,
        span: std::ops::Range<usize>,
    ) -> Self {
        NotImplemented {
            src: source(filename, whole),
            span: span.into(),
            feature,
            found: found.to_string(),
            pos,
        }
    }
}

#[derive(Error, Debug, Diagnostic)]
#[error("expression nests deeper than {limit} levels at {pos}")]
#[diagnostic(
    code(calc::too_deep),
    help("split the expression or raise --max-depth")
)]
pub struct NestingTooDeep {
    #[source_code]
    src: NamedSource<String>,

    #[label("limit reached here")]
    span: SourceSpan,

    pub limit: usize,
    pub pos: Position,
}

impl NestingTooDeep {
    pub fn new(
        filename: Option<&str>,
        whole: &str,
        limit: usize,
        pos: Position,
        span: std::ops::Range<usize>,
    ) -> Self {
        NestingTooDeep {
            src: source(filename, whole),
            span: span.into(),
            limit,
            pos,
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum EvalError {
    #[error("operator `{op}` is not supported for {}", describe_operands(.lhs, .rhs))]
    #[diagnostic(code(calc::unsupported_operation))]
    UnsupportedOperation {
        op: &'static str,
        lhs: Kind,
        rhs: Option<Kind>,
    },

    #[error("division by zero")]
    #[diagnostic(code(calc::division_by_zero))]
    DivisionByZero,

    #[error("result of `{op}` is out of range")]
    #[diagnostic(code(calc::overflow))]
    Overflow { op: &'static str },

    #[error("invalid operand for `{op}`: {reason}")]
    #[diagnostic(code(calc::invalid_operand))]
    InvalidOperand { op: &'static str, reason: String },

    #[error("expression nests deeper than {limit} levels")]
    #[diagnostic(code(calc::too_deep))]
    DepthExceeded { limit: usize },
}

fn describe_operands(lhs: &Kind, rhs: &Option<Kind>) -> String {
    match rhs {
        Some(rhs) => format!("{lhs} and {rhs}"),
        None => lhs.to_string(),
    }
}

/// Every failure a single expression can produce. None of them end a session.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedLiteral(#[from] MalformedLiteral),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NotImplemented(#[from] NotImplemented),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NestingTooDeep(#[from] NestingTooDeep),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Eval(#[from] EvalError),
}
