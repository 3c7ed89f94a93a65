use std::{borrow::Cow, fmt::Display, str::FromStr};

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::{
    duration::Duration,
    error::{Error, MalformedLiteral, NestingTooDeep, NotImplemented, ParseError},
    lex::{Position, Scanned, TokenBuffer, TokenKind, TokenSource},
    value::{Capability, Kind, Literal},
};

/// Default bound on the number of chained operators in one expression.
pub const DEFAULT_MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Increment,
    Decrement,
}

impl UnaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::PlusPlus => Some(UnaryOp::Increment),
            TokenKind::MinusMinus => Some(UnaryOp::Decrement),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Increment => "++",
            UnaryOp::Decrement => "--",
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            UnaryOp::Increment => 1,
            UnaryOp::Decrement => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    ShiftLeft,
    ShiftRight,
    And,
    Or,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::StarStar => BinaryOp::Pow,
            TokenKind::Ampersand => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::LessLess => BinaryOp::ShiftLeft,
            TokenKind::GreaterGreater => BinaryOp::ShiftRight,
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            TokenKind::EqualEqual => BinaryOp::Equal,
            TokenKind::BangEqual => BinaryOp::NotEqual,
            TokenKind::Less => BinaryOp::Less,
            TokenKind::LessEqual => BinaryOp::LessEqual,
            TokenKind::Greater => BinaryOp::Greater,
            TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
            _ => return None,
        })
    }

    pub fn token(&self) -> TokenKind {
        match self {
            BinaryOp::Add => TokenKind::Plus,
            BinaryOp::Sub => TokenKind::Minus,
            BinaryOp::Mul => TokenKind::Star,
            BinaryOp::Div => TokenKind::Slash,
            BinaryOp::Pow => TokenKind::StarStar,
            BinaryOp::BitAnd => TokenKind::Ampersand,
            BinaryOp::BitOr => TokenKind::Pipe,
            BinaryOp::BitXor => TokenKind::Caret,
            BinaryOp::ShiftLeft => TokenKind::LessLess,
            BinaryOp::ShiftRight => TokenKind::GreaterGreater,
            BinaryOp::And => TokenKind::And,
            BinaryOp::Or => TokenKind::Or,
            BinaryOp::Equal => TokenKind::EqualEqual,
            BinaryOp::NotEqual => TokenKind::BangEqual,
            BinaryOp::Less => TokenKind::Less,
            BinaryOp::LessEqual => TokenKind::LessEqual,
            BinaryOp::Greater => TokenKind::Greater,
            BinaryOp::GreaterEqual => TokenKind::GreaterEqual,
        }
    }

    pub fn precedence(&self) -> u8 {
        self.token().precedence().unwrap_or_default()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            op => op.token().name(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            BinaryOp::Add => Capability::Add,
            BinaryOp::Sub => Capability::Sub,
            BinaryOp::Mul => Capability::Mult,
            BinaryOp::Div => Capability::Div,
            BinaryOp::Pow => Capability::Pow,
            BinaryOp::BitAnd => Capability::BitwiseAnd,
            BinaryOp::BitOr => Capability::BitwiseOr,
            BinaryOp::BitXor => Capability::BitwiseXor,
            BinaryOp::ShiftLeft => Capability::ShiftLeft,
            BinaryOp::ShiftRight => Capability::ShiftRight,
            BinaryOp::And => Capability::LogicalAnd,
            BinaryOp::Or => Capability::LogicalOr,
            BinaryOp::Equal => Capability::Equal,
            BinaryOp::NotEqual => Capability::NotEqual,
            BinaryOp::Less => Capability::LessThan,
            BinaryOp::LessEqual => Capability::LessOrEqual,
            BinaryOp::Greater => Capability::GreaterThan,
            BinaryOp::GreaterEqual => Capability::GreaterOrEqual,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

/// Prefix form, e.g. `(+ 1 (* 2 3))`.
impl Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Literal(literal) => write!(f, "{literal}"),
            Expr::Unary { op, operand } => write!(f, "({} {operand})", op.symbol()),
            Expr::Binary { op, left, right } => write!(f, "({} {left} {right})", op.symbol()),
        }
    }
}

/// Outcome of one parse call. The two end markers are control flow, not failures.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Expression(Expr),
    EndOfStatement,
    EndOfInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

pub struct Parser<'de, S = TokenBuffer<'de>> {
    filename: Option<&'de str>,
    whole: &'de str,
    tokens: S,
    config: ParserConfig,
}

impl<'de> Parser<'de> {
    pub fn new(filename: Option<&'de str>, whole: &'de str) -> Self {
        Parser::with_source(filename, whole, TokenBuffer::new(whole))
    }
}

impl<'de, S: TokenSource<'de>> Parser<'de, S> {
    /// A parser over an arbitrary token source. `filename` and `whole` are
    /// only used to render diagnostics.
    pub fn with_source(filename: Option<&'de str>, whole: &'de str, tokens: S) -> Self {
        Parser {
            filename,
            whole,
            tokens,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parses the next expression, or reports a statement terminator or the
    /// end of input.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn parse_expression(&mut self) -> Result<Parsed, Error> {
        self.parse_expression_within(0)
    }

    fn parse_expression_within(&mut self, depth: usize) -> Result<Parsed, Error> {
        let first = self.tokens.scan_ignore_whitespace();
        if depth > self.config.max_depth {
            return Err(NestingTooDeep::new(
                self.filename,
                self.whole,
                self.config.max_depth,
                first.pos,
                first.span(),
            )
            .into());
        }

        match first.token {
            kind if kind.is_literal() => {
                let text = Cow::Borrowed(first.literal);
                let expr = self.parse_literal(kind, first.pos, text, first.span())?;
                self.parse_operator(expr, depth).map(Parsed::Expression)
            }
            TokenKind::Plus | TokenKind::Minus => {
                let numeral = self.tokens.scan_ignore_whitespace();
                if !matches!(
                    numeral.token,
                    TokenKind::Integer | TokenKind::Decimal | TokenKind::Duration
                ) {
                    self.tokens.unscan();
                    return Err(self.unexpected(&first, &["INTEGER", "DECIMAL", "DURATION"]));
                }
                let signed = format!("{}{}", first.literal, numeral.literal);
                let span = first.pos.offset..numeral.span().end;
                let expr = self.parse_literal(numeral.token, first.pos, Cow::Owned(signed), span)?;
                self.parse_operator(expr, depth).map(Parsed::Expression)
            }
            TokenKind::Semicolon => Ok(Parsed::EndOfStatement),
            TokenKind::Eof => Ok(Parsed::EndOfInput),
            TokenKind::Keyword(keyword) => Err(self.not_implemented(keyword.feature(), &first)),
            TokenKind::Ident => Err(self.not_implemented("variables", &first)),
            TokenKind::LeftParen => Err(self.not_implemented("parenthesized expressions", &first)),
            TokenKind::LeftBracket => Err(self.not_implemented("arrays", &first)),
            TokenKind::LeftBrace => Err(self.not_implemented("struct literals", &first)),
            _ => Err(self.unexpected(&first, &["literal", "+", "-", ";"])),
        }
    }

    /// Discards tokens up to and including the next `;` so one bad statement
    /// does not cascade into the rest of the input.
    pub fn skip_statement(&mut self) {
        loop {
            match self.tokens.scan_ignore_whitespace().token {
                TokenKind::Semicolon => return,
                TokenKind::Eof => {
                    self.tokens.unscan();
                    return;
                }
                _ => {}
            }
        }
    }

    /// Looks past a freshly parsed literal for a postfix or binary operator.
    fn parse_operator(&mut self, expr: Expr, depth: usize) -> Result<Expr, Error> {
        let next = self.tokens.scan_ignore_whitespace();
        if let Some(op) = UnaryOp::from_token(next.token) {
            return Ok(Expr::unary(op, expr));
        }
        if let Some(op) = BinaryOp::from_token(next.token) {
            return self.parse_binary(expr, op, depth);
        }
        self.tokens.unscan();
        Ok(expr)
    }

    fn parse_binary(&mut self, lh: Expr, op: BinaryOp, depth: usize) -> Result<Expr, Error> {
        let ahead = self.tokens.scan_ignore_whitespace();
        self.tokens.unscan();
        if matches!(ahead.token, TokenKind::Semicolon | TokenKind::Eof) {
            return Err(self.unexpected(&ahead, &["expression"]));
        }

        let rh = match self.parse_expression_within(depth + 1)? {
            Parsed::Expression(rh) => rh,
            Parsed::EndOfStatement | Parsed::EndOfInput => {
                return Err(self.unexpected(&ahead, &["expression"]));
            }
        };

        Ok(match rh {
            Expr::Literal(_) | Expr::Unary { .. } => Expr::binary(op, lh, rh),
            Expr::Binary { .. } => rotate(op, lh, rh),
        })
    }

    fn parse_literal(
        &self,
        kind: TokenKind,
        pos: Position,
        text: Cow<'_, str>,
        span: std::ops::Range<usize>,
    ) -> Result<Expr, Error> {
        let malformed = |literal_kind: Kind, reason: String| {
            Error::from(MalformedLiteral::new(
                self.filename,
                self.whole,
                literal_kind,
                &text,
                reason,
                pos,
                span.clone(),
            ))
        };

        let literal = match kind {
            TokenKind::Integer => Literal::Integer(
                BigInt::from_str(&text).map_err(|e| malformed(Kind::Integer, e.to_string()))?,
            ),
            TokenKind::Decimal => Literal::Decimal(
                BigDecimal::from_str(&text).map_err(|e| malformed(Kind::Decimal, e.to_string()))?,
            ),
            TokenKind::String => {
                Literal::String(unquote(&text).map_err(|reason| malformed(Kind::String, reason))?)
            }
            TokenKind::Duration => Literal::Duration(
                Duration::from_str(&text).map_err(|e| malformed(Kind::Duration, e.to_string()))?,
            ),
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            _ => {
                return Err(ParseError::unexpected(
                    self.filename,
                    self.whole,
                    &text,
                    &["literal"],
                    pos,
                    span.clone(),
                )
                .into());
            }
        };
        Ok(Expr::Literal(literal))
    }

    fn unexpected(&self, found: &Scanned<'_>, expected: &[&str]) -> Error {
        let described = found.describe();
        ParseError::unexpected(
            self.filename,
            self.whole,
            &described,
            expected,
            found.pos,
            found.span(),
        )
        .into()
    }

    fn not_implemented(&self, feature: &'static str, found: &Scanned<'_>) -> Error {
        NotImplemented::new(
            self.filename,
            self.whole,
            feature,
            found.literal,
            found.pos,
            found.span(),
        )
        .into()
    }
}

impl<'de> Iterator for Parser<'de> {
    type Item = Result<Expr, Error>;

    /// Yields expressions until the end of input, skipping statement terminators.
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.parse_expression() {
                Ok(Parsed::Expression(expr)) => return Some(Ok(expr)),
                Ok(Parsed::EndOfStatement) => continue,
                Ok(Parsed::EndOfInput) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Combines `lh op rh` where `rh` is an already-assembled binary tree.
///
/// When `op` binds tighter than the root of `rh`, the root is lifted above
/// `op` and `op` takes the root's left child instead; this repeats down the
/// left spine. Equal precedence keeps `rh` whole, so equal-precedence chains
/// group to the right.
fn rotate(op: BinaryOp, lh: Expr, rh: Expr) -> Expr {
    match rh {
        Expr::Binary {
            op: root,
            left,
            right,
        } if op.precedence() > root.precedence() => {
            tracing::trace!(outer = root.symbol(), inner = op.symbol(), "rotate");
            Expr::Binary {
                op: root,
                left: Box::new(rotate(op, lh, *left)),
                right,
            }
        }
        rh => Expr::binary(op, lh, rh),
    }
}

/// Strips the quotes from a string literal and resolves its escapes.
fn unquote(text: &str) -> Result<String, String> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .ok_or_else(|| "missing quotes".to_string())?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('u') => {
                let rest = chars.as_str();
                let code = rest
                    .strip_prefix('{')
                    .and_then(|r| r.split_once('}'))
                    .map(|(hex, _)| hex)
                    .ok_or_else(|| "expected `\\u{...}`".to_string())?;
                let c = u32::from_str_radix(code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid unicode escape `\\u{{{code}}}`"))?;
                out.push(c);
                chars = rest[code.len() + 2..].chars();
            }
            Some(other) => return Err(format!("unknown escape `\\{other}`")),
            None => return Err("dangling `\\`".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Expr {
        match Parser::new(None, input).parse_expression() {
            Ok(Parsed::Expression(expr)) => expr,
            other => panic!("expected an expression from {input:?}, got {other:?}"),
        }
    }

    fn int(n: i64) -> Expr {
        Expr::Literal(Literal::Integer(BigInt::from(n)))
    }

    #[test]
    fn tighter_operator_on_the_right_stays_nested() {
        assert_eq!(
            parse("1 + 2 * 3"),
            Expr::binary(BinaryOp::Add, int(1), Expr::binary(BinaryOp::Mul, int(2), int(3)))
        );
    }

    #[test]
    fn tighter_operator_on_the_left_rotates() {
        assert_eq!(
            parse("1 * 2 + 3"),
            Expr::binary(BinaryOp::Add, Expr::binary(BinaryOp::Mul, int(1), int(2)), int(3))
        );
    }

    #[test]
    fn equal_precedence_groups_right() {
        assert_eq!(
            parse("8 / 4 / 2"),
            Expr::binary(BinaryOp::Div, int(8), Expr::binary(BinaryOp::Div, int(4), int(2)))
        );
    }

    #[test]
    fn rotation_follows_the_left_spine() {
        assert_eq!(parse("2 * 3 + 4 == 10").to_string(), "(== (+ (* 2 3) 4) 10)");
        assert_eq!(parse("1 < 2 and 3 < 4").to_string(), "(and (< 1 2) (< 3 4))");
        assert_eq!(parse("2 ** 3 * 4 + 1").to_string(), "(+ (* (** 2 3) 4) 1)");
    }

    #[test]
    fn postfix_operators() {
        assert_eq!(parse("5++"), Expr::unary(UnaryOp::Increment, int(5)));
        assert_eq!(parse("5 --"), Expr::unary(UnaryOp::Decrement, int(5)));
        assert_eq!(
            parse("1 + 5++"),
            Expr::binary(BinaryOp::Add, int(1), Expr::unary(UnaryOp::Increment, int(5)))
        );
    }

    #[test]
    fn leading_sign_folds_into_the_numeral() {
        assert_eq!(parse("-5"), int(-5));
        assert_eq!(parse("- 5 + 1"), Expr::binary(BinaryOp::Add, int(-5), int(1)));
        assert_eq!(parse("-1h").to_string(), "-1h0m0s");
        assert!(matches!(
            Parser::new(None, "- true").parse_expression(),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn literals() {
        assert_eq!(parse("true"), Expr::Literal(Literal::Boolean(true)));
        assert_eq!(
            parse(r#""a\tb\u{41}""#),
            Expr::Literal(Literal::String("a\tbA".into()))
        );
        assert_eq!(parse("2.5").to_string(), "2.500000000000000E+00");
        assert_eq!(parse("1h30m").to_string(), "1h30m0s");
    }

    #[test]
    fn terminators_are_control_signals() {
        let mut parser = Parser::new(None, "1; 2");
        assert_eq!(parser.parse_expression().unwrap(), Parsed::Expression(int(1)));
        assert_eq!(parser.parse_expression().unwrap(), Parsed::EndOfStatement);
        assert_eq!(parser.parse_expression().unwrap(), Parsed::Expression(int(2)));
        assert_eq!(parser.parse_expression().unwrap(), Parsed::EndOfInput);
        assert_eq!(parser.parse_expression().unwrap(), Parsed::EndOfInput);
    }

    #[test]
    fn unexpected_token_reports_position() {
        let Err(Error::Parse(err)) = Parser::new(None, "1 +\n  )").parse_expression() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.found, ")");
        assert_eq!((err.line(), err.column()), (2, 3));
    }

    #[test]
    fn dangling_operator_is_an_error() {
        let Err(Error::Parse(err)) = Parser::new(None, "1 +").parse_expression() else {
            panic!("expected a parse error");
        };
        assert_eq!(err.found, "EOF");
        assert_eq!(err.expected, vec!["expression"]);
    }

    #[test]
    fn errors_carry_the_filename() {
        let Err(err) = Parser::new(Some("sums.calc"), "1 +").parse_expression() else {
            panic!("expected a parse error");
        };
        let report = format!("{:?}", miette::Report::new(err));
        assert!(report.contains("sums.calc"), "{report}");
    }

    #[test]
    fn skip_statement_resumes_after_terminator() {
        let mut parser = Parser::new(None, "1 + ; 2");
        assert!(parser.parse_expression().is_err());
        parser.skip_statement();
        assert_eq!(parser.parse_expression().unwrap(), Parsed::Expression(int(2)));
        parser.skip_statement();
        assert_eq!(parser.parse_expression().unwrap(), Parsed::EndOfInput);
    }

    #[test]
    fn malformed_duration() {
        let Err(Error::MalformedLiteral(err)) = Parser::new(None, "5zz").parse_expression() else {
            panic!("expected a malformed literal");
        };
        assert_eq!(err.text, "5zz");
        assert_eq!(err.kind, Kind::Duration);
    }

    #[test]
    fn declarations_are_not_implemented() {
        for (input, feature) in [
            ("var x = 1", "variable declarations"),
            ("if true", "conditional expressions"),
            ("import foo", "imports"),
            ("x + 1", "variables"),
            ("[1, 2]", "arrays"),
            ("(1 + 2)", "parenthesized expressions"),
        ] {
            match Parser::new(None, input).parse_expression() {
                Err(Error::NotImplemented(err)) => assert_eq!(err.feature, feature, "{input}"),
                other => panic!("{input}: expected NotImplemented, got {other:?}"),
            }
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let input = vec!["1"; 20].join(" + ");
        let mut parser = Parser::new(None, &input).with_config(ParserConfig { max_depth: 10 });
        assert!(matches!(parser.parse_expression(), Err(Error::NestingTooDeep(_))));

        let mut parser = Parser::new(None, &input).with_config(ParserConfig { max_depth: 19 });
        assert!(parser.parse_expression().is_ok());
    }

    struct Scripted<'de> {
        tokens: Vec<Scanned<'de>>,
        next: usize,
    }

    impl<'de> TokenSource<'de> for Scripted<'de> {
        fn scan(&mut self) -> Scanned<'de> {
            let scanned = self.tokens.get(self.next).copied().unwrap_or(Scanned {
                token: TokenKind::Eof,
                pos: Position::default(),
                literal: "",
            });
            self.next += 1;
            scanned
        }

        fn unscan(&mut self) {
            self.next -= 1;
        }
    }

    #[test]
    fn parses_from_any_token_source() {
        let token = |token, literal| Scanned {
            token,
            pos: Position::default(),
            literal,
        };
        let source = Scripted {
            tokens: vec![
                token(TokenKind::Integer, "7"),
                token(TokenKind::Minus, "-"),
                token(TokenKind::Integer, "2"),
            ],
            next: 0,
        };
        let mut parser = Parser::with_source(None, "", source);
        assert_eq!(
            parser.parse_expression().unwrap(),
            Parsed::Expression(Expr::binary(BinaryOp::Sub, int(7), int(2)))
        );
    }
}
