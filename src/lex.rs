use std::fmt::Display;

/// Location of a token in the scanned text. `line` and `column` are 0-based;
/// `Display` renders them 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, char {}", self.line + 1, self.column + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // literals
    Integer,
    Decimal,
    String,
    Duration,
    True,
    False,

    // operators
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    Ampersand,
    Pipe,
    Caret,
    LessLess,
    GreaterGreater,
    PlusPlus,
    MinusMinus,
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,

    // punctuation
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Equal,

    Ident,
    Keyword(Keyword),

    Whitespace,
    Eof,
    Illegal,
}

/// Reserved words of the wider language. None of them can be evaluated yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Var,
    Let,
    Const,
    Func,
    Struct,
    Enum,
    Unit,
    Conversion,
    To,
    If,
    Else,
    ElseIf,
    For,
    Filter,
    Import,
    StringType,
    IntType,
    FloatType,
    TimestampType,
    DurationType,
    BooleanType,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Keyword> {
        Some(match word.to_ascii_lowercase().as_str() {
            "var" => Keyword::Var,
            "let" => Keyword::Let,
            "const" => Keyword::Const,
            "func" => Keyword::Func,
            "struct" => Keyword::Struct,
            "enum" => Keyword::Enum,
            "unit" => Keyword::Unit,
            "conversion" => Keyword::Conversion,
            "to" => Keyword::To,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "elseif" => Keyword::ElseIf,
            "for" => Keyword::For,
            "filter" => Keyword::Filter,
            "import" => Keyword::Import,
            "string" => Keyword::StringType,
            "int" => Keyword::IntType,
            "float" => Keyword::FloatType,
            "timestamp" => Keyword::TimestampType,
            "duration" => Keyword::DurationType,
            "boolean" => Keyword::BooleanType,
            _ => return None,
        })
    }

    /// The language feature a keyword introduces, used in `NotImplemented` reports.
    pub fn feature(&self) -> &'static str {
        match self {
            Keyword::Var | Keyword::Let => "variable declarations",
            Keyword::Const => "constant declarations",
            Keyword::Func => "function declarations",
            Keyword::Struct => "struct declarations",
            Keyword::Enum => "enum declarations",
            Keyword::Unit | Keyword::Conversion | Keyword::To => "units and unit conversion",
            Keyword::If | Keyword::Else | Keyword::ElseIf => "conditional expressions",
            Keyword::For => "for expressions",
            Keyword::Filter => "filter expressions",
            Keyword::Import => "imports",
            Keyword::StringType
            | Keyword::IntType
            | Keyword::FloatType
            | Keyword::TimestampType
            | Keyword::DurationType
            | Keyword::BooleanType => "type annotations",
        }
    }
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Integer
                | TokenKind::Decimal
                | TokenKind::String
                | TokenKind::Duration
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Binding strength of a binary operator; higher binds tighter.
    pub fn precedence(&self) -> Option<u8> {
        Some(match self {
            TokenKind::Or => 1,
            TokenKind::And => 2,
            TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => 3,
            TokenKind::Plus | TokenKind::Minus | TokenKind::Pipe | TokenKind::Caret => 4,
            TokenKind::Star
            | TokenKind::Slash
            | TokenKind::Ampersand
            | TokenKind::LessLess
            | TokenKind::GreaterGreater => 5,
            TokenKind::StarStar => 6,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Integer => "INTEGER",
            TokenKind::Decimal => "DECIMAL",
            TokenKind::String => "STRING",
            TokenKind::Duration => "DURATION",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::LessLess => "<<",
            TokenKind::GreaterGreater => ">>",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::EqualEqual => "==",
            TokenKind::BangEqual => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Semicolon => ";",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Equal => "=",
            TokenKind::Ident => "IDENT",
            TokenKind::Keyword(_) => "KEYWORD",
            TokenKind::Whitespace => "WS",
            TokenKind::Eof => "EOF",
            TokenKind::Illegal => "ILLEGAL",
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One scanned token: its kind, where it starts, and the exact source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scanned<'de> {
    pub token: TokenKind,
    pub pos: Position,
    pub literal: &'de str,
}

impl Scanned<'_> {
    /// The literal if there is one, otherwise the token name.
    pub fn describe(&self) -> String {
        if !self.literal.is_empty() && self.token != TokenKind::Whitespace {
            self.literal.to_string()
        } else {
            self.token.to_string()
        }
    }

    pub fn span(&self) -> std::ops::Range<usize> {
        self.pos.offset..self.pos.offset + self.literal.len()
    }
}

impl Display for Scanned<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit = self.literal.escape_debug();
        write!(
            f,
            "{:<8} {:>3}:{:<3} {lit}",
            self.token.name(),
            self.pos.line + 1,
            self.pos.column + 1,
        )
    }
}

/// Anything the parser can pull tokens from.
///
/// `unscan` rewinds exactly one token. Calling it twice without a `scan` in
/// between is a contract violation.
pub trait TokenSource<'de> {
    fn scan(&mut self) -> Scanned<'de>;
    fn unscan(&mut self);

    /// Scans the next token, skipping a single whitespace token.
    fn scan_ignore_whitespace(&mut self) -> Scanned<'de> {
        let scanned = self.scan();
        if scanned.token == TokenKind::Whitespace {
            return self.scan();
        }
        scanned
    }
}

pub struct Lexer<'de> {
    whole: &'de str,
    rest: &'de str,
    byte: usize,
    line: usize,
    line_start: usize,
}

impl<'de> Lexer<'de> {
    pub fn new(input: &'de str) -> Self {
        Lexer {
            whole: input,
            rest: input,
            byte: 0,
            line: 0,
            line_start: 0,
        }
    }

    fn position_at(&self, offset: usize) -> Position {
        Position {
            line: self.line,
            column: self.whole[self.line_start..offset].chars().count(),
            offset,
        }
    }

    fn advance(&mut self, len: usize) -> &'de str {
        let taken = &self.rest[..len];
        self.rest = &self.rest[len..];
        self.byte += len;
        taken
    }

    /// Scans one token. At the end of input this keeps returning `Eof`.
    pub fn next_token(&mut self) -> Scanned<'de> {
        let pos = self.position_at(self.byte);
        let mut chars = self.rest.chars();
        let Some(c) = chars.next() else {
            return Scanned {
                token: TokenKind::Eof,
                pos,
                literal: "",
            };
        };
        let next = chars.next();

        enum Start {
            Single(TokenKind),
            Double(TokenKind),
            Whitespace,
            String,
            Ident,
            Number,
            Comment,
        }

        let started = match (c, next) {
            ('+', Some('+')) => Start::Double(TokenKind::PlusPlus),
            ('-', Some('-')) => Start::Double(TokenKind::MinusMinus),
            ('*', Some('*')) => Start::Double(TokenKind::StarStar),
            ('<', Some('<')) => Start::Double(TokenKind::LessLess),
            ('>', Some('>')) => Start::Double(TokenKind::GreaterGreater),
            ('<', Some('=')) => Start::Double(TokenKind::LessEqual),
            ('>', Some('=')) => Start::Double(TokenKind::GreaterEqual),
            ('=', Some('=')) => Start::Double(TokenKind::EqualEqual),
            ('!', Some('=')) => Start::Double(TokenKind::BangEqual),
            ('/', Some('/')) => Start::Comment,
            ('+', _) => Start::Single(TokenKind::Plus),
            ('-', _) => Start::Single(TokenKind::Minus),
            ('*', _) => Start::Single(TokenKind::Star),
            ('/', _) => Start::Single(TokenKind::Slash),
            ('%', _) => Start::Single(TokenKind::Percent),
            ('&', _) => Start::Single(TokenKind::Ampersand),
            ('|', _) => Start::Single(TokenKind::Pipe),
            ('^', _) => Start::Single(TokenKind::Caret),
            ('<', _) => Start::Single(TokenKind::Less),
            ('>', _) => Start::Single(TokenKind::Greater),
            ('=', _) => Start::Single(TokenKind::Equal),
            (';', _) => Start::Single(TokenKind::Semicolon),
            ('(', _) => Start::Single(TokenKind::LeftParen),
            (')', _) => Start::Single(TokenKind::RightParen),
            ('[', _) => Start::Single(TokenKind::LeftBracket),
            (']', _) => Start::Single(TokenKind::RightBracket),
            ('{', _) => Start::Single(TokenKind::LeftBrace),
            ('}', _) => Start::Single(TokenKind::RightBrace),
            (',', _) => Start::Single(TokenKind::Comma),
            ('.', _) => Start::Single(TokenKind::Dot),
            ('"', _) => Start::String,
            ('0'..='9', _) => Start::Number,
            ('a'..='z' | 'A'..='Z' | '_', _) => Start::Ident,
            (c, _) if c.is_whitespace() => Start::Whitespace,
            _ => Start::Single(TokenKind::Illegal),
        };

        let (token, len) = match started {
            Start::Single(kind) => (kind, c.len_utf8()),
            Start::Double(kind) => (kind, 2),
            Start::Whitespace | Start::Comment => (TokenKind::Whitespace, self.trivia_len()),
            Start::String => self.string_len(),
            Start::Ident => {
                let len = self
                    .rest
                    .find(|c| !matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_'))
                    .unwrap_or(self.rest.len());
                let word = &self.rest[..len];
                let kind = match word.to_ascii_lowercase().as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    _ => Keyword::lookup(word).map_or(TokenKind::Ident, TokenKind::Keyword),
                };
                (kind, len)
            }
            Start::Number => self.number_len(),
        };

        let literal = self.advance(len);
        for (i, c) in literal.char_indices() {
            if c == '\n' {
                self.line += 1;
                self.line_start = pos.offset + i + 1;
            }
        }

        Scanned {
            token,
            pos,
            literal,
        }
    }

    /// Length of the run of whitespace and `//` comments at the cursor. The
    /// whole run scans as a single whitespace token.
    fn trivia_len(&self) -> usize {
        let mut len = 0;
        loop {
            let rest = &self.rest[len..];
            if rest.starts_with("//") {
                len += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with(char::is_whitespace) {
                len += rest
                    .find(|c: char| !c.is_whitespace())
                    .unwrap_or(rest.len());
            } else {
                return len;
            }
        }
    }

    /// Length of a double-quoted string including both quotes. An unterminated
    /// string swallows the rest of the input as an illegal token.
    fn string_len(&self) -> (TokenKind, usize) {
        let mut escaped = false;
        for (i, c) in self.rest.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return (TokenKind::String, i + 1),
                '\n' => break,
                _ => {}
            }
        }
        (TokenKind::Illegal, self.rest.find('\n').unwrap_or(self.rest.len()))
    }

    /// Classifies a numeric run as an integer, a decimal (fraction and/or
    /// exponent) or a duration (digits followed by unit letters, repeatable).
    fn number_len(&self) -> (TokenKind, usize) {
        let bytes = self.rest.as_bytes();
        let digits = |from: usize| {
            bytes[from..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count()
        };

        let mut len = digits(0);
        let mut kind = TokenKind::Integer;

        if bytes.get(len) == Some(&b'.') && bytes.get(len + 1).is_some_and(u8::is_ascii_digit) {
            len += 1 + digits(len + 1);
            kind = TokenKind::Decimal;
        }

        if matches!(bytes.get(len), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+' | b'-')));
            let exp = digits(len + 1 + sign);
            if exp > 0 {
                return (TokenKind::Decimal, len + 1 + sign + exp);
            }
        }

        let unit_len = |from: usize| {
            self.rest[from..]
                .chars()
                .take_while(|c| c.is_alphabetic())
                .map(char::len_utf8)
                .sum::<usize>()
        };

        if unit_len(len) == 0 {
            return (kind, len);
        }

        // duration: (<digits>[.<digits>]<unit>)+
        loop {
            len += unit_len(len);
            let more = digits(len);
            if more == 0 {
                break;
            }
            len += more;
            if bytes.get(len) == Some(&b'.') {
                len += 1 + digits(len + 1);
            }
        }
        (TokenKind::Duration, len)
    }
}

impl<'de> Iterator for Lexer<'de> {
    type Item = Scanned<'de>;

    fn next(&mut self) -> Option<Self::Item> {
        let scanned = self.next_token();
        (scanned.token != TokenKind::Eof).then_some(scanned)
    }
}

/// A lexer with single-token pushback.
pub struct TokenBuffer<'de> {
    lexer: Lexer<'de>,
    last: Option<Scanned<'de>>,
    pushed_back: bool,
}

impl<'de> TokenBuffer<'de> {
    pub fn new(input: &'de str) -> Self {
        TokenBuffer {
            lexer: Lexer::new(input),
            last: None,
            pushed_back: false,
        }
    }
}

impl<'de> TokenSource<'de> for TokenBuffer<'de> {
    fn scan(&mut self) -> Scanned<'de> {
        if self.pushed_back {
            self.pushed_back = false;
            if let Some(last) = self.last {
                return last;
            }
        }
        let scanned = self.lexer.next_token();
        tracing::trace!(token = %scanned.token, literal = scanned.literal, "scan");
        self.last = Some(scanned);
        scanned
    }

    fn unscan(&mut self) {
        debug_assert!(!self.pushed_back, "unscan called twice without scan");
        self.pushed_back = self.last.is_some();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .filter(|s| s.token != TokenKind::Whitespace)
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn operators() {
        assert_eq!(
            kinds("+ ++ - -- * ** / & | ^ << >> == != < <= > >= and or"),
            vec![
                TokenKind::Plus,
                TokenKind::PlusPlus,
                TokenKind::Minus,
                TokenKind::MinusMinus,
                TokenKind::Star,
                TokenKind::StarStar,
                TokenKind::Slash,
                TokenKind::Ampersand,
                TokenKind::Pipe,
                TokenKind::Caret,
                TokenKind::LessLess,
                TokenKind::GreaterGreater,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::And,
                TokenKind::Or,
            ]
        );
    }

    #[test]
    fn numeric_literals() {
        let scanned: Vec<_> = Lexer::new("42 3.25 1.5E+02 1h30m0s 1.5s 5zz 7")
            .filter(|s| s.token != TokenKind::Whitespace)
            .map(|s| (s.token, s.literal))
            .collect();
        assert_eq!(
            scanned,
            vec![
                (TokenKind::Integer, "42"),
                (TokenKind::Decimal, "3.25"),
                (TokenKind::Decimal, "1.5E+02"),
                (TokenKind::Duration, "1h30m0s"),
                (TokenKind::Duration, "1.5s"),
                (TokenKind::Duration, "5zz"),
                (TokenKind::Integer, "7"),
            ]
        );
    }

    #[test]
    fn strings_keep_their_quotes() {
        let mut lexer = Lexer::new(r#""a \"b\"" "open"#);
        let first = lexer.next_token();
        assert_eq!(first.token, TokenKind::String);
        assert_eq!(first.literal, r#""a \"b\"""#);
        lexer.next_token();
        assert_eq!(lexer.next_token().token, TokenKind::Illegal);
        assert_eq!(lexer.next_token().token, TokenKind::Eof);
        assert_eq!(lexer.next_token().token, TokenKind::Eof);
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("var x TRUE false"),
            vec![
                TokenKind::Keyword(Keyword::Var),
                TokenKind::Ident,
                TokenKind::True,
                TokenKind::False,
            ]
        );
    }

    #[test]
    fn positions_track_lines() {
        let tokens: Vec<_> = Lexer::new("1 +\n  22").collect();
        let last = tokens.last().unwrap();
        assert_eq!(last.literal, "22");
        assert_eq!(last.pos.line, 1);
        assert_eq!(last.pos.column, 2);
        assert_eq!(last.pos.to_string(), "line 2, char 3");
    }

    #[test]
    fn comments_scan_as_whitespace() {
        let tokens: Vec<_> = Lexer::new("1 // note\n + 2").map(|s| s.token).collect();
        assert_eq!(
            tokens,
            vec![
                TokenKind::Integer,
                TokenKind::Whitespace,
                TokenKind::Plus,
                TokenKind::Whitespace,
                TokenKind::Integer,
            ]
        );
    }

    #[test]
    fn unscan_replays_last_token() {
        let mut buffer = TokenBuffer::new("1 + 2");
        assert_eq!(buffer.scan_ignore_whitespace().token, TokenKind::Integer);
        assert_eq!(buffer.scan_ignore_whitespace().token, TokenKind::Plus);
        buffer.unscan();
        assert_eq!(buffer.scan().token, TokenKind::Plus);
        assert_eq!(buffer.scan_ignore_whitespace().literal, "2");
        assert_eq!(buffer.scan_ignore_whitespace().token, TokenKind::Eof);
    }
}
