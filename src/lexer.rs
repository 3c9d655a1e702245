use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{Token, TokenKind};
use crate::error::{QueryError, QueryResult};

/// Identifiers that reclassify into operator or literal tokens after
/// scanning. The scanner has no reserved words; everything lexes as an
/// identifier first.
static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("and", TokenKind::And),
        ("or", TokenKind::Or),
        ("not", TokenKind::Not),
        ("add", TokenKind::Add),
        ("sub", TokenKind::Sub),
        ("mul", TokenKind::Multiply),
        ("div", TokenKind::Divide),
        ("mod", TokenKind::Modulo),
        ("eq", TokenKind::Equal),
        ("ne", TokenKind::NotEqual),
        ("gt", TokenKind::GreaterThan),
        ("ge", TokenKind::GreaterThanOrEqual),
        ("lt", TokenKind::LessThan),
        ("le", TokenKind::LessThanOrEqual),
        ("any", TokenKind::Any),
        ("all", TokenKind::All),
        ("true", TokenKind::BooleanLiteral),
        ("false", TokenKind::BooleanLiteral),
        ("null", TokenKind::NullLiteral),
        ("INF", TokenKind::DoubleLiteral),
        ("NaN", TokenKind::DoubleLiteral),
        ("INFf", TokenKind::SingleLiteral),
        ("INFF", TokenKind::SingleLiteral),
        ("NaNf", TokenKind::SingleLiteral),
        ("NaNF", TokenKind::SingleLiteral),
    ])
});

/// Identifiers that start a type-constructed literal when immediately
/// followed by a quote, e.g. `datetime'2014-01-01'`.
static TYPE_PREFIXES: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    HashMap::from([
        ("datetime", TokenKind::DateTimeLiteral),
        ("datetimeoffset", TokenKind::DateTimeOffsetLiteral),
        ("time", TokenKind::TimeLiteral),
        ("guid", TokenKind::GuidLiteral),
        ("binary", TokenKind::BinaryLiteral),
        ("X", TokenKind::BinaryLiteral),
        ("geography", TokenKind::GeographyLiteral),
        ("geometry", TokenKind::GeometryLiteral),
    ])
});

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '@'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Single-pass scanner over a filter or order-by source string.
///
/// The constructor eagerly scans token #0, so a freshly built lexer is
/// already positioned on the first token. Lookahead is one token: callers
/// peek through [`Lexer::peek_token`], which snapshots and restores the
/// scanner state (position, current character, current token) instead of
/// buffering tokens.
#[derive(Debug)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    ch: Option<char>,
    token: Token,
}

impl Lexer {
    pub fn new(text: &str) -> QueryResult<Self> {
        let input: Vec<char> = text.chars().collect();
        let mut lexer = Lexer {
            ch: input.first().copied(),
            input,
            position: 0,
            token: Token::end(0),
        };
        lexer.next_token()?;
        Ok(lexer)
    }

    /// The token the lexer is currently positioned on.
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Advances past the current token and scans the next one.
    pub fn next_token(&mut self) -> QueryResult<Token> {
        let token = self.scan()?;
        self.token = token.clone();
        Ok(token)
    }

    /// Returns the token after the current one without consuming it.
    pub fn peek_token(&mut self) -> QueryResult<Token> {
        let position = self.position;
        let ch = self.ch;
        let token = self.token.clone();
        let result = self.scan();
        self.position = position;
        self.ch = ch;
        self.token = token;
        result
    }

    /// Folds a `-` sign the parser consumed into the current numeric
    /// literal token, so `-5` parses as one constant.
    pub(crate) fn prefix_minus(&mut self, position: usize) {
        self.token.text.insert(0, '-');
        self.token.position = position;
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
        self.ch = self.input.get(self.position).copied();
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
        self.ch = self.input.get(self.position).copied();
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn scan(&mut self) -> QueryResult<Token> {
        while matches!(self.ch, Some(' ' | '\t' | '\r' | '\n')) {
            self.advance();
        }
        let start = self.position;
        let kind = match self.ch {
            None => TokenKind::End,
            Some('\'') => self.scan_string()?,
            Some('(') => {
                self.advance();
                TokenKind::OpenParen
            }
            Some(')') => {
                self.advance();
                TokenKind::CloseParen
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some(':') => {
                self.advance();
                TokenKind::Colon
            }
            Some('=') => {
                self.advance();
                TokenKind::Equal
            }
            Some('?') => {
                self.advance();
                TokenKind::Question
            }
            Some('*') => {
                self.advance();
                TokenKind::Star
            }
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some('/') => {
                self.advance();
                TokenKind::Slash
            }
            Some('-') => self.scan_minus(start)?,
            Some(c) if is_identifier_start(c) => {
                self.scan_identifier();
                TokenKind::Identifier
            }
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some(c) => {
                return Err(QueryError::lexical(
                    format!("invalid character '{c}'"),
                    self.position,
                ));
            }
        };
        let mut token = Token {
            kind,
            text: self.text_from(start),
            position: start,
        };
        self.reclassify(&mut token)?;
        Ok(token)
    }

    /// Scans `'...'`, treating a doubled quote as an escaped quote rather
    /// than a terminator.
    fn scan_string(&mut self) -> QueryResult<TokenKind> {
        loop {
            self.advance();
            while self.ch.is_some() && self.ch != Some('\'') {
                self.advance();
            }
            if self.ch.is_none() {
                return Err(QueryError::lexical(
                    "unterminated string literal",
                    self.position,
                ));
            }
            self.advance();
            if self.ch != Some('\'') {
                break;
            }
        }
        Ok(TokenKind::StringLiteral)
    }

    /// A `-` followed by a digit folds into a negative numeric literal;
    /// `-INF`/`-INFf` fold into signed infinities. Anything else is a
    /// bare Minus token.
    fn scan_minus(&mut self, start: usize) -> QueryResult<TokenKind> {
        match self.input.get(start + 1).copied() {
            Some(c) if c.is_ascii_digit() => {
                self.advance();
                let kind = self.scan_number()?;
                if kind.is_numeric_literal() {
                    return Ok(kind);
                }
                // -0x... : the sign does not belong to a hex literal
                self.set_position(start);
            }
            Some('I') => {
                self.advance();
                self.scan_identifier();
                let word = self.text_from(start + 1);
                if word == "INF" {
                    return Ok(TokenKind::DoubleLiteral);
                }
                if word == "INFf" || word == "INFF" {
                    return Ok(TokenKind::SingleLiteral);
                }
                self.set_position(start);
            }
            _ => {}
        }
        self.advance();
        Ok(TokenKind::Minus)
    }

    fn scan_identifier(&mut self) {
        self.advance();
        while matches!(self.ch, Some(c) if is_identifier_part(c)) {
            self.advance();
        }
    }

    fn scan_number(&mut self) -> QueryResult<TokenKind> {
        let first = self.ch;
        self.advance();
        if first == Some('0') && matches!(self.ch, Some('x' | 'X')) {
            self.advance();
            while matches!(self.ch, Some(c) if c.is_ascii_hexdigit()) {
                self.advance();
            }
            return Ok(TokenKind::BinaryLiteral);
        }
        let mut kind = TokenKind::IntegerLiteral;
        while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.ch == Some('.') {
            kind = TokenKind::DoubleLiteral;
            self.advance();
            self.expect_digit()?;
            while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.ch, Some('E' | 'e')) {
            kind = TokenKind::DoubleLiteral;
            self.advance();
            if matches!(self.ch, Some('+' | '-')) {
                self.advance();
            }
            self.expect_digit()?;
            while matches!(self.ch, Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        match self.ch {
            Some('L' | 'l') => {
                kind = TokenKind::Int64Literal;
                self.advance();
            }
            Some('f' | 'F') => {
                kind = TokenKind::SingleLiteral;
                self.advance();
            }
            Some('M' | 'm') => {
                kind = TokenKind::DecimalLiteral;
                self.advance();
            }
            Some('D' | 'd') => {
                kind = TokenKind::DoubleLiteral;
                self.advance();
            }
            _ => {}
        }
        Ok(kind)
    }

    fn expect_digit(&self) -> QueryResult<()> {
        match self.ch {
            Some(c) if c.is_ascii_digit() => Ok(()),
            _ => Err(QueryError::lexical("digit expected", self.position)),
        }
    }

    /// Identifier tokens are reclassified after scanning: into a
    /// type-constructed literal when a known type name is immediately
    /// followed by a quote (consuming through the closing quote), or into
    /// an operator/literal keyword from the keyword table.
    fn reclassify(&mut self, token: &mut Token) -> QueryResult<()> {
        if token.kind != TokenKind::Identifier {
            return Ok(());
        }
        if self.ch == Some('\'') {
            if let Some(&kind) = TYPE_PREFIXES.get(token.text.as_str()) {
                loop {
                    self.advance();
                    match self.ch {
                        None => {
                            return Err(QueryError::lexical(
                                "unterminated string literal",
                                self.position,
                            ));
                        }
                        Some('\'') => break,
                        Some(_) => {}
                    }
                }
                self.advance();
                token.kind = kind;
                token.text = self.text_from(token.position);
                return Ok(());
            }
        }
        if let Some(&kind) = KEYWORDS.get(token.text.as_str()) {
            token.kind = kind;
        }
        Ok(())
    }
}

#[test]
fn test_keyword_reclassification() {
    let mut lexer = Lexer::new("and or not eq ne price").unwrap();
    assert_eq!(lexer.token().kind, TokenKind::And);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Or);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Not);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Equal);
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::NotEqual);
    let ident = lexer.next_token().unwrap();
    assert_eq!(ident.kind, TokenKind::Identifier);
    assert_eq!(ident.text, "price");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::End);
}

#[test]
fn test_peek_restores_scanner_state() {
    let mut lexer = Lexer::new("price gt 100").unwrap();
    assert_eq!(lexer.token().text, "price");
    let peeked = lexer.peek_token().unwrap();
    assert_eq!(peeked.kind, TokenKind::GreaterThan);
    // peeking did not move the lexer
    assert_eq!(lexer.token().text, "price");
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::GreaterThan);
    assert_eq!(lexer.next_token().unwrap().text, "100");
}
