// tests/lexer_tests.rs

use odata_query::ast::{Token, TokenKind};
use odata_query::lexer::Lexer;

/// Collects every token of the input, including the trailing End token.
fn tokens(input: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(input).unwrap();
    let mut out = vec![lexer.token().clone()];
    while lexer.token().kind != TokenKind::End {
        out.push(lexer.next_token().unwrap());
    }
    out
}

fn kinds(input: &str) -> Vec<TokenKind> {
    tokens(input).into_iter().map(|t| t.kind).collect()
}

// ============================================================================
// Punctuation
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("(", TokenKind::OpenParen),
        (")", TokenKind::CloseParen),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        ("=", TokenKind::Equal),
        ("?", TokenKind::Question),
        ("*", TokenKind::Star),
        (".", TokenKind::Dot),
        ("/", TokenKind::Slash),
        ("-", TokenKind::Minus),
    ];

    for (input, expected) in test_cases {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, expected, "Failed for input: {}", input);
        assert_eq!(toks[0].text, input);
        assert_eq!(toks[1].kind, TokenKind::End);
    }
}

#[test]
fn test_whitespace_is_skipped() {
    let toks = tokens("  a \t\r\n b ");
    assert_eq!(toks[0].text, "a");
    assert_eq!(toks[0].position, 2);
    assert_eq!(toks[1].text, "b");
    assert_eq!(toks[2].kind, TokenKind::End);
}

// ============================================================================
// Keyword reclassification
// ============================================================================

#[test]
fn test_operator_keywords() {
    let test_cases = vec![
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
    ];

    for (input, expected) in test_cases {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, expected, "Failed for keyword: {}", input);
        assert_eq!(toks[0].text, input);
    }
}

#[test]
fn test_boolean_and_null_keywords() {
    assert_eq!(
        kinds("true false null"),
        vec![
            TokenKind::BooleanLiteral,
            TokenKind::BooleanLiteral,
            TokenKind::NullLiteral,
            TokenKind::End,
        ]
    );
}

#[test]
fn test_keywords_are_case_sensitive() {
    // only the lowercase spellings are operators
    let toks = tokens("And EQ Null");
    assert!(toks[..3].iter().all(|t| t.kind == TokenKind::Identifier));
}

#[test]
fn test_identifier_shapes() {
    for input in ["price", "_hidden", "$it", "@odata", "col1", "a$b"] {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, TokenKind::Identifier, "input: {}", input);
        assert_eq!(toks[0].text, input);
    }
}

// ============================================================================
// Numeric literals
// ============================================================================

#[test]
fn test_numeric_literal_kinds() {
    let test_cases = vec![
        ("42", TokenKind::IntegerLiteral),
        ("42L", TokenKind::Int64Literal),
        ("42l", TokenKind::Int64Literal),
        ("1.5", TokenKind::DoubleLiteral),
        ("1.5f", TokenKind::SingleLiteral),
        ("1.5F", TokenKind::SingleLiteral),
        ("9.99M", TokenKind::DecimalLiteral),
        ("9.99m", TokenKind::DecimalLiteral),
        ("5D", TokenKind::DoubleLiteral),
        ("1e3", TokenKind::DoubleLiteral),
        ("1E+3", TokenKind::DoubleLiteral),
        ("1.5e-3", TokenKind::DoubleLiteral),
        ("1e3f", TokenKind::SingleLiteral),
        ("0x1A2B", TokenKind::BinaryLiteral),
        ("0XFF", TokenKind::BinaryLiteral),
    ];

    for (input, expected) in test_cases {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, expected, "Failed for input: {}", input);
        assert_eq!(toks[0].text, input);
        assert_eq!(toks[1].kind, TokenKind::End);
    }
}

#[test]
fn test_negative_literal_folds_into_one_token() {
    let toks = tokens("-5");
    assert_eq!(toks[0].kind, TokenKind::IntegerLiteral);
    assert_eq!(toks[0].text, "-5");
    assert_eq!(toks.len(), 2);

    let toks = tokens("-1.5f");
    assert_eq!(toks[0].kind, TokenKind::SingleLiteral);
    assert_eq!(toks[0].text, "-1.5f");
}

#[test]
fn test_minus_before_space_stays_minus() {
    assert_eq!(
        kinds("- 5"),
        vec![TokenKind::Minus, TokenKind::IntegerLiteral, TokenKind::End]
    );
}

#[test]
fn test_minus_before_hex_literal_stays_minus() {
    // the sign does not belong to a hex literal
    assert_eq!(
        kinds("-0x1F"),
        vec![TokenKind::Minus, TokenKind::BinaryLiteral, TokenKind::End]
    );
}

#[test]
fn test_infinity_and_nan() {
    let test_cases = vec![
        ("INF", TokenKind::DoubleLiteral),
        ("NaN", TokenKind::DoubleLiteral),
        ("-INF", TokenKind::DoubleLiteral),
        ("INFf", TokenKind::SingleLiteral),
        ("INFF", TokenKind::SingleLiteral),
        ("-INFf", TokenKind::SingleLiteral),
        ("NaNf", TokenKind::SingleLiteral),
    ];
    for (input, expected) in test_cases {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, expected, "Failed for input: {}", input);
        assert_eq!(toks[0].text, input);
    }
}

#[test]
fn test_digit_required_after_decimal_point() {
    let err = Lexer::new("1.x").unwrap_err();
    assert!(matches!(err, odata_query::QueryError::Lexical { .. }));
    assert_eq!(err.position(), 2);
}

#[test]
fn test_digit_required_in_exponent() {
    let err = Lexer::new("1e+").unwrap_err();
    assert!(matches!(err, odata_query::QueryError::Lexical { .. }));
}

// ============================================================================
// String literals
// ============================================================================

#[test]
fn test_string_literal() {
    let toks = tokens("'hello'");
    assert_eq!(toks[0].kind, TokenKind::StringLiteral);
    assert_eq!(toks[0].text, "'hello'");
}

#[test]
fn test_doubled_quote_is_not_a_terminator() {
    let toks = tokens("'it''s'");
    assert_eq!(toks[0].kind, TokenKind::StringLiteral);
    assert_eq!(toks[0].text, "'it''s'");
    assert_eq!(toks.len(), 2);
}

#[test]
fn test_empty_string_literal() {
    let toks = tokens("''");
    assert_eq!(toks[0].kind, TokenKind::StringLiteral);
    assert_eq!(toks[0].text, "''");
}

#[test]
fn test_unterminated_string_position_is_past_the_input() {
    let input = "col1 eq 'abc";
    let mut lexer = Lexer::new(input).unwrap();
    lexer.next_token().unwrap(); // eq
    let err = lexer.next_token().unwrap_err();
    assert!(matches!(err, odata_query::QueryError::Lexical { .. }));
    assert_eq!(err.position(), input.chars().count());
}

// ============================================================================
// Type-constructed literals
// ============================================================================

#[test]
fn test_type_constructed_literals_span_one_token() {
    let test_cases = vec![
        ("datetime'2014-01-01T00:00:00Z'", TokenKind::DateTimeLiteral),
        (
            "datetimeoffset'2014-01-01T00:00:00+02:00'",
            TokenKind::DateTimeOffsetLiteral,
        ),
        ("time'13:20:00'", TokenKind::TimeLiteral),
        (
            "guid'01234567-89ab-cdef-0123-456789abcdef'",
            TokenKind::GuidLiteral,
        ),
        ("binary'00FF'", TokenKind::BinaryLiteral),
        ("X'1A'", TokenKind::BinaryLiteral),
        ("geography'POINT(1 1)'", TokenKind::GeographyLiteral),
        ("geometry'POINT(1 1)'", TokenKind::GeometryLiteral),
    ];

    for (input, expected) in test_cases {
        let toks = tokens(input);
        assert_eq!(toks[0].kind, expected, "Failed for input: {}", input);
        assert_eq!(toks[0].text, input, "literal should span keyword'...'");
        assert_eq!(toks.len(), 2);
    }
}

#[test]
fn test_unknown_prefix_before_quote_is_not_a_type_literal() {
    // `name'x'` is an identifier followed by a string
    assert_eq!(
        kinds("name'x'"),
        vec![
            TokenKind::Identifier,
            TokenKind::StringLiteral,
            TokenKind::End
        ]
    );
}

#[test]
fn test_unterminated_type_literal() {
    let err = Lexer::new("datetime'2014").unwrap_err();
    assert!(matches!(err, odata_query::QueryError::Lexical { .. }));
}

// ============================================================================
// Errors and lookahead
// ============================================================================

#[test]
fn test_invalid_character() {
    let mut lexer = Lexer::new("a # b").unwrap();
    let err = lexer.next_token().unwrap_err();
    match err {
        odata_query::QueryError::Lexical { position, .. } => assert_eq!(position, 2),
        other => panic!("Expected lexical error, got {:?}", other),
    }
}

#[test]
fn test_token_positions() {
    let toks = tokens("price gt 100");
    assert_eq!(toks[0].position, 0);
    assert_eq!(toks[1].position, 6);
    assert_eq!(toks[2].position, 9);
}

#[test]
fn test_peek_is_side_effect_free() {
    let mut lexer = Lexer::new("a eq 1").unwrap();
    let first_peek = lexer.peek_token().unwrap();
    let second_peek = lexer.peek_token().unwrap();
    assert_eq!(first_peek, second_peek);
    assert_eq!(lexer.token().text, "a");

    // consuming after a peek yields exactly the peeked token
    let next = lexer.next_token().unwrap();
    assert_eq!(next, first_peek);
}
