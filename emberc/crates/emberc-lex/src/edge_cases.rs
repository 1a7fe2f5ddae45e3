//! Lexer edge cases and stream-level laws.

use crate::{scan, TokenKind};
use proptest::prelude::*;

#[test]
fn whitespace_only_sources() {
    for source in ["", " ", "\t\r", "\n\n\n", "   // only a comment"] {
        let tokens = scan(source);
        assert_eq!(tokens.len(), 1, "source {:?}", source);
        assert_eq!(tokens[0].kind, TokenKind::End);
    }
}

#[test]
fn comment_at_eof_without_newline() {
    let tokens = scan("1 // trailing");
    assert_eq!(tokens[0].kind, TokenKind::Int32);
    assert_eq!(tokens[1].kind, TokenKind::End);
}

#[test]
fn error_tokens_do_not_stop_the_scan() {
    let tokens = scan("@ # 1 ~ 2");
    let ints = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Int32)
        .count();
    let errors = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Error)
        .count();
    assert_eq!(ints, 2);
    assert_eq!(errors, 3);
}

#[test]
fn interpolation_with_nested_plain_string() {
    use TokenKind::*;
    let kinds: Vec<_> = scan("\"a${\"b\"}c\"")
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert_eq!(kinds, vec![Intrpl, Str, RBrace, Str, End]);
}

#[test]
fn interpolation_expression_spanning_lines() {
    let tokens = scan("\"${1 +\n2}\"");
    let plus = tokens.iter().find(|t| t.kind == TokenKind::Plus).unwrap();
    assert_eq!(plus.line, 1);
    let two = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Int32)
        .nth(1)
        .unwrap();
    assert_eq!(two.line, 2);
}

#[test]
fn unterminated_string_inside_interpolation() {
    // Inner string never closes, so every frame unwinds with errors.
    let tokens = scan("\"a${\"b");
    let messages: Vec<_> = tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Error)
        .map(|t| t.lexeme)
        .collect();
    assert!(messages.contains(&"Unterminated string"));
    assert!(messages.contains(&"Expected closing braces '}'"));
    assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
}

#[test]
fn non_ascii_bytes_outside_strings_are_errors() {
    let tokens = scan("1 \u{00e9} 2");
    assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
    assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
}

#[test]
fn non_ascii_bytes_inside_strings_are_content() {
    let tokens = scan("\"caf\u{00e9}\"");
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].lexeme, "\"caf\u{00e9}\"");
}

proptest! {
    // Totality: for every input, scan terminates and the stream ends
    // with exactly one End token.
    #[test]
    fn scan_is_total(source in "\\PC*") {
        let tokens = scan(&source);
        let ends = tokens.iter().filter(|t| t.kind == TokenKind::End).count();
        prop_assert_eq!(ends, 1);
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
    }

    // Interpolation balance: without lexical errors, a string with N
    // `${` openings produces N RBrace terminators and N+1 segments.
    #[test]
    fn interpolation_balance(parts in proptest::collection::vec("[a-z]{0,3}", 1..5)) {
        let mut source = String::from("\"");
        let openings = parts.len() - 1;
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                source.push_str("${1}");
            }
            source.push_str(part);
        }
        source.push('"');

        let tokens = scan(&source);
        prop_assert!(tokens.iter().all(|t| t.kind != TokenKind::Error));

        let braces = tokens.iter().filter(|t| t.kind == TokenKind::RBrace).count();
        let segments = tokens
            .iter()
            .filter(|t| matches!(t.kind, TokenKind::Intrpl | TokenKind::Str))
            .count();
        prop_assert_eq!(braces, openings);
        prop_assert_eq!(segments, openings + 1);
    }
}
