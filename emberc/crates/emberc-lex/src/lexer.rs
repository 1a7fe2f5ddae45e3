//! Single-pass lexer.
//!
//! One forward pass over the source, no backtracking. Whitespace and
//! `//` comments are skipped, newlines bump the line counter, and
//! two-character operators are matched greedily (`<=` before `<`).
//!
//! The lexer never fails: every malformed construct becomes an `Error`
//! token carrying its message, and scanning continues. The parser is
//! the one that turns those tokens into reports.
//!
//! # Interpolation flattening
//!
//! `"x=${1 + 2}y"` is flattened into the token stream
//! `Intrpl("x=) Int32(1) Plus Int32(2) RBrace Str(y")` - the segment
//! tokens keep their source delimiters, and the expression tokens sit
//! inline between them. Each `${` opens a fresh frame terminated by its
//! matching `}`, so interpolations nest.

use crate::token::{Token, TokenKind};

/// Scan `source` into a token sequence ending with exactly one `End`.
pub fn scan(source: &str) -> Vec<Token<'_>> {
    Lexer::new(source).scan()
}

pub struct Lexer<'src> {
    text: &'src str,
    bytes: &'src [u8],
    /// First byte of the token being scanned.
    start: usize,
    /// Current byte position.
    curr: usize,
    line: u32,
    tokens: Vec<Token<'src>>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            text: source,
            bytes: source.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            tokens: Vec::new(),
        }
    }

    /// Consume the lexer and produce the full token sequence.
    pub fn scan(mut self) -> Vec<Token<'src>> {
        loop {
            let token = self.scan_token();
            let is_end = token.kind == TokenKind::End;
            self.tokens.push(token);
            if is_end {
                break;
            }
        }
        self.tokens
    }

    /// Scan one token.
    ///
    /// Interpolated strings push their segment and expression tokens as
    /// a side effect and return the final closing segment, so callers
    /// must only inspect the returned token, never the buffer tail.
    fn scan_token(&mut self) -> Token<'src> {
        self.skip_whitespace();

        self.start = self.curr;

        if self.is_at_end() {
            return self.make_token(TokenKind::End);
        }

        let c = self.advance();

        if c.is_ascii_digit() {
            return self.number_token();
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.identifier_token();
        }

        use TokenKind::*;
        match c {
            b'(' => self.make_token(LParen),
            b')' => self.make_token(RParen),
            b'{' => self.make_token(LBrace),
            b'}' => self.make_token(RBrace),
            b',' => self.make_token(Comma),
            b';' => self.make_token(Semicolon),
            b':' => self.make_token(Colon),
            b'.' => self.make_token(Dot),
            b'+' => self.make_token(Plus),
            b'-' => self.make_token(Minus),
            b'*' => self.make_token(Star),
            b'/' => self.make_token(Slash),
            b'%' => self.make_token(Percent),
            b'!' => {
                if self.match_byte(b'=') {
                    self.make_token(BangEq)
                } else {
                    self.make_token(Bang)
                }
            }
            b'=' => {
                if self.match_byte(b'=') {
                    self.make_token(EqEq)
                } else {
                    self.make_token(Eq)
                }
            }
            b'<' => {
                if self.match_byte(b'=') {
                    self.make_token(LtEq)
                } else {
                    self.make_token(Lt)
                }
            }
            b'>' => {
                if self.match_byte(b'=') {
                    self.make_token(GtEq)
                } else {
                    self.make_token(Gt)
                }
            }
            b'"' => self.string_token(),
            _ => self.error_token("Unexpected character token"),
        }
    }

    /// Scan a string literal starting at the already-consumed `"`.
    ///
    /// Emits interior interpolation tokens as a side effect and returns
    /// the closing segment (delimiters included in the lexemes).
    fn string_token(&mut self) -> Token<'src> {
        loop {
            if self.is_at_end() {
                return self.error_token("Unterminated string");
            }
            match self.peek() {
                b'"' => break,
                b'\n' => {
                    self.line += 1;
                    self.curr += 1;
                }
                b'$' if self.peek_next() == b'{' => {
                    let segment = self.make_token(TokenKind::Intrpl);
                    self.tokens.push(segment);
                    self.interpolation();
                    // Rest of the string continues after the '}'.
                    self.start = self.curr;
                }
                _ => self.curr += 1,
            }
        }

        self.curr += 1; // closing '"'
        self.make_token(TokenKind::Str)
    }

    /// Scan the expression tokens of one `${ ... }` frame.
    ///
    /// Pushes every token up to and including the matching `RBrace`.
    /// Nested strings open their own frames inside a single
    /// `scan_token` call, so only this frame's directly returned tokens
    /// are inspected for the terminator.
    fn interpolation(&mut self) {
        self.curr += 2; // "${"

        loop {
            let token = self.scan_token();
            if token.kind == TokenKind::End {
                let error = self.error_token("Expected closing braces '}'");
                self.tokens.push(error);
                return;
            }
            let done = token.kind == TokenKind::RBrace;
            self.tokens.push(token);
            if done {
                return;
            }
        }
    }

    /// Scan a numeric literal.
    ///
    /// Digits, optional `.` + digits (making it a float), optional `f`
    /// suffix marking `f32`. Defaults: integers are `i32`, floats `f64`.
    fn number_token(&mut self) -> Token<'src> {
        let mut kind = TokenKind::Int32;

        while self.peek().is_ascii_digit() {
            self.curr += 1;
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            kind = TokenKind::Float64;
            self.curr += 1;
            while self.peek().is_ascii_digit() {
                self.curr += 1;
            }
            if self.peek() == b'f' {
                kind = TokenKind::Float32;
                self.curr += 1;
            }
        }

        self.make_token(kind)
    }

    fn identifier_token(&mut self) -> Token<'src> {
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            self.curr += 1;
        }

        use TokenKind::*;
        let kind = match &self.text[self.start..self.curr] {
            "and" => And,
            "bool" => Bool,
            "char" => Char,
            "class" => Class,
            "else" => Else,
            "f32" => Float32,
            "f64" => Float64,
            "false" => False,
            "for" => For,
            "fun" => Fun,
            "i8" => Int8,
            "i16" => Int16,
            "i32" => Int32,
            "i64" => Int64,
            "if" => If,
            "let" => Let,
            "log" => Log,
            "nil" => Nil,
            "or" => Or,
            "return" => Return,
            "string" => Str,
            "super" => Super,
            "this" => This,
            "true" => True,
            "u8" => UInt8,
            "u16" => UInt16,
            "u32" => UInt32,
            "u64" => UInt64,
            "while" => While,
            _ => Ident,
        };

        self.make_token(kind)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b'\n' => {
                    self.line += 1;
                    self.curr += 1;
                }
                b' ' | b'\r' | b'\t' => self.curr += 1,
                b'/' if self.peek_next() == b'/' => {
                    while !self.is_at_end() && self.peek() != b'\n' {
                        self.curr += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token<'src> {
        Token {
            kind,
            lexeme: &self.text[self.start..self.curr],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'src> {
        Token {
            kind: TokenKind::Error,
            lexeme: message,
            line: self.line,
        }
    }

    #[inline]
    fn peek(&self) -> u8 {
        self.bytes.get(self.curr).copied().unwrap_or(0)
    }

    #[inline]
    fn peek_next(&self) -> u8 {
        self.bytes.get(self.curr + 1).copied().unwrap_or(0)
    }

    /// Return the current byte and advance past it.
    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.curr];
        self.curr += 1;
        c
    }

    /// Consume the current byte iff it equals `expected`.
    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.curr] != expected {
            return false;
        }
        self.curr += 1;
        true
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        self.curr >= self.bytes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        scan(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_source_is_just_end() {
        let tokens = scan("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::End);
    }

    #[test]
    fn punctuation_and_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("( ) { } , ; : . + - * / %"),
            vec![
                LParen, RParen, LBrace, RBrace, Comma, Semicolon, Colon, Dot, Plus, Minus, Star,
                Slash, Percent, End
            ]
        );
    }

    #[test]
    fn two_char_operators_match_greedily() {
        use TokenKind::*;
        assert_eq!(
            kinds("! != = == < <= > >="),
            vec![Bang, BangEq, Eq, EqEq, Lt, LtEq, Gt, GtEq, End]
        );
        // No space: `<=` must win over `<` followed by `=`.
        assert_eq!(kinds("<=>="), vec![LtEq, GtEq, End]);
    }

    #[test]
    fn line_comments_are_skipped() {
        use TokenKind::*;
        assert_eq!(kinds("1 // the rest is gone ;\n2"), vec![Int32, Int32, End]);
    }

    #[test]
    fn newlines_count_lines() {
        let tokens = scan("1\n2\n\n3");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[2].line, 4);
    }

    #[test]
    fn integer_literal_defaults_to_i32() {
        let tokens = scan("42");
        assert_eq!(tokens[0].kind, TokenKind::Int32);
        assert_eq!(tokens[0].lexeme, "42");
    }

    #[test]
    fn float_literal_defaults_to_f64() {
        let tokens = scan("3.75");
        assert_eq!(tokens[0].kind, TokenKind::Float64);
        assert_eq!(tokens[0].lexeme, "3.75");
    }

    #[test]
    fn float_f_suffix_marks_f32() {
        let tokens = scan("1.5f");
        assert_eq!(tokens[0].kind, TokenKind::Float32);
        assert_eq!(tokens[0].lexeme, "1.5f");
    }

    #[test]
    fn dot_without_digits_is_not_a_float() {
        use TokenKind::*;
        // `1.` is an int followed by a dot (method-call style).
        assert_eq!(kinds("1."), vec![Int32, Dot, End]);
    }

    #[test]
    fn numeric_suffix_tokens_follow_the_literal() {
        use TokenKind::*;
        assert_eq!(kinds("1i8"), vec![Int32, Int8, End]);
        assert_eq!(kinds("7u64"), vec![Int32, UInt64, End]);
    }

    #[test]
    fn every_keyword_is_recognised() {
        use TokenKind::*;
        let table = [
            ("and", And),
            ("bool", Bool),
            ("char", Char),
            ("class", Class),
            ("else", Else),
            ("f32", Float32),
            ("f64", Float64),
            ("false", False),
            ("for", For),
            ("fun", Fun),
            ("i8", Int8),
            ("i16", Int16),
            ("i32", Int32),
            ("i64", Int64),
            ("if", If),
            ("let", Let),
            ("log", Log),
            ("nil", Nil),
            ("or", Or),
            ("return", Return),
            ("string", Str),
            ("super", Super),
            ("this", This),
            ("true", True),
            ("u8", UInt8),
            ("u16", UInt16),
            ("u32", UInt32),
            ("u64", UInt64),
            ("while", While),
        ];
        for (word, kind) in table {
            let tokens = scan(word);
            assert_eq!(tokens[0].kind, kind, "keyword {:?}", word);
            assert_eq!(tokens[0].lexeme, word);
        }
    }

    #[test]
    fn near_keywords_are_identifiers() {
        for word in ["lets", "logg", "i3", "fals", "an", "_if", "classy"] {
            let tokens = scan(word);
            assert_eq!(tokens[0].kind, TokenKind::Ident, "word {:?}", word);
        }
    }

    #[test]
    fn plain_string_keeps_quotes_in_lexeme() {
        let tokens = scan("\"abc\"");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "\"abc\"");
    }

    #[test]
    fn newline_inside_string_counts_lines() {
        let tokens = scan("\"a\nb\" 1");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn interpolation_flattens_into_the_stream() {
        use TokenKind::*;
        let tokens = scan("\"x=${1 + 2}y\"");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Intrpl, Int32, Plus, Int32, RBrace, Str, End]);
        assert_eq!(tokens[0].lexeme, "\"x=");
        assert_eq!(tokens[5].lexeme, "y\"");
    }

    #[test]
    fn consecutive_interpolations() {
        use TokenKind::*;
        let tokens = scan("\"a${1}b${2}c\"");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Intrpl, Int32, RBrace, Intrpl, Int32, RBrace, Str, End]
        );
        assert_eq!(tokens[0].lexeme, "\"a");
        assert_eq!(tokens[3].lexeme, "b");
        assert_eq!(tokens[6].lexeme, "c\"");
    }

    #[test]
    fn interpolations_nest() {
        use TokenKind::*;
        // Depth 2: the inner string opens its own frame.
        let tokens = scan("\"a${\"b${1}c\"}d\"");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Intrpl, Intrpl, Int32, RBrace, Str, RBrace, Str, End]
        );
        assert_eq!(tokens[0].lexeme, "\"a");
        assert_eq!(tokens[1].lexeme, "\"b");
        assert_eq!(tokens[4].lexeme, "c\"");
        assert_eq!(tokens[6].lexeme, "d\"");
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let tokens = scan("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(tokens[0].lexeme, "Unterminated string");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::End);
    }

    #[test]
    fn unclosed_interpolation_reports_both_errors() {
        use TokenKind::*;
        let tokens = scan("\"x=${1 + 2");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![Intrpl, Int32, Plus, Int32, Error, Error, End]);
        assert_eq!(tokens[4].lexeme, "Expected closing braces '}'");
        assert_eq!(tokens[5].lexeme, "Unterminated string");
    }

    #[test]
    fn unexpected_character_is_an_error_token() {
        let tokens = scan("1 @ 2");
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(tokens[1].lexeme, "Unexpected character token");
        // Scanning continues past the bad character.
        assert_eq!(tokens[2].kind, TokenKind::Int32);
    }
}
