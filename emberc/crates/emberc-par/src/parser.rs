//! Pratt parser.
//!
//! Expressions are parsed with a precedence-climbing table keyed by
//! token kind: each entry names an optional prefix function, an
//! optional infix function, and the operator's precedence. Statement
//! parsing is plain recursive descent over the grammar
//!
//! ```text
//! program     -> declaration* END
//! declaration -> varDecl | statement
//! statement   -> block | logStmt
//! block       -> '{' declaration* '}'
//! logStmt     -> 'log' '(' expression ')' ';'
//! varDecl     -> 'let' IDENT (':' typeName)? '=' expression ';'
//! ```
//!
//! # Operand staging
//!
//! Instead of having parse functions return expression values, the
//! parser keeps the expression under construction in a `current` slot
//! and a staging stack of in-flight operands: a prefix function stages
//! the current expression and installs a new one, an infix function
//! pops its left operand back off the stack and combines. This keeps
//! every parse function the same `fn(&mut Parser)` shape the table
//! needs.
//!
//! # Recovery
//!
//! Any report latches the parser into panic mode; after the current
//! statement it skips tokens until just past a `;` or in front of a
//! statement-starting keyword, then resumes. `parse` returns `None`
//! whenever anything at all was reported, including lexical `Error`
//! tokens encountered in the stream.

use emberc_lex::{Token, TokenKind};
use emberc_util::{Handler, IndexVec, Type};

use crate::ast::{
    Ast, Binary, DeclId, DeclInfo, Expr, Literal, LogStmt, ScopeStmt, Stmt, Unary, VarDeclStmt,
    Variable,
};
use crate::scope::{ScopeId, ScopeTree};

/// Parse a token stream into an AST, or `None` if anything was
/// reported.
pub fn parse<'src>(tokens: Vec<Token<'src>>, handler: &mut Handler) -> Option<Ast> {
    Parser::new(tokens, handler).parse()
}

/// Precedence levels, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * / %
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Prec {
    /// One level tighter; used for the right operand of left-associative
    /// operators.
    fn next(self) -> Prec {
        use Prec::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

type ParseFn<'src, 'h> = fn(&mut Parser<'src, 'h>);

/// One row of the Pratt table.
struct Rule<'src, 'h> {
    prefix: Option<ParseFn<'src, 'h>>,
    infix: Option<ParseFn<'src, 'h>>,
    prec: Prec,
}

pub struct Parser<'src, 'h> {
    tokens: Vec<Token<'src>>,
    /// Index of the current (unconsumed) token.
    curr: usize,
    /// Index of the most recently consumed token.
    prev: usize,
    handler: &'h mut Handler,

    scopes: ScopeTree,
    decls: IndexVec<DeclId, DeclInfo>,
    current_scope: ScopeId,

    /// Staging stack of in-flight operands.
    stack: Vec<Option<Expr>>,
    /// The expression currently under construction.
    current: Option<Expr>,

    panicked: bool,
    ok: bool,
}

impl<'src, 'h> Parser<'src, 'h> {
    pub fn new(tokens: Vec<Token<'src>>, handler: &'h mut Handler) -> Self {
        debug_assert!(
            matches!(tokens.last(), Some(t) if t.kind == TokenKind::End),
            "token stream must end with End"
        );
        let scopes = ScopeTree::new();
        let current_scope = scopes.root();
        let mut parser = Self {
            tokens,
            curr: 0,
            prev: 0,
            handler,
            scopes,
            decls: IndexVec::new(),
            current_scope,
            stack: Vec::new(),
            current: None,
            panicked: false,
            ok: true,
        };
        // The stream may open with lexical errors.
        parser.skip_error_tokens();
        parser
    }

    /// Parse the whole program. `None` means at least one report was
    /// made and the pipeline must stop.
    pub fn parse(mut self) -> Option<Ast> {
        let root_scope = self.current_scope;
        let statements = self.declarations(TokenKind::End);
        let root = ScopeStmt {
            statements,
            scope: root_scope,
            line: 1,
        };

        if self.ok {
            Some(Ast {
                root,
                scopes: self.scopes,
                decls: self.decls,
            })
        } else {
            None
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// Parse declarations until `terminator` (or End) is in front.
    fn declarations(&mut self, terminator: TokenKind) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.check(terminator) && !self.check(TokenKind::End) {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
            if self.panicked {
                self.synchronize();
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        if self.match_kind(TokenKind::Log) {
            self.log_statement()
        } else if self.match_kind(TokenKind::Let) {
            self.var_declaration()
        } else if self.match_kind(TokenKind::LBrace) {
            self.block()
        } else {
            let token = self.current_token();
            self.report(token.line, token.lexeme, "Expect statement here");
            // Consume the offending token so recovery always makes
            // progress, even when it is itself a sync keyword.
            self.advance();
            None
        }
    }

    fn block(&mut self) -> Option<Stmt> {
        let line = self.previous().line;

        let scope = self.scopes.push_scope(self.current_scope);
        let saved = self.current_scope;
        self.current_scope = scope;

        let statements = self.declarations(TokenKind::RBrace);

        self.current_scope = saved;
        self.expect(TokenKind::RBrace, "Expect '}' after block");

        Some(Stmt::Scope(ScopeStmt {
            statements,
            scope,
            line,
        }))
    }

    fn log_statement(&mut self) -> Option<Stmt> {
        let line = self.previous().line;

        self.expect(TokenKind::LParen, "Expect '(' after 'log'");
        let expr = self.expression()?;
        self.expect(TokenKind::RParen, "Expect ')' after expression");
        self.expect(TokenKind::Semicolon, "Expect ';' after statement");

        Some(Stmt::Log(LogStmt { expr, line }))
    }

    fn var_declaration(&mut self) -> Option<Stmt> {
        let line = self.previous().line;

        if !self.match_kind(TokenKind::Ident) {
            let token = self.current_token();
            self.report(token.line, token.lexeme, "Expect identifier after 'let'");
            return None;
        }
        let name = self.previous().lexeme.to_string();

        let mut ty = Type::None;
        if self.match_kind(TokenKind::Colon) {
            let token = self.current_token();
            match type_from_token(token.kind) {
                Some(annotated) => {
                    ty = annotated;
                    self.advance();
                }
                None => self.report(token.line, token.lexeme, "Expect type name after ':'"),
            }
        }

        self.expect(TokenKind::Eq, "Expected equals operator");
        let expr = self.expression()?;
        self.expect(TokenKind::Semicolon, "Expect ';' after statement");

        let decl = self.decls.push(DeclInfo {
            name: name.clone(),
            line,
            ty,
            slot: None,
        });

        Some(Stmt::VarDecl(VarDeclStmt {
            name,
            expr,
            scope: self.current_scope,
            decl,
            ty,
            line,
        }))
    }

    // =========================================================================
    // Expressions (Pratt core)
    // =========================================================================

    /// Parse one full expression and hand it out, leaving the staging
    /// stack the way it was found.
    fn expression(&mut self) -> Option<Expr> {
        let depth = self.stack.len();
        self.parse_precedence(Prec::Assignment);
        self.stack.truncate(depth);
        self.current.take()
    }

    fn parse_precedence(&mut self, prec: Prec) {
        self.advance();

        let Some(prefix) = Self::rule(self.previous().kind).prefix else {
            let token = self.previous();
            self.report(token.line, token.lexeme, "Expect expression here");
            return;
        };
        prefix(self);

        while prec <= Self::rule(self.current_token().kind).prec {
            self.advance();
            let Some(infix) = Self::rule(self.previous().kind).infix else {
                let token = self.previous();
                self.report(token.line, token.lexeme, "Expect operator here");
                return;
            };
            infix(self);
        }
    }

    /// The Pratt table. Token kinds without a row parse as neither
    /// prefix nor infix and terminate any expression in front of them.
    fn rule(kind: TokenKind) -> Rule<'src, 'h> {
        use TokenKind::*;
        type Row<'a, 'b> = (Option<ParseFn<'a, 'b>>, Option<ParseFn<'a, 'b>>, Prec);
        let (prefix, infix, prec): Row<'src, 'h> = match kind {
            LParen => (Some(Self::grouping), None, Prec::None),
            Minus => (Some(Self::unary), Some(Self::binary), Prec::Term),
            Plus => (None, Some(Self::binary), Prec::Term),
            Star | Slash | Percent => (None, Some(Self::binary), Prec::Factor),
            Bang => (Some(Self::unary), None, Prec::None),
            BangEq | EqEq => (None, Some(Self::binary), Prec::Equality),
            Lt | LtEq | Gt | GtEq => (None, Some(Self::binary), Prec::Comparison),
            // Literal tokens: the lexer only tags numbers i32/f32/f64.
            Int32 | Float32 | Float64 => (Some(Self::number), None, Prec::Primary),
            Str | Intrpl | True | False => (Some(Self::literal), None, Prec::Primary),
            Ident => (Some(Self::variable), None, Prec::None),
            _ => (None, None, Prec::None),
        };
        Rule {
            prefix,
            infix,
            prec,
        }
    }

    fn grouping(&mut self) {
        self.parse_precedence(Prec::Assignment);
        self.expect(TokenKind::RParen, "Expect ')' after expression");
    }

    fn binary(&mut self) {
        let op = self.previous();
        let prec = Self::rule(op.kind).prec;

        // Left-associative: the right operand binds one level tighter.
        self.parse_precedence(prec.next());

        use TokenKind::*;
        match op.kind {
            Plus => self.make_binary(op, Expr::Add),
            Minus => self.make_binary(op, Expr::Sub),
            Star => self.make_binary(op, Expr::Mul),
            Slash => self.make_binary(op, Expr::Div),
            Percent => self.make_binary(op, Expr::Mod),
            Lt => self.make_binary(op, Expr::Less),
            Gt => self.make_binary(op, Expr::Greater),
            EqEq => self.make_binary(op, Expr::Equal),
            // `a <= b` is `!(a > b)`, `a >= b` is `!(a < b)`,
            // `a != b` is `!(a == b)`.
            LtEq => {
                self.make_binary(op, Expr::Greater);
                self.make_unary(op, Expr::Not);
            }
            GtEq => {
                self.make_binary(op, Expr::Less);
                self.make_unary(op, Expr::Not);
            }
            BangEq => {
                self.make_binary(op, Expr::Equal);
                self.make_unary(op, Expr::Not);
            }
            _ => unreachable!("binary rule on {:?}", op.kind),
        }
    }

    fn unary(&mut self) {
        let op = self.previous();

        self.parse_precedence(Prec::Unary);

        match op.kind {
            TokenKind::Minus => self.make_unary(op, Expr::Negate),
            TokenKind::Bang => self.make_unary(op, Expr::Not),
            _ => unreachable!("unary rule on {:?}", op.kind),
        }
    }

    /// Numeric literal, with an optional primitive-kind suffix token
    /// overriding the lexer's default tagging.
    fn number(&mut self) {
        let token = self.previous();
        let mut ty = match token.kind {
            TokenKind::Int32 => Type::I32,
            TokenKind::Float32 => Type::F32,
            TokenKind::Float64 => Type::F64,
            _ => unreachable!("number rule on {:?}", token.kind),
        };

        if let Some(suffix) = type_from_token(self.current_token().kind) {
            // An integer lexeme parses as any numeric type; a float
            // lexeme only as a float.
            let compatible = if ty.is_float() {
                suffix.is_float()
            } else {
                suffix != Type::Bool && suffix != Type::Str
            };
            if compatible {
                ty = suffix;
                self.advance();
            }
        }

        self.make_literal(token, ty);
    }

    /// Booleans, plain strings, and interpolated string heads.
    fn literal(&mut self) {
        let token = self.previous();
        match token.kind {
            TokenKind::True | TokenKind::False => self.make_literal(token, Type::Bool),
            TokenKind::Str => self.make_literal(token, Type::Str),
            TokenKind::Intrpl => self.interpolated_string(),
            _ => unreachable!("literal rule on {:?}", token.kind),
        }
    }

    /// Lower `INTRPL expr '}' (INTRPL expr '}')* STRING` into `Add`
    /// nodes folded left-to-right. The node types are left for the
    /// checker, whose string rule infers `string` for every fold.
    fn interpolated_string(&mut self) {
        let head = self.previous();
        self.make_literal(head, Type::Str);

        loop {
            self.parse_precedence(Prec::Assignment);
            self.make_add(head.line);
            self.expect(TokenKind::RBrace, "Expect '}' after interpolation");

            self.advance();
            let segment = self.previous();
            match segment.kind {
                TokenKind::Str => {
                    self.make_literal(segment, Type::Str);
                    self.make_add(segment.line);
                    return;
                }
                TokenKind::Intrpl => {
                    self.make_literal(segment, Type::Str);
                    self.make_add(segment.line);
                }
                _ => {
                    self.report(
                        segment.line,
                        segment.lexeme,
                        "Expect string segment after interpolation",
                    );
                    return;
                }
            }
        }
    }

    fn variable(&mut self) {
        let token = self.previous();
        self.stage(Expr::Variable(Variable {
            word: token.lexeme.to_string(),
            line: token.line,
            ty: Type::None,
            decl: None,
        }));
    }

    // =========================================================================
    // Node construction
    // =========================================================================

    /// Stage the expression under construction and start a new one.
    fn stage(&mut self, expr: Expr) {
        let staged = self.current.take();
        self.stack.push(staged);
        self.current = Some(expr);
    }

    fn make_literal(&mut self, token: Token<'src>, ty: Type) {
        self.stage(Expr::Literal(Literal {
            word: token.lexeme.to_string(),
            line: token.line,
            ty,
        }));
    }

    /// Pop the staged left operand and combine it with the current
    /// expression. Missing operands mean an error was already reported;
    /// the combination is dropped quietly.
    fn make_binary(&mut self, op: Token<'src>, build: fn(Binary) -> Expr) {
        let rhs = self.current.take();
        let lhs = self.stack.pop().flatten();
        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
            self.current = Some(build(Binary {
                word: op.lexeme.to_string(),
                line: op.line,
                ty: Type::None,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }));
        }
    }

    fn make_unary(&mut self, op: Token<'src>, build: fn(Unary) -> Expr) {
        if let Some(rhs) = self.current.take() {
            self.current = Some(build(Unary {
                word: op.lexeme.to_string(),
                line: op.line,
                ty: Type::None,
                rhs: Box::new(rhs),
            }));
        }
    }

    /// Synthetic `Add` used by interpolation lowering.
    fn make_add(&mut self, line: u32) {
        let rhs = self.current.take();
        let lhs = self.stack.pop().flatten();
        if let (Some(lhs), Some(rhs)) = (lhs, rhs) {
            self.current = Some(Expr::Add(Binary {
                word: "+".to_string(),
                line,
                ty: Type::None,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            }));
        }
    }

    // =========================================================================
    // Token plumbing
    // =========================================================================

    fn current_token(&self) -> Token<'src> {
        self.tokens[self.curr]
    }

    fn previous(&self) -> Token<'src> {
        self.tokens[self.prev]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token().kind == kind
    }

    /// Consume the current token. Lexical `Error` tokens in front of
    /// the new position are reported and skipped here, so the rest of
    /// the parser never sees them.
    fn advance(&mut self) {
        self.prev = self.curr;
        if self.curr + 1 < self.tokens.len() {
            self.curr += 1;
        }
        self.skip_error_tokens();
    }

    fn skip_error_tokens(&mut self) {
        while self.current_token().kind == TokenKind::Error {
            let token = self.current_token();
            self.report(token.line, "", token.lexeme);
            if self.curr + 1 >= self.tokens.len() {
                break;
            }
            self.curr += 1;
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Consume `kind` or report `message` at the current token.
    fn expect(&mut self, kind: TokenKind, message: &str) {
        if self.check(kind) {
            self.advance();
            return;
        }
        let token = self.current_token();
        self.report(token.line, token.lexeme, message);
    }

    fn report(&mut self, line: u32, word: &str, message: &str) {
        self.ok = false;
        self.panicked = true;
        self.handler.report(line, word, message);
    }

    /// Panic-mode recovery: skip to just past a `;` or in front of a
    /// statement-starting keyword.
    fn synchronize(&mut self) {
        self.panicked = false;

        use TokenKind::*;
        while !self.check(End) {
            if self.previous().kind == Semicolon {
                return;
            }
            match self.current_token().kind {
                Class | Fun | Let | For | If | While | Log => return,
                _ => self.advance(),
            }
        }
    }
}

/// Map a type-name token onto a value type. `char` is lexed as a type
/// keyword but has no value type, so it answers `None` like any
/// non-type token.
fn type_from_token(kind: TokenKind) -> Option<Type> {
    use TokenKind::*;
    Some(match kind {
        Bool => Type::Bool,
        Int8 => Type::I8,
        Int16 => Type::I16,
        Int32 => Type::I32,
        Int64 => Type::I64,
        UInt8 => Type::U8,
        UInt16 => Type::U16,
        UInt32 => Type::U32,
        UInt64 => Type::U64,
        Float32 => Type::F32,
        Float64 => Type::F64,
        Str => Type::Str,
        _ => return None,
    })
}
