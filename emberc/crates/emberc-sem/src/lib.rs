//! emberc-sem - Semantic analysis for Ember.
//!
//! One walk over the AST that does scoped name resolution and type
//! inference at the same time, writing the inferred type back onto
//! every expression node. Statements are the synchronization points:
//! when a subtree fails, the failure is reported, the statement is
//! abandoned, and checking continues with the next statement so as many
//! errors as possible surface in a single pass. The walk returns one
//! validity flag; it never short-circuits.
//!
//! Typing rules:
//!
//! - binary operators require both operand types equal and known; the
//!   comparisons produce `bool`, the arithmetic operators produce the
//!   operand type;
//! - `+` additionally accepts mixed operands when at least one side is
//!   a string, producing a string (this is what interpolation lowers
//!   into);
//! - unary `-` propagates its operand type but is forbidden on unsigned
//!   integers; `!` always produces `bool`;
//! - a declaration without an annotation adopts its initializer's type,
//!   an annotated one requires an exact match.
//!
//! Checking also assigns every declaration its VM local slot. Slots are
//! the declaration's own index, so a second run over a checked tree is
//! a no-op (types, tables, slots and validity all come out unchanged).

use emberc_par::{Ast, Binary, DeclId, Expr, ScopeId, ScopeStmt, Stmt, Unary};
use emberc_util::{Handler, Type};

/// Check `ast`, filling in types, symbol tables and local slots.
/// Returns `false` if anything was reported.
pub fn check(ast: &mut Ast, handler: &mut Handler) -> bool {
    let Ast {
        root,
        scopes,
        decls,
    } = ast;

    let mut checker = Checker {
        scopes,
        decls,
        handler,
        current_scope: root.scope,
        valid: true,
    };
    checker.check_scope(root);
    checker.valid
}

struct Checker<'a> {
    scopes: &'a mut emberc_par::ScopeTree,
    decls: &'a mut emberc_util::IndexVec<DeclId, emberc_par::DeclInfo>,
    handler: &'a mut Handler,
    current_scope: ScopeId,
    valid: bool,
}

impl Checker<'_> {
    fn check_scope(&mut self, scope: &mut ScopeStmt) {
        let saved = self.current_scope;
        self.current_scope = scope.scope;

        for stmt in &mut scope.statements {
            self.check_stmt(stmt);
        }

        self.current_scope = saved;
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Scope(scope) => self.check_scope(scope),
            Stmt::Log(log) => {
                let ty = self.check_expr(&mut log.expr);
                if ty == Type::None {
                    self.report(log.line, "", "Cannot log this expression as it is incorrect");
                }
            }
            Stmt::VarDecl(decl) => self.check_var_decl(decl),
        }
    }

    fn check_var_decl(&mut self, decl: &mut emberc_par::VarDeclStmt) {
        // Within one scope a name is declared at most once. Finding the
        // declaration's own id means this is a re-run, not a clash.
        if let Some(existing) = self.scopes.lookup_local(decl.scope, &decl.name) {
            if existing != decl.decl {
                let previous_line = self.decls[existing].line;
                self.report(
                    decl.line,
                    &decl.name,
                    format!(
                        "Cannot declare variable '{}' as it already exists at [line: {}]",
                        decl.name, previous_line
                    ),
                );
                return;
            }
        }

        let expr_ty = self.check_expr(&mut decl.expr);
        if expr_ty == Type::None {
            self.report(
                decl.line,
                &decl.name,
                "Could not infer type for assigned expression",
            );
            return;
        }

        if decl.ty == Type::None {
            decl.ty = expr_ty;
        } else if decl.ty != expr_ty {
            self.report(
                decl.line,
                &decl.name,
                format!(
                    "Type mismatch, expected '{}' but got '{}'",
                    decl.ty, expr_ty
                ),
            );
            return;
        }

        self.decls[decl.decl].ty = decl.ty;
        self.assign_slot(decl.decl, decl.line, &decl.name);
        self.scopes.bind(decl.scope, &decl.name, decl.decl);
    }

    fn check_expr(&mut self, expr: &mut Expr) -> Type {
        match expr {
            Expr::Add(b) => self.check_add(b),
            Expr::Sub(b) | Expr::Mul(b) | Expr::Div(b) | Expr::Mod(b) => {
                self.check_arithmetic(b)
            }
            Expr::Less(b) | Expr::Equal(b) | Expr::Greater(b) => self.check_comparison(b),
            Expr::Negate(u) => self.check_negate(u),
            Expr::Not(u) => self.check_not(u),
            Expr::Literal(lit) => lit.ty,
            Expr::Variable(var) => self.check_variable(var),
        }
    }

    /// `+` is arithmetic on equal types and concatenation when at least
    /// one side is a string.
    fn check_add(&mut self, b: &mut Binary) -> Type {
        let lhs = self.check_expr(&mut b.lhs);
        let rhs = self.check_expr(&mut b.rhs);
        if lhs == Type::None || rhs == Type::None {
            return Type::None;
        }

        if lhs == rhs {
            b.ty = lhs;
            return lhs;
        }
        if lhs == Type::Str || rhs == Type::Str {
            b.ty = Type::Str;
            return Type::Str;
        }

        self.report(
            b.line,
            &b.word,
            format!(
                "Cannot perform '+' operation due to type mismatch, '{}' & '{}'. \
                 Concatenation needs at least one of them to be string",
                lhs, rhs
            ),
        );
        Type::None
    }

    fn check_arithmetic(&mut self, b: &mut Binary) -> Type {
        let lhs = self.check_expr(&mut b.lhs);
        let rhs = self.check_expr(&mut b.rhs);
        if lhs == Type::None || rhs == Type::None {
            return Type::None;
        }

        if lhs != rhs {
            self.report(
                b.line,
                &b.word,
                format!(
                    "Cannot perform '{}' operation due to type mismatch, '{}' & '{}'. \
                     Expect expressions of same type",
                    b.word, lhs, rhs
                ),
            );
            return Type::None;
        }

        b.ty = lhs;
        lhs
    }

    /// Comparisons require equal operand types and produce `bool`; the
    /// operand type stays readable on the children for the emitter.
    fn check_comparison(&mut self, b: &mut Binary) -> Type {
        let lhs = self.check_expr(&mut b.lhs);
        let rhs = self.check_expr(&mut b.rhs);
        if lhs == Type::None || rhs == Type::None {
            return Type::None;
        }

        if lhs != rhs {
            self.report(
                b.line,
                &b.word,
                format!(
                    "Cannot perform '{}' operation due to type mismatch, '{}' & '{}'. \
                     Expect expressions of same type",
                    b.word, lhs, rhs
                ),
            );
            return Type::None;
        }

        b.ty = Type::Bool;
        Type::Bool
    }

    fn check_negate(&mut self, u: &mut Unary) -> Type {
        let ty = self.check_expr(&mut u.rhs);
        if ty == Type::None {
            return Type::None;
        }

        if ty.is_unsigned() {
            self.report(
                u.line,
                &u.word,
                "Cannot perform unary '-' on unsigned numeric expression",
            );
            return Type::None;
        }

        u.ty = ty;
        ty
    }

    fn check_not(&mut self, u: &mut Unary) -> Type {
        let ty = self.check_expr(&mut u.rhs);
        if ty == Type::None {
            return Type::None;
        }

        u.ty = Type::Bool;
        Type::Bool
    }

    fn check_variable(&mut self, var: &mut emberc_par::Variable) -> Type {
        match self.scopes.resolve(self.current_scope, &var.word) {
            Some(decl) => {
                let ty = self.decls[decl].ty;
                if ty == Type::None {
                    // The declaration itself failed; it already reported.
                    return Type::None;
                }
                var.decl = Some(decl);
                var.ty = ty;
                ty
            }
            None => {
                self.report(
                    var.line,
                    &var.word,
                    format!("Undefined variable '{}'", var.word),
                );
                Type::None
            }
        }
    }

    /// Local slots are the declaration's own index; assigned once.
    fn assign_slot(&mut self, decl: DeclId, line: u32, name: &str) {
        if self.decls[decl].slot.is_some() {
            return;
        }
        match u16::try_from(decl.0) {
            Ok(slot) => self.decls[decl].slot = Some(slot),
            Err(_) => self.report(line, name, "Too many local variables"),
        }
    }

    fn report(&mut self, line: u32, word: &str, message: impl Into<String>) {
        self.valid = false;
        self.handler.report(line, word, message);
    }
}
