//! emberc-par - Parsing for Ember.
//!
//! Consumes the token stream produced by `emberc-lex` and builds the
//! scoped AST: a Pratt parser for expressions, recursive descent for
//! statements, panic-mode recovery at statement boundaries. All
//! diagnostics go through the shared [`emberc_util::Handler`] sink;
//! [`parse`] returns `None` whenever anything was reported.

pub mod ast;
mod parser;
pub mod scope;

pub use ast::{
    Ast, Binary, DeclId, DeclInfo, Expr, Literal, LogStmt, ScopeStmt, Stmt, Unary, VarDeclStmt,
    Variable,
};
pub use parser::{parse, Parser};
pub use scope::{ScopeData, ScopeId, ScopeTree};
