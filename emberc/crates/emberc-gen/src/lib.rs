//! emberc-gen - Bytecode emission for Ember.
//!
//! Post-order walk over the checked AST producing the flat byte stream
//! and the interned string table, both returned by value; the emitter
//! holds no global state. Every byte is stamped with the source line of
//! the node that produced it.
//!
//! Lowering rules:
//!
//! - binary arithmetic emits left, right, then the opcode - the `*F`
//!   variant when the node's type is a float;
//! - `Equal` emits `CMPE`/`CMPEF` by operand type;
//! - `Less`/`Greater` emit `CMP`/`CMPF` (which pushes -1/0/1), then
//!   `LOAD i8 -1` or `LOAD i8 +1` and `CMPE`, turning the ordering into
//!   a bool;
//! - literals are converted from their source lexeme here (the parser
//!   and checker never touch values) and emitted as `LOAD` + type tag +
//!   raw little-endian bytes, or interned and emitted as `LOADS` +
//!   handle for strings;
//! - `let` emits its initializer followed by `STORE slot`; a variable
//!   reference emits `LOADL slot`;
//! - one `RET`, stamped with the last emitted line, closes the unit.

use emberc_byt::{ByteCode, Opcode};
use emberc_par::{Ast, Binary, Expr, Literal, ScopeStmt, Stmt, Unary};
use emberc_util::{StringTable, Type};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmitError {
    /// A literal lexeme does not fit its checked type, e.g. `300i8`.
    #[error("[line: {line}] invalid {ty} literal '{word}'")]
    BadLiteral { word: String, ty: Type, line: u32 },

    /// A variable survived checking without a resolved declaration or
    /// slot. Unreachable for ASTs the checker accepted.
    #[error("[line: {line}] variable '{name}' has no storage")]
    MissingStorage { name: String, line: u32 },
}

/// Lower a checked AST into `(bytecode, string table)`.
pub fn emit(ast: &Ast) -> Result<(ByteCode, StringTable), EmitError> {
    let mut emitter = Emitter {
        ast,
        code: ByteCode::new(),
        strings: StringTable::new(),
    };

    emitter.emit_scope(&ast.root)?;

    let line = emitter.code.last_line().unwrap_or(1);
    emitter.code.write_op(Opcode::Ret, line);

    Ok((emitter.code, emitter.strings))
}

struct Emitter<'ast> {
    ast: &'ast Ast,
    code: ByteCode,
    strings: StringTable,
}

impl Emitter<'_> {
    fn emit_scope(&mut self, scope: &ScopeStmt) -> Result<(), EmitError> {
        for stmt in &scope.statements {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), EmitError> {
        match stmt {
            Stmt::Scope(scope) => self.emit_scope(scope),
            Stmt::Log(log) => {
                self.emit_expr(&log.expr)?;
                self.code.write_op(Opcode::Log, log.line);
                Ok(())
            }
            Stmt::VarDecl(decl) => {
                self.emit_expr(&decl.expr)?;
                let slot = self.ast.decls[decl.decl]
                    .slot
                    .ok_or_else(|| EmitError::MissingStorage {
                        name: decl.name.clone(),
                        line: decl.line,
                    })?;
                self.code.write_op(Opcode::Store, decl.line);
                self.code.write_u16(slot, decl.line);
                Ok(())
            }
        }
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), EmitError> {
        match expr {
            Expr::Add(b) => self.emit_binary(b, Opcode::Add),
            Expr::Sub(b) => self.emit_binary(b, Opcode::Sub),
            Expr::Mul(b) => self.emit_binary(b, Opcode::Mul),
            Expr::Div(b) => self.emit_binary(b, Opcode::Div),
            Expr::Mod(b) => self.emit_binary(b, Opcode::Mod),
            Expr::Equal(b) => self.emit_equality(b),
            Expr::Less(b) => self.emit_ordering(b, -1),
            Expr::Greater(b) => self.emit_ordering(b, 1),
            Expr::Negate(u) => self.emit_unary(u, Opcode::Neg),
            Expr::Not(u) => self.emit_unary(u, Opcode::Not),
            Expr::Literal(lit) => self.emit_literal(lit),
            Expr::Variable(var) => self.emit_variable(var),
        }
    }

    fn emit_binary(&mut self, b: &Binary, op: Opcode) -> Result<(), EmitError> {
        self.emit_expr(&b.lhs)?;
        self.emit_expr(&b.rhs)?;

        let op = if b.ty.is_float() { op.float_variant() } else { op };
        self.code.write_op(op, b.line);
        Ok(())
    }

    /// `==` compares in one instruction.
    fn emit_equality(&mut self, b: &Binary) -> Result<(), EmitError> {
        self.emit_expr(&b.lhs)?;
        self.emit_expr(&b.rhs)?;

        let op = if b.lhs.ty().is_float() {
            Opcode::CmpeF
        } else {
            Opcode::Cmpe
        };
        self.code.write_op(op, b.line);
        Ok(())
    }

    /// `<` / `>`: three-way compare, then test the ordering against
    /// -1 / +1.
    fn emit_ordering(&mut self, b: &Binary, expected: i8) -> Result<(), EmitError> {
        self.emit_expr(&b.lhs)?;
        self.emit_expr(&b.rhs)?;

        let cmp = if b.lhs.ty().is_float() {
            Opcode::CmpF
        } else {
            Opcode::Cmp
        };
        self.code.write_op(cmp, b.line);
        self.emit_load(Type::I8, &expected.to_le_bytes(), b.line);
        self.code.write_op(Opcode::Cmpe, b.line);
        Ok(())
    }

    fn emit_unary(&mut self, u: &Unary, op: Opcode) -> Result<(), EmitError> {
        self.emit_expr(&u.rhs)?;

        let op = if op == Opcode::Neg && u.ty.is_float() {
            Opcode::NegF
        } else {
            op
        };
        self.code.write_op(op, u.line);
        Ok(())
    }

    fn emit_variable(&mut self, var: &emberc_par::Variable) -> Result<(), EmitError> {
        let missing = || EmitError::MissingStorage {
            name: var.word.clone(),
            line: var.line,
        };
        let decl = var.decl.ok_or_else(missing)?;
        let slot = self.ast.decls[decl].slot.ok_or_else(missing)?;

        self.code.write_op(Opcode::LoadLocal, var.line);
        self.code.write_u16(slot, var.line);
        Ok(())
    }

    /// Convert a literal's lexeme into its value and emit the load.
    fn emit_literal(&mut self, lit: &Literal) -> Result<(), EmitError> {
        let bad = || EmitError::BadLiteral {
            word: lit.word.clone(),
            ty: lit.ty,
            line: lit.line,
        };

        match lit.ty {
            Type::Bool => {
                let value: u8 = match lit.word.as_str() {
                    "true" => 1,
                    "false" => 0,
                    _ => return Err(bad()),
                };
                self.emit_load(Type::Bool, &[value], lit.line);
            }
            Type::I8 => {
                let v: i8 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::I16 => {
                let v: i16 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::I32 => {
                let v: i32 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::I64 => {
                let v: i64 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::U8 => {
                let v: u8 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::U16 => {
                let v: u16 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::U32 => {
                let v: u32 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::U64 => {
                let v: u64 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::F32 => {
                // The lexer leaves the `f` marker on the lexeme.
                let digits = lit.word.strip_suffix('f').unwrap_or(&lit.word);
                let v: f32 = digits.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::F64 => {
                let v: f64 = lit.word.parse().map_err(|_| bad())?;
                self.emit_load(lit.ty, &v.to_le_bytes(), lit.line);
            }
            Type::Str => {
                // Segment lexemes keep their source delimiters.
                let mut content = lit.word.as_str();
                content = content.strip_prefix('"').unwrap_or(content);
                content = content.strip_suffix('"').unwrap_or(content);
                let handle = self.strings.intern(content);
                self.code.write_op(Opcode::Loads, lit.line);
                self.code.write_u32(handle.0, lit.line);
            }
            Type::None => return Err(bad()),
        }
        Ok(())
    }

    fn emit_load(&mut self, ty: Type, bytes: &[u8], line: u32) {
        self.code.write_op(Opcode::Load, line);
        self.code.write_byte(ty.tag(), line);
        for &byte in bytes {
            self.code.write_byte(byte, line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emberc_byt::{instructions, Instr};
    use emberc_lex::scan;
    use emberc_util::Handler;

    fn compile(source: &str) -> (ByteCode, StringTable) {
        let mut handler = Handler::quiet();
        let mut ast = emberc_par::parse(scan(source), &mut handler).expect("parse");
        assert!(emberc_sem::check(&mut ast, &mut handler), "check");
        emit(&ast).expect("emit")
    }

    fn opcodes(bc: &ByteCode) -> Vec<Opcode> {
        instructions(bc.code())
            .map(|item| item.expect("well-formed").1.opcode())
            .collect()
    }

    #[test]
    fn log_addition_bytes_exactly() {
        let (bc, _) = compile("log(1 + 2);");
        let expected = [
            Opcode::Load.as_byte(),
            Type::I32.tag(),
            1,
            0,
            0,
            0,
            Opcode::Load.as_byte(),
            Type::I32.tag(),
            2,
            0,
            0,
            0,
            Opcode::Add.as_byte(),
            Opcode::Log.as_byte(),
            Opcode::Ret.as_byte(),
        ];
        assert_eq!(bc.code(), &expected);
    }

    #[test]
    fn float_expressions_use_float_variants() {
        let (bc, _) = compile("log(1.5 + 2.25);");
        assert!(opcodes(&bc).contains(&Opcode::AddF));

        let (bc, _) = compile("log(1.5 * 2.0);");
        assert!(opcodes(&bc).contains(&Opcode::MulF));

        let (bc, _) = compile("log(-(1.5));");
        assert!(opcodes(&bc).contains(&Opcode::NegF));

        let (bc, _) = compile("log(1 + 2);");
        assert!(!opcodes(&bc).contains(&Opcode::AddF));
    }

    #[test]
    fn less_lowers_to_cmp_load_cmpe() {
        let (bc, _) = compile("log(1 < 2);");
        let ops = opcodes(&bc);
        let cmp_at = ops.iter().position(|&op| op == Opcode::Cmp).expect("CMP");
        assert_eq!(ops[cmp_at + 1], Opcode::Load);
        assert_eq!(ops[cmp_at + 2], Opcode::Cmpe);

        // The synthetic immediate is LOAD i8 -1.
        let load = instructions(bc.code())
            .map(|i| i.unwrap().1)
            .filter_map(|i| match i {
                Instr::Load { ty, raw } if ty == Type::I8 => Some(raw[0] as i8),
                _ => None,
            })
            .last()
            .expect("synthetic i8 load");
        assert_eq!(load, -1);
    }

    #[test]
    fn greater_loads_plus_one() {
        let (bc, _) = compile("log(1 > 2);");
        let load = instructions(bc.code())
            .map(|i| i.unwrap().1)
            .filter_map(|i| match i {
                Instr::Load { ty, raw } if ty == Type::I8 => Some(raw[0] as i8),
                _ => None,
            })
            .last()
            .expect("synthetic i8 load");
        assert_eq!(load, 1);
    }

    #[test]
    fn float_comparison_uses_cmpf_but_plain_cmpe() {
        let (bc, _) = compile("log(1.5 < 2.0);");
        let ops = opcodes(&bc);
        assert!(ops.contains(&Opcode::CmpF));
        // CMP always pushes an i64, so the equality test stays integral.
        assert!(ops.contains(&Opcode::Cmpe));
        assert!(!ops.contains(&Opcode::CmpeF));
    }

    #[test]
    fn equality_picks_variant_by_operand_type() {
        let (bc, _) = compile("log(1 == 2);");
        assert!(opcodes(&bc).contains(&Opcode::Cmpe));

        let (bc, _) = compile("log(1.5 == 2.0);");
        assert!(opcodes(&bc).contains(&Opcode::CmpeF));
    }

    #[test]
    fn strings_are_interned_and_deduplicated() {
        let (bc, strings) = compile("log(\"a\" + \"b\"); log(\"a\");");
        assert_eq!(strings.len(), 2);

        let handles: Vec<u32> = instructions(bc.code())
            .map(|i| i.unwrap().1)
            .filter_map(|i| match i {
                Instr::Loads { handle } => Some(handle.0),
                _ => None,
            })
            .collect();
        // "a", "b", then "a" again with the same handle.
        assert_eq!(handles.len(), 3);
        assert_eq!(handles[0], handles[2]);
        assert_ne!(handles[0], handles[1]);
    }

    #[test]
    fn string_delimiters_are_stripped_at_interning() {
        let (_, strings) = compile("log(\"ab\");");
        let mut table = strings;
        let id = table.intern("ab");
        // Already present: interning found the stripped content.
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(id), "ab");
    }

    #[test]
    fn interpolation_emits_adds_over_segments() {
        let (bc, strings) = compile("log(\"x=${1 + 2}y\");");
        let ops = opcodes(&bc);
        // "x=" 1 2 ADD + "y" fold: three ADDs total (inner + two folds).
        assert_eq!(ops.iter().filter(|&&op| op == Opcode::Add).count(), 3);
        assert_eq!(strings.len(), 2);
    }

    #[test]
    fn let_emits_store_and_use_emits_load_local() {
        let (bc, _) = compile("let x = 1; log(x);");
        let instrs: Vec<Instr> = instructions(bc.code()).map(|i| i.unwrap().1).collect();
        assert!(instrs.contains(&Instr::Store { slot: 0 }));
        assert!(instrs.contains(&Instr::LoadLocal { slot: 0 }));
    }

    #[test]
    fn shadowed_declarations_use_distinct_slots() {
        let (bc, _) = compile("let x = 1; { let x = 2; log(x); } log(x);");
        let stores: Vec<u16> = instructions(bc.code())
            .map(|i| i.unwrap().1)
            .filter_map(|i| match i {
                Instr::Store { slot } => Some(slot),
                _ => None,
            })
            .collect();
        assert_eq!(stores, vec![0, 1]);

        let loads: Vec<u16> = instructions(bc.code())
            .map(|i| i.unwrap().1)
            .filter_map(|i| match i {
                Instr::LoadLocal { slot } => Some(slot),
                _ => None,
            })
            .collect();
        // Inner log sees the shadow, outer log the original.
        assert_eq!(loads, vec![1, 0]);
    }

    #[test]
    fn every_numeric_width_round_trips_through_the_decoder() {
        let cases = [
            ("log(1i8);", Type::I8),
            ("log(1i16);", Type::I16),
            ("log(1);", Type::I32),
            ("log(1i64);", Type::I64),
            ("log(1u8);", Type::U8),
            ("log(1u16);", Type::U16),
            ("log(1u32);", Type::U32),
            ("log(1u64);", Type::U64),
            ("log(1.5f);", Type::F32),
            ("log(1.5);", Type::F64),
            ("log(true);", Type::Bool),
        ];
        for (source, expected) in cases {
            let (bc, _) = compile(source);
            let Instr::Load { ty, .. } = instructions(bc.code()).next().unwrap().unwrap().1
            else {
                panic!("expected a Load first for {:?}", source);
            };
            assert_eq!(ty, expected, "source {:?}", source);
        }
    }

    #[test]
    fn out_of_range_literal_is_an_emit_error() {
        let mut handler = Handler::quiet();
        let mut ast = emberc_par::parse(scan("log(300i8);"), &mut handler).expect("parse");
        assert!(emberc_sem::check(&mut ast, &mut handler));

        let err = emit(&ast).expect_err("300 does not fit i8");
        assert!(matches!(err, EmitError::BadLiteral { ty: Type::I8, .. }));
        assert!(err.to_string().contains("invalid i8 literal '300'"));
    }

    #[test]
    fn ret_closes_the_unit_with_the_last_line() {
        let (bc, _) = compile("log(1);\nlog(2);");
        let last = bc.code().len() - 1;
        assert_eq!(bc.code()[last], Opcode::Ret.as_byte());
        assert_eq!(bc.read_line(last), 2);
    }

    #[test]
    fn lines_are_recorded_per_statement() {
        let (bc, _) = compile("log(1);\n\nlog(2);");
        assert_eq!(bc.read_line(0), 1);
        let log_offsets: Vec<usize> = instructions(bc.code())
            .map(|i| i.unwrap())
            .filter(|(_, instr)| instr.opcode() == Opcode::Log)
            .map(|(offset, _)| offset)
            .collect();
        assert_eq!(bc.read_line(log_offsets[0]), 1);
        assert_eq!(bc.read_line(log_offsets[1]), 3);
    }

    #[test]
    fn decoder_consumes_every_emitted_byte() {
        // Emission-execution agreement, decoder side.
        let (bc, _) = compile(
            "let x = 1; let y = 2.5; { let z = \"s${x}\"; log(z); } log(x < 2); log(!(y == 2.5));",
        );
        let mut covered = 0;
        for item in instructions(bc.code()) {
            let (offset, instr) = item.expect("well-formed stream");
            assert_eq!(offset, covered);
            covered += instr.width();
        }
        assert_eq!(covered, bc.len());
    }
}
