//! The dispatch loop.
//!
//! A classic byte-offset interpreter: read one opcode, advance the
//! instruction pointer by the instruction's width, mutate the operand
//! stack. Execution is strictly sequential and runs until `RET` or
//! until the bytecode is exhausted.
//!
//! Arithmetic contracts:
//!
//! - integer variants operate on the widened `i64`/`u64` stack
//!   representation with two's-complement wrap-around; integer division
//!   or remainder by zero is fatal;
//! - float variants use IEEE-754 double semantics (dividing by zero
//!   gives an infinity, not an error);
//! - `CMP`/`CMPF` push -1/0/1 as `i64`; `CMPE`/`CMPEF` push a bool;
//! - `ADD` on two string handles pushes a newly interned concatenation;
//!   a string and a non-string widen the non-string to its printed
//!   form first;
//! - `NOT` on numbers is the is-zero test, on strings the is-empty
//!   test.
//!
//! Faults carry the source line recovered from the chunk's RLE map.

use std::io::{self, Write};

use emberc_byt::{ByteCode, Opcode};
use emberc_util::{StrId, StringTable, Type};
use thiserror::Error;

use crate::stack::{Stack, StackFault};
use crate::value::{format_value, Value};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line: {line}] division by zero")]
    DivisionByZero { line: u32 },

    #[error("[line: {line}] stack overflow")]
    StackOverflow { line: u32 },

    #[error("[line: {line}] stack underflow")]
    StackUnderflow { line: u32 },

    #[error("[line: {line}] cannot apply {op} to {operands}")]
    UnsupportedOperands {
        op: &'static str,
        operands: &'static str,
        line: u32,
    },

    #[error("[line: {line}] malformed bytecode: {detail}")]
    MalformedBytecode { line: u32, detail: String },

    #[error("failed to write log output: {0}")]
    Io(#[from] io::Error),
}

/// The virtual machine. Owns the bytecode and the string table for the
/// lifetime of the run; `LOG` output goes to the injected writer.
pub struct Vm<W> {
    code: ByteCode,
    strings: StringTable,
    stack: Stack,
    locals: Vec<Option<Value>>,
    ip: usize,
    halted: bool,
    out: W,
}

impl Vm<io::Stdout> {
    /// A VM logging to standard output.
    pub fn new(code: ByteCode, strings: StringTable) -> Self {
        Self::with_output(code, strings, io::stdout())
    }
}

impl<W: Write> Vm<W> {
    pub fn with_output(code: ByteCode, strings: StringTable, out: W) -> Self {
        Self {
            code,
            strings,
            stack: Stack::new(),
            locals: Vec::new(),
            ip: 0,
            halted: false,
            out,
        }
    }

    /// Run until `RET` or the end of the bytecode.
    pub fn execute(&mut self) -> Result<(), RuntimeError> {
        while !self.halted && self.ip < self.code.len() {
            self.execute_next()?;
        }
        Ok(())
    }

    /// Execute exactly one instruction.
    pub fn execute_next(&mut self) -> Result<(), RuntimeError> {
        let line = self.code.read_line(self.ip);

        let byte = self.code.code().get(self.ip).copied().ok_or_else(|| {
            RuntimeError::MalformedBytecode {
                line,
                detail: format!("instruction pointer {} past the end", self.ip),
            }
        })?;
        let op = Opcode::from_byte(byte).ok_or_else(|| RuntimeError::MalformedBytecode {
            line,
            detail: format!("unknown opcode {:#04x} at offset {}", byte, self.ip),
        })?;
        self.ip += 1;

        match op {
            Opcode::Ret => self.halted = true,

            Opcode::Log => {
                let value = self.pop(line)?;
                let text = format_value(&value, &self.strings);
                writeln!(self.out, "{}", text)?;
            }

            Opcode::Load => self.load(line)?,
            Opcode::Loads => self.load_string(line)?,

            Opcode::Add => self.add(line)?,
            Opcode::Sub => self.int_binary(line, "SUB", i64::wrapping_sub, u64::wrapping_sub)?,
            Opcode::Mul => self.int_binary(line, "MUL", i64::wrapping_mul, u64::wrapping_mul)?,
            Opcode::Div => self.int_division(line, op)?,
            Opcode::Mod => self.int_division(line, op)?,

            Opcode::AddF => self.float_binary(line, "ADDF", |a, b| a + b)?,
            Opcode::SubF => self.float_binary(line, "SUBF", |a, b| a - b)?,
            Opcode::MulF => self.float_binary(line, "MULF", |a, b| a * b)?,
            // IEEE semantics: x/0.0 is an infinity, fmod(x, 0.0) a NaN.
            Opcode::DivF => self.float_binary(line, "DIVF", |a, b| a / b)?,
            Opcode::ModF => self.float_binary(line, "MODF", |a, b| a % b)?,

            Opcode::Cmp => self.compare(line)?,
            Opcode::CmpF => self.compare_float(line)?,
            Opcode::Cmpe => self.equals(line)?,
            Opcode::CmpeF => self.equals_float(line)?,

            Opcode::Neg => {
                let value = self.pop(line)?;
                match value {
                    Value::Int(v) => self.push(Value::Int(v.wrapping_neg()), line)?,
                    other => {
                        return Err(RuntimeError::UnsupportedOperands {
                            op: "NEG",
                            operands: other.kind(),
                            line,
                        })
                    }
                }
            }
            Opcode::NegF => {
                let value = self.pop(line)?;
                match value {
                    Value::Float(v) => self.push(Value::Float(-v), line)?,
                    other => {
                        return Err(RuntimeError::UnsupportedOperands {
                            op: "NEGF",
                            operands: other.kind(),
                            line,
                        })
                    }
                }
            }

            Opcode::Not => {
                let value = self.pop(line)?;
                let result = match value {
                    Value::Bool(b) => !b,
                    Value::Int(v) => v == 0,
                    Value::UInt(v) => v == 0,
                    Value::Float(v) => v == 0.0,
                    Value::Str(id) => self.strings.resolve(id).is_empty(),
                };
                self.push(Value::Bool(result), line)?;
            }

            Opcode::Store => {
                let slot = self.read_u16(line)? as usize;
                let value = self.pop(line)?;
                if self.locals.len() <= slot {
                    self.locals.resize(slot + 1, None);
                }
                self.locals[slot] = Some(value);
            }
            Opcode::LoadLocal => {
                let slot = self.read_u16(line)? as usize;
                let value = self.locals.get(slot).copied().flatten().ok_or_else(|| {
                    RuntimeError::MalformedBytecode {
                        line,
                        detail: format!("read of uninitialized local slot {}", slot),
                    }
                })?;
                self.push(value, line)?;
            }
        }

        Ok(())
    }

    /// Byte offset of the next instruction.
    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn code(&self) -> &ByteCode {
        &self.code
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// The string table, which may have grown during execution.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    // =========================================================================
    // Instruction implementations
    // =========================================================================

    /// `LOAD`: typed immediate, widened onto the stack.
    fn load(&mut self, line: u32) -> Result<(), RuntimeError> {
        let tag = self.read_byte(line)?;
        let ty = Type::from_tag(tag).ok_or_else(|| RuntimeError::MalformedBytecode {
            line,
            detail: format!("unknown type tag {:#04x}", tag),
        })?;

        let raw = self.read_raw(ty.operand_width(), line)?;
        let value = match ty {
            Type::Bool => Value::Bool(raw[0] != 0),
            Type::I8 => Value::Int(raw[0] as i8 as i64),
            Type::I16 => Value::Int(i16::from_le_bytes([raw[0], raw[1]]) as i64),
            Type::I32 => Value::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64),
            Type::I64 => Value::Int(i64::from_le_bytes(raw)),
            Type::U8 => Value::UInt(raw[0] as u64),
            Type::U16 => Value::UInt(u16::from_le_bytes([raw[0], raw[1]]) as u64),
            Type::U32 => Value::UInt(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as u64),
            Type::U64 => Value::UInt(u64::from_le_bytes(raw)),
            Type::F32 => {
                Value::Float(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
            }
            Type::F64 => Value::Float(f64::from_le_bytes(raw)),
            Type::Str | Type::None => {
                return Err(RuntimeError::MalformedBytecode {
                    line,
                    detail: format!("LOAD with non-value type tag {}", ty),
                })
            }
        };
        self.push(value, line)
    }

    /// `LOADS`: push an interned-string handle.
    fn load_string(&mut self, line: u32) -> Result<(), RuntimeError> {
        let raw = self.read_raw(4, line)?;
        let handle = StrId(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]));
        if self.strings.get(handle).is_none() {
            return Err(RuntimeError::MalformedBytecode {
                line,
                detail: format!("LOADS of unknown handle {}", handle),
            });
        }
        self.push(Value::Str(handle), line)
    }

    /// `ADD`: arithmetic on matching numeric tags, concatenation as
    /// soon as a string is involved.
    fn add(&mut self, line: u32) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        let value = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(a.wrapping_add(b)),
            (Value::Str(a), Value::Str(b)) => {
                let joined = format!("{}{}", self.strings.resolve(a), self.strings.resolve(b));
                Value::Str(self.strings.intern(&joined))
            }
            (Value::Str(a), other) => {
                let joined = format!(
                    "{}{}",
                    self.strings.resolve(a),
                    format_value(&other, &self.strings)
                );
                Value::Str(self.strings.intern(&joined))
            }
            (other, Value::Str(b)) => {
                let joined = format!(
                    "{}{}",
                    format_value(&other, &self.strings),
                    self.strings.resolve(b)
                );
                Value::Str(self.strings.intern(&joined))
            }
            (lhs, _) => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: "ADD",
                    operands: lhs.kind(),
                    line,
                })
            }
        };
        self.push(value, line)
    }

    fn int_binary(
        &mut self,
        line: u32,
        op: &'static str,
        signed: fn(i64, i64) -> i64,
        unsigned: fn(u64, u64) -> u64,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        let value = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => Value::Int(signed(a, b)),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(unsigned(a, b)),
            (lhs, _) => {
                return Err(RuntimeError::UnsupportedOperands {
                    op,
                    operands: lhs.kind(),
                    line,
                })
            }
        };
        self.push(value, line)
    }

    /// `DIV`/`MOD` with the zero check. Wrapping semantics keep
    /// `i64::MIN / -1` from trapping; `MOD` is truncated remainder.
    fn int_division(&mut self, line: u32, op: Opcode) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;
        let is_div = op == Opcode::Div;

        let value = match (lhs, rhs) {
            (Value::Int(_), Value::Int(0)) | (Value::UInt(_), Value::UInt(0)) => {
                return Err(RuntimeError::DivisionByZero { line })
            }
            (Value::Int(a), Value::Int(b)) => Value::Int(if is_div {
                a.wrapping_div(b)
            } else {
                a.wrapping_rem(b)
            }),
            (Value::UInt(a), Value::UInt(b)) => Value::UInt(if is_div { a / b } else { a % b }),
            (lhs, _) => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: op.name(),
                    operands: lhs.kind(),
                    line,
                })
            }
        };
        self.push(value, line)
    }

    fn float_binary(
        &mut self,
        line: u32,
        op: &'static str,
        apply: fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        match (lhs, rhs) {
            (Value::Float(a), Value::Float(b)) => self.push(Value::Float(apply(a, b)), line),
            (lhs, _) => Err(RuntimeError::UnsupportedOperands {
                op,
                operands: lhs.kind(),
                line,
            }),
        }
    }

    /// `CMP`: three-way compare pushing -1/0/1 as i64. Strings compare
    /// by value.
    fn compare(&mut self, line: u32) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        let ordering = match (lhs, rhs) {
            (Value::Int(a), Value::Int(b)) => a.cmp(&b),
            (Value::UInt(a), Value::UInt(b)) => a.cmp(&b),
            (Value::Str(a), Value::Str(b)) => {
                self.strings.resolve(a).cmp(self.strings.resolve(b))
            }
            (lhs, _) => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: "CMP",
                    operands: lhs.kind(),
                    line,
                })
            }
        };
        self.push(Value::Int(ordering as i64), line)
    }

    /// `CMPF`: the float three-way compare. NaN orders as equal, which
    /// makes every ordering test against it false.
    fn compare_float(&mut self, line: u32) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        match (lhs, rhs) {
            (Value::Float(a), Value::Float(b)) => {
                let ordering = if a < b {
                    -1
                } else if a > b {
                    1
                } else {
                    0
                };
                self.push(Value::Int(ordering), line)
            }
            (lhs, _) => Err(RuntimeError::UnsupportedOperands {
                op: "CMPF",
                operands: lhs.kind(),
                line,
            }),
        }
    }

    /// `CMPE`: equality on matching tags. Interning makes handle
    /// equality value equality for strings.
    fn equals(&mut self, line: u32) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        let result = match (lhs, rhs) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (lhs, _) => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: "CMPE",
                    operands: lhs.kind(),
                    line,
                })
            }
        };
        self.push(Value::Bool(result), line)
    }

    fn equals_float(&mut self, line: u32) -> Result<(), RuntimeError> {
        let rhs = self.pop(line)?;
        let lhs = self.pop(line)?;

        match (lhs, rhs) {
            (Value::Float(a), Value::Float(b)) => self.push(Value::Bool(a == b), line),
            (lhs, _) => Err(RuntimeError::UnsupportedOperands {
                op: "CMPEF",
                operands: lhs.kind(),
                line,
            }),
        }
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn read_byte(&mut self, line: u32) -> Result<u8, RuntimeError> {
        let byte = self
            .code
            .code()
            .get(self.ip)
            .copied()
            .ok_or_else(|| RuntimeError::MalformedBytecode {
                line,
                detail: "truncated instruction".to_string(),
            })?;
        self.ip += 1;
        Ok(byte)
    }

    /// Read `width` operand bytes into a zero-padded little-endian
    /// buffer.
    fn read_raw(&mut self, width: usize, line: u32) -> Result<[u8; 8], RuntimeError> {
        let bytes = self.code.code().get(self.ip..self.ip + width).ok_or_else(|| {
            RuntimeError::MalformedBytecode {
                line,
                detail: "truncated instruction".to_string(),
            }
        })?;
        let mut raw = [0u8; 8];
        raw[..width].copy_from_slice(bytes);
        self.ip += width;
        Ok(raw)
    }

    fn read_u16(&mut self, line: u32) -> Result<u16, RuntimeError> {
        let raw = self.read_raw(2, line)?;
        Ok(u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn push(&mut self, value: Value, line: u32) -> Result<(), RuntimeError> {
        self.stack
            .push(value)
            .map_err(|_| RuntimeError::StackOverflow { line })
    }

    fn pop(&mut self, line: u32) -> Result<Value, RuntimeError> {
        self.stack.pop().map_err(|fault| match fault {
            StackFault::Underflow => RuntimeError::StackUnderflow { line },
            StackFault::Overflow => RuntimeError::StackOverflow { line },
        })
    }
}
