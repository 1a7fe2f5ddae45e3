//! Instruction decoding.
//!
//! The one place that knows how many bytes each instruction occupies.
//! The emitter writes the encodings, the VM consumes them, and both are
//! tested against this decoder so the three can never drift apart.

use emberc_util::{StrId, StringTable, Type};
use thiserror::Error;

use crate::chunk::ByteCode;
use crate::opcode::Opcode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {byte:#04x} at offset {offset}")]
    UnknownOpcode { byte: u8, offset: usize },

    #[error("unknown type tag {byte:#04x} at offset {offset}")]
    UnknownTypeTag { byte: u8, offset: usize },

    #[error("truncated instruction at offset {offset}")]
    Truncated { offset: usize },
}

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instr {
    /// An operand-less opcode.
    Simple(Opcode),
    /// `LOAD`: a typed immediate, raw little-endian bytes in `raw[..width]`.
    Load { ty: Type, raw: [u8; 8] },
    /// `LOADS`: a string-table handle.
    Loads { handle: StrId },
    /// `STORE`: pop into a local slot.
    Store { slot: u16 },
    /// `LOADL`: push a local slot.
    LoadLocal { slot: u16 },
}

impl Instr {
    /// Total encoded width in bytes, opcode included.
    pub fn width(&self) -> usize {
        match self {
            Instr::Simple(_) => 1,
            Instr::Load { ty, .. } => 2 + ty.operand_width(),
            Instr::Loads { .. } => 5,
            Instr::Store { .. } | Instr::LoadLocal { .. } => 3,
        }
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instr::Simple(op) => *op,
            Instr::Load { .. } => Opcode::Load,
            Instr::Loads { .. } => Opcode::Loads,
            Instr::Store { .. } => Opcode::Store,
            Instr::LoadLocal { .. } => Opcode::LoadLocal,
        }
    }
}

/// Decode the instruction at `offset`.
pub fn decode(code: &[u8], offset: usize) -> Result<Instr, DecodeError> {
    let byte = *code.get(offset).ok_or(DecodeError::Truncated { offset })?;
    let op = Opcode::from_byte(byte).ok_or(DecodeError::UnknownOpcode { byte, offset })?;

    match op {
        Opcode::Load => {
            let tag = *code
                .get(offset + 1)
                .ok_or(DecodeError::Truncated { offset })?;
            let ty = Type::from_tag(tag).ok_or(DecodeError::UnknownTypeTag {
                byte: tag,
                offset: offset + 1,
            })?;
            let width = ty.operand_width();
            let payload = code
                .get(offset + 2..offset + 2 + width)
                .ok_or(DecodeError::Truncated { offset })?;
            let mut raw = [0u8; 8];
            raw[..width].copy_from_slice(payload);
            Ok(Instr::Load { ty, raw })
        }
        Opcode::Loads => {
            let payload = code
                .get(offset + 1..offset + 5)
                .ok_or(DecodeError::Truncated { offset })?;
            let handle = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
            Ok(Instr::Loads {
                handle: StrId(handle),
            })
        }
        Opcode::Store | Opcode::LoadLocal => {
            let payload = code
                .get(offset + 1..offset + 3)
                .ok_or(DecodeError::Truncated { offset })?;
            let slot = u16::from_le_bytes([payload[0], payload[1]]);
            Ok(match op {
                Opcode::Store => Instr::Store { slot },
                _ => Instr::LoadLocal { slot },
            })
        }
        _ => Ok(Instr::Simple(op)),
    }
}

/// Iterator over `(offset, instruction)` pairs of a byte buffer.
pub struct InstrIter<'a> {
    code: &'a [u8],
    offset: usize,
}

pub fn instructions(code: &[u8]) -> InstrIter<'_> {
    InstrIter { code, offset: 0 }
}

impl Iterator for InstrIter<'_> {
    type Item = Result<(usize, Instr), DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.code.len() {
            return None;
        }
        let at = self.offset;
        match decode(self.code, at) {
            Ok(instr) => {
                self.offset += instr.width();
                Some(Ok((at, instr)))
            }
            Err(err) => {
                // Poison the iterator; there is no resynchronising a
                // byte stream with unknown widths.
                self.offset = self.code.len();
                Some(Err(err))
            }
        }
    }
}

/// Render a `LOAD` immediate for human eyes.
fn render_load(ty: Type, raw: [u8; 8]) -> String {
    match ty {
        Type::Bool => format!("{}", raw[0] != 0),
        Type::I8 => format!("{}", raw[0] as i8),
        Type::I16 => format!("{}", i16::from_le_bytes([raw[0], raw[1]])),
        Type::I32 => format!("{}", i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Type::I64 => format!("{}", i64::from_le_bytes(raw)),
        Type::U8 => format!("{}", raw[0]),
        Type::U16 => format!("{}", u16::from_le_bytes([raw[0], raw[1]])),
        Type::U32 => format!("{}", u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Type::U64 => format!("{}", u64::from_le_bytes(raw)),
        Type::F32 => format!("{}", f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]])),
        Type::F64 => format!("{}", f64::from_le_bytes(raw)),
        Type::Str | Type::None => String::from("<invalid>"),
    }
}

/// Disassemble a whole chunk into the driver's `--emit bytecode` text.
///
/// Formatting is cosmetic; only [`decode`] is normative.
pub fn disassemble(bc: &ByteCode, strings: Option<&StringTable>) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    let _ = writeln!(out, "{:>6} {:>6}  {:<6} {}", "OFFSET", "LINE", "OPCODE", "VALUE");

    for item in instructions(bc.code()) {
        match item {
            Ok((offset, instr)) => {
                let line = bc.read_line(offset);
                let value = match instr {
                    Instr::Simple(_) => String::new(),
                    Instr::Load { ty, raw } => format!("{} ({})", render_load(ty, raw), ty),
                    Instr::Loads { handle } => match strings.and_then(|t| t.get(handle)) {
                        Some(s) => format!("{} {:?}", handle, s),
                        None => format!("{}", handle),
                    },
                    Instr::Store { slot } | Instr::LoadLocal { slot } => format!("slot {}", slot),
                };
                let _ = writeln!(
                    out,
                    "{:>6} {:>6}  {:<6} {}",
                    format!("{:04x}", offset),
                    format!("[{}]", line),
                    instr.opcode().name(),
                    value
                );
            }
            Err(err) => {
                let _ = writeln!(out, "error: {}", err);
            }
        }
    }

    out
}
