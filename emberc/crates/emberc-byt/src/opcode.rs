//! Instruction opcodes.

use std::fmt;

/// One-byte opcodes.
///
/// The layout is part of the bytecode format: the floating-point
/// variant of an arithmetic or comparison opcode is always the integer
/// opcode's value plus one, which is what [`Opcode::float_variant`]
/// relies on. `Store`/`LoadLocal` sit after the arithmetic block and
/// carry a u16 local-slot operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Pop one value and print it.
    Log = 0,
    /// Halt execution of the unit.
    Ret,
    Add,
    AddF,
    Sub,
    SubF,
    Mul,
    MulF,
    Div,
    DivF,
    Mod,
    ModF,
    /// Three-way compare; pushes -1/0/1 as i64.
    Cmp,
    CmpF,
    /// Equality compare; pushes bool.
    Cmpe,
    CmpeF,
    /// `[LOAD][type tag][raw little-endian value]`.
    Load,
    /// `[LOADS][string handle: u32 little-endian]`.
    Loads,
    Neg,
    NegF,
    Not,
    /// `[STORE][slot: u16 little-endian]` - pop into a local slot.
    Store,
    /// `[LOADL][slot: u16 little-endian]` - push a local slot's value.
    LoadLocal,
}

impl Opcode {
    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        use Opcode::*;
        Some(match byte {
            0 => Log,
            1 => Ret,
            2 => Add,
            3 => AddF,
            4 => Sub,
            5 => SubF,
            6 => Mul,
            7 => MulF,
            8 => Div,
            9 => DivF,
            10 => Mod,
            11 => ModF,
            12 => Cmp,
            13 => CmpF,
            14 => Cmpe,
            15 => CmpeF,
            16 => Load,
            17 => Loads,
            18 => Neg,
            19 => NegF,
            20 => Not,
            21 => Store,
            22 => LoadLocal,
            _ => return None,
        })
    }

    /// The float twin of an integer arithmetic/compare opcode.
    ///
    /// # Panics
    ///
    /// Panics on opcodes that have no float variant; the emitter only
    /// calls this for the arithmetic block.
    pub fn float_variant(self) -> Opcode {
        use Opcode::*;
        match self {
            Add => AddF,
            Sub => SubF,
            Mul => MulF,
            Div => DivF,
            Mod => ModF,
            Cmp => CmpF,
            Cmpe => CmpeF,
            Neg => NegF,
            other => panic!("opcode {:?} has no float variant", other),
        }
    }

    pub fn name(self) -> &'static str {
        use Opcode::*;
        match self {
            Log => "LOG",
            Ret => "RET",
            Add => "ADD",
            AddF => "ADDF",
            Sub => "SUB",
            SubF => "SUBF",
            Mul => "MUL",
            MulF => "MULF",
            Div => "DIV",
            DivF => "DIVF",
            Mod => "MOD",
            ModF => "MODF",
            Cmp => "CMP",
            CmpF => "CMPF",
            Cmpe => "CMPE",
            CmpeF => "CMPEF",
            Load => "LOAD",
            Loads => "LOADS",
            Neg => "NEG",
            NegF => "NEGF",
            Not => "NOT",
            Store => "STORE",
            LoadLocal => "LOADL",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
