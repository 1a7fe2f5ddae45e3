//! Primitive type tags shared by every compiler phase.

use std::fmt;

/// The closed set of Ember types.
///
/// Declaration order matters: the discriminant doubles as the tag byte
/// written after a `LOAD` opcode, so reordering variants changes the
/// bytecode format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Str,
    /// "Not yet inferred". Legal only between parsing and a successful
    /// semantic check; never a runtime type and never emitted.
    None,
}

impl Type {
    /// Tag byte used in the `LOAD` encoding.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`Type::tag`]. Returns `None` for unknown bytes and
    /// for the `Type::None` sentinel, which has no encoded form.
    pub fn from_tag(tag: u8) -> Option<Type> {
        use Type::*;
        Some(match tag {
            0 => Bool,
            1 => I8,
            2 => I16,
            3 => I32,
            4 => I64,
            5 => U8,
            6 => U16,
            7 => U32,
            8 => U64,
            9 => F32,
            10 => F64,
            11 => Str,
            _ => return std::option::Option::None,
        })
    }

    /// Width in bytes of the `LOAD` operand for this type.
    ///
    /// Strings are loaded through `LOADS` and have no inline payload,
    /// so they (and `None`) answer 0.
    pub fn operand_width(self) -> usize {
        use Type::*;
        match self {
            Bool | I8 | U8 => 1,
            I16 | U16 => 2,
            I32 | U32 | F32 => 4,
            I64 | U64 | F64 => 8,
            Str | None => 0,
        }
    }

    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    #[inline]
    pub fn is_unsigned(self) -> bool {
        matches!(self, Type::U8 | Type::U16 | Type::U32 | Type::U64)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Bool => "bool",
            Type::I8 => "i8",
            Type::I16 => "i16",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::U8 => "u8",
            Type::U16 => "u16",
            Type::U32 => "u32",
            Type::U64 => "u64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Str => "string",
            Type::None => "none",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for tag in 0..=11u8 {
            let ty = Type::from_tag(tag).expect("tag in range");
            assert_eq!(ty.tag(), tag);
        }
    }

    #[test]
    fn none_has_no_tag() {
        // `None` sits past the last encodable tag.
        assert_eq!(Type::from_tag(Type::None.tag()), None);
        assert_eq!(Type::from_tag(0xFF), None);
    }

    #[test]
    fn operand_widths_are_natural_widths() {
        assert_eq!(Type::Bool.operand_width(), 1);
        assert_eq!(Type::I8.operand_width(), 1);
        assert_eq!(Type::U16.operand_width(), 2);
        assert_eq!(Type::I32.operand_width(), 4);
        assert_eq!(Type::F32.operand_width(), 4);
        assert_eq!(Type::U64.operand_width(), 8);
        assert_eq!(Type::F64.operand_width(), 8);
        assert_eq!(Type::Str.operand_width(), 0);
    }

    #[test]
    fn display_matches_source_names() {
        assert_eq!(Type::I32.to_string(), "i32");
        assert_eq!(Type::F64.to_string(), "f64");
        assert_eq!(Type::Str.to_string(), "string");
    }
}
