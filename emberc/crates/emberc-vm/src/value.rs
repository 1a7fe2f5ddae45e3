//! Runtime values.

use emberc_util::{StrId, StringTable};

/// A tagged runtime value.
///
/// The stack representation widens every primitive: signed integers
/// ride as `i64`, unsigned as `u64`, floats as `f64`. The original
/// widths exist only in the `LOAD` operands. Strings are handles into
/// the interned table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(StrId),
}

impl Value {
    /// Tag name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
        }
    }
}

/// Render a value the way `LOG` prints it: bools as `true`/`false`,
/// integers in base 10, floats with trailing zeros trimmed but at
/// least one fractional digit kept, strings unquoted.
pub fn format_value(value: &Value, strings: &StringTable) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => format_float(*f),
        Value::Str(id) => strings.resolve(*id).to_string(),
    }
}

/// Six fixed decimals, trailing zeros trimmed, `.0` restored - `3.0`
/// stays `3.0`, never `3`.
fn format_float(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let mut text = format!("{:.6}", value);
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.push('0');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(v: f64) -> String {
        format_float(v)
    }

    #[test]
    fn float_trimming_keeps_a_fractional_digit() {
        assert_eq!(fmt(3.75), "3.75");
        assert_eq!(fmt(3.0), "3.0");
        assert_eq!(fmt(0.5), "0.5");
        assert_eq!(fmt(-2.25), "-2.25");
        assert_eq!(fmt(0.0), "0.0");
        assert_eq!(fmt(100.0), "100.0");
    }

    #[test]
    fn tiny_fractions_collapse_to_zero() {
        // Matches fixed six-decimal rendering.
        assert_eq!(fmt(0.0000001), "0.0");
    }

    #[test]
    fn integers_and_bools_render_plainly() {
        let strings = StringTable::new();
        assert_eq!(format_value(&Value::Int(-7), &strings), "-7");
        assert_eq!(format_value(&Value::UInt(7), &strings), "7");
        assert_eq!(format_value(&Value::Bool(true), &strings), "true");
        assert_eq!(format_value(&Value::Bool(false), &strings), "false");
    }

    #[test]
    fn strings_render_unquoted() {
        let mut strings = StringTable::new();
        let id = strings.intern("ab");
        assert_eq!(format_value(&Value::Str(id), &strings), "ab");
    }
}
