//! emberc-vm - Bytecode execution for Ember.
//!
//! A single-threaded stack machine over tagged values. The VM takes
//! ownership of the bytecode and the interned string table the emitter
//! built; the only side effect of execution is `LOG` output written to
//! the injected sink. Fatal faults (integer division by zero, stack
//! exhaustion, malformed bytecode) halt execution with a
//! [`RuntimeError`] naming the source line.

mod stack;
mod value;
mod vm;

pub use stack::{Stack, STACK_MAX};
pub use value::{format_value, Value};
pub use vm::{RuntimeError, Vm};
