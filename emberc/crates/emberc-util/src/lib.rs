//! emberc-util - Shared vocabulary for the Ember compiler pipeline.
//!
//! Every phase of the pipeline speaks in terms of a handful of small
//! types that live here so the phase crates do not depend on each other
//! sideways:
//!
//! - [`Type`] - the closed set of primitive type tags. The declaration
//!   order is load-bearing: it is the tag byte written into bytecode.
//! - [`Handler`] / [`Diagnostic`] - the single error sink. Every stage
//!   reports through `report(line, word, message)` and nothing else.
//! - [`LineTable`] - the run-length encoded byte-offset -> source-line
//!   map carried alongside the bytecode.
//! - [`StringTable`] / [`StrId`] - the deduplicating string interner.
//!   The emitter builds it, the VM inherits it by move and may grow it
//!   while concatenating.
//! - [`IndexVec`] / [`Idx`] - typed arena indices used for the scope
//!   tree and declaration tables.

pub mod diagnostic;
pub mod index_vec;
pub mod rle;
pub mod strings;
pub mod types;

pub use diagnostic::{Diagnostic, Handler};
pub use index_vec::{Idx, IndexVec};
pub use rle::LineTable;
pub use strings::{StrId, StringTable};
pub use types::Type;
