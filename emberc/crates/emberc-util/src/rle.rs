//! Run-length encoded byte-offset -> source-line map.
//!
//! The emitter stamps every byte it writes with the source line of the
//! node that produced it. Storing one line per byte would triple the
//! size of a chunk, so the table only records `(offset, line)` pairs at
//! the offsets where the line actually changes. Lookup is an
//! upper-bound binary search over the offsets followed by a step back
//! to the predecessor run.

/// Compressed line information for a byte buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LineTable {
    /// `(first byte offset, line)` runs, offsets strictly increasing.
    runs: Vec<(usize, u32)>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the byte at `offset` belongs to `line`.
    ///
    /// Offsets must arrive in non-decreasing order (bytes are recorded
    /// as they are written). Consecutive bytes on the same line extend
    /// the current run instead of adding an entry.
    pub fn write_line(&mut self, offset: usize, line: u32) {
        match self.runs.last() {
            Some(&(_, last)) if last == line => {}
            _ => self.runs.push((offset, line)),
        }
    }

    /// Source line of the byte at `offset`.
    ///
    /// Answers the line of the greatest recorded offset `<= offset`;
    /// 0 when nothing has been recorded yet.
    pub fn read_line(&self, offset: usize) -> u32 {
        let idx = self.runs.partition_point(|&(start, _)| start <= offset);
        if idx == 0 {
            return 0;
        }
        self.runs[idx - 1].1
    }

    /// The raw `(offset, line)` runs, for the disassembler.
    pub fn runs(&self) -> &[(usize, u32)] {
        &self.runs
    }

    /// Line of the most recently written byte, if any.
    pub fn last_line(&self) -> Option<u32> {
        self.runs.last().map(|&(_, line)| line)
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
