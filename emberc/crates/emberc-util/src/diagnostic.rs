//! Diagnostic sink for compile-time errors.
//!
//! Every stage of the pipeline reports through the same narrow
//! interface: `report(line, word, message)`. There are no severity
//! levels and no error codes; a report is always an error, and any
//! report latches the handler into the failed state that makes the
//! driver skip downstream stages.

use std::fmt;

/// A single reported error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Source line the error was found on (1-based).
    pub line: u32,
    /// Offending lexeme, or empty when the error has no anchor token.
    pub word: String,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.word.is_empty() {
            write!(f, "[line: {}] error: {}", self.line, self.message)
        } else {
            write!(
                f,
                "[line: {}] error at '{}': {}",
                self.line, self.word, self.message
            )
        }
    }
}

/// Collects diagnostics and mirrors them to stderr.
///
/// The handler is threaded mutably through the parser and the semantic
/// checker. Tests that only want to inspect the collected diagnostics
/// construct it with [`Handler::quiet`].
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: Vec<Diagnostic>,
    quiet: bool,
}

impl Handler {
    /// Create a handler that prints every report to stderr.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler that only collects, for use in tests.
    pub fn quiet() -> Self {
        Self {
            diagnostics: Vec::new(),
            quiet: true,
        }
    }

    /// Report an error at `line`, anchored to `word` when non-empty.
    pub fn report(&mut self, line: u32, word: &str, message: impl Into<String>) {
        let diag = Diagnostic {
            line,
            word: word.to_string(),
            message: message.into(),
        };
        if !self.quiet {
            eprintln!("{}", diag);
        }
        self.diagnostics.push(diag);
    }

    /// Whether anything has been reported.
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// All reports, in the order they were made.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_in_order() {
        let mut handler = Handler::quiet();
        assert!(!handler.has_errors());

        handler.report(1, "x", "first");
        handler.report(4, "", "second");

        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 2);
        assert_eq!(handler.diagnostics()[0].message, "first");
        assert_eq!(handler.diagnostics()[1].line, 4);
    }

    #[test]
    fn display_elides_empty_word() {
        let with_word = Diagnostic {
            line: 3,
            word: "+".to_string(),
            message: "bad operator".to_string(),
        };
        assert_eq!(
            with_word.to_string(),
            "[line: 3] error at '+': bad operator"
        );

        let without_word = Diagnostic {
            line: 7,
            word: String::new(),
            message: "something".to_string(),
        };
        assert_eq!(without_word.to_string(), "[line: 7] error: something");
    }
}
