//! Failure-path integration tests: every stage's diagnostics, stage
//! short-circuiting, multi-error reporting.

use emberc_drv::compile;
use emberc_util::Handler;

fn diagnostics(source: &str) -> Vec<String> {
    let mut handler = Handler::quiet();
    let result = compile(source, &mut handler);
    assert!(result.is_none(), "expected failure for {:?}", source);
    handler
        .diagnostics()
        .iter()
        .map(|d| d.to_string())
        .collect()
}

#[test]
fn type_mismatch_diagnostic() {
    let messages = diagnostics("let x: i32 = 1.0;");
    assert!(messages.iter().any(|m| m.contains("Type mismatch")));
}

#[test]
fn incompatible_addition_diagnostic() {
    let messages = diagnostics("log(1 + true);");
    assert!(messages.iter().any(|m| m.contains("Cannot perform '+'")));
}

#[test]
fn redeclaration_diagnostic() {
    let messages = diagnostics("let x = 1; let x = 2;");
    assert!(messages.iter().any(|m| m.contains("already exists")));
}

#[test]
fn undefined_variable_diagnostic() {
    let messages = diagnostics("log(missing);");
    assert!(messages
        .iter()
        .any(|m| m.contains("Undefined variable 'missing'")));
}

#[test]
fn lexical_errors_surface_through_the_parser() {
    let messages = diagnostics("log(\"abc);");
    assert!(messages.iter().any(|m| m.contains("Unterminated string")));

    let messages = diagnostics("log(\"x=${1);");
    assert!(messages
        .iter()
        .any(|m| m.contains("Expected closing braces '}'")));
}

#[test]
fn syntax_error_diagnostics_carry_line_numbers() {
    let messages = diagnostics("log(1);\nlog(2)\nlog(3);");
    assert!(messages.iter().any(|m| m.contains("[line: 3]")));
}

#[test]
fn multiple_errors_in_one_pass() {
    // Two independent semantic faults, both reported.
    let messages = diagnostics("log(1 + true); let y: u8 = 2.5;");
    assert!(messages.iter().any(|m| m.contains("Cannot perform '+'")));
    assert!(messages.iter().any(|m| m.contains("Type mismatch")));
}

#[test]
fn parser_recovers_at_statement_boundaries() {
    // Both statements are broken; panic-mode recovery reaches the second.
    let messages = diagnostics("log(1 + ); log(2 + );");
    assert!(messages.len() >= 2);
}

#[test]
fn semantic_stage_only_runs_after_a_clean_parse() {
    // The undefined variable in statement two must not be reported:
    // the parse failed, so the checker never ran.
    let messages = diagnostics("log(1 + ); log(missing);");
    assert!(!messages.iter().any(|m| m.contains("Undefined variable")));
}

#[test]
fn emit_stage_reports_out_of_range_literals() {
    let messages = diagnostics("log(300i8);");
    assert!(messages.iter().any(|m| m.contains("Invalid i8 literal")));
}

#[test]
fn negation_of_unsigned_diagnostic() {
    let messages = diagnostics("let x = 1u16; log(-x);");
    assert!(messages
        .iter()
        .any(|m| m.contains("Cannot perform unary '-'")));
}
