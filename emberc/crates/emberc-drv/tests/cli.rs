//! End-to-end tests against the `emberc` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn emberc() -> Command {
    Command::cargo_bin("emberc").expect("binary built")
}

fn source_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write source");
    file
}

#[test]
fn runs_a_file_and_prints_logs() {
    let file = source_file("log(1 + 2);\nlog(\"x=${1 + 2}y\");\n");

    emberc()
        .arg(file.path())
        .assert()
        .success()
        .stdout("3\nx=3y\n");
}

#[test]
fn reads_from_stdin_when_no_file_is_given() {
    emberc()
        .write_stdin("log(\"a\" + \"b\");")
        .assert()
        .success()
        .stdout("ab\n");
}

#[test]
fn compile_errors_exit_nonzero_with_diagnostics() {
    let file = source_file("let x: i32 = 1.0;");

    emberc()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Type mismatch"))
        .stderr(predicate::str::contains("compilation failed"));
}

#[test]
fn semantic_errors_report_every_statement() {
    let file = source_file("log(1 + true);\nlet x = 1;\nlet x = 2;\n");

    emberc()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot perform '+'"))
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn runtime_faults_exit_nonzero() {
    let file = source_file("log(1);\nlog(1 / 0);\n");

    emberc()
        .arg(file.path())
        .assert()
        .failure()
        .stdout("1\n")
        .stderr(predicate::str::contains("division by zero"))
        .stderr(predicate::str::contains("[line: 2]"));
}

#[test]
fn missing_file_exits_nonzero() {
    emberc()
        .arg("no/such/file.em")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn emit_tokens_dumps_the_stream() {
    let file = source_file("log(1);");

    emberc()
        .arg(file.path())
        .arg("--emit")
        .arg("tokens")
        .assert()
        .success()
        .stdout(predicate::str::contains("Int32"))
        .stdout(predicate::str::contains("End"));
}

#[test]
fn emit_ast_dumps_the_tree() {
    let file = source_file("let x = 1;");

    emberc()
        .arg(file.path())
        .arg("--emit")
        .arg("ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("VarDecl"));
}

#[test]
fn emit_bytecode_disassembles() {
    let file = source_file("log(1 + 2);");

    emberc()
        .arg(file.path())
        .arg("--emit")
        .arg("bytecode")
        .assert()
        .success()
        .stdout(predicate::str::contains("LOAD"))
        .stdout(predicate::str::contains("ADD"))
        .stdout(predicate::str::contains("RET"));
}

#[test]
fn emit_bytecode_still_fails_on_bad_programs() {
    let file = source_file("log(1 + true);");

    emberc()
        .arg(file.path())
        .arg("--emit")
        .arg("bytecode")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot perform '+'"));
}
