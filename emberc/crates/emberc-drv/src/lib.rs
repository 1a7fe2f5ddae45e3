//! emberc-drv - Pipeline driver.
//!
//! Orchestrates the strictly linear pipeline
//!
//! ```text
//! source -> tokens -> AST -> typed AST -> (bytecode, strings) -> execution
//! ```
//!
//! Each stage runs only if every prior stage succeeded; diagnostics go
//! through the shared [`Handler`] as they happen, and a failed stage
//! simply stops the pipeline. [`Session`] adds the outer concerns the
//! binary needs: reading the input, `--emit` early exits, exit-worthy
//! errors.

use std::io::{self, Read};
use std::path::PathBuf;

use emberc_byt::ByteCode;
use emberc_gen::EmitError;
use emberc_util::{Handler, StringTable};
use emberc_vm::Vm;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read {path}: {source}")]
    ReadInput {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Diagnostics were already printed by the handler.
    #[error("compilation failed")]
    CompilationFailed,

    #[error(transparent)]
    Runtime(#[from] emberc_vm::RuntimeError),
}

/// What the driver should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emit {
    /// Dump the token stream and stop.
    Tokens,
    /// Dump the (unchecked) AST and stop.
    Ast,
    /// Dump the disassembled bytecode and stop.
    Bytecode,
    /// Compile and execute.
    #[default]
    Run,
}

#[derive(Debug, Default)]
pub struct Config {
    /// Source path; standard input when `None`.
    pub input: Option<PathBuf>,
    pub emit: Emit,
}

/// Compile `source` down to bytecode and its string table.
///
/// Returns `None` when any stage reported; the handler holds the
/// diagnostics either way.
pub fn compile(source: &str, handler: &mut Handler) -> Option<(ByteCode, StringTable)> {
    debug!("lexing");
    let tokens = emberc_lex::scan(source);

    debug!(tokens = tokens.len(), "parsing");
    let mut ast = emberc_par::parse(tokens, handler)?;

    debug!("semantic analysis");
    if !emberc_sem::check(&mut ast, handler) {
        return None;
    }

    debug!("emitting bytecode");
    match emberc_gen::emit(&ast) {
        Ok(unit) => {
            debug!(bytes = unit.0.len(), strings = unit.1.len(), "emitted");
            Some(unit)
        }
        Err(err) => {
            report_emit_error(handler, &err);
            None
        }
    }
}

fn report_emit_error(handler: &mut Handler, err: &EmitError) {
    match err {
        EmitError::BadLiteral { word, ty, line } => {
            handler.report(*line, word, format!("Invalid {} literal", ty));
        }
        EmitError::MissingStorage { name, line } => {
            handler.report(*line, name, "Variable has no storage");
        }
    }
}

/// One driver invocation.
pub struct Session {
    pub config: Config,
    handler: Handler,
}

impl Session {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            handler: Handler::new(),
        }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Run the configured pipeline; on success the only output is
    /// whatever `log` statements printed (or the `--emit` dump).
    pub fn run(&mut self) -> Result<(), DriverError> {
        let source = self.read_source()?;

        match self.config.emit {
            Emit::Tokens => {
                for token in emberc_lex::scan(&source) {
                    println!("{:?}", token);
                }
                Ok(())
            }
            Emit::Ast => {
                let tokens = emberc_lex::scan(&source);
                let ast = emberc_par::parse(tokens, &mut self.handler)
                    .ok_or(DriverError::CompilationFailed)?;
                println!("{:#?}", ast);
                Ok(())
            }
            Emit::Bytecode => {
                let (code, strings) = compile(&source, &mut self.handler)
                    .ok_or(DriverError::CompilationFailed)?;
                print!("{}", emberc_byt::disassemble(&code, Some(&strings)));
                Ok(())
            }
            Emit::Run => {
                let (code, strings) = compile(&source, &mut self.handler)
                    .ok_or(DriverError::CompilationFailed)?;
                debug!("executing");
                let mut vm = Vm::new(code, strings);
                vm.execute()?;
                Ok(())
            }
        }
    }

    fn read_source(&self) -> Result<String, DriverError> {
        match &self.config.input {
            Some(path) => {
                std::fs::read_to_string(path).map_err(|source| DriverError::ReadInput {
                    path: path.display().to_string(),
                    source,
                })
            }
            None => {
                let mut source = String::new();
                io::stdin()
                    .read_to_string(&mut source)
                    .map_err(|source| DriverError::ReadInput {
                        path: "<stdin>".to_string(),
                        source,
                    })?;
                Ok(source)
            }
        }
    }
}
