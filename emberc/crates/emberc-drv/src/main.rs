//! The `emberc` command line.
//!
//! `emberc [FILE]` compiles and runs an Ember program from a file or
//! from standard input. `--emit` stops after a stage and dumps it.
//! Exit code 0 on success, 1 on any stage failure or runtime fault;
//! diagnostics go to stderr.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use emberc_drv::{Config, Emit, Session};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Compiler and virtual machine for the Ember language.
#[derive(Parser, Debug)]
#[command(name = "emberc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiler and VM for the Ember language", long_about = None)]
struct Cli {
    /// Source file to run (standard input when omitted)
    file: Option<PathBuf>,

    /// Stop after a pipeline stage and dump its output
    #[arg(long, value_enum)]
    emit: Option<EmitArg>,

    /// Enable verbose output
    #[arg(short, long, env = "EMBERC_VERBOSE")]
    verbose: bool,

    /// Disable color output
    #[arg(long, env = "EMBERC_NO_COLOR")]
    no_color: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum EmitArg {
    Tokens,
    Ast,
    Bytecode,
}

impl From<EmitArg> for Emit {
    fn from(arg: EmitArg) -> Self {
        match arg {
            EmitArg::Tokens => Emit::Tokens,
            EmitArg::Ast => Emit::Ast,
            EmitArg::Bytecode => Emit::Bytecode,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.no_color) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    let config = Config {
        input: cli.file,
        emit: cli.emit.map(Emit::from).unwrap_or_default(),
    };

    let mut session = Session::new(config);
    if let Err(e) = session.run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool, no_color: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    Ok(())
}
