//! cppi command line

use clap::{Parser, Subcommand};
use cppinterp::error::report_error;
use cppinterp::interp::{self, DEFAULT_MAX_CALL_DEPTH};
use cppinterp::{CompileError, InterpreterConfig};
use std::path::{Path, PathBuf};
use std::sync::Once;

#[derive(Parser)]
#[command(name = "cppi", version, about = "Interpreter for a teaching subset of C++")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program; its entry function's result is the exit code
    Run {
        /// Source file to run
        file: PathBuf,
        /// Function to call
        #[arg(long, default_value = "main")]
        entry: String,
        /// Maximum depth of nested calls
        #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
        max_depth: usize,
    },
    /// Check a source file without running it
    Check {
        /// Source file to check
        file: PathBuf,
    },
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
    /// Start an interactive session
    Repl {
        /// Maximum depth of nested calls
        #[arg(long, default_value_t = DEFAULT_MAX_CALL_DEPTH)]
        max_depth: usize,
    },
}

static TRACING_INIT: Once = Once::new();

/// Enabled with `RUST_LOG`, e.g. `RUST_LOG=cppinterp=debug`
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(true)
                        .with_level(true),
                )
                .with(filter)
                .init();
        }
    });
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let code = match cli.command {
        Command::Run {
            file,
            entry,
            max_depth,
        } => with_source(&file, |name, source| {
            let config = InterpreterConfig {
                entry,
                max_call_depth: max_depth,
            };
            run_source(name, source, config)
        }),
        Command::Check { file } => with_source(&file, check_source),
        Command::Parse { file } => with_source(&file, parse_source),
        Command::Tokens { file } => with_source(&file, tokenize_source),
        Command::Repl { max_depth } => run_repl(max_depth),
    };
    std::process::exit(code);
}

/// Read `path` and hand it to `action`, reporting any error against the source
fn with_source(
    path: &Path,
    action: impl FnOnce(&str, &str) -> Result<i32, CompileError>,
) -> i32 {
    let name = path.display().to_string();
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: can not read {name}: {err}");
            return 1;
        }
    };
    match action(&name, &source) {
        Ok(code) => code,
        Err(err) => {
            report_error(&name, &source, &err);
            1
        }
    }
}

fn run_source(name: &str, source: &str, config: InterpreterConfig) -> Result<i32, CompileError> {
    let stdout = interp::stdout_sink();
    let program = interp::parse_and_build_with(source, stdout, config)?;
    tracing::info!(file = name, entry = %program.config().entry, "running");
    program.run()
}

fn check_source(name: &str, source: &str) -> Result<i32, CompileError> {
    interp::parse_and_build_with(source, interp::stdout_sink(), InterpreterConfig::default())?;
    println!("{name}: ok");
    Ok(0)
}

fn parse_source(_name: &str, source: &str) -> Result<i32, CompileError> {
    let ast = interp::parse_ast(source)?;
    match serde_json::to_string_pretty(&ast) {
        Ok(json) => println!("{json}"),
        Err(err) => return Err(CompileError::io_error(err.to_string())),
    }
    Ok(0)
}

fn tokenize_source(_name: &str, source: &str) -> Result<i32, CompileError> {
    let tokens = cppinterp::lexer::tokenize(source)?;
    for (tok, span) in &tokens {
        println!("{:?} @ {}..{}", tok, span.start, span.end);
    }
    Ok(0)
}

fn run_repl(max_depth: usize) -> i32 {
    let config = InterpreterConfig {
        max_call_depth: max_depth,
        ..InterpreterConfig::default()
    };
    let result = cppinterp::repl::Repl::new(config).and_then(|mut repl| repl.run());
    match result {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {err}");
            1
        }
    }
}
