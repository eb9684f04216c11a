//! `hyperltlmso` binary crate: a thin wrapper over the library's
//! [`hyperltlmso::prove_with`] entry point.

use std::fs;
use std::io::{self, Write};

use clap::Parser;

use hyperltlmso::options::{CliOptions, SynthesisOptions, TraceLevel};
use hyperltlmso::{prove_with, Status};

fn main() {
    if let Err(error) = hyperltlmso_main() {
        let _ = write!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

/// Initializes the logging framework with the given trace level.
///
/// # Errors
///
/// Returns an error if the logging framework has already been initialized.
fn initialize_logging(level: TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Parses the options, reads every input file, runs the synthesis
/// procedure, and prints the resulting status and advice pair, if any.
///
/// # Errors
///
/// Returns an error if an I/O error occurred, e.g. from opening a file, or
/// if synthesis itself failed on malformed input.
fn hyperltlmso_main() -> io::Result<()> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level)?;

    let formula = options.formula.trim().to_string();
    let initial_config = fs::read_to_string(&options.initial_config)?;
    let system_transducer = fs::read_to_string(&options.system_transducer)?;
    let symbol_mapping = fs::read_to_string(&options.symbol_mapping)?;
    let invariant = options.invariant.as_deref().map(fs::read_to_string).transpose()?;
    let relation = options.relation.as_deref().map(fs::read_to_string).transpose()?;

    let synthesis_options = SynthesisOptions::from(&options);
    let result = prove_with(
        &formula,
        &initial_config,
        &system_transducer,
        &symbol_mapping,
        invariant.as_deref(),
        relation.as_deref(),
        &synthesis_options,
    )
    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    writeln!(io::stdout(), "{}", result.status())?;
    if let (Status::Proved, Some(advice)) = (result.status(), result.advice()) {
        writeln!(io::stdout(), "invariant states: {}", advice.invariant().nfa().num_states())?;
        writeln!(io::stdout(), "relation states: {}", advice.relation().nfa().num_states())?;
    }
    Ok(())
}
