//! # flatcorpus command line
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Resolve into a run config (flags or --config file)
//!   ├─> Install the tracing subscriber for -v / -q
//!   └─> Execute the subcommand
//! ```
//!
//! ```bash
//! flatcorpus image out -s photos -r -g
//! flatcorpus text out -s documents -r --min-chars 20
//! flatcorpus run --config run.json
//! flatcorpus inspect out/metadata.csv --verify
//! ```
//!
//! Errors are printed to stderr unless `--quiet` is set; the exit status is
//! non-zero either way.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::Parser as _;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    let requested = cli.command.verbosity();

    let action = match cli.command.resolve() {
        Ok(action) => action,
        Err(e) => {
            if !requested.is_quiet() {
                eprintln!("Error: {e:#}");
            }
            return ExitCode::FAILURE;
        }
    };
    let verbosity = action.verbosity();

    if let Err(e) = flatcorpus::logging::init(verbosity)
        && !verbosity.is_quiet()
    {
        eprintln!("Warning: {e:#}");
    }

    match cli::execute(action) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !verbosity.is_quiet() {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}
