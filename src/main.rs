//! # grover_sat
//!
//! `grover_sat` solves k-SAT formulas by Grover search. The formula is
//! compiled into a phase oracle, interleaved with the diffusion operator and
//! run on a state-vector simulator; sampled assignments are verified
//! classically before anything is reported.
//!
//! ## Usage
//!
//! ```sh
//! grover_sat [OPTIONS] [PATH] [SUBCOMMAND]
//! ```
//!
//! -   `PATH` alone: solve a DIMACS `.cnf` file, or every `.cnf` file under a
//!     directory.
//! -   `file --path <file>`: solve a DIMACS file.
//! -   `text --input "1 -2 0\n2 3 0"`: solve DIMACS-style text.
//! -   `expr --input "(x or y or not z) and (not x or y or z)"`: solve a
//!     formula over named variables.
//! -   `completions <shell>`: print a shell completion script.
//!
//! ### Common Options
//!
//! -   `-d, --debug`: debug logging (`RUST_LOG` overrides).
//! -   `-v, --verify`: re-check the reported assignment.
//! -   `-s, --stats`: print problem and search statistics.
//! -   `-p, --print-solution`: print the assignment.
//! -   `--print-circuit`: print the search circuit as OpenQASM 3.
//! -   `--histogram`: print the last sample.
//! -   `--shots <N>` (128), `--max-attempts <N>` (16), `--transport-retries <N>` (3).
//! -   `--schedule <doubling|known|fixed|bbht>` with `--solutions <M>` or
//!     `--iterations <R>`.
//! -   `--seed <S>`, `--max-qubits <Q>`, `--timeout <SECS>`,
//!     `--drop-tautologies`.
//!
//! ## Exit Codes
//!
//! `0` when a verified assignment was found, `1` when none was found within
//! the budget (or the run was cancelled), `2` on malformed input or a fatal
//! backend error.

use crate::command_line::cli::{
    Cli, Commands, CommonOptions, Verdict, load_expr, load_file, load_text, report_load_error,
    solve_and_report, solve_dir,
};
use clap::{CommandFactory, Parser};
use std::path::Path;
use std::process::ExitCode;

mod command_line {
    pub(crate) mod cli;
}

/// Global allocator using `tikv-jemallocator` for memory usage tracking.
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn init_logging(common: &CommonOptions) {
    let default = if common.debug { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .try_init();
}

fn solve_path(path: &Path, common: &CommonOptions) -> Verdict {
    if path.is_dir() {
        return solve_dir(path, common);
    }
    match load_file(path, common) {
        Ok(problem) => solve_and_report(&problem, common, Some(path)),
        Err(e) => report_load_error(&path.display().to_string(), &e),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verdict = match cli.command {
        Some(Commands::File { path, common }) => {
            init_logging(&common);
            solve_path(&path, &common)
        }

        Some(Commands::Text { input, common }) => {
            init_logging(&common);
            match load_text(&input, &common) {
                Ok(problem) => solve_and_report(&problem, &common, None),
                Err(e) => report_load_error("text input", &e),
            }
        }

        Some(Commands::Expr { input, common }) => {
            init_logging(&common);
            match load_expr(&input, &common) {
                Ok(problem) => solve_and_report(&problem, &common, None),
                Err(e) => report_load_error("expression input", &e),
            }
        }

        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Verdict::Found
        }

        None => {
            init_logging(&cli.common);
            if let Some(path) = cli.path {
                solve_path(&path, &cli.common)
            } else {
                eprintln!("No command provided. Use --help for more information.");
                Verdict::Failed
            }
        }
    };

    verdict.into()
}
