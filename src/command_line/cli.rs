#![allow(clippy::cast_precision_loss)]

use grover_sat::error::{FormulaError, SolveError};
use grover_sat::quantum::driver::{
    Cancellation, GroverSearch, SearchOptions, SearchOutcome, SearchStats, Solution, assemble,
    grover_round,
};
use grover_sat::quantum::schedule::{IterationSchedule, ScheduleType};
use grover_sat::quantum::simulator::{SimulatorConfig, StateVectorSimulator};
use grover_sat::sat::assignment::Assignment;
use grover_sat::sat::cnf::Cnf;
use grover_sat::sat::dimacs::{parse_file, parse_text};
use grover_sat::sat::expr::parse_expression;
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tikv_jemalloc_ctl::{epoch, stats};

/// Defines the command-line interface for the Grover SAT solver.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(
    name = "grover_sat",
    version,
    about = "Solve k-SAT by Grover search on a state-vector simulator"
)]
pub(crate) struct Cli {
    /// An optional path argument. If provided without a subcommand, it's
    /// treated as a DIMACS .cnf file, or a directory of them.
    #[arg()]
    pub path: Option<PathBuf>,

    /// Specifies the subcommand to execute (e.g. `file`, `text`, `expr`).
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Common options applicable to all commands.
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Enumerates the available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Solve a CNF file in DIMACS format.
    File {
        /// Path to the DIMACS .cnf file.
        #[arg(long)]
        path: PathBuf,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve a CNF formula provided as plain DIMACS-style text.
    Text {
        /// Literal CNF input as a string (e.g. "1 -2 0\n2 3 0").
        /// Literals are space-separated and 0 terminates a clause.
        #[arg(short, long)]
        input: String,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve a formula over named variables, e.g. "(x or y or not z) and (not x or y or z)".
    Expr {
        /// The formula text. Clauses are joined by `and`, literals by `or`, negation is `not`.
        #[arg(short, long)]
        input: String,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Defines common command-line options shared across different subcommands.
#[derive(Args, Debug, Clone)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct CommonOptions {
    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, default_value_t = false)]
    pub(crate) debug: bool,

    /// Re-check the reported assignment against the formula and print the result.
    #[arg(short, long, default_value_t = false)]
    pub(crate) verify: bool,

    /// Print problem and search statistics after solving.
    #[arg(short, long, default_value_t = false)]
    pub(crate) stats: bool,

    /// Print the satisfying assignment, and any other satisfying outcomes sampled.
    #[arg(short, long, default_value_t = false)]
    pub(crate) print_solution: bool,

    /// Print the search circuit as OpenQASM 3 before solving.
    #[arg(long, default_value_t = false)]
    pub(crate) print_circuit: bool,

    /// Print a histogram of the last sample.
    #[arg(long, default_value_t = false)]
    pub(crate) histogram: bool,

    /// Samples per circuit submission.
    #[arg(long, default_value_t = 128)]
    pub(crate) shots: usize,

    /// How the iteration count is chosen on each attempt.
    #[arg(long, default_value_t = ScheduleType::Doubling)]
    pub(crate) schedule: ScheduleType,

    /// Iteration count for `--schedule fixed`.
    #[arg(long)]
    pub(crate) iterations: Option<usize>,

    /// Known number of satisfying assignments, for `--schedule known`.
    #[arg(long)]
    pub(crate) solutions: Option<usize>,

    /// Maximum number of attempts before giving up.
    #[arg(long, default_value_t = 16)]
    pub(crate) max_attempts: usize,

    /// Resubmissions allowed when the backend is unavailable.
    #[arg(long, default_value_t = 3)]
    pub(crate) transport_retries: usize,

    /// Seed for sampling and randomized schedules.
    #[arg(long)]
    pub(crate) seed: Option<u64>,

    /// Widest circuit the simulator accepts.
    #[arg(long, default_value_t = SimulatorConfig::default().max_qubits)]
    pub(crate) max_qubits: usize,

    /// Stop issuing submissions after this many seconds.
    #[arg(long, value_parser = parse_timeout)]
    pub(crate) timeout: Option<Duration>,

    /// Drop clauses containing both x and -x instead of rejecting the formula.
    #[arg(long, default_value_t = false)]
    pub(crate) drop_tautologies: bool,
}

impl CommonOptions {
    pub(crate) fn search_options(&self) -> SearchOptions {
        SearchOptions {
            shots: self.shots,
            max_attempts: self.max_attempts,
            transport_retries: self.transport_retries,
            schedule: self.schedule,
            solutions: self.solutions,
            iterations: self.iterations,
            seed: self.seed,
        }
    }

    pub(crate) fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            max_qubits: self.max_qubits,
            seed: self.seed,
            ..SimulatorConfig::default()
        }
    }

    pub(crate) fn cancellation(&self) -> Cancellation {
        self.timeout
            .map_or_else(Cancellation::new, Cancellation::with_timeout)
    }
}

/// Seconds as a non-negative, finite decimal.
fn parse_timeout(value: &str) -> Result<Duration, String> {
    let secs: f64 = value
        .parse()
        .map_err(|e| format!("`{value}` is not a number: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("`{value}` is not a valid timeout: {e}"))
}

/// Result of one command, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Verdict {
    /// A verified satisfying assignment was found.
    Found,
    /// The budget ran out, or the run was cancelled.
    NotFound,
    /// Malformed input or a fatal backend error.
    Failed,
}

impl From<Verdict> for ExitCode {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Found => Self::SUCCESS,
            Verdict::NotFound => Self::from(1_u8),
            Verdict::Failed => Self::from(2_u8),
        }
    }
}

/// A parsed formula and what it took to get it.
#[derive(Debug)]
pub(crate) struct Problem {
    pub(crate) cnf: Cnf,
    /// Variable names, for expression input.
    pub(crate) names: Option<Vec<String>>,
    pub(crate) parse_time: Duration,
}

pub(crate) fn load_file(path: &Path, common: &CommonOptions) -> Result<Problem, FormulaError> {
    let time = Instant::now();
    let cnf = parse_file(path)?.build(common.drop_tautologies)?;
    Ok(Problem {
        cnf,
        names: None,
        parse_time: time.elapsed(),
    })
}

/// Accepts a literal `\n` as a line break, as typed on a shell command line.
pub(crate) fn load_text(input: &str, common: &CommonOptions) -> Result<Problem, FormulaError> {
    let time = Instant::now();
    let cnf = parse_text(&input.replace("\\n", "\n"))?.build(common.drop_tautologies)?;
    Ok(Problem {
        cnf,
        names: None,
        parse_time: time.elapsed(),
    })
}

pub(crate) fn load_expr(input: &str, common: &CommonOptions) -> Result<Problem, FormulaError> {
    let time = Instant::now();
    let named = parse_expression(input)?;
    let cnf = named.raw.build(common.drop_tautologies)?;
    Ok(Problem {
        cnf,
        names: Some(named.names),
        parse_time: time.elapsed(),
    })
}

/// Prints a load failure and maps it to [`Verdict::Failed`].
pub(crate) fn report_load_error(label: &str, err: &FormulaError) -> Verdict {
    eprintln!("Malformed formula in {label}: {err}");
    Verdict::Failed
}

/// Solves every `.cnf` file under a directory.
///
/// Returns the most severe verdict across all files.
pub(crate) fn solve_dir(path: &Path, common: &CommonOptions) -> Verdict {
    let mut verdict = Verdict::Found;

    for entry in walkdir::WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }

        if file_path.extension().is_none_or(|ext| ext != "cnf") {
            eprintln!("Skipping non-CNF file: {}", file_path.display());
            continue;
        }

        let result = match load_file(file_path, common) {
            Ok(problem) => solve_and_report(&problem, common, Some(file_path)),
            Err(e) => report_load_error(&file_path.display().to_string(), &e),
        };
        verdict = verdict.max(result);
    }

    verdict
}

/// Reads allocated and resident memory from jemalloc, in MiB.
fn memory_mib() -> (f64, f64) {
    let _ = epoch::advance();
    let read = |bytes: Option<usize>| bytes.map_or(0.0, |b| b as f64 / (1024.0 * 1024.0));
    let allocated = stats::allocated::mib().ok().and_then(|m| m.read().ok());
    let resident = stats::resident::mib().ok().and_then(|m| m.read().ok());
    (read(allocated), read(resident))
}

/// The iteration count the search tries first.
fn first_iterations(cnf: &Cnf, common: &CommonOptions) -> usize {
    let options = common.search_options();
    options
        .schedule
        .to_impl(
            cnf.variable_count(),
            options.solutions,
            options.iterations,
            options.seed,
        )
        .next_iterations()
        .unwrap_or(1)
}

/// Prints the full search circuit for the first iteration count tried.
fn print_circuit(cnf: &Cnf, common: &CommonOptions) -> Result<(), SolveError> {
    let (oracle, round) = grover_round(cnf)?;
    let iterations = first_iterations(cnf, common);
    let circuit = assemble(oracle.layout(), &round, iterations);
    let gates = circuit
        .gate_counts()
        .into_iter()
        .sorted()
        .map(|(name, count)| format!("{name}={count}"))
        .join(" ");
    println!("// r = {iterations}, {} qubits, depth {}", circuit.width(), circuit.depth());
    println!("// gates: {gates}");
    println!("{circuit}");
    Ok(())
}

/// Renders an assignment with variable names when available, as signed
/// DIMACS literals otherwise.
fn format_assignment(assignment: &Assignment, names: Option<&[String]>) -> String {
    match names {
        Some(names) => names
            .iter()
            .zip(assignment.iter())
            .map(|(name, value)| format!("{name}={}", u8::from(value)))
            .join(" "),
        None => assignment.solutions().iter().join(" "),
    }
}

/// Re-checks a reported solution against the formula.
pub(crate) fn verify_solution(cnf: &Cnf, solution: Option<&Solution>) {
    if let Some(solution) = solution {
        let ok = cnf.verify(&solution.assignment.solutions());
        println!("Verified: {ok:?}");
    } else {
        println!("Nothing to verify");
    }
}

/// Runs the search on a loaded problem and prints the outcome.
pub(crate) fn solve_and_report(
    problem: &Problem,
    common: &CommonOptions,
    label: Option<&Path>,
) -> Verdict {
    if let Some(name) = label {
        println!("Solving: {}", name.display());
    }

    if common.debug {
        println!("CNF:\n{}", problem.cnf);
    }

    if common.print_circuit {
        if let Err(e) = print_circuit(&problem.cnf, common) {
            eprintln!("Error: {e}");
            return Verdict::Failed;
        }
    }

    let _ = epoch::advance();
    let time = Instant::now();

    let mut simulator = StateVectorSimulator::new(common.simulator_config());
    let mut search =
        GroverSearch::new(&problem.cnf, common.search_options()).with_cancellation(common.cancellation());
    let result = search.run(&mut simulator);

    let elapsed = time.elapsed();
    let (allocated, resident) = memory_mib();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {e}");
            return Verdict::Failed;
        }
    };

    if common.histogram {
        if let Some(counts) = search.last_counts() {
            println!("\nLast sample ({} shots):\n{counts}", counts.shots());
        }
    }

    if common.verify {
        verify_solution(&problem.cnf, outcome.solution());
    }

    if common.stats {
        print_stats(
            problem.parse_time,
            elapsed,
            &problem.cnf,
            search.stats(),
            allocated,
            resident,
        );
    }

    let names = problem.names.as_deref();
    match &outcome {
        SearchOutcome::Found(solution) => {
            if common.print_solution {
                println!("Solution: {}", format_assignment(&solution.assignment, names));
                for other in &solution.also_satisfying {
                    println!("Also satisfying: {}", format_assignment(other, names));
                }
            }
            println!(
                "\nSATISFIABLE (r = {}, attempt {}, frequency {:.3})",
                solution.iterations, solution.attempts, solution.frequency
            );
            Verdict::Found
        }
        SearchOutcome::Exhausted { reason } => {
            println!("\nNOT FOUND: {reason}; unsatisfiable or not found within budget");
            Verdict::NotFound
        }
    }
}

/// Helper function to print a single statistic line in a formatted table row.
pub(crate) fn stat_line(label: &str, value: impl std::fmt::Display) {
    println!("|  {label:<28} {value:>18}  |");
}

/// Helper function to print a statistic line that includes a rate (value/second).
pub(crate) fn stat_line_with_rate(label: &str, value: usize, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        value as f64 / elapsed
    } else {
        0.0
    };
    println!("|  {label:<20} {value:>12} ({rate:>9.0}/sec)  |");
}

/// Prints a summary of problem and search statistics.
pub(crate) fn print_stats(
    parse_time: Duration,
    elapsed: Duration,
    cnf: &Cnf,
    s: &SearchStats,
    allocated: f64,
    resident: f64,
) {
    let elapsed_secs = elapsed.as_secs_f64();

    println!("\n=======================[ Problem Statistics ]=========================");
    stat_line("Parse time (s)", format!("{:.3}", parse_time.as_secs_f64()));
    stat_line("Variables", cnf.variable_count());
    stat_line("Clauses", cnf.clauses().len());
    stat_line("Literals", cnf.literal_count());
    stat_line("Max clause width", cnf.max_clause_len());
    stat_line("Qubits (variables + ancillas)", s.qubits);
    stat_line("Oracle gates", s.oracle_gates);

    println!("========================[ Search Statistics ]========================");
    stat_line("Attempts", s.attempts);
    stat_line("Last iteration count", s.last_iterations);
    stat_line("Last circuit depth", s.last_depth);
    stat_line_with_rate("Backend calls", s.backend_calls, elapsed_secs);
    stat_line("Transport failures", s.transport_failures);
    stat_line_with_rate("Shots", s.shots, elapsed_secs);
    stat_line("Candidates checked", s.candidates_checked);
    stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
    stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    stat_line("CPU time (s)", format!("{elapsed_secs:.3}"));
    println!("=====================================================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn common(args: &[&str]) -> CommonOptions {
        let mut argv = vec!["grover_sat"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv).common
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_match_library() {
        let opts = common(&[]).search_options();
        assert_eq!(opts, SearchOptions::default());
    }

    #[test]
    fn test_schedule_flags() {
        let opts = common(&["--schedule", "fixed", "--iterations", "3", "--seed", "9"]);
        let search = opts.search_options();
        assert_eq!(search.schedule, ScheduleType::Fixed);
        assert_eq!(search.iterations, Some(3));
        assert_eq!(opts.simulator_config().seed, Some(9));
    }

    #[test]
    fn test_timeout_must_be_a_valid_duration() {
        assert_eq!(
            common(&["--timeout", "1.5"]).timeout,
            Some(Duration::from_millis(1500))
        );
        for bad in ["-1", "NaN", "inf", "soon"] {
            assert!(
                Cli::try_parse_from(["grover_sat", "--timeout", bad]).is_err(),
                "accepted --timeout {bad}"
            );
        }
    }

    #[test]
    fn test_first_iterations_follow_schedule() {
        let cnf: Cnf = Cnf::new(4, [vec![1], vec![-2], vec![3, 4], vec![-4]]).unwrap();
        let known = common(&["--schedule", "known", "--solutions", "1"]);
        assert_eq!(first_iterations(&cnf, &known), 3);
        let fixed = common(&["--schedule", "fixed", "--iterations", "5"]);
        assert_eq!(first_iterations(&cnf, &fixed), 5);
        assert_eq!(first_iterations(&cnf, &common(&[])), 1);
        assert!(print_circuit(&cnf, &known).is_ok());
    }

    #[test]
    fn test_expr_subcommand() {
        let cli = Cli::parse_from(["grover_sat", "expr", "--input", "x or not y", "--shots", "8"]);
        match cli.command {
            Some(Commands::Expr { input, common }) => {
                assert_eq!(input, "x or not y");
                assert_eq!(common.shots, 8);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_load_text_with_escaped_newlines() {
        let problem = load_text("1 -2 0\\n2 0", &common(&[])).unwrap();
        assert_eq!(problem.cnf.clauses().len(), 2);
        assert_eq!(problem.cnf.variable_count(), 2);
    }

    #[test]
    fn test_load_text_tautology_handling() {
        assert!(matches!(
            load_text("1 -1 0 2 0", &common(&[])),
            Err(FormulaError::TautologicalClause { .. })
        ));
        let problem = load_text("1 -1 0 2 0", &common(&["--drop-tautologies"])).unwrap();
        assert_eq!(problem.cnf.clauses().len(), 1);
    }

    #[test]
    fn test_format_assignment() {
        let a = Assignment::from_bools(&[true, false]);
        assert_eq!(format_assignment(&a, None), "1 -2");
        let names = vec!["x".to_string(), "y".to_string()];
        assert_eq!(format_assignment(&a, Some(names.as_slice())), "x=1 y=0");
    }

    #[test]
    fn test_verdict_severity() {
        assert!(Verdict::Found < Verdict::NotFound);
        assert_eq!(Verdict::NotFound.max(Verdict::Failed), Verdict::Failed);
    }

    #[test]
    fn test_solve_and_report_verdicts() {
        let opts = common(&["--seed", "4"]);
        let sat = load_expr("(a or b) and (not a or b) and (a or not b)", &opts).unwrap();
        assert_eq!(solve_and_report(&sat, &opts, None), Verdict::Found);

        let unsat = load_text("1 0 -1 0", &opts).unwrap();
        assert_eq!(solve_and_report(&unsat, &opts, None), Verdict::NotFound);

        let tiny = common(&["--max-qubits", "2"]);
        assert_eq!(solve_and_report(&sat, &tiny, None), Verdict::Failed);
    }
}
