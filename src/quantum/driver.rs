//! The search driver.
//!
//! One run walks the state machine
//!
//! ```text
//! INIT → BUILT → SUBMITTED → SAMPLED → VERIFIED
//!                                    ↘ RETRY → BUILT (next iteration count)
//!                                    ↘ EXHAUSTED
//! ```
//!
//! The oracle and diffusion circuits are compiled once in `INIT`; each attempt
//! only re-assembles `prep · (D·O)^r · measure` for the schedule's next `r`.
//! Sampled outcomes are checked classically in descending frequency and
//! nothing unverified is ever returned.
//!
//! Transient backend failures are retried with the same
//! [`RunConfiguration`], independently of the attempt budget. Cancellation is
//! checked before every submission; an in-flight submission is never
//! interrupted.

use crate::error::{BackendError, SolveError};
use crate::quantum::backend::{Counts, ExecutionBackend};
use crate::quantum::circuit::{Circuit, Qubit};
use crate::quantum::diffusion::{build_diffusion, uniform_superposition};
use crate::quantum::formula_oracle::FormulaOracle;
use crate::quantum::register::RegisterLayout;
use crate::quantum::schedule::{IterationSchedule, ScheduleType};
use crate::sat::assignment::Assignment;
use crate::sat::cnf::Cnf;
use crate::sat::literal::{Literal, PackedLiteral};
use crate::targets::DRIVER as LOG_DRIVER;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Search settings shared by every attempt of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Samples requested per submission.
    pub shots: usize,
    /// Upper bound on attempts (iteration counts tried), across all schedules.
    pub max_attempts: usize,
    /// Resubmissions allowed after `BackendError::Unavailable`, per attempt.
    pub transport_retries: usize,
    pub schedule: ScheduleType,
    /// Known number of satisfying assignments, for `ScheduleType::Known`.
    pub solutions: Option<usize>,
    /// Iteration count for `ScheduleType::Fixed`.
    pub iterations: Option<usize>,
    /// Seed for randomized schedules.
    pub seed: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            shots: 128,
            max_attempts: 16,
            transport_retries: 3,
            schedule: ScheduleType::default(),
            solutions: None,
            iterations: None,
            seed: None,
        }
    }
}

/// Parameters of one attempt. A retry replaces it rather than mutating it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunConfiguration {
    pub iterations: usize,
    pub shots: usize,
    pub max_attempts: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchState {
    Init,
    Built,
    Submitted,
    Sampled,
    Verified,
    Retry,
    Exhausted,
}

impl Display for SearchState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Built => "BUILT",
            Self::Submitted => "SUBMITTED",
            Self::Sampled => "SAMPLED",
            Self::Verified => "VERIFIED",
            Self::Retry => "RETRY",
            Self::Exhausted => "EXHAUSTED",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExhaustionReason {
    /// The schedule or the attempt budget ran out.
    Budget,
    Cancelled,
    DeadlineElapsed,
}

impl Display for ExhaustionReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Budget => write!(f, "iteration budget exhausted"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::DeadlineElapsed => write!(f, "deadline elapsed"),
        }
    }
}

/// Cooperative cancellation: a shared flag and an optional deadline.
///
/// Clones share the flag, so one clone can be handed to another thread and
/// cancelled from there.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Cancellation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::default(),
            deadline: Some(deadline),
        }
    }

    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Why the search must stop now, if it must.
    #[must_use]
    pub fn check(&self) -> Option<ExhaustionReason> {
        if self.is_cancelled() {
            Some(ExhaustionReason::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ExhaustionReason::DeadlineElapsed)
        } else {
            None
        }
    }
}

/// A classically verified satisfying assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub assignment: Assignment,
    /// Iteration count of the attempt that found it.
    pub iterations: usize,
    /// 1-based attempt number that found it.
    pub attempts: usize,
    /// Observed frequency of `assignment` in that attempt's sample.
    pub frequency: f64,
    /// Other verified satisfying outcomes from the same sample, most frequent
    /// first.
    pub also_satisfying: Vec<Assignment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Solution),
    /// No satisfying assignment was sampled. This is not a proof of
    /// unsatisfiability.
    Exhausted { reason: ExhaustionReason },
}

impl SearchOutcome {
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    #[must_use]
    pub const fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Found(s) => Some(s),
            Self::Exhausted { .. } => None,
        }
    }
}

/// Counters for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    pub attempts: usize,
    pub backend_calls: usize,
    pub transport_failures: usize,
    pub shots: usize,
    pub candidates_checked: usize,
    pub qubits: usize,
    pub oracle_gates: usize,
    pub last_depth: usize,
    pub last_iterations: usize,
}

/// `prep · (D·O)^iterations · measure(variables)`, where `round` is `O`
/// followed by `D`.
#[must_use]
pub fn assemble(layout: &RegisterLayout, round: &Circuit, iterations: usize) -> Circuit {
    let variables: Vec<Qubit> = layout.variables().collect();
    let mut circuit = uniform_superposition(layout);
    circuit.append(&round.repeat(iterations));
    circuit.measure(&variables);
    circuit
}

/// Compiles the one-round circuit `D·O` for `cnf`.
///
/// # Errors
///
/// See [`FormulaOracle::compile`].
pub fn grover_round<L: Literal>(cnf: &Cnf<L>) -> Result<(FormulaOracle, Circuit), SolveError> {
    let oracle = FormulaOracle::compile(cnf)?;
    let mut round = oracle.circuit().clone();
    round.append(&build_diffusion(oracle.layout()));
    Ok((oracle, round))
}

enum Submission {
    Sampled(Counts),
    Stopped(ExhaustionReason),
}

/// One Grover search over one formula.
#[derive(Debug)]
pub struct GroverSearch<'a, L: Literal = PackedLiteral> {
    cnf: &'a Cnf<L>,
    options: SearchOptions,
    cancellation: Cancellation,
    state: SearchState,
    stats: SearchStats,
    last_counts: Option<Counts>,
}

impl<'a, L: Literal> GroverSearch<'a, L> {
    #[must_use]
    pub fn new(cnf: &'a Cnf<L>, options: SearchOptions) -> Self {
        Self {
            cnf,
            options,
            cancellation: Cancellation::default(),
            state: SearchState::Init,
            stats: SearchStats::default(),
            last_counts: None,
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    #[must_use]
    pub const fn state(&self) -> SearchState {
        self.state
    }

    #[must_use]
    pub const fn stats(&self) -> &SearchStats {
        &self.stats
    }

    #[must_use]
    pub const fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Sample of the most recent attempt.
    #[must_use]
    pub const fn last_counts(&self) -> Option<&Counts> {
        self.last_counts.as_ref()
    }

    fn enter(&mut self, next: SearchState) {
        log::debug!(target: LOG_DRIVER, "{} -> {next}", self.state);
        self.state = next;
    }

    fn exhausted(&mut self, reason: ExhaustionReason) -> SearchOutcome {
        self.enter(SearchState::Exhausted);
        log::info!(
            target: LOG_DRIVER,
            "No satisfying assignment after {} attempts: {reason}",
            self.stats.attempts
        );
        SearchOutcome::Exhausted { reason }
    }

    /// Runs the search to a terminal state.
    ///
    /// # Errors
    ///
    /// [`SolveError::BackendRejectedCircuit`] as soon as the backend refuses a
    /// circuit, [`SolveError::BackendUnavailable`] once transport retries are
    /// used up, and [`SolveError::AncillaExhausted`] if the oracle cannot be
    /// compiled. Running out of attempts is an `Ok` outcome.
    pub fn run<B: ExecutionBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Result<SearchOutcome, SolveError> {
        self.state = SearchState::Init;
        self.stats = SearchStats::default();
        self.last_counts = None;

        let (oracle, round) = grover_round(self.cnf)?;
        let layout = *oracle.layout();
        self.stats.qubits = layout.width();
        self.stats.oracle_gates = oracle.circuit().len();

        let mut schedule = self.options.schedule.to_impl(
            layout.num_vars(),
            self.options.solutions,
            self.options.iterations,
            self.options.seed,
        );

        log::info!(
            target: LOG_DRIVER,
            "Searching {} variables, {} clauses on {} ({} qubits, oracle {} gates)",
            layout.num_vars(),
            layout.num_ancillas(),
            backend.name(),
            layout.width(),
            oracle.circuit().len()
        );

        loop {
            if let Some(reason) = self.cancellation.check() {
                return Ok(self.exhausted(reason));
            }
            if self.stats.attempts >= self.options.max_attempts {
                return Ok(self.exhausted(ExhaustionReason::Budget));
            }
            let Some(iterations) = schedule.next_iterations() else {
                return Ok(self.exhausted(ExhaustionReason::Budget));
            };

            let config = RunConfiguration {
                iterations,
                shots: self.options.shots,
                max_attempts: self.options.max_attempts,
            };
            self.stats.attempts += 1;

            let circuit = assemble(&layout, &round, config.iterations);
            self.stats.last_depth = circuit.depth();
            self.stats.last_iterations = config.iterations;
            self.enter(SearchState::Built);
            log::debug!(
                target: LOG_DRIVER,
                "Attempt {}/{}: r = {}, {} gates, depth {}",
                self.stats.attempts,
                config.max_attempts,
                config.iterations,
                circuit.len(),
                self.stats.last_depth
            );

            let counts = match self.submit(backend, &circuit, &config)? {
                Submission::Sampled(counts) => counts,
                Submission::Stopped(reason) => return Ok(self.exhausted(reason)),
            };
            self.enter(SearchState::Sampled);

            let outcome = self.verify(&counts, &config);
            self.last_counts = Some(counts);

            if let Some(solution) = outcome {
                self.enter(SearchState::Verified);
                log::info!(
                    target: LOG_DRIVER,
                    "Verified {} on attempt {} (r = {}, frequency {:.3})",
                    solution.assignment,
                    solution.attempts,
                    solution.iterations,
                    solution.frequency
                );
                return Ok(SearchOutcome::Found(solution));
            }
            self.enter(SearchState::Retry);
        }
    }

    fn submit<B: ExecutionBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        circuit: &Circuit,
        config: &RunConfiguration,
    ) -> Result<Submission, SolveError> {
        let mut failures = 0;
        loop {
            self.stats.backend_calls += 1;
            self.enter(SearchState::Submitted);
            match backend.submit(circuit, config.shots) {
                Ok(counts) => {
                    self.stats.shots += counts.shots();
                    return Ok(Submission::Sampled(counts));
                }
                Err(BackendError::Unavailable(message)) => {
                    self.stats.transport_failures += 1;
                    failures += 1;
                    if failures > self.options.transport_retries {
                        return Err(SolveError::BackendUnavailable {
                            attempts: failures,
                            message,
                        });
                    }
                    log::warn!(
                        target: LOG_DRIVER,
                        "Backend unavailable ({message}), resubmitting ({failures}/{})",
                        self.options.transport_retries
                    );
                    self.enter(SearchState::Built);
                    if let Some(reason) = self.cancellation.check() {
                        return Ok(Submission::Stopped(reason));
                    }
                }
                Err(BackendError::RejectedCircuit(message)) => {
                    return Err(SolveError::BackendRejectedCircuit {
                        qubits: circuit.width(),
                        gates: circuit.len(),
                        message,
                    });
                }
            }
        }
    }

    /// Checks each distinct outcome, most frequent first.
    fn verify(&mut self, counts: &Counts, config: &RunConfiguration) -> Option<Solution> {
        let num_vars = self.cnf.variable_count();
        let mut satisfying = Vec::new();
        for (candidate, count) in counts.ranked() {
            self.stats.candidates_checked += 1;
            if candidate.num_vars() != num_vars {
                log::trace!(
                    target: LOG_DRIVER,
                    "Discarding {candidate} ({count} shots): {} bits, expected {num_vars}",
                    candidate.num_vars()
                );
            } else if self.cnf.is_satisfied_by(candidate) {
                satisfying.push(candidate.clone());
            } else {
                log::trace!(
                    target: LOG_DRIVER,
                    "Discarding {candidate} ({count} shots): not satisfying"
                );
            }
        }

        let mut satisfying = satisfying.into_iter();
        let assignment = satisfying.next()?;
        Some(Solution {
            frequency: counts.frequency(&assignment),
            assignment,
            iterations: config.iterations,
            attempts: self.stats.attempts,
            also_satisfying: satisfying.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::simulator::StateVectorSimulator;

    /// Replays canned results, then keeps returning the last one.
    struct Scripted {
        script: Vec<Result<Counts, BackendError>>,
        calls: usize,
    }

    impl ExecutionBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn submit(&mut self, _circuit: &Circuit, _shots: usize) -> Result<Counts, BackendError> {
            let idx = self.calls.min(self.script.len() - 1);
            self.calls += 1;
            self.script[idx].clone()
        }
    }

    fn counts(outcomes: &[(usize, usize)], bits: usize) -> Counts {
        outcomes
            .iter()
            .map(|&(i, c)| (Assignment::from_basis_index(i, bits), c))
            .collect()
    }

    fn unique_solution() -> Cnf {
        Cnf::new(2, [vec![1, 2], vec![-1, 2], vec![1, -2]]).unwrap()
    }

    #[test]
    fn test_picks_most_frequent_satisfying() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b00, 50), (0b11, 30), (0b01, 20)], 2))],
            calls: 0,
        };
        let mut search = GroverSearch::new(&cnf, SearchOptions::default());
        let outcome = search.run(&mut backend).unwrap();
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.assignment, Assignment::from_bools(&[true, true]));
        assert!((solution.frequency - 0.3).abs() < 1e-12);
        assert_eq!(solution.attempts, 1);
        assert!(solution.also_satisfying.is_empty());
        assert_eq!(search.stats().candidates_checked, 3);
        assert_eq!(search.state(), SearchState::Verified);
    }

    #[test]
    fn test_never_returns_unverified() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b00, 90), (0b10, 10)], 2))],
            calls: 0,
        };
        let options = SearchOptions {
            max_attempts: 4,
            ..SearchOptions::default()
        };
        let mut search = GroverSearch::new(&cnf, options);
        let outcome = search.run(&mut backend).unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::Budget
            }
        );
        // Doubling over N = 2 has cap 2: trials 1 and 2.
        assert_eq!(search.stats().attempts, 2);
        assert_eq!(search.state(), SearchState::Exhausted);
    }

    #[test]
    fn test_attempt_budget_caps_repeating_schedules() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b00, 1)], 2))],
            calls: 0,
        };
        let options = SearchOptions {
            schedule: ScheduleType::Fixed,
            iterations: Some(1),
            max_attempts: 5,
            ..SearchOptions::default()
        };
        let mut search = GroverSearch::new(&cnf, options);
        assert!(!search.run(&mut backend).unwrap().is_found());
        assert_eq!(search.stats().attempts, 5);
        assert_eq!(backend.calls, 5);
    }

    #[test]
    fn test_transport_retry_then_success() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![
                Err(BackendError::Unavailable("busy".into())),
                Err(BackendError::Unavailable("busy".into())),
                Ok(counts(&[(0b11, 10)], 2)),
            ],
            calls: 0,
        };
        let mut search = GroverSearch::new(&cnf, SearchOptions::default());
        let solution = search.run(&mut backend).unwrap();
        assert!(solution.is_found());
        assert_eq!(search.stats().attempts, 1);
        assert_eq!(search.stats().transport_failures, 2);
        assert_eq!(search.stats().backend_calls, 3);
    }

    #[test]
    fn test_transport_retries_run_out() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Err(BackendError::Unavailable("down".into()))],
            calls: 0,
        };
        let options = SearchOptions {
            transport_retries: 2,
            ..SearchOptions::default()
        };
        let err = GroverSearch::new(&cnf, options)
            .run(&mut backend)
            .unwrap_err();
        assert!(matches!(
            err,
            SolveError::BackendUnavailable { attempts: 3, .. }
        ));
        assert_eq!(backend.calls, 3);
    }

    #[test]
    fn test_rejection_is_not_retried() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Err(BackendError::RejectedCircuit("too deep".into()))],
            calls: 0,
        };
        let err = GroverSearch::new(&cnf, SearchOptions::default())
            .run(&mut backend)
            .unwrap_err();
        match err {
            SolveError::BackendRejectedCircuit { qubits, message, .. } => {
                assert_eq!(qubits, 5);
                assert_eq!(message, "too deep");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(backend.calls, 1);
    }

    #[test]
    fn test_cancelled_before_first_submission() {
        let cnf = unique_solution();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b11, 1)], 2))],
            calls: 0,
        };
        let cancellation = Cancellation::new();
        cancellation.cancel();
        let outcome = GroverSearch::new(&cnf, SearchOptions::default())
            .with_cancellation(cancellation)
            .run(&mut backend)
            .unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::Cancelled
            }
        );
        assert_eq!(backend.calls, 0);
    }

    #[test]
    fn test_deadline_elapsed() {
        let cnf = unique_solution();
        let mut sim = StateVectorSimulator::with_seed(1);
        let outcome = GroverSearch::new(&cnf, SearchOptions::default())
            .with_cancellation(Cancellation::with_deadline(Instant::now()))
            .run(&mut sim)
            .unwrap();
        assert_eq!(
            outcome,
            SearchOutcome::Exhausted {
                reason: ExhaustionReason::DeadlineElapsed
            }
        );
    }

    #[test]
    fn test_also_satisfying_in_frequency_order() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2]]).unwrap();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b01, 5), (0b11, 9), (0b10, 5), (0b00, 1)], 2))],
            calls: 0,
        };
        let outcome = GroverSearch::new(&cnf, SearchOptions::default())
            .run(&mut backend)
            .unwrap();
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.assignment.basis_index(), Some(0b11));
        let rest: Vec<Option<usize>> = solution
            .also_satisfying
            .iter()
            .map(Assignment::basis_index)
            .collect();
        assert_eq!(rest, vec![Some(0b01), Some(0b10)]);
    }

    #[test]
    fn test_short_outcome_is_never_reported() {
        // x1 and not x2: a 1-bit outcome `1` would pass if missing bits read
        // as false.
        let cnf: Cnf = Cnf::new(2, [vec![1], vec![-2]]).unwrap();
        let mut backend = Scripted {
            script: vec![Ok(counts(&[(0b1, 10)], 1))],
            calls: 0,
        };
        let options = SearchOptions {
            max_attempts: 2,
            ..SearchOptions::default()
        };
        let mut search = GroverSearch::new(&cnf, options);
        let outcome = search.run(&mut backend).unwrap();
        assert!(!outcome.is_found());
        assert_eq!(search.stats().candidates_checked, 2);

        let mut backend = Scripted {
            script: vec![Ok([
                (Assignment::from_bools(&[true]), 10),
                (Assignment::from_bools(&[true, false]), 1),
            ]
            .into_iter()
            .collect())],
            calls: 0,
        };
        let outcome = GroverSearch::new(&cnf, SearchOptions::default())
            .run(&mut backend)
            .unwrap();
        let solution = outcome.solution().unwrap();
        assert_eq!(solution.assignment.num_vars(), 2);
        assert_eq!(solution.assignment.solutions(), vec![1, -2]);
    }

    #[test]
    fn test_assemble_shape() {
        let cnf = unique_solution();
        let (oracle, round) = grover_round(&cnf).unwrap();
        let circuit = assemble(oracle.layout(), &round, 3);
        assert_eq!(circuit.width(), 5);
        assert_eq!(circuit.measured(), &[0, 1]);
        assert_eq!(circuit.len(), 2 + 3 * round.len());
    }
}
