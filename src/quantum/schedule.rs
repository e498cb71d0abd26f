#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
//! Iteration schedules for Grover search.
//!
//! A schedule decides how many `(diffusion · oracle)` rounds to apply on each
//! attempt. After `r` rounds over `N` variables with `M` solutions, the
//! probability of measuring a solution is `sin²((2r + 1)·θ)` with
//! `sin θ = sqrt(M / 2^N)`; too many rounds rotate past the peak and the
//! probability falls again.
//!
//! This module provides:
//! - The `IterationSchedule` trait, the interface the search driver pulls
//!   iteration counts from.
//! - Several concrete implementations:
//!   - `KnownCount`: the optimum `floor(π/4 · sqrt(2^N / M))` for a known `M`,
//!     repeated on every attempt.
//!   - `Doubling`: `1, 2, 4, …` up to `ceil(π/4 · sqrt(2^N))`, for unknown `M`.
//!     The cap itself is tried last if the doubling steps over it.
//!   - `Fixed`: a user-chosen count, repeated.
//!   - `Bbht`: the randomized Boyer–Brassard–Høyer–Tapp schedule, drawing
//!     uniformly from `[1, m]` and growing `m` by 6/5 per attempt.
//!
//! Schedules do not enforce an attempt budget; the driver does.

use crate::targets::SCHEDULE as LOG_SCHEDULE;
use clap::ValueEnum;
use std::f64::consts::FRAC_PI_4;
use std::fmt::{Debug, Display};

/// Growth factor of the BBHT search window.
const BBHT_GROWTH: f64 = 6.0 / 5.0;

fn search_space(num_vars: usize) -> f64 {
    2_f64.powi(i32::try_from(num_vars).unwrap_or(i32::MAX))
}

/// `max(1, floor(π/4 · sqrt(2^N / M)))`.
///
/// `solutions` of zero is treated as one.
#[must_use]
pub fn optimal_iterations(num_vars: usize, solutions: usize) -> usize {
    let m = solutions.max(1) as f64;
    let r = (FRAC_PI_4 * (search_space(num_vars) / m).sqrt()).floor();
    (r as usize).max(1)
}

/// `ceil(π/4 · sqrt(2^N))`: the optimum for a single solution, rounded up.
#[must_use]
pub fn doubling_cap(num_vars: usize) -> usize {
    let r = (FRAC_PI_4 * search_space(num_vars).sqrt()).ceil();
    (r as usize).max(1)
}

/// Exact probability of measuring one of `solutions` marked states after
/// `iterations` rounds.
#[must_use]
pub fn success_probability(num_vars: usize, solutions: usize, iterations: usize) -> f64 {
    let ratio = (solutions as f64 / search_space(num_vars)).min(1.0);
    let theta = ratio.sqrt().asin();
    ((2.0 * iterations as f64 + 1.0) * theta).sin().powi(2)
}

/// Source of iteration counts for successive search attempts.
pub trait IterationSchedule: Debug + Clone {
    /// Iteration count for the next attempt, or `None` once the schedule has
    /// nothing left to try.
    fn next_iterations(&mut self) -> Option<usize>;

    /// Number of counts handed out so far.
    fn num_trials(&self) -> usize;

    /// Largest count this schedule will hand out.
    fn cap(&self) -> usize;
}

/// The known-`M` optimum, repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownCount {
    iterations: usize,
    trials: usize,
}

impl KnownCount {
    #[must_use]
    pub fn new(num_vars: usize, solutions: usize) -> Self {
        let iterations = optimal_iterations(num_vars, solutions);
        log::debug!(
            target: LOG_SCHEDULE,
            "r = {iterations} for M = {solutions}, success probability {:.3}",
            success_probability(num_vars, solutions, iterations)
        );
        Self {
            iterations,
            trials: 0,
        }
    }
}

impl IterationSchedule for KnownCount {
    fn next_iterations(&mut self) -> Option<usize> {
        self.trials += 1;
        Some(self.iterations)
    }

    fn num_trials(&self) -> usize {
        self.trials
    }

    fn cap(&self) -> usize {
        self.iterations
    }
}

/// `1, 2, 4, …` while at most the cap, then the cap itself if it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Doubling {
    next: usize,
    cap: usize,
    trials: usize,
    done: bool,
}

impl Doubling {
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self::with_cap(doubling_cap(num_vars))
    }

    #[must_use]
    pub const fn with_cap(cap: usize) -> Self {
        Self {
            next: 1,
            cap,
            trials: 0,
            done: false,
        }
    }
}

impl IterationSchedule for Doubling {
    fn next_iterations(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let r = if self.next < self.cap {
            let r = self.next;
            self.next = self.next.saturating_mul(2);
            r
        } else {
            self.done = true;
            self.cap
        };
        self.trials += 1;
        Some(r)
    }

    fn num_trials(&self) -> usize {
        self.trials
    }

    fn cap(&self) -> usize {
        self.cap
    }
}

/// A user-chosen count, repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixed {
    iterations: usize,
    trials: usize,
}

impl Fixed {
    #[must_use]
    pub const fn new(iterations: usize) -> Self {
        Self {
            iterations,
            trials: 0,
        }
    }
}

impl IterationSchedule for Fixed {
    fn next_iterations(&mut self) -> Option<usize> {
        self.trials += 1;
        Some(self.iterations)
    }

    fn num_trials(&self) -> usize {
        self.trials
    }

    fn cap(&self) -> usize {
        self.iterations
    }
}

/// Randomized schedule for unknown `M`.
///
/// Each attempt draws `r` uniformly from `[1, m]`; `m` starts at 1 and grows
/// by 6/5 per attempt up to `sqrt(2^N)`.
#[derive(Debug, Clone)]
pub struct Bbht {
    window: f64,
    limit: f64,
    trials: usize,
    rng: fastrand::Rng,
}

impl Bbht {
    #[must_use]
    pub fn new(num_vars: usize, seed: Option<u64>) -> Self {
        Self {
            window: 1.0,
            limit: search_space(num_vars).sqrt().max(1.0),
            trials: 0,
            rng: seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
        }
    }
}

impl IterationSchedule for Bbht {
    fn next_iterations(&mut self) -> Option<usize> {
        let upper = (self.window.floor() as usize).max(1);
        let r = self.rng.usize(1..=upper);
        self.window = (self.window * BBHT_GROWTH).min(self.limit);
        self.trials += 1;
        Some(r)
    }

    fn num_trials(&self) -> usize {
        self.trials
    }

    fn cap(&self) -> usize {
        (self.limit.floor() as usize).max(1)
    }
}

/// Possible schedule implementations.
#[derive(Debug, Clone)]
pub enum ScheduleImpls {
    KnownCount(KnownCount),
    Doubling(Doubling),
    Fixed(Fixed),
    Bbht(Bbht),
}

impl IterationSchedule for ScheduleImpls {
    fn next_iterations(&mut self) -> Option<usize> {
        match self {
            Self::KnownCount(s) => s.next_iterations(),
            Self::Doubling(s) => s.next_iterations(),
            Self::Fixed(s) => s.next_iterations(),
            Self::Bbht(s) => s.next_iterations(),
        }
    }

    fn num_trials(&self) -> usize {
        match self {
            Self::KnownCount(s) => s.num_trials(),
            Self::Doubling(s) => s.num_trials(),
            Self::Fixed(s) => s.num_trials(),
            Self::Bbht(s) => s.num_trials(),
        }
    }

    fn cap(&self) -> usize {
        match self {
            Self::KnownCount(s) => s.cap(),
            Self::Doubling(s) => s.cap(),
            Self::Fixed(s) => s.cap(),
            Self::Bbht(s) => s.cap(),
        }
    }
}

/// Enum representing the schedule to use.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Hash, Default, ValueEnum)]
pub enum ScheduleType {
    /// Exponential search over the iteration count, for unknown solution counts.
    #[default]
    Doubling,
    /// The optimum for a known solution count (`--solutions`).
    Known,
    /// A fixed iteration count (`--iterations`).
    Fixed,
    /// Randomized Boyer–Brassard–Høyer–Tapp schedule.
    Bbht,
}

impl Display for ScheduleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Doubling => write!(f, "doubling"),
            Self::Known => write!(f, "known"),
            Self::Fixed => write!(f, "fixed"),
            Self::Bbht => write!(f, "bbht"),
        }
    }
}

impl ScheduleType {
    /// Converts the `ScheduleType` to a concrete `ScheduleImpls`.
    ///
    /// `Known` without a solution count assumes one solution; `Fixed` without
    /// an iteration count uses the single-solution optimum.
    #[must_use]
    pub fn to_impl(
        self,
        num_vars: usize,
        solutions: Option<usize>,
        iterations: Option<usize>,
        seed: Option<u64>,
    ) -> ScheduleImpls {
        let schedule = match self {
            Self::Doubling => ScheduleImpls::Doubling(Doubling::new(num_vars)),
            Self::Known => {
                let m = solutions.unwrap_or_else(|| {
                    log::warn!(target: LOG_SCHEDULE, "No solution count given, assuming 1");
                    1
                });
                ScheduleImpls::KnownCount(KnownCount::new(num_vars, m))
            }
            Self::Fixed => {
                let r = iterations.unwrap_or_else(|| {
                    let r = optimal_iterations(num_vars, 1);
                    log::warn!(target: LOG_SCHEDULE, "No iteration count given, using {r}");
                    r
                });
                ScheduleImpls::Fixed(Fixed::new(r))
            }
            Self::Bbht => ScheduleImpls::Bbht(Bbht::new(num_vars, seed)),
        };
        log::debug!(
            target: LOG_SCHEDULE,
            "{self} schedule over {num_vars} variables, cap {}",
            schedule.cap()
        );
        schedule
    }
}
