//! The execution-backend seam and its result type.

use crate::error::BackendError;
use crate::quantum::circuit::Circuit;
use crate::sat::assignment::Assignment;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::fmt::{Display, Formatter};

/// Anything that can run a measured circuit.
///
/// `submit` may block; it is the only suspension point of a search.
pub trait ExecutionBackend {
    fn name(&self) -> &str;

    /// Runs `circuit` for `shots` independent samples of its measured
    /// register.
    ///
    /// # Errors
    ///
    /// [`BackendError::Unavailable`] for transient failures,
    /// [`BackendError::RejectedCircuit`] when the circuit cannot run here.
    fn submit(&mut self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError>;
}

impl<B: ExecutionBackend + ?Sized> ExecutionBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn submit(&mut self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        (**self).submit(circuit, shots)
    }
}

/// Multiset of measured bit-vectors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Counts {
    counts: FxHashMap<Assignment, usize>,
    shots: usize,
}

impl Counts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Assignment, count: usize) {
        *self.counts.entry(outcome).or_insert(0) += count;
        self.shots += count;
    }

    /// Total number of samples.
    #[must_use]
    pub const fn shots(&self) -> usize {
        self.shots
    }

    /// Number of distinct outcomes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    #[must_use]
    pub fn get(&self, outcome: &Assignment) -> usize {
        self.counts.get(outcome).copied().unwrap_or(0)
    }

    /// Observed probability of an outcome.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency(&self, outcome: &Assignment) -> f64 {
        if self.shots == 0 {
            0.0
        } else {
            self.get(outcome) as f64 / self.shots as f64
        }
    }

    /// Distinct outcomes, most frequent first. Ties go to the smaller basis
    /// index so the order is deterministic; the comparison never builds the
    /// index, so any register width works.
    #[must_use]
    pub fn ranked(&self) -> Vec<(&Assignment, usize)> {
        self.counts
            .iter()
            .map(|(a, &c)| (a, c))
            .sorted_by(|(a, ca), (b, cb)| {
                cb.cmp(ca)
                    .then_with(|| a.cmp_basis(b))
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Assignment, usize)> {
        self.counts.iter().map(|(a, &c)| (a, c))
    }
}

impl FromIterator<(Assignment, usize)> for Counts {
    fn from_iter<T: IntoIterator<Item = (Assignment, usize)>>(iter: T) -> Self {
        let mut counts = Self::new();
        for (outcome, count) in iter {
            counts.record(outcome, count);
        }
        counts
    }
}

/// A text histogram, one ranked outcome per line.
impl Display for Counts {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        const BAR: usize = 40;
        let ranked = self.ranked();
        let max = ranked.first().map_or(1, |(_, c)| (*c).max(1));
        for (outcome, count) in ranked {
            let width = count * BAR / max;
            writeln!(
                f,
                "{outcome} {count:>6} {:>6.3} {}",
                self.frequency(outcome),
                "#".repeat(width)
            )?;
        }
        Ok(())
    }
}
