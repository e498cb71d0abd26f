#![allow(clippy::cast_precision_loss)]
//! A dense state-vector simulator.
//!
//! The state of `w` qubits is a vector of `2^w` complex amplitudes, indexed so
//! that bit `q` of an index is the value of qubit `q`. Memory grows as
//! `16 · 2^w` bytes, which is what `max_qubits` guards against. No
//! configuration raises the limit past [`QUBIT_CEILING`].

use crate::error::BackendError;
use crate::quantum::backend::{Counts, ExecutionBackend};
use crate::quantum::circuit::{Circuit, Control, Gate};
use crate::sat::assignment::Assignment;
use crate::targets::BACKEND as LOG_BACKEND;
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::f64::consts::FRAC_1_SQRT_2;

/// Widest circuit any configuration accepts: 2^32 amplitudes, 64 GiB.
pub const QUBIT_CEILING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Widest circuit accepted, further capped at [`QUBIT_CEILING`].
    pub max_qubits: usize,
    /// Longest gate list accepted.
    pub max_gates: usize,
    /// Sampling seed. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            max_qubits: 22,
            max_gates: 2_000_000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateVectorSimulator {
    config: SimulatorConfig,
    rng: fastrand::Rng,
}

impl Default for StateVectorSimulator {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

fn controls_fire(controls: &[Control], index: usize) -> bool {
    controls.iter().all(|c| c.fires(index))
}

impl StateVectorSimulator {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = config.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
        Self { config, rng }
    }

    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(SimulatorConfig {
            seed: Some(seed),
            ..SimulatorConfig::default()
        })
    }

    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Effective width limit.
    #[must_use]
    pub fn max_qubits(&self) -> usize {
        self.config.max_qubits.min(QUBIT_CEILING)
    }

    fn check(&self, circuit: &Circuit) -> Result<(), BackendError> {
        if circuit.width() > self.max_qubits() {
            return Err(BackendError::RejectedCircuit(format!(
                "circuit needs {} qubits, simulator supports at most {}",
                circuit.width(),
                self.max_qubits()
            )));
        }
        if circuit.measured().len() > circuit.width() {
            return Err(BackendError::RejectedCircuit(format!(
                "circuit measures {} qubits but is only {} wide",
                circuit.measured().len(),
                circuit.width()
            )));
        }
        if circuit.len() > self.config.max_gates {
            return Err(BackendError::RejectedCircuit(format!(
                "circuit has {} gates, simulator accepts at most {}",
                circuit.len(),
                self.config.max_gates
            )));
        }
        circuit.validate()?;
        Ok(())
    }

    /// Final state vector, starting from |0…0⟩.
    ///
    /// # Errors
    ///
    /// [`BackendError::RejectedCircuit`] when the circuit is too large or
    /// structurally invalid.
    pub fn run(&self, circuit: &Circuit) -> Result<Vec<Complex64>, BackendError> {
        self.check(circuit)?;
        let mut state = vec![Complex64::new(0.0, 0.0); 1 << circuit.width()];
        state[0] = Complex64::new(1.0, 0.0);
        for gate in circuit.gates() {
            apply(&mut state, gate);
        }
        Ok(state)
    }

    /// Exact outcome distribution of the measured register; index bit `j` is
    /// the `j`-th measured qubit. Measures every qubit when none are listed.
    ///
    /// # Errors
    ///
    /// See [`StateVectorSimulator::run`].
    pub fn probabilities(&self, circuit: &Circuit) -> Result<Vec<f64>, BackendError> {
        let state = self.run(circuit)?;
        let measured: Vec<usize> = if circuit.measured().is_empty() {
            (0..circuit.width()).collect()
        } else {
            circuit.measured().to_vec()
        };

        let mut probabilities = vec![0.0; 1 << measured.len()];
        for (index, amplitude) in state.iter().enumerate() {
            let outcome = measured
                .iter()
                .enumerate()
                .fold(0, |acc, (bit, &q)| acc | (((index >> q) & 1) << bit));
            probabilities[outcome] += amplitude.norm_sqr();
        }
        Ok(probabilities)
    }
}

fn apply(state: &mut [Complex64], gate: &Gate) {
    let target = gate.target();
    let mask = 1_usize << target;
    match gate {
        Gate::H(_) => {
            for i in (0..state.len()).filter(|i| i & mask == 0) {
                let (a, b) = (state[i], state[i | mask]);
                state[i] = (a + b) * FRAC_1_SQRT_2;
                state[i | mask] = (a - b) * FRAC_1_SQRT_2;
            }
        }
        Gate::X(_) | Gate::Cx { .. } | Gate::Mcx { .. } => {
            let controls = gate.controls();
            for i in (0..state.len()).filter(|i| i & mask == 0) {
                if controls_fire(controls, i) {
                    state.swap(i, i | mask);
                }
            }
        }
        Gate::Z(_) | Gate::Mcz { .. } => {
            let controls = gate.controls();
            for i in (0..state.len()).filter(|i| i & mask != 0) {
                if controls_fire(controls, i) {
                    state[i] = -state[i];
                }
            }
        }
    }
}

impl ExecutionBackend for StateVectorSimulator {
    fn name(&self) -> &str {
        "statevector"
    }

    fn submit(&mut self, circuit: &Circuit, shots: usize) -> Result<Counts, BackendError> {
        let probabilities = self.probabilities(circuit)?;
        let bits = probabilities.len().trailing_zeros() as usize;

        let mut cumulative = Vec::with_capacity(probabilities.len());
        let mut total = 0.0;
        for p in &probabilities {
            total += p;
            cumulative.push(total);
        }

        // One draw per shot, in order, so the first `n` shots of a seeded run
        // do not depend on how many shots follow.
        let mut tally: FxHashMap<usize, usize> = FxHashMap::default();
        for _ in 0..shots {
            let x = self.rng.f64() * total;
            let outcome = cumulative
                .partition_point(|&c| c <= x)
                .min(probabilities.len() - 1);
            *tally.entry(outcome).or_insert(0) += 1;
        }

        log::debug!(
            target: LOG_BACKEND,
            "Sampled {shots} shots of a {}-qubit, {}-gate circuit: {} distinct outcomes",
            circuit.width(),
            circuit.len(),
            tally.len()
        );

        Ok(tally
            .into_iter()
            .map(|(index, count)| (Assignment::from_basis_index(index, bits), count))
            .collect())
    }
}

/// Result of pushing a single basis state through a classical circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Traced {
    pub index: usize,
    /// Whether the state picked up a −1 phase.
    pub negated: bool,
}

/// Propagates basis state `input` through a circuit made only of permutation
/// and phase gates. Returns `None` if the circuit contains `H`.
#[must_use]
pub fn basis_trace(circuit: &Circuit, input: usize) -> Option<Traced> {
    let mut index = input;
    let mut negated = false;
    for gate in circuit.gates() {
        let mask = 1_usize << gate.target();
        match gate {
            Gate::H(_) => return None,
            Gate::X(_) | Gate::Cx { .. } | Gate::Mcx { .. } => {
                if controls_fire(gate.controls(), index) {
                    index ^= mask;
                }
            }
            Gate::Z(_) | Gate::Mcz { .. } => {
                if index & mask != 0 && controls_fire(gate.controls(), index) {
                    negated = !negated;
                }
            }
        }
    }
    Some(Traced { index, negated })
}
