//! Inversion about the mean over the variable register.
//!
//! `D = H⊗ⁿ · X⊗ⁿ · MCZ · X⊗ⁿ · H⊗ⁿ`. The X-sandwiched MCZ flips the phase of
//! |0…0⟩ only, so `D = −(2|s⟩⟨s| − I)`; the overall sign is a global phase
//! and does not change any measurement.

use crate::quantum::circuit::{Circuit, Control, Qubit};
use crate::quantum::register::RegisterLayout;

/// Diffusion over `qubits`, in a circuit of `width` qubits.
#[must_use]
pub fn diffusion(qubits: &[Qubit], width: usize) -> Circuit {
    let mut circuit = Circuit::new(width);
    circuit.h_all(qubits).x_all(qubits);
    if let Some((&target, controls)) = qubits.split_last() {
        circuit.mcz(controls.iter().map(|&q| Control::on(q)), target);
    }
    circuit.x_all(qubits).h_all(qubits);
    circuit
}

/// Diffusion over the variable register of `layout`.
#[must_use]
pub fn build_diffusion(layout: &RegisterLayout) -> Circuit {
    let variables: Vec<Qubit> = layout.variables().collect();
    diffusion(&variables, layout.width())
}

/// Uniform superposition over the variable register of `layout`.
#[must_use]
pub fn uniform_superposition(layout: &RegisterLayout) -> Circuit {
    let variables: Vec<Qubit> = layout.variables().collect();
    let mut circuit = Circuit::new(layout.width());
    circuit.h_all(&variables);
    circuit
}
