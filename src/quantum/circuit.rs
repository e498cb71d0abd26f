#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Circuits as plain data.
//!
//! A [`Circuit`] is an ordered list of [`Gate`] records over a fixed number of
//! qubits, plus the list of qubits to measure. Nothing here talks to a
//! backend; oracle and diffusion builders are pure functions that return
//! circuit fragments, and fragments are composed with [`Circuit::append`].
//!
//! Every gate in the set is self-inverse, so [`Circuit::inverse`] is the
//! reversed gate list.

use crate::error::CircuitError;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

pub type Qubit = usize;

/// A control line. `on == true` fires on |1⟩, `on == false` (an
/// anti-control) fires on |0⟩.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Control {
    pub qubit: Qubit,
    pub on: bool,
}

impl Control {
    #[must_use]
    pub const fn on(qubit: Qubit) -> Self {
        Self { qubit, on: true }
    }

    #[must_use]
    pub const fn off(qubit: Qubit) -> Self {
        Self { qubit, on: false }
    }

    /// Whether the control fires for a computational-basis index.
    #[must_use]
    pub const fn fires(self, index: usize) -> bool {
        ((index >> self.qubit) & 1 == 1) == self.on
    }
}

pub type Controls = SmallVec<[Control; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Gate {
    H(Qubit),
    X(Qubit),
    Z(Qubit),
    Cx { control: Control, target: Qubit },
    Mcx { controls: Controls, target: Qubit },
    /// Phase −1 on basis states where every control fires and `target` is |1⟩.
    Mcz { controls: Controls, target: Qubit },
}

impl Gate {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::H(_) => "h",
            Self::X(_) => "x",
            Self::Z(_) => "z",
            Self::Cx { .. } => "cx",
            Self::Mcx { .. } => "mcx",
            Self::Mcz { .. } => "mcz",
        }
    }

    #[must_use]
    pub const fn target(&self) -> Qubit {
        match self {
            Self::H(q) | Self::X(q) | Self::Z(q) => *q,
            Self::Cx { target, .. } | Self::Mcx { target, .. } | Self::Mcz { target, .. } => {
                *target
            }
        }
    }

    #[must_use]
    pub fn controls(&self) -> &[Control] {
        match self {
            Self::H(_) | Self::X(_) | Self::Z(_) => &[],
            Self::Cx { control, .. } => std::slice::from_ref(control),
            Self::Mcx { controls, .. } | Self::Mcz { controls, .. } => controls,
        }
    }

    /// Every qubit the gate touches, controls first.
    #[must_use]
    pub fn qubits(&self) -> SmallVec<[Qubit; 8]> {
        self.controls()
            .iter()
            .map(|c| c.qubit)
            .chain(std::iter::once(self.target()))
            .collect()
    }

    /// Maps basis states to basis states (possibly with a sign); only `H`
    /// creates superposition.
    #[must_use]
    pub const fn is_classical(&self) -> bool {
        !matches!(self, Self::H(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Circuit {
    width: usize,
    gates: Vec<Gate>,
    measured: Vec<Qubit>,
}

impl Circuit {
    #[must_use]
    pub const fn new(width: usize) -> Self {
        Self {
            width,
            gates: Vec::new(),
            measured: Vec::new(),
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Qubits read out at the end, in classical-bit order.
    #[must_use]
    pub fn measured(&self) -> &[Qubit] {
        &self.measured
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub fn push(&mut self, gate: Gate) -> &mut Self {
        self.gates.push(gate);
        self
    }

    pub fn h(&mut self, q: Qubit) -> &mut Self {
        self.push(Gate::H(q))
    }

    pub fn x(&mut self, q: Qubit) -> &mut Self {
        self.push(Gate::X(q))
    }

    pub fn z(&mut self, q: Qubit) -> &mut Self {
        self.push(Gate::Z(q))
    }

    pub fn cx(&mut self, control: Control, target: Qubit) -> &mut Self {
        self.push(Gate::Cx { control, target })
    }

    /// Multi-controlled X. Degenerates to `X` with no controls and to `Cx`
    /// with one.
    pub fn mcx(&mut self, controls: impl IntoIterator<Item = Control>, target: Qubit) -> &mut Self {
        let controls: Controls = controls.into_iter().collect();
        match controls.as_slice() {
            [] => self.x(target),
            [control] => self.cx(*control, target),
            _ => self.push(Gate::Mcx { controls, target }),
        }
    }

    /// Multi-controlled Z. Degenerates to `Z` with no controls.
    pub fn mcz(&mut self, controls: impl IntoIterator<Item = Control>, target: Qubit) -> &mut Self {
        let controls: Controls = controls.into_iter().collect();
        if controls.is_empty() {
            self.z(target)
        } else {
            self.push(Gate::Mcz { controls, target })
        }
    }

    /// Appends `H` on every listed qubit.
    pub fn h_all(&mut self, qubits: &[Qubit]) -> &mut Self {
        for &q in qubits {
            self.h(q);
        }
        self
    }

    /// Appends `X` on every listed qubit.
    pub fn x_all(&mut self, qubits: &[Qubit]) -> &mut Self {
        for &q in qubits {
            self.x(q);
        }
        self
    }

    pub fn measure(&mut self, qubits: &[Qubit]) -> &mut Self {
        self.measured.extend_from_slice(qubits);
        self
    }

    /// Appends all gates of `other`. The width grows to fit; measurements of
    /// `other` are not carried over.
    pub fn append(&mut self, other: &Self) -> &mut Self {
        self.width = self.width.max(other.width);
        self.gates.extend_from_slice(&other.gates);
        self
    }

    /// The adjoint: the gate list reversed.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            width: self.width,
            gates: self.gates.iter().rev().cloned().collect(),
            measured: Vec::new(),
        }
    }

    /// `count` back-to-back copies of the gate list.
    #[must_use]
    pub fn repeat(&self, count: usize) -> Self {
        let mut out = Self::new(self.width);
        out.gates.reserve(self.gates.len() * count);
        for _ in 0..count {
            out.gates.extend_from_slice(&self.gates);
        }
        out
    }

    /// Greedy layering: a gate starts one layer after the latest gate on any
    /// of its qubits.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut level = vec![0_usize; self.width];
        let mut depth = 0;
        for gate in &self.gates {
            let qubits = gate.qubits();
            let layer = qubits
                .iter()
                .filter_map(|&q| level.get(q))
                .max()
                .copied()
                .unwrap_or(0)
                + 1;
            for &q in &qubits {
                if let Some(l) = level.get_mut(q) {
                    *l = layer;
                }
            }
            depth = depth.max(layer);
        }
        depth
    }

    #[must_use]
    pub fn gate_counts(&self) -> FxHashMap<&'static str, usize> {
        let mut counts = FxHashMap::default();
        for gate in &self.gates {
            *counts.entry(gate.name()).or_insert(0) += 1;
        }
        counts
    }

    #[must_use]
    pub fn is_classical(&self) -> bool {
        self.gates.iter().all(Gate::is_classical)
    }

    /// Checks qubit bounds and control/target distinctness.
    ///
    /// # Errors
    ///
    /// The first [`CircuitError`] found, scanning gates in order and then the
    /// measured register.
    pub fn validate(&self) -> Result<(), CircuitError> {
        for (gate_idx, gate) in self.gates.iter().enumerate() {
            let target = gate.target();
            let mut seen = FxHashSet::default();
            for qubit in gate.qubits() {
                if qubit >= self.width {
                    return Err(CircuitError::QubitOutOfRange {
                        gate: gate_idx,
                        qubit,
                        width: self.width,
                    });
                }
            }
            for control in gate.controls() {
                if control.qubit == target {
                    return Err(CircuitError::ControlIsTarget {
                        gate: gate_idx,
                        qubit: target,
                    });
                }
                if !seen.insert(control.qubit) {
                    return Err(CircuitError::DuplicateControl {
                        gate: gate_idx,
                        qubit: control.qubit,
                    });
                }
            }
        }

        if let Some(&qubit) = self.measured.iter().find(|&&q| q >= self.width) {
            return Err(CircuitError::QubitOutOfRange {
                gate: self.gates.len(),
                qubit,
                width: self.width,
            });
        }
        Ok(())
    }
}

/// Writes the control modifiers of a gate, grouping runs of equal polarity:
/// `ctrl(2) @ negctrl @ `.
fn write_modifiers(f: &mut Formatter<'_>, controls: &[Control]) -> std::fmt::Result {
    let mut rest = controls;
    while let Some(first) = rest.first() {
        let run = rest.iter().take_while(|c| c.on == first.on).count();
        let keyword = if first.on { "ctrl" } else { "negctrl" };
        if run == 1 {
            write!(f, "{keyword} @ ")?;
        } else {
            write!(f, "{keyword}({run}) @ ")?;
        }
        rest = &rest[run..];
    }
    Ok(())
}

/// Renders as OpenQASM 3.
impl Display for Circuit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "OPENQASM 3.0;")?;
        writeln!(f, "include \"stdgates.inc\";")?;
        writeln!(f, "qubit[{}] q;", self.width)?;
        if !self.measured.is_empty() {
            writeln!(f, "bit[{}] c;", self.measured.len())?;
        }

        for gate in &self.gates {
            match gate {
                Gate::H(q) => writeln!(f, "h q[{q}];")?,
                Gate::X(q) => writeln!(f, "x q[{q}];")?,
                Gate::Z(q) => writeln!(f, "z q[{q}];")?,
                Gate::Cx { control, target } if control.on => {
                    writeln!(f, "cx q[{}], q[{target}];", control.qubit)?;
                }
                Gate::Cx { .. } | Gate::Mcx { .. } | Gate::Mcz { .. } => {
                    write_modifiers(f, gate.controls())?;
                    let base = if matches!(gate, Gate::Mcz { .. }) { "z" } else { "x" };
                    let operands = gate
                        .qubits()
                        .iter()
                        .map(|q| format!("q[{q}]"))
                        .collect::<Vec<_>>()
                        .join(", ");
                    writeln!(f, "{base} {operands};")?;
                }
            }
        }

        for (bit, q) in self.measured.iter().enumerate() {
            writeln!(f, "c[{bit}] = measure q[{q}];")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcx_degenerates() {
        let mut c = Circuit::new(3);
        c.mcx([], 0);
        c.mcx([Control::off(1)], 0);
        c.mcx([Control::on(1), Control::on(2)], 0);
        c.mcz([], 2);

        assert_eq!(c.gates()[0], Gate::X(0));
        assert_eq!(
            c.gates()[1],
            Gate::Cx {
                control: Control::off(1),
                target: 0
            }
        );
        assert_eq!(c.gates()[2].name(), "mcx");
        assert_eq!(c.gates()[3], Gate::Z(2));
    }

    #[test]
    fn test_inverse_reverses() {
        let mut c = Circuit::new(2);
        c.h(0).x(1).cx(Control::on(0), 1);
        let inv = c.inverse();
        assert_eq!(inv.gates()[0].name(), "cx");
        assert_eq!(inv.gates()[2], Gate::H(0));
        assert_eq!(inv.inverse().gates(), c.gates());
    }

    #[test]
    fn test_repeat_and_append() {
        let mut c = Circuit::new(1);
        c.x(0);
        let r = c.repeat(3);
        assert_eq!(r.len(), 3);

        let mut wide = Circuit::new(4);
        wide.z(3);
        c.append(&wide);
        assert_eq!(c.width(), 4);
        assert_eq!(c.len(), 2);
        assert!(c.repeat(0).is_empty());
    }

    #[test]
    fn test_depth() {
        let mut c = Circuit::new(3);
        c.h(0).h(1).h(2);
        assert_eq!(c.depth(), 1);
        c.mcx([Control::on(0), Control::on(1)], 2);
        assert_eq!(c.depth(), 2);
        c.x(0);
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn test_gate_counts() {
        let mut c = Circuit::new(2);
        c.h(0).h(1).x(0);
        let counts = c.gate_counts();
        assert_eq!(counts["h"], 2);
        assert_eq!(counts["x"], 1);
        assert!(!c.is_classical());
    }

    #[test]
    fn test_validate() {
        let mut c = Circuit::new(2);
        c.x(1);
        assert!(c.validate().is_ok());

        c.x(2);
        assert_eq!(
            c.validate(),
            Err(CircuitError::QubitOutOfRange {
                gate: 1,
                qubit: 2,
                width: 2
            })
        );

        let mut c = Circuit::new(3);
        c.push(Gate::Mcx {
            controls: [Control::on(0), Control::off(0)].into_iter().collect(),
            target: 2,
        });
        assert_eq!(
            c.validate(),
            Err(CircuitError::DuplicateControl { gate: 0, qubit: 0 })
        );

        let mut c = Circuit::new(2);
        c.cx(Control::on(1), 1);
        assert_eq!(
            c.validate(),
            Err(CircuitError::ControlIsTarget { gate: 0, qubit: 1 })
        );
    }

    #[test]
    fn test_qasm_output() {
        let mut c = Circuit::new(4);
        c.h(0)
            .cx(Control::on(0), 1)
            .cx(Control::off(0), 1)
            .mcx([Control::off(0), Control::off(1), Control::on(2)], 3)
            .mcz([Control::on(0)], 3)
            .measure(&[0, 1]);

        let text = c.to_string();
        assert!(text.starts_with("OPENQASM 3.0;\n"));
        assert!(text.contains("qubit[4] q;"));
        assert!(text.contains("bit[2] c;"));
        assert!(text.contains("cx q[0], q[1];"));
        assert!(text.contains("negctrl @ x q[0], q[1];"));
        assert!(text.contains("negctrl(2) @ ctrl @ x q[0], q[1], q[2], q[3];"));
        assert!(text.contains("ctrl @ z q[0], q[3];"));
        assert!(text.contains("c[1] = measure q[1];"));
    }

    #[test]
    fn test_control_fires() {
        assert!(Control::on(1).fires(0b10));
        assert!(!Control::on(1).fires(0b01));
        assert!(Control::off(0).fires(0b10));
    }
}
