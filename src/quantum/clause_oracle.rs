//! Compiles one clause into a reversible circuit that XORs the clause's truth
//! value into a dedicated ancilla.
//!
//! The OR is computed through De Morgan: `l1 ∨ … ∨ lk = ¬(¬l1 ∧ … ∧ ¬lk)`.
//! Qubits of negated literals are flipped so every qubit holds its literal's
//! value, an anti-controlled X fires when all literals are false, the ancilla
//! is flipped once more, and the literal flips are undone:
//!
//! ```text
//! X(negated)  MCX(negctrl lits → anc)  X(anc)  X(negated)
//! ```
//!
//! A single-literal clause needs none of this; it is one `Cx` whose control
//! polarity matches the literal.

use crate::quantum::circuit::{Circuit, Control, Qubit};
use crate::quantum::register::RegisterLayout;
use crate::sat::clause::Clause;
use crate::sat::literal::Literal;
use itertools::Itertools;

/// `ancilla ← ancilla ⊕ (l1 ∨ … ∨ lk)`.
///
/// The variable register is left exactly as it was found; only `ancilla`
/// changes. The circuit is its own inverse.
#[must_use]
pub fn compile_clause<L: Literal>(
    clause: &Clause<L>,
    layout: &RegisterLayout,
    ancilla: Qubit,
) -> Circuit {
    let mut circuit = Circuit::new(layout.width());

    if let [lit] = clause.literals.as_slice() {
        let qubit = layout.variable_qubit(lit.variable());
        circuit.cx(
            Control {
                qubit,
                on: lit.polarity(),
            },
            ancilla,
        );
        return circuit;
    }

    let negated = clause
        .iter()
        .filter(|lit| lit.is_negated())
        .map(|lit| layout.variable_qubit(lit.variable()))
        .collect_vec();

    circuit.x_all(&negated);
    circuit.mcx(
        clause
            .iter()
            .map(|lit| Control::off(layout.variable_qubit(lit.variable()))),
        ancilla,
    );
    circuit.x(ancilla);
    circuit.x_all(&negated);
    circuit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::simulator::basis_trace;
    use crate::sat::assignment::Assignment;
    use crate::sat::literal::PackedLiteral;

    /// Runs every assignment of `num_vars` variables through the compiled
    /// clause with the ancilla at 0 and checks the ancilla against classical
    /// evaluation.
    fn check_exhaustively(dimacs: &[i32], num_vars: usize) {
        let clause: Clause<PackedLiteral> = Clause::new(dimacs);
        let layout = RegisterLayout::new(num_vars, 1);
        let ancilla = layout.ancillas().start;
        let circuit = compile_clause(&clause, &layout, ancilla);
        assert!(circuit.validate().is_ok());

        for input in 0..1_usize << num_vars {
            let assignment = Assignment::from_basis_index(input, num_vars);
            let expected = clause.is_satisfied_by(&assignment);

            let traced = basis_trace(&circuit, input).unwrap();
            assert!(!traced.negated);
            assert_eq!(
                traced.index & ((1 << num_vars) - 1),
                input,
                "variable register changed for {assignment} on {dimacs:?}"
            );
            assert_eq!(
                (traced.index >> ancilla) & 1 == 1,
                expected,
                "wrong ancilla for {assignment} on {dimacs:?}"
            );

            // With the ancilla starting at 1 the result is complemented.
            let flipped = basis_trace(&circuit, input | (1 << ancilla)).unwrap();
            assert_eq!((flipped.index >> ancilla) & 1 == 1, !expected);
        }
    }

    #[test]
    fn test_single_literal_clauses() {
        check_exhaustively(&[1], 1);
        check_exhaustively(&[-1], 1);
        check_exhaustively(&[-2], 3);
    }

    #[test]
    fn test_single_literal_is_one_gate() {
        let clause: Clause<PackedLiteral> = Clause::new(&[-2]);
        let layout = RegisterLayout::new(2, 1);
        let circuit = compile_clause(&clause, &layout, 2);
        assert_eq!(circuit.len(), 1);
        assert_eq!(circuit.gates()[0].name(), "cx");
    }

    #[test]
    fn test_two_literal_clauses() {
        for clause in [[1, 2], [-1, 2], [1, -2], [-1, -2]] {
            check_exhaustively(&clause, 2);
        }
    }

    #[test]
    fn test_three_literal_clauses() {
        for a in [1, -1] {
            for b in [2, -2] {
                for c in [3, -3] {
                    check_exhaustively(&[a, b, c], 3);
                }
            }
        }
    }

    #[test]
    fn test_clause_over_sparse_variables() {
        check_exhaustively(&[-4, 1], 4);
        check_exhaustively(&[2, -5, 3, 1], 5);
    }

    #[test]
    fn test_self_inverse() {
        let clause: Clause<PackedLiteral> = Clause::new(&[1, -2, 3]);
        let layout = RegisterLayout::new(3, 1);
        let mut twice = compile_clause(&clause, &layout, 3);
        twice.append(&compile_clause(&clause, &layout, 3));
        for input in 0..16 {
            assert_eq!(basis_trace(&twice, input).unwrap().index, input);
        }
    }
}
