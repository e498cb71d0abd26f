//! The phase oracle of a whole formula.
//!
//! Each clause is computed into its own ancilla, a multi-controlled Z across
//! the m ancillas flips the phase of states where every clause holds, and the
//! clause circuits are then run again in reverse to return every ancilla to
//! |0⟩:
//!
//! ```text
//! compute(c1..cm)  MCZ(anc1..ancm)  compute(c1..cm)†
//! ```
//!
//! With ancillas at |0⟩ the net effect on the variable register is
//! `|x⟩ → (−1)^F(x) |x⟩`.

use crate::error::SolveError;
use crate::quantum::circuit::{Circuit, Control};
use crate::quantum::clause_oracle::compile_clause;
use crate::quantum::register::{AncillaArena, RegisterLayout};
use crate::sat::cnf::Cnf;
use crate::sat::literal::Literal;
use crate::targets::ORACLE as LOG_ORACLE;

/// A compiled formula oracle and the layout it was compiled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaOracle {
    layout: RegisterLayout,
    circuit: Circuit,
}

impl FormulaOracle {
    /// Compiles `cnf` with one ancilla per clause, placed after the variable
    /// register.
    ///
    /// # Errors
    ///
    /// [`SolveError::AncillaExhausted`] if the arena cannot supply one ancilla
    /// per clause.
    pub fn compile<L: Literal>(cnf: &Cnf<L>) -> Result<Self, SolveError> {
        let layout = RegisterLayout::new(cnf.variable_count(), cnf.clauses().len());
        let arena = layout.arena();
        let circuit = compose(cnf, &layout, &arena)?;
        debug_assert_eq!(arena.in_use(), 0);
        Ok(Self { layout, circuit })
    }

    #[must_use]
    pub const fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    #[must_use]
    pub const fn circuit(&self) -> &Circuit {
        &self.circuit
    }
}

/// Builds the oracle circuit for `cnf`, leasing clause ancillas from `arena`
/// for the duration of the build.
///
/// # Errors
///
/// [`SolveError::AncillaExhausted`] if `arena` has fewer free qubits than
/// `cnf` has clauses.
pub fn compose<L: Literal>(
    cnf: &Cnf<L>,
    layout: &RegisterLayout,
    arena: &AncillaArena,
) -> Result<Circuit, SolveError> {
    let ancillas = arena.checkout(cnf.clauses().len())?;

    let mut compute = Circuit::new(layout.width());
    for (clause, &ancilla) in cnf.iter().zip(ancillas.iter()) {
        compute.append(&compile_clause(clause, layout, ancilla));
    }

    let mut circuit = compute.clone();
    if let Some((&target, controls)) = ancillas.split_last() {
        circuit.mcz(controls.iter().map(|&q| Control::on(q)), target);
    }
    circuit.append(&compute.inverse());

    log::debug!(
        target: LOG_ORACLE,
        "Oracle over {} variables and {} clause ancillas: {} gates, depth {}",
        layout.num_vars(),
        ancillas.len(),
        circuit.len(),
        circuit.depth()
    );

    Ok(circuit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantum::simulator::basis_trace;
    use crate::sat::assignment::Assignment;

    fn oracle(num_vars: usize, clauses: &[&[i32]]) -> (Cnf, FormulaOracle) {
        let cnf: Cnf = Cnf::new(num_vars, clauses.iter().copied()).unwrap();
        let oracle = FormulaOracle::compile(&cnf).unwrap();
        (cnf, oracle)
    }

    /// Checks that every basis state of the variable register (ancillas at 0)
    /// maps to itself, with a sign flip exactly on satisfying assignments.
    fn check_marks_solutions(cnf: &Cnf, oracle: &FormulaOracle) {
        let n = cnf.variable_count();
        for input in 0..1_usize << n {
            let traced = basis_trace(oracle.circuit(), input).unwrap();
            assert_eq!(traced.index, input, "ancillas or variables not restored");
            assert_eq!(
                traced.negated,
                cnf.is_satisfied_by(&Assignment::from_basis_index(input, n)),
                "wrong phase for input {input:b}"
            );
        }
    }

    #[test]
    fn test_single_clause_oracle() {
        let (cnf, oracle) = oracle(3, &[&[1, 2, 3]]);
        check_marks_solutions(&cnf, &oracle);
        assert_eq!(oracle.layout().width(), 4);
    }

    #[test]
    fn test_unique_solution_oracle() {
        let (cnf, oracle) = oracle(2, &[&[1, 2], &[-1, 2], &[1, -2]]);
        check_marks_solutions(&cnf, &oracle);
    }

    #[test]
    fn test_unsatisfiable_oracle_is_identity() {
        let (cnf, oracle) = oracle(1, &[&[1], &[-1]]);
        for input in 0..2 {
            let traced = basis_trace(oracle.circuit(), input).unwrap();
            assert_eq!(traced.index, input);
            assert!(!traced.negated);
        }
        check_marks_solutions(&cnf, &oracle);
    }

    #[test]
    fn test_mixed_width_clauses() {
        let (cnf, oracle) = oracle(4, &[&[1, -2, 3], &[-4], &[2, 4, -1, 3], &[-3, -1]]);
        check_marks_solutions(&cnf, &oracle);
    }

    #[test]
    fn test_applied_twice_is_identity() {
        let (_, oracle) = oracle(3, &[&[1, -2], &[2, 3], &[-1, -3]]);
        let mut twice = oracle.circuit().clone();
        twice.append(oracle.circuit());
        let width = oracle.layout().width();
        // Every basis state of the full register, ancillas included.
        for input in 0..1_usize << width {
            let traced = basis_trace(&twice, input).unwrap();
            assert_eq!(traced.index, input);
            assert!(!traced.negated);
        }
    }

    #[test]
    fn test_arena_too_small() {
        let cnf: Cnf = Cnf::new(2, [vec![1], vec![2], vec![-1, -2]]).unwrap();
        let layout = RegisterLayout::new(2, 2);
        let err = compose(&cnf, &layout, &layout.arena()).unwrap_err();
        assert!(matches!(
            err,
            SolveError::AncillaExhausted {
                requested: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_ancillas_returned_after_compose() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2], vec![-2]]).unwrap();
        let layout = RegisterLayout::new(2, 2);
        let arena = layout.arena();
        compose(&cnf, &layout, &arena).unwrap();
        assert_eq!(arena.available(), 2);
    }
}
