#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The in-memory formula model.
//!
//! A [`Cnf`] is a validated conjunction of clauses over variables `1..=N`,
//! where N is the declared variable count. Construction rejects any clause that
//! is empty, references a variable outside `1..=N`, or contains a variable in
//! both polarities; see [`crate::sat::preprocessing::TautologyElimination`] for
//! the lenient alternative. Clause order is fixed at construction and is the
//! order in which clause ancillas are assigned.

use crate::error::FormulaError;
use crate::sat::assignment::Assignment;
use crate::sat::clause::Clause;
use crate::sat::literal::{Literal, PackedLiteral};
use crate::targets::FORMULA as LOG_FORMULA;
use std::fmt::Display;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cnf<L: Literal = PackedLiteral> {
    num_vars: usize,
    clauses: Vec<Clause<L>>,
}

impl<L: Literal> Cnf<L> {
    /// Builds and validates a formula from signed DIMACS clauses.
    ///
    /// # Errors
    ///
    /// Returns a [`FormulaError`] for a formula with no variables or no
    /// clauses, an empty clause, a literal `0`, a variable outside `1..=N`, or
    /// a tautological clause.
    pub fn new<I, C>(num_vars: usize, clauses: I) -> Result<Self, FormulaError>
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[i32]>,
    {
        let mut parsed = Vec::new();
        for (idx, raw) in clauses.into_iter().enumerate() {
            let raw = raw.as_ref();
            if raw.contains(&0) {
                return Err(FormulaError::ZeroLiteral { clause: idx + 1 });
            }
            parsed.push(Clause::new(raw));
        }
        Self::from_clauses(num_vars, parsed)
    }

    /// Validates already-built clauses.
    ///
    /// # Errors
    ///
    /// See [`Cnf::new`].
    pub fn from_clauses(num_vars: usize, clauses: Vec<Clause<L>>) -> Result<Self, FormulaError> {
        if num_vars == 0 {
            return Err(FormulaError::NoVariables);
        }
        if clauses.is_empty() {
            return Err(FormulaError::NoClauses);
        }

        for (idx, clause) in clauses.iter().enumerate() {
            let clause_no = idx + 1;
            if clause.is_empty() {
                return Err(FormulaError::EmptyClause { clause: clause_no });
            }
            if let Some(variable) = clause
                .variables()
                .find(|&v| v == 0 || v as usize > num_vars)
            {
                return Err(FormulaError::VariableOutOfRange {
                    clause: clause_no,
                    variable,
                    num_vars,
                });
            }
            if let Some(variable) = clause.tautology() {
                return Err(FormulaError::TautologicalClause {
                    clause: clause_no,
                    variable,
                });
            }
        }

        log::debug!(
            target: LOG_FORMULA,
            "Formula with {num_vars} variables and {} clauses",
            clauses.len()
        );

        Ok(Self { num_vars, clauses })
    }

    #[must_use]
    pub const fn variable_count(&self) -> usize {
        self.num_vars
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause<L>] {
        &self.clauses
    }

    pub fn iter(&self) -> impl Iterator<Item = &Clause<L>> {
        self.clauses.iter()
    }

    /// Total literal occurrences across all clauses.
    #[must_use]
    pub fn literal_count(&self) -> usize {
        self.clauses.iter().map(Clause::len).sum()
    }

    /// Largest clause width, i.e. the k of k-SAT.
    #[must_use]
    pub fn max_clause_len(&self) -> usize {
        self.clauses.iter().map(Clause::len).max().unwrap_or(0)
    }

    /// AND over clauses of the OR over each clause's literals.
    /// `false` for an assignment whose length is not N.
    #[must_use]
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        assignment.num_vars() == self.num_vars
            && self.clauses.iter().all(|c| c.is_satisfied_by(assignment))
    }

    /// Verifies a signed DIMACS model, e.g. `[1, -2, 3]`.
    ///
    /// A model mentioning a variable outside `1..=N`, or the literal 0, is
    /// rejected.
    #[must_use]
    pub fn verify(&self, solutions: &[i32]) -> bool {
        let mut assignment = Assignment::new(self.num_vars);
        for &lit in solutions {
            if !assignment.set(lit.unsigned_abs(), lit > 0) {
                return false;
            }
        }
        self.is_satisfied_by(&assignment)
    }

    /// Enumerates every assignment and counts the satisfying ones.
    ///
    /// Exponential in N; meant for small formulas and for cross-checking the
    /// quantum search.
    #[must_use]
    pub fn count_solutions(&self) -> usize {
        let space = u32::try_from(self.num_vars)
            .ok()
            .and_then(|n| 1_usize.checked_shl(n))
            .unwrap_or(usize::MAX);
        (0..space)
            .filter(|&idx| self.is_satisfied_by(&Assignment::from_basis_index(idx, self.num_vars)))
            .count()
    }
}

/// DIMACS rendering, including the `p cnf` header.
impl<L: Literal> Display for Cnf<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "p cnf {} {}", self.num_vars, self.clauses.len())?;
        for clause in &self.clauses {
            for lit in clause.iter() {
                write!(f, "{} ", lit.to_i32())?;
            }
            writeln!(f, "0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::StructLiteral;

    fn all_assignments(n: usize) -> impl Iterator<Item = Assignment> {
        (0..1_usize << n).map(move |i| Assignment::from_basis_index(i, n))
    }

    #[test]
    fn test_accessors() {
        let cnf: Cnf = Cnf::new(3, [vec![1, 2, 3], vec![-1, 2]]).unwrap();
        assert_eq!(cnf.variable_count(), 3);
        assert_eq!(cnf.clauses().len(), 2);
        assert_eq!(cnf.literal_count(), 5);
        assert_eq!(cnf.max_clause_len(), 3);
    }

    #[test]
    fn test_single_clause_rejects_only_all_false() {
        let cnf: Cnf = Cnf::new(3, [[1, 2, 3]]).unwrap();
        for a in all_assignments(3) {
            assert_eq!(cnf.is_satisfied_by(&a), a.basis_index() != Some(0));
        }
        assert_eq!(cnf.count_solutions(), 7);
    }

    #[test]
    fn test_unique_solution() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2], vec![-1, 2], vec![1, -2]]).unwrap();
        let sat: Vec<_> = all_assignments(2)
            .filter(|a| cnf.is_satisfied_by(a))
            .collect();
        assert_eq!(sat, vec![Assignment::from_bools(&[true, true])]);
    }

    #[test]
    fn test_is_satisfied_by_is_pure() {
        let cnf: Cnf<StructLiteral> = Cnf::new(3, [vec![1, -2], vec![2, 3], vec![-1, -3]]).unwrap();
        for a in all_assignments(3) {
            let first = cnf.is_satisfied_by(&a);
            let second = cnf.is_satisfied_by(&a);
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_verify_dimacs_model() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2], vec![-1, 2], vec![1, -2]]).unwrap();
        assert!(cnf.verify(&[1, 2]));
        assert!(!cnf.verify(&[1, -2]));
    }

    #[test]
    fn test_verify_rejects_foreign_variables() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2]]).unwrap();
        assert!(!cnf.verify(&[1, 5]));
        assert!(!cnf.verify(&[1, 0]));
        assert!(cnf.verify(&[-1, 2]));
    }

    #[test]
    fn test_wrong_length_never_satisfies() {
        let cnf: Cnf = Cnf::new(2, [vec![1, 2]]).unwrap();
        assert!(!cnf.is_satisfied_by(&Assignment::from_bools(&[true])));
        assert!(!cnf.is_satisfied_by(&Assignment::from_bools(&[true, true, true])));
        assert!(cnf.is_satisfied_by(&Assignment::from_bools(&[true, true])));
    }

    #[test]
    fn test_rejects_out_of_range_variable() {
        let err = Cnf::<PackedLiteral>::new(2, [vec![1, 3]]).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::VariableOutOfRange {
                clause: 1,
                variable: 3,
                num_vars: 2
            }
        ));
    }

    #[test]
    fn test_rejects_empty_clause() {
        let clauses: Vec<Vec<i32>> = vec![vec![1], vec![]];
        let err = Cnf::<PackedLiteral>::new(1, clauses).unwrap_err();
        assert!(matches!(err, FormulaError::EmptyClause { clause: 2 }));
    }

    #[test]
    fn test_rejects_zero_literal() {
        let err = Cnf::<PackedLiteral>::new(2, [vec![1, 0, 2]]).unwrap_err();
        assert!(matches!(err, FormulaError::ZeroLiteral { clause: 1 }));
    }

    #[test]
    fn test_rejects_tautology() {
        let err = Cnf::<PackedLiteral>::new(2, [vec![2], vec![1, -1]]).unwrap_err();
        assert!(matches!(
            err,
            FormulaError::TautologicalClause {
                clause: 2,
                variable: 1
            }
        ));
    }

    #[test]
    fn test_rejects_degenerate_formulas() {
        let none: Vec<Vec<i32>> = Vec::new();
        assert!(matches!(
            Cnf::<PackedLiteral>::new(2, none),
            Err(FormulaError::NoClauses)
        ));
        assert!(matches!(
            Cnf::<PackedLiteral>::new(0, [vec![1]]),
            Err(FormulaError::NoVariables)
        ));
    }

    #[test]
    fn test_display_is_dimacs() {
        let cnf: Cnf = Cnf::new(2, [vec![1, -2], vec![2]]).unwrap();
        assert_eq!(cnf.to_string(), "p cnf 2 2\n1 -2 0\n2 0\n");
    }
}
