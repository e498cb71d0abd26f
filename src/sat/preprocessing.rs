//! Clause-level rewrites applied before a formula is validated.

use crate::sat::clause::Clause;
use crate::sat::literal::Literal;
use crate::targets::FORMULA as LOG_FORMULA;

pub trait Preprocessor<L: Literal> {
    fn preprocess(&self, clauses: &[Clause<L>]) -> Vec<Clause<L>>;
}

/// Drops clauses that contain a variable in both polarities.
///
/// Such a clause is satisfied by every assignment, so removing it leaves the
/// solution set unchanged. Each removal is logged at `warn`.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct TautologyElimination;

impl<L: Literal> Preprocessor<L> for TautologyElimination {
    fn preprocess(&self, clauses: &[Clause<L>]) -> Vec<Clause<L>> {
        clauses
            .iter()
            .enumerate()
            .filter(|(idx, clause)| match clause.tautology() {
                Some(var) => {
                    log::warn!(
                        target: LOG_FORMULA,
                        "Dropping clause {} ({:?}): contains both {var} and -{var}",
                        idx + 1,
                        clause.to_dimacs()
                    );
                    false
                }
                None => true,
            })
            .map(|(_, clause)| clause.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::PackedLiteral;

    #[test]
    fn test_tautology_elimination() {
        let clauses: Vec<Clause<PackedLiteral>> = vec![
            Clause::new(&[1, -1, 2]),
            Clause::new(&[2, 3]),
            Clause::new(&[-3, 3]),
        ];
        let kept = TautologyElimination.preprocess(&clauses);
        assert_eq!(kept, vec![Clause::new(&[2, 3])]);
    }

    #[test]
    fn test_tautology_elimination_keeps_order() {
        let clauses: Vec<Clause<PackedLiteral>> =
            vec![Clause::new(&[3]), Clause::new(&[1, -2]), Clause::new(&[2])];
        assert_eq!(TautologyElimination.preprocess(&clauses), clauses);
    }
}
