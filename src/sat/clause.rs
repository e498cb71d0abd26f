#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A disjunction of literals.

use crate::sat::assignment::Assignment;
use crate::sat::literal::{Literal, PackedLiteral, Variable};
use itertools::Itertools;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Inline capacity for clause literals. 3-SAT clauses never spill to the heap.
pub type LiteralStorage<L> = SmallVec<[L; 8]>;

/// A clause: the logical OR of its literals.
///
/// Literal order carries no meaning. Repeated occurrences of the same literal
/// are merged on construction, so every variable appears at most once per
/// polarity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Clause<L: Literal = PackedLiteral> {
    pub literals: LiteralStorage<L>,
}

impl<L: Literal> Clause<L> {
    /// Builds a clause from signed DIMACS literals.
    #[must_use]
    pub fn new(literals: &[i32]) -> Self {
        literals.iter().map(|&l| L::from_i32(l)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.literals.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable> + '_ {
        self.literals.iter().map(|l| l.variable())
    }

    /// Returns a variable that occurs in both polarities, if any.
    #[must_use]
    pub fn tautology(&self) -> Option<Variable> {
        let mut seen = FxHashSet::default();
        for lit in &self.literals {
            if seen.contains(&lit.negated()) {
                return Some(lit.variable());
            }
            seen.insert(*lit);
        }
        None
    }

    #[must_use]
    pub fn is_tautology(&self) -> bool {
        self.tautology().is_some()
    }

    /// True iff at least one literal evaluates to true.
    #[must_use]
    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        self.literals
            .iter()
            .any(|&lit| assignment.literal_value(lit))
    }

    /// Signed DIMACS form of the literals.
    #[must_use]
    pub fn to_dimacs(&self) -> Vec<i32> {
        self.literals.iter().map(|l| l.to_i32()).collect()
    }
}

impl<L: Literal> FromIterator<L> for Clause<L> {
    fn from_iter<T: IntoIterator<Item = L>>(iter: T) -> Self {
        Self {
            literals: iter.into_iter().unique().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sat::literal::StructLiteral;

    #[test]
    fn test_new() {
        let clause: Clause = Clause::new(&[1, 2, 3]);
        assert_eq!(clause.len(), 3);
    }

    #[test]
    fn test_iter() {
        let clause: Clause = Clause::new(&[1, -2, 3]);
        let mut iter = clause.iter();
        assert_eq!(iter.next(), Some(&PackedLiteral::from_i32(1)));
        assert_eq!(iter.next(), Some(&PackedLiteral::from_i32(-2)));
        assert_eq!(iter.next(), Some(&PackedLiteral::from_i32(3)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn test_duplicates_are_merged() {
        let clause: Clause<StructLiteral> = Clause::new(&[2, 2, -1, 2]);
        assert_eq!(clause.to_dimacs(), vec![2, -1]);
    }

    #[test]
    fn test_tautology() {
        let clause: Clause = Clause::new(&[1, -3, 3]);
        assert_eq!(clause.tautology(), Some(3));
        assert!(!Clause::<PackedLiteral>::new(&[1, 2]).is_tautology());
    }

    #[test]
    fn test_is_satisfied_by() {
        let clause: Clause = Clause::new(&[1, -2]);
        assert!(clause.is_satisfied_by(&Assignment::from_bools(&[true, true])));
        assert!(clause.is_satisfied_by(&Assignment::from_bools(&[false, false])));
        assert!(!clause.is_satisfied_by(&Assignment::from_bools(&[false, true])));
    }
}
