#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Complete variable assignments.
//!
//! An [`Assignment`] is a bit-vector of length N where bit `i` holds the value
//! of variable `i + 1`. Measurement outcomes from the execution backend are
//! decoded into assignments and then verified classically against the formula.

use crate::sat::literal::{Literal, Variable};
use bit_vec::BitVec;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Assignment(BitVec);

/// Satisfying assignment in signed DIMACS form, e.g. `[1, -2, 3]`.
pub type Solutions = Vec<i32>;

impl Assignment {
    /// All variables false.
    #[must_use]
    pub fn new(num_vars: usize) -> Self {
        Self(BitVec::from_elem(num_vars, false))
    }

    #[must_use]
    pub fn from_bools(values: &[bool]) -> Self {
        Self(values.iter().copied().collect())
    }

    /// Decodes a computational-basis index: bit `i` of `index` is variable
    /// `i + 1`.
    #[must_use]
    pub fn from_basis_index(index: usize, num_vars: usize) -> Self {
        Self((0..num_vars).map(|i| (index >> i) & 1 == 1).collect())
    }

    /// Inverse of [`Assignment::from_basis_index`], or `None` when a set bit
    /// does not fit in a `usize`.
    #[must_use]
    pub fn basis_index(&self) -> Option<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, b)| *b)
            .try_fold(0_usize, |acc, (i, _)| {
                let bit = u32::try_from(i).ok().and_then(|i| 1_usize.checked_shl(i))?;
                Some(acc | bit)
            })
    }

    /// Orders assignments as unsigned integers with variable `N` as the most
    /// significant bit, without materializing the index. Missing bits read as
    /// false, so assignments of different lengths still compare.
    #[must_use]
    pub fn cmp_basis(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .rev()
            .map(|i| {
                let a = self.0.get(i).unwrap_or(false);
                let b = other.0.get(i).unwrap_or(false);
                a.cmp(&b)
            })
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.0.len()
    }

    /// Value of a 1-based variable. Variables outside the assignment read as false.
    #[must_use]
    pub fn value(&self, var: Variable) -> bool {
        var.checked_sub(1)
            .and_then(|i| self.0.get(i as usize))
            .unwrap_or(false)
    }

    /// Sets a 1-based variable. Returns `false`, leaving the assignment
    /// unchanged, when the variable is outside `1..=N`.
    pub fn set(&mut self, var: Variable, value: bool) -> bool {
        match var.checked_sub(1).map(|i| i as usize) {
            Some(i) if i < self.0.len() => {
                self.0.set(i, value);
                true
            }
            _ => false,
        }
    }

    #[must_use]
    pub fn literal_value<L: Literal>(&self, lit: L) -> bool {
        lit.evaluate(self.value(lit.variable()))
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.0.iter()
    }

    #[must_use]
    pub fn solutions(&self) -> Solutions {
        self.0
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let var = i32::try_from(i + 1).unwrap_or(i32::MAX);
                if b { var } else { -var }
            })
            .collect()
    }
}

/// Renders as a bit string in variable order: `x1 x2 … xN` left to right.
impl Display for Assignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for b in &self.0 {
            write!(f, "{}", u8::from(b))?;
        }
        Ok(())
    }
}
