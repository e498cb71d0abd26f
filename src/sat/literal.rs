#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Literal representations.
//!
//! A literal is a `(variable, polarity)` pair. Polarity `true` means the
//! variable as-is, `false` means its negation. Variables are 1-based, matching
//! the DIMACS convention of signed integers.

use std::fmt::{Debug, Display};
use std::hash::Hash;

/// A 1-based variable index.
pub type Variable = u32;

/// Common interface for literal encodings.
pub trait Literal: Copy + Debug + Eq + Hash + Ord + Default {
    fn new(var: Variable, polarity: bool) -> Self;
    fn variable(self) -> Variable;
    fn polarity(self) -> bool;

    #[must_use]
    fn negated(self) -> Self;

    fn is_negated(self) -> bool {
        !self.polarity()
    }

    fn is_positive(self) -> bool {
        self.polarity()
    }

    /// Builds a literal from its signed DIMACS form. `0` is not a literal and
    /// must be filtered out by the caller.
    #[must_use]
    fn from_i32(value: i32) -> Self {
        let polarity = value.is_positive();
        let var = value.unsigned_abs();
        Self::new(var, polarity)
    }

    #[must_use]
    fn to_i32(self) -> i32 {
        let var = i32::try_from(self.variable()).unwrap_or(i32::MAX);
        if self.polarity() { var } else { -var }
    }

    /// Evaluates the literal against the value of its variable.
    fn evaluate(self, value: bool) -> bool {
        value == self.polarity()
    }
}

/// A literal packed into a single `u32`: the low 31 bits hold the variable,
/// the top bit holds the polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PackedLiteral(u32);

impl Literal for PackedLiteral {
    fn new(var: Variable, polarity: bool) -> Self {
        Self(var & 0x7FFF_FFFF | ((u32::from(polarity)) << 31))
    }

    fn variable(self) -> Variable {
        self.0 & 0x7FFF_FFFF
    }

    fn polarity(self) -> bool {
        (self.0 >> 31) != 0
    }

    fn negated(self) -> Self {
        Self(self.0 ^ 0x8000_0000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StructLiteral {
    value: u32,
    polarity: bool,
}

impl Literal for StructLiteral {
    fn new(var: Variable, polarity: bool) -> Self {
        Self {
            value: var,
            polarity,
        }
    }

    fn variable(self) -> Variable {
        self.value
    }

    fn polarity(self) -> bool {
        self.polarity
    }

    fn negated(self) -> Self {
        Self {
            value: self.value,
            polarity: !self.polarity,
        }
    }
}

impl Display for PackedLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_i32())
    }
}

impl Display for StructLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_i32())
    }
}
