#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Grover search over CNF formulas.
//!
//! Builders are pure functions from a formula (or a register size) to a
//! [`circuit::Circuit`] fragment. The [`driver`] assembles fragments, hands
//! them to an [`backend::ExecutionBackend`] and verifies what comes back.

pub mod backend;
pub mod circuit;
pub mod clause_oracle;
pub mod diffusion;
pub mod driver;
pub mod formula_oracle;
pub mod register;
pub mod schedule;
pub mod simulator;
