//! Boolean satisfiability by amplitude amplification.
//!
//! A CNF formula is compiled into a phase-marking oracle, interleaved with the
//! diffusion operator, and sampled on an execution backend; every sampled
//! candidate is verified classically before it is reported.

/// The `sat` module holds the classical formula model and its input formats.
pub mod sat;

/// The `quantum` module compiles formulas into circuits and drives the search.
pub mod quantum;

/// Error types shared by the formula, circuit, backend and search layers.
pub mod error;

/// Log targets used by the library.
pub mod targets;
