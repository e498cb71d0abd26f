//! Error types for formula construction, circuit validation, backend
//! execution and the search itself.
//!
//! Not finding a satisfying assignment is not an error: it is reported as
//! [`crate::quantum::driver::SearchOutcome::Exhausted`].

use thiserror::Error;

/// A formula that cannot be compiled into an oracle.
///
/// Never retried: the same input fails the same way.
#[derive(Debug, Error)]
pub enum FormulaError {
    #[error("clause {clause} is empty")]
    EmptyClause { clause: usize },

    #[error("clause {clause} contains the literal 0, which is reserved as a clause terminator")]
    ZeroLiteral { clause: usize },

    #[error("clause {clause} references variable {variable}, outside 1..={num_vars}")]
    VariableOutOfRange {
        clause: usize,
        variable: u32,
        num_vars: usize,
    },

    #[error("clause {clause} contains both {variable} and -{variable}")]
    TautologicalClause { clause: usize, variable: u32 },

    #[error("formula has no clauses")]
    NoClauses,

    #[error("formula declares no variables")]
    NoVariables,

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A structurally invalid circuit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CircuitError {
    #[error("gate {gate} addresses qubit {qubit}, circuit width is {width}")]
    QubitOutOfRange {
        gate: usize,
        qubit: usize,
        width: usize,
    },

    #[error("gate {gate} uses qubit {qubit} as both control and target")]
    ControlIsTarget { gate: usize, qubit: usize },

    #[error("gate {gate} lists qubit {qubit} as a control more than once")]
    DuplicateControl { gate: usize, qubit: usize },
}

/// Failures reported by an execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Transient: the same request may succeed later.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Fatal for this circuit size: resubmitting it will fail identically.
    #[error("backend rejected circuit: {0}")]
    RejectedCircuit(String),
}

impl From<CircuitError> for BackendError {
    fn from(value: CircuitError) -> Self {
        Self::RejectedCircuit(value.to_string())
    }
}

/// Errors that terminate a search.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("malformed formula: {0}")]
    MalformedFormula(#[from] FormulaError),

    #[error("backend unavailable after {attempts} attempts: {message}")]
    BackendUnavailable { attempts: usize, message: String },

    #[error("backend rejected circuit ({qubits} qubits, {gates} gates): {message}")]
    BackendRejectedCircuit {
        qubits: usize,
        gates: usize,
        message: String,
    },

    #[error("ancilla arena exhausted: requested {requested}, {available} available")]
    AncillaExhausted { requested: usize, available: usize },

    #[error("invalid circuit: {0}")]
    Circuit(#[from] CircuitError),
}

pub type Result<T, E = SolveError> = std::result::Result<T, E>;
