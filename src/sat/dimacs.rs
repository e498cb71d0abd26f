#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! A parser for the DIMACS CNF (Conjunctive Normal Form) file format.
//!
//! The format typically includes:
//! - Comment lines starting with 'c'.
//! - A problem line `p cnf <num_variables> <num_clauses>`. The variable count
//!   declares N; without a problem line N is the largest variable referenced.
//!   The clause count is checked only loosely: a mismatch is logged.
//! - Clauses as whitespace-separated signed integers, each terminated by `0`.
//!   A clause may span several lines.
//! - An optional '%' line marking end-of-data.
//!
//! Malformed input is reported as [`FormulaError::Parse`] with the offending
//! line number rather than by panicking.

use crate::error::FormulaError;
use crate::sat::cnf::Cnf;
use crate::sat::literal::Literal;
use crate::sat::preprocessing::{Preprocessor, TautologyElimination};
use crate::sat::clause::Clause;
use crate::targets::FORMULA as LOG_FORMULA;
use itertools::Itertools;
use std::io::{self, BufRead};
use std::path::Path;

/// Parsed but not yet validated formula.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawFormula {
    /// Declared (or inferred) variable count N.
    pub num_vars: usize,
    /// Clauses in signed DIMACS form, without terminators.
    pub clauses: Vec<Vec<i32>>,
}

impl RawFormula {
    /// Validates into a [`Cnf`]. With `drop_tautologies`, clauses containing
    /// a variable in both polarities are removed (and logged) instead of
    /// rejected.
    ///
    /// # Errors
    ///
    /// Any validation failure of [`Cnf::from_clauses`], or a literal `0`.
    pub fn build<L: Literal>(self, drop_tautologies: bool) -> Result<Cnf<L>, FormulaError> {
        if !drop_tautologies {
            return Cnf::new(self.num_vars, self.clauses);
        }

        if let Some(idx) = self.clauses.iter().position(|c| c.contains(&0)) {
            return Err(FormulaError::ZeroLiteral { clause: idx + 1 });
        }
        let clauses = self.clauses.iter().map(|c| Clause::new(c)).collect_vec();
        Cnf::from_clauses(self.num_vars, TautologyElimination.preprocess(&clauses))
    }
}

/// Parses DIMACS data from a `BufRead` source.
///
/// # Errors
///
/// [`FormulaError::Io`] if reading fails, [`FormulaError::Parse`] for a
/// malformed problem line or a non-integer literal.
pub fn parse_dimacs<R: BufRead>(reader: R) -> Result<RawFormula, FormulaError> {
    let mut declared: Option<(usize, usize)> = None;
    let mut clauses: Vec<Vec<i32>> = Vec::new();
    let mut pending: Vec<i32> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line?;
        let mut parts = line.split_whitespace().peekable();

        match parts.peek() {
            Some(&"%") => break,
            None | Some(&"c") => {}
            Some(&"p") => declared = Some(parse_problem_line(&line, line_no)?),
            Some(tok) if tok.starts_with('c') => {}
            Some(_) => {
                for token in parts {
                    let lit = token.parse::<i32>().map_err(|e| FormulaError::Parse {
                        line: line_no,
                        message: format!("failed to parse literal '{token}': {e}"),
                    })?;
                    if lit == 0 {
                        clauses.push(std::mem::take(&mut pending));
                    } else {
                        pending.push(lit);
                    }
                }
            }
        }
    }

    if !pending.is_empty() {
        clauses.push(pending);
    }

    let max_var = clauses
        .iter()
        .flatten()
        .map(|l| l.unsigned_abs() as usize)
        .max()
        .unwrap_or(0);

    let num_vars = match declared {
        Some((vars, expected_clauses)) => {
            if expected_clauses != clauses.len() {
                log::warn!(
                    target: LOG_FORMULA,
                    "Problem line declares {expected_clauses} clauses, found {}",
                    clauses.len()
                );
            }
            vars
        }
        None => max_var,
    };

    Ok(RawFormula { num_vars, clauses })
}

fn parse_problem_line(line: &str, line_no: usize) -> Result<(usize, usize), FormulaError> {
    let bad = |message: String| FormulaError::Parse {
        line: line_no,
        message,
    };

    let fields = line.split_whitespace().collect_vec();
    match fields.as_slice() {
        ["p", "cnf", vars, clauses] => {
            let vars = vars
                .parse::<usize>()
                .map_err(|e| bad(format!("bad variable count '{vars}': {e}")))?;
            let clauses = clauses
                .parse::<usize>()
                .map_err(|e| bad(format!("bad clause count '{clauses}': {e}")))?;
            Ok((vars, clauses))
        }
        _ => Err(bad(format!("malformed problem line '{line}'"))),
    }
}

/// Parses DIMACS text held in memory, e.g. `"1 -2 0\n2 3 0"`.
///
/// # Errors
///
/// See [`parse_dimacs`].
pub fn parse_text(input: &str) -> Result<RawFormula, FormulaError> {
    parse_dimacs(io::Cursor::new(input))
}

/// Parses a DIMACS CNF file.
///
/// # Errors
///
/// [`FormulaError::Io`] if the file cannot be opened, otherwise see
/// [`parse_dimacs`].
pub fn parse_file(file_path: impl AsRef<Path>) -> Result<RawFormula, FormulaError> {
    let file = std::fs::File::open(file_path)?;
    let reader = io::BufReader::new(file);
    parse_dimacs(reader)
}
