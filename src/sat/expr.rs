//! Named-variable CNF text, e.g. `(x or y or not z) and (not x or y or z)`.
//!
//! Clauses are separated by `and` (or `&`), literals by `or` (or `|`), and a
//! literal is negated by any number of `not`, `!` or `~` prefixes. Keywords
//! are case-insensitive. Parentheses around a clause are optional.
//!
//! Variable names are collected, sorted, and numbered `1..=N` in sorted order.

use crate::error::FormulaError;
use crate::sat::dimacs::RawFormula;
use itertools::Itertools;
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Name(String),
}

/// A parsed formula together with the names of its variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedFormula {
    /// `names[i]` is the name of variable `i + 1`.
    pub names: Vec<String>,
    pub raw: RawFormula,
}

impl NamedFormula {
    /// Name of a 1-based variable.
    #[must_use]
    pub fn name(&self, var: u32) -> Option<&str> {
        var.checked_sub(1)
            .and_then(|i| self.names.get(i as usize))
            .map(String::as_str)
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '&' | '∧' => {
                chars.next();
                tokens.push(Token::And);
            }
            '|' | '∨' => {
                chars.next();
                tokens.push(Token::Or);
            }
            '!' | '~' | '¬' => {
                chars.next();
                tokens.push(Token::Not);
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.to_ascii_lowercase().as_str() {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Name(word),
                });
            }
            other => {
                return Err(FormulaError::Parse {
                    line: 1,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn error(&self, message: impl Into<String>) -> FormulaError {
        FormulaError::Parse {
            line: 1,
            message: format!("token {}: {}", self.pos + 1, message.into()),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn formula(&mut self) -> Result<Vec<Vec<(String, bool)>>, FormulaError> {
        let mut clauses = vec![self.clause()?];
        while self.peek() == Some(&Token::And) {
            self.bump();
            clauses.push(self.clause()?);
        }
        match self.peek() {
            None => Ok(clauses),
            Some(t) => Err(self.error(format!("expected 'and' or end of input, found {t:?}"))),
        }
    }

    fn clause(&mut self) -> Result<Vec<(String, bool)>, FormulaError> {
        let parenthesised = self.peek() == Some(&Token::Open);
        if parenthesised {
            self.bump();
        }

        let mut literals = vec![self.literal()?];
        while self.peek() == Some(&Token::Or) {
            self.bump();
            literals.push(self.literal()?);
        }

        if parenthesised && self.bump() != Some(Token::Close) {
            return Err(self.error("expected ')'"));
        }
        Ok(literals)
    }

    fn literal(&mut self) -> Result<(String, bool), FormulaError> {
        let mut polarity = true;
        loop {
            match self.bump() {
                Some(Token::Not) => polarity = !polarity,
                Some(Token::Name(name)) => return Ok((name, polarity)),
                Some(t) => return Err(self.error(format!("expected a variable, found {t:?}"))),
                None => return Err(self.error("expected a variable, found end of input")),
            }
        }
    }
}

/// Parses named-variable CNF text.
///
/// # Errors
///
/// [`FormulaError::Parse`] for unknown characters, unbalanced parentheses,
/// or a missing variable.
pub fn parse_expression(input: &str) -> Result<NamedFormula, FormulaError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(FormulaError::NoClauses);
    }

    let named = Parser { tokens, pos: 0 }.formula()?;

    let names = named
        .iter()
        .flatten()
        .map(|(name, _)| name.clone())
        .unique()
        .sorted()
        .collect_vec();

    let index: FxHashMap<&str, i32> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i32::try_from(i + 1).unwrap_or(i32::MAX)))
        .collect();

    let clauses = named
        .iter()
        .map(|clause| {
            clause
                .iter()
                .map(|(name, polarity)| {
                    let var = index[name.as_str()];
                    if *polarity { var } else { -var }
                })
                .collect_vec()
        })
        .collect_vec();

    Ok(NamedFormula {
        raw: RawFormula {
            num_vars: names.len(),
            clauses,
        },
        names,
    })
}
