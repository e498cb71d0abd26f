//! Qubit layout and scoped scratch-qubit allocation.
//!
//! Variable `i` lives on qubit `i - 1`; clause ancillas follow the variable
//! register. Ancillas are never addressed directly by index: an oracle builder
//! checks them out of an [`AncillaArena`] and the returned [`AncillaLease`]
//! puts them back when it goes out of scope, on every exit path.

use crate::error::SolveError;
use crate::quantum::circuit::Qubit;
use crate::sat::literal::Variable;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::ops::{Deref, Range};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterLayout {
    num_vars: usize,
    num_ancillas: usize,
}

impl RegisterLayout {
    #[must_use]
    pub const fn new(num_vars: usize, num_ancillas: usize) -> Self {
        Self {
            num_vars,
            num_ancillas,
        }
    }

    /// Qubit holding a 1-based variable.
    #[must_use]
    pub const fn variable_qubit(&self, var: Variable) -> Qubit {
        var as usize - 1
    }

    #[must_use]
    pub const fn variables(&self) -> Range<Qubit> {
        0..self.num_vars
    }

    #[must_use]
    pub const fn ancillas(&self) -> Range<Qubit> {
        self.num_vars..self.num_vars + self.num_ancillas
    }

    #[must_use]
    pub const fn num_vars(&self) -> usize {
        self.num_vars
    }

    #[must_use]
    pub const fn num_ancillas(&self) -> usize {
        self.num_ancillas
    }

    /// Total qubit count.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.num_vars + self.num_ancillas
    }

    /// An arena over the ancilla range.
    #[must_use]
    pub fn arena(&self) -> AncillaArena {
        AncillaArena::new(self.ancillas())
    }
}

/// Scratch qubits available for checkout.
///
/// Checkouts always hand out the lowest free indices, so builders that check
/// out in the same order get the same qubits.
#[derive(Debug)]
pub struct AncillaArena {
    range: Range<Qubit>,
    free: RefCell<Vec<Qubit>>,
}

impl AncillaArena {
    #[must_use]
    pub fn new(range: Range<Qubit>) -> Self {
        // Kept in descending order so `pop` yields the lowest index.
        let free = range.clone().rev().collect();
        Self {
            range,
            free: RefCell::new(free),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.range.len()
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.free.borrow().len()
    }

    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity() - self.available()
    }

    /// Leases `count` qubits.
    ///
    /// # Errors
    ///
    /// [`SolveError::AncillaExhausted`] when fewer than `count` are free.
    pub fn checkout(&self, count: usize) -> Result<AncillaLease<'_>, SolveError> {
        let mut free = self.free.borrow_mut();
        if count > free.len() {
            return Err(SolveError::AncillaExhausted {
                requested: count,
                available: free.len(),
            });
        }
        let qubits = (0..count).filter_map(|_| free.pop()).collect();
        Ok(AncillaLease {
            arena: self,
            qubits,
        })
    }

    fn release(&self, qubits: &[Qubit]) {
        let mut free = self.free.borrow_mut();
        free.extend_from_slice(qubits);
        free.sort_unstable_by(|a, b| b.cmp(a));
    }
}

/// Qubits on loan from an [`AncillaArena`], returned on drop.
#[derive(Debug)]
pub struct AncillaLease<'a> {
    arena: &'a AncillaArena,
    qubits: SmallVec<[Qubit; 8]>,
}

impl Deref for AncillaLease<'_> {
    type Target = [Qubit];

    fn deref(&self) -> &Self::Target {
        &self.qubits
    }
}

impl Drop for AncillaLease<'_> {
    fn drop(&mut self) {
        self.arena.release(&self.qubits);
    }
}
