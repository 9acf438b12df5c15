//! Remaining-memory budget for the write phase.
//!
//! Unlike a pool capacity, this budget only shrinks: bytes kept in memory are
//! charged against it and never handed back. Spilling exhausts it.

/// Bytes still allowed to be held in memory before the buffer spills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryBudget {
    limit: u64,
    remaining: u64,
}

impl MemoryBudget {
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }

    /// Configured budget at construction.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// How many bytes to pull from a source to decide whether it still fits.
    ///
    /// One byte past the remaining budget: if that byte arrives, the budget is
    /// exceeded. Saturates for an unbounded budget.
    pub fn probe_len(&self) -> u64 {
        self.remaining.saturating_add(1)
    }

    /// Exactly `remaining` bytes still fit; one more does not.
    pub fn fits(&self, bytes: u64) -> bool {
        bytes <= self.remaining
    }

    /// Charge `bytes` kept in memory.
    /// Returns false, charging nothing, if they do not fit.
    pub fn try_charge(&mut self, bytes: u64) -> bool {
        if !self.fits(bytes) {
            return false;
        }
        self.remaining -= bytes;
        true
    }

    /// Drop the remaining budget to zero (after a spill).
    pub fn exhaust(&mut self) {
        self.remaining = 0;
    }
}
