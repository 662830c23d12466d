use serde::{Deserialize, Serialize};

/// One physical opened pack, represented by the catalog indices still believed
/// possible for it. Candidate lists only ever shrink and never drop below one
/// entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Slot {
    pub candidates: Vec<usize>,
}

impl Slot {
    pub fn new(candidates: Vec<usize>) -> Self {
        Self { candidates }
    }

    pub fn is_resolved(&self) -> bool {
        self.candidates.len() == 1
    }
}

/// Display identity of a slot at a point in time. Computed on demand, never
/// stored, since the next observation may change it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SlotLabel {
    /// Resolved to a single catalog pack.
    Exact(String),
    /// Still ambiguous, but every candidate belongs to the same family.
    Family(String),
    /// Ambiguous across families; carries the 1-based slot number.
    Inconclusive(usize),
}
