use crate::{Slot, SlotLabel, Tracker};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CardLine {
    pub name: String,
    pub amount: u32,
    pub max_amount: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SlotReport {
    pub label: SlotLabel,
    pub candidates: Vec<String>,
    pub cards: Vec<CardLine>,
}

impl SlotReport {
    pub fn is_resolved(&self) -> bool {
        self.candidates.len() == 1
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UnassignedLine {
    pub count: usize,
    pub name: String,
}

/// Aggregated end-of-run view: one entry per slot plus the deduplicated
/// unassigned listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub slots: Vec<SlotReport>,
    pub unassigned: Vec<UnassignedLine>,
}

impl Tracker {
    /// Builds the final report. Pure: no counters move, and calling it twice
    /// with no observation in between yields equal values.
    pub fn report(&self) -> Report {
        let slots = self
            .slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| SlotReport {
                label: self.slot_label(idx),
                candidates: slot
                    .candidates
                    .iter()
                    .map(|&pack| self.catalog.packs[pack].name.clone())
                    .collect(),
                cards: self.slot_card_lines(slot),
            })
            .collect();

        let mut unassigned: Vec<UnassignedLine> = Vec::new();
        for name in &self.unassigned {
            match unassigned.iter_mut().find(|line| line.name == *name) {
                Some(line) => line.count += 1,
                None => unassigned.push(UnassignedLine {
                    count: 1,
                    name: name.clone(),
                }),
            }
        }

        Report { slots, unassigned }
    }

    /// For a resolved slot, its single candidate's full card list. For an
    /// ambiguous one, the conservative intersection: a card appears only if
    /// every candidate lists it, with the minimum `amount` and `max_amount`
    /// across candidates.
    fn slot_card_lines(&self, slot: &Slot) -> Vec<CardLine> {
        let first = &self.catalog.packs[slot.candidates[0]];
        let mut lines = Vec::new();
        'cards: for card in &first.cards {
            let mut line = CardLine {
                name: card.name.clone(),
                amount: card.amount,
                max_amount: card.max_amount,
            };
            for &other_idx in &slot.candidates[1..] {
                match self.catalog.packs[other_idx].card(&card.name) {
                    Some(other) => {
                        line.amount = line.amount.min(other.amount);
                        line.max_amount = line.max_amount.min(other.max_amount);
                    }
                    None => continue 'cards,
                }
            }
            lines.push(line);
        }
        lines
    }
}
