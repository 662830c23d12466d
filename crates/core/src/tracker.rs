use crate::{Catalog, Event, EventBus, Slot, SlotLabel};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("no such card '{0}' in the catalog")]
    UnknownCard(String),
    #[error("no such pack family '{0}' in the catalog")]
    UnknownFamily(String),
}

/// Result of feeding one unit of an observed card to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    /// Committed to an existing slot without changing any candidate list.
    NoUpdate,
    /// A slot was created or narrowed; pooled cards are worth retrying.
    Update,
    /// No strategy could place the card.
    Unassigned,
}

/// Incremental state of one reconstruction run: the catalog with its running
/// counters, the slots opened so far, the pool of cards nothing could explain
/// yet, and the optional total-pack bound.
///
/// Slots hold candidates as catalog indices, so a counter bumped through one
/// slot's candidate is visible to every other slot still listing the same
/// pack. Commitments are greedy and never backtracked.
#[derive(Debug)]
pub struct Tracker {
    pub catalog: Catalog,
    pub slots: Vec<Slot>,
    pub unassigned: Vec<String>,
    pub pack_bound: Option<usize>,
}

impl Tracker {
    pub fn new(catalog: Catalog, pack_bound: Option<usize>) -> Self {
        Self {
            catalog,
            slots: Vec::new(),
            unassigned: Vec::new(),
            pack_bound,
        }
    }

    /// Pre-seeds one slot with every catalog pack of the given family, for a
    /// user who declared up front which pack they opened. Seeding does not
    /// filter claimed packs: declaring the same family twice yields two slots
    /// sharing the family's candidates.
    pub fn seed_slot(&mut self, family: &str) -> Result<usize, TrackError> {
        let candidates: Vec<usize> = self
            .catalog
            .packs
            .iter()
            .enumerate()
            .filter(|(_, pack)| pack.family == family)
            .map(|(idx, _)| idx)
            .collect();
        if candidates.is_empty() {
            return Err(TrackError::UnknownFamily(family.to_string()));
        }
        self.slots.push(Slot::new(candidates));
        Ok(self.slots.len() - 1)
    }

    /// Feeds `count` independent units of an observed card. Every `Update`
    /// re-runs the pooled cards to fixpoint before the next unit is taken.
    pub fn observe(
        &mut self,
        card: &str,
        count: u32,
        events: &mut EventBus,
    ) -> Result<(), TrackError> {
        if !self.catalog.contains_card(card) {
            return Err(TrackError::UnknownCard(card.to_string()));
        }
        for _ in 0..count {
            match self.assign(card, events) {
                AssignOutcome::NoUpdate => {}
                AssignOutcome::Update => self.reassign_pool(events),
                AssignOutcome::Unassigned => {
                    self.unassigned.push(card.to_string());
                    events.push(Event::CardUnassigned {
                        card: card.to_string(),
                        pending: self.unassigned.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Places one unit of a card: extend an existing slot, differentiate an
    /// ambiguous one, or open a new slot, in that order. The first strategy
    /// that succeeds wins.
    pub fn assign(&mut self, card: &str, events: &mut EventBus) -> AssignOutcome {
        if self.try_extend_existing(card, events) {
            return AssignOutcome::NoUpdate;
        }
        if self.try_differentiate(card, events) {
            return AssignOutcome::Update;
        }
        if !self.at_pack_bound() && self.try_open_new(card, events) {
            return AssignOutcome::Update;
        }
        AssignOutcome::Unassigned
    }

    /// Re-runs every pooled card whenever new information appeared, sweeping
    /// the pool in insertion order until a full sweep makes no progress.
    /// Terminates because candidate lists only shrink and the pool only loses
    /// entries.
    fn reassign_pool(&mut self, events: &mut EventBus) {
        loop {
            let mut progressed = false;
            let pending = std::mem::take(&mut self.unassigned);
            if pending.is_empty() {
                return;
            }
            for card in pending {
                match self.assign(&card, events) {
                    AssignOutcome::Update => progressed = true,
                    AssignOutcome::NoUpdate => {}
                    AssignOutcome::Unassigned => self.unassigned.push(card),
                }
            }
            if !progressed {
                return;
            }
        }
    }

    /// Strategy 1: commit the card to the first slot where every candidate
    /// still has headroom for it. The copy is counted on all candidates, since
    /// which one is real is unknown; for a resolved slot that is simply its
    /// single pack.
    fn try_extend_existing(&mut self, card: &str, events: &mut EventBus) -> bool {
        for idx in 0..self.slots.len() {
            let candidates = self.slots[idx].candidates.clone();
            if !candidates
                .iter()
                .all(|&pack| self.catalog.packs[pack].has_headroom(card))
            {
                continue;
            }
            for &pack in &candidates {
                self.catalog.packs[pack].record_copy(card);
            }
            events.push(Event::CardAssigned {
                card: card.to_string(),
                slot: idx,
                label: self.slot_label(idx),
            });
            return true;
        }
        false
    }

    /// Strategy 2: use the card as evidence to narrow one ambiguous slot.
    ///
    /// Refused when an unclaimed catalog pack could explain the card as a
    /// brand-new slot instead (unless the pack bound is already reached), and
    /// refused when candidates with headroom are spread across more than one
    /// slot; the spread case means the catalog or prior commitments disagree
    /// with reality, so no slot is guessed.
    fn try_differentiate(&mut self, card: &str, events: &mut EventBus) -> bool {
        if !self.at_pack_bound() {
            for (pack_idx, pack) in self.catalog.packs.iter().enumerate() {
                if pack.card(card).is_some() && !self.is_claimed(pack_idx) {
                    return false;
                }
            }
        }

        let mut target: Option<usize> = None;
        let mut survivors: Vec<usize> = Vec::new();
        for (slot_idx, slot) in self.slots.iter().enumerate() {
            for &pack_idx in &slot.candidates {
                if self.catalog.packs[pack_idx].has_headroom(card) {
                    match target {
                        Some(existing) if existing != slot_idx => return false,
                        _ => {
                            target = Some(slot_idx);
                            survivors.push(pack_idx);
                        }
                    }
                }
            }
        }
        let Some(slot_idx) = target else {
            return false;
        };
        let old_len = self.slots[slot_idx].candidates.len();
        if survivors.len() >= old_len {
            return false;
        }

        let was = self.slot_label(slot_idx);
        for &pack_idx in &survivors {
            self.catalog.packs[pack_idx].record_copy(card);
        }
        let to = survivors.len();
        self.slots[slot_idx].candidates = survivors;
        let now = self.slot_label(slot_idx);
        events.push(Event::SlotNarrowed {
            slot: slot_idx,
            was,
            now: now.clone(),
            from: old_len,
            to,
        });
        events.push(Event::CardAssigned {
            card: card.to_string(),
            slot: slot_idx,
            label: now,
        });
        true
    }

    /// Strategy 3: open a new slot whose candidates are every unclaimed pack
    /// containing the card. Vetoed while any existing candidate anywhere still
    /// has headroom for it; the card stays unassigned rather than opening a
    /// slot that may duplicate an ambiguous one.
    fn try_open_new(&mut self, card: &str, events: &mut EventBus) -> bool {
        for slot in &self.slots {
            for &pack_idx in &slot.candidates {
                if self.catalog.packs[pack_idx].has_headroom(card) {
                    return false;
                }
            }
        }

        let mut candidates: Vec<usize> = Vec::new();
        for pack_idx in 0..self.catalog.packs.len() {
            if self.catalog.packs[pack_idx].card(card).is_none() || self.is_claimed(pack_idx) {
                continue;
            }
            self.catalog.packs[pack_idx].record_copy(card);
            candidates.push(pack_idx);
        }
        if candidates.is_empty() {
            return false;
        }
        let possibilities = candidates.len();
        self.slots.push(Slot::new(candidates));
        let slot_idx = self.slots.len() - 1;
        let label = self.slot_label(slot_idx);
        events.push(Event::SlotOpened {
            slot: slot_idx,
            label: label.clone(),
            possibilities,
        });
        events.push(Event::CardAssigned {
            card: card.to_string(),
            slot: slot_idx,
            label,
        });
        true
    }

    fn at_pack_bound(&self) -> bool {
        self.pack_bound == Some(self.slots.len())
    }

    /// A pack is claimed while any slot lists it as a candidate.
    pub fn is_claimed(&self, pack_idx: usize) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.candidates.contains(&pack_idx))
    }

    pub fn slot_label(&self, idx: usize) -> SlotLabel {
        let slot = &self.slots[idx];
        if let [only] = slot.candidates[..] {
            return SlotLabel::Exact(self.catalog.packs[only].name.clone());
        }
        let family = &self.catalog.packs[slot.candidates[0]].family;
        if slot
            .candidates
            .iter()
            .all(|&pack| self.catalog.packs[pack].family == *family)
        {
            SlotLabel::Family(family.clone())
        } else {
            SlotLabel::Inconclusive(idx + 1)
        }
    }

    /// Copies committed to the slot so far, read from its first candidate.
    /// Strategy 1 keeps candidate counters in step, so any candidate serves.
    pub fn slot_observed_total(&self, idx: usize) -> u32 {
        self.catalog.packs[self.slots[idx].candidates[0]].observed_total()
    }

    pub fn slot_capacity_total(&self, idx: usize) -> u32 {
        self.catalog.packs[self.slots[idx].candidates[0]].capacity_total()
    }
}
