use crate::PackCard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One pack as declared by the catalog source. `name` is the exact variant
/// identity, `family` the shared name across seasonal variants ("Booster" for
/// "Booster 1" and "Booster 2"). Packs are identified by their index in the
/// catalog; two entries with equal names stay distinct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogPack {
    pub name: String,
    pub family: String,
    pub cards: Vec<PackCard>,
}

impl CatalogPack {
    pub fn new(name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            cards: Vec::new(),
        }
    }

    /// Adds `count` copies of a card to the pack contents. Repeated names
    /// accumulate into the existing entry's `max_amount`.
    pub fn add_card(&mut self, name: &str, count: u32) {
        match self.cards.iter_mut().find(|card| card.name == name) {
            Some(card) => card.max_amount += count,
            None => self.cards.push(PackCard::new(name, count)),
        }
    }

    pub fn card(&self, name: &str) -> Option<&PackCard> {
        self.cards.iter().find(|card| card.name == name)
    }

    /// True when the pack lists this card and still has room for another copy.
    pub fn has_headroom(&self, name: &str) -> bool {
        self.card(name).is_some_and(PackCard::has_headroom)
    }

    /// Commits one observed copy of the card. Returns false when the card is
    /// absent or already at its maximum.
    pub fn record_copy(&mut self, name: &str) -> bool {
        match self
            .cards
            .iter_mut()
            .find(|card| card.name == name && card.has_headroom())
        {
            Some(card) => {
                card.amount += 1;
                true
            }
            None => false,
        }
    }

    pub fn observed_total(&self) -> u32 {
        self.cards.iter().map(|card| card.amount).sum()
    }

    pub fn capacity_total(&self) -> u32 {
        self.cards.iter().map(|card| card.max_amount).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    pub packs: Vec<CatalogPack>,
}

impl Catalog {
    pub fn contains_card(&self, name: &str) -> bool {
        self.packs.iter().any(|pack| pack.card(name).is_some())
    }

    /// Every card name appearing in any pack, deduplicated and sorted.
    pub fn card_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .packs
            .iter()
            .flat_map(|pack| pack.cards.iter().map(|card| card.name.as_str()))
            .collect();
        names.into_iter().map(ToOwned::to_owned).collect()
    }

    /// Every pack family name, deduplicated and sorted.
    pub fn family_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self.packs.iter().map(|pack| pack.family.as_str()).collect();
        names.into_iter().map(ToOwned::to_owned).collect()
    }
}
