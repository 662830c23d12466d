use serde::{Deserialize, Serialize};

/// One card entry of a catalog pack. `max_amount` is how many copies the pack
/// can contain, `amount` how many have been committed to it so far.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackCard {
    pub name: String,
    pub amount: u32,
    pub max_amount: u32,
}

impl PackCard {
    pub fn new(name: impl Into<String>, max_amount: u32) -> Self {
        Self {
            name: name.into(),
            amount: 0,
            max_amount,
        }
    }

    pub fn has_headroom(&self) -> bool {
        self.amount < self.max_amount
    }
}

/// Splits a `<N>x <name>` line into the card name and copy count. A line
/// without the amount prefix counts as a single copy.
pub fn parse_card_amount(line: &str) -> (&str, u32) {
    if let Some((prefix, rest)) = line.split_once("x ") {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(count) = prefix.parse::<u32>() {
                return (rest, count);
            }
        }
    }
    (line, 1)
}
