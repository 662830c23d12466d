use crate::SlotLabel;
use serde::{Deserialize, Serialize};

/// State transitions reported by the tracker. Labels are captured at emit
/// time: a later cascade step may narrow the slot further, and the front end
/// should render what was true when the transition happened.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Event {
    CardAssigned {
        card: String,
        slot: usize,
        label: SlotLabel,
    },
    SlotOpened {
        slot: usize,
        label: SlotLabel,
        possibilities: usize,
    },
    SlotNarrowed {
        slot: usize,
        was: SlotLabel,
        now: SlotLabel,
        from: usize,
        to: usize,
    },
    CardUnassigned {
        card: String,
        pending: usize,
    },
}

#[derive(Debug, Default)]
pub struct EventBus {
    queue: Vec<Event>,
}

impl EventBus {
    pub fn push(&mut self, event: Event) {
        self.queue.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Event> + '_ {
        self.queue.drain(..)
    }
}
