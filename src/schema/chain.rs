use serde::{Deserialize, Serialize};

use super::event::EventId;

/// One role slot of a schema: the events believed to share a participant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chain {
    pub events: Vec<EventId>,
    /// Sum of the similarity contributions recorded as events were placed.
    pub score: f64,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event unless it is already in the chain.
    pub fn add(&mut self, event: EventId) {
        if !self.contains(event) {
            self.events.push(event);
        }
    }

    pub fn contains(&self, event: EventId) -> bool {
        self.events.contains(&event)
    }

    pub fn add_score(&mut self, delta: f64) {
        self.score += delta;
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
