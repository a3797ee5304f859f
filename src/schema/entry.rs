use serde::{Deserialize, Serialize};
use std::fmt;

use super::event::TypedEvent;

/// The events of one entity chain, as read back from the chain buffer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBlock {
    pub events: Vec<TypedEvent>,
}

impl EventBlock {
    pub fn new(events: Vec<TypedEvent>) -> Self {
        Self { events }
    }
}

/// A document and its chains.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub blocks: Vec<EventBlock>,
}

impl Entry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            blocks: Vec::new(),
        }
    }

    /// Total number of events across all blocks.
    pub fn event_count(&self) -> usize {
        self.blocks.iter().map(|b| b.events.len()).sum()
    }
}

/// Two events of one chain that share a coreferent mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pair {
    pub first: TypedEvent,
    pub second: TypedEvent,
    pub pmi: f64,
}

impl fmt::Display for Pair {
    /// The pair buffer record: `key1 \t key2 \t pmi \t |(arg1)[id1]:(arg2)[id2]|`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t|({})[{}]:({})[{}]|",
            self.first.typed_dep,
            self.second.typed_dep,
            self.pmi,
            self.first.argument,
            self.first.mention_id,
            self.second.argument,
            self.second.mention_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::event::TypedDep;

    #[test]
    fn pair_record_format() {
        let pair = Pair {
            first: TypedEvent::new(TypedDep::parse("charge-o").unwrap(), "smith", "d1_0_4", "d1"),
            second: TypedEvent::new(TypedDep::parse("plead-s").unwrap(), "smith", "d1_0_4", "d1"),
            pmi: 1.5,
        };
        assert_eq!(
            pair.to_string(),
            "charge-o\tplead-s\t1.5\t|(smith)[d1_0_4]:(smith)[d1_0_4]|"
        );
    }

    #[test]
    fn entry_event_count() {
        let td = TypedDep::parse("eat-s").unwrap();
        let mut entry = Entry::new("d1");
        entry.blocks.push(EventBlock::new(vec![
            TypedEvent::new(td.clone(), "tom", "1", "d1"),
            TypedEvent::new(td.clone(), "tom", "1", "d1"),
        ]));
        entry.blocks.push(EventBlock::new(vec![TypedEvent::new(td, "sue", "2", "d1")]));
        assert_eq!(entry.event_count(), 3);
    }
}
