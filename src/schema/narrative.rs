use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write;

use super::chain::Chain;
use super::event::{EventId, MergedEvent};

/// Newtype wrapper for schema IDs, handed out in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(pub u64);

/// A narrative schema: a scored set of role chains.
///
/// Chains hold `EventId`s into the merged-event arena of the builder that
/// grew the schema; every method that needs verbs or arguments takes that
/// arena as a slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub id: SchemaId,
    pub chains: Vec<Chain>,
    pub score: f64,
}

impl Schema {
    pub fn new(id: SchemaId) -> Self {
        Self {
            id,
            chains: Vec::new(),
            score: 0.0,
        }
    }

    /// Add an event to the chain at `position`, or to a new chain if
    /// `position` is past the end. Returns the index of the receiving chain.
    ///
    /// The schema score grows by the event's `max_score` only if its verb
    /// is new to the schema.
    pub fn add(&mut self, event: EventId, position: usize, events: &[MergedEvent]) -> usize {
        let merged = &events[event.0];
        if !self.contains_verb(merged.verb(), events) {
            self.score += merged.max_score;
        }
        if position < self.chains.len() {
            self.chains[position].add(event);
            position
        } else {
            let mut chain = Chain::new();
            chain.add(event);
            self.chains.push(chain);
            self.chains.len() - 1
        }
    }

    pub fn contains(&self, event: EventId) -> bool {
        self.chains.iter().any(|c| c.contains(event))
    }

    pub fn contains_verb(&self, verb: &str, events: &[MergedEvent]) -> bool {
        self.event_ids().any(|id| events[id.0].verb() == verb)
    }

    fn verbs<'a>(&self, events: &'a [MergedEvent]) -> BTreeSet<&'a str> {
        self.event_ids().map(|id| events[id.0].verb()).collect()
    }

    pub fn verb_count(&self, events: &[MergedEvent]) -> usize {
        self.verbs(events).len()
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn longest_chain_len(&self) -> usize {
        self.chains.iter().map(Chain::len).max().unwrap_or(0)
    }

    fn event_ids(&self) -> impl Iterator<Item = EventId> + '_ {
        self.chains.iter().flat_map(|c| c.events.iter().copied())
    }

    /// Verbs with their best score, highest first (ties by verb).
    pub fn verb_scores(&self, events: &[MergedEvent]) -> Vec<(String, f64)> {
        let mut best: FxHashMap<&str, f64> = FxHashMap::default();
        for id in self.event_ids() {
            let e = &events[id.0];
            let entry = best.entry(e.verb()).or_insert(e.max_score);
            if e.max_score > *entry {
                *entry = e.max_score;
            }
        }
        let mut scores: Vec<(String, f64)> =
            best.into_iter().map(|(v, s)| (v.to_string(), s)).collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scores
    }

    /// Render the schema as a stanza of the schema output file.
    pub fn render(&self, events: &[MergedEvent]) -> String {
        let mut chains: Vec<&Chain> = self.chains.iter().collect();
        chains.sort_by(|a, b| b.score.total_cmp(&a.score));
        let scores = self.verb_scores(events);

        let mut out = String::new();
        out.push_str("*****\n");
        let _ = writeln!(out, "score={:.6}", self.score);
        let verbs: Vec<&str> = scores.iter().map(|(v, _)| v.as_str()).collect();
        let _ = writeln!(out, "Events: {}", verbs.join(" "));
        let values: Vec<String> = scores.iter().map(|(_, s)| format!("{:.3}", s)).collect();
        let _ = writeln!(out, "Scores: {}", values.join(" "));

        for chain in chains {
            out.push_str("[ ");
            for id in &chain.events {
                let _ = write!(out, "{} ", events[id.0].typed_dep);
            }
            out.push_str("] ( ");
            for argument in repeated_arguments(chain, events) {
                let _ = write!(out, "{} ", argument);
            }
            out.push_str(")\n");
        }
        out.push('\n');
        out
    }
}

/// Arguments occurring in more than one event of the chain.
fn repeated_arguments<'a>(chain: &Chain, events: &'a [MergedEvent]) -> BTreeSet<&'a str> {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    for id in &chain.events {
        for argument in &events[id.0].arguments {
            *counts.entry(argument.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(a, _)| a)
        .collect()
}
