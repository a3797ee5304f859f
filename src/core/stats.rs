/// Corpus statistics: event frequencies, pointwise mutual information and
/// the argument-specific co-occurrence table.

use rustc_hash::FxHashMap;
use std::path::Path;

use crate::core::buffer::BufferError;
use crate::schema::entry::{Entry, EventBlock};
use crate::schema::event::TypedDep;

/// Event-type counts and co-occurrence counts gathered from the chain buffer.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    event_counts: FxHashMap<TypedDep, u64>,
    /// Normaliser of `probability`: every event read.
    absolute_count: u64,
    /// Ordered index pairs of one block with equal arguments, by key pair.
    cooccurrences: FxHashMap<TypedDep, FxHashMap<TypedDep, u64>>,
    /// Ordered index pairs of one block with equal arguments, any keys.
    shared_argument_pairs: u64,
}

impl Statistics {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            for block in &entry.blocks {
                stats.observe(block);
            }
        }
        stats
    }

    fn observe(&mut self, block: &EventBlock) {
        for event in &block.events {
            *self.event_counts.entry(event.typed_dep.clone()).or_default() += 1;
            self.absolute_count += 1;
        }
        for (i, a) in block.events.iter().enumerate() {
            for (j, b) in block.events.iter().enumerate() {
                if i == j || a.argument != b.argument {
                    continue;
                }
                self.shared_argument_pairs += 1;
                *self
                    .cooccurrences
                    .entry(a.typed_dep.clone())
                    .or_default()
                    .entry(b.typed_dep.clone())
                    .or_default() += 1;
            }
        }
    }

    pub fn count(&self, key: &TypedDep) -> u64 {
        self.event_counts.get(key).copied().unwrap_or(0)
    }

    pub fn absolute_count(&self) -> u64 {
        self.absolute_count
    }

    pub fn distinct_events(&self) -> usize {
        self.event_counts.len()
    }

    pub fn probability(&self, key: &TypedDep) -> f64 {
        if self.absolute_count == 0 {
            return 0.0;
        }
        self.count(key) as f64 / self.absolute_count as f64
    }

    /// Share of all argument-sharing index pairs in the corpus that have
    /// keys `(first, second)` in this order.
    ///
    /// The denominator is corpus-wide rather than specific to the two event
    /// types; see DESIGN.md.
    pub fn cooccurrence_probability(&self, first: &TypedDep, second: &TypedDep) -> f64 {
        if self.shared_argument_pairs == 0 {
            return 0.0;
        }
        let num = self
            .cooccurrences
            .get(first)
            .and_then(|m| m.get(second))
            .copied()
            .unwrap_or(0);
        num as f64 / self.shared_argument_pairs as f64
    }

    /// `ln(P_cooc(e1,e2) / (P(e1) * P(e2)))`
    pub fn pmi(&self, first: &TypedDep, second: &TypedDep) -> f64 {
        let joint = self.cooccurrence_probability(first, second);
        (joint / (self.probability(first) * self.probability(second))).ln()
    }
}

/// PMI of ordered typed-dependency pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PmiTable {
    table: FxHashMap<TypedDep, FxHashMap<TypedDep, f64>>,
    len: usize,
}

impl PmiTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, first: TypedDep, second: TypedDep, pmi: f64) {
        if self.table.entry(first).or_default().insert(second, pmi).is_none() {
            self.len += 1;
        }
    }

    /// Ordered lookup; the reverse pair is a different entry.
    pub fn get(&self, first: &TypedDep, second: &TypedDep) -> Option<f64> {
        self.table.get(first)?.get(second).copied()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// How often an argument filled the slots of two typed dependencies,
/// keyed `(e, e', a)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    table: FxHashMap<TypedDep, FxHashMap<TypedDep, FxHashMap<String, u64>>>,
    len: usize,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, first: TypedDep, second: TypedDep, argument: impl Into<String>, count: u64) {
        let previous = self
            .table
            .entry(first)
            .or_default()
            .entry(second)
            .or_default()
            .insert(argument.into(), count);
        if previous.is_none() {
            self.len += 1;
        }
    }

    /// Ordered lookup, 0 when absent.
    pub fn get(&self, first: &TypedDep, second: &TypedDep, argument: &str) -> u64 {
        self.table
            .get(first)
            .and_then(|m| m.get(second))
            .and_then(|m| m.get(argument))
            .copied()
            .unwrap_or(0)
    }

    /// Lookup in either order; the forward key wins if both exist.
    pub fn get_either(&self, first: &TypedDep, second: &TypedDep, argument: &str) -> u64 {
        match self.get(first, second, argument) {
            0 => self.get(second, first, argument),
            n => n,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All entries, sorted by key.
    pub fn entries(&self) -> Vec<(&TypedDep, &TypedDep, &str, u64)> {
        let mut entries: Vec<_> = self
            .table
            .iter()
            .flat_map(|(a, m)| {
                m.iter().flat_map(move |(b, m)| {
                    m.iter().map(move |(arg, n)| (a, b, arg.as_str(), *n))
                })
            })
            .collect();
        entries.sort_by(|x, y| (x.0, x.1, x.2).cmp(&(y.0, y.1, y.2)));
        entries
    }

    /// Cache format: one `key1 key2 argument\tcount` line per entry.
    pub fn to_cache_string(&self) -> String {
        let mut out = String::new();
        for (a, b, arg, n) in self.entries() {
            out.push_str(&format!("{} {} {}\t{}\n", a, b, arg, n));
        }
        out
    }

    /// Parse the cache format, skipping malformed lines.
    pub fn parse_cache(text: &str) -> Self {
        let mut table = Self::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match parse_cache_line(line) {
                Some((a, b, arg, n)) => table.insert(a, b, arg, n),
                None => log::warn!("frequency cache line {}: malformed entry '{}'", i + 1, line),
            }
        }
        table
    }

    pub fn load(path: &Path) -> Result<Self, BufferError> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse_cache(&text))
    }

    /// Write the whole table, replacing any previous cache.
    pub fn save(&self, path: &Path) -> Result<(), BufferError> {
        std::fs::write(path, self.to_cache_string())?;
        Ok(())
    }
}

fn parse_cache_line(line: &str) -> Option<(TypedDep, TypedDep, String, u64)> {
    let (key, count) = line.split_once('\t')?;
    let count = count.trim().parse().ok()?;
    let mut parts = key.split(' ');
    let first = TypedDep::parse(parts.next()?)?;
    let second = TypedDep::parse(parts.next()?)?;
    let argument = parts.next()?;
    if argument.is_empty() || parts.next().is_some() {
        return None;
    }
    Some((first, second, argument.to_string(), count))
}
