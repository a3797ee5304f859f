/// Pair generation: events of one chain that share a coreferent mention,
/// scored by PMI.

use rustc_hash::FxHashSet;
use std::path::Path;
use std::time::Instant;

use crate::core::buffer::{self, BufferError};
use crate::core::stats::Statistics;
use crate::schema::entry::{Entry, EventBlock, Pair};
use crate::schema::event::TypedDep;

/// Builds scored pairs over a fixed set of entries.
#[derive(Debug, Clone)]
pub struct PairBuilder {
    statistics: Statistics,
}

/// What a pair-building run produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairSummary {
    pub entries_read: usize,
    pub events_read: u64,
    pub entries_written: usize,
    pub pairs_written: usize,
}

impl PairBuilder {
    /// Gather corpus statistics from the entries.
    pub fn new(entries: &[Entry]) -> Self {
        Self {
            statistics: Statistics::from_entries(entries),
        }
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Pairs of one block: every unordered position pair `i < j` whose
    /// events share a mention id but differ in typed dependency, each
    /// `(key, key, mention)` combination scored once.
    pub fn block_pairs(&self, block: &EventBlock) -> Vec<Pair> {
        let mut seen: FxHashSet<(&TypedDep, &TypedDep, &str)> = FxHashSet::default();
        let mut pairs = Vec::new();
        let events = &block.events;
        for i in 0..events.len() {
            for j in (i + 1)..events.len() {
                let (e1, e2) = (&events[i], &events[j]);
                if e1.mention_id != e2.mention_id || e1 == e2 {
                    continue;
                }
                let (lo, hi) = if e1.typed_dep <= e2.typed_dep {
                    (&e1.typed_dep, &e2.typed_dep)
                } else {
                    (&e2.typed_dep, &e1.typed_dep)
                };
                if !seen.insert((lo, hi, e1.mention_id.as_str())) {
                    continue;
                }
                pairs.push(Pair {
                    first: e1.clone(),
                    second: e2.clone(),
                    pmi: self.statistics.pmi(&e1.typed_dep, &e2.typed_dep),
                });
            }
        }
        pairs
    }

    /// Pairs of every block of an entry, in block order.
    pub fn entry_pairs(&self, entry: &Entry) -> Vec<Pair> {
        entry.blocks.iter().flat_map(|b| self.block_pairs(b)).collect()
    }

    /// Pairs per entry; entries without pairs are left out.
    pub fn generate(&self, entries: &[Entry]) -> Vec<(String, Vec<Pair>)> {
        entries
            .iter()
            .map(|e| (e.id.clone(), self.entry_pairs(e)))
            .filter(|(_, pairs)| !pairs.is_empty())
            .collect()
    }
}

/// Read the chain buffer, score pairs and append them to the pair buffer.
pub fn build_pair_buffer(chain_buffer: &Path, pair_buffer: &Path) -> Result<PairSummary, BufferError> {
    let start = Instant::now();
    let entries = buffer::read_chain_buffer(chain_buffer)?;
    let builder = PairBuilder::new(&entries);
    log::info!(
        "read {} entries ({} events, {} event types) in {} ms",
        entries.len(),
        builder.statistics().absolute_count(),
        builder.statistics().distinct_events(),
        start.elapsed().as_millis()
    );

    let sections = builder.generate(&entries);
    let mut text = String::new();
    let mut pairs_written = 0;
    for (id, pairs) in &sections {
        pairs_written += pairs.len();
        text.push_str(&buffer::format_pair_section(id, pairs));
    }
    buffer::append(pair_buffer, &text)?;
    log::info!(
        "wrote {} pairs for {} entries to {}",
        pairs_written,
        sections.len(),
        pair_buffer.display()
    );

    Ok(PairSummary {
        entries_read: entries.len(),
        events_read: builder.statistics().absolute_count(),
        entries_written: sections.len(),
        pairs_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::event::TypedEvent;

    fn event(key: &str, arg: &str, id: &str) -> TypedEvent {
        TypedEvent::new(TypedDep::parse(key).unwrap(), arg, id, "d1")
    }

    fn entry(id: &str, blocks: Vec<Vec<TypedEvent>>) -> Entry {
        Entry {
            id: id.to_string(),
            blocks: blocks.into_iter().map(EventBlock::new).collect(),
        }
    }

    #[test]
    fn no_shared_mentions_no_pairs() {
        let e = entry(
            "d1",
            vec![vec![
                event("eat-s", "a", "A"),
                event("eat-o", "b", "B"),
                event("sell-s", "a2", "A2"),
                event("sell-o", "c", "C"),
            ]],
        );
        let builder = PairBuilder::new(std::slice::from_ref(&e));
        assert!(builder.entry_pairs(&e).is_empty());
        assert!(builder.generate(&[e]).is_empty());
    }

    #[test]
    fn shared_mention_pairs_once() {
        let e = entry(
            "d1",
            vec![vec![
                event("arrest-o", "smith", "X"),
                event("charge-o", "smith", "X"),
                event("arrest-o", "smith", "X"),
                event("plead-s", "smith", "X"),
            ]],
        );
        let builder = PairBuilder::new(std::slice::from_ref(&e));
        let pairs = builder.entry_pairs(&e);
        let keys: Vec<(String, String)> = pairs
            .iter()
            .map(|p| (p.first.typed_dep.to_string(), p.second.typed_dep.to_string()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("arrest-o".to_string(), "charge-o".to_string()),
                ("arrest-o".to_string(), "plead-s".to_string()),
                ("charge-o".to_string(), "plead-s".to_string()),
            ]
        );
        assert!(pairs.iter().all(|p| p.first.typed_dep != p.second.typed_dep));
        assert!(pairs.iter().all(|p| p.pmi.is_finite()));
    }

    #[test]
    fn pmi_matches_statistics() {
        let e = entry(
            "d1",
            vec![
                vec![event("charge-o", "smith", "X"), event("plead-s", "smith", "X")],
                vec![event("charge-o", "jones", "Y"), event("deny-s", "jones", "Y")],
            ],
        );
        let builder = PairBuilder::new(std::slice::from_ref(&e));
        let pairs = builder.entry_pairs(&e);
        assert_eq!(pairs.len(), 2);

        // 4 events; charge-o twice. 4 argument-sharing ordered pairs, one
        // of them (charge-o, plead-s).
        let expected = ((1.0_f64 / 4.0) / ((2.0 / 4.0) * (1.0 / 4.0))).ln();
        assert!((pairs[0].pmi - expected).abs() < 1e-12);
    }

    #[test]
    fn build_pair_buffer_writes_sections() {
        let dir = tempfile::tempdir().unwrap();
        let chains = dir.path().join("buffer");
        let out = dir.path().join("buffer_pairs");
        buffer::append(
            &chains,
            "d1;charge-o( smith ) [ X ]:plead-s( smith ) [ X ]:&!&\n\
             d2;eat-s( tom ) [ A ]:eat-o( cake ) [ B ]:&!&\n",
        )
        .unwrap();

        let summary = build_pair_buffer(&chains, &out).unwrap();
        assert_eq!(summary.entries_read, 2);
        assert_eq!(summary.events_read, 4);
        assert_eq!(summary.entries_written, 1);
        assert_eq!(summary.pairs_written, 1);

        let text = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "");
        assert_eq!(lines[1], "d1");
        assert!(lines[2].starts_with("charge-o\tplead-s\t"));
        assert!(lines[2].ends_with("|(smith)[X]:(smith)[X]|"));
        assert_eq!(lines.len(), 3);
    }
}
