/// Schema construction: event merging, purification, argument frequencies
/// and greedy growth of multi-chain schemas.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::core::buffer::PairRecord;
use crate::core::stats::{FrequencyTable, PmiTable};
use crate::schema::chain::Chain;
use crate::schema::event::{EventId, MergedEvent, RoleKind, TypedDep};
use crate::schema::narrative::{Schema, SchemaId};
use crate::schema::score::{first_max, GlobalScore, Score};

/// Tunable parameters of schema construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSettings {
    /// Weight of the log-frequency term in `sim`.
    pub lambda: f64,
    /// Score floor; placements at or below it open a new chain.
    pub beta: f64,
    /// Distinct verbs a schema needs to be accepted.
    pub schema_size: usize,
    /// Minimum `(e, e', a)` count kept in the frequency table.
    pub frequency_threshold: u64,
    /// Keep the preposition in `p_<prep>` roles instead of collapsing to `p`.
    pub use_full_prepositions: bool,
    pub shuffle: bool,
    /// Order the pool by descending occurrences; wins over `shuffle`.
    pub sort: bool,
    pub seed: u64,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            lambda: 0.08,
            beta: 0.2,
            schema_size: 6,
            frequency_threshold: 2,
            use_full_prepositions: false,
            shuffle: false,
            sort: false,
            seed: 0,
        }
    }
}

/// One event observation read from the pair buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub typed_dep: TypedDep,
    pub argument: String,
}

impl Observation {
    pub fn new(typed_dep: TypedDep, argument: impl Into<String>) -> Self {
        Self {
            typed_dep,
            argument: argument.into(),
        }
    }
}

/// Merge observations sharing a typed dependency, in first-seen order.
pub fn merge_events(observations: &[Observation], beta: f64) -> Vec<MergedEvent> {
    let mut index: FxHashMap<&TypedDep, usize> = FxHashMap::default();
    let mut merged: Vec<MergedEvent> = Vec::new();
    for obs in observations {
        match index.get(&obs.typed_dep).copied() {
            Some(i) => merged[i].absorb(obs.argument.as_str()),
            None => {
                index.insert(&obs.typed_dep, merged.len());
                merged.push(MergedEvent::new(obs.typed_dep.clone(), obs.argument.as_str(), beta));
            }
        }
    }
    merged
}

/// Which `(verb, role kind)` combinations exist among a set of events.
pub struct RoleIndex<'a> {
    present: FxHashSet<(&'a str, RoleKind)>,
}

impl<'a> RoleIndex<'a> {
    pub fn new(events: &'a [MergedEvent]) -> Self {
        Self {
            present: events
                .iter()
                .map(|e| (e.verb(), e.typed_dep.role.kind()))
                .collect(),
        }
    }

    /// Whether the verb of `event` is also seen with a complementary role.
    ///
    /// With `wanted` set, only that role kind counts; otherwise the role
    /// table applies (subject ↔ object, preposition → subject or object).
    pub fn has_complement(&self, event: &MergedEvent, wanted: Option<RoleKind>) -> bool {
        let verb = event.verb();
        match wanted {
            Some(kind) => self.present.contains(&(verb, kind)),
            None => event
                .typed_dep
                .role
                .kind()
                .complements()
                .iter()
                .any(|kind| self.present.contains(&(verb, *kind))),
        }
    }
}

/// Keep only events whose verb has both a subject and an object.
pub fn purify(events: Vec<MergedEvent>) -> Vec<MergedEvent> {
    let keep: Vec<bool> = {
        let index = RoleIndex::new(&events);
        events
            .iter()
            .map(|e| {
                index.has_complement(e, Some(RoleKind::Subject))
                    && index.has_complement(e, Some(RoleKind::Object))
            })
            .collect()
    };
    events
        .into_iter()
        .zip(keep)
        .filter_map(|(e, k)| k.then_some(e))
        .collect()
}

/// Count position pairs `p < q` with `p` from `firsts` and `q` from
/// `seconds`. Both slices are ascending.
fn ordered_pair_count(firsts: &[usize], seconds: &[usize]) -> u64 {
    let mut count = 0u64;
    let mut below = 0usize;
    for &q in seconds {
        while below < firsts.len() && firsts[below] < q {
            below += 1;
        }
        count += below as u64;
    }
    count
}

/// Greedy narrative schema builder over one pair buffer.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    settings: BuilderSettings,
    pmi: PmiTable,
    frequencies: FrequencyTable,
    observations: Vec<Observation>,
    /// Distinct role labels seen in the pair buffer.
    dependency_pool: Vec<String>,
    /// Merged, purified events; `EventId` indexes this arena.
    events: Vec<MergedEvent>,
    /// Pool order for seeding.
    order: Vec<EventId>,
    /// Tombstones of the active pool, indexed by `EventId`.
    active: Vec<bool>,
    next_schema_id: u64,
}

impl SchemaBuilder {
    /// Ingest pair records, then merge and purify their events.
    pub fn new(settings: BuilderSettings, records: &[PairRecord]) -> Self {
        let mut observations = Vec::with_capacity(records.len() * 2);
        let mut pmi = PmiTable::new();
        for record in records {
            let (first, second) = if settings.use_full_prepositions {
                (record.first.clone(), record.second.clone())
            } else {
                (record.first.collapsed(), record.second.collapsed())
            };
            observations.push(Observation::new(first.clone(), record.argument.as_str()));
            observations.push(Observation::new(second.clone(), record.argument.as_str()));
            pmi.insert(first, second, record.pmi);
        }
        Self::from_tables(settings, observations, pmi)
    }

    /// Build from observations and a PMI table prepared elsewhere.
    pub fn from_tables(settings: BuilderSettings, observations: Vec<Observation>, pmi: PmiTable) -> Self {
        let mut dependency_pool: Vec<String> = Vec::new();
        for obs in &observations {
            let label = obs.typed_dep.role.to_string();
            if !dependency_pool.contains(&label) {
                dependency_pool.push(label);
            }
        }
        let events = purify(merge_events(&observations, settings.beta));
        let mut builder = Self {
            settings,
            pmi,
            frequencies: FrequencyTable::new(),
            observations,
            dependency_pool,
            events,
            order: Vec::new(),
            active: Vec::new(),
            next_schema_id: 1,
        };
        builder.reset_pool();
        builder
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    pub fn events(&self) -> &[MergedEvent] {
        &self.events
    }

    pub fn dependency_pool(&self) -> &[String] {
        &self.dependency_pool
    }

    pub fn pmi_table(&self) -> &PmiTable {
        &self.pmi
    }

    pub fn frequencies(&self) -> &FrequencyTable {
        &self.frequencies
    }

    pub fn set_frequencies(&mut self, frequencies: FrequencyTable) {
        self.frequencies = frequencies;
    }

    /// Count, for every pair of purified events and every argument they
    /// share, how often that argument filled the first event's slot before
    /// the second's in the observation stream.
    pub fn compute_frequencies(&self) -> FrequencyTable {
        let start = Instant::now();
        let mut positions: FxHashMap<(&TypedDep, &str), Vec<usize>> = FxHashMap::default();
        for (p, obs) in self.observations.iter().enumerate() {
            positions
                .entry((&obs.typed_dep, obs.argument.as_str()))
                .or_default()
                .push(p);
        }

        let mut table = FrequencyTable::new();
        for (i, e1) in self.events.iter().enumerate() {
            for e2 in &self.events[i + 1..] {
                for argument in e2.arguments.iter().filter(|a| e1.arguments.contains(*a)) {
                    let key = argument.as_str();
                    let (Some(firsts), Some(seconds)) = (
                        positions.get(&(&e1.typed_dep, key)),
                        positions.get(&(&e2.typed_dep, key)),
                    ) else {
                        continue;
                    };
                    let count = ordered_pair_count(firsts, seconds);
                    if count >= self.settings.frequency_threshold {
                        table.insert(e1.typed_dep.clone(), e2.typed_dep.clone(), key, count);
                    }
                }
            }
        }
        log::info!(
            "computed {} argument frequencies over {} events in {} s",
            table.len(),
            self.events.len(),
            start.elapsed().as_secs()
        );
        table
    }

    /// `pmi(e1,e2) + lambda * ln(freq(e1,e2,a))`, or 0 without co-occurrence.
    pub fn sim(&self, e1: &TypedDep, e2: &TypedDep, argument: &str) -> f64 {
        let freq = self.frequencies.get_either(e1, e2, argument);
        if freq == 0 {
            return 0.0;
        }
        let pmi = self.pmi.get(e1, e2).unwrap_or(0.0);
        pmi + self.settings.lambda * (freq as f64).ln()
    }

    /// Internal coherence of a chain with respect to one argument.
    pub fn score(&self, chain: &Chain, argument: &str) -> f64 {
        let keys: Vec<&TypedDep> = chain
            .events
            .iter()
            .map(|id| &self.events[id.0].typed_dep)
            .collect();
        let mut sum = 0.0;
        for i in 0..keys.len() {
            for j in (i + 1)..keys.len() {
                sum += self.sim(keys[i], keys[j], argument);
            }
        }
        sum
    }

    /// How well `candidate` fits `chain` under its best shared argument.
    pub fn chainsim(&self, chain: &Chain, candidate: &TypedDep) -> f64 {
        let mut best: Option<f64> = None;
        for id in &chain.events {
            for argument in &self.events[id.0].arguments {
                let fit: f64 = chain
                    .events
                    .iter()
                    .map(|other| self.sim(&self.events[other.0].typed_dep, candidate, argument))
                    .sum();
                let total = self.score(chain, argument) + fit;
                if best.map_or(true, |b| total > b) {
                    best = Some(total);
                }
            }
        }
        best.unwrap_or(0.0)
    }

    /// Reinstate every event in the pool, shuffled or sorted as configured.
    pub fn reset_pool(&mut self) {
        self.order = (0..self.events.len()).map(EventId).collect();
        if self.settings.shuffle {
            let mut rng = StdRng::seed_from_u64(self.settings.seed);
            self.order.shuffle(&mut rng);
        }
        if self.settings.sort {
            let events = &self.events;
            self.order
                .sort_by(|a, b| events[b.0].occurrences.cmp(&events[a.0].occurrences));
        }
        self.active = vec![true; self.events.len()];
    }

    pub fn is_active(&self, id: EventId) -> bool {
        self.active.get(id.0).copied().unwrap_or(false)
    }

    pub fn active_count(&self) -> usize {
        self.active.iter().filter(|a| **a).count()
    }

    /// Active events of `verb`, in pool order.
    fn active_events_of(&self, verb: &str) -> Vec<EventId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.active[id.0] && self.events[id.0].verb() == verb)
            .collect()
    }

    /// Distinct verbs of the active pool, in pool order.
    fn active_verbs(&self) -> Vec<String> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut verbs = Vec::new();
        for id in &self.order {
            if !self.active[id.0] {
                continue;
            }
            let verb = self.events[id.0].verb();
            if seen.insert(verb) {
                verbs.push(verb.to_string());
            }
        }
        verbs
    }

    fn delete_verb(&mut self, verb: &str) {
        for (i, event) in self.events.iter().enumerate() {
            if event.verb() == verb {
                self.active[i] = false;
            }
        }
    }

    /// The best growth proposal for `schema`, if any beats the floor.
    fn best_proposal(&self, schema: &Schema) -> Option<GlobalScore> {
        let beta = self.settings.beta;
        let mut best: Option<GlobalScore> = None;
        for verb in self.active_verbs() {
            let mut subjects = Vec::new();
            let mut objects = Vec::new();
            let mut prepositions = Vec::new();
            for id in self.active_events_of(&verb) {
                let key = &self.events[id.0].typed_dep;
                for (j, chain) in schema.chains.iter().enumerate() {
                    let score = Score::new(id, j, self.chainsim(chain, key).max(beta));
                    match key.role.kind() {
                        RoleKind::Subject => subjects.push(score),
                        RoleKind::Object => objects.push(score),
                        RoleKind::Preposition => prepositions.push(score),
                    }
                }
            }
            let proposal = GlobalScore::combine(
                verb,
                first_max(&subjects),
                first_max(&objects),
                first_max(&prepositions),
                beta,
            );
            // Mathematically the sum clears 3 * beta iff a bucket clears beta;
            // checking both keeps rounding from admitting a flat proposal.
            let qualifies = proposal.score > 3.0 * beta
                && proposal.components().any(|s| s.score > beta);
            if qualifies && best.as_ref().map_or(true, |b| proposal.score > b.score) {
                best = Some(proposal);
            }
        }
        best
    }

    /// Place the components of the winning proposal into `schema`.
    fn apply(&mut self, schema: &mut Schema, best: &GlobalScore) {
        let beta = self.settings.beta;
        let shared_chain = matches!(
            (best.subject, best.object),
            (Some(s), Some(o)) if s.chain == o.chain
        );
        let slots = [
            (best.subject, shared_chain),
            (best.object, shared_chain),
            (best.preposition, false),
        ];
        for (component, skip) in slots {
            let Some(component) = component else {
                continue;
            };
            self.events[component.event.0].max_score = best.score;
            if skip || schema.contains(component.event) {
                continue;
            }
            let position = if component.score > beta {
                component.chain
            } else {
                schema.chain_count()
            };
            let chain = schema.add(component.event, position, &self.events);
            schema.chains[chain].add_score(component.score);
        }
    }

    /// Grow one schema from the active events of `verb`.
    pub fn build_schema(&mut self, verb: &str) -> Schema {
        let beta = self.settings.beta;
        let mut schema = Schema::new(SchemaId(self.next_schema_id));
        self.next_schema_id += 1;

        for (i, id) in self.active_events_of(verb).into_iter().enumerate() {
            self.events[id.0].max_score = beta;
            schema.add(id, i, &self.events);
        }
        self.delete_verb(verb);

        let max_iterations = self.settings.schema_size + 5;
        let mut iterations = 0;
        while schema.verb_count(&self.events) < self.settings.schema_size {
            if iterations >= max_iterations {
                log::debug!("schema {:?}: iteration cap reached", schema.id);
                break;
            }
            iterations += 1;
            let Some(best) = self.best_proposal(&schema) else {
                log::debug!("schema {:?}: no candidate above the floor", schema.id);
                break;
            };
            self.apply(&mut schema, &best);
            self.delete_verb(&best.verb);
        }
        schema
    }

    /// Whether a grown schema is kept.
    pub fn accepts(&self, schema: &Schema) -> bool {
        schema.verb_count(&self.events) >= self.settings.schema_size && schema.longest_chain_len() > 1
    }

    /// Seed a schema from every still-active event in pool order and
    /// return the accepted ones, best first.
    pub fn run(&mut self) -> Vec<Schema> {
        let start = Instant::now();
        self.reset_pool();
        let mut accepted = Vec::new();
        for idx in 0..self.order.len() {
            let id = self.order[idx];
            if !self.active[id.0] {
                continue;
            }
            let verb = self.events[id.0].verb().to_string();
            let schema = self.build_schema(&verb);
            log::debug!(
                "schema {:?} from '{}': {} verbs, score {:.3}",
                schema.id,
                verb,
                schema.verb_count(&self.events),
                schema.score
            );
            if self.accepts(&schema) {
                accepted.push(schema);
            }
        }
        accepted.sort_by(|a, b| b.score.total_cmp(&a.score));
        log::info!(
            "built {} schemas of size {} in {} s",
            accepted.len(),
            self.settings.schema_size,
            start.elapsed().as_secs()
        );
        accepted
    }

    /// Render schemas for the schema output file.
    pub fn render(&self, schemas: &[Schema]) -> String {
        schemas.iter().map(|s| s.render(&self.events)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn td(key: &str) -> TypedDep {
        TypedDep::parse(key).unwrap()
    }

    fn obs(key: &str, arg: &str) -> Observation {
        Observation::new(td(key), arg)
    }

    fn record(first: &str, second: &str, pmi: f64, arg: &str) -> PairRecord {
        PairRecord {
            first: td(first),
            second: td(second),
            pmi,
            argument: arg.to_string(),
        }
    }

    fn settings(schema_size: usize) -> BuilderSettings {
        BuilderSettings {
            schema_size,
            ..BuilderSettings::default()
        }
    }

    #[test]
    fn merge_collapses_mentions() {
        let merged = merge_events(
            &[obs("eat-s", "a"), obs("eat-s", "b"), obs("eat-s", "c"), obs("eat-o", "a")],
            0.2,
        );
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].arguments.len(), 3);
        assert_eq!(merged[0].occurrences, 3);
        assert_eq!(merged[1].typed_dep, td("eat-o"));
    }

    #[test]
    fn purify_needs_subject_and_object() {
        let merged = merge_events(
            &[
                obs("eat-s", "a"),
                obs("eat-o", "b"),
                obs("eat-p", "c"),
                obs("sleep-s", "a"),
                obs("find-o", "b"),
                obs("find-p", "d"),
            ],
            0.2,
        );
        let kept: Vec<String> = purify(merged).iter().map(|e| e.typed_dep.to_string()).collect();
        assert_eq!(kept, vec!["eat-s", "eat-o", "eat-p"]);
    }

    #[test]
    fn complement_lookup_follows_role_table() {
        let merged = merge_events(
            &[obs("sleep-s", "a"), obs("find-o", "b"), obs("find-p", "d"), obs("sit-p", "e"), obs("sit-s", "f")],
            0.2,
        );
        let index = RoleIndex::new(&merged);
        // sleep-s wants an object
        assert!(!index.has_complement(&merged[0], None));
        // find-o wants a subject
        assert!(!index.has_complement(&merged[1], None));
        // find-p accepts subject or object
        assert!(index.has_complement(&merged[2], None));
        assert!(index.has_complement(&merged[3], None));
        assert!(index.has_complement(&merged[3], Some(RoleKind::Subject)));
        assert!(!index.has_complement(&merged[3], Some(RoleKind::Object)));
    }

    #[test]
    fn ordered_pair_counting() {
        assert_eq!(ordered_pair_count(&[0, 4], &[1, 5]), 3);
        assert_eq!(ordered_pair_count(&[3], &[1]), 0);
        assert_eq!(ordered_pair_count(&[], &[1, 2]), 0);
    }

    #[test]
    fn records_collapse_prepositions_unless_full() {
        let records = [
            record("eat-s", "eat-p_with", 1.0, "tom"),
            record("eat-o", "eat-s", 1.0, "cake"),
        ];
        let collapsed = SchemaBuilder::new(settings(2), &records);
        assert_eq!(collapsed.dependency_pool(), &["s", "p", "o"]);
        assert_eq!(collapsed.pmi_table().get(&td("eat-s"), &td("eat-p")), Some(1.0));

        let full = SchemaBuilder::new(
            BuilderSettings {
                use_full_prepositions: true,
                ..settings(2)
            },
            &records,
        );
        assert_eq!(full.dependency_pool(), &["s", "p_with", "o"]);
        assert!(full.events().iter().any(|e| e.typed_dep == td("eat-p_with")));
    }

    #[test]
    fn frequencies_respect_order_and_threshold() {
        let observations = vec![
            obs("charge-o", "smith"),
            obs("charge-s", "police"),
            obs("plead-s", "smith"),
            obs("plead-o", "guilt"),
            obs("charge-o", "smith"),
            obs("plead-s", "smith"),
        ];
        let builder = SchemaBuilder::from_tables(settings(2), observations, PmiTable::new());
        let table = builder.compute_frequencies();
        // charge-o at 0 and 4, plead-s at 2 and 5: (0,2) (0,5) (4,5)
        assert_eq!(table.get(&td("charge-o"), &td("plead-s"), "smith"), 3);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn sim_matches_formula() {
        let mut pmi = PmiTable::new();
        let expected_pmi = ((2.0_f64 / 10.0) / (0.10 * 0.08)).ln();
        pmi.insert(td("charge-o"), td("plead-s"), expected_pmi);
        let mut builder = SchemaBuilder::from_tables(settings(2), Vec::new(), pmi);
        let mut freq = FrequencyTable::new();
        freq.insert(td("charge-o"), td("plead-s"), "x", 5);
        builder.set_frequencies(freq);

        let sim = builder.sim(&td("charge-o"), &td("plead-s"), "x");
        assert_eq!(sim, expected_pmi + 0.08 * 5.0_f64.ln());
        // Frequency is symmetric, PMI is not.
        assert_eq!(builder.sim(&td("plead-s"), &td("charge-o"), "x"), 0.08 * 5.0_f64.ln());
        assert_eq!(builder.sim(&td("charge-o"), &td("plead-s"), "y"), 0.0);
    }

    #[test]
    fn score_of_short_chains_is_zero() {
        let observations = vec![obs("eat-s", "a"), obs("eat-o", "b")];
        let mut builder = SchemaBuilder::from_tables(settings(2), observations, PmiTable::new());
        let mut freq = FrequencyTable::new();
        freq.insert(td("eat-s"), td("eat-o"), "a", 9);
        builder.set_frequencies(freq);

        let empty = Chain::new();
        let mut single = Chain::new();
        single.add(EventId(0));
        for arg in ["a", "b", "zzz"] {
            assert_eq!(builder.score(&empty, arg), 0.0);
            assert_eq!(builder.score(&single, arg), 0.0);
        }
        let mut pair = single.clone();
        pair.add(EventId(1));
        assert!(builder.score(&pair, "a") > 0.0);
    }

    #[test]
    fn chainsim_takes_best_argument() {
        let observations = vec![
            obs("arrest-s", "police"),
            obs("arrest-o", "smith"),
            obs("charge-s", "police"),
            obs("charge-o", "smith"),
        ];
        let mut pmi = PmiTable::new();
        pmi.insert(td("arrest-o"), td("charge-o"), 1.0);
        pmi.insert(td("arrest-s"), td("charge-s"), 0.5);
        let mut builder = SchemaBuilder::from_tables(settings(2), observations, pmi);
        let mut freq = FrequencyTable::new();
        freq.insert(td("arrest-o"), td("charge-o"), "smith", 4);
        freq.insert(td("arrest-s"), td("charge-s"), "police", 2);
        builder.set_frequencies(freq);

        let mut objects = Chain::new();
        objects.add(EventId(1));
        let fit = builder.chainsim(&objects, &td("charge-o"));
        assert!((fit - (1.0 + 0.08 * 4.0_f64.ln())).abs() < 1e-12);
        assert_eq!(builder.chainsim(&objects, &td("charge-s")), 0.0);
    }

    #[test]
    fn no_shared_arguments_no_schema() {
        let observations = vec![
            obs("eat-s", "A"),
            obs("eat-o", "B"),
            obs("sell-s", "A"),
            obs("sell-o", "C"),
        ];
        let mut builder = SchemaBuilder::from_tables(settings(2), observations, PmiTable::new());
        let freq = builder.compute_frequencies();
        assert!(freq.is_empty());
        builder.set_frequencies(freq);
        assert!(builder.run().is_empty());
        assert_eq!(builder.active_count(), 0);
    }

    #[test]
    fn growth_stops_at_iteration_cap() {
        // Every candidate verb puts subject and object on the same chain,
        // so each round removes a verb without growing the schema.
        let mut observations = vec![obs("root-s", "x"), obs("root-o", "y")];
        let mut pmi = PmiTable::new();
        let mut freq = FrequencyTable::new();
        for k in 0..10 {
            for role in ["s", "o"] {
                let key = format!("v{}-{}", k, role);
                observations.push(obs(&key, "x"));
                pmi.insert(td("root-s"), td(&key), 2.0);
                freq.insert(td("root-s"), td(&key), "x", 3);
            }
        }
        let mut builder = SchemaBuilder::from_tables(settings(2), observations, pmi);
        builder.set_frequencies(freq);

        let schema = builder.build_schema("root");
        assert_eq!(schema.verb_count(builder.events()), 1);
        // 2 + 5 rounds remove seven of the ten candidate verbs.
        assert_eq!(builder.active_count(), 6);
    }

    fn court_builder(schema_size: usize) -> SchemaBuilder {
        let mut observations = Vec::new();
        let mut pmi = PmiTable::new();
        let mut freq = FrequencyTable::new();
        for (a, b) in [("arrest", "charge"), ("arrest", "convict"), ("charge", "convict")] {
            for role in ["s", "o"] {
                let (k1, k2) = (format!("{}-{}", a, role), format!("{}-{}", b, role));
                let arg = if role == "s" { "police" } else { "suspect" };
                observations.push(obs(&k1, arg));
                observations.push(obs(&k2, arg));
                pmi.insert(td(&k1), td(&k2), 2.0);
                freq.insert(td(&k1), td(&k2), arg, 3);
            }
        }
        let mut builder = SchemaBuilder::from_tables(settings(schema_size), observations, pmi);
        builder.set_frequencies(freq);
        builder
    }

    #[test]
    fn grows_schema_with_shared_protagonists() {
        let mut builder = court_builder(3);
        let schemas = builder.run();
        assert_eq!(schemas.len(), 1);
        let schema = &schemas[0];
        assert_eq!(schema.verb_count(builder.events()), 3);
        assert_eq!(schema.chain_count(), 2);
        assert_eq!(schema.longest_chain_len(), 3);
        assert_eq!(schema.id, SchemaId(1));

        let text = builder.render(&schemas);
        assert!(text.starts_with("*****\nscore="));
        assert!(text.contains("[ arrest-s charge-s convict-s ] ( police )"));
        assert!(text.contains("[ arrest-o charge-o convict-o ] ( suspect )"));
    }

    #[test]
    fn undersized_schemas_are_rejected() {
        for (shuffle, sort) in [(false, false), (true, false), (false, true), (true, true)] {
            let mut builder = court_builder(4);
            builder.settings.shuffle = shuffle;
            builder.settings.sort = sort;
            builder.settings.seed = 7;
            let schemas = builder.run();
            assert!(schemas.is_empty());
        }
    }

    #[test]
    fn schema_ids_increase() {
        let mut builder = court_builder(3);
        let first = builder.build_schema("arrest");
        builder.reset_pool();
        let second = builder.build_schema("charge");
        assert!(second.id > first.id);
    }

    #[test]
    fn seeding_removes_verb_from_pool() {
        let mut builder = court_builder(3);
        let before = builder.active_count();
        let schema = builder.build_schema("convict");
        assert!(builder.active_count() < before);
        assert!(builder
            .events()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.verb() == "convict")
            .all(|(i, _)| !builder.is_active(EventId(i))));
        assert!(schema.verb_count(builder.events()) >= 1);
    }
}
