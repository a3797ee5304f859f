use super::event::EventId;

/// A candidate placement: an event scored against one chain of a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub event: EventId,
    pub chain: usize,
    pub score: f64,
}

impl Score {
    pub fn new(event: EventId, chain: usize, score: f64) -> Self {
        Self {
            event,
            chain,
            score,
        }
    }
}

/// Keep the first maximum, matching a left-to-right scan.
pub fn first_max(scores: &[Score]) -> Option<Score> {
    let mut best: Option<Score> = None;
    for s in scores {
        match best {
            Some(b) if s.score <= b.score => {}
            _ => best = Some(*s),
        }
    }
    best
}

/// The best placement of one verb, per role bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalScore {
    pub score: f64,
    pub verb: String,
    pub subject: Option<Score>,
    pub object: Option<Score>,
    pub preposition: Option<Score>,
}

impl GlobalScore {
    /// Combine bucket maxima; an empty bucket contributes `beta`.
    pub fn combine(
        verb: impl Into<String>,
        subject: Option<Score>,
        object: Option<Score>,
        preposition: Option<Score>,
        beta: f64,
    ) -> Self {
        let part = |s: &Option<Score>| s.map_or(beta, |s| s.score);
        Self {
            score: part(&subject) + part(&object) + part(&preposition),
            verb: verb.into(),
            subject,
            object,
            preposition,
        }
    }

    /// Components in deletion precedence order: subject, object, preposition.
    pub fn components(&self) -> impl Iterator<Item = &Score> {
        self.subject
            .iter()
            .chain(self.object.iter())
            .chain(self.preposition.iter())
    }
}
