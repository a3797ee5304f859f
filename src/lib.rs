//! Narrative Schemas: unsupervised induction of narrative schemas.
//!
//! Learns multi-role event structures from coreference-resolved text in
//! three staged passes: entity chain extraction, PMI scoring of event
//! pairs that share a participant, and greedy growth of schemas.

pub mod core;
pub mod schema;
