//! Data model: typed events, chains, schemas and their scores.

pub mod chain;
pub mod entry;
pub mod event;
pub mod narrative;
pub mod score;
