pub mod annotation;
pub mod buffer;
pub mod builder;
pub mod config;
pub mod extractor;
pub mod pairs;
pub mod pipeline;
pub mod stats;
