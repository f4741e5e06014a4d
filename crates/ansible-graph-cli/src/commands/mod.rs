//! CLI command implementations.

pub mod scrape;
pub mod serve;
