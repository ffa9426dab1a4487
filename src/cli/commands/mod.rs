//! CLI command implementations

pub mod config;
pub mod load;
pub mod plan;
