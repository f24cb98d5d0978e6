//! CLI command implementations.

pub mod common;
pub mod lattice;
pub mod schedule;
pub mod version;
