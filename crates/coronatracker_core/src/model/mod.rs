//! Domain model for country statistics.
//!
//! # Invariants
//! - Every record is identified by its country `code`.
//! - Each code maps to at most one current record; no history is kept.

pub mod country;
