//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the country table's data access contract.
//! - Isolate SQLite query details from the store and its callers.
//!
//! # Invariants
//! - Repository writes must enforce `Country::validate()` before persistence.
//! - A missing record is `Ok(None)` on reads and `NotFound` on writes.

pub mod country_repo;
