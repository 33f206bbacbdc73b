//! Process-facing access to the country table.
//!
//! # Responsibility
//! - Serve reads as push-updated [`observable::Observable`] views.
//! - Funnel every mutation through one background writer thread.
//!
//! # Invariants
//! - Only the writer thread touches the read/write connection after open.
//! - Views are republished after a mutation commits and before its
//!   completion is reported.

pub mod country_store;
mod feed;
pub mod observable;
pub mod writer;
