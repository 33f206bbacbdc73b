//! Flutter-facing bindings for the CoronaTracker core.

pub mod api;
