//! Core data access for CoronaTracker.
//! Owns the country statistics table and the observable views the UI binds to.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::country::{sample_countries, Country, CountryValidationError};
pub use repo::country_repo::{CountryRepository, RepoError, RepoResult, SqliteCountryRepository};
pub use store::country_store::{AppContext, CountryStore, StoreError, StoreResult};
pub use store::observable::Observable;
pub use store::writer::PendingWrite;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
