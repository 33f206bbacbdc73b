//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose country list/detail reads and add/update/delete writes to Dart.
//! - Bind every call to the process-wide `CountryStore`.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Sync calls only read in-memory snapshots of an already-open store; they
//!   never open a database or wait on the writer.
//! - Store setup and writes are async calls. They run on the bridge's worker
//!   pool and return once the background writer reports the outcome.

use coronatracker_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    sample_countries, AppContext, Country, CountryStore,
};
use log::warn;

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Opens the process-wide store at `db_path`.
///
/// # FFI contract
/// - Must run before any `country_*` call to take effect; the first store
///   access fixes the location for the process lifetime.
/// - Returns empty string on success and error message on failure.
pub fn configure_store(db_path: String) -> String {
    let trimmed = db_path.trim();
    if trimmed.is_empty() {
        return "db_path cannot be empty".to_string();
    }
    let context = AppContext::with_db_path(trimmed);
    match CountryStore::get_instance(&context) {
        Ok(store) if store.context() != &context => {
            format!("store already open; requested location `{trimmed}` was ignored")
        }
        Ok(_) => String::new(),
        Err(err) => format!("configure_store failed: {err}"),
    }
}

/// One country row for list and detail screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryItem {
    pub name: String,
    pub code: String,
    pub confirmed: u64,
    pub deaths: u64,
}

/// Response envelope for the country list screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryListResponse {
    pub ok: bool,
    /// Countries ordered by name, then code.
    pub items: Vec<CountryItem>,
    pub message: String,
}

/// Response envelope for a single-country lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLookupResponse {
    pub ok: bool,
    /// `None` when no country has the requested code.
    pub item: Option<CountryItem>,
    pub message: String,
}

/// Generic action response envelope for write calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryActionResponse {
    pub ok: bool,
    /// Affected country code on success.
    pub code: Option<String>,
    pub message: String,
}

impl CountryActionResponse {
    fn success(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            ok: true,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            code: None,
            message: message.into(),
        }
    }
}

/// Returns the current full country list.
///
/// # FFI contract
/// - Sync call; fails with a message when `configure_store` has not run.
#[flutter_rust_bridge::frb(sync)]
pub fn country_list() -> CountryListResponse {
    match opened_store(CountryStore::instance()) {
        Ok(store) => {
            let items = store
                .get_all()
                .get()
                .into_iter()
                .map(to_country_item)
                .collect::<Vec<_>>();
            let message = if items.is_empty() {
                "No countries.".to_string()
            } else {
                format!("Found {} countr(ies).", items.len())
            };
            CountryListResponse {
                ok: true,
                items,
                message,
            }
        }
        Err(message) => CountryListResponse {
            ok: false,
            items: Vec::new(),
            message: format!("country_list failed: {message}"),
        },
    }
}

/// Looks up one country by code; a missing code is not an error.
#[flutter_rust_bridge::frb(sync)]
pub fn country_get(code: String) -> CountryLookupResponse {
    match opened_store(CountryStore::instance()) {
        Ok(store) => {
            let item = store.get_by_code(code.trim()).get().map(to_country_item);
            let message = if item.is_some() {
                "Found.".to_string()
            } else {
                "Not found.".to_string()
            };
            CountryLookupResponse {
                ok: true,
                item,
                message,
            }
        }
        Err(message) => CountryLookupResponse {
            ok: false,
            item: None,
            message: format!("country_get failed: {message}"),
        },
    }
}

/// Adds a new country record.
pub fn country_add(
    name: String,
    code: String,
    confirmed: u64,
    deaths: u64,
) -> CountryActionResponse {
    let country = to_country(name, code, confirmed, deaths);
    with_store("country_add", "Country added.", country, |store, country| {
        store.add(country).wait()
    })
}

/// Replaces every field of an existing country record.
pub fn country_update(
    name: String,
    code: String,
    confirmed: u64,
    deaths: u64,
) -> CountryActionResponse {
    let country = to_country(name, code, confirmed, deaths);
    with_store(
        "country_update",
        "Country updated.",
        country,
        |store, country| store.update(country).wait(),
    )
}

/// Deletes the country with `code`.
pub fn country_delete(code: String) -> CountryActionResponse {
    let code = code.trim().to_string();
    let store = match store() {
        Ok(store) => store,
        Err(message) => {
            return CountryActionResponse::failure(format!("country_delete failed: {message}"))
        }
    };
    let Some(country) = store.get_by_code(&code).get() else {
        return CountryActionResponse::failure(format!(
            "country_delete failed: country not found: {code}"
        ));
    };
    match store.delete(country).wait() {
        Ok(()) => CountryActionResponse::success("Country deleted.", code),
        Err(err) => CountryActionResponse::failure(format!("country_delete failed: {err}")),
    }
}

/// Inserts the bundled demo countries whose codes are not present yet.
pub fn country_seed_samples() -> CountryActionResponse {
    let store = match store() {
        Ok(store) => store,
        Err(message) => {
            return CountryActionResponse::failure(format!(
                "country_seed_samples failed: {message}"
            ))
        }
    };

    let existing = store.get_all().get();
    let pending = sample_countries()
        .into_iter()
        .filter(|sample| !existing.iter().any(|country| country.code == sample.code))
        .map(|sample| store.add(sample))
        .collect::<Vec<_>>();

    let mut seeded = 0_usize;
    for write in pending {
        match write.wait() {
            Ok(()) => seeded += 1,
            Err(err) => warn!("event=ffi_seed module=ffi status=error error={err}"),
        }
    }
    CountryActionResponse {
        ok: true,
        code: None,
        message: format!("Seeded {seeded} countr(ies)."),
    }
}

fn opened_store(
    instance: Option<&'static CountryStore>,
) -> Result<&'static CountryStore, String> {
    instance.ok_or_else(|| "store not open; call configure_store first".to_string())
}

fn store() -> Result<&'static CountryStore, String> {
    if let Some(store) = CountryStore::instance() {
        return Ok(store);
    }
    CountryStore::get_instance(&AppContext::from_env(std::env::temp_dir()))
        .map_err(|err| err.to_string())
}

fn with_store(
    operation: &str,
    success_message: &str,
    country: Country,
    write: impl FnOnce(&CountryStore, Country) -> coronatracker_core::StoreResult<()>,
) -> CountryActionResponse {
    let store = match store() {
        Ok(store) => store,
        Err(message) => {
            return CountryActionResponse::failure(format!("{operation} failed: {message}"))
        }
    };
    let code = country.code.clone();
    match write(store, country) {
        Ok(()) => CountryActionResponse::success(success_message, code),
        Err(err) => CountryActionResponse::failure(format!("{operation} failed: {err}")),
    }
}

fn to_country(name: String, code: String, confirmed: u64, deaths: u64) -> Country {
    Country::new(name.trim(), code.trim(), confirmed, deaths)
}

fn to_country_item(country: Country) -> CountryItem {
    CountryItem {
        name: country.name,
        code: country.code,
        confirmed: country.confirmed,
        deaths: country.deaths,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        configure_store, core_version, country_add, country_delete, country_get, country_list,
        country_seed_samples, country_update, init_logging, opened_store, ping,
    };
    use std::sync::OnceLock;
    use tempfile::TempDir;

    static TEST_DATA_DIR: OnceLock<TempDir> = OnceLock::new();

    fn use_test_store() {
        let dir = TEST_DATA_DIR.get_or_init(|| tempfile::tempdir().expect("create temp dir"));
        let path = dir.path().join("ffi-test.sqlite3");
        let message = configure_store(path.to_string_lossy().into_owned());
        assert!(message.is_empty(), "{message}");
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn configure_store_rejects_empty_path() {
        assert!(!configure_store("  ".to_string()).is_empty());
    }

    #[test]
    fn sync_reads_require_an_open_store() {
        let err = opened_store(None).unwrap_err();
        assert!(err.contains("configure_store"), "{err}");
    }

    #[test]
    fn sync_reads_use_the_open_store() {
        use_test_store();

        let listed = country_list();
        assert!(listed.ok, "{}", listed.message);
        let missing = country_get("FZZ".to_string());
        assert!(missing.ok, "{}", missing.message);
        assert!(missing.item.is_none());
    }

    #[test]
    fn add_update_delete_roundtrip() {
        use_test_store();

        let added = country_add(" Canada ".to_string(), "FCA".to_string(), 142_866, 9_248);
        assert!(added.ok, "{}", added.message);
        assert_eq!(added.code.as_deref(), Some("FCA"));

        let found = country_get("FCA".to_string());
        assert_eq!(
            found.item.as_ref().map(|item| item.name.as_str()),
            Some("Canada")
        );

        let updated = country_update("Canada".to_string(), "FCA".to_string(), 150_000, 9_500);
        assert!(updated.ok, "{}", updated.message);
        let found = country_get("FCA".to_string());
        assert_eq!(found.item.map(|item| item.confirmed), Some(150_000));

        let deleted = country_delete("FCA".to_string());
        assert!(deleted.ok, "{}", deleted.message);
        let missing = country_get("FCA".to_string());
        assert!(missing.ok);
        assert!(missing.item.is_none());
    }

    #[test]
    fn write_failures_are_reported() {
        use_test_store();

        let duplicate_first = country_add("Denmark".to_string(), "FDK".to_string(), 1, 1);
        assert!(duplicate_first.ok, "{}", duplicate_first.message);
        let duplicate = country_add("Denmark".to_string(), "FDK".to_string(), 1, 1);
        assert!(!duplicate.ok);
        assert!(duplicate.message.contains("already exists"));

        let missing = country_update("Nowhere".to_string(), "FXX".to_string(), 1, 1);
        assert!(!missing.ok);
        assert!(missing.message.contains("not found"));

        let invalid = country_add("Bad".to_string(), "bad code".to_string(), 1, 1);
        assert!(!invalid.ok);

        let delete_missing = country_delete("FYY".to_string());
        assert!(!delete_missing.ok);
    }

    #[test]
    fn seed_samples_fills_list_once() {
        use_test_store();

        let seeded = country_seed_samples();
        assert!(seeded.ok, "{}", seeded.message);
        country_seed_samples();

        let listed = country_list();
        assert!(listed.ok);
        let us_rows = listed.items.iter().filter(|item| item.code == "US").count();
        assert_eq!(us_rows, 1);
    }
}
