//! Country store: the single access point to the persisted country table.
//!
//! # Responsibility
//! - Open the table from an [`AppContext`] and capture the full-table view.
//! - Translate reads into [`Observable`] views and writes into queued
//!   background operations with a completion signal.
//!
//! # Invariants
//! - At most one process-wide instance exists behind `get_instance`; its
//!   initialization is synchronized.
//! - `get_all()` always returns a handle to the same channel.
//! - Reads never perform storage I/O on the caller's thread.

use super::feed::ChangeFeed;
use super::observable::Observable;
use super::writer::{PendingWrite, WriteOp, Writer};
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::country::{validate_code, Country};
use crate::repo::country_repo::{CountryRepository, RepoError, SqliteCountryRepository};
use log::{info, warn};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment override for the database file location.
pub const DB_PATH_ENV: &str = "CORONATRACKER_DB_PATH";
/// Database file name placed inside an application data directory.
pub const DB_FILE_NAME: &str = "coronatracker.sqlite3";

static INSTANCE: OnceCell<CountryStore> = OnceCell::new();

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Opening or migrating the database failed.
    Open(DbError),
    Repo(RepoError),
    /// The background writer is gone; the write was not applied.
    WriterClosed,
    /// The background writer thread could not be started.
    Spawn(std::io::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(err) => write!(f, "failed to open country store: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::WriterClosed => write!(f, "country store writer is closed"),
            Self::Spawn(err) => write!(f, "failed to start country store writer: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Open(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::WriterClosed => None,
            Self::Spawn(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Open(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Where the application keeps its country database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    location: DbLocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DbLocation {
    File(PathBuf),
    Memory,
}

impl AppContext {
    /// Places the database at `<data_dir>/coronatracker.sqlite3`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self::with_db_path(data_dir.as_ref().join(DB_FILE_NAME))
    }

    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            location: DbLocation::File(db_path.into()),
        }
    }

    /// Non-persistent store, mainly for tests and previews.
    pub fn in_memory() -> Self {
        Self {
            location: DbLocation::Memory,
        }
    }

    /// Uses `CORONATRACKER_DB_PATH` when set and non-empty, otherwise
    /// `fallback_dir`.
    pub fn from_env(fallback_dir: impl AsRef<Path>) -> Self {
        match std::env::var(DB_PATH_ENV) {
            Ok(raw) if !raw.trim().is_empty() => Self::with_db_path(raw.trim()),
            _ => Self::new(fallback_dir),
        }
    }

    /// Database file path, `None` for in-memory contexts.
    pub fn db_path(&self) -> Option<&Path> {
        match &self.location {
            DbLocation::File(path) => Some(path.as_path()),
            DbLocation::Memory => None,
        }
    }

    fn describe(&self) -> String {
        match &self.location {
            DbLocation::File(path) => path.display().to_string(),
            DbLocation::Memory => ":memory:".to_string(),
        }
    }
}

/// Access point for country statistics.
///
/// Reads return push-updated views; writes are applied in submission order
/// by one background thread and report their outcome through
/// [`PendingWrite`].
pub struct CountryStore {
    context: AppContext,
    feed: Arc<ChangeFeed>,
    writer: Writer,
}

impl std::fmt::Debug for CountryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountryStore")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl CountryStore {
    /// Opens (or creates) the store described by `context`.
    ///
    /// The returned value is independent of the process-wide instance and
    /// stops its writer thread when dropped, after pending writes drain.
    ///
    /// # Errors
    /// - `StoreError::Open` when the database cannot be opened or migrated.
    /// - `StoreError::Repo` when the initial snapshot cannot be read.
    /// - `StoreError::Spawn` when the writer thread cannot start.
    pub fn open(context: &AppContext) -> StoreResult<Self> {
        let conn = match &context.location {
            DbLocation::File(path) => open_db(path)?,
            DbLocation::Memory => open_db_in_memory()?,
        };

        let initial = SqliteCountryRepository::try_new(&conn)?.list_countries()?;
        info!(
            "event=store_open module=store status=ok rows={} location={}",
            initial.len(),
            context.describe()
        );

        let feed = Arc::new(ChangeFeed::new(initial));
        let writer = Writer::spawn(conn, Arc::clone(&feed))?;
        Ok(Self {
            context: context.clone(),
            feed,
            writer,
        })
    }

    /// Returns the process-wide store, opening it on first call.
    ///
    /// Only the first successful call's `context` is used. Later calls with a
    /// different context get the existing instance and a warning is logged.
    /// A failed first open leaves nothing behind, so the next call retries.
    pub fn get_instance(context: &AppContext) -> StoreResult<&'static CountryStore> {
        let store = INSTANCE.get_or_try_init(|| Self::open(context))?;
        if store.context != *context {
            warn!(
                "event=store_instance module=store status=ok note=context_ignored active={} requested={}",
                store.context.describe(),
                context.describe()
            );
        }
        Ok(store)
    }

    /// Returns the process-wide store if it has been opened.
    pub fn instance() -> Option<&'static CountryStore> {
        INSTANCE.get()
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// View over every record, ordered by name then code.
    pub fn get_all(&self) -> Observable<Vec<Country>> {
        self.feed.all()
    }

    /// View over one record; holds `None` while no record has `code`.
    pub fn get_by_code(&self, code: &str) -> Observable<Option<Country>> {
        self.feed.by_code(code)
    }

    /// Queues an insert. Fails with `RepoError::DuplicateCode` if the code exists.
    pub fn add(&self, country: Country) -> PendingWrite {
        if let Err(err) = country.validate() {
            return Writer::rejected(RepoError::from(err).into());
        }
        self.writer.submit(WriteOp::Insert(country))
    }

    /// Queues a full-record replace keyed by `country.code`.
    pub fn update(&self, country: Country) -> PendingWrite {
        if let Err(err) = country.validate() {
            return Writer::rejected(RepoError::from(err).into());
        }
        self.writer.submit(WriteOp::Update(country))
    }

    /// Queues removal of the record keyed by `country.code`.
    pub fn delete(&self, country: Country) -> PendingWrite {
        if let Err(err) = validate_code(&country.code) {
            return Writer::rejected(RepoError::from(err).into());
        }
        self.writer.submit(WriteOp::Delete(country))
    }

    /// Re-reads the table and republishes every view.
    ///
    /// Needed only when rows were changed through another connection.
    pub fn refresh(&self) -> PendingWrite {
        self.writer.submit(WriteOp::Refresh)
    }
}
