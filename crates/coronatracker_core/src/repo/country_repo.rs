//! Country repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `countries` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths call `Country::validate()` before SQL mutations.
//! - Single-row reads reject invalid persisted rows with `InvalidData`.
//! - List reads skip invalid rows with a warning, so one bad row from an
//!   external writer cannot hide the rest of the table.
//! - List order is stable: name (case-insensitive), then code.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::country::{validate_code, Country, CountryValidationError};
use log::warn;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const COUNTRY_SELECT_SQL: &str = "SELECT code, name, confirmed, deaths FROM countries";
const REQUIRED_COLUMNS: &[&str] = &["code", "name", "confirmed", "deaths", "updated_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for country persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(CountryValidationError),
    Db(DbError),
    /// No row exists for the given code.
    NotFound(String),
    /// A row with the given code already exists.
    DuplicateCode(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(code) => write!(f, "country not found: {code}"),
            Self::DuplicateCode(code) => write!(f, "country already exists: {code}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "country repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "country repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "country repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted country data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CountryValidationError> for RepoError {
    fn from(value: CountryValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for country CRUD operations.
pub trait CountryRepository {
    /// Inserts a new record; fails with `DuplicateCode` when the code exists.
    fn insert_country(&self, country: &Country) -> RepoResult<()>;
    /// Replaces every field of the record keyed by `country.code`.
    fn update_country(&self, country: &Country) -> RepoResult<()>;
    /// Removes the record keyed by `country.code`.
    fn delete_country(&self, country: &Country) -> RepoResult<()>;
    fn get_country(&self, code: &str) -> RepoResult<Option<Country>>;
    /// Lists valid rows; rows failing `Country::validate()` are skipped.
    fn list_countries(&self) -> RepoResult<Vec<Country>>;
}

/// SQLite-backed country repository.
pub struct SqliteCountryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCountryRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_country_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl CountryRepository for SqliteCountryRepository<'_> {
    fn insert_country(&self, country: &Country) -> RepoResult<()> {
        country.validate()?;

        let result = self.conn.execute(
            "INSERT INTO countries (code, name, confirmed, deaths)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                country.code.as_str(),
                country.name.as_str(),
                count_to_db(country.confirmed, "confirmed")?,
                count_to_db(country.deaths, "deaths")?,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_primary_key_violation(&err) => {
                Err(RepoError::DuplicateCode(country.code.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_country(&self, country: &Country) -> RepoResult<()> {
        country.validate()?;

        let changed = self.conn.execute(
            "UPDATE countries
             SET
                name = ?1,
                confirmed = ?2,
                deaths = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE code = ?4;",
            params![
                country.name.as_str(),
                count_to_db(country.confirmed, "confirmed")?,
                count_to_db(country.deaths, "deaths")?,
                country.code.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(country.code.clone()));
        }

        Ok(())
    }

    fn delete_country(&self, country: &Country) -> RepoResult<()> {
        validate_code(&country.code)?;

        let changed = self.conn.execute(
            "DELETE FROM countries WHERE code = ?1;",
            [country.code.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(country.code.clone()));
        }

        Ok(())
    }

    fn get_country(&self, code: &str) -> RepoResult<Option<Country>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUNTRY_SELECT_SQL} WHERE code = ?1;"))?;
        let mut rows = stmt.query([code])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_country_row(row)?));
        }
        Ok(None)
    }

    fn list_countries(&self) -> RepoResult<Vec<Country>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COUNTRY_SELECT_SQL} ORDER BY name COLLATE NOCASE ASC, code ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut countries = Vec::new();
        while let Some(row) = rows.next()? {
            match parse_country_row(row) {
                Ok(country) => countries.push(country),
                Err(RepoError::InvalidData(message)) => {
                    warn!(
                        "event=country_list module=repo status=skipped error_code=invalid_row error={message}"
                    );
                }
                Err(err) => return Err(err),
            }
        }
        Ok(countries)
    }
}

fn parse_country_row(row: &Row<'_>) -> RepoResult<Country> {
    let code: String = row.get("code")?;
    let confirmed = count_from_db(row.get("confirmed")?, "confirmed", &code)?;
    let deaths = count_from_db(row.get("deaths")?, "deaths", &code)?;

    let country = Country {
        name: row.get("name")?,
        code,
        confirmed,
        deaths,
    };
    country
        .validate()
        .map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Ok(country)
}

fn count_to_db(value: u64, column: &str) -> RepoResult<i64> {
    i64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!("{column} value {value} exceeds storage range"))
    })
}

fn count_from_db(value: i64, column: &str, code: &str) -> RepoResult<u64> {
    u64::try_from(value).map_err(|_| {
        RepoError::InvalidData(format!(
            "negative {column} value `{value}` for country `{code}`"
        ))
    })
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation
                && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn ensure_country_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'countries';",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !table_exists {
        return Err(RepoError::MissingRequiredTable("countries"));
    }

    let mut stmt = conn.prepare("PRAGMA table_info(countries);")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<Vec<_>, _>>()?;
    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "countries",
                column,
            });
        }
    }

    Ok(())
}
