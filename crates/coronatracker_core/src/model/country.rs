//! Country statistics record.
//!
//! # Responsibility
//! - Define the record shared by the list and detail screens.
//! - Validate records before they reach persistence.
//!
//! # Invariants
//! - `code` is the natural key: non-empty, ASCII alphanumeric, at most
//!   `MAX_CODE_LEN` characters.
//! - `name` is never blank.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Longest accepted country code.
pub const MAX_CODE_LEN: usize = 8;

/// Observed case statistics for one country.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Country {
    /// Display name, e.g. `Canada`.
    pub name: String,
    /// Short unique code, e.g. `CA`.
    pub code: String,
    /// Confirmed case count.
    pub confirmed: u64,
    /// Death count.
    pub deaths: u64,
}

/// Validation failures for [`Country`] records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryValidationError {
    EmptyCode,
    InvalidCode(String),
    EmptyName { code: String },
}

impl Display for CountryValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCode => write!(f, "country code cannot be empty"),
            Self::InvalidCode(code) => write!(
                f,
                "invalid country code `{code}`; expected 1-{MAX_CODE_LEN} ASCII letters or digits"
            ),
            Self::EmptyName { code } => write!(f, "country `{code}` must have a name"),
        }
    }
}

impl Error for CountryValidationError {}

impl Country {
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        confirmed: u64,
        deaths: u64,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            confirmed,
            deaths,
        }
    }

    /// Checks the record invariants without touching storage.
    pub fn validate(&self) -> Result<(), CountryValidationError> {
        validate_code(&self.code)?;
        if self.name.trim().is_empty() {
            return Err(CountryValidationError::EmptyName {
                code: self.code.clone(),
            });
        }
        Ok(())
    }
}

/// Validates a lookup/primary key on its own.
pub fn validate_code(code: &str) -> Result<(), CountryValidationError> {
    if code.trim().is_empty() {
        return Err(CountryValidationError::EmptyCode);
    }
    if code.chars().count() > MAX_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CountryValidationError::InvalidCode(code.to_string()));
    }
    Ok(())
}

/// Demo data shipped with the app for first-run screens.
pub fn sample_countries() -> Vec<Country> {
    [
        ("Canada", "CA", 142_866, 9_248),
        ("China", "CN", 90_294, 4_736),
        ("Denmark", "DK", 21_836, 635),
        ("Germany", "DE", 269_048, 9_376),
        ("Finland", "FI", 8_799, 339),
        ("India", "IN", 5_118_253, 83_198),
        ("Japan", "JP", 77_488, 1_490),
        ("Norway", "NO", 12_644, 266),
        ("Russia", "RU", 1_081_152, 18_996),
        ("Sweden", "SE", 87_885, 5_864),
        ("USA", "US", 6_674_411, 197_633),
    ]
    .into_iter()
    .map(|(name, code, confirmed, deaths)| Country::new(name, code, confirmed, deaths))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::{sample_countries, validate_code, Country, CountryValidationError};
    use std::collections::HashSet;

    #[test]
    fn validate_accepts_regular_record() {
        let canada = Country::new("Canada", "CA", 142_866, 9_248);
        assert!(canada.validate().is_ok());
    }

    #[test]
    fn validate_rejects_blank_name() {
        let err = Country::new("  ", "CA", 1, 0).validate().unwrap_err();
        assert_eq!(
            err,
            CountryValidationError::EmptyName {
                code: "CA".to_string()
            }
        );
    }

    #[test]
    fn validate_code_rejects_whitespace_and_long_codes() {
        assert_eq!(validate_code(""), Err(CountryValidationError::EmptyCode));
        assert_eq!(validate_code("  "), Err(CountryValidationError::EmptyCode));
        assert_eq!(validate_code("\t"), Err(CountryValidationError::EmptyCode));
        assert!(matches!(
            validate_code("C A"),
            Err(CountryValidationError::InvalidCode(_))
        ));
        assert!(matches!(
            validate_code("ABCDEFGHI"),
            Err(CountryValidationError::InvalidCode(_))
        ));
    }

    #[test]
    fn sample_countries_have_unique_valid_codes() {
        let samples = sample_countries();
        let codes: HashSet<_> = samples.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes.len(), samples.len());
        assert!(samples.iter().all(|c| c.validate().is_ok()));
    }
}
