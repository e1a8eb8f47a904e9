//! Number of migrations to run per `up`/`down` request

use crate::MigrationError;
use std::fmt;
use std::str::FromStr;

/// How many migrations a single `up` or `down` request may run
///
/// Always at least 1. Parsed from user input: `"all"` is an alias for
/// [`NumOfRuns::ALL`], empty input means 1, and any integer `<= 0` is
/// clamped to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NumOfRuns(usize);

impl NumOfRuns {
    /// Sentinel used for "all"
    pub const ALL: NumOfRuns = NumOfRuns(99_999);

    /// A single run
    pub const ONE: NumOfRuns = NumOfRuns(1);

    /// Clamp `n` to at least 1
    pub fn new(n: i64) -> Self {
        if n <= 0 {
            Self::ONE
        } else {
            NumOfRuns(usize::try_from(n).unwrap_or(Self::ALL.0))
        }
    }

    /// Parse user input
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::InvalidNumOfRuns` if `input` is neither
    /// empty, `"all"`, nor an integer.
    pub fn parse(input: &str) -> Result<Self, MigrationError> {
        if input == "all" {
            return Ok(Self::ALL);
        }
        if input.trim().is_empty() {
            return Ok(Self::ONE);
        }

        input
            .parse::<i64>()
            .map(Self::new)
            .map_err(|_| MigrationError::InvalidNumOfRuns(input.to_string()))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for NumOfRuns {
    fn default() -> Self {
        Self::ONE
    }
}

impl FromStr for NumOfRuns {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for NumOfRuns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            write!(f, "all")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
