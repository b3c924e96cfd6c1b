//! Error taxonomy for repository dispatch.
//!
//! Validation failures (`Configuration`, `Classification`,
//! `MissingTargetType`) are raised before any connection work. Driver
//! failures are wrapped in `Db` and keep the original cause reachable through
//! [`Error::source`].

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    /// Missing/empty clause, bad connection settings or an invalid
    /// repository declaration.
    Configuration(String),
    /// No query kind could be derived from the declared clauses.
    Classification(String),
    /// SELECT invoked without a target-type argument.
    MissingTargetType { method: String },
    /// `close` invoked while no connection is open.
    ConnectionNotOpen,
    UnknownMethod(String),
    /// A response was consumed as something it does not hold: records of
    /// another type, or records where an affected-row count was expected.
    TargetMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(message) | Self::Classification(message) => {
                write!(f, "{message}")
            }
            Self::MissingTargetType { method } => write!(
                f,
                "SELECT method `{method}` requires a target type argument"
            ),
            Self::ConnectionNotOpen => {
                write!(f, "Cannot close connection because it is not open")
            }
            Self::UnknownMethod(name) => write!(f, "repository method not declared: {name}"),
            Self::TargetMismatch { expected, actual } => write!(
                f,
                "response holds `{actual}`, not `{expected}`"
            ),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
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
