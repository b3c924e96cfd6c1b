//! Connection configuration, driver bootstrap and connection lifecycle.
//!
//! # Responsibility
//! - Resolve `{key}` credential indirections against configuration properties.
//! - Open and configure SQLite connections through a [`Connector`] seam.
//! - Memoize exactly one live connection per repository instance.
//!
//! # Invariants
//! - Credential validation happens before any driver call.
//! - A memoized connection is reused until explicitly closed.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod connect;
mod credentials;
mod manager;

pub use connect::{Connector, SqliteConnector};
pub use credentials::{resolve_property, ConnectionConfig, Credentials, ResolvedConnection};
pub use manager::ConnectionManager;

pub type DbResult<T> = Result<T, DbError>;

/// Driver-level failure raised while opening, using or closing a connection.
#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// URL cannot be interpreted by the connector.
    InvalidUrl(String),
    /// Closing the memoized connection failed.
    Close(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::InvalidUrl(url) => write!(f, "unsupported database url `{url}`"),
            Self::Close(err) => write!(f, "failed to close connection: {err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Close(err) => Some(err),
            Self::InvalidUrl(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
