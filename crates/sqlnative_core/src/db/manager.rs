//! Lazily initialized, memoized connection holder.
//!
//! # Invariants
//! - At most one live connection exists per manager.
//! - Initialization and use happen under one mutex, so concurrent callers on
//!   the same manager are serialized instead of racing the first open.

use super::connect::Connector;
use super::credentials::ConnectionConfig;
use super::DbError;
use crate::config::Properties;
use crate::error::{RepoError, RepoResult};
use log::{error, info};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Owns the single connection of one repository instance.
pub struct ConnectionManager {
    connector: Box<dyn Connector + Send + Sync>,
    slot: Mutex<Option<Connection>>,
}

impl ConnectionManager {
    pub fn new(connector: Box<dyn Connector + Send + Sync>) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
        }
    }

    /// Runs `f` with the memoized connection, opening it first if needed.
    ///
    /// Credentials are resolved only when no connection is memoized.
    pub fn with_connection<T>(
        &self,
        config: &ConnectionConfig,
        properties: &Properties,
        f: impl FnOnce(&Connection) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut slot = self.lock();
        let conn = match &mut *slot {
            Some(conn) => conn,
            empty => empty.insert(self.open(config, properties)?),
        };
        f(conn)
    }

    fn open(&self, config: &ConnectionConfig, properties: &Properties) -> RepoResult<Connection> {
        let resolved = config.resolve(properties)?;
        info!("event=connection_init module=db status=start");
        Ok(self
            .connector
            .connect(&resolved.url, resolved.credentials.as_ref())?)
    }

    /// Closes the memoized connection.
    ///
    /// # Errors
    /// - `ConnectionNotOpen` when nothing was opened (or it was already closed).
    /// - `Db(Close)` when SQLite refuses to close; the handle is dropped anyway.
    pub fn close(&self) -> RepoResult<()> {
        let Some(conn) = self.lock().take() else {
            error!("event=db_close module=db status=error error_code=not_open");
            return Err(RepoError::ConnectionNotOpen);
        };
        conn.close().map_err(|(_conn, err)| {
            error!("event=db_close module=db status=error error={err}");
            RepoError::Db(DbError::Close(err))
        })?;
        info!("event=db_close module=db status=ok");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        // A panic inside a caller closure leaves the slot itself consistent.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionManager;
    use crate::config::Properties;
    use crate::db::{ConnectionConfig, SqliteConnector};
    use crate::error::RepoError;

    fn manager() -> ConnectionManager {
        ConnectionManager::new(Box::new(SqliteConnector))
    }

    #[test]
    fn close_without_connection_is_rejected() {
        let err = manager().close().unwrap_err();
        assert!(matches!(err, RepoError::ConnectionNotOpen));
    }

    #[test]
    fn connection_survives_between_calls_and_reopens_after_close() {
        let manager = manager();
        let config = ConnectionConfig::new(":memory:");
        let props = Properties::new();

        manager
            .with_connection(&config, &props, |conn| {
                conn.execute_batch("CREATE TABLE t (id INTEGER);")?;
                Ok(())
            })
            .unwrap();
        assert!(manager.is_open());

        let tables: i64 = manager
            .with_connection(&config, &props, |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 't';",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 1);

        manager.close().unwrap();
        assert!(!manager.is_open());
        assert!(matches!(manager.close(), Err(RepoError::ConnectionNotOpen)));

        // A fresh in-memory database after reopening.
        let tables: i64 = manager
            .with_connection(&config, &props, |conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 't';",
                    [],
                    |row| row.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn configuration_errors_leave_manager_closed() {
        let manager = manager();
        let err = manager
            .with_connection(&ConnectionConfig::new(""), &Properties::new(), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, RepoError::Configuration(_)));
        assert!(!manager.is_open());
    }
}
