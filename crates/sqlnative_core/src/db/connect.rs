//! Driver seam and the default SQLite connector.
//!
//! # Responsibility
//! - Translate a resolved database URL into an open `rusqlite` connection.
//! - Configure connection pragmas required by query execution.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Every open attempt emits `db_open` start and terminal events.

use super::credentials::Credentials;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

const MEMORY_URLS: &[&str] = &[":memory:", "sqlite::memory:", "sqlite://:memory:"];
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens connections for a resolved URL.
///
/// `credentials` is `Some` only when both username and password resolved to
/// non-empty values.
pub trait Connector {
    fn connect(&self, url: &str, credentials: Option<&Credentials>) -> DbResult<Connection>;
}

/// Default connector backed by bundled SQLite.
///
/// Accepted URL forms: `:memory:`, `sqlite::memory:`, `sqlite://<path>`,
/// `sqlite:<path>`, `file:` URIs and bare filesystem paths.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn connect(&self, url: &str, credentials: Option<&Credentials>) -> DbResult<Connection> {
        let started_at = Instant::now();
        let target = parse_url(url)?;
        info!(
            "event=db_open module=db status=start mode={} auth={}",
            target.mode(),
            if credentials.is_some() { "credentials" } else { "none" }
        );
        if let Some(credentials) = credentials {
            // SQLite has no user model; credentials only select the open path.
            info!(
                "event=db_auth module=db status=skipped user={}",
                credentials.username
            );
        }

        let opened = match &target {
            UrlTarget::Memory => Connection::open_in_memory(),
            UrlTarget::Uri(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::default() | OpenFlags::SQLITE_OPEN_URI,
            ),
            UrlTarget::Path(path) => Connection::open(path),
        };
        let conn = match opened.and_then(|conn| bootstrap_connection(&conn).map(|()| conn)) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                    target.mode(),
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        info!(
            "event=db_open module=db status=ok mode={} duration_ms={}",
            target.mode(),
            started_at.elapsed().as_millis()
        );
        Ok(conn)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum UrlTarget {
    Memory,
    Uri(String),
    Path(String),
}

impl UrlTarget {
    fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Uri(_) => "uri",
            Self::Path(_) => "file",
        }
    }
}

fn parse_url(url: &str) -> DbResult<UrlTarget> {
    let trimmed = url.trim();
    if MEMORY_URLS.contains(&trimmed) {
        return Ok(UrlTarget::Memory);
    }
    if trimmed.starts_with("file:") {
        return Ok(UrlTarget::Uri(trimmed.to_string()));
    }
    let path = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    if path.is_empty() || path.contains("://") {
        return Err(DbError::InvalidUrl(url.to_string()));
    }
    Ok(UrlTarget::Path(path.to_string()))
}

fn bootstrap_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_url, Connector, SqliteConnector, UrlTarget};
    use crate::db::{Credentials, DbError};

    #[test]
    fn parse_url_recognizes_memory_forms() {
        for url in [":memory:", "sqlite::memory:", " sqlite://:memory: "] {
            assert_eq!(parse_url(url).unwrap(), UrlTarget::Memory);
        }
    }

    #[test]
    fn parse_url_strips_sqlite_scheme() {
        assert_eq!(
            parse_url("sqlite:///tmp/app.db").unwrap(),
            UrlTarget::Path("/tmp/app.db".to_string())
        );
        assert_eq!(
            parse_url("sqlite:data.db").unwrap(),
            UrlTarget::Path("data.db".to_string())
        );
        assert_eq!(
            parse_url("file:shared?mode=memory&cache=shared").unwrap(),
            UrlTarget::Uri("file:shared?mode=memory&cache=shared".to_string())
        );
    }

    #[test]
    fn parse_url_rejects_foreign_schemes() {
        let err = parse_url("postgres://localhost/app").unwrap_err();
        assert!(matches!(err, DbError::InvalidUrl(_)));
    }

    #[test]
    fn connect_with_credentials_opens_memory_database() {
        let credentials = Credentials {
            username: "sa".to_string(),
            password: "secret".to_string(),
        };
        let conn = SqliteConnector
            .connect("sqlite::memory:", Some(&credentials))
            .unwrap();
        let foreign_keys: i64 = conn
            .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(foreign_keys, 1);
    }
}
