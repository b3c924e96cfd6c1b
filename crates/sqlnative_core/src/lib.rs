//! Declarative SQL repositories.
//!
//! A repository is declared as connection settings plus, per method, the SQL
//! clauses it is built from (or a native query). Calling a method by name
//! synthesizes the statement, substitutes `{name}` placeholders, runs it on a
//! lazily opened SQLite connection, and maps SELECT rows into records.
//!
//! ```no_run
//! use sqlnative_core::{
//!     Argument, ColumnBinding, ConnectionConfig, MethodSpec, Record, Repository, RepositorySpec,
//! };
//!
//! #[derive(Default)]
//! struct User {
//!     name: Option<String>,
//! }
//!
//! impl Record for User {
//!     fn columns() -> Vec<ColumnBinding<Self>> {
//!         vec![ColumnBinding::<Self>::new("name", |user, value| user.name = value)]
//!     }
//! }
//!
//! # fn main() -> Result<(), sqlnative_core::RepoError> {
//! let spec = RepositorySpec::new(
//!     ConnectionConfig::new("sqlite:app.db"),
//!     [MethodSpec::new("find_user")
//!         .select("name")
//!         .from("users")
//!         .where_clause("id = {id}")
//!         .param("id")],
//! )?;
//! let repo = Repository::new(spec);
//! let users: Vec<User> = repo.select("find_user", &[Argument::from(1_i64)])?;
//! repo.close()?;
//! # Ok(())
//! # }
//! ```

pub mod clause;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod mapping;
pub mod query;
pub mod repo;

pub use clause::{ClauseSet, MethodSpec, ParamTag, RepositoryDefinition, RepositorySpec, CLOSE_METHOD};
pub use config::{Properties, PropertiesError};
pub use db::{ConnectionConfig, ConnectionManager, Connector, Credentials, DbError, SqliteConnector};
pub use error::{RepoError, RepoResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mapping::{ColumnBinding, ColumnMapping, Record, Records, TargetType};
pub use query::bind::ParameterBinding;
pub use query::kind::QueryKind;
pub use query::{PreparedQuery, QueryDescriptor};
pub use repo::{Argument, Repository, Response};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
