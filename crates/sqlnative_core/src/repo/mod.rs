//! Repository dispatcher.
//!
//! # Responsibility
//! - Resolve a called method against the repository's method table.
//! - Drive descriptor -> classification -> generation -> binding -> execution.
//! - Route SELECT cursors through the result mapper; report affected rows
//!   for every other kind.
//!
//! # Invariants
//! - All validation happens before the connection is touched.
//! - Statements never outlive the call that prepared them.
//! - One call holds the connection lock for its whole execution.

use crate::clause::{MethodSpec, ParamTag, RepositoryDefinition, RepositorySpec, CLOSE_METHOD};
use crate::config::Properties;
use crate::db::{ConnectionManager, Connector, SqliteConnector};
use crate::error::{RepoError, RepoResult};
use crate::mapping::{Record, Records, TargetType};
use crate::query::kind::QueryKind;
use crate::query::{PreparedQuery, QueryDescriptor};
use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::Connection;
use std::any::type_name;
use std::time::Instant;

/// One positional call argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    /// Record type SELECT rows are mapped into.
    Target(TargetType),
}

impl Argument {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn target<T: Record>() -> Self {
        Self::Target(TargetType::of::<T>())
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Self::Value(Value::Integer(value))
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Self::Value(Value::Real(value))
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Self::Value(Value::Text(value.to_string()))
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Self::Value(Value::Text(value))
    }
}

impl From<TargetType> for Argument {
    fn from(value: TargetType) -> Self {
        Self::Target(value)
    }
}

/// Result of one dispatched call.
#[derive(Debug)]
pub enum Response {
    Records(Records),
    Affected(usize),
    Closed,
}

impl Response {
    pub fn into_records<T: Record>(self) -> RepoResult<Vec<T>> {
        match self {
            Self::Records(records) => records.into_vec(),
            Self::Affected(_) => Err(RepoError::TargetMismatch {
                expected: type_name::<T>(),
                actual: "affected row count",
            }),
            Self::Closed => Err(RepoError::TargetMismatch {
                expected: type_name::<T>(),
                actual: "closed connection",
            }),
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Self::Affected(count) => Some(*count),
            _ => None,
        }
    }
}

/// Declared repository bound to one lazily opened connection.
pub struct Repository {
    spec: RepositorySpec,
    properties: Properties,
    connections: ConnectionManager,
}

impl Repository {
    /// Creates a repository with an empty property map.
    pub fn new(spec: RepositorySpec) -> Self {
        Self::with_properties(spec, Properties::new())
    }

    pub fn with_properties(spec: RepositorySpec, properties: Properties) -> Self {
        Self::with_connector(spec, properties, SqliteConnector)
    }

    pub fn with_connector(
        spec: RepositorySpec,
        properties: Properties,
        connector: impl Connector + Send + Sync + 'static,
    ) -> Self {
        Self {
            spec,
            properties,
            connections: ConnectionManager::new(Box::new(connector)),
        }
    }

    pub fn from_definition<D: RepositoryDefinition>(properties: Properties) -> RepoResult<Self> {
        Ok(Self::with_properties(
            RepositorySpec::from_definition::<D>()?,
            properties,
        ))
    }

    pub fn spec(&self) -> &RepositorySpec {
        &self.spec
    }

    pub fn is_connected(&self) -> bool {
        self.connections.is_open()
    }

    /// Dispatches one method call.
    ///
    /// `close` is reserved and tears the connection down.
    ///
    /// # Errors
    /// - `UnknownMethod` for undeclared names.
    /// - `Configuration` / `Classification` / `MissingTargetType` before any
    ///   connection work.
    /// - `ConnectionNotOpen` for `close` without an open connection.
    /// - `Db` for driver failures.
    pub fn invoke(&self, method: &str, args: &[Argument]) -> RepoResult<Response> {
        info!("event=invoke module=repo status=start method={method} args={}", args.len());
        let result = self.dispatch(method, args);
        match &result {
            Ok(_) => info!("event=invoke module=repo status=ok method={method}"),
            Err(err) => error!("event=invoke module=repo status=error method={method} error={err}"),
        }
        result
    }

    /// Runs a SELECT method and returns typed records.
    ///
    /// A `T` target argument is appended after `args`; an earlier target in
    /// `args` takes precedence.
    pub fn select<T: Record>(&self, method: &str, args: &[Argument]) -> RepoResult<Vec<T>> {
        let mut call_args = args.to_vec();
        call_args.push(Argument::target::<T>());
        self.invoke(method, &call_args)?.into_records()
    }

    /// Runs an INSERT, UPDATE or DELETE method and returns affected rows.
    pub fn execute(&self, method: &str, args: &[Argument]) -> RepoResult<usize> {
        match self.invoke(method, args)? {
            Response::Affected(count) => Ok(count),
            Response::Records(records) => Err(RepoError::TargetMismatch {
                expected: "affected row count",
                actual: records.type_name(),
            }),
            Response::Closed => Err(RepoError::TargetMismatch {
                expected: "affected row count",
                actual: "closed connection",
            }),
        }
    }

    pub fn close(&self) -> RepoResult<()> {
        self.invoke(CLOSE_METHOD, &[]).map(|_| ())
    }

    fn dispatch(&self, method: &str, args: &[Argument]) -> RepoResult<Response> {
        if method == CLOSE_METHOD {
            self.connections.close()?;
            return Ok(Response::Closed);
        }

        let spec = self
            .spec
            .method(method)
            .ok_or_else(|| RepoError::UnknownMethod(method.to_string()))?;
        let descriptor = build_descriptor(spec, args)?;
        let prepared = descriptor.prepare()?;
        let target = match (prepared.kind, descriptor.target) {
            (QueryKind::Select, None) => {
                return Err(RepoError::MissingTargetType {
                    method: method.to_string(),
                })
            }
            (QueryKind::Select, target) => target,
            _ => None,
        };

        self.connections
            .with_connection(self.spec.connection(), &self.properties, |conn| {
                execute_prepared(conn, &prepared, target)
            })
    }
}

/// Pairs positional arguments with the method's parameter tags.
fn build_descriptor(method: &MethodSpec, args: &[Argument]) -> RepoResult<QueryDescriptor> {
    let mut descriptor = QueryDescriptor::new(method.clauses.clone());
    for (index, arg) in args.iter().enumerate() {
        match (method.params.get(index), arg) {
            (Some(ParamTag::Bound(name)), Argument::Value(value)) => {
                descriptor.binding.push(name.clone(), value.clone());
            }
            (Some(ParamTag::Bound(name)), Argument::Target(target)) => {
                return Err(RepoError::Configuration(format!(
                    "parameter `{name}` of `{}` expects a value, got target type `{}`",
                    method.name,
                    target.type_name()
                )));
            }
            (_, Argument::Target(target)) => {
                descriptor.target.get_or_insert(*target);
            }
            (_, Argument::Value(_)) => {}
        }
    }
    Ok(descriptor)
}

fn execute_prepared(
    conn: &Connection,
    prepared: &PreparedQuery,
    target: Option<TargetType>,
) -> RepoResult<Response> {
    let started_at = Instant::now();
    debug!(
        "event=query_execute module=repo status=start kind={} sql={}",
        prepared.kind, prepared.sql
    );

    let mut stmt = conn.prepare(&prepared.sql)?;
    let response = match target {
        Some(target) => {
            let records = target.map_rows(conn, &mut stmt)?;
            info!(
                "event=query_execute module=repo status=ok kind={} records={} record_type={} duration_ms={}",
                prepared.kind,
                records.len(),
                records.type_name(),
                started_at.elapsed().as_millis()
            );
            Response::Records(records)
        }
        None => {
            let affected = stmt.execute([])?;
            info!(
                "event=query_execute module=repo status=ok kind={} affected={} duration_ms={}",
                prepared.kind,
                affected,
                started_at.elapsed().as_millis()
            );
            Response::Affected(affected)
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::{build_descriptor, Argument};
    use crate::clause::MethodSpec;
    use crate::error::RepoError;
    use crate::mapping::{ColumnBinding, Record};

    #[derive(Debug, Default)]
    struct Row {
        id: Option<String>,
    }

    impl Record for Row {
        fn columns() -> Vec<ColumnBinding<Self>> {
            vec![ColumnBinding::<Self>::new("id", |row, value| row.id = value)]
        }
    }

    #[test]
    fn bound_positions_become_bindings_in_call_order() {
        let method = MethodSpec::new("find")
            .select("*")
            .from("t")
            .where_clause("a = {a} AND b = {b}")
            .param("b")
            .untagged()
            .param("a");
        let args = [
            Argument::from(2_i64),
            Argument::from("ignored"),
            Argument::from(1_i64),
        ];

        let descriptor = build_descriptor(&method, &args).unwrap();
        assert_eq!(descriptor.binding.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(
            descriptor.prepare().unwrap().sql,
            "SELECT * FROM t WHERE a = 1 AND b = 2;"
        );
    }

    #[test]
    fn first_target_argument_wins() {
        let method = MethodSpec::new("find").select("*").from("t");
        let args = [Argument::target::<Row>(), Argument::target::<Row>()];
        let descriptor = build_descriptor(&method, &args).unwrap();
        assert!(descriptor
            .target
            .map(|target| target.type_name().ends_with("Row"))
            .unwrap_or(false));
    }

    #[test]
    fn target_in_bound_position_is_rejected() {
        let method = MethodSpec::new("find").select("*").from("t").param("id");
        let err = build_descriptor(&method, &[Argument::target::<Row>()]).unwrap_err();
        assert!(matches!(err, RepoError::Configuration(ref message) if message.contains("`id`")));
    }

    #[test]
    fn extra_arguments_are_untagged() {
        let method = MethodSpec::new("find").select("*").from("t");
        let descriptor = build_descriptor(&method, &[Argument::from(5_i64)]).unwrap();
        assert!(descriptor.binding.is_empty());
        assert!(descriptor.target.is_none());
    }
}
