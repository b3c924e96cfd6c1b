//! Declarative clause metadata and the per-method registry.
//!
//! # Responsibility
//! - Describe which SQL fragments each repository method declares.
//! - Describe how each positional argument participates in a call.
//! - Build the method table once, when a repository is constructed.
//!
//! # Invariants
//! - Method names are unique within one repository.
//! - `close` is reserved for connection teardown and cannot be declared.

use crate::db::ConnectionConfig;
use crate::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Method name reserved for closing the repository connection.
pub const CLOSE_METHOD: &str = "close";

/// Clause fragments discoverable for one method.
///
/// A fragment is "present" when it is `Some`, even if empty; emptiness is a
/// validation concern of the query generators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClauseSet {
    pub select: Option<String>,
    pub from: Option<String>,
    #[serde(rename = "where")]
    pub where_clause: Option<String>,
    pub order_by: Option<String>,
    pub insert: Option<String>,
    pub values: Option<String>,
    pub update: Option<String>,
    pub set: Option<String>,
    pub delete: Option<String>,
    pub native_query: Option<String>,
}

/// Role of one positional method parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamTag {
    /// Value substituted for `{name}` placeholders.
    Bound(String),
    /// Not bound; target-type descriptors usually sit here.
    Untagged,
}

/// Declared shape of one repository method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub name: String,
    #[serde(flatten)]
    pub clauses: ClauseSet,
    #[serde(default)]
    pub params: Vec<ParamTag>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            clauses: ClauseSet::default(),
            params: Vec::new(),
        }
    }

    pub fn select(mut self, list: impl Into<String>) -> Self {
        self.clauses.select = Some(list.into());
        self
    }

    pub fn from(mut self, target: impl Into<String>) -> Self {
        self.clauses.from = Some(target.into());
        self
    }

    pub fn where_clause(mut self, expr: impl Into<String>) -> Self {
        self.clauses.where_clause = Some(expr.into());
        self
    }

    pub fn order_by(mut self, expr: impl Into<String>) -> Self {
        self.clauses.order_by = Some(expr.into());
        self
    }

    pub fn insert(mut self, target: impl Into<String>) -> Self {
        self.clauses.insert = Some(target.into());
        self
    }

    pub fn values(mut self, values: impl Into<String>) -> Self {
        self.clauses.values = Some(values.into());
        self
    }

    pub fn update(mut self, target: impl Into<String>) -> Self {
        self.clauses.update = Some(target.into());
        self
    }

    pub fn set(mut self, assignments: impl Into<String>) -> Self {
        self.clauses.set = Some(assignments.into());
        self
    }

    pub fn delete(mut self, target: impl Into<String>) -> Self {
        self.clauses.delete = Some(target.into());
        self
    }

    pub fn native_query(mut self, sql: impl Into<String>) -> Self {
        self.clauses.native_query = Some(sql.into());
        self
    }

    /// Appends a parameter bound to `{name}`.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamTag::Bound(name.into()));
        self
    }

    /// Appends an unbound parameter position.
    pub fn untagged(mut self) -> Self {
        self.params.push(ParamTag::Untagged);
        self
    }
}

/// Type-level repository declaration.
///
/// Implementors play the role of an annotated repository interface: the
/// connection settings plus every method's clauses.
pub trait RepositoryDefinition {
    fn connection() -> ConnectionConfig;
    fn methods() -> Vec<MethodSpec>;
}

/// Connection settings and method table of one repository.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RepositorySpecData")]
pub struct RepositorySpec {
    connection: ConnectionConfig,
    methods: BTreeMap<String, MethodSpec>,
}

#[derive(Deserialize)]
struct RepositorySpecData {
    connection: ConnectionConfig,
    #[serde(default)]
    methods: Vec<MethodSpec>,
}

impl TryFrom<RepositorySpecData> for RepositorySpec {
    type Error = RepoError;

    fn try_from(value: RepositorySpecData) -> RepoResult<Self> {
        Self::new(value.connection, value.methods)
    }
}

impl RepositorySpec {
    /// Builds the method table.
    ///
    /// # Errors
    /// - `Configuration` for a duplicate or blank method name, or for a
    ///   method named `close`.
    pub fn new(
        connection: ConnectionConfig,
        methods: impl IntoIterator<Item = MethodSpec>,
    ) -> RepoResult<Self> {
        let mut table = BTreeMap::new();
        for method in methods {
            let name = method.name.trim().to_string();
            if name.is_empty() {
                return Err(RepoError::Configuration(
                    "repository method name cannot be empty".to_string(),
                ));
            }
            if name == CLOSE_METHOD {
                return Err(RepoError::Configuration(format!(
                    "`{CLOSE_METHOD}` is reserved and cannot declare clauses"
                )));
            }
            if table.contains_key(&name) {
                return Err(RepoError::Configuration(format!(
                    "repository method declared twice: {name}"
                )));
            }
            table.insert(name, method);
        }
        Ok(Self {
            connection,
            methods: table,
        })
    }

    pub fn from_definition<D: RepositoryDefinition>() -> RepoResult<Self> {
        Self::new(D::connection(), D::methods())
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn method(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.get(name)
    }

    /// Declared method names, sorted.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }
}
