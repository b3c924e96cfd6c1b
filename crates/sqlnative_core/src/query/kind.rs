//! Query classification, per-kind validation and SQL rendering.

use crate::clause::ClauseSet;
use crate::error::{RepoError, RepoResult};
use log::debug;
use std::fmt::{Display, Formatter};

/// Statement kind resolved for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl Display for QueryKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl QueryKind {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Resolves the kind of a call.
    ///
    /// A native query's leading keyword wins. Otherwise structural clauses
    /// are checked in the fixed order DELETE, INSERT, UPDATE, SELECT.
    pub fn classify(clauses: &ClauseSet) -> RepoResult<Self> {
        if let Some(kind) = clauses.native_query.as_deref().and_then(Self::from_native) {
            return Ok(kind);
        }
        if clauses.delete.is_some() {
            return Ok(Self::Delete);
        }
        if clauses.insert.is_some() {
            return Ok(Self::Insert);
        }
        if clauses.update.is_some() {
            return Ok(Self::Update);
        }
        if clauses.select.is_some() {
            return Ok(Self::Select);
        }
        Err(RepoError::Classification(
            "Unsupported query. Only accept SELECT/UPDATE/INSERT/DELETE".to_string(),
        ))
    }

    fn from_native(sql: &str) -> Option<Self> {
        let normalized = sql.trim().to_lowercase();
        [Self::Select, Self::Update, Self::Insert, Self::Delete]
            .into_iter()
            .find(|kind| normalized.starts_with(&kind.keyword().to_lowercase()))
    }

    /// Checks the clauses this kind requires.
    ///
    /// Skipped entirely when a native query is declared.
    pub fn validate(self, clauses: &ClauseSet) -> RepoResult<()> {
        if clauses.native_query.is_some() {
            return Ok(());
        }
        match self {
            Self::Select => {
                require(&clauses.select, "SELECT clause cannot be NULL/Empty")?;
                require(&clauses.from, "FROM clause cannot be NULL/Empty in SELECT query")
            }
            Self::Insert => {
                require(&clauses.insert, "INSERT clause cannot be NULL/Empty")?;
                require(
                    &clauses.values,
                    "VALUES clause cannot be NULL/Empty in INSERT query",
                )
            }
            Self::Update => {
                require(&clauses.update, "UPDATE clause cannot be NULL/Empty")?;
                require(&clauses.set, "SET clause cannot be NULL/Empty in UPDATE query")
            }
            Self::Delete => require(&clauses.delete, "DELETE FROM clause cannot be NULL/Empty"),
        }
    }

    /// Produces SQL text with placeholders still unbound.
    ///
    /// A declared native query is returned verbatim. Callers must run
    /// [`QueryKind::validate`] first; missing clauses render as empty text.
    pub fn render(self, clauses: &ClauseSet) -> String {
        if let Some(native) = &clauses.native_query {
            return native.clone();
        }
        debug!("event=query_render module=query status=start kind={self}");
        let mut sql = match self {
            Self::Select => format!(
                "SELECT {} FROM {}",
                text(&clauses.select),
                text(&clauses.from)
            ),
            Self::Insert => format!(
                "INSERT INTO {} VALUES {}",
                text(&clauses.insert),
                text(&clauses.values)
            ),
            Self::Update => format!(
                "UPDATE {} SET {}",
                text(&clauses.update),
                text(&clauses.set)
            ),
            Self::Delete => format!("DELETE FROM {}", text(&clauses.delete)),
        };
        if let Some(expr) = &clauses.where_clause {
            if self != Self::Insert {
                sql.push_str(" WHERE ");
                sql.push_str(expr);
            }
        }
        if let Some(expr) = &clauses.order_by {
            if self == Self::Select {
                sql.push_str(" ORDER BY ");
                sql.push_str(expr);
            }
        }
        sql.push(';');
        sql
    }
}

fn require(clause: &Option<String>, message: &str) -> RepoResult<()> {
    match clause {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(RepoError::Configuration(message.to_string())),
    }
}

fn text(clause: &Option<String>) -> &str {
    clause.as_deref().unwrap_or_default()
}
