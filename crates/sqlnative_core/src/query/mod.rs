//! Query synthesis: classification, generation and placeholder binding.
//!
//! # Responsibility
//! - Turn one call's clauses and bound values into executable SQL text.
//!
//! # Invariants
//! - Synthesis is pure: identical descriptors yield identical SQL.
//! - Validation always runs before rendering.

pub mod bind;
pub mod kind;

use crate::clause::ClauseSet;
use crate::error::RepoResult;
use crate::mapping::TargetType;
use bind::ParameterBinding;
use kind::QueryKind;

/// Everything one dispatched call contributes to its query.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub clauses: ClauseSet,
    pub binding: ParameterBinding,
    pub target: Option<TargetType>,
}

/// Classified, validated and bound statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedQuery {
    pub kind: QueryKind,
    pub sql: String,
}

impl QueryDescriptor {
    pub fn new(clauses: ClauseSet) -> Self {
        Self {
            clauses,
            binding: ParameterBinding::new(),
            target: None,
        }
    }

    pub fn kind(&self) -> RepoResult<QueryKind> {
        QueryKind::classify(&self.clauses)
    }

    /// Classifies, validates, renders and binds.
    pub fn prepare(&self) -> RepoResult<PreparedQuery> {
        let kind = self.kind()?;
        kind.validate(&self.clauses)?;
        let raw = kind.render(&self.clauses);
        Ok(PreparedQuery {
            kind,
            sql: self.binding.apply(&raw),
        })
    }
}
