//! Connection configuration and `{key}` credential indirection.

use crate::config::Properties;
use crate::error::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

static PROPERTY_REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\{([\w .]+)\}$").expect("valid property reference regex"));

/// Database location and credentials declared by a repository.
///
/// Each component is either a literal or a `{property.name}` reference that
/// is looked up in [`Properties`] when the connection is first opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Username/password pair passed to a [`crate::db::Connector`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection settings after property resolution and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConnection {
    pub url: String,
    pub credentials: Option<Credentials>,
}

impl ConnectionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Resolves indirections and validates the result.
    ///
    /// # Errors
    /// - `Configuration` when a referenced property is undefined.
    /// - `Configuration` when the URL resolves to an empty string.
    /// - `Configuration` when only one of username/password is non-empty.
    pub fn resolve(&self, properties: &Properties) -> RepoResult<ResolvedConnection> {
        let url = resolve_property(&self.url, properties)?;
        if url.is_empty() {
            return Err(RepoError::Configuration(
                "Database URL cannot be empty".to_string(),
            ));
        }

        let username = resolve_property(&self.username, properties)?;
        let password = resolve_property(&self.password, properties)?;
        if username.is_empty() && !password.is_empty() {
            return Err(RepoError::Configuration(
                "Missing database username".to_string(),
            ));
        }
        if password.is_empty() && !username.is_empty() {
            return Err(RepoError::Configuration(
                "Missing database password".to_string(),
            ));
        }

        let credentials = if username.is_empty() {
            None
        } else {
            Some(Credentials { username, password })
        };
        Ok(ResolvedConnection { url, credentials })
    }
}

/// Resolves one configuration value.
///
/// Values exactly matching `{name}` (word characters, spaces, dots) are
/// replaced by the property `name`; anything else is returned verbatim.
pub fn resolve_property(raw: &str, properties: &Properties) -> RepoResult<String> {
    let Some(captures) = PROPERTY_REFERENCE_RE.captures(raw) else {
        return Ok(raw.to_string());
    };
    let key = &captures[1];
    properties
        .get(key)
        .map(str::to_string)
        .ok_or_else(|| RepoError::Configuration(format!("property `{key}` is not defined")))
}
