//! Configuration properties used to resolve `{key}` indirections.
//!
//! # Responsibility
//! - Hold the caller-supplied key/value map for credential lookup.
//! - Load TOML property files, flattening tables into dotted keys.
//!
//! # Invariants
//! - `[db] url = "x"` and `db.url = "x"` both define the key `db.url`.
//! - Scalars are stored as text; arrays have no text form and are rejected.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use toml::{Table, Value};

/// Property loading failure.
#[derive(Debug)]
pub enum PropertiesError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    /// Value that cannot be used as a single property string.
    UnsupportedValue { key: String, kind: &'static str },
}

impl Display for PropertiesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read properties `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse properties: {err}"),
            Self::UnsupportedValue { key, kind } => {
                write!(f, "property `{key}` holds an unsupported {kind} value")
            }
        }
    }
}

impl Error for PropertiesError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnsupportedValue { .. } => None,
        }
    }
}

impl From<toml::de::Error> for PropertiesError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Key/value configuration map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: BTreeMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut properties = Self::new();
        for (key, value) in pairs {
            properties.set(key, value);
        }
        properties
    }

    /// Parses TOML property text.
    ///
    /// Strings are kept verbatim; integers, floats, booleans and datetimes
    /// use their TOML spelling (`2.0`, `true`).
    pub fn parse(text: &str) -> Result<Self, PropertiesError> {
        let table: Table = toml::from_str(text)?;
        let mut properties = Self::new();
        properties.absorb("", table)?;
        Ok(properties)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, PropertiesError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PropertiesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into().trim().to_string(), value.into().trim().to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn absorb(&mut self, prefix: &str, table: Table) -> Result<(), PropertiesError> {
        for (name, value) in table {
            let key = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}.{name}")
            };
            match value {
                Value::Table(nested) => self.absorb(&key, nested)?,
                Value::String(text) => self.set(key, text),
                Value::Array(_) => {
                    return Err(PropertiesError::UnsupportedValue { key, kind: "array" })
                }
                scalar => self.set(key, scalar.to_string()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Properties, PropertiesError};
    use std::io::Write;

    #[test]
    fn parse_reads_dotted_keys_and_skips_comments() {
        let props = Properties::parse(
            "# database\n\ndb.url = \"sqlite::memory:\"\ndb.user = \"sa\"\n",
        )
        .unwrap();
        assert_eq!(props.len(), 2);
        assert_eq!(props.get("db.url"), Some("sqlite::memory:"));
        assert_eq!(props.get("db.user"), Some("sa"));
    }

    #[test]
    fn tables_flatten_into_dotted_keys() {
        let props = Properties::parse(
            "[db]\nurl = \"file:app.db?mode=ro\"\n\n[db.pool]\nname = \"main\"\n",
        )
        .unwrap();
        assert_eq!(props.get("db.url"), Some("file:app.db?mode=ro"));
        assert_eq!(props.get("db.pool.name"), Some("main"));
    }

    #[test]
    fn quoted_keys_may_contain_spaces() {
        let props = Properties::parse("\"my db.user name\" = \"alice\"\n").unwrap();
        assert_eq!(props.get("my db.user name"), Some("alice"));
    }

    #[test]
    fn scalars_keep_their_toml_spelling() {
        let props = Properties::parse("port = 5432\nratio = 2.0\nssl = true\n").unwrap();
        assert_eq!(props.get("port"), Some("5432"));
        assert_eq!(props.get("ratio"), Some("2.0"));
        assert_eq!(props.get("ssl"), Some("true"));
    }

    #[test]
    fn multiline_strings_continue_across_lines() {
        let props = Properties::parse("db.url = \"\"\"sqlite:\\\n    app.db\"\"\"\n").unwrap();
        assert_eq!(props.get("db.url"), Some("sqlite:app.db"));
    }

    #[test]
    fn escapes_are_decoded() {
        let props = Properties::parse("db.url = \"file\\u003Aapp.db\"\n").unwrap();
        assert_eq!(props.get("db.url"), Some("file:app.db"));
    }

    #[test]
    fn malformed_text_is_a_parse_error() {
        let err = Properties::parse("db.url = \"x\"\nbroken line\n").unwrap_err();
        assert!(matches!(err, PropertiesError::Parse(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn arrays_are_rejected() {
        let err = Properties::parse("[db]\nhosts = [\"a\", \"b\"]\n").unwrap_err();
        match err {
            PropertiesError::UnsupportedValue { key, kind } => {
                assert_eq!(key, "db.hosts");
                assert_eq!(kind, "array");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "db.password = \"secret\"").unwrap();
        let props = Properties::load(file.path()).unwrap();
        assert_eq!(props.get("db.password"), Some("secret"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Properties::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, PropertiesError::Io { .. }));
    }
}
