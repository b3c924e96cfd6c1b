//! `{name}` placeholder substitution.
//!
//! Values are rendered as text and spliced into the statement; nothing is
//! escaped or sent as a typed driver parameter. Callers must not pass
//! untrusted input through bound parameters (SQL injection).

use rusqlite::types::Value;

/// Ordered `(placeholder, value)` pairs collected for one call.
///
/// Duplicate names are kept; pairs are applied in insertion order, so a
/// value containing `{other}` can be rewritten by a later pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBinding {
    pairs: Vec<(String, Value)>,
}

impl ParameterBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.pairs.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(name, _)| name.as_str())
    }

    /// Replaces every `{name}` occurrence, pair by pair.
    pub fn apply(&self, sql: &str) -> String {
        self.pairs
            .iter()
            .fold(sql.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), &value_text(value))
            })
    }
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for ParameterBinding {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut binding = Self::new();
        for (name, value) in iter {
            binding.push(name, value);
        }
        binding
    }
}

/// Textual form used for substitution; `NULL` becomes `null`.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Integer(number) => number.to_string(),
        // `{:?}` keeps the fraction of whole numbers (`2.0`), so SQLite
        // still reads the literal as REAL.
        Value::Real(number) => format!("{number:?}"),
        Value::Text(text) => text.clone(),
        Value::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
