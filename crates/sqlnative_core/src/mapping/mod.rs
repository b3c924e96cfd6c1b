//! Result-row to record mapping.
//!
//! # Responsibility
//! - Describe which result column populates which record field.
//! - Convert every row of a SELECT cursor into one record instance.
//!
//! # Invariants
//! - Column values are always read as text (`NULL` -> `None`); no coercion.
//! - Fields whose column is absent from the cursor keep their default.
//! - Records preserve cursor order.

use crate::error::{RepoError, RepoResult};
use log::debug;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, Row, Statement};
use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};

/// Record shape a SELECT row can be mapped into.
///
/// `Default` provides the zero-argument construction; `columns` declares
/// the column-to-field setters.
pub trait Record: Default + Send + 'static {
    fn columns() -> Vec<ColumnBinding<Self>>;
}

/// One declared `(column, field setter)` association.
pub struct ColumnBinding<T> {
    pub column: &'static str,
    pub assign: fn(&mut T, Option<String>),
}

impl<T> ColumnBinding<T> {
    pub fn new(column: &'static str, assign: fn(&mut T, Option<String>)) -> Self {
        Self { column, assign }
    }
}

impl<T> Clone for ColumnBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ColumnBinding<T> {}

impl<T> Debug for ColumnBinding<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnBinding")
            .field("column", &self.column)
            .finish()
    }
}

/// Ordered column bindings of one record type.
#[derive(Debug)]
pub struct ColumnMapping<T> {
    bindings: Vec<ColumnBinding<T>>,
}

impl<T: Record> ColumnMapping<T> {
    pub fn of() -> Self {
        Self {
            bindings: T::columns(),
        }
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.bindings.iter().map(|binding| binding.column).collect()
    }

    /// Maps every remaining row of `stmt`, prepared on `conn`.
    ///
    /// Column positions are resolved once against the statement's result
    /// columns; unresolved columns are skipped for every row.
    pub fn map_rows(&self, conn: &Connection, stmt: &mut Statement<'_>) -> RepoResult<Vec<T>> {
        let resolved: Vec<(usize, ColumnBinding<T>)> = self
            .bindings
            .iter()
            .filter_map(|binding| {
                let index = stmt.column_index(binding.column).ok();
                if index.is_none() {
                    debug!(
                        "event=column_unresolved module=mapping record={} column={}",
                        type_name::<T>(),
                        binding.column
                    );
                }
                index.map(|index| (index, *binding))
            })
            .collect();

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = T::default();
            for (index, binding) in &resolved {
                (binding.assign)(&mut record, column_text(conn, row, *index)?);
            }
            records.push(record);
        }
        Ok(records)
    }
}

fn column_text(conn: &Connection, row: &Row<'_>, index: usize) -> RepoResult<Option<String>> {
    let text = match row.get_ref(index)? {
        ValueRef::Null => None,
        ValueRef::Integer(number) => Some(number.to_string()),
        // SQLite's own REAL -> TEXT conversion (`2.0`, `1.0e+20`).
        ValueRef::Real(number) => Some(
            conn.prepare_cached("SELECT CAST(?1 AS TEXT)")?
                .query_row([number], |cast| cast.get(0))?,
        ),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    };
    Ok(text)
}

/// Type-erased descriptor of a [`Record`] type, passed as a call argument.
#[derive(Clone, Copy)]
pub struct TargetType {
    type_name: &'static str,
    columns: fn() -> Vec<&'static str>,
    map: fn(&Connection, &mut Statement<'_>) -> RepoResult<Records>,
}

impl TargetType {
    pub fn of<T: Record>() -> Self {
        Self {
            type_name: type_name::<T>(),
            columns: column_names_of::<T>,
            map: map_erased::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Declared column names in mapping order.
    pub fn columns(&self) -> Vec<&'static str> {
        (self.columns)()
    }

    pub(crate) fn map_rows(&self, conn: &Connection, stmt: &mut Statement<'_>) -> RepoResult<Records> {
        (self.map)(conn, stmt)
    }
}

fn column_names_of<T: Record>() -> Vec<&'static str> {
    ColumnMapping::<T>::of().column_names()
}

fn map_erased<T: Record>(conn: &Connection, stmt: &mut Statement<'_>) -> RepoResult<Records> {
    let records = ColumnMapping::<T>::of().map_rows(conn, stmt)?;
    Ok(Records::new(records))
}

impl Debug for TargetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetType")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Mapped SELECT rows of one record type.
pub struct Records {
    type_name: &'static str,
    len: usize,
    rows: Box<dyn Any + Send>,
}

impl Records {
    fn new<T: Record>(rows: Vec<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            len: rows.len(),
            rows: Box::new(rows),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recovers the typed records.
    ///
    /// # Errors
    /// - `TargetMismatch` when the rows were mapped into another type.
    pub fn into_vec<T: Record>(self) -> RepoResult<Vec<T>> {
        let actual = self.type_name;
        self.rows
            .downcast::<Vec<T>>()
            .map(|rows| *rows)
            .map_err(|_| RepoError::TargetMismatch {
                expected: type_name::<T>(),
                actual,
            })
    }
}

impl Debug for Records {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Records")
            .field("type_name", &self.type_name)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ColumnBinding, ColumnMapping, Record, TargetType};
    use crate::error::RepoError;
    use rusqlite::Connection;

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: Option<String>,
        age: Option<String>,
        nickname: Option<String>,
        note: String,
    }

    impl Record for Person {
        fn columns() -> Vec<ColumnBinding<Self>> {
            vec![
                ColumnBinding::<Self>::new("name", |person, value| person.name = value),
                ColumnBinding::<Self>::new("age", |person, value| person.age = value),
                ColumnBinding::<Self>::new("nickname", |person, value| person.nickname = value),
            ]
        }
    }

    #[derive(Debug, Default)]
    struct Other;

    impl Record for Other {
        fn columns() -> Vec<ColumnBinding<Self>> {
            Vec::new()
        }
    }

    fn people_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE people (name TEXT, age INTEGER, score REAL);
             INSERT INTO people VALUES ('a', 30, 1.5);
             INSERT INTO people VALUES ('b', NULL, 2.0);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn rows_map_in_cursor_order_as_text() {
        let conn = people_db();
        let mut stmt = conn
            .prepare("SELECT name, age FROM people ORDER BY name;")
            .unwrap();
        let people = ColumnMapping::<Person>::of().map_rows(&conn, &mut stmt).unwrap();

        assert_eq!(people.len(), 2);
        assert_eq!(people[0].name.as_deref(), Some("a"));
        assert_eq!(people[0].age.as_deref(), Some("30"));
        assert_eq!(people[1].name.as_deref(), Some("b"));
        assert_eq!(people[1].age, None);
    }

    #[derive(Debug, Default)]
    struct Score {
        score: Option<String>,
    }

    impl Record for Score {
        fn columns() -> Vec<ColumnBinding<Self>> {
            vec![ColumnBinding::<Self>::new("score", |row, value| row.score = value)]
        }
    }

    #[test]
    fn real_columns_use_sqlite_text_form() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (score REAL);
             INSERT INTO t VALUES (2.0), (1e20), (1.5);",
        )
        .unwrap();
        let expected: Vec<Option<String>> = conn
            .prepare("SELECT CAST(score AS TEXT) FROM t ORDER BY rowid;")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let mut stmt = conn.prepare("SELECT score FROM t ORDER BY rowid;").unwrap();
        let scores: Vec<Option<String>> = ColumnMapping::<Score>::of()
            .map_rows(&conn, &mut stmt)
            .unwrap()
            .into_iter()
            .map(|row| row.score)
            .collect();

        assert_eq!(scores[0].as_deref(), Some("2.0"));
        assert_eq!(scores[2].as_deref(), Some("1.5"));
        assert_eq!(scores, expected);
    }

    #[test]
    fn absent_columns_and_unmapped_fields_keep_defaults() {
        let conn = people_db();
        let mut stmt = conn.prepare("SELECT name FROM people;").unwrap();
        let people = ColumnMapping::<Person>::of().map_rows(&conn, &mut stmt).unwrap();

        assert!(people.iter().all(|person| person.nickname.is_none()));
        assert!(people.iter().all(|person| person.age.is_none()));
        assert!(people.iter().all(|person| person.note.is_empty()));
    }

    #[test]
    fn empty_cursor_maps_to_empty_vec() {
        let conn = people_db();
        let mut stmt = conn
            .prepare("SELECT name FROM people WHERE 1 = 0;")
            .unwrap();
        let people = ColumnMapping::<Person>::of().map_rows(&conn, &mut stmt).unwrap();
        assert!(people.is_empty());
    }

    #[test]
    fn target_type_round_trips_through_records() {
        let conn = people_db();
        let target = TargetType::of::<Person>();
        assert_eq!(target.columns(), vec!["name", "age", "nickname"]);

        let mut stmt = conn.prepare("SELECT * FROM people;").unwrap();
        let records = target.map_rows(&conn, &mut stmt).unwrap();
        assert_eq!(records.len(), 2);

        let people = records.into_vec::<Person>().unwrap();
        assert_eq!(people[0].name.as_deref(), Some("a"));
    }

    #[test]
    fn records_reject_wrong_type() {
        let conn = people_db();
        let mut stmt = conn.prepare("SELECT name FROM people;").unwrap();
        let records = TargetType::of::<Person>().map_rows(&conn, &mut stmt).unwrap();
        let err = records.into_vec::<Other>().unwrap_err();
        assert!(matches!(err, RepoError::TargetMismatch { .. }));
    }
}
