//! PgBouncer administrative console access.
//!
//! The console is the pooler's virtual `pgbouncer` database. It speaks the
//! PostgreSQL wire protocol but only accepts simple queries of the form
//! `SHOW <TOPIC>;`.
//!
//! # Architecture
//!
//! ```text
//!        ┌─────────────────────────┐
//!        │        Collector        │
//!        │  (one cycle at a time)  │
//!        └────────────┬────────────┘
//!                     │
//!              ┌──────▼───────┐
//!              │ AdminConsole │ (trait)
//!              └──────┬───────┘
//!                     │
//!          ┌──────────┴──────────┐
//!          │                     │
//!  ┌───────▼────────┐    ┌───────▼───────┐
//!  │PgbouncerConsole│    │  MockConsole  │
//!  │ (postgres)     │    │  (Testing)    │
//!  └────────────────┘    └───────────────┘
//! ```

pub mod mock;
mod pgbouncer;

use chrono::{DateTime, Utc};

pub use mock::MockConsole;
pub use pgbouncer::{PgbouncerConsole, format_postgres_error};

/// Error type for console access.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleError {
    /// Connecting to (or disconnecting from) the console failed.
    Connection(String),
    /// The console rejected or could not execute a query.
    Query(String),
    /// A result row could not be read into (column, cell) pairs.
    Decode(String),
    /// The console handle was already closed.
    Closed,
}

impl std::fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleError::Connection(msg) => write!(f, "pgbouncer: {}", msg),
            ConsoleError::Query(msg) => write!(f, "pgbouncer query error: {}", msg),
            ConsoleError::Decode(msg) => write!(f, "pgbouncer row decode error: {}", msg),
            ConsoleError::Closed => write!(f, "pgbouncer: console connection closed"),
        }
    }
}

impl std::error::Error for ConsoleError {}

/// Untyped scalar as returned by a console driver.
///
/// The simple-query protocol delivers everything as text, but the extraction
/// engine accepts any driver-level shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
    Duration(chrono::Duration),
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Null, Into::into)
    }
}

/// One result row: (column name, cell) pairs in driver order.
///
/// Column order is whatever the console sent and differs between topics and
/// PgBouncer versions, so lookups go by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsoleRow {
    cells: Vec<(String, Cell)>,
}

impl ConsoleRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
        }
    }

    /// Appends a column.
    pub fn push(&mut self, column: impl Into<String>, cell: impl Into<Cell>) {
        self.cells.push((column.into(), cell.into()));
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, column: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.push(column, cell);
        self
    }

    /// Returns the cell of the first column named `column`.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// Returns the cell at position `index`.
    pub fn cell_at(&self, index: usize) -> Option<&Cell> {
        self.cells.get(index).map(|(_, cell)| cell)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.cells.iter().map(|(name, cell)| (name.as_str(), cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<C: Into<String>, V: Into<Cell>> FromIterator<(C, V)> for ConsoleRow {
    fn from_iter<I: IntoIterator<Item = (C, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(column, cell)| (column.into(), cell.into()))
                .collect(),
        }
    }
}

/// Query-executing collaborator owned by the [`Collector`](crate::Collector).
///
/// Implementations are used by one scrape cycle at a time and never need to
/// handle concurrent calls.
pub trait AdminConsole: Send {
    /// Executes `query` verbatim and returns all result rows.
    fn query(&mut self, query: &str) -> Result<Vec<ConsoleRow>, ConsoleError>;

    /// Releases the underlying connection. Not required to be idempotent.
    fn close(&mut self) -> Result<(), ConsoleError>;
}
