//! PostgreSQL-protocol client for the PgBouncer admin console.
//!
//! Holds a single connection (pool capacity one). The connection is opened on
//! first use and dropped after any query error, so the next scrape cycle
//! reconnects.

use postgres::{Client, Config, NoTls, SimpleQueryMessage, SimpleQueryRow};
use tracing::{debug, info};

use super::{AdminConsole, Cell, ConsoleError, ConsoleRow};

/// Admin console connection.
///
/// Accepts both URL (`postgres://pgbouncer@localhost:6432/pgbouncer`) and
/// libpq `key=value` connection strings.
pub struct PgbouncerConsole {
    config: Config,
    client: Option<Client>,
    closed: bool,
    last_error: Option<String>,
}

impl PgbouncerConsole {
    /// Creates a console handle from a connection string.
    ///
    /// Does not connect; see [`try_connect`](Self::try_connect).
    pub fn new(dsn: &str) -> Result<Self, ConsoleError> {
        let config = dsn
            .parse::<Config>()
            .map_err(|e| ConsoleError::Connection(format!("invalid connection string: {}", e)))?;

        Ok(Self {
            config,
            client: None,
            closed: false,
            last_error: None,
        })
    }

    /// Attempts to connect to the console.
    ///
    /// Useful for startup checks; a failure here is not fatal since every
    /// scrape retries the connection.
    pub fn try_connect(&mut self) -> Result<(), ConsoleError> {
        self.ensure_connected().map(|_| ())
    }

    /// Returns the last error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_connected(&mut self) -> Result<&mut Client, ConsoleError> {
        if self.closed {
            return Err(ConsoleError::Closed);
        }

        let client = match self.client.take() {
            Some(client) if !client.is_closed() => client,
            stale => {
                if stale.is_some() {
                    debug!("console connection lost, reconnecting");
                }
                match self.config.connect(NoTls) {
                    Ok(client) => {
                        info!(
                            hosts = ?self.config.get_hosts(),
                            ports = ?self.config.get_ports(),
                            "connected to pgbouncer console"
                        );
                        self.last_error = None;
                        client
                    }
                    Err(e) => {
                        let msg = format_postgres_error(&e);
                        self.last_error = Some(msg.clone());
                        return Err(ConsoleError::Connection(msg));
                    }
                }
            }
        };

        Ok(self.client.insert(client))
    }
}

impl AdminConsole for PgbouncerConsole {
    fn query(&mut self, query: &str) -> Result<Vec<ConsoleRow>, ConsoleError> {
        let client = self.ensure_connected()?;

        match client.simple_query(query) {
            Ok(messages) => {
                let mut rows = Vec::new();
                for message in messages {
                    if let SimpleQueryMessage::Row(row) = message {
                        rows.push(decode_row(&row)?);
                    }
                }
                Ok(rows)
            }
            Err(e) => {
                let msg = format_postgres_error(&e);
                self.last_error = Some(msg.clone());
                self.client = None;
                Err(ConsoleError::Query(msg))
            }
        }
    }

    fn close(&mut self) -> Result<(), ConsoleError> {
        if self.closed {
            return Err(ConsoleError::Closed);
        }
        self.closed = true;

        match self.client.take() {
            Some(client) => client
                .close()
                .map_err(|e| ConsoleError::Connection(format_postgres_error(&e))),
            None => Ok(()),
        }
    }
}

/// Converts a simple-query row into (column, cell) pairs.
///
/// The simple-query protocol transfers every value as text; NULL stays NULL.
fn decode_row(row: &SimpleQueryRow) -> Result<ConsoleRow, ConsoleError> {
    let mut out = ConsoleRow::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = row
            .try_get(idx)
            .map_err(|e| ConsoleError::Decode(format!("column {}: {}", column.name(), e)))?;
        out.push(column.name(), value.map_or(Cell::Null, Cell::from));
    }
    Ok(out)
}

/// Formats a PostgreSQL protocol error for logs and error values.
pub fn format_postgres_error(e: &postgres::Error) -> String {
    if let Some(db_error) = e.as_db_error() {
        format!("{}: {}", db_error.severity(), db_error.message())
    } else {
        let msg = e.to_string();
        if msg.contains("Connection refused") {
            "connection refused".to_string()
        } else if msg.contains("password authentication failed") {
            "password authentication failed".to_string()
        } else if msg.contains("not allowed") || msg.contains("no such user") {
            msg.split("FATAL:")
                .last()
                .unwrap_or(&msg)
                .trim()
                .to_string()
        } else {
            msg
        }
    }
}
