//! In-memory admin console for testing without a running PgBouncer.

mod console;
mod scenarios;

pub use console::MockConsole;
