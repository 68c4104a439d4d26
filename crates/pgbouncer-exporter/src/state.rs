//! Shared application state and the global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use prometheus::Registry;

/// State handed to every request handler.
#[derive(Clone)]
pub(crate) struct AppState {
    /// Holds the pgbouncer collector; gathering it runs a scrape cycle.
    pub(crate) registry: Registry,
}

impl AppState {
    pub(crate) fn new(registry: Registry) -> Self {
        Self { registry }
    }
}
