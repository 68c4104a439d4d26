//! Pre-built console scenarios for testing.
//!
//! Rows mirror what PgBouncer 1.x returns over the simple-query protocol:
//! every value is text, missing values are NULL.

use super::console::MockConsole;
use crate::console::{ConsoleError, ConsoleRow};

/// Builds a text-only row, `None` becoming NULL.
fn text_row(cells: &[(&str, Option<&str>)]) -> ConsoleRow {
    cells.iter().map(|&(column, value)| (column, value)).collect()
}

impl MockConsole {
    /// A pooler with one application database (`app`, transaction pooling)
    /// plus the built-in `pgbouncer` admin database.
    pub fn typical_pgbouncer() -> Self {
        let console = Self::new();

        console.set_rows(
            "SHOW LISTS;",
            [
                ("databases", "2"),
                ("users", "2"),
                ("pools", "2"),
                ("free_clients", "48"),
                ("used_clients", "5"),
                ("login_clients", "0"),
                ("free_servers", "0"),
                ("used_servers", "3"),
                ("dns_names", "0"),
                ("dns_zones", "0"),
                ("dns_queries", "0"),
                ("dns_pending", "0"),
            ]
            .iter()
            .map(|&(list, items)| text_row(&[("list", Some(list)), ("items", Some(items))]))
            .collect(),
        );

        console.set_rows(
            "SHOW STATS;",
            vec![
                text_row(&[
                    ("database", Some("app")),
                    ("total_xact_count", Some("18342")),
                    ("total_query_count", Some("40211")),
                    ("total_received", Some("9021334")),
                    ("total_sent", Some("120993112")),
                    ("total_xact_time", Some("84212331")),
                    ("total_query_time", Some("60123112")),
                    ("total_wait_time", Some("120334")),
                    ("avg_xact_count", Some("12")),
                    ("avg_query_count", Some("27")),
                    ("avg_recv", Some("6012")),
                    ("avg_sent", Some("80312")),
                    ("avg_xact_time", Some("4591")),
                    ("avg_query_time", Some("1495")),
                    ("avg_wait_time", Some("6")),
                ]),
                text_row(&[
                    ("database", Some("pgbouncer")),
                    ("total_xact_count", Some("3")),
                    ("total_query_count", Some("3")),
                    ("total_received", Some("0")),
                    ("total_sent", Some("0")),
                    ("total_xact_time", Some("0")),
                    ("total_query_time", Some("0")),
                    ("total_wait_time", Some("0")),
                    ("avg_xact_count", Some("0")),
                    ("avg_query_count", Some("0")),
                    ("avg_recv", Some("0")),
                    ("avg_sent", Some("0")),
                    ("avg_xact_time", Some("0")),
                    ("avg_query_time", Some("0")),
                    ("avg_wait_time", Some("0")),
                ]),
            ],
        );

        console.set_rows(
            "SHOW POOLS;",
            vec![
                text_row(&[
                    ("database", Some("app")),
                    ("user", Some("app_rw")),
                    ("cl_active", Some("4")),
                    ("cl_waiting", Some("1")),
                    ("sv_active", Some("3")),
                    ("sv_idle", Some("0")),
                    ("sv_used", Some("0")),
                    ("sv_tested", Some("0")),
                    ("sv_login", Some("0")),
                    ("maxwait", Some("0")),
                    ("maxwait_us", Some("2150")),
                    ("pool_mode", Some("transaction")),
                ]),
                text_row(&[
                    ("database", Some("pgbouncer")),
                    ("user", Some("pgbouncer")),
                    ("cl_active", Some("1")),
                    ("cl_waiting", Some("0")),
                    ("sv_active", Some("0")),
                    ("sv_idle", Some("0")),
                    ("sv_used", Some("0")),
                    ("sv_tested", Some("0")),
                    ("sv_login", Some("0")),
                    ("maxwait", Some("0")),
                    ("maxwait_us", Some("0")),
                    ("pool_mode", Some("statement")),
                ]),
            ],
        );

        console.set_rows(
            "SHOW DATABASES;",
            vec![
                text_row(&[
                    ("name", Some("app")),
                    ("host", Some("10.0.0.12")),
                    ("port", Some("5432")),
                    ("database", Some("app")),
                    ("force_user", None),
                    ("pool_size", Some("20")),
                    ("reserve_pool", Some("5")),
                    ("pool_mode", Some("transaction")),
                    ("max_connections", Some("0")),
                    ("current_connections", Some("3")),
                    ("paused", Some("0")),
                    ("disabled", Some("0")),
                ]),
                text_row(&[
                    ("name", Some("pgbouncer")),
                    ("host", None),
                    ("port", Some("6432")),
                    ("database", Some("pgbouncer")),
                    ("force_user", Some("pgbouncer")),
                    ("pool_size", Some("2")),
                    ("reserve_pool", Some("0")),
                    ("pool_mode", Some("statement")),
                    ("max_connections", Some("0")),
                    ("current_connections", Some("0")),
                    ("paused", Some("0")),
                    ("disabled", Some("0")),
                ]),
            ],
        );

        console.set_rows(
            "SHOW CONFIG;",
            [
                ("listen_backlog", "128"),
                ("max_client_conn", "100"),
                ("default_pool_size", "20"),
                ("min_pool_size", "0"),
                ("reserve_pool_size", "5"),
                ("reserve_pool_timeout", "5"),
                ("server_lifetime", "3600"),
                ("server_idle_timeout", "600"),
                ("query_timeout", "0"),
                ("stats_period", "60"),
                ("logfile", "/var/log/pgbouncer/pgbouncer.log"),
                ("pool_mode", "transaction"),
            ]
            .iter()
            .map(|&(key, value)| {
                text_row(&[
                    ("key", Some(key)),
                    ("value", Some(value)),
                    ("changeable", Some("yes")),
                ])
            })
            .collect(),
        );

        console
    }

    /// A pooler that refuses every console command, as when the connecting
    /// user is not listed in `stats_users`/`admin_users`.
    pub fn unauthorized_pgbouncer() -> Self {
        let console = Self::new();
        for topic in crate::registry::Topic::ALL {
            console.fail(
                topic.query(),
                ConsoleError::Query("ERROR: not allowed".to_string()),
            );
        }
        console
    }
}
