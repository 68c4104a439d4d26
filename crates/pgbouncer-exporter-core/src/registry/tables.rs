//! Per-topic metric tables.
//!
//! Column names are the ones PgBouncer prints in `SHOW <TOPIC>;` output (for
//! LISTS and CONFIG, the values of the first column).

use super::{MetricFamilyDescriptor, ValueColumnSpec};

pub(super) static LISTS: MetricFamilyDescriptor = MetricFamilyDescriptor {
    prefix: "lists",
    labels: &[],
    columns: &[
        ValueColumnSpec::gauge("databases", "Count of databases"),
        ValueColumnSpec::gauge("users", "Count of users"),
        ValueColumnSpec::gauge("pools", "Count of pools"),
        ValueColumnSpec::gauge("free_clients", "Count of free clients"),
        ValueColumnSpec::gauge("used_clients", "Count of used clients"),
        ValueColumnSpec::gauge("login_clients", "Count of clients in login state"),
        ValueColumnSpec::gauge("free_servers", "Count of free servers"),
        ValueColumnSpec::gauge("used_servers", "Count of used servers"),
        ValueColumnSpec::gauge("dns_names", "Count of DNS names in the cache"),
        ValueColumnSpec::gauge("dns_zones", "Count of DNS zones in the cache"),
        ValueColumnSpec::gauge("dns_queries", "Count of in-flight DNS queries"),
        ValueColumnSpec::gauge("dns_pending", "Count of DNS pending queries"),
    ],
};

pub(super) static STATS: MetricFamilyDescriptor = MetricFamilyDescriptor {
    prefix: "stats",
    labels: &["database"],
    columns: &[
        ValueColumnSpec::counter("total_xact_count", "Total number of SQL transactions pooled"),
        ValueColumnSpec::counter("total_query_count", "Total number of SQL queries pooled"),
        ValueColumnSpec::counter(
            "total_received",
            "Total volume in bytes of network traffic received by pgbouncer, shown as bytes",
        ),
        ValueColumnSpec::counter(
            "total_sent",
            "Total volume in bytes of network traffic sent by pgbouncer, shown as bytes",
        ),
        ValueColumnSpec::counter(
            "total_xact_time",
            "Total number of microseconds spent by pgbouncer when connected to PostgreSQL in a transaction, either idle in transaction or executing queries",
        ),
        ValueColumnSpec::counter(
            "total_query_time",
            "Total number of microseconds spent by pgbouncer when actively connected to PostgreSQL, executing queries",
        ),
        ValueColumnSpec::counter(
            "total_wait_time",
            "Time spent by clients waiting for a server in microseconds",
        ),
        ValueColumnSpec::gauge(
            "avg_xact_count",
            "Average transactions per second in last stat period",
        ),
        ValueColumnSpec::gauge(
            "avg_query_count",
            "Average queries per second in last stat period",
        ),
        ValueColumnSpec::gauge(
            "avg_recv",
            "Average received (from clients) bytes per second",
        ),
        ValueColumnSpec::gauge("avg_sent", "Average sent (to clients) bytes per second"),
        ValueColumnSpec::gauge(
            "avg_xact_time",
            "Average transaction duration in microseconds",
        ),
        ValueColumnSpec::gauge("avg_query_time", "Average query duration in microseconds"),
        ValueColumnSpec::gauge(
            "avg_wait_time",
            "Time spent by clients waiting for a server in microseconds (average per second)",
        ),
    ],
};

pub(super) static POOLS: MetricFamilyDescriptor = MetricFamilyDescriptor {
    prefix: "pools",
    labels: &["database", "user", "pool_mode"],
    columns: &[
        ValueColumnSpec::gauge(
            "cl_active",
            "Client connections linked to server connection and able to process queries, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "cl_waiting",
            "Client connections waiting on a server connection, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "sv_active",
            "Server connections linked to a client connection, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "sv_idle",
            "Server connections idle and ready for a client query, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "sv_used",
            "Server connections idle more than server_check_delay, needing server_check_query, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "sv_tested",
            "Server connections currently running either server_reset_query or server_check_query, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "sv_login",
            "Server connections currently in the process of logging in, shown as connection",
        ),
        ValueColumnSpec::gauge(
            "maxwait",
            "Age of oldest unserved client connection, shown as second",
        ),
        ValueColumnSpec::gauge(
            "maxwait_us",
            "Microsecond part of the age of oldest unserved client connection",
        ),
    ],
};

pub(super) static DATABASES: MetricFamilyDescriptor = MetricFamilyDescriptor {
    prefix: "databases",
    labels: &["name", "host", "port", "database", "force_user", "pool_mode"],
    columns: &[
        ValueColumnSpec::gauge("pool_size", "Maximum number of pool backend connections"),
        ValueColumnSpec::gauge(
            "reserve_pool",
            "Maximum amount that the pool size can be exceeded temporarily",
        ),
        ValueColumnSpec::gauge(
            "max_connections",
            "Maximum number of client connections allowed",
        ),
        ValueColumnSpec::gauge(
            "current_connections",
            "Current number of client connections",
        ),
        ValueColumnSpec::gauge(
            "paused",
            "Boolean indicating whether a pgbouncer PAUSE is currently active for this database",
        ),
        ValueColumnSpec::gauge(
            "disabled",
            "Boolean indicating whether a pgbouncer DISABLE is currently active for this database",
        ),
    ],
};

pub(super) static CONFIG: MetricFamilyDescriptor = MetricFamilyDescriptor {
    prefix: "config",
    labels: &[],
    columns: &[
        ValueColumnSpec::counter(
            "listen_backlog",
            "Maximum number of backlogged listen connections before further connection attempts are dropped",
        ),
        ValueColumnSpec::counter(
            "disable_pqexec",
            "Boolean; 1 means pgbouncer enforce Simple Query Protocol; 0 means it allows multiple queries in a single packet",
        ),
        ValueColumnSpec::counter("pkt_buf", "Internal buffer size for packets. See docs"),
        ValueColumnSpec::gauge(
            "max_client_conn",
            "Maximum number of client connections allowed",
        ),
        ValueColumnSpec::gauge(
            "default_pool_size",
            "The default for how many server connections to allow per user/database pair",
        ),
        ValueColumnSpec::gauge(
            "min_pool_size",
            "Minimum number of backends a pool will always retain",
        ),
        ValueColumnSpec::gauge(
            "reserve_pool_size",
            "How many additional connections to allow to a pool once it's crossed it's maximum",
        ),
        ValueColumnSpec::gauge(
            "reserve_pool_timeout",
            "If a client has not been serviced in this many seconds, pgbouncer enables use of additional connections from reserve pool",
        ),
        ValueColumnSpec::gauge(
            "max_db_connections",
            "Server level maximum connections enforced for a given db, irregardless of pool limits",
        ),
        ValueColumnSpec::gauge(
            "max_user_connections",
            "Maximum number of connections a user can open irregardless of pool limits",
        ),
        ValueColumnSpec::gauge(
            "autodb_idle_timeout",
            "Unused pools created via '*' are reclaimed after this interval",
        ),
        ValueColumnSpec::gauge(
            "server_reset_query_always",
            "Boolean indicating whether or not server_reset_query is enforced for all pooling modes, or just session",
        ),
        ValueColumnSpec::gauge(
            "server_check_delay",
            "How long to keep released connections available for immediate re-use, without running sanity-check queries on it. If 0 then the query is ran always",
        ),
        ValueColumnSpec::gauge(
            "query_timeout",
            "Maximum time that a query can run for before being cancelled",
        ),
        ValueColumnSpec::gauge(
            "query_wait_timeout",
            "Maximum time that a query can wait to be executed before being cancelled",
        ),
        ValueColumnSpec::gauge(
            "client_idle_timeout",
            "Client connections idling longer than this many seconds are closed",
        ),
        ValueColumnSpec::gauge(
            "client_login_timeout",
            "Maximum time in seconds for a client to either login, or be disconnected",
        ),
        ValueColumnSpec::gauge(
            "idle_transaction_timeout",
            "If client has been in 'idle in transaction' state longer than this amount in seconds, it will be disconnected",
        ),
        ValueColumnSpec::gauge(
            "server_lifetime",
            "The pooler will close an unused server connection that has been connected longer than this many seconds",
        ),
        ValueColumnSpec::gauge(
            "server_idle_timeout",
            "If a server connection has been idle more than this many seconds it will be dropped",
        ),
        ValueColumnSpec::gauge(
            "server_connect_timeout",
            "Maximum time allowed for connecting and logging into a backend server",
        ),
        ValueColumnSpec::gauge(
            "server_login_retry",
            "If connecting to a backend failed, this is the wait interval in seconds before retrying",
        ),
        ValueColumnSpec::gauge(
            "server_round_robin",
            "Boolean; if 1, pgbouncer uses backends in a round robin fashion. If 0, it uses LIFO to minimize connectivity to backends",
        ),
        ValueColumnSpec::gauge(
            "suspend_timeout",
            "Timeout for how long pgbouncer waits for buffer flushes before killing connections during pgbouncer admin SHUTDOWN and SUSPEND invocations",
        ),
        ValueColumnSpec::gauge(
            "dns_max_ttl",
            "Irregardless of DNS TTL, this is the TTL that pgbouncer enforces for dns lookups it does for backends",
        ),
        ValueColumnSpec::gauge(
            "dns_nxdomain_ttl",
            "Irregardless of DNS TTL, this is the period enforced for negative DNS answers",
        ),
        ValueColumnSpec::gauge(
            "dns_zone_check_period",
            "Period to check if zone serial has changed",
        ),
        ValueColumnSpec::gauge(
            "max_packet_size",
            "Maximum packet size for postgresql packets that pgbouncer will relay to backends",
        ),
        ValueColumnSpec::gauge(
            "sbuf_loopcnt",
            "How many results to process for a given connection's packet results before switching to others to ensure fairness",
        ),
        ValueColumnSpec::gauge("tcp_defer_accept", "Configurable for TCP_DEFER_ACCEPT"),
        ValueColumnSpec::gauge(
            "tcp_socket_buffer",
            "Configurable for tcp socket buffering; 0 is kernel managed",
        ),
        ValueColumnSpec::gauge(
            "tcpkeepalive",
            "Boolean; if 1, tcp keepalive is enabled w/ OS defaults. If 0, disabled",
        ),
        ValueColumnSpec::gauge("tcp_keepcnt", "See TCP documentation for this field"),
        ValueColumnSpec::gauge("tcp_keepidle", "See TCP documentation for this field"),
        ValueColumnSpec::gauge("tcp_keepintvl", "See TCP documentation for this field"),
        ValueColumnSpec::gauge(
            "verbose",
            "If log verbosity is increased. Only relevant as a metric if log volume begins exceeding log consumption",
        ),
        ValueColumnSpec::gauge(
            "stats_period",
            "Periodicity in seconds of pgbouncer recalculating internal stats",
        ),
        ValueColumnSpec::gauge("log_connections", "Whether connections are logged or not"),
        ValueColumnSpec::gauge(
            "log_disconnections",
            "Whether connection disconnects are logged",
        ),
        ValueColumnSpec::gauge(
            "log_pooler_errors",
            "Whether pooler errors are logged or not",
        ),
        ValueColumnSpec::gauge(
            "application_name_add_host",
            "Whether pgbouncer add the client host address and port to the application name setting set on connection start or not",
        ),
    ],
};
