//! pgbouncer-exporter - Prometheus exporter for PgBouncer.
//!
//! Queries the PgBouncer admin console on every scrape and serves the result
//! on `/metrics`.

mod exposition;
mod handlers;
mod state;

use std::net::{IpAddr, SocketAddr};
use std::process;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use clap::Parser;
use clap::builder::RangedU64ValueParser;
use prometheus::Registry;
use tower_http::compression::CompressionLayer;
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

use pgbouncer_exporter_core::{Collector, FailurePolicy, OnTopicFailure, PgbouncerConsole};

use exposition::PgbouncerMetrics;
use state::AppState;

const DEFAULT_DSN: &str = "postgres://pgbouncer:@localhost:6432/pgbouncer?sslmode=disable";

// ============================================================
// CLI
// ============================================================

#[derive(Parser, Debug)]
#[command(
    name = "pgbouncer-exporter",
    about = "Prometheus exporter for PgBouncer",
    version = pgbouncer_exporter_core::VERSION
)]
struct Args {
    /// Port to listen on for web interface and telemetry.
    #[arg(short, long, default_value_t = 9127, env = "EXPORTER_WEB_LISTEN_PORT")]
    port: u16,

    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0", env = "EXPORTER_WEB_LISTEN_HOST")]
    listen_host: IpAddr,

    /// Connection string of the PgBouncer admin console (URL or key=value form).
    #[arg(
        short,
        long,
        default_value = DEFAULT_DSN,
        env = "DATA_SOURCE_NAME",
        hide_env_values = true
    )]
    dsn: String,

    /// Prefix of every exported metric name.
    #[arg(
        long,
        visible_alias = "ns",
        default_value = "pgbouncer",
        env = "EXPORTER_NAMESPACE"
    )]
    namespace: String,

    /// Failed topics per scrape at which `<namespace>_up` drops to 0.
    #[arg(
        long,
        default_value_t = 5,
        env = "EXPORTER_ERROR_THRESHOLD",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    error_threshold: usize,

    /// Stop a scrape at the first failed topic instead of trying the rest.
    #[arg(long, env = "EXPORTER_ABORT_ON_ERROR")]
    abort_on_error: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy {
            error_threshold: self.error_threshold,
            on_failure: if self.abort_on_error {
                OnTopicFailure::Abort
            } else {
                OnTopicFailure::Continue
            },
        }
    }
}

/// Initializes the tracing subscriber. Default level is INFO, -q keeps errors only.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["pgbouncer_exporter", "pgbouncer_exporter_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ============================================================
// Main
// ============================================================

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    info!(
        version = pgbouncer_exporter_core::VERSION,
        namespace = %args.namespace,
        "starting pgbouncer exporter"
    );

    // The console client runs its own runtime; it is created, probed and
    // closed outside the server runtime.
    let mut console = match PgbouncerConsole::new(&args.dsn) {
        Ok(console) => console,
        Err(e) => {
            error!(error = %e, "invalid data source name");
            process::exit(1);
        }
    };
    if let Err(e) = console.try_connect() {
        warn!(error = %e, "pgbouncer is not reachable yet, retrying on every scrape");
    }

    let policy = args.failure_policy();
    info!(
        error_threshold = policy.error_threshold,
        on_failure = ?policy.on_failure,
        "failure policy"
    );
    let collector = Arc::new(Collector::new(
        Box::new(console),
        args.namespace.clone(),
        policy,
    ));

    let registry = match build_registry(Arc::clone(&collector)) {
        Ok(registry) => registry,
        Err(e) => {
            error!(namespace = %args.namespace, error = %e, "failed to register metrics");
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "failed to build tokio runtime");
            process::exit(1);
        }
    };

    let addr = SocketAddr::new(args.listen_host, args.port);
    let served = runtime.block_on(serve(addr, AppState::new(registry)));
    drop(runtime);

    if let Err(e) = collector.close() {
        warn!(error = %e, "failed to close pgbouncer connection");
    }

    if let Err(e) = served {
        error!(%addr, error = %e, "server error");
        process::exit(1);
    }
    info!("stopped");
}

fn build_registry(collector: Arc<Collector>) -> prometheus::Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(PgbouncerMetrics::new(collector)?))?;
    Ok(registry)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_index))
        .route("/metrics", get(handlers::handle_metrics))
        .route("/healthz", get(handlers::handle_healthz))
        .with_state(state)
        .layer(CompressionLayer::new())
}

async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
