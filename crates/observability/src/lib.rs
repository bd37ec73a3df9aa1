use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event on stdout, for the server.
    Json,
    /// Human-readable lines on stderr, keeping stdout free for command output.
    Compact,
}

/// Installs the global subscriber once; later calls are no-ops. `RUST_LOG`
/// overrides the default filter.
pub fn init_tracing(service_name: &str) {
    init_tracing_with(service_name, LogFormat::Json, "info");
}

pub fn init_cli_tracing(service_name: &str) {
    init_tracing_with(service_name, LogFormat::Compact, "warn");
}

pub fn init_tracing_with(service_name: &str, format: LogFormat, default_level: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(service_name, default_level)));

        match format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(true)
                .with_span_list(true)
                .init(),
            LogFormat::Compact => tracing_subscriber::fmt()
                .compact()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init(),
        }
    });
}

fn default_filter(service_name: &str, level: &str) -> String {
    format!(
        "{service_name}={level},voyage_api={level},voyage_agents={level},tower_http={level}"
    )
}
