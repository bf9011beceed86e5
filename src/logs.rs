use {super::*, tracing_subscriber::Layer, tracing_appender::non_blocking::WorkerGuard};

const DEFAULT_FILTER: &str = "warn,mergepool=info";

/// Installs the global subscriber. Events are written to stderr from a
/// background thread until the returned guard is dropped.
pub(crate) fn init() -> WorkerGuard {
    let (writer, guard) = non_blocking(io::stderr());

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_filter(filter),
        )
        .init();

    guard
}
