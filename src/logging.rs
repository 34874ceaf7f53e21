use tracing_subscriber::EnvFilter;

/// Level used when the configured one is not a valid filter.
pub const DEFAULT_LEVEL: &str = "warn";

/// Install a compact stderr subscriber filtered by `level`, which may be a
/// bare level (`info`) or a full directive (`warn,xmandump_library=debug`).
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|err| {
        eprintln!("invalid log level {level:?} ({err}), using {DEFAULT_LEVEL}");
        EnvFilter::new(DEFAULT_LEVEL)
    });
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    if let Err(err) = installed {
        eprintln!("unable to set up logging: {err}");
    }
}
